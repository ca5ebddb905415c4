use crate::errors::{AppError, AppResult};
use crate::models::{from_json_slice, Project, ProjectListEntry};
use crate::settings::CoreSettings;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Where project data comes from. The file-backed [`ProjectService`] is the
/// only implementation shipped here.
pub trait ProjectStore {
    /// A missing list file is an empty list.
    fn load_project_list(&self, file: Option<&Path>) -> AppResult<Vec<ProjectListEntry>>;
    /// A missing descriptor is `None`.
    fn load_project(&self, project_path: &str) -> AppResult<Option<Project>>;
}

#[derive(Debug, Clone)]
pub struct ProjectService {
    settings: CoreSettings,
    home_dir: Option<PathBuf>,
}

impl Default for ProjectService {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectService {
    pub fn new() -> Self {
        Self::with_settings(CoreSettings::default())
    }

    pub fn with_settings(settings: CoreSettings) -> Self {
        Self {
            settings,
            home_dir: default_home_dir(),
        }
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    pub fn load_list_from_file(&self, file: Option<&Path>) -> AppResult<Vec<ProjectListEntry>> {
        let path = self.list_path(file);
        if !path.exists() {
            tracing::debug!(path = %path.to_string_lossy(), "project list not found");
            return Ok(Vec::new());
        }
        let projects: Vec<ProjectListEntry> = read_json_file(&path)?;
        tracing::debug!(path = %path.to_string_lossy(), count = projects.len(), "loaded project list");
        Ok(projects)
    }

    pub fn save_list_to_file(&self, file: Option<&Path>, projects: &[ProjectListEntry]) -> AppResult<()> {
        write_json_file(&self.list_path(file), &projects)
    }

    /// Expands a leading `~` to the home directory.
    pub fn resolve_project_path(&self, project_path: &str) -> AppResult<PathBuf> {
        let rest = if project_path == "~" {
            Some("")
        } else {
            project_path
                .strip_prefix("~/")
                .or_else(|| project_path.strip_prefix("~\\"))
        };
        let Some(rest) = rest else {
            return Ok(PathBuf::from(project_path));
        };
        let Some(home) = self.home_dir.as_ref() else {
            return Err(AppError::NotFound(format!(
                "Unable to resolve home directory for {}",
                project_path
            )));
        };
        Ok(home.join(rest))
    }

    pub fn descriptor_path(&self, project_path: &str) -> AppResult<PathBuf> {
        Ok(self
            .resolve_project_path(project_path)?
            .join(&self.settings.project_descriptor_file))
    }

    pub fn load_from_file(&self, project_path: &str) -> AppResult<Option<Project>> {
        let path = self.descriptor_path(project_path)?;
        if !path.exists() {
            tracing::debug!(path = %path.to_string_lossy(), "project descriptor not found");
            return Ok(None);
        }
        read_json_file(&path).map(Some)
    }

    pub fn save_to_file(&self, project_path: &str, project: &Project) -> AppResult<()> {
        write_json_file(&self.descriptor_path(project_path)?, project)
    }

    fn list_path(&self, file: Option<&Path>) -> PathBuf {
        file.map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.settings.project_list_file))
    }
}

impl ProjectStore for ProjectService {
    fn load_project_list(&self, file: Option<&Path>) -> AppResult<Vec<ProjectListEntry>> {
        self.load_list_from_file(file)
    }

    fn load_project(&self, project_path: &str) -> AppResult<Option<Project>> {
        self.load_from_file(project_path)
    }
}

fn default_home_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Ok(home) = std::env::var("HOME") {
            return Some(PathBuf::from(home));
        }
    }

    #[cfg(windows)]
    {
        if let Ok(home) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(home));
        }
    }

    None
}

fn write_json_file<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| AppError::Io(error.to_string()))?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes).map_err(|error| AppError::Io(error.to_string()))
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let bytes = fs::read(path).map_err(|error| AppError::Io(error.to_string()))?;
    from_json_slice(&bytes).map_err(|error| {
        AppError::Parse(format!("{}: {}", path.to_string_lossy(), error))
    })
}
