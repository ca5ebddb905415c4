use crate::errors::AppResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const FILE_HANDLER_ID: &str = "StatWrap.FileHandler";
pub const PROJECT_LIST_FILE: &str = ".statwrap-projects.json";
pub const PROJECT_DESCRIPTOR_FILE: &str = ".statwrap-project.json";

static DEFAULT_SETTINGS: Lazy<CoreSettings> = Lazy::new(CoreSettings::default);

pub fn default_settings() -> &'static CoreSettings {
    &DEFAULT_SETTINGS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeHandler {
    pub handler_id: String,
    pub language: String,
}

impl CodeHandler {
    fn new(handler_id: &str, language: &str) -> Self {
        Self {
            handler_id: handler_id.to_string(),
            language: language.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreSettings {
    pub file_handler_id: String,
    pub project_list_file: String,
    pub project_descriptor_file: String,
    pub code_handlers: Vec<CodeHandler>,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            file_handler_id: FILE_HANDLER_ID.to_string(),
            project_list_file: PROJECT_LIST_FILE.to_string(),
            project_descriptor_file: PROJECT_DESCRIPTOR_FILE.to_string(),
            code_handlers: vec![
                CodeHandler::new("StatWrap.PythonHandler", "python"),
                CodeHandler::new("StatWrap.RHandler", "r"),
                CodeHandler::new("StatWrap.SASHandler", "sas"),
                CodeHandler::new("StatWrap.StataHandler", "stata"),
            ],
        }
    }
}

impl CoreSettings {
    /// Reads settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.to_string_lossy(), "settings file not found; using defaults");
            return Ok(Self::default());
        }
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn merged(&self, update: serde_json::Value) -> AppResult<Self> {
        let mut merged = serde_json::to_value(self)?;
        merge_json(&mut merged, update);
        Ok(serde_json::from_value(merged)?)
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
