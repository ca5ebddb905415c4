use crate::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    File,
    Directory,
    #[serde(rename = "assetgroup")]
    AssetGroup,
    Filter,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::AssetGroup => "assetgroup",
            Self::Filter => "filter",
        }
    }
}

/// One handler's extension record on an asset. Everything besides `id` is
/// handler specific and kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl HandlerMetadata {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Only a literal `false` excludes; a missing or non-boolean flag counts as included.
    pub fn is_excluded(&self) -> bool {
        matches!(self.fields.get("include"), Some(Value::Bool(false)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub author: String,
    pub content: String,
    pub updated: String,
}

/// Kind given to dependency entries that do not declare one.
pub const GENERIC_KIND: &str = "generic";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyKind {
    Library,
    Data,
    Figure,
    Other(String),
}

impl DependencyKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Library => "library",
            Self::Data => "data",
            Self::Figure => "figure",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Tag carried by projected graph nodes for this kind.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Library => "dependency",
            other => other.as_str(),
        }
    }
}

impl Default for DependencyKind {
    fn default() -> Self {
        Self::Other(GENERIC_KIND.to_string())
    }
}

impl From<String> for DependencyKind {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "library" | "dependency" => Self::Library,
            "data" => Self::Data,
            "figure" => Self::Figure,
            _ => Self::Other(value),
        }
    }
}

impl From<DependencyKind> for String {
    fn from(value: DependencyKind) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    /// Case-insensitive parse; anything other than input/output is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            _ => None,
        }
    }
}

fn lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let direction = raw.as_str().and_then(Direction::parse);
            if direction.is_none() {
                tracing::warn!(direction = %raw, "ignoring unrecognized dependency direction");
            }
            direction
        }
    })
}

/// A relationship declared by an asset towards another asset or an external library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDependency {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: DependencyKind,
    #[serde(
        default,
        deserialize_with = "lenient_direction",
        skip_serializing_if = "Option::is_none"
    )]
    pub direction: Option<Direction>,
}

impl AssetDependency {
    pub fn new(id: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A file, directory, asset group or saved filter.
///
/// `children` is `None` for both an absent and a null collection. Child nodes
/// sit behind `Arc` so filtered copies can share untouched subtrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
    #[serde(default)]
    pub uri: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<Option<HandlerMetadata>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<AssetDependency>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Arc<AssetNode>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetNode {
    pub fn new(uri: impl Into<String>) -> Self {
        let mut node = Self::default();
        node.uri = uri.into();
        node
    }

    pub fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn with_metadata(mut self, entry: HandlerMetadata) -> Self {
        self.metadata.get_or_insert_with(Vec::new).push(Some(entry));
        self
    }

    pub fn with_note(mut self, note: Note) -> Self {
        self.notes.get_or_insert_with(Vec::new).push(note);
        self
    }

    pub fn with_dependency(mut self, dependency: AssetDependency) -> Self {
        self.dependencies.get_or_insert_with(Vec::new).push(dependency);
        self
    }

    pub fn with_children(mut self, children: Vec<AssetNode>) -> Self {
        self.children = Some(children.into_iter().map(Arc::new).collect());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// An empty uri marks a placeholder node that no lookup can match.
    pub fn has_uri(&self) -> bool {
        !self.uri.is_empty()
    }

    pub fn child_nodes(&self) -> &[Arc<AssetNode>] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Copy of this node carrying every field except `children`, which is replaced.
    pub fn with_replaced_children(&self, children: Option<Vec<Arc<AssetNode>>>) -> Self {
        Self {
            uri: self.uri.clone(),
            asset_type: self.asset_type,
            metadata: self.metadata.clone(),
            notes: self.notes.clone(),
            dependencies: self.dependencies.clone(),
            children,
            extra: self.extra.clone(),
        }
    }
}

impl Drop for AssetNode {
    // Unlinks uniquely owned descendants onto a work-list so deep chains
    // are released without one stack frame per level.
    fn drop(&mut self) {
        let Some(mut pending) = self.children.take() else {
            return;
        };
        while let Some(child) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(child) {
                if let Some(grandchildren) = node.children.take() {
                    pending.extend(grandchildren);
                }
            }
        }
    }
}

/// Builds an asset tree from untrusted JSON. Shape errors such as a
/// non-array `children` surface as [`AppError::MalformedTree`]. Nesting depth
/// is not limited.
pub fn parse_asset_tree(value: Value) -> AppResult<Arc<AssetNode>> {
    AssetNode::deserialize(serde_stacker::Deserializer::new(value))
        .map(Arc::new)
        .map_err(|error| AppError::MalformedTree(error.to_string()))
}

pub fn parse_asset_tree_str(raw: &str) -> AppResult<Arc<AssetNode>> {
    from_json_slice::<AssetNode>(raw.as_bytes())
        .map(Arc::new)
        .map_err(|error| AppError::MalformedTree(error.to_string()))
}

/// `serde_json::from_slice` without the recursion limit; the stack grows on
/// demand while descending.
pub(crate) fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeCategory {
    Python,
    R,
    Sas,
    Stata,
    Library,
    Data,
    Figure,
    Generic,
}

const ICON_PATH: &str = "image://./images/";

impl NodeCategory {
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "python" => Self::Python,
            "r" => Self::R,
            "sas" => Self::Sas,
            "stata" => Self::Stata,
            "dependency" => Self::Library,
            "data" => Self::Data,
            "figure" => Self::Figure,
            _ => Self::Generic,
        }
    }

    pub fn icon(self) -> String {
        let file = match self {
            Self::Python => "python.svg",
            Self::R => "r.svg",
            Self::Sas => "sas.svg",
            Self::Stata => "stata.png",
            Self::Library => "library.svg",
            Self::Data => "data.svg",
            Self::Figure => "figure.svg",
            Self::Generic => "generic.svg",
        };
        format!("{ICON_PATH}{file}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub value: String,
    pub category: NodeCategory,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl GraphNode {
    pub fn tooltip(&self) -> String {
        match self.direction {
            Some(direction) => format!(
                "<b>Direction</b>: {}<br/><b>Name</b>: {}",
                direction.as_str(),
                self.full_name
            ),
            None => self.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

impl GraphLink {
    pub fn tooltip(&self) -> String {
        format!("<b>Source</b>: {}<br/><b>Target</b>: {}", self.source, self.target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyFilterOption {
    pub kind: DependencyKind,
    pub enabled: bool,
}

/// Dependency kinds offered to the graph, each toggled on or off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyFilter {
    pub options: Vec<DependencyFilterOption>,
}

impl DependencyFilter {
    pub fn from_kinds(kinds: impl IntoIterator<Item = DependencyKind>) -> Self {
        let mut filter = Self::default();
        for kind in kinds {
            filter.set_enabled(kind, true);
        }
        filter
    }

    pub fn allows(&self, kind: &DependencyKind) -> bool {
        self.options
            .iter()
            .any(|option| option.enabled && &option.kind == kind)
    }

    pub fn set_enabled(&mut self, kind: DependencyKind, enabled: bool) {
        match self.options.iter_mut().find(|option| option.kind == kind) {
            Some(option) => option.enabled = enabled,
            None => self.options.push(DependencyFilterOption { kind, enabled }),
        }
    }

    pub fn enabled_kinds(&self) -> Vec<&DependencyKind> {
        self.options
            .iter()
            .filter(|option| option.enabled)
            .map(|option| &option.kind)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNoteRecord {
    pub uri: String,
    #[serde(flatten)]
    pub note: Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSource {
    Project,
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFeedEntry {
    #[serde(rename = "type")]
    pub source: NoteSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub updated: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Arc<AssetNode>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
