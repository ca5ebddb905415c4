use crate::models::{AssetNode, HandlerMetadata};
use std::collections::HashMap;

/// Returns the first entry whose `id` equals `handler_id` exactly.
///
/// Absent or empty metadata, an empty handler id and null entries are all
/// tolerated and simply produce no match.
pub fn get_handler_metadata<'a>(
    handler_id: &str,
    metadata: Option<&'a [Option<HandlerMetadata>]>,
) -> Option<&'a HandlerMetadata> {
    if handler_id.is_empty() {
        return None;
    }
    metadata?
        .iter()
        .flatten()
        .find(|entry| entry.id.as_deref() == Some(handler_id))
}

/// Handler-id keyed view over a metadata sequence. Duplicate ids resolve to
/// the first occurrence, matching [`get_handler_metadata`].
#[derive(Debug, Clone, Default)]
pub struct HandlerMetadataIndex<'a> {
    entries: HashMap<&'a str, &'a HandlerMetadata>,
}

impl<'a> HandlerMetadataIndex<'a> {
    pub fn new(metadata: Option<&'a [Option<HandlerMetadata>]>) -> Self {
        let mut entries = HashMap::new();
        for entry in metadata.unwrap_or(&[]).iter().flatten() {
            let Some(id) = entry.id.as_deref() else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            entries.entry(id).or_insert(entry);
        }
        Self { entries }
    }

    pub fn for_asset(asset: &'a AssetNode) -> Self {
        Self::new(asset.metadata.as_deref())
    }

    pub fn get(&self, handler_id: &str) -> Option<&'a HandlerMetadata> {
        self.entries.get(handler_id).copied()
    }

    pub fn contains(&self, handler_id: &str) -> bool {
        self.entries.contains_key(handler_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetNode {
    pub fn handler_metadata(&self, handler_id: &str) -> Option<&HandlerMetadata> {
        get_handler_metadata(handler_id, self.metadata.as_deref())
    }
}
