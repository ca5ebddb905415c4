use crate::models::AssetNode;
use std::sync::Arc;

/// Looks one level down for a child whose uri equals `uri` (case-sensitive).
pub fn find_child_asset_by_uri<'a>(asset: &'a AssetNode, uri: &str) -> Option<&'a Arc<AssetNode>> {
    if uri.is_empty() {
        return None;
    }
    asset.children.as_ref()?.iter().find(|child| child.uri == uri)
}

/// Depth-first, pre-order search of `asset` and everything below it. The
/// root itself is a candidate.
pub fn find_descendant_asset_by_uri<'a>(asset: &'a AssetNode, uri: &str) -> Option<&'a AssetNode> {
    if uri.is_empty() {
        return None;
    }

    let mut stack: Vec<&AssetNode> = vec![asset];
    while let Some(node) = stack.pop() {
        if node.uri == uri {
            return Some(node);
        }
        // reversed so the leftmost child is visited first
        stack.extend(node.child_nodes().iter().rev().map(Arc::as_ref));
    }
    None
}
