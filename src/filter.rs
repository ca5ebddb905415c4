use crate::metadata::get_handler_metadata;
use crate::models::AssetNode;
use crate::settings::default_settings;
use std::sync::Arc;

struct Frame<'a> {
    node: &'a Arc<AssetNode>,
    next_child: usize,
    kept: Vec<Arc<AssetNode>>,
    changed: bool,
}

impl<'a> Frame<'a> {
    fn new(node: &'a Arc<AssetNode>) -> Self {
        Self {
            node,
            next_child: 0,
            kept: Vec::new(),
            changed: false,
        }
    }

    fn finish(self) -> Arc<AssetNode> {
        if !self.changed {
            return Arc::clone(self.node);
        }
        Arc::new(self.node.with_replaced_children(Some(self.kept)))
    }
}

pub fn is_asset_included(asset: &AssetNode, handler_id: &str) -> bool {
    !get_handler_metadata(handler_id, asset.metadata.as_deref())
        .map(|entry| entry.is_excluded())
        .unwrap_or(false)
}

/// Drops every asset the file handler marked `include: false`, together with
/// its whole subtree.
pub fn filter_included_file_assets(asset: &Arc<AssetNode>) -> Option<Arc<AssetNode>> {
    filter_included_assets_with(asset, &default_settings().file_handler_id)
}

/// Filters by an arbitrary handler's include flag.
///
/// The input is never modified. Nodes on a path to a removed child are copied;
/// subtrees with nothing removed are returned as the same `Arc`, so filtering
/// an already filtered tree hands back the identical tree.
pub fn filter_included_assets_with(asset: &Arc<AssetNode>, handler_id: &str) -> Option<Arc<AssetNode>> {
    if !is_asset_included(asset, handler_id) {
        tracing::debug!(uri = %asset.uri, handler_id, "asset excluded; dropping subtree");
        return None;
    }

    let mut dropped = 0usize;
    let mut stack = vec![Frame::new(asset)];
    loop {
        let Some(top) = stack.last_mut() else {
            return None;
        };
        let node: &Arc<AssetNode> = top.node;
        if let Some(child) = node.child_nodes().get(top.next_child) {
            top.next_child += 1;
            if is_asset_included(child, handler_id) {
                stack.push(Frame::new(child));
            } else {
                top.changed = true;
                dropped += 1;
            }
            continue;
        }

        let finished = match stack.pop() {
            Some(frame) => frame.finish(),
            None => return None,
        };
        match stack.last_mut() {
            Some(parent) => {
                let child = parent.node.child_nodes().get(parent.next_child - 1);
                if !child.is_some_and(|original| Arc::ptr_eq(original, &finished)) {
                    parent.changed = true;
                }
                parent.kept.push(finished);
            }
            None => {
                tracing::debug!(uri = %asset.uri, dropped, "filtered asset tree");
                return Some(finished);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::find_descendant_asset_by_uri;
    use crate::models::HandlerMetadata;
    use serde_json::json;

    fn file_meta(include: bool) -> HandlerMetadata {
        HandlerMetadata::new("StatWrap.FileHandler").with_field("include", json!(include))
    }

    fn asset(uri: &str, include: bool) -> AssetNode {
        AssetNode::new(uri).with_metadata(file_meta(include))
    }

    fn mixed_tree() -> Arc<AssetNode> {
        Arc::new(asset("/Test/Asset", true).with_children(vec![
            asset("/Test/Asset/Child1", false),
            asset("/Test/Asset/Child2", false).with_children(vec![asset("/Test/Asset/Child2/Child1", true)]),
            asset("/Test/Asset/Child3", true).with_children(vec![
                asset("/Test/Asset/Child3/Child1", false),
                asset("/Test/Asset/Child3/Child2", true),
            ]),
        ]))
    }

    #[test]
    fn excluded_root_yields_none() {
        let root = Arc::new(asset("/Test/Asset", false));
        assert!(filter_included_file_assets(&root).is_none());
    }

    #[test]
    fn missing_children_stay_missing() {
        let root = Arc::new(asset("/Test/Asset", true));
        let filtered = filter_included_file_assets(&root).expect("included");
        assert!(filtered.children.is_none());

        let mut empty = asset("/Test/Asset", true);
        empty.children = Some(Vec::new());
        let empty = Arc::new(empty);
        let filtered = filter_included_file_assets(&empty).expect("included");
        assert_eq!(filtered.children.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn all_children_excluded_leaves_empty_children() {
        let root = Arc::new(asset("/Test/Asset", true).with_children(vec![
            asset("/Test/Asset/Child1", false),
            asset("/Test/Asset/Child2", false),
        ]));
        let filtered = filter_included_file_assets(&root).expect("included");
        assert_eq!(filtered.children.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn keeps_included_children_in_order() {
        let root = Arc::new(asset("/Test/Asset", true).with_children(vec![
            asset("/Test/Asset/Child1", true),
            asset("/Test/Asset/Child2", false),
            asset("/Test/Asset/Child3", true),
        ]));
        let filtered = filter_included_file_assets(&root).expect("included");
        let uris: Vec<&str> = filtered.child_nodes().iter().map(|child| child.uri.as_str()).collect();
        assert_eq!(uris, vec!["/Test/Asset/Child1", "/Test/Asset/Child3"]);
    }

    #[test]
    fn exclusion_cascades_and_input_is_untouched() {
        let root = mixed_tree();
        let before = (*root).clone();
        let filtered = filter_included_file_assets(&root).expect("included");

        assert_eq!(filtered.child_nodes().len(), 1);
        let child3 = &filtered.child_nodes()[0];
        assert_eq!(child3.uri, "/Test/Asset/Child3");
        assert_eq!(child3.child_nodes().len(), 1);
        assert_eq!(child3.child_nodes()[0].uri, "/Test/Asset/Child3/Child2");
        assert!(find_descendant_asset_by_uri(&filtered, "/Test/Asset/Child2/Child1").is_none());

        assert_eq!(*root, before);
        assert_eq!(root.child_nodes().len(), 3);
        assert_eq!(root.child_nodes()[2].child_nodes()[1].uri, "/Test/Asset/Child3/Child2");
        assert!(find_descendant_asset_by_uri(&root, "/Test/Asset/Child2/Child1").is_some());
    }

    #[test]
    fn untouched_subtrees_are_shared() {
        let root = mixed_tree();
        let filtered = filter_included_file_assets(&root).expect("included");
        let original_leaf = &root.child_nodes()[2].child_nodes()[1];
        let filtered_leaf = &filtered.child_nodes()[0].child_nodes()[0];
        assert!(Arc::ptr_eq(original_leaf, filtered_leaf));
        assert!(!Arc::ptr_eq(&root, &filtered));

        let clean = Arc::new(asset("/clean", true).with_children(vec![asset("/clean/a", true)]));
        let same = filter_included_file_assets(&clean).expect("included");
        assert!(Arc::ptr_eq(&clean, &same));
    }

    #[test]
    fn filtering_is_idempotent() {
        let root = mixed_tree();
        let once = filter_included_file_assets(&root).expect("once");
        let twice = filter_included_file_assets(&once).expect("twice");
        assert_eq!(once, twice);
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn filtered_copy_carries_all_fields() {
        let root = Arc::new(
            asset("/root", true)
                .with_extra("custom", json!("kept"))
                .with_children(vec![asset("/root/gone", false)]),
        );
        let filtered = filter_included_file_assets(&root).expect("included");
        assert_eq!(filtered.extra.get("custom"), Some(&json!("kept")));
        assert_eq!(filtered.metadata, root.metadata);
    }

    #[test]
    fn non_boolean_include_counts_as_included() {
        let root = Arc::new(AssetNode::new("/root").with_children(vec![
            AssetNode::new("/root/a").with_metadata(
                HandlerMetadata::new("StatWrap.FileHandler").with_field("include", json!("false")),
            ),
            AssetNode::new("/root/b").with_metadata(HandlerMetadata::new("StatWrap.FileHandler")),
            AssetNode::new("/root/c")
                .with_metadata(HandlerMetadata::new("Other.Handler").with_field("include", json!(false))),
        ]));
        let filtered = filter_included_file_assets(&root).expect("included");
        assert_eq!(filtered.child_nodes().len(), 3);
    }

    #[test]
    fn custom_handler_id_is_honoured() {
        let root = Arc::new(AssetNode::new("/root").with_children(vec![AssetNode::new("/root/a")
            .with_metadata(HandlerMetadata::new("Other.Handler").with_field("include", json!(false)))]));
        let filtered = filter_included_assets_with(&root, "Other.Handler").expect("included");
        assert_eq!(filtered.child_nodes().len(), 0);
    }
}
