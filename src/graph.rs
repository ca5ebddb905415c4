use crate::filter::filter_included_assets_with;
use crate::metadata::HandlerMetadataIndex;
use crate::models::{
    AssetDependency, AssetNode, DependencyFilter, DependencyGraph, DependencyKind, Direction, GraphLink, GraphNode,
    NodeCategory,
};
use crate::settings::{default_settings, CoreSettings};
use std::collections::HashMap;
use std::sync::Arc;

pub const GENERIC_TYPE_TAG: &str = crate::models::GENERIC_KIND;

/// Last path segment of a uri, accepting either separator.
pub fn asset_name_from_uri(uri: &str) -> String {
    let trimmed = uri.trim_end_matches(['/', '\\']);
    match trimmed.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => uri.to_string(),
    }
}

/// Language tag of the first configured code handler that has metadata on the asset.
pub fn asset_language<'a>(asset: &AssetNode, settings: &'a CoreSettings) -> Option<&'a str> {
    let index = HandlerMetadataIndex::for_asset(asset);
    settings
        .code_handlers
        .iter()
        .find(|handler| index.contains(&handler.handler_id))
        .map(|handler| handler.language.as_str())
}

#[derive(Debug, Default)]
struct GraphBuilder {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    positions: HashMap<String, usize>,
}

impl GraphBuilder {
    fn add_node(&mut self, id: &str, name: String, type_tag: &str, direction: Option<Direction>) {
        if self.positions.contains_key(id) {
            return;
        }
        let category = NodeCategory::from_type_tag(type_tag);
        self.positions.insert(id.to_string(), self.nodes.len());
        self.nodes.push(GraphNode {
            id: id.to_string(),
            name,
            full_name: id.to_string(),
            value: type_tag.to_string(),
            category,
            symbol: category.icon(),
            direction,
        });
    }

    fn add_asset(&mut self, asset: &AssetNode, settings: &CoreSettings) {
        let type_tag = asset_language(asset, settings).unwrap_or(GENERIC_TYPE_TAG);
        self.add_node(&asset.uri, asset_name_from_uri(&asset.uri), type_tag, None);
    }

    fn add_dependency(&mut self, asset_uri: &str, dependency: &AssetDependency) {
        let name = dependency
            .name
            .clone()
            .unwrap_or_else(|| asset_name_from_uri(&dependency.id));
        self.add_node(&dependency.id, name, dependency.kind.type_tag(), dependency.direction);

        let (source, target) = match dependency.direction {
            Some(Direction::Output) => (asset_uri, dependency.id.as_str()),
            _ => (dependency.id.as_str(), asset_uri),
        };
        self.links.push(GraphLink {
            source: source.to_string(),
            target: target.to_string(),
        });
    }

    fn finish(self) -> Option<DependencyGraph> {
        if self.nodes.is_empty() {
            return None;
        }
        Some(DependencyGraph {
            nodes: self.nodes,
            links: self.links,
        })
    }
}

/// Projects an (already filtered) asset tree into graph nodes and links.
///
/// Every asset with a uri becomes a node. Each dependency becomes a node keyed
/// by its target id, shared by all assets that reference it, plus one link per
/// declaration. Inputs and libraries point at the asset, outputs away from it.
/// When `filter` is given only its enabled kinds are projected.
pub fn get_all_dependencies_as_graph(
    assets: Option<&AssetNode>,
    filter: Option<&DependencyFilter>,
) -> Option<DependencyGraph> {
    get_all_dependencies_as_graph_with(assets, filter, default_settings())
}

pub fn get_all_dependencies_as_graph_with(
    assets: Option<&AssetNode>,
    filter: Option<&DependencyFilter>,
    settings: &CoreSettings,
) -> Option<DependencyGraph> {
    let root = assets?;
    let mut builder = GraphBuilder::default();
    let mut stack: Vec<&AssetNode> = vec![root];
    while let Some(asset) = stack.pop() {
        stack.extend(asset.child_nodes().iter().rev().map(Arc::as_ref));
        if !asset.has_uri() {
            continue;
        }
        builder.add_asset(asset, settings);
        for dependency in asset.dependencies.iter().flatten() {
            if filter.is_some_and(|filter| !filter.allows(&dependency.kind)) {
                continue;
            }
            if dependency.id.trim().is_empty() {
                tracing::warn!(uri = %asset.uri, kind = dependency.kind.as_str(), "skipping dependency without a target id");
                continue;
            }
            builder.add_dependency(&asset.uri, dependency);
        }
    }
    tracing::debug!(
        uri = %root.uri,
        nodes = builder.nodes.len(),
        links = builder.links.len(),
        "projected dependency graph"
    );
    builder.finish()
}

/// The dependency kinds that occur anywhere in the tree, first-seen order,
/// all enabled.
pub fn workflow_filters(assets: &AssetNode) -> DependencyFilter {
    let mut kinds: Vec<DependencyKind> = Vec::new();
    let mut stack: Vec<&AssetNode> = vec![assets];
    while let Some(asset) = stack.pop() {
        for dependency in asset.dependencies.iter().flatten() {
            if !kinds.contains(&dependency.kind) {
                kinds.push(dependency.kind.clone());
            }
        }
        stack.extend(asset.child_nodes().iter().rev().map(Arc::as_ref));
    }
    DependencyFilter::from_kinds(kinds)
}

/// State behind the dependency graph screen: the source tree, its included
/// subset, the active kind filter and the last projected graph.
///
/// Two recompute paths exist for a filter change. The screen as shipped
/// recomputes from the unfiltered source tree, which also brings excluded
/// assets back into the graph; recomputing from the included tree keeps them
/// out. Which one is intended has not been settled, so both are kept.
#[derive(Debug, Clone)]
pub struct DependencyGraphView {
    settings: CoreSettings,
    source: Option<Arc<AssetNode>>,
    included: Option<Arc<AssetNode>>,
    filter: DependencyFilter,
    graph: Option<DependencyGraph>,
}

impl DependencyGraphView {
    pub fn new(source: Option<Arc<AssetNode>>) -> Self {
        Self::with_settings(source, default_settings().clone())
    }

    pub fn with_settings(source: Option<Arc<AssetNode>>, settings: CoreSettings) -> Self {
        let mut view = Self {
            settings,
            source: None,
            included: None,
            filter: DependencyFilter::default(),
            graph: None,
        };
        view.set_assets(source);
        view
    }

    /// Replaces the source tree and rebuilds the included tree, the default
    /// filter and the unfiltered graph.
    pub fn set_assets(&mut self, source: Option<Arc<AssetNode>>) {
        self.source = source;
        self.included = self
            .source
            .as_ref()
            .and_then(|assets| filter_included_assets_with(assets, &self.settings.file_handler_id));
        match self.source {
            Some(_) => {
                self.filter = self.included.as_deref().map(workflow_filters).unwrap_or_default();
                self.graph = get_all_dependencies_as_graph_with(self.included.as_deref(), None, &self.settings);
            }
            None => {
                self.graph = None;
            }
        }
    }

    /// Stores `filter` and recomputes from the unfiltered source tree.
    pub fn apply_filter_to_source(&mut self, filter: DependencyFilter) {
        self.filter = filter;
        self.graph = match self.source.as_deref() {
            Some(source) => get_all_dependencies_as_graph_with(Some(source), Some(&self.filter), &self.settings),
            None => None,
        };
    }

    /// Stores `filter` and recomputes from the included tree.
    pub fn apply_filter_to_included(&mut self, filter: DependencyFilter) {
        self.filter = filter;
        self.graph = match self.source {
            Some(_) => get_all_dependencies_as_graph_with(self.included.as_deref(), Some(&self.filter), &self.settings),
            None => None,
        };
    }

    pub fn source(&self) -> Option<&Arc<AssetNode>> {
        self.source.as_ref()
    }

    pub fn included(&self) -> Option<&Arc<AssetNode>> {
        self.included.as_ref()
    }

    pub fn filter(&self) -> &DependencyFilter {
        &self.filter
    }

    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_ref()
    }

    pub fn has_renderable_graph(&self) -> bool {
        self.graph.as_ref().is_some_and(|graph| !graph.nodes.is_empty())
    }
}
