pub mod errors;
pub mod filter;
pub mod graph;
pub mod locator;
pub mod metadata;
pub mod models;
pub mod notes;
pub mod project;
pub mod settings;

pub use crate::errors::{AppError, AppResult};
pub use crate::filter::{filter_included_assets_with, filter_included_file_assets, is_asset_included};
pub use crate::graph::{
    asset_name_from_uri, get_all_dependencies_as_graph, get_all_dependencies_as_graph_with, workflow_filters,
    DependencyGraphView,
};
pub use crate::locator::{find_child_asset_by_uri, find_descendant_asset_by_uri};
pub use crate::metadata::{get_handler_metadata, HandlerMetadataIndex};
pub use crate::models::{
    parse_asset_tree, parse_asset_tree_str, AssetDependency, AssetNode, AssetNoteRecord, AssetType, DependencyFilter,
    DependencyFilterOption, DependencyGraph, DependencyKind, Direction, GraphLink, GraphNode, HandlerMetadata,
    Note, NodeCategory, NoteFeedEntry, NoteSource, Project, ProjectListEntry,
};
pub use crate::notes::{
    create_note, create_note_with_clock, get_all_notes, get_note_date, note_date, note_feed, search_note_feed, Clock,
    FixedClock, SystemClock,
};
pub use crate::project::{ProjectService, ProjectStore};
pub use crate::settings::CoreSettings;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Installs a JSON subscriber writing to a daily rolling file under `log_dir`.
/// The level comes from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "statwrap-core.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
