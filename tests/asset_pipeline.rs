use serde_json::json;
use statwrap_core::{
    filter_included_file_assets, find_descendant_asset_by_uri, get_all_dependencies_as_graph, get_all_notes,
    note_feed, parse_asset_tree, search_note_feed, AppError, DependencyFilter, DependencyGraphView, DependencyKind,
    NodeCategory, ProjectService, ProjectStore,
};
use std::fs;
use std::sync::Arc;

fn project_tree() -> serde_json::Value {
    json!({
        "uri": "/project",
        "type": "directory",
        "metadata": [{ "id": "StatWrap.FileHandler", "include": true }],
        "children": [
            {
                "uri": "/project/analysis.py",
                "type": "file",
                "metadata": [
                    null,
                    { "id": "StatWrap.FileHandler", "include": true },
                    { "id": "StatWrap.PythonHandler" }
                ],
                "notes": [
                    { "id": "n1", "author": "Alice", "content": "Uses the cleaned survey", "updated": "2020-10-30 19:03:43" }
                ],
                "dependencies": [
                    { "id": "pandas", "kind": "library" },
                    { "id": "/project/data/survey.csv", "kind": "data", "direction": "input" },
                    { "id": "/project/figures/plot.png", "kind": "figure", "direction": "output" }
                ]
            },
            {
                "uri": "/project/model.R",
                "type": "file",
                "metadata": [{ "id": "StatWrap.RHandler" }],
                "dependencies": [
                    { "id": "pandas", "kind": "library" },
                    { "id": "/project/data/survey.csv", "kind": "data", "direction": "input" }
                ]
            },
            {
                "uri": "/project/scratch",
                "type": "directory",
                "metadata": [{ "id": "StatWrap.FileHandler", "include": false }],
                "children": [
                    {
                        "uri": "/project/scratch/old.py",
                        "metadata": [{ "id": "StatWrap.FileHandler", "include": true }],
                        "notes": [{ "id": "n2", "author": "Bob", "content": "obsolete", "updated": "2020-10-31 08:00:00" }],
                        "dependencies": [{ "id": "legacy", "kind": "library" }]
                    }
                ]
            }
        ]
    })
}

#[test]
fn filter_then_project_builds_collapsed_graph() {
    let tree = parse_asset_tree(project_tree()).expect("tree");
    let included = filter_included_file_assets(&tree).expect("included");

    assert!(find_descendant_asset_by_uri(&included, "/project/scratch/old.py").is_none());
    assert!(find_descendant_asset_by_uri(&tree, "/project/scratch/old.py").is_some());

    let graph = get_all_dependencies_as_graph(Some(&*included), None).expect("graph");
    let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "/project",
            "/project/analysis.py",
            "pandas",
            "/project/data/survey.csv",
            "/project/figures/plot.png",
            "/project/model.R",
        ]
    );
    assert_eq!(graph.links.len(), 5);
    assert!(graph.nodes.iter().all(|node| node.id != "legacy"));

    let categories: Vec<NodeCategory> = graph.nodes.iter().map(|node| node.category).collect();
    assert_eq!(
        categories,
        vec![
            NodeCategory::Generic,
            NodeCategory::Python,
            NodeCategory::Library,
            NodeCategory::Data,
            NodeCategory::Figure,
            NodeCategory::R,
        ]
    );

    let pandas_links = graph.links.iter().filter(|link| link.source == "pandas").count();
    assert_eq!(pandas_links, 2);
}

#[test]
fn graph_serializes_for_rendering() {
    let tree = parse_asset_tree(project_tree()).expect("tree");
    let included = filter_included_file_assets(&tree).expect("included");
    let filter = DependencyFilter::from_kinds([DependencyKind::Figure]);
    let graph = get_all_dependencies_as_graph(Some(&*included), Some(&filter)).expect("graph");
    let value = serde_json::to_value(&graph).expect("serialize");

    assert_eq!(
        value["nodes"][2],
        json!({
            "id": "/project/figures/plot.png",
            "name": "plot.png",
            "fullName": "/project/figures/plot.png",
            "value": "figure",
            "category": "figure",
            "symbol": "image://./images/figure.svg",
            "direction": "output"
        })
    );
    assert_eq!(
        value["links"],
        json!([{ "source": "/project/analysis.py", "target": "/project/figures/plot.png" }])
    );
}

#[test]
fn notes_are_aggregated_from_included_assets_only() {
    let tree = parse_asset_tree(project_tree()).expect("tree");
    assert_eq!(get_all_notes(&tree).len(), 2);

    let included = filter_included_file_assets(&tree).expect("included");
    let notes = get_all_notes(&included);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].uri, "/project/analysis.py");
    assert_eq!(notes[0].note.author, "Alice");
}

#[test]
fn graph_view_keeps_both_recompute_paths() {
    let tree = parse_asset_tree(project_tree()).expect("tree");
    let mut view = DependencyGraphView::new(Some(Arc::clone(&tree)));
    assert_eq!(
        view.filter().enabled_kinds(),
        vec![&DependencyKind::Library, &DependencyKind::Data, &DependencyKind::Figure]
    );

    let libraries = DependencyFilter::from_kinds([DependencyKind::Library]);
    view.apply_filter_to_included(libraries.clone());
    let included_ids: Vec<String> = view
        .graph()
        .expect("graph")
        .nodes
        .iter()
        .map(|node| node.id.clone())
        .collect();
    assert!(!included_ids.contains(&"legacy".to_string()));

    view.apply_filter_to_source(libraries);
    let source_ids: Vec<String> = view
        .graph()
        .expect("graph")
        .nodes
        .iter()
        .map(|node| node.id.clone())
        .collect();
    assert!(source_ids.contains(&"legacy".to_string()));
    assert!(source_ids.contains(&"/project/scratch".to_string()));
}

#[test]
fn malformed_tree_is_reported() {
    let error = parse_asset_tree(json!({ "uri": "/project", "children": { "uri": "/x" } })).expect_err("malformed");
    assert!(matches!(error, AppError::MalformedTree(_)));
}

#[test]
fn project_loaded_from_disk_feeds_notes() {
    let home = tempfile::tempdir().expect("home");
    let project_dir = home.path().join("projects/survey");
    fs::create_dir_all(&project_dir).expect("project dir");
    let descriptor = json!({
        "id": "d01d2925-f6ff-4f8e-988f-fca2ee193427",
        "name": "Survey",
        "notes": [{ "id": "p1", "author": "Carol", "content": "Kickoff", "updated": "2020-10-29 10:00:00" }],
        "assets": project_tree()
    });
    fs::write(
        project_dir.join(".statwrap-project.json"),
        serde_json::to_vec_pretty(&descriptor).expect("descriptor"),
    )
    .expect("write descriptor");

    let service = ProjectService::new().with_home_dir(home.path());
    let store: &dyn ProjectStore = &service;
    let project = store
        .load_project("~/projects/survey")
        .expect("load")
        .expect("project exists");

    let feed = note_feed(&project).expect("feed");
    assert_eq!(feed.len(), 3);
    assert_eq!(search_note_feed(&feed, "alice").len(), 1);
    assert_eq!(search_note_feed(&feed, "scratch").len(), 1);

    assert!(store.load_project("~/projects/missing").expect("load").is_none());
    assert!(store
        .load_project_list(Some(home.path().join("none.json").as_path()))
        .expect("list")
        .is_empty());
}
