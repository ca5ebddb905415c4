use crate::models::{AssetNode, AssetNoteRecord, Note, NoteFeedEntry, NoteSource, Project};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const NOTE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of "now" for note timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn from_timestamp_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn format_note_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format(NOTE_DATE_FORMAT).to_string()
}

pub fn get_note_date() -> String {
    note_date(&SystemClock)
}

pub fn note_date(clock: &dyn Clock) -> String {
    format_note_date(clock.now())
}

pub fn create_note(author: &str, content: &str) -> Note {
    create_note_with_clock(&SystemClock, author, content)
}

pub fn create_note_with_clock(clock: &dyn Clock, author: &str, content: &str) -> Note {
    Note {
        id: Uuid::new_v4().to_string(),
        author: author.to_string(),
        content: content.to_string(),
        updated: note_date(clock),
    }
}

/// Collects every note in the tree, tagged with the owning asset's uri, in
/// pre-order.
pub fn get_all_notes(assets: &AssetNode) -> Vec<AssetNoteRecord> {
    let mut records = Vec::new();
    let mut stack: Vec<&AssetNode> = vec![assets];
    while let Some(node) = stack.pop() {
        for note in node.notes.iter().flatten() {
            records.push(AssetNoteRecord {
                uri: node.uri.clone(),
                note: note.clone(),
            });
        }
        stack.extend(node.child_nodes().iter().rev().map(Arc::as_ref));
    }
    tracing::debug!(uri = %assets.uri, count = records.len(), "collected asset notes");
    records
}

/// Project notes first, then asset notes. `None` when there is nothing to show.
pub fn note_feed(project: &Project) -> Option<Vec<NoteFeedEntry>> {
    let project_entries = project.notes.iter().flatten().map(|note| NoteFeedEntry {
        source: NoteSource::Project,
        uri: None,
        updated: note.updated.clone(),
        author: note.author.clone(),
        content: note.content.clone(),
    });
    let asset_entries = project
        .assets
        .as_deref()
        .map(get_all_notes)
        .unwrap_or_default()
        .into_iter()
        .map(|record| NoteFeedEntry {
            source: NoteSource::Asset,
            uri: Some(record.uri),
            updated: record.note.updated,
            author: record.note.author,
            content: record.note.content,
        });

    let feed: Vec<NoteFeedEntry> = project_entries.chain(asset_entries).collect();
    if feed.is_empty() {
        None
    } else {
        Some(feed)
    }
}

/// Case-insensitive substring match over content, author and uri.
pub fn search_note_feed(feed: &[NoteFeedEntry], text: &str) -> Vec<NoteFeedEntry> {
    if text.is_empty() {
        return feed.to_vec();
    }
    let needle = text.to_lowercase();
    let matches = |value: &str| value.to_lowercase().contains(&needle);
    feed.iter()
        .filter(|entry| {
            matches(&entry.content) || matches(&entry.author) || entry.uri.as_deref().is_some_and(matches)
        })
        .cloned()
        .collect()
}
