use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a playlist as returned by the platform.
///
/// `item_id` names the row inside a specific playlist and is what a delete
/// needs; `video_id` names the underlying video and is what duplicate
/// detection and re-insertion use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItemRef {
    pub item_id: String,
    pub video_id: String,
    #[serde(default)]
    pub title: String,
}

/// A single page of a paginated playlist listing.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<PlaylistItemRef>,
    pub next_page_token: Option<String>,
}

/// Items read from the source playlist at the start of a run, in platform order.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub source_playlist_id: String,
    pub items: Vec<PlaylistItemRef>,
}

impl MigrationPlan {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Insert into the destination failed; the item stays in the source.
    Insert,
    /// Item is in the destination but could not be removed from the source.
    Delete,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Insert => f.write_str("InsertError"),
            FailureKind::Delete => f.write_str("DeleteError"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item: PlaylistItemRef,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of one migration run. Lists hold video ids in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationResult {
    pub dry_run: bool,
    pub planned: usize,
    pub added: Vec<String>,
    pub skipped_duplicate: Vec<String>,
    pub removed: Vec<String>,
    pub would_add: Vec<String>,
    pub would_skip: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl MigrationResult {
    pub fn new(planned: usize, dry_run: bool) -> Self {
        Self {
            dry_run,
            planned,
            ..Default::default()
        }
    }

    pub fn record_failure(&mut self, item: &PlaylistItemRef, kind: FailureKind, reason: String) {
        self.failures.push(ItemFailure {
            item: item.clone(),
            kind,
            reason,
        });
    }

    /// Items whose insert failed.
    pub fn insert_failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.failures.iter().filter(|f| f.kind == FailureKind::Insert)
    }

    /// Items that were migrated but are still present in the source.
    pub fn delete_failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.failures.iter().filter(|f| f.kind == FailureKind::Delete)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
