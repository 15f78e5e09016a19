use std::path::PathBuf;

use crate::arr::{HistoryRecord, QueueEntry};

/// A stalled queue entry paired with the history record of its release.
///
/// Lives for a single run: built by the matcher, updated while the file is
/// repaired, read by the cleaner.
#[derive(Debug, Clone)]
pub struct MatchedItem {
    pub queue_entry: QueueEntry,
    pub history_record: HistoryRecord,
    pub has_been_renamed: bool,
    /// Where the file ended up, once relocated.
    pub destination: Option<PathBuf>,
    /// Why the repair of this item was abandoned.
    pub failure: Option<String>,
    /// Removed from the server's queue by the cleaner.
    pub cleared: bool,
}

impl MatchedItem {
    pub fn new(queue_entry: QueueEntry, history_record: HistoryRecord) -> Self {
        Self {
            queue_entry,
            history_record,
            has_been_renamed: false,
            destination: None,
            failure: None,
            cleared: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.queue_entry.title
    }

    pub fn mark_renamed(&mut self, destination: PathBuf) {
        self.has_been_renamed = true;
        self.destination = Some(destination);
        self.failure = None;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
    }

    /// Series or movie id the item belongs to, used to target rename commands.
    pub fn library_id(&self) -> Option<i64> {
        let entry = &self.queue_entry;
        entry
            .series
            .as_ref()
            .map(|s| s.id)
            .or_else(|| entry.movie.as_ref().map(|m| m.id))
    }

    /// Short description of where this item stands, for the run summary.
    pub fn status_label(&self) -> String {
        if self.cleared {
            "cleared".to_string()
        } else if self.has_been_renamed {
            "renamed".to_string()
        } else if let Some(reason) = &self.failure {
            format!("skipped: {}", reason)
        } else {
            "pending".to_string()
        }
    }
}
