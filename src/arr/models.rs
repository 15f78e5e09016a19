//! Wire types exchanged with the media server.
//!
//! Only the fields the repair pipeline reads are modelled, everything else in
//! the server's JSON is ignored.

use serde::{Deserialize, Serialize};

/// Completion status of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum QueueStatus {
    #[serde(alias = "queued")]
    Queued,
    #[serde(alias = "downloading")]
    Downloading,
    #[serde(alias = "paused")]
    Paused,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "failed")]
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Health flag the server attaches to a tracked download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum TrackedDownloadStatus {
    #[serde(alias = "ok")]
    Ok,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "error")]
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusMessage {
    pub title: String,
    pub messages: Vec<String>,
}

/// Episode as embedded in queue entries and history records, and as returned
/// by the episode endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Episode {
    pub id: i64,
    pub series_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
    pub has_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub id: i64,
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub has_file: bool,
}

/// A download the server is tracking, possibly stuck on import.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueEntry {
    pub id: i64,
    pub download_id: Option<String>,
    pub title: String,
    pub status: QueueStatus,
    pub tracked_download_status: TrackedDownloadStatus,
    pub status_messages: Vec<StatusMessage>,
    pub episode: Option<Episode>,
    pub series: Option<Series>,
    pub movie: Option<Movie>,
}

impl QueueEntry {
    /// Completed on the client side but flagged by the server, i.e. the import
    /// got stuck.
    pub fn is_stalled(&self) -> bool {
        self.status == QueueStatus::Completed
            && self.tracked_download_status == TrackedDownloadStatus::Warning
    }

    /// `(season, episode)` for series entries, `None` for movies.
    pub fn episode_key(&self) -> Option<(i32, i32)> {
        self.episode
            .as_ref()
            .map(|e| (e.season_number, e.episode_number))
    }

    /// Directory the server expects this title's files in.
    pub fn destination_dir(&self) -> Option<&str> {
        self.series
            .as_ref()
            .map(|s| s.path.as_str())
            .or_else(|| self.movie.as_ref().map(|m| m.path.as_str()))
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryRecord {
    pub id: i64,
    pub download_id: Option<String>,
    pub source_title: String,
    pub event_type: Option<String>,
    pub tracked_download_status: Option<TrackedDownloadStatus>,
    pub episode: Option<Episode>,
}

impl HistoryRecord {
    pub fn episode_key(&self) -> Option<(i32, i32)> {
        self.episode
            .as_ref()
            .map(|e| (e.season_number, e.episode_number))
    }

    /// Whether this record describes the download behind `entry`.
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        entry.download_id.is_some()
            && self.download_id == entry.download_id
            && self.episode_key() == entry.episode_key()
    }
}

/// One page of the server's download history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryPage {
    pub page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub records: Vec<HistoryRecord>,
}

impl HistoryPage {
    /// A page reporting zero page size (or carrying nothing) marks the end of
    /// the history.
    pub fn is_end(&self) -> bool {
        self.page_size == 0 || self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandState {
    Queued,
    Started,
    Completed,
    Failed,
    Aborted,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandStatus {
    pub id: i64,
    pub name: String,
    pub state: CommandState,
}

/// Body posted to the command endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandBody {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub movie_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CommandBody {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}
