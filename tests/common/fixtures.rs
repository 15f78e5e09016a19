use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::constants::SERIES_ID;

/// Download folder and library folder of one test.
pub struct TestDirs {
    pub downloads: TempDir,
    pub library: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            downloads: TempDir::new().unwrap(),
            library: TempDir::new().unwrap(),
        }
    }

    /// Create a downloaded file, with its parent folders, and return its path.
    pub fn add_download(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.downloads.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn library_file(&self, name: &str) -> PathBuf {
        self.library.path().join(name)
    }
}

/// Stalled queue entry as a Sonarr-like server returns it.
pub fn queue_entry(
    id: i64,
    download_id: &str,
    season: i32,
    episode: i32,
    series_path: &Path,
    files: &[&str],
) -> Value {
    let status_messages: Vec<Value> = files
        .iter()
        .map(|f| {
            json!({
                "title": f,
                "messages": ["No files found are eligible for import"],
            })
        })
        .collect();
    json!({
        "id": id,
        "downloadId": download_id,
        "title": format!("Show.S{:02}E{:02}", season, episode),
        "status": "Completed",
        "trackedDownloadStatus": "Warning",
        "statusMessages": status_messages,
        "protocol": "torrent",
        "episode": {
            "id": episode_id(season, episode),
            "seriesId": SERIES_ID,
            "seasonNumber": season,
            "episodeNumber": episode,
            "title": "Pilot",
            "hasFile": false,
        },
        "series": {
            "id": SERIES_ID,
            "title": "Show",
            "path": series_path.to_string_lossy(),
        },
    })
}

pub fn history_record(download_id: &str, season: i32, episode: i32, source_title: &str) -> Value {
    json!({
        "id": episode_id(season, episode) * 7,
        "downloadId": download_id,
        "sourceTitle": source_title,
        "eventType": "downloadFolderImported",
        "date": "2024-03-01T20:15:00Z",
        "episode": {
            "id": episode_id(season, episode),
            "seasonNumber": season,
            "episodeNumber": episode,
        },
    })
}

pub fn episode_id(season: i32, episode: i32) -> i64 {
    (season * 100 + episode) as i64
}
