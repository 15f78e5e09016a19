//! The two kinds of media server this tool talks to.
//!
//! Both expose the same queue/history/command API, they differ in the command
//! names they accept and in how a repaired file is confirmed.

use clap::ValueEnum;
use serde::Deserialize;

use super::error::ApiError;
use super::models::CommandBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerFlavor {
    /// TV series server (Sonarr-like).
    #[default]
    Series,
    /// Movie server (Radarr-like).
    Movies,
}

impl ServerFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerFlavor::Series => "series",
            ServerFlavor::Movies => "movies",
        }
    }

    /// Full library rescan from disk.
    pub fn rescan_command(&self) -> CommandBody {
        match self {
            ServerFlavor::Series => CommandBody::named("RescanSeries"),
            ServerFlavor::Movies => CommandBody::named("RescanMovie"),
        }
    }

    /// Rename files of the given series or movies to the server's naming scheme.
    pub fn rename_command(&self, ids: Vec<i64>) -> CommandBody {
        match self {
            ServerFlavor::Series => CommandBody {
                name: "RenameSeries".to_string(),
                series_ids: ids,
                ..Default::default()
            },
            ServerFlavor::Movies => CommandBody {
                name: "RenameMovies".to_string(),
                movie_ids: ids,
                ..Default::default()
            },
        }
    }

    pub fn check_finished_downloads_command(&self) -> CommandBody {
        CommandBody::named("CheckForFinishedDownload")
    }

    /// Manual import scan of a download folder. Movie servers do not offer it.
    pub fn downloaded_scan_command(&self, path: &str) -> Result<CommandBody, ApiError> {
        match self {
            ServerFlavor::Series => Ok(CommandBody {
                name: "DownloadedEpisodesScan".to_string(),
                path: Some(path.to_string()),
                ..Default::default()
            }),
            ServerFlavor::Movies => Err(ApiError::Unsupported {
                operation: "DownloadedEpisodesScan",
                flavor: self.as_str(),
            }),
        }
    }
}

impl std::fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
