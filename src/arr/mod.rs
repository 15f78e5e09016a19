//! Media server API.
//!
//! `MediaServerApi` is the seam between the repair pipeline and the server;
//! `ArrClient` implements it over HTTP.

mod client;
mod error;
mod flavor;
mod models;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ArrClient, HISTORY_PAGE_SIZE};
pub use error::ApiError;
pub use flavor::ServerFlavor;
pub use models::*;

/// Remote operations the pipeline needs from the media server.
pub trait MediaServerApi {
    fn flavor(&self) -> ServerFlavor;

    fn get_queue(&self) -> Result<Vec<QueueEntry>, ApiError>;

    /// Remove one entry from the download queue.
    fn delete_queue_item(&self, id: i64) -> Result<(), ApiError>;

    /// Fetch one page (1-based) of the download history, newest first.
    fn get_history(&self, page: u32) -> Result<HistoryPage, ApiError>;

    fn get_episode(&self, id: i64) -> Result<Episode, ApiError>;

    fn get_movie(&self, id: i64) -> Result<Movie, ApiError>;

    /// Submit a command. The returned status carries the id to poll.
    fn execute_command(&self, command: &CommandBody) -> Result<CommandStatus, ApiError>;

    fn get_command_status(&self, id: i64) -> Result<CommandStatus, ApiError>;
}
