//! Removes repaired downloads from the server's queue.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::arr::{ApiError, MediaServerApi, ServerFlavor};

use super::item::MatchedItem;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// The server refused the API key. The pass stops at the first refusal.
    #[error("authorization invalid")]
    Unauthorized,

    /// Every queue deletion that failed during one cleanup pass.
    #[error("{}", .failures.join(", "))]
    Failed { failures: Vec<String> },
}

pub struct QueueCleaner<'a, A: MediaServerApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: MediaServerApi + ?Sized> QueueCleaner<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Delete the queue entry of every renamed item the server now recognizes.
    ///
    /// Expected to run after a rescan. A failed deletion does not stop the
    /// others; all failures are returned together at the end. A 401 from any
    /// request aborts the pass with `CleanupError::Unauthorized`.
    pub fn clean(&self, items: &mut [MatchedItem]) -> Result<usize, CleanupError> {
        let mut failures = Vec::new();
        let mut cleared = 0;

        for item in items.iter_mut() {
            if !item.has_been_renamed {
                continue;
            }
            match self.has_been_detected(item) {
                Ok(true) => {}
                Ok(false) => {
                    info!("{} not yet recognized by the server, keeping it queued", item.title());
                    continue;
                }
                Err(ApiError::Unauthorized) => return Err(CleanupError::Unauthorized),
                Err(e) => {
                    warn!("Couldn't check whether {} was imported: {}", item.title(), e);
                    continue;
                }
            }

            let id = item.queue_entry.id;
            match self.api.delete_queue_item(id) {
                Ok(()) => {
                    info!("Episode cleared from the queue: {}", item.title());
                    item.cleared = true;
                    cleared += 1;
                }
                Err(ApiError::Unauthorized) => return Err(CleanupError::Unauthorized),
                Err(e) => {
                    let failure = format!("queue item {} ({}): {}", id, item.title(), e);
                    error!("Failed to delete {}", failure);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(cleared)
        } else {
            Err(CleanupError::Failed { failures })
        }
    }

    /// Whether the server has picked up the relocated file.
    fn has_been_detected(&self, item: &MatchedItem) -> Result<bool, ApiError> {
        let entry = &item.queue_entry;
        match self.api.flavor() {
            ServerFlavor::Series => match &entry.episode {
                Some(episode) => Ok(self.api.get_episode(episode.id)?.has_file),
                None => {
                    debug!("{} has no episode to check", entry.title);
                    Ok(false)
                }
            },
            ServerFlavor::Movies => match &entry.movie {
                Some(movie) => Ok(self.api.get_movie(movie.id)?.has_file),
                None => {
                    debug!("{} has no movie to check", entry.title);
                    Ok(false)
                }
            },
        }
    }
}
