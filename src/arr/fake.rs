//! In-memory `MediaServerApi` used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use super::*;

pub(crate) struct FakeServer {
    pub flavor: ServerFlavor,
    pub queue: Vec<QueueEntry>,
    /// `history[0]` is page 1.
    pub history: Vec<Vec<HistoryRecord>>,
    pub episodes: HashMap<i64, Episode>,
    pub movies: HashMap<i64, Movie>,
    pub failing_deletes: Vec<i64>,
    /// Deletions answered with a 401.
    pub refused_deletes: Vec<i64>,
    /// Every episode and movie lookup is answered with a 401.
    pub revoked_key: bool,
    /// Outcome of each submission in order, `Ok` once exhausted.
    pub submit_results: RefCell<VecDeque<Result<(), ApiError>>>,
    /// State reported by each poll in order, `Started` once exhausted.
    pub poll_states: RefCell<VecDeque<Result<CommandState, ApiError>>>,
    pub history_requests: RefCell<Vec<u32>>,
    pub delete_attempts: RefCell<Vec<i64>>,
    pub submitted: RefCell<Vec<CommandBody>>,
    pub polls: Cell<usize>,
}

impl FakeServer {
    pub fn new(flavor: ServerFlavor) -> Self {
        Self {
            flavor,
            queue: Vec::new(),
            history: Vec::new(),
            episodes: HashMap::new(),
            movies: HashMap::new(),
            failing_deletes: Vec::new(),
            refused_deletes: Vec::new(),
            revoked_key: false,
            submit_results: RefCell::new(VecDeque::new()),
            poll_states: RefCell::new(VecDeque::new()),
            history_requests: RefCell::new(Vec::new()),
            delete_attempts: RefCell::new(Vec::new()),
            submitted: RefCell::new(Vec::new()),
            polls: Cell::new(0),
        }
    }

    pub fn with_polls(self, states: Vec<Result<CommandState, ApiError>>) -> Self {
        *self.poll_states.borrow_mut() = states.into();
        self
    }

    pub fn with_submissions(self, results: Vec<Result<(), ApiError>>) -> Self {
        *self.submit_results.borrow_mut() = results.into();
        self
    }

    pub fn first_page(&self) -> HistoryPage {
        self.get_history(1).unwrap()
    }
}

pub(crate) fn stalled_entry(id: i64, download_id: &str, season: i32, episode: i32) -> QueueEntry {
    QueueEntry {
        id,
        download_id: Some(download_id.to_string()),
        title: format!("Entry {}", id),
        status: QueueStatus::Completed,
        tracked_download_status: TrackedDownloadStatus::Warning,
        episode: Some(Episode {
            id: id * 100,
            series_id: 1,
            season_number: season,
            episode_number: episode,
            ..Default::default()
        }),
        series: Some(Series {
            id: 1,
            title: "Show".to_string(),
            path: "/tv/Show".to_string(),
        }),
        ..Default::default()
    }
}

pub(crate) fn history_record(download_id: &str, season: i32, episode: i32, title: &str) -> HistoryRecord {
    HistoryRecord {
        download_id: Some(download_id.to_string()),
        source_title: title.to_string(),
        episode: Some(Episode {
            season_number: season,
            episode_number: episode,
            ..Default::default()
        }),
        ..Default::default()
    }
}

impl MediaServerApi for FakeServer {
    fn flavor(&self) -> ServerFlavor {
        self.flavor
    }

    fn get_queue(&self) -> Result<Vec<QueueEntry>, ApiError> {
        Ok(self.queue.clone())
    }

    fn delete_queue_item(&self, id: i64) -> Result<(), ApiError> {
        self.delete_attempts.borrow_mut().push(id);
        if self.refused_deletes.contains(&id) {
            return Err(ApiError::Unauthorized);
        }
        if self.failing_deletes.contains(&id) {
            return Err(ApiError::Status {
                operation: format!("delete queue item {}", id),
                status: 500,
            });
        }
        Ok(())
    }

    fn get_history(&self, page: u32) -> Result<HistoryPage, ApiError> {
        self.history_requests.borrow_mut().push(page);
        let records = page
            .checked_sub(1)
            .and_then(|i| self.history.get(i as usize))
            .cloned()
            .unwrap_or_default();
        Ok(HistoryPage {
            page,
            page_size: if records.is_empty() { 0 } else { HISTORY_PAGE_SIZE },
            total_records: self.history.iter().map(|p| p.len() as u64).sum(),
            records,
        })
    }

    fn get_episode(&self, id: i64) -> Result<Episode, ApiError> {
        if self.revoked_key {
            return Err(ApiError::Unauthorized);
        }
        self.episodes.get(&id).cloned().ok_or(ApiError::Status {
            operation: "get episode".to_string(),
            status: 404,
        })
    }

    fn get_movie(&self, id: i64) -> Result<Movie, ApiError> {
        if self.revoked_key {
            return Err(ApiError::Unauthorized);
        }
        self.movies.get(&id).cloned().ok_or(ApiError::Status {
            operation: "get movie".to_string(),
            status: 404,
        })
    }

    fn execute_command(&self, command: &CommandBody) -> Result<CommandStatus, ApiError> {
        self.submitted.borrow_mut().push(command.clone());
        if let Some(Err(e)) = self.submit_results.borrow_mut().pop_front() {
            return Err(e);
        }
        Ok(CommandStatus {
            id: self.submitted.borrow().len() as i64,
            name: command.name.clone(),
            state: CommandState::Queued,
        })
    }

    fn get_command_status(&self, id: i64) -> Result<CommandStatus, ApiError> {
        self.polls.set(self.polls.get() + 1);
        let state = self
            .poll_states
            .borrow_mut()
            .pop_front()
            .unwrap_or(Ok(CommandState::Started))?;
        Ok(CommandStatus {
            id,
            name: String::new(),
            state,
        })
    }
}
