//! Pairs stalled queue entries with the history record of their release.
//!
//! History is paged, newest first. Pages are pulled lazily through a
//! [`HistoryCursor`] only when the records loaded so far don't contain a match,
//! and each page is requested at most once per run.

use tracing::{debug, info, warn};

use crate::arr::{ApiError, HistoryPage, HistoryRecord, MediaServerApi, QueueEntry};

use super::item::MatchedItem;

/// Lazily extended view over the server's download history.
pub struct HistoryCursor<'a, A: MediaServerApi + ?Sized> {
    api: &'a A,
    records: Vec<HistoryRecord>,
    last_page: u32,
    exhausted: bool,
}

impl<'a, A: MediaServerApi + ?Sized> HistoryCursor<'a, A> {
    /// Start from an already fetched first page.
    pub fn new(api: &'a A, first_page: HistoryPage) -> Self {
        let exhausted = first_page.is_end();
        Self {
            api,
            last_page: first_page.page.max(1),
            records: first_page.records,
            exhausted,
        }
    }

    /// Number of the last page requested from the server.
    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    /// True once the server reported there is nothing past the last page.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Iterate over every history record, fetching further pages on demand.
    pub fn records(&mut self) -> HistoryRecords<'_, 'a, A> {
        HistoryRecords {
            cursor: self,
            position: 0,
        }
    }

    /// First history record describing the download behind `entry`.
    ///
    /// `Ok(None)` means the whole history was walked without a match.
    pub fn find_match(&mut self, entry: &QueueEntry) -> Result<Option<HistoryRecord>, ApiError> {
        for record in self.records() {
            let record = record?;
            if record.matches(entry) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn fetch_next_page(&mut self) -> Result<(), ApiError> {
        let page_number = self.last_page + 1;
        let page = self.api.get_history(page_number)?;
        self.last_page = page_number;
        if page.is_end() {
            debug!("History exhausted at page {}", page_number);
            self.exhausted = true;
        } else {
            debug!(
                "Loaded history page {} ({} records)",
                page_number,
                page.records.len()
            );
            self.records.extend(page.records);
        }
        Ok(())
    }
}

/// Iterator returned by [`HistoryCursor::records`].
pub struct HistoryRecords<'c, 'a, A: MediaServerApi + ?Sized> {
    cursor: &'c mut HistoryCursor<'a, A>,
    position: usize,
}

impl<A: MediaServerApi + ?Sized> Iterator for HistoryRecords<'_, '_, A> {
    type Item = Result<HistoryRecord, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.cursor.records.get(self.position) {
                self.position += 1;
                return Some(Ok(record.clone()));
            }
            if self.cursor.exhausted {
                return None;
            }
            if let Err(e) = self.cursor.fetch_next_page() {
                return Some(Err(e));
            }
        }
    }
}

/// Finds queue entries whose import got stuck and the release they came from.
pub struct QueueHistoryMatcher<'a, A: MediaServerApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: MediaServerApi + ?Sized> QueueHistoryMatcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Fetch the queue and the first history page, then match them.
    pub fn load(&self) -> Result<Vec<MatchedItem>, ApiError> {
        let queue = self.api.get_queue()?;
        let first_page = self.api.get_history(1)?;
        self.match_entries(queue, first_page)
    }

    /// Pair every stalled entry of `queue` with its history record.
    ///
    /// Entries are kept in queue order. Entries without a record anywhere in
    /// the history are skipped for this run.
    pub fn match_entries(
        &self,
        queue: Vec<QueueEntry>,
        first_page: HistoryPage,
    ) -> Result<Vec<MatchedItem>, ApiError> {
        let mut history = HistoryCursor::new(self.api, first_page);
        let mut items = Vec::new();

        for entry in queue {
            if !entry.is_stalled() {
                continue;
            }
            match history.find_match(&entry)? {
                Some(record) => {
                    info!("Stalled download detected: {}", entry.title);
                    items.push(MatchedItem::new(entry, record));
                }
                None => {
                    warn!(
                        "No history record found for {} (download id {:?}) after {} pages, skipping",
                        entry.title,
                        entry.download_id,
                        history.last_page()
                    );
                }
            }
        }

        Ok(items)
    }
}
