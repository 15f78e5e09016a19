//! One reconciliation run: match, resolve, relocate, rescan, clean.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::arr::{CommandBody, CommandStatus, MediaServerApi};

use super::cleaner::{CleanupError, QueueCleaner};
use super::item::MatchedItem;
use super::matcher::QueueHistoryMatcher;
use super::relocator::{destination_path, FileRelocator};
use super::resolver::{self, ResolvedNames};
use super::waiter::{Clock, CommandWaiter, SystemClock, WaitPolicy};

/// What a run did to each stalled item.
#[derive(Debug)]
pub struct RunReport {
    pub items: Vec<MatchedItem>,
    /// Queue deletions that failed after the rescan.
    pub cleanup_error: Option<CleanupError>,
}

impl RunReport {
    pub fn renamed(&self) -> usize {
        self.items.iter().filter(|i| i.has_been_renamed).count()
    }

    pub fn cleared(&self) -> usize {
        self.items.iter().filter(|i| i.cleared).count()
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|i| i.failure.is_some()).count()
    }
}

/// Context attached to a run that stopped after files were already moved.
///
/// Recover it with `downcast_ref` to show what the run did before failing.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct IncompleteRun {
    pub reason: &'static str,
    pub report: RunReport,
}

/// A move `fix` would perform, computed without touching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedMove {
    Move {
        title: String,
        source: PathBuf,
        destination: PathBuf,
    },
    Skip {
        title: String,
        reason: String,
    },
}

pub struct RepairPipeline<'a, A: MediaServerApi + ?Sized, C: Clock + Clone = SystemClock> {
    api: &'a A,
    relocator: FileRelocator,
    policy: WaitPolicy,
    clock: C,
    rename_after_rescan: bool,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl<'a, A: MediaServerApi + ?Sized> RepairPipeline<'a, A, SystemClock> {
    pub fn new(api: &'a A, download_root: impl Into<PathBuf>, policy: WaitPolicy) -> Self {
        Self::with_clock(api, download_root, policy, SystemClock)
    }
}

impl<'a, A: MediaServerApi + ?Sized, C: Clock + Clone> RepairPipeline<'a, A, C> {
    pub fn with_clock(
        api: &'a A,
        download_root: impl Into<PathBuf>,
        policy: WaitPolicy,
        clock: C,
    ) -> Self {
        Self {
            api,
            relocator: FileRelocator::new(download_root),
            policy,
            clock,
            rename_after_rescan: false,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask the server to rename library files once the rescan is done.
    pub fn rename_after_rescan(mut self, enabled: bool) -> Self {
        self.rename_after_rescan = enabled;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Submit `command` and wait for it with the configured policy.
    pub fn execute(&self, command: &CommandBody) -> Result<CommandStatus> {
        let status = CommandWaiter::with_clock(self.api, self.policy.clone(), self.clock.clone())
            .with_deadline(self.deadline)
            .with_cancel_flag(self.cancelled.clone())
            .execute_and_wait(command)?;
        Ok(status)
    }

    /// Repair every stalled download and clear it from the queue.
    pub fn run(&self) -> Result<RunReport> {
        let mut items = QueueHistoryMatcher::new(self.api)
            .load()
            .context("Failed matching queue with history")?;
        if items.is_empty() {
            info!("No stalled download found");
            return Ok(RunReport {
                items,
                cleanup_error: None,
            });
        }
        info!("Found {} stalled downloads", items.len());

        for item in items.iter_mut() {
            if self.cancelled.load(Ordering::SeqCst) {
                bail!("Interrupted before repairing {}", item.title());
            }
            match self.relocate(item) {
                Ok(destination) => {
                    info!("Renamed {} to {:?}", item.title(), destination);
                    item.mark_renamed(destination);
                }
                Err(e) => {
                    error!("Skipping {}: {:#}", item.title(), e);
                    item.mark_failed(format!("{:#}", e));
                }
            }
        }

        if !items.iter().any(|i| i.has_been_renamed) {
            warn!("No file could be renamed, nothing to rescan");
            return Ok(RunReport {
                items,
                cleanup_error: None,
            });
        }

        let rescan = self.api.flavor().rescan_command();
        if let Err(e) = self.execute(&rescan) {
            return Err(e.context(IncompleteRun {
                reason: "Rescan didn't complete",
                report: RunReport {
                    items,
                    cleanup_error: None,
                },
            }));
        }

        if self.rename_after_rescan {
            self.rename_library(&items);
        }

        let cleanup_error = match QueueCleaner::new(self.api).clean(&mut items) {
            Ok(_) => None,
            Err(CleanupError::Unauthorized) => {
                return Err(anyhow!(CleanupError::Unauthorized).context(IncompleteRun {
                    reason: "Queue cleanup aborted",
                    report: RunReport {
                        items,
                        cleanup_error: None,
                    },
                }));
            }
            Err(e) => {
                error!("Some downloads couldn't be removed from the queue: {}", e);
                Some(e)
            }
        };

        Ok(RunReport {
            items,
            cleanup_error,
        })
    }

    /// Match and resolve without moving files or sending commands.
    pub fn plan(&self) -> Result<Vec<PlannedMove>> {
        let items = QueueHistoryMatcher::new(self.api)
            .load()
            .context("Failed matching queue with history")?;

        let planned = items
            .iter()
            .map(|item| {
                let title = item.title().to_string();
                match self.planned_paths(item) {
                    Ok((source, destination)) => PlannedMove::Move {
                        title,
                        source,
                        destination,
                    },
                    Err(e) => PlannedMove::Skip {
                        title,
                        reason: format!("{:#}", e),
                    },
                }
            })
            .collect();
        Ok(planned)
    }

    fn relocate(&self, item: &MatchedItem) -> Result<PathBuf> {
        let (names, destination_dir) = resolve_target(item)?;
        let destination =
            self.relocator
                .relocate(&names.on_disk, destination_dir, &names.final_name)?;
        Ok(destination)
    }

    fn planned_paths(&self, item: &MatchedItem) -> Result<(PathBuf, PathBuf)> {
        let (names, destination_dir) = resolve_target(item)?;
        let source = self.relocator.locate(&names.on_disk)?;
        let destination = destination_path(&source, destination_dir, &names.final_name);
        Ok((source, destination))
    }

    fn rename_library(&self, items: &[MatchedItem]) {
        let mut ids: Vec<i64> = Vec::new();
        for id in items
            .iter()
            .filter(|i| i.has_been_renamed)
            .filter_map(|i| i.library_id())
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return;
        }

        let command = self.api.flavor().rename_command(ids);
        if let Err(e) = self.execute(&command) {
            warn!("{} didn't complete: {:#}", command.name, e);
        }
    }
}

fn resolve_target(item: &MatchedItem) -> Result<(ResolvedNames, &Path)> {
    let names = resolver::resolve(item)?;
    let destination_dir = item
        .queue_entry
        .destination_dir()
        .map(Path::new)
        .ok_or_else(|| anyhow!("{} has no series or movie path", item.title()))?;
    Ok((names, destination_dir))
}
