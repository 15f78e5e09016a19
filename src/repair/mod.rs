//! Reconciliation of stalled downloads.
//!
//! The matcher pairs stalled queue entries with their history record, the
//! resolver guesses file names, the relocator moves the file into the library,
//! the waiter drives the server's rescan and the cleaner clears the queue.
//! [`RepairPipeline`] runs them in that order.

mod cleaner;
mod item;
mod matcher;
mod pipeline;
mod relocator;
mod resolver;
mod waiter;

pub use cleaner::{CleanupError, QueueCleaner};
pub use item::MatchedItem;
pub use matcher::{HistoryCursor, QueueHistoryMatcher};
pub use pipeline::{IncompleteRun, PlannedMove, RepairPipeline, RunReport};
pub use relocator::{destination_path, move_file, FileRelocator, RelocateError};
pub use resolver::{guess_file_name, guess_final_name, resolve, ResolveError, ResolvedNames};
pub use waiter::{Clock, CommandError, CommandWaiter, SystemClock, WaitPolicy, WaitState};
