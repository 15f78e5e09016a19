//! Common test infrastructure
//!
//! End-to-end tests run the repair pipeline against a fake media server
//! listening on a local port, with real download and library directories.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{ArrState, TestArrServer, TestDirs};
//!
//! #[test]
//! fn test_empty_queue() {
//!     let dirs = TestDirs::new();
//!     let server = TestArrServer::spawn(ArrState::default());
//!     let client = server.client(ServerFlavor::Series);
//!     // ...
//! }
//! ```

mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
pub use constants::*;
pub use fixtures::{episode_id, history_record, queue_entry, TestDirs};
pub use server::{ArrState, TestArrServer};
