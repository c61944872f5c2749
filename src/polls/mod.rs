//! Polling Module
//!
//! Poll lifecycle and voting: the store that owns all poll records, the
//! expiration sweeper, and pure vote tallying over snapshots.

pub mod stats;
pub mod store;
pub mod sweeper;
pub mod types;

pub use stats::{tally, PollTally, TallyEntry};
pub use store::{create_store, PollStore, PollStoreStats};
pub use sweeper::{sweep_once, sweeper_loop};
pub use types::{EndOutcome, NewPoll, Poll, PollError, PollId, PollStatus, VoteOutcome};
