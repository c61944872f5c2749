//! pollroom library
//!
//! Poll lifecycle and voting engine for chat groups: a concurrent poll
//! store, scheduled expiration sweeps, pure tallying, and durable JSON
//! snapshots across restarts.

pub mod cli;
pub mod config;
pub mod events;
pub mod polls;
pub mod service;
pub mod storage;
