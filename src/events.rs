//! Closure Events
//!
//! When a poll closes, the engine emits an event so the transport layer can
//! announce the result and strip the voting controls from the original
//! message. Delivery is best-effort: the state transition is already
//! authoritative by the time the event goes out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::polls::types::{Poll, PollId};

/// Why a poll closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    /// The deadline passed
    TimeExpired,
    /// The creator closed it
    EndedByCreator,
}

/// Notification that a poll closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureEvent {
    /// The closed poll
    pub poll_id: PollId,
    /// Chat the poll belongs to
    pub chat_id: String,
    /// Poll topic, for the announcement text
    pub topic: String,
    /// Handle of the announcement message, when one was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_ref: Option<String>,
    /// Why the poll closed
    pub reason: ClosureReason,
}

impl ClosureEvent {
    /// Build an event from a poll snapshot
    pub fn from_poll(poll: &Poll, reason: ClosureReason) -> Self {
        Self {
            poll_id: poll.id.clone(),
            chat_id: poll.chat_id.clone(),
            topic: poll.topic.clone(),
            message_ref: poll.message_ref.clone(),
            reason,
        }
    }

    /// The announcement text for the chat
    pub fn announcement(&self) -> String {
        match self.reason {
            ClosureReason::TimeExpired => {
                format!("Poll '{}' has ended as the time limit was reached.", self.topic)
            }
            ClosureReason::EndedByCreator => {
                format!("Poll '{}' has been manually ended by the creator.", self.topic)
            }
        }
    }
}

/// Errors that can occur delivering closure events
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Receiver for poll closure events
///
/// Implemented by the transport layer. Failures are logged by the caller
/// and never undo the closure.
#[async_trait]
pub trait ClosureSink: Send + Sync {
    /// Deliver one closure event
    async fn publish(&self, event: ClosureEvent) -> Result<(), SinkError>;
}

/// Type-erased sink for sharing with background tasks
pub type DynClosureSink = Arc<dyn ClosureSink>;

/// Sink that only logs announcements
///
/// Stands in when no transport is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ClosureSink for LogSink {
    async fn publish(&self, event: ClosureEvent) -> Result<(), SinkError> {
        info!(
            poll_id = %event.poll_id,
            chat_id = %event.chat_id,
            announcement = %event.announcement(),
            "poll closed"
        );
        Ok(())
    }
}
