//! Poll Service
//!
//! Wires the store, archive, and background workers into one owned unit
//! with a clean startup/shutdown lifecycle. Transports hold a service and
//! call into its store; the service keeps the sweeper and autosaver alive.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::events::{ClosureEvent, ClosureReason, DynClosureSink};
use crate::polls::store::PollStore;
use crate::polls::sweeper::sweeper_loop;
use crate::polls::types::{EndOutcome, PollId};
use crate::storage::{autosave_loop, PollArchive};

/// Running poll service
pub struct PollService {
    /// Shared poll state
    store: Arc<PollStore>,
    /// Where closure announcements go
    sink: DynClosureSink,
    /// Time limit the transport applies to drafts that name none
    default_duration: Duration,
    /// Signals the sweeper to stop
    sweeper_shutdown: tokio::sync::watch::Sender<bool>,
    /// Signals the autosaver to stop
    autosave_shutdown: tokio::sync::watch::Sender<bool>,
    /// Expiration sweeper task
    sweeper: JoinHandle<()>,
    /// Autosave task
    autosaver: JoinHandle<()>,
}

impl PollService {
    /// Start the service
    ///
    /// Restores polls from the archive (an unreadable archive logs a
    /// warning and starts empty) and spawns the sweeper and autosave
    /// workers.
    pub async fn start(config: ServiceConfig, sink: DynClosureSink) -> Self {
        let archive = PollArchive::new(config.data_path.clone());
        let polls = archive.load_or_default().await;
        let store = Arc::new(PollStore::from_polls(polls));

        // Each worker gets its own stop signal so shutdown can stage them.
        let (sweeper_tx, sweeper_rx) = tokio::sync::watch::channel(false);
        let (autosave_tx, autosave_rx) = tokio::sync::watch::channel(false);

        let sweeper = tokio::spawn(sweeper_loop(
            store.clone(),
            sink.clone(),
            config.sweep_interval(),
            sweeper_rx,
        ));
        let autosaver = tokio::spawn(autosave_loop(
            store.clone(),
            archive,
            config.save_interval(),
            autosave_rx,
        ));

        info!(
            polls = store.len(),
            sweep_interval_secs = config.sweep_interval_secs,
            save_interval_secs = config.save_interval_secs,
            default_duration_mins = config.default_duration_mins,
            "poll service started"
        );

        Self {
            store,
            sink,
            default_duration: config.default_duration(),
            sweeper_shutdown: sweeper_tx,
            autosave_shutdown: autosave_tx,
            sweeper,
            autosaver,
        }
    }

    /// The shared poll store
    pub fn store(&self) -> &Arc<PollStore> {
        &self.store
    }

    /// Time limit the transport applies when a creation request sets none
    ///
    /// Drafts still carry their own duration; this is only the advertised
    /// default.
    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    /// Close a poll at its creator's request and announce the closure
    ///
    /// The announcement is best-effort; the close stands even when it
    /// cannot be delivered.
    pub async fn end_poll(
        &self,
        poll_id: &PollId,
        requester_id: &str,
        at: DateTime<Utc>,
    ) -> EndOutcome {
        let outcome = self.store.end_manually(poll_id, requester_id, at);
        if let EndOutcome::Ended { poll } = &outcome {
            let event = ClosureEvent::from_poll(poll, ClosureReason::EndedByCreator);
            if let Err(e) = self.sink.publish(event).await {
                warn!(poll_id = %poll_id, error = %e, "failed to publish closure event");
            }
        }
        outcome
    }

    /// Stop the workers and flush pending changes
    ///
    /// Staged: the sweeper is stopped and joined first, so the autosaver's
    /// final save includes transitions from the last sweep.
    pub async fn shutdown(self) {
        info!("poll service shutting down");

        let _ = self.sweeper_shutdown.send(true);
        if let Err(e) = self.sweeper.await {
            warn!(error = %e, "sweeper task ended abnormally");
        }

        // The autosave loop runs a final save before exiting.
        let _ = self.autosave_shutdown.send(true);
        if let Err(e) = self.autosaver.await {
            warn!(error = %e, "autosave task ended abnormally");
        }
    }
}
