//! Expiration sweeper.
//!
//! Background loop that closes polls whose deadline has passed, even when
//! nobody interacts with them. Each closed poll is announced through the
//! closure sink; a failed announcement never undoes the transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::events::{ClosureEvent, ClosureReason, DynClosureSink};
use crate::polls::store::PollStore;

/// Run the sweeper loop.
///
/// Sweeps every `interval` until shutdown.
pub async fn sweeper_loop(
    store: Arc<PollStore>,
    sink: DynClosureSink,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        // Wait for the next tick or shutdown
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                break;
            }
        }

        // Check shutdown after waking
        if *shutdown.borrow() {
            break;
        }

        sweep_once(&store, &sink, Utc::now()).await;
    }
}

/// Run one sweep pass: close due polls, then announce each closure.
pub async fn sweep_once(store: &PollStore, sink: &DynClosureSink, at: DateTime<Utc>) {
    let expired = store.sweep_expired(at);
    if expired.is_empty() {
        return;
    }

    info!(count = expired.len(), "closed expired polls");

    for poll_id in expired {
        let poll = match store.get_poll(&poll_id) {
            Some(poll) => poll,
            None => continue,
        };
        let event = ClosureEvent::from_poll(&poll, ClosureReason::TimeExpired);
        if let Err(e) = sink.publish(event).await {
            warn!(poll_id = %poll_id, error = %e, "failed to publish closure event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ClosureSink, SinkError};
    use crate::polls::types::{Poll, PollId, PollStatus};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashMap;

    /// Mock sink that records published events.
    #[derive(Default)]
    struct CaptureSink {
        events: parking_lot::Mutex<Vec<ClosureEvent>>,
    }

    #[async_trait]
    impl ClosureSink for CaptureSink {
        async fn publish(&self, event: ClosureEvent) -> Result<(), SinkError> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    /// Mock sink that always fails.
    struct FailSink;

    #[async_trait]
    impl ClosureSink for FailSink {
        async fn publish(&self, _event: ClosureEvent) -> Result<(), SinkError> {
            Err(SinkError::DeliveryFailed("mock failure".to_string()))
        }
    }

    fn overdue_poll(id: &str) -> Poll {
        let start = Utc::now() - ChronoDuration::minutes(10);
        Poll {
            id: PollId::from_string(id),
            chat_id: "chat1".to_string(),
            creator_id: "user1".to_string(),
            topic: "Lunch spot?".to_string(),
            options: vec!["Pizza".to_string(), "Sushi".to_string()],
            start_time: start,
            end_time: Some(start + ChronoDuration::minutes(5)),
            status: PollStatus::Active,
            votes: HashMap::new(),
            message_ref: Some("msg42".to_string()),
        }
    }

    fn store_with(polls: Vec<Poll>) -> Arc<PollStore> {
        let map: HashMap<PollId, Poll> = polls.into_iter().map(|p| (p.id.clone(), p)).collect();
        Arc::new(PollStore::from_polls(map))
    }

    #[tokio::test]
    async fn test_sweep_once_publishes_closures() {
        let store = store_with(vec![overdue_poll("p1")]);
        let capture = Arc::new(CaptureSink::default());
        let sink: DynClosureSink = capture.clone();

        sweep_once(&store, &sink, Utc::now()).await;

        let poll_id = PollId::from_string("p1");
        assert_eq!(
            store.get_poll(&poll_id).unwrap().status,
            PollStatus::ExpiredByTime
        );

        let events = capture.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].poll_id, poll_id);
        assert_eq!(events[0].chat_id, "chat1");
        assert_eq!(events[0].message_ref, Some("msg42".to_string()));
        assert_eq!(events[0].reason, ClosureReason::TimeExpired);
    }

    #[tokio::test]
    async fn test_sweep_once_nothing_due() {
        let mut poll = overdue_poll("p1");
        poll.end_time = Some(Utc::now() + ChronoDuration::hours(1));
        let store = store_with(vec![poll]);
        let capture = Arc::new(CaptureSink::default());
        let sink: DynClosureSink = capture.clone();

        sweep_once(&store, &sink, Utc::now()).await;

        assert!(capture.events.lock().is_empty());
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_sweep_failure_leaves_poll_closed() {
        let store = store_with(vec![overdue_poll("p1")]);
        let sink: DynClosureSink = Arc::new(FailSink);

        sweep_once(&store, &sink, Utc::now()).await;

        // The transition is authoritative even when the announcement fails.
        let poll_id = PollId::from_string("p1");
        assert_eq!(
            store.get_poll(&poll_id).unwrap().status,
            PollStatus::ExpiredByTime
        );
    }

    #[tokio::test]
    async fn test_sweep_once_announces_each_due_poll() {
        let store = store_with(vec![overdue_poll("p1"), overdue_poll("p2")]);
        let capture = Arc::new(CaptureSink::default());
        let sink: DynClosureSink = capture.clone();

        sweep_once(&store, &sink, Utc::now()).await;

        let mut ids: Vec<String> = capture
            .events
            .lock()
            .iter()
            .map(|e| e.poll_id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_sweeper_loop_closes_due_poll() {
        let store = store_with(vec![overdue_poll("p1")]);
        let capture = Arc::new(CaptureSink::default());
        let sink: DynClosureSink = capture.clone();

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(sweeper_loop(
            store.clone(),
            sink,
            Duration::from_millis(10),
            shutdown_rx,
        ));

        // Give it time for a few ticks
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = shutdown_tx.send(true);
        let _ = handle.await;

        let poll_id = PollId::from_string("p1");
        assert_eq!(
            store.get_poll(&poll_id).unwrap().status,
            PollStatus::ExpiredByTime
        );
        // Later ticks found nothing left, so exactly one event went out.
        assert_eq!(capture.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_loop_shutdown() {
        let store = store_with(vec![]);
        let sink: DynClosureSink = Arc::new(CaptureSink::default());

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(true); // already shut down
        let handle = tokio::spawn(sweeper_loop(
            store,
            sink,
            Duration::from_secs(60),
            shutdown_rx,
        ));

        // Should exit quickly since shutdown is already true
        let _ = shutdown_tx.send(true);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper loop should exit on shutdown")
            .expect("task should not panic");
    }
}
