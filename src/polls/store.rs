//! Poll Store
//!
//! The single owner of all poll records. Every read and write goes through
//! the store so voting invariants and locking discipline live in one place.
//! Callers get cloned snapshots, never live references into the map.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::types::{EndOutcome, NewPoll, Poll, PollError, PollId, PollStatus, VoteOutcome};

/// Store for managing polls
pub struct PollStore {
    /// Stored polls by ID
    polls: RwLock<HashMap<PollId, Poll>>,
    /// Set when in-memory state has changes not yet saved
    dirty: AtomicBool,
    /// Notify the autosave worker when state is dirtied
    notify: Arc<Notify>,
}

impl std::fmt::Debug for PollStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollStore")
            .field("polls", &self.polls)
            .field("dirty", &self.dirty)
            .field("notify", &"Notify")
            .finish()
    }
}

impl Default for PollStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStore {
    /// Create an empty poll store
    pub fn new() -> Self {
        Self::from_polls(HashMap::new())
    }

    /// Create a store seeded with existing polls
    pub fn from_polls(polls: HashMap<PollId, Poll>) -> Self {
        Self {
            polls: RwLock::new(polls),
            dirty: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Get the notifier the autosave worker awaits on
    pub fn notifier(&self) -> &Arc<Notify> {
        &self.notify
    }

    /// Flag unsaved changes and wake the autosave worker
    ///
    /// Also the retry hook: a failed save calls this so the next pass
    /// picks the same state up again.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }

    /// Whether changes are waiting to be saved
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Create a new poll from a draft
    ///
    /// Validates the draft, stamps the start time, and computes the
    /// deadline when the draft carries a non-zero duration. Returns a
    /// snapshot of the stored poll.
    pub fn create_poll(&self, draft: NewPoll) -> Result<Poll, PollError> {
        draft.validate().map_err(PollError::Validation)?;

        let start_time = Utc::now();
        let end_time = if draft.duration > Duration::zero() {
            // A large enough duration overflows the representable
            // timestamp range; treat it as invalid input.
            match start_time.checked_add_signed(draft.duration) {
                Some(end) => Some(end),
                None => {
                    return Err(PollError::Validation(
                        "Duration is too large.".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let mut polls = self.polls.write();

        // Re-roll on collision so concurrent creations can never share an ID.
        let mut id = PollId::new();
        while polls.contains_key(&id) {
            id = PollId::new();
        }

        let poll = Poll {
            id: id.clone(),
            chat_id: draft.chat_id,
            creator_id: draft.creator_id,
            topic: draft.topic,
            options: draft.options,
            start_time,
            end_time,
            status: PollStatus::Active,
            votes: HashMap::new(),
            message_ref: None,
        };
        polls.insert(id, poll.clone());
        drop(polls);

        self.mark_dirty();
        Ok(poll)
    }

    /// Record the external handle of a poll's announcement message
    ///
    /// Last write wins; the transport may re-send an announcement.
    pub fn attach_message_ref(
        &self,
        poll_id: &PollId,
        message_ref: impl Into<String>,
    ) -> Result<(), PollError> {
        let mut polls = self.polls.write();
        let poll = match polls.get_mut(poll_id) {
            Some(poll) => poll,
            None => return Err(PollError::NotFound(poll_id.clone())),
        };
        poll.message_ref = Some(message_ref.into());
        drop(polls);

        self.mark_dirty();
        Ok(())
    }

    /// Record a vote
    ///
    /// One atomic unit per poll: existence, status, deadline, duplicate
    /// and bounds checks happen under the same write lock as the insert,
    /// so racing calls serialize and each attempt gets exactly one outcome.
    pub fn record_vote(
        &self,
        poll_id: &PollId,
        voter_id: &str,
        option_index: usize,
        at: DateTime<Utc>,
    ) -> VoteOutcome {
        let mut polls = self.polls.write();

        let poll = match polls.get_mut(poll_id) {
            Some(poll) => poll,
            None => return VoteOutcome::NotFound,
        };

        if !poll.is_active() {
            return VoteOutcome::NotActive {
                status: poll.status,
            };
        }

        // Deadline check at vote time: a vote can arrive in the window
        // between true expiry and the next sweep tick, and must not be
        // accepted. Close the poll here instead.
        if poll.is_past_deadline(at) {
            poll.status = PollStatus::ExpiredByTime;
            drop(polls);
            self.mark_dirty();
            return VoteOutcome::Expired;
        }

        if let Some(&previous) = poll.votes.get(voter_id) {
            let option = poll.options.get(previous).cloned().unwrap_or_default();
            return VoteOutcome::AlreadyVoted { option };
        }

        let option = match poll.options.get(option_index) {
            Some(option) => option.clone(),
            None => {
                return VoteOutcome::InvalidOption {
                    index: option_index,
                }
            }
        };

        poll.votes.insert(voter_id.to_string(), option_index);
        drop(polls);

        self.mark_dirty();
        VoteOutcome::Accepted { option }
    }

    /// Close a poll at its creator's request
    ///
    /// Sets the closing time to `at`, overwriting any scheduled deadline.
    /// Returns a snapshot of the closed poll so the caller can announce it.
    pub fn end_manually(
        &self,
        poll_id: &PollId,
        requester_id: &str,
        at: DateTime<Utc>,
    ) -> EndOutcome {
        let mut polls = self.polls.write();

        let poll = match polls.get_mut(poll_id) {
            Some(poll) => poll,
            None => return EndOutcome::NotFound,
        };

        if poll.creator_id != requester_id {
            return EndOutcome::NotCreator;
        }

        if !poll.is_active() {
            return EndOutcome::NotActive {
                status: poll.status,
            };
        }

        poll.status = PollStatus::EndedManually;
        poll.end_time = Some(at);
        let snapshot = poll.clone();
        drop(polls);

        self.mark_dirty();
        EndOutcome::Ended { poll: snapshot }
    }

    /// Close every active poll whose deadline has passed
    ///
    /// Returns the IDs transitioned by this call. A poll already closed by
    /// a racing vote or manual end is skipped, so each poll is transitioned
    /// exactly once.
    pub fn sweep_expired(&self, at: DateTime<Utc>) -> Vec<PollId> {
        let mut polls = self.polls.write();

        let mut expired = Vec::new();
        for poll in polls.values_mut() {
            if poll.is_active() && poll.is_past_deadline(at) {
                poll.status = PollStatus::ExpiredByTime;
                expired.push(poll.id.clone());
            }
        }
        drop(polls);

        if !expired.is_empty() {
            self.mark_dirty();
        }
        expired
    }

    /// Get a poll by ID
    pub fn get_poll(&self, poll_id: &PollId) -> Option<Poll> {
        let polls = self.polls.read();
        polls.get(poll_id).cloned()
    }

    /// List the polls of one chat
    pub fn list_polls_for_chat(&self, chat_id: &str) -> Vec<Poll> {
        let polls = self.polls.read();
        let mut results: Vec<Poll> = polls
            .values()
            .filter(|p| p.chat_id == chat_id)
            .cloned()
            .collect();
        drop(polls);

        // Sort by creation date (newest first)
        results.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        results
    }

    /// Copy out every poll, keyed by ID
    ///
    /// Persistence saves from this copy, outside the lock.
    pub fn snapshot(&self) -> HashMap<PollId, Poll> {
        self.polls.read().clone()
    }

    /// Number of polls held
    pub fn len(&self) -> usize {
        self.polls.read().len()
    }

    /// Whether the store holds no polls
    pub fn is_empty(&self) -> bool {
        self.polls.read().is_empty()
    }

    /// Get store statistics
    pub fn stats(&self) -> PollStoreStats {
        let polls = self.polls.read();

        let total_polls = polls.len();
        let active_polls = polls.values().filter(|p| p.is_active()).count();
        let expired_polls = polls
            .values()
            .filter(|p| p.status == PollStatus::ExpiredByTime)
            .count();
        let ended_polls = polls
            .values()
            .filter(|p| p.status == PollStatus::EndedManually)
            .count();
        let total_votes: usize = polls.values().map(|p| p.votes.len()).sum();

        PollStoreStats {
            total_polls,
            active_polls,
            expired_polls,
            ended_polls,
            total_votes,
        }
    }
}

/// Statistics for the poll store
#[derive(Debug, Clone)]
pub struct PollStoreStats {
    /// Total number of polls
    pub total_polls: usize,
    /// Number of active polls
    pub active_polls: usize,
    /// Number of polls closed by their deadline
    pub expired_polls: usize,
    /// Number of polls closed by their creator
    pub ended_polls: usize,
    /// Total number of votes cast
    pub total_votes: usize,
}

/// Create a shared poll store
pub fn create_store() -> Arc<PollStore> {
    Arc::new(PollStore::new())
}
