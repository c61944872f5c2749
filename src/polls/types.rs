//! Poll Types
//!
//! The poll entity, creation drafts, and the outcomes of voting and
//! closing operations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a poll
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollId(pub String);

impl PollId {
    /// Generate a new random poll ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for PollId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PollId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a poll
///
/// Transitions are one-way: a poll starts `Active` and ends in exactly one
/// of the terminal states. There is no re-opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Accepting votes
    #[default]
    Active,
    /// Closed automatically once its deadline passed
    ExpiredByTime,
    /// Closed by its creator before any deadline
    EndedManually,
}

impl PollStatus {
    /// Whether the poll still accepts votes
    pub fn is_active(&self) -> bool {
        matches!(self, PollStatus::Active)
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PollStatus::Active => "Active",
            PollStatus::ExpiredByTime => "Ended (Time Limit Reached)",
            PollStatus::EndedManually => "Ended by Creator",
        };
        write!(f, "{}", name)
    }
}

/// A poll record
///
/// Identity fields (`id`, `chat_id`, `creator_id`, `topic`, `options`,
/// `start_time`) are fixed at creation. Only `status`, `votes`, `end_time`
/// (set once, on manual close) and `message_ref` change afterwards, and only
/// through store operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    /// Poll ID (unique identifier)
    pub id: PollId,
    /// Chat the poll belongs to
    pub chat_id: String,
    /// User ID of the poll creator
    pub creator_id: String,
    /// Poll topic/question
    pub topic: String,
    /// Ordered voting options; index position is the stable vote target
    pub options: Vec<String>,
    /// When the poll was created
    pub start_time: DateTime<Utc>,
    /// Deadline, or closing time once ended; absent means no time limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Current lifecycle status
    #[serde(default)]
    pub status: PollStatus,
    /// Voter ID to option index; first vote wins, entries are never replaced
    #[serde(default)]
    pub votes: HashMap<String, usize>,
    /// External handle of the announcement message, set once it was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_ref: Option<String>,
}

impl Poll {
    /// Whether the poll still accepts votes
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether the deadline has passed as of `at`
    ///
    /// Polls without a deadline never pass it.
    pub fn is_past_deadline(&self, at: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| at >= end)
    }
}

/// Draft of a poll to be created
#[derive(Debug, Clone)]
pub struct NewPoll {
    /// Chat the poll belongs to
    pub chat_id: String,
    /// User ID of the poll creator
    pub creator_id: String,
    /// Poll topic/question
    pub topic: String,
    /// Ordered voting options
    pub options: Vec<String>,
    /// Time limit; zero means the poll never expires on its own
    pub duration: Duration,
}

impl NewPoll {
    /// Create a new draft with no options and no time limit
    pub fn new(
        chat_id: impl Into<String>,
        creator_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            creator_id: creator_id.into(),
            topic: topic.into(),
            options: Vec::new(),
            duration: Duration::zero(),
        }
    }

    /// Set the options
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Add an option
    pub fn add_option(&mut self, option: impl Into<String>) {
        self.options.push(option.into());
    }

    /// Set the time limit
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Validate the draft
    pub fn validate(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("Poll topic is required.".to_string());
        }
        if self.options.len() < 2 {
            return Err("A poll must have at least two options.".to_string());
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err("Poll options cannot be blank.".to_string());
        }
        if self.duration < Duration::zero() {
            return Err("Duration cannot be negative.".to_string());
        }
        Ok(())
    }
}

/// Errors from poll store operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum PollError {
    /// The creation draft failed validation
    #[error("Invalid poll: {0}")]
    Validation(String),
    /// No poll with the given ID exists
    #[error("Poll not found: {0}")]
    NotFound(PollId),
}

/// Outcome of a vote attempt
///
/// Every attempt gets exactly one outcome; `Display` renders the short
/// message shown back to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The vote was recorded for the given option text
    Accepted {
        /// Text of the chosen option
        option: String,
    },
    /// The voter already has a recorded vote; it was left untouched
    AlreadyVoted {
        /// Text of the previously chosen option
        option: String,
    },
    /// No poll with the given ID exists
    NotFound,
    /// The poll is already closed
    NotActive {
        /// Status the poll was found in
        status: PollStatus,
    },
    /// The deadline had passed; the poll was closed instead of voted on
    Expired,
    /// The option index is out of range
    InvalidOption {
        /// The rejected index
        index: usize,
    },
}

impl VoteOutcome {
    /// Whether the vote was recorded
    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteOutcome::Accepted { .. })
    }
}

impl std::fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteOutcome::Accepted { option } => {
                write!(f, "Your vote for '{}' has been recorded!", option)
            }
            VoteOutcome::AlreadyVoted { option } => {
                write!(f, "You have already voted for: '{}'.", option)
            }
            VoteOutcome::NotFound => {
                write!(f, "Error: Poll not found. It might have been deleted.")
            }
            VoteOutcome::NotActive { .. } => write!(f, "This poll is no longer active."),
            VoteOutcome::Expired => write!(f, "This poll has expired and is now closed."),
            VoteOutcome::InvalidOption { .. } => write!(f, "Invalid option selected."),
        }
    }
}

/// Outcome of a manual close attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EndOutcome {
    /// The poll was closed; carries a snapshot of its final state
    Ended {
        /// The poll as of the close
        poll: Poll,
    },
    /// No poll with the given ID exists
    NotFound,
    /// The requester is not the creator
    NotCreator,
    /// The poll is already closed
    NotActive {
        /// Status the poll was found in
        status: PollStatus,
    },
}

impl EndOutcome {
    /// Whether the poll was closed by this call
    pub fn is_ended(&self) -> bool {
        matches!(self, EndOutcome::Ended { .. })
    }
}

impl std::fmt::Display for EndOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndOutcome::Ended { poll } => write!(
                f,
                "Poll '{}' has been manually ended by the creator.",
                poll.topic
            ),
            EndOutcome::NotFound => write!(f, "Error: Poll not found."),
            EndOutcome::NotCreator => {
                write!(f, "Error: Only the poll creator can end this poll.")
            }
            EndOutcome::NotActive { status } => {
                write!(f, "Error: Poll is not active. Current status: {}.", status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_poll() -> Poll {
        Poll {
            id: PollId::from_string("poll1"),
            chat_id: "chat1".to_string(),
            creator_id: "user1".to_string(),
            topic: "Favorite color?".to_string(),
            options: vec!["Red".to_string(), "Blue".to_string()],
            start_time: Utc::now(),
            end_time: None,
            status: PollStatus::Active,
            votes: HashMap::new(),
            message_ref: None,
        }
    }

    #[test]
    fn test_poll_id_unique() {
        let a = PollId::new();
        let b = PollId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_poll_id_format() {
        let id = PollId::new();
        assert_eq!(id.0.len(), 32);
        assert!(id.0.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_poll_id_display_and_as_ref() {
        let id = PollId::from_string("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_ref(), "abc123");
    }

    #[test]
    fn test_status_default_is_active() {
        assert_eq!(PollStatus::default(), PollStatus::Active);
        assert!(PollStatus::default().is_active());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PollStatus::ExpiredByTime).unwrap();
        assert_eq!(json, "\"expired_by_time\"");

        let parsed: PollStatus = serde_json::from_str("\"ended_manually\"").unwrap();
        assert_eq!(parsed, PollStatus::EndedManually);
    }

    #[test]
    fn test_status_display_names() {
        assert_eq!(PollStatus::Active.to_string(), "Active");
        assert_eq!(
            PollStatus::ExpiredByTime.to_string(),
            "Ended (Time Limit Reached)"
        );
        assert_eq!(PollStatus::EndedManually.to_string(), "Ended by Creator");
    }

    #[test]
    fn test_new_poll_builder() {
        let mut draft = NewPoll::new("chat1", "user1", "Lunch spot?")
            .with_options(vec!["Pizza".to_string(), "Sushi".to_string()])
            .with_duration(Duration::minutes(30));
        draft.add_option("Tacos");

        assert_eq!(draft.chat_id, "chat1");
        assert_eq!(draft.creator_id, "user1");
        assert_eq!(draft.topic, "Lunch spot?");
        assert_eq!(draft.options, vec!["Pizza", "Sushi", "Tacos"]);
        assert_eq!(draft.duration, Duration::minutes(30));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_topic() {
        let draft = NewPoll::new("chat1", "user1", "  ")
            .with_options(vec!["A".to_string(), "B".to_string()]);
        let result = draft.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("topic"));
    }

    #[test]
    fn test_validate_too_few_options() {
        let draft = NewPoll::new("chat1", "user1", "Question?").with_options(vec!["A".to_string()]);
        let result = draft.validate();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            "A poll must have at least two options."
        );
    }

    #[test]
    fn test_validate_blank_option() {
        let draft = NewPoll::new("chat1", "user1", "Question?")
            .with_options(vec!["A".to_string(), "   ".to_string()]);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_validate_negative_duration() {
        let draft = NewPoll::new("chat1", "user1", "Question?")
            .with_options(vec!["A".to_string(), "B".to_string()])
            .with_duration(Duration::seconds(-1));
        let result = draft.validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Duration cannot be negative.");
    }

    #[test]
    fn test_validate_zero_duration_ok() {
        let draft = NewPoll::new("chat1", "user1", "Question?")
            .with_options(vec!["A".to_string(), "B".to_string()]);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_is_past_deadline() {
        let mut poll = sample_poll();
        let now = Utc::now();
        assert!(!poll.is_past_deadline(now));

        poll.end_time = Some(now + Duration::minutes(5));
        assert!(!poll.is_past_deadline(now));
        assert!(poll.is_past_deadline(now + Duration::minutes(5)));
        assert!(poll.is_past_deadline(now + Duration::minutes(6)));
    }

    #[test]
    fn test_poll_serialization_skips_absent_fields() {
        let poll = sample_poll();
        let json = serde_json::to_string(&poll).unwrap();
        assert!(!json.contains("end_time"));
        assert!(!json.contains("message_ref"));

        let mut poll = poll;
        poll.end_time = Some(Utc::now());
        poll.message_ref = Some("msg42".to_string());
        let json = serde_json::to_string(&poll).unwrap();
        assert!(json.contains("end_time"));
        assert!(json.contains("message_ref"));
    }

    #[test]
    fn test_poll_round_trip() {
        let mut poll = sample_poll();
        poll.votes.insert("voter1".to_string(), 0);
        poll.votes.insert("voter2".to_string(), 1);
        poll.end_time = Some(poll.start_time + Duration::hours(1));
        poll.status = PollStatus::ExpiredByTime;

        let json = serde_json::to_string(&poll).unwrap();
        let parsed: Poll = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, poll);
    }

    #[test]
    fn test_poll_deserialize_defaults() {
        // Records written before voting started carry neither votes nor status.
        let json = r#"{
            "id": "poll1",
            "chat_id": "chat1",
            "creator_id": "user1",
            "topic": "Question?",
            "options": ["A", "B"],
            "start_time": "2026-01-10T12:00:00Z"
        }"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.status, PollStatus::Active);
        assert!(poll.votes.is_empty());
        assert!(poll.end_time.is_none());
        assert!(poll.message_ref.is_none());
    }

    #[test]
    fn test_vote_outcome_display() {
        let accepted = VoteOutcome::Accepted {
            option: "Red".to_string(),
        };
        assert_eq!(
            accepted.to_string(),
            "Your vote for 'Red' has been recorded!"
        );
        assert!(accepted.is_accepted());

        let already = VoteOutcome::AlreadyVoted {
            option: "Blue".to_string(),
        };
        assert_eq!(
            already.to_string(),
            "You have already voted for: 'Blue'."
        );

        assert_eq!(
            VoteOutcome::NotFound.to_string(),
            "Error: Poll not found. It might have been deleted."
        );
        assert_eq!(
            VoteOutcome::Expired.to_string(),
            "This poll has expired and is now closed."
        );
        assert_eq!(
            VoteOutcome::InvalidOption { index: 7 }.to_string(),
            "Invalid option selected."
        );
    }

    #[test]
    fn test_end_outcome_display() {
        let ended = EndOutcome::Ended {
            poll: sample_poll(),
        };
        assert_eq!(
            ended.to_string(),
            "Poll 'Favorite color?' has been manually ended by the creator."
        );
        assert!(ended.is_ended());

        assert_eq!(
            EndOutcome::NotCreator.to_string(),
            "Error: Only the poll creator can end this poll."
        );
        assert_eq!(
            EndOutcome::NotActive {
                status: PollStatus::EndedManually
            }
            .to_string(),
            "Error: Poll is not active. Current status: Ended by Creator."
        );
    }

    #[test]
    fn test_vote_outcome_serialization() {
        let outcome = VoteOutcome::Accepted {
            option: "Red".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"accepted\""));

        let parsed: VoteOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);
    }
}
