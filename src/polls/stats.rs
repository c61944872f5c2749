//! Poll Statistics
//!
//! Pure tallying over poll snapshots. No locking, no shared state; render
//! layers consume the output as-is.

use serde::{Deserialize, Serialize};

use super::types::Poll;

/// Vote count for a single option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyEntry {
    /// Option text
    pub option: String,
    /// Number of votes for it
    pub count: usize,
}

/// Tally of all votes on a poll
///
/// Entries are aligned with the poll's option order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollTally {
    /// Per-option counts, in option order
    pub entries: Vec<TallyEntry>,
    /// Total number of votes
    pub total: usize,
}

impl PollTally {
    /// Whether any votes were cast
    pub fn has_votes(&self) -> bool {
        self.total > 0
    }

    /// Percentage of votes for one option, rounded to two decimals
    ///
    /// `None` when the poll has no votes or the index is out of range; the
    /// caller shows "no votes yet" instead of a zero division.
    pub fn percentage(&self, index: usize) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let entry = self.entries.get(index)?;
        let share = entry.count as f64 / self.total as f64 * 100.0;
        Some((share * 100.0).round() / 100.0)
    }

    /// Percentages for all options, in option order
    ///
    /// Empty when the poll has no votes.
    pub fn percentages(&self) -> Vec<f64> {
        (0..self.entries.len())
            .filter_map(|i| self.percentage(i))
            .collect()
    }
}

/// Tally the votes on a poll snapshot
///
/// Vote entries pointing outside the option range are ignored.
pub fn tally(poll: &Poll) -> PollTally {
    let mut counts = vec![0usize; poll.options.len()];
    for &index in poll.votes.values() {
        if let Some(slot) = counts.get_mut(index) {
            *slot += 1;
        }
    }

    let total = counts.iter().sum();
    let entries = poll
        .options
        .iter()
        .zip(counts)
        .map(|(option, count)| TallyEntry {
            option: option.clone(),
            count,
        })
        .collect();

    PollTally { entries, total }
}
