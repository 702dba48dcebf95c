//! A study card together with its review scheduling state.
use chrono::{DateTime, Utc};

/// The four fields the scheduler owns. They are always read and written
/// together as one record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleState {
    /// Ease multiplier. `0.0` means the item has never been reviewed.
    pub difficulty_factor: f64,
    pub review_count: u32,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// `None` is treated as due immediately.
    pub next_review_at: Option<DateTime<Utc>>,
}

impl ScheduleState {
    /// State of a freshly created item: never reviewed, due at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            difficulty_factor: 0.0,
            review_count: 0,
            last_reviewed_at: None,
            next_review_at: Some(now),
        }
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.is_none_or(|next| next <= now)
    }

    /// Whole days between the last review and the next one, if reviewed.
    pub fn interval_days(&self) -> Option<i64> {
        match (self.last_reviewed_at, self.next_review_at) {
            (Some(last), Some(next)) => Some((next - last).num_days()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewItem {
    pub id: i64,
    pub user_id: i64,
    pub front: String,
    pub back: String,
    pub topic: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schedule: ScheduleState,
}

impl ReviewItem {
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topic.as_deref() == Some(topic)
    }
}
