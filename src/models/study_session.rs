//! Logged study time: pomodoro timers and review sittings.
use crate::error::TrackerError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_POMODORO_MINUTES: u32 = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionKind {
    Pomodoro,
    Review,
    Study,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Pomodoro => "pomodoro",
            SessionKind::Review => "review",
            SessionKind::Study => "study",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(SessionKind::Pomodoro),
            "review" => Ok(SessionKind::Review),
            "study" => Ok(SessionKind::Study),
            other => Err(TrackerError::Validation(format!(
                "unknown session type '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StudySession {
    pub id: i64,
    pub user_id: i64,
    pub kind: SessionKind,
    pub duration_minutes: u32,
    pub cards_reviewed: u32,
    pub date: DateTime<Utc>,
}
