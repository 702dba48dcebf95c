//! Self-reported recall quality on the 0-5 scale.
use crate::error::{Result, TrackerError};

/// Recall grade: 0 = complete blackout, 5 = perfect response.
///
/// Out-of-range values are rejected at construction, never clamped, so the
/// scheduler itself only ever sees valid grades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: i64) -> Result<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(TrackerError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASSING
    }

    /// All valid grades, lowest first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Blackout",
            1 => "Wrong",
            2 => "Wrong (familiar)",
            3 => "Difficult",
            4 => "Correct",
            _ => "Perfect",
        }
    }
}

impl TryFrom<i64> for Quality {
    type Error = TrackerError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}
