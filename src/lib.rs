pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod review;

pub use error::{Result, TrackerError};
pub use models::{Quality, ReviewItem, ReviewSession, ScheduleState, StudySession};
