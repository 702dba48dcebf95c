pub mod quality;
pub mod review_item;
pub mod review_session;
pub mod scheduler;
pub mod statistics;
pub mod study_session;

pub use quality::Quality;
pub use review_item::{ReviewItem, ScheduleState};
pub use review_session::ReviewSession;
pub use statistics::{StudyStatistics, TopicStats};
pub use study_session::{SessionKind, StudySession};
