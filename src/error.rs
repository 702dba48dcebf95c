//! Error type shared by the scheduler, the store and the card operations.

/// Everything that can go wrong while tracking study cards.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Quality grade outside 0..=5. Rejected before any state is touched.
    #[error("invalid quality {0}: expected an integer between 0 and 5")]
    InvalidQuality(i64),

    /// Selection attempted on an empty due set.
    #[error("no items are due for review")]
    EmptySet,

    /// The stored item changed between load and save.
    #[error("review item {0} was modified concurrently, reload and retry")]
    PersistenceConflict(i64),

    #[error("review item {0} not found")]
    NotFound(i64),

    #[error("access denied to item {0}")]
    AccessDenied(i64),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
