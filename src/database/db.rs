//! Database operations for the study tracker
//!
//! Handles SQLite initialization, the simulated clock, CRUD for study cards
//! and the study session log. Scheduling state is written only through
//! [`crate::database::ReviewItemStore`].

use crate::error::{Result, TrackerError};
use crate::models::{ReviewItem, ScheduleState, SessionKind, StudySession, StudyStatistics};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns read by [`row_to_item`], in order.
pub(crate) const CARD_COLUMNS: &str =
    "id, user_id, front, back, topic, difficulty, review_count, last_reviewed, next_review, created_at";

/// Opens (or creates) the database file and its tables.
///
/// `start_date` seeds the simulated clock the first time the file is created.
pub fn init_database(path: &Path, start_date: DateTime<Utc>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_tables(&conn, start_date)?;
    info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// In-memory database with the same schema, used by tests.
pub fn init_in_memory(start_date: DateTime<Utc>) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_tables(&conn, start_date)?;
    Ok(conn)
}

fn create_tables(conn: &Connection, start_date: DateTime<Utc>) -> Result<()> {
    // Scheduling columns (difficulty .. next_review) are one record, see store.rs
    conn.execute(
        "CREATE TABLE IF NOT EXISTS study_cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            topic TEXT,
            difficulty REAL NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            last_reviewed INTEGER,
            next_review INTEGER,
            created_at INTEGER NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_study_cards_user ON study_cards(user_id)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS study_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            session_type TEXT NOT NULL,
            duration INTEGER NOT NULL,
            cards_reviewed INTEGER NOT NULL DEFAULT 0,
            date INTEGER NOT NULL
        )",
        (),
    )?;

    // Create app_state table for storing current date
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![start_date.timestamp().to_string()],
    )?;

    Ok(())
}

pub(crate) fn from_timestamp(secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, secs))
}

fn optional_timestamp(secs: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    secs.map(from_timestamp).transpose()
}

pub(crate) fn row_to_item(row: &Row) -> rusqlite::Result<ReviewItem> {
    Ok(ReviewItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        topic: row.get(4)?,
        schedule: ScheduleState {
            difficulty_factor: row.get(5)?,
            review_count: row.get(6)?,
            last_reviewed_at: optional_timestamp(row.get(7)?)?,
            next_review_at: optional_timestamp(row.get(8)?)?,
        },
        created_at: from_timestamp(row.get(9)?)?,
    })
}

/// Retrieves current simulated date from database
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let timestamp: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = timestamp
        .parse::<i64>()
        .map_err(|_| TrackerError::Validation(format!("corrupt current_date '{timestamp}'")))?;
    Ok(from_timestamp(secs)?)
}

/// Advances current date by 24 hours and returns the new date
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::days(1);

    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![next_day.timestamp().to_string()],
    )?;

    info!(date = %next_day.format("%Y-%m-%d"), "advanced simulated date");
    Ok(next_day)
}

fn validate_content(front: &str, back: &str) -> Result<()> {
    if front.trim().is_empty() || back.trim().is_empty() {
        return Err(TrackerError::Validation(
            "both sides of the card must be filled in".to_string(),
        ));
    }
    Ok(())
}

fn normalize_topic(topic: Option<&str>) -> Option<String> {
    topic
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Adds a card for `user_id`. The new card is due immediately.
pub fn add_card(
    user_id: i64,
    front: &str,
    back: &str,
    topic: Option<&str>,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<ReviewItem> {
    validate_content(front, back)?;
    let schedule = ScheduleState::new(now);

    conn.execute(
        "INSERT INTO study_cards
            (user_id, front, back, topic, difficulty, review_count, last_reviewed, next_review, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)",
        params![
            user_id,
            front,
            back,
            normalize_topic(topic),
            schedule.difficulty_factor,
            schedule.review_count,
            schedule.next_review_at.map(|t| t.timestamp()),
            now.timestamp(),
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!(id, user_id, "card created");
    get_card(id, conn)
}

/// Cards added to an empty profile on first launch.
const SAMPLE_CARDS: [(&str, &str); 3] =
    [("cześć", "hello"), ("dziękuję", "thank you"), ("proszę", "please")];

/// Adds the sample cards if `user_id` has none yet and returns how many were created.
/// A card that fails to insert is logged and skipped.
pub fn seed_sample_cards(user_id: i64, now: DateTime<Utc>, conn: &Connection) -> Result<usize> {
    if !list_cards(user_id, None, conn)?.is_empty() {
        return Ok(0);
    }
    let mut created = 0;
    for (front, back) in SAMPLE_CARDS {
        match add_card(user_id, front, back, Some("polish"), now, conn) {
            Ok(_) => created += 1,
            Err(e) => warn!(front, "could not create sample card: {e}"),
        }
    }
    Ok(created)
}

/// Loads one card by id.
pub fn get_card(id: i64, conn: &Connection) -> Result<ReviewItem> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM study_cards WHERE id = ?1");
    match conn.query_row(&sql, params![id], row_to_item) {
        Ok(item) => Ok(item),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(TrackerError::NotFound(id)),
        Err(e) => Err(e.into()),
    }
}

/// Loads a card and checks that `user_id` owns it.
pub fn get_owned_card(user_id: i64, id: i64, conn: &Connection) -> Result<ReviewItem> {
    let card = get_card(id, conn)?;
    if card.user_id != user_id {
        return Err(TrackerError::AccessDenied(id));
    }
    Ok(card)
}

/// Replaces the text and topic of a card. Scheduling state is left untouched.
pub fn edit_card(
    user_id: i64,
    id: i64,
    front: &str,
    back: &str,
    topic: Option<&str>,
    conn: &Connection,
) -> Result<ReviewItem> {
    get_owned_card(user_id, id, conn)?;
    validate_content(front, back)?;

    conn.execute(
        "UPDATE study_cards SET front = ?1, back = ?2, topic = ?3 WHERE id = ?4",
        params![front, back, normalize_topic(topic), id],
    )?;

    debug!(id, "card updated");
    get_card(id, conn)
}

pub fn delete_card(user_id: i64, id: i64, conn: &Connection) -> Result<()> {
    get_owned_card(user_id, id, conn)?;
    conn.execute("DELETE FROM study_cards WHERE id = ?1", params![id])?;
    info!(id, "card deleted");
    Ok(())
}

/// Lists a user's cards newest first, optionally limited to one topic.
pub fn list_cards(user_id: i64, topic: Option<&str>, conn: &Connection) -> Result<Vec<ReviewItem>> {
    let topic = topic.filter(|t| !t.is_empty());
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM study_cards
         WHERE user_id = ?1 AND (?2 IS NULL OR topic = ?2)
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map(params![user_id, topic], row_to_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cards)
}

/// Distinct non-empty topics of a user's cards, sorted.
pub fn list_topics(user_id: i64, conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT topic FROM study_cards
         WHERE user_id = ?1 AND topic IS NOT NULL AND topic <> ''
         ORDER BY topic",
    )?;
    let topics = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(topics)
}

fn row_to_session(row: &Row) -> rusqlite::Result<StudySession> {
    let kind: String = row.get(2)?;
    Ok(StudySession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind.parse().map_err(|e: TrackerError| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        duration_minutes: row.get(3)?,
        cards_reviewed: row.get(4)?,
        date: from_timestamp(row.get(5)?)?,
    })
}

/// Logs a study session.
pub fn record_session(
    user_id: i64,
    kind: SessionKind,
    duration_minutes: u32,
    cards_reviewed: u32,
    date: DateTime<Utc>,
    conn: &Connection,
) -> Result<StudySession> {
    conn.execute(
        "INSERT INTO study_sessions (user_id, session_type, duration, cards_reviewed, date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, kind.as_str(), duration_minutes, cards_reviewed, date.timestamp()],
    )?;

    info!(user_id, %kind, duration_minutes, cards_reviewed, "study session recorded");
    Ok(StudySession {
        id: conn.last_insert_rowid(),
        user_id,
        kind,
        duration_minutes,
        cards_reviewed,
        date,
    })
}

/// Logs a timed pomodoro or study block from the timer.
///
/// Review sittings are logged by [`crate::models::ReviewSession::finish`] with their card count.
pub fn log_study_time(
    user_id: i64,
    kind: SessionKind,
    duration_minutes: u32,
    date: DateTime<Utc>,
    conn: &Connection,
) -> Result<StudySession> {
    if kind == SessionKind::Review {
        return Err(TrackerError::Validation(
            "review sessions are logged by the review screen".to_string(),
        ));
    }
    if duration_minutes == 0 {
        return Err(TrackerError::Validation(
            "session duration must be at least one minute".to_string(),
        ));
    }
    record_session(user_id, kind, duration_minutes, 0, date, conn)
}

/// Most recent sessions first. `limit = None` returns all of them.
pub fn recent_sessions(
    user_id: i64,
    limit: Option<usize>,
    conn: &Connection,
) -> Result<Vec<StudySession>> {
    let limit = limit.map_or(-1, |l| l as i64);
    let mut stmt = conn.prepare(
        "SELECT id, user_id, session_type, duration, cards_reviewed, date
         FROM study_sessions
         WHERE user_id = ?1
         ORDER BY date DESC, id DESC
         LIMIT ?2",
    )?;
    let sessions = stmt
        .query_map(params![user_id, limit], row_to_session)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sessions)
}

pub fn collect_statistics(
    user_id: i64,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<StudyStatistics> {
    let cards = list_cards(user_id, None, conn)?;
    let sessions = recent_sessions(user_id, None, conn)?;
    Ok(StudyStatistics::compute(&cards, &sessions, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> Connection {
        init_in_memory(start()).unwrap()
    }

    #[test]
    fn test_clock() {
        let conn = setup();
        assert_eq!(get_current_date(&conn).unwrap(), start());

        let next = advance_day(&conn).unwrap();
        assert_eq!(next, start() + Duration::days(1));
        assert_eq!(get_current_date(&conn).unwrap(), next);
    }

    #[test]
    fn test_add_card() {
        let conn = setup();
        let card = add_card(1, "cześć", "hello", Some(" polish "), start(), &conn).unwrap();

        assert_eq!(card.front, "cześć");
        assert_eq!(card.topic.as_deref(), Some("polish"));
        assert_eq!(card.created_at, start());
        assert_eq!(card.schedule, ScheduleState::new(start()));
    }

    #[test]
    fn test_add_card_requires_both_sides() {
        let conn = setup();
        let result = add_card(1, "  ", "hello", None, start(), &conn);
        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert!(add_card(1, "front", "", None, start(), &conn).is_err());
        assert!(list_cards(1, None, &conn).unwrap().is_empty());
    }

    #[test]
    fn test_empty_topic_stored_as_none() {
        let conn = setup();
        let card = add_card(1, "a", "b", Some(""), start(), &conn).unwrap();
        assert!(card.topic.is_none());
    }

    #[test]
    fn test_edit_card_keeps_schedule() {
        let conn = setup();
        let card = add_card(1, "a", "b", None, start(), &conn).unwrap();

        let edited = edit_card(1, card.id, "a2", "b2", Some("math"), &conn).unwrap();
        assert_eq!(edited.front, "a2");
        assert_eq!(edited.back, "b2");
        assert_eq!(edited.topic.as_deref(), Some("math"));
        assert_eq!(edited.schedule, card.schedule);
    }

    #[test]
    fn test_ownership_checks() {
        let conn = setup();
        let card = add_card(1, "a", "b", None, start(), &conn).unwrap();

        assert!(matches!(
            edit_card(2, card.id, "x", "y", None, &conn),
            Err(TrackerError::AccessDenied(_))
        ));
        assert!(matches!(
            delete_card(2, card.id, &conn),
            Err(TrackerError::AccessDenied(_))
        ));
        assert!(matches!(
            delete_card(1, 999, &conn),
            Err(TrackerError::NotFound(999))
        ));

        delete_card(1, card.id, &conn).unwrap();
        assert!(matches!(get_card(card.id, &conn), Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn test_list_cards_and_topics() {
        let conn = setup();
        add_card(1, "a", "b", Some("rust"), start(), &conn).unwrap();
        add_card(1, "c", "d", Some("polish"), start() + Duration::hours(1), &conn).unwrap();
        add_card(1, "e", "f", None, start() + Duration::hours(2), &conn).unwrap();
        add_card(2, "g", "h", Some("biology"), start(), &conn).unwrap();

        let fronts: Vec<String> = list_cards(1, None, &conn)
            .unwrap()
            .into_iter()
            .map(|c| c.front)
            .collect();
        assert_eq!(fronts, vec!["e", "c", "a"]);

        let rust = list_cards(1, Some("rust"), &conn).unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(list_cards(1, Some(""), &conn).unwrap().len(), 3);

        assert_eq!(list_topics(1, &conn).unwrap(), vec!["polish", "rust"]);
    }

    #[test]
    fn test_seed_sample_cards_once() {
        let conn = setup();
        assert_eq!(seed_sample_cards(1, start(), &conn).unwrap(), 3);
        assert_eq!(seed_sample_cards(1, start(), &conn).unwrap(), 0);
        assert_eq!(list_cards(1, Some("polish"), &conn).unwrap().len(), 3);

        add_card(2, "a", "b", None, start(), &conn).unwrap();
        assert_eq!(seed_sample_cards(2, start(), &conn).unwrap(), 0);
    }

    #[test]
    fn test_seed_sample_cards_reports_database_errors() {
        let conn = setup();
        conn.execute("DROP TABLE study_cards", ()).unwrap();
        assert!(matches!(
            seed_sample_cards(1, start(), &conn),
            Err(TrackerError::Database(_))
        ));
    }

    #[test]
    fn test_sessions() {
        let conn = setup();
        record_session(1, SessionKind::Pomodoro, 25, 0, start(), &conn).unwrap();
        record_session(1, SessionKind::Review, 12, 8, start() + Duration::hours(1), &conn)
            .unwrap();
        record_session(2, SessionKind::Study, 40, 0, start(), &conn).unwrap();

        let recent = recent_sessions(1, Some(5), &conn).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, SessionKind::Review);
        assert_eq!(recent[0].cards_reviewed, 8);

        assert_eq!(recent_sessions(1, Some(1), &conn).unwrap().len(), 1);
    }

    #[test]
    fn test_log_study_time() {
        let conn = setup();
        let study = log_study_time(1, SessionKind::Study, 50, start(), &conn).unwrap();
        assert_eq!(study.kind, SessionKind::Study);
        assert_eq!(study.duration_minutes, 50);
        log_study_time(1, SessionKind::Pomodoro, 25, start(), &conn).unwrap();

        assert!(matches!(
            log_study_time(1, SessionKind::Study, 0, start(), &conn),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            log_study_time(1, SessionKind::Review, 10, start(), &conn),
            Err(TrackerError::Validation(_))
        ));

        let stats = collect_statistics(1, start(), &conn).unwrap();
        assert_eq!(stats.total_study_minutes, 75);
        assert_eq!(stats.pomodoro_sessions, 1);
        assert_eq!(recent_sessions(1, None, &conn).unwrap().len(), 2);
    }

    #[test]
    fn test_collect_statistics() {
        let conn = setup();
        add_card(1, "a", "b", Some("rust"), start(), &conn).unwrap();
        add_card(1, "c", "d", None, start(), &conn).unwrap();
        record_session(1, SessionKind::Pomodoro, 25, 0, start(), &conn).unwrap();

        let stats = collect_statistics(1, start(), &conn).unwrap();
        assert_eq!(stats.total_cards, 2);
        assert_eq!(stats.cards_due, 2);
        assert_eq!(stats.cards_reviewed, 0);
        assert_eq!(stats.total_study_minutes, 25);
        assert_eq!(stats.pomodoro_sessions, 1);
    }
}
