//! Review sitting management for spaced repetition practice.
//! Repeatedly draws a random due card, grades it and stops once nothing is due.

use super::{ReviewItem, SessionKind, StudySession};
use crate::database::db;
use crate::error::{Result, TrackerError};
use crate::review::{get_due_items, pick_next, submit_review_with_retry};
use rand::rngs::StdRng;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Attempts per grade before a concurrent write is reported to the user.
const SUBMIT_ATTEMPTS: usize = 2;

/// One sitting of reviews for a user.
///
/// The due set is re-queried after every grade. Failed cards are due the
/// next day, so only a card whose interval truncated to 0 days is drawn
/// again in the same sitting.
pub struct ReviewSession {
    pub user_id: i64,
    pub topic: Option<String>,
    pub current: Option<ReviewItem>,
    pub due_count: usize,
    pub show_answer: bool,
    pub reviewed_count: u32,
    pub conn: Arc<Mutex<Connection>>,
    rng: StdRng,
    started: Instant,
}

fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| TrackerError::LockPoisoned)
}

impl ReviewSession {
    /// Starts a sitting and draws the first card. `topic` narrows the due set.
    pub fn start(
        user_id: i64,
        topic: Option<String>,
        conn: Arc<Mutex<Connection>>,
        rng: StdRng,
    ) -> Result<Self> {
        let mut session = Self {
            user_id,
            topic: topic.filter(|t| !t.is_empty()),
            current: None,
            due_count: 0,
            show_answer: false,
            reviewed_count: 0,
            conn,
            rng,
            started: Instant::now(),
        };
        session.draw_next()?;
        Ok(session)
    }

    /// Re-reads the due set at the current simulated date and picks one card.
    fn draw_next(&mut self) -> Result<()> {
        let due = {
            let conn = lock(&self.conn)?;
            let now = db::get_current_date(&conn)?;
            get_due_items(&*conn, self.user_id, now, self.topic.as_deref())?
        };

        self.due_count = due.len();
        self.show_answer = false;
        self.current = match pick_next(&due, &mut self.rng) {
            Ok(item) => Some(item.clone()),
            Err(TrackerError::EmptySet) => None,
            Err(e) => return Err(e),
        };
        Ok(())
    }

    pub fn current_card(&self) -> Option<&ReviewItem> {
        self.current.as_ref()
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    /// Grades the current card, persists its new schedule and draws the next one.
    /// Returns the updated card.
    pub fn grade_current_card(&mut self, quality: u8) -> Result<ReviewItem> {
        let id = self.current.as_ref().ok_or(TrackerError::EmptySet)?.id;

        let updated = {
            let conn = lock(&self.conn)?;
            db::get_owned_card(self.user_id, id, &conn)?;
            let now = db::get_current_date(&conn)?;
            submit_review_with_retry(&*conn, id, quality as i64, now, SUBMIT_ATTEMPTS)?
        };

        self.reviewed_count += 1;
        self.draw_next()?;
        Ok(updated)
    }

    /// True once no card is due.
    pub fn is_completed(&self) -> bool {
        self.current.is_none()
    }

    pub fn progress_message(&self) -> String {
        match &self.topic {
            Some(topic) => format!(
                "Topic '{}': {} due, {} reviewed",
                topic, self.due_count, self.reviewed_count
            ),
            None => format!("{} due, {} reviewed", self.due_count, self.reviewed_count),
        }
    }

    /// Logs the sitting as a review session if anything was graded.
    pub fn finish(self) -> Result<Option<StudySession>> {
        if self.reviewed_count == 0 {
            return Ok(None);
        }
        let minutes = (self.started.elapsed().as_secs() / 60) as u32;
        let conn = lock(&self.conn)?;
        let date = db::get_current_date(&conn)?;
        let session = db::record_session(
            self.user_id,
            SessionKind::Review,
            minutes,
            self.reviewed_count,
            date,
            &conn,
        )?;
        Ok(Some(session))
    }
}
