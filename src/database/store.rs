//! Persistence boundary for review scheduling state.

use super::db::{CARD_COLUMNS, get_card, row_to_item};
use crate::error::Result;
use crate::models::ReviewItem;
use rusqlite::{Connection, params};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Stored state no longer matches what the caller advanced from.
    Conflict,
}

/// Where review items live between reviews.
pub trait ReviewItemStore {
    fn load(&self, item_id: i64) -> Result<ReviewItem>;

    /// Persists an item that has just been advanced by one review.
    ///
    /// The write is compare-and-swap on `review_count`: it only lands if the
    /// stored count is exactly one less than `item`'s, otherwise nothing is
    /// written and [`SaveOutcome::Conflict`] is returned.
    fn save(&self, item: &ReviewItem) -> Result<SaveOutcome>;

    fn list_for_user(
        &self,
        user_id: i64,
        predicate: &dyn Fn(&ReviewItem) -> bool,
    ) -> Result<Vec<ReviewItem>>;
}

impl ReviewItemStore for Connection {
    fn load(&self, item_id: i64) -> Result<ReviewItem> {
        get_card(item_id, self)
    }

    fn save(&self, item: &ReviewItem) -> Result<SaveOutcome> {
        let Some(expected_count) = item.schedule.review_count.checked_sub(1) else {
            warn!(id = item.id, "refusing to save an item that was never advanced");
            return Ok(SaveOutcome::Conflict);
        };
        let schedule = &item.schedule;

        // Single statement so the four scheduling fields change together
        let updated = self.execute(
            "UPDATE study_cards
             SET difficulty = ?1, review_count = ?2, last_reviewed = ?3, next_review = ?4
             WHERE id = ?5 AND review_count = ?6",
            params![
                schedule.difficulty_factor,
                schedule.review_count,
                schedule.last_reviewed_at.map(|t| t.timestamp()),
                schedule.next_review_at.map(|t| t.timestamp()),
                item.id,
                expected_count,
            ],
        )?;

        if updated == 1 {
            return Ok(SaveOutcome::Saved);
        }
        // Surface a deleted row as NotFound rather than a retryable conflict
        get_card(item.id, self)?;
        warn!(id = item.id, expected_count, "stale review_count, write rejected");
        Ok(SaveOutcome::Conflict)
    }

    fn list_for_user(
        &self,
        user_id: i64,
        predicate: &dyn Fn(&ReviewItem) -> bool,
    ) -> Result<Vec<ReviewItem>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM study_cards WHERE user_id = ?1 ORDER BY id");
        let mut stmt = self.prepare(&sql)?;
        let mut items = Vec::new();
        for item in stmt.query_map(params![user_id], row_to_item)? {
            let item = item?;
            if predicate(&item) {
                items.push(item);
            }
        }
        Ok(items)
    }
}
