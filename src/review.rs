//! Review flow used by the application: query due cards, pick one, grade it.

use crate::database::{ReviewItemStore, SaveOutcome};
use crate::error::{Result, TrackerError};
use crate::models::{Quality, ReviewItem, scheduler};
use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

/// Cards of `user_id` due at `now`, optionally limited to one topic.
///
/// An empty vector means nothing is due; check it before calling [`pick_next`].
pub fn get_due_items<S>(
    store: &S,
    user_id: i64,
    now: DateTime<Utc>,
    topic: Option<&str>,
) -> Result<Vec<ReviewItem>>
where
    S: ReviewItemStore + ?Sized,
{
    let due = store.list_for_user(user_id, &|item| scheduler::is_due_for(item, now, topic))?;
    debug!(user_id, due = due.len(), ?topic, "due set loaded");
    Ok(due)
}

/// Picks the next card to show, uniformly at random.
pub fn pick_next<'a, R>(due_items: &'a [ReviewItem], rng: &mut R) -> Result<&'a ReviewItem>
where
    R: Rng + ?Sized,
{
    scheduler::select(due_items, rng)
}

/// Applies a quality grade to a stored card and persists the new schedule.
///
/// `now` is truncated to whole seconds, the precision the store keeps, so
/// the returned card equals what a later `load` reads back.
/// `quality` outside 0..=5 is rejected before the card is read. A
/// [`TrackerError::PersistenceConflict`] means another review landed first;
/// nothing was written and the whole call can be retried.
pub fn submit_review<S>(
    store: &S,
    item_id: i64,
    quality: i64,
    now: DateTime<Utc>,
) -> Result<ReviewItem>
where
    S: ReviewItemStore + ?Sized,
{
    let quality = Quality::new(quality)?;
    let now = now.trunc_subsecs(0);
    let mut item = store.load(item_id)?;
    item.schedule = scheduler::advance(&item.schedule, quality, now);

    match store.save(&item)? {
        SaveOutcome::Saved => {
            info!(
                id = item_id,
                quality = quality.value(),
                difficulty = item.schedule.difficulty_factor,
                interval_days = item.schedule.interval_days().unwrap_or_default(),
                "review submitted"
            );
            Ok(item)
        }
        SaveOutcome::Conflict => {
            warn!(id = item_id, "review lost a concurrent write");
            Err(TrackerError::PersistenceConflict(item_id))
        }
    }
}

/// [`submit_review`], re-reading and retrying up to `attempts` times on conflict.
pub fn submit_review_with_retry<S>(
    store: &S,
    item_id: i64,
    quality: i64,
    now: DateTime<Utc>,
    attempts: usize,
) -> Result<ReviewItem>
where
    S: ReviewItemStore + ?Sized,
{
    let mut remaining = attempts.max(1);
    loop {
        match submit_review(store, item_id, quality, now) {
            Err(TrackerError::PersistenceConflict(_)) if remaining > 1 => {
                remaining -= 1;
                debug!(id = item_id, remaining, "retrying review after conflict");
            }
            other => return other,
        }
    }
}
