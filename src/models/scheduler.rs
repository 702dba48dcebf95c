//! Adaptive review scheduler, a simplified SM-2 variant.
//!
//! - The first review seeds the difficulty factor at 2.5, whatever the grade
//! - Later reviews adjust it by the SM-2 polynomial, floored at 0 with no upper cap
//! - Grades 0-2 always bring the card back the next day
//! - Grades 3-5 grow the interval: 1 day, 6 days, then difficulty × review count
//!
//! Everything here is pure: the current time and the random source are passed in.

use super::{Quality, ReviewItem, ScheduleState};
use crate::error::{Result, TrackerError};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

/// Difficulty assigned on an item's first review.
pub const INITIAL_DIFFICULTY: f64 = 2.5;

/// Updated difficulty factor after a review graded `quality`.
///
/// A factor of exactly `0.0` marks an unreviewed item and is reseeded to
/// [`INITIAL_DIFFICULTY`].
pub fn next_difficulty(current: f64, quality: Quality) -> f64 {
    if current == 0.0 {
        return INITIAL_DIFFICULTY;
    }
    let miss = (Quality::MAX - quality.value()) as f64;
    (current + (0.1 - miss * (0.08 + miss * 0.02))).max(0.0)
}

/// Days until the next review.
///
/// `review_count` is the count before this review and `difficulty` the
/// already-updated factor. The result is 0 when the product truncates to 0
/// and saturates at `i64::MAX` for products beyond it.
pub fn interval_days(quality: Quality, review_count: u32, difficulty: f64) -> i64 {
    if !quality.is_pass() {
        return 1;
    }
    match review_count {
        0 => 1,
        1 => 6,
        n => (difficulty * n as f64).floor() as i64,
    }
}

/// Latest whole-second instant, where out-of-range schedules are pinned.
pub fn latest_review_date() -> DateTime<Utc> {
    DateTime::<Utc>::MAX_UTC.trunc_subsecs(0)
}

fn add_days_saturating(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or_else(latest_review_date)
}

/// Computes the state after a review at `now`. Never fails: an interval past
/// the end of the calendar schedules the item at [`latest_review_date`].
pub fn advance(state: &ScheduleState, quality: Quality, now: DateTime<Utc>) -> ScheduleState {
    let difficulty_factor = next_difficulty(state.difficulty_factor, quality);
    let interval = interval_days(quality, state.review_count, difficulty_factor);

    ScheduleState {
        difficulty_factor,
        review_count: state.review_count.saturating_add(1),
        last_reviewed_at: Some(now),
        next_review_at: Some(add_days_saturating(now, interval)),
    }
}

/// Due-set membership plus the optional topic equality filter.
/// An empty topic means no filter.
pub fn is_due_for(item: &ReviewItem, now: DateTime<Utc>, topic: Option<&str>) -> bool {
    let topic_matches = match topic.filter(|t| !t.is_empty()) {
        Some(t) => item.has_topic(t),
        None => true,
    };
    topic_matches && item.schedule.is_due(now)
}

/// Items that must be reviewed at `now`. An empty result means nothing is due.
pub fn due_set<I>(items: I, now: DateTime<Utc>, topic: Option<&str>) -> Vec<ReviewItem>
where
    I: IntoIterator<Item = ReviewItem>,
{
    items
        .into_iter()
        .filter(|item| is_due_for(item, now, topic))
        .collect()
}

/// Picks one candidate uniformly at random. There is no priority ordering.
pub fn select<'a, T, R>(candidates: &'a [T], rng: &mut R) -> Result<&'a T>
where
    R: Rng + ?Sized,
{
    candidates.choose(rng).ok_or(TrackerError::EmptySet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn q(value: i64) -> Quality {
        Quality::new(value).unwrap()
    }

    fn state(difficulty_factor: f64, review_count: u32) -> ScheduleState {
        ScheduleState {
            difficulty_factor,
            review_count,
            last_reviewed_at: (review_count > 0).then(|| now() - Duration::days(3)),
            next_review_at: Some(now()),
        }
    }

    fn item(id: i64, topic: Option<&str>, next_review_at: Option<DateTime<Utc>>) -> ReviewItem {
        ReviewItem {
            id,
            user_id: 1,
            front: format!("front {id}"),
            back: format!("back {id}"),
            topic: topic.map(str::to_string),
            created_at: now() - Duration::days(30),
            schedule: ScheduleState {
                next_review_at,
                ..ScheduleState::new(now())
            },
        }
    }

    #[test]
    fn test_first_review_seeds_difficulty() {
        for quality in Quality::all() {
            let next = advance(&ScheduleState::new(now()), quality, now());
            assert_eq!(next.difficulty_factor, INITIAL_DIFFICULTY);
            assert_eq!(next.review_count, 1);
        }
    }

    #[test]
    fn test_first_review() {
        let next = advance(&ScheduleState::new(now()), q(4), now());
        assert_eq!(next.difficulty_factor, 2.5);
        assert_eq!(next.last_reviewed_at, Some(now()));
        assert_eq!(next.next_review_at, Some(now() + Duration::days(1)));
    }

    #[test]
    fn test_second_review() {
        let next = advance(&state(2.5, 1), q(5), now());
        assert!((next.difficulty_factor - 2.6).abs() < 1e-9);
        assert_eq!(next.review_count, 2);
        assert_eq!(next.next_review_at, Some(now() + Duration::days(6)));
    }

    #[test]
    fn test_third_review_failed() {
        let next = advance(&state(2.6, 2), q(2), now());
        // 2.6 + (0.1 - 3 * (0.08 + 3 * 0.02))
        assert!((next.difficulty_factor - 2.28).abs() < 1e-9);
        assert_eq!(next.interval_days(), Some(1));
        assert_eq!(next.review_count, 3);
    }

    #[test]
    fn test_third_review_passed_uses_updated_difficulty() {
        // 2.6 + 0.1 = 2.7, floor(2.7 * 2) = 5
        let next = advance(&state(2.6, 2), q(5), now());
        assert_eq!(next.interval_days(), Some(5));

        // quality 4 leaves difficulty unchanged: floor(2.5 * 4) = 10
        let next = advance(&state(2.5, 4), q(4), now());
        assert_eq!(next.interval_days(), Some(10));
    }

    #[test]
    fn test_failed_review_always_next_day() {
        for quality in [q(0), q(1), q(2)] {
            for (difficulty, count) in [(0.0, 0), (2.5, 1), (3.7, 9), (0.4, 40)] {
                let next = advance(&state(difficulty, count), quality, now());
                assert_eq!(next.interval_days(), Some(1));
            }
        }
    }

    #[test]
    fn test_difficulty_deltas() {
        let cases = [(5, 0.1), (4, 0.0), (3, -0.14), (2, -0.32), (1, -0.54), (0, -0.8)];
        for (quality, delta) in cases {
            let next = next_difficulty(2.0, q(quality));
            assert!((next - (2.0 + delta)).abs() < 1e-9, "quality {quality}");
        }
    }

    #[test]
    fn test_difficulty_floor_clamped() {
        let next = advance(&state(0.3, 6), q(0), now());
        assert_eq!(next.difficulty_factor, 0.0);

        for quality in Quality::all() {
            assert!(advance(&state(0.05, 3), quality, now()).difficulty_factor >= 0.0);
        }
    }

    #[test]
    fn test_difficulty_has_no_upper_cap() {
        let mut current = state(2.5, 1);
        for _ in 0..50 {
            current = advance(&current, q(5), now());
        }
        assert!((current.difficulty_factor - 7.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_difficulty_is_reseeded() {
        let next = advance(&state(0.0, 7), q(3), now());
        assert_eq!(next.difficulty_factor, INITIAL_DIFFICULTY);
        // floor(2.5 * 7) = 17
        assert_eq!(next.interval_days(), Some(17));
    }

    #[test]
    fn test_interval_can_truncate_to_zero() {
        // 0.2 - 0.14 = 0.06, floor(0.06 * 3) = 0
        let next = advance(&state(0.2, 3), q(3), now());
        assert_eq!(next.next_review_at, Some(now()));
        assert!(next.is_due(now()));
    }

    #[test]
    fn test_huge_interval_saturates_date() {
        // floor(2.5 * 100_000_000) days is past the last representable date
        let next = advance(&state(2.5, 100_000_000), q(4), now());
        assert_eq!(next.review_count, 100_000_001);
        assert_eq!(next.last_reviewed_at, Some(now()));
        assert_eq!(next.next_review_at, Some(latest_review_date()));
        assert!(!next.is_due(now()));

        let next = advance(&state(f64::MAX, 5), q(5), now());
        assert_eq!(interval_days(q(5), 5, f64::MAX), i64::MAX);
        assert_eq!(next.next_review_at, Some(latest_review_date()));
    }

    #[test]
    fn test_review_count_saturates() {
        let next = advance(&state(2.5, u32::MAX), q(1), now());
        assert_eq!(next.review_count, u32::MAX);
        assert_eq!(next.interval_days(), Some(1));
    }

    #[test]
    fn test_due_set() {
        let items = vec![
            item(1, None, None),
            item(2, None, Some(now() - Duration::hours(2))),
            item(3, None, Some(now() + Duration::hours(2))),
            item(4, None, Some(now())),
        ];

        let due: Vec<i64> = due_set(items, now(), None).iter().map(|i| i.id).collect();
        assert_eq!(due, vec![1, 2, 4]);
    }

    #[test]
    fn test_due_set_topic_filter() {
        let items = vec![
            item(1, Some("rust"), None),
            item(2, Some("polish"), None),
            item(3, None, None),
            item(4, Some("rust"), Some(now() + Duration::days(1))),
        ];

        let due: Vec<i64> = due_set(items.clone(), now(), Some("rust"))
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(due, vec![1]);

        assert_eq!(due_set(items.clone(), now(), Some("")).len(), 3);
        assert!(due_set(items, now(), Some("math")).is_empty());
    }

    #[test]
    fn test_select_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty: Vec<ReviewItem> = Vec::new();
        assert!(matches!(select(&empty, &mut rng), Err(TrackerError::EmptySet)));
    }

    #[test]
    fn test_select_single() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = vec![item(9, None, None)];
        assert_eq!(select(&items, &mut rng).unwrap().id, 9);
    }

    #[test]
    fn test_select_is_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<ReviewItem> = (0..4).map(|id| item(id, None, None)).collect();
        let mut counts = [0usize; 4];

        let trials = 40_000;
        for _ in 0..trials {
            let picked = select(&items, &mut rng).unwrap();
            counts[picked.id as usize] += 1;
        }

        for count in counts {
            // expected 10_000 each
            assert!((9_000..11_000).contains(&count), "counts: {counts:?}");
        }
    }

    #[test]
    fn test_select_is_deterministic_for_seed() {
        let items: Vec<ReviewItem> = (0..10).map(|id| item(id, None, None)).collect();
        let a = select(&items, &mut StdRng::seed_from_u64(3)).unwrap().id;
        let b = select(&items, &mut StdRng::seed_from_u64(3)).unwrap().id;
        assert_eq!(a, b);
    }
}
