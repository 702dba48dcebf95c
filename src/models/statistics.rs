//! Aggregate numbers for the study overview.
use super::{ReviewItem, SessionKind, StudySession};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Bucket used for cards without a topic.
pub const NO_TOPIC: &str = "No topic";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopicStats {
    pub total: usize,
    pub reviewed: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StudyStatistics {
    pub total_cards: usize,
    pub cards_reviewed: usize,
    pub cards_due: usize,
    pub total_study_minutes: u64,
    pub pomodoro_sessions: usize,
    pub topics: BTreeMap<String, TopicStats>,
}

impl StudyStatistics {
    pub fn compute(cards: &[ReviewItem], sessions: &[StudySession], now: DateTime<Utc>) -> Self {
        let mut stats = StudyStatistics {
            total_cards: cards.len(),
            ..Default::default()
        };

        for card in cards {
            let reviewed = !card.schedule.is_new();
            if reviewed {
                stats.cards_reviewed += 1;
            }
            if card.schedule.is_due(now) {
                stats.cards_due += 1;
            }

            let topic = card.topic.as_deref().unwrap_or(NO_TOPIC);
            let entry = stats.topics.entry(topic.to_string()).or_default();
            entry.total += 1;
            if reviewed {
                entry.reviewed += 1;
            }
        }

        stats.total_study_minutes = sessions.iter().map(|s| s.duration_minutes as u64).sum();
        stats.pomodoro_sessions = sessions
            .iter()
            .filter(|s| s.kind == SessionKind::Pomodoro)
            .count();

        stats
    }
}
