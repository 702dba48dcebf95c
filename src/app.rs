//! Main application UI and state management.
//! Handles card management, study statistics and review sittings.

use chrono::{DateTime, Utc};
use eframe::egui;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use study_tracker::database::db;
use study_tracker::models::study_session::DEFAULT_POMODORO_MINUTES;
use study_tracker::models::{
    Quality, ReviewItem, ReviewSession, SessionKind, StudySession, StudyStatistics,
};
use study_tracker::{Result, TrackerError};
use tracing::{error, warn};

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review,
}

/// Main application state
pub struct MyApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    conn: Arc<Mutex<Connection>>,
    user_id: i64,

    current_screen: AppScreen,
    review_session: Option<ReviewSession>,

    current_date_display: String,
    new_front: String,
    new_back: String,
    new_topic: String,
    topic_filter: String,
    session_kind: SessionKind,
    session_minutes: u32,

    cards: Vec<ReviewItem>,
    topics: Vec<String>,
    statistics: StudyStatistics,
    recent_sessions: Vec<StudySession>,

    status_message: Option<String>,
}

/// Formats a timestamp as YYYY-MM-DD string
fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review => self.render_review_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if let Some(message) = self.status_message.clone() {
            egui::Window::new("Notice")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.status_message = None;
                    }
                });
        }
    }
}

impl MyApp {
    /// Creates the application and loads the user's cards
    pub fn new(conn: Connection, user_id: i64) -> Self {
        let mut app = Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            conn: Arc::new(Mutex::new(conn)),
            user_id,
            current_screen: AppScreen::Main,
            review_session: None,
            current_date_display: String::new(),
            new_front: String::new(),
            new_back: String::new(),
            new_topic: String::new(),
            topic_filter: String::new(),
            session_kind: SessionKind::Pomodoro,
            session_minutes: DEFAULT_POMODORO_MINUTES,
            cards: Vec::new(),
            topics: Vec::new(),
            statistics: StudyStatistics::default(),
            recent_sessions: Vec::new(),
            status_message: None,
        };
        app.refresh();
        app
    }

    /// Runs `f` with the locked connection, reporting failures in the notice window
    fn with_conn<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Option<T> {
        let result = match self.conn.lock() {
            Ok(conn) => f(&*conn),
            Err(_) => Err(TrackerError::LockPoisoned),
        };
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{e}");
                self.status_message = Some(e.to_string());
                None
            }
        }
    }

    /// Reloads everything shown on the main screen
    fn refresh(&mut self) {
        let user_id = self.user_id;
        let topic = self.topic_filter.clone();
        let loaded = self.with_conn(|conn| {
            let now = db::get_current_date(conn)?;
            Ok((
                now,
                db::list_cards(user_id, Some(topic.as_str()), conn)?,
                db::list_topics(user_id, conn)?,
                db::collect_statistics(user_id, now, conn)?,
                db::recent_sessions(user_id, Some(5), conn)?,
            ))
        });

        if let Some((now, cards, topics, statistics, recent_sessions)) = loaded {
            self.current_date_display = format_date(now);
            self.cards = cards;
            self.topics = topics;
            self.statistics = statistics;
            self.recent_sessions = recent_sessions;
        }
    }

    /// Renders the main screen with card management and statistics
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        let mut action_refresh = false;
        let mut action_delete: Option<i64> = None;
        let mut action_review = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.current_date_display);

                if ui.button("Next Day").clicked() {
                    self.with_conn(db::advance_day);
                    action_refresh = true;
                }

            });

            // Study timer log
            ui.horizontal(|ui| {
                egui::ComboBox::from_id_source("session_kind")
                    .selected_text(self.session_kind.as_str())
                    .show_ui(ui, |ui| {
                        for kind in [SessionKind::Pomodoro, SessionKind::Study] {
                            ui.selectable_value(&mut self.session_kind, kind, kind.as_str());
                        }
                    });
                ui.add(egui::DragValue::new(&mut self.session_minutes).suffix(" min"));

                if ui.button("Log Session").clicked() {
                    let (user_id, kind, minutes) =
                        (self.user_id, self.session_kind, self.session_minutes);
                    self.with_conn(|conn| {
                        let now = db::get_current_date(conn)?;
                        db::log_study_time(user_id, kind, minutes, now, conn)
                    });
                    action_refresh = true;
                }
            });
            ui.separator();

            // Statistics
            let stats = &self.statistics;
            ui.heading("Overview");
            ui.label(format!(
                "{} cards, {} reviewed, {} due",
                stats.total_cards, stats.cards_reviewed, stats.cards_due
            ));
            ui.label(format!(
                "{} minutes studied, {} pomodoros",
                stats.total_study_minutes, stats.pomodoro_sessions
            ));
            for (topic, topic_stats) in &stats.topics {
                ui.label(format!(
                    "   {}: {} / {} reviewed",
                    topic, topic_stats.reviewed, topic_stats.total
                ));
            }
            for session in &self.recent_sessions {
                ui.label(format!(
                    "   {} {} ({} min, {} cards)",
                    format_date(session.date),
                    session.kind,
                    session.duration_minutes,
                    session.cards_reviewed
                ));
            }

            ui.separator();

            // Card creation section
            ui.heading("Add Card");
            ui.horizontal(|ui| {
                ui.label("Front:");
                ui.text_edit_singleline(&mut self.new_front);
            });
            ui.horizontal(|ui| {
                ui.label("Back:");
                ui.text_edit_singleline(&mut self.new_back);
            });
            ui.horizontal(|ui| {
                ui.label("Topic:");
                ui.text_edit_singleline(&mut self.new_topic);
            });
            if ui.button("Add Card").clicked() {
                let (user_id, front, back, topic) = (
                    self.user_id,
                    self.new_front.clone(),
                    self.new_back.clone(),
                    self.new_topic.clone(),
                );
                let added = self.with_conn(|conn| {
                    let now = db::get_current_date(conn)?;
                    db::add_card(user_id, &front, &back, Some(topic.as_str()), now, conn)
                });
                if added.is_some() {
                    self.new_front.clear();
                    self.new_back.clear();
                }
                action_refresh = true;
            }

            ui.separator();

            let previous_filter = self.topic_filter.clone();
            ui.horizontal(|ui| {
                egui::ComboBox::from_label("Topic filter")
                    .selected_text(if self.topic_filter.is_empty() {
                        "All topics"
                    } else {
                        self.topic_filter.as_str()
                    })
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut self.topic_filter, String::new(), "All topics");
                        for topic in &self.topics {
                            ui.selectable_value(&mut self.topic_filter, topic.clone(), topic.as_str());
                        }
                    });

                if ui.button("Review").clicked() {
                    action_review = true;
                }
            });
            if previous_filter != self.topic_filter {
                action_refresh = true;
            }

            ui.heading(format!("Cards ({})", self.cards.len()));

            egui::ScrollArea::vertical()
                .id_source("cards_list")
                .max_height(250.0)
                .show(ui, |ui| {
                    for (i, card) in self.cards.iter().enumerate() {
                        ui.group(|ui| {
                            ui.horizontal(|ui| {
                                ui.label(format!("{}. {}", i + 1, card.front));
                                if ui.button("Delete").clicked() {
                                    action_delete = Some(card.id);
                                }
                            });
                            ui.label(format!("   Back: {}", card.back));
                            let next = card
                                .schedule
                                .next_review_at
                                .map(format_date)
                                .unwrap_or_else(|| "now".to_string());
                            ui.label(format!(
                                "   Reviews: {}, difficulty {:.2}, next: {}",
                                card.schedule.review_count, card.schedule.difficulty_factor, next
                            ));
                        });
                    }
                });
        });

        // Execute deferred actions
        if let Some(id) = action_delete {
            let user_id = self.user_id;
            self.with_conn(|conn| db::delete_card(user_id, id, conn));
            action_refresh = true;
        }
        if action_review {
            self.start_review_session();
        }
        if action_refresh {
            self.refresh();
        }
    }

    /// Renders the review screen: front, reveal, then quality grades
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        let mut action_back = false;
        let mut action_grade: Option<u8> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &mut self.review_session else {
                action_back = true;
                return;
            };

            ui.heading("Review");
            ui.label(session.progress_message());
            ui.add_space(20.0);

            if session.is_completed() {
                ui.heading("Nothing left to review");
                ui.label("Come back when more cards are due.");
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    action_back = true;
                }
                return;
            }

            let show_answer = session.show_answer;
            let (front, back, topic) = match session.current_card() {
                Some(card) => (card.front.clone(), card.back.clone(), card.topic.clone()),
                None => return,
            };

            ui.group(|ui| {
                ui.set_min_height(200.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    if let Some(topic) = &topic {
                        ui.label(format!("[{topic}]"));
                    }
                    ui.heading(front.as_str());
                    ui.add_space(20.0);

                    if show_answer {
                        ui.label(&back);
                    } else {
                        ui.label("(Click 'Show Answer' to reveal)");
                    }
                    ui.add_space(20.0);
                });
            });

            ui.add_space(20.0);

            if !show_answer {
                if ui.button("Show Answer").clicked() {
                    session.toggle_answer();
                }
            } else {
                ui.label("Rate your response:");
                let grades: Vec<Quality> = Quality::all().collect();
                for row in grades.chunks(3) {
                    ui.horizontal(|ui| {
                        for quality in row {
                            let text = format!("{} - {}", quality.value(), quality.label());
                            if ui.button(text).clicked() {
                                action_grade = Some(quality.value());
                            }
                        }
                    });
                }
            }

            ui.add_space(20.0);

            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }
        });

        if let Some(quality) = action_grade {
            if let Some(session) = &mut self.review_session {
                if let Err(e) = session.grade_current_card(quality) {
                    warn!("review not saved: {e}");
                    self.status_message = Some(e.to_string());
                }
            }
        }
        if action_back {
            self.end_review_session();
        }
    }

    /// Starts a review sitting over the cards due now, honouring the topic filter
    fn start_review_session(&mut self) {
        let topic = Some(self.topic_filter.clone());
        match ReviewSession::start(
            self.user_id,
            topic,
            Arc::clone(&self.conn),
            StdRng::from_entropy(),
        ) {
            Ok(session) if session.is_completed() => {
                self.status_message = Some("No cards are due for review.".to_string());
            }
            Ok(session) => {
                self.review_session = Some(session);
                self.current_screen = AppScreen::Review;
            }
            Err(e) => {
                error!("could not start review: {e}");
                self.status_message = Some(e.to_string());
            }
        }
    }

    fn end_review_session(&mut self) {
        if let Some(session) = self.review_session.take() {
            if let Err(e) = session.finish() {
                error!("could not log review session: {e}");
                self.status_message = Some(e.to_string());
            }
        }
        self.current_screen = AppScreen::Main;
        self.refresh();
    }
}
