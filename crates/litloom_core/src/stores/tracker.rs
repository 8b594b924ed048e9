//! crates/litloom_core/src/stores/tracker.rs
//!
//! Reading-session log plus the daily minutes goal setting. Sessions are kept
//! sorted newest first after every mutation; derived metrics live in
//! [`crate::metrics`] and are recomputed on demand.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{NewReadingSession, ReadingSession, ReadingSessionPatch, TrackerSettings};
use crate::metrics::{self, DailyGoalProgress, Totals, TrackerStats, WeekBucket};
use crate::observable::Subscription;
use crate::ports::Clock;
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::stores::{load_lenient_list, Persisted, Persistence};

const SESSIONS_KEY: &str = "tracker.sessions";
const SETTINGS_KEY: &str = "tracker.settings";

pub struct TrackerStore {
    sessions: Persisted<Vec<ReadingSession>>,
    settings: Persisted<TrackerSettings>,
    clock: Arc<dyn Clock>,
}

impl TrackerStore {
    pub fn new(storage: Arc<UserStorage>, session: &SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Persisted::new(
                storage.clone(),
                session,
                SESSIONS_KEY,
                load_sessions,
                Persistence::Always,
            ),
            settings: Persisted::new(
                storage,
                session,
                SETTINGS_KEY,
                load_settings,
                Persistence::Always,
            ),
            clock,
        }
    }

    pub fn sessions(&self) -> Vec<ReadingSession> {
        self.sessions.current()
    }

    pub fn settings(&self) -> TrackerSettings {
        self.settings.current()
    }

    pub fn subscribe_sessions<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Vec<ReadingSession>) + Send + Sync + 'static,
    {
        self.sessions.observable().subscribe(listener)
    }

    pub fn subscribe_settings<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TrackerSettings) + Send + Sync + 'static,
    {
        self.settings.observable().subscribe(listener)
    }

    /// Recomputes [`TrackerStats`] whenever the sessions or the settings change.
    /// Both returned handles must be kept alive for updates to keep flowing.
    ///
    /// While the identity switches, the two halves reload one after the other;
    /// nothing is emitted until both belong to the same user.
    pub fn subscribe_stats<F>(&self, listener: F) -> Vec<Subscription>
    where
        F: Fn(TrackerStats) + Send + Sync + 'static,
    {
        let emit = {
            let sessions = self.sessions.snapshot();
            let settings = self.settings.snapshot();
            let clock = Arc::clone(&self.clock);
            Arc::new(move || {
                let (Some((owner, list)), Some((settings_owner, settings))) =
                    (sessions.read(), settings.read())
                else {
                    return;
                };
                if owner != settings_owner {
                    return;
                }
                listener(metrics::stats(&list, &settings, clock.today()));
            })
        };

        let on_sessions = {
            let emit = Arc::clone(&emit);
            self.sessions.observable().subscribe(move |_| emit())
        };
        // The sessions subscription above already delivered the first value.
        let primed = AtomicBool::new(false);
        let on_settings = self.settings.observable().subscribe(move |_| {
            if primed.swap(true, Ordering::SeqCst) {
                emit();
            }
        });
        vec![on_sessions, on_settings]
    }

    /// Logs a session. Minutes and pages are floored at zero, blank text is dropped
    /// and a missing date means today.
    pub fn add_session(&self, input: NewReadingSession) -> ReadingSession {
        let session = ReadingSession {
            id: Uuid::new_v4().to_string(),
            date: input.date.unwrap_or_else(|| self.clock.today()),
            minutes: clamp_count(input.minutes),
            pages: input.pages.map(clamp_count),
            book_id: non_blank(input.book_id),
            book_title: non_blank(input.book_title),
            notes: non_blank(input.notes),
        };
        let stored = session.clone();
        self.sessions.mutate(move |list| {
            list.push(stored);
            sort_sessions(list);
            true
        });
        session
    }

    pub fn update_session(&self, id: &str, patch: ReadingSessionPatch) -> bool {
        self.sessions.mutate(|list| {
            let Some(session) = list.iter_mut().find(|s| s.id == id) else {
                return false;
            };
            if let Some(date) = patch.date {
                session.date = date;
            }
            if let Some(minutes) = patch.minutes {
                session.minutes = clamp_count(minutes);
            }
            if let Some(pages) = patch.pages {
                session.pages = Some(clamp_count(pages));
            }
            if patch.book_id.is_some() {
                session.book_id = non_blank(patch.book_id);
            }
            if patch.book_title.is_some() {
                session.book_title = non_blank(patch.book_title);
            }
            if patch.notes.is_some() {
                session.notes = non_blank(patch.notes);
            }
            sort_sessions(list);
            true
        })
    }

    pub fn remove_session(&self, id: &str) -> bool {
        self.sessions.mutate(|list| {
            let before = list.len();
            list.retain(|s| s.id != id);
            list.len() != before
        })
    }

    pub fn clear_all(&self) {
        self.sessions.commit(Vec::new());
    }

    /// Stored as at least five minutes.
    pub fn set_daily_goal_minutes(&self, minutes: i64) {
        let minutes = u32::try_from(minutes.max(i64::from(TrackerSettings::MIN_DAILY_GOAL_MINUTES)))
            .unwrap_or(u32::MAX);
        self.settings.commit(TrackerSettings {
            daily_goal_minutes: minutes,
        });
    }

    //=====================================================================================
    // Derived metrics
    //=====================================================================================

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn totals(&self) -> Totals {
        self.sessions.with(|list| metrics::totals(list))
    }

    pub fn daily_minutes(&self, days: u32) -> BTreeMap<NaiveDate, u64> {
        let today = self.today();
        self.sessions
            .with(|list| metrics::daily_minutes(list, today, days))
    }

    pub fn current_streak(&self) -> u32 {
        let today = self.today();
        self.sessions.with(|list| metrics::current_streak(list, today))
    }

    pub fn goal_progress_today(&self) -> DailyGoalProgress {
        let goal = self.settings().daily_goal_minutes;
        metrics::goal_progress(self.minutes_today(), goal)
    }

    pub fn weekly_minutes(&self) -> Vec<WeekBucket> {
        let today = self.today();
        self.sessions
            .with(|list| metrics::weekly_minutes(list, today, metrics::WEEKLY_BUCKETS))
    }

    pub fn minutes_for_date(&self, date: NaiveDate) -> u64 {
        self.sessions.with(|list| metrics::minutes_on(list, date))
    }

    pub fn pages_for_month(&self, year: i32, month: u32) -> u64 {
        self.sessions
            .with(|list| metrics::pages_in_month(list, year, month))
    }

    pub fn minutes_today(&self) -> u64 {
        self.minutes_for_date(self.today())
    }

    pub fn pages_this_month(&self) -> u64 {
        let today = self.today();
        self.pages_for_month(today.year(), today.month())
    }

    pub fn stats(&self) -> TrackerStats {
        let settings = self.settings();
        let today = self.today();
        self.sessions
            .with(|list| metrics::stats(list, &settings, today))
    }
}

/// Date descending, then id descending.
fn sort_sessions(list: &mut [ReadingSession]) {
    list.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
}

fn clamp_count(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn load_sessions(storage: &UserStorage, key: &str) -> Vec<ReadingSession> {
    let mut list: Vec<ReadingSession> = load_lenient_list(storage, key)
        .into_iter()
        .filter(|s: &ReadingSession| !s.id.is_empty())
        .collect();
    sort_sessions(&mut list);
    list
}

fn load_settings(storage: &UserStorage, key: &str) -> TrackerSettings {
    let raw: serde_json::Value = storage.get(key, serde_json::Value::Null);
    let goal = raw
        .get("dailyGoalMinutes")
        .and_then(crate::domain::lenient::number_from_value)
        .filter(|m| *m > 0.0)
        .map(|m| m.floor().min(f64::from(u32::MAX)) as u32)
        .filter(|m| *m > 0)
        .unwrap_or(TrackerSettings::DEFAULT_DAILY_GOAL_MINUTES);
    TrackerSettings {
        daily_goal_minutes: goal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, Harness};
    use serde_json::json;
    use std::sync::Mutex;

    fn tracker(h: &Harness) -> TrackerStore {
        TrackerStore::new(h.storage.clone(), &h.session, h.clock.clone())
    }

    fn log(t: &TrackerStore, date: NaiveDate, minutes: i64) -> ReadingSession {
        t.add_session(NewReadingSession {
            date: Some(date),
            minutes,
            ..Default::default()
        })
    }

    #[test]
    fn sessions_are_sorted_newest_first() {
        let h = Harness::new();
        let t = tracker(&h);
        log(&t, day(2026, 10, 1), 10);
        log(&t, day(2026, 10, 19), 10);
        log(&t, day(2026, 10, 5), 10);
        log(&t, day(2026, 10, 19), 10);

        let list = t.sessions();
        let dates: Vec<_> = list.iter().map(|s| s.date).collect();
        assert_eq!(
            dates,
            vec![
                day(2026, 10, 19),
                day(2026, 10, 19),
                day(2026, 10, 5),
                day(2026, 10, 1)
            ]
        );
        assert!(list[0].id > list[1].id);
    }

    #[test]
    fn inputs_are_sanitised() {
        let h = Harness::new();
        let t = tracker(&h);
        let s = t.add_session(NewReadingSession {
            minutes: -4,
            pages: Some(-1),
            book_title: Some("   ".into()),
            notes: Some(" good chapter ".into()),
            ..Default::default()
        });
        assert_eq!(s.minutes, 0);
        assert_eq!(s.pages, Some(0));
        assert_eq!(s.book_title, None);
        assert_eq!(s.notes.as_deref(), Some("good chapter"));
        assert_eq!(s.date, day(2026, 10, 19));
    }

    #[test]
    fn update_resorts_when_the_date_moves() {
        let h = Harness::new();
        let t = tracker(&h);
        let old = log(&t, day(2026, 10, 1), 10);
        log(&t, day(2026, 10, 10), 10);

        assert!(t.update_session(
            &old.id,
            ReadingSessionPatch {
                date: Some(day(2026, 10, 18)),
                minutes: Some(25),
                ..Default::default()
            }
        ));
        let first = &t.sessions()[0];
        assert_eq!(first.id, old.id);
        assert_eq!(first.minutes, 25);
    }

    #[test]
    fn streak_and_progress_follow_the_clock() {
        let h = Harness::new();
        let t = tracker(&h);
        log(&t, day(2026, 10, 19), 15);
        log(&t, day(2026, 10, 18), 20);
        log(&t, day(2026, 10, 17), 5);

        assert_eq!(t.current_streak(), 3);
        let progress = t.goal_progress_today();
        assert_eq!(progress.goal, 30);
        assert_eq!(progress.minutes, 15);
        assert_eq!(progress.percent, 50);
    }

    #[test]
    fn daily_goal_is_clamped_and_loaded_leniently() {
        let h = Harness::new();
        let t = tracker(&h);
        t.set_daily_goal_minutes(2);
        assert_eq!(t.settings().daily_goal_minutes, 5);

        h.storage
            .set("tracker.settings", &json!({ "dailyGoalMinutes": -3 }));
        let reloaded = tracker(&h);
        assert_eq!(reloaded.settings().daily_goal_minutes, 30);

        h.storage
            .set("tracker.settings", &json!({ "dailyGoalMinutes": "45.7" }));
        assert_eq!(tracker(&h).settings().daily_goal_minutes, 45);
    }

    #[test]
    fn unreadable_entries_are_dropped_on_load() {
        let h = Harness::new();
        h.storage.set(
            "tracker.sessions",
            &json!([
                { "id": "ok", "date": "2026-10-19", "minutes": 12 },
                { "id": "neg", "date": "2026-10-19", "minutes": -5 },
                { "id": "", "date": "2026-10-19", "minutes": 1 },
                "garbage"
            ]),
        );
        let t = tracker(&h);
        let ids: Vec<_> = t.sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn stats_subscription_recomputes_on_each_change() {
        let h = Harness::new();
        let t = tracker(&h);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subs = t.subscribe_stats(move |stats| {
            sink.lock()
                .unwrap()
                .push((stats.totals.minutes, stats.today.goal))
        });

        log(&t, day(2026, 10, 19), 10);
        t.set_daily_goal_minutes(60);

        assert_eq!(*seen.lock().unwrap(), vec![(0, 30), (10, 30), (10, 60)]);
    }

    #[test]
    fn stats_never_pair_one_users_sessions_with_anothers_goal() {
        let h = Harness::new();
        let t = tracker(&h);
        h.sign_in("ann@example.com");
        log(&t, day(2026, 10, 19), 10);
        t.set_daily_goal_minutes(60);
        h.sign_in("bob@example.com");
        log(&t, day(2026, 10, 19), 99);
        t.set_daily_goal_minutes(30);
        h.sign_in("ann@example.com");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subs = t.subscribe_stats(move |stats| {
            sink.lock()
                .unwrap()
                .push((stats.totals.minutes, stats.today.goal))
        });
        h.sign_in("bob@example.com");
        h.sign_in("ann@example.com");

        assert_eq!(*seen.lock().unwrap(), vec![(10, 60), (99, 30), (10, 60)]);
    }

    #[test]
    fn stats_follow_a_switch_between_users_with_the_same_goal() {
        let h = Harness::new();
        let t = tracker(&h);
        h.sign_in("ann@example.com");
        log(&t, day(2026, 10, 19), 10);
        h.sign_in("bob@example.com");
        log(&t, day(2026, 10, 19), 20);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subs = t.subscribe_stats(move |stats| sink.lock().unwrap().push(stats.totals.minutes));
        h.sign_in("ann@example.com");

        assert_eq!(*seen.lock().unwrap(), vec![20, 10]);
    }

    #[test]
    fn month_and_day_helpers() {
        let h = Harness::new();
        let t = tracker(&h);
        t.add_session(NewReadingSession {
            date: Some(day(2026, 10, 2)),
            minutes: 10,
            pages: Some(30),
            ..Default::default()
        });
        t.add_session(NewReadingSession {
            date: Some(day(2026, 9, 2)),
            minutes: 10,
            pages: Some(99),
            ..Default::default()
        });
        assert_eq!(t.pages_this_month(), 30);
        assert_eq!(t.minutes_for_date(day(2026, 9, 2)), 10);
        assert_eq!(t.minutes_today(), 0);
        assert_eq!(t.daily_minutes(7).len(), 7);
    }
}
