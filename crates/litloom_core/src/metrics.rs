//! crates/litloom_core/src/metrics.rs
//!
//! Pure reading statistics over a list of sessions. Nothing here is cached:
//! every function recomputes from the slice it is given.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::domain::{ReadingSession, TrackerSettings};

pub const WEEKLY_BUCKETS: usize = 12;
pub const DEFAULT_DAILY_WINDOW: u32 = 42;
pub const TOP_BOOKS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub minutes: u64,
    pub pages: u64,
    pub sessions: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyGoalProgress {
    pub goal: u32,
    pub minutes: u64,
    /// 0..=100
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekBucket {
    /// Monday.
    pub start: NaiveDate,
    /// Sunday.
    pub end: NaiveDate,
    pub label: String,
    pub minutes: u64,
    /// Height relative to the busiest week, 0..=100.
    pub pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBar {
    pub date: NaiveDate,
    pub label: String,
    pub minutes: u64,
    pub pct: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookShare {
    pub title: String,
    pub minutes: u64,
    pub pct: u8,
}

/// Everything the statistics view needs, recomputed in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerStats {
    pub totals: Totals,
    pub current_streak: u32,
    pub today: DailyGoalProgress,
    pub average_daily_minutes_30d: u64,
    /// Average over the last seven days that actually had reading.
    pub active_average_7d: u64,
    pub active_average_7d_goal_percent: u8,
    pub last_7_days: Vec<DayBar>,
    pub weekly: Vec<WeekBucket>,
    pub top_books: Vec<BookShare>,
}

/// `round(100 * value / of)` clamped to 0..=100; zero when `of` is not positive.
pub fn percent(value: f64, of: f64) -> u8 {
    if of <= 0.0 || !of.is_finite() || !value.is_finite() {
        return 0;
    }
    (100.0 * value / of).round().clamp(0.0, 100.0) as u8
}

pub fn totals(sessions: &[ReadingSession]) -> Totals {
    Totals {
        minutes: sessions.iter().map(|s| u64::from(s.minutes)).sum(),
        pages: sessions.iter().filter_map(|s| s.pages).map(u64::from).sum(),
        sessions: sessions.len(),
    }
}

pub fn minutes_on(sessions: &[ReadingSession], date: NaiveDate) -> u64 {
    sessions
        .iter()
        .filter(|s| s.date == date)
        .map(|s| u64::from(s.minutes))
        .sum()
}

/// Pages logged in the given calendar month (`month` is 1-based).
pub fn pages_in_month(sessions: &[ReadingSession], year: i32, month: u32) -> u64 {
    sessions
        .iter()
        .filter(|s| s.date.year() == year && s.date.month() == month)
        .filter_map(|s| s.pages)
        .map(u64::from)
        .sum()
}

/// Minutes per day for the trailing `days` days ending today, zero-filled.
pub fn daily_minutes(
    sessions: &[ReadingSession],
    today: NaiveDate,
    days: u32,
) -> BTreeMap<NaiveDate, u64> {
    let mut map = BTreeMap::new();
    if days == 0 {
        return map;
    }
    let start = today - Duration::days(i64::from(days) - 1);
    for date in start.iter_days().take_while(|d| *d <= today) {
        map.insert(date, 0);
    }
    for s in sessions {
        if let Some(total) = map.get_mut(&s.date) {
            *total += u64::from(s.minutes);
        }
    }
    map
}

/// Consecutive days ending today with more than zero minutes. A day without
/// any session counts as zero and ends the streak.
pub fn current_streak(sessions: &[ReadingSession], today: NaiveDate) -> u32 {
    let mut per_day: HashMap<NaiveDate, u64> = HashMap::new();
    for s in sessions {
        *per_day.entry(s.date).or_default() += u64::from(s.minutes);
    }
    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(date) = cursor {
        if per_day.get(&date).copied().unwrap_or(0) == 0 {
            break;
        }
        streak += 1;
        cursor = date.pred_opt();
    }
    streak
}

pub fn goal_progress(minutes_today: u64, goal_minutes: u32) -> DailyGoalProgress {
    DailyGoalProgress {
        goal: goal_minutes,
        minutes: minutes_today,
        percent: percent(minutes_today as f64, f64::from(goal_minutes)),
    }
}

pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    start_of_week(date) + Duration::days(6)
}

/// Trailing Monday-to-Sunday buckets, oldest first. The newest bucket is the
/// week containing `today`. Each session lands in the first bucket whose
/// range contains it.
pub fn weekly_minutes(sessions: &[ReadingSession], today: NaiveDate, weeks: usize) -> Vec<WeekBucket> {
    let mut buckets = Vec::with_capacity(weeks);
    let mut end = end_of_week(today);
    for _ in 0..weeks {
        let start = start_of_week(end);
        buckets.push(WeekBucket {
            start,
            end,
            label: format!("Wk {}", start.iso_week().week()),
            minutes: 0,
            pct: 0,
        });
        end = start - Duration::days(1);
    }
    buckets.reverse();

    for s in sessions {
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.start <= s.date && s.date <= b.end)
        {
            bucket.minutes += u64::from(s.minutes);
        }
    }

    let max = buckets.iter().map(|b| b.minutes).max().unwrap_or(0).max(1);
    for bucket in &mut buckets {
        bucket.pct = percent(bucket.minutes as f64, max as f64);
    }
    buckets
}

/// One bar per day for the trailing `days` days, oldest first.
pub fn recent_days(sessions: &[ReadingSession], today: NaiveDate, days: u32) -> Vec<DayBar> {
    let map = daily_minutes(sessions, today, days);
    let max = map.values().copied().max().unwrap_or(0).max(1);
    map.into_iter()
        .map(|(date, minutes)| DayBar {
            date,
            label: date.format("%a").to_string(),
            minutes,
            pct: percent(minutes as f64, max as f64),
        })
        .collect()
}

/// Mean minutes per calendar day over the window, empty days included.
pub fn average_daily_minutes(sessions: &[ReadingSession], today: NaiveDate, days: u32) -> u64 {
    if days == 0 {
        return 0;
    }
    let total: u64 = daily_minutes(sessions, today, days).values().sum();
    (total as f64 / f64::from(days)).round() as u64
}

/// Mean minutes over the days in the window that had any reading.
pub fn active_day_average(sessions: &[ReadingSession], today: NaiveDate, days: u32) -> f64 {
    let map = daily_minutes(sessions, today, days);
    let total: u64 = map.values().sum();
    let active = map.values().filter(|m| **m > 0).count();
    let denominator = if active == 0 { days as usize } else { active };
    if denominator == 0 {
        0.0
    } else {
        total as f64 / denominator as f64
    }
}

/// Minutes per book title, the top `limit` titles plus an "Other" slice.
pub fn top_books(sessions: &[ReadingSession], limit: usize) -> Vec<BookShare> {
    let mut per_title: Vec<(String, u64)> = Vec::new();
    for s in sessions {
        let title = s
            .book_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Unknown");
        match per_title.iter_mut().find(|(t, _)| t == title) {
            Some((_, minutes)) => *minutes += u64::from(s.minutes),
            None => per_title.push((title.to_string(), u64::from(s.minutes))),
        }
    }
    per_title.sort_by(|a, b| b.1.cmp(&a.1));

    let other: u64 = per_title.iter().skip(limit).map(|(_, m)| *m).sum();
    per_title.truncate(limit);
    let total = (per_title.iter().map(|(_, m)| *m).sum::<u64>() + other).max(1) as f64;

    let mut shares: Vec<BookShare> = per_title
        .into_iter()
        .map(|(title, minutes)| BookShare {
            title,
            minutes,
            pct: percent(minutes as f64, total),
        })
        .collect();
    if other > 0 {
        shares.push(BookShare {
            title: "Other".to_string(),
            minutes: other,
            pct: percent(other as f64, total),
        });
    }
    shares
}

pub fn stats(
    sessions: &[ReadingSession],
    settings: &TrackerSettings,
    today: NaiveDate,
) -> TrackerStats {
    let goal = settings.daily_goal_minutes.max(1);
    let active_7d = active_day_average(sessions, today, 7);
    TrackerStats {
        totals: totals(sessions),
        current_streak: current_streak(sessions, today),
        today: goal_progress(minutes_on(sessions, today), settings.daily_goal_minutes),
        average_daily_minutes_30d: average_daily_minutes(sessions, today, 30),
        active_average_7d: active_7d.round() as u64,
        active_average_7d_goal_percent: percent(active_7d, f64::from(goal)),
        last_7_days: recent_days(sessions, today, 7),
        weekly: weekly_minutes(sessions, today, WEEKLY_BUCKETS),
        top_books: top_books(sessions, TOP_BOOKS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::day;

    fn session(id: &str, date: NaiveDate, minutes: u32) -> ReadingSession {
        ReadingSession {
            id: id.to_string(),
            date,
            minutes,
            pages: None,
            book_id: None,
            book_title: None,
            notes: None,
        }
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let today = day(2026, 10, 19);
        let sessions = vec![
            session("a", today, 10),
            session("b", day(2026, 10, 18), 5),
            session("c", day(2026, 10, 17), 1),
            session("d", day(2026, 10, 15), 30),
        ];
        assert_eq!(current_streak(&sessions, today), 3);
    }

    #[test]
    fn streak_is_zero_without_reading_today() {
        let today = day(2026, 10, 19);
        let sessions = vec![session("a", day(2026, 10, 18), 40)];
        assert_eq!(current_streak(&sessions, today), 0);
    }

    #[test]
    fn zero_minute_day_breaks_the_streak() {
        let today = day(2026, 10, 19);
        let sessions = vec![
            session("a", today, 10),
            session("b", day(2026, 10, 18), 0),
            session("c", day(2026, 10, 17), 10),
        ];
        assert_eq!(current_streak(&sessions, today), 1);
    }

    #[test]
    fn daily_map_is_zero_filled() {
        let today = day(2026, 10, 19);
        let sessions = vec![
            session("a", today, 10),
            session("b", today, 5),
            session("c", day(2026, 9, 1), 99),
        ];
        let map = daily_minutes(&sessions, today, 3);
        let values: Vec<_> = map.into_iter().collect();
        assert_eq!(
            values,
            vec![
                (day(2026, 10, 17), 0),
                (day(2026, 10, 18), 0),
                (today, 15)
            ]
        );
    }

    #[test]
    fn goal_progress_is_clamped() {
        assert_eq!(goal_progress(15, 30).percent, 50);
        assert_eq!(goal_progress(90, 30).percent, 100);
        assert_eq!(goal_progress(10, 0).percent, 0);
        assert_eq!(goal_progress(1, 3).percent, 33);
    }

    #[test]
    fn weekly_buckets_run_monday_to_sunday() {
        // 2026-10-19 is a Monday.
        let today = day(2026, 10, 19);
        let sessions = vec![
            session("a", today, 10),
            session("b", day(2026, 10, 18), 20),
            session("c", day(2026, 10, 12), 5),
            session("d", day(2025, 1, 1), 500),
        ];
        let weeks = weekly_minutes(&sessions, today, WEEKLY_BUCKETS);
        assert_eq!(weeks.len(), 12);

        let current = weeks.last().unwrap();
        assert_eq!(current.start, today);
        assert_eq!(current.end, day(2026, 10, 25));
        assert_eq!(current.minutes, 10);

        let previous = &weeks[10];
        assert_eq!(previous.start, day(2026, 10, 12));
        assert_eq!(previous.minutes, 25);
        assert_eq!(previous.pct, 100);

        let counted: u64 = weeks.iter().map(|w| w.minutes).sum();
        assert_eq!(counted, 35);
    }

    #[test]
    fn pages_are_grouped_by_calendar_month() {
        let mut a = session("a", day(2026, 10, 1), 10);
        a.pages = Some(12);
        let mut b = session("b", day(2026, 9, 30), 10);
        b.pages = Some(40);
        let sessions = vec![a, b];
        assert_eq!(pages_in_month(&sessions, 2026, 10), 12);
        assert_eq!(totals(&sessions).pages, 52);
    }

    #[test]
    fn top_books_fold_the_tail_into_other() {
        let today = day(2026, 10, 19);
        let mut sessions = Vec::new();
        for (i, title) in ["A", "B", "C", "D", "E", "F", ""].iter().enumerate() {
            let mut s = session(&i.to_string(), today, 10 * (i as u32 + 1));
            s.book_title = Some(title.to_string());
            sessions.push(s);
        }
        let shares = top_books(&sessions, 5);
        assert_eq!(shares.len(), 6);
        assert_eq!(shares[0].title, "Unknown");
        assert_eq!(shares[0].minutes, 70);
        assert_eq!(shares.last().unwrap().title, "Other");
        assert_eq!(shares.last().unwrap().minutes, 30);
    }

    #[test]
    fn averages_fill_or_skip_empty_days() {
        let today = day(2026, 10, 19);
        let sessions = vec![session("a", today, 60), session("b", day(2026, 10, 18), 30)];
        assert_eq!(average_daily_minutes(&sessions, today, 30), 3);
        assert_eq!(active_day_average(&sessions, today, 7), 45.0);
    }
}
