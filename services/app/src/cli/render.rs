//! services/app/src/cli/render.rs
//!
//! Plain-text views of the stores.

use litloom_core::domain::{CartItem, CatalogBook, Goal, GoalKind, LibraryBook, Profile, Quote, ReadingSession};
use litloom_core::metrics::TrackerStats;
use litloom_core::stores::{CartSummary, GoalProgress, LibraryCounts};
use std::fmt::Write;

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn goal_kind(kind: GoalKind) -> &'static str {
    match kind {
        GoalKind::MinutesDaily => "min/day",
        GoalKind::PagesMonthly => "pages/month",
    }
}

pub fn catalog(books: &[CatalogBook]) -> String {
    if books.is_empty() {
        return "The catalog is empty.".to_string();
    }
    let mut out = String::new();
    for book in books {
        let authors = if book.authors.is_empty() {
            "Unknown".to_string()
        } else {
            book.authors.join(", ")
        };
        let price = book.price.map(money).unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(out, "[{}] {} by {} ({})", book.id, book.title, authors, price);
    }
    out
}

pub fn cart(items: &[CartItem], summary: CartSummary) -> String {
    if items.is_empty() {
        return "Your cart is empty.".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "[{}] {} x{} = {}",
            item.book.id,
            item.book.title,
            item.quantity,
            money(item.line_total())
        );
    }
    let _ = write!(out, "{} item(s), total {}", summary.count, money(summary.total));
    out
}

pub fn library(books: &[LibraryBook], counts: LibraryCounts) -> String {
    let mut out = String::new();
    for book in books {
        let star = if book.favorite { "*" } else { " " };
        let author = book.author.as_deref().unwrap_or("Unknown");
        let _ = writeln!(out, "{} [{}] {} by {} ({})", star, book.id, book.title, author, book.status);
    }
    let _ = write!(
        out,
        "{} book(s): {} reading, {} finished, {} favorite(s)",
        counts.total, counts.reading, counts.finished, counts.favorites
    );
    out
}

pub fn sessions(list: &[ReadingSession]) -> String {
    if list.is_empty() {
        return "No reading sessions yet.".to_string();
    }
    let mut out = String::new();
    for s in list {
        let _ = write!(out, "{} {} min", s.date, s.minutes);
        if let Some(pages) = s.pages {
            let _ = write!(out, ", {} pages", pages);
        }
        if let Some(title) = &s.book_title {
            let _ = write!(out, " - {}", title);
        }
        let _ = writeln!(out, "  ({})", s.id);
    }
    out
}

pub fn stats(stats: &TrackerStats) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Today: {} / {} min ({}%)",
        stats.today.minutes, stats.today.goal, stats.today.percent
    );
    let _ = writeln!(out, "Streak: {} day(s)", stats.current_streak);
    let _ = writeln!(
        out,
        "Total: {} min, {} pages over {} session(s)",
        stats.totals.minutes, stats.totals.pages, stats.totals.sessions
    );
    let _ = writeln!(out, "30-day daily average: {} min", stats.average_daily_minutes_30d);
    let _ = writeln!(
        out,
        "7-day active average: {} min ({}% of goal)",
        stats.active_average_7d, stats.active_average_7d_goal_percent
    );
    let _ = writeln!(out, "Last 7 days:");
    for day in &stats.last_7_days {
        let _ = writeln!(out, "  {} {:>4} min {}", day.label, day.minutes, bar(day.pct));
    }
    let _ = writeln!(out, "Weekly:");
    for week in &stats.weekly {
        let _ = writeln!(out, "  {:<6} {:>5} min {}", week.label, week.minutes, bar(week.pct));
    }
    if !stats.top_books.is_empty() {
        let _ = writeln!(out, "Top books:");
        for book in &stats.top_books {
            let _ = writeln!(out, "  {}% {} ({} min)", book.pct, book.title, book.minutes);
        }
    }
    out
}

fn bar(pct: u8) -> String {
    "#".repeat(usize::from(pct) / 5)
}

pub fn goals(progress: &[GoalProgress]) -> String {
    if progress.is_empty() {
        return "No goals yet.".to_string();
    }
    let mut out = String::new();
    for p in progress {
        let _ = writeln!(out, "{}", goal_line(&p.goal, Some((p.value, p.percent))));
    }
    out
}

pub fn goal_line(goal: &Goal, progress: Option<(u64, u8)>) -> String {
    let mut line = format!("[{}] {} - {} {}", goal.id, goal.title, goal.target, goal_kind(goal.kind));
    if let Some((value, percent)) = progress {
        let _ = write!(line, " ({} so far, {}%)", value, percent);
    }
    if goal.archived {
        line.push_str(" [archived]");
    }
    line
}

pub fn profile(profile: &Profile, email: &str) -> String {
    format!(
        "{}\nName: {}\nAvatar: {}",
        email,
        profile.name.as_deref().unwrap_or("-"),
        profile.avatar_url.as_deref().unwrap_or("-")
    )
}

pub fn quote(quote: &Quote) -> String {
    match quote.author.as_deref() {
        Some(author) => format!("\"{}\" - {}", quote.text, author),
        None => format!("\"{}\"", quote.text),
    }
}
