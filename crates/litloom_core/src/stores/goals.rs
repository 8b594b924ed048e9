//! crates/litloom_core/src/stores/goals.rs
//!
//! Reading goals. Every write, whether it comes from a new draft, a patch, an
//! import or a load from storage, passes through the same sanitiser, so a
//! stored goal always has a trimmed non-empty title and a target of at least 1.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{lenient, Goal, GoalDraft, GoalKind, GoalPatch};
use crate::metrics;
use crate::observable::Subscription;
use crate::ports::Clock;
use crate::session::SessionStore;
use crate::storage::UserStorage;
use crate::stores::{Persisted, Persistence, TrackerStore};

const GOALS_KEY: &str = "goals";
const UNTITLED: &str = "Untitled goal";

/// A goal with its live progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalProgress {
    pub goal: Goal,
    /// Minutes today for daily goals, pages this month for monthly goals.
    pub value: u64,
    pub percent: u8,
}

pub struct GoalsStore {
    goals: Persisted<Vec<Goal>>,
    clock: Arc<dyn Clock>,
}

impl GoalsStore {
    pub fn new(storage: Arc<UserStorage>, session: &SessionStore, clock: Arc<dyn Clock>) -> Self {
        let loader_clock = Arc::clone(&clock);
        Self {
            goals: Persisted::new(
                storage,
                session,
                GOALS_KEY,
                move |storage, key| load_goals(storage, key, loader_clock.now()),
                Persistence::Always,
            ),
            clock,
        }
    }

    /// Active and archived, newest first.
    pub fn goals(&self) -> Vec<Goal> {
        self.goals.current()
    }

    pub fn active(&self) -> Vec<Goal> {
        self.goals
            .with(|list| list.iter().filter(|g| !g.archived).cloned().collect())
    }

    pub fn completed(&self) -> Vec<Goal> {
        self.goals
            .with(|list| list.iter().filter(|g| g.archived).cloned().collect())
    }

    pub fn get(&self, id: &str) -> Option<Goal> {
        self.goals
            .with(|list| list.iter().find(|g| g.id == id).cloned())
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Vec<Goal>) + Send + Sync + 'static,
    {
        self.goals.observable().subscribe(listener)
    }

    pub fn subscribe_active<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Vec<Goal>) + Send + Sync + 'static,
    {
        self.goals.observable().subscribe(move |list| {
            listener(list.iter().filter(|g| !g.archived).cloned().collect())
        })
    }

    pub fn add(&self, draft: GoalDraft) -> Goal {
        let goal = sanitize(
            GoalCandidate {
                id: None,
                title: Some(draft.title),
                kind: Some(draft.kind),
                target: Some(draft.target),
                created_at: None,
                archived: Some(draft.archived),
            },
            self.clock.now(),
        );
        let stored = goal.clone();
        self.goals.mutate(move |list| {
            list.insert(0, stored);
            sort_goals(list);
            true
        });
        goal
    }

    pub fn add_goal(&self, title: &str, kind: GoalKind, target: f64) -> Goal {
        self.add(GoalDraft::new(title, kind, target))
    }

    pub fn update(&self, id: &str, patch: GoalPatch) -> bool {
        let now = self.clock.now();
        self.goals.mutate(|list| {
            let Some(goal) = list.iter_mut().find(|g| g.id == id) else {
                return false;
            };
            let current = goal.clone();
            *goal = sanitize(
                GoalCandidate {
                    id: Some(current.id),
                    title: Some(patch.title.unwrap_or(current.title)),
                    kind: Some(patch.kind.unwrap_or(current.kind)),
                    target: Some(patch.target.unwrap_or(f64::from(current.target))),
                    created_at: Some(current.created_at),
                    archived: Some(patch.archived.unwrap_or(current.archived)),
                },
                now,
            );
            sort_goals(list);
            true
        })
    }

    pub fn remove(&self, id: &str) -> bool {
        self.goals.mutate(|list| {
            let before = list.len();
            list.retain(|g| g.id != id);
            list.len() != before
        })
    }

    pub fn archive(&self, id: &str) -> bool {
        self.update(
            id,
            GoalPatch {
                archived: Some(true),
                ..Default::default()
            },
        )
    }

    pub fn unarchive(&self, id: &str) -> bool {
        self.update(
            id,
            GoalPatch {
                archived: Some(false),
                ..Default::default()
            },
        )
    }

    pub fn update_title(&self, id: &str, title: &str) -> bool {
        self.update(
            id,
            GoalPatch {
                title: Some(title.to_string()),
                ..Default::default()
            },
        )
    }

    pub fn set_target(&self, id: &str, target: f64) -> bool {
        self.update(
            id,
            GoalPatch {
                target: Some(target),
                ..Default::default()
            },
        )
    }

    /// Replaces the whole set with imported records, which are read as
    /// loosely as stored ones.
    pub fn replace_all(&self, records: Vec<serde_json::Value>) {
        let now = self.clock.now();
        let mut list: Vec<Goal> = records
            .into_iter()
            .map(|entry| sanitize(GoalCandidate::read(entry), now))
            .collect();
        sort_goals(&mut list);
        self.goals.commit(list);
    }

    pub fn clear_all(&self) {
        self.goals.commit(Vec::new());
    }

    /// Progress of each active goal against the tracker.
    pub fn progress(&self, tracker: &TrackerStore) -> Vec<GoalProgress> {
        let minutes_today = tracker.minutes_today();
        let pages_this_month = tracker.pages_this_month();
        self.active()
            .into_iter()
            .map(|goal| {
                let value = match goal.kind {
                    GoalKind::MinutesDaily => minutes_today,
                    GoalKind::PagesMonthly => pages_this_month,
                };
                GoalProgress {
                    percent: metrics::percent(value as f64, f64::from(goal.target)),
                    value,
                    goal,
                }
            })
            .collect()
    }
}

//=========================================================================================
// Sanitising
//=========================================================================================

/// A goal as it may arrive from any source, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalCandidate {
    #[serde(default, deserialize_with = "loose_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    title: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "loose_kind")]
    kind: Option<GoalKind>,
    #[serde(default, deserialize_with = "lenient::number")]
    target: Option<f64>,
    #[serde(default, deserialize_with = "loose_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "loose_bool")]
    archived: Option<bool>,
}

impl GoalCandidate {
    /// Anything that is not an object reads as an empty candidate.
    fn read(entry: serde_json::Value) -> Self {
        serde_json::from_value(entry).unwrap_or_default()
    }
}

/// The one sanitiser for goals.
fn sanitize(candidate: GoalCandidate, now: DateTime<Utc>) -> Goal {
    let title = candidate
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    Goal {
        id: candidate
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title,
        kind: candidate.kind.unwrap_or_default(),
        target: clamp_target(candidate.target),
        created_at: candidate.created_at.unwrap_or(now),
        archived: candidate.archived.unwrap_or(false),
    }
}

/// `max(1, floor(target or 0))`.
fn clamp_target(target: Option<f64>) -> u32 {
    let floored = target.filter(|t| t.is_finite()).unwrap_or(0.0).floor();
    floored.clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Newest first by creation time, then id descending.
fn sort_goals(list: &mut [Goal]) {
    list.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Goals that had to be given an id or a creation time are written back, so
/// the next load sees the same values.
fn load_goals(storage: &UserStorage, key: &str, now: DateTime<Utc>) -> Vec<Goal> {
    let raw: Vec<serde_json::Value> = storage.get(key, Vec::new());
    let mut repaired = false;
    let mut list: Vec<Goal> = raw
        .into_iter()
        .map(GoalCandidate::read)
        .map(|candidate| {
            repaired |= candidate.id.as_deref().map_or(true, str::is_empty)
                || candidate.created_at.is_none();
            sanitize(candidate, now)
        })
        .collect();
    sort_goals(&mut list);
    if repaired {
        debug!("Writing back {} repaired goal(s) under '{}'", list.len(), key);
        storage.set(key, &list);
    }
    list
}

fn loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}

fn loose_kind<'de, D>(deserializer: D) -> Result<Option<GoalKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Some(GoalKind::from_loose(value.as_str())))
}

fn loose_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

fn loose_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Some(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Null => false,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }))
}
