//! crates/litloom_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Every record here is persisted as JSON, so the serde field names follow
//! the camelCase layout of the stored records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Identity & Session
//=========================================================================================

/// The signed-in user as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    /// Only returned by the register endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            id: None,
            name: None,
            avatar: None,
        }
    }
}

/// The persisted auth record: a token is present exactly when authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Login payload sent to the auth API.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration payload sent to the auth API.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// What the auth API hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    #[serde(default)]
    pub id: Option<u64>,
}

//=========================================================================================
// Catalog & Cart
//=========================================================================================

/// A book as served by the store catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBook {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Missing or non-numeric prices are kept as `None` and count as zero.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CatalogBook {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: None,
            authors: Vec::new(),
            isbn: None,
            description: None,
            price: None,
            image: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price).filter(|p| p.is_finite());
        self
    }

    /// Price used for totals.
    pub fn unit_price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }
}

/// One cart line. `quantity` is never stored below 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub book: CatalogBook,
    #[serde(rename = "qty")]
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.book.unit_price() * f64::from(self.quantity)
    }
}

//=========================================================================================
// Library
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Unread,
    Reading,
    Finished,
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReadingStatus::Unread => "unread",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Finished => "finished",
        })
    }
}

impl FromStr for ReadingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Ok(ReadingStatus::Unread),
            "reading" => Ok(ReadingStatus::Reading),
            "finished" => Ok(ReadingStatus::Finished),
            other => Err(format!("unknown reading status '{other}'")),
        }
    }
}

/// A book in a user's personal library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryBook {
    #[serde(deserialize_with = "lenient::id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ReadingStatus,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl LibraryBook {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            cover_url: None,
            description: None,
            status: ReadingStatus::Unread,
            favorite: false,
            added_at: None,
        }
    }

    /// Maps a store catalog entry onto a fresh, unread library entry.
    pub fn from_catalog(book: &CatalogBook) -> Self {
        let authors = book
            .authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>();
        let author = if authors.is_empty() {
            "Unknown".to_string()
        } else {
            authors.join(", ")
        };
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: Some(author),
            cover_url: book.image.clone(),
            description: book.description.clone(),
            status: ReadingStatus::Unread,
            favorite: false,
            added_at: None,
        }
    }
}

/// Field-wise patch for a library entry; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryBookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub status: Option<ReadingStatus>,
    pub favorite: Option<bool>,
}

impl LibraryBookPatch {
    pub fn apply(self, book: &mut LibraryBook) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = Some(author);
        }
        if let Some(cover_url) = self.cover_url {
            book.cover_url = Some(cover_url);
        }
        if let Some(description) = self.description {
            book.description = Some(description);
        }
        if let Some(status) = self.status {
            book.status = status;
        }
        if let Some(favorite) = self.favorite {
            book.favorite = favorite;
        }
    }
}

//=========================================================================================
// Reading Tracker
//=========================================================================================

/// A single logged reading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: String,
    pub date: NaiveDate,
    pub minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for logging a session. Numbers are clamped to zero on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReadingSession {
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    pub minutes: i64,
    pub pages: Option<i64>,
    pub book_id: Option<String>,
    pub book_title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingSessionPatch {
    pub date: Option<NaiveDate>,
    pub minutes: Option<i64>,
    pub pages: Option<i64>,
    pub book_id: Option<String>,
    pub book_title: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSettings {
    pub daily_goal_minutes: u32,
}

impl TrackerSettings {
    pub const DEFAULT_DAILY_GOAL_MINUTES: u32 = 30;
    pub const MIN_DAILY_GOAL_MINUTES: u32 = 5;
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            daily_goal_minutes: Self::DEFAULT_DAILY_GOAL_MINUTES,
        }
    }
}

//=========================================================================================
// Goals
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalKind {
    /// Target is minutes read per day.
    #[default]
    MinutesDaily,
    /// Target is pages read per calendar month.
    PagesMonthly,
}

impl GoalKind {
    /// Anything that is not exactly `pagesMonthly` reads as a daily minutes goal.
    pub fn from_loose(raw: Option<&str>) -> Self {
        match raw {
            Some("pagesMonthly") => GoalKind::PagesMonthly,
            _ => GoalKind::MinutesDaily,
        }
    }
}

impl FromStr for GoalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "minutesDaily" | "minutes-daily" | "minutes" => Ok(GoalKind::MinutesDaily),
            "pagesMonthly" | "pages-monthly" | "pages" => Ok(GoalKind::PagesMonthly),
            other => Err(format!("unknown goal type '{other}'")),
        }
    }
}

/// A reading goal. `target` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: GoalKind,
    pub target: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

/// User input for a new goal; sanitised before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    pub title: String,
    pub kind: GoalKind,
    pub target: f64,
    pub archived: bool,
}

impl GoalDraft {
    pub fn new(title: impl Into<String>, kind: GoalKind, target: f64) -> Self {
        Self {
            title: title.into(),
            kind,
            target,
            archived: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub kind: Option<GoalKind>,
    pub target: Option<f64>,
    pub archived: Option<bool>,
}

//=========================================================================================
// Profile
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A data URL or an http(s) URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// `Some` overwrites the field; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

//=========================================================================================
// Deferred Intent
//=========================================================================================

/// An action a guest attempted that needs to be replayed after login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum IntentAction {
    AddToCart {
        book: CatalogBook,
    },
    AddToLibrary {
        #[serde(rename = "libraryBook")]
        library_book: LibraryBook,
    },
}

impl IntentAction {
    /// Where the user lands once the action has been replayed.
    pub fn default_redirect(&self) -> &'static str {
        match self {
            IntentAction::AddToCart { .. } => "/cart",
            IntentAction::AddToLibrary { .. } => "/library",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredIntent {
    /// Stored inline: `{type, data, redirectTo, expiresAt}`.
    #[serde(flatten)]
    pub action: IntentAction,
    pub redirect_to: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl DeferredIntent {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

//=========================================================================================
// Quotes
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl Quote {
    pub fn placeholder() -> Self {
        Self {
            text: "Loading quotes…".to_string(),
            author: None,
        }
    }
}

//=========================================================================================
// Lenient field decoding
//=========================================================================================

/// Decoders for fields that arrive from loosely typed sources.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accepts `"42"` or `42` and yields the string form.
    pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "expected a string or numeric id, found {other}"
            ))),
        }
    }

    /// Numbers or numeric strings; anything else becomes `None`.
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(number_from_value(&Value::deserialize(deserializer)?))
    }

    pub fn number_from_value(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_book_accepts_numeric_ids_and_bad_prices() {
        let book: CatalogBook = serde_json::from_value(json!({
            "id": 7,
            "title": "Dune",
            "authors": ["Frank Herbert"],
            "price": "bad"
        }))
        .unwrap();
        assert_eq!(book.id, "7");
        assert_eq!(book.price, None);
        assert_eq!(book.unit_price(), 0.0);

        let priced: CatalogBook =
            serde_json::from_value(json!({ "id": "x", "price": "12.5" })).unwrap();
        assert_eq!(priced.price, Some(12.5));
    }

    #[test]
    fn library_book_from_catalog_joins_authors() {
        let mut book = CatalogBook::new("1", "Good Omens");
        book.authors = vec!["Terry Pratchett".into(), "Neil Gaiman".into()];
        book.image = Some("cover.png".into());

        let mapped = LibraryBook::from_catalog(&book);
        assert_eq!(mapped.author.as_deref(), Some("Terry Pratchett, Neil Gaiman"));
        assert_eq!(mapped.cover_url.as_deref(), Some("cover.png"));
        assert_eq!(mapped.status, ReadingStatus::Unread);

        let anonymous = LibraryBook::from_catalog(&CatalogBook::new("2", "Beowulf"));
        assert_eq!(anonymous.author.as_deref(), Some("Unknown"));
    }

    #[test]
    fn intent_is_stored_as_a_flat_record() {
        let intent = DeferredIntent {
            action: IntentAction::AddToCart {
                book: CatalogBook::new("1", "Dune"),
            },
            redirect_to: "/cart".into(),
            expires_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["type"], "add_to_cart");
        assert_eq!(value["data"]["book"]["title"], "Dune");
        assert_eq!(value["redirectTo"], "/cart");
        assert_eq!(value["expiresAt"], 1_700_000_000_000i64);
        assert!(value.get("action").is_none());

        let back: DeferredIntent = serde_json::from_value(value).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn goal_kind_is_loose_on_read() {
        assert_eq!(GoalKind::from_loose(Some("pagesMonthly")), GoalKind::PagesMonthly);
        assert_eq!(GoalKind::from_loose(Some("weekly")), GoalKind::MinutesDaily);
        assert_eq!(GoalKind::from_loose(None), GoalKind::MinutesDaily);
    }
}
