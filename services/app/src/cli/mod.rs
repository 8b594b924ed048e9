//! services/app/src/cli/mod.rs
//!
//! The command line surface. Every subcommand maps onto one flow of the
//! application context and prints the resulting state or navigation target.

pub mod handlers;
pub mod render;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use litloom_core::domain::{GoalKind, ReadingStatus};

pub use handlers::run;

#[derive(Debug, Parser)]
#[command(name = "litloom", version, about = "Your reading life, from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and replay any action started as a guest.
    Login(LoginArgs),
    /// Create an account.
    Register(RegisterArgs),
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List the store catalog.
    Catalog,
    #[command(subcommand)]
    Cart(CartCommand),
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Log a reading session.
    Log(LogArgs),
    /// List logged reading sessions, newest first.
    Sessions,
    /// Reading statistics.
    Stats,
    #[command(subcommand)]
    Goals(GoalsCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Quote(QuoteCommand),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// Where to land when no deferred action is pending.
    #[arg(long)]
    pub redirect: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub redirect: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    Show,
    /// Add a catalog book by id.
    Add { book_id: String },
    Inc { book_id: String },
    Dec { book_id: String },
    Remove { book_id: String },
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum LibraryCommand {
    List,
    /// Add a catalog book by id.
    Add { book_id: String },
    Favorite { book_id: String },
    Status {
        book_id: String,
        /// unread, reading or finished
        status: ReadingStatus,
    },
    Remove { book_id: String },
}

#[derive(Debug, Args)]
pub struct LogArgs {
    #[arg(long)]
    pub minutes: i64,
    #[arg(long)]
    pub pages: Option<i64>,
    /// Defaults to today (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub book_id: Option<String>,
    #[arg(long)]
    pub book_title: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum GoalsCommand {
    List,
    Add {
        #[arg(long)]
        title: String,
        /// minutesDaily or pagesMonthly
        #[arg(long, default_value = "minutesDaily")]
        kind: GoalKind,
        #[arg(long)]
        target: f64,
    },
    Rename {
        goal_id: String,
        #[arg(long)]
        title: String,
    },
    Archive { goal_id: String },
    Unarchive { goal_id: String },
    Remove { goal_id: String },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show,
    /// Pass an empty string to clear a field.
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum QuoteCommand {
    Show,
    Next,
    Prev,
    Random,
    /// Turn automatic rotation on or off.
    Rotate {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
}
