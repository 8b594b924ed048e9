//! services/app/src/cli/handlers.rs
//!
//! Executes one parsed command against the application context and returns
//! the text to print. Navigation outcomes (sign-in required, session expired)
//! are ordinary output, not errors.

use litloom_core::app::{AppContext, GateOutcome, Guarded, Route, SignedIn};
use litloom_core::domain::{CatalogBook, GoalDraft, IntentAction, NewReadingSession, ProfilePatch};
use tracing::debug;

use super::render;
use super::{CartCommand, Command, GoalsCommand, LibraryCommand, LogArgs, ProfileCommand, QuoteCommand};
use crate::config::Config;
use crate::error::AppError;

fn redirected(route: &Route) -> String {
    match route {
        Route::Login { .. } => format!("Please sign in to continue: {}", route),
        _ => format!("Redirected to {}", route),
    }
}

fn signed_in(outcome: &SignedIn) -> String {
    let mut out = format!("Signed in as {}.", outcome.user.email);
    match &outcome.replayed {
        Some(IntentAction::AddToCart { book }) => {
            out.push_str(&format!(" Added \"{}\" to your cart.", book.title))
        }
        Some(IntentAction::AddToLibrary { library_book }) => {
            out.push_str(&format!(" Added \"{}\" to your library.", library_book.title))
        }
        None => {}
    }
    out.push_str(&format!(" Go to {}", outcome.landing));
    out
}

fn not_found(what: &str, id: &str) -> AppError {
    AppError::Usage(format!("No {} with id '{}'", what, id))
}

/// Fetches the catalog, or the route to follow if the session was rejected.
async fn catalog(ctx: &AppContext) -> Result<Result<Vec<CatalogBook>, Route>, AppError> {
    Ok(match ctx.load_catalog().await? {
        Guarded::Ok(books) => Ok(books),
        Guarded::SessionExpired(route) => Err(route),
    })
}

async fn catalog_book(ctx: &AppContext, id: &str) -> Result<Result<CatalogBook, Route>, AppError> {
    match catalog(ctx).await? {
        Ok(books) => books
            .into_iter()
            .find(|b| b.id == id)
            .map(Ok)
            .ok_or_else(|| not_found("catalog book", id)),
        Err(route) => Ok(Err(route)),
    }
}

fn gate(outcome: GateOutcome, done: String, unchanged: String) -> String {
    match outcome {
        GateOutcome::Applied(true) => done,
        GateOutcome::Applied(false) => unchanged,
        GateOutcome::LoginRequired(route) => redirected(&route),
    }
}

pub async fn run(ctx: &AppContext, config: &Config, command: Command) -> Result<String, AppError> {
    debug!("Running {:?}", command);
    match command {
        Command::Login(args) => {
            if let Err(route) = ctx.guest_only() {
                return Ok(format!("Already signed in. {}", redirected(&route)));
            }
            let outcome = ctx
                .login(&args.email, &args.password, args.redirect.as_deref())
                .await?;
            Ok(signed_in(&outcome))
        }
        Command::Register(args) => {
            if let Err(route) = ctx.guest_only() {
                return Ok(format!("Already signed in. {}", redirected(&route)));
            }
            let outcome = ctx
                .register(
                    &args.email,
                    &args.password,
                    args.name.as_deref(),
                    args.redirect.as_deref(),
                )
                .await?;
            Ok(signed_in(&outcome))
        }
        Command::Logout => {
            let route = ctx.logout();
            Ok(format!("Signed out. Go to {}", route))
        }
        Command::Whoami => Ok(match ctx.session().current_user() {
            Some(user) => match user.name {
                Some(name) => format!("{} <{}>", name, user.email),
                None => user.email,
            },
            None => "Not signed in (guest).".to_string(),
        }),
        Command::Catalog => Ok(match catalog(ctx).await? {
            Ok(books) => render::catalog(&books),
            Err(route) => redirected(&route),
        }),
        Command::Cart(command) => cart(ctx, command).await,
        Command::Library(command) => library(ctx, command).await,
        Command::Log(args) => log_session(ctx, args),
        Command::Sessions => {
            if let Err(route) = ctx.require_auth("/library/tracker") {
                return Ok(redirected(&route));
            }
            Ok(render::sessions(&ctx.tracker().sessions()))
        }
        Command::Stats => {
            if let Err(route) = ctx.require_auth("/library/stats") {
                return Ok(redirected(&route));
            }
            Ok(render::stats(&ctx.tracker().stats()))
        }
        Command::Goals(command) => goals(ctx, command),
        Command::Profile(command) => profile(ctx, command),
        Command::Quote(command) => quote(ctx, config, command).await,
    }
}

async fn cart(ctx: &AppContext, command: CartCommand) -> Result<String, AppError> {
    let store = ctx.cart();
    let show = || render::cart(&store.items(), store.summary());

    if let CartCommand::Add { book_id } = &command {
        let book = match catalog_book(ctx, book_id).await? {
            Ok(book) => book,
            Err(route) => return Ok(redirected(&route)),
        };
        let title = book.title.clone();
        let outcome = ctx.add_to_cart(book);
        return Ok(gate(outcome, format!("Added \"{}\".\n{}", title, show()), show()));
    }

    if let Err(route) = ctx.require_auth("/cart") {
        return Ok(redirected(&route));
    }
    let changed = match &command {
        CartCommand::Show | CartCommand::Add { .. } => true,
        CartCommand::Inc { book_id } => store.increment(book_id),
        CartCommand::Dec { book_id } => store.decrement(book_id),
        CartCommand::Remove { book_id } => store.remove(book_id),
        CartCommand::Clear => {
            store.clear();
            true
        }
    };
    match command {
        CartCommand::Inc { book_id } | CartCommand::Dec { book_id } | CartCommand::Remove { book_id }
            if !changed =>
        {
            Err(not_found("cart line", &book_id))
        }
        _ => Ok(show()),
    }
}

async fn library(ctx: &AppContext, command: LibraryCommand) -> Result<String, AppError> {
    let store = ctx.library();
    let show = || render::library(&store.list(), store.counts());

    if let LibraryCommand::Add { book_id } = &command {
        let book = match catalog_book(ctx, book_id).await? {
            Ok(book) => book,
            Err(route) => return Ok(redirected(&route)),
        };
        let outcome = ctx.add_to_library(&book);
        return Ok(gate(
            outcome,
            format!("Added \"{}\".\n{}", book.title, show()),
            format!("\"{}\" is already in your library.", book.title),
        ));
    }

    if let Err(route) = ctx.require_auth("/library") {
        return Ok(redirected(&route));
    }
    let (changed, id) = match &command {
        LibraryCommand::List | LibraryCommand::Add { .. } => (true, None),
        LibraryCommand::Favorite { book_id } => (store.toggle_favorite(book_id), Some(book_id)),
        LibraryCommand::Status { book_id, status } => {
            (store.set_status(book_id, *status), Some(book_id))
        }
        LibraryCommand::Remove { book_id } => (store.remove(book_id), Some(book_id)),
    };
    match id {
        Some(id) if !changed && !store.contains(id) => Err(not_found("library book", id)),
        _ => Ok(show()),
    }
}

fn log_session(ctx: &AppContext, args: LogArgs) -> Result<String, AppError> {
    if let Err(route) = ctx.require_auth("/library/tracker") {
        return Ok(redirected(&route));
    }
    let book_title = args.book_title.or_else(|| {
        args.book_id
            .as_deref()
            .and_then(|id| ctx.library().get(id))
            .map(|book| book.title)
    });
    let session = ctx.tracker().add_session(NewReadingSession {
        date: args.date,
        minutes: args.minutes,
        pages: args.pages,
        book_id: args.book_id,
        book_title,
        notes: args.notes,
    });
    let progress = ctx.tracker().goal_progress_today();
    Ok(format!(
        "Logged {} min on {}. Today: {} / {} min ({}%)",
        session.minutes, session.date, progress.minutes, progress.goal, progress.percent
    ))
}

fn goals(ctx: &AppContext, command: GoalsCommand) -> Result<String, AppError> {
    if let Err(route) = ctx.require_auth("/library/goals") {
        return Ok(redirected(&route));
    }
    let store = ctx.goals();
    let changed = match &command {
        GoalsCommand::List => true,
        GoalsCommand::Add {
            title,
            kind,
            target,
        } => {
            let goal = store.add(GoalDraft::new(title.as_str(), *kind, *target));
            return Ok(format!("Created {}", render::goal_line(&goal, None)));
        }
        GoalsCommand::Rename { goal_id, title } => store.update_title(goal_id, title),
        GoalsCommand::Archive { goal_id } => store.archive(goal_id),
        GoalsCommand::Unarchive { goal_id } => store.unarchive(goal_id),
        GoalsCommand::Remove { goal_id } => store.remove(goal_id),
    };
    match command {
        GoalsCommand::Rename { goal_id, .. }
        | GoalsCommand::Archive { goal_id }
        | GoalsCommand::Unarchive { goal_id }
        | GoalsCommand::Remove { goal_id }
            if !changed && store.get(&goal_id).is_none() =>
        {
            Err(not_found("goal", &goal_id))
        }
        _ => Ok(render::goals(&store.progress(ctx.tracker()))),
    }
}

fn profile(ctx: &AppContext, command: ProfileCommand) -> Result<String, AppError> {
    if let Err(route) = ctx.require_auth("/profile") {
        return Ok(redirected(&route));
    }
    let store = ctx.profile();
    if let ProfileCommand::Set { name, avatar_url } = command {
        store.update(ProfilePatch { name, avatar_url });
    }
    let email = ctx
        .session()
        .current_user()
        .map(|u| u.email)
        .unwrap_or_default();
    Ok(render::profile(&store.value(), &email))
}

async fn quote(ctx: &AppContext, config: &Config, command: QuoteCommand) -> Result<String, AppError> {
    let rotator = ctx.quotes();
    rotator.init(config.quote_rotation).await;
    match command {
        QuoteCommand::Show => {}
        QuoteCommand::Next => rotator.next(),
        QuoteCommand::Prev => rotator.prev(),
        QuoteCommand::Random => rotator.random(),
        QuoteCommand::Rotate { state } => {
            if state == "on" {
                rotator.start_auto_rotate(config.quote_rotation);
            } else {
                rotator.stop_auto_rotate();
            }
            let label = if rotator.is_rotating() { "on" } else { "off" };
            return Ok(format!("Auto-rotation is {}.", label));
        }
    }
    Ok(render::quote(&rotator.current()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litloom_core::app::Services;
    use litloom_core::domain::{AuthGrant, Credentials, GoalKind, Quote, Registration};
    use litloom_core::ports::{AuthGateway, CatalogService, PortError, PortResult, QuotesFeed};
    use litloom_core::storage::MemoryStore;
    use std::sync::Arc;

    use crate::adapters::SystemClock;

    struct AcceptAll;

    #[async_trait]
    impl AuthGateway for AcceptAll {
        async fn login(&self, _: &Credentials) -> PortResult<AuthGrant> {
            Ok(AuthGrant {
                token: "tok".into(),
                id: None,
            })
        }

        async fn register(&self, _: &Registration) -> PortResult<AuthGrant> {
            Ok(AuthGrant {
                token: "tok".into(),
                id: Some(7),
            })
        }
    }

    struct Shelf(PortResult<Vec<CatalogBook>>);

    #[async_trait]
    impl CatalogService for Shelf {
        async fn fetch_books(&self, _: Option<&str>) -> PortResult<Vec<CatalogBook>> {
            self.0.clone()
        }
    }

    struct NoQuotes;

    #[async_trait]
    impl QuotesFeed for NoQuotes {
        async fn fetch_quotes(&self) -> PortResult<Vec<Quote>> {
            Ok(Vec::new())
        }
    }

    fn context(catalog: PortResult<Vec<CatalogBook>>) -> AppContext {
        AppContext::new(Services {
            backend: Arc::new(MemoryStore::new()),
            intent_backend: Arc::new(MemoryStore::new()),
            auth: Arc::new(AcceptAll),
            catalog: Arc::new(Shelf(catalog)),
            quotes: Arc::new(NoQuotes),
            clock: Arc::new(SystemClock),
            intent_ttl: chrono::Duration::minutes(20),
        })
    }

    fn config() -> Config {
        Config::from_lookup(|_| None).unwrap()
    }

    fn parse(args: &[&str]) -> Command {
        use clap::Parser;
        let mut full = vec!["litloom"];
        full.extend_from_slice(args);
        crate::cli::Cli::parse_from(full).command
    }

    #[tokio::test]
    async fn guest_cart_add_resumes_after_login() {
        let ctx = context(Ok(vec![CatalogBook::new("9", "Emma").with_price(4.0)]));
        let config = config();

        let out = run(&ctx, &config, parse(&["cart", "add", "9"])).await.unwrap();
        assert_eq!(out, "Please sign in to continue: /login?redirectUrl=/cart");

        let out = run(
            &ctx,
            &config,
            parse(&["login", "--email", "ann@example.com", "--password", "pw"]),
        )
        .await
        .unwrap();
        assert_eq!(
            out,
            "Signed in as ann@example.com. Added \"Emma\" to your cart. Go to /cart"
        );

        let out = run(&ctx, &config, parse(&["cart", "show"])).await.unwrap();
        assert!(out.contains("[9] Emma x1 = $4.00"));
    }

    #[tokio::test]
    async fn expired_session_is_reported_as_navigation() {
        let ctx = context(Err(PortError::Unauthorized));
        let config = config();
        run(
            &ctx,
            &config,
            parse(&["login", "--email", "ann@example.com", "--password", "pw"]),
        )
        .await
        .unwrap();

        let out = run(&ctx, &config, parse(&["catalog"])).await.unwrap();
        assert_eq!(out, "Please sign in to continue: /login?session=expired");
        assert!(!ctx.session().is_authenticated());
    }

    #[tokio::test]
    async fn protected_views_redirect_guests() {
        let ctx = context(Ok(Vec::new()));
        let out = run(&ctx, &config(), parse(&["stats"])).await.unwrap();
        assert_eq!(
            out,
            "Please sign in to continue: /login?redirectUrl=/library/stats"
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_usage_errors() {
        let ctx = context(Ok(Vec::new()));
        let config = config();
        run(
            &ctx,
            &config,
            parse(&["login", "--email", "ann@example.com", "--password", "pw"]),
        )
        .await
        .unwrap();

        let err = run(&ctx, &config, parse(&["cart", "add", "404"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No catalog book with id '404'");
        assert!(run(&ctx, &config, parse(&["goals", "archive", "nope"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn goals_can_be_renamed_by_id() {
        let ctx = context(Ok(Vec::new()));
        let config = config();
        run(
            &ctx,
            &config,
            parse(&["login", "--email", "ann@example.com", "--password", "pw"]),
        )
        .await
        .unwrap();
        let goal = ctx.goals().add_goal("Daily", GoalKind::MinutesDaily, 20.0);

        let out = run(
            &ctx,
            &config,
            parse(&["goals", "rename", goal.id.as_str(), "--title", " Evening pages "]),
        )
        .await
        .unwrap();
        assert!(out.contains("Evening pages"));
        assert!(run(&ctx, &config, parse(&["goals", "rename", "nope", "--title", "x"]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn quotes_fall_back_to_placeholder() {
        let ctx = context(Ok(Vec::new()));
        let out = run(&ctx, &config(), parse(&["quote", "next"])).await.unwrap();
        assert_eq!(out, "\"Loading quotes…\"");
    }
}
