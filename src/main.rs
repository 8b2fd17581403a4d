//! bidash - Sales dashboards from a BI tool's query API, in the terminal.

use std::path::Path;
use std::sync::Arc;

use bi_dash::api::HttpTransport;
use bi_dash::cache::ResultCache;
use bi_dash::cli::{Cli, Command};
use bi_dash::clock::SystemClock;
use bi_dash::commands::{self, CommandContext};
use bi_dash::config::{ApiConfig, Config};
use bi_dash::error::Result;
use bi_dash::export::write_output;
use bi_dash::logging::init_stderr_logging;
use bi_dash::query::{ExecutorSettings, QueryExecutor};
use bi_dash::secrets::SecretStore;
use bi_dash::session::SessionManager;
use bi_dash::state::StateStore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: could not load .env: {e}");
        }
    }
    init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let secrets = SecretStore::new();
    let api = resolve_api(&cli, &config, &secrets);
    debug!("API: {}", api.display_string());

    if let Command::Login(args) = &cli.command {
        if args.forget {
            let message = commands::login::forget_password(&api, &secrets)?;
            return write_output(&message, None);
        }
    }

    let clock = Arc::new(SystemClock);
    let transport = Arc::new(HttpTransport::new(&api.base_url()?, api.request_timeout())?);
    let sessions = Arc::new(SessionManager::new(
        transport.clone(),
        clock.clone(),
        api.credentials()?,
        api.session_ttl(),
    ));
    let cache = Arc::new(ResultCache::new(api.result_cache_ttl()));
    let database_id = api.database_id()?;
    let executor = QueryExecutor::new(
        transport,
        sessions.clone(),
        clock.clone(),
        ExecutorSettings {
            database_id,
            poll: api.poll_settings()?,
        },
    )
    .with_cache(cache.clone());

    let store = StateStore::new(StateStore::default_path()?);
    let scope = StateStore::scope_key(api.base_url()?.as_str(), sessions.username(), database_id);
    // `login` always checks the credentials against the server.
    let saved_session = match &cli.command {
        Command::Login(_) => None,
        _ => Some(sessions.as_ref()),
    };
    store
        .restore_into(&scope, saved_session, Some(&*cache), clock.as_ref())
        .await;

    let mut ctx = CommandContext::new(&executor, &config);
    if cli.no_cache {
        ctx = ctx.without_cache();
    }

    let outcome = dispatch(&cli, &ctx, &sessions, &api, &secrets).await;

    if let Err(e) = store
        .persist_from(&scope, &sessions, Some(&*cache), clock.as_ref())
        .await
    {
        warn!("Could not save state to {}: {}", store.path().display(), e);
    }

    let (rendered, path) = outcome?;
    write_output(&rendered, path)
}

/// Runs the selected command and renders its output.
async fn dispatch<'a>(
    cli: &'a Cli,
    ctx: &CommandContext<'_>,
    sessions: &SessionManager,
    api: &ApiConfig,
    secrets: &SecretStore,
) -> Result<(String, Option<&'a Path>)> {
    let result = match &cli.command {
        Command::Login(args) => {
            let message =
                commands::login::handle_login(sessions, api, secrets, args.save_password).await?;
            return Ok((message, None));
        }
        Command::Dashboard(args) => {
            let sections = commands::dashboard::handle_dashboard(ctx, args).await?;
            let rendered = cli.format.render_sections(&sections)?;
            return Ok((rendered, cli.output.as_deref()));
        }
        Command::Query(args) => commands::query::handle_query(ctx, args).await?,
        Command::Report(args) => commands::report::handle_report(ctx, args).await?,
        Command::Trend(args) => commands::trend::handle_trend(ctx, args).await?,
        Command::Regions(args) => commands::regions::handle_regions(ctx, args).await?,
    };

    Ok((cli.format.render(&result)?, cli.output.as_deref()))
}

/// Resolves API settings with precedence:
/// 1. CLI arguments (highest)
/// 2. Config file
/// 3. Environment variables
/// 4. OS keyring (password only)
fn resolve_api(cli: &Cli, config: &Config, secrets: &SecretStore) -> ApiConfig {
    let mut api = config.api.clone();
    api.merge(&cli.api_overrides());
    api.apply_env_defaults();
    api.apply_keyring_password(secrets);
    api
}
