// Courtcast entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load schedule, team-id mapping, and the projection pool
// 4. Fetch the league snapshot and player pool from ESPN
// 5. Fit the draft session and assemble AppState
// 6. Spawn the WebSocket server and the app event loop
// 7. Wait for Ctrl+C, then shut down

use courtcast::app;
use courtcast::config;
use courtcast::espn::cache::CachedProvider;
use courtcast::espn::client::{EspnClient, EspnCredentials};
use courtcast::espn::{LeagueProvider, PoolQuery};
use courtcast::pool;
use courtcast::pool::standardize::DraftSession;
use courtcast::stats::schedule;
use courtcast::ws_server;

use anyhow::Context;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Courtcast starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season={}, {} stat sources",
        config.league.id,
        config.league.season,
        config.source_keys.len()
    );

    // 3. Load local data files
    let sched = schedule::load_schedule(Path::new(&config.data_paths.schedule))
        .context("failed to load schedule")?;
    let team_ids = schedule::load_team_ids(Path::new(&config.data_paths.team_ids))
        .context("failed to load team-id mapping")?;
    info!("Schedule loaded for {} pro teams", team_ids.len());

    let projection_pool = pool::load_pool(Path::new(&config.data_paths.projections))
        .context("failed to load projection pool")?;
    info!("Loaded projections for {} players", projection_pool.len());

    // 4. Fetch the league snapshot and player pool
    let credentials = match (&config.credentials.espn_s2, &config.credentials.swid) {
        (Some(espn_s2), Some(swid)) => Some(EspnCredentials {
            espn_s2: espn_s2.clone(),
            swid: swid.clone(),
        }),
        _ => None,
    };
    if credentials.is_none() {
        info!("No ESPN credentials configured; private leagues will be inaccessible");
    }
    let client = EspnClient::new(config.league.id, config.league.season, credentials)
        .context("failed to build ESPN client")?;
    let provider = CachedProvider::new(client);

    let league = provider
        .fetch_league()
        .await
        .context("failed to fetch league snapshot")?;
    info!(
        "League snapshot fetched: {} fantasy teams",
        league.teams.len()
    );

    let pool_query = PoolQuery {
        limit: config.pool_query.limit,
        sort: config.pool_query.sort,
        scoring_period: config.league.scoring_period,
    };
    let player_pool = provider
        .player_pool(&pool_query)
        .await
        .context("failed to fetch player pool")?;
    info!("Player pool fetched: {} players", player_pool.len());

    // 5. Fit the draft session and assemble the application state
    let session = DraftSession::new(projection_pool);
    let app_state = app::AppState::new(
        config.clone(),
        league,
        player_pool,
        sched,
        team_ids,
        session,
    );

    // 6. Spawn the WebSocket server and the app event loop
    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (reply_tx, reply_rx) = mpsc::channel(256);

    let ws_port = config.ws_port;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, ws_tx, reply_rx).await {
            error!("WebSocket server error: {e}");
        }
    });

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, reply_tx, app_state).await {
            error!("Application loop error: {e}");
        }
    });

    info!("Ready. Dashboard WebSocket listening on 127.0.0.1:{ws_port}");

    // 7. Wait for Ctrl+C
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // The server loops forever; the app loop ends once its channels close.
    ws_handle.abort();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), app_handle).await;

    info!("Courtcast shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file so stdout stays clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("courtcast=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
