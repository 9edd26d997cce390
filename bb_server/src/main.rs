//! Blog bracket tournament server.
//!
//! Runs one actor per tournament behind a JSON API, backed by PostgreSQL
//! when `DATABASE_URL` is set and by in-memory stores otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bb_server::{
    api,
    config::{ServerConfig, read_seed_entries},
    logging,
    metrics::{self, MeteredWinRecorder},
    sweeper,
};
use blog_bracket::{
    EntryDirectory, TournamentManager, TournamentStore, WinRecorder,
    db::Database,
    store::{InMemoryEntryDirectory, InMemoryTournamentStore, InMemoryWinLedger},
};
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = r#"Run the blog bracket tournament server

USAGE:
  bb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  JWT_SECRET                   JWT verification secret (required, 32+ chars)
  DEFAULT_MATCH_DURATION_MINS  Voting window per match  [default: 10]
  SCHEDULE_POLICY              serial or concurrent  [default: serial]
  SWEEP_INTERVAL_SECS          Background sweep period  [default: 5]
  METRICS_BIND                 Prometheus exporter address (disabled if unset)
  SEED_ENTRIES                 JSON file of entries for in-memory runs ([{"id": 1, "owner_id": 1}])
  RUST_LOG                     Log filter  [default: info]
"#;

struct Stores {
    tournaments: Arc<dyn TournamentStore>,
    entries: Arc<dyn EntryDirectory>,
    wins: Arc<dyn WinRecorder>,
    database: Option<Database>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;
    let db_url: Option<String> = pargs
        .opt_value_from_str("--db-url")
        .context("Invalid --db-url")?;

    let config = ServerConfig::from_env(bind, db_url)?;
    logging::init();

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported on {}", addr);
    }

    let stores = open_stores(&config).await?;
    let manager = Arc::new(TournamentManager::new(
        stores.tournaments,
        stores.entries,
        Arc::new(MeteredWinRecorder::new(stores.wins)),
    ));

    let loaded = manager
        .load_existing_tournaments()
        .await
        .context("Failed to load stored tournaments")?;
    metrics::active_tournaments(loaded);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweeper::run(
        manager.clone(),
        config.sweep_interval,
        shutdown_rx,
    ));

    let api_state = api::AppState {
        manager,
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
        defaults: config.tournament_defaults,
        database: stores.database.clone(),
    };
    let app = api::create_router(api_state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        log::warn!("Sweeper task ended abnormally: {}", e);
    }
    if let Some(db) = stores.database {
        db.close().await;
    }

    Ok(())
}

async fn open_stores(config: &ServerConfig) -> Result<Stores, Error> {
    let Some(db_config) = &config.database else {
        log::warn!("DATABASE_URL not set; tournaments are kept in memory only");
        let entries = InMemoryEntryDirectory::new();
        match &config.seed_entries {
            Some(path) => {
                let seeded = read_seed_entries(path)?;
                info!("Seeding {} entries from {}", seeded.len(), path.display());
                for entry in seeded {
                    entries.insert(entry).await;
                }
            }
            None => log::warn!("SEED_ENTRIES not set; no entry can be registered"),
        }
        return Ok(Stores {
            tournaments: Arc::new(InMemoryTournamentStore::new()),
            entries: Arc::new(entries),
            wins: Arc::new(InMemoryWinLedger::new()),
            database: None,
        });
    };

    info!("Connecting to database");
    let db = Database::open(db_config)
        .await
        .context("Failed to open tournament database")?;
    info!("Database connected successfully");

    Ok(Stores {
        tournaments: Arc::new(db.tournament_store()),
        entries: Arc::new(db.entry_directory()),
        wins: Arc::new(db.win_ledger()),
        database: Some(db),
    })
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
