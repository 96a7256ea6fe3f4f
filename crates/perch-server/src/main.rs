//! perch-server binary.
//!
//! Restores the registry from its SQLite file and serves the occupancy API.
//! Settings come from `config.toml` (or `--config`) and `PERCH_*` variables.
//!
//! Protecting the admin routes needs an argon2 hash for
//! `admin_password_hash`; `perch-server --hash-password` prints one for a
//! password read from stdin.

use std::{io::BufRead as _, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher as _, password_hash::SaltString};
use clap::Parser;
use perch_core::{
  OccupancyService, Registry,
  history::{Order, Retention},
  store::OccupancyStore,
};
use perch_server::{
  AppState, ServerConfig,
  journal::{self, ChannelJournal},
};
use perch_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::task::JoinHandle;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Station occupancy server")]
struct Cli {
  /// TOML settings file; missing files are ignored.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Hash one line of stdin for `admin_password_hash` and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    return print_password_hash();
  }

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;
  let auth = cfg.auth().map_err(anyhow::Error::msg)?.map(Arc::new);
  if auth.is_none() {
    tracing::warn!("admin routes are open: no admin credentials configured");
  }

  let (service, writer) = restore_service(&cfg).await?;
  let app = perch_server::router(AppState { service, auth });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = tokio::net::TcpListener::bind(&address)
    .await
    .with_context(|| format!("cannot listen on {address}"))?;
  tracing::info!(%address, "serving");

  axum::serve(listener, app)
    .with_graceful_shutdown(ctrl_c())
    .await
    .context("server failed")?;

  // The router owned the last journal handle, so the writer drains and stops.
  writer.await.context("journal writer panicked")?;
  tracing::info!("stopped");
  Ok(())
}

/// Open the store, rebuild the registry from it and start the journal writer.
async fn restore_service(
  cfg: &ServerConfig,
) -> anyhow::Result<(Arc<OccupancyService<ChannelJournal>>, JoinHandle<()>)> {
  let path = cfg.resolved_store_path();
  let store = SqliteStore::open(&path)
    .await
    .with_context(|| format!("cannot open store {}", path.display()))?;

  let retention = Retention::from_limit(cfg.history_limit);
  let saved = store
    .load(retention.limit())
    .await
    .context("cannot read saved state")?;
  let (registry, orphaned) = Registry::restore(&cfg.stations, retention, saved)
    .context("invalid station list")?;
  let registry = registry.with_status_history(cfg.status_history);
  for station in orphaned {
    tracing::warn!(%station, "saved station is no longer configured; ignoring it");
  }

  let (journal, writer) = journal::spawn(store);
  let service = Arc::new(OccupancyService::new(registry, journal));

  let snapshot = service.snapshot();
  tracing::info!(
    stations = snapshot.stations.len(),
    occupied = snapshot.occupied_stations,
    history = service.history(Order::Oldest, None).len(),
    "registry restored"
  );
  Ok((service, writer))
}

async fn ctrl_c() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("shutdown requested"),
    Err(e) => {
      tracing::error!(error = %e, "cannot watch for ctrl-c; running until killed");
      std::future::pending::<()>().await;
    }
  }
}

fn print_password_hash() -> anyhow::Result<()> {
  let password = std::io::stdin()
    .lock()
    .lines()
    .next()
    .context("no password on stdin")?
    .context("cannot read stdin")?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
  println!("{hash}");
  Ok(())
}
