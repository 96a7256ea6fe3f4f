//! `perch`: terminal client for the Perch occupancy server.
//!
//! # Usage
//!
//! ```
//! perch --url http://localhost:5005 watch
//! perch scan "Station 1" 04A1B2C3
//! perch --config ~/.config/perch/config.toml --user admin --password secret reset
//! ```

mod client;
mod display;

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use perch_core::{card::Resolution, history::HistoryEntry};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:5005";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "perch", about = "Terminal client for the Perch occupancy server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the perch server (default: http://localhost:5005).
  #[arg(long, env = "PERCH_URL")]
  url: Option<String>,

  /// Admin username.
  #[arg(long, env = "PERCH_USER")]
  user: Option<String>,

  /// Admin password (plaintext).
  #[arg(long, env = "PERCH_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the status board once.
  Status,
  /// Redraw the status board periodically until interrupted.
  Watch {
    /// Seconds between polls.
    #[arg(short, long, default_value_t = 5)]
    interval: u64,
  },
  /// Badge a card at a station; enters or leaves as appropriate.
  Scan { station: String, uid: String },
  /// Record an entry.
  Enter { station: String, uid: String },
  /// Record an exit.
  Exit { station: String },
  /// Announce when an occupied station will be free (HH:MM).
  LeaveTime { station: String, time: String },
  /// Look up a card.
  Check { uid: String },
  /// Name a card that has already been scanned.
  Name { uid: String, name: String },
  /// Register a card and its name (admin).
  AddCard { uid: String, name: String },
  /// List all known cards (admin).
  Cards,
  /// Free every station and clear history (admin).
  Reset,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Optional TOML settings; flags and `PERCH_*` variables take precedence.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
  url:      Option<String>,
  username: Option<String>,
  password: Option<String>,
}

impl ConfigFile {
  fn read(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
  }

  fn merge(self, args: &Args) -> ApiConfig {
    let url = args.url.clone().or(self.url);
    ApiConfig {
      base_url: url.unwrap_or_else(|| DEFAULT_URL.to_owned()),
      username: args.user.clone().or(self.username).unwrap_or_default(),
      password: args.password.clone().or(self.password).unwrap_or_default(),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let file = match &args.config {
    Some(path) => ConfigFile::read(path)?,
    None => ConfigFile::default(),
  };
  let api_config = file.merge(&args);
  tracing::debug!(url = %api_config.base_url, "using server");

  let client = ApiClient::new(api_config)?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Status => print!("{}", display::board(&client.status().await?)),
    Command::Watch { interval } => watch(client, Duration::from_secs(interval.max(1))).await,
    Command::Scan { station, uid } => print_event(&client.scan(&station, &uid).await?),
    Command::Enter { station, uid } => print_event(&client.enter(&station, &uid).await?),
    Command::Exit { station } => print_event(&client.exit(&station).await?),
    Command::LeaveTime { station, time } => {
      let reply = client.set_leave_time(&station, &time).await?;
      let time = reply.get("time").and_then(|t| t.as_str()).unwrap_or(&time);
      println!("{station} expected free at {time}");
    }
    Command::Check { uid } => {
      let reply = client.check(&uid).await?;
      match reply.resolution {
        Resolution::Known { name } => println!("{}: {name}", reply.uid),
        Resolution::Unknown => println!("{}: unknown card", reply.uid),
      }
    }
    Command::Name { uid, name } => print_message(&client.name(&uid, &name).await?),
    Command::AddCard { uid, name } => print_message(&client.add_card(&uid, &name).await?),
    Command::Cards => {
      for card in client.cards().await? {
        println!("{:<16} {}", card.uid, card.name.as_deref().unwrap_or("-"));
      }
    }
    Command::Reset => print_message(&client.reset().await?),
  }
  Ok(())
}

/// Poll forever. Failed polls are reported and retried on the next tick.
async fn watch(client: &ApiClient, interval: Duration) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
  loop {
    ticker.tick().await;
    match client.status().await {
      Ok(snapshot) => {
        // Clear the screen and home the cursor.
        print!("\x1b[2J\x1b[H{}", display::board(&snapshot));
      }
      Err(e) => tracing::warn!("status poll failed: {e:#}"),
    }
  }
}

fn print_event(entry: &HistoryEntry) { println!("{}", display::history_line(entry)); }

fn print_message(reply: &serde_json::Value) {
  match reply.get("message").and_then(|m| m.as_str()) {
    Some(message) => println!("{message}"),
    None => println!("ok"),
  }
}
