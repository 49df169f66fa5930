//! nostalgia server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store and runs one of the subcommands. `serve` is the default.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an account's `password_hash`:
//!
//! ```
//! cargo run -p nostalgia-server -- hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use nostalgia_core::{job::RefreshRequest, store::FactStore as _, year::validate_year};
use nostalgia_engine::Engine;
use nostalgia_server::{
  ServerConfig, SqliteStack, auth::Accounts, build_engine, expand_tilde,
};
use nostalgia_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Nostalgia fact service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API, with the refresh worker unless disabled.
  Serve,
  /// Run only the refresh worker.
  Worker,
  /// Enrich one year immediately, outside the job queue.
  Enrich {
    #[arg(long)]
    year:     i32,
    /// Category slug; all categories when omitted.
    #[arg(long)]
    category: Option<String>,
  },
  /// Delete books that have no description.
  CleanupBooks {
    /// Only report how many books would be removed.
    #[arg(long)]
    dry_run: bool,
  },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
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
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password()?;
    let hash = nostalgia_server::auth::hash_password(&password)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("NOSTALGIA"))
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let engine = Arc::new(
    build_engine(store, &server_cfg).context("failed to build source clients")?,
  );

  match command {
    Command::Serve => serve(engine, server_cfg).await,
    Command::Worker => {
      engine.run_worker(shutdown_signal()).await;
      Ok(())
    }
    Command::Enrich { year, category } => enrich(&engine, year, category).await,
    Command::CleanupBooks { dry_run: true } => {
      let count = engine
        .store()
        .count_books_without_description()
        .await
        .context("failed to count books")?;
      println!("{count} books without descriptions would be removed");
      Ok(())
    }
    Command::CleanupBooks { dry_run: false } => {
      let removed = engine.cleanup_books().await.context("cleanup failed")?;
      println!("removed {removed} books without descriptions");
      Ok(())
    }
    Command::HashPassword => Ok(()),
  }
}

async fn serve(engine: Arc<Engine<SqliteStack>>, cfg: ServerConfig) -> anyhow::Result<()> {
  let worker = cfg.run_worker.then(|| {
    let engine = engine.clone();
    tokio::spawn(engine.run_worker(shutdown_signal()))
  });

  let app = nostalgia_server::app(engine, Accounts::new(cfg.accounts.clone()));
  let address = cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  if let Some(worker) = worker {
    worker.await.context("refresh worker panicked")?;
  }
  info!("server stopped");
  Ok(())
}

async fn enrich(
  engine: &Engine<SqliteStack>,
  year: i32,
  category: Option<String>,
) -> anyhow::Result<()> {
  let year = validate_year(year, Utc::now())?;
  let report = engine
    .refresh(&RefreshRequest { year, category })
    .await
    .with_context(|| format!("enrichment for {year} failed"))?;
  println!(
    "seen {} records, upserted {}, skipped {}",
    report.seen, report.upserted, report.skipped
  );
  Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::warn!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => info!("received Ctrl+C, shutting down"),
    () = terminate => info!("received terminate signal, shutting down"),
  }
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
