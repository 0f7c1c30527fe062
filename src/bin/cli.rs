use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing::{info, Instrument};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use youtube_playlist_tools as lib;
use lib::api::youtube::YouTubeClient;
use lib::config::Config;
use lib::error::MigrateError;
use lib::secrets::{resolve_credentials, OnePasswordCli};
use lib::token_store::{FileTokenStore, TokenStore};
use lib::workflow::Migration;

#[derive(Parser)]
#[command(name = "youtube-playlist-tools", version)]
/// Move everything in "Watch later" into an unlisted playlist, then clear "Watch later".
struct Cli {
    /// Path to config JSON
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Run without making any changes to playlists (read-only mode)
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize with Google and store the OAuth token (interactive)
    Auth,
    /// Validate config file and exit
    ConfigValidate,
}

/// Logs go to stdout and, when `log_dir` is configured, to a daily-rotated file.
fn init_logging(cfg: &Config) -> Result<Option<WorkerGuard>> {
    let _ = LogTracer::init();

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "youtube-playlist-tools.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);
    tracing_subscriber_global::set_global_default(subscriber)
        .context("failed to set global tracing subscriber")?;
    Ok(guard)
}

fn token_store_for(cfg: &Config) -> Result<FileTokenStore> {
    let path = match &cfg.token_path {
        Some(p) => p.clone(),
        None => FileTokenStore::default_path()?,
    };
    Ok(FileTokenStore::new(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = lib::config::resolve_config_path(cli.config.as_deref());

    if let Some(Commands::ConfigValidate) = cli.command {
        match Config::from_path(&config_path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    let cfg = Config::from_path(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let _guard = init_logging(&cfg)?;

    let store = Arc::new(token_store_for(&cfg)?);
    let creds = resolve_credentials(&OnePasswordCli::new(), &cfg.secrets)
        .await
        .map_err(MigrateError::Auth)?;

    if let Some(Commands::Auth) = cli.command {
        lib::api::youtube_auth::run_youtube_auth(&creds, store.as_ref()).await?;
        return Ok(());
    }

    info!("Starting YouTube playlist management tool");
    info!("Watch Later playlist ID: {}", cfg.watch_later_id);
    info!("Target unlisted playlist ID: {}", cfg.target_unlisted_id);
    info!("Token file: {}", store.path().display());

    let store: Arc<dyn TokenStore> = store;
    let client = YouTubeClient::new(creds, store);
    let run_id = uuid::Uuid::new_v4();
    let result = Migration::new(&client, &cfg.watch_later_id, &cfg.target_unlisted_id)
        .run(cli.dry_run)
        .instrument(tracing::info_span!("migration", %run_id, dry_run = cli.dry_run))
        .await
        .context("migration aborted")?;

    println!("{}", result);
    Ok(())
}
