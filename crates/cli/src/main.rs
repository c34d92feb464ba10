mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_core::{load_config, validate_config, Config, MemoryStore, Session};

/// Default config file, overridden by `--config` or `MARQUEE_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "marquee.toml";

#[derive(Parser, Debug)]
#[command(name = "marquee", version, about = "Browse a media library from the terminal")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,

    /// Keep everything in memory for this run instead of the store file.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the libraries in the catalog.
    Libraries,

    /// Search, filter and sort the items of a library.
    Browse(BrowseArgs),

    /// Show every detail of one item.
    Show { id: u64 },

    /// List the genres and content ratings of a library.
    Facets {
        /// Library key (default: "Movies", else the first library).
        #[arg(long)]
        library: Option<String>,
    },

    /// Toggle an item in the favorites list.
    Favorite { id: u64 },

    /// Toggle an item in the watch-later list.
    WatchLater { id: u64 },

    /// Print the favorites and watch-later lists.
    Lists,

    /// Test a credential and store it only if the service accepts it.
    Login { credential: String },

    /// Forget the stored credential.
    Logout,

    /// Inspect or clear the local cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check the metadata service's health.
    Health {
        /// Keep polling every 60 seconds.
        #[arg(long)]
        watch: bool,
    },

    /// Show or change the theme preference.
    Theme {
        #[arg(value_enum)]
        action: Option<ThemeAction>,
    },

    /// Print the active configuration (without the credential).
    Config,

    /// Load the catalog and print the process counters.
    Stats,
}

#[derive(clap::Args, Debug)]
struct BrowseArgs {
    /// Library key (default: "Movies", else the first library).
    #[arg(long)]
    library: Option<String>,

    /// Free-text search over title, genres and year.
    #[arg(short, long, default_value = "")]
    query: String,

    /// Only items with this genre (case-insensitive).
    #[arg(long, default_value = "")]
    genre: String,

    /// Only items with exactly this content rating.
    #[arg(long, default_value = "")]
    rating: String,

    /// Sort by title, year or rating. Anything else keeps library order.
    #[arg(long, default_value = "")]
    sort: String,

    /// Resolve a poster URL for every listed item.
    #[arg(long)]
    posters: bool,

    /// Print JSON instead of text cards.
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print persisted bytes by category.
    Usage,
    /// Drop the cached catalog, lists and posters, then reload.
    Clear {
        /// Forget the credential too.
        #[arg(long)]
        credential: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeAction {
    Toggle,
    Dark,
    Light,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // stdout is the user surface, so logs go to stderr and default to warn.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_ref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let session = if cli.ephemeral {
        let store = Arc::new(MemoryStore::with_quota(config.store.quota_bytes));
        Session::connect(&config, store).context("Failed to start session")?
    } else {
        Session::open(&config)
            .with_context(|| format!("Failed to open store at {:?}", config.store.path))?
    };

    commands::dispatch(&session, &config, cli.command).await
}

/// Load the config file if there is one. Without an explicit path, a missing
/// default file means built-in defaults.
fn resolve_config(explicit: Option<&PathBuf>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {:?} does not exist", path);
            }
            path.clone()
        }
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !path.exists() {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                return Ok(Config::default());
            }
            path
        }
    };

    debug!("Loading configuration from {:?}", path);
    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}
