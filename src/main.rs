//! `qiyi` CLI - resolve iQiyi video pages from the command line

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qiyi::ResolverConfig;

use cmd::{cmd_config, cmd_ids, cmd_meta, cmd_resolve, cmd_sign};

#[derive(Parser)]
#[command(name = "qiyi")]
#[command(about = "Resolve iQiyi video pages into ids, metadata and stream manifests")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/qiyi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signing script defining `auth` and `addChar`
    #[arg(long, global = true)]
    signer: Option<PathBuf>,

    /// Raw Cookie header sent with every request
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Timeout in seconds applied to every request
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a video page URL and print the JSON result
    Resolve {
        /// Video page URL
        url: String,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Recover tvid/vid only
    Ids {
        /// Video page URL
        url: String,
    },

    /// Scrape title, description and thumbnail only
    Meta {
        /// Video page URL
        url: String,
    },

    /// Sign a manifest request without sending it
    Sign {
        #[arg(long)]
        tvid: String,

        #[arg(long)]
        vid: String,

        /// Timestamp in milliseconds (default: now)
        #[arg(long)]
        tm: Option<i64>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli);

    match cli.command {
        Commands::Resolve { url, compact } => {
            if cmd_resolve(config, &url, compact).await? {
                std::process::exit(1);
            }
        }
        Commands::Ids { url } => {
            cmd_ids(&config?, &url).await?;
        }
        Commands::Meta { url } => {
            cmd_meta(&config?, &url).await?;
        }
        Commands::Sign { tvid, vid, tm } => {
            cmd_sign(&config?, &tvid, &vid, tm)?;
        }
        Commands::Config => {
            cmd_config(&config?, cli.config.as_deref())?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "qiyi=debug" } else { "qiyi=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Config file first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::load_from(path)?,
        None => ResolverConfig::load()?,
    };

    if let Some(signer) = &cli.signer {
        config.signer_script = Some(signer.clone());
    }
    if let Some(cookie) = &cli.cookie {
        config.cookie = Some(cookie.clone());
    }
    if let Some(secs) = cli.timeout {
        config.accelerator_timeout_secs = secs;
        config.page_timeout_secs = secs;
        config.api_timeout_secs = secs;
    }

    Ok(config)
}
