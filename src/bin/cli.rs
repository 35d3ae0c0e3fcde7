//! findyou CLI
//!
//! Local and cron entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use findyou::{
    error::{AppError, Result},
    models::{Config, Credentials, PostVariant, RunOutcome, SocialCredentials},
    pipeline::{self, RunOptions},
    storage::load_ledger,
};

/// findyou - Abandoned and lost animal poster
#[derive(Parser, Debug)]
#[command(
    name = "findyou",
    version,
    about = "Posts abandoned and lost animals from the national registry to Instagram"
)]
struct Cli {
    /// Directory holding config.toml, ledgers and rendered images
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, render, upload and (with --post) publish one batch
    Post {
        /// Which registry feed to post from
        #[arg(value_enum)]
        variant: PostVariant,

        /// Target date (YYYY-MM-DD)
        date: NaiveDate,

        /// Animals per post (default depends on the variant)
        #[arg(short, long)]
        count: Option<usize>,

        /// Actually publish; without this flag the run stops after upload
        #[arg(long)]
        post: bool,
    },

    /// Publish an already-hosted image with a caption
    PostUrl {
        /// Public image URL
        image_url: String,

        /// Post caption
        caption: String,
    },

    /// Validate configuration and credentials
    Validate {
        /// Also verify the Instagram token against the Graph API
        #[arg(long)]
        online: bool,
    },

    /// Show ledger sizes per variant
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(data_dir: &Path) -> Config {
    let config_path = data_dir.join("config.toml");
    let mut config = if config_path.exists() {
        Config::load_or_default(&config_path)
    } else {
        log::info!("No config at {}, using defaults", config_path.display());
        Config::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.data_dir);

    match cli.command {
        Command::Post {
            variant,
            date,
            count,
            post,
        } => {
            config.validate()?;
            let credentials = Credentials::from_env(post)?;
            let options = RunOptions {
                target_date: date,
                count: count.unwrap_or(config.variant(variant).default_count),
                dry_run: !post,
            };
            if options.count == 0 {
                return Err(AppError::validation("--count must be at least 1"));
            }

            let report =
                pipeline::run_post(&config, &credentials, &cli.data_dir, variant, &options).await?;

            match report.outcome {
                RunOutcome::Published { media_id } => {
                    log::info!("Posted {} animals as media {}", report.uploaded, media_id);
                }
                RunOutcome::DryRun { urls } => {
                    log::warn!(
                        "--post not given; {} images uploaded but not published",
                        urls.len()
                    );
                    for url in urls {
                        log::info!("  {}", url);
                    }
                }
                RunOutcome::NothingToPost => {
                    log::info!("No new {} animals for {}", variant, date);
                }
            }
        }

        Command::PostUrl { image_url, caption } => {
            let social = SocialCredentials::from_env()?;
            let published =
                pipeline::run_post_url(&config, &social, &image_url, &caption).await?;
            log::info!("Posted media {}", published.media_id);
        }

        Command::Validate { online } => {
            pipeline::run_validate(&config, online).await?;
        }

        Command::Info => {
            log::info!("Data directory: {}", cli.data_dir.display());
            for variant in PostVariant::ALL {
                let ledger = load_ledger(&config, &cli.data_dir, variant).await?;
                log::info!(
                    "{}: {} posted ids (last updated: {})",
                    variant,
                    ledger.len(),
                    ledger.last_updated().unwrap_or("never")
                );
            }
        }
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("findyou starting...");

    match run(cli).await {
        Ok(()) => {
            log::info!("Done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
