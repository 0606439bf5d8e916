//! # Gatekeeper - challenge operator tool
//!
//! Provisions the pepper and drives the challenge protocol against a shared
//! Redis session store, one caller identity at a time.
//!
//! ```text
//! gatekeeper pepper
//! gatekeeper issue  --identity alice        → prints the code
//! gatekeeper verify --identity alice CODE   → prints the outcome, exit 1 if rejected
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gatekeeper::{AppConfig, RedisStore, Verifier, load_or_create};

/// Gatekeeper - human-verification challenge tool
#[derive(Parser, Debug)]
#[command(name = "gatekeeper")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/gatekeeper.toml")]
    config: String,

    /// Redis URL (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Pepper file (overrides config)
    #[arg(long, env = "CAPTCHA_PEPPER_FILE")]
    pepper_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the pepper file if it is missing and report its size
    Pepper,

    /// Issue a challenge and print its code
    Issue {
        /// Caller identity the challenge belongs to
        #[arg(short, long)]
        identity: String,

        /// Use this code instead of generating one
        #[arg(long)]
        code: Option<String>,

        /// Generated code length (default: random within the configured range)
        #[arg(long, conflicts_with = "code")]
        length: Option<usize>,
    },

    /// Verify a submitted code
    Verify {
        /// Caller identity the challenge belongs to
        #[arg(short, long)]
        identity: String,

        /// Submitted code
        code: Option<String>,

        /// Keep the challenge after a live comparison
        #[arg(long)]
        keep: bool,
    },

    /// Drop the outstanding challenge
    Expire {
        /// Caller identity the challenge belongs to
        #[arg(short, long)]
        identity: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Pick up .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    let mut config = AppConfig::load(&args.config)?;
    if let Some(ref redis_url) = args.redis_url {
        config.redis_url = redis_url.clone();
    }
    if let Some(ref pepper_file) = args.pepper_file {
        config.captcha.pepper_file = pepper_file.clone();
    }

    match args.command {
        Command::Pepper => {
            let pepper = load_or_create(&config.captcha.pepper_file, config.captcha.pepper_size)
                .context("Failed to provision pepper")?;
            info!(
                path = %config.captcha.pepper_file.display(),
                bytes = pepper.len(),
                "Pepper ready"
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Issue {
            identity,
            code,
            length,
        } => {
            let verifier = connect(&config).await?;
            let challenge = verifier.issue(&identity, code.as_deref(), length).await?;
            println!("{}", challenge.code);
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            identity,
            code,
            keep,
        } => {
            let verifier = connect(&config).await?;
            let outcome = verifier
                .verify_outcome(&identity, code.as_deref(), !keep)
                .await?;
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(if outcome.is_verified() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Expire { identity } => {
            let verifier = connect(&config).await?;
            verifier.expire_now(&identity).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build an initialized verifier over the configured Redis store
async fn connect(config: &AppConfig) -> Result<Verifier<RedisStore>> {
    let store = RedisStore::connect(&config.redis_url).await?;
    info!(redis = %config.redis_url, "Redis connected");

    let verifier = Verifier::new(config.captcha.clone(), store)?;
    verifier.init().context("Failed to load pepper")?;

    Ok(verifier)
}

/// Initialize structured logging with tracing (stderr, so stdout stays scriptable)
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
