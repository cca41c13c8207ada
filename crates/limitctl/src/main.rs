use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use limiter_core::{Clock, LimiterConfig, RateLimiter, SystemClock};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

mod demo;

#[derive(Parser, Debug)]
#[command(name = "limitctl", version, about = "Sliding window rate limiter driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with `max_requests` and `window_ms`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    max_requests: Option<u32>,

    #[arg(long, global = true)]
    window_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read one key per line from stdin and print a decision for each
    Check {
        #[arg(long)]
        json: bool,

        #[arg(long, default_value_t = 30_000, value_parser = clap::value_parser!(u64).range(1..))]
        cleanup_every_ms: u64,
    },
    /// Replay a burst / half window / window shift scenario on a simulated clock
    Demo {
        #[arg(long, default_value = "user_456")]
        key: String,
    },
}

#[derive(Debug, Serialize)]
struct Decision<'a> {
    ts: String,
    key: &'a str,
    allowed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    info!(
        max_requests = config.max_requests,
        window_ms = config.window_ms,
        "limiter configured"
    );

    match &cli.command {
        Commands::Check {
            json,
            cleanup_every_ms,
        } => check(config, *json, Duration::from_millis(*cleanup_every_ms)).await,
        Commands::Demo { key } => demo::run(config, key),
    }
}

fn resolve_config(cli: &Cli) -> Result<LimiterConfig> {
    let mut config = match &cli.config {
        Some(path) => LimiterConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => LimiterConfig::default(),
    };
    if let Some(max_requests) = cli.max_requests {
        config.max_requests = max_requests;
    }
    if let Some(window_ms) = cli.window_ms {
        config.window_ms = window_ms;
    }
    config.validate().context("invalid limiter config")?;
    Ok(config)
}

async fn check(config: LimiterConfig, json: bool, cleanup_every: Duration) -> Result<()> {
    let limiter = Arc::new(RateLimiter::from_config(config, SystemClock)?);
    let sweeper = tokio::spawn(sweep(limiter.clone(), cleanup_every));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await.context("read stdin")? {
        let key = line.trim();
        if key.is_empty() {
            continue;
        }
        let decision = Decision {
            ts: ts(),
            key,
            allowed: limiter.allow_request(key),
        };
        if json {
            println!("{}", serde_json::to_string(&decision)?);
        } else {
            let verdict = if decision.allowed { "ALLOW" } else { "DENY" };
            println!("{} {} {}", decision.ts, decision.key, verdict);
        }
    }

    sweeper.abort();
    info!(tracked = limiter.tracked_keys(), "input closed");
    Ok(())
}

async fn sweep<C: Clock + 'static>(limiter: Arc<RateLimiter<C>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = limiter.cleanup_expired_entries();
        if evicted > 0 {
            info!(evicted, tracked = limiter.tracked_keys(), "swept idle keys");
        }
    }
}

fn ts() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}
