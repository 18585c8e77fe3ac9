use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pictor_core::app::{PromptComposer, RateLimiter, RatePolicy};
use pictor_core::domain::{ArtifactId, DEFAULT_STYLE_KEY, GenerationError, GenerationRequest};
use pictor_core::impls::{JsonFileStateStore, LocalArtifactStore};
use pictor_core::ports::{ArtifactStore, SystemClock};
use pictor_core::{Config, OrchestratorBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "pictor", version, about = "Styled thumbnail generation with a local cache")]
struct Cli {
    /// Cache directory (overrides PICTOR_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one image from a prompt
    Generate {
        /// Content to illustrate
        #[arg(required = true)]
        prompt: Vec<String>,

        /// Style preset (name or English alias)
        #[arg(short, long, default_value = DEFAULT_STYLE_KEY)]
        style: String,

        /// Where to write the image (defaults to the saved file name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List recently saved images
    Recent {
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },

    /// Copy a saved image out of the cache
    Show {
        id: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show rate limit usage
    Quota,

    /// List style presets
    Styles,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    tracing::debug!(cache_dir = %config.cache_dir.display(), "config loaded");

    match cli.command {
        Command::Generate { prompt, style, out } => {
            generate(config, prompt.join(" "), style, out, cli.json).await
        }
        Command::Recent { limit } => recent(&config, limit, cli.json).await,
        Command::Show { id, out } => show(&config, &id, out).await,
        Command::Quota => quota(&config, cli.json).await,
        Command::Styles => {
            styles();
            Ok(())
        }
    }
}

async fn generate(
    config: Config,
    prompt: String,
    style: String,
    out: Option<PathBuf>,
    json: bool,
) -> CliResult<()> {
    let orchestrator = OrchestratorBuilder::new(config).build()?;

    let outcome = match orchestrator
        .generate(GenerationRequest::new(prompt, style))
        .await
    {
        Ok(outcome) => outcome,
        Err(GenerationError::RateLimited { retry_after }) => {
            return Err(format!(
                "rate limit reached, try again in {} minutes",
                retry_after.as_secs().div_ceil(60)
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    let path = out.unwrap_or_else(|| match &outcome.record {
        Some(record) => PathBuf::from(record.id.as_str()),
        None => PathBuf::from("generated_image.jpg"),
    });
    write_payload(&path, &outcome.payload).await?;

    if json {
        let report = serde_json::json!({
            "path": path,
            "record": outcome.record,
            "estimated_cost_usd": outcome.estimated_cost.usd,
            "warnings": outcome.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("saved {}", path.display());
    println!("estimated cost: {}", outcome.estimated_cost);
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

async fn recent(config: &Config, limit: usize, json: bool) -> CliResult<()> {
    let store = LocalArtifactStore::new(&config.cache_dir);
    let records = store.list_recent(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("no saved images");
    } else {
        for record in records.iter().rev() {
            println!("{}  {}", record.id, record.caption());
        }
    }
    Ok(())
}

async fn show(config: &Config, id: &str, out: Option<PathBuf>) -> CliResult<()> {
    let id = ArtifactId::parse(id)?;
    let store = LocalArtifactStore::new(&config.cache_dir);
    let payload = store.load(&id).await?;

    let path = out.unwrap_or_else(|| PathBuf::from(id.as_str()));
    write_payload(&path, &payload).await?;
    println!("wrote {} ({} bytes)", path.display(), payload.len());
    Ok(())
}

async fn quota(config: &Config, json: bool) -> CliResult<()> {
    let limiter = RateLimiter::new(
        Arc::new(JsonFileStateStore::in_dir(&config.cache_dir)),
        Arc::new(SystemClock),
        RatePolicy {
            max_requests: config.rate_limit_requests,
            window: config.rate_limit_window(),
        },
    );
    let status = limiter.status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}/{} requests used", status.used, status.limit);
    match status.resets_at {
        Some(resets_at) => println!("window resets at {resets_at}"),
        None => println!("no active window"),
    }
    Ok(())
}

fn styles() {
    for preset in PromptComposer::new().styles() {
        println!(
            "{} ({}): {}, {}",
            preset.name, preset.alias, preset.attributes.color, preset.attributes.mood
        );
    }
}

async fn write_payload(path: &Path, payload: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, payload).await
}
