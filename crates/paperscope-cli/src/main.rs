use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paperscope_core::{AppConfig, PaperMetadata};
use paperscope_science::{PageFetcher, SourceRegistry};
use paperscope_server::Background;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "paperscope",
    about = "Bibliographic metadata from the pages you read",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PAPERSCOPE_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata from a page.
    Extract {
        url: String,
        /// Read the page from a saved HTML file instead of fetching it.
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Show which integration handles a URL and the paper id it derives.
    Resolve { url: String },

    /// List the page-script match globs of every integration.
    Matches,

    /// Handle JSON-lines messages on stdin, replying on stdout.
    Serve,

    /// Show the effective configuration.
    Config {
        /// Write a default config file if none exists.
        #[arg(long)]
        init: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("PAPERSCOPE_JSON").as_deref() == Ok("1");
    let timing = std::env::var("PAPERSCOPE_TIMING").as_deref() == Ok("1");

    let config = AppConfig::load()?;
    if timing {
        eprintln!("[timing] config loaded in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    match cli.command {
        Commands::Extract { url, html } => {
            let page = match html {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => PageFetcher::from_config(&config.fetch)?.fetch_html(&url).await?,
            };
            let extracted = SourceRegistry::with_defaults().extract(&url, &page);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": extracted,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("integration:  {}", extracted.integration_id);
                print_metadata(&extracted.metadata);
            }
        }

        Commands::Resolve { url } => {
            let registry = SourceRegistry::with_defaults();
            let integration = registry.resolve(&url);
            let identity = registry.resolve_identity(&url);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "integrationId": integration.id(),
                        "integrationName": integration.name(),
                        "paperId": identity.paper_id,
                        "paperKey": identity.paper_key(),
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{}  {}  {}", integration.id(), identity.paper_id, identity.paper_key());
            }
        }

        Commands::Matches => {
            let matches = SourceRegistry::with_defaults().content_script_matches();
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": matches, "total": matches.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for m in &matches {
                    println!("{m}");
                }
            }
        }

        Commands::Serve => serve(Background::from_config(config)).await?,

        Commands::Config { init } => {
            let path = AppConfig::config_path();
            if init {
                if path.exists() {
                    eprintln!("Config already exists: {}", path.display());
                    std::process::exit(1);
                }
                AppConfig::default().save_to(&path)?;
                println!("Wrote {}", path.display());
            } else {
                let mut shown = config.clone();
                if shown.store.token.is_some() {
                    shown.store.token = Some("<redacted>".to_string());
                }
                let configured = config.credentials().is_some();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "path": path, "config": shown, "store_configured": configured },
                        "meta": { "duration_ms": start.elapsed().as_millis() }
                    }))?;
                } else {
                    println!("# {}", path.display());
                    println!("# store configured: {configured}");
                    print!("{}", toml::to_string_pretty(&shown)?);
                }
            }
        }
    }

    if timing {
        eprintln!("[timing] total {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    Ok(())
}

// ─── Serve loop ─────────────────────────────────────────────────────────────

/// One JSON envelope per input line; one reply line per message. The idle
/// sweep runs on a timer between messages.
async fn serve(background: Background) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let every = background.config().session.sweep_interval_secs.max(1);
    let mut sweep = tokio::time::interval(Duration::from_secs(every));
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        integrations = background.registry().ids().len(),
        "serving on stdin"
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(reply) = background.handle_line(&line).await {
                    let mut out = serde_json::to_string(&reply)?;
                    out.push('\n');
                    stdout.write_all(out.as_bytes()).await?;
                    stdout.flush().await?;
                }
            }
            _ = sweep.tick() => {
                background.sweep_idle(chrono::Utc::now()).await;
            }
        }
    }

    background.shutdown().await;
    info!("stdin closed, exiting");
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_metadata(meta: &PaperMetadata) {
    let rows = [
        ("source", meta.source_id.as_str()),
        ("paper id", meta.paper_id.as_str()),
        ("title", meta.title.as_str()),
        ("authors", meta.authors.as_str()),
        ("published", meta.published_date.as_str()),
        ("doi", meta.doi.as_str()),
        ("journal", meta.journal_name.as_str()),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("{:<13} {value}", format!("{label}:"));
        }
    }
    if !meta.tags.is_empty() {
        println!("{:<13} {}", "tags:", meta.tags.join("; "));
    }
    if !meta.description.is_empty() {
        println!("\n{}", meta.description);
    }
}
