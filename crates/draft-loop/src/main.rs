use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use draft_loop::config::{check_endpoint, DraftConfig};
use draft_loop::{
    ConsoleHuman, ConsoleObserver, FileRecorder, LoopController, LoopObserver, RigGenerator,
    TracingObserver,
};

const DEFAULT_TOPIC: &str = "The impact of AI in Business";

/// Draft a document with an LLM and revise it until you approve it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topic of the document
    #[arg(default_value = DEFAULT_TOPIC)]
    topic: String,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model name (overrides DRAFT_LOOP_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible base URL (overrides DRAFT_LOOP_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Directory the approved draft is written to (overrides DRAFT_LOOP_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Do not print the progress ticker while waiting on the model
    #[arg(long, default_value_t = false)]
    no_progress: bool,

    /// Send loop notices to the log instead of the terminal
    #[arg(long, default_value_t = false)]
    log_events: bool,
}

impl Args {
    fn apply(&self, config: &mut DraftConfig) {
        if let Some(model) = &self.model {
            config.endpoint.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            config.endpoint.base_url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = Some(secs);
        }
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = DraftConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    if config.has_api_key() {
        println!("✅ API key loaded!");
    } else {
        println!("❌ API key not found!");
    }

    if !check_endpoint(&config.endpoint.base_url).await {
        warn!(url = %config.endpoint.base_url, "inference endpoint not reachable");
    }

    let backend = RigGenerator::new(&config)
        .context("Failed to build completion client")?
        .into_shared(config.request_timeout());
    println!("✅ LLM initialized successfully!");
    info!(
        model = %config.endpoint.model,
        url = %config.endpoint.base_url,
        "drafting loop starting"
    );

    let observer: Arc<dyn LoopObserver> = if args.log_events {
        Arc::new(TracingObserver)
    } else {
        Arc::new(ConsoleObserver::new(config.show_progress))
    };

    let controller = LoopController::from_collaborators(
        backend,
        Arc::new(ConsoleHuman::stdio()),
        Arc::new(FileRecorder::new(&config.output_dir)),
        observer,
    )
    .with_log_capacity(config.max_logged_transitions);

    let outcome = controller
        .run(args.topic)
        .await
        .context("Drafting session aborted")?;

    info!(
        cycles = outcome.cycles,
        generations = outcome.generations,
        saved = outcome.record.is_saved(),
        "{}",
        outcome.summary
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(&outcome.transitions) {
            Ok(json) => tracing::debug!(transitions = %json, "transition log"),
            Err(e) => warn!("Failed to serialize transition log: {e}"),
        }
    }

    Ok(())
}
