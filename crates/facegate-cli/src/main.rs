use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facegate_core::scripted::{ScriptedAnalyzer, ScriptedProvider, StillCamera, Trace};
use facegate_core::{CameraError, Frame, ModelBundle, Notice};
use facegate_session::{
    load_model_set, spawn_session, ChannelListener, Config, HttpModelSource, SessionEvent,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facegate", about = "Face capture acceptance loop tooling")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session against a recorded detection trace
    Replay {
        /// JSON trace: one array of faces per detection call
        trace: PathBuf,
        /// Override the sampling period in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Report this camera failure instead of a ready camera
        #[arg(long)]
        camera_error: Option<String>,
    },
    /// Fetch and validate the model bundles from the model host
    FetchModels {
        /// Override the model base URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Replay {
            trace,
            tick_ms,
            camera_error,
        } => {
            if let Some(ms) = tick_ms {
                config.tick_ms = ms;
            }
            replay(&config, &trace, camera_error).await?;
        }
        Commands::FetchModels { url } => {
            if let Some(url) = url {
                config.model_url = url;
            }
            fetch_models(&config).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn replay(config: &Config, path: &Path, camera_error: Option<String>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace {}", path.display()))?;
    let trace: Trace =
        serde_json::from_str(&raw).with_context(|| format!("parsing trace {}", path.display()))?;
    tracing::info!(samples = trace.len(), "replaying trace");

    let analyzer = Arc::new(ScriptedAnalyzer::from_trace(trace));
    let (listener, mut events) = ChannelListener::new();
    let (handle, task) = spawn_session(
        config,
        ScriptedProvider::ready(Arc::clone(&analyzer)),
        StillCamera::new(Frame::blank(640, 480)),
        listener,
    );

    handle.show().await?;
    match camera_error {
        Some(reason) => handle.camera_failed(CameraError::from_reason(reason)).await?,
        None => handle.camera_ready().await?,
    }

    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
        match event {
            SessionEvent::Accepted { .. } | SessionEvent::Cancelled => break,
            // A non-fatal camera failure leaves the session idle for good.
            SessionEvent::Notice {
                notice: Notice::CameraFailed { .. },
                ..
            } => break,
            _ => {}
        }
    }

    handle.close().await?;
    task.await.context("session task panicked")?;
    tracing::info!(detections = analyzer.calls(), "replay finished");
    Ok(())
}

async fn fetch_models(config: &Config) -> Result<()> {
    let source = HttpModelSource::new(&config.model_url, config.fetch_timeout())?;
    tracing::info!(url = %config.model_url, "fetching model bundles");
    let set = load_model_set(&source)
        .await
        .with_context(|| format!("loading models from {}", config.model_url))?;

    for bundle in ModelBundle::ALL {
        let data = set.get(bundle);
        let tensors: usize = data.manifest.iter().map(|g| g.weights.len()).sum();
        println!(
            "{bundle}: {} shard(s), {tensors} tensor(s), {} bytes",
            data.shards.len(),
            data.total_bytes()
        );
    }
    Ok(())
}
