use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{geo, output};
use providers::fetch::ModelFetcher;
use std::path::{Path, PathBuf};
use survey_core::config::{self, AppConfig};
use survey_core::pipeline::Pipeline;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            dir,
            lat,
            lon,
            top_k,
            json,
        } => run_batch(cfg, dir, lat, lon, top_k, json).await,
        Commands::PrepModel {
            model,
            out,
            revision,
            files,
        } => prep_model(cfg, &model, &out, &revision, files).await,
    }
}

#[derive(Parser)]
#[command(name = "artifact-survey")]
#[command(about = "Classify a folder of artifact photos and record the results", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every image in a folder and deliver the batch to the configured sink
    Run {
        /// Folder holding the images
        dir: PathBuf,
        /// Latitude stamped on every record
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude stamped on every record
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
        /// Override classifier.top_k
        #[arg(long)]
        top_k: Option<usize>,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Download a model and its preprocessing config for offline use
    PrepModel {
        /// Hub model id, e.g. openai/clip-vit-large-patch14
        #[arg(long)]
        model: String,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "main")]
        revision: String,
        /// File to fetch (repeatable); defaults to models.files
        #[arg(long = "file")]
        files: Vec<String>,
    },
}

async fn run_batch(
    mut cfg: AppConfig,
    dir: PathBuf,
    lat: Option<f64>,
    lon: Option<f64>,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let geo = geo::parse_coordinate(lat, lon)?;
    if let Some(k) = top_k {
        cfg.classifier.top_k = k;
    }
    info!(
        dir = %dir.display(),
        top_k = cfg.classifier.top_k,
        sink = ?cfg.sink.kind,
        "starting survey run"
    );

    let pipeline = Pipeline::from_config(&cfg).context("building pipeline")?;
    let run = pipeline
        .process_folder(&dir, geo)
        .await
        .with_context(|| format!("processing {}", dir.display()))?;
    drop(pipeline);

    if json {
        println!("{}", serde_json::to_string_pretty(&output::render_json(&run))?);
    } else {
        println!("{}", output::render_text(&run));
    }
    Ok(())
}

async fn prep_model(
    cfg: AppConfig,
    model: &str,
    out: &Path,
    revision: &str,
    files: Vec<String>,
) -> Result<()> {
    let files = if files.is_empty() {
        cfg.models.files.clone()
    } else {
        files
    };
    let fetcher = ModelFetcher::new(
        cfg.models.hub_url.clone(),
        config::api_key(cfg.models.api_key_env.as_deref()),
    );
    let paths = fetcher.fetch(model, revision, &files, out).await?;
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}
