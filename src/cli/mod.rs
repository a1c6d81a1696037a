//! Command-line interface for dreamloom.
//!
//! Provides commands for generating a storybook, checking run status,
//! listing completed runs, and starting the HTTP front door.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DiffusionClient, OllamaClient};
use crate::config::Config;
use crate::core::storage::DOCUMENT_FILE;
use crate::core::{Orchestrator, ProgressTracker, RunStore};
use crate::domain::{DreamRequest, RunId};
use crate::registry::ModelRegistry;
use crate::server::{self, AppState};

/// dreamloom - dream-to-storybook generation pipeline
#[derive(Parser, Debug)]
#[command(name = "dreamloom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an illustrated storybook from a dream description
    Run {
        /// Dream description text
        #[arg(short, long)]
        dream: String,

        /// Core elements to weave in (snake, fish, bat, ...)
        #[arg(short, long, num_args = 1..)]
        elements: Vec<String>,

        /// Text model to use (defaults to the configured model)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Check the status of a run
    Status {
        /// Run ID (run_<timestamp>_<suffix>)
        run_id: String,
    },

    /// List completed runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Start the HTTP front door
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        address: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                dream,
                elements,
                model,
            } => run_dream(dream, elements, model).await,
            Commands::Status { run_id } => show_status(&run_id).await,
            Commands::Runs { limit } => list_runs(limit).await,
            Commands::Serve { address } => serve(&address).await,
            Commands::Config => show_config(),
        }
    }
}

/// Build the execution context: registry with one text handle per
/// configured model, the image handle, tracker, store, orchestrator.
fn build_context(config: &Config) -> (Arc<Orchestrator>, Arc<ProgressTracker>, RunStore) {
    let registry = Arc::new(ModelRegistry::new());

    // Every offered model gets a handle; Ollama serves them all by name.
    let mut names = config.available_text_models.clone();
    if !names.contains(&config.text_model.name) {
        names.push(config.text_model.name.clone());
    }
    for name in names {
        let client = OllamaClient::new(
            name.clone(),
            config.text_model.url.clone(),
            config.text_model.options.clone(),
        );
        registry.register_text(name, Arc::new(client));
    }

    let image = DiffusionClient::new(
        config.image_model.name.clone(),
        config.image_model.url.clone(),
        config.image_model.parameters.clone(),
    );
    registry.register_image(config.image_model.name.clone(), Arc::new(image));

    let tracker = Arc::new(ProgressTracker::new());
    let store = RunStore::new(config.pipeline.output_dir.clone());
    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        Arc::clone(&tracker),
        store.clone(),
        config,
    ));

    (orchestrator, tracker, store)
}

async fn run_dream(dream: String, elements: Vec<String>, model: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let (orchestrator, _tracker, _store) = build_context(&config);

    let summary = orchestrator
        .run(DreamRequest {
            dream,
            elements,
            model,
        })
        .await
        .context("Pipeline run failed")?;

    println!("Run complete: {}", summary.run_id);
    println!("Story saved to: {}", summary.document_path.display());
    println!(
        "Images generated: {} ({} scenes)",
        summary.image_files.len(),
        summary.scene_count
    );

    Ok(())
}

/// Status from storage. The in-memory tracker only answers inside a serving
/// process; from the CLI we inspect what the run has persisted so far.
async fn show_status(run_id: &str) -> Result<()> {
    let config = Config::load()?;
    let store = RunStore::new(config.pipeline.output_dir.clone());
    let run_id = RunId::new(run_id);
    let run_dir = store.run_dir(&run_id);

    if !run_dir.is_dir() {
        println!("{}: not found (no output directory)", run_id);
        return Ok(());
    }

    if run_dir.join(DOCUMENT_FILE).exists() {
        println!("{}: complete", run_id);
        println!("Storybook: {}", run_dir.join(DOCUMENT_FILE).display());
    } else {
        println!("{}: incomplete (no rendered storybook yet)", run_id);
    }

    Ok(())
}

async fn list_runs(limit: usize) -> Result<()> {
    let config = Config::load()?;
    let store = RunStore::new(config.pipeline.output_dir.clone());

    let runs = store.list_completed_runs().await?;
    if runs.is_empty() {
        println!("No completed runs under {}", store.output_root().display());
        return Ok(());
    }

    for name in runs.iter().take(limit) {
        println!("{}", name);
    }

    Ok(())
}

async fn serve(address: &str) -> Result<()> {
    let config = Config::load()?;
    let (orchestrator, tracker, store) = build_context(&config);

    let state = AppState {
        orchestrator,
        tracker,
        store,
        available_models: Arc::new(config.available_text_models.clone()),
    };

    server::serve(state, address).await
}

fn show_config() -> Result<()> {
    let config = Config::load()?;

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none (defaults)"),
    }
    println!(
        "Text model: {} @ {}",
        config.text_model.name, config.text_model.url
    );
    println!(
        "Image model: {} @ {}",
        config.image_model.name, config.image_model.url
    );
    println!("Scenes: {}", config.pipeline.scenes);
    println!("Target words: {}", config.pipeline.target_words);
    println!("Compress scenes: {}", config.pipeline.compress_scenes);
    println!("Output dir: {}", config.pipeline.output_dir.display());

    Ok(())
}
