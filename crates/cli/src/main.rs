//! Camera Price Predictor CLI
//!
//! A command-line tool for training price models, inspecting bundles and
//! querying a running price server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, predict, train};
use price_lib::training::TrainingConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Camera Price Predictor CLI
#[derive(Parser)]
#[command(name = "camprice")]
#[command(author, version, about = "CLI for the Camera Price Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CAMPRICE_API_URL env var)
    #[arg(long, env = "CAMPRICE_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a price model from a camera CSV dataset
    Train {
        /// Dataset CSV path
        #[arg(long, default_value = "camera_dataset.csv")]
        data: PathBuf,

        /// Bundle output path
        #[arg(long, short, default_value = "camera_price_bundle.bin")]
        output: PathBuf,

        /// Number of boosting rounds
        #[arg(long, default_value_t = 200)]
        n_estimators: usize,

        /// Shrinkage applied to each tree
        #[arg(long, default_value_t = 0.1)]
        learning_rate: f64,

        /// Maximum depth of each tree
        #[arg(long, default_value_t = 5)]
        max_depth: usize,

        /// Fraction of training rows drawn for each tree
        #[arg(long, default_value_t = 0.8)]
        subsample: f64,

        /// Minimum rows a node needs before it may split
        #[arg(long, default_value_t = 5)]
        min_samples_split: usize,

        /// Minimum rows on each side of a split
        #[arg(long, default_value_t = 3)]
        min_samples_leaf: usize,

        /// Fraction of cleaned rows held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,

        /// Seed for the split and row subsampling
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Predict a camera price using a running server
    Predict {
        /// Brand name, free text, or "auto" to detect it from --model
        #[arg(long, required_unless_present = "brand_id", conflicts_with = "brand_id")]
        brand: Option<String>,

        /// Model name, used for brand auto-detection
        #[arg(long)]
        model: Option<String>,

        /// Encoded brand code (raw training-schema request)
        #[arg(long)]
        brand_id: Option<f64>,

        /// Effective pixels in megapixels
        #[arg(long)]
        pixels: f64,

        /// Weight including batteries, in grams
        #[arg(long)]
        weight: f64,

        /// Dimension volume in mm³
        #[arg(long)]
        dimensions: Option<f64>,
    },

    /// List the brand codes known to the server
    Brands,

    /// Show server health and training metrics
    Health,

    /// Inspect a model bundle without a server
    Inspect {
        /// Bundle path
        #[arg(long, default_value = "camera_price_bundle.bin")]
        bundle: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer())
            .init();
    }

    let file_config = config::Config::load()?;
    let format = file_config.resolve_format(cli.format)?;

    // Execute command
    match cli.command {
        Commands::Train {
            data,
            output,
            n_estimators,
            learning_rate,
            max_depth,
            subsample,
            min_samples_split,
            min_samples_leaf,
            test_size,
            seed,
        } => {
            let config = TrainingConfig {
                n_estimators,
                learning_rate,
                max_depth,
                subsample,
                min_samples_split,
                min_samples_leaf,
                test_size,
                seed,
            };
            train::run_training(&data, &output, &config, format)?;
        }
        Commands::Inspect { bundle } => {
            inspect::inspect_bundle(&bundle, format)?;
        }
        Commands::Predict {
            brand,
            model,
            brand_id,
            pixels,
            weight,
            dimensions,
        } => {
            let client = client::ApiClient::new(&file_config.resolve_api_url(cli.api_url))?;
            let args = predict::PredictArgs {
                brand,
                model,
                brand_id,
                pixels,
                weight,
                dimensions,
            };
            predict::predict(&client, &args, format).await?;
        }
        Commands::Brands => {
            let client = client::ApiClient::new(&file_config.resolve_api_url(cli.api_url))?;
            predict::list_brands(&client, format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&file_config.resolve_api_url(cli.api_url))?;
            predict::show_health(&client, format).await?;
        }
    }

    Ok(())
}
