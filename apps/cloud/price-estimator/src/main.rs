//! Price Estimator
//!
//! Prices the cost components of a resource tree against the pricing API.
//! Queries are batched, deduplicated and cached, so repeated estimates of the
//! same infrastructure cost almost no API calls.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use domain_pricing::GraphQlPricingClient;
use eyre::Result;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod estimate;

use config::Config;
use estimate::EstimateOptions;

#[derive(Parser)]
#[command(name = "price-estimator")]
#[command(about = "Estimate cloud resource prices from the pricing API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price every cost component of a resource file
    Estimate {
        /// JSON file holding an array of resources
        #[arg(short, long)]
        input: PathBuf,

        /// Currency code. Defaults to PRICING_CURRENCY.
        #[arg(short, long)]
        currency: Option<String>,

        /// Queries per pricing API request. Defaults to PRICING_BATCH_SIZE.
        #[arg(short, long)]
        batch_size: Option<NonZeroUsize>,

        /// Disable the price cache
        #[arg(long)]
        no_cache: bool,

        /// Run the estimate this many times over one shared cache
        #[arg(short, long, default_value = "1")]
        repeat: NonZeroUsize,

        /// Print Prometheus metrics after the estimate
        #[arg(long)]
        show_metrics: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics()?;

    match cli.command {
        Commands::Estimate {
            input,
            currency,
            batch_size,
            no_cache,
            repeat,
            show_metrics,
        } => {
            let options =
                EstimateOptions::new(&config, input, currency, batch_size, no_cache, repeat);
            info!(
                batch_size = options.batch_size,
                concurrency = options.concurrency,
                cache = options.cache_capacity.is_some(),
                repeat = options.repeat.get(),
                "Starting estimate"
            );

            let client = Arc::new(GraphQlPricingClient::new(config.api.clone())?);
            let report = estimate::run(&options, client).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.missing_components.is_empty() {
                info!(
                    missing = report.missing_components.len(),
                    resources = ?report.missing_resources,
                    "Some cost components have no price"
                );
            }

            if show_metrics {
                println!("{}", observability::render_metrics());
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
        }
    }

    Ok(())
}
