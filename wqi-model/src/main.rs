//! wqi-model - offline training and analysis
//!
//! `train` builds a labeled table (synthetic by default, or an external CSV),
//! fits the stacked ensemble and writes the model artifact. `analyze`
//! summarizes a dataset against the rule labels and, optionally, a trained
//! model.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wqi_common::config::{self, RootLayout};
use wqi_common::{Estimator, RuleBasedEstimator, RuleTable};
use wqi_model::config::ModelConfig;
use wqi_model::synthesis::{load_external_dataset, LabeledTable, SyntheticGenerator};
use wqi_model::{analysis, artifact, training};

#[derive(Parser, Debug)]
#[command(name = "wqi-model")]
#[command(about = "Train and analyze the water quality index ensemble")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root folder for the model artifact and data files
    #[arg(short, long, global = true, env = "WQI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the ensemble and write the model artifact
    Train {
        /// External CSV dataset; synthetic data is generated when absent
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Synthetic row count (overrides `[synthesis] rows`)
        #[arg(long)]
        rows: Option<usize>,

        /// Artifact path (defaults to `<root>/model/model.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a dataset against rule labels and a trained model
    Analyze {
        /// External CSV dataset; synthetic data is generated when absent
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Artifact path (defaults to `<root>/model/model.json`)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Compare against the scoring rules instead of a trained model
        #[arg(long)]
        rules_only: bool,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_table(
    dataset: Option<&PathBuf>,
    rows: Option<usize>,
    config: &ModelConfig,
    rules: &RuleTable,
) -> Result<LabeledTable> {
    match dataset {
        Some(path) => load_external_dataset(path, rules)
            .with_context(|| format!("Failed to load dataset {}", path.display())),
        None => {
            let generator = SyntheticGenerator::from_config(&config.synthesis)?;
            Ok(generator.generate(rows.unwrap_or(config.synthesis.rows), rules)?)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let config: ModelConfig = config::load_toml(config_path.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.common.logging.level);

    let root = config::resolve_root_folder(args.root_folder.as_deref(), config.common.root_folder.as_deref());
    let layout = RootLayout::new(root);
    info!("Root folder: {}", layout.root().display());

    let rules = config.common.rule_table().context("Invalid rule table")?;

    match args.command {
        Command::Train { dataset, rows, output } => {
            let table = load_table(dataset.as_ref(), rows, &config, &rules)?;
            let report = training::train_and_evaluate(&table, &config.ensemble, &config.training)?;

            let meta = &report.ensemble.metadata;
            println!("Held-out R2:  {:.4}", meta.r2);
            println!("Held-out MAE: {:.3}", meta.mae);
            println!("Feature importances (random forest):");
            let mut importances: Vec<_> = meta.feature_importances.iter().collect();
            importances.sort_by(|a, b| b.1.total_cmp(a.1));
            for (field, value) in importances {
                println!("  {:<14} {:.4}", field, value);
            }

            let output = output.unwrap_or_else(|| layout.model_path());
            artifact::save(&output, &report.ensemble)
                .with_context(|| format!("Failed to write model artifact {}", output.display()))?;
            println!("Model saved to {}", output.display());
        }

        Command::Analyze { dataset, model, rules_only } => {
            let table = load_table(dataset.as_ref(), None, &config, &rules)?;

            let estimator: Box<dyn Estimator> = if rules_only {
                Box::new(RuleBasedEstimator::new(Arc::new(rules)))
            } else {
                let path = model.unwrap_or_else(|| layout.model_path());
                Box::new(
                    artifact::load(&path)
                        .with_context(|| format!("Failed to load model artifact {}", path.display()))?,
                )
            };

            let report = analysis::analyze(&table, Some(estimator.as_ref()));
            print!("{}", report);
        }
    }

    Ok(())
}
