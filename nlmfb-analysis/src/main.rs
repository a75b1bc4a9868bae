//! nlmfb-analysis - offline stimulus and model tools

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nlmfb_analysis::accuracy::{format_accuracy, model_accuracy};
use nlmfb_analysis::completion_client::{ApiCredentials, CompletionClient, DEFAULT_API_BASE};
use nlmfb_analysis::humanize::humanize_table;
use nlmfb_analysis::log_odds::score_table;
use nlmfb_analysis::pilot::{pilot_item_ids, pilot_table};
use nlmfb_analysis::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "nlmfb-analysis")]
#[command(about = "NLM-FB stimulus preparation and model scoring")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add passage_hr, critical_q and critical_a columns to a stimulus file
    HumanizeStimuli {
        #[arg(long, default_value = "nlm_fb/data/nlm_fb_stimuli.csv")]
        input: PathBuf,

        /// Defaults to overwriting the input
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score two candidate answers per passage with a completion model
    LogOdds {
        /// Task name; reads `{stims_dir}/{path}.csv`
        #[arg(long, default_value = "fb")]
        path: String,

        /// Column holding the first candidate
        #[arg(long, default_value = "start")]
        c1: String,

        /// Column holding the second candidate
        #[arg(long, default_value = "end")]
        c2: String,

        #[arg(long, default_value = "davinci")]
        model: String,

        #[arg(long, default_value = "data/stims")]
        stims_dir: PathBuf,

        /// Defaults to `data/processed/{path}_gpt3-{model}_surprisals_probs.csv`
        #[arg(long)]
        output: Option<PathBuf>,

        /// Organization on line one, API key on line two
        #[arg(long, default_value = "src/models/gpt_key")]
        key_file: PathBuf,

        #[arg(long, env = "NLMFB_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,

        /// Minimum milliseconds between API requests
        #[arg(long, default_value_t = 1000)]
        min_interval_ms: u64,
    },

    /// Print log-odds and token generation accuracy of scored files
    ModelAccuracy {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write a balanced pilot item list
    PilotSample {
        #[arg(long, default_value = "nlm_fb/data/mturk_pilot_items.csv")]
        output: PathBuf,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::HumanizeStimuli { input, output } => {
            let mut table = Table::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            humanize_table(&mut table).context("Failed to derive human-readable stimuli")?;

            let output = output.unwrap_or(input);
            table
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} stimuli to {}", table.len(), output.display());
        }

        Command::LogOdds {
            path,
            c1,
            c2,
            model,
            stims_dir,
            output,
            key_file,
            api_base,
            min_interval_ms,
        } => {
            let input = stims_dir.join(format!("{}.csv", path));
            let passages = Table::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let credentials = match ApiCredentials::from_key_file(&key_file) {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!("{}; falling back to environment", e);
                    ApiCredentials::from_env().context("No completion API credentials")?
                }
            };
            let client = CompletionClient::new(&api_base, credentials, min_interval_ms)
                .context("Failed to create completion client")?;

            let scored = score_table(&client, &model, &passages, &c1, &c2)
                .await
                .context("Scoring failed")?;

            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "data/processed/{}_gpt3-{}_surprisals_probs.csv",
                    path, model
                ))
            });
            scored
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} scored passages to {}", scored.len(), output.display());
        }

        Command::ModelAccuracy { files } => {
            for file in files {
                let table = Table::read(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let report = model_accuracy(&table)
                    .with_context(|| format!("Cannot score {}", file.display()))?;

                println!("{}", file.display());
                println!("log odds accuracy: {}", format_accuracy(report.lp_accuracy));
                println!("token gen accuracy: {}", format_accuracy(report.tg_accuracy));
            }
        }

        Command::PilotSample { output, seed } => {
            let items = match seed {
                Some(seed) => pilot_item_ids(&mut StdRng::seed_from_u64(seed)),
                None => pilot_item_ids(&mut rand::thread_rng()),
            };
            let table = pilot_table(items)?;
            table
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} pilot items to {}", table.len(), output.display());
        }
    }

    Ok(())
}
