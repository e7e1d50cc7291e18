use std::path::{Path, PathBuf};

use clap::Parser;
use lagline::{
    campaign::{self, RunPaths},
    config::{self, Config},
    evaluator, report,
};
use lagline_capture::{description, reader};
use tokio::{runtime::Builder, task::JoinSet};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Path to the lagline configuration file
    #[clap(short, long)]
    config_path: Option<PathBuf>,

    /// Campaign directories to evaluate
    #[clap(required = true)]
    campaigns: Vec<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Failed to load lagline config: {0}")]
    Config(#[from] config::Error),
    #[error("Failed to discover campaign runs: {0}")]
    Campaign(#[from] campaign::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Evaluated,
    Skipped,
    Failed,
}

fn process_run(run: &RunPaths, output_root: &Path, latency_records: bool) -> Outcome {
    let scenario = &run.scenario;
    let name = &run.run;

    let description = match description::load(&run.description()) {
        Ok(description) => description,
        Err(err) => {
            error!(%scenario, run = %name, error = %err, "failed to load run description");
            return Outcome::Failed;
        }
    };
    let client = match reader::read(&run.client_capture()) {
        Ok(capture) => capture,
        Err(err) => {
            error!(%scenario, run = %name, error = %err, "failed to read client capture");
            return Outcome::Failed;
        }
    };
    let server = match reader::read(&run.server_capture()) {
        Ok(capture) => capture,
        Err(err) => {
            error!(%scenario, run = %name, error = %err, "failed to read server capture");
            return Outcome::Failed;
        }
    };

    let evaluation = match evaluator::evaluate(&description, &client, &server) {
        Ok(evaluation) => evaluation,
        Err(err) => {
            warn!(%scenario, run = %name, reason = %err, "skipping run");
            return Outcome::Skipped;
        }
    };

    let output_dir = output_root
        .join(&run.campaign)
        .join(scenario)
        .join(&description.metadata.run_uid);
    match report::write_run(&output_dir, &evaluation, latency_records) {
        Ok(()) => {
            info!(%scenario, run = %name, "run evaluated");
            Outcome::Evaluated
        }
        Err(err) => {
            error!(%scenario, run = %name, error = %err, "failed to write run report");
            Outcome::Failed
        }
    }
}

async fn inner_main(config: Config, runs: Vec<RunPaths>) -> Result<(), Error> {
    let concurrency = config.concurrency_or_available().get();
    let mut join_set: JoinSet<Outcome> = JoinSet::new();

    let mut evaluated = 0_u64;
    let mut skipped = 0_u64;
    let mut failed = 0_u64;
    let mut tally = |outcome: Outcome| match outcome {
        Outcome::Evaluated => evaluated += 1,
        Outcome::Skipped => skipped += 1,
        Outcome::Failed => failed += 1,
    };

    for run in runs {
        while join_set.len() >= concurrency {
            if let Some(outcome) = join_set.join_next().await {
                tally(outcome?);
            }
        }
        let output_root = config.output_root.clone();
        let latency_records = config.latency_records;
        join_set.spawn_blocking(move || process_run(&run, &output_root, latency_records));
    }
    while let Some(outcome) = join_set.join_next().await {
        tally(outcome?);
    }
    drop(tally);

    info!(evaluated, skipped, failed, "campaign evaluation complete");
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting lagline {version} run.");

    let args = Args::parse();
    let config = match &args.config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut runs = Vec::new();
    for campaign_root in &args.campaigns {
        let discovered = campaign::discover(campaign_root)?;
        info!(
            campaign = %campaign_root.display(),
            runs = discovered.len(),
            "discovered runs"
        );
        runs.extend(discovered);
    }

    let runtime = Builder::new_multi_thread().build()?;
    runtime.block_on(inner_main(config, runs))
}
