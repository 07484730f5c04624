use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use expkit_designs::{load_designs_and_itis, source_for};
use expkit_experiment::{
    fmri, parse_timeline, survey, InputSource, NoInput, SimulatedParticipant, TimelineNode,
    TrialRunner,
};
use expkit_timing::{Clock, HighPrecisionClock, ManualClock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info};

mod cli;
mod config;
mod logging;

use cli::{Cli, Commands};
use config::{AppConfig, RunConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging);

    match cli.command {
        Commands::Run {
            timeline,
            realtime,
            seed,
            no_participant,
        } => run(&config, &timeline, realtime, seed, !no_participant),
        Commands::Survey { rows } => {
            let text = read(&rows)?;
            let trials = survey::convert_json(&text)
                .with_context(|| format!("invalid survey rows in {}", rows.display()))?;
            print_json(&trials)
        }
        Commands::Designs { base, design, names } => {
            let base = base.unwrap_or_else(|| config.designs.base.clone());
            let source = source_for(&base)?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            let files =
                runtime.block_on(load_designs_and_itis(&*source, design, names.as_slice()));
            print_json(&files)
        }
        Commands::Builtin { name } => match fmri::builtin(&name) {
            Some(node) => print_json(&node),
            None => bail!("no built-in node named `{name}`"),
        },
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn run(
    config: &AppConfig,
    path: &Path,
    realtime: bool,
    seed: Option<u64>,
    simulate: bool,
) -> Result<()> {
    let timeline = parse_timeline(&read(path)?)
        .with_context(|| format!("invalid timeline {}", path.display()))?;
    let realtime = realtime || config.run.realtime;
    let seed = seed.or(config.run.seed);

    let mut input: Box<dyn InputSource> = if simulate {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Box::new(SimulatedParticipant::new(rng, config.simulation.clone()))
    } else {
        Box::new(NoInput)
    };

    info!(path = %path.display(), realtime, ?seed, simulate, "running timeline");
    let out = std::io::stdout().lock();
    if realtime {
        execute(HighPrecisionClock::new(), &config.run, &timeline, input.as_mut(), out)
    } else {
        execute(ManualClock::new(), &config.run, &timeline, input.as_mut(), out)
    }
}

/// Runs the timeline and writes every record collected, including those of a
/// run that stopped early.
fn execute<C: Clock, W: Write>(
    clock: C,
    run: &RunConfig,
    timeline: &[TimelineNode],
    input: &mut dyn InputSource,
    out: W,
) -> Result<()> {
    let mut runner = TrialRunner::new(clock)
        .case_sensitive_responses(run.case_sensitive_responses)
        .default_post_trial_gap(run.post_trial_gap_ms);
    let finished = runner.run_timeline(timeline, input).map(|_| ());
    if let Err(err) = &finished {
        error!(%err, collected = runner.records().len(), "timeline stopped early");
    }
    write_json(out, runner.records())?;
    finished.context("timeline did not run to completion")
}
