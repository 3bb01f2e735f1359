//! scenelab — launcher for a neural scene-reconstruction pipeline.
//!
//! Training and evaluation run as sequences of Python invocations against a
//! pipeline checkout; `convert` reshapes raw TUM RGB-D recordings into the
//! BundleFusion layout those invocations expect.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scenelab_core::{GpuProbe, RunConfig};
use scenelab_pipeline::{evaluation, training, FailurePolicy, OutputMode, Runner};

mod args;
mod check;
mod output;

use args::{CheckArgs, Cli, Command, ConvertArgs, EvalArgs, TrainArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args).await,
        Command::Eval(args) => eval(args).await,
        Command::Convert(args) => convert(args),
        Command::Check(args) => check_cmd(args),
    }
}

async fn train(args: TrainArgs) -> anyhow::Result<()> {
    let cfg = RunConfig::resolve(&args.config.overrides())?;
    let pipeline = training(&cfg, &args.params.to_params());

    if args.dry_run {
        output::print_plan(&cfg, &pipeline);
        return Ok(());
    }

    let report = Runner::default().run(&pipeline, &cfg).await?;
    output::print_run_report(&report);
    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn eval(args: EvalArgs) -> anyhow::Result<()> {
    let cfg = RunConfig::resolve(&args.config.overrides())?;
    let pipeline = evaluation(&cfg, &args.recon.to_params())?;

    if args.dry_run {
        output::print_plan(&cfg, &pipeline);
        return Ok(());
    }

    let policy = if args.keep_going {
        FailurePolicy::KeepGoing
    } else {
        FailurePolicy::Halt
    };
    let mode = if args.capture_logs {
        OutputMode::Capture
    } else {
        OutputMode::Inherit
    };
    let report = Runner::new(policy, mode).run(&pipeline, &cfg).await?;
    output::print_run_report(&report);
    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    info!(
        "Converting {} -> {}",
        args.source_dir.display(),
        args.dest_dir.display()
    );
    let report = scenelab_dataset::convert_tree(&args.source_dir, &args.dest_dir, args.margin)?;
    output::print_convert_report(&report);
    Ok(())
}

fn check_cmd(args: CheckArgs) -> anyhow::Result<()> {
    let cfg = RunConfig::resolve(&args.config.overrides())?;
    let probe = GpuProbe::detect();
    let report = check::run_check(&cfg, args.n_gpus, &probe);
    check::print_report(&cfg, &report);
    if !report.ok() {
        std::process::exit(1);
    }
    Ok(())
}
