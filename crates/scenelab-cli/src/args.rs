//! Command-line surface.
//!
//! Configuration flags are optional everywhere; unset values fall back to
//! the environment variables and then to defaults, so existing env-driven
//! setups keep working unchanged.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use scenelab_core::{DatasetKind, ReconParams, RunOverrides, TrainParams};
use scenelab_dataset::DEFAULT_MARGIN;

/// Launcher for the scene-reconstruction pipeline.
#[derive(Debug, Parser)]
#[command(name = "scenelab", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the training pipeline
    Train(TrainArgs),
    /// Run the evaluation/reconstruction pipeline
    Eval(EvalArgs),
    /// Convert TUM RGB-D scenes to the BundleFusion layout
    Convert(ConvertArgs),
    /// Validate the run configuration without running anything
    Check(CheckArgs),
}

/// Shared run configuration flags.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Dataset to run against (bundlefusion or kitti)
    #[arg(long)]
    pub dataset: Option<DatasetKind>,

    /// Root directory of the preprocessed dataset
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Training log directory
    #[arg(long)]
    pub logdir: Option<PathBuf>,

    /// Model checkpoint consumed by evaluation steps
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Directory for depth/color evaluation outputs
    #[arg(long)]
    pub eval_save_dir: Option<PathBuf>,

    /// Directory for reconstruction outputs
    #[arg(long)]
    pub recon_save_dir: Option<PathBuf>,

    /// Python interpreter used to launch steps
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Checkout directory of the pipeline code
    #[arg(long)]
    pub pipeline_root: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            dataset: self.dataset,
            root: self.root.clone(),
            logdir: self.logdir.clone(),
            model_path: self.model_path.clone(),
            eval_save_dir: self.eval_save_dir.clone(),
            recon_save_dir: self.recon_save_dir.clone(),
            python: self.python.clone(),
            pipeline_root: self.pipeline_root.clone(),
        }
    }
}

/// Training hyperparameters, forwarded verbatim to the trainer.
#[derive(Debug, Args)]
pub struct TrainParamArgs {
    /// Batch size
    #[arg(long)]
    pub bs: Option<usize>,

    /// GPUs the trainer may use
    #[arg(long)]
    pub n_gpus: Option<usize>,

    /// Data-loader workers per GPU
    #[arg(long)]
    pub n_workers_per_gpu: Option<usize>,

    /// Rays sampled per batch
    #[arg(long)]
    pub n_rays: Option<usize>,

    /// Learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Whether the trainer writes tensorboard logs
    #[arg(long)]
    pub enable_log: Option<bool>,

    /// Side length of the ray sampling grid
    #[arg(long)]
    pub sample_grid_size: Option<usize>,

    /// Gaussians per ray in depth-guided sampling
    #[arg(long)]
    pub n_gaussians: Option<usize>,

    /// Points drawn per gaussian
    #[arg(long)]
    pub n_pts_per_gaussian: Option<usize>,

    /// Uniformly sampled points per ray
    #[arg(long)]
    pub n_pts_uni: Option<usize>,

    /// Frames per sequence sample
    #[arg(long)]
    pub n_frames: Option<usize>,

    /// Interval between sampled frames
    #[arg(long)]
    pub frame_interval: Option<usize>,

    /// Training epochs
    #[arg(long)]
    pub max_epochs: Option<usize>,
}

impl TrainParamArgs {
    pub fn to_params(&self) -> TrainParams {
        let d = TrainParams::default();
        TrainParams {
            bs: self.bs.unwrap_or(d.bs),
            n_gpus: self.n_gpus.unwrap_or(d.n_gpus),
            n_workers_per_gpu: self.n_workers_per_gpu.unwrap_or(d.n_workers_per_gpu),
            n_rays: self.n_rays.unwrap_or(d.n_rays),
            lr: self.lr.unwrap_or(d.lr),
            enable_log: self.enable_log.unwrap_or(d.enable_log),
            sample_grid_size: self.sample_grid_size.unwrap_or(d.sample_grid_size),
            n_gaussians: self.n_gaussians.unwrap_or(d.n_gaussians),
            n_pts_per_gaussian: self.n_pts_per_gaussian.unwrap_or(d.n_pts_per_gaussian),
            n_pts_uni: self.n_pts_uni.unwrap_or(d.n_pts_uni),
            n_frames: self.n_frames.unwrap_or(d.n_frames),
            frame_interval: self.frame_interval.unwrap_or(d.frame_interval),
            max_epochs: self.max_epochs.unwrap_or(d.max_epochs),
        }
    }
}

/// Reconstruction sweep parameters.
#[derive(Debug, Args)]
pub struct ReconArgs {
    /// Camera sweep angle in degrees
    #[arg(long)]
    pub angle: Option<f64>,

    /// Sweep step size
    #[arg(long)]
    pub step: Option<f64>,

    /// Maximum ray distance in meters
    #[arg(long)]
    pub max_distance: Option<f64>,
}

impl ReconArgs {
    pub fn to_params(&self) -> ReconParams {
        let d = ReconParams::default();
        ReconParams {
            angle: self.angle.unwrap_or(d.angle),
            step: self.step.unwrap_or(d.step),
            max_distance: self.max_distance.unwrap_or(d.max_distance),
        }
    }
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub params: TrainParamArgs,

    /// Print the command line without executing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub recon: ReconArgs,

    /// Keep running remaining steps after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Stream step output to per-step log files instead of the console
    #[arg(long)]
    pub capture_logs: bool,

    /// Print the command lines without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Directory containing TUM scene folders
    #[arg(long)]
    pub source_dir: PathBuf,

    /// Directory where converted scenes are written
    #[arg(long)]
    pub dest_dir: PathBuf,

    /// Maximum timestamp difference in seconds for frame matching
    #[arg(long, default_value_t = DEFAULT_MARGIN)]
    pub margin: f64,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// GPUs the training run will ask for
    #[arg(long, default_value_t = TrainParams::default().n_gpus)]
    pub n_gpus: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_flags_parse() {
        let cli = Cli::parse_from([
            "scenelab",
            "train",
            "--dataset",
            "kitti",
            "--lr",
            "0.001",
            "--dry-run",
        ]);
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.config.dataset, Some(DatasetKind::Kitti));
                assert_eq!(args.params.lr, Some(0.001));
                assert!(args.dry_run);
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_unset_params_use_defaults() {
        let cli = Cli::parse_from(["scenelab", "train", "--bs", "8"]);
        match cli.command {
            Command::Train(args) => {
                let params = args.params.to_params();
                assert_eq!(params.bs, 8);
                assert_eq!(params.n_rays, 1024);
                assert_eq!(params.max_epochs, 50);
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_eval_defaults() {
        let cli = Cli::parse_from(["scenelab", "eval"]);
        match cli.command {
            Command::Eval(args) => {
                assert!(!args.keep_going);
                assert!(!args.capture_logs);
                assert!(!args.dry_run);
                let recon = args.recon.to_params();
                assert_eq!(recon.angle, 30.0);
                assert_eq!(recon.step, 0.2);
                assert_eq!(recon.max_distance, 2.1);
            }
            _ => panic!("expected eval"),
        }
    }

    #[test]
    fn test_convert_margin_default() {
        let cli = Cli::parse_from([
            "scenelab", "convert", "--source-dir", "/src", "--dest-dir", "/dst",
        ]);
        match cli.command {
            Command::Convert(args) => {
                assert_eq!(args.margin, DEFAULT_MARGIN);
                assert_eq!(args.source_dir, PathBuf::from("/src"));
            }
            _ => panic!("expected convert"),
        }
    }
}
