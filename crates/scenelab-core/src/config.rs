//! Run configuration: dataset selection, paths, and hyperparameters.
//!
//! Every field resolves as CLI flag > environment variable > default, so a
//! run can be driven entirely from the environment (the historical way) or
//! entirely from flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dataset the pipeline runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// BundleFusion indoor scenes (`frame-%06d.*` layout).
    Bundlefusion,
    /// KITTI outdoor driving sequences.
    Kitti,
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundlefusion => write!(f, "bundlefusion"),
            Self::Kitti => write!(f, "kitti"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bundlefusion" => Ok(Self::Bundlefusion),
            "kitti" => Ok(Self::Kitti),
            other => Err(Error::Parse(format!("unknown dataset: {}", other))),
        }
    }
}

/// Shared parameters for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Dataset the run targets.
    pub dataset: DatasetKind,
    /// Root directory of the preprocessed dataset (`BF_ROOT`).
    pub root: PathBuf,
    /// Training log directory (`BF_LOG`).
    pub logdir: PathBuf,
    /// Model checkpoint consumed by evaluation steps (`MODEL_PATH`).
    /// Training does not need one; evaluation refuses to start without it.
    pub model_path: Option<PathBuf>,
    /// Where depth/color evaluation outputs go (`EVAL_SAVE_DIR`).
    pub eval_save_dir: PathBuf,
    /// Where reconstruction outputs go (`RECON_SAVE_DIR`).
    pub recon_save_dir: PathBuf,
    /// Python interpreter used to launch steps (`SCENELAB_PYTHON`).
    pub python: PathBuf,
    /// Checkout directory of the pipeline; script paths are relative to it
    /// (`SCENELAB_PIPELINE_ROOT`).
    pub pipeline_root: PathBuf,
}

/// Values taken from CLI flags; `None` means "not given, fall through".
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub dataset: Option<DatasetKind>,
    pub root: Option<PathBuf>,
    pub logdir: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub eval_save_dir: Option<PathBuf>,
    pub recon_save_dir: Option<PathBuf>,
    pub python: Option<PathBuf>,
    pub pipeline_root: Option<PathBuf>,
}

impl RunConfig {
    /// Resolve configuration from overrides and the process environment.
    pub fn resolve(overrides: &RunOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve configuration against an arbitrary environment lookup.
    pub fn resolve_with(
        overrides: &RunOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let dataset = match (overrides.dataset, env("DATASET")) {
            (Some(d), _) => d,
            (None, Some(s)) => s.parse()?,
            (None, None) => DatasetKind::Bundlefusion,
        };

        let path_field = |cli: &Option<PathBuf>, var: &str| -> Option<PathBuf> {
            cli.clone().or_else(|| env(var).map(PathBuf::from))
        };

        let root = path_field(&overrides.root, "BF_ROOT")
            .unwrap_or_else(|| Path::new("data").join(dataset.to_string()));
        let logdir =
            path_field(&overrides.logdir, "BF_LOG").unwrap_or_else(|| PathBuf::from("logs"));
        let model_path = path_field(&overrides.model_path, "MODEL_PATH");
        let eval_save_dir = path_field(&overrides.eval_save_dir, "EVAL_SAVE_DIR")
            .unwrap_or_else(|| PathBuf::from("output/eval"));
        let recon_save_dir = path_field(&overrides.recon_save_dir, "RECON_SAVE_DIR")
            .unwrap_or_else(|| PathBuf::from("output/recon"));
        let python = path_field(&overrides.python, "SCENELAB_PYTHON")
            .unwrap_or_else(|| PathBuf::from("python"));
        let pipeline_root = path_field(&overrides.pipeline_root, "SCENELAB_PIPELINE_ROOT")
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            dataset,
            root,
            logdir,
            model_path,
            eval_save_dir,
            recon_save_dir,
            python,
            pipeline_root,
        })
    }

    /// Model checkpoint, or a configuration error naming how to provide one.
    pub fn require_model_path(&self) -> Result<&Path> {
        self.model_path.as_deref().ok_or_else(|| {
            Error::Config("no model checkpoint: set MODEL_PATH or pass --model-path".to_string())
        })
    }

    /// Create the output directories (logdir, eval/recon save dirs).
    pub fn ensure_output_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.logdir)?;
        std::fs::create_dir_all(&self.eval_save_dir)?;
        std::fs::create_dir_all(&self.recon_save_dir)?;
        Ok(())
    }
}

/// Numeric knobs for the training loop.
///
/// Defaults mirror the values the launcher has always passed; every field is
/// forwarded verbatim as a `--name=value` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    /// Batch size.
    pub bs: usize,
    /// GPUs the trainer may use.
    pub n_gpus: usize,
    /// Data-loader workers per GPU.
    pub n_workers_per_gpu: usize,
    /// Rays sampled per batch.
    pub n_rays: usize,
    /// Learning rate.
    pub lr: f64,
    /// Whether the trainer writes tensorboard logs.
    pub enable_log: bool,
    /// Side length of the ray sampling grid.
    pub sample_grid_size: usize,
    /// Gaussians per ray in depth-guided sampling.
    pub n_gaussians: usize,
    /// Points drawn per gaussian.
    pub n_pts_per_gaussian: usize,
    /// Uniformly sampled points per ray.
    pub n_pts_uni: usize,
    /// Frames per sequence sample.
    pub n_frames: usize,
    /// Interval between sampled frames.
    pub frame_interval: usize,
    /// Training epochs.
    pub max_epochs: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            bs: 1,
            n_gpus: 1,
            n_workers_per_gpu: 4,
            n_rays: 1024,
            lr: 2e-5,
            enable_log: true,
            sample_grid_size: 2,
            n_gaussians: 4,
            n_pts_per_gaussian: 8,
            n_pts_uni: 32,
            n_frames: 16,
            frame_interval: 2,
            max_epochs: 50,
        }
    }
}

/// Numeric knobs for novel-depth synthesis and TSDF fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconParams {
    /// Camera sweep angle in degrees.
    pub angle: f64,
    /// Sweep step size.
    pub step: f64,
    /// Maximum ray distance in meters.
    pub max_distance: f64,
}

impl Default for ReconParams {
    fn default() -> Self {
        Self {
            angle: 30.0,
            step: 0.2,
            max_distance: 2.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_set() {
        let cfg = RunConfig::resolve_with(&RunOverrides::default(), |_| None).unwrap();
        assert_eq!(cfg.dataset, DatasetKind::Bundlefusion);
        assert_eq!(cfg.root, PathBuf::from("data/bundlefusion"));
        assert_eq!(cfg.logdir, PathBuf::from("logs"));
        assert_eq!(cfg.model_path, None);
        assert_eq!(cfg.eval_save_dir, PathBuf::from("output/eval"));
        assert_eq!(cfg.recon_save_dir, PathBuf::from("output/recon"));
        assert_eq!(cfg.python, PathBuf::from("python"));
        assert_eq!(cfg.pipeline_root, PathBuf::from("."));
    }

    #[test]
    fn test_environment_is_consulted() {
        let cfg = RunConfig::resolve_with(&RunOverrides::default(), |name| match name {
            "DATASET" => Some("kitti".to_string()),
            "BF_ROOT" => Some("/data/kitti".to_string()),
            "BF_LOG" => Some("/logs/kitti".to_string()),
            "MODEL_PATH" => Some("/ckpt/last.ckpt".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.dataset, DatasetKind::Kitti);
        assert_eq!(cfg.root, PathBuf::from("/data/kitti"));
        assert_eq!(cfg.logdir, PathBuf::from("/logs/kitti"));
        assert_eq!(cfg.model_path, Some(PathBuf::from("/ckpt/last.ckpt")));
    }

    #[test]
    fn test_cli_overrides_beat_environment() {
        let overrides = RunOverrides {
            dataset: Some(DatasetKind::Bundlefusion),
            root: Some(PathBuf::from("/override/root")),
            ..Default::default()
        };
        let cfg = RunConfig::resolve_with(&overrides, |name| match name {
            "DATASET" => Some("kitti".to_string()),
            "BF_ROOT" => Some("/env/root".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.dataset, DatasetKind::Bundlefusion);
        assert_eq!(cfg.root, PathBuf::from("/override/root"));
    }

    #[test]
    fn test_default_root_follows_dataset() {
        let cfg = RunConfig::resolve_with(&RunOverrides::default(), |name| match name {
            "DATASET" => Some("kitti".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.root, PathBuf::from("data/kitti"));
    }

    #[test]
    fn test_unknown_dataset_rejected() {
        let err = RunConfig::resolve_with(&RunOverrides::default(), |name| match name {
            "DATASET" => Some("nuscenes".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("nuscenes"));
    }

    #[test]
    fn test_require_model_path() {
        let cfg = RunConfig::resolve_with(&RunOverrides::default(), |_| None).unwrap();
        assert!(cfg.require_model_path().is_err());

        let overrides = RunOverrides {
            model_path: Some(PathBuf::from("/ckpt/last.ckpt")),
            ..Default::default()
        };
        let cfg = RunConfig::resolve_with(&overrides, |_| None).unwrap();
        assert_eq!(
            cfg.require_model_path().unwrap(),
            Path::new("/ckpt/last.ckpt")
        );
    }

    #[test]
    fn test_ensure_output_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = RunOverrides {
            logdir: Some(dir.path().join("logs")),
            eval_save_dir: Some(dir.path().join("out/eval")),
            recon_save_dir: Some(dir.path().join("out/recon")),
            ..Default::default()
        };
        let cfg = RunConfig::resolve_with(&overrides, |_| None).unwrap();
        cfg.ensure_output_dirs().unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("out/eval").is_dir());
        assert!(dir.path().join("out/recon").is_dir());
    }

    #[test]
    fn test_train_defaults() {
        let p = TrainParams::default();
        assert_eq!(p.bs, 1);
        assert_eq!(p.n_rays, 1024);
        assert_eq!(p.lr, 2e-5);
        assert!(p.enable_log);
        assert_eq!(p.n_pts_uni, 32);
        assert_eq!(p.max_epochs, 50);
    }

    #[test]
    fn test_dataset_round_trip() {
        assert_eq!(
            "bundlefusion".parse::<DatasetKind>().unwrap(),
            DatasetKind::Bundlefusion
        );
        assert_eq!("KITTI".parse::<DatasetKind>().unwrap(), DatasetKind::Kitti);
        assert_eq!(DatasetKind::Kitti.to_string(), "kitti");
    }
}
