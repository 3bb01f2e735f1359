//! The two pipelines: training and evaluation/reconstruction.

use scenelab_core::{DatasetKind, ReconParams, Result, RunConfig, TrainParams};

use crate::step::Step;

/// A named, ordered list of steps.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

/// Build the single-step training pipeline.
///
/// The step carries exactly sixteen flags: `dataset`, `root`, `logdir` plus
/// the thirteen hyperparameters, all forwarded verbatim.
pub fn training(cfg: &RunConfig, params: &TrainParams) -> Pipeline {
    let script = match cfg.dataset {
        DatasetKind::Bundlefusion => "scenerf/scripts/train_bundlefusion.py",
        DatasetKind::Kitti => "scenerf/scripts/train_kitti.py",
    };
    let step = Step::new("train", script)
        .flag("dataset", cfg.dataset)
        .flag("root", cfg.root.display())
        .flag("logdir", cfg.logdir.display())
        .flag("bs", params.bs)
        .flag("n_gpus", params.n_gpus)
        .flag("n_workers_per_gpu", params.n_workers_per_gpu)
        .flag("n_rays", params.n_rays)
        .flag("lr", params.lr)
        .flag_bool("enable_log", params.enable_log)
        .flag("sample_grid_size", params.sample_grid_size)
        .flag("n_gaussians", params.n_gaussians)
        .flag("n_pts_per_gaussian", params.n_pts_per_gaussian)
        .flag("n_pts_uni", params.n_pts_uni)
        .flag("n_frames", params.n_frames)
        .flag("frame_interval", params.frame_interval)
        .flag("max_epochs", params.max_epochs);

    Pipeline {
        name: "train",
        steps: vec![step],
    }
}

/// Build the seven-step evaluation/reconstruction pipeline.
///
/// Fixed order: depth metrics are saved then aggregated, colors rendered
/// then scored, novel depths generated then fused into a TSDF volume, and
/// finally scene completion is evaluated. Steps 1, 3 and 5 load the model
/// checkpoint, so resolution fails early without one.
pub fn evaluation(cfg: &RunConfig, recon: &ReconParams) -> Result<Pipeline> {
    let model_path = cfg.require_model_path()?;
    let base = |name: &str, script: &str| {
        Step::new(name, script)
            .flag("dataset", cfg.dataset)
            .flag("root", cfg.root.display())
    };

    let steps = vec![
        base(
            "save-depth-metrics",
            "scenerf/scripts/evaluation/save_depth_metrics.py",
        )
        .flag("model_path", model_path.display())
        .flag("eval_save_dir", cfg.eval_save_dir.display()),
        base(
            "agg-depth-metrics",
            "scenerf/scripts/evaluation/agg_depth_metrics.py",
        )
        .flag("eval_save_dir", cfg.eval_save_dir.display()),
        base("render-colors", "scenerf/scripts/evaluation/render_colors.py")
            .flag("model_path", model_path.display())
            .flag("eval_save_dir", cfg.eval_save_dir.display()),
        base("eval-color", "scenerf/scripts/evaluation/eval_color.py")
            .flag("eval_save_dir", cfg.eval_save_dir.display()),
        base(
            "generate-novel-depths",
            "scenerf/scripts/reconstruction/generate_novel_depths.py",
        )
        .flag("model_path", model_path.display())
        .flag("recon_save_dir", cfg.recon_save_dir.display())
        .flag("angle", recon.angle)
        .flag("step", recon.step)
        .flag("max_distance", recon.max_distance),
        base("depth2tsdf", "scenerf/scripts/reconstruction/depth2tsdf.py")
            .flag("recon_save_dir", cfg.recon_save_dir.display())
            .flag("angle", recon.angle)
            .flag("step", recon.step)
            .flag("max_distance", recon.max_distance),
        base("eval-sc", "scenerf/scripts/evaluation/eval_sc.py")
            .flag("recon_save_dir", cfg.recon_save_dir.display()),
    ];

    Ok(Pipeline { name: "eval", steps })
}
