//! Preflight validation — verifies a run configuration before any step launches.
//!
//! Checks cover the filesystem side (dataset root, pipeline checkout, model
//! checkpoint) and the host side (Python interpreter, GPU availability).
//! Nothing here mutates anything; `check` is safe to run anywhere.

use std::path::Path;

use scenelab_core::{GpuProbe, RunConfig};

/// Result of a preflight check.
#[derive(Debug)]
pub struct CheckReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl CheckReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a resolved configuration against the local machine.
pub fn run_check(cfg: &RunConfig, n_gpus: usize, probe: &GpuProbe) -> CheckReport {
    let mut report = CheckReport {
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    if !cfg.root.is_dir() {
        report.errors.push(format!(
            "dataset root not found: {}",
            cfg.root.display()
        ));
    }

    let scripts = cfg.pipeline_root.join("scenerf/scripts");
    if !scripts.is_dir() {
        report.errors.push(format!(
            "pipeline scripts not found under {}",
            cfg.pipeline_root.display()
        ));
    }

    match &cfg.model_path {
        Some(path) if !path.is_file() => {
            report.errors.push(format!(
                "model checkpoint not found: {}",
                path.display()
            ));
        }
        Some(_) => {}
        None => {
            report
                .warnings
                .push("no model checkpoint configured, eval will refuse to start".to_string());
        }
    }

    if !interpreter_available(&cfg.python) {
        report.errors.push(format!(
            "python interpreter not found: {}",
            cfg.python.display()
        ));
    }

    if n_gpus > probe.usable_gpus() {
        report.warnings.push(format!(
            "requested {} GPUs but only {} detected",
            n_gpus,
            probe.usable_gpus()
        ));
    }

    report
}

/// A bare command name is looked up on PATH; anything with a separator is
/// checked directly. The file must be executable, so READY means the runner
/// will actually be able to launch it.
fn interpreter_available(python: &Path) -> bool {
    if python.components().count() > 1 {
        return is_executable(python);
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(python)))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

pub fn print_report(cfg: &RunConfig, report: &CheckReport) {
    println!("=== Scenelab Preflight ===");
    println!();
    println!("Dataset:            {}", cfg.dataset);
    println!("Root:               {}", cfg.root.display());
    println!("Log dir:            {}", cfg.logdir.display());
    println!(
        "Model checkpoint:   {}",
        cfg.model_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unset)".to_string())
    );
    println!("Eval output:        {}", cfg.eval_save_dir.display());
    println!("Recon output:       {}", cfg.recon_save_dir.display());
    println!("Python:             {}", cfg.python.display());
    println!("Pipeline root:      {}", cfg.pipeline_root.display());

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }

    if !report.errors.is_empty() {
        println!();
        println!("Errors:");
        for e in &report.errors {
            println!("  - {}", e);
        }
    }

    println!();
    if report.ok() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
}
