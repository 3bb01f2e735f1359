//! Console rendering for plans and reports.

use scenelab_core::RunConfig;
use scenelab_dataset::ConvertReport;
use scenelab_pipeline::{Pipeline, RunReport, StepStatus};

/// Print each step's full command line without executing anything.
pub fn print_plan(cfg: &RunConfig, pipeline: &Pipeline) {
    println!("=== Scenelab Plan ({}) ===", pipeline.name);
    println!();
    for step in &pipeline.steps {
        println!("[{}]", step.name);
        println!(
            "  {}",
            step.command_line(&cfg.python, &cfg.pipeline_root).join(" ")
        );
    }
}

pub fn print_run_report(report: &RunReport) {
    println!("=== Scenelab Run Report ===");
    println!();
    println!("Run id:             {}", report.run_id);
    println!("Pipeline:           {}", report.pipeline);
    println!("Dataset:            {}", report.dataset);
    println!("Started:            {}", report.started_at);
    println!();

    for step in &report.steps {
        let status = match step.status {
            StepStatus::Completed => "ok",
            StepStatus::Failed => "FAILED",
            StepStatus::Skipped => "skipped",
        };
        println!("{:<22} {:>8} {:>8}ms", step.name, status, step.duration_ms);
        if let Some(error) = &step.error {
            for line in error.lines() {
                println!("    {}", line);
            }
        }
    }

    println!();
    if report.success {
        println!("Status: SUCCESS");
    } else {
        println!("Status: FAILED");
    }
}

pub fn print_convert_report(report: &ConvertReport) {
    println!("=== Scenelab Convert Report ===");
    println!();
    for scene in &report.scenes {
        println!(
            "{:<28} {:>6} frames ({} no depth, {} no pose)",
            scene.scene, scene.frames_written, scene.skipped_no_depth, scene.skipped_no_pose
        );
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }

    println!();
    println!("Total frames: {}", report.total_frames());
}
