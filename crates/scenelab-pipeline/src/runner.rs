//! Sequential pipeline execution.
//!
//! Steps run one at a time as child processes. A step that exits non-zero
//! (or cannot be spawned) fails the run; under the default halt policy the
//! remaining steps are recorded as skipped rather than executed, since each
//! step consumes what the previous one wrote.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use chrono::Utc;
use scenelab_core::{Result, RunConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipelines::Pipeline;
use crate::step::Step;
use crate::types::*;

/// Lines of stderr kept in the report when a captured step fails.
const STDERR_TAIL_LINES: usize = 20;

/// Executes a pipeline one step at a time.
pub struct Runner {
    pub policy: FailurePolicy,
    pub output: OutputMode,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Halt,
            output: OutputMode::Inherit,
        }
    }
}

struct StepOutcome {
    success: bool,
    exit_code: Option<i32>,
    stderr_tail: Option<String>,
}

impl Runner {
    pub fn new(policy: FailurePolicy, output: OutputMode) -> Self {
        Self { policy, output }
    }

    /// Run every step in order and persist the run report into the log
    /// directory. Returns `Ok` even for failed runs; `RunReport::success`
    /// carries the verdict.
    pub async fn run(&self, pipeline: &Pipeline, cfg: &RunConfig) -> Result<RunReport> {
        cfg.ensure_output_dirs()?;

        let run_id = Uuid::new_v4().to_string();
        let mut report = RunReport {
            run_id: run_id.clone(),
            pipeline: pipeline.name.to_string(),
            dataset: cfg.dataset.to_string(),
            started_at: Utc::now().to_rfc3339(),
            steps: Vec::new(),
            success: true,
        };

        info!(
            "Run {}: pipeline={} dataset={} steps={}",
            run_id,
            pipeline.name,
            report.dataset,
            pipeline.steps.len()
        );

        let mut halted = false;
        for step in &pipeline.steps {
            if halted {
                warn!("[{}] skipped after earlier failure", step.name);
                report.steps.push(StepReport {
                    name: step.name.clone(),
                    command: step.command_line(&cfg.python, &cfg.pipeline_root).join(" "),
                    status: StepStatus::Skipped,
                    exit_code: None,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            let step_report = self.run_step(step, cfg, &run_id).await;
            if step_report.status == StepStatus::Failed {
                report.success = false;
                if self.policy == FailurePolicy::Halt {
                    halted = true;
                }
            }
            report.steps.push(step_report);
        }

        let path = report.save(&cfg.logdir)?;
        if report.success {
            info!("Run {} complete, report at {}", run_id, path.display());
        } else {
            error!("Run {} failed, report at {}", run_id, path.display());
        }
        Ok(report)
    }

    async fn run_step(&self, step: &Step, cfg: &RunConfig, run_id: &str) -> StepReport {
        let argv = step.command_line(&cfg.python, &cfg.pipeline_root);
        let command = argv.join(" ");
        info!("[{}] {}", step.name, command);

        let start = Instant::now();
        let outcome = match self.output {
            OutputMode::Inherit => run_inherit(&argv).await,
            OutputMode::Capture => run_capture(step, &argv, cfg, run_id).await,
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(outcome) if outcome.success => {
                info!("[{}] completed in {}ms", step.name, duration_ms);
                StepReport {
                    name: step.name.clone(),
                    command,
                    status: StepStatus::Completed,
                    exit_code: outcome.exit_code,
                    duration_ms,
                    error: None,
                }
            }
            Ok(outcome) => {
                warn!(
                    "[{}] exited with {:?} after {}ms",
                    step.name, outcome.exit_code, duration_ms
                );
                StepReport {
                    name: step.name.clone(),
                    command,
                    status: StepStatus::Failed,
                    exit_code: outcome.exit_code,
                    duration_ms,
                    error: outcome.stderr_tail,
                }
            }
            Err(e) => {
                error!("[{}] failed to start: {}", step.name, e);
                StepReport {
                    name: step.name.clone(),
                    command,
                    status: StepStatus::Failed,
                    exit_code: None,
                    duration_ms,
                    error: Some(format!("failed to start: {}", e)),
                }
            }
        }
    }
}

async fn run_inherit(argv: &[String]) -> std::io::Result<StepOutcome> {
    let status = Command::new(&argv[0]).args(&argv[1..]).status().await?;
    Ok(StepOutcome {
        success: status.success(),
        exit_code: status.code(),
        stderr_tail: None,
    })
}

/// Run with stdout/stderr streamed to per-step log files. Both pipes are
/// drained concurrently; a full pipe buffer would otherwise stall the child.
/// Stderr is copied as raw bytes so binary output cannot fail the drain;
/// the report tail is decoded lossily.
async fn run_capture(
    step: &Step,
    argv: &[String],
    cfg: &RunConfig,
    run_id: &str,
) -> std::io::Result<StepOutcome> {
    let log_dir = cfg.logdir.join(format!("run-{}", run_id));
    tokio::fs::create_dir_all(&log_dir).await?;
    let mut stdout_file =
        tokio::fs::File::create(log_dir.join(format!("{}.stdout.log", step.name))).await?;
    let mut stderr_file =
        tokio::fs::File::create(log_dir.join(format!("{}.stderr.log", step.name))).await?;

    let mut child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr not piped"))?;

    let stdout_task = async {
        tokio::io::copy(&mut stdout, &mut stdout_file).await?;
        stdout_file.flush().await
    };

    let stderr_task = async {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut tail: VecDeque<String> = VecDeque::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            stderr_file.write_all(&buf).await?;
            let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(String::from_utf8_lossy(line).into_owned());
        }
        stderr_file.flush().await?;
        Ok::<_, std::io::Error>(tail)
    };

    let (stdout_res, stderr_res) = tokio::join!(stdout_task, stderr_task);

    // The child is reaped even if a log write failed; its exit status is
    // what the report carries.
    let status = child.wait().await?;

    let stderr_tail = match stderr_res {
        Ok(tail) if tail.is_empty() => None,
        Ok(tail) => Some(Vec::from(tail).join("\n")),
        Err(e) => Some(format!("stderr capture failed: {}", e)),
    };
    if let Err(e) = stdout_res {
        warn!("[{}] stdout capture failed: {}", step.name, e);
    }

    Ok(StepOutcome {
        success: status.success(),
        exit_code: status.code(),
        stderr_tail,
    })
}
