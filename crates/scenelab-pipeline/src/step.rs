//! Step definition and command rendering.
//!
//! A step is one external invocation: a script path relative to the pipeline
//! root plus an ordered list of `--name=value` flags. Rendering is pure; the
//! runner owns process spawning.

use std::path::{Path, PathBuf};

/// One named external invocation.
#[derive(Debug, Clone)]
pub struct Step {
    /// Short kebab-case name, used in reports and log file names.
    pub name: String,
    /// Script path relative to the pipeline root.
    pub script: PathBuf,
    /// Flags in definition order.
    pub args: Vec<(String, String)>,
}

impl Step {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            args: Vec::new(),
        }
    }

    /// Append a `--name=value` flag.
    pub fn flag(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.args.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a boolean flag in the `True`/`False` spelling argparse expects.
    pub fn flag_bool(self, name: &str, value: bool) -> Self {
        self.flag(name, if value { "True" } else { "False" })
    }

    /// The `--name=value` tokens in definition order.
    pub fn arg_tokens(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|(name, value)| format!("--{}={}", name, value))
            .collect()
    }

    /// Full argv as spawned: interpreter, resolved script path, flags.
    pub fn command_line(&self, python: &Path, pipeline_root: &Path) -> Vec<String> {
        let mut argv = vec![
            python.display().to_string(),
            pipeline_root.join(&self.script).display().to_string(),
        ];
        argv.extend(self.arg_tokens());
        argv
    }
}
