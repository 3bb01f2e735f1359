//! Scenelab Core — run configuration, hyperparameters, hardware probing.

pub mod capabilities;
pub mod config;
pub mod error;

pub use capabilities::GpuProbe;
pub use config::{DatasetKind, ReconParams, RunConfig, RunOverrides, TrainParams};
pub use error::{Error, Result};
