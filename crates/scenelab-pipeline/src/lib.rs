//! Scenelab Pipeline — step rendering and sequential execution.

pub mod pipelines;
pub mod runner;
pub mod step;
pub mod types;

pub use pipelines::{evaluation, training, Pipeline};
pub use runner::Runner;
pub use step::Step;
pub use types::{FailurePolicy, OutputMode, RunReport, StepReport, StepStatus};
