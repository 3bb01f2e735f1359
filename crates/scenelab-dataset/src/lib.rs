//! Scenelab Dataset — TUM RGB-D to BundleFusion conversion.

pub mod convert;
pub mod tum;

pub use convert::{convert_scene, convert_tree, ConvertReport, SceneReport, DEFAULT_MARGIN};
pub use tum::{match_frames, MatchOutcome, MatchedFrame, TimedFile, TumPose, TumScene};
