//! TUM RGB-D scene model: timestamped files, poses, and frame matching.
//!
//! A TUM scene directory holds `rgb/` and `depth/` image folders whose file
//! stems are capture timestamps, plus a `groundtruth.txt` trajectory of
//! `timestamp tx ty tz qx qy qz qw` lines.

use std::path::{Path, PathBuf};

use glam::{DMat3, DQuat, DVec3};

use scenelab_core::{Error, Result};

/// A file whose stem is its capture timestamp in seconds.
#[derive(Debug, Clone)]
pub struct TimedFile {
    pub timestamp: f64,
    pub path: PathBuf,
}

/// One `groundtruth.txt` entry.
#[derive(Debug, Clone, Copy)]
pub struct TumPose {
    pub timestamp: f64,
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl TumPose {
    /// Camera-to-world transform as rows of a 4x4 matrix.
    pub fn matrix_rows(&self) -> [[f64; 4]; 4] {
        let cols = DMat3::from_quat(self.rotation.normalize()).to_cols_array_2d();
        let t = [self.translation.x, self.translation.y, self.translation.z];
        let mut rows = [[0.0; 4]; 4];
        for r in 0..3 {
            for c in 0..3 {
                rows[r][c] = cols[c][r];
            }
            rows[r][3] = t[r];
        }
        rows[3][3] = 1.0;
        rows
    }
}

/// A loaded TUM scene.
#[derive(Debug, Clone)]
pub struct TumScene {
    pub rgb: Vec<TimedFile>,
    pub depth: Vec<TimedFile>,
    pub poses: Vec<TumPose>,
}

impl TumScene {
    /// Whether `dir` has the three pieces a scene needs.
    pub fn looks_like_scene(dir: &Path) -> bool {
        dir.join("rgb").is_dir()
            && dir.join("depth").is_dir()
            && dir.join("groundtruth.txt").is_file()
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let rgb = timestamped_files(&dir.join("rgb"), &["png", "jpg"])?;
        let depth = timestamped_files(&dir.join("depth"), &["png"])?;
        let poses = parse_groundtruth(&dir.join("groundtruth.txt"))?;
        Ok(Self { rgb, depth, poses })
    }
}

/// List files in `dir` with one of the given extensions (case-insensitive),
/// sorted by name, with the stem parsed as a timestamp.
fn timestamped_files(dir: &Path, extensions: &[&str]) -> Result<Vec<TimedFile>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            let lower = name.to_lowercase();
            extensions.iter().any(|ext| lower.ends_with(&format!(".{}", ext)))
        })
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(&name);
            let timestamp = stem
                .parse::<f64>()
                .map_err(|_| Error::Dataset(format!("bad timestamp in file name: {}", name)))?;
            Ok(TimedFile {
                timestamp,
                path: dir.join(&name),
            })
        })
        .collect()
}

/// Parse a TUM trajectory file, ignoring blank lines and `#` comments.
fn parse_groundtruth(path: &Path) -> Result<Vec<TumPose>> {
    let contents = std::fs::read_to_string(path)?;
    let mut poses = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<f64> = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::Dataset(format!("malformed pose line: {}", line)))?;
        if fields.len() != 8 {
            return Err(Error::Dataset(format!("malformed pose line: {}", line)));
        }
        poses.push(TumPose {
            timestamp: fields[0],
            translation: DVec3::new(fields[1], fields[2], fields[3]),
            rotation: DQuat::from_xyzw(fields[4], fields[5], fields[6], fields[7]),
        });
    }
    Ok(poses)
}

/// One RGB frame paired with its depth frame and pose.
#[derive(Debug, Clone)]
pub struct MatchedFrame {
    pub rgb: TimedFile,
    pub depth: TimedFile,
    pub pose: TumPose,
}

/// What frame matching produced.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub frames: Vec<MatchedFrame>,
    /// RGB frames whose nearest depth frame was outside the margin.
    pub skipped_no_depth: usize,
    /// RGB frames whose nearest pose was outside the margin.
    pub skipped_no_pose: usize,
}

/// Pair RGB frames with their nearest depth frame and pose.
///
/// Matched depth/pose entries leave their pools, so no two RGB frames share
/// one. An RGB frame whose nearest candidate is more than `margin` seconds
/// away is skipped; matching stops once either pool runs dry.
pub fn match_frames(
    rgb: &[TimedFile],
    depth: &[TimedFile],
    poses: &[TumPose],
    margin: f64,
) -> MatchOutcome {
    let mut depth_pool = depth.to_vec();
    let mut pose_pool = poses.to_vec();
    let mut outcome = MatchOutcome {
        frames: Vec::new(),
        skipped_no_depth: 0,
        skipped_no_pose: 0,
    };

    for frame in rgb {
        if depth_pool.is_empty() {
            break;
        }
        let di = closest_index(depth_pool.iter().map(|d| d.timestamp), frame.timestamp);
        if (frame.timestamp - depth_pool[di].timestamp).abs() > margin {
            outcome.skipped_no_depth += 1;
            continue;
        }

        if pose_pool.is_empty() {
            break;
        }
        let pi = closest_index(pose_pool.iter().map(|p| p.timestamp), frame.timestamp);
        if (frame.timestamp - pose_pool[pi].timestamp).abs() > margin {
            outcome.skipped_no_pose += 1;
            continue;
        }

        outcome.frames.push(MatchedFrame {
            rgb: frame.clone(),
            depth: depth_pool.remove(di),
            pose: pose_pool.remove(pi),
        });
    }
    outcome
}

/// Index of the timestamp closest to `target`; earliest wins ties.
fn closest_index(timestamps: impl Iterator<Item = f64>, target: f64) -> usize {
    let mut best = 0;
    let mut best_delta = f64::INFINITY;
    for (i, ts) in timestamps.enumerate() {
        let delta = (target - ts).abs();
        if delta < best_delta {
            best = i;
            best_delta = delta;
        }
    }
    best
}
