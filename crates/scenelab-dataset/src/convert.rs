//! TUM RGB-D to BundleFusion conversion.
//!
//! Matched frames are renumbered `frame-%06d` and written as maximum-quality
//! JPEG color, 16-bit PNG depth rescaled to BundleFusion units, and a 4x4
//! row-major pose. Each scene directory gets the BundleFusion sensor header
//! in `info.txt`, with intrinsics picked by the freiburg prefix in the scene
//! name.

use std::io::Write;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use tracing::{info, warn};

use scenelab_core::{Error, Result};

use crate::tum::{match_frames, MatchedFrame, TumPose, TumScene};

/// Maximum |Δt| in seconds for an RGB/depth/pose match.
pub const DEFAULT_MARGIN: f64 = 0.02;

const FREIBURG1_INTRINSIC: &str = "517.3 0 318.6 0 0 516.5 255.3 0 0 0 1 0 0 0 0 1";
const FREIBURG2_INTRINSIC: &str = "520.9 0 325.1 0 0 521.0 249.7 0 0 0 1 0 0 0 0 1";
const FREIBURG3_INTRINSIC: &str = "535.4 0 320.1 0 0 539.2 247.6 0 0 0 1 0 0 0 0 1";
const DEFAULT_INTRINSIC: &str = "525.0 0 319.5 0 0 525.0 239.5 0 0 0 1 0 0 0 0 1";
const IDENTITY_EXTRINSIC: &str = "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1";

/// Outcome of converting one scene.
#[derive(Debug, Clone)]
pub struct SceneReport {
    pub scene: String,
    pub frames_written: usize,
    pub skipped_no_depth: usize,
    pub skipped_no_pose: usize,
    pub warnings: Vec<String>,
}

/// Outcome of converting a whole source tree.
#[derive(Debug, Clone, Default)]
pub struct ConvertReport {
    pub scenes: Vec<SceneReport>,
    pub warnings: Vec<String>,
}

impl ConvertReport {
    pub fn total_frames(&self) -> usize {
        self.scenes.iter().map(|s| s.frames_written).sum()
    }
}

/// Convert every scene subdirectory of `source_dir` into a same-named
/// subdirectory of `dest_dir`, in sorted order. Plain files are ignored.
pub fn convert_tree(source_dir: &Path, dest_dir: &Path, margin: f64) -> Result<ConvertReport> {
    if !source_dir.is_dir() {
        return Err(Error::Dataset(format!(
            "source directory {} is not valid",
            source_dir.display()
        )));
    }
    std::fs::create_dir_all(dest_dir)?;

    let mut entries: Vec<_> = std::fs::read_dir(source_dir)?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut report = ConvertReport::default();
    for entry in entries {
        info!("Processing scene {}", entry.path().display());
        let scene_report = convert_scene(&entry.path(), &dest_dir.join(entry.file_name()), margin)?;
        report.warnings.extend(
            scene_report
                .warnings
                .iter()
                .map(|w| format!("{}: {}", scene_report.scene, w)),
        );
        report.scenes.push(scene_report);
    }
    Ok(report)
}

/// Convert a single TUM scene into `out_dir` (created if needed).
pub fn convert_scene(scene_dir: &Path, out_dir: &Path, margin: f64) -> Result<SceneReport> {
    let scene_name = scene_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| scene_dir.display().to_string());
    let mut report = SceneReport {
        scene: scene_name.clone(),
        frames_written: 0,
        skipped_no_depth: 0,
        skipped_no_pose: 0,
        warnings: Vec::new(),
    };

    std::fs::create_dir_all(out_dir)?;
    // The sensor header is written even for scenes with nothing to convert.
    write_info_txt(out_dir, &scene_name)?;

    if !TumScene::looks_like_scene(scene_dir) {
        warn!(
            "Skipping {}: missing rgb/, depth/ or groundtruth.txt",
            scene_dir.display()
        );
        report
            .warnings
            .push("missing rgb/, depth/ or groundtruth.txt".to_string());
        return Ok(report);
    }

    let scene = TumScene::load(scene_dir)?;
    let outcome = match_frames(&scene.rgb, &scene.depth, &scene.poses, margin);
    report.skipped_no_depth = outcome.skipped_no_depth;
    report.skipped_no_pose = outcome.skipped_no_pose;

    for (index, frame) in outcome.frames.iter().enumerate() {
        write_frame(out_dir, index, frame)?;
    }
    report.frames_written = outcome.frames.len();

    info!(
        "Scene {}: {} frames written, {} skipped without depth, {} without pose",
        scene_name, report.frames_written, report.skipped_no_depth, report.skipped_no_pose
    );
    Ok(report)
}

/// Write the BundleFusion sensor header for a scene.
pub fn write_info_txt(out_dir: &Path, scene_name: &str) -> Result<()> {
    let intrinsic = intrinsic_for(scene_name);
    let contents = format!(
        "m_versionNumber = 4\n\
         m_sensorName = Kinect\n\
         m_colorWidth = 640\n\
         m_colorHeight = 480\n\
         m_depthWidth = 640\n\
         m_depthHeight = 480\n\
         m_depthShift = 5000\n\
         m_calibrationColorIntrinsic = {intrinsic}\n\
         m_calibrationColorExtrinsic = {IDENTITY_EXTRINSIC}\n\
         m_calibrationDepthIntrinsic = {intrinsic}\n\
         m_calibrationDepthExtrinsic = {IDENTITY_EXTRINSIC}\n"
    );
    std::fs::write(out_dir.join("info.txt"), contents)?;
    Ok(())
}

fn intrinsic_for(scene_name: &str) -> &'static str {
    let name = scene_name.to_lowercase();
    if name.contains("freiburg1") {
        FREIBURG1_INTRINSIC
    } else if name.contains("freiburg2") {
        FREIBURG2_INTRINSIC
    } else if name.contains("freiburg3") {
        FREIBURG3_INTRINSIC
    } else {
        DEFAULT_INTRINSIC
    }
}

fn write_frame(out_dir: &Path, index: usize, frame: &MatchedFrame) -> Result<()> {
    let frame_id = format!("frame-{:06}", index);

    // Color, re-encoded as maximum-quality JPEG.
    let rgb = image::open(&frame.rgb.path)
        .map_err(|e| Error::Dataset(format!("cannot read {}: {}", frame.rgb.path.display(), e)))?
        .into_rgb8();
    let color_path = out_dir.join(format!("{}.color.jpg", frame_id));
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&color_path)?);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, 100))
        .map_err(|e| Error::Dataset(format!("cannot write {}: {}", color_path.display(), e)))?;
    writer.flush()?;

    // Depth. TUM stores 5 units per millimeter, BundleFusion wants 1.
    let mut depth = image::open(&frame.depth.path)
        .map_err(|e| Error::Dataset(format!("cannot read {}: {}", frame.depth.path.display(), e)))?
        .into_luma16();
    for pixel in depth.pixels_mut() {
        pixel.0[0] /= 5;
    }
    let depth_path = out_dir.join(format!("{}.depth.png", frame_id));
    depth
        .save(&depth_path)
        .map_err(|e| Error::Dataset(format!("cannot write {}: {}", depth_path.display(), e)))?;

    std::fs::write(
        out_dir.join(format!("{}.pose.txt", frame_id)),
        render_pose(&frame.pose),
    )?;
    Ok(())
}

/// Render a pose as four space-separated rows with six decimal places.
fn render_pose(pose: &TumPose) -> String {
    let mut out = String::new();
    for row in pose.matrix_rows() {
        let line = row
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};

    fn write_rgb(path: &Path) {
        image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))
            .save(path)
            .unwrap();
    }

    fn write_depth(path: &Path, value: u16) {
        image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_pixel(4, 4, image::Luma([value]))
            .save(path)
            .unwrap();
    }

    /// Two RGB frames: the first matches depth and pose, the second has no
    /// depth frame within the margin.
    fn build_scene(dir: &Path) {
        std::fs::create_dir_all(dir.join("rgb")).unwrap();
        std::fs::create_dir_all(dir.join("depth")).unwrap();
        write_rgb(&dir.join("rgb/100.000000.png"));
        write_rgb(&dir.join("rgb/100.050000.png"));
        write_depth(&dir.join("depth/100.002000.png"), 5000);
        write_depth(&dir.join("depth/100.500000.png"), 5000);
        std::fs::write(
            dir.join("groundtruth.txt"),
            "# trajectory\n100.001 1.0 2.0 3.0 0 0 0 1\n100.5 0 0 0 0 0 0 1\n",
        )
        .unwrap();
    }

    #[test]
    fn test_convert_tree_produces_bundlefusion_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        build_scene(&src.path().join("freiburg1_desk"));

        let report = convert_tree(src.path(), dst.path(), DEFAULT_MARGIN).unwrap();
        assert_eq!(report.scenes.len(), 1);
        assert_eq!(report.total_frames(), 1);
        let scene = &report.scenes[0];
        assert_eq!(scene.frames_written, 1);
        assert_eq!(scene.skipped_no_depth, 1);
        assert_eq!(scene.skipped_no_pose, 0);

        let out = dst.path().join("freiburg1_desk");
        let color = image::open(out.join("frame-000000.color.jpg")).unwrap();
        assert_eq!(color.width(), 4);
        assert_eq!(color.height(), 4);
        assert!(!out.join("frame-000001.color.jpg").exists());

        let depth = image::open(out.join("frame-000000.depth.png"))
            .unwrap()
            .into_luma16();
        assert_eq!(depth.get_pixel(0, 0).0[0], 1000);

        let pose = std::fs::read_to_string(out.join("frame-000000.pose.txt")).unwrap();
        let lines: Vec<&str> = pose.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "1.000000 0.000000 0.000000 1.000000");
        assert_eq!(lines[1], "0.000000 1.000000 0.000000 2.000000");
        assert_eq!(lines[3], "0.000000 0.000000 0.000000 1.000000");

        let info = std::fs::read_to_string(out.join("info.txt")).unwrap();
        assert!(info.contains(
            "m_calibrationColorIntrinsic = 517.3 0 318.6 0 0 516.5 255.3 0 0 0 1 0 0 0 0 1"
        ));
        assert!(info.contains("m_depthShift = 5000"));
        assert!(info.contains("m_sensorName = Kinect"));
    }

    #[test]
    fn test_convert_tree_rejects_missing_source() {
        let dst = tempfile::tempdir().unwrap();
        let err = convert_tree(Path::new("/nonexistent-tum"), dst.path(), DEFAULT_MARGIN);
        assert!(err.is_err());
    }

    #[test]
    fn test_plain_files_in_source_are_ignored() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        build_scene(&src.path().join("scene_a"));
        std::fs::write(src.path().join("README"), b"not a scene").unwrap();

        let report = convert_tree(src.path(), dst.path(), DEFAULT_MARGIN).unwrap();
        assert_eq!(report.scenes.len(), 1);
    }

    #[test]
    fn test_incomplete_scene_is_warned_but_still_gets_header() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("scene_a/rgb")).unwrap();

        let report = convert_tree(src.path(), dst.path(), DEFAULT_MARGIN).unwrap();
        assert_eq!(report.scenes[0].frames_written, 0);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("scene_a"));
        assert!(dst.path().join("scene_a/info.txt").exists());
        assert!(!dst.path().join("scene_a/frame-000000.color.jpg").exists());
    }

    #[test]
    fn test_intrinsic_selection_by_scene_name() {
        assert_eq!(intrinsic_for("rgbd_dataset_freiburg1_xyz"), FREIBURG1_INTRINSIC);
        assert_eq!(intrinsic_for("rgbd_dataset_freiburg2_desk"), FREIBURG2_INTRINSIC);
        assert_eq!(intrinsic_for("Freiburg3_office"), FREIBURG3_INTRINSIC);
        assert_eq!(intrinsic_for("office"), DEFAULT_INTRINSIC);
    }

    #[test]
    fn test_render_pose_is_row_major_fixed_point() {
        let pose = TumPose {
            timestamp: 0.0,
            translation: DVec3::new(0.5, -1.25, 2.0),
            rotation: DQuat::IDENTITY,
        };
        let text = render_pose(&pose);
        assert_eq!(
            text,
            "1.000000 0.000000 0.000000 0.500000\n\
             0.000000 1.000000 0.000000 -1.250000\n\
             0.000000 0.000000 1.000000 2.000000\n\
             0.000000 0.000000 0.000000 1.000000\n"
        );
    }
}
