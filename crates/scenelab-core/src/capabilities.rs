//! GPU availability probing for preflight checks.
//!
//! Detection only: scenelab never talks to CUDA. The count feeds the
//! preflight warning when a run asks for more GPUs than the machine has.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a probe of the local machine found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GpuProbe {
    /// Numbered NVIDIA device nodes (`/dev/nvidia0`, `/dev/nvidia1`, ...).
    pub device_count: usize,
    /// Whether this is a Jetson board (integrated GPU, no numbered nodes).
    pub is_jetson: bool,
}

impl GpuProbe {
    /// Probe the current machine.
    pub fn detect() -> Self {
        let device_count = scan_device_nodes(Path::new("/dev"));
        let is_jetson = detect_jetson();
        debug!(device_count, is_jetson, "gpu probe");
        Self {
            device_count,
            is_jetson,
        }
    }

    /// GPUs a training run can reasonably request on this machine.
    pub fn usable_gpus(&self) -> usize {
        if self.device_count == 0 && self.is_jetson {
            1
        } else {
            self.device_count
        }
    }
}

/// Count `nvidia<N>` entries in a device directory.
fn scan_device_nodes(dev_dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.strip_prefix("nvidia")
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        })
        .count()
}

fn detect_jetson() -> bool {
    #[cfg(target_os = "linux")]
    {
        use std::fs;
        // Jetson devices have /etc/nv_tegra_release or /proc/device-tree/model
        if fs::metadata("/etc/nv_tegra_release").is_ok() {
            return true;
        }
        if let Ok(model) = fs::read_to_string("/proc/device-tree/model") {
            if model.to_lowercase().contains("jetson") {
                return true;
            }
        }
        false
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_counts_numbered_nodes_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["nvidia0", "nvidia1", "nvidiactl", "nvidia-uvm", "null"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(scan_device_nodes(dir.path()), 2);
    }

    #[test]
    fn test_scan_missing_dir_is_zero() {
        assert_eq!(scan_device_nodes(Path::new("/nonexistent-dev")), 0);
    }

    #[test]
    fn test_jetson_counts_as_one_usable_gpu() {
        let probe = GpuProbe {
            device_count: 0,
            is_jetson: true,
        };
        assert_eq!(probe.usable_gpus(), 1);

        let probe = GpuProbe {
            device_count: 2,
            is_jetson: false,
        };
        assert_eq!(probe.usable_gpus(), 2);
    }
}
