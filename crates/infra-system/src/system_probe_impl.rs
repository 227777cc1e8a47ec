// System probe implementation
// reason: sysinfo for cross-platform system monitoring
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sysinfo::{Disk, Disks, System};
use tracing::debug;

use folderbot_core::port::system_probe::{SystemMetrics, SystemProbe};

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// System probe implementation using sysinfo
///
/// Disk figures are taken from the filesystem that holds `watched_path`.
pub struct SystemProbeImpl {
    system: Arc<Mutex<System>>,
    watched_path: PathBuf,
}

impl SystemProbeImpl {
    /// Create a new system probe
    ///
    /// # Example
    /// ```ignore
    /// let probe = SystemProbeImpl::new("/srv/library");
    /// ```
    pub fn new(watched_path: impl Into<PathBuf>) -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            watched_path: watched_path.into(),
        }
    }
}

/// Disk with the longest mount point that is a prefix of `path`
fn disk_for<'a>(disks: &'a [Disk], path: &Path) -> Option<&'a Disk> {
    disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
}

#[async_trait]
impl SystemProbe for SystemProbeImpl {
    async fn get_metrics(&self) -> SystemMetrics {
        let (cpu_usage_percent, memory_used_mb, memory_total_mb) = {
            let mut sys = self
                .system
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            sys.refresh_cpu();
            sys.refresh_memory();
            (
                sys.global_cpu_info().cpu_usage(),
                sys.used_memory() / BYTES_PER_MB,
                sys.total_memory() / BYTES_PER_MB,
            )
        };

        let disks = Disks::new_with_refreshed_list();
        let (disk_available_gb, disk_total_gb) = disk_for(&disks, &self.watched_path)
            .or_else(|| disks.first())
            .map(|d| (d.available_space() / BYTES_PER_GB, d.total_space() / BYTES_PER_GB))
            .unwrap_or((0, 0));

        debug!(
            cpu = %cpu_usage_percent,
            mem_used_mb = %memory_used_mb,
            mem_total_mb = %memory_total_mb,
            disk_available_gb = %disk_available_gb,
            "System metrics collected"
        );

        SystemMetrics {
            cpu_usage_percent,
            memory_used_mb,
            memory_total_mb,
            disk_available_gb,
            disk_total_gb,
        }
    }
}
