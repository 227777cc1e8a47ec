// System resource monitoring port
// reason: async-trait, probing may refresh system tables
use async_trait::async_trait;
use serde::Serialize;

/// System resource metrics
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    /// Free space on the filesystem holding the library root
    pub disk_available_gb: u64,
    pub disk_total_gb: u64,
}

/// System probe port for host diagnostics
///
/// Used by the health report (`/debug`)
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Get current system metrics
    ///
    /// # Example
    /// ```text
    /// let metrics = probe.get_metrics().await;
    /// if metrics.disk_available_gb < 1 {
    ///     println!("library disk almost full");
    /// }
    /// ```
    async fn get_metrics(&self) -> SystemMetrics;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Mock SystemProbe for testing
    pub struct MockSystemProbe {
        metrics: SystemMetrics,
    }

    impl MockSystemProbe {
        pub fn new(disk_available_gb: u64) -> Self {
            Self {
                metrics: SystemMetrics {
                    cpu_usage_percent: 12.5,
                    memory_used_mb: 1024,
                    memory_total_mb: 2048,
                    disk_available_gb,
                    disk_total_gb: 500,
                },
            }
        }
    }

    #[async_trait]
    impl SystemProbe for MockSystemProbe {
        async fn get_metrics(&self) -> SystemMetrics {
            self.metrics.clone()
        }
    }
}
