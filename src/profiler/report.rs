//! Sealed session reports and environment snapshots.

use crate::accelerator::{AcceleratorKind, MemoryInfo};
use crate::profiler::metrics::ProfileMetrics;
use crate::profiler::records::{
    CustomEventRecord, KernelExecutionRecord, MemoryOperationRecord,
};
use crate::profiler::recommendations::Recommendation;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Host environment captured at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
}

impl SystemSnapshot {
    /// Snapshot the current host.
    pub fn capture() -> Self {
        SystemSnapshot {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Accelerator identity attached to a report when the caller supplies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorSnapshot {
    pub kind: AcceleratorKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
}

/// The sealed output of one profiling session.
///
/// Immutable once constructed; owned by the profiler's completed-sessions
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSessionReport {
    pub session_id: String,
    pub session_name: String,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub duration: Duration,
    pub kernel_executions: Vec<KernelExecutionRecord>,
    pub memory_operations: Vec<MemoryOperationRecord>,
    pub custom_events: Vec<CustomEventRecord>,
    pub metrics: ProfileMetrics,
    pub system: SystemSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<AcceleratorSnapshot>,
    pub recommendations: Vec<Recommendation>,
}

impl ProfileSessionReport {
    /// Reduced projection used by the JSON export: metrics and counts
    /// without the full record graph.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            session_name: self.session_name.clone(),
            duration_ms: self.duration.as_secs_f64() * 1000.0,
            total_kernels: self.kernel_executions.len(),
            total_memory_operations: self.memory_operations.len(),
            total_custom_events: self.custom_events.len(),
            metrics: self.metrics.clone(),
            system: self.system.clone(),
            accelerator: self.accelerator.clone(),
            recommendations: self.recommendations.clone(),
        }
    }
}

/// Flat projection of a report for machine-readable export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub session_name: String,
    pub duration_ms: f64,
    pub total_kernels: usize,
    pub total_memory_operations: usize,
    pub total_custom_events: usize,
    pub metrics: ProfileMetrics,
    pub system: SystemSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<AcceleratorSnapshot>,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> ProfileSessionReport {
        ProfileSessionReport {
            session_id: "s-1".to_string(),
            session_name: "bench".to_string(),
            start_time: SystemTime::UNIX_EPOCH,
            end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
            duration: Duration::from_secs(1),
            kernel_executions: Vec::new(),
            memory_operations: Vec::new(),
            custom_events: Vec::new(),
            metrics: ProfileMetrics::default(),
            system: SystemSnapshot::capture(),
            accelerator: None,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_system_snapshot_capture() {
        let snapshot = SystemSnapshot::capture();
        assert!(!snapshot.os.is_empty());
        assert!(!snapshot.arch.is_empty());
        assert!(snapshot.cpu_count >= 1);
    }

    #[test]
    fn test_summary_projection() {
        let report = empty_report();
        let summary = report.summary();
        assert_eq!(summary.session_id, "s-1");
        assert_eq!(summary.session_name, "bench");
        assert_eq!(summary.total_kernels, 0);
        assert!((summary.duration_ms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_serializes_without_nulls() {
        let summary = empty_report().summary();
        let json = serde_json::to_string_pretty(&summary).unwrap();
        assert!(json.contains("sessionId"));
        assert!(json.contains("durationMs"));
        // accelerator is None and must be omitted
        assert!(!json.contains("accelerator"));
        assert!(!json.contains("null"));
    }
}
