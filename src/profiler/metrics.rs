//! Metric aggregation over completed profiling records.
//!
//! Pure reducer functions: order-independent, and every reducer returns a
//! zero-valued metrics object for empty input so report generation never
//! divides by zero.

use crate::profiler::records::{
    CustomEventRecord, KernelExecutionRecord, MemoryOperationRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-kernel-name aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelAggregate {
    pub count: usize,
    pub total_time: Duration,
    pub average_time: Duration,
}

/// Aggregates over all kernel executions in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelMetrics {
    pub total_kernels: usize,
    pub total_execution_time: Duration,
    pub average_execution_time: Duration,
    pub fastest_execution: Duration,
    pub slowest_execution: Duration,
    pub total_compilation_time: Duration,
    /// Fraction of launches whose binary came from the compilation cache.
    pub cache_hit_ratio: f64,
    pub per_kernel: BTreeMap<String, KernelAggregate>,
}

/// Per-operation-type aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryAggregate {
    pub count: usize,
    pub total_bytes: u64,
}

/// Aggregates over all memory operations in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub total_operations: usize,
    pub total_bytes: u64,
    pub total_time: Duration,
    /// Mean of the caller-supplied bandwidth figures (0 when none supplied).
    pub average_bandwidth_gbps: f64,
    /// Pooled allocations over all allocations (0 when no allocations).
    pub pool_hit_ratio: f64,
    pub per_type: BTreeMap<String, MemoryAggregate>,
}

/// Device-level utilization derived from kernel records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorMetrics {
    /// Sum of kernel execution durations.
    pub busy_time: Duration,
    /// Busy time over session wall time, capped at 100.
    pub utilization_percent: f64,
}

/// Per-event-name aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventAggregate {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Aggregates over all custom events in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventMetrics {
    pub total_events: usize,
    pub per_name: BTreeMap<String, CustomEventAggregate>,
}

/// The full metrics block of a session report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetrics {
    pub kernels: KernelMetrics,
    pub memory: MemoryMetrics,
    pub accelerator: AcceleratorMetrics,
    pub custom_events: CustomEventMetrics,
}

/// Reduce kernel execution records into [`KernelMetrics`].
pub fn calculate_kernel_metrics(records: &[KernelExecutionRecord]) -> KernelMetrics {
    if records.is_empty() {
        return KernelMetrics::default();
    }

    let mut metrics = KernelMetrics {
        total_kernels: records.len(),
        fastest_execution: Duration::MAX,
        ..Default::default()
    };
    let mut cache_hits = 0usize;

    for record in records {
        metrics.total_execution_time += record.execution_time;
        metrics.total_compilation_time += record.compilation_time;
        if record.execution_time < metrics.fastest_execution {
            metrics.fastest_execution = record.execution_time;
        }
        if record.execution_time > metrics.slowest_execution {
            metrics.slowest_execution = record.execution_time;
        }
        if record.is_cache_hit() {
            cache_hits += 1;
        }

        let entry = metrics
            .per_kernel
            .entry(record.kernel_name.clone())
            .or_default();
        entry.count += 1;
        entry.total_time += record.execution_time;
    }

    for entry in metrics.per_kernel.values_mut() {
        entry.average_time = entry.total_time / entry.count as u32;
    }
    metrics.average_execution_time = metrics.total_execution_time / records.len() as u32;
    metrics.cache_hit_ratio = cache_hits as f64 / records.len() as f64;
    metrics
}

/// Reduce memory operation records into [`MemoryMetrics`].
pub fn calculate_memory_metrics(records: &[MemoryOperationRecord]) -> MemoryMetrics {
    use crate::profiler::records::MemoryOperationType;

    if records.is_empty() {
        return MemoryMetrics::default();
    }

    let mut metrics = MemoryMetrics {
        total_operations: records.len(),
        ..Default::default()
    };
    let mut bandwidth_sum = 0.0f64;
    let mut bandwidth_count = 0usize;
    let mut fresh_allocations = 0usize;
    let mut pooled_allocations = 0usize;

    for record in records {
        metrics.total_bytes += record.bytes;
        metrics.total_time += record.duration;
        if let Some(bandwidth) = record.bandwidth_gbps {
            bandwidth_sum += bandwidth;
            bandwidth_count += 1;
        }
        match record.operation_type {
            MemoryOperationType::Allocation => fresh_allocations += 1,
            MemoryOperationType::PoolAllocation => pooled_allocations += 1,
            _ => {}
        }

        let entry = metrics
            .per_type
            .entry(record.operation_type.to_string())
            .or_default();
        entry.count += 1;
        entry.total_bytes += record.bytes;
    }

    if bandwidth_count > 0 {
        metrics.average_bandwidth_gbps = bandwidth_sum / bandwidth_count as f64;
    }
    let allocations = fresh_allocations + pooled_allocations;
    if allocations > 0 {
        metrics.pool_hit_ratio = pooled_allocations as f64 / allocations as f64;
    }
    metrics
}

/// Reduce kernel records plus session wall time into [`AcceleratorMetrics`].
pub fn calculate_accelerator_metrics(
    records: &[KernelExecutionRecord],
    session_duration: Duration,
) -> AcceleratorMetrics {
    let busy_time: Duration = records.iter().map(|r| r.execution_time).sum();
    let utilization_percent = if session_duration.is_zero() {
        0.0
    } else {
        (busy_time.as_secs_f64() / session_duration.as_secs_f64() * 100.0).min(100.0)
    };
    AcceleratorMetrics {
        busy_time,
        utilization_percent,
    }
}

/// Reduce custom event records into [`CustomEventMetrics`].
pub fn calculate_custom_event_metrics(records: &[CustomEventRecord]) -> CustomEventMetrics {
    if records.is_empty() {
        return CustomEventMetrics::default();
    }

    let mut metrics = CustomEventMetrics {
        total_events: records.len(),
        ..Default::default()
    };

    for record in records {
        let entry = metrics.per_name.entry(record.name.clone()).or_insert(
            CustomEventAggregate {
                count: 0,
                sum: 0.0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
                average: 0.0,
            },
        );
        entry.count += 1;
        entry.sum += record.value;
        entry.min = entry.min.min(record.value);
        entry.max = entry.max.max(record.value);
    }

    for entry in metrics.per_name.values_mut() {
        entry.average = entry.sum / entry.count as f64;
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::records::{Dim3, MemoryOperationType};
    use std::time::SystemTime;

    fn kernel(name: &str, exec_ms: u64, compile_ms: u64) -> KernelExecutionRecord {
        KernelExecutionRecord {
            operation_id: 0,
            kernel_name: name.to_string(),
            grid_size: Dim3::default(),
            group_size: Dim3::default(),
            start_time: SystemTime::UNIX_EPOCH,
            execution_time: Duration::from_millis(exec_ms),
            compilation_time: Duration::from_millis(compile_ms),
            throughput_gflops: None,
        }
    }

    fn memory(op: MemoryOperationType, bytes: u64, bandwidth: Option<f64>) -> MemoryOperationRecord {
        MemoryOperationRecord {
            operation_id: 0,
            operation_type: op,
            bytes,
            source: "host".to_string(),
            destination: "device".to_string(),
            start_time: SystemTime::UNIX_EPOCH,
            duration: Duration::from_micros(50),
            bandwidth_gbps: bandwidth,
        }
    }

    #[test]
    fn test_kernel_metrics_empty_is_zero() {
        let metrics = calculate_kernel_metrics(&[]);
        assert_eq!(metrics.total_kernels, 0);
        assert_eq!(metrics.total_execution_time, Duration::ZERO);
        assert_eq!(metrics.cache_hit_ratio, 0.0);
    }

    #[test]
    fn test_kernel_metrics_aggregation() {
        let records = vec![
            kernel("gemm", 2, 0),
            kernel("gemm", 4, 10),
            kernel("softmax", 6, 0),
        ];
        let metrics = calculate_kernel_metrics(&records);
        assert_eq!(metrics.total_kernels, 3);
        assert_eq!(metrics.total_execution_time, Duration::from_millis(12));
        assert_eq!(metrics.average_execution_time, Duration::from_millis(4));
        assert_eq!(metrics.fastest_execution, Duration::from_millis(2));
        assert_eq!(metrics.slowest_execution, Duration::from_millis(6));
        assert_eq!(metrics.total_compilation_time, Duration::from_millis(10));
        assert!((metrics.cache_hit_ratio - 2.0 / 3.0).abs() < 1e-9);

        let gemm = &metrics.per_kernel["gemm"];
        assert_eq!(gemm.count, 2);
        assert_eq!(gemm.total_time, Duration::from_millis(6));
        assert_eq!(gemm.average_time, Duration::from_millis(3));
    }

    #[test]
    fn test_memory_metrics_pool_hit_ratio() {
        let records = vec![
            memory(MemoryOperationType::Allocation, 1024, None),
            memory(MemoryOperationType::PoolAllocation, 2048, None),
            memory(MemoryOperationType::PoolAllocation, 512, None),
            memory(MemoryOperationType::HostToDevice, 4096, Some(10.0)),
        ];
        let metrics = calculate_memory_metrics(&records);
        assert_eq!(metrics.total_operations, 4);
        assert_eq!(metrics.total_bytes, 1024 + 2048 + 512 + 4096);
        assert!((metrics.pool_hit_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.average_bandwidth_gbps - 10.0).abs() < 1e-9);
        assert_eq!(metrics.per_type["PoolAllocation"].count, 2);
    }

    #[test]
    fn test_memory_metrics_empty_is_zero() {
        let metrics = calculate_memory_metrics(&[]);
        assert_eq!(metrics.total_operations, 0);
        assert_eq!(metrics.pool_hit_ratio, 0.0);
        assert_eq!(metrics.average_bandwidth_gbps, 0.0);
    }

    #[test]
    fn test_accelerator_metrics_utilization() {
        let records = vec![kernel("a", 30, 0), kernel("b", 20, 0)];
        let metrics = calculate_accelerator_metrics(&records, Duration::from_millis(100));
        assert_eq!(metrics.busy_time, Duration::from_millis(50));
        assert!((metrics.utilization_percent - 50.0).abs() < 1e-9);

        // capped at 100
        let metrics = calculate_accelerator_metrics(&records, Duration::from_millis(10));
        assert_eq!(metrics.utilization_percent, 100.0);

        // zero session duration does not divide by zero
        let metrics = calculate_accelerator_metrics(&records, Duration::ZERO);
        assert_eq!(metrics.utilization_percent, 0.0);
    }

    #[test]
    fn test_custom_event_metrics() {
        let records = vec![
            CustomEventRecord {
                name: "tokens".to_string(),
                category: "throughput".to_string(),
                value: 10.0,
                timestamp: SystemTime::UNIX_EPOCH,
            },
            CustomEventRecord {
                name: "tokens".to_string(),
                category: "throughput".to_string(),
                value: 30.0,
                timestamp: SystemTime::UNIX_EPOCH,
            },
        ];
        let metrics = calculate_custom_event_metrics(&records);
        assert_eq!(metrics.total_events, 2);
        let tokens = &metrics.per_name["tokens"];
        assert_eq!(tokens.count, 2);
        assert_eq!(tokens.min, 10.0);
        assert_eq!(tokens.max, 30.0);
        assert_eq!(tokens.average, 20.0);
    }
}
