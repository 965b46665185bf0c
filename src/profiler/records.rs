//! Immutable profiling records.
//!
//! Records are append-only facts produced when a profiling context
//! completes. End times are derived from start + measured duration, never
//! re-sampled, and derived metrics (throughput, bandwidth) are supplied by
//! the caller at completion time; the profiler only aggregates them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};

/// 3D kernel launch extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Dim3 { x, y, z }
    }

    /// Total positions in this extent.
    pub fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }
}

impl Default for Dim3 {
    fn default() -> Self {
        Dim3::new(1, 1, 1)
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// One completed kernel execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelExecutionRecord {
    pub operation_id: u64,
    pub kernel_name: String,
    pub grid_size: Dim3,
    pub group_size: Dim3,
    pub start_time: SystemTime,
    pub execution_time: Duration,
    /// Zero means the kernel came from the compilation cache.
    pub compilation_time: Duration,
    /// Caller-supplied throughput figure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_gflops: Option<f64>,
}

impl KernelExecutionRecord {
    /// Start plus measured duration.
    pub fn end_time(&self) -> SystemTime {
        self.start_time + self.execution_time
    }

    /// Grid volume times group volume.
    pub fn total_threads(&self) -> u64 {
        self.grid_size.volume() * self.group_size.volume()
    }

    /// Whether the kernel binary came from the compilation cache.
    pub fn is_cache_hit(&self) -> bool {
        self.compilation_time.is_zero()
    }
}

/// Kind of memory operation being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryOperationType {
    /// Fresh device allocation
    Allocation,
    /// Allocation served from a memory pool
    PoolAllocation,
    /// Deallocation
    Free,
    HostToDevice,
    DeviceToHost,
    DeviceToDevice,
}

impl fmt::Display for MemoryOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryOperationType::Allocation => write!(f, "Allocation"),
            MemoryOperationType::PoolAllocation => write!(f, "PoolAllocation"),
            MemoryOperationType::Free => write!(f, "Free"),
            MemoryOperationType::HostToDevice => write!(f, "HostToDevice"),
            MemoryOperationType::DeviceToHost => write!(f, "DeviceToHost"),
            MemoryOperationType::DeviceToDevice => write!(f, "DeviceToDevice"),
        }
    }
}

/// One completed memory operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryOperationRecord {
    pub operation_id: u64,
    pub operation_type: MemoryOperationType,
    pub bytes: u64,
    pub source: String,
    pub destination: String,
    pub start_time: SystemTime,
    pub duration: Duration,
    /// Caller-supplied bandwidth figure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_gbps: Option<f64>,
}

impl MemoryOperationRecord {
    pub fn end_time(&self) -> SystemTime {
        self.start_time + self.duration
    }
}

/// One custom event recorded into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventRecord {
    pub name: String,
    pub category: String,
    pub value: f64,
    pub timestamp: SystemTime,
}
