//! Accelerator and device abstraction.
//!
//! The primitives layer only needs an opaque view of a compute device:
//! its kind and name, memory statistics, a stream to order work on, and
//! typed buffer transfer. Concrete device bindings (driver FFI, command
//! queues) live outside this crate; everything here is the contract those
//! bindings implement.

use crate::error::ForgeResult;
use crate::tensor::Element;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Hardware family an accelerator belongs to.
///
/// The set is closed: the primitives factory maps each kind to a concrete
/// backend and routes everything it does not recognize to the generic
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AcceleratorKind {
    /// Host CPU (SIMD-capable or scalar)
    Cpu,
    /// NVIDIA CUDA device
    Cuda,
    /// OpenCL device
    OpenCl,
    /// Intel Advanced Matrix Extensions tile unit
    Amx,
    /// Generic neural processing unit
    Npu,
    /// Apple Neural Engine
    Ane,
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorKind::Cpu => write!(f, "CPU"),
            AcceleratorKind::Cuda => write!(f, "CUDA"),
            AcceleratorKind::OpenCl => write!(f, "OpenCL"),
            AcceleratorKind::Amx => write!(f, "AMX"),
            AcceleratorKind::Npu => write!(f, "NPU"),
            AcceleratorKind::Ane => write!(f, "ANE"),
        }
    }
}

/// Placement of a tensor's backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeLocation {
    /// Host-resident memory
    Host,
    /// Memory owned by a device of the given kind
    Device(AcceleratorKind),
}

impl Default for ComputeLocation {
    fn default() -> Self {
        ComputeLocation::Host
    }
}

/// Device memory statistics in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl MemoryInfo {
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        MemoryInfo {
            total_bytes,
            used_bytes,
        }
    }

    /// Bytes still available for allocation.
    pub fn available_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

/// Static identity of a compute device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identity for logs and profiling reports
    pub device_id: Uuid,
    pub kind: AcceleratorKind,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(kind: AcceleratorKind, name: impl Into<String>) -> Self {
        DeviceInfo {
            device_id: Uuid::new_v4(),
            kind,
            name: name.into(),
        }
    }
}

/// Ordered execution queue on a device.
#[async_trait]
pub trait AcceleratorStream: Send + Sync {
    /// Block the calling thread until all submitted work has completed.
    fn synchronize(&self) -> ForgeResult<()>;

    /// Await completion of all submitted work without blocking the runtime.
    async fn synchronize_async(&self) -> ForgeResult<()>;
}

/// Typed device-resident buffer.
///
/// Lengths are in elements; byte sizes follow from `T::DTYPE`.
pub trait DeviceBuffer<T: Element>: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `host.len()` elements from host memory into this buffer.
    fn copy_from_host(&mut self, host: &[T]) -> ForgeResult<()>;

    /// Copy this buffer's contents into host memory.
    fn copy_to_host(&self, host: &mut [T]) -> ForgeResult<()>;
}

/// A compute device with streams and typed allocation.
///
/// Implemented by external device bindings; the profiler consumes it only
/// through [`DeviceInfo`] and [`MemoryInfo`] snapshots.
pub trait Accelerator: Send + Sync {
    fn info(&self) -> &DeviceInfo;

    fn memory_info(&self) -> ForgeResult<MemoryInfo>;

    /// The device's default stream.
    fn default_stream(&self) -> &dyn AcceleratorStream;
}
