//! KernelForge - Unified Compute Primitives and Profiling
//!
//! A hardware-agnostic dispatch layer for compute primitives (GEMM,
//! convolution, attention, normalization, pooling, int8 quantization)
//! across heterogeneous accelerators, paired with a session-based
//! performance profiler that records kernel and memory-operation timelines
//! and derives optimization recommendations.
//!
//! # Dispatch
//!
//! ```rust
//! use kernelforge::accelerator::AcceleratorKind;
//! use kernelforge::primitives::{CancellationToken, PrimitivesFactory};
//! use kernelforge::tensor::Tensor;
//! # use kernelforge::primitives::PerformancePrimitives;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), kernelforge::KernelForgeError> {
//! let primitives = PrimitivesFactory::create::<f32>(AcceleratorKind::Cpu);
//! let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2])?;
//! let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], &[2, 2])?;
//! let mut c = Tensor::zeros(&[2, 2]);
//! primitives
//!     .gemm(&a, &b, &mut c, 1.0, 0.0, &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Profiling
//!
//! ```rust
//! use kernelforge::profiler::{Dim3, PerformanceProfiler};
//! use std::time::Duration;
//!
//! let profiler = PerformanceProfiler::new();
//! profiler.start_session("bench1");
//! {
//!     let mut ctx =
//!         profiler.start_kernel_profiling("gemm", Dim3::new(64, 64, 1), Dim3::new(1, 1, 1));
//!     // ... launch the kernel ...
//!     ctx.record_execution(Duration::from_millis(2), None);
//! }
//! let report = profiler.end_session().unwrap();
//! assert_eq!(report.metrics.kernels.total_kernels, 1);
//! ```

#![allow(clippy::too_many_arguments)] // Primitive signatures mirror kernel launches
#![allow(clippy::needless_range_loop)] // Clearer for explicit index arithmetic

pub mod accelerator;
pub mod error;
pub mod logging;
pub mod primitives;
pub mod profiler;
pub mod tensor;

pub use accelerator::{AcceleratorKind, ComputeLocation, DeviceInfo, MemoryInfo};
pub use error::{ErrorCategory, ForgeResult, KernelForgeError};
pub use primitives::{
    CancellationToken, PerformancePrimitives, PrimitiveCapabilities, PrimitiveType,
    PrimitivesFactory,
};
pub use profiler::{PerformanceProfiler, ProfileSessionReport};
pub use tensor::{DType, Element, Tensor};

#[cfg(test)]
mod library_tests {
    use super::*;

    #[test]
    fn test_library_imports() {
        // Basic smoke test to ensure all modules compile and re-export
        let _ = PerformanceProfiler::new();
        let _ = Tensor::<f32>::zeros(&[1]);
    }
}
