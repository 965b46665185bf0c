//! Backend selection for the primitives interface.
//!
//! The accelerator-kind to backend mapping is a closed, compile-time set.
//! Kinds without a dedicated adapter (AMX, NPU, ANE, and anything added to
//! the enum later) route to the generic fallback rather than failing.

use crate::accelerator::AcceleratorKind;
use crate::primitives::{
    CpuPrimitives, CudaPrimitives, OpenClPrimitives, PerformancePrimitives, ReferencePrimitives,
};
use crate::tensor::Element;

/// Factory selecting a concrete [`PerformancePrimitives`] backend.
pub struct PrimitivesFactory;

impl PrimitivesFactory {
    /// Create the backend for an accelerator kind.
    ///
    /// Unrecognized kinds get the generic reference implementation, whose
    /// capability descriptor declares no acceleration.
    pub fn create<T: Element>(kind: AcceleratorKind) -> Box<dyn PerformancePrimitives<T>> {
        match kind {
            AcceleratorKind::Cpu => Box::new(CpuPrimitives::new()),
            AcceleratorKind::Cuda => Box::new(CudaPrimitives::new()),
            AcceleratorKind::OpenCl => Box::new(OpenClPrimitives::new()),
            other => {
                tracing::debug!(kind = %other, "no dedicated backend, using generic fallback");
                Box::new(ReferencePrimitives::new())
            }
        }
    }

    /// Whether an accelerator kind has a dedicated backend at all.
    ///
    /// Pure predicate for planning and benchmarking; independent of
    /// instantiation and of what the backend's capability flags say about
    /// individual primitives.
    pub fn has_accelerated_primitives(kind: AcceleratorKind) -> bool {
        matches!(
            kind,
            AcceleratorKind::Cpu | AcceleratorKind::Cuda | AcceleratorKind::OpenCl
        )
    }
}
