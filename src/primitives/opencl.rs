//! OpenCL backend adapter.
//!
//! Same stub pattern as the CUDA adapter, with the capability profile of a
//! mid-range OpenCL device: accelerated GEMM and convolution, no fused
//! attention kernels, no bfloat16.

use crate::primitives::delegate_primitives_to_fallback;
use crate::primitives::reference::ReferencePrimitives;
use crate::primitives::PrimitiveCapabilities;

/// OpenCL adapter with a simulated vendor-library backend.
#[derive(Debug)]
pub struct OpenClPrimitives {
    capabilities: PrimitiveCapabilities,
    fallback: ReferencePrimitives,
}

impl OpenClPrimitives {
    pub fn new() -> Self {
        let capabilities = PrimitiveCapabilities {
            supports_accelerated_gemm: true,
            supports_accelerated_convolution: true,
            supports_accelerated_attention: false,
            supports_fp16: true,
            supports_bfloat16: false,
            supports_int8: true,
            has_tensor_cores: false,
            preferred_batch_size: 16,
            max_tensor_rank: 8,
            supports_unified_memory: true,
            estimated_peak_gflops: 8_000.0,
        };
        tracing::debug!(
            "initialized OpenCL primitives (simulated vendor library): {}",
            capabilities.summary()
        );
        OpenClPrimitives {
            capabilities,
            fallback: ReferencePrimitives::new(),
        }
    }
}

impl Default for OpenClPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

delegate_primitives_to_fallback!(OpenClPrimitives, "opencl");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{PerformancePrimitives, PrimitiveType};

    #[test]
    fn test_opencl_capability_profile() {
        let opencl = OpenClPrimitives::new();
        let caps = PerformancePrimitives::<f32>::capabilities(&opencl);
        assert!(caps.supports_accelerated_gemm);
        assert!(!caps.supports_accelerated_attention);
        assert!(!caps.supports_bfloat16);
        assert!(caps.supports(PrimitiveType::Convolution2D));
        assert!(!caps.supports(PrimitiveType::Attention));
    }
}
