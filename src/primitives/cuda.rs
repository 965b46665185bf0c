//! CUDA backend adapter.
//!
//! Declares the capability profile of a CUDA device with tensor cores and a
//! vendor math library. The actual library bindings are stubbed in this
//! crate, so compute delegates to the reference implementation; schedulers
//! still see the accelerated profile and the numerical results match the
//! reference exactly.

use crate::primitives::delegate_primitives_to_fallback;
use crate::primitives::reference::ReferencePrimitives;
use crate::primitives::PrimitiveCapabilities;

/// CUDA adapter with a simulated vendor-library backend.
#[derive(Debug)]
pub struct CudaPrimitives {
    capabilities: PrimitiveCapabilities,
    fallback: ReferencePrimitives,
}

impl CudaPrimitives {
    pub fn new() -> Self {
        let capabilities = PrimitiveCapabilities {
            supports_accelerated_gemm: true,
            supports_accelerated_convolution: true,
            supports_accelerated_attention: true,
            supports_fp16: true,
            supports_bfloat16: true,
            supports_int8: true,
            has_tensor_cores: true,
            preferred_batch_size: 32,
            max_tensor_rank: 8,
            supports_unified_memory: false,
            estimated_peak_gflops: 19_500.0,
        };
        tracing::debug!(
            "initialized CUDA primitives (simulated vendor library): {}",
            capabilities.summary()
        );
        CudaPrimitives {
            capabilities,
            fallback: ReferencePrimitives::new(),
        }
    }
}

impl Default for CudaPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

delegate_primitives_to_fallback!(CudaPrimitives, "cuda");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CancellationToken, PerformancePrimitives};
    use crate::tensor::Tensor;

    #[tokio::test]
    async fn test_cuda_declares_acceleration() {
        let cuda = CudaPrimitives::new();
        let caps = PerformancePrimitives::<f32>::capabilities(&cuda);
        assert!(caps.supports_accelerated_gemm);
        assert!(caps.supports_accelerated_attention);
        assert!(caps.has_tensor_cores);
        assert!(!caps.supports_unified_memory);
        assert_eq!(PerformancePrimitives::<f32>::backend_name(&cuda), "cuda");
    }

    #[tokio::test]
    async fn test_cuda_stub_matches_reference_results() {
        let cuda = CudaPrimitives::new();
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0f32, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
        let mut c = Tensor::zeros(&[2, 2]);
        PerformancePrimitives::<f32>::gemm(&cuda, &a, &b, &mut c, 1.0, 0.0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }
}
