//! CPU backend for the primitives interface.
//!
//! The only operation with a dedicated host path is GEMM, which runs the
//! output rows across a rayon pool. Everything else delegates to the
//! reference implementation; on a CPU the naive loops *are* the native
//! path.

use crate::error::ForgeResult;
use crate::primitives::reference::{gemm, ReferencePrimitives};
use crate::primitives::{
    AttentionParams, CancellationToken, ConvolutionParams, PerformancePrimitives,
    PrimitiveCapabilities, Size2D,
};
use crate::tensor::{Element, Tensor};
use async_trait::async_trait;
use rayon::prelude::*;

/// CPU adapter with SIMD-class capability detection.
#[derive(Debug)]
pub struct CpuPrimitives {
    capabilities: PrimitiveCapabilities,
    fallback: ReferencePrimitives,
}

impl CpuPrimitives {
    pub fn new() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let simd = detect_simd();

        let mut capabilities = PrimitiveCapabilities::generic_fallback();
        capabilities.supports_accelerated_gemm = simd;
        capabilities.preferred_batch_size = threads;
        // coarse per-core estimate; informational only
        capabilities.estimated_peak_gflops = threads as f64 * if simd { 32.0 } else { 4.0 };

        tracing::debug!(
            threads,
            simd,
            "initialized CPU primitives: {}",
            capabilities.summary()
        );

        CpuPrimitives {
            capabilities,
            fallback: ReferencePrimitives::new(),
        }
    }
}

impl Default for CpuPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the host CPU has a wide-vector unit worth declaring as
/// acceleration.
#[cfg(target_arch = "x86_64")]
fn detect_simd() -> bool {
    let cpuid = raw_cpuid::CpuId::new();
    cpuid
        .get_extended_feature_info()
        .map(|f| f.has_avx2())
        .unwrap_or(false)
}

#[cfg(target_arch = "aarch64")]
fn detect_simd() -> bool {
    // NEON is baseline on aarch64
    true
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_simd() -> bool {
    false
}

/// GEMM with output rows distributed across the rayon pool.
fn parallel_gemm<T: Element>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    c: &mut Tensor<T>,
    alpha: f32,
    beta: f32,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let (_m, k, n) = gemm::validate_gemm_shapes(a, b, c)?;
    token.checkpoint("gemm")?;
    if n == 0 {
        return Ok(());
    }

    let alpha = T::from_f32(alpha);
    let beta = T::from_f32(beta);
    let a_data = a.as_slice();
    let b_data = b.as_slice();

    c.as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .try_for_each(|(i, row)| {
            token.checkpoint("gemm")?;
            for j in 0..n {
                let mut acc = T::zero();
                for kk in 0..k {
                    acc = acc.add(a_data[i * k + kk].mul(b_data[kk * n + j]));
                }
                row[j] = alpha.mul(acc).add(beta.mul(row[j]));
            }
            Ok(())
        })
}

#[async_trait]
impl<T: Element> PerformancePrimitives<T> for CpuPrimitives {
    fn capabilities(&self) -> &PrimitiveCapabilities {
        &self.capabilities
    }

    fn backend_name(&self) -> &str {
        "cpu"
    }

    async fn gemm(
        &self,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
        alpha: f32,
        beta: f32,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        parallel_gemm(a, b, c, alpha, beta, token)
    }

    async fn batched_gemm(
        &self,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::batched_gemm(&self.fallback, a, b, c, token).await
    }

    async fn conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::conv2d(&self.fallback, input, kernel, output, params, token)
            .await
    }

    async fn depthwise_conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::depthwise_conv2d(
            &self.fallback,
            input,
            kernel,
            output,
            params,
            token,
        )
        .await
    }

    async fn multi_head_attention(
        &self,
        query: &Tensor<T>,
        key: &Tensor<T>,
        value: &Tensor<T>,
        output: &mut Tensor<T>,
        mask: Option<&[bool]>,
        params: &AttentionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::multi_head_attention(
            &self.fallback,
            query,
            key,
            value,
            output,
            mask,
            params,
            token,
        )
        .await
    }

    async fn scaled_dot_product_attention(
        &self,
        query: &Tensor<T>,
        key: &Tensor<T>,
        value: &Tensor<T>,
        output: &mut Tensor<T>,
        mask: Option<&[bool]>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::scaled_dot_product_attention(
            &self.fallback,
            query,
            key,
            value,
            output,
            mask,
            token,
        )
        .await
    }

    async fn relu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::relu(&self.fallback, input, output, token).await
    }

    async fn gelu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::gelu(&self.fallback, input, output, token).await
    }

    async fn sigmoid(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::sigmoid(&self.fallback, input, output, token).await
    }

    async fn tanh(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::tanh(&self.fallback, input, output, token).await
    }

    async fn softmax(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::softmax(&self.fallback, input, output, token).await
    }

    async fn layer_norm(
        &self,
        input: &Tensor<T>,
        gamma: &Tensor<T>,
        beta: &Tensor<T>,
        epsilon: f32,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::layer_norm(
            &self.fallback,
            input,
            gamma,
            beta,
            epsilon,
            output,
            token,
        )
        .await
    }

    async fn batch_norm(
        &self,
        input: &Tensor<T>,
        mean: &Tensor<T>,
        variance: &Tensor<T>,
        gamma: &Tensor<T>,
        beta: &Tensor<T>,
        epsilon: f32,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::batch_norm(
            &self.fallback,
            input,
            mean,
            variance,
            gamma,
            beta,
            epsilon,
            output,
            token,
        )
        .await
    }

    async fn max_pool2d(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        pool_size: Size2D,
        stride: Size2D,
        padding: Size2D,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::max_pool2d(
            &self.fallback,
            input,
            output,
            pool_size,
            stride,
            padding,
            token,
        )
        .await
    }

    async fn avg_pool2d(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        pool_size: Size2D,
        stride: Size2D,
        padding: Size2D,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::avg_pool2d(
            &self.fallback,
            input,
            output,
            pool_size,
            stride,
            padding,
            token,
        )
        .await
    }

    async fn quantize_to_int8(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<i8>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::quantize_to_int8(
            &self.fallback,
            input,
            output,
            scale,
            zero_point,
            token,
        )
        .await
    }

    async fn dequantize_from_int8(
        &self,
        input: &Tensor<i8>,
        output: &mut Tensor<T>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        PerformancePrimitives::<T>::dequantize_from_int8(
            &self.fallback,
            input,
            output,
            scale,
            zero_point,
            token,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cpu_gemm_matches_reference() {
        let cpu = CpuPrimitives::new();
        let reference = ReferencePrimitives::new();
        let token = CancellationToken::new();

        let a = Tensor::from_vec((0..20).map(|i| i as f32 * 0.5).collect(), &[4, 5]).unwrap();
        let b = Tensor::from_vec((0..15).map(|i| i as f32 * 0.25 - 1.0).collect(), &[5, 3]).unwrap();

        let mut c_cpu = Tensor::filled(&[4, 3], 1.0f32);
        let mut c_ref = Tensor::filled(&[4, 3], 1.0f32);

        PerformancePrimitives::<f32>::gemm(&cpu, &a, &b, &mut c_cpu, 2.0, 0.5, &token)
            .await
            .unwrap();
        PerformancePrimitives::<f32>::gemm(&reference, &a, &b, &mut c_ref, 2.0, 0.5, &token)
            .await
            .unwrap();

        for (x, y) in c_cpu.as_slice().iter().zip(c_ref.as_slice()) {
            assert!((x - y).abs() < 1e-4, "{} != {}", x, y);
        }
    }

    #[tokio::test]
    async fn test_cpu_capabilities_reflect_host() {
        let cpu = CpuPrimitives::new();
        let caps = PerformancePrimitives::<f32>::capabilities(&cpu);
        assert!(caps.preferred_batch_size >= 1);
        assert!(!caps.has_tensor_cores);
        assert!(caps.supports_unified_memory);
    }

    #[tokio::test]
    async fn test_cpu_gemm_cancellation() {
        let cpu = CpuPrimitives::new();
        let token = CancellationToken::new();
        token.cancel();

        let a = Tensor::<f32>::zeros(&[8, 8]);
        let b = Tensor::<f32>::zeros(&[8, 8]);
        let mut c = Tensor::zeros(&[8, 8]);
        let err = PerformancePrimitives::<f32>::gemm(&cpu, &a, &b, &mut c, 1.0, 0.0, &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
