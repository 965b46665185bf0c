//! Generic reference implementation of every primitive.
//!
//! Backend-agnostic, correctness-first fallback used by any accelerator
//! that lacks native acceleration for an operation. Everything is explicit
//! loops over flattened row-major indices with the [`Element`] trait
//! supplying the arithmetic; there is no tiling, blocking, or fusion.

pub mod activation;
pub mod attention;
pub mod conv;
pub mod gemm;
pub mod norm;
pub mod pool;
pub mod quant;

use crate::error::{ForgeResult, KernelForgeError};
use crate::primitives::{
    AttentionParams, CancellationToken, ConvolutionParams, PerformancePrimitives,
    PrimitiveCapabilities, Size2D,
};
use crate::tensor::{Element, Tensor};
use async_trait::async_trait;

/// Require an exact tensor rank, naming the tensor on failure.
pub(crate) fn expect_rank<T: Element>(
    tensor: &Tensor<T>,
    name: &str,
    rank: usize,
) -> ForgeResult<()> {
    if tensor.rank() != rank {
        return Err(KernelForgeError::RankMismatch {
            tensor: name.to_string(),
            expected: rank,
            actual: tensor.rank(),
        });
    }
    Ok(())
}

/// The portable fallback backend.
///
/// Declares no accelerated primitives; its capability profile routes
/// schedulers elsewhere whenever specialized hardware is present.
#[derive(Debug)]
pub struct ReferencePrimitives {
    capabilities: PrimitiveCapabilities,
}

impl ReferencePrimitives {
    pub fn new() -> Self {
        ReferencePrimitives {
            capabilities: PrimitiveCapabilities::generic_fallback(),
        }
    }
}

impl Default for ReferencePrimitives {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Element> PerformancePrimitives<T> for ReferencePrimitives {
    fn capabilities(&self) -> &PrimitiveCapabilities {
        &self.capabilities
    }

    fn backend_name(&self) -> &str {
        "reference"
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
        gemm::gemm(a, b, c, alpha, beta, token)
    }

    async fn batched_gemm(
        &self,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        gemm::batched_gemm(a, b, c, token)
    }

    async fn conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        conv::conv2d(input, kernel, output, params, token)
    }

    async fn depthwise_conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        conv::depthwise_conv2d(input, kernel, output, params, token)
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
        attention::multi_head_attention(query, key, value, output, mask, params, token)
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
        attention::scaled_dot_product_attention(query, key, value, output, mask, token)
    }

    async fn relu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        activation::relu(input, output, token)
    }

    async fn gelu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        activation::gelu(input, output, token)
    }

    async fn sigmoid(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        activation::sigmoid(input, output, token)
    }

    async fn tanh(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        activation::tanh(input, output, token)
    }

    async fn softmax(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        activation::softmax(input, output, token)
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
        norm::layer_norm(input, gamma, beta, epsilon, output, token)
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
        norm::batch_norm(input, mean, variance, gamma, beta, epsilon, output, token)
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
        pool::max_pool2d(input, output, pool_size, stride, padding, token)
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
        pool::avg_pool2d(input, output, pool_size, stride, padding, token)
    }

    async fn quantize_to_int8(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<i8>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        quant::quantize_to_int8(input, output, scale, zero_point, token)
    }

    async fn dequantize_from_int8(
        &self,
        input: &Tensor<i8>,
        output: &mut Tensor<T>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()> {
        quant::dequantize_from_int8(input, output, scale, zero_point, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_backend_identity() {
        let backend = ReferencePrimitives::new();
        let caps: &PrimitiveCapabilities =
            PerformancePrimitives::<f32>::capabilities(&backend);
        assert!(!caps.supports_accelerated_gemm);
        assert_eq!(
            PerformancePrimitives::<f32>::backend_name(&backend),
            "reference"
        );
    }

    #[tokio::test]
    async fn test_reference_dispatch_through_trait() {
        let backend: Box<dyn PerformancePrimitives<f32>> = Box::new(ReferencePrimitives::new());
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0f32, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
        let mut c = Tensor::zeros(&[2, 2]);
        backend
            .gemm(&a, &b, &mut c, 1.0, 0.0, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }
}
