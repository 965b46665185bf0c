//! Unified compute-primitives dispatch.
//!
//! Callers obtain a [`PerformancePrimitives`] implementation for their
//! accelerator through [`PrimitivesFactory`] and issue hardware-agnostic
//! requests; each backend decides whether to execute natively or delegate
//! to the generic reference implementation.
//!
//! All operations are asynchronous and cancellable. A single tensor must
//! not be mutated by two concurrent calls; the interface provides no
//! internal locking on tensor contents.

pub mod capabilities;
pub mod cpu;
pub mod cuda;
pub mod factory;
pub mod opencl;
pub mod params;
pub mod reference;

pub use capabilities::{PrimitiveCapabilities, PrimitiveType};
pub use cpu::CpuPrimitives;
pub use cuda::CudaPrimitives;
pub use factory::PrimitivesFactory;
pub use opencl::OpenClPrimitives;
pub use params::{AttentionParams, ConvolutionParams, Size2D};
pub use reference::ReferencePrimitives;

use crate::error::{ForgeResult, KernelForgeError};
use crate::tensor::{Element, Tensor};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal for primitive operations.
///
/// Cloning shares the underlying flag. Operations check the token before
/// starting compute and at coarse checkpoints (once per outer batch/row
/// iteration); a set token surfaces as
/// [`KernelForgeError::OperationCancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Return an error naming the operation if cancellation was requested.
    pub fn checkpoint(&self, operation: &str) -> ForgeResult<()> {
        if self.is_cancelled() {
            Err(KernelForgeError::OperationCancelled(operation.to_string()))
        } else {
            Ok(())
        }
    }
}

/// The operation contract every backend implements.
///
/// Tensors use row-major addressing throughout. Shape preconditions are
/// validated before any element is written; violations fail fast with an
/// error naming the offending tensor.
#[async_trait]
pub trait PerformancePrimitives<T: Element>: Send + Sync {
    /// Acceleration profile of this backend, computed once at construction.
    fn capabilities(&self) -> &PrimitiveCapabilities;

    /// Short backend identifier for logs and reports.
    fn backend_name(&self) -> &str;

    /// General matrix multiply: `C := alpha * A * B + beta * C`.
    ///
    /// Preconditions: `A: [m, k]`, `B: [k, n]`, `C: [m, n]`. No broadcasting.
    async fn gemm(
        &self,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
        alpha: f32,
        beta: f32,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Batched matrix multiply: `C[i] := A[i] * B[i]` per batch index.
    ///
    /// Preconditions: `A: [b, m, k]`, `B: [b, k, n]`, `C: [b, m, n]` with
    /// matching batch extents.
    async fn batched_gemm(
        &self,
        a: &Tensor<T>,
        b: &Tensor<T>,
        c: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// 2D cross-correlation over `input: [n, c_in, h, w]` with
    /// `kernel: [c_out, c_in, kh, kw]` into `output: [n, c_out, oh, ow]`.
    ///
    /// Positions outside the padded input contribute zero.
    async fn conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Depthwise 2D convolution: one filter per input channel.
    ///
    /// `kernel: [c, kh, kw]` where `c` equals the input channel extent;
    /// output channels equal input channels.
    async fn depthwise_conv2d(
        &self,
        input: &Tensor<T>,
        kernel: &Tensor<T>,
        output: &mut Tensor<T>,
        params: &ConvolutionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Multi-head attention over `[batch, seq, hidden]` query/key/value.
    ///
    /// `hidden` must be divisible by `params.num_heads`. An optional mask of
    /// `batch * seq * seq` booleans suppresses positions (true = masked).
    async fn multi_head_attention(
        &self,
        query: &Tensor<T>,
        key: &Tensor<T>,
        value: &Tensor<T>,
        output: &mut Tensor<T>,
        mask: Option<&[bool]>,
        params: &AttentionParams,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Single-head scaled dot-product attention over `[batch, seq, hidden]`.
    async fn scaled_dot_product_attention(
        &self,
        query: &Tensor<T>,
        key: &Tensor<T>,
        value: &Tensor<T>,
        output: &mut Tensor<T>,
        mask: Option<&[bool]>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Element-wise `max(x, 0)`.
    async fn relu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Element-wise GELU, tanh approximation.
    async fn gelu(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Element-wise logistic sigmoid.
    async fn sigmoid(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Element-wise hyperbolic tangent.
    async fn tanh(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Softmax over the last axis; leading axes form independent rows.
    async fn softmax(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Layer normalization over the last axis with affine scale/shift.
    ///
    /// `gamma` and `beta` are indexed along the last axis. Uses population
    /// variance (divide by count).
    async fn layer_norm(
        &self,
        input: &Tensor<T>,
        gamma: &Tensor<T>,
        beta: &Tensor<T>,
        epsilon: f32,
        output: &mut Tensor<T>,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Batch normalization per channel of a `[n, c, h, w]` tensor using
    /// externally supplied running mean/variance.
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
    ) -> ForgeResult<()>;

    /// 2D max pooling. Out-of-bounds window cells are excluded.
    async fn max_pool2d(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        pool_size: Size2D,
        stride: Size2D,
        padding: Size2D,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// 2D average pooling. The divisor is the count of valid contributing
    /// cells, not the nominal window area.
    async fn avg_pool2d(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<T>,
        pool_size: Size2D,
        stride: Size2D,
        padding: Size2D,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Affine int8 quantization: `q = round(x / scale) + zero_point`,
    /// clamped to `[-128, 127]`.
    async fn quantize_to_int8(
        &self,
        input: &Tensor<T>,
        output: &mut Tensor<i8>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()>;

    /// Affine int8 dequantization: `x = (q - zero_point) * scale`.
    async fn dequantize_from_int8(
        &self,
        input: &Tensor<i8>,
        output: &mut Tensor<T>,
        scale: f32,
        zero_point: i32,
        token: &CancellationToken,
    ) -> ForgeResult<()>;
}

/// Implements [`PerformancePrimitives`] for an adapter by forwarding every
/// operation to its `fallback` field (a [`ReferencePrimitives`]). Used by
/// the vendor-library adapters whose native bindings are stubbed; they keep
/// their own `capabilities` field and `backend_name`.
macro_rules! delegate_primitives_to_fallback {
    ($adapter:ty, $name:literal) => {
        #[async_trait::async_trait]
        impl<T: crate::tensor::Element> crate::primitives::PerformancePrimitives<T> for $adapter {
            fn capabilities(&self) -> &crate::primitives::PrimitiveCapabilities {
                &self.capabilities
            }

            fn backend_name(&self) -> &str {
                $name
            }

            async fn gemm(
                &self,
                a: &crate::tensor::Tensor<T>,
                b: &crate::tensor::Tensor<T>,
                c: &mut crate::tensor::Tensor<T>,
                alpha: f32,
                beta: f32,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::gemm(
                    &self.fallback, a, b, c, alpha, beta, token,
                )
                .await
            }

            async fn batched_gemm(
                &self,
                a: &crate::tensor::Tensor<T>,
                b: &crate::tensor::Tensor<T>,
                c: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::batched_gemm(
                    &self.fallback, a, b, c, token,
                )
                .await
            }

            async fn conv2d(
                &self,
                input: &crate::tensor::Tensor<T>,
                kernel: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                params: &crate::primitives::ConvolutionParams,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::conv2d(
                    &self.fallback, input, kernel, output, params, token,
                )
                .await
            }

            async fn depthwise_conv2d(
                &self,
                input: &crate::tensor::Tensor<T>,
                kernel: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                params: &crate::primitives::ConvolutionParams,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::depthwise_conv2d(
                    &self.fallback, input, kernel, output, params, token,
                )
                .await
            }

            async fn multi_head_attention(
                &self,
                query: &crate::tensor::Tensor<T>,
                key: &crate::tensor::Tensor<T>,
                value: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                mask: Option<&[bool]>,
                params: &crate::primitives::AttentionParams,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::multi_head_attention(
                    &self.fallback, query, key, value, output, mask, params, token,
                )
                .await
            }

            async fn scaled_dot_product_attention(
                &self,
                query: &crate::tensor::Tensor<T>,
                key: &crate::tensor::Tensor<T>,
                value: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                mask: Option<&[bool]>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::scaled_dot_product_attention(
                    &self.fallback, query, key, value, output, mask, token,
                )
                .await
            }

            async fn relu(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::relu(
                    &self.fallback, input, output, token,
                )
                .await
            }

            async fn gelu(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::gelu(
                    &self.fallback, input, output, token,
                )
                .await
            }

            async fn sigmoid(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::sigmoid(
                    &self.fallback, input, output, token,
                )
                .await
            }

            async fn tanh(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::tanh(
                    &self.fallback, input, output, token,
                )
                .await
            }

            async fn softmax(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::softmax(
                    &self.fallback, input, output, token,
                )
                .await
            }

            async fn layer_norm(
                &self,
                input: &crate::tensor::Tensor<T>,
                gamma: &crate::tensor::Tensor<T>,
                beta: &crate::tensor::Tensor<T>,
                epsilon: f32,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::layer_norm(
                    &self.fallback, input, gamma, beta, epsilon, output, token,
                )
                .await
            }

            async fn batch_norm(
                &self,
                input: &crate::tensor::Tensor<T>,
                mean: &crate::tensor::Tensor<T>,
                variance: &crate::tensor::Tensor<T>,
                gamma: &crate::tensor::Tensor<T>,
                beta: &crate::tensor::Tensor<T>,
                epsilon: f32,
                output: &mut crate::tensor::Tensor<T>,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::batch_norm(
                    &self.fallback, input, mean, variance, gamma, beta, epsilon, output, token,
                )
                .await
            }

            async fn max_pool2d(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                pool_size: crate::primitives::Size2D,
                stride: crate::primitives::Size2D,
                padding: crate::primitives::Size2D,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::max_pool2d(
                    &self.fallback, input, output, pool_size, stride, padding, token,
                )
                .await
            }

            async fn avg_pool2d(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<T>,
                pool_size: crate::primitives::Size2D,
                stride: crate::primitives::Size2D,
                padding: crate::primitives::Size2D,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::avg_pool2d(
                    &self.fallback, input, output, pool_size, stride, padding, token,
                )
                .await
            }

            async fn quantize_to_int8(
                &self,
                input: &crate::tensor::Tensor<T>,
                output: &mut crate::tensor::Tensor<i8>,
                scale: f32,
                zero_point: i32,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::quantize_to_int8(
                    &self.fallback, input, output, scale, zero_point, token,
                )
                .await
            }

            async fn dequantize_from_int8(
                &self,
                input: &crate::tensor::Tensor<i8>,
                output: &mut crate::tensor::Tensor<T>,
                scale: f32,
                zero_point: i32,
                token: &crate::primitives::CancellationToken,
            ) -> crate::error::ForgeResult<()> {
                crate::primitives::PerformancePrimitives::<T>::dequantize_from_int8(
                    &self.fallback, input, output, scale, zero_point, token,
                )
                .await
            }
        }
    };
}

pub(crate) use delegate_primitives_to_fallback;
