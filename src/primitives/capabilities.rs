//! Backend capability declarations.
//!
//! Each backend computes one [`PrimitiveCapabilities`] snapshot at
//! construction and exposes it read-only. Schedulers and benchmarks use it
//! for placement decisions; it never affects correctness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One dispatchable primitive family in the unified interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Gemm,
    BatchedGemm,
    Convolution2D,
    DepthwiseConvolution,
    Attention,
    Activation,
    Normalization,
    Pooling,
    Quantization,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Gemm => write!(f, "GEMM"),
            PrimitiveType::BatchedGemm => write!(f, "BatchedGEMM"),
            PrimitiveType::Convolution2D => write!(f, "Conv2D"),
            PrimitiveType::DepthwiseConvolution => write!(f, "DepthwiseConv2D"),
            PrimitiveType::Attention => write!(f, "Attention"),
            PrimitiveType::Activation => write!(f, "Activation"),
            PrimitiveType::Normalization => write!(f, "Normalization"),
            PrimitiveType::Pooling => write!(f, "Pooling"),
            PrimitiveType::Quantization => write!(f, "Quantization"),
        }
    }
}

/// Immutable acceleration profile of one backend.
///
/// Boolean flags say whether the backend executes a primitive family with
/// native/vendor acceleration (as opposed to the generic fallback).
/// `estimated_peak_gflops` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveCapabilities {
    pub supports_accelerated_gemm: bool,
    pub supports_accelerated_convolution: bool,
    pub supports_accelerated_attention: bool,
    pub supports_fp16: bool,
    pub supports_bfloat16: bool,
    pub supports_int8: bool,
    /// Dedicated matrix units (tensor cores, AMX tiles, ...)
    pub has_tensor_cores: bool,
    /// Batch size the backend schedules most efficiently
    pub preferred_batch_size: usize,
    /// Highest tensor rank the backend accepts
    pub max_tensor_rank: usize,
    pub supports_unified_memory: bool,
    /// Rough peak throughput estimate, for benchmarking reports only
    pub estimated_peak_gflops: f64,
}

impl PrimitiveCapabilities {
    /// Capability profile of the generic fallback: nothing accelerated,
    /// every format handled.
    pub fn generic_fallback() -> Self {
        PrimitiveCapabilities {
            supports_accelerated_gemm: false,
            supports_accelerated_convolution: false,
            supports_accelerated_attention: false,
            supports_fp16: true,
            supports_bfloat16: true,
            supports_int8: true,
            has_tensor_cores: false,
            preferred_batch_size: 1,
            max_tensor_rank: 8,
            supports_unified_memory: true,
            estimated_peak_gflops: 10.0,
        }
    }

    /// Whether a primitive family runs with native acceleration.
    ///
    /// Families without a dedicated flag (activations, normalization,
    /// pooling, quantization) ride on the GEMM flag: backends with a vendor
    /// math library accelerate the element-wise family as well.
    pub fn supports(&self, primitive: PrimitiveType) -> bool {
        match primitive {
            PrimitiveType::Gemm | PrimitiveType::BatchedGemm => self.supports_accelerated_gemm,
            PrimitiveType::Convolution2D | PrimitiveType::DepthwiseConvolution => {
                self.supports_accelerated_convolution
            }
            PrimitiveType::Attention => self.supports_accelerated_attention,
            PrimitiveType::Activation
            | PrimitiveType::Normalization
            | PrimitiveType::Pooling
            | PrimitiveType::Quantization => self.supports_accelerated_gemm,
        }
    }

    /// One-line description for logs and benchmark headers.
    pub fn summary(&self) -> String {
        format!(
            "gemm={} conv={} attn={} fp16={} bf16={} int8={} tensor_cores={} peak={:.0} GFLOPS",
            self.supports_accelerated_gemm,
            self.supports_accelerated_convolution,
            self.supports_accelerated_attention,
            self.supports_fp16,
            self.supports_bfloat16,
            self.supports_int8,
            self.has_tensor_cores,
            self.estimated_peak_gflops,
        )
    }
}
