//! Parameter value structs for primitive operations.
//!
//! Pure data, copied by value. Builders follow the crate-wide `with_*`
//! convention.

use serde::{Deserialize, Serialize};

/// A 2D extent or offset (width = last axis, height = second-to-last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: usize,
    pub height: usize,
}

impl Size2D {
    pub const fn new(width: usize, height: usize) -> Self {
        Size2D { width, height }
    }

    /// Same extent on both axes.
    pub const fn square(extent: usize) -> Self {
        Size2D {
            width: extent,
            height: extent,
        }
    }
}

/// Stride, padding, and dilation configuration for 2D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvolutionParams {
    pub stride: Size2D,
    pub padding: Size2D,
    pub dilation: Size2D,
}

impl Default for ConvolutionParams {
    fn default() -> Self {
        ConvolutionParams {
            stride: Size2D::square(1),
            padding: Size2D::square(0),
            dilation: Size2D::square(1),
        }
    }
}

impl ConvolutionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stride(mut self, stride: Size2D) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: Size2D) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_dilation(mut self, dilation: Size2D) -> Self {
        self.dilation = dilation;
        self
    }

    /// Output extent along one spatial axis.
    ///
    /// `(input + 2*padding - dilation*(kernel-1) - 1) / stride + 1`, which
    /// reduces to `floor((input + 2*padding - kernel) / stride) + 1` for
    /// dilation 1. Returns 0 when the (dilated) kernel does not fit.
    pub fn output_extent(input: usize, kernel: usize, stride: usize, padding: usize, dilation: usize) -> usize {
        let effective_kernel = dilation * kernel.saturating_sub(1) + 1;
        let padded = input + 2 * padding;
        if padded < effective_kernel || stride == 0 {
            return 0;
        }
        (padded - effective_kernel) / stride + 1
    }
}

/// Head configuration for multi-head attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionParams {
    /// Number of attention heads the hidden dimension is split into.
    pub num_heads: usize,
}

impl Default for AttentionParams {
    fn default() -> Self {
        AttentionParams { num_heads: 1 }
    }
}

impl AttentionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_heads(mut self, num_heads: usize) -> Self {
        self.num_heads = num_heads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size2d_square() {
        let s = Size2D::square(3);
        assert_eq!(s.width, 3);
        assert_eq!(s.height, 3);
    }

    #[test]
    fn test_conv_params_defaults() {
        let p = ConvolutionParams::default();
        assert_eq!(p.stride, Size2D::square(1));
        assert_eq!(p.padding, Size2D::square(0));
        assert_eq!(p.dilation, Size2D::square(1));
    }

    #[test]
    fn test_output_extent_matches_documented_formula() {
        // floor((in + 2p - k)/s) + 1 at dilation 1
        assert_eq!(ConvolutionParams::output_extent(8, 3, 1, 0, 1), 6);
        assert_eq!(ConvolutionParams::output_extent(8, 3, 2, 1, 1), 4);
        assert_eq!(ConvolutionParams::output_extent(5, 5, 1, 0, 1), 1);
    }

    #[test]
    fn test_output_extent_dilation() {
        // dilation 2 makes a 3-wide kernel span 5 inputs
        assert_eq!(ConvolutionParams::output_extent(8, 3, 1, 0, 2), 4);
    }

    #[test]
    fn test_output_extent_kernel_too_large() {
        assert_eq!(ConvolutionParams::output_extent(2, 5, 1, 0, 1), 0);
    }

    #[test]
    fn test_attention_params_builder() {
        let p = AttentionParams::new().with_num_heads(8);
        assert_eq!(p.num_heads, 8);
        assert_eq!(AttentionParams::default().num_heads, 1);
    }
}
