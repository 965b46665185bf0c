//! Reference convolution kernels.
//!
//! Direct cross-correlation with explicit stride/padding/dilation.
//! Padding is implicit: input positions outside the tensor are skipped,
//! which is equivalent to zero-padding for a sum.

use crate::error::{shape_mismatch, ForgeResult, KernelForgeError};
use crate::primitives::{CancellationToken, ConvolutionParams};
use crate::tensor::{Element, Tensor};

/// Standard 2D convolution.
///
/// `input: [n, c_in, h, w]`, `kernel: [c_out, c_in, kh, kw]`,
/// `output: [n, c_out, oh, ow]`.
pub fn conv2d<T: Element>(
    input: &Tensor<T>,
    kernel: &Tensor<T>,
    output: &mut Tensor<T>,
    params: &ConvolutionParams,
    token: &CancellationToken,
) -> ForgeResult<()> {
    super::expect_rank(input, "input", 4)?;
    super::expect_rank(kernel, "kernel", 4)?;
    super::expect_rank(output, "output", 4)?;
    validate_conv_params(params)?;

    let (n, c_in, h, w) = (input.dim(0), input.dim(1), input.dim(2), input.dim(3));
    let (c_out, kc, kh, kw) = (kernel.dim(0), kernel.dim(1), kernel.dim(2), kernel.dim(3));
    if kc != c_in {
        return Err(shape_mismatch("kernel", &[c_out, c_in, kh, kw], kernel.shape()));
    }

    let oh = ConvolutionParams::output_extent(h, kh, params.stride.height, params.padding.height, params.dilation.height);
    let ow = ConvolutionParams::output_extent(w, kw, params.stride.width, params.padding.width, params.dilation.width);
    if output.shape() != [n, c_out, oh, ow] {
        return Err(shape_mismatch("output", &[n, c_out, oh, ow], output.shape()));
    }

    token.checkpoint("conv2d")?;

    let in_data = input.as_slice();
    let k_data = kernel.as_slice();
    let out_data = output.as_mut_slice();

    for bi in 0..n {
        for oc in 0..c_out {
            token.checkpoint("conv2d")?;
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = T::zero();
                    for ic in 0..c_in {
                        for ky in 0..kh {
                            let iy = (oy * params.stride.height + ky * params.dilation.height) as isize
                                - params.padding.height as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..kw {
                                let ix = (ox * params.stride.width + kx * params.dilation.width) as isize
                                    - params.padding.width as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                let in_idx = ((bi * c_in + ic) * h + iy as usize) * w + ix as usize;
                                let k_idx = ((oc * c_in + ic) * kh + ky) * kw + kx;
                                acc = acc.add(in_data[in_idx].mul(k_data[k_idx]));
                            }
                        }
                    }
                    out_data[((bi * c_out + oc) * oh + oy) * ow + ox] = acc;
                }
            }
        }
    }
    Ok(())
}

/// Depthwise 2D convolution: one filter per input channel.
///
/// `input: [n, c, h, w]`, `kernel: [c, kh, kw]`, `output: [n, c, oh, ow]`.
/// The kernel's channel extent must equal the input's channel extent, not
/// the full input-to-output channel product.
pub fn depthwise_conv2d<T: Element>(
    input: &Tensor<T>,
    kernel: &Tensor<T>,
    output: &mut Tensor<T>,
    params: &ConvolutionParams,
    token: &CancellationToken,
) -> ForgeResult<()> {
    super::expect_rank(input, "input", 4)?;
    super::expect_rank(kernel, "kernel", 3)?;
    super::expect_rank(output, "output", 4)?;
    validate_conv_params(params)?;

    let (n, c, h, w) = (input.dim(0), input.dim(1), input.dim(2), input.dim(3));
    let (kc, kh, kw) = (kernel.dim(0), kernel.dim(1), kernel.dim(2));
    if kc != c {
        return Err(shape_mismatch("kernel", &[c, kh, kw], kernel.shape()));
    }

    let oh = ConvolutionParams::output_extent(h, kh, params.stride.height, params.padding.height, params.dilation.height);
    let ow = ConvolutionParams::output_extent(w, kw, params.stride.width, params.padding.width, params.dilation.width);
    if output.shape() != [n, c, oh, ow] {
        return Err(shape_mismatch("output", &[n, c, oh, ow], output.shape()));
    }

    token.checkpoint("depthwise_conv2d")?;

    let in_data = input.as_slice();
    let k_data = kernel.as_slice();
    let out_data = output.as_mut_slice();

    for bi in 0..n {
        for ch in 0..c {
            token.checkpoint("depthwise_conv2d")?;
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = T::zero();
                    for ky in 0..kh {
                        let iy = (oy * params.stride.height + ky * params.dilation.height) as isize
                            - params.padding.height as isize;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for kx in 0..kw {
                            let ix = (ox * params.stride.width + kx * params.dilation.width) as isize
                                - params.padding.width as isize;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            let in_idx = ((bi * c + ch) * h + iy as usize) * w + ix as usize;
                            let k_idx = (ch * kh + ky) * kw + kx;
                            acc = acc.add(in_data[in_idx].mul(k_data[k_idx]));
                        }
                    }
                    out_data[((bi * c + ch) * oh + oy) * ow + ox] = acc;
                }
            }
        }
    }
    Ok(())
}

fn validate_conv_params(params: &ConvolutionParams) -> ForgeResult<()> {
    if params.stride.width == 0 || params.stride.height == 0 {
        return Err(KernelForgeError::InvalidParameters(
            "convolution stride must be nonzero".to_string(),
        ));
    }
    if params.dilation.width == 0 || params.dilation.height == 0 {
        return Err(KernelForgeError::InvalidParameters(
            "convolution dilation must be nonzero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Size2D;

    #[test]
    fn test_conv2d_valid_shape_law() {
        // input [1,1,5,4], kernel [1,1,3,3], stride 1, pad 0 -> [1,1,3,2]
        let input = Tensor::<f32>::filled(&[1, 1, 5, 4], 1.0);
        let kernel = Tensor::<f32>::filled(&[1, 1, 3, 3], 1.0);
        let mut output = Tensor::zeros(&[1, 1, 3, 2]);
        conv2d(
            &input,
            &kernel,
            &mut output,
            &ConvolutionParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        // every window fully covers 9 ones
        assert!(output.as_slice().iter().all(|&x| x == 9.0));
    }

    #[test]
    fn test_conv2d_padding_zero_border() {
        let input = Tensor::<f32>::filled(&[1, 1, 3, 3], 1.0);
        let kernel = Tensor::<f32>::filled(&[1, 1, 3, 3], 1.0);
        let params = ConvolutionParams::default().with_padding(Size2D::square(1));
        let mut output = Tensor::zeros(&[1, 1, 3, 3]);
        conv2d(&input, &kernel, &mut output, &params, &CancellationToken::new()).unwrap();
        // corner window sees 4 valid cells, center sees all 9
        assert_eq!(output.get(&[0, 0, 0, 0]).unwrap(), 4.0);
        assert_eq!(output.get(&[0, 0, 1, 1]).unwrap(), 9.0);
    }

    #[test]
    fn test_conv2d_wrong_output_shape() {
        let input = Tensor::<f32>::zeros(&[1, 1, 5, 5]);
        let kernel = Tensor::<f32>::zeros(&[1, 1, 3, 3]);
        let mut output = Tensor::zeros(&[1, 1, 5, 5]);
        let err = conv2d(
            &input,
            &kernel,
            &mut output,
            &ConvolutionParams::default(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'output'"));
    }

    #[test]
    fn test_conv2d_channel_mismatch() {
        let input = Tensor::<f32>::zeros(&[1, 3, 5, 5]);
        let kernel = Tensor::<f32>::zeros(&[2, 2, 3, 3]);
        let mut output = Tensor::zeros(&[1, 2, 3, 3]);
        assert!(conv2d(
            &input,
            &kernel,
            &mut output,
            &ConvolutionParams::default(),
            &CancellationToken::new(),
        )
        .is_err());
    }

    #[test]
    fn test_depthwise_one_filter_per_channel() {
        // channel 0 scaled by 1, channel 1 scaled by 2 (1x1 kernels)
        let input = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[1, 2, 2, 2]).unwrap();
        let kernel = Tensor::from_vec(vec![1.0f32, 2.0], &[2, 1, 1]).unwrap();
        let mut output = Tensor::zeros(&[1, 2, 2, 2]);
        depthwise_conv2d(
            &input,
            &kernel,
            &mut output,
            &ConvolutionParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(&output.as_slice()[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&output.as_slice()[4..], &[10.0, 12.0, 14.0, 16.0]);
    }

    #[test]
    fn test_depthwise_channel_count_must_match() {
        let input = Tensor::<f32>::zeros(&[1, 3, 4, 4]);
        let kernel = Tensor::<f32>::zeros(&[2, 3, 3]);
        let mut output = Tensor::zeros(&[1, 3, 2, 2]);
        assert!(depthwise_conv2d(
            &input,
            &kernel,
            &mut output,
            &ConvolutionParams::default(),
            &CancellationToken::new(),
        )
        .is_err());
    }

    #[test]
    fn test_zero_stride_rejected() {
        let input = Tensor::<f32>::zeros(&[1, 1, 4, 4]);
        let kernel = Tensor::<f32>::zeros(&[1, 1, 2, 2]);
        let mut output = Tensor::zeros(&[1, 1, 3, 3]);
        let params = ConvolutionParams::default().with_stride(Size2D::new(0, 1));
        let err = conv2d(&input, &kernel, &mut output, &params, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, KernelForgeError::InvalidParameters(_)));
    }
}
