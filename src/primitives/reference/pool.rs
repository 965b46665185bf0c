//! Reference pooling kernels.
//!
//! Window positions falling outside the input are excluded from the
//! reduction rather than treated as zero; average pooling divides by the
//! count of valid contributing cells.

use crate::error::{shape_mismatch, ForgeResult, KernelForgeError};
use crate::primitives::{CancellationToken, ConvolutionParams, Size2D};
use crate::tensor::{Element, Tensor};

/// 2D max pooling over `input: [n, c, h, w]`.
pub fn max_pool2d<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    pool_size: Size2D,
    stride: Size2D,
    padding: Size2D,
    token: &CancellationToken,
) -> ForgeResult<()> {
    pool2d(input, output, pool_size, stride, padding, token, "max_pool2d", PoolKind::Max)
}

/// 2D average pooling over `input: [n, c, h, w]`.
pub fn avg_pool2d<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    pool_size: Size2D,
    stride: Size2D,
    padding: Size2D,
    token: &CancellationToken,
) -> ForgeResult<()> {
    pool2d(input, output, pool_size, stride, padding, token, "avg_pool2d", PoolKind::Avg)
}

#[derive(Clone, Copy)]
enum PoolKind {
    Max,
    Avg,
}

#[allow(clippy::too_many_arguments)]
fn pool2d<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    pool_size: Size2D,
    stride: Size2D,
    padding: Size2D,
    token: &CancellationToken,
    name: &str,
    kind: PoolKind,
) -> ForgeResult<()> {
    super::expect_rank(input, "input", 4)?;
    super::expect_rank(output, "output", 4)?;
    if pool_size.width == 0 || pool_size.height == 0 {
        return Err(KernelForgeError::InvalidParameters(
            "pool window must be nonzero".to_string(),
        ));
    }
    if stride.width == 0 || stride.height == 0 {
        return Err(KernelForgeError::InvalidParameters(
            "pool stride must be nonzero".to_string(),
        ));
    }

    let (n, c, h, w) = (input.dim(0), input.dim(1), input.dim(2), input.dim(3));
    let oh = ConvolutionParams::output_extent(h, pool_size.height, stride.height, padding.height, 1);
    let ow = ConvolutionParams::output_extent(w, pool_size.width, stride.width, padding.width, 1);
    if output.shape() != [n, c, oh, ow] {
        return Err(shape_mismatch("output", &[n, c, oh, ow], output.shape()));
    }

    token.checkpoint(name)?;

    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();

    for bi in 0..n {
        for ch in 0..c {
            token.checkpoint(name)?;
            let in_base = (bi * c + ch) * h * w;
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc: Option<T> = None;
                    let mut valid = 0usize;
                    for py in 0..pool_size.height {
                        let iy = (oy * stride.height + py) as isize - padding.height as isize;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for px in 0..pool_size.width {
                            let ix = (ox * stride.width + px) as isize - padding.width as isize;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            let x = in_data[in_base + iy as usize * w + ix as usize];
                            valid += 1;
                            acc = Some(match (kind, acc) {
                                (_, None) => x,
                                (PoolKind::Max, Some(best)) => {
                                    if x.is_greater_than(best) {
                                        x
                                    } else {
                                        best
                                    }
                                }
                                (PoolKind::Avg, Some(sum)) => sum.add(x),
                            });
                        }
                    }
                    let result = match (kind, acc) {
                        // window entirely outside the input
                        (_, None) => T::zero(),
                        (PoolKind::Max, Some(best)) => best,
                        (PoolKind::Avg, Some(sum)) => sum.div(T::from_f32(valid as f32)),
                    };
                    out_data[((bi * c + ch) * oh + oy) * ow + ox] = result;
                }
            }
        }
    }
    Ok(())
}
