//! Reference normalization kernels.

use crate::error::{shape_mismatch, ForgeResult};
use crate::primitives::CancellationToken;
use crate::tensor::{Element, Tensor};

/// Layer normalization over the last axis.
///
/// Each "row" (all but the last axis) is normalized independently with
/// population variance (divide by count), then scaled and shifted:
/// `y = (x - mean) / sqrt(var + epsilon) * gamma + beta`.
pub fn layer_norm<T: Element>(
    input: &Tensor<T>,
    gamma: &Tensor<T>,
    beta: &Tensor<T>,
    epsilon: f32,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    if output.shape() != input.shape() {
        return Err(shape_mismatch("output", input.shape(), output.shape()));
    }
    let last = input.dim(input.rank().saturating_sub(1)).max(1);
    if gamma.shape() != [last] {
        return Err(shape_mismatch("gamma", &[last], gamma.shape()));
    }
    if beta.shape() != [last] {
        return Err(shape_mismatch("beta", &[last], beta.shape()));
    }
    token.checkpoint("layer_norm")?;

    let rows = input.len() / last;
    let count = T::from_f32(last as f32);
    let epsilon = T::from_f32(epsilon);
    let in_data = input.as_slice();
    let g_data = gamma.as_slice();
    let b_data = beta.as_slice();
    let out_data = output.as_mut_slice();

    for row in 0..rows {
        token.checkpoint("layer_norm")?;
        let base = row * last;

        let mut sum = T::zero();
        for &x in &in_data[base..base + last] {
            sum = sum.add(x);
        }
        let mean = sum.div(count);

        let mut var_sum = T::zero();
        for &x in &in_data[base..base + last] {
            let d = x.sub(mean);
            var_sum = var_sum.add(d.mul(d));
        }
        let variance = var_sum.div(count);
        let inv_std = T::one().div(variance.add(epsilon).sqrt());

        for i in 0..last {
            let normalized = in_data[base + i].sub(mean).mul(inv_std);
            out_data[base + i] = normalized.mul(g_data[i]).add(b_data[i]);
        }
    }
    Ok(())
}

/// Batch normalization per channel of a `[n, c, h, w]` tensor.
///
/// Running mean/variance are supplied externally (inference mode); the
/// kernel never derives statistics from the batch itself.
pub fn batch_norm<T: Element>(
    input: &Tensor<T>,
    mean: &Tensor<T>,
    variance: &Tensor<T>,
    gamma: &Tensor<T>,
    beta: &Tensor<T>,
    epsilon: f32,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    super::expect_rank(input, "input", 4)?;
    if output.shape() != input.shape() {
        return Err(shape_mismatch("output", input.shape(), output.shape()));
    }
    let (n, c, h, w) = (input.dim(0), input.dim(1), input.dim(2), input.dim(3));
    for (name, t) in [("mean", mean), ("variance", variance), ("gamma", gamma), ("beta", beta)] {
        if t.shape() != [c] {
            return Err(shape_mismatch(name, &[c], t.shape()));
        }
    }
    token.checkpoint("batch_norm")?;

    let epsilon = T::from_f32(epsilon);
    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();
    let spatial = h * w;

    for bi in 0..n {
        token.checkpoint("batch_norm")?;
        for ch in 0..c {
            let inv_std = T::one().div(variance.as_slice()[ch].add(epsilon).sqrt());
            let ch_mean = mean.as_slice()[ch];
            let ch_gamma = gamma.as_slice()[ch];
            let ch_beta = beta.as_slice()[ch];
            let base = (bi * c + ch) * spatial;
            for i in 0..spatial {
                let normalized = in_data[base + i].sub(ch_mean).mul(inv_std);
                out_data[base + i] = normalized.mul(ch_gamma).add(ch_beta);
            }
        }
    }
    Ok(())
}
