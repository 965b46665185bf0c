//! Reference element-wise nonlinearities and softmax.

use crate::error::{shape_mismatch, ForgeResult};
use crate::primitives::CancellationToken;
use crate::tensor::{Element, Tensor};

/// Elements processed between cancellation checkpoints.
const CHECKPOINT_INTERVAL: usize = 64 * 1024;

/// Element-wise `max(x, 0)`.
pub fn relu<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    apply_elementwise(input, output, token, "relu", |x| {
        if x.is_greater_than(T::zero()) {
            x
        } else {
            T::zero()
        }
    })
}

/// GELU, tanh approximation:
/// `0.5 * x * (1 + tanh(sqrt(2/pi) * (x + 0.044715 * x^3)))`.
pub fn gelu<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let half = T::from_f32(0.5);
    let coeff = T::from_f32(0.044715);
    let sqrt_2_over_pi = T::from_f32((2.0 / std::f32::consts::PI).sqrt());
    apply_elementwise(input, output, token, "gelu", move |x| {
        let x3 = x.mul(x).mul(x);
        let inner = sqrt_2_over_pi.mul(x.add(coeff.mul(x3)));
        half.mul(x).mul(T::one().add(tanh_approx(inner)))
    })
}

/// Logistic sigmoid `1 / (1 + e^-x)`.
pub fn sigmoid<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    apply_elementwise(input, output, token, "sigmoid", |x| {
        T::one().div(T::one().add(T::zero().sub(x).exp()))
    })
}

/// Element-wise hyperbolic tangent.
pub fn tanh<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    apply_elementwise(input, output, token, "tanh", tanh_approx)
}

/// `tanh(x)` via `(e^{2x} - 1) / (e^{2x} + 1)`.
pub(crate) fn tanh_approx<T: Element>(x: T) -> T {
    let e2x = x.add(x).exp();
    e2x.sub(T::one()).div(e2x.add(T::one()))
}

/// Softmax over the last axis; all leading axes form independent rows.
///
/// Uses the max-subtraction trick: `softmax(x) = softmax(x - max(x))`,
/// which keeps the exponentials bounded.
pub fn softmax<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    if output.shape() != input.shape() {
        return Err(shape_mismatch("output", input.shape(), output.shape()));
    }
    token.checkpoint("softmax")?;

    let last = input.dim(input.rank().saturating_sub(1)).max(1);
    let rows = input.len() / last;
    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();

    for row in 0..rows {
        token.checkpoint("softmax")?;
        let base = row * last;
        softmax_row(&in_data[base..base + last], &mut out_data[base..base + last]);
    }
    Ok(())
}

/// Softmax of one contiguous row.
pub(crate) fn softmax_row<T: Element>(input: &[T], output: &mut [T]) {
    if input.is_empty() {
        return;
    }
    let mut max = input[0];
    for &x in &input[1..] {
        if x.is_greater_than(max) {
            max = x;
        }
    }
    let mut sum = T::zero();
    for (out, &x) in output.iter_mut().zip(input.iter()) {
        let e = x.sub(max).exp();
        *out = e;
        sum = sum.add(e);
    }
    if sum.to_f32() == 0.0 {
        return;
    }
    for out in output.iter_mut() {
        *out = out.div(sum);
    }
}

fn apply_elementwise<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<T>,
    token: &CancellationToken,
    name: &str,
    f: impl Fn(T) -> T,
) -> ForgeResult<()> {
    if output.shape() != input.shape() {
        return Err(shape_mismatch("output", input.shape(), output.shape()));
    }
    token.checkpoint(name)?;

    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();
    for (chunk_in, chunk_out) in in_data
        .chunks(CHECKPOINT_INTERVAL)
        .zip(out_data.chunks_mut(CHECKPOINT_INTERVAL))
    {
        token.checkpoint(name)?;
        for (out, &x) in chunk_out.iter_mut().zip(chunk_in.iter()) {
            *out = f(x);
        }
    }
    Ok(())
}
