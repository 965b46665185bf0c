//! Reference int8 affine quantization kernels.

use crate::error::{shape_mismatch, ForgeResult, KernelForgeError};
use crate::primitives::CancellationToken;
use crate::tensor::{Element, Tensor};

/// Elements processed between cancellation checkpoints.
const CHECKPOINT_INTERVAL: usize = 64 * 1024;

/// Affine quantization: `q = round(x / scale) + zero_point`, clamped to
/// `[-128, 127]`.
pub fn quantize_to_int8<T: Element>(
    input: &Tensor<T>,
    output: &mut Tensor<i8>,
    scale: f32,
    zero_point: i32,
    token: &CancellationToken,
) -> ForgeResult<()> {
    validate_quant(input.shape(), output.shape(), scale)?;
    token.checkpoint("quantize_to_int8")?;

    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();
    for (chunk_in, chunk_out) in in_data
        .chunks(CHECKPOINT_INTERVAL)
        .zip(out_data.chunks_mut(CHECKPOINT_INTERVAL))
    {
        token.checkpoint("quantize_to_int8")?;
        for (out, &x) in chunk_out.iter_mut().zip(chunk_in.iter()) {
            let q = (x.to_f32() / scale).round() as i64 + zero_point as i64;
            *out = q.clamp(-128, 127) as i8;
        }
    }
    Ok(())
}

/// Affine dequantization: `x = (q - zero_point) * scale`.
pub fn dequantize_from_int8<T: Element>(
    input: &Tensor<i8>,
    output: &mut Tensor<T>,
    scale: f32,
    zero_point: i32,
    token: &CancellationToken,
) -> ForgeResult<()> {
    validate_quant(input.shape(), output.shape(), scale)?;
    token.checkpoint("dequantize_from_int8")?;

    let in_data = input.as_slice();
    let out_data = output.as_mut_slice();
    for (chunk_in, chunk_out) in in_data
        .chunks(CHECKPOINT_INTERVAL)
        .zip(out_data.chunks_mut(CHECKPOINT_INTERVAL))
    {
        token.checkpoint("dequantize_from_int8")?;
        for (out, &q) in chunk_out.iter_mut().zip(chunk_in.iter()) {
            *out = T::from_f32((q as i32 - zero_point) as f32 * scale);
        }
    }
    Ok(())
}

fn validate_quant(input: &[usize], output: &[usize], scale: f32) -> ForgeResult<()> {
    if output != input {
        return Err(shape_mismatch("output", input, output));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(KernelForgeError::InvalidParameters(format!(
            "quantization scale must be finite and positive, got {}",
            scale
        )));
    }
    Ok(())
}
