//! Reference attention kernels.
//!
//! Single-head attention replicated per head slice; O(heads * seq^2 *
//! head_dim) with no fusion. Scores are scaled by `1/sqrt(head_dim)` and
//! masked positions receive a large negative score before softmax.

use crate::error::{shape_mismatch, ForgeResult, KernelForgeError};
use crate::primitives::{AttentionParams, CancellationToken};
use crate::tensor::{Element, Tensor};

use super::activation::softmax_row;

/// Score substituted for masked positions before softmax.
const MASKED_SCORE: f32 = -1.0e9;

/// Multi-head attention over `[batch, seq, hidden]` query/key/value.
///
/// `hidden` is split into `params.num_heads` equal slices; attention runs
/// independently per head over its slice of the hidden dimension.
pub fn multi_head_attention<T: Element>(
    query: &Tensor<T>,
    key: &Tensor<T>,
    value: &Tensor<T>,
    output: &mut Tensor<T>,
    mask: Option<&[bool]>,
    params: &AttentionParams,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let (batch, seq, hidden) = validate_attention_shapes(query, key, value, output, mask)?;

    let num_heads = params.num_heads;
    if num_heads == 0 {
        return Err(KernelForgeError::InvalidParameters(
            "num_heads must be nonzero".to_string(),
        ));
    }
    if hidden % num_heads != 0 {
        return Err(KernelForgeError::ShapeMismatch {
            tensor: "query".to_string(),
            expected: format!("hidden divisible by num_heads ({})", num_heads),
            actual: format!("hidden = {}", hidden),
        });
    }
    let head_dim = hidden / num_heads;

    token.checkpoint("multi_head_attention")?;

    for bi in 0..batch {
        for head in 0..num_heads {
            token.checkpoint("multi_head_attention")?;
            attend_head(
                query.as_slice(),
                key.as_slice(),
                value.as_slice(),
                output.as_mut_slice(),
                mask,
                bi,
                seq,
                hidden,
                head * head_dim,
                head_dim,
            );
        }
    }
    Ok(())
}

/// Single-head scaled dot-product attention over `[batch, seq, hidden]`.
pub fn scaled_dot_product_attention<T: Element>(
    query: &Tensor<T>,
    key: &Tensor<T>,
    value: &Tensor<T>,
    output: &mut Tensor<T>,
    mask: Option<&[bool]>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let (batch, seq, hidden) = validate_attention_shapes(query, key, value, output, mask)?;
    token.checkpoint("scaled_dot_product_attention")?;

    for bi in 0..batch {
        token.checkpoint("scaled_dot_product_attention")?;
        attend_head(
            query.as_slice(),
            key.as_slice(),
            value.as_slice(),
            output.as_mut_slice(),
            mask,
            bi,
            seq,
            hidden,
            0,
            hidden,
        );
    }
    Ok(())
}

/// Attention for one batch element over one hidden slice
/// `[offset, offset + head_dim)`.
#[allow(clippy::too_many_arguments)]
fn attend_head<T: Element>(
    query: &[T],
    key: &[T],
    value: &[T],
    output: &mut [T],
    mask: Option<&[bool]>,
    batch_index: usize,
    seq: usize,
    hidden: usize,
    offset: usize,
    head_dim: usize,
) {
    let base = batch_index * seq * hidden;
    let mask_base = batch_index * seq * seq;
    let scale = T::from_f32(1.0 / (head_dim as f32).sqrt());
    let masked = T::from_f32(MASKED_SCORE);

    let mut scores = vec![T::zero(); seq];
    let mut weights = vec![T::zero(); seq];

    for qi in 0..seq {
        let q_row = base + qi * hidden + offset;

        for ki in 0..seq {
            let k_row = base + ki * hidden + offset;
            let mut dot = T::zero();
            for d in 0..head_dim {
                dot = dot.add(query[q_row + d].mul(key[k_row + d]));
            }
            let mut score = dot.mul(scale);
            if let Some(mask) = mask {
                if mask[mask_base + qi * seq + ki] {
                    score = masked;
                }
            }
            scores[ki] = score;
        }

        softmax_row(&scores, &mut weights);

        for d in 0..head_dim {
            let mut acc = T::zero();
            for ki in 0..seq {
                acc = acc.add(weights[ki].mul(value[base + ki * hidden + offset + d]));
            }
            output[q_row + d] = acc;
        }
    }
}

/// Validate matching `[batch, seq, hidden]` shapes and optional mask length.
fn validate_attention_shapes<T: Element>(
    query: &Tensor<T>,
    key: &Tensor<T>,
    value: &Tensor<T>,
    output: &Tensor<T>,
    mask: Option<&[bool]>,
) -> ForgeResult<(usize, usize, usize)> {
    super::expect_rank(query, "query", 3)?;
    let (batch, seq, hidden) = (query.dim(0), query.dim(1), query.dim(2));

    for (name, t) in [("key", key), ("value", value)] {
        if t.shape() != query.shape() {
            return Err(shape_mismatch(name, query.shape(), t.shape()));
        }
    }
    if output.shape() != query.shape() {
        return Err(shape_mismatch("output", query.shape(), output.shape()));
    }
    if let Some(mask) = mask {
        let expected = batch * seq * seq;
        if mask.len() != expected {
            return Err(KernelForgeError::ShapeMismatch {
                tensor: "mask".to_string(),
                expected: format!("{} booleans (batch*seq*seq)", expected),
                actual: format!("{} booleans", mask.len()),
            });
        }
    }
    Ok((batch, seq, hidden))
}
