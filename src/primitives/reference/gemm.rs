//! Reference GEMM kernels.
//!
//! Naive nested loops over flattened row-major storage. Correctness
//! baseline, not a performance target: no tiling, no blocking.

use crate::error::{shape_mismatch, ForgeResult};
use crate::primitives::CancellationToken;
use crate::tensor::{Element, Tensor};

/// `C := alpha * A * B + beta * C` for `A: [m, k]`, `B: [k, n]`, `C: [m, n]`.
pub fn gemm<T: Element>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    c: &mut Tensor<T>,
    alpha: f32,
    beta: f32,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let (m, k, n) = validate_gemm_shapes(a, b, c)?;
    token.checkpoint("gemm")?;

    let alpha = T::from_f32(alpha);
    let beta = T::from_f32(beta);
    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let c_data = c.as_mut_slice();

    for i in 0..m {
        // cancellation observed once per output row
        token.checkpoint("gemm")?;
        for j in 0..n {
            let mut acc = T::zero();
            for kk in 0..k {
                acc = acc.add(a_data[i * k + kk].mul(b_data[kk * n + j]));
            }
            let prior = c_data[i * n + j];
            c_data[i * n + j] = alpha.mul(acc).add(beta.mul(prior));
        }
    }
    Ok(())
}

/// Batched GEMM: `C[i] := A[i] * B[i]` over the leading batch axis.
pub fn batched_gemm<T: Element>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    c: &mut Tensor<T>,
    token: &CancellationToken,
) -> ForgeResult<()> {
    let (batch, m, k, n) = validate_batched_shapes(a, b, c)?;
    token.checkpoint("batched_gemm")?;

    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let c_data = c.as_mut_slice();

    let a_stride = m * k;
    let b_stride = k * n;
    let c_stride = m * n;

    for bi in 0..batch {
        token.checkpoint("batched_gemm")?;
        let a_base = bi * a_stride;
        let b_base = bi * b_stride;
        let c_base = bi * c_stride;
        for i in 0..m {
            for j in 0..n {
                let mut acc = T::zero();
                for kk in 0..k {
                    acc = acc.add(a_data[a_base + i * k + kk].mul(b_data[b_base + kk * n + j]));
                }
                c_data[c_base + i * n + j] = acc;
            }
        }
    }
    Ok(())
}

/// Validate `[m, k] x [k, n] -> [m, n]` and return the extents.
pub fn validate_gemm_shapes<T: Element>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    c: &Tensor<T>,
) -> ForgeResult<(usize, usize, usize)> {
    super::expect_rank(a, "A", 2)?;
    super::expect_rank(b, "B", 2)?;
    super::expect_rank(c, "C", 2)?;

    let (m, k) = (a.dim(0), a.dim(1));
    let n = b.dim(1);
    if b.dim(0) != k {
        return Err(shape_mismatch("B", &[k, n], b.shape()));
    }
    if c.shape() != [m, n] {
        return Err(shape_mismatch("C", &[m, n], c.shape()));
    }
    Ok((m, k, n))
}

fn validate_batched_shapes<T: Element>(
    a: &Tensor<T>,
    b: &Tensor<T>,
    c: &Tensor<T>,
) -> ForgeResult<(usize, usize, usize, usize)> {
    super::expect_rank(a, "A", 3)?;
    super::expect_rank(b, "B", 3)?;
    super::expect_rank(c, "C", 3)?;

    let (batch, m, k) = (a.dim(0), a.dim(1), a.dim(2));
    let n = b.dim(2);
    if b.shape() != [batch, k, n] {
        return Err(shape_mismatch("B", &[batch, k, n], b.shape()));
    }
    if c.shape() != [batch, m, n] {
        return Err(shape_mismatch("C", &[batch, m, n], c.shape()));
    }
    Ok((batch, m, k, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(data: &[f32], shape: &[usize]) -> Tensor<f32> {
        Tensor::from_vec(data.to_vec(), shape).unwrap()
    }

    #[test]
    fn test_gemm_identity() {
        let a = tensor(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let b = tensor(&[1.0, 0.0, 0.0, 1.0], &[2, 2]);
        let mut c = Tensor::zeros(&[2, 2]);
        gemm(&a, &b, &mut c, 1.0, 0.0, &CancellationToken::new()).unwrap();
        assert_eq!(c.as_slice(), a.as_slice());
    }

    #[test]
    fn test_gemm_alpha_beta() {
        let a = tensor(&[1.0, 2.0], &[1, 2]);
        let b = tensor(&[3.0, 4.0], &[2, 1]);
        let mut c = tensor(&[10.0], &[1, 1]);
        // 2 * (1*3 + 2*4) + 1 * 10 = 32
        gemm(&a, &b, &mut c, 2.0, 1.0, &CancellationToken::new()).unwrap();
        assert_eq!(c.as_slice(), &[32.0]);
    }

    #[test]
    fn test_gemm_inner_dim_mismatch() {
        let a = tensor(&[1.0; 6], &[2, 3]);
        let b = tensor(&[1.0; 8], &[2, 4]);
        let mut c = Tensor::zeros(&[2, 4]);
        let err = gemm(&a, &b, &mut c, 1.0, 0.0, &CancellationToken::new()).unwrap_err();
        assert!(err.to_string().contains("'B'"));
    }

    #[test]
    fn test_gemm_cancelled_before_compute() {
        let a = tensor(&[1.0; 4], &[2, 2]);
        let b = tensor(&[1.0; 4], &[2, 2]);
        let mut c = Tensor::zeros(&[2, 2]);
        let token = CancellationToken::new();
        token.cancel();
        let err = gemm(&a, &b, &mut c, 1.0, 0.0, &token).unwrap_err();
        assert!(err.is_cancelled());
        // output untouched
        assert!(c.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_batched_gemm() {
        // batch 0: identity, batch 1: doubles
        let a = tensor(&[1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0], &[2, 2, 2]);
        let b = tensor(&[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0], &[2, 2, 2]);
        let mut c = Tensor::zeros(&[2, 2, 2]);
        batched_gemm(&a, &b, &mut c, &CancellationToken::new()).unwrap();
        assert_eq!(&c.as_slice()[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&c.as_slice()[4..], &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_batched_gemm_batch_mismatch() {
        let a = Tensor::<f32>::zeros(&[2, 2, 2]);
        let b = Tensor::<f32>::zeros(&[3, 2, 2]);
        let mut c = Tensor::<f32>::zeros(&[2, 2, 2]);
        assert!(batched_gemm(&a, &b, &mut c, &CancellationToken::new()).is_err());
    }
}
