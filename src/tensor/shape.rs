//! Shape helpers for N-dimensional tensors.
//!
//! All addressing is row-major: the last axis varies fastest.

use crate::error::{ForgeResult, KernelForgeError};

/// Total number of elements described by a shape.
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().copied().product()
}

/// Row-major strides for a shape.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride: usize = 1;
    for dim in shape.iter().rev() {
        strides.push(stride);
        stride = stride.saturating_mul(*dim);
    }
    strides.reverse();
    strides
}

/// Translate multi-axis indices into a flat offset, validating bounds.
///
/// Every index must satisfy `indices[i] < shape[i]`.
pub fn flat_index(shape: &[usize], indices: &[usize]) -> ForgeResult<usize> {
    if indices.len() != shape.len() {
        return Err(KernelForgeError::RankMismatch {
            tensor: "index".to_string(),
            expected: shape.len(),
            actual: indices.len(),
        });
    }
    let mut flat = 0usize;
    let mut stride = 1usize;
    for axis in (0..shape.len()).rev() {
        let index = indices[axis];
        let extent = shape[axis];
        if index >= extent {
            return Err(KernelForgeError::IndexOutOfBounds {
                axis,
                index,
                extent,
            });
        }
        flat += index * stride;
        stride *= extent;
    }
    Ok(flat)
}

/// Recover multi-axis indices from a flat offset.
///
/// Divides by decreasing axis size from the last axis to the first, which
/// is the inverse of row-major flattening.
pub fn compute_indices_from_flat(shape: &[usize], mut flat: usize) -> Vec<usize> {
    let mut indices = vec![0usize; shape.len()];
    for axis in (0..shape.len()).rev() {
        let extent = shape[axis].max(1);
        indices[axis] = flat % extent;
        flat /= extent;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_count() {
        assert_eq!(element_count(&[2, 3, 4]), 24);
        assert_eq!(element_count(&[7]), 7);
        assert_eq!(element_count(&[]), 1);
        assert_eq!(element_count(&[3, 0, 5]), 0);
    }

    #[test]
    fn test_row_major_strides() {
        assert_eq!(row_major_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(row_major_strides(&[5]), vec![1]);
        assert!(row_major_strides(&[]).is_empty());
    }

    #[test]
    fn test_flat_index_last_axis_fastest() {
        // [1, 2] in shape [3, 4] -> 1*4 + 2
        assert_eq!(flat_index(&[3, 4], &[1, 2]).unwrap(), 6);
        // incrementing the last axis moves by one element
        assert_eq!(flat_index(&[3, 4], &[1, 3]).unwrap(), 7);
    }

    #[test]
    fn test_flat_index_bounds_checked() {
        let err = flat_index(&[3, 4], &[3, 0]).unwrap_err();
        assert!(matches!(
            err,
            KernelForgeError::IndexOutOfBounds { axis: 0, index: 3, extent: 3 }
        ));

        let err = flat_index(&[3, 4], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, KernelForgeError::RankMismatch { .. }));
    }

    #[test]
    fn test_flat_roundtrip() {
        let shape = [2, 3, 5];
        for flat in 0..element_count(&shape) {
            let indices = compute_indices_from_flat(&shape, flat);
            assert_eq!(flat_index(&shape, &indices).unwrap(), flat);
        }
    }
}
