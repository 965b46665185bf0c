//! N-dimensional tensors with row-major addressing.
//!
//! A [`Tensor`] owns a contiguous backing store plus shape metadata and a
//! compute-location tag. It is deliberately minimal: the primitives operate
//! on flat slices with explicit index arithmetic, so the tensor type only
//! has to get shape bookkeeping and bounds checking right.
//!
//! Tensors are not internally synchronized. A single tensor must not be
//! mutated by two concurrent primitive calls (spec'd at the dispatch layer);
//! `&mut` receivers enforce this for safe callers.

pub mod element;
pub mod shape;

pub use element::{DType, Element};

use crate::accelerator::ComputeLocation;
use crate::error::{ForgeResult, KernelForgeError};

/// N-dimensional array over one [`Element`] type.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: Element> {
    data: Vec<T>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    location: ComputeLocation,
}

impl<T: Element> Tensor<T> {
    /// Create a zero-filled host tensor with the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::zeros_on(shape, ComputeLocation::Host)
    }

    /// Create a zero-filled tensor placed at `location`.
    pub fn zeros_on(shape: &[usize], location: ComputeLocation) -> Self {
        let len = shape::element_count(shape);
        Tensor {
            data: vec![T::zero(); len],
            shape: shape.to_vec(),
            strides: shape::row_major_strides(shape),
            location,
        }
    }

    /// Create a tensor filled with one value.
    pub fn filled(shape: &[usize], value: T) -> Self {
        let len = shape::element_count(shape);
        Tensor {
            data: vec![value; len],
            shape: shape.to_vec(),
            strides: shape::row_major_strides(shape),
            location: ComputeLocation::Host,
        }
    }

    /// Wrap existing data in a tensor, validating the element count.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> ForgeResult<Self> {
        let expected = shape::element_count(shape);
        if data.len() != expected {
            return Err(KernelForgeError::ShapeMismatch {
                tensor: "data".to_string(),
                expected: format!("{} elements for shape {:?}", expected, shape),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Tensor {
            data,
            shape: shape.to_vec(),
            strides: shape::row_major_strides(shape),
            location: ComputeLocation::Host,
        })
    }

    /// Element type tag.
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Per-axis extents.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extent of one axis.
    ///
    /// Returns 1 for axes beyond the tensor's rank, which keeps size
    /// formulas uniform for lower-rank operands.
    pub fn dim(&self, axis: usize) -> usize {
        self.shape.get(axis).copied().unwrap_or(1)
    }

    /// Placement tag for this tensor's backing store.
    pub fn location(&self) -> ComputeLocation {
        self.location
    }

    /// Flat offset for multi-axis indices, bounds-checked per axis.
    pub fn flat_index(&self, indices: &[usize]) -> ForgeResult<usize> {
        shape::flat_index(&self.shape, indices)
    }

    /// Multi-axis indices for a flat offset.
    pub fn compute_indices_from_flat(&self, flat: usize) -> Vec<usize> {
        shape::compute_indices_from_flat(&self.shape, flat)
    }

    /// Read one element by multi-axis indices.
    pub fn get(&self, indices: &[usize]) -> ForgeResult<T> {
        let flat = self.flat_index(indices)?;
        Ok(self.data[flat])
    }

    /// Write one element by multi-axis indices.
    pub fn set(&mut self, indices: &[usize], value: T) -> ForgeResult<()> {
        let flat = self.flat_index(indices)?;
        self.data[flat] = value;
        Ok(())
    }

    /// Flat read-only view of the backing store.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Flat mutable view of the backing store.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Fill the whole tensor with one value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Consume the tensor, returning its backing store.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}
