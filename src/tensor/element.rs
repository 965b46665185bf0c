//! Element types storable in tensors.
//!
//! The `Element` trait is the generic-arithmetic seam of the crate: every
//! primitive is written once against it instead of branching on a runtime
//! type tag. Supported types are the closed set the dispatch layer accepts;
//! anything else simply fails to compile, so there is no "unsupported type"
//! runtime error path.

use half::{bf16, f16};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type tag carried by tensors and capability descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    F16,
    BF16,
    I32,
    I8,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F64 => 8,
            DType::F32 | DType::I32 => 4,
            DType::F16 | DType::BF16 => 2,
            DType::I8 => 1,
        }
    }

    /// Whether this is a floating-point format.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64 | DType::F16 | DType::BF16)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::F16 => write!(f, "f16"),
            DType::BF16 => write!(f, "bf16"),
            DType::I32 => write!(f, "i32"),
            DType::I8 => write!(f, "i8"),
        }
    }
}

/// Numeric element usable in tensors and primitives.
///
/// The method set mirrors the arithmetic a primitive needs: ring ops,
/// `exp`/`sqrt` for softmax and normalization, an ordering predicate for
/// max-reductions, and `f32` conversions for scalar parameters
/// (alpha/beta, epsilon, quantization scales).
pub trait Element:
    Copy + Send + Sync + PartialOrd + Default + fmt::Debug + 'static
{
    /// Runtime tag matching this type.
    const DTYPE: DType;

    fn zero() -> Self;
    fn one() -> Self;

    /// Build an element from an `f32` scalar parameter.
    fn from_f32(value: f32) -> Self;

    /// Widen to `f32` (lossy for f64/i32 values outside f32 range).
    fn to_f32(self) -> f32;

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;

    fn exp(self) -> Self {
        Self::from_f32(self.to_f32().exp())
    }

    fn sqrt(self) -> Self {
        Self::from_f32(self.to_f32().sqrt())
    }

    fn is_greater_than(self, rhs: Self) -> bool {
        self.to_f32() > rhs.to_f32()
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn from_f32(value: f32) -> Self {
        value
    }
    fn to_f32(self) -> f32 {
        self
    }
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }
    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }
    fn div(self, rhs: Self) -> Self {
        self / rhs
    }
    fn exp(self) -> Self {
        f32::exp(self)
    }
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
    fn is_greater_than(self, rhs: Self) -> bool {
        self > rhs
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn from_f32(value: f32) -> Self {
        value as f64
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }
    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }
    fn div(self, rhs: Self) -> Self {
        self / rhs
    }
    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn is_greater_than(self, rhs: Self) -> bool {
        self > rhs
    }
}

impl Element for f16 {
    const DTYPE: DType = DType::F16;

    fn zero() -> Self {
        f16::ZERO
    }
    fn one() -> Self {
        f16::ONE
    }
    fn from_f32(value: f32) -> Self {
        f16::from_f32(value)
    }
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }
    // Half-precision arithmetic widens to f32; this matches how hardware
    // without native fp16 ALUs executes these ops.
    fn add(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() + rhs.to_f32())
    }
    fn sub(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() - rhs.to_f32())
    }
    fn mul(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() * rhs.to_f32())
    }
    fn div(self, rhs: Self) -> Self {
        f16::from_f32(self.to_f32() / rhs.to_f32())
    }
}

impl Element for bf16 {
    const DTYPE: DType = DType::BF16;

    fn zero() -> Self {
        bf16::ZERO
    }
    fn one() -> Self {
        bf16::ONE
    }
    fn from_f32(value: f32) -> Self {
        bf16::from_f32(value)
    }
    fn to_f32(self) -> f32 {
        bf16::to_f32(self)
    }
    fn add(self, rhs: Self) -> Self {
        bf16::from_f32(self.to_f32() + rhs.to_f32())
    }
    fn sub(self, rhs: Self) -> Self {
        bf16::from_f32(self.to_f32() - rhs.to_f32())
    }
    fn mul(self, rhs: Self) -> Self {
        bf16::from_f32(self.to_f32() * rhs.to_f32())
    }
    fn div(self, rhs: Self) -> Self {
        bf16::from_f32(self.to_f32() / rhs.to_f32())
    }
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;

    fn zero() -> Self {
        0
    }
    fn one() -> Self {
        1
    }
    fn from_f32(value: f32) -> Self {
        value as i32
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(rhs)
    }
    fn div(self, rhs: Self) -> Self {
        if rhs == 0 {
            0
        } else {
            self / rhs
        }
    }
    fn is_greater_than(self, rhs: Self) -> bool {
        self > rhs
    }
}

impl Element for i8 {
    const DTYPE: DType = DType::I8;

    fn zero() -> Self {
        0
    }
    fn one() -> Self {
        1
    }
    fn from_f32(value: f32) -> Self {
        value as i8
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(rhs)
    }
    fn div(self, rhs: Self) -> Self {
        if rhs == 0 {
            0
        } else {
            self / rhs
        }
    }
    fn is_greater_than(self, rhs: Self) -> bool {
        self > rhs
    }
}
