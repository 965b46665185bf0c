//! Unified error handling for kernelforge
//!
//! This module provides a centralized error type that consolidates all
//! domain-specific errors throughout the codebase. It implements error
//! categorization for:
//! - User errors (shape/contract violations, bad configuration)
//! - Recoverable errors (cancellation, temporary conditions)
//! - Internal errors (bugs, poisoned locks)
//! - Backend errors (accelerator unavailable, dispatch failures)
//! - Profiler errors (session misuse, export failures)

use std::fmt;

/// Unified error type for kernelforge
///
/// This enum consolidates all domain-specific errors into a single type
/// that can be used throughout the codebase. It supports categorization
/// via the `category()` method.
#[derive(Debug, thiserror::Error)]
pub enum KernelForgeError {
    // ========== Shape / Contract Errors ==========
    /// Tensor shape does not satisfy an operation precondition
    #[error("Shape mismatch for tensor '{tensor}': expected {expected}, got {actual}")]
    ShapeMismatch {
        tensor: String,
        expected: String,
        actual: String,
    },

    /// Tensor rank outside the supported range for an operation
    #[error("Rank mismatch for tensor '{tensor}': expected rank {expected}, got rank {actual}")]
    RankMismatch {
        tensor: String,
        expected: usize,
        actual: usize,
    },

    /// Index out of bounds during element access
    #[error("Index out of bounds on axis {axis}: index {index} >= extent {extent}")]
    IndexOutOfBounds {
        axis: usize,
        index: usize,
        extent: usize,
    },

    /// Invalid operation parameters (stride 0, empty pool window, ...)
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ========== Dispatch / Backend Errors ==========
    /// Requested backend could not be constructed or is unavailable
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Primitive dispatch failed inside a backend
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    /// Operation was cancelled via its cancellation token
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    // ========== Profiler Errors ==========
    /// Session lifecycle misuse (ending with no active session, ...)
    #[error("No active profiling session")]
    NoActiveSession,

    /// Profiling session error with context
    #[error("Profiling session error: {0}")]
    SessionError(String),

    /// Export serialization or encoding failed
    #[error("Export failed: {0}")]
    ExportFailed(String),

    // ========== I/O Errors ==========
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ========== Internal Errors ==========
    /// Internal error (indicates a bug)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Lock poisoned (indicates a bug or concurrent access issue)
    #[error("Internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl KernelForgeError {
    /// Categorize the error for handling decisions
    ///
    /// Returns the error category, which can be used to determine
    /// whether an error is recoverable, user-facing, or internal.
    pub fn category(&self) -> ErrorCategory {
        match self {
            // User errors - actionable by callers
            KernelForgeError::ShapeMismatch { .. }
            | KernelForgeError::RankMismatch { .. }
            | KernelForgeError::IndexOutOfBounds { .. }
            | KernelForgeError::InvalidParameters(_)
            | KernelForgeError::InvalidConfiguration(_) => ErrorCategory::User,

            // Recoverable - the caller may retry or proceed
            KernelForgeError::OperationCancelled(_) => ErrorCategory::Recoverable,

            // Backend errors
            KernelForgeError::BackendUnavailable(_)
            | KernelForgeError::DispatchFailed(_) => ErrorCategory::Backend,

            // Profiler misuse / export issues
            KernelForgeError::NoActiveSession
            | KernelForgeError::SessionError(_)
            | KernelForgeError::ExportFailed(_)
            | KernelForgeError::IoError(_) => ErrorCategory::Profiler,

            // Internal errors - bugs
            KernelForgeError::InternalError(_)
            | KernelForgeError::LockPoisoned(_) => ErrorCategory::Internal,
        }
    }

    /// Check if this error is recoverable (temporary condition)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Recoverable | ErrorCategory::Backend
        )
    }

    /// Check if this is a user-facing error (actionable by callers)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this is an internal error (indicates a bug)
    pub fn is_internal_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }

    /// Check if this error represents a cancelled operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KernelForgeError::OperationCancelled(_))
    }
}

/// Error category for handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User error - invalid shapes, parameters, or configuration
    User,
    /// Recoverable error - cancellation or a temporary condition
    Recoverable,
    /// Internal error - indicates a bug
    Internal,
    /// Backend error - accelerator or dispatch failure
    Backend,
    /// Profiler error - session misuse or export failure
    Profiler,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Recoverable => write!(f, "Recoverable"),
            ErrorCategory::Internal => write!(f, "Internal"),
            ErrorCategory::Backend => write!(f, "Backend"),
            ErrorCategory::Profiler => write!(f, "Profiler"),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for KernelForgeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        KernelForgeError::LockPoisoned(err.to_string())
    }
}

/// Helper type alias for Results using KernelForgeError
pub type ForgeResult<T> = std::result::Result<T, KernelForgeError>;

/// Build a shape-mismatch error from shape slices
///
/// Formats both shapes in `[a, b, c]` notation so failures identify the
/// offending tensor and the expectation exactly.
pub fn shape_mismatch(tensor: &str, expected: &[usize], actual: &[usize]) -> KernelForgeError {
    KernelForgeError::ShapeMismatch {
        tensor: tensor.to_string(),
        expected: format!("{:?}", expected),
        actual: format!("{:?}", actual),
    }
}
