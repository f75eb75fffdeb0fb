//! # Errors
//!
//! Error taxonomy shared by every module of the crate.
//!
//! Configuration errors are the caller's fault and are detected before any
//! computation starts. Numerical instabilities (near-zero denominators, overflow,
//! NaN weights) are recovered locally and never show up here. [`NetfolioError::NonFinite`]
//! is the last line of defense before a value crosses the output boundary.

use thiserror::Error;

/// Main error type of the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetfolioError {
  #[error("lookback window must be at least 1")]
  InvalidLookback,

  #[error("lookback window {lookback} exceeds available history of {available} periods")]
  LookbackExceedsHistory { lookback: usize, available: usize },

  #[error("at least {required} assets are required, got {got}")]
  InsufficientAssets { required: usize, got: usize },

  #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
  DimensionMismatch {
    context: &'static str,
    expected: usize,
    got: usize,
  },

  #[error("invalid parameter `{name}`: {reason}")]
  InvalidParameter { name: &'static str, reason: String },

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("non-finite value in {0}")]
  NonFinite(String),
}

impl NetfolioError {
  /// `true` for errors caused by the caller's parameters or input shapes.
  pub fn is_configuration(&self) -> bool {
    !matches!(self, Self::NonFinite(_))
  }

  pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidParameter {
      name,
      reason: reason.into(),
    }
  }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, NetfolioError>;
