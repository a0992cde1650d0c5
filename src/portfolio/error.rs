//! # Portfolio Errors
//!
//! Error taxonomy shared by every stage of an optimization request.

use thiserror::Error;

use super::optimizers::Objective;

/// Errors raised by statistics, evaluation, optimization and frontier routines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
  #[error("asset universe is empty")]
  EmptyUniverse,

  #[error("duplicate asset identifier `{0}`")]
  DuplicateAsset(String),

  #[error("insufficient data: need at least {required} return observations, got {actual}")]
  InsufficientData { required: usize, actual: usize },

  #[error("invalid portfolio weights: {0}")]
  InvalidWeights(String),

  #[error("dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error(
    "{objective} optimization did not converge after {iterations} iterations (constraint violation {violation:.3e})"
  )]
  OptimizationDidNotConverge {
    objective: Objective,
    iterations: u64,
    violation: f64,
  },

  #[error("request cancelled")]
  Cancelled,

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("failed to parse price table: {0}")]
  Parse(String),

  #[error("failed to sample random portfolio: {0}")]
  Sampling(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PortfolioError>;
