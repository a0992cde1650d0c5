//! # Cancellation
//!
//! Cooperative cancellation shared between a caller and a running request.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use super::error::PortfolioError;
use super::error::Result;

/// Cloneable flag checked between independent solves and random draws.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
  cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Request cancellation; visible to every clone of this token.
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Relaxed)
  }

  /// `Err(Cancelled)` once [`CancellationToken::cancel`] has been called.
  pub fn check(&self) -> Result<()> {
    if self.is_cancelled() {
      Err(PortfolioError::Cancelled)
    } else {
      Ok(())
    }
  }
}
