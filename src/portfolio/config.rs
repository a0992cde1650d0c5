//! # Portfolio Configuration
//!
//! $$
//! \mu_{ann}=P\,\mathbf{w}^\top\mu,\qquad
//! \sigma_{ann}=k\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}\sqrt{P}
//! $$
//!
//! Named constants and runtime knobs. Defaults follow daily-data
//! conventions, including the risk scale `k = 0.5`.

use super::error::PortfolioError;
use super::error::Result;

/// Trading periods per year for daily observations.
pub const TRADING_DAYS: f64 = 252.0;

/// Multiplier applied to annualized portfolio risk.
///
/// Standard mean-variance annualization uses `1.0`. The default `0.5` is kept for
/// output compatibility; set [`AnnualizationConfig::risk_scale`] to `1.0` for
/// textbook volatility.
pub const RISK_SCALE: f64 = 0.5;

/// Default upper end of the target-return sweep (100% annualized return).
pub const SWEEP_CEILING: f64 = 1.0;

/// Cost returned by the Sharpe objective when portfolio risk is exactly zero.
pub const ZERO_RISK_PENALTY: f64 = 1e10;

/// Annualization of per-period moments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnualizationConfig {
  /// Observation periods per year (252 for daily data, 52 weekly, 12 monthly).
  pub periods_per_year: f64,
  /// Scale applied to portfolio risk, see [`RISK_SCALE`].
  pub risk_scale: f64,
}

impl Default for AnnualizationConfig {
  fn default() -> Self {
    Self {
      periods_per_year: TRADING_DAYS,
      risk_scale: RISK_SCALE,
    }
  }
}

impl AnnualizationConfig {
  pub fn validate(&self) -> Result<()> {
    if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
      return Err(PortfolioError::InvalidConfig(format!(
        "periods_per_year must be positive, got {}",
        self.periods_per_year
      )));
    }
    if !(self.risk_scale.is_finite() && self.risk_scale > 0.0) {
      return Err(PortfolioError::InvalidConfig(format!(
        "risk_scale must be positive, got {}",
        self.risk_scale
      )));
    }
    Ok(())
  }
}

/// What to do when a solve ends without meeting its tolerances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConvergencePolicy {
  /// Abort the request with [`PortfolioError::OptimizationDidNotConverge`].
  Fail,
  /// Log a warning and keep the result, flagged as not converged.
  #[default]
  Warn,
}

/// Tolerances and iteration limits of the constrained minimizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
  /// Nelder-Mead iteration cap per inner solve.
  pub max_iters: u64,
  /// Nelder-Mead termination threshold on the simplex cost spread.
  pub sd_tolerance: f64,
  /// Maximum absolute violation accepted for extra constraints.
  pub constraint_tolerance: f64,
  /// Augmented-Lagrangian outer iterations.
  pub outer_iters: usize,
  /// Initial quadratic penalty weight.
  pub initial_penalty: f64,
  /// Penalty growth factor between outer iterations.
  pub penalty_growth: f64,
  /// Outer iterations stop once a round leaves more than this fraction of the
  /// previous violation.
  pub stall_ratio: f64,
  /// Extra inner solves restarted from the incumbent with a fresh simplex.
  pub restarts: usize,
  /// Non-convergence handling.
  pub policy: ConvergencePolicy,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 5000,
      sd_tolerance: 1e-12,
      constraint_tolerance: 1e-6,
      outer_iters: 8,
      initial_penalty: 10.0,
      penalty_growth: 10.0,
      stall_ratio: 0.9,
      restarts: 1,
      policy: ConvergencePolicy::Warn,
    }
  }
}

/// Upper end of the target-return sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SweepUpperBound {
  /// Fixed annualized return, independent of what the assets can reach.
  Fixed(f64),
  /// Highest annualized return of a single asset, the long-only maximum.
  MaxAssetReturn,
}

impl Default for SweepUpperBound {
  fn default() -> Self {
    Self::Fixed(SWEEP_CEILING)
  }
}

/// Frontier and scatter settings for a single request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontierConfig {
  /// Risk-free rate used in Sharpe ratios.
  pub risk_free_rate: f64,
  /// Upper end of the target-return sweep.
  pub upper_bound: SweepUpperBound,
  /// Seed for random portfolios; `None` draws one from the thread RNG.
  pub seed: Option<u64>,
  pub annualization: AnnualizationConfig,
  pub solver: SolverConfig,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.0,
      upper_bound: SweepUpperBound::default(),
      seed: None,
      annualization: AnnualizationConfig::default(),
      solver: SolverConfig::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_reproduce_daily_conventions() {
    let cfg = FrontierConfig::default();

    assert_eq!(cfg.annualization.periods_per_year, 252.0);
    assert_eq!(cfg.annualization.risk_scale, 0.5);
    assert_eq!(cfg.upper_bound, SweepUpperBound::Fixed(1.0));
    assert_eq!(cfg.solver.policy, ConvergencePolicy::Warn);
  }

  #[test]
  fn rejects_non_positive_periods() {
    let cfg = AnnualizationConfig {
      periods_per_year: 0.0,
      risk_scale: RISK_SCALE,
    };

    assert!(matches!(
      cfg.validate(),
      Err(PortfolioError::InvalidConfig(_))
    ));
  }
}
