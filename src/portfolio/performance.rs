//! # Portfolio Performance
//!
//! $$
//! \mu_p=P\sum_i w_i\mu_i,\qquad
//! \sigma_p=k\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}\,\sqrt P
//! $$
//!
//! Annualized return and risk of an arbitrary weight vector. `k` is
//! [`AnnualizationConfig::risk_scale`](super::config::AnnualizationConfig).

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;

use super::config::AnnualizationConfig;
use super::error::PortfolioError;
use super::error::Result;
use super::types::MomentEstimates;
use super::types::PortfolioPerformance;

/// Annualized performance of `weights` against per-period moments.
///
/// Weights are not required to be long-only or to sum to one.
pub fn portfolio_performance(
  weights: &[f64],
  mean_return: &Array1<f64>,
  cov: &Array2<f64>,
  annualization: &AnnualizationConfig,
) -> Result<PortfolioPerformance> {
  let n = mean_return.len();
  for actual in [weights.len(), cov.nrows(), cov.ncols()] {
    if actual != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual,
      });
    }
  }

  Ok(performance_unchecked(weights, mean_return, cov, annualization))
}

pub(crate) fn performance_unchecked(
  weights: &[f64],
  mean_return: &Array1<f64>,
  cov: &Array2<f64>,
  annualization: &AnnualizationConfig,
) -> PortfolioPerformance {
  let w = ArrayView1::from(weights);
  let periods = annualization.periods_per_year;
  let variance = w.dot(&cov.dot(&w));

  PortfolioPerformance {
    annualized_return: periods * mean_return.dot(&w),
    annualized_risk: annualization.risk_scale * variance.max(0.0).sqrt() * periods.sqrt(),
  }
}

/// Evaluator bound to one set of moment estimates.
#[derive(Clone, Copy, Debug)]
pub struct PerformanceEvaluator<'a> {
  moments: &'a MomentEstimates,
  annualization: AnnualizationConfig,
}

impl<'a> PerformanceEvaluator<'a> {
  pub fn new(moments: &'a MomentEstimates, annualization: AnnualizationConfig) -> Self {
    Self {
      moments,
      annualization,
    }
  }

  pub fn evaluate(&self, weights: &[f64]) -> Result<PortfolioPerformance> {
    portfolio_performance(
      weights,
      &self.moments.mean_return,
      &self.moments.cov,
      &self.annualization,
    )
  }

  pub(crate) fn evaluate_unchecked(&self, weights: &[f64]) -> PortfolioPerformance {
    performance_unchecked(
      weights,
      &self.moments.mean_return,
      &self.moments.cov,
      &self.annualization,
    )
  }

  pub fn moments(&self) -> &'a MomentEstimates {
    self.moments
  }

  pub fn annualization(&self) -> &AnnualizationConfig {
    &self.annualization
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn moments() -> MomentEstimates {
    MomentEstimates::new(
      array![0.0004, 0.0002, 0.0006],
      array![
        [0.0004, 0.0001, 0.0],
        [0.0001, 0.0009, 0.0002],
        [0.0, 0.0002, 0.0016]
      ],
    )
    .unwrap()
  }

  #[test]
  fn single_asset_weight_matches_asset_annualization() {
    let m = moments();
    let eval = PerformanceEvaluator::new(&m, AnnualizationConfig::default());

    for i in 0..3 {
      let mut w = vec![0.0; 3];
      w[i] = 1.0;
      let perf = eval.evaluate(&w).unwrap();

      assert_abs_diff_eq!(
        perf.annualized_return,
        252.0 * m.mean_return[i],
        epsilon = 1e-15
      );
      assert_abs_diff_eq!(
        perf.annualized_risk,
        0.5 * m.cov[[i, i]].sqrt() * 252f64.sqrt(),
        epsilon = 1e-15
      );
    }
  }

  #[test]
  fn risk_scale_is_configurable() {
    let m = moments();
    let w = [0.2, 0.3, 0.5];
    let half = portfolio_performance(&w, &m.mean_return, &m.cov, &AnnualizationConfig::default())
      .unwrap();
    let full = portfolio_performance(
      &w,
      &m.mean_return,
      &m.cov,
      &AnnualizationConfig {
        risk_scale: 1.0,
        ..AnnualizationConfig::default()
      },
    )
    .unwrap();

    assert_abs_diff_eq!(full.annualized_risk, 2.0 * half.annualized_risk, epsilon = 1e-15);
    assert_eq!(full.annualized_return, half.annualized_return);
  }

  #[test]
  fn accepts_unnormalized_and_short_weights() {
    let m = moments();
    let eval = PerformanceEvaluator::new(&m, AnnualizationConfig::default());
    let perf = eval.evaluate(&[1.5, -0.25, -0.25]).unwrap();

    assert_abs_diff_eq!(
      perf.annualized_return,
      252.0 * (1.5 * 0.0004 - 0.25 * 0.0002 - 0.25 * 0.0006),
      epsilon = 1e-15
    );
    assert!(perf.annualized_risk > 0.0);
  }

  #[test]
  fn wrong_length_is_dimension_mismatch() {
    let m = moments();
    let eval = PerformanceEvaluator::new(&m, AnnualizationConfig::default());

    assert_eq!(
      eval.evaluate(&[0.5, 0.5]),
      Err(PortfolioError::DimensionMismatch {
        expected: 3,
        actual: 2
      })
    );
  }
}
