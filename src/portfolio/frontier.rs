//! # Efficient Frontier
//!
//! $$
//! \sigma^\*(\mu^\star)=\min_{\mathbf{w}\in\Delta^{N-1}}\sigma_p(\mathbf{w})
//! \quad\text{s.t.}\quad \mu_p(\mathbf{w})=\mu^\star,\qquad
//! \mu^\star\in[\mu_{\min\sigma},\ \bar\mu]
//! $$
//!
//! Target-return sweep between the minimum-variance return and the sweep
//! ceiling $\bar\mu$, a Dirichlet(1) scatter of feasible portfolios and the
//! optimal-points summary.

use ndarray::Array1;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Dirichlet;
use rand_distr::Distribution;
use rayon::prelude::*;
use tracing::debug;
use tracing::info;

use super::cancel::CancellationToken;
use super::config::FrontierConfig;
use super::config::SweepUpperBound;
use super::error::PortfolioError;
use super::error::Result;
use super::optimizers::ConstrainedOptimizer;
use super::optimizers::OptimizationOutcome;
use super::performance::PerformanceEvaluator;
use super::types::AssetUniverse;
use super::types::FrontierPoint;
use super::types::FrontierTable;
use super::types::MomentEstimates;
use super::types::OptimalPointRow;
use super::types::OptimalPointsTable;
use super::types::PortfolioType;
use super::types::PortfolioWeights;
use super::types::round_to;

/// Decimals kept in the optimal-points summary.
const SUMMARY_DECIMALS: i32 = 3;

impl FrontierPoint {
  /// Frontier row for a solved portfolio, Sharpe measured against `risk_free_rate`.
  pub fn from_outcome(outcome: &OptimizationOutcome, risk_free_rate: f64) -> Self {
    Self {
      weights: outcome.weights.clone(),
      performance: outcome.performance,
      sharpe_ratio: outcome.performance.sharpe_ratio(risk_free_rate),
      target_return: None,
      converged: outcome.converged,
    }
  }
}

/// Drives the optimizer over one asset universe and its moment estimates.
#[derive(Clone, Debug)]
pub struct FrontierBuilder<'a> {
  assets: &'a AssetUniverse,
  moments: &'a MomentEstimates,
  config: FrontierConfig,
  cancel: CancellationToken,
}

impl<'a> FrontierBuilder<'a> {
  pub fn new(
    assets: &'a AssetUniverse,
    moments: &'a MomentEstimates,
    config: FrontierConfig,
  ) -> Result<Self> {
    if assets.len() != moments.dim() {
      return Err(PortfolioError::DimensionMismatch {
        expected: assets.len(),
        actual: moments.dim(),
      });
    }
    config.annualization.validate()?;

    Ok(Self {
      assets,
      moments,
      config,
      cancel: CancellationToken::new(),
    })
  }

  /// Check `token` before every sweep solve and random draw.
  pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
    self.cancel = token;
    self
  }

  pub fn config(&self) -> &FrontierConfig {
    &self.config
  }

  fn optimizer(&self) -> ConstrainedOptimizer<'a> {
    ConstrainedOptimizer::new(self.moments, self.config.annualization, self.config.solver)
  }

  pub fn max_sharpe_ratio(&self) -> Result<OptimizationOutcome> {
    self.cancel.check()?;
    self.optimizer().max_sharpe_ratio(self.config.risk_free_rate)
  }

  pub fn min_variance(&self) -> Result<OptimizationOutcome> {
    self.cancel.check()?;
    self.optimizer().min_variance()
  }

  /// Annualized return at the top of the sweep.
  pub fn sweep_ceiling(&self) -> f64 {
    match self.config.upper_bound {
      SweepUpperBound::Fixed(ceiling) => ceiling,
      SweepUpperBound::MaxAssetReturn => {
        let periods = self.config.annualization.periods_per_year;
        self
          .moments
          .mean_return
          .iter()
          .map(|m| periods * m)
          .fold(f64::NEG_INFINITY, f64::max)
      }
    }
  }

  /// `num_points` evenly spaced targets, ascending, between `floor` and the ceiling.
  pub fn target_returns(&self, floor: f64, num_points: usize) -> Vec<f64> {
    let ceiling = self.sweep_ceiling();
    let (lo, hi) = if floor <= ceiling {
      (floor, ceiling)
    } else {
      (ceiling, floor)
    };
    Array1::linspace(lo, hi, num_points).to_vec()
  }

  /// Solve both anchors, then sweep from the min-variance return.
  pub fn build_frontier(&self, num_points: usize) -> Result<FrontierTable> {
    let max_sharpe = self.max_sharpe_ratio()?;
    let min_variance = self.min_variance()?;
    debug!(
      max_sharpe = max_sharpe.objective_value,
      min_risk = min_variance.performance.annualized_risk,
      "frontier anchors solved"
    );

    self.sweep(&min_variance, num_points)
  }

  /// Target-return sweep anchored at an already solved min-variance portfolio.
  pub fn sweep(
    &self,
    min_variance: &OptimizationOutcome,
    num_points: usize,
  ) -> Result<FrontierTable> {
    let targets = self.target_returns(min_variance.performance.annualized_return, num_points);
    let optimizer = self.optimizer();
    let rf = self.config.risk_free_rate;

    let points = targets
      .into_par_iter()
      .map(|target| -> Result<FrontierPoint> {
        self.cancel.check()?;
        let outcome = optimizer.target_return_variance(target)?;
        Ok(FrontierPoint {
          target_return: Some(target),
          ..FrontierPoint::from_outcome(&outcome, rf)
        })
      })
      .collect::<Result<Vec<_>>>()?;

    let unconverged = points.iter().filter(|p| !p.converged).count();
    info!(points = points.len(), unconverged, "frontier sweep finished");

    Ok(FrontierTable {
      assets: self.assets.clone(),
      points,
    })
  }

  /// `count` long-only portfolios drawn from a symmetric Dirichlet(1).
  ///
  /// Draw `i` uses its own generator seeded from the base seed and `i`, so a
  /// fixed [`FrontierConfig::seed`] reproduces the scatter regardless of
  /// thread scheduling.
  pub fn random_portfolios(&self, count: usize) -> Result<FrontierTable> {
    let n = self.assets.len();
    // rand_distr requires at least two concentration parameters.
    let dirichlet = if n > 1 {
      Some(
        Dirichlet::new(&vec![1.0; n])
          .map_err(|err| PortfolioError::Sampling(format!("{err:?}")))?,
      )
    } else {
      None
    };
    let base_seed = self
      .config
      .seed
      .unwrap_or_else(|| rand::thread_rng().gen());
    let evaluator = PerformanceEvaluator::new(self.moments, self.config.annualization);
    let rf = self.config.risk_free_rate;

    let points = (0..count)
      .into_par_iter()
      .map(|idx| -> Result<FrontierPoint> {
        self.cancel.check()?;
        let mut rng = StdRng::seed_from_u64(draw_seed(base_seed, idx));
        let weights = match &dirichlet {
          Some(dirichlet) => dirichlet.sample(&mut rng),
          None => vec![1.0],
        };
        let performance = evaluator.evaluate_unchecked(&weights);

        Ok(FrontierPoint {
          weights: PortfolioWeights::new(weights)?,
          performance,
          sharpe_ratio: performance.sharpe_ratio(rf),
          target_return: None,
          converged: true,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    debug!(count, base_seed, "random portfolios drawn");

    Ok(FrontierTable {
      assets: self.assets.clone(),
      points,
    })
  }
}

fn draw_seed(base: u64, idx: usize) -> u64 {
  base.wrapping_add(0x9E37_79B9_7F4A_7C15_u64.wrapping_mul((idx as u64).wrapping_add(1)))
}

/// Frontier with default settings and the given risk-free rate.
pub fn build_frontier(
  assets: &AssetUniverse,
  moments: &MomentEstimates,
  num_points: usize,
  risk_free_rate: f64,
) -> Result<FrontierTable> {
  let config = FrontierConfig {
    risk_free_rate,
    ..FrontierConfig::default()
  };
  FrontierBuilder::new(assets, moments, config)?.build_frontier(num_points)
}

/// Unseeded random scatter with default settings.
pub fn build_random_portfolios(
  assets: &AssetUniverse,
  moments: &MomentEstimates,
  count: usize,
  risk_free_rate: f64,
) -> Result<FrontierTable> {
  let config = FrontierConfig {
    risk_free_rate,
    ..FrontierConfig::default()
  };
  FrontierBuilder::new(assets, moments, config)?.random_portfolios(count)
}

/// Two-row display table of the max-Sharpe and min-volatility portfolios.
///
/// The Sharpe column is the plain `return / std` ratio with no risk-free
/// rate, `0.0` for a riskless portfolio. Values are rounded to three decimals,
/// so rounded weights of `n` assets re-sum to one only within `n * 0.0005`.
pub fn summarize_optimal_points(
  assets: &AssetUniverse,
  max_sharpe: &FrontierPoint,
  min_variance: &FrontierPoint,
) -> Result<OptimalPointsTable> {
  let rows = [
    (PortfolioType::MaxSharpeRatio, max_sharpe),
    (PortfolioType::MinVolatility, min_variance),
  ]
  .into_iter()
  .map(|(portfolio_type, point)| -> Result<OptimalPointRow> {
    if point.weights.len() != assets.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: assets.len(),
        actual: point.weights.len(),
      });
    }

    Ok(OptimalPointRow {
      portfolio_type,
      weights: point.weights.rounded(SUMMARY_DECIMALS),
      annualized_return: round_to(point.performance.annualized_return, SUMMARY_DECIMALS),
      annualized_risk: round_to(point.performance.annualized_risk, SUMMARY_DECIMALS),
      sharpe_ratio: round_to(point.performance.sharpe_ratio(0.0), SUMMARY_DECIMALS),
    })
  })
  .collect::<Result<Vec<_>>>()?;

  Ok(OptimalPointsTable {
    assets: assets.clone(),
    rows,
  })
}
