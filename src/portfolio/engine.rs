//! # Portfolio Engine
//!
//! $$
//! \text{prices}\to(\hat\mu,\hat\Sigma)\to\{\mathbf{w}_{\max SR},\mathbf{w}_{\min\sigma}\}
//! \to\text{frontier}
//! $$
//!
//! One-call orchestration of a full efficient-frontier request.

use tracing::info;

use super::cancel::CancellationToken;
use super::config::FrontierConfig;
use super::data::PriceTable;
use super::error::Result;
use super::frontier::FrontierBuilder;
use super::frontier::summarize_optimal_points;
use super::statistics::AssetStatistics;
use super::statistics::compute_statistics;
use super::types::AssetPoint;
use super::types::FrontierPoint;
use super::types::FrontierTable;
use super::types::OptimalPointsTable;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PortfolioEngineConfig {
  pub frontier: FrontierConfig,
  /// Targets in the frontier sweep.
  pub frontier_points: usize,
  /// Dirichlet draws in the random scatter; `0` skips it.
  pub random_portfolios: usize,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      frontier: FrontierConfig::default(),
      frontier_points: 500,
      random_portfolios: 2000,
    }
  }
}

/// Everything a frontier view needs for one price history.
#[derive(Clone, Debug, PartialEq)]
pub struct EfficientFrontierReport {
  pub statistics: AssetStatistics,
  pub max_sharpe: FrontierPoint,
  pub min_variance: FrontierPoint,
  pub frontier: FrontierTable,
  pub random_portfolios: FrontierTable,
  pub optimal_points: OptimalPointsTable,
  pub asset_points: Vec<AssetPoint>,
}

/// Single entry point from a price table to an [`EfficientFrontierReport`].
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  pub fn run(&self, prices: &PriceTable) -> Result<EfficientFrontierReport> {
    self.run_with_cancellation(prices, CancellationToken::new())
  }

  /// Like [`PortfolioEngine::run`], aborting with `Cancelled` once `token` fires.
  pub fn run_with_cancellation(
    &self,
    prices: &PriceTable,
    token: CancellationToken,
  ) -> Result<EfficientFrontierReport> {
    token.check()?;
    let statistics = compute_statistics(prices, &self.config.frontier.annualization)?;
    self.analyze(statistics, token)
  }

  /// Run the optimization stages on precomputed statistics.
  pub fn analyze(
    &self,
    statistics: AssetStatistics,
    token: CancellationToken,
  ) -> Result<EfficientFrontierReport> {
    let frontier_config = self.config.frontier;
    let rf = frontier_config.risk_free_rate;
    let builder = FrontierBuilder::new(&statistics.assets, &statistics.moments, frontier_config)?
      .with_cancellation(token);

    let max_sharpe = builder.max_sharpe_ratio()?;
    let min_variance = builder.min_variance()?;
    info!(
      sharpe = max_sharpe.objective_value,
      min_risk = min_variance.performance.annualized_risk,
      "anchor portfolios solved"
    );

    let frontier = builder.sweep(&min_variance, self.config.frontier_points)?;
    let random_portfolios = builder.random_portfolios(self.config.random_portfolios)?;

    let max_sharpe = FrontierPoint::from_outcome(&max_sharpe, rf);
    let min_variance = FrontierPoint::from_outcome(&min_variance, rf);
    let optimal_points = summarize_optimal_points(&statistics.assets, &max_sharpe, &min_variance)?;
    let asset_points = statistics.asset_points();

    Ok(EfficientFrontierReport {
      statistics,
      max_sharpe,
      min_variance,
      frontier,
      random_portfolios,
      optimal_points,
      asset_points,
    })
  }
}
