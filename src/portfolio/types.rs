//! # Portfolio Types
//!
//! $$
//! \mathbf{w}\in\Delta^{N-1}=\{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1\}
//! $$
//!
//! Asset universe, moment estimates, weights and the tables handed to the
//! presentation layer.

use std::collections::HashSet;
use std::fmt::Display;
use std::ops::Deref;

use ndarray::Array1;
use ndarray::Array2;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;

use super::error::PortfolioError;
use super::error::Result;

/// Tolerance on `sum(w) == 1` for valid weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Column headers appended after the asset columns of every result table.
pub const PERFORMANCE_COLUMNS: [&str; 3] = ["Return", "Std", "Sharpe Ratio"];

/// Ordered, duplicate-free list of asset identifiers.
///
/// Every vector and matrix in this crate is indexed positionally against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetUniverse {
  assets: Vec<String>,
}

impl AssetUniverse {
  pub fn new<I, S>(assets: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let assets: Vec<String> = assets.into_iter().map(Into::into).collect();
    if assets.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in &assets {
      if !seen.insert(asset.as_str()) {
        return Err(PortfolioError::DuplicateAsset(asset.clone()));
      }
    }

    Ok(Self { assets })
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.assets.iter().map(String::as_str)
  }

  pub fn as_slice(&self) -> &[String] {
    &self.assets
  }

  pub fn position(&self, asset: &str) -> Option<usize> {
    self.assets.iter().position(|a| a == asset)
  }
}

/// Per-period mean returns and their sample covariance matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct MomentEstimates {
  /// Arithmetic mean of per-period simple returns.
  pub mean_return: Array1<f64>,
  /// Sample covariance of per-period simple returns (`N - 1` denominator).
  pub cov: Array2<f64>,
}

impl MomentEstimates {
  pub fn new(mean_return: Array1<f64>, cov: Array2<f64>) -> Result<Self> {
    let n = mean_return.len();
    if n == 0 {
      return Err(PortfolioError::EmptyUniverse);
    }
    if cov.nrows() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: cov.nrows(),
      });
    }
    if cov.ncols() != n {
      return Err(PortfolioError::DimensionMismatch {
        expected: n,
        actual: cov.ncols(),
      });
    }

    Ok(Self { mean_return, cov })
  }

  /// Number of assets.
  pub fn dim(&self) -> usize {
    self.mean_return.len()
  }
}

/// Long-only, fully invested weight vector.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioWeights(Vec<f64>);

impl PortfolioWeights {
  pub fn new(weights: Vec<f64>) -> Result<Self> {
    if weights.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }
    if let Some(w) = weights
      .iter()
      .find(|w| !w.is_finite() || **w < 0.0 || **w > 1.0)
    {
      return Err(PortfolioError::InvalidWeights(format!(
        "weight {w} outside [0, 1]"
      )));
    }

    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
      return Err(PortfolioError::InvalidWeights(format!(
        "weights sum to {sum}, expected 1"
      )));
    }

    Ok(Self(weights))
  }

  /// Equal allocation `1/n`.
  pub fn uniform(n: usize) -> Result<Self> {
    if n == 0 {
      return Err(PortfolioError::EmptyUniverse);
    }
    Ok(Self(vec![1.0 / n as f64; n]))
  }

  pub fn as_slice(&self) -> &[f64] {
    &self.0
  }

  pub fn into_inner(self) -> Vec<f64> {
    self.0
  }

  /// Weights rounded to `decimals` places, for display.
  pub fn rounded(&self, decimals: i32) -> Vec<f64> {
    self.0.iter().map(|&w| round_to(w, decimals)).collect()
  }
}

impl Deref for PortfolioWeights {
  type Target = [f64];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

/// Annualized return and risk of a weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PortfolioPerformance {
  pub annualized_return: f64,
  pub annualized_risk: f64,
}

impl PortfolioPerformance {
  /// `(return - risk_free) / risk`, or `0.0` for a riskless portfolio.
  pub fn sharpe_ratio(&self, risk_free_rate: f64) -> f64 {
    if self.annualized_risk > 1e-15 {
      (self.annualized_return - risk_free_rate) / self.annualized_risk
    } else {
      0.0
    }
  }
}

/// One row of a frontier or random-portfolio table.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierPoint {
  pub weights: PortfolioWeights,
  pub performance: PortfolioPerformance,
  pub sharpe_ratio: f64,
  /// Return the point was solved for; `None` for randomly drawn portfolios.
  pub target_return: Option<f64>,
  /// Whether the solver met its tolerances; always `true` for random draws.
  pub converged: bool,
}

impl FrontierPoint {
  fn row(&self) -> Vec<f64> {
    let mut row = self.weights.to_vec();
    row.push(self.performance.annualized_return);
    row.push(self.performance.annualized_risk);
    row.push(self.sharpe_ratio);
    row
  }
}

/// Ordered sequence of [`FrontierPoint`] values over one asset universe.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierTable {
  pub assets: AssetUniverse,
  pub points: Vec<FrontierPoint>,
}

impl FrontierTable {
  /// `[asset...] + ["Return", "Std", "Sharpe Ratio"]`.
  pub fn columns(&self) -> Vec<String> {
    self
      .assets
      .iter()
      .map(str::to_string)
      .chain(PERFORMANCE_COLUMNS.iter().map(|c| c.to_string()))
      .collect()
  }

  /// Numeric rows matching [`FrontierTable::columns`].
  pub fn rows(&self) -> Vec<Vec<f64>> {
    self.points.iter().map(FrontierPoint::row).collect()
  }

  pub fn returns(&self) -> Vec<f64> {
    self
      .points
      .iter()
      .map(|p| p.performance.annualized_return)
      .collect()
  }

  pub fn risks(&self) -> Vec<f64> {
    self
      .points
      .iter()
      .map(|p| p.performance.annualized_risk)
      .collect()
  }

  pub fn sharpe_ratios(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.sharpe_ratio).collect()
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
      self.columns().iter().map(|c| Cell::new(c)).collect(),
    ));
    for row in self.rows() {
      table.add_row(Row::new(
        row.iter().map(|v| Cell::new(&format!("{v:.4}"))).collect(),
      ));
    }
    table
  }
}

/// Named portfolios of the optimal-points summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortfolioType {
  MaxSharpeRatio,
  MinVolatility,
}

impl Display for PortfolioType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PortfolioType::MaxSharpeRatio => write!(f, "Max Sharpe Ratio"),
      PortfolioType::MinVolatility => write!(f, "Min Volatility"),
    }
  }
}

/// Display row with values rounded to three decimals.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimalPointRow {
  pub portfolio_type: PortfolioType,
  pub weights: Vec<f64>,
  pub annualized_return: f64,
  pub annualized_risk: f64,
  pub sharpe_ratio: f64,
}

/// Two-row summary of the max-Sharpe and min-volatility portfolios.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimalPointsTable {
  pub assets: AssetUniverse,
  pub rows: Vec<OptimalPointRow>,
}

impl OptimalPointsTable {
  /// `["Portfolio Type", asset..., "Return", "Std", "Sharpe Ratio"]`.
  pub fn columns(&self) -> Vec<String> {
    std::iter::once("Portfolio Type".to_string())
      .chain(self.assets.iter().map(str::to_string))
      .chain(PERFORMANCE_COLUMNS.iter().map(|c| c.to_string()))
      .collect()
  }

  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
      self.columns().iter().map(|c| Cell::new(c)).collect(),
    ));
    for row in &self.rows {
      let mut cells = vec![Cell::new(&row.portfolio_type.to_string())];
      cells.extend(
        row
          .weights
          .iter()
          .chain([row.annualized_return, row.annualized_risk, row.sharpe_ratio].iter())
          .map(|v| Cell::new(&format!("{v:.3}"))),
      );
      table.add_row(Row::new(cells));
    }
    table
  }
}

/// Stand-alone risk/return of a single asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPoint {
  pub asset: String,
  pub annualized_return: f64,
  pub annualized_risk: f64,
  /// `annualized_return / annualized_risk`, `0.0` for a riskless asset.
  pub return_to_risk: f64,
}

pub(crate) fn round_to(x: f64, decimals: i32) -> f64 {
  let scale = 10f64.powi(decimals);
  (x * scale).round() / scale
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn universe_rejects_duplicates_and_empty() {
    assert_eq!(
      AssetUniverse::new(Vec::<String>::new()),
      Err(PortfolioError::EmptyUniverse)
    );
    assert_eq!(
      AssetUniverse::new(["AAA", "BBB", "AAA"]),
      Err(PortfolioError::DuplicateAsset("AAA".to_string()))
    );

    let universe = AssetUniverse::new(["AAA", "BBB"]).unwrap();
    assert_eq!(universe.position("BBB"), Some(1));
  }

  #[test]
  fn weights_validate_simplex() {
    assert!(PortfolioWeights::new(vec![0.25, 0.75]).is_ok());
    assert!(PortfolioWeights::new(vec![0.5, 0.6]).is_err());
    assert!(PortfolioWeights::new(vec![-0.1, 1.1]).is_err());
    assert!(PortfolioWeights::new(vec![f64::NAN, 1.0]).is_err());
  }

  #[test]
  fn moments_reject_non_square_covariance() {
    let err = MomentEstimates::new(Array1::zeros(3), Array2::zeros((3, 2))).unwrap_err();
    assert_eq!(
      err,
      PortfolioError::DimensionMismatch {
        expected: 3,
        actual: 2
      }
    );
  }

  #[test]
  fn sharpe_ratio_is_zero_for_riskless_portfolio() {
    let perf = PortfolioPerformance {
      annualized_return: 0.1,
      annualized_risk: 0.0,
    };
    assert_eq!(perf.sharpe_ratio(0.0), 0.0);
  }

  #[test]
  fn frontier_table_columns_follow_universe_order() {
    let assets = AssetUniverse::new(["AAA", "BBB"]).unwrap();
    let table = FrontierTable {
      assets,
      points: vec![FrontierPoint {
        weights: PortfolioWeights::new(vec![0.4, 0.6]).unwrap(),
        performance: PortfolioPerformance {
          annualized_return: 0.1,
          annualized_risk: 0.2,
        },
        sharpe_ratio: 0.5,
        target_return: Some(0.1),
        converged: true,
      }],
    };

    assert_eq!(
      table.columns(),
      vec!["AAA", "BBB", "Return", "Std", "Sharpe Ratio"]
    );
    assert_eq!(table.rows(), vec![vec![0.4, 0.6, 0.1, 0.2, 0.5]]);
  }
}
