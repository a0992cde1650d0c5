//! # Asset Statistics
//!
//! $$
//! \hat\mu_i=\frac1T\sum_t r_{t,i},\qquad
//! \hat\Sigma_{ij}=\frac1{T-1}\sum_t (r_{t,i}-\hat\mu_i)(r_{t,j}-\hat\mu_j)
//! $$
//!
//! Sample moments of per-period simple returns and their annualized
//! counterparts $(1+\hat\mu_i)^P-1$ and $\hat\sigma_i\sqrt P$.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;

use super::config::AnnualizationConfig;
use super::data::PriceTable;
use super::error::PortfolioError;
use super::error::Result;
use super::types::AssetPoint;
use super::types::AssetUniverse;
use super::types::MomentEstimates;

/// Minimum number of return observations (aligned price rows minus one) for
/// sample moments.
pub const MIN_OBSERVATIONS: usize = 2;

/// Per-asset summary of one price history.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetStatistics {
  pub assets: AssetUniverse,
  /// Per-period mean returns and sample covariance.
  pub moments: MomentEstimates,
  /// Pearson correlation matrix.
  pub corr: Array2<f64>,
  /// Per-period sample standard deviation.
  pub std: Array1<f64>,
  /// Compounded annual return `(1 + mean)^P - 1`.
  pub annualized_return: Array1<f64>,
  /// `std * sqrt(P)`.
  pub annualized_risk: Array1<f64>,
  /// Number of return observations used.
  pub observations: usize,
}

impl AssetStatistics {
  pub fn mean_return(&self) -> &Array1<f64> {
    &self.moments.mean_return
  }

  pub fn cov(&self) -> &Array2<f64> {
    &self.moments.cov
  }

  /// Stand-alone annualized risk/return of each asset.
  pub fn asset_points(&self) -> Vec<AssetPoint> {
    self
      .assets
      .iter()
      .zip(self.annualized_return.iter().zip(self.annualized_risk.iter()))
      .map(|(asset, (&ret, &risk))| AssetPoint {
        asset: asset.to_string(),
        annualized_return: ret,
        annualized_risk: risk,
        return_to_risk: if risk > 1e-15 { ret / risk } else { 0.0 },
      })
      .collect()
  }
}

/// Estimate moments from a price table after inner-join alignment.
pub fn compute_statistics(
  prices: &PriceTable,
  annualization: &AnnualizationConfig,
) -> Result<AssetStatistics> {
  compute_statistics_from_returns(prices.assets(), &prices.returns(), annualization)
}

/// Estimate moments from an aligned `observations x assets` return matrix.
pub fn compute_statistics_from_returns(
  assets: &AssetUniverse,
  returns: &Array2<f64>,
  annualization: &AnnualizationConfig,
) -> Result<AssetStatistics> {
  annualization.validate()?;

  let n = returns.ncols();
  if n == 0 || assets.is_empty() {
    return Err(PortfolioError::EmptyUniverse);
  }
  if n != assets.len() {
    return Err(PortfolioError::DimensionMismatch {
      expected: assets.len(),
      actual: n,
    });
  }

  let observations = returns.nrows();
  let insufficient = PortfolioError::InsufficientData {
    required: MIN_OBSERVATIONS,
    actual: observations,
  };
  if observations < MIN_OBSERVATIONS {
    return Err(insufficient);
  }

  let mean_return = returns
    .mean_axis(Axis(0))
    .ok_or_else(|| insufficient.clone())?;

  // ndarray-stats expects one random variable per row.
  let by_asset = returns.t();
  let cov = by_asset.cov(1.0).map_err(|_| insufficient.clone())?;
  let corr = by_asset
    .pearson_correlation()
    .map_err(|_| insufficient.clone())?;

  let std = cov.diag().mapv(|v| v.max(0.0).sqrt());
  let periods = annualization.periods_per_year;
  let annualized_return = mean_return.mapv(|m| (1.0 + m).powf(periods) - 1.0);
  let annualized_risk = std.mapv(|s| s * periods.sqrt());

  debug!(assets = n, observations, "computed asset statistics");

  Ok(AssetStatistics {
    assets: assets.clone(),
    moments: MomentEstimates::new(mean_return, cov)?,
    corr,
    std,
    annualized_return,
    annualized_risk,
    observations,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;
  use rand::Rng;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use rand_distr::Distribution;
  use rand_distr::StandardNormal;

  use super::*;

  fn two_asset_table() -> PriceTable {
    let assets = AssetUniverse::new(["A", "B"]).unwrap();
    let dates = (1..=4)
      .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
      .collect();
    let prices = Array2::from_shape_vec(
      (4, 2),
      vec![100.0, 100.0, 101.0, 99.0, 102.0, 98.0, 103.0, 97.0],
    )
    .unwrap();
    PriceTable::new(assets, dates, prices).unwrap()
  }

  #[test]
  fn two_asset_scenario_means() {
    let stats = compute_statistics(&two_asset_table(), &AnnualizationConfig::default()).unwrap();

    assert_eq!(stats.observations, 3);
    assert_abs_diff_eq!(stats.mean_return()[0], 0.00990, epsilon = 1e-5);
    assert_abs_diff_eq!(stats.mean_return()[1], -0.01010, epsilon = 1e-5);
    assert!(stats.std[0] < stats.std[1]);
    assert_abs_diff_eq!(stats.corr[[0, 0]], 1.0, epsilon = 1e-12);
  }

  #[test]
  fn annualization_compounds_mean_and_scales_std() {
    let stats = compute_statistics(&two_asset_table(), &AnnualizationConfig::default()).unwrap();
    let m = stats.mean_return()[0];

    assert_abs_diff_eq!(
      stats.annualized_return[0],
      (1.0 + m).powf(252.0) - 1.0,
      epsilon = 1e-12
    );
    assert_abs_diff_eq!(
      stats.annualized_risk[0],
      stats.std[0] * 252f64.sqrt(),
      epsilon = 1e-15
    );

    let weekly = AnnualizationConfig {
      periods_per_year: 52.0,
      ..AnnualizationConfig::default()
    };
    let stats = compute_statistics(&two_asset_table(), &weekly).unwrap();
    assert_abs_diff_eq!(
      stats.annualized_return[0],
      (1.0 + m).powf(52.0) - 1.0,
      epsilon = 1e-12
    );
  }

  #[test]
  fn variance_uses_unbiased_denominator() {
    let assets = AssetUniverse::new(["X"]).unwrap();
    let returns = Array2::from_shape_vec((3, 1), vec![0.01, 0.02, 0.03]).unwrap();
    let stats =
      compute_statistics_from_returns(&assets, &returns, &AnnualizationConfig::default()).unwrap();

    assert_abs_diff_eq!(stats.cov()[[0, 0]], 1e-4, epsilon = 1e-15);
    assert_abs_diff_eq!(stats.std[0], 0.01, epsilon = 1e-15);
  }

  #[test]
  fn too_few_rows_is_insufficient_data() {
    let assets = AssetUniverse::new(["A", "B"]).unwrap();
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let prices = Array2::from_shape_vec((2, 2), vec![100.0, 50.0, f64::NAN, 51.0]).unwrap();
    let table = PriceTable::new(assets, vec![day(1), day(2)], prices).unwrap();

    assert_eq!(
      compute_statistics(&table, &AnnualizationConfig::default()),
      Err(PortfolioError::InsufficientData {
        required: MIN_OBSERVATIONS,
        actual: 0
      })
    );
  }

  #[test]
  fn insufficient_data_counts_return_rows() {
    let assets = AssetUniverse::new(["A"]).unwrap();
    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let prices = Array2::from_shape_vec((2, 1), vec![100.0, 101.0]).unwrap();
    let table = PriceTable::new(assets, vec![day(1), day(2)], prices).unwrap();
    let err = compute_statistics(&table, &AnnualizationConfig::default()).unwrap_err();

    assert_eq!(
      err,
      PortfolioError::InsufficientData {
        required: MIN_OBSERVATIONS,
        actual: 1
      }
    );
    assert_eq!(
      err.to_string(),
      "insufficient data: need at least 2 return observations, got 1"
    );
  }

  #[test]
  fn asset_points_report_return_to_risk() {
    let stats = compute_statistics(&two_asset_table(), &AnnualizationConfig::default()).unwrap();
    let points = stats.asset_points();

    assert_eq!(points.len(), 2);
    assert_eq!(points[1].asset, "B");
    assert_abs_diff_eq!(
      points[0].return_to_risk,
      points[0].annualized_return / points[0].annualized_risk,
      epsilon = 1e-12
    );
  }

  #[test]
  fn covariance_is_symmetric_psd_for_random_histories() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
      let n_assets = rng.gen_range(2..6);
      let n_days = rng.gen_range(5..60);
      let assets = AssetUniverse::new((0..n_assets).map(|i| format!("S{i}"))).unwrap();

      let mut prices = Array2::<f64>::zeros((n_days, n_assets));
      for j in 0..n_assets {
        let mut p = rng.gen_range(10.0..200.0);
        let vol = rng.gen_range(0.005..0.05);
        for t in 0..n_days {
          let z: f64 = StandardNormal.sample(&mut rng);
          p *= (vol * z).exp();
          prices[[t, j]] = p;
        }
      }
      let dates = (0..n_days as i64)
        .map(|d| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(d as u64))
        .collect();
      let table = PriceTable::new(assets, dates, prices).unwrap();
      let stats = compute_statistics(&table, &AnnualizationConfig::default()).unwrap();
      let cov = stats.cov();

      for i in 0..n_assets {
        assert!(cov[[i, i]] >= 0.0);
        for j in 0..n_assets {
          assert_abs_diff_eq!(cov[[i, j]], cov[[j, i]], epsilon = 1e-15);
        }
      }

      for _ in 0..50 {
        let x = Array1::from_iter((0..n_assets).map(|_| rng.gen_range(-1.0..1.0)));
        let quad = x.dot(&cov.dot(&x));
        assert!(quad >= -1e-14, "x'Σx = {quad}");
      }
    }
  }
}
