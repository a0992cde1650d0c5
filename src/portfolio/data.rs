//! # Portfolio Data Utilities
//!
//! $$
//! r_t=\frac{p_t}{p_{t-1}}-1
//! $$
//!
//! Date-indexed price tables, inner-join alignment and simple-return series.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::Axis;
use polars::prelude::CsvReadOptions;
use polars::prelude::SerReader;
use tracing::debug;

use super::error::PortfolioError;
use super::error::Result;
use super::statistics::MIN_OBSERVATIONS;
use super::types::AssetUniverse;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_COLUMN: &str = "Date";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Convert a price sequence to simple returns, dropping the first period.
pub fn simple_returns_series(prices: &[f64]) -> Vec<f64> {
  prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Adjusted close prices, one row per date and one column per asset.
///
/// Missing observations are stored as `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceTable {
  assets: AssetUniverse,
  dates: Vec<NaiveDate>,
  prices: Array2<f64>,
}

impl PriceTable {
  /// Build a table from a `dates x assets` price matrix. Rows are sorted by date.
  pub fn new(assets: AssetUniverse, dates: Vec<NaiveDate>, prices: Array2<f64>) -> Result<Self> {
    if prices.ncols() != assets.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: assets.len(),
        actual: prices.ncols(),
      });
    }
    if prices.nrows() != dates.len() {
      return Err(PortfolioError::DimensionMismatch {
        expected: dates.len(),
        actual: prices.nrows(),
      });
    }

    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| dates[i]);
    if let Some(pair) = order.windows(2).find(|p| dates[p[0]] == dates[p[1]]) {
      return Err(PortfolioError::Parse(format!(
        "duplicate date {}",
        dates[pair[0]]
      )));
    }

    let dates = order.iter().map(|&i| dates[i]).collect();
    let prices = prices.select(Axis(0), &order);

    Ok(Self {
      assets,
      dates,
      prices,
    })
  }

  /// Build a table from `(date, asset, price)` observations.
  ///
  /// Dates missing for some asset are left as `NaN` and removed by
  /// [`PriceTable::aligned`].
  pub fn from_observations<I, S>(assets: AssetUniverse, observations: I) -> Result<Self>
  where
    I: IntoIterator<Item = (NaiveDate, S, f64)>,
    S: AsRef<str>,
  {
    let n = assets.len();
    let mut rows: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

    for (date, asset, price) in observations {
      let asset = asset.as_ref();
      let col = assets
        .position(asset)
        .ok_or_else(|| PortfolioError::Parse(format!("unknown asset `{asset}`")))?;
      rows.entry(date).or_insert_with(|| vec![f64::NAN; n])[col] = price;
    }

    let dates: Vec<NaiveDate> = rows.keys().copied().collect();
    let flat: Vec<f64> = rows.into_values().flatten().collect();
    let prices = Array2::from_shape_vec((dates.len(), n), flat)
      .map_err(|err| PortfolioError::Parse(err.to_string()))?;

    Self::new(assets, dates, prices)
  }

  /// Parse a CSV table with a `Date,<asset>,...` header and ISO dates.
  ///
  /// Quoted fields and a UTF-8 byte-order mark are accepted. Empty cells,
  /// `NaN` and `null` are read as missing observations.
  pub fn from_csv<R: Read>(mut reader: R) -> Result<Self> {
    let mut bytes = Vec::new();
    reader
      .read_to_end(&mut bytes)
      .map_err(|err| PortfolioError::Parse(err.to_string()))?;
    if bytes.starts_with(UTF8_BOM) {
      bytes.drain(..UTF8_BOM.len());
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Err(PortfolioError::InsufficientData {
        required: MIN_OBSERVATIONS,
        actual: 0,
      });
    }

    // Every column is read as text; dates and prices are parsed here.
    let frame = CsvReadOptions::default()
      .with_has_header(true)
      .with_infer_schema_length(Some(0))
      .into_reader_with_file_handle(Cursor::new(bytes))
      .finish()
      .map_err(|err| PortfolioError::Parse(err.to_string()))?;

    let columns = frame.get_columns();
    let (date_column, price_columns) = columns
      .split_first()
      .ok_or_else(|| PortfolioError::Parse("missing header".to_string()))?;
    let date_header = date_column.name().to_string();
    if !date_header.trim().eq_ignore_ascii_case(DATE_COLUMN) {
      return Err(PortfolioError::Parse(format!(
        "first column must be `{DATE_COLUMN}`, found `{}`",
        date_header.trim()
      )));
    }

    let assets = AssetUniverse::new(price_columns.iter().map(|c| c.name().trim().to_string()))?;
    let n = assets.len();
    let n_rows = frame.height();

    let dates = date_column
      .str()
      .map_err(|err| PortfolioError::Parse(err.to_string()))?
      .into_iter()
      .enumerate()
      .map(|(row, cell)| {
        let cell = cell.unwrap_or_default().trim();
        NaiveDate::parse_from_str(cell, DATE_FORMAT)
          .map_err(|err| PortfolioError::Parse(format!("row {}: `{cell}`: {err}", row + 1)))
      })
      .collect::<Result<Vec<_>>>()?;

    let mut prices = Array2::from_elem((n_rows, n), f64::NAN);
    for (col, column) in price_columns.iter().enumerate() {
      let cells = column
        .str()
        .map_err(|err| PortfolioError::Parse(err.to_string()))?;
      for (row, cell) in cells.into_iter().enumerate() {
        prices[[row, col]] = parse_price(cell.unwrap_or_default().trim())
          .map_err(|msg| PortfolioError::Parse(format!("row {}: {msg}", row + 1)))?;
      }
    }

    Self::new(assets, dates, prices)
  }

  /// [`PriceTable::from_csv`] on a file.
  pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
    let file = File::open(path.as_ref()).map_err(|err| {
      PortfolioError::Parse(format!("{}: {err}", path.as_ref().display()))
    })?;
    Self::from_csv(file)
  }

  pub fn assets(&self) -> &AssetUniverse {
    &self.assets
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  pub fn n_rows(&self) -> usize {
    self.dates.len()
  }

  /// Inner join on date: keep only rows where every asset has a finite,
  /// positive price.
  pub fn aligned(&self) -> PriceTable {
    let keep: Vec<usize> = self
      .prices
      .axis_iter(Axis(0))
      .enumerate()
      .filter(|(_, row)| row.iter().all(|p| p.is_finite() && *p > 0.0))
      .map(|(i, _)| i)
      .collect();

    if keep.len() < self.n_rows() {
      debug!(
        dropped = self.n_rows() - keep.len(),
        kept = keep.len(),
        "dropped incomplete price rows"
      );
    }

    PriceTable {
      assets: self.assets.clone(),
      dates: keep.iter().map(|&i| self.dates[i]).collect(),
      prices: self.prices.select(Axis(0), &keep),
    }
  }

  /// Simple returns of the aligned table, `(rows - 1) x assets`.
  pub fn returns(&self) -> Array2<f64> {
    let aligned = self.aligned();
    let n_rows = aligned.n_rows();
    if n_rows < 2 {
      return Array2::zeros((0, self.assets.len()));
    }

    let prev = aligned.prices.slice(ndarray::s![..n_rows - 1, ..]);
    let next = aligned.prices.slice(ndarray::s![1.., ..]);
    &next / &prev - 1.0
  }
}

fn parse_price(cell: &str) -> std::result::Result<f64, String> {
  if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null") {
    return Ok(f64::NAN);
  }
  cell
    .parse::<f64>()
    .map_err(|err| format!("invalid price `{cell}`: {err}"))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
  }

  #[test]
  fn simple_returns_drop_first_period() {
    let r = simple_returns_series(&[100.0, 110.0, 99.0]);

    assert_eq!(r.len(), 2);
    assert_abs_diff_eq!(r[0], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(r[1], -0.1, epsilon = 1e-12);
    assert!(simple_returns_series(&[100.0]).is_empty());
  }

  #[test]
  fn observations_are_inner_joined_on_date() {
    let assets = AssetUniverse::new(["AAA", "BBB"]).unwrap();
    let table = PriceTable::from_observations(
      assets,
      vec![
        (day(3), "AAA", 102.0),
        (day(1), "AAA", 100.0),
        (day(1), "BBB", 50.0),
        (day(2), "AAA", 101.0),
        (day(3), "BBB", 51.0),
      ],
    )
    .unwrap();

    assert_eq!(table.dates(), &[day(1), day(2), day(3)]);

    let aligned = table.aligned();
    assert_eq!(aligned.dates(), &[day(1), day(3)]);

    let returns = table.returns();
    assert_eq!(returns.dim(), (1, 2));
    assert_abs_diff_eq!(returns[[0, 0]], 0.02, epsilon = 1e-12);
    assert_abs_diff_eq!(returns[[0, 1]], 0.02, epsilon = 1e-12);
  }

  #[test]
  fn unknown_asset_is_rejected() {
    let assets = AssetUniverse::new(["AAA"]).unwrap();
    let err = PriceTable::from_observations(assets, vec![(day(1), "ZZZ", 1.0)]).unwrap_err();
    assert!(matches!(err, PortfolioError::Parse(_)));
  }

  #[test]
  fn csv_reader_handles_missing_cells() {
    let csv = "Date,AAA,BBB\n2024-01-02,101,\n2024-01-01,100,50\n2024-01-03,102,NaN\n2024-01-04,103,52\n";
    let table = PriceTable::from_csv(csv.as_bytes()).unwrap();

    assert_eq!(table.assets().as_slice(), &["AAA", "BBB"]);
    assert_eq!(table.dates()[0], day(1));
    assert!(table.prices()[[1, 1]].is_nan());
    assert!(table.prices()[[2, 1]].is_nan());
    assert_eq!(table.aligned().n_rows(), 2);
  }

  #[test]
  fn csv_reader_accepts_quotes_and_bom() {
    let csv = "\u{feff}\"Date\",\"AAA\",\"BBB, Inc.\"\n2024-01-01,\"100.5\",50\n2024-01-02,101,\"51\"\n";
    let table = PriceTable::from_csv(csv.as_bytes()).unwrap();

    assert_eq!(table.assets().as_slice(), &["AAA", "BBB, Inc."]);
    assert_eq!(table.dates(), &[day(1), day(2)]);
    assert_eq!(table.prices()[[0, 0]], 100.5);
    assert_eq!(table.prices()[[1, 1]], 51.0);
  }

  #[test]
  fn csv_reader_requires_leading_date_column() {
    let csv = "AAA,BBB\n100,50\n101,51\n";
    let err = PriceTable::from_csv(csv.as_bytes()).unwrap_err();

    assert!(matches!(&err, PortfolioError::Parse(msg) if msg.contains("`Date`")), "{err}");
  }

  #[test]
  fn csv_reader_rejects_bad_cells() {
    let bad_date = "Date,AAA\n01/02/2024,100\n";
    let bad_price = "Date,AAA\n2024-01-01,abc\n";

    assert!(matches!(
      PriceTable::from_csv(bad_date.as_bytes()),
      Err(PortfolioError::Parse(_))
    ));
    assert!(matches!(
      PriceTable::from_csv(bad_price.as_bytes()),
      Err(PortfolioError::Parse(_))
    ));
  }

  #[test]
  fn empty_csv_is_insufficient_data() {
    assert_eq!(
      PriceTable::from_csv("  \n".as_bytes()),
      Err(PortfolioError::InsufficientData {
        required: MIN_OBSERVATIONS,
        actual: 0
      })
    );
  }

  #[test]
  fn duplicate_dates_are_rejected() {
    let assets = AssetUniverse::new(["AAA"]).unwrap();
    let prices = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
    assert!(PriceTable::new(assets, vec![day(1), day(1)], prices).is_err());
  }
}
