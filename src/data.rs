//! # Return Data
//!
//! $$
//! r_{t,i} = \frac{p_{t,i}}{p_{t-1,i}} - 1,\qquad
//! \rho_{ij} = \frac{\sum_t (r_{t,i}-\bar r_i)(r_{t,j}-\bar r_j)}{\sqrt{\sum_t (r_{t,i}-\bar r_i)^2 \sum_t (r_{t,j}-\bar r_j)^2}}
//! $$
//!
//! Validated time × asset return table and the correlation helpers built on it.

use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;

use crate::error::NetfolioError;
use crate::error::Result;

pub(crate) fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = x.sum() / n as f64;
  let my = y.sum() / n as f64;

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for (a, b) in x.iter().zip(y.iter()) {
    let dx = a - mx;
    let dy = b - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Time-ordered, gap-free table of simple returns, one column per named asset.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
  assets: Vec<String>,
  labels: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnMatrix {
  /// Build from a `T × N` return array; row labels default to the row index.
  pub fn new(assets: Vec<String>, returns: Array2<f64>) -> Result<Self> {
    let labels = (0..returns.nrows()).map(|t| t.to_string()).collect();
    Self::with_labels(assets, labels, returns)
  }

  /// Build with explicit row labels (one per time step).
  pub fn with_labels(
    assets: Vec<String>,
    labels: Vec<String>,
    returns: Array2<f64>,
  ) -> Result<Self> {
    validate_assets(&assets)?;

    if returns.ncols() != assets.len() {
      return Err(NetfolioError::DimensionMismatch {
        context: "return matrix columns",
        expected: assets.len(),
        got: returns.ncols(),
      });
    }
    if labels.len() != returns.nrows() {
      return Err(NetfolioError::DimensionMismatch {
        context: "row labels",
        expected: returns.nrows(),
        got: labels.len(),
      });
    }
    if let Some(((t, i), _)) = returns.indexed_iter().find(|(_, v)| !v.is_finite()) {
      return Err(NetfolioError::InvalidInput(format!(
        "return for `{}` at row {t} is not finite",
        assets[i]
      )));
    }

    Ok(Self {
      assets,
      labels,
      returns,
    })
  }

  /// Build with calendar dates as row labels. Dates must be strictly increasing.
  pub fn with_dates(
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    returns: Array2<f64>,
  ) -> Result<Self> {
    if dates.windows(2).any(|w| w[1] <= w[0]) {
      return Err(NetfolioError::InvalidInput(
        "dates must be strictly increasing".into(),
      ));
    }
    let labels = dates
      .iter()
      .map(|d| d.format("%Y-%m-%d").to_string())
      .collect();
    Self::with_labels(assets, labels, returns)
  }

  /// Convert a `(T + 1) × N` price table into `T` rows of simple returns.
  ///
  /// `labels` describe the price rows; the first one is dropped together with
  /// the undefined first return.
  pub fn from_prices(
    assets: Vec<String>,
    labels: Vec<String>,
    prices: Array2<f64>,
  ) -> Result<Self> {
    if labels.len() != prices.nrows() {
      return Err(NetfolioError::DimensionMismatch {
        context: "price labels",
        expected: prices.nrows(),
        got: labels.len(),
      });
    }
    if let Some(((t, i), p)) = prices
      .indexed_iter()
      .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
      return Err(NetfolioError::InvalidInput(format!(
        "price {p} at row {t}, column {i} must be positive and finite"
      )));
    }

    let rows = prices.nrows().saturating_sub(1);
    let mut returns = Array2::<f64>::zeros((rows, prices.ncols()));
    for t in 0..rows {
      for i in 0..prices.ncols() {
        returns[[t, i]] = prices[[t + 1, i]] / prices[[t, i]] - 1.0;
      }
    }

    let labels = labels.into_iter().skip(1).collect();
    Self::with_labels(assets, labels, returns)
  }

  /// Convert named price columns of equal length into a return table.
  pub fn from_price_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let len = columns.first().map(|(_, p)| p.len()).unwrap_or(0);
    if let Some((name, p)) = columns.iter().find(|(_, p)| p.len() != len) {
      return Err(NetfolioError::InvalidInput(format!(
        "price column `{name}` has {} rows, expected {len}",
        p.len()
      )));
    }

    let mut prices = Array2::<f64>::zeros((len, columns.len()));
    for (i, (_, p)) in columns.iter().enumerate() {
      for (t, v) in p.iter().enumerate() {
        prices[[t, i]] = *v;
      }
    }

    let assets = columns.into_iter().map(|(name, _)| name).collect();
    let labels = (0..len).map(|t| t.to_string()).collect();
    Self::from_prices(assets, labels, prices)
  }

  /// Asset names in column order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Row labels in time order.
  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  pub fn n_periods(&self) -> usize {
    self.returns.nrows()
  }

  pub fn is_empty(&self) -> bool {
    self.returns.nrows() == 0
  }

  /// Column index of an asset.
  pub fn asset_index(&self, name: &str) -> Option<usize> {
    self.assets.iter().position(|a| a == name)
  }

  /// Borrow the full `T × N` return array.
  pub fn view(&self) -> ArrayView2<'_, f64> {
    self.returns.view()
  }

  /// Returns of all assets at time step `t`.
  pub fn row(&self, t: usize) -> ArrayView1<'_, f64> {
    self.returns.row(t)
  }

  /// Return history of asset `i`.
  pub fn column(&self, i: usize) -> ArrayView1<'_, f64> {
    self.returns.column(i)
  }

  /// Last `lookback` rows (all rows if fewer are available).
  pub fn tail(&self, lookback: usize) -> ArrayView2<'_, f64> {
    let start = self.n_periods().saturating_sub(lookback);
    self.returns.slice(s![start.., ..])
  }

  /// Per-asset mean of the last `lookback` returns.
  pub fn trailing_mean(&self, lookback: usize) -> Vec<f64> {
    let tail = self.tail(lookback);
    if tail.nrows() == 0 {
      return vec![0.0; self.n_assets()];
    }
    tail
      .mean_axis(Axis(0))
      .map(|m| m.to_vec())
      .unwrap_or_else(|| vec![0.0; self.n_assets()])
  }
}

fn validate_assets(assets: &[String]) -> Result<()> {
  if assets.is_empty() {
    return Err(NetfolioError::InsufficientAssets {
      required: 1,
      got: 0,
    });
  }

  let mut seen = HashSet::with_capacity(assets.len());
  for a in assets {
    if a.is_empty() {
      return Err(NetfolioError::InvalidInput("asset names must be non-empty".into()));
    }
    if !seen.insert(a.as_str()) {
      return Err(NetfolioError::InvalidInput(format!("duplicate asset `{a}`")));
    }
  }
  Ok(())
}

/// Pearson correlation matrix over the columns of a return table.
///
/// Zero-variance columns get correlation 0 against every other column.
pub fn correlation_matrix(returns: &ReturnMatrix) -> Array2<f64> {
  let n = returns.n_assets();
  let mut corr = Array2::<f64>::eye(n);

  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(returns.column(i), returns.column(j));
      corr[[i, j]] = r;
      corr[[j, i]] = r;
    }
  }

  corr
}
