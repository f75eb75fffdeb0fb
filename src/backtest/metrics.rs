//! # Performance Metrics
//!
//! $$
//! \text{SR} = \frac{\bar r}{\sigma_r}\sqrt{252},\qquad
//! \text{MDD} = \min_t \frac{W_t - \max_{s \le t} W_s}{\max_{s \le t} W_s}
//! $$
//!
//! Summary statistics of a wealth curve.

use serde::Serialize;
use statrs::statistics::Statistics;

/// Periods per year used to annualize the Sharpe ratio.
pub const TRADING_DAYS: f64 = 252.0;

const MIN_VOLATILITY: f64 = 1e-9;

/// Total return, annualized Sharpe ratio and maximum drawdown of one curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
  pub total_return: f64,
  pub sharpe_ratio: f64,
  /// Always `<= 0`.
  pub max_drawdown: f64,
}

impl PerformanceMetrics {
  /// Metrics of a wealth curve. Fewer than two points give all zeros.
  pub fn from_wealth(wealth: &[f64]) -> Self {
    if wealth.len() < 2 {
      return Self::default();
    }

    let step_returns = step_returns(wealth);
    if step_returns.is_empty() {
      return Self::default();
    }

    Self {
      total_return: total_return(wealth),
      sharpe_ratio: sharpe_ratio(&step_returns),
      max_drawdown: max_drawdown(wealth),
    }
  }
}

/// `(last - first) / first`, zero for an empty curve or a non-positive start.
pub fn total_return(wealth: &[f64]) -> f64 {
  match (wealth.first(), wealth.last()) {
    (Some(&first), Some(&last)) if first > 0.0 => finite_or_zero((last - first) / first),
    _ => 0.0,
  }
}

/// Consecutive ratios minus one; pairs starting at non-positive wealth are skipped.
pub fn step_returns(wealth: &[f64]) -> Vec<f64> {
  wealth
    .windows(2)
    .filter(|w| w[0] > 0.0)
    .map(|w| w[1] / w[0] - 1.0)
    .collect()
}

/// Annualized Sharpe ratio of per-step returns (zero risk-free rate).
///
/// Uses the population standard deviation; near-zero volatility yields 0.
pub fn sharpe_ratio(step_returns: &[f64]) -> f64 {
  if step_returns.is_empty() {
    return 0.0;
  }
  let mean = step_returns.iter().mean();
  let std = step_returns.iter().population_std_dev();
  if std.is_finite() && std > MIN_VOLATILITY {
    finite_or_zero(mean / std * TRADING_DAYS.sqrt())
  } else {
    0.0
  }
}

/// Worst relative decline from the running peak.
pub fn max_drawdown(wealth: &[f64]) -> f64 {
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  for &w in wealth {
    peak = peak.max(w);
    if peak > 0.0 {
      worst = worst.min((w - peak) / peak);
    }
  }
  finite_or_zero(worst)
}

fn finite_or_zero(x: f64) -> f64 {
  if x.is_finite() {
    x
  } else {
    0.0
  }
}
