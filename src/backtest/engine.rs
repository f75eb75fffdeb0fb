//! # Backtest Engine
//!
//! $$
//! W_t = W_{t-1}\,(1 + \mathbf w_t^\top \mathbf r_t)\,\big(1 - c\,\lVert \mathbf w_{t+1} - \tilde{\mathbf w}_t \rVert_1\big)
//! $$
//!
//! Day-by-day replay of the online allocation rule with portfolio drift and
//! turnover-based transaction costs, against an equal-weight benchmark.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use super::metrics::PerformanceMetrics;
use crate::data::sample_mean;
use crate::data::ReturnMatrix;
use crate::error::NetfolioError;
use crate::error::Result;
use crate::online::constraint::project;
use crate::online::constraint::MaxWeightPolicy;
use crate::online::eg::eg_step;
use crate::online::eg::portfolio_return;
use crate::online::eg::uniform;
use crate::online::sparsity::GroupMapping;

const DRIFT_EPSILON: f64 = 1e-12;

/// Exclusive upper bound on [`BacktestConfig::transaction_fee`].
pub const MAX_TRANSACTION_FEE: f64 = 0.5;

/// Rule producing the next target weights.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Allocation {
  /// Online exponential-gradient update followed by the max-weight projection.
  #[default]
  ExponentialGradient,
  /// Fixed target weights, renormalized to sum to 1.
  ConstantMix(Vec<f64>),
}

/// Runtime configuration of [`run_backtest`].
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestConfig {
  pub allocation: Allocation,
  /// Exponential-gradient step size.
  pub learning_rate: f64,
  /// Per-asset exposure bound in `(0, 1]`.
  pub max_weight: f64,
  pub max_weight_policy: MaxWeightPolicy,
  /// Cost per unit of turnover in `[0, 0.5)`, e.g. `0.0015` for 15 bps.
  ///
  /// Turnover is at most 2, so a daily cost stays below the whole portfolio.
  pub transaction_fee: f64,
  /// Charge drift and rebalancing costs in constant-mix mode as well.
  pub charge_constant_mix_costs: bool,
  /// Optional `(groups, alpha)` for group-sparsity shrinkage.
  pub group_sparsity: Option<(GroupMapping, f64)>,
}

impl Default for BacktestConfig {
  fn default() -> Self {
    Self {
      allocation: Allocation::ExponentialGradient,
      learning_rate: 0.5,
      max_weight: 1.0,
      max_weight_policy: MaxWeightPolicy::Cash,
      transaction_fee: 0.0015,
      charge_constant_mix_costs: false,
      group_sparsity: None,
    }
  }
}

impl BacktestConfig {
  /// Check parameters against a basket of `n_assets`.
  pub fn validate(&self, n_assets: usize) -> Result<()> {
    if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
      return Err(NetfolioError::parameter(
        "learning_rate",
        format!("{} must be finite and >= 0", self.learning_rate),
      ));
    }
    if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
      return Err(NetfolioError::parameter(
        "max_weight",
        format!("{} is outside (0, 1]", self.max_weight),
      ));
    }
    if !(0.0..MAX_TRANSACTION_FEE).contains(&self.transaction_fee) {
      return Err(NetfolioError::parameter(
        "transaction_fee",
        format!("{} is outside [0, {MAX_TRANSACTION_FEE})", self.transaction_fee),
      ));
    }
    if let Some((mapping, alpha)) = &self.group_sparsity {
      if mapping.len() != n_assets {
        return Err(NetfolioError::DimensionMismatch {
          context: "group mapping",
          expected: n_assets,
          got: mapping.len(),
        });
      }
      if !alpha.is_finite() || *alpha < 0.0 {
        return Err(NetfolioError::parameter("alpha", format!("{alpha} must be finite and >= 0")));
      }
    }
    if let Allocation::ConstantMix(target) = &self.allocation {
      constant_mix_target(target, n_assets)?;
    }
    Ok(())
  }
}

/// Aligned strategy and benchmark wealth curves with their metrics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BacktestResult {
  pub assets: Vec<String>,
  /// Row labels of the simulated days.
  pub dates: Vec<String>,
  /// Strategy wealth after each day, net of costs.
  pub strategy: Vec<f64>,
  /// Equal-weight benchmark wealth after each day.
  pub benchmark: Vec<f64>,
  pub strategy_metrics: PerformanceMetrics,
  pub benchmark_metrics: PerformanceMetrics,
  /// Target weights after the last day; the shortfall from 1 is cash.
  pub final_weights: Vec<f64>,
  /// L1 rebalancing distance per day.
  pub turnover: Vec<f64>,
  /// Days on which the update diverged and was reset to uniform.
  pub uniform_resets: usize,
}

impl BacktestResult {
  /// Asset → final weight.
  pub fn final_allocation(&self) -> BTreeMap<String, f64> {
    self
      .assets
      .iter()
      .cloned()
      .zip(self.final_weights.iter().copied())
      .collect()
  }

  /// Uninvested share of the final weights.
  pub fn cash_weight(&self) -> f64 {
    (1.0 - self.final_weights.iter().sum::<f64>()).max(0.0)
  }

  /// Sum of daily turnover.
  pub fn total_turnover(&self) -> f64 {
    self.turnover.iter().sum()
  }
}

fn constant_mix_target(target: &[f64], n_assets: usize) -> Result<Vec<f64>> {
  if target.len() != n_assets {
    return Err(NetfolioError::DimensionMismatch {
      context: "constant-mix weights",
      expected: n_assets,
      got: target.len(),
    });
  }
  if target.iter().any(|w| !w.is_finite() || *w < 0.0) {
    return Err(NetfolioError::InvalidInput(
      "constant-mix weights must be finite and non-negative".into(),
    ));
  }
  let total: f64 = target.iter().sum();
  if total <= 0.0 {
    return Err(NetfolioError::InvalidInput(
      "constant-mix weights must not all be zero".into(),
    ));
  }
  Ok(target.iter().map(|w| w / total).collect())
}

/// Holdings after today's returns, before rebalancing.
///
/// Left unchanged when the portfolio lost everything (`1 + R ≈ 0`).
pub fn drift_weights(weights: &[f64], returns: &[f64], day_return: f64) -> Vec<f64> {
  let growth = 1.0 + day_return;
  if growth.abs() < DRIFT_EPSILON {
    return weights.to_vec();
  }
  weights
    .iter()
    .zip(returns)
    .map(|(w, r)| w * (1.0 + r) / growth)
    .collect()
}

/// L1 distance between two holdings.
pub fn turnover(from: &[f64], to: &[f64]) -> f64 {
  from.iter().zip(to).map(|(a, b)| (a - b).abs()).sum()
}

/// Replay the allocation rule over every row of `returns`.
///
/// An empty return table yields an empty result.
pub fn run_backtest(returns: &ReturnMatrix, config: &BacktestConfig) -> Result<BacktestResult> {
  let n = returns.n_assets();
  config.validate(n)?;

  let periods = returns.n_periods();
  tracing::debug!(
    assets = n,
    periods,
    learning_rate = config.learning_rate,
    max_weight = config.max_weight,
    fee = config.transaction_fee,
    "starting backtest"
  );

  let (mut weights, charge_costs) = match &config.allocation {
    Allocation::ExponentialGradient => (
      project(&uniform(n), config.max_weight, config.max_weight_policy)?,
      true,
    ),
    Allocation::ConstantMix(target) => (
      constant_mix_target(target, n)?,
      config.charge_constant_mix_costs,
    ),
  };

  if periods == 0 {
    return Ok(BacktestResult {
      assets: returns.assets().to_vec(),
      final_weights: weights,
      ..Default::default()
    });
  }

  let sparsity = config.group_sparsity.as_ref().map(|(m, a)| (m, *a));

  let mut strategy = Vec::with_capacity(periods);
  let mut benchmark = Vec::with_capacity(periods);
  let mut daily_turnover = Vec::with_capacity(periods);
  let mut uniform_resets = 0;
  let mut wealth = 1.0;
  let mut bench_wealth = 1.0;

  for t in 0..periods {
    let r = returns.row(t).to_vec();

    let day_ret = portfolio_return(&weights, &r);
    let before_cost = wealth * (1.0 + day_ret);

    let next = match &config.allocation {
      Allocation::ExponentialGradient => {
        let step = eg_step(&weights, &r, config.learning_rate, sparsity)?;
        if step.reset_to_uniform {
          uniform_resets += 1;
        }
        project(&step.weights, config.max_weight, config.max_weight_policy)?
      }
      Allocation::ConstantMix(_) => weights.clone(),
    };

    let moved = if charge_costs {
      turnover(&drift_weights(&weights, &r, day_ret), &next)
    } else {
      0.0
    };
    let cost = moved * config.transaction_fee;

    wealth = before_cost * (1.0 - cost);
    bench_wealth *= 1.0 + sample_mean(&r);

    strategy.push(wealth);
    benchmark.push(bench_wealth);
    daily_turnover.push(moved);
    weights = next;
  }

  if uniform_resets > 0 {
    tracing::warn!(uniform_resets, "weights were reset to uniform during the backtest");
  }

  let result = BacktestResult {
    assets: returns.assets().to_vec(),
    dates: returns.labels().to_vec(),
    strategy_metrics: PerformanceMetrics::from_wealth(&strategy),
    benchmark_metrics: PerformanceMetrics::from_wealth(&benchmark),
    strategy,
    benchmark,
    final_weights: weights,
    turnover: daily_turnover,
    uniform_resets,
  };

  if result
    .strategy
    .iter()
    .chain(&result.benchmark)
    .chain(&result.final_weights)
    .any(|v| !v.is_finite())
  {
    return Err(NetfolioError::NonFinite("backtest output".into()));
  }

  tracing::debug!(
    total_return = result.strategy_metrics.total_return,
    benchmark_return = result.benchmark_metrics.total_return,
    "backtest finished"
  );
  Ok(result)
}

/// Run independent configurations over the same history in parallel.
///
/// Each backtest's time loop stays sequential.
pub fn run_backtests(
  returns: &ReturnMatrix,
  configs: &[BacktestConfig],
) -> Vec<Result<BacktestResult>> {
  configs
    .par_iter()
    .map(|config| run_backtest(returns, config))
    .collect()
}
