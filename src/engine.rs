//! # Netfolio Engine
//!
//! $$
//! (\mathbf r_{1:T}) \mapsto \big(\{s_i\},\ \mathbf w_{T+1},\ W_{1:T}\big)
//! $$
//!
//! Single entry point over the momentum and allocation pipelines.

use std::collections::BTreeMap;

use crate::backtest::run_backtest;
use crate::backtest::run_backtests;
use crate::backtest::BacktestConfig;
use crate::backtest::BacktestResult;
use crate::data::ReturnMatrix;
use crate::error::Result;
use crate::network::compute_network_momentum;
use crate::network::MomentumConfig;
use crate::network::NetworkMomentum;
use crate::online::eg_step;
use crate::online::project;

/// Runtime configuration for [`NetfolioEngine`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
  pub momentum: MomentumConfig,
  pub backtest: BacktestConfig,
}

/// Entry point for momentum scoring, single weight updates and backtests.
#[derive(Clone, Debug, Default)]
pub struct NetfolioEngine {
  config: EngineConfig,
}

impl NetfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: EngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Network momentum spillover scores for every asset.
  pub fn momentum(&self, returns: &ReturnMatrix) -> Result<NetworkMomentum> {
    compute_network_momentum(returns, &self.config.momentum)
  }

  /// Asset → score mapping.
  pub fn momentum_scores(&self, returns: &ReturnMatrix) -> Result<BTreeMap<String, f64>> {
    self.momentum(returns).map(|m| m.score_map())
  }

  /// One exponential-gradient step followed by the configured max-weight projection.
  ///
  /// Uses the learning rate, group sparsity and bound of the backtest configuration.
  pub fn update_weights(&self, current: &[f64], returns: &[f64]) -> Result<Vec<f64>> {
    let cfg = &self.config.backtest;
    cfg.validate(current.len())?;
    let sparsity = cfg.group_sparsity.as_ref().map(|(m, a)| (m, *a));
    let step = eg_step(current, returns, cfg.learning_rate, sparsity)?;
    project(&step.weights, cfg.max_weight, cfg.max_weight_policy)
  }

  /// Backtest the configured allocation over the full history.
  pub fn backtest(&self, returns: &ReturnMatrix) -> Result<BacktestResult> {
    run_backtest(returns, &self.config.backtest)
  }

  /// Backtest several learning rates in parallel, other settings unchanged.
  pub fn backtest_learning_rates(
    &self,
    returns: &ReturnMatrix,
    rates: &[f64],
  ) -> Vec<Result<BacktestResult>> {
    let configs: Vec<BacktestConfig> = rates
      .iter()
      .map(|&learning_rate| BacktestConfig {
        learning_rate,
        ..self.config.backtest.clone()
      })
      .collect();
    run_backtests(returns, &configs)
  }
}
