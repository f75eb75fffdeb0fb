//! # Network Momentum
//!
//! $$
//! s_i = (1-\lambda)\,m_i + \lambda \sum_{j \in \mathcal N(i)} \frac{|\rho_{ij}|}{\sum_{k \in \mathcal N(i)} |\rho_{ik}|}\, m_j
//! $$
//!
//! Own trailing momentum blended with the momentum of one-hop neighbors in the
//! filtered correlation network.

use std::collections::BTreeMap;

use impl_new_derive::ImplNew;
use ndarray::Array2;
use ndarray::ArrayView2;
use serde::Serialize;

use super::mst::build_filtered_network;
use super::mst::FilteredNetwork;
use crate::data::correlation_matrix;
use crate::data::ReturnMatrix;
use crate::error::NetfolioError;
use crate::error::Result;

/// Parameters of the momentum spillover scorer.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct MomentumConfig {
  /// Trailing window of the own-momentum average.
  pub lookback: usize,
  /// Share of the score taken from neighbors (`0.5` is an equal blend).
  pub spillover_weight: f64,
}

impl Default for MomentumConfig {
  fn default() -> Self {
    Self {
      lookback: 20,
      spillover_weight: 0.5,
    }
  }
}

impl MomentumConfig {
  pub fn validate(&self) -> Result<()> {
    if self.lookback == 0 {
      return Err(NetfolioError::InvalidLookback);
    }
    if !(0.0..=1.0).contains(&self.spillover_weight) {
      return Err(NetfolioError::parameter(
        "spillover_weight",
        format!("{} is outside [0, 1]", self.spillover_weight),
      ));
    }
    Ok(())
  }
}

/// Score of a single asset with its components.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MomentumScore {
  pub asset: String,
  /// Mean return over the lookback window.
  pub own_momentum: f64,
  /// Neighbor-weighted momentum, `None` for an isolated node.
  pub spillover: Option<f64>,
  pub score: f64,
}

/// Scores for every asset plus the network they were diffused over.
#[derive(Clone, Debug, Serialize)]
pub struct NetworkMomentum {
  pub scores: Vec<MomentumScore>,
  pub network: FilteredNetwork,
}

impl NetworkMomentum {
  /// Asset → score mapping.
  pub fn score_map(&self) -> BTreeMap<String, f64> {
    self
      .scores
      .iter()
      .map(|s| (s.asset.clone(), s.score))
      .collect()
  }

  pub fn score(&self, asset: &str) -> Option<f64> {
    self.scores.iter().find(|s| s.asset == asset).map(|s| s.score)
  }
}

/// Normalized `|rho|` weights over the tree neighbors of `i`.
///
/// When every neighbor has zero correlation all weights are zero, so the
/// spillover term vanishes.
pub fn neighbor_weights(
  network: &FilteredNetwork,
  corr: ArrayView2<f64>,
  i: usize,
) -> Result<Vec<(usize, f64)>> {
  let n = network.len();
  if corr.nrows() != n || corr.ncols() != n {
    return Err(NetfolioError::DimensionMismatch {
      context: "correlation matrix",
      expected: n,
      got: corr.nrows().min(corr.ncols()),
    });
  }
  if i >= n {
    return Err(NetfolioError::InvalidInput(format!(
      "asset index {i} is outside a network of {n} assets"
    )));
  }

  let nbrs = network.neighbor_indices(i);
  let raw: Vec<f64> = nbrs.iter().map(|&j| corr[[i, j]].abs()).collect();
  let total: f64 = raw.iter().sum();

  if total > 0.0 {
    Ok(nbrs.iter().zip(raw).map(|(&j, w)| (j, w / total)).collect())
  } else {
    Ok(nbrs.iter().map(|&j| (j, 0.0)).collect())
  }
}

/// Build the network from the full return history and score every asset.
pub fn compute_network_momentum(
  returns: &ReturnMatrix,
  config: &MomentumConfig,
) -> Result<NetworkMomentum> {
  check_inputs(returns, config)?;

  let corr = correlation_matrix(returns);
  let network = build_filtered_network(returns.assets(), corr.view())?;
  tracing::debug!(
    assets = returns.n_assets(),
    periods = returns.n_periods(),
    lookback = config.lookback,
    "built filtered network"
  );

  score_with_network(returns, &network, &corr, config)
}

/// Score every asset over a prebuilt network and its correlation matrix.
pub fn score_with_network(
  returns: &ReturnMatrix,
  network: &FilteredNetwork,
  corr: &Array2<f64>,
  config: &MomentumConfig,
) -> Result<NetworkMomentum> {
  check_inputs(returns, config)?;
  if network.assets() != returns.assets() {
    return Err(NetfolioError::InvalidInput(
      "network assets do not match return columns".into(),
    ));
  }
  let n = returns.n_assets();
  if corr.nrows() != n || corr.ncols() != n {
    return Err(NetfolioError::DimensionMismatch {
      context: "correlation matrix",
      expected: n,
      got: corr.nrows(),
    });
  }

  let own = returns.trailing_mean(config.lookback);
  let lambda = config.spillover_weight;

  let mut scores = Vec::with_capacity(n);
  for (i, asset) in returns.assets().iter().enumerate() {
    let weights = neighbor_weights(network, corr.view(), i)?;
    let spillover = if weights.is_empty() {
      None
    } else {
      Some(weights.iter().map(|&(j, w)| w * own[j]).sum::<f64>())
    };

    let score = match spillover {
      Some(s) => (1.0 - lambda) * own[i] + lambda * s,
      None => own[i],
    };
    if !score.is_finite() {
      return Err(NetfolioError::NonFinite(format!("momentum score of `{asset}`")));
    }

    scores.push(MomentumScore {
      asset: asset.clone(),
      own_momentum: own[i],
      spillover,
      score,
    });
  }

  Ok(NetworkMomentum {
    scores,
    network: network.clone(),
  })
}

fn check_inputs(returns: &ReturnMatrix, config: &MomentumConfig) -> Result<()> {
  config.validate()?;
  if returns.n_assets() < 2 {
    return Err(NetfolioError::InsufficientAssets {
      required: 2,
      got: returns.n_assets(),
    });
  }
  if config.lookback > returns.n_periods() {
    return Err(NetfolioError::LookbackExceedsHistory {
      lookback: config.lookback,
      available: returns.n_periods(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn matrix(assets: &[&str], returns: Array2<f64>) -> ReturnMatrix {
    ReturnMatrix::new(assets.iter().map(|s| s.to_string()).collect(), returns).unwrap()
  }

  fn config(lookback: usize) -> MomentumConfig {
    MomentumConfig::new(lookback, 0.5)
  }

  #[test]
  fn perfectly_correlated_pair_shares_momentum() {
    // A and B move together, C moves against both
    let m = matrix(
      &["A", "B", "C"],
      array![
        [0.01, 0.02, -0.01],
        [0.03, 0.06, -0.03],
        [-0.02, -0.04, 0.02],
        [0.02, 0.04, -0.02]
      ],
    );
    let out = compute_network_momentum(&m, &config(3)).unwrap();

    assert!(out.network.is_spanning_tree());
    assert!(out.network.edges().contains(&(0, 1)));

    let own_a = (0.03 - 0.02 + 0.02) / 3.0;
    let own_b = (0.06 - 0.04 + 0.04) / 3.0;
    let own_c = (-0.03 + 0.02 - 0.02) / 3.0;

    let a_neighbors = out.network.neighbors("A").unwrap();
    let expected_a = if a_neighbors.contains(&"C") {
      // |rho| = 1 on both edges
      0.5 * own_a + 0.5 * (0.5 * own_b + 0.5 * own_c)
    } else {
      0.5 * own_a + 0.5 * own_b
    };
    assert_abs_diff_eq!(out.score("A").unwrap(), expected_a, epsilon = 1e-12);
    assert_abs_diff_eq!(out.scores[0].own_momentum, own_a, epsilon = 1e-12);
  }

  #[test]
  fn one_hop_neighbor_only() {
    // each score uses only its own tree neighbors
    let m = matrix(
      &["A", "B", "C"],
      array![
        [0.01, 0.012, 0.03],
        [0.02, 0.018, -0.01],
        [-0.01, -0.008, 0.02],
        [0.03, 0.031, 0.00],
        [0.00, 0.004, 0.01]
      ],
    );
    let out = compute_network_momentum(&m, &config(3)).unwrap();
    let net = &out.network;
    let own = m.trailing_mean(3);
    let corr = correlation_matrix(&m);

    for (i, s) in out.scores.iter().enumerate() {
      let weights = neighbor_weights(net, corr.view(), i).unwrap();
      let total: f64 = weights.iter().map(|(_, w)| w).sum();
      assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
      let spill: f64 = weights.iter().map(|&(j, w)| w * own[j]).sum();
      assert_abs_diff_eq!(s.score, 0.5 * own[i] + 0.5 * spill, epsilon = 1e-12);
    }
  }

  #[test]
  fn zero_correlation_neighbors_carry_no_spillover() {
    let corr = Array2::<f64>::eye(3);
    let assets: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let net = build_filtered_network(&assets, corr.view()).unwrap();
    let w = neighbor_weights(&net, corr.view(), 0).unwrap();
    assert_eq!(w, vec![(1, 0.0), (2, 0.0)]);
  }

  #[test]
  fn uncorrelated_history_halves_own_momentum() {
    // a single period has zero variance, so every correlation is 0
    let m = matrix(&["A", "B", "C"], array![[0.02, 0.04, -0.06]]);
    let out = compute_network_momentum(&m, &config(1)).unwrap();

    assert_abs_diff_eq!(out.score("A").unwrap(), 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(out.score("B").unwrap(), 0.02, epsilon = 1e-12);
    assert_abs_diff_eq!(out.score("C").unwrap(), -0.03, epsilon = 1e-12);
    assert!(out.scores.iter().all(|s| s.spillover.is_some()));
  }

  #[test]
  fn neighbor_weights_check_matrix_shape() {
    let corr = Array2::<f64>::eye(3);
    let assets: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let net = build_filtered_network(&assets, corr.view()).unwrap();

    let small = Array2::<f64>::eye(2);
    let err = neighbor_weights(&net, small.view(), 2).unwrap_err();
    assert!(matches!(err, NetfolioError::DimensionMismatch { expected: 3, .. }));
    assert!(neighbor_weights(&net, corr.view(), 3).is_err());
  }

  #[test]
  fn configuration_errors_are_reported() {
    let m = matrix(&["A", "B"], array![[0.01, 0.02], [0.0, 0.01]]);

    let err = compute_network_momentum(&m, &config(3)).unwrap_err();
    assert_eq!(
      err,
      NetfolioError::LookbackExceedsHistory {
        lookback: 3,
        available: 2
      }
    );

    let err = compute_network_momentum(&m, &config(0)).unwrap_err();
    assert_eq!(err, NetfolioError::InvalidLookback);

    let single = matrix(&["A"], array![[0.01], [0.02]]);
    let err = compute_network_momentum(&single, &config(1)).unwrap_err();
    assert!(matches!(err, NetfolioError::InsufficientAssets { required: 2, got: 1 }));
  }

  #[test]
  fn score_map_serializes() {
    let m = matrix(&["BTC", "ETH"], array![[0.01, 0.02], [0.0, 0.01], [0.02, 0.0]]);
    let out = compute_network_momentum(&m, &config(2)).unwrap();
    let json = serde_json::to_string(&out.score_map()).unwrap();
    assert!(json.starts_with("{\"BTC\":"));
  }
}
