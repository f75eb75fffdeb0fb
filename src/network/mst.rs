//! # Minimum Spanning Tree
//!
//! $$
//! d_{ij} = \sqrt{2\,(1-\rho_{ij})}
//! $$
//!
//! Filtered correlation network built with Prim's algorithm over the
//! correlation distance.

use ndarray::Array2;
use ndarray::ArrayView2;
use serde::Serialize;

use crate::error::NetfolioError;
use crate::error::Result;

/// Undirected spanning tree over named assets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilteredNetwork {
  assets: Vec<String>,
  adjacency: Vec<Vec<usize>>,
}

impl FilteredNetwork {
  /// Asset names in index order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Tree neighbors of asset `i`, in insertion order.
  pub fn neighbor_indices(&self, i: usize) -> &[usize] {
    self.adjacency.get(i).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Tree neighbors of a named asset, `None` if the asset is unknown.
  pub fn neighbors(&self, asset: &str) -> Option<Vec<&str>> {
    let i = self.assets.iter().position(|a| a == asset)?;
    Some(
      self.adjacency[i]
        .iter()
        .map(|&j| self.assets[j].as_str())
        .collect(),
    )
  }

  /// Undirected edges as `(lower, higher)` index pairs.
  pub fn edges(&self) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(self.len().saturating_sub(1));
    for (i, nbrs) in self.adjacency.iter().enumerate() {
      for &j in nbrs {
        if i < j {
          out.push((i, j));
        }
      }
    }
    out
  }

  pub fn edge_count(&self) -> usize {
    self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
  }

  /// Connected with exactly `N - 1` edges.
  pub fn is_spanning_tree(&self) -> bool {
    let n = self.len();
    if n == 0 {
      return false;
    }
    if self.edge_count() != n - 1 {
      return false;
    }

    let mut visited = vec![false; n];
    let mut stack = vec![0usize];
    visited[0] = true;
    while let Some(node) = stack.pop() {
      for &nbr in &self.adjacency[node] {
        if !visited[nbr] {
          visited[nbr] = true;
          stack.push(nbr);
        }
      }
    }
    visited.into_iter().all(|v| v)
  }
}

/// Correlation distance, clipped at zero before the square root.
pub fn correlation_distance(corr: ArrayView2<f64>) -> Array2<f64> {
  corr.mapv(|rho| (2.0 * (1.0 - rho)).max(0.0).sqrt())
}

/// Extract the minimum spanning tree of the correlation-distance graph.
///
/// Prim's algorithm rooted at index 0. Among vertices sharing the minimal
/// `min_edge`, the first one in index order is taken.
pub fn build_filtered_network(assets: &[String], corr: ArrayView2<f64>) -> Result<FilteredNetwork> {
  let n = assets.len();
  if n == 0 {
    return Err(NetfolioError::InsufficientAssets {
      required: 1,
      got: 0,
    });
  }
  if corr.nrows() != n || corr.ncols() != n {
    return Err(NetfolioError::DimensionMismatch {
      context: "correlation matrix",
      expected: n,
      got: if corr.nrows() != n {
        corr.nrows()
      } else {
        corr.ncols()
      },
    });
  }
  if corr.iter().any(|v| !v.is_finite()) {
    return Err(NetfolioError::NonFinite("correlation matrix".into()));
  }

  let dist = correlation_distance(corr);

  let mut selected = vec![false; n];
  let mut min_edge = vec![f64::INFINITY; n];
  let mut parent: Vec<Option<usize>> = vec![None; n];
  let mut adjacency: Vec<Vec<usize>> = vec![vec![]; n];

  min_edge[0] = 0.0;

  for _ in 0..n {
    let mut u = None;
    let mut min_val = f64::INFINITY;
    for i in 0..n {
      if !selected[i] && min_edge[i] < min_val {
        min_val = min_edge[i];
        u = Some(i);
      }
    }
    let Some(u) = u else {
      break;
    };

    selected[u] = true;

    if let Some(p) = parent[u] {
      adjacency[u].push(p);
      adjacency[p].push(u);
    }

    for v in 0..n {
      if !selected[v] && dist[[u, v]] < min_edge[v] {
        min_edge[v] = dist[[u, v]];
        parent[v] = Some(u);
      }
    }
  }

  Ok(FilteredNetwork {
    assets: assets.to_vec(),
    adjacency,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("A{i}")).collect()
  }

  #[test]
  fn distance_absorbs_round_off() {
    let corr = array![[1.0 + 1e-15, -1.0], [-1.0, 1.0]];
    let d = correlation_distance(corr.view());
    assert_eq!(d[[0, 0]], 0.0);
    assert_abs_diff_eq!(d[[0, 1]], 2.0, epsilon = 1e-12);
  }

  #[test]
  fn single_asset_has_no_edges() {
    let net = build_filtered_network(&names(1), array![[1.0]].view()).unwrap();
    assert_eq!(net.edge_count(), 0);
    assert!(net.is_spanning_tree());
    assert_eq!(net.neighbors("A0"), Some(vec![]));
  }

  #[test]
  fn picks_strongest_links() {
    // A0-A1 strongly correlated, A2 closest to A1
    let corr = array![[1.0, 0.9, 0.1], [0.9, 1.0, 0.5], [0.1, 0.5, 1.0]];
    let net = build_filtered_network(&names(3), corr.view()).unwrap();

    assert!(net.is_spanning_tree());
    assert_eq!(net.edges(), vec![(0, 1), (1, 2)]);
    assert_eq!(net.neighbors("A1"), Some(vec!["A0", "A2"]));
  }

  #[test]
  fn ties_resolve_to_first_index() {
    let corr = Array2::<f64>::eye(4);
    let net = build_filtered_network(&names(4), corr.view()).unwrap();
    // every distance is sqrt(2); each vertex attaches to the root
    assert_eq!(net.edges(), vec![(0, 1), (0, 2), (0, 3)]);
  }

  #[test]
  fn rejects_bad_shapes_and_nan() {
    let err = build_filtered_network(&names(3), array![[1.0, 0.0], [0.0, 1.0]].view());
    assert!(matches!(err, Err(NetfolioError::DimensionMismatch { .. })));

    let err = build_filtered_network(&names(2), array![[1.0, f64::NAN], [f64::NAN, 1.0]].view());
    assert!(matches!(err, Err(NetfolioError::NonFinite(_))));

    let err = build_filtered_network(&[], Array2::<f64>::zeros((0, 0)).view());
    assert!(matches!(err, Err(NetfolioError::InsufficientAssets { .. })));
  }
}
