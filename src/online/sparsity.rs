//! # Group Sparsity
//!
//! $$
//! w_g \leftarrow w_g \cdot \max\Big(0,\; 1 - \frac{\alpha}{\lVert w_g \rVert_2}\Big)
//! $$
//!
//! Group soft-thresholding: weak groups (e.g. sectors) are shrunk or removed
//! as a whole before the vector is mapped back onto the simplex.

use std::collections::HashMap;

use crate::error::NetfolioError;
use crate::error::Result;

/// Assignment of every asset to exactly one group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMapping {
  labels: Vec<String>,
  members: Vec<Vec<usize>>,
}

impl GroupMapping {
  /// One group label per asset, in column order.
  pub fn from_labels<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
    let mut members: Vec<Vec<usize>> = Vec::new();
    {
      let mut index: HashMap<&str, usize> = HashMap::new();
      for (i, label) in labels.iter().enumerate() {
        let g = *index.entry(label.as_str()).or_insert_with(|| {
          members.push(Vec::new());
          members.len() - 1
        });
        members[g].push(i);
      }
    }

    Self { labels, members }
  }

  /// Build from an `asset index -> group` map that must cover `0..n_assets`.
  pub fn from_index_map<S: Into<String>>(map: HashMap<usize, S>, n_assets: usize) -> Result<Self> {
    if map.len() != n_assets {
      return Err(NetfolioError::DimensionMismatch {
        context: "group mapping",
        expected: n_assets,
        got: map.len(),
      });
    }

    let mut labels: Vec<Option<String>> = vec![None; n_assets];
    for (i, g) in map {
      let slot = labels.get_mut(i).ok_or_else(|| {
        NetfolioError::InvalidInput(format!("group mapping refers to unknown asset index {i}"))
      })?;
      *slot = Some(g.into());
    }

    let labels: Option<Vec<String>> = labels.into_iter().collect();
    labels
      .map(Self::from_labels)
      .ok_or_else(|| NetfolioError::InvalidInput("every asset needs a group".into()))
  }

  /// Number of assets covered.
  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn n_groups(&self) -> usize {
    self.members.len()
  }

  /// Group label of asset `i`.
  pub fn group_of(&self, i: usize) -> Option<&str> {
    self.labels.get(i).map(String::as_str)
  }

  /// Asset indices per group, groups in first-seen order.
  pub fn groups(&self) -> &[Vec<usize>] {
    &self.members
  }
}

/// Shrink each group's weights by its soft-threshold factor and renormalize.
///
/// If every group is thresholded away the uniform vector is returned.
pub fn apply_group_sparsity(
  weights: &[f64],
  mapping: &GroupMapping,
  alpha: f64,
) -> Result<Vec<f64>> {
  if mapping.len() != weights.len() {
    return Err(NetfolioError::DimensionMismatch {
      context: "group mapping",
      expected: weights.len(),
      got: mapping.len(),
    });
  }
  if !alpha.is_finite() || alpha < 0.0 {
    return Err(NetfolioError::parameter("alpha", format!("{alpha} must be finite and >= 0")));
  }

  let n = weights.len();
  let mut out = weights.to_vec();

  for group in mapping.groups() {
    let norm = group.iter().map(|&i| weights[i] * weights[i]).sum::<f64>().sqrt();
    let factor = if norm == 0.0 {
      0.0
    } else {
      (1.0 - alpha / norm).max(0.0)
    };
    for &i in group {
      out[i] = weights[i] * factor;
    }
  }

  let total: f64 = out.iter().sum();
  if total > 0.0 && total.is_finite() {
    for w in &mut out {
      *w /= total;
    }
  } else {
    tracing::warn!(
      alpha,
      groups = mapping.n_groups(),
      "group sparsity removed every group, using uniform weights"
    );
    out = vec![1.0 / n as f64; n];
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn groups_keep_first_seen_order() {
    let m = GroupMapping::from_labels(["tech", "bank", "tech", "energy"]);
    assert_eq!(m.n_groups(), 3);
    assert_eq!(m.groups()[0], vec![0, 2]);
    assert_eq!(m.group_of(3), Some("energy"));
  }

  #[test]
  fn index_map_must_cover_every_asset() {
    let map: HashMap<usize, &str> = [(0, "a"), (1, "b"), (2, "a")].into_iter().collect();
    let m = GroupMapping::from_index_map(map, 3).unwrap();
    assert_eq!(m.groups(), &[vec![0, 2], vec![1]]);

    let gap: HashMap<usize, &str> = [(0, "a"), (5, "b")].into_iter().collect();
    assert!(GroupMapping::from_index_map(gap, 2).is_err());

    let short: HashMap<usize, &str> = [(0, "a")].into_iter().collect();
    assert!(GroupMapping::from_index_map(short, 2).is_err());
  }

  #[test]
  fn weak_group_is_removed() {
    let m = GroupMapping::from_labels(["a", "a", "b"]);
    let w = [0.45, 0.45, 0.1];
    let out = apply_group_sparsity(&w, &m, 0.2).unwrap();

    assert_eq!(out[2], 0.0);
    assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(out.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
  }

  #[test]
  fn zero_alpha_is_identity_on_simplex() {
    let m = GroupMapping::from_labels(["a", "b", "b"]);
    let w = [0.2, 0.3, 0.5];
    let out = apply_group_sparsity(&w, &m, 0.0).unwrap();
    for (a, b) in out.iter().zip(w) {
      assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
    }
  }

  #[test]
  fn everything_thresholded_falls_back_to_uniform() {
    let m = GroupMapping::from_labels(["a", "b"]);
    let out = apply_group_sparsity(&[0.5, 0.5], &m, 10.0).unwrap();
    assert_eq!(out, vec![0.5, 0.5]);
  }

  #[test]
  fn zero_norm_group_gets_zero_factor() {
    let m = GroupMapping::from_labels(["a", "b"]);
    let out = apply_group_sparsity(&[1.0, 0.0], &m, 0.1).unwrap();
    assert_eq!(out, vec![1.0, 0.0]);
  }

  #[test]
  fn rejects_bad_alpha_and_size() {
    let m = GroupMapping::from_labels(["a", "b"]);
    assert!(apply_group_sparsity(&[0.5, 0.5], &m, -1.0).is_err());
    assert!(apply_group_sparsity(&[1.0], &m, 0.1).is_err());
  }
}
