//! # Max-Weight Constraint
//!
//! $$
//! \tilde w_i = \min(w_i, w_{\max})
//! $$
//!
//! Two projections onto the per-asset exposure bound: a cash-creating clip
//! and a clip that redistributes the clipped mass over uncapped assets.

use crate::error::NetfolioError;
use crate::error::Result;

const CAP_TOLERANCE: f64 = 1e-12;

/// How mass removed by the max-weight bound is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaxWeightPolicy {
  /// Clipped mass stays uninvested (implicit cash position).
  #[default]
  Cash,
  /// Clipped mass is redistributed so the weights sum to 1 again.
  Renormalize,
}

impl MaxWeightPolicy {
  /// Parse a policy name.
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "renormalize" | "renormalise" | "redistribute" => Self::Renormalize,
      _ => Self::Cash,
    }
  }
}

fn check_max_weight(max_weight: f64) -> Result<()> {
  if !(max_weight > 0.0 && max_weight <= 1.0) {
    return Err(NetfolioError::parameter(
      "max_weight",
      format!("{max_weight} is outside (0, 1]"),
    ));
  }
  Ok(())
}

/// Clip every weight to `max_weight`. The result may sum to less than 1.
pub fn clip_to_max_weight(weights: &[f64], max_weight: f64) -> Result<Vec<f64>> {
  check_max_weight(max_weight)?;
  if max_weight >= 1.0 - CAP_TOLERANCE {
    return Ok(weights.to_vec());
  }
  Ok(weights.iter().map(|w| w.min(max_weight)).collect())
}

/// Clip to `max_weight`, then hand the excess to uncapped assets until the
/// weights sum to 1.
///
/// Excess is shared in proportion to current weight, or equally when the
/// uncapped assets hold nothing. When `n * max_weight < 1` no such vector
/// exists and every asset ends at `max_weight`.
pub fn clip_and_renormalize(weights: &[f64], max_weight: f64) -> Result<Vec<f64>> {
  check_max_weight(max_weight)?;
  let n = weights.len();
  if n == 0 {
    return Ok(vec![]);
  }
  if (n as f64) * max_weight < 1.0 - CAP_TOLERANCE {
    return Ok(vec![max_weight; n]);
  }

  let mut w: Vec<f64> = weights.iter().map(|x| x.max(0.0).min(max_weight)).collect();

  // each pass caps at least one more asset or closes the gap
  for _ in 0..=n {
    let excess = 1.0 - w.iter().sum::<f64>();
    if excess <= CAP_TOLERANCE {
      break;
    }

    let free: Vec<usize> = (0..n).filter(|&i| w[i] < max_weight - CAP_TOLERANCE).collect();
    if free.is_empty() {
      break;
    }

    let free_mass: f64 = free.iter().map(|&i| w[i]).sum();
    for &i in &free {
      let share = if free_mass > 0.0 {
        w[i] / free_mass
      } else {
        1.0 / free.len() as f64
      };
      w[i] = (w[i] + excess * share).min(max_weight);
    }
  }

  Ok(w)
}

/// Apply the bound under the chosen policy.
pub fn project(weights: &[f64], max_weight: f64, policy: MaxWeightPolicy) -> Result<Vec<f64>> {
  match policy {
    MaxWeightPolicy::Cash => clip_to_max_weight(weights, max_weight),
    MaxWeightPolicy::Renormalize => clip_and_renormalize(weights, max_weight),
  }
}
