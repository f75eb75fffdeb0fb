//! # Exponential Gradient
//!
//! $$
//! w_{t+1,i} = \frac{w_{t,i}\,\exp\!\big(\eta\, r_{t,i} / (w_t^\top r_t)\big)}{\sum_k w_{t,k}\,\exp\!\big(\eta\, r_{t,k} / (w_t^\top r_t)\big)}
//! $$
//!
//! Multiplicative-weights update for online portfolio selection. Its worst-case
//! regret against the best constant-rebalanced portfolio in hindsight is bounded
//! without any model of the return distribution.

use serde::Serialize;

use super::sparsity::apply_group_sparsity;
use super::sparsity::GroupMapping;
use crate::error::NetfolioError;
use crate::error::Result;

/// Portfolio returns smaller than this in magnitude are replaced by it.
///
/// This is a numerical-stability placeholder, not a modeling choice: it keeps
/// `r_i / R` finite when the portfolio return is (close to) zero.
pub const RETURN_EPSILON: f64 = 1e-8;

/// Bound on the exponent so `exp` cannot overflow.
pub const EXPONENT_CLIP: f64 = 30.0;

/// Outcome of one update, with flags for the guarded branches.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EgStep {
  /// Next weights, on the simplex.
  pub weights: Vec<f64>,
  /// Gross portfolio return `w · r` before any substitution.
  pub portfolio_return: f64,
  /// The portfolio return was replaced by [`RETURN_EPSILON`].
  pub guarded_denominator: bool,
  /// The multiplicative step diverged and the uniform vector was used.
  pub reset_to_uniform: bool,
}

/// Dot product of weights and returns.
pub fn portfolio_return(weights: &[f64], returns: &[f64]) -> f64 {
  weights.iter().zip(returns).map(|(w, r)| w * r).sum()
}

pub(crate) fn uniform(n: usize) -> Vec<f64> {
  vec![1.0 / n as f64; n]
}

fn check_inputs(weights: &[f64], returns: &[f64], learning_rate: f64) -> Result<()> {
  if weights.is_empty() {
    return Err(NetfolioError::InsufficientAssets {
      required: 1,
      got: 0,
    });
  }
  if weights.len() != returns.len() {
    return Err(NetfolioError::DimensionMismatch {
      context: "return vector",
      expected: weights.len(),
      got: returns.len(),
    });
  }
  if !learning_rate.is_finite() || learning_rate < 0.0 {
    return Err(NetfolioError::parameter(
      "learning_rate",
      format!("{learning_rate} must be finite and >= 0"),
    ));
  }
  if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
    return Err(NetfolioError::InvalidInput(
      "weights must be finite and non-negative".into(),
    ));
  }
  if returns.iter().any(|r| !r.is_finite()) {
    return Err(NetfolioError::InvalidInput("returns must be finite".into()));
  }
  Ok(())
}

/// One exponential-gradient step with optional group sparsity `(mapping, alpha)`.
pub fn eg_step(
  weights: &[f64],
  returns: &[f64],
  learning_rate: f64,
  sparsity: Option<(&GroupMapping, f64)>,
) -> Result<EgStep> {
  check_inputs(weights, returns, learning_rate)?;
  let n = weights.len();

  let gross = portfolio_return(weights, returns);
  let guarded_denominator = gross.abs() < RETURN_EPSILON;
  let denom = if guarded_denominator {
    RETURN_EPSILON
  } else {
    gross
  };

  let mut next: Vec<f64> = weights
    .iter()
    .zip(returns)
    .map(|(w, r)| {
      let exponent = (learning_rate * r / denom).clamp(-EXPONENT_CLIP, EXPONENT_CLIP);
      w * exponent.exp()
    })
    .collect();

  let total: f64 = next.iter().sum();
  let diverged = next.iter().any(|w| !w.is_finite()) || !total.is_finite() || total <= 0.0;
  if diverged {
    tracing::warn!(
      learning_rate,
      portfolio_return = gross,
      "exponential gradient step diverged, resetting to uniform weights"
    );
    next = uniform(n);
  } else {
    for w in &mut next {
      *w /= total;
    }
  }

  if let Some((mapping, alpha)) = sparsity {
    next = apply_group_sparsity(&next, mapping, alpha)?;
  }

  Ok(EgStep {
    weights: next,
    portfolio_return: gross,
    guarded_denominator,
    reset_to_uniform: diverged,
  })
}

/// Next weights after one exponential-gradient step.
pub fn exponential_gradient_update(
  weights: &[f64],
  returns: &[f64],
  learning_rate: f64,
  sparsity: Option<(&GroupMapping, f64)>,
) -> Result<Vec<f64>> {
  eg_step(weights, returns, learning_rate, sparsity).map(|s| s.weights)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use tracing_test::traced_test;

  use super::*;

  fn assert_simplex(w: &[f64]) {
    assert!(w.iter().all(|x| *x >= 0.0 && x.is_finite()));
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn shifts_toward_outperformer() {
    let step = eg_step(&[0.5, 0.5], &[0.02, 0.01], 0.5, None).unwrap();
    assert!(!step.guarded_denominator);
    assert!(step.weights[0] > 0.5);
    assert_simplex(&step.weights);

    // closed form: R = 0.015, exponents 0.5 * r / R
    let a = (0.5_f64 * 0.02 / 0.015).exp();
    let b = (0.5_f64 * 0.01 / 0.015).exp();
    assert_abs_diff_eq!(step.weights[0], a / (a + b), epsilon = 1e-12);
  }

  #[test]
  fn zero_portfolio_return_hits_guard_and_clip() {
    // 0.5 * 0.01 + 0.5 * (-0.01) = 0
    let step = eg_step(&[0.5, 0.5], &[0.01, -0.01], 0.5, None).unwrap();
    assert!(step.guarded_denominator);
    assert!(!step.reset_to_uniform);
    assert_eq!(step.portfolio_return, 0.0);

    // both exponents saturate at +/- 30
    let expected = 1.0 / (1.0 + (-60.0_f64).exp());
    assert_abs_diff_eq!(step.weights[0], expected, epsilon = 1e-12);
    assert_simplex(&step.weights);
  }

  #[test]
  fn zero_learning_rate_is_identity() {
    let w = [0.2, 0.3, 0.5];
    let out = exponential_gradient_update(&w, &[0.1, -0.2, 0.05], 0.0, None).unwrap();
    for (a, b) in out.iter().zip(w) {
      assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
    }
  }

  #[traced_test]
  #[test]
  fn all_zero_weights_reset_to_uniform() {
    let step = eg_step(&[0.0, 0.0, 0.0], &[0.1, 0.2, 0.3], 1.0, None).unwrap();
    assert!(step.reset_to_uniform);
    assert_eq!(step.weights, uniform(3));
    assert!(logs_contain("resetting to uniform"));
  }

  #[test]
  fn overflowing_step_resets_to_uniform() {
    // R = 0 hits the guard, exponents clip to +/- 30 and 1e300 * e^30 overflows
    let step = eg_step(&[1e300, 1e300], &[0.01, -0.01], 0.5, None).unwrap();
    assert!(step.reset_to_uniform);
    assert_eq!(step.weights, vec![0.5, 0.5]);
  }

  #[test]
  fn extreme_inputs_stay_on_simplex() {
    let cases: [(&[f64], &[f64]); 4] = [
      (&[0.25, 0.25, 0.25, 0.25], &[0.99, -0.99, 0.5, -0.5]),
      (&[0.999, 0.001, 0.0, 0.0], &[-0.99, 0.99, 0.99, -0.99]),
      (&[0.1, 0.2, 0.3, 0.4], &[-0.99, -0.99, -0.99, -0.99]),
      (&[0.4, 0.3, 0.2, 0.1], &[1e-12, -1e-12, 0.0, 0.0]),
    ];
    for (w, r) in cases {
      for eta in [0.01, 1.0, 10.0] {
        assert_simplex(&exponential_gradient_update(w, r, eta, None).unwrap());
      }
    }
  }

  #[test]
  fn group_sparsity_is_applied_after_normalizing() {
    let mapping = GroupMapping::from_labels(["a", "a", "b"]);
    let out =
      exponential_gradient_update(&[0.45, 0.45, 0.1], &[0.0, 0.0, 0.0], 0.5, Some((&mapping, 0.2)))
        .unwrap();
    assert_eq!(out[2], 0.0);
    assert_simplex(&out);
  }

  #[test]
  fn configuration_errors() {
    let err = eg_step(&[0.5, 0.5], &[0.1], 0.5, None).unwrap_err();
    assert!(matches!(err, NetfolioError::DimensionMismatch { expected: 2, got: 1, .. }));

    assert!(eg_step(&[0.5, 0.5], &[0.1, 0.1], -1.0, None).is_err());
    assert!(eg_step(&[-0.5, 1.5], &[0.1, 0.1], 1.0, None).is_err());
    assert!(eg_step(&[0.5, 0.5], &[f64::NAN, 0.1], 1.0, None).is_err());
    assert!(eg_step(&[], &[], 1.0, None).is_err());
  }
}
