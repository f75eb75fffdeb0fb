//! # Online Portfolio Selection
//!
//! $$
//! \mathbf w_{t+1} = \Pi_{w_{\max}}\Big(\operatorname{GS}_\alpha\big(\operatorname{EG}_\eta(\mathbf w_t, \mathbf r_t)\big)\Big)
//! $$
//!
//! Exponential-gradient weight updates, group-sparsity shrinkage and the
//! max-weight projection. Each stage is a separate operation.

pub mod constraint;
pub mod eg;
pub mod sparsity;

pub use constraint::clip_and_renormalize;
pub use constraint::clip_to_max_weight;
pub use constraint::project;
pub use constraint::MaxWeightPolicy;
pub use eg::eg_step;
pub use eg::exponential_gradient_update;
pub use eg::portfolio_return;
pub use eg::EgStep;
pub use eg::EXPONENT_CLIP;
pub use eg::RETURN_EPSILON;
pub use sparsity::apply_group_sparsity;
pub use sparsity::GroupMapping;
