//! # Network
//!
//! $$
//! G = \operatorname{MST}\big(\{d_{ij}\}\big),\qquad d_{ij} = \sqrt{2(1-\rho_{ij})}
//! $$
//!
//! Correlation network filtering and momentum spillover scoring.

pub mod momentum;
pub mod mst;

pub use momentum::compute_network_momentum;
pub use momentum::neighbor_weights;
pub use momentum::score_with_network;
pub use momentum::MomentumConfig;
pub use momentum::MomentumScore;
pub use momentum::NetworkMomentum;
pub use mst::build_filtered_network;
pub use mst::correlation_distance;
pub use mst::FilteredNetwork;
