//! # netfolio
//!
//! $$
//! s_i = \tfrac12 m_i + \tfrac12 \sum_{j \in \mathcal N(i)} \omega_{ij} m_j,\qquad
//! w_{t+1,i} \propto w_{t,i}\, e^{\eta\, r_{t,i} / (w_t^\top r_t)}
//! $$
//!
//! Network momentum spillover scores and online exponential-gradient
//! portfolios from a cleaned time × asset return table.
//!
//! - [`network`]: correlation MST and one-hop momentum spillover.
//! - [`online`]: exponential-gradient update, group sparsity, max-weight projection.
//! - [`backtest`]: day-by-day simulation with drift, turnover costs and metrics.
//! - [`engine`]: a single configured entry point over all of the above.
//!
//! Every operation is a pure function of its inputs; nothing is cached or
//! persisted between calls.

pub mod backtest;
pub mod data;
pub mod engine;
pub mod error;
pub mod network;
pub mod online;

pub use data::correlation_matrix;
pub use data::ReturnMatrix;
pub use engine::EngineConfig;
pub use engine::NetfolioEngine;
pub use error::NetfolioError;
pub use error::Result;
