//! # Backtest
//!
//! $$
//! W^{\text{bench}}_t = W^{\text{bench}}_{t-1}\Big(1 + \tfrac{1}{N}\textstyle\sum_i r_{t,i}\Big)
//! $$
//!
//! Transaction-cost-aware simulation of the online allocation and its metrics.

pub mod engine;
pub mod metrics;

pub use engine::drift_weights;
pub use engine::run_backtest;
pub use engine::run_backtests;
pub use engine::turnover;
pub use engine::Allocation;
pub use engine::BacktestConfig;
pub use engine::BacktestResult;
pub use engine::MAX_TRANSACTION_FEE;
pub use metrics::max_drawdown;
pub use metrics::sharpe_ratio;
pub use metrics::total_return;
pub use metrics::PerformanceMetrics;
pub use metrics::TRADING_DAYS;
