use anyhow::Context;
use chrono::Duration;
use chrono::NaiveDate;
use ndarray::Array2;
use netfolio::backtest::BacktestConfig;
use netfolio::backtest::BacktestResult;
use netfolio::network::MomentumConfig;
use netfolio::online::GroupMapping;
use netfolio::EngineConfig;
use netfolio::NetfolioEngine;
use netfolio::ReturnMatrix;
use prettytable::row;
use prettytable::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use tracing_subscriber::EnvFilter;

const ASSETS: [(&str, &str); 6] = [
  ("BTC", "crypto"),
  ("ETH", "crypto"),
  ("SOL", "crypto"),
  ("SPY", "equity"),
  ("QQQ", "equity"),
  ("GLD", "metal"),
];
const PERIODS: usize = 250;

/// One market factor, one factor per group and idiosyncratic noise.
fn synthetic_returns(seed: u64) -> anyhow::Result<ReturnMatrix> {
  let mut rng = StdRng::seed_from_u64(seed);
  let market = Normal::new(0.0004, 0.01)?;
  let group = Normal::new(0.0, 0.008)?;
  let noise = Normal::new(0.0, 0.006)?;

  let groups = GroupMapping::from_labels(ASSETS.iter().map(|(_, g)| *g));
  let mut returns = Array2::<f64>::zeros((PERIODS, ASSETS.len()));
  for t in 0..PERIODS {
    let m = market.sample(&mut rng);
    let g: Vec<f64> = (0..groups.n_groups()).map(|_| group.sample(&mut rng)).collect();
    for (k, members) in groups.groups().iter().enumerate() {
      for &i in members {
        returns[[t, i]] = m + g[k] + noise.sample(&mut rng);
      }
    }
  }

  let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
  let dates = (0..PERIODS as i64).map(|d| start + Duration::days(d)).collect();
  let assets = ASSETS.iter().map(|(a, _)| a.to_string()).collect();
  Ok(ReturnMatrix::with_dates(assets, dates, returns)?)
}

fn print_backtest(label: &str, res: &BacktestResult) {
  let mut table = Table::new();
  table.add_row(row![label, "total return", "sharpe", "max drawdown"]);
  for (name, m) in [("strategy", &res.strategy_metrics), ("benchmark", &res.benchmark_metrics)] {
    table.add_row(row![
      name,
      format!("{:.4}", m.total_return),
      format!("{:.3}", m.sharpe_ratio),
      format!("{:.4}", m.max_drawdown)
    ]);
  }
  table.printstd();
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "netfolio=info".into()))
    .init();

  let returns = synthetic_returns(42)?;
  let groups = GroupMapping::from_labels(ASSETS.iter().map(|(_, g)| *g));

  let engine = NetfolioEngine::new(EngineConfig {
    momentum: MomentumConfig {
      lookback: 20,
      ..Default::default()
    },
    backtest: BacktestConfig {
      learning_rate: 0.05,
      max_weight: 0.35,
      group_sparsity: Some((groups, 0.02)),
      ..Default::default()
    },
  });

  let momentum = engine.momentum(&returns)?;
  let mut table = Table::new();
  table.add_row(row!["asset", "own", "spillover", "score", "neighbors"]);
  for s in &momentum.scores {
    let neighbors = momentum
      .network
      .neighbors(&s.asset)
      .unwrap_or_default()
      .join(", ");
    table.add_row(row![
      s.asset,
      format!("{:.5}", s.own_momentum),
      s.spillover.map(|x| format!("{x:.5}")).unwrap_or_else(|| "-".into()),
      format!("{:.5}", s.score),
      neighbors
    ]);
  }
  table.printstd();

  let res = engine.backtest(&returns)?;
  print_backtest("eg", &res);

  let mut weights = Table::new();
  weights.add_row(row!["asset", "final weight"]);
  for (asset, w) in res.final_allocation() {
    weights.add_row(row![asset, format!("{w:.4}")]);
  }
  weights.add_row(row!["cash", format!("{:.4}", res.cash_weight())]);
  weights.printstd();

  for (eta, res) in [0.01, 0.1, 1.0]
    .iter()
    .zip(engine.backtest_learning_rates(&returns, &[0.01, 0.1, 1.0]))
  {
    print_backtest(&format!("eta={eta}"), &res?);
  }

  Ok(())
}
