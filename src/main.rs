use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use frontier_rs::portfolio::ConvergencePolicy;
use frontier_rs::portfolio::FrontierConfig;
use frontier_rs::portfolio::PortfolioEngine;
use frontier_rs::portfolio::PortfolioEngineConfig;
use frontier_rs::portfolio::PriceTable;
use frontier_rs::portfolio::SolverConfig;
use frontier_rs::portfolio::SweepUpperBound;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "frontier")]
#[command(about = "Efficient frontier of a CSV price history (Date,<asset>,...)")]
struct Cli {
  /// CSV file with a `Date` column followed by one adjusted-close column per asset
  prices: PathBuf,

  /// Annual risk-free rate used in Sharpe ratios
  #[arg(long, default_value_t = 0.0)]
  risk_free_rate: f64,

  /// Targets in the frontier sweep
  #[arg(long, default_value_t = 500)]
  points: usize,

  /// Random portfolios in the scatter
  #[arg(long, default_value_t = 2000)]
  random: usize,

  /// Seed for the random scatter
  #[arg(long)]
  seed: Option<u64>,

  /// Stop the sweep at the best single-asset return instead of 100%
  #[arg(long)]
  reachable: bool,

  /// Fail instead of warning when a solve does not converge
  #[arg(long)]
  strict: bool,

  /// Print the full frontier table
  #[arg(long)]
  frontier: bool,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();

  let prices = PriceTable::from_csv_path(&cli.prices)
    .with_context(|| format!("failed to read {}", cli.prices.display()))?;
  info!(
    assets = prices.assets().len(),
    rows = prices.n_rows(),
    "loaded price history"
  );

  let config = PortfolioEngineConfig {
    frontier: FrontierConfig {
      risk_free_rate: cli.risk_free_rate,
      upper_bound: if cli.reachable {
        SweepUpperBound::MaxAssetReturn
      } else {
        SweepUpperBound::default()
      },
      seed: cli.seed,
      solver: SolverConfig {
        policy: if cli.strict {
          ConvergencePolicy::Fail
        } else {
          ConvergencePolicy::Warn
        },
        ..SolverConfig::default()
      },
      ..FrontierConfig::default()
    },
    frontier_points: cli.points,
    random_portfolios: cli.random,
  };

  let report = PortfolioEngine::new(config).run(&prices)?;

  println!("Optimal portfolios");
  report.optimal_points.to_table().printstd();

  let mut assets = Table::new();
  assets.set_titles(Row::new(
    ["Asset", "Return", "Std", "Return/Std"]
      .iter()
      .map(|c| Cell::new(c))
      .collect(),
  ));
  for point in &report.asset_points {
    assets.add_row(Row::new(vec![
      Cell::new(&point.asset),
      Cell::new(&format!("{:.3}", point.annualized_return)),
      Cell::new(&format!("{:.3}", point.annualized_risk)),
      Cell::new(&format!("{:.3}", point.return_to_risk)),
    ]));
  }
  println!("\nIndividual assets");
  assets.printstd();

  let unconverged = report.frontier.points.iter().filter(|p| !p.converged).count();
  println!(
    "\nFrontier: {} points ({} unconverged), {} random portfolios",
    report.frontier.len(),
    unconverged,
    report.random_portfolios.len()
  );
  if cli.frontier {
    report.frontier.to_table().printstd();
  }

  Ok(())
}
