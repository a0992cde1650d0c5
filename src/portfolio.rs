//! # Portfolio
//!
//! $$
//! \max_{\mathbf{w}\in\Delta^{N-1}}\frac{P\,\mu^\top\mathbf{w}-r_f}{k\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}\sqrt P}
//! $$
//!
//! Long-only mean-variance optimization over a price history: sample moments,
//! max-Sharpe and min-variance portfolios, the efficient frontier and a
//! random-portfolio scatter.

pub mod cancel;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod optimizers;
pub mod performance;
pub mod statistics;
pub mod types;

pub use cancel::CancellationToken;
pub use config::AnnualizationConfig;
pub use config::ConvergencePolicy;
pub use config::FrontierConfig;
pub use config::SolverConfig;
pub use config::SweepUpperBound;
pub use data::PriceTable;
pub use data::simple_returns_series;
pub use engine::EfficientFrontierReport;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use error::PortfolioError;
pub use error::Result;
pub use frontier::FrontierBuilder;
pub use frontier::build_frontier;
pub use frontier::build_random_portfolios;
pub use frontier::summarize_optimal_points;
pub use optimizers::ConstrainedOptimizer;
pub use optimizers::Constraint;
pub use optimizers::Objective;
pub use optimizers::OptimizationOutcome;
pub use optimizers::optimize;
pub use performance::PerformanceEvaluator;
pub use performance::portfolio_performance;
pub use statistics::AssetStatistics;
pub use statistics::compute_statistics;
pub use statistics::compute_statistics_from_returns;
pub use types::AssetPoint;
pub use types::AssetUniverse;
pub use types::FrontierPoint;
pub use types::FrontierTable;
pub use types::MomentEstimates;
pub use types::OptimalPointRow;
pub use types::OptimalPointsTable;
pub use types::PortfolioPerformance;
pub use types::PortfolioType;
pub use types::PortfolioWeights;
