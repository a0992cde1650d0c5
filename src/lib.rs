//! # frontier-rs
//!
//! Markowitz portfolio optimization for a set of assets with a shared price
//! history. See [`portfolio`] for the pipeline and [`portfolio::PortfolioEngine`]
//! for the single-call entry point.

pub mod portfolio;
