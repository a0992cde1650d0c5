//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}\in\Delta^{N-1}} f(\mathbf{w})
//! \quad\text{s.t.}\quad h_j(\mathbf{w})=0,\ g_k(\mathbf{w})\le 0
//! $$
//!
//! Long-only, fully invested mean-variance optimization. The simplex is
//! enforced exactly through a softmax parametrization $\mathbf{w}=\operatorname{softmax}(\mathbf{x})$,
//! which is minimized with Nelder-Mead. Extra constraints are handled with an
//! augmented-Lagrangian outer loop:
//!
//! $$
//! \mathcal L_\rho(\mathbf{x},\lambda)=f+\sum_j\left(\lambda_j h_j+\tfrac\rho2 h_j^2\right)
//! +\sum_k\tfrac1{2\rho}\left(\max(0,\lambda_k+\rho g_k)^2-\lambda_k^2\right)
//! $$

use std::fmt::Display;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;
use tracing::warn;

use super::config::AnnualizationConfig;
use super::config::ConvergencePolicy;
use super::config::SolverConfig;
use super::config::ZERO_RISK_PENALTY;
use super::error::PortfolioError;
use super::error::Result;
use super::performance::PerformanceEvaluator;
use super::types::MomentEstimates;
use super::types::PortfolioPerformance;
use super::types::PortfolioWeights;

/// Quantity minimized (or maximized) over the weight simplex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Objective {
  /// Maximize `(return - risk_free_rate) / risk`.
  MaxSharpeRatio { risk_free_rate: f64 },
  /// Minimize risk.
  MinVariance,
  /// Minimize risk subject to `return == target_return`.
  TargetReturnVariance { target_return: f64 },
  /// Maximize return subject to `risk <= target_risk`.
  TargetRiskReturn { target_risk: f64 },
}

impl Objective {
  /// Value in minimization form.
  fn cost(&self, perf: &PortfolioPerformance) -> f64 {
    match *self {
      Objective::MaxSharpeRatio { risk_free_rate } => {
        if perf.annualized_risk == 0.0 {
          ZERO_RISK_PENALTY
        } else {
          -(perf.annualized_return - risk_free_rate) / perf.annualized_risk
        }
      }
      Objective::MinVariance | Objective::TargetReturnVariance { .. } => perf.annualized_risk,
      Objective::TargetRiskReturn { .. } => -perf.annualized_return,
    }
  }

  /// Convert a minimization-form value back to its natural direction.
  pub fn natural_value(&self, cost: f64) -> f64 {
    match self {
      Objective::MaxSharpeRatio { .. } | Objective::TargetRiskReturn { .. } => -cost,
      Objective::MinVariance | Objective::TargetReturnVariance { .. } => cost,
    }
  }

  fn implied_constraint(&self) -> Option<Constraint> {
    match *self {
      Objective::TargetReturnVariance { target_return } => {
        Some(Constraint::ReturnEquals(target_return))
      }
      Objective::TargetRiskReturn { target_risk } => Some(Constraint::RiskAtMost(target_risk)),
      Objective::MaxSharpeRatio { .. } | Objective::MinVariance => None,
    }
  }
}

impl Display for Objective {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Objective::MaxSharpeRatio { .. } => write!(f, "max-Sharpe"),
      Objective::MinVariance => write!(f, "min-variance"),
      Objective::TargetReturnVariance { target_return } => {
        write!(f, "target-return ({target_return:.4})")
      }
      Objective::TargetRiskReturn { target_risk } => write!(f, "target-risk ({target_risk:.4})"),
    }
  }
}

/// Constraint layered on top of the simplex, on annualized quantities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint {
  ReturnEquals(f64),
  ReturnAtLeast(f64),
  RiskAtMost(f64),
}

impl Constraint {
  fn is_equality(&self) -> bool {
    matches!(self, Constraint::ReturnEquals(_))
  }

  /// `h(w)` for equalities, `g(w)` with `g <= 0` feasible for inequalities.
  fn residual(&self, perf: &PortfolioPerformance) -> f64 {
    match *self {
      Constraint::ReturnEquals(target) => perf.annualized_return - target,
      Constraint::ReturnAtLeast(bound) => bound - perf.annualized_return,
      Constraint::RiskAtMost(bound) => perf.annualized_risk - bound,
    }
  }

  /// Whether no long-only, fully invested portfolio can satisfy the constraint,
  /// given the annualized return range `[lo, hi]` spanned by single assets.
  fn is_unreachable(&self, lo: f64, hi: f64, tolerance: f64) -> bool {
    match *self {
      Constraint::ReturnEquals(target) => target > hi + tolerance || target < lo - tolerance,
      Constraint::ReturnAtLeast(bound) => bound > hi + tolerance,
      Constraint::RiskAtMost(bound) => bound < -tolerance,
    }
  }

  fn violation(&self, perf: &PortfolioPerformance) -> f64 {
    let r = self.residual(perf);
    if self.is_equality() {
      r.abs()
    } else {
      r.max(0.0)
    }
  }
}

/// Result of one constrained solve.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationOutcome {
  pub objective: Objective,
  /// Objective at the optimum in its natural direction (Sharpe reported positive).
  pub objective_value: f64,
  pub weights: PortfolioWeights,
  pub performance: PortfolioPerformance,
  /// Inner solver converged and every extra constraint is within tolerance.
  pub converged: bool,
  /// Total Nelder-Mead iterations across restarts and outer rounds.
  pub iterations: u64,
  /// Largest absolute constraint violation at the optimum.
  pub constraint_violation: f64,
  /// Augmented-Lagrangian rounds actually run.
  pub outer_rounds: usize,
}

/// Stable softmax mapping unconstrained logits onto the simplex.
fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if !(sum.is_finite() && sum > 1e-15) {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Unit simplex around `x0` spanning every logit direction.
fn simplex_around(x0: &[f64]) -> Vec<Vec<f64>> {
  let mut simplex = Vec::with_capacity(x0.len() + 1);
  simplex.push(x0.to_vec());
  for i in 0..x0.len() {
    let mut point = x0.to_vec();
    point[i] += 1.0;
    simplex.push(point);
  }
  simplex
}

struct AugmentedCost<'a> {
  evaluator: PerformanceEvaluator<'a>,
  objective: Objective,
  constraints: &'a [Constraint],
  multipliers: &'a [f64],
  penalty: f64,
}

impl CostFunction for AugmentedCost<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let perf = self.evaluator.evaluate_unchecked(&w);
    let mut value = self.objective.cost(&perf);

    for (constraint, &lambda) in self.constraints.iter().zip(self.multipliers) {
      let r = constraint.residual(&perf);
      value += if constraint.is_equality() {
        lambda * r + 0.5 * self.penalty * r * r
      } else {
        let shifted = (lambda + self.penalty * r).max(0.0);
        (shifted * shifted - lambda * lambda) / (2.0 * self.penalty)
      };
    }

    Ok(value)
  }
}

struct InnerSolve {
  x: Vec<f64>,
  iterations: u64,
  converged: bool,
}

fn minimize(cost: AugmentedCost<'_>, x0: Vec<f64>, config: &SolverConfig) -> Result<InnerSolve> {
  let solver = NelderMead::new(simplex_around(&x0))
    .with_sd_tolerance(config.sd_tolerance)
    .map_err(|err| PortfolioError::InvalidConfig(err.to_string()))?;

  match Executor::new(cost, solver)
    .configure(|state| state.max_iters(config.max_iters))
    .run()
  {
    Ok(res) => {
      let converged = matches!(
        res.state.termination_status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
      );
      Ok(InnerSolve {
        iterations: res.state.iter,
        x: res.state.best_param.unwrap_or(x0),
        converged,
      })
    }
    Err(err) => {
      warn!(%err, "Nelder-Mead run failed, keeping starting point");
      Ok(InnerSolve {
        x: x0,
        iterations: 0,
        converged: false,
      })
    }
  }
}

/// Constrained minimizer over long-only, fully invested weights.
#[derive(Clone, Copy, Debug)]
pub struct ConstrainedOptimizer<'a> {
  evaluator: PerformanceEvaluator<'a>,
  config: SolverConfig,
}

impl<'a> ConstrainedOptimizer<'a> {
  pub fn new(
    moments: &'a MomentEstimates,
    annualization: AnnualizationConfig,
    config: SolverConfig,
  ) -> Self {
    Self {
      evaluator: PerformanceEvaluator::new(moments, annualization),
      config,
    }
  }

  pub fn evaluator(&self) -> &PerformanceEvaluator<'a> {
    &self.evaluator
  }

  pub fn config(&self) -> &SolverConfig {
    &self.config
  }

  /// Solve `objective` starting from the uniform allocation.
  ///
  /// `extra_constraints` are applied in order on top of the simplex and of any
  /// constraint implied by the objective itself.
  pub fn optimize(
    &self,
    objective: Objective,
    extra_constraints: &[Constraint],
  ) -> Result<OptimizationOutcome> {
    self.evaluator.annualization().validate()?;
    let n = self.evaluator.moments().dim();
    if n == 0 {
      return Err(PortfolioError::EmptyUniverse);
    }

    let constraints: Vec<Constraint> = objective
      .implied_constraint()
      .into_iter()
      .chain(extra_constraints.iter().copied())
      .collect();
    let periods = self.evaluator.annualization().periods_per_year;
    let mean = &self.evaluator.moments().mean_return;
    let lo = periods * mean.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = periods * mean.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let unreachable = constraints
      .iter()
      .any(|c| c.is_unreachable(lo, hi, self.config.constraint_tolerance));
    if unreachable {
      debug!(%objective, lo, hi, "constraint unreachable on the simplex, solving once");
    }

    // An unreachable target keeps the best single-round point.
    let (rounds, restarts) = if constraints.is_empty() {
      (1, self.config.restarts)
    } else if unreachable {
      (1, 0)
    } else {
      (self.config.outer_iters.max(1), self.config.restarts)
    };

    // Zero logits map to the uniform allocation 1/N.
    let mut x = vec![0.0; n];
    let mut multipliers = vec![0.0; constraints.len()];
    let mut penalty = self.config.initial_penalty;
    let mut iterations = 0;
    let mut inner_converged = false;
    let mut violation = 0.0;
    let mut previous_violation = f64::INFINITY;
    let mut outer_rounds = 0;

    for _ in 0..rounds {
      outer_rounds += 1;
      for _ in 0..=restarts {
        let cost = AugmentedCost {
          evaluator: self.evaluator,
          objective,
          constraints: &constraints,
          multipliers: &multipliers,
          penalty,
        };
        let step = minimize(cost, x, &self.config)?;
        x = step.x;
        iterations += step.iterations;
        inner_converged = step.converged;
      }

      let perf = self.evaluator.evaluate_unchecked(&softmax(&x));
      violation = constraints
        .iter()
        .map(|c| c.violation(&perf))
        .fold(0.0, f64::max);
      if violation <= self.config.constraint_tolerance {
        break;
      }
      if violation > self.config.stall_ratio * previous_violation {
        debug!(%objective, violation, previous_violation, "constraint violation stalled");
        break;
      }
      previous_violation = violation;

      for (constraint, lambda) in constraints.iter().zip(multipliers.iter_mut()) {
        let updated = *lambda + penalty * constraint.residual(&perf);
        *lambda = if constraint.is_equality() {
          updated
        } else {
          updated.max(0.0)
        };
      }
      penalty *= self.config.penalty_growth;
    }

    let weights = PortfolioWeights::new(softmax(&x))?;
    let performance = self.evaluator.evaluate_unchecked(&weights);
    let objective_value = objective.natural_value(objective.cost(&performance));
    let converged = inner_converged && violation <= self.config.constraint_tolerance;

    debug!(
      %objective,
      objective_value,
      iterations,
      outer_rounds,
      violation,
      converged,
      "optimization finished"
    );

    if !converged {
      match self.config.policy {
        ConvergencePolicy::Fail => {
          return Err(PortfolioError::OptimizationDidNotConverge {
            objective,
            iterations,
            violation,
          });
        }
        ConvergencePolicy::Warn => {
          warn!(
            %objective,
            iterations,
            violation,
            "optimization did not converge, keeping best point"
          );
        }
      }
    }

    Ok(OptimizationOutcome {
      objective,
      objective_value,
      weights,
      performance,
      converged,
      iterations,
      constraint_violation: violation,
      outer_rounds,
    })
  }

  /// Portfolio with the highest Sharpe ratio.
  pub fn max_sharpe_ratio(&self, risk_free_rate: f64) -> Result<OptimizationOutcome> {
    self.optimize(Objective::MaxSharpeRatio { risk_free_rate }, &[])
  }

  /// Global minimum-risk portfolio.
  pub fn min_variance(&self) -> Result<OptimizationOutcome> {
    self.optimize(Objective::MinVariance, &[])
  }

  /// Minimum-risk portfolio earning `target_return`.
  pub fn target_return_variance(&self, target_return: f64) -> Result<OptimizationOutcome> {
    self.optimize(Objective::TargetReturnVariance { target_return }, &[])
  }

  /// Maximum-return portfolio with risk at most `target_risk`.
  pub fn target_risk_return(&self, target_risk: f64) -> Result<OptimizationOutcome> {
    self.optimize(Objective::TargetRiskReturn { target_risk }, &[])
  }
}

/// One-shot solve with explicit moments and settings.
pub fn optimize(
  objective: Objective,
  moments: &MomentEstimates,
  extra_constraints: &[Constraint],
  annualization: &AnnualizationConfig,
  config: &SolverConfig,
) -> Result<OptimizationOutcome> {
  ConstrainedOptimizer::new(moments, *annualization, *config).optimize(objective, extra_constraints)
}
