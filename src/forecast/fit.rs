//! Exponential Curve Fitting
//! Nonlinear least squares for `y = a * exp(b * x)`.
//!
//! The solver is Levenberg-Marquardt over the two parameters. Its starting
//! point comes from a log-linear regression on the positive observations;
//! there is exactly one attempt per fit.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Insufficient data: need at least {required} distinct points, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("All observations are zero; growth rate is undetermined")]
    Degenerate,
    #[error("Solver did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("Solver diverged: {0}")]
    Diverged(String),
}

/// Fitted parameters of `y = a * exp(b * x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExponentialParams {
    pub a: f64,
    pub b: f64,
}

impl ExponentialParams {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * (self.b * x).exp()
    }

    /// Sum of squared residuals over `points`.
    pub fn sse(&self, points: &[(f64, f64)]) -> f64 {
        points
            .iter()
            .map(|&(x, y)| (y - self.evaluate(x)).powi(2))
            .sum()
    }
}

/// Fits an exponential curve to `(x, y)` points.
pub trait ExponentialFitter {
    fn fit(&self, points: &[(f64, f64)]) -> Result<ExponentialParams, FitError>;
}

/// Levenberg-Marquardt solver settings.
#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    /// Relative parameter step below which the fit has converged.
    pub step_tolerance: f64,
    /// Relative SSE improvement below which the fit has converged.
    pub cost_tolerance: f64,
    pub initial_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 600,
            step_tolerance: 1e-10,
            cost_tolerance: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

impl LevenbergMarquardt {
    /// Starting point from a straight-line fit of `ln y` against `x`.
    fn initial_guess(points: &[(f64, f64)]) -> ExponentialParams {
        let logs: Vec<(f64, f64)> = points
            .iter()
            .filter(|(_, y)| *y > 0.0)
            .map(|&(x, y)| (x, y.ln()))
            .collect();

        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64;
        let distinct_x = logs
            .iter()
            .map(|(x, _)| x.to_bits())
            .collect::<HashSet<_>>()
            .len();
        if distinct_x < 2 {
            return ExponentialParams { a: mean_y, b: 0.0 };
        }

        let n = logs.len() as f64;
        let mean_x = logs.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_ln = logs.iter().map(|(_, l)| l).sum::<f64>() / n;
        let sxx: f64 = logs.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sxy: f64 = logs
            .iter()
            .map(|(x, l)| (x - mean_x) * (l - mean_ln))
            .sum();

        let b = sxy / sxx;
        let a = (mean_ln - b * mean_x).exp();
        ExponentialParams { a, b }
    }

    /// Normal equations `(JᵀJ, Jᵀr)` at `params`.
    fn normal_equations(
        params: ExponentialParams,
        points: &[(f64, f64)],
    ) -> ([[f64; 2]; 2], [f64; 2]) {
        let mut jtj = [[0.0; 2]; 2];
        let mut jtr = [0.0; 2];
        for &(x, y) in points {
            let e = (params.b * x).exp();
            let grad = [e, params.a * x * e];
            let residual = y - params.a * e;
            for i in 0..2 {
                jtr[i] += grad[i] * residual;
                for j in 0..2 {
                    jtj[i][j] += grad[i] * grad[j];
                }
            }
        }
        (jtj, jtr)
    }

    /// Solve the damped 2x2 system, `None` when singular.
    fn damped_step(jtj: &[[f64; 2]; 2], jtr: &[f64; 2], damping: f64) -> Option<[f64; 2]> {
        let m00 = jtj[0][0] * (1.0 + damping);
        let m11 = jtj[1][1] * (1.0 + damping);
        let m01 = jtj[0][1];
        let det = m00 * m11 - m01 * m01;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some([
            (jtr[0] * m11 - m01 * jtr[1]) / det,
            (m00 * jtr[1] - m01 * jtr[0]) / det,
        ])
    }
}

impl ExponentialFitter for LevenbergMarquardt {
    fn fit(&self, points: &[(f64, f64)]) -> Result<ExponentialParams, FitError> {
        let distinct = points
            .iter()
            .map(|(x, _)| x.to_bits())
            .collect::<HashSet<_>>()
            .len();
        if distinct < 2 {
            return Err(FitError::InsufficientData {
                required: 2,
                actual: distinct,
            });
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(FitError::Diverged("non-finite observation".to_string()));
        }
        if points.iter().all(|(_, y)| *y == 0.0) {
            return Err(FitError::Degenerate);
        }

        let mut params = Self::initial_guess(points);
        let mut cost = params.sse(points);
        if !cost.is_finite() {
            return Err(FitError::Diverged("initial guess overflows".to_string()));
        }
        let mut damping = self.initial_damping;

        for _ in 0..self.max_iterations {
            if cost == 0.0 {
                return Ok(params);
            }

            let (jtj, jtr) = Self::normal_equations(params, points);
            let Some(step) = Self::damped_step(&jtj, &jtr, damping) else {
                return Err(FitError::Diverged("singular normal equations".to_string()));
            };

            let candidate = ExponentialParams {
                a: params.a + step[0],
                b: params.b + step[1],
            };
            let candidate_cost = candidate.sse(points);

            if candidate_cost.is_finite() && candidate_cost < cost {
                let improvement = (cost - candidate_cost) / cost;
                let step_size = (step[0] / (params.a.abs() + f64::EPSILON))
                    .abs()
                    .max((step[1] / (params.b.abs() + f64::EPSILON)).abs());

                params = candidate;
                cost = candidate_cost;
                damping = (damping / 10.0).max(1e-12);

                if improvement < self.cost_tolerance || step_size < self.step_tolerance {
                    return Ok(params);
                }
            } else {
                damping *= 10.0;
                // no step of any length reduces the cost: local minimum
                if damping > 1e16 {
                    return Ok(params);
                }
            }

            if !params.a.is_finite() || !params.b.is_finite() {
                return Err(FitError::Diverged("non-finite parameters".to_string()));
            }
        }

        Err(FitError::NotConverged {
            iterations: self.max_iterations,
        })
    }
}
