//! The Newton-Raphson state machine for one starting point.
//!
//! Each run records every iterate it visits together with the residual
//! norm that triggered the step, so the boundary layer can replay the
//! full convergence path. Runs are deterministic and total: every start
//! reaches exactly one [`Termination`] within the configured cap.

use anyhow::{bail, Result};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::conic::ConicPair;

pub const DEFAULT_MAX_STEPS: usize = 50;
pub const DEFAULT_TOLERANCE: f64 = 1e-9;
pub const DEFAULT_ESCAPE_RADIUS: f64 = 1e8;

/// Settings controlling the Newton-Raphson iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    /// Iteration cap N; a trace holds at most N+1 elements.
    pub max_steps: usize,
    /// Convergence tolerance τ on the residual norm.
    pub tolerance: f64,
    /// Iterate magnitude beyond which a trace counts as escaped.
    pub escape_radius: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            tolerance: DEFAULT_TOLERANCE,
            escape_radius: DEFAULT_ESCAPE_RADIUS,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            bail!("max_steps must be greater than zero.");
        }
        if self.tolerance <= 0.0 {
            bail!("tolerance must be positive.");
        }
        if self.escape_radius <= 0.0 || !self.escape_radius.is_finite() {
            bail!("escape_radius must be positive and finite.");
        }
        Ok(())
    }
}

/// Cause of a diverged trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Divergence {
    /// The iterate left the finite search region (or stopped being
    /// representable).
    Escaped,
    /// The Jacobian determinant was numerically zero at an iterate.
    SingularJacobian,
}

/// How a run ended. Exactly one of these holds per finished trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    Diverged(Divergence),
    MaxIterationsExceeded,
}

/// One recorded iterate. Element 0 carries the starting point and its
/// own residual norm; element i ≥ 1 carries the point reached by step i
/// and the residual norm that triggered that step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationStep {
    pub point: Vector2<f64>,
    pub residual_norm: f64,
}

/// Full record of a single run, oldest step first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonTrace {
    pub steps: Vec<IterationStep>,
    pub termination: Termination,
}

impl NewtonTrace {
    /// The last iterate reached, whatever the termination state.
    pub fn final_point(&self) -> Vector2<f64> {
        self.steps[self.steps.len() - 1].point
    }

    /// Number of Newton updates performed (trace length minus the seed
    /// element).
    pub fn steps_taken(&self) -> usize {
        self.steps.len() - 1
    }
}

/// Run Newton-Raphson on `pair` from `start` until the residual norm
/// drops below tolerance, the iterate diverges, or the step cap is hit.
///
/// A start already within tolerance converges with a one-element trace;
/// no step is taken from a point whose residual already satisfies τ.
pub fn solve(pair: &ConicPair, start: Vector2<f64>, settings: &NewtonSettings) -> Result<NewtonTrace> {
    settings.validate()?;
    if !start.x.is_finite() || !start.y.is_finite() {
        bail!("Starting point must be finite, got ({}, {}).", start.x, start.y);
    }

    let mut point = start;
    let mut eval = pair.evaluate(point);
    let mut residual_norm = eval.residual_norm();
    let mut steps = vec![IterationStep {
        point,
        residual_norm,
    }];

    if residual_norm < settings.tolerance {
        return Ok(NewtonTrace {
            steps,
            termination: Termination::Converged,
        });
    }

    for _ in 0..settings.max_steps {
        let delta = match eval.newton_step() {
            Ok(delta) => delta,
            Err(_) => {
                return Ok(NewtonTrace {
                    steps,
                    termination: Termination::Diverged(Divergence::SingularJacobian),
                })
            }
        };
        let next = point + delta;
        // The recorded error of step i is the residual at the point the
        // step was taken from.
        steps.push(IterationStep {
            point: next,
            residual_norm,
        });

        if !next.x.is_finite() || !next.y.is_finite() || next.norm() > settings.escape_radius {
            return Ok(NewtonTrace {
                steps,
                termination: Termination::Diverged(Divergence::Escaped),
            });
        }

        point = next;
        eval = pair.evaluate(point);
        residual_norm = eval.residual_norm();
        if residual_norm < settings.tolerance {
            return Ok(NewtonTrace {
                steps,
                termination: Termination::Converged,
            });
        }
    }

    Ok(NewtonTrace {
        steps,
        termination: Termination::MaxIterationsExceeded,
    })
}
