//! Known roots and the rule that labels a finished trace.

use anyhow::{bail, Result};
use nalgebra::Vector2;

use crate::newton::{Divergence, Termination};

pub const DEFAULT_MATCH_EPSILON: f64 = 1e-4;

/// A labeled target a converged (or escaped) run may match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnownRoot {
    Finite(Vector2<f64>),
    /// Sentinel for traces that escape to unbounded magnitude, cataloged
    /// so basin maps can render the escaped region distinctly.
    PointAtInfinity,
}

/// Outcome of classifying one finished trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Index into the catalog's root list.
    MatchedRoot(usize),
    /// Converged, but not within ε of any cataloged root.
    Unclassified,
    /// The trace never settled on a finite root candidate.
    NonConvergent,
}

/// The ordered set of expected solutions plus the matching tolerance.
/// Catalog order defines match priority and is fixed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RootCatalog {
    roots: Vec<KnownRoot>,
    epsilon: f64,
}

impl RootCatalog {
    pub fn new(roots: Vec<KnownRoot>, epsilon: f64) -> Result<Self> {
        if epsilon <= 0.0 {
            bail!("Matching tolerance must be positive.");
        }
        for root in &roots {
            if let KnownRoot::Finite(point) = root {
                if !point.x.is_finite() || !point.y.is_finite() {
                    bail!("Cataloged root ({}, {}) is not finite.", point.x, point.y);
                }
            }
        }
        Ok(Self { roots, epsilon })
    }

    pub fn roots(&self) -> &[KnownRoot] {
        &self.roots
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Label a finished trace by its final point and termination state.
    ///
    /// Escaped traces match the point-at-infinity sentinel. Singular
    /// Jacobians and exhausted iteration caps are non-convergent.
    /// Converged traces match the first cataloged finite root within ε.
    pub fn classify(&self, final_point: Vector2<f64>, termination: Termination) -> Classification {
        match termination {
            Termination::Diverged(Divergence::Escaped) => self
                .roots
                .iter()
                .position(|root| matches!(root, KnownRoot::PointAtInfinity))
                .map_or(Classification::NonConvergent, Classification::MatchedRoot),
            Termination::Diverged(Divergence::SingularJacobian)
            | Termination::MaxIterationsExceeded => Classification::NonConvergent,
            Termination::Converged => {
                for (index, root) in self.roots.iter().enumerate() {
                    if let KnownRoot::Finite(point) = root {
                        if (final_point - point).norm() <= self.epsilon {
                            return Classification::MatchedRoot(index);
                        }
                    }
                }
                Classification::Unclassified
            }
        }
    }
}
