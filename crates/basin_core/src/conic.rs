//! Conic sections and their pointwise evaluation.
//!
//! A conic is the zero set of a·x² + b·xy + c·y² + d·x + e·y + f. The
//! solver only ever needs curve values and first partials, so that is
//! all this module computes.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Determinant magnitude below which a Jacobian is treated as singular.
pub const SINGULAR_DET_EPS: f64 = 1e-12;

/// Raised when the Jacobian determinant is numerically zero at an
/// iterate. The owning trace terminates as diverged; this is never a
/// process-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("singular Jacobian at ({x}, {y}): |det J| = {det:.3e}")]
pub struct SingularJacobian {
    pub x: f64,
    pub y: f64,
    pub det: f64,
}

/// Coefficients of a conic a·x² + b·xy + c·y² + d·x + e·y + f = 0.
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Conic {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Curve value at (x, y).
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.a * x * x + self.b * x * y + self.c * y * y + self.d * x + self.e * y + self.f
    }

    /// Gradient (∂/∂x, ∂/∂y) at (x, y).
    pub fn gradient(&self, x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(
            2.0 * self.a * x + self.b * y + self.d,
            self.b * x + 2.0 * self.c * y + self.e,
        )
    }
}

impl fmt::Display for Conic {
    /// Renders the curve equation in conventional form, e.g.
    /// `x^2 - 3*x*y + y^2 - 9`. Zero terms are skipped and unit
    /// coefficients elided.
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = [
            (self.a, Some("x^2")),
            (self.b, Some("x*y")),
            (self.c, Some("y^2")),
            (self.d, Some("x")),
            (self.e, Some("y")),
            (self.f, None),
        ];

        let mut first = true;
        for (coef, var) in terms {
            if coef == 0.0 {
                continue;
            }
            if first {
                if coef < 0.0 {
                    write!(out, "-")?;
                }
                first = false;
            } else if coef < 0.0 {
                write!(out, " - ")?;
            } else {
                write!(out, " + ")?;
            }

            let magnitude = coef.abs();
            match var {
                Some(var) if magnitude == 1.0 => write!(out, "{var}")?,
                Some(var) => write!(out, "{magnitude}*{var}")?,
                None => write!(out, "{magnitude}")?,
            }
        }
        if first {
            write!(out, "0")?;
        }
        Ok(())
    }
}

/// Failure to parse a conic expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseConicError {
    #[error("empty expression")]
    Empty,
    #[error("malformed term: {0}")]
    MalformedTerm(String),
    #[error("term {0} exceeds degree two")]
    DegreeTooHigh(String),
}

impl FromStr for Conic {
    type Err = ParseConicError;

    /// Parses the same restricted grammar [`Display`] emits: terms such
    /// as `x^2`, `3*x*y`, `-0.5*y`, or a bare constant, joined by `+`
    /// and `-`. Repeated terms accumulate. Anything above degree two is
    /// rejected.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(ParseConicError::Empty);
        }

        let mut conic = Conic::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let bytes = compact.as_bytes();
        let mut term_start = 0;
        for index in 1..=compact.len() {
            let boundary = index == compact.len()
                || (matches!(bytes[index], b'+' | b'-')
                    // A sign directly after an exponent marker belongs to
                    // the coefficient, e.g. `1.5e-3*x`.
                    && !matches!(bytes[index - 1], b'e' | b'E'));
            if boundary {
                accumulate_term(&mut conic, &compact[term_start..index])?;
                term_start = index;
            }
        }
        Ok(conic)
    }
}

fn accumulate_term(conic: &mut Conic, term: &str) -> Result<(), ParseConicError> {
    let malformed = || ParseConicError::MalformedTerm(term.to_string());

    let (sign, body) = if let Some(rest) = term.strip_prefix('-') {
        (-1.0, rest)
    } else {
        (1.0, term.strip_prefix('+').unwrap_or(term))
    };
    if body.is_empty() {
        return Err(malformed());
    }

    let (coef_text, vars) = match body.find(|ch| ch == 'x' || ch == 'y') {
        None => (body, ""),
        Some(0) => ("", body),
        Some(at) => (&body[..at], &body[at..]),
    };
    let coef_text = coef_text.strip_suffix('*').unwrap_or(coef_text);
    let coef = if coef_text.is_empty() {
        1.0
    } else {
        coef_text.parse::<f64>().map_err(|_| malformed())?
    };

    let mut exp_x = 0u32;
    let mut exp_y = 0u32;
    if !vars.is_empty() {
        for factor in vars.split('*') {
            let (name, power) = match factor.split_once('^') {
                Some((name, power)) => (name, power.parse::<u32>().map_err(|_| malformed())?),
                None => (factor, 1),
            };
            match name {
                "x" => exp_x += power,
                "y" => exp_y += power,
                _ => return Err(malformed()),
            }
        }
    }
    if exp_x + exp_y > 2 {
        return Err(ParseConicError::DegreeTooHigh(term.to_string()));
    }

    match (exp_x, exp_y) {
        (2, 0) => conic.a += sign * coef,
        (1, 1) => conic.b += sign * coef,
        (0, 2) => conic.c += sign * coef,
        (1, 0) => conic.d += sign * coef,
        (0, 1) => conic.e += sign * coef,
        (0, 0) => conic.f += sign * coef,
        _ => unreachable!(),
    }
    Ok(())
}

/// The two quadratic curves whose intersection is sought.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicPair {
    pub f: Conic,
    pub g: Conic,
}

impl ConicPair {
    pub const fn new(f: Conic, g: Conic) -> Self {
        Self { f, g }
    }

    /// Residual vector (f(x,y), g(x,y)) and the 2×2 Jacobian of both
    /// curves at `point`. Pure function of its inputs.
    pub fn evaluate(&self, point: Vector2<f64>) -> Evaluation {
        let (x, y) = (point.x, point.y);
        let residual = Vector2::new(self.f.eval(x, y), self.g.eval(x, y));
        let grad_f = self.f.gradient(x, y);
        let grad_g = self.g.gradient(x, y);
        let jacobian = Matrix2::new(grad_f.x, grad_f.y, grad_g.x, grad_g.y);
        Evaluation {
            point,
            residual,
            jacobian,
        }
    }
}

/// Residual and Jacobian of a [`ConicPair`] at a single point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub point: Vector2<f64>,
    pub residual: Vector2<f64>,
    pub jacobian: Matrix2<f64>,
}

impl Evaluation {
    pub fn residual_norm(&self) -> f64 {
        self.residual.norm()
    }

    /// Closed-form 2×2 solve of J·Δ = -R via Cramer's rule. Reports
    /// [`SingularJacobian`] instead of dividing by a near-zero
    /// determinant.
    pub fn newton_step(&self) -> Result<Vector2<f64>, SingularJacobian> {
        let j = &self.jacobian;
        let det = j.determinant();
        if det.abs() < SINGULAR_DET_EPS {
            return Err(SingularJacobian {
                x: self.point.x,
                y: self.point.y,
                det,
            });
        }
        let r = &self.residual;
        let dx = (-r.x * j[(1, 1)] + r.y * j[(0, 1)]) / det;
        let dy = (-r.y * j[(0, 0)] + r.x * j[(1, 0)]) / det;
        Ok(Vector2::new(dx, dy))
    }
}
