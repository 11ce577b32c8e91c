//! On-disk description of the problem the engine solves.
//!
//! The binary ships a built-in problem (the classic circle/skewed-conic
//! pair) and optionally loads a JSON file describing another: curves,
//! expected roots, matching tolerance, and solver settings.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use basin_core::catalog::{KnownRoot, RootCatalog, DEFAULT_MATCH_EPSILON};
use basin_core::conic::{Conic, ConicPair};
use basin_core::newton::NewtonSettings;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A curve given either as `[a, b, c, d, e, f]` coefficients or as an
/// expression such as `"x^2 - 3*x*y + y^2 - 9"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveSpec {
    Coefficients([f64; 6]),
    Expression(String),
}

impl CurveSpec {
    fn to_conic(&self) -> Result<Conic> {
        match self {
            CurveSpec::Coefficients([a, b, c, d, e, f]) => {
                Ok(Conic::new(*a, *b, *c, *d, *e, *f))
            }
            CurveSpec::Expression(text) => text
                .parse()
                .with_context(|| format!("Failed to parse curve expression {text:?}.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePair {
    pub f: CurveSpec,
    pub g: CurveSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemConfig {
    pub curves: CurvePair,
    /// Expected finite intersections, in match-priority order.
    pub roots: Vec<[f64; 2]>,
    #[serde(default = "default_match_epsilon")]
    pub match_epsilon: f64,
    #[serde(default)]
    pub newton: NewtonSettings,
}

fn default_match_epsilon() -> f64 {
    DEFAULT_MATCH_EPSILON
}

impl ProblemConfig {
    /// The built-in problem: {x² + y² = 9, x² - 3xy + y² = 9} and its
    /// four finite intersections.
    pub fn classic() -> Self {
        Self {
            curves: CurvePair {
                f: CurveSpec::Coefficients([1.0, 0.0, 1.0, 0.0, 0.0, -9.0]),
                g: CurveSpec::Coefficients([1.0, -3.0, 1.0, 0.0, 0.0, -9.0]),
            },
            roots: vec![[3.0, 0.0], [-3.0, 0.0], [0.0, 3.0], [0.0, -3.0]],
            match_epsilon: DEFAULT_MATCH_EPSILON,
            newton: NewtonSettings::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read problem config {}.", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse problem config {}.", path.display()))
    }

    /// Build the runtime problem: conic pair, root catalog (the finite
    /// roots in file order, the point-at-infinity sentinel last), and
    /// validated solver settings.
    pub fn build(&self) -> Result<(ConicPair, RootCatalog, NewtonSettings)> {
        let pair = ConicPair::new(self.curves.f.to_conic()?, self.curves.g.to_conic()?);
        let mut roots = self
            .roots
            .iter()
            .map(|&[x, y]| KnownRoot::Finite(Vector2::new(x, y)))
            .collect::<Vec<_>>();
        roots.push(KnownRoot::PointAtInfinity);
        let catalog = RootCatalog::new(roots, self.match_epsilon)?;
        self.newton.validate()?;
        Ok((pair, catalog, self.newton))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_problem_builds() {
        let (pair, catalog, settings) = ProblemConfig::classic().build().expect("builds");
        assert_eq!(pair.f, Conic::new(1.0, 0.0, 1.0, 0.0, 0.0, -9.0));
        assert_eq!(catalog.roots().len(), 5);
        assert_eq!(catalog.roots()[4], KnownRoot::PointAtInfinity);
        assert_eq!(settings.max_steps, 50);
    }

    #[test]
    fn json_accepts_expressions_and_coefficient_arrays() {
        let config: ProblemConfig = serde_json::from_str(
            r#"{
                "curves": {
                    "f": "x^2 + y^2 - 9",
                    "g": [1.0, -3.0, 1.0, 0.0, 0.0, -9.0]
                },
                "roots": [[3, 0], [-3, 0]]
            }"#,
        )
        .expect("valid config");

        let (pair, catalog, settings) = config.build().expect("builds");
        assert_eq!(pair.f, Conic::new(1.0, 0.0, 1.0, 0.0, 0.0, -9.0));
        assert_eq!(pair.g, Conic::new(1.0, -3.0, 1.0, 0.0, 0.0, -9.0));
        assert_eq!(catalog.roots().len(), 3);
        assert_eq!(catalog.epsilon(), DEFAULT_MATCH_EPSILON);
        assert_eq!(settings.tolerance, 1e-9);
    }

    #[test]
    fn json_overrides_solver_settings() {
        let config: ProblemConfig = serde_json::from_str(
            r#"{
                "curves": { "f": "x^2 - 1", "g": "y^2 - 1" },
                "roots": [[1, 1], [1, -1], [-1, 1], [-1, -1]],
                "match_epsilon": 1e-6,
                "newton": { "max_steps": 25 }
            }"#,
        )
        .expect("valid config");

        let (_, catalog, settings) = config.build().expect("builds");
        assert_eq!(catalog.epsilon(), 1e-6);
        assert_eq!(settings.max_steps, 25);
        // Unset settings keep their defaults.
        assert_eq!(settings.tolerance, 1e-9);
    }

    #[test]
    fn bad_expressions_are_reported_with_context() {
        let config: ProblemConfig = serde_json::from_str(
            r#"{ "curves": { "f": "x^3", "g": "y^2 - 1" }, "roots": [] }"#,
        )
        .expect("shape is valid json");
        let err = config.build().expect_err("degree-three curve");
        assert!(format!("{err:#}").contains("x^3"));
    }

    #[test]
    fn missing_files_are_reported_with_context() {
        let err = ProblemConfig::load("/nonexistent/problem.json").expect_err("no such file");
        assert!(format!("{err:#}").contains("problem.json"));
    }
}
