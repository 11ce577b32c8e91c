//! The line-oriented request/response contract spoken over stdin/stdout.
//!
//! Requests are whitespace-separated token streams; responses are rows
//! of decimal text. Numbers are written with Rust's shortest round-trip
//! formatting so the consumer can round to six decimals without loss.

use std::io::{self, Write};

use basin_core::catalog::{Classification, KnownRoot, RootCatalog};
use basin_core::grid::{GridField, GridSpec};
use basin_core::newton::NewtonTrace;
use thiserror::Error;

/// Failure to decode a request into one of the recognized shapes. The
/// only hard failure the caller ever sees from a well-configured run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("unknown command: {0:?} (expected \"one\" or \"rect\")")]
    UnknownCommand(String),
    #[error("unknown field kind: {0:?} (expected \"root\" or \"iter\")")]
    UnknownFieldKind(String),
    #[error("missing value for <{0}>")]
    MissingValue(&'static str),
    #[error("invalid number for <{name}>: {token:?}")]
    InvalidNumber {
        name: &'static str,
        token: String,
    },
    #[error("unexpected trailing input: {0:?}")]
    TrailingInput(String),
}

/// Which per-point field a rectangle query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Root,
    Iterations,
}

/// A decoded request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    /// `one <x> <y>`: the full iteration trace for one starting point.
    Trace { x: f64, y: f64 },
    /// `rect root|iter <xmin> <xmax> <ymin> <ymax> <step>`: a per-point
    /// field over the rectangle's lattice.
    Field {
        kind: FieldKind,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        step: f64,
    },
}

pub fn parse_request(input: &str) -> Result<Request, ProtocolError> {
    let mut tokens = input.split_whitespace();
    let request = match tokens.next().ok_or(ProtocolError::Empty)? {
        "one" => Request::Trace {
            x: number(&mut tokens, "x")?,
            y: number(&mut tokens, "y")?,
        },
        "rect" => {
            let kind = match tokens.next().ok_or(ProtocolError::MissingValue("mode"))? {
                "root" => FieldKind::Root,
                "iter" => FieldKind::Iterations,
                other => return Err(ProtocolError::UnknownFieldKind(other.to_string())),
            };
            Request::Field {
                kind,
                x_min: number(&mut tokens, "xmin")?,
                x_max: number(&mut tokens, "xmax")?,
                y_min: number(&mut tokens, "ymin")?,
                y_max: number(&mut tokens, "ymax")?,
                step: number(&mut tokens, "step")?,
            }
        }
        other => return Err(ProtocolError::UnknownCommand(other.to_string())),
    };

    let rest = tokens.collect::<Vec<_>>();
    if !rest.is_empty() {
        return Err(ProtocolError::TrailingInput(rest.join(" ")));
    }
    Ok(request)
}

fn number<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<f64, ProtocolError> {
    let token = tokens.next().ok_or(ProtocolError::MissingValue(name))?;
    token.parse().map_err(|_| ProtocolError::InvalidNumber {
        name,
        token: token.to_string(),
    })
}

/// Encode a single-point trace, one `<x> <y> <residualNorm>` row per
/// recorded step.
pub fn write_trace(out: &mut impl Write, trace: &NewtonTrace) -> io::Result<()> {
    for step in &trace.steps {
        writeln!(out, "{} {} {}", step.point.x, step.point.y, step.residual_norm)?;
    }
    Ok(())
}

/// Encode a root field in row-major order: `<x0> <y0> <matchedX>
/// <matchedY>` per lattice point, `inf inf` for the point at infinity
/// and `NaN NaN` when no cataloged root applies.
pub fn write_root_field(
    out: &mut impl Write,
    spec: &GridSpec,
    catalog: &RootCatalog,
    field: &GridField<Classification>,
) -> io::Result<()> {
    for row in 0..field.rows() {
        for col in 0..field.cols() {
            let point = spec.point(row, col);
            let (root_x, root_y) = match field.get(row, col) {
                Classification::MatchedRoot(index) => match catalog.roots()[*index] {
                    KnownRoot::Finite(root) => (root.x, root.y),
                    KnownRoot::PointAtInfinity => (f64::INFINITY, f64::INFINITY),
                },
                Classification::Unclassified | Classification::NonConvergent => {
                    (f64::NAN, f64::NAN)
                }
            };
            writeln!(out, "{} {} {} {}", point.x, point.y, root_x, root_y)?;
        }
    }
    Ok(())
}

/// Encode an iteration-count field in row-major order.
pub fn write_iteration_field(
    out: &mut impl Write,
    spec: &GridSpec,
    field: &GridField<usize>,
) -> io::Result<()> {
    for row in 0..field.rows() {
        for col in 0..field.cols() {
            let point = spec.point(row, col);
            writeln!(out, "{} {} {}", point.x, point.y, field.get(row, col))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basin_core::catalog::KnownRoot;
    use basin_core::conic::{Conic, ConicPair};
    use basin_core::grid;
    use basin_core::newton::{self, NewtonSettings};
    use nalgebra::Vector2;

    fn classic_pair() -> ConicPair {
        ConicPair::new(
            Conic::new(1.0, 0.0, 1.0, 0.0, 0.0, -9.0),
            Conic::new(1.0, -3.0, 1.0, 0.0, 0.0, -9.0),
        )
    }

    fn classic_catalog() -> RootCatalog {
        RootCatalog::new(
            vec![
                KnownRoot::Finite(Vector2::new(3.0, 0.0)),
                KnownRoot::Finite(Vector2::new(-3.0, 0.0)),
                KnownRoot::Finite(Vector2::new(0.0, 3.0)),
                KnownRoot::Finite(Vector2::new(0.0, -3.0)),
                KnownRoot::PointAtInfinity,
            ],
            1e-4,
        )
        .expect("valid catalog")
    }

    #[test]
    fn parses_single_point_requests() {
        assert_eq!(
            parse_request("one 2 1"),
            Ok(Request::Trace { x: 2.0, y: 1.0 })
        );
        // Token streams are whitespace-insensitive.
        assert_eq!(
            parse_request("one\n  -2.5\t1e-3\n"),
            Ok(Request::Trace { x: -2.5, y: 1e-3 })
        );
    }

    #[test]
    fn parses_rectangle_requests() {
        assert_eq!(
            parse_request("rect root -6 6 -6 6 0.05"),
            Ok(Request::Field {
                kind: FieldKind::Root,
                x_min: -6.0,
                x_max: 6.0,
                y_min: -6.0,
                y_max: 6.0,
                step: 0.05,
            })
        );
        assert_eq!(
            parse_request("rect iter 0 1 0 1 0.5"),
            Ok(Request::Field {
                kind: FieldKind::Iterations,
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
                step: 0.5,
            })
        );
    }

    #[test]
    fn rejects_malformed_requests() {
        assert_eq!(parse_request("  \n "), Err(ProtocolError::Empty));
        assert_eq!(
            parse_request("two 1 2"),
            Err(ProtocolError::UnknownCommand("two".to_string()))
        );
        assert_eq!(
            parse_request("rect basin 0 1 0 1 0.5"),
            Err(ProtocolError::UnknownFieldKind("basin".to_string()))
        );
        assert_eq!(
            parse_request("one 2"),
            Err(ProtocolError::MissingValue("y"))
        );
        assert_eq!(
            parse_request("one 2 abc"),
            Err(ProtocolError::InvalidNumber {
                name: "y",
                token: "abc".to_string(),
            })
        );
        assert_eq!(
            parse_request("one 2 1 0"),
            Err(ProtocolError::TrailingInput("0".to_string()))
        );
    }

    #[test]
    fn trace_rows_carry_point_and_residual() {
        let trace = newton::solve(
            &classic_pair(),
            Vector2::new(3.0, 0.0),
            &NewtonSettings::default(),
        )
        .expect("valid inputs");

        let mut buffer = Vec::new();
        write_trace(&mut buffer, &trace).expect("write to memory");
        assert_eq!(String::from_utf8(buffer).expect("utf-8"), "3 0 0\n");
    }

    #[test]
    fn root_field_rows_follow_scan_order_with_sentinels() {
        let pair = classic_pair();
        let catalog = classic_catalog();
        let settings = NewtonSettings::default();
        // One row, two columns: the exact root (3, 0) and the singular
        // origin-locus point (0, 0).
        let spec = GridSpec::new(0.0, 3.0, 0.0, 0.0, 3.0).expect("valid spec");
        let field = grid::root_field(&pair, &spec, &catalog, &settings).expect("sampling");

        let mut buffer = Vec::new();
        write_root_field(&mut buffer, &spec, &catalog, &field).expect("write to memory");
        assert_eq!(
            String::from_utf8(buffer).expect("utf-8"),
            "0 0 NaN NaN\n3 0 3 0\n"
        );
    }

    #[test]
    fn iteration_field_rows_carry_counts() {
        let pair = classic_pair();
        let settings = NewtonSettings::default();
        let spec = GridSpec::new(3.0, 3.0, 0.0, 0.0, 1.0).expect("valid spec");
        let field = grid::iteration_field(&pair, &spec, &settings).expect("sampling");

        let mut buffer = Vec::new();
        write_iteration_field(&mut buffer, &spec, &field).expect("write to memory");
        assert_eq!(String::from_utf8(buffer).expect("utf-8"), "3 0 0\n");
    }
}
