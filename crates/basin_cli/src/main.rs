//! The Basin query binary: one request per invocation over stdin/stdout.
//!
//! Reads a single whitespace-separated request, runs the solver, and
//! writes the response rows. Diagnostics go to stderr via `env_logger`
//! (`RUST_LOG=info` or `debug`). An optional first argument names a JSON
//! problem-configuration file; without it the built-in classic problem
//! is solved.

use std::env;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use basin_core::grid::{self, GridSpec};
use basin_core::newton;
use log::{debug, info};
use nalgebra::Vector2;

mod config;
mod protocol;

use config::ProblemConfig;
use protocol::{FieldKind, Request};

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => ProblemConfig::load(&path)?,
        None => ProblemConfig::classic(),
    };
    let (pair, catalog, settings) = config.build()?;
    info!("f = {}", pair.f);
    info!("g = {}", pair.g);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin.")?;
    let request = protocol::parse_request(&input)?;
    debug!("request: {request:?}");

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    match request {
        Request::Trace { x, y } => {
            let trace = newton::solve(&pair, Vector2::new(x, y), &settings)?;
            debug!(
                "trace: {} steps, terminated {:?}",
                trace.steps_taken(),
                trace.termination
            );
            protocol::write_trace(&mut out, &trace)?;
        }
        Request::Field {
            kind,
            x_min,
            x_max,
            y_min,
            y_max,
            step,
        } => {
            let spec = GridSpec::new(x_min, x_max, y_min, y_max, step)?;
            info!("sampling a {} x {} lattice", spec.rows(), spec.cols());
            match kind {
                FieldKind::Root => {
                    let field = grid::root_field(&pair, &spec, &catalog, &settings)?;
                    protocol::write_root_field(&mut out, &spec, &catalog, &field)?;
                }
                FieldKind::Iterations => {
                    let field = grid::iteration_field(&pair, &spec, &settings)?;
                    protocol::write_iteration_field(&mut out, &spec, &field)?;
                }
            }
        }
    }
    out.flush().context("Failed to flush response.")?;
    Ok(())
}
