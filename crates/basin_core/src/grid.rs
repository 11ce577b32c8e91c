//! Bulk evaluation over rectangular lattices.
//!
//! Every lattice point is an independent Newton run, so the sweep is a
//! parallel map: each worker fills a preassigned row-major slot and the
//! assembled field is deterministic regardless of completion order.

use anyhow::{bail, Result};
use nalgebra::Vector2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::{Classification, RootCatalog};
use crate::conic::ConicPair;
use crate::newton::{self, NewtonSettings};

/// A closed rectangle sampled at a fixed lattice step. Rows follow y,
/// columns follow x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub step: f64,
}

impl GridSpec {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, step: f64) -> Result<Self> {
        for value in [x_min, x_max, y_min, y_max, step] {
            if !value.is_finite() {
                bail!("Grid bounds and step must be finite.");
            }
        }
        if x_max < x_min || y_max < y_min {
            bail!("Grid bounds must satisfy max >= min.");
        }
        if step <= 0.0 {
            bail!("Grid step must be positive.");
        }
        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
            step,
        })
    }

    /// Lattice columns; both bounds are inclusive.
    pub fn cols(&self) -> usize {
        ((self.x_max - self.x_min) / self.step).floor() as usize + 1
    }

    pub fn rows(&self) -> usize {
        ((self.y_max - self.y_min) / self.step).floor() as usize + 1
    }

    /// Lattice point at (row, col): x = x_min + col·step, y = y_min + row·step.
    pub fn point(&self, row: usize, col: usize) -> Vector2<f64> {
        Vector2::new(
            self.x_min + col as f64 * self.step,
            self.y_min + row as f64 * self.step,
        )
    }
}

/// Row-major field of per-lattice-point results, matching the sampled
/// rectangle's scan order exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct GridField<T> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T> GridField<T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.values[row * self.cols + col]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// One Newton run per lattice point, classified against `catalog`.
pub fn root_field(
    pair: &ConicPair,
    spec: &GridSpec,
    catalog: &RootCatalog,
    settings: &NewtonSettings,
) -> Result<GridField<Classification>> {
    sample(spec, |point| {
        let trace = newton::solve(pair, point, settings)?;
        Ok(catalog.classify(trace.final_point(), trace.termination))
    })
}

/// One Newton run per lattice point, reporting the number of steps taken
/// at termination (the cap itself when the run exhausted it).
pub fn iteration_field(
    pair: &ConicPair,
    spec: &GridSpec,
    settings: &NewtonSettings,
) -> Result<GridField<usize>> {
    sample(spec, |point| {
        Ok(newton::solve(pair, point, settings)?.steps_taken())
    })
}

fn sample<T, F>(spec: &GridSpec, per_point: F) -> Result<GridField<T>>
where
    T: Send,
    F: Fn(Vector2<f64>) -> Result<T> + Sync,
{
    let rows = spec.rows();
    let cols = spec.cols();
    let values = (0..rows * cols)
        .into_par_iter()
        .map(|index| per_point(spec.point(index / cols, index % cols)))
        .collect::<Result<Vec<T>>>()?;
    Ok(GridField { rows, cols, values })
}
