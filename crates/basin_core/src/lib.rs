//! The `basin_core` crate is the numerical engine behind the Basin
//! visualizations: a Newton-Raphson solver for the intersection of two
//! conic sections, classification of finished traces against a catalog
//! of known roots, and parallel bulk evaluation over rectangular
//! lattices used to paint basin-of-attraction maps.
//!
//! Key components:
//! - **Conic**: coefficient container with residual/Jacobian evaluation.
//! - **Newton**: the per-starting-point iteration state machine.
//! - **Catalog**: known roots (including the point at infinity) and the
//!   matching rule.
//! - **Grid**: rectangular lattice sweeps assembled in row-major order.

pub mod catalog;
pub mod conic;
pub mod grid;
pub mod newton;
