//! Droop-curve model for a DC microgrid.
//!
//! Every device on the shared DC bus (PV, storage, EV chargers, loads) is
//! described by six droop parameters. This crate derives the curve those
//! parameters describe, validates operator edits to them, fills in defaults
//! and carries the optimizer's `p_opt` setpoint through untouched.

pub mod config;
pub mod domain;
pub mod error;
pub mod readings;
pub mod site;
pub mod telemetry;

pub use domain::{
    apply_edit, axis_bounds, derive_points, merge_device_defaults, AxisBounds, DeviceKind,
    DroopEdit, DroopParameters, Point,
};
pub use error::DroopError;
