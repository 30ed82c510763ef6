use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::DroopError;

/// Droop parameters of one device.
///
/// Power is signed: negative values consume from the bus, positive values
/// supply it. `p_opt` belongs to the optimizer and is only ever passed through
/// by operator-facing code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroopParameters {
    /// Nominal bus voltage (V)
    pub v_nom: f64,
    /// Maximum supplied power (W)
    pub p_supply: f64,
    /// Voltage drop below `v_nom` at full supply (V)
    pub v_supply: f64,
    /// Maximum consumed power (W)
    pub p_consume: f64,
    /// Voltage rise above `v_nom` at full consumption (V)
    pub v_consume: f64,
    /// Optimal setpoint from the EMS optimizer (W)
    pub p_opt: f64,
}

/// Field names of a droop record, as they appear in the persisted config.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DroopField {
    VNom,
    PSupply,
    VSupply,
    PConsume,
    VConsume,
    POpt,
}

impl DroopField {
    /// Fields an operator may edit. `p_opt` is not among them.
    pub const EDITABLE: [DroopField; 5] = [
        DroopField::VNom,
        DroopField::PSupply,
        DroopField::VSupply,
        DroopField::PConsume,
        DroopField::VConsume,
    ];

    pub fn is_editable(self) -> bool {
        self != DroopField::POpt
    }
}

/// A point in power/voltage space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Power (W)
    pub x: f64,
    /// Voltage (V)
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Plot ranges for a droop curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl AxisBounds {
    /// True when either axis has collapsed to a single value.
    pub fn is_degenerate(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }
}

/// Minimum margins used when a curve has no extent on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartScale {
    pub min_power_margin_w: f64,
    pub min_voltage_margin_v: f64,
}

impl Default for ChartScale {
    fn default() -> Self {
        Self {
            min_power_margin_w: 1000.0,
            min_voltage_margin_v: 1.0,
        }
    }
}

impl ChartScale {
    /// Axis bounds with the configured floor substituted for a zero margin.
    ///
    /// Curves with a non-zero extent get exactly [`axis_bounds`].
    pub fn bounds(&self, params: &DroopParameters) -> AxisBounds {
        let (margin, v_margin) = margins(params);
        let margin = if margin > 0.0 { margin } else { self.min_power_margin_w };
        let v_margin = if v_margin > 0.0 {
            v_margin
        } else {
            self.min_voltage_margin_v
        };
        bounds_with(params, margin, v_margin)
    }
}

/// The three characteristic points of the curve: full consumption, the
/// optimal operating point at `v_nom`, and full supply.
pub fn derive_points(params: &DroopParameters) -> [Point; 3] {
    [
        Point::new(neg(params.p_consume), params.v_nom + params.v_consume),
        Point::new(params.p_opt, params.v_nom),
        Point::new(params.p_supply, params.v_nom - params.v_supply),
    ]
}

/// Plot ranges that keep every curve point off the plotted edge.
///
/// When both power extremes (or both voltage extremes) are zero the bounds
/// collapse; see [`AxisBounds::is_degenerate`] and [`ChartScale::bounds`].
pub fn axis_bounds(params: &DroopParameters) -> AxisBounds {
    let (margin, v_margin) = margins(params);
    bounds_with(params, margin, v_margin)
}

fn margins(params: &DroopParameters) -> (f64, f64) {
    let margin = 1.1 * params.p_consume.max(params.p_supply);
    let v_margin = 0.1 * params.v_supply.max(params.v_consume);
    (margin, v_margin)
}

fn bounds_with(params: &DroopParameters, margin: f64, v_margin: f64) -> AxisBounds {
    AxisBounds {
        x_min: neg(params.p_consume.max(margin)),
        x_max: params.p_supply.max(margin),
        y_min: params.v_nom - params.v_supply - v_margin,
        y_max: params.v_nom + params.v_consume + v_margin,
    }
}

// Negation without producing -0.0 for a zero extreme
fn neg(value: f64) -> f64 {
    0.0 - value
}

/// Power the curve assigns to a bus voltage.
///
/// Linear between adjacent curve points; `v_nom` maps to `p_opt`.
pub fn power_at_voltage(params: &DroopParameters, voltage: f64) -> Result<f64, DroopError> {
    let upper = params.v_nom + params.v_consume;
    let lower = params.v_nom - params.v_supply;

    if !voltage.is_finite() || voltage > upper || voltage < lower {
        return Err(DroopError::VoltageOutOfRange {
            voltage,
            min: lower,
            max: upper,
        });
    }

    if voltage >= params.v_nom {
        if params.v_consume == 0.0 {
            return Ok(params.p_opt);
        }
        let t = (voltage - params.v_nom) / params.v_consume;
        Ok(params.p_opt + t * (-params.p_consume - params.p_opt))
    } else {
        let t = (params.v_nom - voltage) / params.v_supply;
        Ok(params.p_opt + t * (params.p_supply - params.p_opt))
    }
}

/// Whether `power` lies between full consumption and full supply.
pub fn is_power_in_range(params: &DroopParameters, power: f64) -> bool {
    -params.p_consume <= power && power <= params.p_supply
}
