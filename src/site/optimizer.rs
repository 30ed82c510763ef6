//! Write path for optimizer setpoints.
//!
//! The EMS optimizer reports device powers in kW; this module turns them into
//! per-device `p_opt` values in W. Nothing else in the crate writes `p_opt`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::schema::SiteConfig;
use crate::domain::DeviceKind;

/// Optimizer output, in kW. Keys not listed here are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmsSetpoints {
    /// PV generation
    pub pv: Option<f64>,
    /// Load demand
    pub ld: Option<f64>,
    /// Battery charging
    pub bc: Option<f64>,
    /// Battery discharging
    pub bd: Option<f64>,
    /// Unidirectional EV charger
    pub c1_ch: Option<f64>,
    /// Bidirectional EV charger, charging
    pub c2_ch: Option<f64>,
    /// Bidirectional EV charger, discharging
    pub c2_dis: Option<f64>,
}

/// Marker value the optimizer reports for every output when it fails.
const FAILURE_MARKER: f64 = -1.0;

#[derive(Debug, Error, PartialEq)]
pub enum SetpointError {
    #[error("optimizer output carries no setpoints")]
    Empty,

    #[error("optimizer reported failure")]
    OptimizerFailed,

    #[error("setpoint {0} is not a finite number")]
    NotFinite(&'static str),
}

/// One `p_opt` update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetpointChange {
    pub device: DeviceKind,
    pub old: Option<f64>,
    pub new: f64,
}

impl EmsSetpoints {
    fn entries(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("pv", self.pv),
            ("ld", self.ld),
            ("bc", self.bc),
            ("bd", self.bd),
            ("c1_ch", self.c1_ch),
            ("c2_ch", self.c2_ch),
            ("c2_dis", self.c2_dis),
        ]
    }

    fn check(&self) -> Result<(), SetpointError> {
        let present: Vec<_> = self
            .entries()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();

        if present.is_empty() {
            return Err(SetpointError::Empty);
        }
        if let Some((name, _)) = present.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SetpointError::NotFinite(*name));
        }
        if present.iter().all(|(_, v)| *v == FAILURE_MARKER) {
            return Err(SetpointError::OptimizerFailed);
        }
        Ok(())
    }

    /// Target `p_opt` per device in W. Supply is positive, consumption
    /// negative.
    pub fn targets(&self) -> Result<Vec<(DeviceKind, f64)>, SetpointError> {
        self.check()?;

        let mut targets = Vec::with_capacity(5);
        if let Some(pv) = self.pv {
            targets.push((DeviceKind::Pv, watts(pv)));
        }
        if let Some(ld) = self.ld {
            targets.push((DeviceKind::Loads, 0.0 - watts(ld)));
        }
        let bess = self.bc.unwrap_or(0.0) - self.bd.unwrap_or(0.0);
        targets.push((DeviceKind::Bess, watts(bess)));
        if let Some(c1) = self.c1_ch {
            targets.push((DeviceKind::EvCharger1, 0.0 - watts(c1)));
        }
        let ev2 = self.c2_ch.unwrap_or(0.0) - self.c2_dis.unwrap_or(0.0);
        targets.push((DeviceKind::EvCharger2, watts(ev2)));

        Ok(targets)
    }
}

/// kW to whole W, ties to even.
fn watts(kw: f64) -> f64 {
    // + 0.0 turns a rounded -0.0 into 0.0
    (kw * 1000.0).round_ties_even() + 0.0
}

/// Write optimizer setpoints into the site configuration.
///
/// Devices absent from `config` are skipped. Only `p_opt` is touched.
pub fn apply_setpoints(
    config: &mut SiteConfig,
    setpoints: &EmsSetpoints,
) -> Result<Vec<SetpointChange>, SetpointError> {
    let targets = setpoints.targets()?;
    let mut changes = Vec::with_capacity(targets.len());

    for (device, new) in targets {
        let Some(record) = config.record_mut(device) else {
            warn!(device = %device, "no record for optimizer setpoint, skipped");
            continue;
        };
        let old = record.droop.p_opt.replace(new);
        info!(device = %device, old = ?old, new, "p_opt updated");
        changes.push(SetpointChange { device, old, new });
    }

    Ok(changes)
}
