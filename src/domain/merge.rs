use serde::{Deserialize, Serialize};

use super::droop::DroopParameters;

/// Droop fields as found in a persisted device record.
///
/// A missing key (or an explicit `null`) is `None`; an explicit `0` is
/// `Some(0.0)` and is a real value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDroopParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_nom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_supply: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_supply: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_consume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v_consume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_opt: Option<f64>,
}

impl StoredDroopParameters {
    /// True when all six fields are present.
    pub fn is_complete(&self) -> bool {
        self.v_nom.is_some()
            && self.p_supply.is_some()
            && self.v_supply.is_some()
            && self.p_consume.is_some()
            && self.v_consume.is_some()
            && self.p_opt.is_some()
    }
}

impl From<DroopParameters> for StoredDroopParameters {
    fn from(params: DroopParameters) -> Self {
        Self {
            v_nom: Some(params.v_nom),
            p_supply: Some(params.p_supply),
            v_supply: Some(params.v_supply),
            p_consume: Some(params.p_consume),
            v_consume: Some(params.v_consume),
            p_opt: Some(params.p_opt),
        }
    }
}

/// Fill the fields missing from `stored` with `defaults`.
///
/// Presence decides, not truthiness: a stored `0` is kept.
pub fn merge_device_defaults(
    stored: &StoredDroopParameters,
    defaults: &DroopParameters,
) -> DroopParameters {
    DroopParameters {
        v_nom: stored.v_nom.unwrap_or(defaults.v_nom),
        p_supply: stored.p_supply.unwrap_or(defaults.p_supply),
        v_supply: stored.v_supply.unwrap_or(defaults.v_supply),
        p_consume: stored.p_consume.unwrap_or(defaults.p_consume),
        v_consume: stored.v_consume.unwrap_or(defaults.v_consume),
        p_opt: stored.p_opt.unwrap_or(defaults.p_opt),
    }
}
