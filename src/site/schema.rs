//! Site configuration schema and its built-in defaults.
//!
//! This is the one place the default site record is defined; everything that
//! needs a default device (the session, the monitor binary, tests) reads it
//! from here.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::domain::{
    merge_device_defaults, validate_parameters, DeviceKind, DroopParameters, StoredDroopParameters,
};
use crate::error::DroopError;

/// Key older site records used for the single EV charger.
const LEGACY_EV_CHARGER: &str = "evCharger";

/// One device entry of the site configuration.
///
/// The six droop fields are typed; every other key (`maxVoltage`,
/// `maxCurrent`, ...) belongs to other parts of the system and is carried
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(flatten)]
    pub droop: StoredDroopParameters,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceRecord {
    fn new(droop: DroopParameters, fields: &[(&str, i64)]) -> Self {
        let extra = fields
            .iter()
            .map(|(key, value)| ((*key).to_string(), Value::from(*value)))
            .collect();
        Self {
            droop: droop.into(),
            extra,
        }
    }
}

/// The whole site configuration, keyed by device.
///
/// A `null` device entry counts as missing. Top-level keys that are not
/// device slots are kept in `extra` and written back on save.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct SiteConfig {
    pub devices: BTreeMap<DeviceKind, DeviceRecord>,
    pub extra: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for SiteConfig {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut config = SiteConfig::default();
        for (key, value) in map {
            match key.parse::<DeviceKind>() {
                Ok(kind) if value.is_null() => {
                    warn!(device = %kind, "null device entry, treated as missing");
                }
                Ok(kind) => {
                    config.devices.insert(kind, serde_json::from_value(value)?);
                }
                Err(_) => {
                    warn!(key = %key, "unknown top-level key in site config, kept as-is");
                    config.extra.insert(key, value);
                }
            }
        }

        // Older records carry one `evCharger`; it seeds the first slot.
        if !config.devices.contains_key(&DeviceKind::EvCharger1) {
            if let Some(legacy) = config.extra.get(LEGACY_EV_CHARGER).filter(|v| !v.is_null()) {
                let record: DeviceRecord = serde_json::from_value(legacy.clone())?;
                info!("migrated legacy evCharger record to evCharger1");
                config.devices.insert(DeviceKind::EvCharger1, record);
            }
        }

        Ok(config)
    }
}

impl Serialize for SiteConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.devices.len() + self.extra.len()))?;
        for (kind, record) in &self.devices {
            map.serialize_entry(kind, record)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Default droop parameters of a device.
pub fn default_droop_parameters(kind: DeviceKind) -> DroopParameters {
    let (v_nom, p_supply, v_supply, p_consume, v_consume) = match kind {
        DeviceKind::EvCharger1 | DeviceKind::EvCharger2 => (300.0, 22000.0, 100.0, 0.0, 0.0),
        DeviceKind::Pv => (700.0, 10000.0, 600.0, 5000.0, 300.0),
        DeviceKind::Bess => (700.0, 100000.0, 100.0, 100000.0, 100.0),
        DeviceKind::Loads => (230.0, 0.0, 0.0, 24000.0, 10.0),
        DeviceKind::ActiveFrontEnd => (600.0, 50000.0, 50.0, 50000.0, 50.0),
    };
    DroopParameters {
        v_nom,
        p_supply,
        v_supply,
        p_consume,
        v_consume,
        p_opt: 0.0,
    }
}

fn default_record(kind: DeviceKind) -> DeviceRecord {
    let fields: &[(&str, i64)] = match kind {
        DeviceKind::EvCharger1 | DeviceKind::EvCharger2 => &[
            ("maxVoltage", 400),
            ("minVoltage", 200),
            ("maxCurrent", 32),
            ("minCurrent", 6),
            ("maxPower", 22000),
            ("efficiency", 1),
        ],
        DeviceKind::Pv => &[
            ("maxVoltage", 1000),
            ("minVoltage", 100),
            ("maxCurrent", 10),
            ("maxPower", 10000),
        ],
        DeviceKind::Bess => &[
            ("maxVoltage", 800),
            ("minVoltage", 400),
            ("maxChargeCurrent", 100),
            ("maxDischargeCurrent", 100),
            ("capacity", 100000),
            ("efficiency", 1),
            ("minSoC", 20),
            ("maxSoC", 80),
        ],
        DeviceKind::Loads => &[
            ("maxVoltage", 240),
            ("minVoltage", 220),
            ("maxCurrent", 100),
            ("maxPower", 24000),
        ],
        DeviceKind::ActiveFrontEnd => &[
            ("nominalPower", 50000),
            ("maxVoltage", 800),
            ("minVoltage", 400),
            ("maxCurrent", 100),
            ("efficiency", 95),
            ("operatingFrequency", 50),
        ],
    };
    DeviceRecord::new(default_droop_parameters(kind), fields)
}

impl SiteConfig {
    /// The built-in configuration used for a fresh site.
    pub fn defaults() -> Self {
        Self {
            devices: DeviceKind::iter().map(|kind| (kind, default_record(kind))).collect(),
            extra: Map::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn record(&self, kind: DeviceKind) -> Option<&DeviceRecord> {
        self.devices.get(&kind)
    }

    pub fn record_mut(&mut self, kind: DeviceKind) -> Option<&mut DeviceRecord> {
        self.devices.get_mut(&kind)
    }

    /// Add missing devices and missing droop fields from `defaults`.
    ///
    /// Returns whether anything was added. Existing values, zeros included,
    /// are never replaced.
    pub fn fill_missing(&mut self, defaults: &SiteConfig) -> bool {
        let mut changed = false;
        for (kind, default) in &defaults.devices {
            match self.devices.get_mut(kind) {
                None => {
                    self.devices.insert(*kind, default.clone());
                    changed = true;
                }
                Some(record) if !record.droop.is_complete() => {
                    let complete = match complete_droop(&default.droop) {
                        Some(params) => params,
                        None => default_droop_parameters(*kind),
                    };
                    record.droop = merge_device_defaults(&record.droop, &complete).into();
                    changed = true;
                }
                Some(_) => {}
            }
        }
        changed
    }

    /// Effective droop parameters of a droop-modeled device.
    ///
    /// Missing fields fall back to [`default_droop_parameters`]. A stored
    /// value that breaks a droop constraint is reported, not drawn.
    pub fn droop_parameters(&self, kind: DeviceKind) -> Result<DroopParameters, DroopError> {
        let params = self.unchecked_droop_parameters(kind)?;
        validate_parameters(&params)
            .map_err(|source| DroopError::InvalidRecord { device: kind, source })?;
        Ok(params)
    }

    /// Like [`droop_parameters`](Self::droop_parameters) without the
    /// constraint check, for callers that are about to replace the values.
    pub(crate) fn unchecked_droop_parameters(
        &self,
        kind: DeviceKind,
    ) -> Result<DroopParameters, DroopError> {
        if !kind.is_droop_modeled() {
            return Err(DroopError::NotDroopModeled(kind));
        }
        let stored = self.record(kind).map(|r| r.droop).unwrap_or_default();
        Ok(merge_device_defaults(&stored, &default_droop_parameters(kind)))
    }

    /// Write the droop fields of a device, leaving its other fields alone.
    pub fn set_droop_parameters(&mut self, kind: DeviceKind, params: DroopParameters) {
        self.devices.entry(kind).or_default().droop = params.into();
    }
}

fn complete_droop(stored: &StoredDroopParameters) -> Option<DroopParameters> {
    Some(DroopParameters {
        v_nom: stored.v_nom?,
        p_supply: stored.p_supply?,
        v_supply: stored.v_supply?,
        p_consume: stored.p_consume?,
        v_consume: stored.v_consume?,
        p_opt: stored.p_opt?,
    })
}
