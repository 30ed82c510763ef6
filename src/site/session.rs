use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::optimizer::{apply_setpoints, EmsSetpoints, SetpointChange, SetpointError};
use super::schema::{DeviceRecord, SiteConfig};
use super::store::ConfigStore;
use crate::domain::{
    apply_edit, axis_bounds, derive_points, AxisBounds, ChartScale, DeviceKind, DroopEdit,
    DroopParameters, Point,
};
use crate::error::DroopError;

/// Electrical limits shown next to a droop curve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<f64>,
}

impl DeviceLimits {
    fn from_record(kind: DeviceKind, record: &DeviceRecord) -> Self {
        let number = |key: &str| record.extra.get(key).and_then(|v| v.as_f64());
        // Storage is rated by capacity rather than a power limit
        let power_key = if kind == DeviceKind::Bess { "capacity" } else { "maxPower" };
        Self {
            min_voltage: number("minVoltage"),
            max_voltage: number("maxVoltage"),
            max_power: number(power_key),
        }
    }
}

/// Everything needed to display one device's droop curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroopCurveView {
    pub device: DeviceKind,
    pub parameters: DroopParameters,
    pub points: [Point; 3],
    /// Bounds exactly as derived from the parameters
    pub bounds: AxisBounds,
    /// Bounds with the chart floor applied to zero margins
    pub chart_bounds: AxisBounds,
    pub degenerate: bool,
    pub limits: DeviceLimits,
}

/// An operator's working copy of the site configuration.
///
/// Loaded once, edited in memory, written back as a whole on [`save`](Self::save).
pub struct DroopSession {
    store: Arc<dyn ConfigStore>,
    config: SiteConfig,
    dirty: bool,
}

impl DroopSession {
    /// Load the site configuration, completing it from `defaults`.
    pub async fn open(store: Arc<dyn ConfigStore>, defaults: &SiteConfig) -> Result<Self, DroopError> {
        let (config, dirty) = match store.load().await? {
            Some(mut config) => {
                let filled = config.fill_missing(defaults);
                if filled {
                    info!("site config was missing droop fields, filled from defaults");
                }
                (config, filled)
            }
            None => {
                info!("no site config stored, starting from defaults");
                (defaults.clone(), true)
            }
        };

        for kind in DeviceKind::droop_modeled() {
            if let Err(e) = config.droop_parameters(kind) {
                warn!(device = %kind, error = %e, "stored droop record needs an edit before use");
            }
        }

        Ok(Self {
            store,
            config,
            dirty,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Whether the working copy differs from what the store holds.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn parameters(&self, kind: DeviceKind) -> Result<DroopParameters, DroopError> {
        self.config.droop_parameters(kind)
    }

    pub fn curve(&self, kind: DeviceKind, scale: &ChartScale) -> Result<DroopCurveView, DroopError> {
        let parameters = self.parameters(kind)?;
        let bounds = axis_bounds(&parameters);
        let limits = self
            .config
            .record(kind)
            .map(|record| DeviceLimits::from_record(kind, record))
            .unwrap_or_default();

        Ok(DroopCurveView {
            device: kind,
            parameters,
            points: derive_points(&parameters),
            bounds,
            chart_bounds: scale.bounds(&parameters),
            degenerate: bounds.is_degenerate(),
            limits,
        })
    }

    /// Curves of every droop-modeled device.
    pub fn curves(&self, scale: &ChartScale) -> Result<Vec<DroopCurveView>, DroopError> {
        DeviceKind::droop_modeled()
            .map(|kind| self.curve(kind, scale))
            .collect()
    }

    /// Apply an operator edit to one device.
    ///
    /// A rejected edit leaves the session untouched. The result must satisfy
    /// every droop constraint, so an invalid stored record is repaired by an
    /// edit that covers its offending fields.
    pub fn edit(&mut self, kind: DeviceKind, edit: &DroopEdit) -> Result<DroopParameters, DroopError> {
        let current = self.config.unchecked_droop_parameters(kind)?;
        let updated = apply_edit(&current, edit)?;

        if updated != current {
            self.config.set_droop_parameters(kind, updated);
            self.dirty = true;
            info!(device = %kind, v_nom = updated.v_nom, p_supply = updated.p_supply,
                  v_supply = updated.v_supply, p_consume = updated.p_consume,
                  v_consume = updated.v_consume, "droop parameters edited");
        } else {
            debug!(device = %kind, "droop edit changed nothing");
        }
        Ok(updated)
    }

    /// Take new `p_opt` setpoints from the optimizer.
    pub fn apply_setpoints(&mut self, setpoints: &EmsSetpoints) -> Result<Vec<SetpointChange>, SetpointError> {
        let changes = apply_setpoints(&mut self.config, setpoints)?;
        if !changes.is_empty() {
            self.dirty = true;
        }
        Ok(changes)
    }

    /// Persist the working copy.
    pub async fn save(&mut self) -> Result<(), DroopError> {
        self.store.save(&self.config).await?;
        self.dirty = false;
        info!(devices = self.config.devices.len(), "site config saved");
        Ok(())
    }
}
