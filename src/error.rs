use thiserror::Error;

use crate::domain::{DeviceKind, EditError};
use crate::site::StoreError;

/// Errors raised by the droop model and the editing session.
#[derive(Debug, Error)]
pub enum DroopError {
    #[error("voltage {voltage} V is outside the droop curve [{min} V, {max} V]")]
    VoltageOutOfRange { voltage: f64, min: f64, max: f64 },

    #[error("device {0} has no droop curve")]
    NotDroopModeled(DeviceKind),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("stored droop record of {device} is invalid: {source}")]
    InvalidRecord {
        device: DeviceKind,
        #[source]
        source: EditError,
    },

    #[error("config store error: {0}")]
    Store(#[from] StoreError),
}

impl DroopError {
    /// Whether the caller can fix the request and try again.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DroopError::Store(_) | DroopError::InvalidRecord { .. })
    }
}
