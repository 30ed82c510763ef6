use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Device slots of a site configuration.
///
/// The string form is the key used in the persisted site record
/// (`"evCharger1"`, `"activeFrontEnd"`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DeviceKind {
    Pv,
    Bess,
    #[serde(rename = "evCharger1")]
    #[strum(serialize = "evCharger1")]
    EvCharger1,
    #[serde(rename = "evCharger2")]
    #[strum(serialize = "evCharger2")]
    EvCharger2,
    Loads,
    ActiveFrontEnd,
}

impl DeviceKind {
    /// Whether the device takes part in droop coordination.
    ///
    /// The active front end carries droop fields in its record but is not
    /// modeled as a droop device.
    pub fn is_droop_modeled(self) -> bool {
        !matches!(self, DeviceKind::ActiveFrontEnd)
    }

    /// All devices that have a droop curve, in display order.
    pub fn droop_modeled() -> impl Iterator<Item = DeviceKind> {
        DeviceKind::iter().filter(|kind| kind.is_droop_modeled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_device_keys_round_trip_through_strings() {
        assert_eq!(DeviceKind::EvCharger1.to_string(), "evCharger1");
        assert_eq!(DeviceKind::ActiveFrontEnd.as_ref(), "activeFrontEnd");
        assert_eq!(DeviceKind::from_str("bess").unwrap(), DeviceKind::Bess);
        assert!(DeviceKind::from_str("evCharger").is_err());
    }

    #[test]
    fn test_serde_uses_record_keys() {
        let json = serde_json::to_string(&DeviceKind::EvCharger2).unwrap();
        assert_eq!(json, "\"evCharger2\"");
        let kind: DeviceKind = serde_json::from_str("\"activeFrontEnd\"").unwrap();
        assert_eq!(kind, DeviceKind::ActiveFrontEnd);
    }

    #[test]
    fn test_active_front_end_is_not_droop_modeled() {
        let modeled: Vec<_> = DeviceKind::droop_modeled().collect();
        assert_eq!(
            modeled,
            vec![
                DeviceKind::Pv,
                DeviceKind::Bess,
                DeviceKind::EvCharger1,
                DeviceKind::EvCharger2,
                DeviceKind::Loads,
            ]
        );
    }
}
