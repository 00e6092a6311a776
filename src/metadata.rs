//! HID device metadata.
//!
//! [`HidDeviceInfo`] is a lightweight, cloneable description of one enumerated
//! HID interface, filled in by the active [`HidBackend`](crate::backends::HidBackend).
//! It is what enumeration works from before a device is opened, and what the
//! diagnostics report serializes.
//!
//! # Conventions
//! - `name` is the friendly product name; it is the base of the registry display name.
//! - `path` is an OS/topology path (opaque string) used to open the device. It may change
//!   across ports and reconnects, so it is never persisted as identity.
//! - `usage_page`/`usage` are filled when the platform reports the top-level usage
//!   without opening the device. They are hints only; the report descriptor decides.

use serde::{Deserialize, Serialize};

/// Name used for devices whose product string is missing or blank.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Trimmed product name, or [`UNKNOWN_DEVICE_NAME`] if nothing is left.
pub fn friendly_name(product: Option<&str>) -> &str {
    match product.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => UNKNOWN_DEVICE_NAME,
    }
}

/// Snapshot of one HID interface as seen during enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    /// Friendly product name ([`UNKNOWN_DEVICE_NAME`] when the device reports none).
    pub name: String,

    /// OS path used to open the device.
    pub path: String,

    /// USB Vendor ID.
    pub vendor_id: u16,

    /// USB Product ID.
    pub product_id: u16,

    /// Serial number string, if the firmware provides one.
    pub serial_number: Option<String>,

    /// Top-level usage page reported by the platform, if known.
    pub usage_page: Option<u16>,

    /// Top-level usage reported by the platform, if known.
    pub usage: Option<u16>,
}

impl HidDeviceInfo {
    /// Minimal info for devices that only have a name and a path.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for HidDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}]",
            self.name, self.vendor_id, self.product_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_product_names_become_unknown() {
        assert_eq!(friendly_name(None), UNKNOWN_DEVICE_NAME);
        assert_eq!(friendly_name(Some("")), UNKNOWN_DEVICE_NAME);
        assert_eq!(friendly_name(Some(" \t ")), UNKNOWN_DEVICE_NAME);
        assert_eq!(friendly_name(Some("  Pedals ")), "Pedals");
    }
}
