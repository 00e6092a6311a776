//! HID device discovery.
//!
//! [`probe_devices`] walks a backend's device list and, for every entry:
//! 1. filters on the top-level usage (Mouse, Joystick, Gamepad, Multi-axis);
//! 2. opens the device;
//! 3. builds a [`HidDeviceHandle`] from its report descriptor.
//!
//! A failure at any step drops that one device and is recorded; discovery always
//! continues with the next entry. Devices claimed by the OS or another process
//! are expected to fail, so a partial result is normal.
//!
//! Filtering uses the platform's usage hint when the backend provides one, which
//! avoids opening keyboards at all. Without a hint the device is opened and its
//! descriptor decides.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::hid_device::HidDeviceHandle;
use super::{HidBackend, HidTransport};
use crate::descriptor::ReportDescriptor;
use crate::error::DeviceError;
use crate::metadata::HidDeviceInfo;
use crate::usage;

/// What happened to one enumerated device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Opened and ready to register.
    Opened,
    /// No supported top-level usage; never opened (or closed again).
    Filtered,
    /// The OS refused access or the open failed.
    OpenFailed(String),
    /// Passed the filter but has no Mouse/Joystick item to read.
    Unsupported,
}

/// Per-device discovery record, for diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub device: HidDeviceInfo,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    /// Registry name, filled in once the device is registered.
    pub registered_as: Option<String>,
}

/// A device that opened successfully.
pub struct ProbedDevice {
    pub info: HidDeviceInfo,
    pub handle: HidDeviceHandle,
    /// Index of this device's entry in the returned records.
    pub record: usize,
}

/// Probe every device the backend lists.
///
/// # Errors
/// Only if the backend cannot list devices at all. Per-device failures are
/// reported in the records.
pub fn probe_devices(
    backend: &mut dyn HidBackend,
) -> Result<(Vec<ProbedDevice>, Vec<ProbeRecord>), DeviceError> {
    let mut devices = Vec::new();
    let mut records = Vec::new();

    for info in merge_by_path(backend.devices()?) {
        let record = records.len();
        let outcome = match probe_one(backend, &info) {
            Ok(Some(handle)) => {
                devices.push(ProbedDevice {
                    info: info.clone(),
                    handle,
                    record,
                });
                ProbeOutcome::Opened
            }
            Ok(None) => {
                debug!(device = %info, "not a supported input device; skipped");
                ProbeOutcome::Filtered
            }
            Err(DeviceError::UnsupportedDeviceType { .. }) => {
                warn!(device = %info, "no mouse or joystick collection; skipped");
                ProbeOutcome::Unsupported
            }
            Err(e) => {
                warn!(device = %info, error = %e, "failed to open device; skipped");
                ProbeOutcome::OpenFailed(e.to_string())
            }
        };
        records.push(ProbeRecord {
            device: info,
            outcome,
            registered_as: None,
        });
    }

    Ok((devices, records))
}

/// Collapse entries that share an OS path, keeping first-seen order.
///
/// Some platforms list one entry per top-level collection of the same interface.
/// The merged entry carries the first supported usage hint of its group, so a
/// composite keyboard + mouse interface is not filtered on its keyboard collection.
pub fn merge_by_path(entries: impl IntoIterator<Item = HidDeviceInfo>) -> Vec<HidDeviceInfo> {
    let mut merged: Vec<HidDeviceInfo> = Vec::new();
    for entry in entries {
        match merged.iter_mut().find(|kept| kept.path == entry.path) {
            Some(kept) => {
                if !hint_is_supported(kept) && hint_is_supported(&entry) {
                    kept.usage_page = entry.usage_page;
                    kept.usage = entry.usage;
                }
            }
            None => merged.push(entry),
        }
    }
    merged
}

fn hint_is_supported(info: &HidDeviceInfo) -> bool {
    match (info.usage_page, info.usage) {
        (Some(page), Some(id)) => usage::is_supported_top_level(usage::extended(page, id)),
        _ => false,
    }
}

/// `Ok(None)` means filtered out.
fn probe_one(
    backend: &mut dyn HidBackend,
    info: &HidDeviceInfo,
) -> Result<Option<HidDeviceHandle>, DeviceError> {
    let hinted = match (info.usage_page, info.usage) {
        (Some(page), Some(id)) => {
            if !usage::is_supported_top_level(usage::extended(page, id)) {
                return Ok(None);
            }
            true
        }
        _ => false,
    };

    let mut transport = backend.open(info)?;
    if !hinted && !descriptor_is_supported(transport.as_mut(), &info.name)? {
        return Ok(None);
    }
    HidDeviceHandle::open(transport, info.name.clone()).map(Some)
}

fn descriptor_is_supported(
    transport: &mut dyn HidTransport,
    name: &str,
) -> Result<bool, DeviceError> {
    let raw = transport.report_descriptor()?;
    let descriptor = ReportDescriptor::parse(&raw).map_err(|source| DeviceError::Descriptor {
        name: name.to_string(),
        source,
    })?;
    Ok(descriptor
        .device_items()
        .iter()
        .any(|item| usage::is_supported_top_level(item.usage)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::{OpenFailure, VirtualHidBackend, VirtualHidDevice};

    #[test]
    fn records_every_outcome() {
        let mut backend = VirtualHidBackend::new();
        backend.attach_failing("Locked Stick", OpenFailure::AccessDenied);
        backend.attach(VirtualHidDevice::joystick("Stick"));
        backend.attach(VirtualHidDevice::keyboard("Keyboard"));
        backend.attach(VirtualHidDevice::gamepad("Pad"));
        backend.attach(VirtualHidDevice::mouse("Mouse"));

        let (devices, records) = probe_devices(&mut backend).expect("probe");
        let names: Vec<&str> = devices.iter().map(|d| d.info.name.as_str()).collect();
        assert_eq!(names, vec!["Stick", "Mouse"]);

        let outcomes: Vec<&ProbeOutcome> = records.iter().map(|r| &r.outcome).collect();
        assert!(matches!(outcomes[0], ProbeOutcome::OpenFailed(_)));
        assert_eq!(outcomes[1], &ProbeOutcome::Opened);
        assert_eq!(outcomes[2], &ProbeOutcome::Filtered);
        assert_eq!(outcomes[3], &ProbeOutcome::Unsupported);
        assert_eq!(outcomes[4], &ProbeOutcome::Opened);
        assert_eq!(devices[1].record, 4);
    }

    #[test]
    fn usage_hint_filters_without_opening() {
        let mut backend = VirtualHidBackend::new();
        let mut info = backend.attach_failing("Keyboard", OpenFailure::AccessDenied);
        info.usage_page = Some(usage::PAGE_GENERIC_DESKTOP);
        info.usage = Some(0x06);

        // Opening would fail; the hint keeps us from trying.
        assert!(probe_one(&mut backend, &info).expect("probe").is_none());
    }

    fn collection(path: &str, id: u16) -> HidDeviceInfo {
        HidDeviceInfo {
            usage_page: Some(usage::PAGE_GENERIC_DESKTOP),
            usage: Some(id),
            ..HidDeviceInfo::new("Combo", path)
        }
    }

    #[test]
    fn shared_path_keeps_the_supported_collection() {
        let merged = merge_by_path(vec![
            collection("hidraw0", 0x06),
            collection("hidraw0", 0x02),
            collection("hidraw1", 0x06),
            collection("hidraw2", 0x04),
            collection("hidraw2", 0x02),
        ]);
        let hints: Vec<(&str, Option<u16>)> =
            merged.iter().map(|d| (d.path.as_str(), d.usage)).collect();
        assert_eq!(
            hints,
            vec![("hidraw0", Some(0x02)), ("hidraw1", Some(0x06)), ("hidraw2", Some(0x04))]
        );
    }

    #[test]
    fn composite_interface_is_opened_through_its_mouse_collection() {
        struct Listing {
            inner: VirtualHidBackend,
            entries: Vec<HidDeviceInfo>,
        }

        impl HidBackend for Listing {
            fn devices(&mut self) -> Result<Vec<HidDeviceInfo>, DeviceError> {
                Ok(self.entries.clone())
            }

            fn open(&mut self, info: &HidDeviceInfo) -> Result<Box<dyn HidTransport>, DeviceError> {
                self.inner.open(info)
            }
        }

        let mut inner = VirtualHidBackend::new();
        let path = inner.attach(VirtualHidDevice::mouse("Combo")).path;
        let mut backend = Listing {
            inner,
            entries: vec![collection(&path, 0x06), collection(&path, 0x02)],
        };

        let (devices, records) = probe_devices(&mut backend).expect("probe");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, ProbeOutcome::Opened);
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn records_serialize_with_flat_outcome() {
        let record = ProbeRecord {
            device: HidDeviceInfo::new("Stick", "virtual:0"),
            outcome: ProbeOutcome::OpenFailed("denied".into()),
            registered_as: None,
        };
        let json = serde_json::to_value(&record).expect("json");
        assert_eq!(json["outcome"], "open_failed");
        assert_eq!(json["reason"], "denied");
        assert_eq!(json["device"]["name"], "Stick");
    }
}
