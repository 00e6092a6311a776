//! USB HID access through `hidapi`.
//!
//! Devices are opened in non-blocking mode; the frame loop drains them with
//! zero-timeout reads.

use std::collections::HashMap;
use std::ffi::CString;

use hidapi::{DeviceInfo, HidApi, HidDevice, HidError};
use tracing::debug;

use super::hid_discovery::merge_by_path;
use super::{HidBackend, HidTransport};
use crate::error::DeviceError;
use crate::metadata::{friendly_name, HidDeviceInfo};

/// Largest report descriptor a HID device may report.
const MAX_DESCRIPTOR_LEN: usize = 4096;

/// [`HidBackend`] over the platform HID library.
pub struct HidApiBackend {
    api: HidApi,
    // Display path -> raw OS path, for devices returned by the last `devices()` call.
    paths: HashMap<String, CString>,
}

impl HidApiBackend {
    pub fn new() -> Result<Self, DeviceError> {
        let api = HidApi::new().map_err(|e| DeviceError::Backend(e.to_string()))?;
        Ok(Self {
            api,
            paths: HashMap::new(),
        })
    }
}

fn info_from(dev: &DeviceInfo) -> HidDeviceInfo {
    HidDeviceInfo {
        name: friendly_name(dev.product_string()).to_string(),
        path: dev.path().to_string_lossy().into_owned(),
        vendor_id: dev.vendor_id(),
        product_id: dev.product_id(),
        serial_number: dev.serial_number().map(str::to_owned),
        usage_page: Some(dev.usage_page()),
        usage: Some(dev.usage()),
    }
}

fn open_error(name: &str, err: HidError) -> DeviceError {
    let reason = err.to_string();
    let lower = reason.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("access denied") {
        DeviceError::AccessDenied {
            name: name.to_string(),
        }
    } else {
        DeviceError::Open {
            name: name.to_string(),
            reason,
        }
    }
}

impl HidBackend for HidApiBackend {
    fn devices(&mut self) -> Result<Vec<HidDeviceInfo>, DeviceError> {
        self.api
            .refresh_devices()
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        self.paths.clear();
        let mut listed = Vec::new();
        for dev in self.api.device_list() {
            let info = info_from(dev);
            self.paths
                .entry(info.path.clone())
                .or_insert_with(|| dev.path().to_owned());
            listed.push(info);
        }
        // hidapi lists one entry per top-level collection on some platforms.
        let out = merge_by_path(listed);
        debug!(count = out.len(), "hidapi device list");
        Ok(out)
    }

    fn open(&mut self, info: &HidDeviceInfo) -> Result<Box<dyn HidTransport>, DeviceError> {
        let path = match self.paths.get(&info.path) {
            Some(p) => p.clone(),
            None => CString::new(info.path.clone()).map_err(|e| DeviceError::Open {
                name: info.name.clone(),
                reason: e.to_string(),
            })?,
        };

        let device = self
            .api
            .open_path(&path)
            .map_err(|e| open_error(&info.name, e))?;
        device
            .set_blocking_mode(false)
            .map_err(|e| open_error(&info.name, e))?;

        Ok(Box::new(HidApiTransport {
            name: info.name.clone(),
            device,
        }))
    }
}

/// One open `hidapi` device.
pub struct HidApiTransport {
    name: String,
    device: HidDevice,
}

impl HidTransport for HidApiTransport {
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, DeviceError> {
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|_| DeviceError::Disconnected {
                name: self.name.clone(),
            })
    }

    fn report_descriptor(&mut self) -> Result<Vec<u8>, DeviceError> {
        let mut buf = vec![0u8; MAX_DESCRIPTOR_LEN];
        let n = self
            .device
            .get_report_descriptor(&mut buf)
            .map_err(|e| DeviceError::Open {
                name: self.name.clone(),
                reason: format!("report descriptor: {e}"),
            })?;
        buf.truncate(n);
        Ok(buf)
    }
}
