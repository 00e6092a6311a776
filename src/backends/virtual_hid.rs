//! In-memory HID devices.
//!
//! [`VirtualHidDevice`] is a [`HidTransport`] whose reports are injected by the caller,
//! and [`VirtualHidBackend`] is a [`HidBackend`] listing such devices. Together they
//! let the decode/enumerate/poll path run without hardware: demos use them when no
//! USB backend is available, tests use them to script reports, open failures and
//! unplugs.
//!
//! Clones of a `VirtualHidDevice` share state, so a test can keep one clone to feed
//! reports while the registry owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{HidBackend, HidTransport};
use crate::error::DeviceError;
use crate::metadata::HidDeviceInfo;

/// Joystick: X/Y/Z bytes (0..255) then 8 buttons. Report: `[x, y, z, buttons]`.
#[rustfmt::skip]
pub const JOYSTICK_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x04,       // Usage (Joystick)
    0xA1, 0x01,       // Collection (Application)
    0x09, 0x01,       //   Usage (Pointer)
    0xA1, 0x00,       //   Collection (Physical)
    0x09, 0x30,       //     Usage (X)
    0x09, 0x31,       //     Usage (Y)
    0x09, 0x32,       //     Usage (Z)
    0x15, 0x00,       //     Logical Minimum (0)
    0x26, 0xFF, 0x00, //     Logical Maximum (255)
    0x75, 0x08,       //     Report Size (8)
    0x95, 0x03,       //     Report Count (3)
    0x81, 0x02,       //     Input (Data, Var, Abs)
    0xC0,             //   End Collection
    0x05, 0x09,       //   Usage Page (Button)
    0x19, 0x01,       //   Usage Minimum (1)
    0x29, 0x08,       //   Usage Maximum (8)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x08,       //   Report Count (8)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0xC0,             // End Collection
];

/// Boot-style mouse with wheel. Report: `[buttons, dx, dy, wheel]`, deltas signed.
#[rustfmt::skip]
pub const MOUSE_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x02,       // Usage (Mouse)
    0xA1, 0x01,       // Collection (Application)
    0x09, 0x01,       //   Usage (Pointer)
    0xA1, 0x00,       //   Collection (Physical)
    0x05, 0x09,       //     Usage Page (Button)
    0x19, 0x01,       //     Usage Minimum (1)
    0x29, 0x03,       //     Usage Maximum (3)
    0x15, 0x00,       //     Logical Minimum (0)
    0x25, 0x01,       //     Logical Maximum (1)
    0x95, 0x03,       //     Report Count (3)
    0x75, 0x01,       //     Report Size (1)
    0x81, 0x02,       //     Input (Data, Var, Abs)
    0x95, 0x01,       //     Report Count (1)
    0x75, 0x05,       //     Report Size (5)
    0x81, 0x03,       //     Input (Const)
    0x05, 0x01,       //     Usage Page (Generic Desktop)
    0x09, 0x30,       //     Usage (X)
    0x09, 0x31,       //     Usage (Y)
    0x09, 0x38,       //     Usage (Wheel)
    0x15, 0x81,       //     Logical Minimum (-127)
    0x25, 0x7F,       //     Logical Maximum (127)
    0x75, 0x08,       //     Report Size (8)
    0x95, 0x03,       //     Report Count (3)
    0x81, 0x06,       //     Input (Data, Var, Rel)
    0xC0,             //   End Collection
    0xC0,             // End Collection
];

/// Gamepad: two axes and 4 buttons. Passes the enumeration filter but has no
/// Mouse/Joystick item, so opening it fails.
#[rustfmt::skip]
pub const GAMEPAD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x05,       // Usage (Gamepad)
    0xA1, 0x01,       // Collection (Application)
    0x09, 0x30,       //   Usage (X)
    0x09, 0x31,       //   Usage (Y)
    0x15, 0x00,       //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08,       //   Report Size (8)
    0x95, 0x02,       //   Report Count (2)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0x05, 0x09,       //   Usage Page (Button)
    0x19, 0x01,       //   Usage Minimum (1)
    0x29, 0x04,       //   Usage Maximum (4)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x04,       //   Report Count (4)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0x95, 0x04,       //   Report Count (4)
    0x81, 0x03,       //   Input (Const)
    0xC0,             // End Collection
];

/// Keyboard (modifier byte + 6-key array). Filtered out by enumeration.
#[rustfmt::skip]
pub const KEYBOARD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,       // Usage Page (Generic Desktop)
    0x09, 0x06,       // Usage (Keyboard)
    0xA1, 0x01,       // Collection (Application)
    0x05, 0x07,       //   Usage Page (Keyboard)
    0x19, 0xE0,       //   Usage Minimum (Left Control)
    0x29, 0xE7,       //   Usage Maximum (Right GUI)
    0x15, 0x00,       //   Logical Minimum (0)
    0x25, 0x01,       //   Logical Maximum (1)
    0x75, 0x01,       //   Report Size (1)
    0x95, 0x08,       //   Report Count (8)
    0x81, 0x02,       //   Input (Data, Var, Abs)
    0x19, 0x00,       //   Usage Minimum (0)
    0x29, 0x65,       //   Usage Maximum (101)
    0x25, 0x65,       //   Logical Maximum (101)
    0x75, 0x08,       //   Report Size (8)
    0x95, 0x06,       //   Report Count (6)
    0x81, 0x00,       //   Input (Data, Array)
    0xC0,             // End Collection
];

#[derive(Debug)]
struct Inner {
    descriptor: Vec<u8>,
    reports: VecDeque<Vec<u8>>,
    connected: bool,
}

/// A scriptable HID device.
#[derive(Clone, Debug)]
pub struct VirtualHidDevice {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

impl VirtualHidDevice {
    pub fn new(name: impl Into<String>, descriptor: &[u8]) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Inner {
                descriptor: descriptor.to_vec(),
                reports: VecDeque::new(),
                connected: true,
            })),
        }
    }

    pub fn joystick(name: impl Into<String>) -> Self {
        Self::new(name, JOYSTICK_DESCRIPTOR)
    }

    pub fn mouse(name: impl Into<String>) -> Self {
        Self::new(name, MOUSE_DESCRIPTOR)
    }

    pub fn gamepad(name: impl Into<String>) -> Self {
        Self::new(name, GAMEPAD_DESCRIPTOR)
    }

    pub fn keyboard(name: impl Into<String>) -> Self {
        Self::new(name, KEYBOARD_DESCRIPTOR)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue one raw input report.
    pub fn push_report(&self, report: &[u8]) {
        self.lock().reports.push_back(report.to_vec());
    }

    pub fn pending_reports(&self) -> usize {
        self.lock().reports.len()
    }

    /// Simulate the device being pulled: every further read fails.
    pub fn unplug(&self) {
        self.lock().connected = false;
    }

    pub fn replug(&self) {
        self.lock().connected = true;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn disconnected(&self) -> DeviceError {
        DeviceError::Disconnected {
            name: self.name.clone(),
        }
    }
}

impl HidTransport for VirtualHidDevice {
    fn read(&mut self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize, DeviceError> {
        let mut inner = self.lock();
        if !inner.connected {
            drop(inner);
            return Err(self.disconnected());
        }
        match inner.reports.pop_front() {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn report_descriptor(&mut self) -> Result<Vec<u8>, DeviceError> {
        let inner = self.lock();
        if !inner.connected {
            drop(inner);
            return Err(self.disconnected());
        }
        Ok(inner.descriptor.clone())
    }
}

/// How a scripted open should fail.
#[derive(Clone, Debug)]
pub enum OpenFailure {
    AccessDenied,
    Other(String),
}

#[derive(Debug)]
struct Entry {
    info: HidDeviceInfo,
    device: Option<VirtualHidDevice>,
    failure: Option<OpenFailure>,
}

/// A [`HidBackend`] over a fixed list of virtual devices.
#[derive(Debug, Default)]
pub struct VirtualHidBackend {
    entries: Vec<Entry>,
}

impl VirtualHidBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device; returns the info enumeration will report for it.
    pub fn attach(&mut self, device: VirtualHidDevice) -> HidDeviceInfo {
        let info = self.next_info(device.name());
        self.entries.push(Entry {
            info: info.clone(),
            device: Some(device),
            failure: None,
        });
        info
    }

    /// Attach a device that is listed but cannot be opened.
    pub fn attach_failing(&mut self, name: &str, failure: OpenFailure) -> HidDeviceInfo {
        let info = self.next_info(name);
        self.entries.push(Entry {
            info: info.clone(),
            device: None,
            failure: Some(failure),
        });
        info
    }

    fn next_info(&self, name: &str) -> HidDeviceInfo {
        let mut info = HidDeviceInfo::new(name, format!("virtual:{}", self.entries.len()));
        info.vendor_id = 0x1209;
        info.product_id = self.entries.len() as u16;
        info
    }
}

impl HidBackend for VirtualHidBackend {
    fn devices(&mut self) -> Result<Vec<HidDeviceInfo>, DeviceError> {
        Ok(self.entries.iter().map(|e| e.info.clone()).collect())
    }

    fn open(&mut self, info: &HidDeviceInfo) -> Result<Box<dyn HidTransport>, DeviceError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.info.path == info.path)
            .ok_or_else(|| DeviceError::Open {
                name: info.name.clone(),
                reason: format!("no device at {}", info.path),
            })?;

        match (&entry.failure, &entry.device) {
            (Some(OpenFailure::AccessDenied), _) => Err(DeviceError::AccessDenied {
                name: info.name.clone(),
            }),
            (Some(OpenFailure::Other(reason)), _) => Err(DeviceError::Open {
                name: info.name.clone(),
                reason: reason.clone(),
            }),
            (None, Some(device)) => Ok(Box::new(device.clone())),
            (None, None) => Err(DeviceError::Open {
                name: info.name.clone(),
                reason: "device vanished".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_reports() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut reader = dev.clone();
        dev.push_report(&[1, 2, 3, 4]);

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf, 0).expect("read"), 4);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(reader.read(&mut buf, 0).expect("read"), 0);

        dev.unplug();
        assert!(reader.read(&mut buf, 0).is_err());
    }

    #[test]
    fn backend_scripts_open_failures() {
        let mut backend = VirtualHidBackend::new();
        let denied = backend.attach_failing("Locked", OpenFailure::AccessDenied);
        let ok = backend.attach(VirtualHidDevice::mouse("Mouse"));

        assert_eq!(backend.devices().expect("list").len(), 2);
        assert!(matches!(
            backend.open(&denied),
            Err(DeviceError::AccessDenied { .. })
        ));
        assert!(backend.open(&ok).is_ok());
    }
}
