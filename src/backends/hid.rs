//! HID device as an [`InputSource`].
//!
//! Axes keep the names the handle assigned (`"X Axis"`, `"Wheel"`, ...); buttons are
//! named `"1"` to `"N"`.

use super::hid_device::HidDeviceHandle;
use crate::error::DeviceError;
use crate::metadata::HidDeviceInfo;
use crate::source::{InputSource, SourceKind, SourceState};
use crate::usage::DeviceKind;

pub struct HidInputSource {
    name: String,
    info: HidDeviceInfo,
    handle: HidDeviceHandle,
    state: SourceState,
}

impl HidInputSource {
    /// Wrap an opened handle under a registry display name.
    pub fn new(name: impl Into<String>, info: HidDeviceInfo, handle: HidDeviceHandle) -> Self {
        let axes: Vec<&'static str> = handle.axis_names().collect();
        let buttons = (1..=handle.button_count()).map(|i| i.to_string());
        Self {
            name: name.into(),
            info,
            state: SourceState::new(axes, buttons),
            handle,
        }
    }

    pub fn info(&self) -> &HidDeviceInfo {
        &self.info
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.handle.kind()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }
}

impl InputSource for HidInputSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Hid
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn update(&mut self, elapsed: f32) -> Result<(), DeviceError> {
        self.handle.poll()?;

        for ((_, cell), (_, value)) in self.state.axes_mut().zip(self.handle.axes()) {
            cell.set(value, elapsed);
        }
        for (cell, &pressed) in self.state.buttons_mut().zip(self.handle.buttons()) {
            cell.set(pressed);
        }
        Ok(())
    }
}
