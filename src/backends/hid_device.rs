//! HID device handle.
//!
//! [`HidDeviceHandle`] owns one open [`HidTransport`] plus the decoder state for it.
//! It is responsible for:
//! - fetching and parsing the report descriptor once at open time
//! - picking the first Mouse/Joystick top-level item and indexing its axes/buttons
//! - draining a bounded number of pending reports per poll without blocking
//! - applying the per-kind value policy (joystick centring, mouse reset + accumulate)
//!
//! This module does **not** apply dead zones, scaling or smoothing (mapping policy),
//! and does not log repeated poll failures (the registry does that once per source).

use std::time::Duration;

use tracing::{debug, info};

use super::HidTransport;
use crate::decoder::{ItemDecoder, UsageChange};
use crate::descriptor::ReportDescriptor;
use crate::error::DeviceError;
use crate::usage::{self, DeviceKind};

/// Maximum number of reports drained per [`HidDeviceHandle::poll`] call.
///
/// Keeps one device that produces data faster than the frame rate from stalling the frame.
pub const MAX_REPORTS_PER_TICK: usize = 32;

/// Bound applied to blocking reads ([`HidDeviceHandle::wait`]).
pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Neutral value of a byte-wide joystick axis.
pub const JOYSTICK_NEUTRAL: i32 = 127;

#[derive(Clone, Debug)]
struct HidAxis {
    usage: u32,
    name: &'static str,
    value: f32,
}

/// One opened HID device and its decoded state.
pub struct HidDeviceHandle {
    name: String,
    kind: DeviceKind,
    transport: Box<dyn HidTransport>,
    decoder: ItemDecoder,
    buf: Vec<u8>,
    changes: Vec<UsageChange>,
    axes: Vec<HidAxis>,
    buttons: Vec<bool>,
    read_timeout: Duration,
    running: bool,
}

impl HidDeviceHandle {
    /// Open sequence: fetch descriptor, find the first supported top-level item,
    /// build the axis/button index from its input usages.
    ///
    /// # Errors
    /// - [`DeviceError::Descriptor`] if the descriptor cannot be parsed.
    /// - [`DeviceError::UnsupportedDeviceType`] if no item is a Mouse or Joystick.
    pub fn open(
        mut transport: Box<dyn HidTransport>,
        name: impl Into<String>,
    ) -> Result<Self, DeviceError> {
        let name = name.into();
        let raw = transport.report_descriptor()?;
        let descriptor =
            ReportDescriptor::parse(&raw).map_err(|source| DeviceError::Descriptor {
                name: name.clone(),
                source,
            })?;

        let (kind, item) = descriptor
            .device_items()
            .iter()
            .find_map(|item| DeviceKind::from_usage(item.usage).map(|kind| (kind, item)))
            .ok_or_else(|| DeviceError::UnsupportedDeviceType { name: name.clone() })?;

        info!(device = %name, ?kind, "opening device");

        let mut axes: Vec<HidAxis> = Vec::new();
        let mut button_count = 0usize;
        for u in item.input_usages() {
            #[cfg(feature = "debug-log")]
            tracing::trace!(device = %name, usage = %usage::describe(u), "input report usage");

            if let Some(idx) = usage::button_index(u) {
                button_count = button_count.max(idx + 1);
            } else if let Some(axis_name) = usage::axis_name(u) {
                if !axes.iter().any(|a| a.usage == u) {
                    axes.push(HidAxis {
                        usage: u,
                        name: axis_name,
                        value: 0.0,
                    });
                }
            }
        }
        debug!(
            device = %name,
            axes = axes.len(),
            buttons = button_count,
            "indexed input usages"
        );

        let decoder = ItemDecoder::new(&descriptor, item);
        let buf_len = transport
            .max_input_report_len()
            .unwrap_or(0)
            .max(descriptor.max_input_report_len())
            .max(1);

        Ok(Self {
            name,
            kind,
            transport,
            decoder,
            buf: vec![0u8; buf_len],
            changes: Vec::new(),
            axes,
            buttons: vec![false; button_count],
            read_timeout: READ_TIMEOUT,
            running: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// `false` once a read has failed; the handle never recovers from that.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Axis names in descriptor order.
    pub fn axis_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.axes.iter().map(|a| a.name)
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    /// Current axis values, in the same order as [`HidDeviceHandle::axis_names`].
    pub fn axes(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.axes.iter().map(|a| (a.name, a.value))
    }

    pub fn axis(&self, name: &str) -> Option<f32> {
        self.axes.iter().find(|a| a.name == name).map(|a| a.value)
    }

    pub fn buttons(&self) -> &[bool] {
        &self.buttons
    }

    /// Drain pending reports and update axis/button state.
    ///
    /// Never waits for data: no pending report means "no change this frame"
    /// (for mice, "no motion", so axes read 0).
    ///
    /// # Errors
    /// [`DeviceError::Disconnected`] if the device can no longer be read. State from
    /// before the failure is kept.
    pub fn poll(&mut self) -> Result<(), DeviceError> {
        self.ensure_running()?;

        if self.kind == DeviceKind::Mouse {
            for axis in &mut self.axes {
                axis.value = 0.0;
            }
        }

        for _ in 0..MAX_REPORTS_PER_TICK {
            match self.read_report(0)? {
                0 => break,
                n => self.apply_report(n),
            }
        }
        Ok(())
    }

    /// Block for up to the read timeout for one report and apply it.
    ///
    /// Returns `Ok(false)` if the timeout expired with no report. Used by tooling
    /// that wants to see a device's first report; the frame loop uses [`poll`](Self::poll).
    pub fn wait(&mut self) -> Result<bool, DeviceError> {
        self.ensure_running()?;
        let timeout = i32::try_from(self.read_timeout.as_millis()).unwrap_or(i32::MAX);
        match self.read_report(timeout)? {
            0 => Ok(false),
            n => {
                self.apply_report(n);
                Ok(true)
            }
        }
    }

    fn ensure_running(&self) -> Result<(), DeviceError> {
        if self.running {
            Ok(())
        } else {
            Err(DeviceError::Disconnected {
                name: self.name.clone(),
            })
        }
    }

    fn read_report(&mut self, timeout_ms: i32) -> Result<usize, DeviceError> {
        match self.transport.read(&mut self.buf, timeout_ms) {
            Ok(n) => Ok(n.min(self.buf.len())),
            Err(e) => {
                self.running = false;
                debug!(device = %self.name, error = %e, "read failed; marking device stopped");
                Err(DeviceError::Disconnected {
                    name: self.name.clone(),
                })
            }
        }
    }

    fn apply_report(&mut self, len: usize) {
        self.changes.clear();
        if !self.decoder.decode(&self.buf[..len], &mut self.changes) {
            return;
        }
        for change in &self.changes {
            apply_change(self.kind, &mut self.axes, &mut self.buttons, change);
        }
    }
}

fn apply_change(kind: DeviceKind, axes: &mut [HidAxis], buttons: &mut [bool], change: &UsageChange) {
    if let Some(idx) = usage::button_index(change.usage) {
        if let Some(b) = buttons.get_mut(idx) {
            *b = change.value > 0;
        }
        return;
    }
    let Some(axis) = axes.iter_mut().find(|a| a.usage == change.usage) else {
        return;
    };
    match kind {
        DeviceKind::Joystick => axis.value = (change.value - JOYSTICK_NEUTRAL) as f32,
        DeviceKind::Mouse => axis.value += change.value as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::VirtualHidDevice;

    #[test]
    fn joystick_axes_are_centred() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Stick").expect("open");
        assert_eq!(handle.kind(), DeviceKind::Joystick);
        assert_eq!(
            handle.axis_names().collect::<Vec<_>>(),
            vec!["X Axis", "Y Axis", "Z Axis"]
        );
        assert_eq!(handle.button_count(), 8);

        dev.push_report(&[200, 127, 0, 0b0000_0010]);
        handle.poll().expect("poll");
        assert_eq!(handle.axis("X Axis"), Some(73.0));
        assert_eq!(handle.axis("Y Axis"), Some(0.0));
        // Z never changed from the decoder's initial 0, so it was not re-centred.
        assert_eq!(handle.axis("Z Axis"), Some(0.0));
        assert!(handle.buttons()[1]);
    }

    #[test]
    fn joystick_keeps_values_without_reports() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Stick").expect("open");
        dev.push_report(&[10, 127, 0, 0]);
        handle.poll().expect("poll");
        handle.poll().expect("poll");
        assert_eq!(handle.axis("X Axis"), Some(-117.0));
    }

    #[test]
    fn mouse_resets_then_accumulates() {
        let dev = VirtualHidDevice::mouse("Mouse");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Mouse").expect("open");
        assert_eq!(handle.kind(), DeviceKind::Mouse);
        assert_eq!(
            handle.axis_names().collect::<Vec<_>>(),
            vec!["X Axis", "Y Axis", "Wheel"]
        );
        assert_eq!(handle.button_count(), 3);

        dev.push_report(&[0, 3, 0xFF, 0]);
        dev.push_report(&[0, 4, 0, 1]);
        handle.poll().expect("poll");
        assert_eq!(handle.axis("X Axis"), Some(7.0));
        assert_eq!(handle.axis("Y Axis"), Some(-1.0));
        assert_eq!(handle.axis("Wheel"), Some(1.0));

        handle.poll().expect("poll");
        assert_eq!(handle.axis("X Axis"), Some(0.0));
        assert_eq!(handle.axis("Wheel"), Some(0.0));
    }

    #[test]
    fn drain_is_bounded_per_poll() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Stick").expect("open");
        for i in 0..(MAX_REPORTS_PER_TICK + 5) {
            dev.push_report(&[i as u8, 127, 0, 0]);
        }
        handle.poll().expect("poll");
        assert_eq!(dev.pending_reports(), 5);
    }

    #[test]
    fn gamepad_is_unsupported_at_open() {
        let dev = VirtualHidDevice::gamepad("Pad");
        let err = HidDeviceHandle::open(Box::new(dev), "Pad").err().expect("should fail");
        assert!(matches!(err, DeviceError::UnsupportedDeviceType { .. }));
    }

    #[test]
    fn disconnect_is_sticky_and_keeps_state() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Stick").expect("open");
        dev.push_report(&[150, 127, 0, 0]);
        handle.poll().expect("poll");

        dev.unplug();
        assert!(handle.poll().expect_err("unplugged").is_disconnect());
        assert!(!handle.is_running());
        dev.replug();
        assert!(handle.poll().expect_err("still failed").is_disconnect());
        assert_eq!(handle.axis("X Axis"), Some(23.0));
    }

    #[test]
    fn wait_returns_false_on_timeout() {
        let dev = VirtualHidDevice::joystick("Stick");
        let mut handle = HidDeviceHandle::open(Box::new(dev.clone()), "Stick").expect("open");
        assert!(!handle.wait().expect("wait"));
        dev.push_report(&[128, 127, 0, 0]);
        assert!(handle.wait().expect("wait"));
        assert_eq!(handle.axis("X Axis"), Some(1.0));
    }
}
