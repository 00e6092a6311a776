//! HID backends for `stickcam`.
//!
//! The rest of the crate talks to USB HID hardware through two small seams:
//! - [`HidBackend`]: lists HID interfaces and opens them.
//! - [`HidTransport`]: one open interface; hands out its report descriptor and
//!   raw input reports.
//!
//! On top of those sit the [`hid_device`] handle (descriptor → decoder → axis/button
//! state), the [`hid`] input source, and [`hid_discovery`] enumeration.
//!
//! # Feature flags
//! - **`hid`** (default): enables [`hidapi_backend`], the real USB backend built on `hidapi`.
//!
//! [`virtual_hid`] is always available: in-memory devices used by demos and tests.

use crate::error::DeviceError;
use crate::metadata::HidDeviceInfo;

pub mod hid;
pub mod hid_device;
pub mod hid_discovery;
#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hidapi_backend;
pub mod virtual_hid;

/// An open HID interface.
pub trait HidTransport {
    /// Read one input report into `buf`.
    ///
    /// `timeout_ms`: `0` returns immediately, `-1` blocks. `Ok(0)` means no report
    /// was pending. Any error means the device can no longer be read.
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, DeviceError>;

    /// Raw report descriptor bytes.
    fn report_descriptor(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Longest input report the platform will hand out, if it knows.
    fn max_input_report_len(&self) -> Option<usize> {
        None
    }
}

/// A source of HID interfaces.
pub trait HidBackend {
    /// List currently attached HID interfaces.
    fn devices(&mut self) -> Result<Vec<HidDeviceInfo>, DeviceError>;

    /// Open one interface returned by [`HidBackend::devices`].
    fn open(&mut self, info: &HidDeviceInfo) -> Result<Box<dyn HidTransport>, DeviceError>;
}

/// The platform backend for this build.
///
/// Returns [`DeviceError::Backend`] when built without the `hid` feature or when the
/// platform HID library cannot be initialised.
pub fn default_backend() -> Result<Box<dyn HidBackend>, DeviceError> {
    #[cfg(feature = "hid")]
    {
        let backend = hidapi_backend::HidApiBackend::new()?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "hid"))]
    {
        Err(DeviceError::Backend("built without the `hid` feature".into()))
    }
}
