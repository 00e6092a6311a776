//! Error types.
//!
//! Errors are split by the layer that produces them:
//! - [`DescriptorError`]: a HID report descriptor could not be parsed.
//! - [`DeviceError`]: opening, classifying or polling a HID device failed.
//! - [`ConfigError`]: a settings file or one of its records could not be used.
//!
//! None of these are fatal to the host. Enumeration skips a device that fails,
//! the registry treats a failed poll as "no change this frame", and config
//! loading drops the single offending record.

use thiserror::Error;

/// Malformed HID report descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor contained no bytes.
    #[error("report descriptor is empty")]
    Empty,

    /// An item announced more data bytes than remain in the descriptor.
    #[error("item at byte {offset} runs past the end of the descriptor")]
    Truncated { offset: usize },

    /// `End Collection` without a matching `Collection`.
    #[error("unbalanced End Collection at byte {offset}")]
    UnbalancedCollection { offset: usize },

    /// An input field would push its report past the largest accepted size.
    #[error("input report {report_id} grows too large at byte {offset}")]
    ReportTooLarge { offset: usize, report_id: u8 },

    /// `Pop` without a matching `Push`.
    #[error("global Pop without Push at byte {offset}")]
    PopWithoutPush { offset: usize },
}

/// Failure while opening or polling a HID device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The descriptor exposes neither a mouse nor a joystick application collection.
    #[error("unsupported device type: {name}")]
    UnsupportedDeviceType { name: String },

    /// The device stopped delivering reports (usually unplugged).
    #[error("device disconnected: {name}")]
    Disconnected { name: String },

    /// The OS refused access (device claimed exclusively, missing permissions).
    #[error("access denied to device: {name}")]
    AccessDenied { name: String },

    /// Any other failure to open the device.
    #[error("failed to open device {name}: {reason}")]
    Open { name: String, reason: String },

    /// The device's report descriptor could not be read or parsed.
    #[error("bad report descriptor on {name}: {source}")]
    Descriptor {
        name: String,
        #[source]
        source: DescriptorError,
    },

    /// The HID backend itself could not be initialised.
    #[error("HID backend unavailable: {0}")]
    Backend(String),
}

impl DeviceError {
    /// `true` for errors that mean "this device is gone", as opposed to setup failures.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, DeviceError::Disconnected { .. })
    }
}

/// Failure while loading or saving settings, or while validating one record.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("config could not be written as TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid output '{0}'")]
    UnknownOutput(String),

    #[error("invalid modifier button '{0}'")]
    UnknownButton(String),

    #[error("invalid modifier condition '{0}'")]
    UnknownCondition(String),

    #[error("invalid axis '{axis}' on input source '{source_name}'")]
    UnknownAxis { source_name: String, axis: String },
}
