//! stickcam: drive a camera from joysticks, mice and host input axes.
//!
//! Raw USB HID devices and the host's own input manager are exposed as uniform
//! [`InputSource`]s held by a [`DeviceRegistry`]. User-configured
//! [`MappingDefinition`]s read one axis each and, after modifier gating, offset,
//! dead zone and scaling, add into one of eight camera [`OutputChannel`]s. The
//! [`FrameDriver`] runs that pipeline once per frame and hands the totals to the
//! host's [`OutputSink`].
//!
//! ```no_run
//! use stickcam::{
//!     ConfigStore, DeviceRegistry, FrameDriver, ManualPlatformInput, ModifierSnapshot,
//!     Profile,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = ManualPlatformInput::new();
//! let mut registry = DeviceRegistry::new(input.clone());
//! let mut profile = Profile::load(ConfigStore::new("stickcam.toml"), &mut registry)?;
//! if profile.wants_usb_devices() {
//!     let mut backend = stickcam::backends::default_backend()?;
//!     registry.enumerate(backend.as_mut())?;
//! }
//!
//! let mut driver = FrameDriver::new(|totals: &stickcam::ChannelTotals| {
//!     // apply totals to the camera
//!     let _ = totals;
//! });
//! input.set("Horizontal", 0.5);
//! driver.run_frame(&mut registry, profile.mappings_mut(), &ModifierSnapshot::new(), 1.0 / 60.0);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod logger;
pub mod mapping;
pub mod metadata;
pub mod modifier;
pub mod profile;
pub mod registry;
pub mod source;
pub mod state;
pub mod usage;

pub use config::{ConfigStore, KnownDevice, MappingRecord, ModifierRecord, Settings};
pub use error::{ConfigError, DescriptorError, DeviceError};
pub use frame::{ChannelTotals, FrameDriver, OutputSink};
pub use mapping::{MappingDefinition, OutputChannel, Sign};
pub use metadata::HidDeviceInfo;
pub use modifier::{
    ModifierButton, ModifierCondition, ModifierGate, ModifierKey, ModifierSnapshot, Side,
};
pub use profile::Profile;
pub use registry::DeviceRegistry;
pub use source::{
    InputSource, ManualPlatformInput, PlaceholderSource, PlatformAxisSource, PlatformInput,
    SourceKind,
};
pub use state::{AxisState, ButtonState};
