//! Print what enumeration makes of every attached HID device, as JSON.

use stickcam::backends::default_backend;
use stickcam::{DeviceRegistry, ManualPlatformInput};

fn main() {
    let mut backend = default_backend().expect("init HID backend");
    let mut registry = DeviceRegistry::new(ManualPlatformInput::new());
    let records = registry.enumerate(backend.as_mut()).expect("enumerate");

    let json = serde_json::to_string_pretty(&records).expect("serialize report");
    println!("{json}");
}
