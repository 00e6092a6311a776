//! Enumerate HID devices, bind every device's first axis to "Move Left/Right" and
//! print channel totals each frame.
//!
//! Without a usable USB backend a scripted virtual joystick is used instead.
//!
//! ```text
//! cargo run --example poll -- [config path]
//! ```

use std::time::{Duration, Instant};

use stickcam::backends::virtual_hid::{VirtualHidBackend, VirtualHidDevice};
use stickcam::backends::{self, HidBackend};
use stickcam::logger::{self, DebugDisplaySink};
use stickcam::{
    ChannelTotals, ConfigStore, DeviceRegistry, FrameDriver, InputSource, ManualPlatformInput,
    MappingDefinition, ModifierSnapshot, OutputChannel, Profile, SourceKind,
};
use tracing::Level;

fn main() {
    logger::init(Level::DEBUG).expect("install subscriber");

    let path = std::env::args().nth(1).unwrap_or_else(|| "stickcam.toml".into());
    let input = ManualPlatformInput::new();
    let mut registry = DeviceRegistry::new(input.clone());
    let mut profile = Profile::load(ConfigStore::new(path), &mut registry).expect("load profile");

    let mut scripted = None;
    let mut backend: Box<dyn HidBackend> = match backends::default_backend() {
        Ok(b) => b,
        Err(e) => {
            println!("no USB backend ({e}); using a virtual joystick");
            let stick = VirtualHidDevice::joystick("Virtual Stick");
            let mut virt = VirtualHidBackend::new();
            virt.attach(stick.clone());
            scripted = Some(stick);
            Box::new(virt)
        }
    };
    for record in registry.enumerate(backend.as_mut()).expect("enumerate") {
        println!("{:<40} {:?}", record.device.to_string(), record.outcome);
    }

    let hid: Vec<(String, String)> = registry
        .sources()
        .filter(|s| s.kind() == SourceKind::Hid)
        .filter_map(|s| Some((s.name().to_string(), s.axis_names().first()?.to_string())))
        .collect();
    for (source, axis) in hid {
        let idx = profile.add_mapping(&registry);
        if let Some(m) = profile.mapping_mut(idx) {
            *m = MappingDefinition::new(source, axis, OutputChannel::MoveX);
            m.speed = 1.0;
            m.dead_zone = 4.0;
        }
    }

    let show = profile.settings().show_debug;
    let print = |totals: &ChannelTotals| {
        if !totals.is_zero() {
            println!("{:>8.2} {:>8.2}", totals[OutputChannel::MoveX], totals[OutputChannel::MoveZ]);
        }
    };
    let mut driver = FrameDriver::new(DebugDisplaySink::new(print, show));

    let frame = Duration::from_millis(16);
    let mut last = Instant::now();
    for tick in 0u32.. {
        if let Some(stick) = &scripted {
            let x = 127.0 + 100.0 * (tick as f32 / 30.0).sin();
            stick.push_report(&[x as u8, 127, 127, 0]);
        }
        let now = Instant::now();
        let elapsed = now.duration_since(last).as_secs_f32();
        last = now;
        driver.run_frame(
            &mut registry,
            profile.mappings_mut(),
            &ModifierSnapshot::new(),
            elapsed,
        );
        std::thread::sleep(frame);
    }
}
