//! Registry enumeration and HID polling against virtual devices.

use stickcam::backends::hid_discovery::ProbeOutcome;
use stickcam::backends::virtual_hid::{OpenFailure, VirtualHidBackend, VirtualHidDevice};
use stickcam::{
    ChannelTotals, DeviceRegistry, FrameDriver, InputSource, ManualPlatformInput,
    MappingDefinition, ModifierSnapshot, OutputChannel, SourceKind,
};

fn registry() -> DeviceRegistry {
    DeviceRegistry::new(ManualPlatformInput::new())
}

#[test]
fn permission_denied_device_is_skipped() {
    let mut backend = VirtualHidBackend::new();
    backend.attach_failing("Claimed Stick", OpenFailure::AccessDenied);
    backend.attach(VirtualHidDevice::joystick("Good Stick"));

    let mut reg = registry();
    let records = reg.enumerate(&mut backend).expect("enumerate");

    let kinds: Vec<SourceKind> = reg.sources().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec![SourceKind::Platform, SourceKind::Hid]);
    assert!(reg.get("Good Stick").is_some());
    assert!(reg.get("Claimed Stick").is_none());
    assert!(matches!(records[0].outcome, ProbeOutcome::OpenFailed(_)));
    assert_eq!(records[1].registered_as.as_deref(), Some("Good Stick"));
}

#[test]
fn identical_names_are_disambiguated() {
    let mut backend = VirtualHidBackend::new();
    backend.attach(VirtualHidDevice::joystick("Foo"));
    backend.attach(VirtualHidDevice::joystick("Foo"));

    let mut reg = registry();
    reg.enumerate(&mut backend).expect("enumerate");
    assert!(reg.get("Foo").is_some());
    assert!(reg.get("Foo #2").is_some());
    assert_eq!(reg.unique_name("Foo"), "Foo #3");
}

#[test]
fn joystick_byte_200_reads_73() {
    let stick = VirtualHidDevice::joystick("Stick");
    let mut backend = VirtualHidBackend::new();
    backend.attach(stick.clone());
    let mut reg = registry();
    reg.enumerate(&mut backend).expect("enumerate");

    stick.push_report(&[200, 127, 127, 0]);
    reg.poll_all(1.0 / 60.0);
    let x = reg.get("Stick").and_then(|s| s.axis("X Axis")).map(|a| a.current());
    assert_eq!(x, Some(73.0));
}

#[test]
fn mouse_motion_drives_a_relative_channel_and_stops() {
    let mouse = VirtualHidDevice::mouse("Mouse");
    let mut backend = VirtualHidBackend::new();
    backend.attach(mouse.clone());
    let mut reg = registry();
    reg.enumerate(&mut backend).expect("enumerate");

    let mut turn = MappingDefinition::new("Mouse", "X Axis", OutputChannel::TurnX);
    turn.speed = 1.0;
    let mut mappings = vec![turn];
    let mut driver = FrameDriver::new(|_: &ChannelTotals| {});

    mouse.push_report(&[0, 5, 0, 0]);
    mouse.push_report(&[0, 5, 0, 0]);
    let moving = driver.run_frame(&mut reg, &mut mappings, &ModifierSnapshot::new(), 1.0 / 60.0)
        [OutputChannel::TurnX];
    assert!((moving - 10.0).abs() < 1e-4, "{moving}");

    let resting = driver.run_frame(&mut reg, &mut mappings, &ModifierSnapshot::new(), 1.0 / 60.0)
        [OutputChannel::TurnX];
    assert_eq!(resting, 0.0);
}

#[test]
fn unplugged_device_freezes_without_stopping_the_frame() {
    let stick = VirtualHidDevice::joystick("Stick");
    let mut backend = VirtualHidBackend::new();
    backend.attach(stick.clone());
    let input = ManualPlatformInput::new();
    let mut reg = DeviceRegistry::new(input.clone());
    reg.enumerate(&mut backend).expect("enumerate");

    let mut stick_map = MappingDefinition::new("Stick", "X Axis", OutputChannel::MoveX);
    stick_map.speed = 1.0;
    let mut mappings = vec![
        stick_map,
        MappingDefinition::new("", "ZoomCamera", OutputChannel::Zoom),
    ];
    let mut driver = FrameDriver::new(|_: &ChannelTotals| {});

    stick.push_report(&[137, 127, 127, 0]);
    driver.run_frame(&mut reg, &mut mappings, &ModifierSnapshot::new(), 1.0 / 60.0);

    stick.unplug();
    input.set("ZoomCamera", 1.0);
    let totals = *driver.run_frame(&mut reg, &mut mappings, &ModifierSnapshot::new(), 1.0 / 60.0);
    assert!((totals[OutputChannel::MoveX] - 10.0).abs() < 1e-4);
    assert!((totals[OutputChannel::Zoom] - 100.0).abs() < 1e-3);
}

#[test]
fn oversized_descriptor_fails_to_open() {
    #[rustfmt::skip]
    let descriptor = [
        0x05, 0x01, 0x09, 0x04, 0xA1, 0x01,
        0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08,
        0x97, 0x00, 0x00, 0x00, 0x02,
        0x81, 0x02,
        0xC0,
    ];
    let mut backend = VirtualHidBackend::new();
    backend.attach(VirtualHidDevice::new("Broken", &descriptor));
    backend.attach(VirtualHidDevice::joystick("Stick"));

    let mut reg = registry();
    let records = reg.enumerate(&mut backend).expect("enumerate");
    assert!(matches!(records[0].outcome, ProbeOutcome::OpenFailed(_)));
    assert!(reg.get("Broken").is_none());
    assert!(reg.get("Stick").is_some());
}
