//! End-to-end mapping pipeline: platform source → mapping → frame totals.

use proptest::prelude::*;
use stickcam::{
    AxisState, ChannelTotals, DeviceRegistry, FrameDriver, InputSource, ManualPlatformInput,
    MappingDefinition, ModifierButton, ModifierCondition, ModifierGate, ModifierKey,
    ModifierSnapshot, OutputChannel, PlatformAxisSource, Side,
};

fn platform(axis: &str, value: f32) -> PlatformAxisSource {
    let input = ManualPlatformInput::new();
    input.set(axis, value);
    let mut source = PlatformAxisSource::new(input);
    source.update(1.0 / 60.0).expect("platform update");
    source
}

#[test]
fn half_deflection_at_sixty_fps_moves_fifty() {
    let input = ManualPlatformInput::new();
    let mut registry = DeviceRegistry::new(input.clone());
    let mut mappings = vec![MappingDefinition::new("", "Horizontal", OutputChannel::MoveX)];
    input.set("Horizontal", 0.5);

    let mut driver = FrameDriver::new(|_: &ChannelTotals| {});
    let totals = *driver.run_frame(
        &mut registry,
        &mut mappings,
        &ModifierSnapshot::new(),
        1.0 / 60.0,
    );

    assert!((totals[OutputChannel::MoveX] - 50.0).abs() < 1e-4);
    for (channel, value) in totals.iter() {
        if channel != OutputChannel::MoveX {
            assert_eq!(value, 0.0, "{channel}");
        }
    }
}

#[test]
fn small_sample_inside_dead_zone_is_dropped() {
    let source = platform("Horizontal", 0.05);
    let mut m = MappingDefinition::new("", "Horizontal", OutputChannel::MoveX);
    m.dead_zone = 0.1;
    assert_eq!(m.evaluate(&source, &ModifierSnapshot::new()), 0.0);
}

#[test]
fn smoothed_mapping_scales_the_smoothed_value() {
    let input = ManualPlatformInput::new();
    input.set("Horizontal", 10.0);
    let mut source = PlatformAxisSource::new(input);
    source.update(0.1).expect("platform update");

    let mut m = MappingDefinition::new("", "Horizontal", OutputChannel::MoveX);
    m.smoothing = true;
    let v = m.evaluate(&source, &ModifierSnapshot::new());
    assert!((v - 0.1 * 100.0).abs() < 1e-4, "{v}");

    m.smoothing = false;
    let raw = m.evaluate(&source, &ModifierSnapshot::new());
    assert!((raw - 1000.0).abs() < 1e-3, "{raw}");
}

#[test]
fn relative_first_frame_is_the_sample_itself() {
    let source = platform("Mouse ScrollWheel", 0.3);
    let mut m = MappingDefinition::new("", "Mouse ScrollWheel", OutputChannel::Zoom);
    m.relative = true;
    m.speed = 1.0;
    m.offset = 0.2;

    let v = m.evaluate(&source, &ModifierSnapshot::new());
    assert!((v - 0.5).abs() < 1e-6, "{v}");
    assert_eq!(m.previous_sample(), 0.3);
}

#[test]
fn modifier_gates_select_between_mappings() {
    let input = ManualPlatformInput::new();
    let mut registry = DeviceRegistry::new(input.clone());
    input.set("Vertical", 1.0);

    let shift = ModifierButton::Key(ModifierKey::Shift, Side::Either);
    let mut zoom = MappingDefinition::new("", "Vertical", OutputChannel::Zoom);
    zoom.modifiers.push(ModifierGate::new(shift, ModifierCondition::Held));
    let mut forward = MappingDefinition::new("", "Vertical", OutputChannel::MoveZ);
    forward
        .modifiers
        .push(ModifierGate::new(shift, ModifierCondition::NotHeld));
    let mut mappings = vec![zoom, forward];

    let mut driver = FrameDriver::new(|_: &ChannelTotals| {});
    let plain = *driver.run_frame(&mut registry, &mut mappings, &ModifierSnapshot::new(), 1.0 / 60.0);
    assert_eq!(plain[OutputChannel::Zoom], 0.0);
    assert!(plain[OutputChannel::MoveZ] > 99.0);

    let held = ModifierSnapshot::new().with(ModifierButton::Key(ModifierKey::Shift, Side::Left));
    let shifted = *driver.run_frame(&mut registry, &mut mappings, &held, 1.0 / 60.0);
    assert!(shifted[OutputChannel::Zoom] > 99.0);
    assert_eq!(shifted[OutputChannel::MoveZ], 0.0);
}

#[test]
fn smoothed_value_moves_at_one_unit_per_second() {
    let mut axis = AxisState::default();
    axis.set(10.0, 0.1);
    assert_eq!(axis.current(), 10.0);
    assert_eq!(axis.previous(), 0.0);
    assert!((axis.smoothed() - 0.1).abs() < 1e-6);
}

proptest! {
    #[test]
    fn prop_dead_zone_zeroes_small_inputs(
        dead_zone in 0.001f32..10.0,
        fraction in -0.999f32..0.999,
        speed in 0.1f32..1000.0,
    ) {
        let x = dead_zone * fraction;
        prop_assume!(x.abs() < dead_zone);
        let source = platform("Horizontal", x);
        let mut m = MappingDefinition::new("", "Horizontal", OutputChannel::MoveX);
        m.dead_zone = dead_zone;
        m.speed = speed;
        prop_assert_eq!(m.evaluate(&source, &ModifierSnapshot::new()), 0.0);
    }

    #[test]
    fn prop_gated_off_is_exactly_zero_and_stateless(sample in -100.0f32..100.0) {
        let source = platform("Mouse X", sample);
        let mut m = MappingDefinition::new("", "Mouse X", OutputChannel::TurnX);
        m.relative = true;
        m.modifiers.push(ModifierGate::new(ModifierButton::Button(1), ModifierCondition::Held));

        prop_assert_eq!(m.evaluate(&source, &ModifierSnapshot::new()), 0.0);
        prop_assert_eq!(m.previous_sample(), 0.0);
    }

    #[test]
    fn prop_relative_remembers_raw_sample(
        sample in -100.0f32..100.0,
        offset in -5.0f32..5.0,
        dead_zone in 0.0f32..50.0,
    ) {
        let source = platform("Mouse Y", sample);
        let mut m = MappingDefinition::new("", "Mouse Y", OutputChannel::TurnY);
        m.relative = true;
        m.offset = offset;
        m.dead_zone = dead_zone;
        m.evaluate(&source, &ModifierSnapshot::new());
        prop_assert_eq!(m.previous_sample(), sample);
    }
}
