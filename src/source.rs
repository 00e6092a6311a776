//! Input sources.
//!
//! An [`InputSource`] is anything a mapping can read an axis from. Three kinds exist:
//! - [`PlatformAxisSource`]: the host's own input manager, always present, always
//!   registered under [`PLATFORM_SOURCE_NAME`].
//! - [`HidInputSource`](crate::backends::hid::HidInputSource): one opened USB HID device.
//! - [`PlaceholderSource`]: a saved device that is not connected this session. It keeps
//!   the device's axis and button names so mappings stay editable, reads 0 everywhere
//!   and never updates.
//!
//! Axis and button names are fixed when a source is built.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::DeviceError;
use crate::state::{AxisState, ButtonState};

/// Display name of the platform source.
pub const PLATFORM_SOURCE_NAME: &str = "Input Manager";

/// Axis that never moves; lets a mapping be parked without deleting it.
pub const NONE_AXIS: &str = "None";

/// Axes the platform source exposes, in display order.
pub const PLATFORM_AXES: [&str; 9] = [
    NONE_AXIS,
    "Horizontal",
    "Vertical",
    "RotationHorizontalCamera",
    "RotationVerticalCamera",
    "ZoomCamera",
    "Mouse X",
    "Mouse Y",
    "Mouse ScrollWheel",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Platform,
    Hid,
    Placeholder,
}

/// Named axis and button cells with a fixed name set.
#[derive(Clone, Debug, Default)]
pub struct SourceState {
    axes: Vec<(String, AxisState)>,
    buttons: Vec<(String, ButtonState)>,
}

impl SourceState {
    pub fn new<A, B>(axis_names: A, button_names: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            axes: axis_names
                .into_iter()
                .map(|n| (n.into(), AxisState::default()))
                .collect(),
            buttons: button_names
                .into_iter()
                .map(|n| (n.into(), ButtonState::default()))
                .collect(),
        }
    }

    pub fn axis_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.axes.iter().map(|(n, _)| n.as_str())
    }

    pub fn button_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.buttons.iter().map(|(n, _)| n.as_str())
    }

    pub fn axis(&self, name: &str) -> Option<&AxisState> {
        self.axes.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn button(&self, name: &str) -> Option<&ButtonState> {
        self.buttons.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Axis cells in name order, for the owning source to write.
    pub fn axes_mut(&mut self) -> impl Iterator<Item = (&str, &mut AxisState)> + '_ {
        self.axes.iter_mut().map(|(n, s)| (n.as_str(), s))
    }

    pub fn buttons_mut(&mut self) -> impl Iterator<Item = &mut ButtonState> + '_ {
        self.buttons.iter_mut().map(|(_, s)| s)
    }
}

/// Uniform read/update contract over every input source kind.
pub trait InputSource {
    /// Unique display name; also the identity key used in saved mappings.
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn state(&self) -> &SourceState;

    /// Refresh axis/button cells. Called once per frame before mappings are evaluated.
    ///
    /// An error leaves the previous values in place.
    fn update(&mut self, elapsed: f32) -> Result<(), DeviceError>;

    fn axis_names(&self) -> Vec<&str> {
        self.state().axis_names().collect()
    }

    fn button_names(&self) -> Vec<&str> {
        self.state().button_names().collect()
    }

    fn axis(&self, name: &str) -> Option<&AxisState> {
        self.state().axis(name)
    }

    fn button(&self, name: &str) -> Option<&ButtonState> {
        self.state().button(name)
    }
}

/// Host-side access to the platform input manager's axes.
pub trait PlatformInput {
    /// Current value of a named platform axis; 0 for axes the host does not know.
    fn axis(&self, name: &str) -> f32;
}

/// A [`PlatformInput`] the host pushes values into.
///
/// Clones share the same values, so the host can keep one clone and hand another
/// to the registry.
#[derive(Clone, Debug, Default)]
pub struct ManualPlatformInput {
    values: Rc<RefCell<HashMap<String, f32>>>,
}

impl ManualPlatformInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, axis: &str, value: f32) {
        self.values.borrow_mut().insert(axis.to_string(), value);
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}

impl PlatformInput for ManualPlatformInput {
    fn axis(&self, name: &str) -> f32 {
        self.values.borrow().get(name).copied().unwrap_or(0.0)
    }
}

/// The host input manager as an input source.
pub struct PlatformAxisSource {
    input: Box<dyn PlatformInput>,
    state: SourceState,
}

impl PlatformAxisSource {
    pub fn new(input: impl PlatformInput + 'static) -> Self {
        Self {
            input: Box::new(input),
            state: SourceState::new(PLATFORM_AXES, std::iter::empty::<String>()),
        }
    }
}

impl InputSource for PlatformAxisSource {
    fn name(&self) -> &str {
        PLATFORM_SOURCE_NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Platform
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn update(&mut self, elapsed: f32) -> Result<(), DeviceError> {
        let input = &self.input;
        for (name, cell) in self.state.axes_mut() {
            let value = if name == NONE_AXIS { 0.0 } else { input.axis(name) };
            cell.set(value, elapsed);
        }
        Ok(())
    }
}

/// Stand-in for a saved device that is not connected.
#[derive(Clone, Debug)]
pub struct PlaceholderSource {
    name: String,
    state: SourceState,
}

impl PlaceholderSource {
    pub fn new<A, B>(name: impl Into<String>, axis_names: A, button_names: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            name: name.into(),
            state: SourceState::new(axis_names, button_names),
        }
    }
}

impl InputSource for PlaceholderSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Placeholder
    }

    fn state(&self) -> &SourceState {
        &self.state
    }

    fn update(&mut self, _elapsed: f32) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_source_reads_host_axes() {
        let input = ManualPlatformInput::new();
        let mut source = PlatformAxisSource::new(input.clone());
        assert_eq!(source.name(), PLATFORM_SOURCE_NAME);
        assert_eq!(source.axis_names(), PLATFORM_AXES.to_vec());
        assert!(source.button_names().is_empty());

        input.set("Horizontal", 0.5);
        input.set(NONE_AXIS, 3.0);
        source.update(1.0 / 60.0).expect("update");

        assert_eq!(source.axis("Horizontal").map(|a| a.current()), Some(0.5));
        assert_eq!(source.axis(NONE_AXIS).map(|a| a.current()), Some(0.0));
        assert_eq!(source.axis("Vertical").map(|a| a.current()), Some(0.0));
        assert!(source.axis("Throttle").is_none());
    }

    #[test]
    fn placeholder_is_inert() {
        let mut p = PlaceholderSource::new("Old Stick", ["X Axis", "Y Axis"], ["1", "2"]);
        p.update(1.0).expect("update");
        assert_eq!(p.kind(), SourceKind::Placeholder);
        assert_eq!(p.axis_names(), vec!["X Axis", "Y Axis"]);
        assert_eq!(p.button_names(), vec!["1", "2"]);
        assert_eq!(p.axis("X Axis").map(|a| a.current()), Some(0.0));
        assert_eq!(p.button("2").map(|b| b.is_pressed()), Some(false));
    }
}
