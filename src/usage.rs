//! HID usage tables used by the decoder and device classification.
//!
//! Usages are handled in their 32-bit extended form, `(usage_page << 16) | usage_id`,
//! so a usage carries its page with it (`0x0001_0030` is Generic Desktop / X).

/// Generic Desktop usage page.
pub const PAGE_GENERIC_DESKTOP: u16 = 0x01;
/// Button usage page.
pub const PAGE_BUTTON: u16 = 0x09;

pub const MOUSE: u32 = extended(PAGE_GENERIC_DESKTOP, 0x02);
pub const JOYSTICK: u32 = extended(PAGE_GENERIC_DESKTOP, 0x04);
pub const GAMEPAD: u32 = extended(PAGE_GENERIC_DESKTOP, 0x05);
pub const KEYBOARD: u32 = extended(PAGE_GENERIC_DESKTOP, 0x06);
pub const MULTI_AXIS_CONTROLLER: u32 = extended(PAGE_GENERIC_DESKTOP, 0x08);

pub const X: u32 = extended(PAGE_GENERIC_DESKTOP, 0x30);
pub const Y: u32 = extended(PAGE_GENERIC_DESKTOP, 0x31);
pub const Z: u32 = extended(PAGE_GENERIC_DESKTOP, 0x32);
pub const RX: u32 = extended(PAGE_GENERIC_DESKTOP, 0x33);
pub const RY: u32 = extended(PAGE_GENERIC_DESKTOP, 0x34);
pub const RZ: u32 = extended(PAGE_GENERIC_DESKTOP, 0x35);
pub const SLIDER: u32 = extended(PAGE_GENERIC_DESKTOP, 0x36);
pub const DIAL: u32 = extended(PAGE_GENERIC_DESKTOP, 0x37);
pub const WHEEL: u32 = extended(PAGE_GENERIC_DESKTOP, 0x38);

/// First and last usage of the contiguous button range (Button 1 ..= Button 31).
pub const BUTTON_FIRST: u32 = extended(PAGE_BUTTON, 0x01);
pub const BUTTON_LAST: u32 = extended(PAGE_BUTTON, 0x1F);

/// Axes we decode, with the names they are exposed under.
const AXIS_NAMES: [(u32, &str); 9] = [
    (X, "X Axis"),
    (Y, "Y Axis"),
    (Z, "Z Axis"),
    (RX, "Rx Axis"),
    (RY, "Ry Axis"),
    (RZ, "Rz Axis"),
    (WHEEL, "Wheel"),
    (SLIDER, "Slider"),
    (DIAL, "Dial"),
];

/// Combine a page and an id into an extended usage.
#[inline]
pub const fn extended(page: u16, id: u16) -> u32 {
    ((page as u32) << 16) | id as u32
}

#[inline]
pub const fn page(usage: u32) -> u16 {
    (usage >> 16) as u16
}

#[inline]
pub const fn id(usage: u32) -> u16 {
    (usage & 0xFFFF) as u16
}

/// Exposed axis name for `usage`, or `None` if it is not a decoded axis.
pub fn axis_name(usage: u32) -> Option<&'static str> {
    AXIS_NAMES
        .iter()
        .find(|(u, _)| *u == usage)
        .map(|(_, name)| *name)
}

/// Zero-based button index for a usage in the button range.
pub fn button_index(usage: u32) -> Option<usize> {
    if (BUTTON_FIRST..=BUTTON_LAST).contains(&usage) {
        Some((usage - BUTTON_FIRST) as usize)
    } else {
        None
    }
}

/// Top-level usages that make a device worth opening during enumeration.
pub fn is_supported_top_level(usage: u32) -> bool {
    matches!(usage, MOUSE | JOYSTICK | GAMEPAD | MULTI_AXIS_CONTROLLER)
}

/// How a device's reports are interpreted once opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Relative motion; reports arrive only while the mouse moves.
    Mouse,
    /// Absolute axes centred on a fixed neutral value.
    Joystick,
}

impl DeviceKind {
    /// Classify a top-level application collection usage.
    pub fn from_usage(usage: u32) -> Option<Self> {
        match usage {
            MOUSE => Some(DeviceKind::Mouse),
            JOYSTICK => Some(DeviceKind::Joystick),
            _ => None,
        }
    }
}

/// Human-readable label for logs (`"GenericDesktop/X"`, `"Button/3"`, `"Page 0xff00/0x0001"`).
pub fn describe(usage: u32) -> String {
    match page(usage) {
        PAGE_GENERIC_DESKTOP => match usage {
            MOUSE => "GenericDesktop/Mouse".into(),
            JOYSTICK => "GenericDesktop/Joystick".into(),
            GAMEPAD => "GenericDesktop/Gamepad".into(),
            KEYBOARD => "GenericDesktop/Keyboard".into(),
            MULTI_AXIS_CONTROLLER => "GenericDesktop/MultiAxisController".into(),
            _ => match axis_name(usage) {
                Some(name) => format!("GenericDesktop/{name}"),
                None => format!("GenericDesktop/{:#04x}", id(usage)),
            },
        },
        PAGE_BUTTON => format!("Button/{}", id(usage)),
        p => format!("Page {p:#06x}/{:#06x}", id(usage)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_range_maps_to_zero_based_index() {
        assert_eq!(button_index(BUTTON_FIRST), Some(0));
        assert_eq!(button_index(extended(PAGE_BUTTON, 5)), Some(4));
        assert_eq!(button_index(BUTTON_LAST), Some(30));
        assert_eq!(button_index(extended(PAGE_BUTTON, 0x20)), None);
        assert_eq!(button_index(X), None);
    }

    #[test]
    fn axis_table() {
        assert_eq!(axis_name(X), Some("X Axis"));
        assert_eq!(axis_name(WHEEL), Some("Wheel"));
        assert_eq!(axis_name(extended(PAGE_GENERIC_DESKTOP, 0x39)), None);
    }

    #[test]
    fn classification() {
        assert_eq!(DeviceKind::from_usage(MOUSE), Some(DeviceKind::Mouse));
        assert_eq!(DeviceKind::from_usage(JOYSTICK), Some(DeviceKind::Joystick));
        assert_eq!(DeviceKind::from_usage(GAMEPAD), None);
        assert!(is_supported_top_level(GAMEPAD));
        assert!(is_supported_top_level(MULTI_AXIS_CONTROLLER));
        assert!(!is_supported_top_level(KEYBOARD));
    }

    #[test]
    fn describe_labels() {
        assert_eq!(describe(Y), "GenericDesktop/Y Axis");
        assert_eq!(describe(extended(PAGE_BUTTON, 3)), "Button/3");
    }
}
