//! Modifier gates.
//!
//! A mapping can be restricted to frames where some auxiliary buttons are (or are
//! not) held: "zoom only while Right Ctrl is held", "pan only while Mouse Button 3
//! is not held". The host fills a [`ModifierSnapshot`] once per frame; every gate
//! of every mapping is checked against that same snapshot.
//!
//! Button and condition names are the persisted form and round-trip through
//! `name`/`from_name`.

use std::fmt;

/// Keyboard modifier keys that come in left/right pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    Shift,
    Ctrl,
    Alt,
    Cmd,
    Windows,
}

impl ModifierKey {
    pub const ALL: [ModifierKey; 5] = [
        ModifierKey::Shift,
        ModifierKey::Ctrl,
        ModifierKey::Alt,
        ModifierKey::Cmd,
        ModifierKey::Windows,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModifierKey::Shift => "Shift",
            ModifierKey::Ctrl => "Ctrl",
            ModifierKey::Alt => "Alt",
            ModifierKey::Cmd => "Cmd",
            ModifierKey::Windows => "Windows",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which physical key of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    /// Either key of the pair.
    Either,
}

const KEY_COUNT: usize = ModifierKey::ALL.len();

pub const MOUSE_BUTTONS: u8 = 7;
pub const DEVICE_BUTTONS: u8 = 20;

/// A logical button a gate can test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierButton {
    Key(ModifierKey, Side),
    /// Pointer button, 1-based, up to [`MOUSE_BUTTONS`].
    Mouse(u8),
    /// Generic controller button, 1-based, up to [`DEVICE_BUTTONS`].
    Button(u8),
}

impl ModifierButton {
    /// Every valid button, in menu order.
    pub fn all() -> impl Iterator<Item = ModifierButton> {
        let keys = ModifierKey::ALL.into_iter().flat_map(|k| {
            [Side::Left, Side::Right, Side::Either]
                .into_iter()
                .map(move |s| ModifierButton::Key(k, s))
        });
        keys.chain((1..=MOUSE_BUTTONS).map(ModifierButton::Mouse))
            .chain((1..=DEVICE_BUTTONS).map(ModifierButton::Button))
    }

    pub fn is_valid(self) -> bool {
        match self {
            ModifierButton::Key(..) => true,
            ModifierButton::Mouse(n) => (1..=MOUSE_BUTTONS).contains(&n),
            ModifierButton::Button(n) => (1..=DEVICE_BUTTONS).contains(&n),
        }
    }

    /// Persisted name: `"Left Shift"`, `"Ctrl"`, `"Mouse Button 3"`, `"Button 12"`.
    pub fn name(self) -> String {
        match self {
            ModifierButton::Key(k, Side::Left) => format!("Left {}", k.name()),
            ModifierButton::Key(k, Side::Right) => format!("Right {}", k.name()),
            ModifierButton::Key(k, Side::Either) => k.name().to_string(),
            ModifierButton::Mouse(n) => format!("Mouse Button {n}"),
            ModifierButton::Button(n) => format!("Button {n}"),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let parsed = if let Some(rest) = name.strip_prefix("Mouse Button ") {
            ModifierButton::Mouse(rest.parse().ok()?)
        } else if let Some(rest) = name.strip_prefix("Button ") {
            ModifierButton::Button(rest.parse().ok()?)
        } else if let Some(rest) = name.strip_prefix("Left ") {
            ModifierButton::Key(ModifierKey::from_name(rest)?, Side::Left)
        } else if let Some(rest) = name.strip_prefix("Right ") {
            ModifierButton::Key(ModifierKey::from_name(rest)?, Side::Right)
        } else {
            ModifierButton::Key(ModifierKey::from_name(name)?, Side::Either)
        };
        parsed.is_valid().then_some(parsed)
    }
}

impl fmt::Display for ModifierButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModifierCondition {
    #[default]
    Held,
    NotHeld,
}

impl ModifierCondition {
    pub const ALL: [ModifierCondition; 2] = [ModifierCondition::Held, ModifierCondition::NotHeld];

    pub fn name(self) -> &'static str {
        match self {
            ModifierCondition::Held => "Held",
            ModifierCondition::NotHeld => "Not Held",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One button/condition pair of a mapping's gate list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModifierGate {
    pub button: ModifierButton,
    pub condition: ModifierCondition,
}

impl ModifierGate {
    pub fn new(button: ModifierButton, condition: ModifierCondition) -> Self {
        Self { button, condition }
    }

    pub fn is_satisfied(&self, snapshot: &ModifierSnapshot) -> bool {
        let held = snapshot.is_held(self.button);
        match self.condition {
            ModifierCondition::Held => held,
            ModifierCondition::NotHeld => !held,
        }
    }
}

/// `true` when every gate holds (an empty list always holds).
pub fn gates_pass(gates: &[ModifierGate], snapshot: &ModifierSnapshot) -> bool {
    gates.iter().all(|g| g.is_satisfied(snapshot))
}

/// Held state of every logical modifier button for one frame.
///
/// Only physical buttons are stored; `Side::Either` is derived from the pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifierSnapshot {
    keys: [[bool; 2]; KEY_COUNT],
    mouse: [bool; MOUSE_BUTTONS as usize],
    buttons: [bool; DEVICE_BUTTONS as usize],
}

impl ModifierSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a button's state. Setting an `Either` key sets both sides.
    /// Out-of-range pointer/device buttons are ignored.
    pub fn set(&mut self, button: ModifierButton, held: bool) {
        match button {
            ModifierButton::Key(k, Side::Left) => self.keys[k.index()][0] = held,
            ModifierButton::Key(k, Side::Right) => self.keys[k.index()][1] = held,
            ModifierButton::Key(k, Side::Either) => self.keys[k.index()] = [held, held],
            ModifierButton::Mouse(n) => {
                if let Some(b) = slot(&mut self.mouse, n) {
                    *b = held;
                }
            }
            ModifierButton::Button(n) => {
                if let Some(b) = slot(&mut self.buttons, n) {
                    *b = held;
                }
            }
        }
    }

    /// Builder form of [`set`](Self::set) with `held = true`.
    pub fn with(mut self, button: ModifierButton) -> Self {
        self.set(button, true);
        self
    }

    pub fn is_held(&self, button: ModifierButton) -> bool {
        match button {
            ModifierButton::Key(k, Side::Left) => self.keys[k.index()][0],
            ModifierButton::Key(k, Side::Right) => self.keys[k.index()][1],
            ModifierButton::Key(k, Side::Either) => {
                let [l, r] = self.keys[k.index()];
                l || r
            }
            ModifierButton::Mouse(n) => n
                .checked_sub(1)
                .and_then(|i| self.mouse.get(i as usize))
                .copied()
                .unwrap_or(false),
            ModifierButton::Button(n) => n
                .checked_sub(1)
                .and_then(|i| self.buttons.get(i as usize))
                .copied()
                .unwrap_or(false),
        }
    }
}

fn slot(bank: &mut [bool], one_based: u8) -> Option<&mut bool> {
    one_based
        .checked_sub(1)
        .and_then(move |i| bank.get_mut(i as usize))
}
