//! Mapping definitions and the per-frame evaluation pipeline.
//!
//! A [`MappingDefinition`] reads one axis of one input source and contributes a
//! scaled value to one [`OutputChannel`]. Evaluation runs, in order:
//!
//! 1. gate check (any unsatisfied modifier gate yields 0, nothing else happens)
//! 2. sample the axis (smoothed or current)
//! 3. relative mode: subtract the previous raw sample, then remember this one
//! 4. add the offset
//! 5. dead zone: `|v| < dead_zone` becomes 0
//! 6. multiply by speed and sign
//!
//! Sources are referenced by display name and resolved through the registry each
//! frame, so a mapping never holds on to a source.

use std::fmt;

use crate::modifier::{gates_pass, ModifierGate, ModifierSnapshot};
use crate::source::InputSource;

/// Speed given to newly added mappings.
pub const DEFAULT_SPEED: f32 = 100.0;

/// Camera control channel a mapping drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputChannel {
    /// Translate along the camera's left/right axis.
    MoveX,
    /// Translate up/down.
    MoveY,
    /// Translate along the camera's forward/backward axis.
    MoveZ,
    /// Translate along world north/south, ignoring camera heading.
    MoveNs,
    /// Translate along world east/west.
    MoveEw,
    Zoom,
    TurnX,
    TurnY,
}

impl OutputChannel {
    pub const COUNT: usize = 8;

    pub const ALL: [OutputChannel; Self::COUNT] = [
        OutputChannel::MoveX,
        OutputChannel::MoveY,
        OutputChannel::MoveZ,
        OutputChannel::MoveNs,
        OutputChannel::MoveEw,
        OutputChannel::Zoom,
        OutputChannel::TurnX,
        OutputChannel::TurnY,
    ];

    /// User-facing label; also the persisted name.
    pub fn name(self) -> &'static str {
        match self {
            OutputChannel::MoveX => "Move Left/Right",
            OutputChannel::MoveY => "Move Up/Down",
            OutputChannel::MoveZ => "Move Forward/Backward",
            OutputChannel::MoveNs => "Move North/South",
            OutputChannel::MoveEw => "Move East/West",
            OutputChannel::Zoom => "Zoom In/Out",
            OutputChannel::TurnX => "Turn Left/Right",
            OutputChannel::TurnY => "Turn Up/Down",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sign {
    #[default]
    Positive,
    Negative,
}

impl Sign {
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }

    /// Negative for any value below zero, positive otherwise.
    pub fn from_factor(v: f32) -> Self {
        if v < 0.0 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Sign::Positive => Sign::Negative,
            Sign::Negative => Sign::Positive,
        }
    }
}

/// One user-configured axis → output rule.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingDefinition {
    /// Source display name; empty means the platform source.
    pub source: String,
    pub axis: String,
    pub output: OutputChannel,
    pub speed: f32,
    pub sign: Sign,
    pub dead_zone: f32,
    pub offset: f32,
    pub smoothing: bool,
    pub relative: bool,
    pub modifiers: Vec<ModifierGate>,
    previous_sample: f32,
}

impl MappingDefinition {
    pub fn new(source: impl Into<String>, axis: impl Into<String>, output: OutputChannel) -> Self {
        Self {
            source: source.into(),
            axis: axis.into(),
            output,
            speed: DEFAULT_SPEED,
            sign: Sign::Positive,
            dead_zone: 0.0,
            offset: 0.0,
            smoothing: false,
            relative: false,
            modifiers: Vec::new(),
            previous_sample: 0.0,
        }
    }

    /// Label shown for this mapping in lists.
    pub fn display_name(&self) -> &'static str {
        self.output.name()
    }

    /// Raw sample remembered by relative mode.
    pub fn previous_sample(&self) -> f32 {
        self.previous_sample
    }

    /// Forget the remembered sample, e.g. after the source was rebound.
    pub fn reset(&mut self) {
        self.previous_sample = 0.0;
    }

    /// Run the pipeline for this frame.
    ///
    /// `source` must already have been updated this frame. An axis the source does
    /// not have samples as 0. When a gate fails the remembered relative sample is
    /// left untouched, so the first gated-on frame measures its delta against the
    /// last sample taken while the gates held.
    pub fn evaluate(&mut self, source: &dyn InputSource, modifiers: &ModifierSnapshot) -> f32 {
        if !gates_pass(&self.modifiers, modifiers) {
            return 0.0;
        }

        let sample = source
            .axis(&self.axis)
            .map_or(0.0, |a| a.value(self.smoothing));

        let mut value = sample;
        if self.relative {
            value -= self.previous_sample;
            self.previous_sample = sample;
        }

        value += self.offset;
        if value.abs() < self.dead_zone {
            value = 0.0;
        }

        value * self.speed * self.sign.factor()
    }
}
