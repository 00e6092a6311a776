//! Per-channel input state cells.
//!
//! Every [`InputSource`](crate::source::InputSource) keeps one [`AxisState`] per axis
//! and one [`ButtonState`] per button. The cells are written only by their owning
//! source during its per-frame update and read by the mapping pipeline afterwards.

/// Rate at which [`AxisState::smoothed`] approaches the current value, in units per second.
pub const SMOOTHING_RATE: f32 = 1.0;

/// Current/previous value of one axis plus a rate-limited smoothed value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisState {
    current: f32,
    previous: f32,
    smoothed: f32,
}

impl AxisState {
    /// Store a new sample taken `elapsed` seconds after the previous one.
    ///
    /// `smoothed` moves toward the new value by at most `SMOOTHING_RATE * elapsed`,
    /// starting from its own last value rather than from the last raw sample.
    pub fn set(&mut self, value: f32, elapsed: f32) {
        self.previous = self.current;
        self.current = value;
        let step = SMOOTHING_RATE * elapsed.max(0.0);
        self.smoothed = move_towards(self.smoothed, value, step);
    }

    /// Force every field to `value` (used to put a cell into a known resting state).
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.previous = value;
        self.smoothed = value;
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn previous(&self) -> f32 {
        self.previous
    }

    #[inline]
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    /// The value a mapping samples: smoothed or raw.
    #[inline]
    pub fn value(&self, smooth: bool) -> f32 {
        if smooth {
            self.smoothed
        } else {
            self.current
        }
    }
}

/// Current/previous state of one button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    current: bool,
    previous: bool,
}

impl ButtonState {
    pub fn set(&mut self, pressed: bool) {
        self.previous = self.current;
        self.current = pressed;
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.current
    }

    #[inline]
    pub fn was_pressed(&self) -> bool {
        self.previous
    }

    /// Pressed this update, released the one before.
    #[inline]
    pub fn just_pressed(&self) -> bool {
        self.current && !self.previous
    }

    #[inline]
    pub fn just_released(&self) -> bool {
        !self.current && self.previous
    }
}

/// Move `from` toward `to` by at most `max_step`, never overshooting.
fn move_towards(from: f32, to: f32, max_step: f32) -> f32 {
    let delta = to - from;
    if delta.abs() <= max_step {
        to
    } else {
        from + delta.signum() * max_step
    }
}
