//! Per-frame driver.
//!
//! Once per rendered frame the host calls [`FrameDriver::run_frame`], which:
//! 1. updates every registered source ([`DeviceRegistry::poll_all`]);
//! 2. evaluates every mapping against the frame's modifier snapshot;
//! 3. sums contributions per [`OutputChannel`], each scaled by `elapsed * 60`;
//! 4. hands the totals to the [`OutputSink`].
//!
//! Totals are rebuilt from zero every frame. Speeds are tuned against a 60 fps
//! baseline, so the same stick deflection moves the camera equally fast at any
//! frame rate.

use std::ops::{Index, IndexMut};

use crate::mapping::{MappingDefinition, OutputChannel};
use crate::modifier::ModifierSnapshot;
use crate::registry::DeviceRegistry;

/// Frame rate the mapping speeds are expressed against.
pub const BASELINE_FPS: f32 = 60.0;

/// Summed contributions for one frame, one value per output channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelTotals([f32; OutputChannel::COUNT]);

impl ChannelTotals {
    pub fn iter(&self) -> impl Iterator<Item = (OutputChannel, f32)> + '_ {
        OutputChannel::ALL.into_iter().zip(self.0.iter().copied())
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl Index<OutputChannel> for ChannelTotals {
    type Output = f32;

    fn index(&self, channel: OutputChannel) -> &f32 {
        &self.0[channel.index()]
    }
}

impl IndexMut<OutputChannel> for ChannelTotals {
    fn index_mut(&mut self, channel: OutputChannel) -> &mut f32 {
        &mut self.0[channel.index()]
    }
}

/// Receives the aggregated channel values once per frame (camera transform, UI, ...).
pub trait OutputSink {
    fn on_frame(&mut self, totals: &ChannelTotals);
}

impl<F: FnMut(&ChannelTotals)> OutputSink for F {
    fn on_frame(&mut self, totals: &ChannelTotals) {
        self(totals)
    }
}

/// Evaluate every mapping against already-updated sources.
///
/// A mapping whose source is not registered contributes nothing.
pub fn accumulate(
    registry: &DeviceRegistry,
    mappings: &mut [MappingDefinition],
    modifiers: &ModifierSnapshot,
    elapsed: f32,
) -> ChannelTotals {
    let scale = elapsed * BASELINE_FPS;
    let mut totals = ChannelTotals::default();
    for mapping in mappings.iter_mut() {
        let Some(source) = registry.get(&mapping.source) else {
            continue;
        };
        totals[mapping.output] += mapping.evaluate(source, modifiers) * scale;
    }
    totals
}

/// Drives one [`OutputSink`] from a registry and a mapping list.
pub struct FrameDriver<S> {
    sink: S,
    last: ChannelTotals,
}

impl<S: OutputSink> FrameDriver<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last: ChannelTotals::default(),
        }
    }

    /// Run one frame. Never fails: sources that cannot be read keep their last values.
    pub fn run_frame(
        &mut self,
        registry: &mut DeviceRegistry,
        mappings: &mut [MappingDefinition],
        modifiers: &ModifierSnapshot,
        elapsed: f32,
    ) -> &ChannelTotals {
        registry.poll_all(elapsed);
        self.last = accumulate(registry, mappings, modifiers, elapsed);
        self.sink.on_frame(&self.last);
        &self.last
    }

    /// Totals produced by the most recent frame.
    pub fn last_totals(&self) -> &ChannelTotals {
        &self.last
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
