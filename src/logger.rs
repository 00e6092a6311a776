//! Logging setup and the debug display sink.
//!
//! The crate only emits `tracing` events; hosts that already run a subscriber
//! need nothing from this module. [`init`] installs a plain fmt subscriber for
//! hosts and demos that have none.

use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use crate::frame::{ChannelTotals, OutputSink};

/// Install a global fmt subscriber logging at `level` and above.
///
/// # Errors
/// If a global subscriber is already installed.
pub fn init(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

/// [`OutputSink`] wrapper that logs the non-zero totals of every frame before
/// forwarding them. Enabled by the `show_debug` setting.
pub struct DebugDisplaySink<S> {
    inner: S,
    enabled: bool,
}

impl<S: OutputSink> DebugDisplaySink<S> {
    pub fn new(inner: S, enabled: bool) -> Self {
        Self { inner, enabled }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: OutputSink> OutputSink for DebugDisplaySink<S> {
    fn on_frame(&mut self, totals: &ChannelTotals) {
        if self.enabled && !totals.is_zero() {
            let line = totals
                .iter()
                .filter(|(_, v)| *v != 0.0)
                .map(|(channel, v)| format!("{channel}={v:.2}"))
                .collect::<Vec<_>>()
                .join(" ");
            debug!(target: "stickcam::frame", "{line}");
        }
        self.inner.on_frame(totals);
    }
}
