//! Device registry.
//!
//! [`DeviceRegistry`] owns every [`InputSource`] and indexes them by display name.
//! It starts with exactly one source, the platform input manager, which is always
//! at index 0 and also answers to the empty name.
//!
//! HID enumeration is a one-shot action ([`DeviceRegistry::enumerate`]) that appends
//! opened devices under collision-free names (`"Foo"`, `"Foo #2"`, ...). A device
//! whose name matches a placeholder takes that placeholder's slot, so mappings saved
//! against it bind to the real device.
//!
//! Sources are never removed: a device that stops responding keeps its last values
//! until the user enumerates again in a later session.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::backends::hid::HidInputSource;
use crate::backends::hid_discovery::{probe_devices, ProbeRecord};
use crate::backends::HidBackend;
use crate::error::DeviceError;
use crate::metadata::friendly_name;
use crate::source::{InputSource, PlaceholderSource, PlatformAxisSource, PlatformInput, SourceKind};

pub struct DeviceRegistry {
    sources: Vec<Box<dyn InputSource>>,
    by_name: HashMap<String, usize>,
    // Sources whose poll failure has already been logged.
    failed: HashSet<String>,
    did_enumerate: bool,
}

impl DeviceRegistry {
    /// A registry holding only the platform source.
    pub fn new(platform: impl PlatformInput + 'static) -> Self {
        let mut registry = Self {
            sources: Vec::new(),
            by_name: HashMap::new(),
            failed: HashSet::new(),
            did_enumerate: false,
        };
        registry.push(Box::new(PlatformAxisSource::new(platform)));
        registry
    }

    pub fn platform(&self) -> &dyn InputSource {
        self.sources[0].as_ref()
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn InputSource> + '_ {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Look a source up by display name. The empty name is the platform source.
    pub fn get(&self, name: &str) -> Option<&dyn InputSource> {
        if name.is_empty() {
            return Some(self.platform());
        }
        self.by_name.get(name).map(|&i| self.sources[i].as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        name.is_empty() || self.by_name.contains_key(name)
    }

    pub fn has_enumerated(&self) -> bool {
        self.did_enumerate
    }

    /// `base`, or `base #2`, `base #3`, ... whichever is first unused.
    pub fn unique_name(&self, base: &str) -> String {
        self.free_name(base, |_| false)
    }

    /// Register a stand-in for a saved device that is not present.
    ///
    /// Returns `false` (and changes nothing) if a source with that name exists.
    pub fn add_placeholder<A, B>(&mut self, name: &str, axes: A, buttons: B) -> bool
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        if self.contains(name) {
            return false;
        }
        self.push(Box::new(PlaceholderSource::new(name, axes, buttons)));
        true
    }

    /// Discover HID devices through `backend` and register every one that opens.
    ///
    /// Runs once per registry; later calls return an empty report. Per-device
    /// failures are logged and recorded, never returned.
    ///
    /// # Errors
    /// Only if the backend cannot list devices. The registry is left unchanged and
    /// enumeration may be retried.
    pub fn enumerate(
        &mut self,
        backend: &mut dyn HidBackend,
    ) -> Result<Vec<ProbeRecord>, DeviceError> {
        if self.did_enumerate {
            return Ok(Vec::new());
        }
        let (devices, mut records) = probe_devices(backend)?;
        self.did_enumerate = true;

        let mut opened = 0usize;
        for probed in devices {
            // Placeholders may be taken over; anything else forces a suffix.
            let base = friendly_name(Some(probed.info.name.as_str())).to_string();
            let name = self.free_name(&base, |s| s.kind() == SourceKind::Placeholder);
            let source = HidInputSource::new(name.clone(), probed.info, probed.handle);

            match self.by_name.get(&name) {
                Some(&i) => {
                    info!(device = %name, "device connected; replacing placeholder");
                    self.sources[i] = Box::new(source);
                }
                None => {
                    info!(device = %name, "device registered");
                    self.push(Box::new(source));
                }
            }
            if let Some(record) = records.get_mut(probed.record) {
                record.registered_as = Some(name);
            }
            opened += 1;
        }

        info!(
            found = records.len(),
            opened,
            "HID enumeration finished"
        );
        Ok(records)
    }

    /// Update every source for this frame.
    ///
    /// A source that fails keeps its previous values; its first failure is logged
    /// at `warn`, repeats are not.
    pub fn poll_all(&mut self, elapsed: f32) {
        for source in &mut self.sources {
            if let Err(e) = source.update(elapsed) {
                if self.failed.insert(source.name().to_string()) {
                    warn!(device = %source.name(), error = %e, "input source stopped updating");
                }
            }
        }
    }

    fn push(&mut self, source: Box<dyn InputSource>) {
        self.by_name
            .insert(source.name().to_string(), self.sources.len());
        self.sources.push(source);
    }

    fn free_name(&self, base: &str, reusable: impl Fn(&dyn InputSource) -> bool) -> String {
        // The empty name is the platform source's alias.
        let taken = |name: &str| match self.by_name.get(name) {
            Some(&i) => !reusable(self.sources[i].as_ref()),
            None => name.is_empty(),
        };
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base} #{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}
