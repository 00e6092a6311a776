//! Profile: the loaded settings bound to a registry.
//!
//! Loading a profile:
//! - registers a placeholder for every saved device that is not connected, so its
//!   mappings keep resolving;
//! - turns the saved records into [`MappingDefinition`]s, dropping bad ones;
//! - on first run (no file) installs the default mappings and saves right away.
//!
//! Saving writes back every non-platform source as a [`KnownDevice`] together with
//! the current mapping list.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::{ConfigStore, KnownDevice, Settings};
use crate::error::ConfigError;
use crate::mapping::{MappingDefinition, OutputChannel};
use crate::registry::DeviceRegistry;
use crate::source::{InputSource, SourceKind};

/// Platform axis → output pairs installed on first run.
pub const DEFAULT_MAPPINGS: [(&str, OutputChannel); 5] = [
    ("Horizontal", OutputChannel::MoveX),
    ("Vertical", OutputChannel::MoveZ),
    ("RotationHorizontalCamera", OutputChannel::TurnX),
    ("RotationVerticalCamera", OutputChannel::TurnY),
    ("ZoomCamera", OutputChannel::Zoom),
];

pub fn default_mappings() -> Vec<MappingDefinition> {
    DEFAULT_MAPPINGS
        .iter()
        .map(|&(axis, output)| MappingDefinition::new("", axis, output))
        .collect()
}

/// Capability records for every device source (connected or placeholder).
pub fn known_devices(registry: &DeviceRegistry) -> Vec<KnownDevice> {
    registry
        .sources()
        .filter(|s| s.kind() != SourceKind::Platform)
        .map(|s| KnownDevice {
            name: s.name().to_string(),
            axes: s.axis_names().into_iter().map(str::to_owned).collect(),
            buttons: s.button_names().into_iter().map(str::to_owned).collect(),
        })
        .collect()
}

pub struct Profile {
    store: ConfigStore,
    settings: Settings,
    mappings: Vec<MappingDefinition>,
}

impl Profile {
    /// Load from `store` and bind to `registry`.
    ///
    /// # Errors
    /// If the file exists but cannot be read or parsed, or if the first-run save
    /// fails. Individual bad records are never errors.
    pub fn load(store: ConfigStore, registry: &mut DeviceRegistry) -> Result<Self, ConfigError> {
        match store.load()? {
            Some(settings) => {
                register_placeholders(&settings, registry);
                let mappings = settings.mappings(registry);
                info!(
                    path = %store.path().display(),
                    mappings = mappings.len(),
                    "profile loaded"
                );
                Ok(Self {
                    store,
                    settings,
                    mappings,
                })
            }
            None => {
                info!(path = %store.path().display(), "no config; installing default mappings");
                let mut profile = Self {
                    store,
                    settings: Settings::default(),
                    mappings: default_mappings(),
                };
                profile.save(registry)?;
                Ok(profile)
            }
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Whether the host should enumerate USB devices at startup.
    pub fn wants_usb_devices(&self) -> bool {
        self.settings.enable_usb_devices
    }

    pub fn mappings(&self) -> &[MappingDefinition] {
        &self.mappings
    }

    pub fn mappings_mut(&mut self) -> &mut [MappingDefinition] {
        &mut self.mappings
    }

    pub fn mapping_mut(&mut self, index: usize) -> Option<&mut MappingDefinition> {
        self.mappings.get_mut(index)
    }

    /// Append a mapping on the platform source's first axis driving
    /// [`OutputChannel::MoveX`]. Returns its index.
    pub fn add_mapping(&mut self, registry: &DeviceRegistry) -> usize {
        let axis = registry
            .platform()
            .axis_names()
            .first()
            .map(|a| a.to_string())
            .unwrap_or_default();
        self.mappings
            .push(MappingDefinition::new("", axis, OutputChannel::MoveX));
        self.mappings.len() - 1
    }

    /// Remove and return the mapping at `index`; later mappings shift down.
    pub fn remove_mapping(&mut self, index: usize) -> Option<MappingDefinition> {
        (index < self.mappings.len()).then(|| self.mappings.remove(index))
    }

    /// Write settings, known devices and mappings back to the store.
    pub fn save(&mut self, registry: &DeviceRegistry) -> Result<(), ConfigError> {
        self.settings.devices = known_devices(registry);
        self.settings.set_mappings(&self.mappings);
        self.store.save(&self.settings)
    }
}

/// Placeholders from the saved device list, then for any mapping source still
/// unknown (built from the axes its mappings use).
fn register_placeholders(settings: &Settings, registry: &mut DeviceRegistry) {
    for dev in &settings.devices {
        if dev.name.is_empty() {
            continue;
        }
        registry.add_placeholder(&dev.name, dev.axes.iter().cloned(), dev.buttons.iter().cloned());
    }

    let mut orphans: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for rec in &settings.inputs {
        if registry.contains(&rec.device) {
            continue;
        }
        let axes = orphans.entry(rec.device.as_str()).or_default();
        if !axes.contains(&rec.axis) {
            axes.push(rec.axis.clone());
        }
    }
    for (name, axes) in orphans {
        warn!(device = %name, "mapping refers to an unknown device; adding placeholder");
        registry.add_placeholder(name, axes, std::iter::empty::<String>());
    }
}
