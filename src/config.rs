//! Persisted settings.
//!
//! [`Settings`] is the whole on-disk record: a few process-wide flags, the devices
//! seen in earlier sessions ([`KnownDevice`]) and the mapping list
//! ([`MappingRecord`]). Enum-valued fields are stored by name and validated when
//! records are turned back into [`MappingDefinition`]s. A record with a bad name
//! is dropped on its own; the rest of the file still loads.
//!
//! [`ConfigStore`] reads and writes the file: `.json` paths use JSON, anything
//! else TOML.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::mapping::{MappingDefinition, OutputChannel, Sign, DEFAULT_SPEED};
use crate::modifier::{ModifierButton, ModifierCondition, ModifierGate};
use crate::registry::DeviceRegistry;

pub const FORMAT: u32 = 1;
pub const VERSION: u32 = 1;

/// Process-wide settings record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub format: u32,
    pub version: u32,
    /// Log non-zero channel totals every frame.
    pub show_debug: bool,
    /// Enumerate USB HID devices at startup.
    pub enable_usb_devices: bool,
    pub restrict_rotation: bool,
    pub height_scale: f32,
    pub devices: Vec<KnownDevice>,
    pub inputs: Vec<MappingRecord>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: FORMAT,
            version: VERSION,
            show_debug: false,
            enable_usb_devices: false,
            restrict_rotation: false,
            height_scale: 1.0,
            devices: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

/// A device's capabilities as last seen, used to rebuild a placeholder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnownDevice {
    pub name: String,
    pub axes: Vec<String>,
    pub buttons: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierRecord {
    pub button: String,
    pub condition: String,
}

impl ModifierRecord {
    pub fn from_gate(gate: &ModifierGate) -> Self {
        Self {
            button: gate.button.name(),
            condition: gate.condition.name().to_string(),
        }
    }

    pub fn to_gate(&self) -> Result<ModifierGate, ConfigError> {
        let button = ModifierButton::from_name(&self.button)
            .ok_or_else(|| ConfigError::UnknownButton(self.button.clone()))?;
        let condition = ModifierCondition::from_name(&self.condition)
            .ok_or_else(|| ConfigError::UnknownCondition(self.condition.clone()))?;
        Ok(ModifierGate::new(button, condition))
    }
}

/// One persisted mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingRecord {
    /// Output label, e.g. `"Zoom In/Out"`.
    pub output: String,
    /// Source display name; empty for the platform source.
    pub device: String,
    pub axis: String,
    pub speed: f32,
    pub sign: f32,
    pub dead_zone: f32,
    pub offset: f32,
    pub smoothing: bool,
    pub relative: bool,
    pub modifiers: Vec<ModifierRecord>,
}

impl Default for MappingRecord {
    fn default() -> Self {
        Self {
            output: String::new(),
            device: String::new(),
            axis: String::new(),
            speed: DEFAULT_SPEED,
            sign: 1.0,
            dead_zone: 0.0,
            offset: 0.0,
            smoothing: false,
            relative: false,
            modifiers: Vec::new(),
        }
    }
}

impl MappingRecord {
    pub fn from_definition(def: &MappingDefinition) -> Self {
        Self {
            output: def.output.name().to_string(),
            device: def.source.clone(),
            axis: def.axis.clone(),
            speed: def.speed,
            sign: def.sign.factor(),
            dead_zone: def.dead_zone,
            offset: def.offset,
            smoothing: def.smoothing,
            relative: def.relative,
            modifiers: def.modifiers.iter().map(ModifierRecord::from_gate).collect(),
        }
    }

    /// Validate against `registry` and build the definition.
    ///
    /// The output name and the axis must be valid, or the whole record is rejected.
    /// An axis is only checked when its source is registered. A bad modifier drops
    /// just that modifier, with a warning.
    pub fn to_definition(&self, registry: &DeviceRegistry) -> Result<MappingDefinition, ConfigError> {
        let output = OutputChannel::from_name(&self.output)
            .ok_or_else(|| ConfigError::UnknownOutput(self.output.clone()))?;

        if let Some(source) = registry.get(&self.device) {
            if source.axis(&self.axis).is_none() {
                return Err(ConfigError::UnknownAxis {
                    source_name: source.name().to_string(),
                    axis: self.axis.clone(),
                });
            }
        }

        let mut def = MappingDefinition::new(self.device.clone(), self.axis.clone(), output);
        def.speed = self.speed;
        def.sign = Sign::from_factor(self.sign);
        def.dead_zone = self.dead_zone.max(0.0);
        def.offset = self.offset;
        def.smoothing = self.smoothing;
        def.relative = self.relative;
        for m in &self.modifiers {
            match m.to_gate() {
                Ok(gate) => def.modifiers.push(gate),
                Err(e) => warn!(output = %self.output, error = %e, "dropping modifier"),
            }
        }
        Ok(def)
    }
}

impl Settings {
    /// Build every valid mapping, in file order. Invalid records are logged and skipped.
    pub fn mappings(&self, registry: &DeviceRegistry) -> Vec<MappingDefinition> {
        self.inputs
            .iter()
            .filter_map(|record| match record.to_definition(registry) {
                Ok(def) => Some(def),
                Err(e) => {
                    warn!(error = %e, "dropping mapping");
                    None
                }
            })
            .collect()
    }

    pub fn set_mappings(&mut self, mappings: &[MappingDefinition]) {
        self.inputs = mappings.iter().map(MappingRecord::from_definition).collect();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

/// Loads and saves [`Settings`] at one path.
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> FileFormat {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }

    /// Read the settings file. A missing file is `Ok(None)` (first run).
    pub fn load(&self) -> Result<Option<Settings>, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = match self.format() {
            FileFormat::Json => serde_json::from_str(&text)?,
            FileFormat::Toml => toml::from_str(&text)?,
        };
        if settings.format > FORMAT {
            warn!(
                path = %self.path.display(),
                format = settings.format,
                supported = FORMAT,
                "config written by a newer version; unknown fields are ignored"
            );
        }
        debug!(
            path = %self.path.display(),
            mappings = settings.inputs.len(),
            devices = settings.devices.len(),
            "config loaded"
        );
        Ok(Some(settings))
    }

    /// Write the settings file, creating parent directories as needed.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let text = match self.format() {
            FileFormat::Json => serde_json::to_string_pretty(settings)?,
            FileFormat::Toml => toml::to_string_pretty(settings)?,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}
