//! Platform (emulated system) definitions.
//!
//! A `Platform` is an immutable value object produced by the systems-config
//! loader. It is replaced wholesale on refresh, never mutated in place.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One emulated system/console, as declared in the systems config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// Stable slug derived from the declared name (unique across the registry).
    pub id: String,
    /// Declared name, used for display. Never derived from the fallback id.
    pub display_name: String,
    /// Absolute path to the directory holding this platform's ROM files.
    pub rom_directory: PathBuf,
    /// Normalized extensions: lowercase, dot-prefixed. Never empty.
    pub supported_extensions: BTreeSet<String>,
    /// Raw launch command template. Placeholder substitution happens at
    /// planning time, not here.
    pub command_template: Option<String>,
    /// Emulators declared for this platform, in declaration order.
    pub emulators: Vec<Emulator>,
    /// Theme slug for the surrounding UI.
    pub theme: Option<String>,
}

impl Platform {
    /// Case-insensitive extension membership test. Accepts values with or
    /// without a leading dot.
    pub fn supports_extension(&self, ext: &str) -> bool {
        let normalized = crate::util::normalize_extension(ext);
        self.supported_extensions.contains(&normalized)
    }

    /// Find a declared emulator by name (case-insensitive).
    pub fn emulator(&self, name: &str) -> Option<&Emulator> {
        self.emulators
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

/// An emulator declared for a platform, holding an ordered core list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Emulator {
    pub name: String,
    pub cores: Vec<EmulatorCore>,
}

impl Emulator {
    /// The core this emulator runs when none is requested: the first core
    /// flagged default, else the first listed core.
    pub fn default_core(&self) -> Option<&EmulatorCore> {
        self.cores
            .iter()
            .find(|c| c.is_default)
            .or_else(|| self.cores.first())
    }

    /// Find a core by name (case-insensitive).
    pub fn core(&self, name: &str) -> Option<&EmulatorCore> {
        self.cores
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A single emulator core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorCore {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}
