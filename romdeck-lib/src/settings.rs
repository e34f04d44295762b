//! Library configuration.
//!
//! Everything the pipeline needs to know about its surroundings lives in one
//! explicit `LibraryConfig` value passed into the library at construction,
//! not process-wide mutable settings. The file format is TOML at
//! `~/.config/romdeck/settings.toml`, with every field defaulted so a missing
//! file still yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the library pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Path to the systems definition document.
    #[serde(default = "default_systems_path")]
    pub systems_path: PathBuf,

    /// Directory holding the global placeholder image and per-platform logos
    /// (`logos/<platform-id>.png`).
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,

    /// URL prefix under which media is served; references already carrying
    /// it pass through resolution unchanged.
    #[serde(default = "default_media_prefix")]
    pub media_prefix: String,

    /// Extension set used when a system declares none.
    #[serde(default = "default_extensions")]
    pub default_extensions: Vec<String>,

    /// Flags substituted for the controller-configuration placeholder in
    /// launch command templates.
    #[serde(default)]
    pub controllers_config: String,

    /// Check that path-like emulator executables exist before planning a
    /// launch. Bare program names are left to the OS PATH lookup.
    #[serde(default)]
    pub validate_executables: bool,

    /// Catalog cache time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_systems_path() -> PathBuf {
    config_dir().join("systems.cfg")
}

fn default_resources_dir() -> PathBuf {
    config_dir().join("resources")
}

fn default_media_prefix() -> String {
    "/media/".to_string()
}

fn default_extensions() -> Vec<String> {
    vec![".zip".to_string(), ".7z".to_string()]
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("romdeck")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            systems_path: default_systems_path(),
            resources_dir: default_resources_dir(),
            media_prefix: default_media_prefix(),
            default_extensions: default_extensions(),
            controllers_config: String::new(),
            validate_executables: false,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl LibraryConfig {
    /// Load configuration from a TOML file. A missing file yields defaults;
    /// a present-but-unparseable file is an I/O-level error the caller sees.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(std::io::Error::other)
    }

    /// Canonical settings file location: `~/.config/romdeck/settings.toml`.
    pub fn settings_path() -> PathBuf {
        config_dir().join("settings.toml")
    }

    /// The single global fallback image.
    pub fn placeholder_path(&self) -> PathBuf {
        self.resources_dir.join("placeholder.png")
    }

    /// Per-platform logo asset.
    pub fn logo_path(&self, platform_id: &str) -> PathBuf {
        self.resources_dir.join("logos").join(format!("{platform_id}.png"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = LibraryConfig::default();
        assert!(!cfg.default_extensions.is_empty());
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
        assert!(cfg.media_prefix.starts_with('/'));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: LibraryConfig = toml::from_str(
            r#"
systems_path = "/etc/romdeck/systems.cfg"
validate_executables = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.systems_path, PathBuf::from("/etc/romdeck/systems.cfg"));
        assert!(cfg.validate_executables);
        assert_eq!(cfg.cache_ttl_secs, 300);
        assert_eq!(cfg.media_prefix, "/media/");
    }

    #[test]
    fn logo_path_uses_platform_id() {
        let cfg = LibraryConfig {
            resources_dir: PathBuf::from("/res"),
            ..Default::default()
        };
        assert_eq!(cfg.logo_path("snes"), PathBuf::from("/res/logos/snes.png"));
        assert_eq!(cfg.placeholder_path(), PathBuf::from("/res/placeholder.png"));
    }
}
