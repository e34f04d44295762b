use std::path::PathBuf;

use thiserror::Error;

/// Errors loading or parsing the systems configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The systems config file does not exist. Callers must surface this;
    /// it is never silently treated as an empty registry.
    #[error("Systems config not found: {0}")]
    Missing(PathBuf),

    /// The document exists but its root structure is unusable.
    #[error("Malformed systems config: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
}

impl ConfigError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Errors reading or writing a gamelist sidecar document.
///
/// Read-side failures are recovered locally (the catalog degrades to no
/// metadata); write-back failures surface to the caller.
#[derive(Debug, Error)]
pub enum GamelistError {
    #[error("Malformed gamelist: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
}

impl GamelistError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Failure kinds when building a launch plan.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Platform not found: {0}")]
    PlatformNotFound(String),

    #[error("ROM directory not found: {0}")]
    RomDirectoryMissing(PathBuf),

    #[error("ROM file not found: {0}")]
    RomMissing(PathBuf),

    #[error("Platform '{0}' has no launch command configured")]
    NoCommandTemplate(String),

    #[error("Emulator executable not found: {0}")]
    ExecutableMissing(String),
}

/// Failures spawning or tracking a launched process. Recorded in the
/// per-game status rather than thrown past the runner.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the caller-facing library surface.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Platform not found: {0}")]
    PlatformNotFound(String),

    #[error("Game not found: {platform_id}/{game_id}")]
    GameNotFound {
        platform_id: String,
        game_id: String,
    },

    #[error("ROM directory not found: {0}")]
    RomDirectoryMissing(PathBuf),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Gamelist(#[from] GamelistError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
