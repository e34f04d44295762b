//! The canonical catalog entry produced by reconciliation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One game in the catalog - exactly one per ROM file on disk.
///
/// Descriptive fields come from the gamelist sidecar when a matching entry
/// exists; otherwise they carry defaults derived from the file name. Asset
/// fields are already resolved to servable references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    /// `{platform_id}-{local_key}`, stable across reconciliation runs for
    /// the same file/metadata pairing.
    pub id: String,
    pub platform_id: String,
    /// File name including extension.
    pub file_name: String,
    pub absolute_path: PathBuf,
    /// Extension without the leading dot, lowercase.
    pub extension: String,
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub players: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub marquee: Option<String>,
    #[serde(default)]
    pub fanart: Option<String>,
    #[serde(default)]
    pub mix: Option<String>,
}

impl Game {
    /// File name without extension, used for media probing and name matching.
    pub fn file_stem(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}
