//! Media-asset reference resolution.
//!
//! Gamelist documents reference artwork in several forms: full URLs,
//! already-servable prefixed paths, absolute filesystem paths, and paths
//! relative to the platform's ROM directory. This module normalizes all of
//! them and, for the two primary art kinds, probes a ranked set of fallback
//! locations so the caller always gets something to display.

use std::path::{Path, PathBuf};

use romdeck_core::platform::Platform;

use crate::settings::LibraryConfig;

/// Asset categories a game record can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Thumbnail,
    Video,
    Marquee,
    Fanart,
    Mix,
}

impl MediaKind {
    /// Only the primary art kinds go through the probe-fallback chain.
    fn probes(self) -> bool {
        matches!(self, Self::Image | Self::Thumbnail)
    }
}

/// Probe subdirectories inside the platform directory, best first:
/// curated artwork, then captured artwork, then screenshots.
const PROBE_SUBDIRS: &[&str] = &["images", "boxart", "screenshots"];
const PROBE_EXTENSIONS: &[&str] = &["png", "jpg"];

/// A resolved media reference. `existed` and `used_fallback` are
/// diagnostics - a missing asset never fails resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub servable: String,
    pub existed: bool,
    pub used_fallback: bool,
}

/// Resolve a raw asset reference for a game.
///
/// `stem` is the game's file stem, used for probe candidates. Returns `None`
/// only for non-probing kinds with no authored reference.
pub fn resolve(
    raw: Option<&str>,
    platform: &Platform,
    stem: &str,
    kind: MediaKind,
    cfg: &LibraryConfig,
) -> Option<ResolvedMedia> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());

    if let Some(reference) = raw {
        if is_passthrough(reference, cfg) {
            return Some(ResolvedMedia {
                servable: reference.to_string(),
                existed: true,
                used_fallback: false,
            });
        }

        let candidate = primary_candidate(reference, platform);
        if candidate.is_file() {
            return Some(ResolvedMedia {
                servable: candidate.to_string_lossy().into_owned(),
                existed: true,
                used_fallback: false,
            });
        }
        if !kind.probes() {
            return Some(ResolvedMedia {
                servable: candidate.to_string_lossy().into_owned(),
                existed: false,
                used_fallback: false,
            });
        }
        return Some(probe_fallbacks(platform, stem, cfg));
    }

    if kind.probes() {
        return Some(probe_fallbacks(platform, stem, cfg));
    }
    None
}

/// URL and already-servable forms pass through unchanged.
fn is_passthrough(reference: &str, cfg: &LibraryConfig) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with(cfg.media_prefix.as_str())
}

/// Absolute paths as-is; relative paths joined to the ROM directory after
/// stripping a leading `./`.
fn primary_candidate(reference: &str, platform: &Platform) -> PathBuf {
    let path = Path::new(reference);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let trimmed = reference.strip_prefix("./").unwrap_or(reference);
    platform.rom_directory.join(trimmed)
}

/// Walk the fixed fallback ranking: probe subdirectories, then the platform
/// logo, then the global placeholder. The ordering is a deliberate ranking
/// and must not be reordered.
fn probe_fallbacks(platform: &Platform, stem: &str, cfg: &LibraryConfig) -> ResolvedMedia {
    for subdir in PROBE_SUBDIRS {
        for ext in PROBE_EXTENSIONS {
            let candidate = platform
                .rom_directory
                .join(subdir)
                .join(format!("{stem}.{ext}"));
            if candidate.is_file() {
                return ResolvedMedia {
                    servable: candidate.to_string_lossy().into_owned(),
                    existed: true,
                    used_fallback: true,
                };
            }
        }
    }

    let logo = cfg.logo_path(&platform.id);
    if logo.is_file() {
        return ResolvedMedia {
            servable: logo.to_string_lossy().into_owned(),
            existed: true,
            used_fallback: true,
        };
    }

    let placeholder = cfg.placeholder_path();
    ResolvedMedia {
        existed: placeholder.is_file(),
        servable: placeholder.to_string_lossy().into_owned(),
        used_fallback: true,
    }
}
