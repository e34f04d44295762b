//! Catalog reconciliation.
//!
//! Merges a platform's on-disk ROM listing with its gamelist sidecar into
//! the canonical game catalog. The filesystem is the source of truth for
//! existence: every matching file yields exactly one game, and metadata
//! entries whose file is gone are dropped.

use std::path::{Path, PathBuf};

use romdeck_core::game::Game;
use romdeck_core::platform::Platform;

use crate::error::LibraryError;
use crate::gamelist::{self, GameEntry};
use crate::media::{self, MediaKind};
use crate::settings::LibraryConfig;

/// How a file was paired with its metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    /// The entry's external identifier equals the file's positional key.
    ExternalId,
    /// The authored path's file name equals the ROM file name.
    FileName,
    /// The entry name equals the ROM file stem (case-insensitive).
    BaseName,
}

/// Build the catalog for one platform.
///
/// Two runs over unchanged inputs produce the identical id↔file mapping:
/// the file set is sorted by name before positional keys are assigned, so
/// OS directory-listing order never leaks into ids.
pub fn build_catalog(platform: &Platform, cfg: &LibraryConfig) -> Result<Vec<Game>, LibraryError> {
    if !platform.rom_directory.is_dir() {
        return Err(LibraryError::RomDirectoryMissing(
            platform.rom_directory.clone(),
        ));
    }

    let files = scan_rom_files(platform)?;
    let entries = load_entries(&platform.rom_directory);

    let mut games = Vec::with_capacity(files.len());
    for (index, (file_name, path)) in files.iter().enumerate() {
        let positional_key = index.to_string();
        let matched = find_entry(&entries, file_name, &positional_key);

        let local_key = match matched {
            Some((entry, MatchMethod::ExternalId)) => entry
                .external_id
                .clone()
                .unwrap_or_else(|| positional_key.clone()),
            _ => positional_key,
        };

        games.push(build_game(
            platform,
            file_name,
            path,
            &local_key,
            matched.map(|(entry, _)| entry),
            cfg,
        ));
    }

    Ok(games)
}

/// List the platform's ROM files: plain files whose extension is supported,
/// sorted by file name.
fn scan_rom_files(platform: &Platform) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&platform.rom_directory)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !platform.supports_extension(ext) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Read the sidecar. Absence is normal; a parse failure degrades to no
/// metadata so the catalog still reflects the filesystem.
fn load_entries(rom_directory: &Path) -> Vec<GameEntry> {
    let path = rom_directory.join(gamelist::GAMELIST_FILE);
    if !path.exists() {
        return Vec::new();
    }
    match gamelist::read_gamelist(&path) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Unreadable gamelist {}: {e} - continuing without metadata", path.display());
            Vec::new()
        }
    }
}

/// Find the metadata entry for a file. Strict priority order, first hit
/// wins: external id against the positional key, authored file name
/// (exact, then case-insensitive), entry name against the file stem.
fn find_entry<'a>(
    entries: &'a [GameEntry],
    file_name: &str,
    positional_key: &str,
) -> Option<(&'a GameEntry, MatchMethod)> {
    if let Some(entry) = entries.iter().find(|e| {
        e.external_id
            .as_deref()
            .is_some_and(|id| id == positional_key && id.bytes().all(|b| b.is_ascii_digit()))
    }) {
        return Some((entry, MatchMethod::ExternalId));
    }

    if let Some(entry) = entries
        .iter()
        .find(|e| e.file_name().is_some_and(|f| f == file_name))
        .or_else(|| {
            entries
                .iter()
                .find(|e| e.file_name().is_some_and(|f| f.eq_ignore_ascii_case(file_name)))
        })
    {
        return Some((entry, MatchMethod::FileName));
    }

    let stem = file_stem(file_name);
    if let Some(entry) = entries
        .iter()
        .find(|e| e.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(stem)))
    {
        return Some((entry, MatchMethod::BaseName));
    }

    None
}

fn file_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}

fn build_game(
    platform: &Platform,
    file_name: &str,
    path: &Path,
    local_key: &str,
    entry: Option<&GameEntry>,
    cfg: &LibraryConfig,
) -> Game {
    let stem = file_stem(file_name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let name = entry
        .and_then(|e| e.name.clone())
        .unwrap_or_else(|| stem.to_string());
    let description = entry
        .and_then(|e| e.description.clone())
        .unwrap_or_else(|| format!("{name} ({})", platform.display_name));

    let resolve = |raw: Option<&str>, kind| {
        media::resolve(raw, platform, stem, kind, cfg).map(|r| r.servable)
    };

    Game {
        id: format!("{}-{}", platform.id, local_key),
        platform_id: platform.id.clone(),
        file_name: file_name.to_string(),
        absolute_path: path.to_path_buf(),
        extension,
        name,
        description,
        developer: entry.and_then(|e| e.developer.clone()),
        publisher: entry.and_then(|e| e.publisher.clone()),
        genre: entry.and_then(|e| e.genre.clone()),
        players: entry.and_then(|e| e.players.clone()),
        rating: entry.and_then(|e| e.rating),
        release_date: entry.and_then(|e| e.release_date.clone()),
        region: entry.and_then(|e| e.region.clone()),
        lang: entry.and_then(|e| e.lang.clone()),
        play_count: entry.and_then(|e| e.play_count).unwrap_or(0),
        last_played: entry.and_then(|e| e.last_played.clone()),
        favorite: entry.and_then(|e| e.favorite).unwrap_or(false),
        hidden: entry.and_then(|e| e.hidden).unwrap_or(false),
        image: resolve(entry.and_then(|e| e.image.as_deref()), MediaKind::Image),
        thumbnail: resolve(
            entry.and_then(|e| e.thumbnail.as_deref()),
            MediaKind::Thumbnail,
        ),
        video: resolve(entry.and_then(|e| e.video.as_deref()), MediaKind::Video),
        marquee: resolve(entry.and_then(|e| e.marquee.as_deref()), MediaKind::Marquee),
        fanart: resolve(entry.and_then(|e| e.fanart.as_deref()), MediaKind::Fanart),
        mix: resolve(entry.and_then(|e| e.mix.as_deref()), MediaKind::Mix),
    }
}
