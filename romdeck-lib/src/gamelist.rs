//! Gamelist sidecar documents.
//!
//! Each platform's ROM directory may carry a `gamelist.xml` holding curated
//! metadata for its games. The document is read fresh on every catalog
//! build and written back only through a full rewrite - never partial byte
//! edits.

use std::io::BufRead;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::GamelistError;

/// File name of the sidecar document inside a platform's ROM directory.
pub const GAMELIST_FILE: &str = "gamelist.xml";

/// One record from a gamelist document, as authored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameEntry {
    /// The `id` attribute on the `<game>` element, when present.
    pub external_id: Option<String>,
    /// ROM path as authored - may be relative, usually `./file.ext`.
    pub path: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub players: Option<String>,
    pub rating: Option<f32>,
    pub release_date: Option<String>,
    pub region: Option<String>,
    pub lang: Option<String>,
    pub play_count: Option<u32>,
    pub last_played: Option<String>,
    pub favorite: Option<bool>,
    pub hidden: Option<bool>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub video: Option<String>,
    pub marquee: Option<String>,
    pub fanart: Option<String>,
    pub mix: Option<String>,
}

impl GameEntry {
    /// File name component of the authored path, if any.
    pub fn file_name(&self) -> Option<&str> {
        let path = self.path.as_deref()?;
        let trimmed = path.trim_end_matches('/');
        let base = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
        if base.is_empty() { None } else { Some(base) }
    }
}

/// Read a gamelist document from disk.
pub fn read_gamelist(path: &Path) -> Result<Vec<GameEntry>, GamelistError> {
    let file = std::fs::File::open(path)?;
    parse_gamelist(std::io::BufReader::new(file))
}

/// Parse a gamelist document from any reader.
pub fn parse_gamelist<R: BufRead>(reader: R) -> Result<Vec<GameEntry>, GamelistError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<GameEntry> = None;
    let mut current_tag = String::new();
    let mut root_seen = false;
    let mut depth = 0usize;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if depth == 0 {
                    if tag != "gameList" {
                        return Err(GamelistError::malformed(format!(
                            "expected <gameList> root, found <{tag}>"
                        )));
                    }
                    root_seen = true;
                } else if depth == 1 && tag == "game" {
                    let mut entry = GameEntry::default();
                    for attr in e.attributes() {
                        let attr = attr?;
                        if attr.key.as_ref() == b"id" {
                            let value = String::from_utf8_lossy(&attr.value).trim().to_string();
                            if !value.is_empty() {
                                entry.external_id = Some(value);
                            }
                        }
                    }
                    current = Some(entry);
                } else if depth == 2 {
                    current_tag = tag;
                }
                depth += 1;
            }
            Event::Text(ref e) => {
                if let Some(entry) = current.as_mut() {
                    let text = e.unescape()?.to_string();
                    set_field(entry, &current_tag, &text);
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if depth == 1 && tag == "game" {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                } else if depth == 2 {
                    current_tag.clear();
                }
            }
            Event::Empty(ref e) => {
                // A bare self-closing root is just an empty document.
                if depth == 0 {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag != "gameList" {
                        return Err(GamelistError::malformed(format!(
                            "expected <gameList> root, found <{tag}/>"
                        )));
                    }
                    root_seen = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return Err(GamelistError::malformed("no <gameList> root element"));
    }

    Ok(entries)
}

fn set_field(entry: &mut GameEntry, tag: &str, text: &str) {
    let value = || Some(text.to_string());
    match tag {
        "path" => entry.path = value(),
        "name" => entry.name = value(),
        "desc" => entry.description = value(),
        "developer" => entry.developer = value(),
        "publisher" => entry.publisher = value(),
        "genre" => entry.genre = value(),
        "players" => entry.players = value(),
        "rating" => entry.rating = text.trim().parse().ok(),
        "releasedate" => entry.release_date = value(),
        "region" => entry.region = value(),
        "lang" => entry.lang = value(),
        "playcount" => entry.play_count = text.trim().parse().ok(),
        "lastplayed" => entry.last_played = value(),
        "favorite" => entry.favorite = Some(text.trim().eq_ignore_ascii_case("true")),
        "hidden" => entry.hidden = Some(text.trim().eq_ignore_ascii_case("true")),
        "image" => entry.image = value(),
        "thumbnail" => entry.thumbnail = value(),
        "video" => entry.video = value(),
        "marquee" => entry.marquee = value(),
        "fanart" => entry.fanart = value(),
        "mix" => entry.mix = value(),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

/// Rewrite the full gamelist document with the given entries.
///
/// The write is atomic (temp file + rename) so a crash mid-write never
/// leaves a truncated sidecar behind.
pub fn write_gamelist(path: &Path, entries: &[GameEntry]) -> Result<(), GamelistError> {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\"?>\n");
    xml.push_str("<gameList>\n");

    for entry in entries {
        match &entry.external_id {
            Some(id) => {
                xml.push_str("  <game id=\"");
                xml.push_str(&escape_xml(id));
                xml.push_str("\">\n");
            }
            None => xml.push_str("  <game>\n"),
        }

        write_opt(&mut xml, "path", entry.path.as_deref());
        write_opt(&mut xml, "name", entry.name.as_deref());
        write_opt(&mut xml, "desc", entry.description.as_deref());
        write_opt(&mut xml, "developer", entry.developer.as_deref());
        write_opt(&mut xml, "publisher", entry.publisher.as_deref());
        write_opt(&mut xml, "genre", entry.genre.as_deref());
        write_opt(&mut xml, "players", entry.players.as_deref());
        if let Some(rating) = entry.rating {
            write_tag(&mut xml, "rating", &format!("{rating:.2}"));
        }
        write_opt(&mut xml, "releasedate", entry.release_date.as_deref());
        write_opt(&mut xml, "region", entry.region.as_deref());
        write_opt(&mut xml, "lang", entry.lang.as_deref());
        if let Some(count) = entry.play_count {
            write_tag(&mut xml, "playcount", &count.to_string());
        }
        write_opt(&mut xml, "lastplayed", entry.last_played.as_deref());
        if entry.favorite == Some(true) {
            write_tag(&mut xml, "favorite", "true");
        }
        if entry.hidden == Some(true) {
            write_tag(&mut xml, "hidden", "true");
        }
        write_opt(&mut xml, "image", entry.image.as_deref());
        write_opt(&mut xml, "thumbnail", entry.thumbnail.as_deref());
        write_opt(&mut xml, "video", entry.video.as_deref());
        write_opt(&mut xml, "marquee", entry.marquee.as_deref());
        write_opt(&mut xml, "fanart", entry.fanart.as_deref());
        write_opt(&mut xml, "mix", entry.mix.as_deref());

        xml.push_str("  </game>\n");
    }

    xml.push_str("</gameList>\n");

    let tmp = path.with_extension("xml.tmp");
    std::fs::write(&tmp, xml.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Find the entry describing a ROM file, or append a fresh one for it.
///
/// Lookup matches the authored path's file name first, then the entry name
/// against the file stem - the same cascade the catalog matcher uses, so
/// write-backs land on the entry the game was reconciled from.
pub fn entry_for_file_mut<'a>(
    entries: &'a mut Vec<GameEntry>,
    file_name: &str,
    display_name: &str,
) -> &'a mut GameEntry {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let position = entries
        .iter()
        .position(|e| {
            e.file_name()
                .is_some_and(|f| f.eq_ignore_ascii_case(file_name))
        })
        .or_else(|| {
            entries
                .iter()
                .position(|e| e.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(stem)))
        });

    match position {
        Some(i) => &mut entries[i],
        None => {
            entries.push(GameEntry {
                path: Some(format!("./{file_name}")),
                name: Some(display_name.to_string()),
                ..Default::default()
            });
            let last = entries.len() - 1;
            &mut entries[last]
        }
    }
}

/// Timestamp format used by `lastplayed`: `YYYYMMDDTHHMMSS`.
pub fn play_stamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y%m%dT%H%M%S").to_string()
}

fn write_opt(xml: &mut String, tag: &str, value: Option<&str>) {
    if let Some(value) = value {
        write_tag(xml, tag, value);
    }
}

fn write_tag(xml: &mut String, tag: &str, value: &str) {
    xml.push_str("    <");
    xml.push_str(tag);
    xml.push('>');
    xml.push_str(&escape_xml(value));
    xml.push_str("</");
    xml.push_str(tag);
    xml.push_str(">\n");
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
