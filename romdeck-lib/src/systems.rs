//! Systems configuration parsing.
//!
//! Reads the `<systemList>` document into [`Platform`] records. Each system
//! declares a name, ROM path, extension list, launch command template, and a
//! nested emulator/core structure. A single unusable `<system>` entry is
//! skipped with a warning; a missing or structurally broken document is a
//! hard error the caller must surface.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use romdeck_core::platform::{Emulator, EmulatorCore, Platform};
use romdeck_core::util::{normalize_extension, random_system_id, slugify};

use crate::error::ConfigError;
use crate::settings::LibraryConfig;

/// Label used when an emulator or core declaration has no usable name.
pub const DEFAULT_NAME_LABEL: &str = "default";

/// The shapes an emulator/core name declaration can arrive in.
///
/// Source documents are hand-edited and inconsistent: the name may be the
/// element's own text, a `<name>` or `<value>` child, or a `name` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameShape {
    Text(String),
    NameChild(String),
    ValueChild(String),
    Attr(String),
}

/// Collapse observed name shapes into a single name.
///
/// Accepted in priority order: bare text, `<name>` child, `<value>` child,
/// `name` attribute. Blank values are skipped; when nothing usable remains
/// the fixed [`DEFAULT_NAME_LABEL`] is returned rather than failing the
/// surrounding platform.
pub fn resolve_name(shapes: &[NameShape]) -> String {
    let mut text: Option<&str> = None;
    let mut name_child: Option<&str> = None;
    let mut value_child: Option<&str> = None;
    let mut attr: Option<&str> = None;

    for shape in shapes {
        let (slot, value) = match shape {
            NameShape::Text(v) => (&mut text, v),
            NameShape::NameChild(v) => (&mut name_child, v),
            NameShape::ValueChild(v) => (&mut value_child, v),
            NameShape::Attr(v) => (&mut attr, v),
        };
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value);
        }
    }

    text.or(name_child)
        .or(value_child)
        .or(attr)
        .unwrap_or(DEFAULT_NAME_LABEL)
        .to_string()
}

/// Load all platform definitions from the systems config file.
pub fn load_systems(path: &Path, cfg: &LibraryConfig) -> Result<Vec<Platform>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    parse_systems(std::io::BufReader::new(file), cfg)
}

/// Parse a systems document from any reader.
pub fn parse_systems<R: BufRead>(
    reader: R,
    cfg: &LibraryConfig,
) -> Result<Vec<Platform>, ConfigError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut root_seen = false;

    let mut systems: Vec<RawSystem> = Vec::new();
    let mut current: Option<RawSystem> = None;
    let mut current_emulator: Option<RawEmulator> = None;
    let mut current_core: Option<RawCore> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = tag_name(e);
                if stack.is_empty() {
                    if tag != "systemList" {
                        return Err(ConfigError::malformed(format!(
                            "expected <systemList> root, found <{tag}>"
                        )));
                    }
                    root_seen = true;
                }
                open_element(
                    &stack,
                    &tag,
                    e,
                    &mut current,
                    &mut current_emulator,
                    &mut current_core,
                )?;
                stack.push(tag);
            }
            Event::Empty(ref e) => {
                let tag = tag_name(e);
                if stack.is_empty() {
                    if tag != "systemList" {
                        return Err(ConfigError::malformed(format!(
                            "expected <systemList> root, found <{tag}/>"
                        )));
                    }
                    root_seen = true;
                }
                open_element(
                    &stack,
                    &tag,
                    e,
                    &mut current,
                    &mut current_emulator,
                    &mut current_core,
                )?;
                stack.push(tag.clone());
                close_element(
                    &mut stack,
                    &mut systems,
                    &mut current,
                    &mut current_emulator,
                    &mut current_core,
                );
            }
            Event::Text(ref e) => {
                let text = e.unescape()?.to_string();
                record_text(
                    &stack,
                    &text,
                    &mut current,
                    &mut current_emulator,
                    &mut current_core,
                );
            }
            Event::End(_) => {
                close_element(
                    &mut stack,
                    &mut systems,
                    &mut current,
                    &mut current_emulator,
                    &mut current_core,
                );
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return Err(ConfigError::malformed("no <systemList> root element"));
    }

    let mut platforms: Vec<Platform> = Vec::new();
    for raw in systems {
        match build_platform(raw, cfg) {
            Some(platform) => {
                if platforms.iter().any(|p| p.id == platform.id) {
                    log::warn!(
                        "Duplicate system id '{}' - keeping the first declaration",
                        platform.id
                    );
                } else {
                    platforms.push(platform);
                }
            }
            None => log::warn!("Skipping system entry with no usable name or path"),
        }
    }

    Ok(platforms)
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RawSystem {
    name: String,
    path: String,
    extension: String,
    command: String,
    platform: String,
    theme: String,
    emulators: Vec<Emulator>,
}

#[derive(Default)]
struct RawEmulator {
    shapes: Vec<NameShape>,
    cores: Vec<EmulatorCore>,
}

#[derive(Default)]
struct RawCore {
    shapes: Vec<NameShape>,
    is_default: bool,
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ConfigError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
        }
    }
    Ok(None)
}

fn open_element(
    stack: &[String],
    tag: &str,
    e: &BytesStart<'_>,
    current: &mut Option<RawSystem>,
    current_emulator: &mut Option<RawEmulator>,
    current_core: &mut Option<RawCore>,
) -> Result<(), ConfigError> {
    let parent = stack.last().map(String::as_str);
    match (parent, tag) {
        (Some("systemList"), "system") => *current = Some(RawSystem::default()),
        (Some("emulators"), "emulator") => {
            let mut emulator = RawEmulator::default();
            if let Some(name) = attr_value(e, b"name")? {
                emulator.shapes.push(NameShape::Attr(name));
            }
            *current_emulator = Some(emulator);
        }
        (Some("cores"), "core") => {
            let mut core = RawCore::default();
            if let Some(name) = attr_value(e, b"name")? {
                core.shapes.push(NameShape::Attr(name));
            }
            core.is_default = attr_value(e, b"default")?
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            *current_core = Some(core);
        }
        _ => {}
    }
    Ok(())
}

fn record_text(
    stack: &[String],
    text: &str,
    current: &mut Option<RawSystem>,
    current_emulator: &mut Option<RawEmulator>,
    current_core: &mut Option<RawCore>,
) {
    let tail: Vec<&str> = stack.iter().rev().take(2).map(String::as_str).collect();
    let leaf = tail.first().copied().unwrap_or("");
    let parent = tail.get(1).copied().unwrap_or("");

    if let Some(core) = current_core.as_mut() {
        match leaf {
            "core" => core.shapes.push(NameShape::Text(text.to_string())),
            "name" => core.shapes.push(NameShape::NameChild(text.to_string())),
            "value" => core.shapes.push(NameShape::ValueChild(text.to_string())),
            _ => {}
        }
        return;
    }

    if let Some(emulator) = current_emulator.as_mut() {
        match leaf {
            "emulator" => emulator.shapes.push(NameShape::Text(text.to_string())),
            "name" => emulator.shapes.push(NameShape::NameChild(text.to_string())),
            "value" => emulator.shapes.push(NameShape::ValueChild(text.to_string())),
            _ => {}
        }
        return;
    }

    if parent == "system" {
        if let Some(system) = current.as_mut() {
            match leaf {
                "name" => system.name = text.to_string(),
                "path" => system.path = text.to_string(),
                "extension" => system.extension = text.to_string(),
                "command" => system.command = text.to_string(),
                "platform" => system.platform = text.to_string(),
                "theme" => system.theme = text.to_string(),
                _ => {}
            }
        }
    }
}

fn close_element(
    stack: &mut Vec<String>,
    systems: &mut Vec<RawSystem>,
    current: &mut Option<RawSystem>,
    current_emulator: &mut Option<RawEmulator>,
    current_core: &mut Option<RawCore>,
) {
    let Some(tag) = stack.pop() else { return };
    match tag.as_str() {
        "core" => {
            if let (Some(core), Some(emulator)) = (current_core.take(), current_emulator.as_mut()) {
                emulator.cores.push(EmulatorCore {
                    name: resolve_name(&core.shapes),
                    is_default: core.is_default,
                });
            }
        }
        "emulator" => {
            if let (Some(emulator), Some(system)) = (current_emulator.take(), current.as_mut()) {
                system.emulators.push(Emulator {
                    name: resolve_name(&emulator.shapes),
                    cores: emulator.cores,
                });
            }
        }
        "system" => {
            if let Some(system) = current.take() {
                systems.push(system);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Platform construction
// ---------------------------------------------------------------------------

/// Explode a whitespace-separated extension string into the normalized set,
/// falling back to the configured defaults so the set is never empty.
fn explode_extensions(raw: &str, cfg: &LibraryConfig) -> BTreeSet<String> {
    let mut set: BTreeSet<String> = raw
        .split_whitespace()
        .map(normalize_extension)
        .filter(|e| e.len() > 1)
        .collect();
    if set.is_empty() {
        set = cfg
            .default_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .collect();
    }
    set
}

fn build_platform(raw: RawSystem, cfg: &LibraryConfig) -> Option<Platform> {
    let name = raw.name.trim().to_string();
    let path = raw.path.trim().to_string();
    if name.is_empty() && path.is_empty() {
        return None;
    }
    if path.is_empty() {
        log::warn!("System '{name}' declares no ROM path - skipping");
        return None;
    }

    let id = if name.is_empty() {
        random_system_id()
    } else {
        let slug = slugify(&name);
        if slug.is_empty() { random_system_id() } else { slug }
    };

    let theme = [raw.theme.trim(), raw.platform.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .map(str::to_string);

    let command = raw.command.trim();

    Some(Platform {
        // The random fallback id is for addressing only - the display name
        // stays whatever was declared, even when that is nothing.
        display_name: name,
        rom_directory: PathBuf::from(path),
        supported_extensions: explode_extensions(&raw.extension, cfg),
        command_template: if command.is_empty() {
            None
        } else {
            Some(command.to_string())
        },
        emulators: raw.emulators,
        theme,
        id,
    })
}
