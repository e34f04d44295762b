//! Launch planning.
//!
//! Resolves emulator/core selection and expands the platform's command
//! template into a concrete, tokenized invocation. Planning is pure: no
//! filesystem writes, nothing spawned.

use std::path::{Component, Path, PathBuf};

use romdeck_core::game::Game;
use romdeck_core::launch::LaunchPlan;
use romdeck_core::platform::Platform;

use crate::error::LaunchError;
use crate::settings::LibraryConfig;

/// Fallback cores for emulators declared without any, keyed by platform id.
const DEFAULT_CORES: &[(&str, &str)] = &[
    ("nes", "nestopia"),
    ("snes", "snes9x"),
    ("n64", "mupen64plus_next"),
    ("gb", "gambatte"),
    ("gba", "mgba"),
    ("mastersystem", "genesis_plus_gx"),
    ("megadrive", "genesis_plus_gx"),
    ("genesis", "genesis_plus_gx"),
    ("psx", "pcsx_rearmed"),
    ("pcengine", "mednafen_pce"),
];

/// Build a launch plan for a game on its platform.
pub fn plan_launch(
    game: &Game,
    platform: &Platform,
    requested_emulator: Option<&str>,
    requested_core: Option<&str>,
    cfg: &LibraryConfig,
) -> Result<LaunchPlan, LaunchError> {
    let template = platform
        .command_template
        .as_deref()
        .ok_or_else(|| LaunchError::NoCommandTemplate(platform.id.clone()))?;

    if !platform.rom_directory.is_dir() {
        return Err(LaunchError::RomDirectoryMissing(
            platform.rom_directory.clone(),
        ));
    }

    let rom_path = normalize_path(&absolutize(&game.absolute_path, &platform.rom_directory));
    if !rom_path.is_file() {
        return Err(LaunchError::RomMissing(rom_path));
    }

    let (emulator_name, core_name) =
        select_emulator_core(platform, requested_emulator, requested_core);

    let game_info_path = template
        .contains("%GAMEINFO%")
        .then(|| std::env::temp_dir().join(format!("romdeck-{}.info", game.id)));

    let command = template
        .replace("%ROM%", &quote_if_needed(&rom_path.to_string_lossy()))
        .replace("%SYSTEM%", &platform.id)
        .replace("%EMULATOR%", &emulator_name)
        .replace(
            "%CORE%",
            core_name.as_deref().unwrap_or_default(),
        )
        .replace(
            "%GAMEINFO%",
            &game_info_path
                .as_deref()
                .map(|p| quote_if_needed(&p.to_string_lossy()))
                .unwrap_or_default(),
        )
        .replace("%CONTROLLERSCONFIG%", &cfg.controllers_config);

    let mut tokens = tokenize_command(&command);
    if tokens.is_empty() {
        return Err(LaunchError::NoCommandTemplate(platform.id.clone()));
    }
    let executable = tokens.remove(0);

    if cfg.validate_executables
        && executable.contains(std::path::MAIN_SEPARATOR)
        && !Path::new(&executable).is_file()
    {
        return Err(LaunchError::ExecutableMissing(executable));
    }

    Ok(LaunchPlan {
        executable,
        arguments: tokens,
        working_directory: platform.rom_directory.clone(),
        rom_path,
        selected_emulator: emulator_name,
        selected_core: core_name,
        game_info_path,
    })
}

/// Emulator: the requested one when it exists, else the first declared.
/// Core: requested, else the emulator's default, else the platform's
/// fallback table, else none.
fn select_emulator_core(
    platform: &Platform,
    requested_emulator: Option<&str>,
    requested_core: Option<&str>,
) -> (String, Option<String>) {
    let emulator = match requested_emulator {
        Some(name) => {
            let found = platform.emulator(name);
            if found.is_none() {
                log::warn!(
                    "Requested emulator '{name}' not declared for '{}' - using the first",
                    platform.id
                );
            }
            found.or_else(|| platform.emulators.first())
        }
        None => platform.emulators.first(),
    };

    let emulator_name = emulator
        .map(|e| e.name.clone())
        .unwrap_or_else(|| crate::systems::DEFAULT_NAME_LABEL.to_string());

    let core = requested_core
        .map(str::to_string)
        .or_else(|| {
            emulator
                .and_then(|e| e.default_core())
                .map(|c| c.name.clone())
        })
        .or_else(|| {
            DEFAULT_CORES
                .iter()
                .find(|(id, _)| *id == platform.id)
                .map(|(_, core)| core.to_string())
        });

    (emulator_name, core)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn quote_if_needed(s: &str) -> String {
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        s.to_string()
    } else {
        format!("\"{s}\"")
    }
}

/// Split a command line into tokens, respecting double quotes.
/// `run -L "core name" rom` → `["run", "-L", "core name", "rom"]`.
fn tokenize_command(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut token = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_whitespace() {
                break;
            }
            if c == '"' {
                chars.next();
                while let Some(&q) = chars.peek() {
                    if q == '"' {
                        chars.next();
                        break;
                    }
                    token.push(q);
                    chars.next();
                }
            } else {
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_respects_quotes() {
        assert_eq!(
            tokenize_command(r#"retroarch -L "snes9x core" "/roms/a b.sfc""#),
            vec!["retroarch", "-L", "snes9x core", "/roms/a b.sfc"]
        );
    }

    #[test]
    fn tokenize_handles_adjacent_quoted_segments() {
        assert_eq!(tokenize_command(r#"a"b c"d"#), vec!["ab cd"]);
        assert_eq!(tokenize_command("   "), Vec::<String>::new());
    }

    #[test]
    fn quote_if_needed_leaves_quoted_alone() {
        assert_eq!(quote_if_needed("\"/roms/a.sfc\""), "\"/roms/a.sfc\"");
        assert_eq!(quote_if_needed("/roms/a.sfc"), "\"/roms/a.sfc\"");
    }

    #[test]
    fn normalize_path_collapses_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/roms/snes/../snes/./game.sfc")),
            PathBuf::from("/roms/snes/game.sfc")
        );
        assert_eq!(
            normalize_path(Path::new("/a/b/../../c")),
            PathBuf::from("/c")
        );
    }

    mod selection {
        use super::*;
        use romdeck_core::platform::{Emulator, EmulatorCore};
        use std::collections::BTreeSet;

        fn platform_with(emulators: Vec<Emulator>) -> Platform {
            Platform {
                id: "snes".into(),
                display_name: "Super Nintendo".into(),
                rom_directory: PathBuf::from("/roms/snes"),
                supported_extensions: BTreeSet::from([".sfc".to_string()]),
                command_template: Some("retroarch %ROM%".into()),
                emulators,
                theme: None,
            }
        }

        fn emulator(name: &str, cores: &[(&str, bool)]) -> Emulator {
            Emulator {
                name: name.into(),
                cores: cores
                    .iter()
                    .map(|(n, d)| EmulatorCore {
                        name: n.to_string(),
                        is_default: *d,
                    })
                    .collect(),
            }
        }

        #[test]
        fn unrequested_selection_takes_first_emulator_first_core() {
            let platform = platform_with(vec![
                emulator("libretro", &[("snes9x", false), ("bsnes", false)]),
                emulator("standalone", &[("a", false), ("b", true)]),
            ]);
            let (emu, core) = select_emulator_core(&platform, None, None);
            assert_eq!(emu, "libretro");
            assert_eq!(core.as_deref(), Some("snes9x"));
        }

        #[test]
        fn requested_emulator_uses_its_default_core() {
            let platform = platform_with(vec![
                emulator("libretro", &[("snes9x", false)]),
                emulator("standalone", &[("a", false), ("b", true)]),
            ]);
            let (emu, core) = select_emulator_core(&platform, Some("standalone"), None);
            assert_eq!(emu, "standalone");
            assert_eq!(core.as_deref(), Some("b"));
        }

        #[test]
        fn unknown_requested_emulator_falls_back_to_first() {
            let platform = platform_with(vec![emulator("libretro", &[("snes9x", false)])]);
            let (emu, _) = select_emulator_core(&platform, Some("nonexistent"), None);
            assert_eq!(emu, "libretro");
        }

        #[test]
        fn requested_core_wins_over_default_flag() {
            let platform = platform_with(vec![emulator("libretro", &[("snes9x", true)])]);
            let (_, core) = select_emulator_core(&platform, None, Some("bsnes-hd"));
            assert_eq!(core.as_deref(), Some("bsnes-hd"));
        }

        #[test]
        fn coreless_emulator_consults_platform_table() {
            let platform = platform_with(vec![emulator("libretro", &[])]);
            let (_, core) = select_emulator_core(&platform, None, None);
            assert_eq!(core.as_deref(), Some("snes9x"));
        }

        #[test]
        fn unknown_platform_without_cores_leaves_core_empty() {
            let mut platform = platform_with(vec![emulator("standalone", &[])]);
            platform.id = "vectrex".into();
            let (_, core) = select_emulator_core(&platform, None, None);
            assert_eq!(core, None);
        }

        #[test]
        fn no_emulators_at_all_uses_default_label() {
            let platform = platform_with(vec![]);
            let (emu, core) = select_emulator_core(&platform, None, None);
            assert_eq!(emu, crate::systems::DEFAULT_NAME_LABEL);
            assert_eq!(core.as_deref(), Some("snes9x"));
        }
    }
}
