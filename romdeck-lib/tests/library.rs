use std::fs;
use std::path::Path;

use tempfile::TempDir;

use romdeck_lib::{GameLibrary, LibraryConfig, LibraryError};

/// Build a library around a temp tree: a systems config declaring one SNES
/// system plus its ROM directory.
fn fixture() -> (TempDir, GameLibrary) {
    fixture_with_command("retroarch -L %CORE% %ROM%")
}

fn fixture_with_command(command: &str) -> (TempDir, GameLibrary) {
    let tmp = TempDir::new().unwrap();
    let rom_dir = tmp.path().join("roms/snes");
    fs::create_dir_all(&rom_dir).unwrap();
    fs::write(rom_dir.join("chrono.sfc"), b"rom").unwrap();
    fs::write(rom_dir.join("mario.sfc"), b"rom").unwrap();

    let systems = tmp.path().join("systems.cfg");
    fs::write(
        &systems,
        format!(
            r#"<systemList>
    <system>
        <name>snes</name>
        <path>{}</path>
        <extension>.sfc .smc</extension>
        <command>{command}</command>
        <emulators>
            <emulator name="libretro">
                <cores>
                    <core>snes9x</core>
                    <core>bsnes</core>
                </cores>
            </emulator>
            <emulator name="higan">
                <cores>
                    <core>accuracy</core>
                    <core default="true">balanced</core>
                </cores>
            </emulator>
        </emulators>
    </system>
</systemList>"#,
            rom_dir.display()
        ),
    )
    .unwrap();

    let cfg = LibraryConfig {
        systems_path: systems,
        resources_dir: tmp.path().join("resources"),
        ..Default::default()
    };
    let library = GameLibrary::new(cfg);
    (tmp, library)
}

fn rom_dir(tmp: &TempDir) -> std::path::PathBuf {
    tmp.path().join("roms/snes")
}

#[test]
fn platforms_and_games_flow_through_the_facade() {
    let (_tmp, library) = fixture();

    let platforms = library.list_platforms(false).unwrap();
    assert_eq!(platforms.len(), 1);
    assert_eq!(platforms[0].id, "snes");

    let games = library.list_games("snes", false).unwrap();
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].id, "snes-0");
    assert_eq!(games[0].file_name, "chrono.sfc");

    let game = library.get_game("snes", "snes-1").unwrap();
    assert_eq!(game.file_name, "mario.sfc");
}

#[test]
fn unknown_platform_and_game_are_typed_errors() {
    let (_tmp, library) = fixture();

    assert!(matches!(
        library.list_games("neogeo", false),
        Err(LibraryError::PlatformNotFound(_))
    ));
    assert!(matches!(
        library.get_game("snes", "snes-99"),
        Err(LibraryError::GameNotFound { .. })
    ));
}

#[test]
fn cached_reads_miss_new_files_until_invalidated() {
    let (tmp, library) = fixture();

    assert_eq!(library.list_games("snes", false).unwrap().len(), 2);

    fs::write(rom_dir(&tmp).join("zelda.sfc"), b"rom").unwrap();
    // Cached read: the new file is not visible yet.
    assert_eq!(library.list_games("snes", false).unwrap().len(), 2);

    library.refresh();
    assert_eq!(library.list_games("snes", false).unwrap().len(), 3);
}

#[test]
fn forced_read_bypasses_the_cache() {
    let (tmp, library) = fixture();

    assert_eq!(library.list_games("snes", false).unwrap().len(), 2);
    fs::write(rom_dir(&tmp).join("zelda.sfc"), b"rom").unwrap();
    assert_eq!(library.list_games("snes", true).unwrap().len(), 3);
}

#[test]
fn favorite_toggle_writes_back_and_reconciles() {
    let (tmp, library) = fixture();

    let updated = library.set_favorite("snes", "snes-0", true).unwrap();
    assert!(updated.favorite);

    // The sidecar was rewritten in place with the flag.
    let sidecar = fs::read_to_string(rom_dir(&tmp).join("gamelist.xml")).unwrap();
    assert!(sidecar.contains("<favorite>true</favorite>"));
    assert!(sidecar.contains("<path>./chrono.sfc</path>"));

    // And the flag survives a fresh reconciliation.
    let game = library.get_game("snes", "snes-0").unwrap();
    assert!(game.favorite);

    let cleared = library.set_favorite("snes", "snes-0", false).unwrap();
    assert!(!cleared.favorite);
}

#[test]
fn plan_uses_first_emulator_unless_requested() {
    let (_tmp, library) = fixture();

    let plan = library.plan_launch("snes", "snes-0", None, None).unwrap();
    assert_eq!(plan.selected_emulator, "libretro");
    assert_eq!(plan.selected_core.as_deref(), Some("snes9x"));
    assert_eq!(plan.executable, "retroarch");
    assert_eq!(plan.arguments[0], "-L");
    assert_eq!(plan.arguments[1], "snes9x");
    assert!(plan.arguments[2].ends_with("chrono.sfc"));

    let requested = library
        .plan_launch("snes", "snes-0", Some("higan"), None)
        .unwrap();
    assert_eq!(requested.selected_emulator, "higan");
    assert_eq!(requested.selected_core.as_deref(), Some("balanced"));
}

#[test]
fn plan_for_missing_rom_is_a_launch_error() {
    let (tmp, library) = fixture();

    // Prime the catalog, then delete the file behind it.
    library.list_games("snes", false).unwrap();
    fs::remove_file(rom_dir(&tmp).join("chrono.sfc")).unwrap();

    let result = library.plan_launch("snes", "snes-0", None, None);
    assert!(matches!(
        result,
        Err(LibraryError::Launch(
            romdeck_lib::LaunchError::RomMissing(_)
        ))
    ));
}

#[test]
fn failed_spawn_is_recorded_not_thrown_past_the_status() {
    let (tmp, library) = fixture_with_command("/nonexistent/romdeck-fake-emulator %ROM%");

    let result = library.launch_game("snes", "snes-0", None, None);
    assert!(matches!(result, Err(LibraryError::Process(_))));

    let status = library.launch_status("snes-0").unwrap();
    assert!(!status.is_running());
    assert!(status.error().is_some());

    // No play is recorded for a launch that never spawned.
    assert!(!rom_dir(&tmp).join("gamelist.xml").exists());
}

#[cfg(unix)]
#[test]
fn successful_launch_tracks_status_and_records_play() {
    use std::time::{Duration, Instant};

    let (tmp, library) = fixture_with_command("/bin/sh -c true");

    library.launch_game("snes", "snes-0", None, None).unwrap();

    // The watcher thread finalizes the status shortly after the shell exits.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = library.launch_status("snes-0").unwrap();
        if !status.is_running() {
            assert_eq!(status.exit_code(), Some(0));
            assert!(status.closed_at.is_some());
            break;
        }
        assert!(Instant::now() < deadline, "launch status never settled");
        std::thread::sleep(Duration::from_millis(10));
    }

    let sidecar = fs::read_to_string(rom_dir(&tmp).join("gamelist.xml")).unwrap();
    assert!(sidecar.contains("<playcount>1</playcount>"));
    assert!(sidecar.contains("<lastplayed>"));

    // The reconciled game reflects the recorded play.
    let game = library.get_game("snes", "snes-0").unwrap();
    assert_eq!(game.play_count, 1);
}

#[test]
fn missing_systems_config_surfaces_as_config_error() {
    let cfg = LibraryConfig {
        systems_path: Path::new("/nonexistent/systems.cfg").to_path_buf(),
        ..Default::default()
    };
    let library = GameLibrary::new(cfg);
    assert!(matches!(
        library.list_platforms(false),
        Err(LibraryError::Config(_))
    ));
}
