//! romdeck CLI
//!
//! Command-line front end for the game library: browse platforms and
//! catalogs, toggle favorites, and launch games.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romdeck_lib::{Game, GameLibrary, LibraryConfig, LibraryError};

#[derive(Parser)]
#[command(name = "romdeck")]
#[command(about = "Browse and launch your emulated game library", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/romdeck/settings.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured platforms
    Platforms {
        /// Bypass the cache and re-read the systems config
        #[arg(short, long)]
        refresh: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the games of a platform
    Games {
        /// Platform id (e.g. snes)
        platform: String,

        /// Bypass the cache and re-scan the ROM directory
        #[arg(short, long)]
        refresh: bool,

        /// Include games flagged hidden
        #[arg(short, long)]
        all: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one game in detail
    Show {
        platform: String,
        /// Game id (e.g. snes-0)
        game: String,

        #[arg(long)]
        json: bool,
    },

    /// Launch a game
    Launch {
        platform: String,
        game: String,

        /// Emulator to use instead of the platform default
        #[arg(short, long)]
        emulator: Option<String>,

        /// Core to use instead of the emulator default
        #[arg(long)]
        core: Option<String>,

        /// Print the launch plan without spawning anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Block until the emulator exits and report its exit code
        #[arg(short, long)]
        wait: bool,
    },

    /// Show the launch status recorded for a game id
    Status {
        game: String,

        #[arg(long)]
        json: bool,
    },

    /// Mark or unmark a game as favorite
    Favorite {
        platform: String,
        game: String,

        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Drop all cached catalogs
    Refresh,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(LibraryConfig::settings_path);
    let cfg = match LibraryConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            print_error(&format!("Could not read {}: {e}", config_path.display()));
            return ExitCode::FAILURE;
        }
    };
    let library = GameLibrary::new(cfg);

    let result = match cli.command {
        Commands::Platforms { refresh, json } => run_platforms(&library, refresh, json),
        Commands::Games {
            platform,
            refresh,
            all,
            json,
        } => run_games(&library, &platform, refresh, all, json),
        Commands::Show {
            platform,
            game,
            json,
        } => run_show(&library, &platform, &game, json),
        Commands::Launch {
            platform,
            game,
            emulator,
            core,
            dry_run,
            wait,
        } => run_launch(
            &library,
            &platform,
            &game,
            emulator.as_deref(),
            core.as_deref(),
            dry_run,
            wait,
        ),
        Commands::Status { game, json } => run_status(&library, &game, json),
        Commands::Favorite {
            platform,
            game,
            off,
        } => run_favorite(&library, &platform, &game, !off),
        Commands::Refresh => {
            library.refresh();
            println!("Cache cleared");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run_platforms(library: &GameLibrary, refresh: bool, json: bool) -> Result<(), LibraryError> {
    let platforms = library.list_platforms(refresh)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*platforms).map_err(io_other)?);
        return Ok(());
    }

    if platforms.is_empty() {
        println!(
            "{}",
            "No platforms configured".if_supports_color(Stdout, |t| t.dimmed())
        );
        return Ok(());
    }

    for platform in platforms.iter() {
        let extensions: Vec<&str> = platform
            .supported_extensions
            .iter()
            .map(String::as_str)
            .collect();
        println!(
            "{:<16} {:<32} {}",
            platform.id.if_supports_color(Stdout, |t| t.cyan()),
            platform.display_name,
            extensions.join(" ").if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

fn run_games(
    library: &GameLibrary,
    platform: &str,
    refresh: bool,
    all: bool,
    json: bool,
) -> Result<(), LibraryError> {
    let games = library.list_games(platform, refresh)?;
    let visible: Vec<&Game> = games.iter().filter(|g| all || !g.hidden).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&visible).map_err(io_other)?);
        return Ok(());
    }

    if visible.is_empty() {
        println!(
            "{}",
            "No games found".if_supports_color(Stdout, |t| t.dimmed())
        );
        return Ok(());
    }

    for game in visible {
        let marker = if game.favorite { "\u{2605}" } else { " " };
        println!(
            "{:<12} {} {:<40} {}",
            game.id.if_supports_color(Stdout, |t| t.cyan()),
            marker.if_supports_color(Stdout, |t| t.yellow()),
            game.name,
            game.file_name.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

fn run_show(
    library: &GameLibrary,
    platform: &str,
    game_id: &str,
    json: bool,
) -> Result<(), LibraryError> {
    let game = library.get_game(platform, game_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&game).map_err(io_other)?);
        return Ok(());
    }

    println!(
        "{}",
        game.name.if_supports_color(Stdout, |t| t.bold())
    );
    println!("  id:        {}", game.id);
    println!("  file:      {}", game.absolute_path.display());
    println!("  desc:      {}", game.description);
    print_field("developer", game.developer.as_deref());
    print_field("publisher", game.publisher.as_deref());
    print_field("genre", game.genre.as_deref());
    print_field("players", game.players.as_deref());
    if let Some(rating) = game.rating {
        println!("  rating:    {rating:.2}");
    }
    print_field("released", game.release_date.as_deref());
    print_field("image", game.image.as_deref());
    if game.play_count > 0 {
        println!("  plays:     {}", game.play_count);
    }
    if game.favorite {
        println!(
            "  {}",
            "favorite".if_supports_color(Stdout, |t| t.yellow())
        );
    }
    Ok(())
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {label}:{}{value}", " ".repeat(10_usize.saturating_sub(label.len())));
    }
}

fn run_launch(
    library: &GameLibrary,
    platform: &str,
    game_id: &str,
    emulator: Option<&str>,
    core: Option<&str>,
    dry_run: bool,
    wait: bool,
) -> Result<(), LibraryError> {
    if dry_run {
        let plan = library.plan_launch(platform, game_id, emulator, core)?;
        println!(
            "{} {}",
            "Would run:".if_supports_color(Stdout, |t| t.bold()),
            plan.executable,
        );
        for arg in &plan.arguments {
            println!("    {arg}");
        }
        println!(
            "  emulator {} / core {}",
            plan.selected_emulator,
            plan.selected_core.as_deref().unwrap_or("-"),
        );
        return Ok(());
    }

    let plan = library.launch_game(platform, game_id, emulator, core)?;
    println!(
        "{} {} via {} ({})",
        "Launched".if_supports_color(Stdout, |t| t.green()),
        game_id,
        plan.selected_emulator,
        plan.selected_core.as_deref().unwrap_or("no core"),
    );

    if wait {
        loop {
            match library.launch_status(game_id) {
                Some(status) if !status.is_running() => {
                    match status.exit_code() {
                        Some(code) => println!("Exited with code {code}"),
                        None => println!(
                            "{}",
                            status.error().unwrap_or("Exited without a code")
                        ),
                    }
                    break;
                }
                _ => std::thread::sleep(std::time::Duration::from_millis(200)),
            }
        }
    }
    Ok(())
}

fn run_status(library: &GameLibrary, game_id: &str, json: bool) -> Result<(), LibraryError> {
    match library.launch_status(game_id) {
        Some(status) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&status).map_err(io_other)?);
            } else if status.is_running() {
                println!(
                    "{} since {}",
                    "running".if_supports_color(Stdout, |t| t.green()),
                    status.started_at,
                );
            } else if let Some(error) = status.error() {
                println!(
                    "{}: {error}",
                    "failed".if_supports_color(Stdout, |t| t.bright_red()),
                );
            } else {
                println!(
                    "exited with code {}",
                    status
                        .exit_code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "?".to_string()),
                );
            }
        }
        None => println!(
            "{}",
            "No launch recorded for this game id".if_supports_color(Stdout, |t| t.dimmed())
        ),
    }
    Ok(())
}

fn run_favorite(
    library: &GameLibrary,
    platform: &str,
    game_id: &str,
    favorite: bool,
) -> Result<(), LibraryError> {
    let game = library.set_favorite(platform, game_id, favorite)?;
    println!(
        "{} {}",
        game.name,
        if game.favorite {
            "\u{2605} favorite".if_supports_color(Stdout, |t| t.yellow()).to_string()
        } else {
            "unfavorited".to_string()
        },
    );
    Ok(())
}

fn print_error(message: &str) {
    eprintln!(
        "{} {message}",
        "error:".if_supports_color(owo_colors::Stream::Stderr, |t| t.bright_red()),
    );
}

fn io_other(e: serde_json::Error) -> LibraryError {
    LibraryError::Io(std::io::Error::other(e))
}
