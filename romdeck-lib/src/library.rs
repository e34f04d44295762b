//! The caller-facing library surface.
//!
//! Surrounding layers (UI shell, HTTP routes) talk only to [`GameLibrary`].
//! It wires the systems registry and per-platform catalogs through the
//! timed cache, plans and spawns launches, and routes all sidecar writes
//! through the full-rewrite path followed by cache invalidation.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use romdeck_core::game::Game;
use romdeck_core::launch::{LaunchPlan, RunningGameStatus};
use romdeck_core::platform::Platform;

use crate::cache::{CacheKey, CatalogCache};
use crate::catalog;
use crate::error::{LaunchError, LibraryError};
use crate::gamelist;
use crate::launch;
use crate::runner::ProcessRunner;
use crate::settings::LibraryConfig;
use crate::systems;

pub struct GameLibrary {
    cfg: LibraryConfig,
    cache: CatalogCache,
    runner: ProcessRunner,
}

impl GameLibrary {
    pub fn new(cfg: LibraryConfig) -> Self {
        let cache = CatalogCache::new(cfg.cache_ttl());
        Self {
            cfg,
            cache,
            runner: ProcessRunner::new(),
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.cfg
    }

    /// All platform definitions, cached.
    pub fn list_platforms(&self, refresh: bool) -> Result<Arc<Vec<Platform>>, LibraryError> {
        self.cache
            .systems_with(refresh, || {
                systems::load_systems(&self.cfg.systems_path, &self.cfg)
            })
            .map_err(LibraryError::from)
    }

    /// One platform's reconciled catalog, cached.
    pub fn list_games(
        &self,
        platform_id: &str,
        refresh: bool,
    ) -> Result<Arc<Vec<Game>>, LibraryError> {
        let platform = self.platform(platform_id)?;
        self.cache.catalog_with(platform_id, refresh, || {
            catalog::build_catalog(&platform, &self.cfg)
        })
    }

    /// A single game by id.
    pub fn get_game(&self, platform_id: &str, game_id: &str) -> Result<Game, LibraryError> {
        let games = self.list_games(platform_id, false)?;
        games
            .iter()
            .find(|g| g.id == game_id)
            .cloned()
            .ok_or_else(|| LibraryError::GameNotFound {
                platform_id: platform_id.to_string(),
                game_id: game_id.to_string(),
            })
    }

    /// Plan and spawn a launch for a game. Returns the plan that was run.
    ///
    /// A successful spawn also records the play in the sidecar (best
    /// effort) and invalidates the platform's catalog key so the next read
    /// reflects it.
    pub fn launch_game(
        &self,
        platform_id: &str,
        game_id: &str,
        emulator: Option<&str>,
        core: Option<&str>,
    ) -> Result<LaunchPlan, LibraryError> {
        let platform = self
            .find_platform(platform_id)?
            .ok_or_else(|| LaunchError::PlatformNotFound(platform_id.to_string()))?;
        let game = self.get_game(platform_id, game_id)?;

        let plan = launch::plan_launch(&game, &platform, emulator, core, &self.cfg)?;
        self.runner.launch(&game.id, &game.name, &plan)?;

        if let Err(e) = self.record_play(&platform, &game) {
            log::warn!("Could not record play for {}: {e}", game.id);
        }
        self.cache
            .invalidate(&CacheKey::Catalog(platform_id.to_string()));

        Ok(plan)
    }

    /// Build a launch plan without spawning anything.
    pub fn plan_launch(
        &self,
        platform_id: &str,
        game_id: &str,
        emulator: Option<&str>,
        core: Option<&str>,
    ) -> Result<LaunchPlan, LibraryError> {
        let platform = self
            .find_platform(platform_id)?
            .ok_or_else(|| LaunchError::PlatformNotFound(platform_id.to_string()))?;
        let game = self.get_game(platform_id, game_id)?;
        launch::plan_launch(&game, &platform, emulator, core, &self.cfg).map_err(LibraryError::from)
    }

    /// Last recorded launch status for a game id.
    pub fn launch_status(&self, game_id: &str) -> Option<RunningGameStatus> {
        self.runner.status(game_id)
    }

    /// Set or clear a game's favorite flag through the sidecar.
    ///
    /// Returns the game as reconciled after the write.
    pub fn set_favorite(
        &self,
        platform_id: &str,
        game_id: &str,
        favorite: bool,
    ) -> Result<Game, LibraryError> {
        let platform = self.platform(platform_id)?;
        let game = self.get_game(platform_id, game_id)?;

        self.edit_sidecar(&platform, &game, |entry| {
            entry.favorite = Some(favorite);
        })?;

        self.cache
            .invalidate(&CacheKey::Catalog(platform_id.to_string()));
        self.get_game(platform_id, game_id)
    }

    /// Drop all cached state; the next reads re-scan everything.
    pub fn refresh(&self) {
        self.cache.clear();
    }

    fn record_play(&self, platform: &Platform, game: &Game) -> Result<(), LibraryError> {
        self.edit_sidecar(platform, game, |entry| {
            entry.play_count = Some(entry.play_count.unwrap_or(0) + 1);
            entry.last_played = Some(gamelist::play_stamp(Utc::now()));
        })
    }

    /// Shared write-back path: read the sidecar fresh, edit the entry for
    /// this game (appending one when absent), rewrite the whole document.
    fn edit_sidecar(
        &self,
        platform: &Platform,
        game: &Game,
        edit: impl FnOnce(&mut gamelist::GameEntry),
    ) -> Result<(), LibraryError> {
        let path = sidecar_path(platform);
        let mut entries = if path.exists() {
            gamelist::read_gamelist(&path)?
        } else {
            Vec::new()
        };

        let entry = gamelist::entry_for_file_mut(&mut entries, &game.file_name, &game.name);
        edit(entry);

        gamelist::write_gamelist(&path, &entries)?;
        Ok(())
    }

    fn platform(&self, platform_id: &str) -> Result<Platform, LibraryError> {
        self.find_platform(platform_id)?
            .ok_or_else(|| LibraryError::PlatformNotFound(platform_id.to_string()))
    }

    fn find_platform(&self, platform_id: &str) -> Result<Option<Platform>, LibraryError> {
        let platforms = self.list_platforms(false)?;
        Ok(platforms.iter().find(|p| p.id == platform_id).cloned())
    }
}

fn sidecar_path(platform: &Platform) -> PathBuf {
    platform.rom_directory.join(gamelist::GAMELIST_FILE)
}
