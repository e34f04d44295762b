pub mod cache;
pub mod catalog;
pub mod error;
pub mod gamelist;
pub mod launch;
pub mod library;
pub mod media;
pub mod runner;
pub mod settings;
pub mod systems;

pub use cache::{CacheKey, CatalogCache};
pub use error::{ConfigError, GamelistError, LaunchError, LibraryError, ProcessError};
pub use library::GameLibrary;
pub use settings::LibraryConfig;

pub use romdeck_core::game::Game;
pub use romdeck_core::launch::{LaunchPlan, LaunchState, RunningGameStatus};
pub use romdeck_core::platform::{Emulator, EmulatorCore, Platform};
