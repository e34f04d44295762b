pub mod game;
pub mod launch;
pub mod platform;
pub mod util;

pub use game::Game;
pub use launch::{LaunchPlan, LaunchState, RunningGameStatus};
pub use platform::{Emulator, EmulatorCore, Platform};
