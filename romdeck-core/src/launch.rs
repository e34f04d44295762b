//! Launch plans and per-launch process status.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fully-resolved launch invocation. Constructed fresh per launch request,
/// never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub executable: String,
    /// Arguments in order, already unquoted into individual tokens.
    pub arguments: Vec<String>,
    pub working_directory: PathBuf,
    /// Absolute, normalized ROM path the command was built around.
    pub rom_path: PathBuf,
    pub selected_emulator: String,
    pub selected_core: Option<String>,
    /// Path the runner writes the per-launch game info file to, when the
    /// command template references one.
    pub game_info_path: Option<PathBuf>,
}

/// Lifecycle of a launched game process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LaunchState {
    /// Plan accepted, process not spawned yet.
    Pending,
    Running,
    Exited { code: Option<i32> },
    Failed { error: String },
}

/// Per-launch record, keyed by game id. Overwritten by the next launch of
/// the same game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningGameStatus {
    #[serde(flatten)]
    pub state: LaunchState,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl RunningGameStatus {
    pub fn pending() -> Self {
        Self {
            state: LaunchState::Pending,
            started_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LaunchState::Pending | LaunchState::Running)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            LaunchState::Exited { code } => code,
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LaunchState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Transition to `Running`. Valid only from `Pending`; later states win.
    pub fn mark_running(&mut self) {
        if self.state == LaunchState::Pending {
            self.state = LaunchState::Running;
        }
    }

    /// Transition to `Exited` and stamp the close time.
    pub fn mark_exited(&mut self, code: Option<i32>) {
        self.state = LaunchState::Exited { code };
        self.closed_at = Some(Utc::now());
    }

    /// Transition to `Failed` and stamp the close time.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = LaunchState::Failed {
            error: error.into(),
        };
        self.closed_at = Some(Utc::now());
    }
}
