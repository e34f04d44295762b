//! Process execution and per-launch status tracking.
//!
//! Spawns the planned command detached from the caller and watches its exit
//! on a background thread. Callers only ever see the last recorded
//! [`RunningGameStatus`] through a non-blocking read.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use romdeck_core::launch::{LaunchPlan, RunningGameStatus};

use crate::error::ProcessError;

struct StatusEntry {
    /// Launch sequence number. A watcher thread from a superseded launch
    /// must not overwrite the status of a newer one.
    seq: u64,
    status: RunningGameStatus,
}

#[derive(Default)]
pub struct ProcessRunner {
    statuses: Arc<Mutex<HashMap<String, StatusEntry>>>,
    next_seq: AtomicU64,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the plan's process and return immediately.
    ///
    /// The status is recorded before spawning, flipped to running on
    /// success, and finalized by the watcher thread when the child exits.
    /// A spawn failure is recorded in the status and also returned.
    pub fn launch(
        &self,
        game_id: &str,
        game_name: &str,
        plan: &LaunchPlan,
    ) -> Result<(), ProcessError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.record(game_id, seq, RunningGameStatus::pending());

        if let Some(info_path) = &plan.game_info_path {
            write_game_info(info_path, game_id, game_name, plan)?;
        }

        let spawned = Command::new(&plan.executable)
            .args(&plan.arguments)
            .current_dir(&plan.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.update(game_id, seq, |status| {
                    status.mark_failed(format!("spawn failed: {source}"))
                });
                return Err(ProcessError::Spawn {
                    command: plan.executable.clone(),
                    source,
                });
            }
        };

        self.update(game_id, seq, |status| status.mark_running());
        log::debug!("Launched '{game_name}' as pid {}", child.id());

        let statuses = self.statuses.clone();
        let game_id = game_id.to_string();
        std::thread::spawn(move || {
            let outcome = child.wait();
            let mut map = lock(&statuses);
            let Some(entry) = map.get_mut(&game_id) else {
                return;
            };
            if entry.seq != seq {
                return;
            }
            match outcome {
                Ok(exit) => entry.status.mark_exited(exit.code()),
                Err(e) => entry.status.mark_failed(format!("wait failed: {e}")),
            }
        });

        Ok(())
    }

    /// Last recorded status for a game id, if it was ever launched.
    pub fn status(&self, game_id: &str) -> Option<RunningGameStatus> {
        lock(&self.statuses)
            .get(game_id)
            .map(|entry| entry.status.clone())
    }

    fn record(&self, game_id: &str, seq: u64, status: RunningGameStatus) {
        lock(&self.statuses).insert(game_id.to_string(), StatusEntry { seq, status });
    }

    fn update(&self, game_id: &str, seq: u64, f: impl FnOnce(&mut RunningGameStatus)) {
        let mut map = lock(&self.statuses);
        if let Some(entry) = map.get_mut(game_id) {
            if entry.seq == seq {
                f(&mut entry.status);
            }
        }
    }
}

/// The per-launch info file some command templates reference.
fn write_game_info(
    path: &std::path::Path,
    game_id: &str,
    game_name: &str,
    plan: &LaunchPlan,
) -> Result<(), ProcessError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "id={game_id}")?;
    writeln!(file, "name={game_name}")?;
    writeln!(file, "rom={}", plan.rom_path.display())?;
    writeln!(file, "emulator={}", plan.selected_emulator)?;
    if let Some(core) = &plan.selected_core {
        writeln!(file, "core={core}")?;
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
