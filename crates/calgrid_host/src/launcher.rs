use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A day picked on the grid. `month` is zero-based like [`calgrid_core::CalendarMonth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySelection {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

/// Opens the main application on a selected day. Platform adapters implement this.
pub trait AppLauncher: Send + Sync {
    fn launch(&self, selection: &DaySelection) -> Result<()>;
}

/// Spawns an external program with the selection passed as arguments.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self, selection: &DaySelection) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--selected-day")
            .arg(selection.day.to_string())
            .arg("--selected-month")
            .arg(selection.month.to_string())
            .arg("--selected-year")
            .arg(selection.year.to_string());
        command
    }

    /// Starts the program and hands the child to a thread that waits on it,
    /// so a long-running host does not collect zombies.
    fn spawn(&self, selection: &DaySelection) -> Result<JoinHandle<Option<ExitStatus>>> {
        let mut child = self
            .command(selection)
            .spawn()
            .with_context(|| format!("failed to launch `{}`", self.program.display()))?;
        let pid = child.id();
        tracing::debug!(pid, ?selection, "launched application");
        std::thread::Builder::new()
            .name(format!("calgrid-launch-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => {
                    tracing::debug!(pid, %status, "launched application exited");
                    Some(status)
                }
                Err(err) => {
                    tracing::warn!(pid, %err, "unable to reap launched application");
                    None
                }
            })
            .context("failed to spawn launcher reaper thread")
    }
}

impl AppLauncher for CommandLauncher {
    fn launch(&self, selection: &DaySelection) -> Result<()> {
        self.spawn(selection).map(drop)
    }
}
