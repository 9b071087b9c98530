//! Synchronous subprocess helpers
//!
//! Every command group shells out through these. A spawn failure from a
//! missing binary becomes a dependency error; a non-zero exit surfaces the
//! tool's stderr verbatim before the error propagates.

use std::io;
use std::process::{Command, ExitStatus, Output};

use thiserror::Error;
use tracing::debug;
use which::which;

/// Errors from invoking external tools
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("required tool not found: {0}")]
    ToolMissing(String),

    #[error("{tool} exited with {status}")]
    ToolFailed { tool: String, status: ExitStatus },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
}

/// Check whether a tool is on PATH
pub fn is_installed(tool: &str) -> bool {
    which(tool).is_ok()
}

/// Run a command and capture its output without checking the exit status
pub fn run_capture(mut cmd: Command, tool: &str) -> Result<Output, ExecError> {
    debug!(?cmd, "running");
    cmd.output().map_err(|e| spawn_error(tool, e))
}

/// Run a command, capture its output, and require a zero exit status.
/// On failure the tool's stderr is echoed verbatim.
pub fn run_checked(cmd: Command, tool: &str) -> Result<Output, ExecError> {
    let output = run_capture(cmd, tool)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            eprint!("{stderr}");
        }
        return Err(ExecError::ToolFailed {
            tool: tool.to_string(),
            status: output.status,
        });
    }

    Ok(output)
}

/// Run a command with inherited stdio (editors, interactive tools)
pub fn run_interactive(mut cmd: Command, tool: &str) -> Result<ExitStatus, ExecError> {
    debug!(?cmd, "running interactively");
    cmd.status().map_err(|e| spawn_error(tool, e))
}

fn spawn_error(tool: &str, err: io::Error) -> ExecError {
    if err.kind() == io::ErrorKind::NotFound {
        ExecError::ToolMissing(tool.to_string())
    } else {
        ExecError::Spawn {
            tool: tool.to_string(),
            source: err,
        }
    }
}

/// Probe a tool's version: first non-empty line of stdout, falling back to
/// stderr (nginx, among others, prints its version there). `None` when the
/// tool is absent or the probe fails.
pub fn tool_version(tool: &str, args: &[&str]) -> Option<String> {
    let mut cmd = Command::new(tool);
    cmd.args(args);

    let output = run_capture(cmd, tool).ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) {
        return Some(line.trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
}
