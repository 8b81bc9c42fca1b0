use crate::error::{ErrorKind, Result};
use derive_more::Display;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// External executables the media collaborators drive.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    #[display("ffmpeg")]
    Ffmpeg,
    #[display("ffprobe")]
    Ffprobe,
    #[display("yt-dlp")]
    YtDlp,
}
impl Tool {
    /// Finds the executable, preferring an explicitly configured path (which
    /// may itself be a bare name to look up on `PATH`).
    pub fn locate(self, explicit: Option<&Path>) -> Result<PathBuf> {
        let found = match explicit {
            Some(path) => which::which(path),
            None => which::which(self.to_string()),
        };
        match found {
            Ok(path) => {
                tracing::debug!(tool = %self, path = %path.display(), "Discovered tool");
                Ok(path)
            },
            Err(_) => {
                tracing::info!(tool = %self, "Tool not found");
                exn::bail!(ErrorKind::ToolNotFound(self.to_string()))
            },
        }
    }
}

/// Runs a prepared command to completion, turning a non-zero exit into
/// [`ErrorKind::ToolFailed`] carrying the tail of its stderr.
pub(crate) async fn run(tool: Tool, command: &mut Command) -> Result<Output> {
    command.kill_on_drop(true);
    let output = command.output().await.map_err(ErrorKind::Io)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr.trim().lines().last().unwrap_or_default();
        exn::bail!(ErrorKind::ToolFailed(format!("{tool} exited with {}: {tail}", output.status)));
    }
    Ok(output)
}
