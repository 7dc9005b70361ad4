//! # External Tool Resolution
//!
//! Finds the external collaborators (transcoder, metadata tool, duration
//! probe) and verifies the transcoder actually runs before any file is
//! touched.

use crate::error::CompressError;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Resolves external commands either as explicit paths or through `PATH`
pub struct ToolResolver;

impl ToolResolver {
    /// Resolve a command to an existing executable path
    pub fn resolve(command: &str) -> Option<PathBuf> {
        let as_path = Path::new(command);
        if as_path.components().count() > 1 || as_path.is_absolute() {
            return as_path.is_file().then(|| as_path.to_path_buf());
        }

        Self::find_in_system_path(command)
    }

    /// Check if a command can be resolved
    pub fn is_available(command: &str) -> bool {
        Self::resolve(command).is_some()
    }

    /// Find tool in system PATH
    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let tool_with_ext = if cfg!(windows) && Path::new(tool_name).extension().is_none() {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        };

        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Run `<transcoder> -version` and return the first line of its output.
    ///
    /// A binary that cannot be spawned because it does not exist is a
    /// `MissingDependency`; any other failure is a `ToolProbe` error.
    pub async fn probe_transcoder(command: &str) -> Result<String, CompressError> {
        let output = Command::new(command)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CompressError::MissingDependency(command.to_string()),
                _ => CompressError::ToolProbe {
                    tool: command.to_string(),
                    reason: e.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(CompressError::ToolProbe {
                tool: command.to_string(),
                reason: format!("`{} -version` exited with {}", command, output.status),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!("Transcoder probe ok: {}", version);

        Ok(version)
    }

    /// Installation hint for a missing tool
    pub fn install_hint(tool_name: &str) -> String {
        let base = Path::new(tool_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(tool_name);

        if cfg!(target_os = "macos") {
            match base {
                "ffmpeg" | "ffprobe" => "brew install ffmpeg".to_string(),
                "exiftool" => "brew install exiftool".to_string(),
                _ => format!("brew install {}", base),
            }
        } else if cfg!(target_os = "linux") {
            match base {
                "ffmpeg" | "ffprobe" => "sudo apt-get install ffmpeg".to_string(),
                "exiftool" => "sudo apt-get install libimage-exiftool-perl".to_string(),
                _ => format!("sudo apt-get install {}", base),
            }
        } else {
            let package = if base == "ffprobe" { "ffmpeg" } else { base };
            format!("install {} and make sure it is in PATH", package)
        }
    }
}
