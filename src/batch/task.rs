//! # File Task Module
//!
//! Worker per la compressione di un singolo file: compressione, copia dei
//! metadata, misura delle dimensioni e decisione di ritenzione.
//!
//! ## Politica di ritenzione:
//! - Confronto sui byte reali, mai sui MB arrotondati
//! - `output < input`: l'output viene salvato, l'originale eliminato
//! - `output >= input`: output scartato, originale rinominato "not compressed"
//!
//! ## Sicurezza operazioni:
//! - Il transcoder scrive su un file temporaneo nascosto accanto all'output
//! - L'originale viene eliminato solo dopo che l'output esiste al suo posto
//! - Un errore a metà della sostituzione riporta quale file rimuovere a mano

use crate::config::Config;
use crate::error::{CompressError, Phase};
use crate::file_manager::{FileManager, MediaKind};
use crate::batch::path_resolver::{PathResolver, OUTPUT_EXTENSION};
use crate::utils::format_duration;
use crate::video_processor::VideoProcessor;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Processing state of a media file; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionState {
    Pending,
    Compressing,
    Compressed,
    Skipped,
    Failed,
}

impl CompressionState {
    pub fn can_advance_to(self, next: CompressionState) -> bool {
        match self {
            // A file can be skipped or fail before compressing, but not end up compressed
            CompressionState::Pending => {
                next == CompressionState::Compressing || (next.is_terminal() && next != CompressionState::Compressed)
            }
            CompressionState::Compressing => next.is_terminal(),
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Compressed | Self::Skipped | Self::Failed)
    }
}

impl fmt::Display for CompressionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionState::Pending => write!(f, "Pending"),
            CompressionState::Compressing => write!(f, "Compressing"),
            CompressionState::Compressed => write!(f, "Compressed"),
            CompressionState::Skipped => write!(f, "Skipped"),
            CompressionState::Failed => write!(f, "Failed"),
        }
    }
}

/// A file discovered during enumeration
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size: u64,
    pub kind: MediaKind,
    state: CompressionState,
}

impl MediaFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        let kind = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(FileManager::classify)
            .unwrap_or(MediaKind::Other);

        Self {
            path,
            size,
            kind,
            state: CompressionState::Pending,
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .to_string()
    }

    pub fn state(&self) -> CompressionState {
        self.state
    }

    pub fn advance(&mut self, next: CompressionState) -> Result<(), CompressError> {
        if !self.state.can_advance_to(next) {
            return Err(CompressError::StateTransition {
                path: self.path.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("{}: {} -> {}", self.name(), self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Outcome of one compression attempt that reached the retention step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pre_size: u64,
    pub post_size: u64,
    /// Whether the compressed output replaced the original
    pub kept: bool,
}

impl CompressionResult {
    pub fn reduction_percent(&self) -> Option<f64> {
        FileManager::reduction(self.pre_size, self.post_size)
    }
}

/// The retention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    ReplaceOriginal,
    KeepOriginal,
}

impl Retention {
    /// Only a strictly smaller output replaces its original
    pub fn decide(input_size: u64, output_size: u64) -> Self {
        if output_size < input_size {
            Retention::ReplaceOriginal
        } else {
            Retention::KeepOriginal
        }
    }
}

/// Worker per elaborazione singoli file
pub struct FileTask {
    video_processor: VideoProcessor,
    /// Delete the original once a smaller output is in place
    delete_original: bool,
}

impl FileTask {
    pub fn new(config: Config, delete_original: bool) -> Self {
        Self {
            video_processor: VideoProcessor::new(config),
            delete_original,
        }
    }

    /// Process one file into `output_path`.
    ///
    /// Returns `Ok(None)` when the file was skipped before compressing.
    /// Errors leave the file in the `Failed` state; the original is never
    /// removed on an error path.
    pub async fn process_file(
        &self,
        file: &mut MediaFile,
        output_path: &Path,
    ) -> Result<Option<CompressionResult>, CompressError> {
        if output_path.exists() {
            warn!(
                "⏩ {} skipped: {} already exists (remove it to compress again)",
                file.name(),
                output_path.display()
            );
            file.advance(CompressionState::Skipped)?;
            return Ok(None);
        }

        file.advance(CompressionState::Compressing)?;

        match self.compress_and_retain(file, output_path).await {
            Ok(result) => {
                let next = if result.kept {
                    CompressionState::Compressed
                } else {
                    CompressionState::Skipped
                };
                file.advance(next)?;
                Ok(Some(result))
            }
            Err(e) => {
                file.advance(CompressionState::Failed)?;
                Err(e)
            }
        }
    }

    async fn compress_and_retain(&self, file: &MediaFile, output_path: &Path) -> Result<CompressionResult, CompressError> {
        let input_path = file.path.as_path();
        let pre_size = FileManager::file_size(input_path)
            .await
            .map_err(|source| CompressError::SizeQuery {
                path: input_path.to_path_buf(),
                phase: Phase::Measuring,
                source,
            })?;

        self.log_start(file, pre_size).await;

        PathResolver::ensure_parent_dirs(output_path).await?;
        let output_dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        // Hidden, so an interrupted run never leaves a new candidate behind
        let temp_output = tempfile::Builder::new()
            .prefix(".compy-")
            .suffix(&format!(".{}", OUTPUT_EXTENSION))
            .tempfile_in(output_dir)
            .map_err(|e| CompressError::Retention {
                path: input_path.to_path_buf(),
                detail: format!("could not create a temporary file in {}: {}", output_dir.display(), e),
            })?
            .into_temp_path();

        // On error the temporary output is dropped, which deletes the partial file
        self.video_processor.compress(input_path, &temp_output).await?;

        if let Err(e) = self.video_processor.clone_metadata(input_path, &temp_output).await {
            warn!("⚠️ {} (continuing without copied metadata)", e);
        }

        let post_size = FileManager::file_size(&temp_output)
            .await
            .map_err(|source| CompressError::SizeQuery {
                path: output_path.to_path_buf(),
                phase: Phase::Measuring,
                source,
            })?;

        let retention = Retention::decide(pre_size, post_size);
        debug!(
            "Retention for {}: {:?} (input: {} bytes, output: {} bytes)",
            file.name(),
            retention,
            pre_size,
            post_size
        );

        match retention {
            Retention::ReplaceOriginal => {
                if let Err(e) = self.video_processor.set_creation_date(&temp_output).await {
                    warn!("⚠️ {} (creation date left as written by the transcoder)", e);
                }
                Self::copy_permissions(input_path, &temp_output).await;

                temp_output
                    .persist_noclobber(output_path)
                    .map_err(|e| CompressError::Retention {
                        path: input_path.to_path_buf(),
                        detail: format!(
                            "could not save the compressed output as {}: {} (original left untouched)",
                            output_path.display(),
                            e.error
                        ),
                    })?;

                if self.delete_original {
                    Self::remove_original(input_path, output_path).await?;
                }
            }
            Retention::KeepOriginal => {
                if let Err(e) = temp_output.close() {
                    warn!("Could not remove discarded output for {}: {}", file.name(), e);
                }
                Self::mark_not_compressed(input_path).await?;
            }
        }

        Ok(CompressionResult {
            input: input_path.to_path_buf(),
            output: output_path.to_path_buf(),
            pre_size,
            post_size,
            kept: retention == Retention::ReplaceOriginal,
        })
    }

    /// Give the output the original's mode; temporary files start out owner-only
    async fn copy_permissions(input_path: &Path, output_path: &Path) {
        let result = match tokio::fs::metadata(input_path).await {
            Ok(metadata) => tokio::fs::set_permissions(output_path, metadata.permissions()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Could not copy permissions of {}: {}", input_path.display(), e);
        }
    }

    /// Delete the original, but only once its replacement exists on disk
    async fn remove_original(input_path: &Path, output_path: &Path) -> Result<(), CompressError> {
        let replacement_ok = tokio::fs::metadata(output_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        if !replacement_ok {
            return Err(CompressError::Retention {
                path: input_path.to_path_buf(),
                detail: format!(
                    "{} is missing after saving it; the original was kept",
                    output_path.display()
                ),
            });
        }

        tokio::fs::remove_file(input_path)
            .await
            .map_err(|e| CompressError::Retention {
                path: input_path.to_path_buf(),
                detail: format!(
                    "compressed copy saved as {} but the original could not be deleted ({}); delete it manually",
                    output_path.display(),
                    e
                ),
            })?;

        debug!("Deleted original {}", input_path.display());
        Ok(())
    }

    /// Rename the original so later runs leave it alone
    async fn mark_not_compressed(input_path: &Path) -> Result<PathBuf, CompressError> {
        let renamed = PathResolver::not_compressed_path(input_path)?;

        if renamed.exists() {
            return Err(CompressError::Retention {
                path: input_path.to_path_buf(),
                detail: format!(
                    "compression did not help, but {} already exists; original left under its name",
                    renamed.display()
                ),
            });
        }

        tokio::fs::rename(input_path, &renamed)
            .await
            .map_err(|e| CompressError::Retention {
                path: input_path.to_path_buf(),
                detail: format!("compression did not help, but renaming to {} failed: {}", renamed.display(), e),
            })?;

        Ok(renamed)
    }

    async fn log_start(&self, file: &MediaFile, size: u64) {
        match self.video_processor.probe_duration(&file.path).await {
            Ok(seconds) => info!(
                "🎬 Compressing {} ({}, {})",
                file.name(),
                FileManager::format_size(size),
                format_duration(Duration::from_secs_f64(seconds))
            ),
            Err(e) => {
                debug!("Duration unavailable: {}", e);
                info!("🎬 Compressing {} ({})", file.name(), FileManager::format_size(size));
            }
        }
    }
}
