//! # Single File Mode
//!
//! Compressione di un solo video, con output esplicito opzionale.
//!
//! ## Responsabilità:
//! - Verifica che l'input sia un video candidato
//! - Chiede se eliminare l'originale prima di iniziare
//! - Con `--list` mostra solo la riga di anteprima, senza toccare il file
//! - Applica la stessa politica di ritenzione del batch
//! - Stampa le dimensioni prima/dopo e l'esito

use crate::batch::path_resolver::PathResolver;
use crate::batch::task::{CompressionResult, FileTask, MediaFile};
use crate::batch::workflow::preview_line;
use crate::config::Config;
use crate::error::{CompressError, Phase};
use crate::file_manager::FileManager;
use crate::json_output::JsonMessage;
use crate::prompt::Prompter;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DELETE_QUESTION: &str = "Do you want to delete the original file?";

pub struct SingleFileJob {
    input: PathBuf,
    config: Config,
}

impl SingleFileJob {
    pub fn new(input: &Path, config: Config) -> Self {
        Self {
            input: input.to_path_buf(),
            config,
        }
    }

    /// The input as a one-entry candidate list, or empty when it is not a
    /// video to compress. Nothing is prompted or written.
    pub async fn list(&self) -> Result<Vec<MediaFile>, CompressError> {
        if !FileManager::is_candidate_path(&self.input) {
            info!("{} is not a video to compress", self.input.display());
            return Ok(Vec::new());
        }

        let size = self.input_size().await?;
        Ok(vec![MediaFile::new(self.input.clone(), size)])
    }

    pub fn print_preview(&self, files: &[MediaFile]) {
        if self.config.json_output {
            JsonMessage::preview(files).emit();
            return;
        }
        for (index, file) in files.iter().enumerate() {
            println!("{}", preview_line(index + 1, file.size, &file.name()));
        }
    }

    async fn input_size(&self) -> Result<u64, CompressError> {
        FileManager::file_size(&self.input)
            .await
            .map_err(|source| CompressError::SizeQuery {
                path: self.input.clone(),
                phase: Phase::Measuring,
                source,
            })
    }

    /// Compress the input file.
    ///
    /// Returns `None` when the output already existed and nothing was done.
    /// The original is deleted only for a smaller output and a "yes" answer.
    pub async fn run(&self, prompter: &mut dyn Prompter) -> Result<Option<CompressionResult>> {
        if !FileManager::is_candidate_path(&self.input) {
            return Err(CompressError::InvalidInput(format!(
                "{} is not a video to compress (supported: {})",
                self.input.display(),
                crate::file_manager::VIDEO_EXTENSIONS.join(", ")
            ))
            .into());
        }

        let size = self.input_size().await?;
        let output_path = PathResolver::single_output_path(&self.input, self.config.output_path.as_deref())?;

        let delete_original = prompter.confirm(DELETE_QUESTION)?;

        let task = FileTask::new(self.config.clone(), delete_original);
        let mut file = MediaFile::new(self.input.clone(), size);

        let result = match task.process_file(&mut file, &output_path).await {
            Ok(result) => result,
            Err(e) => {
                if self.config.json_output {
                    JsonMessage::file_error(self.input.clone(), &e).emit();
                }
                return Err(e.into());
            }
        };

        match result {
            Some(ref result) => self.report(result, delete_original),
            None if self.config.json_output => JsonMessage::FileSkipped {
                path: self.input.clone(),
                reason: "output already exists".to_string(),
            }
            .emit(),
            None => {}
        }

        Ok(result)
    }

    fn report(&self, result: &CompressionResult, delete_original: bool) {
        if self.config.json_output {
            JsonMessage::file_complete(result).emit();
            return;
        }

        println!("Original size: {:.2} MB", FileManager::to_megabytes(result.pre_size));
        println!("Compressed size: {:.2} MB", FileManager::to_megabytes(result.post_size));

        if result.kept {
            println!("Reduction: {:.2}%", result.reduction_percent().unwrap_or(0.0));
            info!("✅ Saved {}", result.output.display());
            if delete_original {
                info!("Deleted original {}", result.input.display());
            }
        } else {
            info!("⏩ Output was not smaller; original kept and marked not compressed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedAnswers;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rejects_non_video_without_prompting() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, b"text").unwrap();

        let job = SingleFileJob::new(&input, Config::default());
        let mut prompter = ScriptedAnswers::new([true]);

        let err = job.run(&mut prompter).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CompressError>(),
            Some(CompressError::InvalidInput(_))
        ));
        assert!(prompter.asked.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_already_compressed_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a compressed.mp4");
        fs::write(&input, b"video").unwrap();

        let job = SingleFileJob::new(&input, Config::default());
        assert!(job.run(&mut ScriptedAnswers::new([])).await.is_err());
    }

    #[tokio::test]
    async fn test_list_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("clip.mp4");
        fs::write(&input, vec![0u8; 2048]).unwrap();

        let job = SingleFileJob::new(&input, Config::default());
        let files = job.list().await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 2048);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_list_skips_non_candidates() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("clip compressed.mp4");
        fs::write(&input, b"video").unwrap();

        let files = SingleFileJob::new(&input, Config::default()).list().await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_existing_output_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.mov");
        fs::write(&input, b"video").unwrap();
        fs::write(dir.path().join("a compressed.mp4"), b"earlier").unwrap();

        let job = SingleFileJob::new(&input, Config::default());
        let mut prompter = ScriptedAnswers::new([true]);

        let result = job.run(&mut prompter).await.unwrap();

        assert!(result.is_none());
        assert_eq!(prompter.asked, vec![DELETE_QUESTION]);
        assert!(input.exists());
    }
}
