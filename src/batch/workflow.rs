//! # Batch Workflow Orchestrator
//!
//! Orchestratore del batch su una directory:
//! `Enumerating → Previewing → Confirming → {Aborted | Processing} → Reporting → Done`.
//!
//! ## Flusso di esecuzione:
//! 1. **Enumerating**: candidati ordinati per nome e loro dimensioni
//! 2. **Previewing**: elenco opzionale (indice, dimensione, nome)
//! 3. **Confirming**: senza un "sì" esplicito il batch termina senza toccare nulla
//! 4. **Processing**: un file alla volta; un errore non ferma il batch
//! 5. **Reporting**: rimisura gli output mantenuti e stampa il riepilogo
//!
//! ## Interruzione:
//! Il flag di cancellazione viene controllato all'inizio di ogni file, quindi
//! il file in corso completa sempre la propria sostituzione/rinomina.

use crate::batch::path_resolver::PathResolver;
use crate::batch::task::{CompressionResult, FileTask, MediaFile};
use crate::config::Config;
use crate::error::{CompressError, Phase};
use crate::file_manager::FileManager;
use crate::json_output::{JsonConfig, JsonMessage};
use crate::progress::{BatchSummary, ProgressManager};
use crate::prompt::Prompter;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const LIST_QUESTION: &str = "Do you want to list all the files?";
pub const CONTINUE_QUESTION: &str = "Do you want to continue?";

/// States of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Enumerating,
    Previewing,
    Confirming,
    Aborted,
    Processing,
    Reporting,
    Done,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared interrupt flag, set from the signal handler.
///
/// Also records the file being worked on, so a hard exit can say what to clean up.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
    in_flight: Arc<Mutex<Option<(PathBuf, PathBuf)>>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Record the input/output pair being worked on, `None` once it is settled
    pub fn set_in_flight(&self, pair: Option<(&Path, &Path)>) {
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = pair.map(|(input, output)| (input.to_path_buf(), output.to_path_buf()));
        }
    }

    pub fn in_flight(&self) -> Option<(PathBuf, PathBuf)> {
        self.in_flight.lock().ok().and_then(|slot| slot.clone())
    }

    /// What to check by hand after exiting in the middle of a file
    pub fn recovery_message(&self) -> Option<String> {
        let (input, output) = self.in_flight()?;
        let output_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        Some(format!(
            "Stopped while compressing {}: delete any hidden .compy-*.mp4 file in {}; \
             if both {} and {} exist, the original was not deleted yet",
            input.display(),
            output_dir.display(),
            input.display(),
            output.display()
        ))
    }
}

/// One preview row: 1-based index, size in MB and name
pub fn preview_line(index: usize, size: u64, name: &str) -> String {
    format!("{:>4}  {:>10.2} MB  {}", index, FileManager::to_megabytes(size), name)
}

/// How a batch run ended
#[derive(Debug)]
pub enum BatchOutcome {
    Aborted,
    Completed {
        summary: BatchSummary,
        results: Vec<CompressionResult>,
        interrupted: bool,
    },
}

/// Orchestratore principale del batch
pub struct BatchWorkflow {
    config: Config,
    input_dir: PathBuf,
    cancel: CancelFlag,
    state: BatchState,
}

impl BatchWorkflow {
    pub fn new(input_dir: &Path, config: Config, cancel: CancelFlag) -> Self {
        Self {
            config,
            input_dir: input_dir.to_path_buf(),
            cancel,
            state: BatchState::Enumerating,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn transition(&mut self, next: BatchState) {
        debug!("Batch state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// List candidates with their sizes; unreadable files are left out with a warning
    pub async fn enumerate(&self) -> Result<Vec<MediaFile>, CompressError> {
        let paths = FileManager::find_candidates(&self.input_dir, self.config.recursive)?;
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            match FileManager::file_size(&path).await {
                Ok(size) => files.push(MediaFile::new(path, size)),
                Err(source) => {
                    let err = CompressError::SizeQuery {
                        path: path.clone(),
                        phase: Phase::Enumerating,
                        source,
                    };
                    warn!("Skipping {}", err);
                }
            }
        }

        Ok(files)
    }

    /// Preview table: index, size in MB and name, one line per candidate
    pub fn preview_lines(&self, files: &[MediaFile]) -> Vec<String> {
        files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let name = file
                    .path
                    .strip_prefix(&self.input_dir)
                    .unwrap_or(file.path.as_path())
                    .display()
                    .to_string();
                preview_line(index + 1, file.size, &name)
            })
            .collect()
    }

    pub fn print_preview(&self, files: &[MediaFile]) {
        if self.config.json_output {
            JsonMessage::preview(files).emit();
        } else {
            for line in self.preview_lines(files) {
                println!("{}", line);
            }
        }
    }

    /// Run the whole batch
    pub async fn run(&mut self, prompter: &mut dyn Prompter) -> Result<BatchOutcome> {
        let start_time = Instant::now();

        self.transition(BatchState::Enumerating);
        let mut files = self.enumerate().await?;
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        self.emit_start(&files, total_size);

        if files.is_empty() {
            info!("No videos to compress in {}", self.input_dir.display());
            return self.finish(BatchSummary::new(0), Vec::new(), false, start_time).await;
        }

        self.transition(BatchState::Previewing);
        if prompter.confirm(LIST_QUESTION)? {
            self.print_preview(&files);
        }

        self.transition(BatchState::Confirming);
        if !prompter.confirm(CONTINUE_QUESTION)? {
            self.transition(BatchState::Aborted);
            if self.config.json_output {
                JsonMessage::Aborted.emit();
            } else {
                info!("Aborted, no files were touched");
            }
            return Ok(BatchOutcome::Aborted);
        }

        self.transition(BatchState::Processing);
        let (summary, results, interrupted) = self.process(&mut files).await?;

        self.finish(summary, results, interrupted, start_time).await
    }

    fn emit_start(&self, files: &[MediaFile], total_size: u64) {
        if self.config.json_output {
            JsonMessage::Start {
                input: self.input_dir.clone(),
                output_dir: self.config.output_path.clone(),
                total_files: files.len(),
                total_size,
                config: JsonConfig::from(&self.config),
            }
            .emit();
        } else {
            info!(
                "Found {} videos to compress in {} ({})",
                files.len(),
                self.input_dir.display(),
                FileManager::format_size(total_size)
            );
            if let Some(ref output_dir) = self.config.output_path {
                info!("Output directory: {}", output_dir.display());
            }
        }
    }

    /// Processa i file uno alla volta
    async fn process(
        &self,
        files: &mut [MediaFile],
    ) -> Result<(BatchSummary, Vec<CompressionResult>, bool), CompressError> {
        let progress = if self.config.json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new(files.len() as u64)
        };
        let task = FileTask::new(self.config.clone(), true);
        let mut summary = BatchSummary::new(files.len());
        let mut results = Vec::new();
        let mut interrupted = false;
        let total = files.len();

        for (index, file) in files.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Interrupted, {} of {} videos left untouched", total - index, total);
                interrupted = true;
                break;
            }

            let name = file.name();
            progress.set_message(&name);

            match self.process_one(&task, file).await {
                Ok(Some(result)) => {
                    summary.record(&result);
                    self.report_file(&result);
                    results.push(result);
                }
                Ok(None) => {
                    summary.record_skipped();
                    if self.config.json_output {
                        JsonMessage::FileSkipped {
                            path: file.path.clone(),
                            reason: "output already exists".to_string(),
                        }
                        .emit();
                    }
                }
                Err(e) if !e.is_recoverable() => {
                    progress.finish(&summary.format_summary());
                    return Err(e);
                }
                Err(e) => {
                    summary.record_failure();
                    if self.config.json_output {
                        JsonMessage::file_error(file.path.clone(), &e).emit();
                    } else {
                        error!("❌ {}: {}", name, e);
                    }
                }
            }

            progress.update(&name);
        }

        progress.finish(&summary.format_summary());
        Ok((summary, results, interrupted))
    }

    async fn process_one(&self, task: &FileTask, file: &mut MediaFile) -> Result<Option<CompressionResult>, CompressError> {
        let output_path = PathResolver::batch_output_path(
            &file.path,
            &self.input_dir,
            self.config.output_path.as_deref(),
        )?;

        self.cancel.set_in_flight(Some((file.path.as_path(), output_path.as_path())));
        let result = task.process_file(file, &output_path).await;
        self.cancel.set_in_flight(None);
        result
    }

    fn report_file(&self, result: &CompressionResult) {
        if self.config.json_output {
            JsonMessage::file_complete(result).emit();
            return;
        }

        let name = result.input.file_name().unwrap_or_default().to_string_lossy();
        if result.kept {
            info!(
                "✅ {}: {} -> {} ({:.1}% saved)",
                name,
                FileManager::format_size(result.pre_size),
                FileManager::format_size(result.post_size),
                result.reduction_percent().unwrap_or(0.0)
            );
        } else {
            info!(
                "⏩ {}: output was not smaller ({} -> {}), original kept and marked not compressed",
                name,
                FileManager::format_size(result.pre_size),
                FileManager::format_size(result.post_size)
            );
        }
    }

    async fn finish(
        &mut self,
        mut summary: BatchSummary,
        results: Vec<CompressionResult>,
        interrupted: bool,
        start_time: Instant,
    ) -> Result<BatchOutcome> {
        self.transition(BatchState::Reporting);
        summary.finalize(Self::remeasure(&results).await);
        self.print_final_stats(&summary, start_time.elapsed().as_secs_f64(), interrupted);

        self.transition(BatchState::Done);
        Ok(BatchOutcome::Completed {
            summary,
            results,
            interrupted,
        })
    }

    /// Size of everything this run left behind: kept outputs as they are on
    /// disk now, plus originals that were kept unchanged
    async fn remeasure(results: &[CompressionResult]) -> u64 {
        let mut total = 0;
        for result in results {
            if !result.kept {
                total += result.pre_size;
                continue;
            }
            match FileManager::file_size(&result.output).await {
                Ok(size) => total += size,
                Err(e) => {
                    warn!("Could not re-measure {}: {}", result.output.display(), e);
                    total += result.post_size;
                }
            }
        }
        total
    }

    /// Stampa statistiche finali
    fn print_final_stats(&self, summary: &BatchSummary, duration: f64, interrupted: bool) {
        if self.config.json_output {
            JsonMessage::complete(summary, duration, interrupted).emit();
            return;
        }

        info!("=== Compression Complete ===");
        info!("Candidates found: {}", summary.candidates);
        info!("Compressed: {}", summary.compressed);
        info!("Not improved (kept original): {}", summary.not_improved);
        info!("Skipped: {}", summary.skipped);
        info!("Failed: {}", summary.failed);

        println!("Original size: {:.2} MB", FileManager::to_megabytes(summary.original_total));
        println!("Compressed size: {:.2} MB", FileManager::to_megabytes(summary.compressed_total));
        println!("Reduction: {:.2}%", summary.reduction_percent());

        if interrupted {
            warn!("Run was interrupted; re-run compy on the same directory to continue");
        }
    }
}
