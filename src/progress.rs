//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la barra di progresso e il riepilogo del batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Barra di progresso `indicatif` sui candidati
//! - `BatchSummary`: Aggregato costruito file per file durante il batch
//!
//! ## Statistiche tracciate:
//! - **candidates**: Video candidati trovati durante l'enumerazione
//! - **compressed**: Output mantenuti, originali eliminati
//! - **not_improved**: Output scartati, originali rinominati "not compressed"
//! - **skipped**: File saltati prima della compressione
//! - **failed**: File falliti (errori recuperabili)
//! - **original_total / compressed_total**: Byte prima e dopo
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(files.len() as u64);
//! let mut summary = BatchSummary::new(files.len());
//!
//! summary.record(&result);
//! progress.update("a.mp4");
//!
//! progress.finish(&summary.format_summary());
//! ```

use crate::batch::task::CompressionResult;
use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages the progress bar over the candidate list
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A progress manager that never draws, for JSON mode
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show which file is being worked on
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Mark one file done
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Aggregate of one batch run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub candidates: usize,
    pub compressed: usize,
    pub not_improved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub original_total: u64,
    pub compressed_total: u64,
}

impl BatchSummary {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    /// Account for one compression attempt that reached the retention step
    pub fn record(&mut self, result: &CompressionResult) {
        self.original_total += result.pre_size;
        if result.kept {
            self.compressed += 1;
            self.compressed_total += result.post_size;
        } else {
            // The original stays, so it counts unchanged on both sides
            self.not_improved += 1;
            self.compressed_total += result.pre_size;
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Replace the compressed total with a fresh measurement taken after the run
    pub fn finalize(&mut self, compressed_total: u64) {
        self.compressed_total = compressed_total;
    }

    pub fn processed(&self) -> usize {
        self.compressed + self.not_improved + self.skipped + self.failed
    }

    /// Percentage reduction; zero when nothing was measured
    pub fn reduction_percent(&self) -> f64 {
        FileManager::reduction(self.original_total, self.compressed_total).unwrap_or(0.0)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Compressed: {} | Not improved: {} | Skipped: {} | Failed: {} | {} -> {} ({:.2}%)",
            self.compressed,
            self.not_improved,
            self.skipped,
            self.failed,
            FileManager::format_size(self.original_total),
            FileManager::format_size(self.compressed_total),
            self.reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(pre_size: u64, post_size: u64, kept: bool) -> CompressionResult {
        CompressionResult {
            input: PathBuf::from("a.mp4"),
            output: PathBuf::from("a compressed.mp4"),
            pre_size,
            post_size,
            kept,
        }
    }

    #[test]
    fn test_empty_summary_reports_zero() {
        let summary = BatchSummary::new(0);
        assert_eq!(summary.reduction_percent(), 0.0);
        assert!(summary.format_summary().contains("(0.00%)"));
    }

    #[test]
    fn test_record_kept_and_not_improved() {
        let mut summary = BatchSummary::new(3);
        summary.record(&result(1000, 500, true));
        summary.record(&result(1000, 1200, false));
        summary.record_failure();

        assert_eq!(summary.compressed, 1);
        assert_eq!(summary.not_improved, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.original_total, 2000);
        assert_eq!(summary.compressed_total, 1500);
        assert_eq!(summary.reduction_percent(), 25.0);
    }

    #[test]
    fn test_finalize_overrides_compressed_total() {
        let mut summary = BatchSummary::new(1);
        summary.record(&result(1000, 500, true));
        assert_eq!(summary.reduction_percent(), 50.0);

        summary.finalize(400);
        assert_eq!(summary.reduction_percent(), 60.0);
    }
}
