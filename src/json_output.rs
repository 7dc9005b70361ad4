//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso da script.
//!
//! ## Tipi di messaggi:
//! - `start`: Candidati trovati e configurazione
//! - `preview`: Elenco dei candidati (al posto della tabella testuale)
//! - `file_complete`: Fine elaborazione di un file
//! - `file_skipped` / `file_error`: File saltato o fallito
//! - `aborted`: L'utente non ha confermato
//! - `complete`: Riepilogo finale
//! - `error`: Errore fatale

use crate::batch::task::{CompressionResult, MediaFile};
use crate::config::Config;
use crate::error::CompressError;
use crate::progress::BatchSummary;
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        input: PathBuf,
        output_dir: Option<PathBuf>,
        total_files: usize,
        total_size: u64,
        config: JsonConfig,
    },
    Preview {
        files: Vec<JsonPreviewEntry>,
    },
    FileComplete {
        path: PathBuf,
        output: PathBuf,
        original_size: u64,
        compressed_size: u64,
        reduction_percent: Option<f64>,
        kept: bool,
    },
    FileSkipped {
        path: PathBuf,
        reason: String,
    },
    FileError {
        path: PathBuf,
        phase: Option<String>,
        message: String,
    },
    Aborted,
    Complete {
        #[serde(flatten)]
        summary: BatchSummary,
        reduction_percent: f64,
        duration_seconds: f64,
        interrupted: bool,
    },
    Error {
        message: String,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize)]
pub struct JsonConfig {
    pub video_codec: String,
    pub video_crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
pub struct JsonPreviewEntry {
    pub index: usize,
    pub path: PathBuf,
    pub size: u64,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn preview(files: &[MediaFile]) -> Self {
        Self::Preview {
            files: files
                .iter()
                .enumerate()
                .map(|(index, file)| JsonPreviewEntry {
                    index: index + 1,
                    path: file.path.clone(),
                    size: file.size,
                })
                .collect(),
        }
    }

    pub fn file_complete(result: &CompressionResult) -> Self {
        Self::FileComplete {
            path: result.input.clone(),
            output: result.output.clone(),
            original_size: result.pre_size,
            compressed_size: result.post_size,
            reduction_percent: result.reduction_percent(),
            kept: result.kept,
        }
    }

    pub fn file_error(path: PathBuf, error: &CompressError) -> Self {
        Self::FileError {
            path,
            phase: error.phase().map(|phase| phase.to_string()),
            message: error.to_string(),
        }
    }

    pub fn complete(summary: &BatchSummary, duration_seconds: f64, interrupted: bool) -> Self {
        Self::Complete {
            summary: summary.clone(),
            reduction_percent: summary.reduction_percent(),
            duration_seconds,
            interrupted,
        }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            video_crf: config.video_crf,
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            recursive: config.recursive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Phase;

    #[test]
    fn test_messages_are_tagged() {
        let json = serde_json::to_value(JsonMessage::Aborted).unwrap();
        assert_eq!(json["type"], "aborted");

        let err = CompressError::ExternalProcess {
            tool: "ffmpeg".into(),
            phase: Phase::Compressing,
            path: PathBuf::from("a.mp4"),
            detail: "exit status: 1".into(),
        };
        let json = serde_json::to_value(JsonMessage::file_error(PathBuf::from("a.mp4"), &err)).unwrap();
        assert_eq!(json["type"], "file_error");
        assert_eq!(json["phase"], "compressing");
    }

    #[test]
    fn test_complete_flattens_summary() {
        let mut summary = BatchSummary::new(2);
        summary.record_failure();

        let json = serde_json::to_value(JsonMessage::complete(&summary, 1.5, false)).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["candidates"], 2);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["reduction_percent"], 0.0);
        assert_eq!(json["original_total"], 0);
    }
}
