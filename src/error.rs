//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori fatali (dipendenze, argomenti, input) da errori per-file
//! - Ogni errore per-file riporta il nome del file e la fase in cui è avvenuto
//!
//! ## Categorie di errori:
//! - `MissingDependency`: transcoder assente, fatale prima di toccare qualsiasi file
//! - `ToolProbe`: il transcoder esiste ma il probe `-version` è fallito
//! - `MissingArgument` / `InvalidInput`: errori di input, fatali
//! - `ExternalProcess`: transcoder o tool esterno con exit status non zero
//! - `SizeQuery`: stat del filesystem fallito
//! - `Metadata`: copia dei tag fallita (solo warning)
//! - `Retention`: sostituzione/rinomina fallita, con istruzioni di recupero
//!
//! ## Esempio:
//! ```rust,ignore
//! if !tool_exists {
//!     return Err(CompressError::MissingDependency("ffmpeg".to_string()));
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

/// Step of the per-file pipeline an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enumerating,
    Compressing,
    CloningMetadata,
    Measuring,
    Retaining,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Enumerating => write!(f, "enumerating"),
            Phase::Compressing => write!(f, "compressing"),
            Phase::CloningMetadata => write!(f, "cloning metadata"),
            Phase::Measuring => write!(f, "measuring"),
            Phase::Retaining => write!(f, "retaining"),
        }
    }
}

/// Custom error types for video compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dependency missing: {0} is not installed or not in PATH")]
    MissingDependency(String),

    #[error("Could not verify {tool}: {reason}")]
    ToolProbe { tool: String, reason: String },

    #[error("No input provided")]
    MissingArgument,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{tool} failed while {phase} {}: {detail}", path.display())]
    ExternalProcess {
        tool: String,
        phase: Phase,
        path: PathBuf,
        detail: String,
    },

    #[error("Could not read the size of {} while {phase}: {source}", path.display())]
    SizeQuery {
        path: PathBuf,
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata copy failed for {}: {detail}", path.display())]
    Metadata { path: PathBuf, detail: String },

    #[error("Could not finish {}: {detail}", path.display())]
    Retention { path: PathBuf, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state change for {}: {from} -> {to}", path.display())]
    StateTransition {
        path: PathBuf,
        from: String,
        to: String,
    },
}

impl CompressError {
    /// Phase of the per-file pipeline, if the error belongs to one
    pub fn phase(&self) -> Option<Phase> {
        match self {
            CompressError::ExternalProcess { phase, .. } | CompressError::SizeQuery { phase, .. } => Some(*phase),
            CompressError::Metadata { .. } => Some(Phase::CloningMetadata),
            CompressError::Retention { .. } => Some(Phase::Retaining),
            _ => None,
        }
    }

    /// Whether the batch can carry on with the next file after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CompressError::MissingDependency(_)
                | CompressError::ToolProbe { .. }
                | CompressError::MissingArgument
                | CompressError::InvalidInput(_)
                | CompressError::Config(_)
        )
    }
}
