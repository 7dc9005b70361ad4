//! # Compy Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom con fase e file coinvolto
//! - `file_manager`: Classificazione dei file e discovery dei candidati
//! - `tools`: Risoluzione e verifica dei tool esterni
//! - `video_processor`: Invocazione di transcoder, probe e copia metadata
//! - `batch`: Workflow batch, modalità file singolo e politica di ritenzione
//! - `prompt`: Domande sì/no prima delle operazioni irreversibili
//! - `progress`: Progress bar e riepilogo del batch
//! - `json_output`: Eventi JSON per l'uso da script
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use compy::{BatchWorkflow, CancelFlag, Config, StdinPrompter};
//!
//! let mut workflow = BatchWorkflow::new(&dir, Config::default(), CancelFlag::new());
//! workflow.run(&mut StdinPrompter).await?;
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod progress;
pub mod prompt;
pub mod tools;
pub mod utils;
pub mod video_processor;

pub use batch::{BatchOutcome, BatchWorkflow, CancelFlag, CompressionResult, SingleFileJob};
pub use config::Config;
pub use error::CompressError;
pub use file_manager::{FileManager, VIDEO_EXTENSIONS};
pub use progress::BatchSummary;
pub use prompt::{FixedAnswer, Prompter, ScriptedAnswers, StdinPrompter};
pub use video_processor::VideoProcessor;
