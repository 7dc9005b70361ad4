//! # Batch Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `workflow`: Orchestratore del batch su una directory
//! - `single`: Modalità file singolo
//! - `task`: Worker per singoli file e politica di ritenzione
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod path_resolver;
pub mod single;
pub mod task;
pub mod workflow;

pub use path_resolver::PathResolver;
pub use single::SingleFileJob;
pub use task::{CompressionResult, CompressionState, FileTask, MediaFile, Retention};
pub use workflow::{BatchOutcome, BatchState, BatchWorkflow, CancelFlag};
