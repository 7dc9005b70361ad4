//! # Compy - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente
//! - Creazione della configurazione e scelta della modalità (file singolo o batch)
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, output, crf, flag)
//! 2. Configura il logging su stderr (INFO, DEBUG con `--verbose`, o `RUST_LOG`)
//! 3. Carica la configurazione da file e applica le opzioni CLI
//! 4. Verifica il transcoder prima di toccare qualsiasi file
//! 5. File → modalità singola; directory → workflow batch
//!
//! ## Esempio di utilizzo:
//! ```bash
//! compy ~/Videos --crf 28 --recursive
//! compy clip.mov clip-small.mp4
//! compy ~/Videos --list
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use compy::json_output::JsonMessage;
use compy::tools::ToolResolver;
use compy::{
    BatchOutcome, BatchWorkflow, CancelFlag, CompressError, Config, FixedAnswer, Prompter, SingleFileJob,
    StdinPrompter, VideoProcessor, VIDEO_EXTENSIONS,
};

#[derive(Parser)]
#[command(name = "compy")]
#[command(about = "Compress videos with ffmpeg, keeping only outputs that are actually smaller")]
struct Args {
    /// Video file or directory of videos to compress
    input: Option<PathBuf>,

    /// Output file (single file) or output directory (directory input)
    output: Option<PathBuf>,

    /// Answer yes to every question
    #[arg(short, long)]
    yes: bool,

    /// Only list the videos that would be compressed
    #[arg(short, long)]
    list: bool,

    /// Print the supported extensions and exit
    #[arg(short, long)]
    allowed: bool,

    /// Descend into sub-directories
    #[arg(short, long)]
    recursive: bool,

    /// Video CRF value (0-51, lower = better quality)
    #[arg(long)]
    crf: Option<u8>,

    /// Audio bitrate
    #[arg(long)]
    audio_bitrate: Option<String>,

    /// Per-video timeout in seconds (0 = no limit)
    #[arg(long)]
    timeout: Option<u64>,

    /// UTC offset for the creation date tag, e.g. -06:00 (default: local offset)
    #[arg(long, allow_hyphen_values = true)]
    time_zone: Option<String>,

    /// Configuration file (default: <config dir>/compy/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective configuration and exit
    #[arg(long)]
    write_config: bool,

    /// Output JSON lines on stdout instead of the text report
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for the report and JSON output
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = args.json;
    let result = run(args).await;

    if let Err(ref e) = result {
        if json {
            JsonMessage::Error {
                message: format!("{:#}", e),
            }
            .emit();
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    if args.allowed {
        println!("{}", VIDEO_EXTENSIONS.join(", "));
        return Ok(());
    }

    let config_path = args.config.clone().or_else(Config::default_location);
    let config = build_config(&args, config_path.as_deref()).await?;

    if args.write_config {
        let path = config_path.context("No configuration directory available, pass --config")?;
        config.save_to_file(&path).await?;
        info!("Configuration saved to {}", path.display());
        return Ok(());
    }

    let input = args.input.clone().ok_or(CompressError::MissingArgument)?;
    if !input.exists() {
        return Err(CompressError::InvalidInput(format!("{} does not exist", input.display())).into());
    }

    if args.list {
        return list_candidates(&input, config).await;
    }

    let mut prompter: Box<dyn Prompter> = if args.yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(StdinPrompter)
    };

    if input.is_dir() {
        if let Some(ref output_dir) = config.output_path {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(CompressError::InvalidInput(format!(
                    "Output path is not a directory: {}",
                    output_dir.display()
                ))
                .into());
            }
        }

        check_dependencies(&config).await?;
        run_batch(&input, config, prompter.as_mut()).await
    } else if input.is_file() {
        check_dependencies(&config).await?;
        SingleFileJob::new(&input, config).run(prompter.as_mut()).await?;
        Ok(())
    } else {
        Err(CompressError::InvalidInput(format!("{} is neither a file nor a directory", input.display())).into())
    }
}

/// Print what would be compressed, without prompting or touching any file
async fn list_candidates(input: &Path, config: Config) -> Result<()> {
    if input.is_dir() {
        let workflow = BatchWorkflow::new(input, config, CancelFlag::new());
        let files = workflow.enumerate().await?;
        workflow.print_preview(&files);
    } else if input.is_file() {
        let job = SingleFileJob::new(input, config);
        let files = job.list().await?;
        job.print_preview(&files);
    } else {
        return Err(CompressError::InvalidInput(format!("{} is neither a file nor a directory", input.display())).into());
    }
    Ok(())
}

/// Config file first, then command line options on top
async fn build_config(args: &Args, config_path: Option<&Path>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(crf) = args.crf {
        config.video_crf = crf;
    }
    if let Some(ref bitrate) = args.audio_bitrate {
        config.audio_bitrate = bitrate.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.time_zone.is_some() {
        config.time_zone = args.time_zone.clone();
    }
    if args.output.is_some() {
        config.output_path = args.output.clone();
    }
    config.recursive |= args.recursive;
    config.json_output |= args.json;

    config.validate()?;
    Ok(config)
}

async fn check_dependencies(config: &Config) -> Result<()> {
    match VideoProcessor::check_dependencies(config).await {
        Ok(version) => {
            info!("Using {}", version);
            Ok(())
        }
        Err(e @ CompressError::MissingDependency(_)) => {
            let hint = ToolResolver::install_hint(&config.transcoder);
            Err(anyhow::Error::new(e).context(format!("Install it with: {}", hint)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_batch(input: &Path, config: Config, prompter: &mut dyn Prompter) -> Result<()> {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, finishing the current video before stopping (press Ctrl+C again to quit now)");
        handler_flag.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt, exiting");
            if let Some(message) = handler_flag.recovery_message() {
                error!("{}", message);
            }
            std::process::exit(130);
        }
    });

    let mut workflow = BatchWorkflow::new(input, config, cancel);
    if let BatchOutcome::Completed { interrupted: true, .. } = workflow.run(prompter).await? {
        info!("Stopped early, the remaining videos were left untouched");
    }

    Ok(())
}
