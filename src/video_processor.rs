//! # Video Processing Module
//!
//! Questo modulo invoca i tool esterni che fanno il lavoro vero sui video.
//!
//! ## Responsabilità:
//! - Compressione video con il transcoder (ffmpeg)
//! - Copia dei metadata dal file originale all'output (exiftool)
//! - Data di creazione QuickTime riscritta con l'offset locale (exiftool)
//! - Lettura della durata con il probe (ffprobe)
//! - Verifica delle dipendenze esterne prima dell'avvio
//!
//! ## Invocazione dei processi:
//! - Sempre con array di argomenti, mai tramite shell: i nomi dei file con
//!   metacaratteri non vengono mai interpretati
//! - Un processo alla volta, atteso fino alla fine
//! - L'exit status è sempre controllato e propagato come errore tipizzato
//!
//! ## Parametri di compressione:
//! - Codec video: configurabile (default libx264)
//! - CRF: configurabile (default 23)
//! - Codec audio / bitrate: configurabili (default AAC 128k)
//! - `-map_metadata 0` per portare i tag del container
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = VideoProcessor::new(config);
//! processor.compress(&input, &output).await?;
//! processor.clone_metadata(&input, &output).await?;
//! ```

use crate::args;
use crate::config::Config;
use crate::error::{CompressError, Phase};
use crate::tools::ToolResolver;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

const STDERR_TAIL_LINES: usize = 5;

/// Drives the external transcoder, metadata tool and duration probe
pub struct VideoProcessor {
    config: Config,
}

impl VideoProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Fixed transcoder parameters placed between the input and the output
    fn encode_params(&self) -> Vec<String> {
        let mut params = args![
            "-c:v", self.config.video_codec,
            "-crf", self.config.video_crf,
            "-c:a", self.config.audio_codec,
            "-b:a", self.config.audio_bitrate,
            "-map_metadata", "0",
        ];

        // Keep the transcoder quiet unless we are debugging
        if tracing::enabled!(tracing::Level::DEBUG) {
            params.extend(args!["-loglevel", "info", "-stats"]);
        } else {
            params.extend(args!["-loglevel", "error"]);
        }

        params
    }

    /// Compress `input_path` into `output_path`, overwriting it.
    ///
    /// Blocks until the transcoder exits; a non-zero exit status, a spawn
    /// failure or a timeout is an `ExternalProcess` error for the input file.
    pub async fn compress(&self, input_path: &Path, output_path: &Path) -> Result<(), CompressError> {
        debug!(
            "Compressing video: {} (CRF: {}, audio: {} {})",
            input_path.display(),
            self.config.video_crf,
            self.config.audio_codec,
            self.config.audio_bitrate
        );

        let mut cmd = Command::new(&self.config.transcoder);
        cmd.args(["-nostdin", "-hide_banner", "-y", "-i"])
            .arg(input_path)
            .args(self.encode_params())
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start_time = Instant::now();
        let output = self
            .run_with_timeout(cmd, input_path, Phase::Compressing)
            .await?;

        if !output.status.success() {
            return Err(CompressError::ExternalProcess {
                tool: self.config.transcoder.clone(),
                phase: Phase::Compressing,
                path: input_path.to_path_buf(),
                detail: describe_failure(&output),
            });
        }

        debug!("Video compression completed in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(())
    }

    async fn run_with_timeout(&self, mut cmd: Command, input_path: &Path, phase: Phase) -> Result<Output, CompressError> {
        let spawn_error = |e: std::io::Error| CompressError::ExternalProcess {
            tool: self.config.transcoder.clone(),
            phase,
            path: input_path.to_path_buf(),
            detail: format!("could not start: {}", e),
        };

        if self.config.timeout_secs == 0 {
            return cmd.output().await.map_err(spawn_error);
        }

        let limit = Duration::from_secs(self.config.timeout_secs);
        // Dropping the future on timeout kills the child (kill_on_drop)
        match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result.map_err(spawn_error),
            Err(_) => Err(CompressError::ExternalProcess {
                tool: self.config.transcoder.clone(),
                phase,
                path: input_path.to_path_buf(),
                detail: format!("timed out after {}s", self.config.timeout_secs),
            }),
        }
    }

    /// Copy every tag and the file modification date from `source` onto `target`
    pub async fn clone_metadata(&self, source: &Path, target: &Path) -> Result<(), CompressError> {
        debug!("Copying metadata {} -> {}", source.display(), target.display());

        let mut cmd = Command::new(&self.config.metadata_tool);
        cmd.arg("-tagsFromFile")
            .arg(source)
            .args(["-all:all", "-FileModifyDate", "-overwrite_original"])
            .arg(target);

        self.run_metadata_tool(cmd, source).await
    }

    /// Rewrite the QuickTime `CreationDate` of `target` from its UTC `CreateDate`,
    /// shifted to the configured offset (local offset when unset).
    ///
    /// Phone galleries sort by this tag, so without it a compressed clip shows
    /// up at the wrong time of day.
    pub async fn set_creation_date(&self, target: &Path) -> Result<(), CompressError> {
        let offset = self.config.time_zone.clone().unwrap_or_else(local_offset);
        debug!("Setting creation date of {} (offset {})", target.display(), offset);

        let mut cmd = Command::new(&self.config.metadata_tool);
        cmd.args(creation_date_args(&offset)).arg(target);

        self.run_metadata_tool(cmd, target).await
    }

    async fn run_metadata_tool(&self, mut cmd: Command, path: &Path) -> Result<(), CompressError> {
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CompressError::Metadata {
                path: path.to_path_buf(),
                detail: format!("could not run {}: {}", self.config.metadata_tool, e),
            })?;

        if !output.status.success() {
            return Err(CompressError::Metadata {
                path: path.to_path_buf(),
                detail: describe_failure(&output),
            });
        }

        Ok(())
    }

    /// Duration of a video in seconds, as reported by the probe tool
    pub async fn probe_duration(&self, video_path: &Path) -> Result<f64, CompressError> {
        let probe_error = |detail: String| CompressError::ExternalProcess {
            tool: self.config.probe_tool.clone(),
            phase: Phase::Measuring,
            path: video_path.to_path_buf(),
            detail,
        };

        let output = Command::new(&self.config.probe_tool)
            .args([
                "-v", "error",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(video_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| probe_error(format!("could not start: {}", e)))?;

        if !output.status.success() {
            return Err(probe_error(describe_failure(&output)));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| probe_error("probe did not return a duration".to_string()))
    }

    /// Check the external tools before touching any file.
    ///
    /// The transcoder is mandatory; a missing metadata tool only degrades
    /// the run, so it is reported as a warning.
    pub async fn check_dependencies(config: &Config) -> Result<String, CompressError> {
        let version = ToolResolver::probe_transcoder(&config.transcoder).await?;

        if !ToolResolver::is_available(&config.metadata_tool) {
            warn!(
                "{} not found, metadata will not be copied (install with: {})",
                config.metadata_tool,
                ToolResolver::install_hint(&config.metadata_tool)
            );
        }

        if !ToolResolver::is_available(&config.probe_tool) {
            debug!("{} not found, durations will not be reported", config.probe_tool);
        }

        Ok(version)
    }
}

/// Metadata tool arguments (before the target) for the creation date rewrite
fn creation_date_args(offset: &str) -> Vec<String> {
    args![
        format!(r#"-Keys:CreationDate<${{CreateDate;ShiftTime("{}")}}{}"#, offset, offset),
        "-overwrite_original",
    ]
}

/// Current UTC offset of this machine, formatted as `+HH:MM`
fn local_offset() -> String {
    chrono::Local::now().offset().to_string()
}

/// Parse the decimal seconds printed by the probe
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
}

/// Exit status plus the last few stderr lines of a failed process
fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ");

    if tail.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_params_follow_config() {
        let processor = VideoProcessor::new(Config {
            video_crf: 28,
            audio_bitrate: "96k".to_string(),
            ..Default::default()
        });

        let params = processor.encode_params();
        let joined = params.join(" ");
        assert!(joined.starts_with("-c:v libx264 -crf 28 -c:a aac -b:a 96k -map_metadata 0"));
        assert!(params.contains(&"-loglevel".to_string()));
    }

    #[test]
    fn test_creation_date_args() {
        assert_eq!(
            creation_date_args("-06:00"),
            vec![
                r#"-Keys:CreationDate<${CreateDate;ShiftTime("-06:00")}-06:00"#,
                "-overwrite_original",
            ]
        );
    }

    #[test]
    fn test_local_offset_is_valid() {
        let offset = local_offset();
        assert!(offset.parse::<chrono::FixedOffset>().is_ok(), "bad offset {}", offset);
    }

    #[tokio::test]
    async fn test_missing_metadata_tool_fails_creation_date() {
        let processor = VideoProcessor::new(Config {
            metadata_tool: "compy-surely-missing-tool-42".to_string(),
            time_zone: Some("+01:00".to_string()),
            ..Default::default()
        });

        let err = processor.set_creation_date(Path::new("out.mp4")).await.unwrap_err();
        assert!(matches!(err, CompressError::Metadata { .. }));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("12.480000\n"), Some(12.48));
        assert_eq!(parse_duration("\n  3\n"), Some(3.0));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("-1.0"), None);
    }

    #[tokio::test]
    async fn test_missing_transcoder_is_external_failure() {
        let processor = VideoProcessor::new(Config {
            transcoder: "compy-surely-missing-tool-42".to_string(),
            ..Default::default()
        });

        let err = processor
            .compress(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompressError::ExternalProcess { phase: Phase::Compressing, .. }
        ));
        assert!(err.to_string().contains("in.mp4"));
    }

    #[tokio::test]
    async fn test_missing_metadata_tool_is_metadata_error() {
        let processor = VideoProcessor::new(Config {
            metadata_tool: "compy-surely-missing-tool-42".to_string(),
            ..Default::default()
        });

        let err = processor
            .clone_metadata(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Metadata { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let processor = VideoProcessor::new(Config {
            transcoder: "false".to_string(),
            ..Default::default()
        });

        let err = processor
            .compress(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap_err();

        match err {
            CompressError::ExternalProcess { tool, detail, .. } => {
                assert_eq!(tool, "false");
                assert!(detail.contains("exit"));
            }
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_dependencies_rejects_missing_transcoder() {
        let config = Config {
            transcoder: "compy-surely-missing-tool-42".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            VideoProcessor::check_dependencies(&config).await,
            Err(CompressError::MissingDependency(_))
        ));
    }
}
