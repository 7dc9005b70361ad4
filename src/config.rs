//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Sostituisce i flag globali (es. "output esplicito fornito") con campi espliciti
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri di configurazione:
//! - `video_codec`: Codec video (default: "libx264")
//! - `video_crf`: CRF video (0-51, default: 23, più basso = migliore qualità)
//! - `audio_codec` / `audio_bitrate`: Ricodifica audio (default: "aac" a "128k")
//! - `transcoder` / `metadata_tool` / `probe_tool`: Comandi esterni
//! - `output_path`: File o directory di output (default: None = accanto all'input)
//! - `recursive`: Scansione ricorsiva delle sottodirectory (default: false)
//! - `timeout_secs`: Timeout per singolo video, 0 = nessun limite
//! - `json_output`: Eventi JSON su stdout invece del report testuale
//! - `time_zone`: Offset UTC per la data di creazione (default: offset locale)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     video_crf: 28,
//!     recursive: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::CompressError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a single compy invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video codec passed to the transcoder
    pub video_codec: String,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    /// Audio codec passed to the transcoder
    pub audio_codec: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Transcoder command (name in PATH or absolute path)
    pub transcoder: String,
    /// Metadata copy command
    pub metadata_tool: String,
    /// Duration probe command
    pub probe_tool: String,
    /// Explicit output file (single file mode) or directory (batch mode)
    pub output_path: Option<PathBuf>,
    /// Descend into sub-directories when enumerating
    pub recursive: bool,
    /// Per-video transcode timeout in seconds, 0 disables it
    pub timeout_secs: u64,
    /// Output progress and summary as JSON lines
    pub json_output: bool,
    /// UTC offset (`+HH:MM`) used for the creation date; local offset when unset
    pub time_zone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            transcoder: "ffmpeg".to_string(),
            metadata_tool: "exiftool".to_string(),
            probe_tool: "ffprobe".to_string(),
            output_path: None,
            recursive: false,
            timeout_secs: 0,
            json_output: false,
            time_zone: None,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.video_crf > 51 {
            return Err(CompressError::Config("Video CRF must be between 0 and 51".into()));
        }

        if !is_bitrate(&self.audio_bitrate) {
            return Err(CompressError::Config(format!(
                "Audio bitrate must look like 128k or 96000, got '{}'",
                self.audio_bitrate
            )));
        }

        if let Some(ref offset) = self.time_zone {
            if offset.parse::<chrono::FixedOffset>().is_err() {
                return Err(CompressError::Config(format!(
                    "Time zone must be a UTC offset like +02:00, got '{}'",
                    offset
                )));
            }
        }

        for (name, value) in [
            ("video_codec", &self.video_codec),
            ("audio_codec", &self.audio_codec),
            ("transcoder", &self.transcoder),
            ("metadata_tool", &self.metadata_tool),
            ("probe_tool", &self.probe_tool),
        ] {
            if value.trim().is_empty() {
                return Err(CompressError::Config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("compy").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when it is missing
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CompressError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn is_bitrate(value: &str) -> bool {
    let digits = value
        .strip_suffix(|c: char| matches!(c, 'k' | 'K' | 'M'))
        .unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.video_crf = 52;
        assert!(config.validate().is_err());

        config.video_crf = 23;
        config.audio_bitrate = "loud".to_string();
        assert!(config.validate().is_err());

        config.audio_bitrate = "96000".to_string();
        assert!(config.validate().is_ok());

        config.transcoder = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_time_zone_validation() {
        let mut config = Config {
            time_zone: Some("-06:00".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.time_zone = Some("CET".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.video_codec, "libx264");
        assert_eq!(config.video_crf, 23);
        assert_eq!(config.audio_codec, "aac");
        assert_eq!(config.audio_bitrate, "128k");
        assert_eq!(config.transcoder, "ffmpeg");
        assert!(config.output_path.is_none());
        assert!(!config.recursive);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            video_crf: 28,
            audio_bitrate: "96k".to_string(),
            recursive: true,
            timeout_secs: 900,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.video_crf, 28);
        assert_eq!(loaded_config.audio_bitrate, "96k");
        assert!(loaded_config.recursive);
        assert_eq!(loaded_config.timeout_secs, 900);
        assert_eq!(loaded_config.transcoder, "ffmpeg");
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "video_crf": 30 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.video_crf, 30);
        assert_eq!(config.audio_codec, "aac");
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.video_crf, 23);
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "video_crf": 99 }"#).await.unwrap();

        assert!(Config::from_file(&config_path).await.is_err());
    }
}
