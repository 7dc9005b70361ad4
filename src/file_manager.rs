//! # File Management Module
//!
//! Questo modulo gestisce la classificazione dei file e il conteggio delle dimensioni.
//!
//! ## Responsabilità:
//! - Classificazione video / non-video basata sul suffisso del nome
//! - Esclusione dei file già marcati ("compressed", "not compressed", ".trashed")
//! - Discovery dei candidati in una directory, in ordine di nome deterministico
//! - Dimensioni dei file, conversione in MB e percentuale di riduzione
//!
//! ## Formati supportati (case-sensitive):
//! - **Video**: mp4, mkv, avi, mov, wmv
//!
//! ## Utilità:
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)
//! - `to_megabytes()`: MB arrotondati a due decimali, solo per la visualizzazione
//! - `reduction()`: Percentuale di riduzione, `None` se il totale originale è zero
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_candidates(Path::new("/videos"), false)?;
//! for file in files {
//!     let size = FileManager::file_size(&file).await?;
//! }
//! ```

use crate::error::CompressError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Recognized video extensions, matched case-sensitively
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "wmv"];

/// Marker carried by outputs of a previous compression
pub const COMPRESSED_MARKER: &str = "compressed";

/// Marker carried by originals that compression could not shrink
pub const NOT_COMPRESSED_MARKER: &str = "not compressed";

/// Marker used by phone galleries for files in the recycle bin
pub const TRASHED_MARKER: &str = ".trashed";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Classification of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Other,
}

/// Manages file classification, discovery and size accounting
pub struct FileManager;

impl FileManager {
    /// Classify a file name by its extension alone
    pub fn classify(name: &str) -> MediaKind {
        match Path::new(name).extension().and_then(|ext| ext.to_str()) {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }

    /// Whether a name carries one of the exclusion markers
    pub fn is_marked(name: &str) -> bool {
        name.contains(COMPRESSED_MARKER) || name.contains(TRASHED_MARKER)
    }

    /// A candidate is a video that is neither already compressed nor trashed
    pub fn is_candidate(name: &str) -> bool {
        Self::classify(name) == MediaKind::Video && !Self::is_marked(name)
    }

    /// Same as `is_candidate`, for a path; hidden files never qualify
    pub fn is_candidate_path(path: &Path) -> bool {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => !name.starts_with('.') && Self::is_candidate(name),
            None => false,
        }
    }

    /// Find candidate videos in a directory, sorted by file name
    pub fn find_candidates(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, CompressError> {
        if !dir.is_dir() {
            return Err(CompressError::InvalidInput(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        let mut ignored = 0usize;

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if Self::is_candidate_path(entry.path()) {
                files.push(entry.into_path());
            } else {
                ignored += 1;
            }
        }

        debug!(
            "Found {} candidates in {} ({} other files ignored)",
            files.len(),
            dir.display(),
            ignored
        );

        Ok(files)
    }

    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> io::Result<u64> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(metadata.len())
    }

    /// Megabytes rounded to two decimals; for display only, never for decisions
    pub fn to_megabytes(bytes: u64) -> f64 {
        (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Percentage reduction from `original_total` to `compressed_total`.
    ///
    /// Undefined (`None`) when nothing was measured on the original side.
    pub fn reduction(original_total: u64, compressed_total: u64) -> Option<f64> {
        if original_total == 0 {
            None
        } else {
            Some((1.0 - compressed_total as f64 / original_total as f64) * 100.0)
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_by_extension() {
        for ext in VIDEO_EXTENSIONS {
            assert_eq!(FileManager::classify(&format!("clip.{}", ext)), MediaKind::Video);
        }
        assert_eq!(FileManager::classify("notes.txt"), MediaKind::Other);
        assert_eq!(FileManager::classify("clip.webm"), MediaKind::Other);
        assert_eq!(FileManager::classify("mp4"), MediaKind::Other);
        assert_eq!(FileManager::classify("clip.mp4.part"), MediaKind::Other);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(FileManager::classify("clip.MP4"), MediaKind::Other);
        assert_eq!(FileManager::classify("clip.Mkv"), MediaKind::Other);
    }

    #[test]
    fn test_candidates_exclude_markers() {
        assert!(FileManager::is_candidate("holiday.mp4"));
        assert!(FileManager::is_candidate("family dinner.mov"));
        assert!(!FileManager::is_candidate("holiday compressed.mp4"));
        assert!(!FileManager::is_candidate("holiday not compressed.mkv"));
        assert!(!FileManager::is_candidate(".trashed-1700000000-holiday.mp4"));
        assert!(!FileManager::is_candidate("holiday.trashed.avi"));
        assert!(!FileManager::is_candidate("holiday.txt"));
    }

    #[test]
    fn test_hidden_paths_are_not_candidates() {
        assert!(!FileManager::is_candidate_path(Path::new("/videos/.partial.mp4")));
        assert!(FileManager::is_candidate_path(Path::new("/videos/partial.mp4")));
    }

    #[test]
    fn test_find_candidates_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["c.mkv", "b.txt", "a.mp4", "d compressed.mp4", ".hidden.mp4", "E.MOV"] {
            fs::write(root.join(name), b"data").unwrap();
        }
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("nested.mp4"), b"data").unwrap();

        let files = FileManager::find_candidates(root, false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.mp4", "c.mkv"]);
    }

    #[test]
    fn test_find_candidates_recursive() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("a.mp4"), b"data").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("nested.avi"), b"data").unwrap();
        fs::create_dir(root.join(".cache")).unwrap();
        fs::write(root.join(".cache").join("hidden.mp4"), b"data").unwrap();

        let files = FileManager::find_candidates(root, true).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("sub/nested.avi")));
    }

    #[test]
    fn test_find_candidates_rejects_non_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp4");
        fs::write(&file, b"data").unwrap();

        assert!(matches!(
            FileManager::find_candidates(&file, false),
            Err(CompressError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_directory_has_no_candidates() {
        let dir = TempDir::new().unwrap();
        assert!(FileManager::find_candidates(dir.path(), false).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_size() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp4");
        fs::write(&file, vec![0u8; 2048]).unwrap();

        assert_eq!(FileManager::file_size(&file).await.unwrap(), 2048);
        assert!(FileManager::file_size(&dir.path().join("missing.mp4")).await.is_err());
        assert!(FileManager::file_size(dir.path()).await.is_err());
    }

    #[test]
    fn test_to_megabytes() {
        assert_eq!(FileManager::to_megabytes(0), 0.0);
        assert_eq!(FileManager::to_megabytes(10 * 1024 * 1024), 10.0);
        assert_eq!(FileManager::to_megabytes(1024 * 1024 + 5 * 1024), 1.0);
        assert_eq!(FileManager::to_megabytes(1536 * 1024), 1.5);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(1536), "1.50 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_reduction() {
        assert_eq!(FileManager::reduction(0, 0), None);
        assert_eq!(FileManager::reduction(0, 100), None);
        assert_eq!(FileManager::reduction(200, 100), Some(50.0));
        assert_eq!(FileManager::reduction(100, 100), Some(0.0));
        let grown = FileManager::reduction(100, 120).unwrap();
        assert!((grown + 20.0).abs() < 1e-9);
    }
}
