//! # Path Resolution Module
//!
//! Centralizza il calcolo dei nomi di output e dei marker nei nomi dei file.
//! `a.mkv` diventa `a compressed.mp4`; un originale che non migliora
//! diventa `a not compressed.mkv`.

use crate::error::CompressError;
use crate::file_manager::{COMPRESSED_MARKER, NOT_COMPRESSED_MARKER};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of every transcoder output
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// File name of the compressed output for `input_path`
    pub fn compressed_name(input_path: &Path) -> Result<OsString, CompressError> {
        let mut name = Self::stem(input_path)?;
        name.push(format!(" {}.{}", COMPRESSED_MARKER, OUTPUT_EXTENSION));
        Ok(name)
    }

    /// Name an original receives when compression did not make it smaller
    pub fn not_compressed_path(input_path: &Path) -> Result<PathBuf, CompressError> {
        let mut name = Self::stem(input_path)?;
        name.push(format!(" {}", NOT_COMPRESSED_MARKER));
        if let Some(ext) = input_path.extension() {
            name.push(".");
            name.push(ext);
        }
        Ok(input_path.with_file_name(name))
    }

    /// Output path for a batch candidate.
    ///
    /// Without an output directory the output sits next to the input;
    /// with one, the layout relative to `input_base_dir` is preserved.
    pub fn batch_output_path(
        input_path: &Path,
        input_base_dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf, CompressError> {
        let filename = Self::compressed_name(input_path)?;

        let Some(output_dir) = output_dir else {
            return Ok(input_path.with_file_name(filename));
        };

        let relative_dir = input_path
            .parent()
            .and_then(|parent| parent.strip_prefix(input_base_dir).ok())
            .unwrap_or(Path::new(""));

        let result = output_dir.join(relative_dir).join(filename);
        debug!("Resolved output path: {} -> {}", input_path.display(), result.display());
        Ok(result)
    }

    /// Output path for single file mode.
    ///
    /// An explicit path is used as-is unless it names an existing directory,
    /// in which case the default output name is placed inside it.
    pub fn single_output_path(input_path: &Path, explicit: Option<&Path>) -> Result<PathBuf, CompressError> {
        match explicit {
            Some(dir) if dir.is_dir() => Ok(dir.join(Self::compressed_name(input_path)?)),
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(input_path.with_file_name(Self::compressed_name(input_path)?)),
        }
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<(), CompressError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| CompressError::Retention {
                path: path.to_path_buf(),
                detail: format!("could not create {}: {}", parent.display(), e),
            })?;
        }
        Ok(())
    }

    fn stem(input_path: &Path) -> Result<OsString, CompressError> {
        input_path
            .file_stem()
            .map(|stem| stem.to_os_string())
            .ok_or_else(|| CompressError::InvalidInput(format!("Invalid file name: {}", input_path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::FileManager;
    use tempfile::TempDir;

    #[test]
    fn test_compressed_name() {
        assert_eq!(PathResolver::compressed_name(Path::new("/v/a.mp4")).unwrap(), "a compressed.mp4");
        assert_eq!(PathResolver::compressed_name(Path::new("/v/c.mkv")).unwrap(), "c compressed.mp4");
        assert_eq!(
            PathResolver::compressed_name(Path::new("/v/my trip.2024.mov")).unwrap(),
            "my trip.2024 compressed.mp4"
        );
    }

    #[test]
    fn test_not_compressed_path_keeps_extension() {
        assert_eq!(
            PathResolver::not_compressed_path(Path::new("/v/c.mkv")).unwrap(),
            PathBuf::from("/v/c not compressed.mkv")
        );
    }

    #[test]
    fn test_marked_names_are_not_candidates() {
        let output = PathResolver::batch_output_path(Path::new("/v/a.mp4"), Path::new("/v"), None).unwrap();
        let kept = PathResolver::not_compressed_path(Path::new("/v/a.avi")).unwrap();

        assert!(!FileManager::is_candidate_path(&output));
        assert!(!FileManager::is_candidate_path(&kept));
    }

    #[test]
    fn test_batch_output_path_in_place() {
        let path = PathResolver::batch_output_path(Path::new("/v/sub/a.wmv"), Path::new("/v"), None).unwrap();
        assert_eq!(path, PathBuf::from("/v/sub/a compressed.mp4"));
    }

    #[test]
    fn test_batch_output_path_preserves_layout() {
        let path = PathResolver::batch_output_path(
            Path::new("/v/sub/a.wmv"),
            Path::new("/v"),
            Some(Path::new("/out")),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/out/sub/a compressed.mp4"));
    }

    #[test]
    fn test_single_output_path() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.mov");

        assert_eq!(
            PathResolver::single_output_path(&input, None).unwrap(),
            dir.path().join("a compressed.mp4")
        );
        assert_eq!(
            PathResolver::single_output_path(&input, Some(dir.path())).unwrap(),
            dir.path().join("a compressed.mp4")
        );
        assert_eq!(
            PathResolver::single_output_path(&input, Some(Path::new("/tmp/custom.mp4"))).unwrap(),
            PathBuf::from("/tmp/custom.mp4")
        );
    }

    #[tokio::test]
    async fn test_ensure_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x").join("y").join("a compressed.mp4");

        PathResolver::ensure_parent_dirs(&nested).await.unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }
}
