//! Common Utilities Module
//!
//! File and path helpers shared by the image tools:
//! - extension handling (case-insensitive, optional leading dot)
//! - relative path computation for mirrored output trees
//! - atomic writes and copies (temp file in the target directory, then rename)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════
// Extensions
// ═══════════════════════════════════════════════════════════════

/// Lowercase extension of `path`, or an empty string when there is none.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Canonical form of a user-supplied extension: no leading dot, lowercase.
///
/// # Examples
/// ```
/// use shared_utils::common_utils::normalize_extension;
///
/// assert_eq!(normalize_extension(".HEIC"), "heic");
/// assert_eq!(normalize_extension("Jpg"), "jpg");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Case-insensitive extension membership test. `extensions` must already be
/// normalized (see [`normalize_extension`]).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let ext = get_extension_lowercase(path);
    !ext.is_empty() && extensions.iter().any(|e| e.as_ref() == ext)
}

// ═══════════════════════════════════════════════════════════════
// Paths
// ═══════════════════════════════════════════════════════════════

/// `path` relative to `base`, or `path` unchanged when it is not under `base`.
///
/// # Examples
/// ```
/// use std::path::{Path, PathBuf};
/// use shared_utils::common_utils::compute_relative_path;
///
/// let rel = compute_relative_path(Path::new("/photos/2024/a.jpg"), Path::new("/photos"));
/// assert_eq!(rel, PathBuf::from("2024/a.jpg"));
/// ```
pub fn compute_relative_path(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

// ═══════════════════════════════════════════════════════════════
// Atomic output
// ═══════════════════════════════════════════════════════════════

fn temp_file_beside(dest: &Path) -> io::Result<tempfile::NamedTempFile> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".tmp")
        .tempfile_in(parent)
}

/// Writes `bytes` to `dest` so that readers only ever see the complete file.
///
/// The data goes to a hidden temp file in the destination directory, which is
/// renamed over `dest` once flushed. A temp file that is never persisted is
/// removed when dropped.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = temp_file_beside(dest)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    debug!(path = %dest.display(), bytes = bytes.len(), "Wrote output atomically");
    Ok(())
}

/// Byte-identical copy of `source` to `dest` with the same visibility
/// guarantee as [`write_atomic`]. Returns the number of bytes copied.
pub fn copy_atomic(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut input = fs::File::open(source)?;
    let mut tmp = temp_file_beside(dest)?;
    let copied = io::copy(&mut input, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    debug!(
        source = %source.display(),
        dest = %dest.display(),
        bytes = copied,
        "Copied file atomically"
    );
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_helpers() {
        assert_eq!(get_extension_lowercase(Path::new("a/b/IMG_01.NEF")), "nef");
        assert_eq!(normalize_extension("  .TIFF "), "tiff");

        let exts = vec!["jpg".to_string(), "nef".to_string()];
        assert!(has_extension(Path::new("x/photo.JPG"), &exts));
        assert!(has_extension(Path::new("raw.Nef"), &exts));
        assert!(!has_extension(Path::new("movie.mp4"), &exts));
        assert!(!has_extension(Path::new("jpg"), &exts));
    }

    #[test]
    fn test_compute_relative_path_outside_base() {
        let rel = compute_relative_path(Path::new("/other/a.jpg"), Path::new("/photos"));
        assert_eq!(rel, PathBuf::from("/other/a.jpg"));
    }

    #[test]
    fn test_write_atomic_creates_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("out.jpg");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();

        write_atomic(&dest, b"hello").unwrap();
        write_atomic(&dest, b"replaced").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"replaced");
        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".partial-"))
            .collect();
        assert!(leftovers.is_empty(), "temp files must not survive a write");
    }

    #[test]
    fn test_copy_atomic_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("copy.bin");
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(&src, &payload).unwrap();

        let copied = copy_atomic(&src, &dest).unwrap();

        assert_eq!(copied, payload.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), payload);
    }

    #[test]
    fn test_copy_atomic_missing_source_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("copy.bin");

        assert!(copy_atomic(&dir.path().join("missing.bin"), &dest).is_err());
        assert!(!dest.exists());
    }
}
