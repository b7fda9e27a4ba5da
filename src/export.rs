//! Chapter export: one `.txt` file per chapter, or all of them in a zip.
//!
//! File names encode the chapter index so a plain directory listing keeps
//! document order: `01_introduction.txt`, `02_the_first_war.txt`, …
//!
//! Every file is written atomically (temp file + rename) so an interrupted
//! export never leaves a half-written chapter behind.

use crate::error::Doc2TtsError;
use crate::output::Chapter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive name used when the caller gives only a directory.
pub const DEFAULT_ARCHIVE_NAME: &str = "cleaned_text_chapters.zip";

/// Longest title stem kept in a chapter file name, well under the usual
/// 255-byte file-name limit.
pub const MAX_STEM_LEN: usize = 100;

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[^a-z0-9]").unwrap());

/// File name for the chapter at 0-based `index`.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, then the result is
/// lowercased and cut to [`MAX_STEM_LEN`] characters.
pub fn chapter_file_name(index: usize, title: &str) -> String {
    let mut stem = RE_UNSAFE_CHARS.replace_all(title, "_").to_lowercase();
    // ASCII only after the replacement, so any byte index is a char boundary.
    stem.truncate(MAX_STEM_LEN);
    format!("{:02}_{}.txt", index + 1, stem)
}

/// Write each chapter to `dir` (created if missing). Returns the written
/// paths in chapter order.
pub async fn write_chapters(
    dir: impl AsRef<Path>,
    chapters: &[Chapter],
) -> Result<Vec<PathBuf>, Doc2TtsError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Doc2TtsError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(chapters.len());
    for (index, chapter) in chapters.iter().enumerate() {
        let path = dir.join(chapter_file_name(index, &chapter.title));
        write_atomic(&path, chapter.content.as_bytes()).await?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} chapters to {}", written.len(), dir.display());
    Ok(written)
}

/// Build a deflate-compressed zip holding one `.txt` entry per chapter.
pub fn zip_chapters(chapters: &[Chapter]) -> Result<Vec<u8>, Doc2TtsError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (index, chapter) in chapters.iter().enumerate() {
        let name = chapter_file_name(index, &chapter.title);
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| Doc2TtsError::Internal(format!("zip entry '{name}': {e}")))?;
        writer
            .write_all(chapter.content.as_bytes())
            .map_err(|e| Doc2TtsError::Internal(format!("zip entry '{name}': {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Doc2TtsError::Internal(format!("zip finish: {e}")))?;
    Ok(cursor.into_inner())
}

/// Write all chapters into a zip archive at `path`.
///
/// If `path` is an existing directory, the archive is created inside it as
/// [`DEFAULT_ARCHIVE_NAME`]. Returns the archive path.
pub async fn write_zip(
    path: impl AsRef<Path>,
    chapters: &[Chapter],
) -> Result<PathBuf, Doc2TtsError> {
    let mut path = path.as_ref().to_path_buf();
    if path.is_dir() {
        path = path.join(DEFAULT_ARCHIVE_NAME);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Doc2TtsError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
    }

    let bytes = zip_chapters(chapters)?;
    write_atomic(&path, &bytes).await?;

    info!("Wrote {} chapters to {}", chapters.len(), path.display());
    Ok(path)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Doc2TtsError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| Doc2TtsError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Doc2TtsError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
