//! Archive assembly: stream an output tree into a single zip.
//!
//! Runs strictly after the batch completes — the builder walks a finished
//! directory, it never races writers. Files are streamed into the archive
//! with [`std::io::copy`], so the tree is never buffered in memory.
//! Compression is deflate at maximum level.
//!
//! Lifecycle contract: on success the caller owns cleanup — it deletes the
//! scratch root once the archive exists, and the archive itself after it
//! has been delivered.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walking output tree failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Stream every file under `root_dir` into a deflate-compressed zip at
/// `archive_path`, preserving relative paths.
pub fn build(root_dir: &Path, archive_path: &Path) -> Result<PathBuf, ArchiveError> {
    let file = File::create(archive_path)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for entry in WalkDir::new(root_dir).sort_by_file_name() {
        let entry = entry?;
        let rel = match entry.path().strip_prefix(root_dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue, // the root itself
        };
        let rel_name = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");

        if entry.file_type().is_dir() {
            writer.add_directory(format!("{rel_name}/"), options)?;
        } else {
            writer.start_file(rel_name, options)?;
            let mut source = File::open(entry.path())?;
            std::io::copy(&mut source, &mut writer)?;
        }
    }

    writer.finish()?;
    Ok(archive_path.to_path_buf())
}
