//! Ingestion pipeline: papers, paper batches, and bulk image indexing.
//!
//! Papers: extract text (first pages only) -> classify into a topic
//! subdirectory -> copy into the library tree -> embed -> upsert under
//! id = filename. Re-ingesting a filename overwrites its entry, so
//! repeated runs converge instead of accumulating duplicates.
//!
//! Collections are only mutated in memory here; callers persist with
//! `Library::save` once the batch is done.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::classify::classify;
use crate::embeddings::EmbeddingError;
use crate::extract::{extract_pdf_text, ExtractError};
use crate::library::Library;
use crate::store::{ItemMeta, StoreError};

/// Recognized image file extensions (lowercase)
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Errors that can occur while ingesting a single item.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Not a file path: {0}")]
    InvalidPath(PathBuf),

    #[error("No extractable text in {0} (empty documents are not indexed)")]
    EmptyContent(PathBuf),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to place file: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an ingested paper ended up.
#[derive(Debug, Clone)]
pub struct Placement {
    pub filename: String,
    pub destination: PathBuf,
    pub topic: Option<String>,
}

/// Outcome of a bulk image indexing run.
///
/// Per-file failures are collected instead of aborting the walk, so a
/// messy folder still yields everything that could be indexed.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

impl Library {
    /// Ingest a single paper, optionally classifying it into one of the
    /// given topics.
    pub fn add_paper(&mut self, path: &Path, topics: &[String]) -> Result<Placement, IngestError> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let filename = file_name(path)?;

        log::info!("Reading {}", path.display());
        let text = extract_pdf_text(path)?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyContent(path.to_path_buf()));
        }

        // Pick the destination: a topic subdirectory when topics are given,
        // the library root otherwise.
        let topic = if topics.is_empty() {
            None
        } else {
            let topic = classify(&self.text_encoder, &text, topics)?;
            log::info!("Classified '{}' into topic '{}'", filename, topic);
            Some(topic)
        };

        let dest_dir = match &topic {
            Some(topic) => self.config.papers_dir.join(topic),
            None => self.config.papers_dir.clone(),
        };
        std::fs::create_dir_all(&dest_dir)?;
        let destination = dest_dir.join(&filename);

        // Copy, never move; skip when source and destination coincide so
        // re-ingesting an already-placed file stays idempotent.
        if !same_file(path, &destination) {
            std::fs::copy(path, &destination)?;
        }

        let vector = self.text_encoder.embed(&text)?;
        let preview: String = text.chars().take(self.config.preview_chars).collect();

        // Id is the filename, not a content hash: a renamed copy indexes as
        // a second entry, and a same-named different file overwrites.
        self.papers.upsert(
            filename.clone(),
            vector,
            ItemMeta {
                filename: filename.clone(),
                path: destination.display().to_string(),
                preview: Some(preview),
            },
        )?;

        Ok(Placement {
            filename,
            destination,
            topic,
        })
    }

    /// Ingest every PDF in a folder (non-recursive), strictly sequentially.
    ///
    /// One file's failure never aborts the rest; the per-file results are
    /// returned in scan order. Only a missing folder is a process-level
    /// error.
    pub fn organize_folder(
        &mut self,
        folder: &Path,
        topics: &[String],
    ) -> Result<Vec<(PathBuf, Result<Placement, IngestError>)>, IngestError> {
        let files = pdf_files_in(folder)?;

        let bar = progress_bar(files.len() as u64, "papers");
        let mut results = Vec::with_capacity(files.len());

        for path in files {
            let result = self.add_paper(&path, topics);
            if let Err(e) = &result {
                log::warn!("Skipping {}: {}", path.display(), e);
            }
            results.push((path, result));
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(results)
    }

    /// Walk a directory tree and index every recognized image.
    ///
    /// Files that fail to decode or embed are recorded in the report and
    /// skipped; the walk itself never aborts.
    pub fn index_images(&mut self, root: &Path) -> Result<IndexReport, IngestError> {
        if !root.exists() {
            return Err(IngestError::FileNotFound(root.to_path_buf()));
        }

        let files = image_files_under(root);
        log::info!("Scanning {}: {} candidate images", root.display(), files.len());

        let bar = progress_bar(files.len() as u64, "images");
        let mut report = IndexReport::default();

        for path in files {
            match self.index_one_image(&path) {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    report.skipped.push((path, e.to_string()));
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(report)
    }

    fn index_one_image(&mut self, path: &Path) -> Result<(), IngestError> {
        let filename = file_name(path)?;

        // Decode-validate first so corrupt files surface as decode errors
        // rather than opaque model failures.
        image::open(path).map_err(|e| IngestError::Decode(e.to_string()))?;

        let vector = self.joint_encoder.embed_image(path)?;

        self.images.upsert(
            filename.clone(),
            vector,
            ItemMeta {
                filename,
                path: path.display().to_string(),
                preview: None,
            },
        )?;

        Ok(())
    }
}

fn file_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::InvalidPath(path.to_path_buf()))
}

/// True when both paths resolve to the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// PDFs directly inside `folder`, in sorted order for deterministic batches.
fn pdf_files_in(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::FileNotFound(folder.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, &["pdf"]))
        .collect();
    files.sort();

    Ok(files)
}

/// Recognized image files anywhere under `root`, in sorted order.
fn image_files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, IMAGE_EXTENSIONS))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn progress_bar(len: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!("indexing {}", label));
    bar
}
