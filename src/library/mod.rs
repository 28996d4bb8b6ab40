//! The library context: encoders, collections, and directory layout.
//!
//! Everything the subcommands need is constructed once in `Library::open`
//! and passed around explicitly; there is no ambient global state.
//!
//! - `ingest`: extraction -> classification -> placement -> upsert
//! - `search`: query embedding -> k-NN -> adaptive-threshold filtering

use std::path::PathBuf;

use anyhow::Context;

use crate::config::Config;
use crate::embeddings::{JointEncoder, TextEncoder};
use crate::store::Collection;

mod ingest;
mod search;

pub use ingest::{IndexReport, IngestError, Placement};
pub use search::{adaptive_filter, Match, SearchError, SearchOutcome};

/// Process-wide context for all library operations.
///
/// Owns both encoders and both collections. Construction loads the models
/// (downloading on first run) and reads the persisted vector files.
pub struct Library {
    config: Config,
    text_encoder: TextEncoder,
    joint_encoder: JointEncoder,
    papers: Collection,
    images: Collection,
}

impl Library {
    /// Open the library: create the directory tree, load encoders, open
    /// both collections.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        for dir in [&config.data_dir, &config.papers_dir, &config.images_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        log::info!("Loading embedding models (first run downloads them)");
        let text_encoder = TextEncoder::new(&config.text_model, config.data_dir.clone())
            .context("Failed to initialize text encoder")?;
        let joint_encoder = JointEncoder::new(config.data_dir.clone())
            .context("Failed to initialize joint image/text encoder")?;

        let papers = Collection::open(
            "papers",
            config.data_dir.join("papers.bin"),
            text_encoder.model_id_hash(),
            text_encoder.dimensions(),
        )
        .context("Failed to open paper collection")?;

        let images = Collection::open(
            "images",
            config.data_dir.join("images.bin"),
            joint_encoder.model_id_hash(),
            joint_encoder.dimensions(),
        )
        .context("Failed to open image collection")?;

        Ok(Self {
            config,
            text_encoder,
            joint_encoder,
            papers,
            images,
        })
    }

    pub fn paper_count(&self) -> usize {
        self.papers.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Root directory for organized papers.
    pub fn papers_dir(&self) -> PathBuf {
        self.config.papers_dir.clone()
    }

    /// Persist both collections to their vector files.
    pub fn save(&self) -> anyhow::Result<()> {
        self.papers.save().context("Failed to save paper collection")?;
        self.images.save().context("Failed to save image collection")?;
        Ok(())
    }
}
