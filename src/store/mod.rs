//! Persistent vector store with two independent namespaces.
//!
//! A `Collection` is a named partition of the store: one embedding space,
//! one id scheme, one vectors file on disk. The library opens two of them
//! ("papers" and "images").
//!
//! - `index`: in-memory k-NN index over the collection's embeddings
//! - `storage`: binary file persistence (header + CRC32 + entries)

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod index;
mod storage;

pub use index::{IndexError, Neighbor, VectorIndex};
pub use storage::{VectorStorage, VectorStorageError};

/// Display metadata stored with each item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Source filename; also the item's id within its collection
    pub filename: String,
    /// Resolved path inside the library tree
    pub path: String,
    /// Short text prefix for human inspection, never used for search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] VectorStorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A named, persistent vector namespace.
///
/// Ids are unique within a collection; upserting an existing id replaces
/// its vector and metadata instead of creating a duplicate entry.
pub struct Collection {
    name: String,
    index: VectorIndex,
    meta: HashMap<String, ItemMeta>,
    storage: VectorStorage,
    model_id: [u8; 32],
}

impl Collection {
    /// Open a collection, loading persisted entries if the file exists.
    ///
    /// A model change or an unsupported format version starts a fresh
    /// (empty) collection; actual corruption is propagated as an error.
    pub fn open(
        name: &str,
        file_path: PathBuf,
        model_id: [u8; 32],
        dimensions: usize,
    ) -> Result<Self, StoreError> {
        let storage = VectorStorage::new(file_path);

        let mut index = VectorIndex::new(dimensions);
        let mut meta = HashMap::new();

        if storage.exists() {
            match storage.load(&model_id, dimensions) {
                Ok(entries) => {
                    log::info!("Loaded {} entries into collection '{}'", entries.len(), name);
                    index = VectorIndex::with_capacity(dimensions, entries.len());
                    meta = HashMap::with_capacity(entries.len());
                    for (id, item_meta, embedding) in entries {
                        index.upsert(id.clone(), embedding)?;
                        meta.insert(id, item_meta);
                    }
                }
                Err(VectorStorageError::ModelMismatch) => {
                    log::warn!("Collection '{}': model changed, starting fresh", name);
                }
                Err(VectorStorageError::VersionMismatch(file_ver, _)) => {
                    log::warn!(
                        "Collection '{}': storage version {} unsupported, starting fresh",
                        name,
                        file_ver
                    );
                }
                Err(e) => {
                    log::error!("Collection '{}': failed to load vectors: {}", name, e);
                    return Err(e.into());
                }
            }
        } else {
            log::info!("Collection '{}': no existing index, starting fresh", name);
        }

        Ok(Self {
            name: name.to_string(),
            index,
            meta,
            storage,
            model_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Get an item's metadata by id.
    pub fn get_meta(&self, id: &str) -> Option<&ItemMeta> {
        self.meta.get(id)
    }

    /// Insert or overwrite an item.
    pub fn upsert(
        &mut self,
        id: String,
        vector: Vec<f32>,
        meta: ItemMeta,
    ) -> Result<(), StoreError> {
        self.index.upsert(id.clone(), vector)?;
        self.meta.insert(id, meta);
        Ok(())
    }

    /// k-nearest-neighbor query.
    ///
    /// Returns (metadata, cosine distance) pairs in ascending-distance order,
    /// truncated to `k`.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(ItemMeta, f32)>, StoreError> {
        let neighbors = self.index.knn(vector, k)?;

        neighbors
            .into_iter()
            .map(|n| {
                let meta = self.meta.get(&n.id).cloned().ok_or_else(|| {
                    StoreError::Internal(format!(
                        "Collection '{}': no metadata for id '{}'",
                        self.name, n.id
                    ))
                })?;
                Ok((meta, n.distance))
            })
            .collect()
    }

    /// Persist the collection to its vectors file.
    pub fn save(&self) -> Result<(), StoreError> {
        let entries: Vec<(String, ItemMeta, Vec<f32>)> = self
            .index
            .iter()
            .map(|(id, embedding)| {
                let meta = self.meta.get(id).cloned().ok_or_else(|| {
                    StoreError::Internal(format!(
                        "Collection '{}': no metadata for id '{}'",
                        self.name, id
                    ))
                })?;
                Ok((id.to_string(), meta, embedding.clone()))
            })
            .collect::<Result<_, StoreError>>()?;

        self.storage
            .save(&entries, &self.model_id, self.index.dimensions())?;

        log::debug!("Collection '{}': saved {} entries", self.name, entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_file() -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "shelf-collection-test-{}-{}.bin",
            std::process::id(),
            counter
        ))
    }

    fn model_id() -> [u8; 32] {
        [7u8; 32]
    }

    fn meta(filename: &str, path: &str) -> ItemMeta {
        ItemMeta {
            filename: filename.to_string(),
            path: path.to_string(),
            preview: None,
        }
    }

    #[test]
    fn test_open_fresh_collection() {
        let path = temp_file();
        let coll = Collection::open("papers", path, model_id(), 3).unwrap();

        assert_eq!(coll.name(), "papers");
        assert!(coll.is_empty());
    }

    #[test]
    fn test_upsert_is_idempotent_per_id() {
        let path = temp_file();
        let mut coll = Collection::open("papers", path, model_id(), 3).unwrap();

        coll.upsert(
            "a.pdf".to_string(),
            vec![1.0, 0.0, 0.0],
            meta("a.pdf", "/lib/a.pdf"),
        )
        .unwrap();
        coll.upsert(
            "a.pdf".to_string(),
            vec![0.0, 1.0, 0.0],
            meta("a.pdf", "/lib/biology/a.pdf"),
        )
        .unwrap();

        // One entry, reflecting the latest ingestion
        assert_eq!(coll.len(), 1);
        assert!(coll.contains("a.pdf"));
        assert_eq!(coll.get_meta("a.pdf").unwrap().path, "/lib/biology/a.pdf");
    }

    #[test]
    fn test_query_returns_meta_with_ascending_distances() {
        let path = temp_file();
        let mut coll = Collection::open("papers", path, model_id(), 3).unwrap();

        coll.upsert("near.pdf".to_string(), vec![1.0, 0.05, 0.0], meta("near.pdf", "/lib/near.pdf"))
            .unwrap();
        coll.upsert("far.pdf".to_string(), vec![0.0, 1.0, 0.0], meta("far.pdf", "/lib/far.pdf"))
            .unwrap();

        let results = coll.query(&[1.0, 0.0, 0.0], 3).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.filename, "near.pdf");
        assert!(results[0].1 < results[1].1);
    }

    #[test]
    fn test_query_empty_collection() {
        let path = temp_file();
        let coll = Collection::open("papers", path, model_id(), 3).unwrap();

        let results = coll.query(&[1.0, 0.0, 0.0], 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_save_and_reopen_round_trip() {
        let path = temp_file();

        {
            let mut coll = Collection::open("papers", path.clone(), model_id(), 3).unwrap();
            coll.upsert(
                "a.pdf".to_string(),
                vec![1.0, 0.0, 0.0],
                ItemMeta {
                    filename: "a.pdf".to_string(),
                    path: "/lib/a.pdf".to_string(),
                    preview: Some("abstract...".to_string()),
                },
            )
            .unwrap();
            coll.save().unwrap();
        }

        let reopened = Collection::open("papers", path.clone(), model_id(), 3).unwrap();
        assert_eq!(reopened.len(), 1);
        let m = reopened.get_meta("a.pdf").unwrap();
        assert_eq!(m.preview.as_deref(), Some("abstract..."));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_model_change_starts_fresh() {
        let path = temp_file();

        {
            let mut coll = Collection::open("papers", path.clone(), model_id(), 3).unwrap();
            coll.upsert("a.pdf".to_string(), vec![1.0, 0.0, 0.0], meta("a.pdf", "/lib/a.pdf"))
                .unwrap();
            coll.save().unwrap();
        }

        let other_model = [9u8; 32];
        let reopened = Collection::open("papers", path.clone(), other_model, 3).unwrap();
        assert!(reopened.is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
