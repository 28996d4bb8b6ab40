//! Binary storage for one collection's vectors and metadata.
//!
//! File format (one file per collection, e.g. papers.bin):
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of the encoder model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - id_len: u16, id: UTF-8 bytes
//! - meta_len: u32, metadata: JSON bytes
//! - embedding: [f32; dimensions] (little-endian)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::store::ItemMeta;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// One persisted entry: id, metadata, embedding.
pub type StoredEntry = (String, ItemMeta, Vec<f32>);

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Storage manager for one collection file.
pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all entries from storage.
    ///
    /// Validates the header against the expected model hash and dimensions.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<Vec<StoredEntry>, VectorStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        validate_header(&header, expected_model_id, expected_dimensions)?;

        let mut entries = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            entries.push(read_entry(&mut reader, header.dimensions as usize)?);
        }

        Ok(entries)
    }

    /// Save entries to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(
        &self,
        entries: &[StoredEntry],
        model_id: &[u8; 32],
        dimensions: usize,
    ) -> Result<(), VectorStorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = self.write_to_file(&temp_path, entries, model_id, dimensions);

        if result.is_err() {
            // Clean up temp file on error
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn write_to_file(
        &self,
        path: &Path,
        entries: &[StoredEntry],
        model_id: &[u8; 32],
        dimensions: usize,
    ) -> Result<(), VectorStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = Header {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions: dimensions as u16,
            entry_count: entries.len() as u64,
        };
        write_header(&mut writer, &header)?;

        for (id, meta, embedding) in entries {
            write_entry(&mut writer, id, meta, embedding)?;
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

fn read_header(reader: &mut BufReader<File>) -> Result<Header, VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];

    // Version check first
    if version > FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let entry_count = u64::from_le_bytes(count_bytes);

    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&header_bytes[43..47]);
    let stored_checksum = u32::from_le_bytes(checksum_bytes);

    // Checksum covers the header without the checksum field itself
    let computed_checksum = crc32fast::hash(&header_bytes[0..43]);
    if stored_checksum != computed_checksum {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    Ok(Header {
        version,
        model_id,
        dimensions,
        entry_count,
    })
}

fn validate_header(
    header: &Header,
    expected_model_id: &[u8; 32],
    expected_dimensions: usize,
) -> Result<(), VectorStorageError> {
    if header.model_id != *expected_model_id {
        return Err(VectorStorageError::ModelMismatch);
    }

    if header.dimensions as usize != expected_dimensions {
        return Err(VectorStorageError::DimensionMismatch {
            expected: expected_dimensions,
            got: header.dimensions as usize,
        });
    }

    Ok(())
}

fn write_header(writer: &mut BufWriter<File>, header: &Header) -> Result<(), VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

fn read_entry(
    reader: &mut BufReader<File>,
    dimensions: usize,
) -> Result<StoredEntry, VectorStorageError> {
    let mut id_len_bytes = [0u8; 2];
    reader.read_exact(&mut id_len_bytes)?;
    let id_len = u16::from_le_bytes(id_len_bytes) as usize;

    let mut id_bytes = vec![0u8; id_len];
    reader.read_exact(&mut id_bytes)?;
    let id = String::from_utf8(id_bytes)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("Invalid id bytes: {}", e)))?;

    let mut meta_len_bytes = [0u8; 4];
    reader.read_exact(&mut meta_len_bytes)?;
    let meta_len = u32::from_le_bytes(meta_len_bytes) as usize;

    let mut meta_bytes = vec![0u8; meta_len];
    reader.read_exact(&mut meta_bytes)?;
    let meta: ItemMeta = serde_json::from_slice(&meta_bytes)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("Invalid metadata: {}", e)))?;

    let mut embedding = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        embedding.push(f32::from_le_bytes(float_bytes));
    }

    Ok((id, meta, embedding))
}

fn write_entry(
    writer: &mut BufWriter<File>,
    id: &str,
    meta: &ItemMeta,
    embedding: &[f32],
) -> Result<(), VectorStorageError> {
    let id_bytes = id.as_bytes();
    // The on-disk format stores a u16 id length; longer ids would be
    // unreadable on the next load, so reject them at write time.
    let id_len = u16::try_from(id_bytes.len()).map_err(|_| {
        VectorStorageError::InvalidFormat(format!("Id too long to store: {} bytes", id_bytes.len()))
    })?;
    let meta_bytes = serde_json::to_vec(meta)
        .map_err(|e| VectorStorageError::InvalidFormat(format!("Metadata encoding: {}", e)))?;

    writer.write_all(&id_len.to_le_bytes())?;
    writer.write_all(id_bytes)?;
    writer.write_all(&(meta_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&meta_bytes)?;

    for &value in embedding {
        writer.write_all(&value.to_le_bytes())?;
    }

    Ok(())
}
