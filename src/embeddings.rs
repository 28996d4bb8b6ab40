//! Embedding encoders backed by fastembed.
//!
//! Two independent embedding spaces:
//! - `TextEncoder`: sentence embeddings for paper text and paper queries
//! - `JointEncoder`: CLIP ViT-B-32 text + vision towers sharing one space,
//!   so free-text queries can retrieve images
//!
//! Models are downloaded on first use and cached under the data directory.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{
    ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions, TextEmbedding,
};

/// Error type for encoder operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),
}

/// Sentence-embedding encoder for the paper collection.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct TextEncoder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl TextEncoder {
    /// Create a text encoder for the given model name.
    ///
    /// The model is downloaded on first use and cached in the `models/`
    /// subdirectory of `cache_dir`.
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let model_enum = parse_model_name(model_name)?;
        let models_dir = models_dir(cache_dir)?;

        let options = InitOptions::new(model_enum)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);

        let mut model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = probe_dimensions(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Generate an embedding for a single text.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = lock_model(&self.model)?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    /// Generate embeddings for multiple texts in one batch.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = lock_model(&self.model)?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }

    /// SHA256 hash of the model name for storage identification.
    pub fn model_id_hash(&self) -> [u8; 32] {
        model_id_hash(&self.model_name)
    }
}

/// CLIP joint image/text encoder for the image collection.
///
/// The text tower embeds queries, the vision tower embeds image files;
/// both produce vectors in the same space.
pub struct JointEncoder {
    text_model: Mutex<TextEmbedding>,
    vision_model: Mutex<ImageEmbedding>,
    dimensions: usize,
}

/// Model name recorded in storage headers for the joint space.
const JOINT_MODEL_NAME: &str = "clip-ViT-B-32";

impl JointEncoder {
    /// Create the CLIP text + vision model pair.
    pub fn new(cache_dir: PathBuf) -> Result<Self, EmbeddingError> {
        let models_dir = models_dir(cache_dir)?;

        let text_options = InitOptions::new(fastembed::EmbeddingModel::ClipVitB32)
            .with_cache_dir(models_dir.clone())
            .with_show_download_progress(true);
        let mut text_model = TextEmbedding::try_new(text_options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let vision_options = ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32)
            .with_cache_dir(models_dir)
            .with_show_download_progress(true);
        let vision_model = ImageEmbedding::try_new(vision_options)
            .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;

        let dimensions = probe_dimensions(&mut text_model)?;

        Ok(Self {
            text_model: Mutex::new(text_model),
            vision_model: Mutex::new(vision_model),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a text query into the joint space.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = lock_model(&self.text_model)?;

        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    /// Embed an image file into the joint space.
    pub fn embed_image(&self, path: &std::path::Path) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = lock_model(&self.vision_model)?;

        let embeddings = model
            .embed(vec![path], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }

    /// SHA256 hash of the model name for storage identification.
    pub fn model_id_hash(&self) -> [u8; 32] {
        model_id_hash(JOINT_MODEL_NAME)
    }
}

fn model_id_hash(name: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.finalize().into()
}

fn models_dir(cache_dir: PathBuf) -> Result<PathBuf, EmbeddingError> {
    let models_dir = cache_dir.join("models");
    std::fs::create_dir_all(&models_dir).map_err(|e| {
        EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
    })?;
    Ok(models_dir)
}

fn lock_model<T>(model: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, EmbeddingError> {
    model.lock().map_err(|e| {
        EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
    })
}

/// Parse model name string to fastembed enum.
fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" | "allminiml6v2q" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" | "bgesmallenv15q" => Ok(fastembed::EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-base-en-v1.5-q" | "bgebaseenv15q" => Ok(fastembed::EmbeddingModel::BGEBaseENV15Q),
        _ => Err(EmbeddingError::InvalidModel(format!(
            "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 (add -q suffix for quantized)",
            name
        ))),
    }
}

/// Probe the model to determine embedding dimensions.
fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
    let test_embeddings = model
        .embed(vec!["test"], None)
        .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

    test_embeddings
        .first()
        .map(|v| v.len())
        .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_name() {
        let temp_dir = std::env::temp_dir().join("shelf-embed-invalid");
        let result = TextEncoder::new("nonexistent-model", temp_dir);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[test]
    fn test_model_id_hash_is_deterministic() {
        assert_eq!(model_id_hash("all-MiniLM-L6-v2"), model_id_hash("all-MiniLM-L6-v2"));
        assert_ne!(model_id_hash("all-MiniLM-L6-v2"), model_id_hash(JOINT_MODEL_NAME));
    }

    // Integration tests require model download - run with --ignored
    #[test]
    #[ignore = "requires model download"]
    fn test_text_encoder_embeds() {
        let temp_dir = std::env::temp_dir().join("shelf-embed-test");
        let encoder = TextEncoder::new("all-MiniLM-L6-v2", temp_dir.clone()).unwrap();

        assert_eq!(encoder.name(), "all-MiniLM-L6-v2");
        assert_eq!(encoder.dimensions(), 384);

        let embedding = encoder.embed("Hello, world!").unwrap();
        assert_eq!(embedding.len(), 384);

        // fastembed output is L2-normalized
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_joint_encoder_text_and_image_share_dimensions() {
        let temp_dir = std::env::temp_dir().join("shelf-joint-test");
        let encoder = JointEncoder::new(temp_dir.clone()).unwrap();
        assert_eq!(encoder.dimensions(), 512);

        let text_vec = encoder.embed_text("a photo of a cat").unwrap();
        assert_eq!(text_vec.len(), encoder.dimensions());

        let img_path = temp_dir.join("probe.png");
        let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 40, 40, 255]));
        img.save(&img_path).unwrap();

        let image_vec = encoder.embed_image(&img_path).unwrap();
        assert_eq!(image_vec.len(), encoder.dimensions());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }
}
