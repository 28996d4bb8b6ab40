use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default text embedding model for the paper collection
const DEFAULT_TEXT_MODEL: &str = "all-MiniLM-L6-v2";

/// Neighbors requested per query before threshold filtering
const DEFAULT_TOP_K: usize = 3;

/// Additive distance slack over the best match, per collection.
/// The sentence-embedding space is tight; the CLIP joint space runs on a
/// wider distance scale, so it gets a looser margin.
const DEFAULT_PAPER_MARGIN: f32 = 0.15;
const DEFAULT_IMAGE_MARGIN: f32 = 0.40;

/// Characters of extracted text stored as a human-readable preview
const DEFAULT_PREVIEW_CHARS: usize = 500;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Embedding model for paper text (e.g. "all-MiniLM-L6-v2")
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Neighbors requested per search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Adaptive-threshold margin for paper search
    #[serde(default = "default_paper_margin")]
    pub paper_margin: f32,

    /// Adaptive-threshold margin for image search
    #[serde(default = "default_image_margin")]
    pub image_margin: f32,

    /// Preview prefix length stored with each paper
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Vector files and model cache live here
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Organized papers land here (topic subdirectories below it)
    #[serde(default = "default_papers_dir")]
    pub papers_dir: PathBuf,

    /// Indexed images' library root
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            top_k: default_top_k(),
            paper_margin: default_paper_margin(),
            image_margin: default_image_margin(),
            preview_chars: default_preview_chars(),
            data_dir: default_data_dir(),
            papers_dir: default_papers_dir(),
            images_dir: default_images_dir(),
        }
    }
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_paper_margin() -> f32 {
    DEFAULT_PAPER_MARGIN
}

fn default_image_margin() -> f32 {
    DEFAULT_IMAGE_MARGIN
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_papers_dir() -> PathBuf {
    PathBuf::from("library").join("papers")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("library").join("images")
}

impl Config {
    /// Load config from a YAML file, creating it with defaults on first run.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&config_str)?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_yml::to_string(self)?)?;
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.top_k == 0 {
            anyhow::bail!("top_k must be greater than 0");
        }

        for (name, margin) in [
            ("paper_margin", self.paper_margin),
            ("image_margin", self.image_margin),
        ] {
            if !margin.is_finite() || margin < 0.0 {
                anyhow::bail!("{} must be a non-negative number, got {}", name, margin);
            }
        }

        if self.preview_chars == 0 {
            anyhow::bail!("preview_chars must be greater than 0");
        }

        Ok(())
    }
}
