//! Local Embedding Inference
//!
//! fastembed (ONNX) with bge-small-en-v1.5: 384 dimensions, no network at
//! inference time. The model is process-global and initialized lazily on
//! first use; the download cache location honors `ENGRAM_FASTEMBED_CACHE`.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Mutex, OnceLock};

use super::{l2_normalize, EmbeddingError};

/// Output dimensions of bge-small-en-v1.5
pub const LOCAL_EMBEDDING_DIMENSIONS: usize = 384;

/// Model identifier reported in manifests
pub const LOCAL_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Maximum text length in bytes before truncation
const MAX_TEXT_LENGTH: usize = 8192;

/// Batch size for embedding generation
const BATCH_SIZE: usize = 32;

static MODEL: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("ENGRAM_FASTEMBED_CACHE") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "engram", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

fn get_model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = MODEL.get_or_init(|| {
        let cache = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&cache) {
            tracing::warn!("failed to create fastembed cache dir {:?}: {}", cache, e);
        }

        let options = InitOptions::new(EmbeddingModel::BGESmallENV15)
            .with_show_download_progress(false)
            .with_cache_dir(cache);

        TextEmbedding::try_new(options)
            .map(Mutex::new)
            .map_err(|e| format!("failed to initialize {LOCAL_EMBEDDING_MODEL}: {e}"))
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

/// Truncate at a char boundary at or below the byte limit
fn truncate(text: &str) -> &str {
    if text.len() <= MAX_TEXT_LENGTH {
        return text;
    }
    let mut end = MAX_TEXT_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Local embedding provider
#[derive(Debug, Clone, Default)]
pub struct LocalEmbedder {
    _private: (),
}

impl LocalEmbedder {
    /// Create a local embedder; the model loads on first embed call
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Stable model identifier
    pub fn model_name(&self) -> &'static str {
        LOCAL_EMBEDDING_MODEL
    }

    /// Output vector length
    pub fn dimensions(&self) -> usize {
        LOCAL_EMBEDDING_DIMENSIONS
    }

    /// Whether the model initialized (or can initialize) successfully
    pub fn is_ready(&self) -> bool {
        get_model().is_ok()
    }

    /// Embed a single text
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = get_model()?;
        let embeddings = model
            .embed(vec![truncate(text)], None)
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;

        let mut vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Failed("no embedding generated".to_string()))?;
        l2_normalize(&mut vector);
        Ok(vector)
    }

    /// Embed a batch of texts
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = get_model()?;
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let truncated: Vec<&str> = chunk.iter().map(|t| truncate(t)).collect();
            let embeddings = model
                .embed(truncated, None)
                .map_err(|e| EmbeddingError::Failed(e.to_string()))?;
            for mut vector in embeddings {
                l2_normalize(&mut vector);
                all.push(vector);
            }
        }
        Ok(all)
    }
}

// ============================================================================
// TESTS
// ============================================================================
