//! # Embedder
//!
//! Text-to-vector embedding for retrieval.
//!
//! The production implementation runs the
//! `sentence-transformers/paraphrase-MiniLM-L6-v2` model through Candle
//! (pure Rust ML framework): tokenize, BERT forward pass, attention-masked
//! mean pooling, then L2 normalization. Output is a 384-dimensional vector.
//!
//! Normalization matters downstream: the vector index measures Euclidean
//! distance, and the `1 - distance` similarity transform applied by the
//! composer assumes distances stay in a bounded range, which holds for
//! unit-length vectors.
//!
//! The [`Embedder`] trait is the seam the retriever depends on, so tests can
//! substitute a deterministic stub instead of downloading model weights.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;

use crate::BoxError;

/// Hugging Face model id of the sentence-embedding model.
const MODEL_ID: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

/// Output dimensionality of the MiniLM-L6 family.
const EMBEDDING_DIMENSION: usize = 384;

/// Maps free text to a fixed-dimension vector.
///
/// Implementations must be deterministic for a given model version and must
/// accept the empty string without error.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a vector of length [`Embedder::dimension`].
    ///
    /// # Errors
    /// Surfaces model invocation failures (e.g. resource exhaustion). Not
    /// handled locally; callers propagate.
    fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError>;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;
}

/// Sentence embeddings via Candle.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbedder {
    /// Load the model from the Hugging Face Hub (cached locally after the
    /// first download).
    ///
    /// # Errors
    /// Returns an error if any model file cannot be fetched or loaded. This
    /// is fatal to process startup.
    pub fn load() -> Result<Self, BoxError> {
        let device = Device::Cpu;
        let revision = "main";

        let repo = Repo::with_revision(MODEL_ID.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new()?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json")?;
        let tokenizer_filename = api_repo.get("tokenizer.json")?;
        let weights_filename = api_repo.get("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config)?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Mean pooling over token embeddings, weighted by the attention mask.
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> Result<Tensor, BoxError> {
        // embeddings: [1, seq_len, hidden]; mask must broadcast as [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let masked = embeddings.broadcast_mul(&mask)?;
        let sum = masked.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        let mean = sum.broadcast_div(&count)?;

        Ok(mean.squeeze(0)?)
    }

    /// L2 normalize the pooled embedding.
    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, BoxError> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbedder {
    /// Embed text into a dense vector.
    ///
    /// Input exceeding 512 tokens is truncated by the tokenizer. The empty
    /// string embeds to whatever the model produces for its special tokens;
    /// it never errors.
    fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| format!("Tokenization error: {}", e))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;

        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}
