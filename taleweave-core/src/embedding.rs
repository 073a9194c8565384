//! Vector embedding abstraction layer.
//!
//! Provides a trait-based interface for generating text embeddings used by
//! the store (at write time) and the retrieval engine (at query time). Both
//! sides must use the same provider, or similarity scores are meaningless.
//!
//! The production path is `all-MiniLM-L6-v2` through `fastembed` (behind the
//! `onnx` feature). [`HashingEmbeddingProvider`] is a deterministic offline
//! stand-in that still gives sensible lexical-overlap similarity.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, TaleError};
use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations must be `Send + Sync` for use from async contexts.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// Returns a vector of `dimensions()` floats.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Embedding`] if the model fails to produce an
    /// embedding.
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts.
    ///
    /// Default implementation calls `embed` in a loop.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding in the batch fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// Compute the cosine similarity between two embedding vectors.
///
/// Returns a value in \[-1.0, 1.0\]. Returns `0.0` if either vector has zero
/// magnitude.
///
/// # Errors
///
/// Returns [`TaleError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Result<f32> {
    if a.0.len() != b.0.len() {
        return Err(TaleError::DimensionMismatch {
            expected: a.0.len(),
            actual: b.0.len(),
        });
    }

    let mut dot = 0.0_f32;
    let mut mag_a = 0.0_f32;
    let mut mag_b = 0.0_f32;

    for (x, y) in a.0.iter().zip(b.0.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Hashing provider (default offline)
// ---------------------------------------------------------------------------

/// Feature-hashed bag-of-words embeddings.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into a bucket with a
/// hash-derived sign; the result is L2-normalized. Identical texts embed
/// identically and texts sharing words score positively, which is enough for
/// recall over a hand-authored world without loading a model.
pub struct HashingEmbeddingProvider {
    dims: usize,
}

impl HashingEmbeddingProvider {
    /// Create a new hashing provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0100_0000_01b3;
        token.bytes().fold(OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(PRIME)
        })
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut raw = vec![0.0_f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::fnv1a(token);
            // Modulo by the dimension count keeps the index in range.
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            raw[bucket] += sign;
        }

        Ok(unit_length(raw))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "fnv-hashed-bag-of-words"
    }
}

// ---------------------------------------------------------------------------
// Test providers
// ---------------------------------------------------------------------------

/// Embeds everything as the zero vector.
///
/// Every memory then ties at score 0, so recall order is pure recency. The
/// store and ranker tests use it to pin ordering and the zero-norm path.
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    /// Zero vectors of length `dimensions`.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding(vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "zero"
    }
}

/// Ignores the text and draws a fresh unit vector per call.
///
/// Gives the ranker well-spread scores over a large synthetic world. Use
/// [`RandomEmbeddingProvider::seeded`] when two runs must see the same
/// vectors.
pub struct RandomEmbeddingProvider {
    dims: usize,
    rng: Mutex<StdRng>,
}

impl RandomEmbeddingProvider {
    /// Seeded from OS entropy.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self::with_rng(dimensions, StdRng::from_entropy())
    }

    /// Reproducible sequence of vectors for `seed`.
    #[must_use]
    pub fn seeded(dimensions: usize, seed: u64) -> Self {
        Self::with_rng(dimensions, StdRng::seed_from_u64(seed))
    }

    fn with_rng(dimensions: usize, rng: StdRng) -> Self {
        Self {
            dims: dimensions.max(1),
            rng: Mutex::new(rng),
        }
    }
}

impl EmbeddingProvider for RandomEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Embedding> {
        let raw: Vec<f32> = {
            let mut rng = self.rng.lock();
            (0..self.dims).map(|_| rng.gen_range(-1.0..1.0)).collect()
        };
        Ok(unit_length(raw))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "uniform-random"
    }
}

/// Scale `raw` to length 1. An all-zero vector is returned unchanged.
fn unit_length(raw: Vec<f32>) -> Embedding {
    let mag: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag < f32::EPSILON {
        return Embedding(raw);
    }
    Embedding(raw.into_iter().map(|x| x / mag).collect())
}

// ---------------------------------------------------------------------------
// LRU cache wrapper
// ---------------------------------------------------------------------------

/// Memoizes another provider's embeddings in a bounded LRU cache.
///
/// Players repeat themselves ("look around", "talk to Thorin"); real models
/// take tens of milliseconds per call, so repeated queries are served from
/// the cache.
pub struct CachedEmbeddingProvider<P> {
    inner: P,
    cache: Mutex<LruCache<String, Embedding>>,
}

impl<P: EmbeddingProvider> CachedEmbeddingProvider<P> {
    /// Wrap `inner` with a cache of `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(inner: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached embeddings.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbeddingProvider<P> {
    fn embed(&self, text: &str) -> Result<Embedding> {
        if let Some(hit) = self.cache.lock().get(text) {
            return Ok(hit.clone());
        }
        // The lock is not held across the (possibly slow) model call.
        let embedding = self.inner.embed(text)?;
        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

// ---------------------------------------------------------------------------
// ONNX provider
// ---------------------------------------------------------------------------

/// `all-MiniLM-L6-v2` via `fastembed` (ONNX Runtime), 384 dimensions.
///
/// Model files are downloaded on first use into fastembed's cache directory.
#[cfg(feature = "onnx")]
pub struct FastEmbedProvider {
    model: Mutex<fastembed::TextEmbedding>,
}

#[cfg(feature = "onnx")]
impl FastEmbedProvider {
    /// Load the model.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Embedding`] if the ONNX model cannot be loaded.
    pub fn new() -> Result<Self> {
        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2);
        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| TaleError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

#[cfg(feature = "onnx")]
impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self
            .model
            .lock()
            .embed(vec![text], None)
            .map_err(|e| TaleError::Embedding(e.to_string()))?;
        vectors
            .pop()
            .map(Embedding)
            .ok_or_else(|| TaleError::Embedding("model returned no vectors".into()))
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
