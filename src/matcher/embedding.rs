use anyhow::{anyhow, bail, Context, Result};
use moka::sync::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Unit-length embedding vectors, one per input text
pub type Embeddings = Arc<Vec<Vec<f32>>>;

/// Sentence embedding backend. Optional: amenity matching works without one.
pub trait Embedder: Send + Sync {
    /// Embed every text, in order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// `false` for backends that can never produce vectors
    fn is_available(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &str;
}

/// Stand-in used when no embedding backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmbedder;

impl Embedder for NullEmbedder {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("no embedding backend configured")
    }

    fn is_available(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &str {
        "none"
    }
}

#[derive(Debug, Clone)]
pub struct RemoteEmbedderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` backend.
///
/// Scoring runs on blocking threads, so `embed` drives the async client on the
/// ambient tokio runtime via `Handle::block_on`. Calling it from an async task
/// directly would panic; it must run inside `spawn_blocking`.
pub struct RemoteEmbedder {
    client: Client,
    config: RemoteEmbedderConfig,
}

impl RemoteEmbedder {
    pub fn new(config: RemoteEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build embedding HTTP client")?;
        Ok(Self { client, config })
    }

    async fn embed_remote(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.config.endpoint).json(&EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.context("Embedding request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Embedding backend returned {status}");
        }
        let body: EmbeddingResponse = response
            .json()
            .await
            .context("Malformed embedding response")?;
        if body.data.len() != texts.len() {
            bail!(
                "Embedding backend returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            );
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for RemoteEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| anyhow!("remote embeddings need a tokio runtime"))?;
        handle.block_on(self.embed_remote(texts))
    }

    fn backend_name(&self) -> &str {
        &self.config.model
    }
}

/// Owns an embedding backend plus LRU caches for alias sets and sentence batches.
///
/// Created once and shared by reference; failed calls are logged and not cached,
/// so a flaky backend is simply retried on the next listing.
pub struct EmbeddingService {
    embedder: Arc<dyn Embedder>,
    alias_cache: Cache<Vec<String>, Embeddings>,
    sentence_cache: Cache<Vec<String>, Embeddings>,
}

impl EmbeddingService {
    pub fn new(embedder: Arc<dyn Embedder>, cache_size: u64) -> Self {
        Self {
            embedder,
            alias_cache: Cache::new(cache_size),
            sentence_cache: Cache::new(cache_size),
        }
    }

    /// Service with no backend; every lookup returns `None`
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullEmbedder), 1)
    }

    pub fn is_available(&self) -> bool {
        self.embedder.is_available()
    }

    pub fn encode_aliases(&self, aliases: &[String]) -> Option<Embeddings> {
        self.encode_cached(&self.alias_cache, aliases)
    }

    pub fn encode_sentences(&self, sentences: &[String]) -> Option<Embeddings> {
        self.encode_cached(&self.sentence_cache, sentences)
    }

    fn encode_cached(&self, cache: &Cache<Vec<String>, Embeddings>, texts: &[String]) -> Option<Embeddings> {
        if texts.is_empty() || !self.is_available() {
            return None;
        }
        let key = texts.to_vec();
        if let Some(hit) = cache.get(&key) {
            return Some(hit);
        }

        match self.embedder.embed(texts) {
            Ok(vectors) if vectors.len() == texts.len() => {
                let vectors: Embeddings = Arc::new(vectors.into_iter().map(normalize).collect());
                cache.insert(key, Arc::clone(&vectors));
                Some(vectors)
            }
            Ok(vectors) => {
                warn!(
                    backend = self.embedder.backend_name(),
                    expected = texts.len(),
                    got = vectors.len(),
                    "embedding count mismatch, skipping semantic check"
                );
                None
            }
            Err(e) => {
                warn!(backend = self.embedder.backend_name(), error = %e, "embedding failed, skipping semantic check");
                None
            }
        }
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

/// Dot product of two unit vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Highest alias/sentence similarity and the index of that sentence
pub fn best_match(aliases: &[Vec<f32>], sentences: &[Vec<f32>]) -> Option<(f32, usize)> {
    let mut best: Option<(f32, usize)> = None;
    for alias in aliases {
        for (idx, sentence) in sentences.iter().enumerate() {
            let score = cosine(alias, sentence);
            if best.map_or(true, |(b, _)| score > b) {
                best = Some((score, idx));
            }
        }
    }
    debug!(score = best.map(|(s, _)| s), "best embedding similarity");
    best
}
