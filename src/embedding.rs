//! Embedding index and similarity retriever.
//!
//! The index holds one vector per corpus case, in corpus order, built once
//! at startup from each case's central-problem text. Retrieval embeds the
//! query with the same model (hard precondition: same model for build and
//! query, not validated at runtime), scores cosine similarity against every
//! stored vector and returns the argmax case only above a fixed threshold.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::CaseRecord;
use crate::error::MentorError;

/// Minimum cosine similarity for a retrieval hit. Carried over from the
/// original system without documented derivation; a candidate for empirical
/// tuning, but deliberately not runtime-configurable.
pub const SIMILARITY_THRESHOLD: f32 = 0.4;

/// Opaque text-to-vector capability. The backing model must be identical
/// across index build and query time for scores to be meaningful.
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, text: &str) -> Result<Vec<f32>, MentorError>;

  async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MentorError> {
    let mut out = Vec::with_capacity(texts.len());
    for t in texts {
      out.push(self.embed(t).await?);
    }
    Ok(out)
  }
}

/// One vector per case, index-aligned with the corpus ordering.
/// Built once per process; rebuilding requires a restart.
pub struct EmbeddingIndex {
  vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
  #[instrument(level = "info", skip_all, fields(cases = cases.len()))]
  pub async fn build(
    cases: &[CaseRecord],
    embedder: &dyn Embedder,
  ) -> Result<Self, MentorError> {
    let texts: Vec<String> = cases.iter().map(|c| c.zentrales_problem.clone()).collect();
    let vectors = if texts.is_empty() {
      Vec::new()
    } else {
      embedder.embed_batch(&texts).await?
    };
    if vectors.len() != cases.len() {
      return Err(MentorError::Decode(format!(
        "embedding count mismatch: {} vectors for {} cases",
        vectors.len(),
        cases.len()
      )));
    }
    Ok(Self { vectors })
  }

  pub fn len(&self) -> usize {
    self.vectors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vectors.is_empty()
  }

  pub fn vectors(&self) -> &[Vec<f32>] {
    &self.vectors
  }
}

/// Normalized dot product, range [-1, 1]. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }
  let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm_a == 0.0 || norm_b == 0.0 {
    0.0
  } else {
    dot / (norm_a * norm_b)
  }
}

/// Find the single best-matching case for a free-text query.
///
/// Returns the argmax case only if its score is strictly greater than
/// [`SIMILARITY_THRESHOLD`]; ties resolve to the first occurrence in corpus
/// order. An empty corpus or empty index is a normal no-match, never an
/// error.
#[instrument(level = "debug", skip(query, cases, embedder, index), fields(query_len = query.len()))]
pub async fn find_best_match<'a>(
  query: &str,
  cases: &'a [CaseRecord],
  embedder: &dyn Embedder,
  index: &EmbeddingIndex,
) -> Result<Option<&'a CaseRecord>, MentorError> {
  if cases.is_empty() || index.is_empty() {
    return Ok(None);
  }

  let query_vec = embedder.embed(query).await?;

  let mut best_idx = 0usize;
  let mut best_score = f32::MIN;
  for (i, v) in index.vectors().iter().enumerate() {
    let score = cosine_similarity(&query_vec, v);
    if score > best_score {
      best_score = score;
      best_idx = i;
    }
  }

  debug!(target: "juramentor", best_idx, best_score, "Similarity scan complete");
  if best_score > SIMILARITY_THRESHOLD {
    Ok(cases.get(best_idx))
  } else {
    Ok(None)
  }
}
