//! Core shared types for CityQuest.
//!
//! These types intentionally avoid heavy dependencies: the embedding vector,
//! the cosine kernel used to score it, and the result record shared by the
//! matcher, the HTTP service and the CLI.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod payload;

pub use payload::{PayloadError, decode_image_payload, strip_data_uri};

/// Unit-length feature vector produced by an image encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Divide `raw` by its L2 norm.
    ///
    /// Returns `None` for empty vectors, vectors containing non-finite values
    /// and vectors whose norm is zero.
    pub fn normalized(raw: Vec<f32>) -> Option<Self> {
        if raw.is_empty() || raw.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let norm = l2_norm(&raw);
        if !norm.is_finite() || norm <= f64::EPSILON {
            return None;
        }
        Some(Self(
            raw.into_iter().map(|v| (f64::from(v) / norm) as f32).collect(),
        ))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f32 {
        l2_norm(&self.0) as f32
    }

    /// Cosine similarity against another embedding.
    pub fn cosine(&self, other: &Self) -> Option<f32> {
        cosine_similarity(&self.0, &other.0)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// `dot(a, b) / (|a| * |b|)`, accumulated in f64 and clamped to `[-1, 1]`.
///
/// Does not rely on either input being unit length. Returns `None` when the
/// lengths differ, either side is empty or has zero magnitude, or the result
/// is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return None;
    }
    let sim = dot / denom;
    sim.is_finite().then(|| sim.clamp(-1.0, 1.0) as f32)
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Outcome of comparing a probe image against one or more candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Best cosine similarity, in `[-1, 1]`.
    pub score: f32,
    /// Identifier of the candidate that produced `score`; `None` for direct
    /// two-image comparisons.
    pub best_candidate_id: Option<String>,
}
