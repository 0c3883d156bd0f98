//! Score a player's photo against one or more stored answer photos.

use core_types::{ComparisonResult, Embedding};
use image_embedding::{EmbedError, EmbeddingProvider};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::resolver::{AnswerImageSource, ResolveError};

/// Below every possible cosine value.
const NO_SCORE: f32 = -2.0;

/// Ordered answer identifiers; a single identifier is a one-element set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateSet(Vec<String>);

impl CandidateSet {
    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for CandidateSet {
    fn from(id: String) -> Self {
        Self(vec![id])
    }
}

impl From<&str> for CandidateSet {
    fn from(id: &str) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<Vec<String>> for CandidateSet {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl FromIterator<String> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Error)]
pub enum CandidateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("embedding dimensions do not match the probe")]
    Incomparable,
}

/// What happened to one candidate.
#[derive(Debug)]
pub struct CandidateOutcome {
    pub id: String,
    pub score: Result<f32, CandidateError>,
}

#[derive(Debug)]
pub struct MatchReport {
    pub result: ComparisonResult,
    /// One entry per candidate, in input order.
    pub outcomes: Vec<CandidateOutcome>,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Error processing player image: {0}")]
    Probe(#[source] EmbedError),
    #[error("Could not load any answer images")]
    NoValidCandidates(Vec<CandidateOutcome>),
    #[error("Error processing images: {0}")]
    Pair(#[source] EmbedError),
    #[error("images produced incomparable embeddings")]
    Incomparable,
}

impl MatchError {
    /// True when the request, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::NoValidCandidates(_) => true,
            Self::Probe(e) | Self::Pair(e) => e.is_client_error(),
            Self::Incomparable => false,
        }
    }
}

/// Embed `probe` once, then score it against each candidate in order.
///
/// Failing candidates are skipped; the call fails only when none succeeds.
pub fn match_candidates(
    provider: &EmbeddingProvider,
    source: &dyn AnswerImageSource,
    probe: &[u8],
    candidates: &CandidateSet,
) -> Result<MatchReport, MatchError> {
    let probe = provider.embed(probe).map_err(MatchError::Probe)?;

    let outcomes: Vec<CandidateOutcome> = candidates
        .ids()
        .iter()
        .map(|id| CandidateOutcome {
            id: id.clone(),
            score: score_candidate(provider, source, &probe, id),
        })
        .collect();

    let mut best_score = NO_SCORE;
    let mut best_id = None;
    for outcome in &outcomes {
        match &outcome.score {
            Ok(score) => {
                debug!(candidate = %outcome.id, score, "candidate scored");
                if *score > best_score {
                    best_score = *score;
                    best_id = Some(outcome.id.clone());
                }
            }
            Err(err) => {
                warn!(candidate = %outcome.id, error = %err, "skipping answer image");
            }
        }
    }

    match best_id {
        Some(id) => {
            info!(best = %id, score = best_score, candidates = outcomes.len(), "match complete");
            Ok(MatchReport {
                result: ComparisonResult {
                    score: best_score,
                    best_candidate_id: Some(id),
                },
                outcomes,
            })
        }
        None => Err(MatchError::NoValidCandidates(outcomes)),
    }
}

fn score_candidate(
    provider: &EmbeddingProvider,
    source: &dyn AnswerImageSource,
    probe: &Embedding,
    id: &str,
) -> Result<f32, CandidateError> {
    let bytes = source.load(id)?;
    let answer = provider.embed(&bytes)?;
    probe.cosine(&answer).ok_or(CandidateError::Incomparable)
}

/// Direct two-image comparison; either image failing fails the call.
pub fn compare_pair(
    provider: &EmbeddingProvider,
    a: &[u8],
    b: &[u8],
) -> Result<ComparisonResult, MatchError> {
    let a = provider.embed(a).map_err(MatchError::Pair)?;
    let b = provider.embed(b).map_err(MatchError::Pair)?;
    let score = a.cosine(&b).ok_or(MatchError::Incomparable)?;
    Ok(ComparisonResult {
        score,
        best_candidate_id: None,
    })
}
