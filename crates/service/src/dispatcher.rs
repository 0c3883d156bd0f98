//! `/compare` request handling: pick the request shape, decode payloads and
//! run the comparison on the blocking pool.

use core_types::decode_image_payload;
use matcher::{CandidateSet, compare_pair, match_candidates};
use serde_json::Value;
use tracing::info;

use crate::http::ApiError;
use crate::state::AppState;

const BAD_SHAPE: &str =
    "Invalid request format. Expected playerImage and answerImage (string or array), or img1 and img2";
const BAD_ANSWER: &str = "answerImage must be a string or array of strings";

/// A decoded `/compare` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareRequest {
    /// Player photo against stored answer photos.
    Match {
        probe: Vec<u8>,
        candidates: CandidateSet,
    },
    /// Two uploaded photos compared directly.
    Pair { first: Vec<u8>, second: Vec<u8> },
}

impl CompareRequest {
    pub fn parse(body: &Value) -> Result<Self, ApiError> {
        let obj = body
            .as_object()
            .filter(|obj| !obj.is_empty())
            .ok_or_else(|| ApiError::invalid("No data provided"))?;

        if let (Some(player), Some(answer)) = (obj.get("playerImage"), obj.get("answerImage")) {
            let candidates = parse_candidates(answer)?;
            let probe = decode_image_payload(image_text(player, "playerImage")?)?;
            return Ok(Self::Match { probe, candidates });
        }
        if let (Some(a), Some(b)) = (obj.get("img1"), obj.get("img2")) {
            let first = decode_image_payload(image_text(a, "img1")?)?;
            let second = decode_image_payload(image_text(b, "img2")?)?;
            return Ok(Self::Pair { first, second });
        }
        Err(ApiError::invalid(BAD_SHAPE))
    }
}

fn image_text<'a>(value: &'a Value, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_str()
        .ok_or_else(|| ApiError::invalid(format!("{field} must be a base64 string")))
}

fn parse_candidates(value: &Value) -> Result<CandidateSet, ApiError> {
    match value {
        Value::String(id) => Ok(CandidateSet::from(id.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<CandidateSet>>()
            .ok_or_else(|| ApiError::invalid(BAD_ANSWER)),
        _ => Err(ApiError::invalid(BAD_ANSWER)),
    }
}

/// Score a request, holding one compare permit for the duration.
pub async fn dispatch(state: &AppState, request: CompareRequest) -> Result<f32, ApiError> {
    let permit = state
        .compare_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(ApiError::internal)?;
    let provider = state.provider.clone();
    let resolver = state.resolver.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        match request {
            CompareRequest::Match { probe, candidates } => {
                match_candidates(&provider, resolver.as_ref(), &probe, &candidates)
                    .map(|report| report.result)
            }
            CompareRequest::Pair { first, second } => compare_pair(&provider, &first, &second),
        }
    })
    .await
    .map_err(ApiError::internal)?;

    let result = outcome?;
    info!(
        score = result.score,
        best = result.best_candidate_id.as_deref().unwrap_or("-"),
        "comparison served"
    );
    Ok(result.score)
}
