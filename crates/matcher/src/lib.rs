//! Answer-image matching for CityQuest.
//!
//! [`resolver`] turns a stored answer identifier into bytes by probing an
//! ordered list of paths; [`matcher`] embeds the player's photo once and
//! keeps the best-scoring candidate.

pub mod matcher;
pub mod resolver;

pub use matcher::{
    CandidateError, CandidateOutcome, CandidateSet, MatchError, MatchReport, compare_pair,
    match_candidates,
};
pub use resolver::{AnswerImageResolver, AnswerImageSource, ResolveError, ResolvedImage};
