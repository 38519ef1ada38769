//! Match-data provider abstraction and the CricAPI client implementing it.

pub mod cricapi;
mod models;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use cricapi::CricApiProvider;

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures raised while talking to the upstream match feed.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Building the HTTP client failed.
    #[error("failed to build match provider client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// No API key configured; the feed cannot be queried.
    #[error("match provider api key is not configured")]
    MissingApiKey,
    /// The HTTP request could not be sent or timed out.
    #[error("failed to reach match provider endpoint `{endpoint}`")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Upstream answered with a non-success HTTP status.
    #[error("match provider endpoint `{endpoint}` answered with status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    /// Payload could not be decoded.
    #[error("failed to decode match provider payload from `{endpoint}`")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Payload decoded but reported a failure (`status` other than `success`).
    #[error("match provider endpoint `{endpoint}` reported `{status}`")]
    Failed {
        endpoint: &'static str,
        status: String,
    },
}

/// Coarse match state derived from the provider's `ms` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    /// Not started yet.
    Fixture,
    /// In progress.
    Live,
    /// Finished.
    Result,
    /// Anything the feed reports that we do not recognise.
    Unknown,
}

impl MatchState {
    /// Parse the provider's `ms` value.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fixture" => MatchState::Fixture,
            "live" => MatchState::Live,
            "result" => MatchState::Result,
            _ => MatchState::Unknown,
        }
    }

    /// Whether the provider publishes player points for matches in this state.
    pub fn has_points(self) -> bool {
        matches!(self, MatchState::Live | MatchState::Result)
    }
}

/// Per-player fantasy points for one match, as reported upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchStats {
    /// Points keyed by provider player id, in feed order.
    pub player_points: IndexMap<String, f64>,
}

impl MatchStats {
    /// Build stats from `(player_id, points)` pairs.
    pub fn from_points<I, K>(points: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            player_points: points.into_iter().map(|(id, pts)| (id.into(), pts)).collect(),
        }
    }

    /// Points credited to `player_id`, zero when the player is absent from the feed.
    pub fn points_for(&self, player_id: &str) -> f64 {
        self.player_points.get(player_id).copied().unwrap_or(0.0)
    }

    /// Order-independent hex digest of the payload; two equal snapshots always agree.
    pub fn digest(&self) -> String {
        let mut entries = self.player_points.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        for (id, points) in entries {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
            hasher.update(points.to_bits().to_be_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// One match from the live feed.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    /// Provider-assigned id.
    pub id: String,
    /// First team label.
    pub team_one: String,
    /// Second team label.
    pub team_two: String,
    /// Human-readable status text.
    pub status: String,
    /// Parsed match state.
    pub state: MatchState,
    /// Scheduled start (GMT) as reported.
    pub scheduled_at: Option<String>,
    /// First team score line, when play has started.
    pub team_one_score: Option<String>,
    /// Second team score line, when play has started.
    pub team_two_score: Option<String>,
    /// Score inputs; `None` when the match carries none this tick.
    pub stats: Option<MatchStats>,
}

impl MatchSnapshot {
    /// Short label such as `India vs Australia`.
    pub fn name(&self) -> String {
        format!("{} vs {}", self.team_one, self.team_two)
    }
}

/// A player available for drafting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadPlayer {
    /// Provider player id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form role text as reported upstream.
    pub role: String,
    /// Team the player belongs to, when known.
    pub team: Option<String>,
}

/// Abstraction over the upstream match feed so the reconciler can be driven by fakes.
pub trait MatchProvider: Send + Sync {
    /// Current matches as listed by the feed, without score inputs. One upstream call.
    fn fetch_feed(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>>;
    /// Current matches with their score inputs.
    fn fetch_matches(&self) -> BoxFuture<'static, ProviderResult<Vec<MatchSnapshot>>>;
    /// Squad list for one match.
    fn fetch_squad(&self, match_id: String) -> BoxFuture<'static, ProviderResult<Vec<SquadPlayer>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_ignores_feed_order() {
        let a = MatchStats::from_points([("p1", 10.0), ("p2", 4.5)]);
        let b = MatchStats::from_points([("p2", 4.5), ("p1", 10.0)]);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn digest_tracks_point_changes() {
        let a = MatchStats::from_points([("p1", 10.0)]);
        let b = MatchStats::from_points([("p1", 11.0)]);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn match_state_parsing() {
        assert_eq!(MatchState::from_provider("live"), MatchState::Live);
        assert_eq!(MatchState::from_provider("Result"), MatchState::Result);
        assert_eq!(MatchState::from_provider("fixture"), MatchState::Fixture);
        assert_eq!(MatchState::from_provider("abandoned"), MatchState::Unknown);
        assert!(MatchState::Live.has_points());
        assert!(!MatchState::Fixture.has_points());
    }
}
