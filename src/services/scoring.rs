//! Fantasy scoring policies and the score fingerprint used to keep reconciliation idempotent.

use sha2::{Digest, Sha256};

use crate::provider::MatchStats;

/// Fantasy score of a participant.
pub type Score = u32;

/// Players drafted by one participant for one match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Participant identity.
    pub user_id: String,
    /// Provider ids of the drafted players.
    pub player_ids: Vec<String>,
}

impl Roster {
    /// Roster with no players, used when the participant never drafted a team.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            player_ids: Vec::new(),
        }
    }
}

/// Turns a roster and the match score inputs into a score.
pub trait ScoringPolicy: Send + Sync {
    /// Compute the score. Must be deterministic for equal inputs.
    fn score(&self, roster: &Roster, stats: &MatchStats) -> Score;
}

impl<F> ScoringPolicy for F
where
    F: Fn(&Roster, &MatchStats) -> Score + Send + Sync,
{
    fn score(&self, roster: &Roster, stats: &MatchStats) -> Score {
        self(roster, stats)
    }
}

/// Sums the provider points of every drafted player, rounded and clamped at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RosterPointsPolicy;

impl ScoringPolicy for RosterPointsPolicy {
    fn score(&self, roster: &Roster, stats: &MatchStats) -> Score {
        let total: f64 = roster
            .player_ids
            .iter()
            .map(|id| stats.points_for(id))
            .sum();

        if total.is_finite() && total > 0.0 {
            total.round().min(Score::MAX as f64) as Score
        } else {
            0
        }
    }
}

/// Fingerprint of everything that went into a score: match, participant, roster and stats.
pub fn score_version(match_id: &str, roster: &Roster, stats: &MatchStats) -> String {
    let mut players = roster.player_ids.iter().map(String::as_str).collect::<Vec<_>>();
    players.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(match_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(roster.user_id.as_bytes());
    hasher.update([0u8]);
    for player in players {
        hasher.update(player.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(stats.digest().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Roster {
        Roster {
            user_id: "u1".into(),
            player_ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn sums_points_for_drafted_players() {
        let stats = MatchStats::from_points([("a", 20.0), ("b", 17.4), ("c", 100.0)]);
        assert_eq!(RosterPointsPolicy.score(&roster(&["a", "b"]), &stats), 37);
    }

    #[test]
    fn missing_players_score_nothing() {
        let stats = MatchStats::from_points([("a", 5.0)]);
        assert_eq!(RosterPointsPolicy.score(&roster(&["x", "y"]), &stats), 0);
        assert_eq!(RosterPointsPolicy.score(&Roster::empty("u1"), &stats), 0);
    }

    #[test]
    fn negative_totals_clamp_to_zero() {
        let stats = MatchStats::from_points([("a", -6.0), ("b", 2.0)]);
        assert_eq!(RosterPointsPolicy.score(&roster(&["a", "b"]), &stats), 0);
    }

    #[test]
    fn closures_are_policies() {
        let fixed = |_: &Roster, _: &MatchStats| -> Score { 42 };
        assert_eq!(fixed.score(&Roster::default(), &MatchStats::default()), 42);
    }

    #[test]
    fn version_is_stable_and_input_sensitive() {
        let stats = MatchStats::from_points([("a", 1.0)]);
        let base = score_version("m1", &roster(&["a", "b"]), &stats);

        assert_eq!(base, score_version("m1", &roster(&["b", "a"]), &stats));
        assert_ne!(base, score_version("m2", &roster(&["a", "b"]), &stats));
        assert_ne!(base, score_version("m1", &roster(&["a"]), &stats));
        assert_ne!(
            base,
            score_version("m1", &roster(&["a", "b"]), &MatchStats::from_points([("a", 2.0)]))
        );
    }
}
