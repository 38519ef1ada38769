use serde::Deserialize;

use super::{MatchSnapshot, MatchState, SquadPlayer};

pub const SUCCESS: &str = "success";

/// Common CricAPI envelope: `{status, data}`. `data` is absent on failures.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRow {
    pub id: String,
    #[serde(default)]
    pub t1: String,
    #[serde(default)]
    pub t2: String,
    #[serde(default)]
    pub t1s: Option<String>,
    #[serde(default)]
    pub t2s: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ms: String,
    #[serde(rename = "dateTimeGMT", default)]
    pub date_time_gmt: Option<String>,
}

impl ScoreRow {
    pub fn state(&self) -> MatchState {
        MatchState::from_provider(&self.ms)
    }

    pub fn into_snapshot(self) -> MatchSnapshot {
        let state = self.state();
        MatchSnapshot {
            id: self.id,
            team_one: self.t1,
            team_two: self.t2,
            status: self.status,
            state,
            scheduled_at: self.date_time_gmt,
            team_one_score: self.t1s.filter(|s| !s.is_empty()),
            team_two_score: self.t2s.filter(|s| !s.is_empty()),
            stats: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchPoints {
    #[serde(default)]
    pub totals: Vec<PlayerTotal>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerTotal {
    pub id: String,
    #[serde(default)]
    pub points: f64,
}

/// `match_squad` returns one entry per team; older payloads carried a flat `players` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SquadData {
    Teams(Vec<SquadTeam>),
    Flat { players: Vec<SquadRow> },
}

#[derive(Debug, Deserialize)]
pub struct SquadTeam {
    #[serde(rename = "teamName", default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub players: Vec<SquadRow>,
}

#[derive(Debug, Deserialize)]
pub struct SquadRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl SquadData {
    pub fn into_players(self) -> Vec<SquadPlayer> {
        match self {
            SquadData::Teams(teams) => teams
                .into_iter()
                .flat_map(|team| {
                    let name = team.team_name;
                    team.players
                        .into_iter()
                        .map(move |row| row.into_player(name.clone()))
                })
                .collect(),
            SquadData::Flat { players } => {
                players.into_iter().map(|row| row.into_player(None)).collect()
            }
        }
    }
}

impl SquadRow {
    fn into_player(self, team: Option<String>) -> SquadPlayer {
        SquadPlayer {
            id: self.id,
            name: self.name,
            role: self.role,
            team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cric_score_rows() {
        let payload = r#"{
            "status": "success",
            "data": [
                {"id": "m-1", "t1": "India [IND]", "t2": "Australia [AUS]", "t1s": "187/4 (20)",
                 "t2s": "", "status": "India opt to bat", "ms": "live",
                 "dateTimeGMT": "2024-05-01T14:00:00", "matchType": "t20"},
                {"id": "m-2", "t1": "England", "t2": "Pakistan", "status": "Match starts at 10:00",
                 "ms": "fixture"}
            ]
        }"#;

        let envelope: Envelope<Vec<ScoreRow>> = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.status, SUCCESS);

        let snapshots = envelope
            .data
            .unwrap()
            .into_iter()
            .map(ScoreRow::into_snapshot)
            .collect::<Vec<_>>();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].state, MatchState::Live);
        assert_eq!(snapshots[0].team_one_score.as_deref(), Some("187/4 (20)"));
        assert_eq!(snapshots[0].team_two_score, None);
        assert_eq!(snapshots[1].state, MatchState::Fixture);
        assert!(snapshots.iter().all(|s| s.stats.is_none()));
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let payload = r#"{"status": "failure", "reason": "hits today exceeded"}"#;
        let envelope: Envelope<Vec<ScoreRow>> = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.status, "failure");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn parses_match_point_totals() {
        let payload = r#"{
            "status": "success",
            "data": {"innings": [], "totals": [
                {"id": "p1", "name": "A", "points": 37},
                {"id": "p2", "name": "B", "points": 81.5}
            ]}
        }"#;
        let envelope: Envelope<MatchPoints> = serde_json::from_str(payload).unwrap();
        let totals = envelope.data.unwrap().totals;
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[1].points, 81.5);
    }

    #[test]
    fn parses_both_squad_shapes() {
        let teams = r#"[{"teamName": "India", "players": [
            {"id": "p1", "name": "A", "role": "Batsman"},
            {"id": "p2", "name": "B", "role": "WK-Batsman"}
        ]}, {"teamName": "Australia", "players": [
            {"id": "p3", "name": "C", "role": "Bowler"}
        ]}]"#;
        let players = serde_json::from_str::<SquadData>(teams)
            .unwrap()
            .into_players();
        assert_eq!(players.len(), 3);
        assert_eq!(players[2].team.as_deref(), Some("Australia"));

        let flat = r#"{"players": [{"id": "p9", "name": "Z", "role": "Bowler"}]}"#;
        let players = serde_json::from_str::<SquadData>(flat)
            .unwrap()
            .into_players();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].team, None);
    }
}
