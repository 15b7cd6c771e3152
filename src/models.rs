use chrono::{DateTime, Utc};
use serde::Serialize;

/// The two time windows tracked independently per league entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBucket {
    Today,
    Yesterday,
}

impl DayBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            DayBucket::Today => "today",
            DayBucket::Yesterday => "yesterday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(DayBucket::Today),
            "yesterday" => Some(DayBucket::Yesterday),
            _ => None,
        }
    }
}

impl std::fmt::Display for DayBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Scheduled,
    InProgress,
    Final,
}

/// Phase and scoreline together: a scheduled game has no score, every other
/// phase always has both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    Scheduled,
    InProgress { home_score: u32, away_score: u32 },
    Final { home_score: u32, away_score: u32 },
}

impl GameState {
    pub fn phase(&self) -> GamePhase {
        match self {
            GameState::Scheduled => GamePhase::Scheduled,
            GameState::InProgress { .. } => GamePhase::InProgress,
            GameState::Final { .. } => GamePhase::Final,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, GameState::Final { .. })
    }
}

/// Where the display should load a team logo from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "src", rename_all = "lowercase")]
pub enum Logo {
    /// Path under one of the served logo directories, e.g. `logos/NHL/TOR.svg`.
    Local(String),
    Remote(String),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamLine {
    /// Short code, unique within a game only.
    pub code: String,
    pub long_name: String,
    pub logo: Logo,
    /// Poll ranking 1–25 for ranking-eligible leagues.
    pub ranking: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastEntry {
    pub channel: String,
    /// Icon URL or served path; `None` means show the bare channel name.
    pub icon: Option<String>,
    /// Icon is dark-on-light and needs inverting on a dark display.
    pub invert_icon: bool,
    /// Regional suffix folded out of the channel name ("Sun", "B", ...).
    pub designation: Option<String>,
}

/// A single game as every provider adapter emits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedGame {
    pub home: TeamLine,
    pub away: TeamLine,
    #[serde(flatten)]
    pub state: GameState,
    pub status: Vec<String>,
    pub broadcasts: Vec<BroadcastEntry>,
    pub playoff_status: Option<String>,
    pub delayed: bool,
    pub start_time: DateTime<Utc>,
}

impl NormalizedGame {
    fn order_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.start_time, &self.away.code, &self.home.code)
    }
}

/// Orders games by start time then away code, and drops repeated
/// (home, away, start) triples.
pub fn sort_and_dedup(games: &mut Vec<NormalizedGame>) {
    games.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    games.dedup_by(|a, b| a.order_key() == b.order_key());
}

/// Stable on-screen ordering: configuration position, then the sub-board
/// position for providers that return several leagues per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SortIndex {
    pub entry: usize,
    pub board: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueSnapshot {
    pub league: String,
    pub games: Vec<NormalizedGame>,
    pub sort_index: SortIndex,
    pub no_games: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Published once per completed fetch, per board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub day: DayBucket,
    pub label: String,
    pub league: String,
    pub games: Vec<NormalizedGame>,
    pub sort_index: SortIndex,
    pub no_games_today: bool,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// `(home, away)` once the game has started.
    pub fn scores(state: &GameState) -> Option<(u32, u32)> {
        match *state {
            GameState::Scheduled => None,
            GameState::InProgress {
                home_score,
                away_score,
            }
            | GameState::Final {
                home_score,
                away_score,
            } => Some((home_score, away_score)),
        }
    }

    pub fn involves(game: &NormalizedGame, code: &str) -> bool {
        game.home.code == code || game.away.code == code
    }

    pub fn team(code: &str) -> TeamLine {
        TeamLine {
            code: code.to_string(),
            long_name: format!("{code} Long"),
            logo: Logo::Absent,
            ranking: None,
        }
    }

    pub fn game(home: &str, away: &str, hour: u32, state: GameState) -> NormalizedGame {
        NormalizedGame {
            home: team(home),
            away: team(away),
            state,
            status: vec![],
            broadcasts: vec![],
            playoff_status: None,
            delayed: false,
            start_time: Utc.with_ymd_and_hms(2025, 1, 10, hour, 0, 0).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{game, scores};
    use super::*;

    #[test]
    fn test_sort_by_start_then_away_code() {
        let mut games = vec![
            game("BOS", "TOR", 20, GameState::Scheduled),
            game("NYR", "MTL", 20, GameState::Scheduled),
            game("EDM", "VAN", 18, GameState::Scheduled),
        ];
        sort_and_dedup(&mut games);
        let away: Vec<&str> = games.iter().map(|g| g.away.code.as_str()).collect();
        assert_eq!(away, vec!["VAN", "MTL", "TOR"]);
    }

    #[test]
    fn test_dedup_drops_repeated_triples() {
        let mut games = vec![
            game("BOS", "TOR", 20, GameState::Scheduled),
            game("NYR", "MTL", 19, GameState::Scheduled),
            game("BOS", "TOR", 20, GameState::Scheduled),
        ];
        sort_and_dedup(&mut games);
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_state_scores_follow_phase() {
        assert_eq!(scores(&GameState::Scheduled), None);
        let live = GameState::InProgress {
            home_score: 2,
            away_score: 1,
        };
        assert_eq!(live.phase(), GamePhase::InProgress);
        assert_eq!(scores(&live), Some((2, 1)));
        assert!(!live.is_final());
    }

    #[test]
    fn test_game_serializes_phase_inline() {
        let g = game(
            "BOS",
            "TOR",
            20,
            GameState::Final {
                home_score: 3,
                away_score: 4,
            },
        );
        let v = serde_json::to_value(&g).unwrap();
        assert_eq!(v["phase"], "FINAL");
        assert_eq!(v["home_score"], 3);
        assert_eq!(v["home"]["logo"]["kind"], "absent");
    }

    #[test]
    fn test_day_bucket_parse() {
        assert_eq!(DayBucket::parse("yesterday"), Some(DayBucket::Yesterday));
        assert_eq!(DayBucket::parse("tomorrow"), None);
        assert_eq!(DayBucket::Today.to_string(), "today");
    }
}
