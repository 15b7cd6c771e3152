//! ESPN site API wire types: serde shapes for the scoreboard and score-panel
//! responses. Only the fields the normalizer reads are modelled.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    #[serde(default)]
    pub events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub date: Option<String>,
    pub status: Option<EspnStatus>,
    #[serde(default)]
    pub competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatusType {
    pub id: Option<String>,
    pub detail: Option<String>,
    #[serde(rename = "shortDetail")]
    pub short_detail: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetition {
    pub date: Option<String>,
    #[serde(default)]
    pub competitors: Vec<EspnCompetitor>,
    #[serde(default)]
    pub broadcasts: Vec<EspnBroadcast>,
    pub series: Option<EspnSeries>,
    #[serde(default)]
    pub notes: Vec<EspnNote>,
    pub leg: Option<EspnLeg>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetitor {
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>, // "home" | "away"
    #[serde(default)]
    pub team: EspnTeam,
    /// ESPN sends scores as strings on most feeds, numbers on some.
    #[serde(default, deserialize_with = "flexible_u32")]
    pub score: Option<u32>,
    #[serde(rename = "curatedRank")]
    pub curated_rank: Option<EspnRank>,
    #[serde(rename = "shootoutScore", default, deserialize_with = "flexible_u32")]
    pub shootout_score: Option<u32>,
}

impl EspnCompetitor {
    pub fn rank(&self) -> Option<u32> {
        self.curated_rank.as_ref().and_then(|r| r.current)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeam {
    pub abbreviation: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "shortDisplayName")]
    pub short_display_name: Option<String>,
    pub location: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EspnRank {
    pub current: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnBroadcast {
    pub market: Option<String>, // "national" | "home" | "away"
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnSeries {
    pub summary: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnNote {
    pub headline: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLeg {
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Score panel  (site v2 API, multi-league)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScorepanelResponse {
    #[serde(default)]
    pub scores: Vec<ScorepanelGroup>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScorepanelGroup {
    #[serde(default)]
    pub leagues: Vec<ScorepanelLeague>,
    #[serde(default)]
    pub events: Vec<EspnEvent>,
}

impl ScorepanelGroup {
    pub fn league_name(&self) -> Option<&str> {
        self.leagues.first().and_then(|l| l.name.as_deref())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScorepanelLeague {
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn flexible_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// ESPN timestamps usually omit seconds ("2025-01-10T00:00Z").
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|t| t.and_utc())
}
