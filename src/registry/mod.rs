//! League registry: which upstream serves each league, and the per-league
//! display quirks the adapters apply.
//!
//! The tables are plain data (`leagues.json`, `groups.json`, `channels.json`)
//! embedded at build time and parsed once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SportConfig;
use crate::providers::broadcast::ChannelIcons;

const LEAGUES_JSON: &str = include_str!("leagues.json");
const GROUPS_JSON: &str = include_str!("groups.json");
const CHANNELS_JSON: &str = include_str!("channels.json");

/// Reserved team-filter token meaning "any team currently ranked 1–25".
pub const TOP_25_TOKEN: &str = "@T25";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("league {0} is not a supported league name")]
    UnknownLeague(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Espn,
    Scorepanel,
    Cpl,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Espn => "ESPN",
            ProviderKind::Scorepanel => "Scorepanel",
            ProviderKind::Cpl => "CPL",
        }
    }
}

/// Which side the display captions first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionRule {
    #[default]
    AwayFirst,
    HomeFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongNameRule {
    /// Upstream `shortDisplayName`.
    #[default]
    ShortDisplayName,
    /// "CODE Name", used for college leagues where short names collide.
    CodeAndName,
}

/// Which normalized games a league shows at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVisibility {
    #[default]
    All,
    /// Only games with at least one broadcast entry.
    Televised,
    /// Only in-progress games with at least one broadcast entry.
    TelevisedLive,
}

/// Replace a team code when the team's location matches; covers upstreams
/// reusing one abbreviation for two different schools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOverride {
    pub code: String,
    pub location_contains: String,
    pub replacement: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueInfo {
    pub provider: ProviderKind,
    /// Upstream path or identifier (ESPN sport/league path, CPL season id).
    pub path: String,
    #[serde(default)]
    pub caption: CaptionRule,
    #[serde(default)]
    pub rankings: bool,
    #[serde(default)]
    pub long_names: LongNameRule,
    /// ESPN `groups` query value; without it ESPN only returns ranked college teams.
    #[serde(default)]
    pub espn_group: Option<String>,
    #[serde(default)]
    pub visibility: GameVisibility,
    #[serde(default)]
    pub code_overrides: Vec<CodeOverride>,
    #[serde(default)]
    pub logo_dir: Option<String>,
    #[serde(default = "default_true")]
    pub track_empty_days: bool,
    #[serde(default)]
    pub free_game_lookup: bool,
}

/// Parsed team filter for one league entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamFilter {
    teams: HashSet<String>,
    top25: bool,
}

impl TeamFilter {
    /// `None` when the list is empty: no filter means every game.
    pub fn from_list(list: &[String]) -> Option<Self> {
        if list.is_empty() {
            return None;
        }
        let mut filter = TeamFilter::default();
        for team in list {
            if team == TOP_25_TOKEN {
                filter.top25 = true;
            } else {
                filter.teams.insert(team.clone());
            }
        }
        Some(filter)
    }

    /// Ranks are raw upstream values; anything outside 1–25 counts as unranked.
    pub fn matches(
        &self,
        home_code: &str,
        home_rank: Option<u32>,
        away_code: &str,
        away_rank: Option<u32>,
    ) -> bool {
        let ranked = |rank: Option<u32>| rank.is_some_and(|r| (1..=25).contains(&r));
        if self.top25 && (ranked(home_rank) || ranked(away_rank)) {
            return true;
        }
        self.teams.contains(home_code) || self.teams.contains(away_code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.teams.contains(code)
    }
}

/// One configured league to track, resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueEntry {
    /// Position in the scrubbed configuration; the display sort order.
    pub index: usize,
    pub league: String,
    pub label: String,
    pub teams: Option<TeamFilter>,
    pub info: LeagueInfo,
}

impl LeagueEntry {
    pub fn provider(&self) -> ProviderKind {
        self.info.provider
    }
}

#[derive(Debug, Deserialize)]
struct LeagueTable {
    #[serde(default)]
    aliases: HashMap<String, String>,
    leagues: HashMap<String, LeagueInfo>,
}

pub struct LeagueRegistry {
    leagues: HashMap<String, LeagueInfo>,
    aliases: HashMap<String, String>,
    groups: HashMap<String, HashMap<String, Vec<String>>>,
    channels: ChannelIcons,
}

impl LeagueRegistry {
    /// Registry built from the tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(LEAGUES_JSON, GROUPS_JSON, CHANNELS_JSON)
    }

    pub fn from_json(leagues: &str, groups: &str, channels: &str) -> Result<Self> {
        let table: LeagueTable =
            serde_json::from_str(leagues).context("Failed to parse league table")?;
        let groups = serde_json::from_str(groups).context("Failed to parse group table")?;
        let channels =
            serde_json::from_str(channels).context("Failed to parse channel icon table")?;
        debug!(
            "League registry loaded: {} leagues, {} aliases",
            table.leagues.len(),
            table.aliases.len()
        );
        Ok(LeagueRegistry {
            leagues: table.leagues,
            aliases: table.aliases,
            groups,
            channels,
        })
    }

    /// Map a legacy identifier to its canonical name; other names pass through.
    pub fn canonicalize<'a>(&'a self, league: &'a str) -> &'a str {
        self.aliases.get(league).map(String::as_str).unwrap_or(league)
    }

    pub fn resolve(&self, league: &str) -> Result<&LeagueInfo, RegistryError> {
        self.leagues
            .get(league)
            .ok_or_else(|| RegistryError::UnknownLeague(league.to_string()))
    }

    pub fn group(&self, league: &str, group: &str) -> Option<&[String]> {
        self.groups
            .get(league)
            .and_then(|g| g.get(group))
            .map(Vec::as_slice)
    }

    pub fn channels(&self) -> &ChannelIcons {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.leagues.len()
    }

    /// Explicit teams plus every team in the named groups, in order.
    fn team_list(&self, league: &str, sport: &SportConfig) -> Vec<String> {
        let mut teams: Vec<String> = sport.teams.clone().unwrap_or_default();
        for group in sport.groups.iter().flatten() {
            match self.group(league, group) {
                Some(members) => teams.extend(members.iter().cloned()),
                None => debug!("Group '{}' is not defined for {}", group, league),
            }
        }
        teams
    }

    /// Resolve the configured sports list. Unknown leagues are dropped with a
    /// warning; the remaining entries keep their relative order.
    pub fn build_entries(&self, sports: &[SportConfig]) -> Vec<LeagueEntry> {
        let mut entries = Vec::with_capacity(sports.len());
        for sport in sports {
            let league = self.canonicalize(&sport.league);
            let info = match self.resolve(league) {
                Ok(info) => info,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            let teams = TeamFilter::from_list(&self.team_list(league, sport));
            entries.push(LeagueEntry {
                index: entries.len(),
                league: league.to_string(),
                label: sport.label.clone().unwrap_or_else(|| league.to_string()),
                teams,
                info: info.clone(),
            });
        }
        entries
    }

    /// Logo directory for a board: college leagues share one directory, and a
    /// score-panel board labelled with a known league uses that league's.
    pub fn logo_dir<'a>(&'a self, entry: &'a LeagueEntry, board_label: &'a str) -> &'a str {
        if let Some(dir) = &entry.info.logo_dir {
            return dir;
        }
        if board_label != entry.label && self.leagues.contains_key(board_label) {
            return board_label;
        }
        &entry.league
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sport(league: &str, teams: &[&str], groups: &[&str]) -> SportConfig {
        SportConfig {
            league: league.to_string(),
            label: None,
            teams: (!teams.is_empty()).then(|| teams.iter().map(|t| t.to_string()).collect()),
            groups: (!groups.is_empty()).then(|| groups.iter().map(|g| g.to_string()).collect()),
        }
    }

    #[test]
    fn test_builtin_tables_parse() {
        let registry = LeagueRegistry::builtin().unwrap();
        assert!(registry.len() > 100);
        let nhl = registry.resolve("NHL").unwrap();
        assert_eq!(nhl.provider, ProviderKind::Espn);
        assert_eq!(nhl.path, "hockey/nhl");
        assert_eq!(nhl.caption, CaptionRule::AwayFirst);
        assert!(nhl.track_empty_days);
    }

    #[test]
    fn test_soccer_is_home_first_and_college_is_ranked() {
        let registry = LeagueRegistry::builtin().unwrap();
        let epl = registry.resolve("English Premier League").unwrap();
        assert_eq!(epl.caption, CaptionRule::HomeFirst);
        let ncaaf = registry.resolve("NCAAF").unwrap();
        assert!(ncaaf.rankings);
        assert_eq!(ncaaf.long_names, LongNameRule::CodeAndName);
        assert_eq!(ncaaf.espn_group.as_deref(), Some("80"));
        assert_eq!(ncaaf.code_overrides.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_league() {
        let registry = LeagueRegistry::builtin().unwrap();
        assert_eq!(
            registry.resolve("XFL"),
            Err(RegistryError::UnknownLeague("XFL".to_string()))
        );
    }

    #[test]
    fn test_legacy_aliases() {
        let registry = LeagueRegistry::builtin().unwrap();
        assert_eq!(registry.canonicalize("USA_MLS"), "MLS");
        assert_eq!(
            registry.canonicalize("ENG_PREMIERE_LEAGUE"),
            "English Premier League"
        );
        assert_eq!(registry.canonicalize("NBA"), "NBA");
    }

    #[test]
    fn test_build_entries_drops_unknown_and_keeps_order() {
        let registry = LeagueRegistry::builtin().unwrap();
        let entries = registry.build_entries(&[
            sport("NHL", &["TOR"], &[]),
            sport("CFL", &["TOR"], &[]),
            sport("USA_NWSL", &[], &[]),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].league, "NHL");
        assert_eq!(entries[1].league, "NWSL");
        assert_eq!(entries[1].index, 1);
        assert_eq!(entries[1].label, "NWSL");
        assert!(entries[1].teams.is_none());
    }

    #[test]
    fn test_groups_expand_into_team_filter() {
        let registry = LeagueRegistry::builtin().unwrap();
        let entries = registry.build_entries(&[sport("NHL", &["SEA"], &["Canadian", "Nope"])]);
        let teams = entries[0].teams.as_ref().unwrap();
        assert!(teams.contains("SEA"));
        assert!(teams.contains("TOR"));
        assert!(teams.contains("WPG"));
        assert!(!teams.contains("BOS"));
    }

    #[test]
    fn test_top25_group_sets_ranked_filter() {
        let registry = LeagueRegistry::builtin().unwrap();
        let entries = registry.build_entries(&[sport("NCAAM", &[], &["Top 25"])]);
        let teams = entries[0].teams.as_ref().unwrap();
        assert!(teams.matches("DUKE", Some(3), "UNC", Some(99)));
        assert!(!teams.matches("DUKE", Some(99), "UNC", None));
    }

    #[test]
    fn test_team_filter_matches_either_side() {
        let filter = TeamFilter::from_list(&["TOR".to_string()]).unwrap();
        assert!(filter.matches("TOR", None, "BOS", None));
        assert!(filter.matches("BOS", None, "TOR", None));
        assert!(!filter.matches("BOS", Some(1), "NYR", None));
        assert!(TeamFilter::from_list(&[]).is_none());
    }

    #[test]
    fn test_logo_dir() {
        let registry = LeagueRegistry::builtin().unwrap();
        let entries = registry.build_entries(&[
            sport("NCAAM_MM", &[], &[]),
            sport("ALL_SOCCER", &[], &[]),
        ]);
        assert_eq!(registry.logo_dir(&entries[0], "NCAAM_MM"), "NCAA");
        assert_eq!(registry.logo_dir(&entries[1], "ALL_SOCCER"), "ALL_SOCCER");
        assert_eq!(
            registry.logo_dir(&entries[1], "English Premier League"),
            "English Premier League"
        );
        assert_eq!(registry.logo_dir(&entries[1], "Liga MX"), "ALL_SOCCER");
    }
}
