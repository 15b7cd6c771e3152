//! MLB.TV free game of the day, looked up once per date from the MLB EPG.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

const EPG_URL: &str = "https://mastapi.mobile.mlbinfra.com/api/epg/v3/search";

#[derive(Debug, Deserialize, Default)]
pub struct EpgResponse {
    #[serde(default)]
    pub results: Vec<EpgGame>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EpgGame {
    #[serde(rename = "videoFeeds", default)]
    pub video_feeds: Vec<EpgVideoFeed>,
    #[serde(rename = "gameData", default)]
    pub game_data: EpgGameData,
}

#[derive(Debug, Deserialize, Default)]
pub struct EpgVideoFeed {
    #[serde(rename = "freeGame", default)]
    pub free_game: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct EpgGameData {
    #[serde(default)]
    pub away: EpgTeam,
    #[serde(default)]
    pub home: EpgTeam,
}

#[derive(Debug, Deserialize, Default)]
pub struct EpgTeam {
    #[serde(rename = "teamAbbrv")]
    pub team_abbrv: Option<String>,
}

/// Teams playing the free game on `day`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeGameOfTheDay {
    pub day: Option<NaiveDate>,
    pub teams: HashSet<String>,
}

impl FreeGameOfTheDay {
    pub fn url(date: NaiveDate) -> String {
        format!("{}?date={}&exp=MLB", EPG_URL, date.format("%Y-%m-%d"))
    }

    pub fn from_teams<I, S>(day: NaiveDate, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut teams: HashSet<String> = teams.into_iter().map(Into::into).collect();
        // The EPG and ESPN disagree on Arizona's code.
        if teams.contains("AZ") {
            teams.insert("ARI".to_string());
        }
        FreeGameOfTheDay {
            day: Some(day),
            teams,
        }
    }

    pub fn from_epg(day: NaiveDate, epg: &EpgResponse) -> Self {
        let teams = epg
            .results
            .iter()
            .filter(|g| g.video_feeds.first().is_some_and(|f| f.free_game))
            .flat_map(|g| [&g.game_data.away, &g.game_data.home])
            .filter_map(|t| t.team_abbrv.clone());
        Self::from_teams(day, teams)
    }

    pub fn is_for(&self, day: NaiveDate) -> bool {
        self.day == Some(day)
    }

    pub fn covers(&self, day: NaiveDate, team: &str) -> bool {
        self.is_for(day) && self.teams.contains(team)
    }
}
