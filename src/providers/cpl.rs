//! Canadian Premier League season feed. The feed returns the whole season, so
//! the decoded match list is cached briefly and filtered per request.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::espn::wire::parse_time;
use super::{get_json, FetchError, FetchRequest, FetchedBoard, ScoreProvider};
use crate::models::{sort_and_dedup, GameState, Logo, NormalizedGame, TeamLine};

pub const CPL_BASE: &str = "https://api-sdp.canpl.ca/v1/cpl/football/seasons";
/// Upper bound on one whole fetch, connection to decoded body.
pub const CPL_TIMEOUT: Duration = Duration::from_secs(10);
const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SeasonResponse {
    #[serde(default)]
    pub matches: Vec<CplMatch>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CplMatch {
    #[serde(rename = "homeTeam", default)]
    pub home_team: CplTeam,
    #[serde(rename = "awayTeam", default)]
    pub away_team: CplTeam,
    #[serde(rename = "startDateUtc")]
    pub start_date_utc: Option<String>,
    #[serde(default)]
    pub score: CplScore,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CplTeam {
    #[serde(rename = "mediaName")]
    pub media_name: Option<String>,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    pub name: Option<String>,
    pub crest: Option<String>,
    pub logo: Option<String>,
}

impl CplTeam {
    fn display_name(&self) -> String {
        [&self.media_name, &self.short_name, &self.name]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    fn line(&self) -> TeamLine {
        let name = self.display_name();
        let logo = [&self.crest, &self.logo]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(|url| Logo::Remote(url.clone()))
            .unwrap_or(Logo::Absent);
        TeamLine {
            code: name.clone(),
            long_name: name,
            logo,
            ranking: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CplScore {
    #[serde(rename = "fullTime", default)]
    pub full_time: CplScoreLine,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CplScoreLine {
    #[serde(rename = "homeTeam")]
    pub home_team: Option<u32>,
    #[serde(rename = "awayTeam")]
    pub away_team: Option<u32>,
}

fn start_time(raw: &str) -> Option<DateTime<Utc>> {
    parse_time(raw).or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|t| t.and_utc())
    })
}

/// Turn the season feed into the requested day's games.
pub fn normalize(req: &FetchRequest, season: &SeasonResponse) -> Vec<NormalizedGame> {
    let tz = req.options.timezone;
    let mut games: Vec<NormalizedGame> = season
        .matches
        .iter()
        .filter_map(|m| {
            let start = m.start_date_utc.as_deref().and_then(start_time)?;
            if start.with_timezone(&tz).date_naive() != req.date {
                return None;
            }
            let home = m.home_team.line();
            let away = m.away_team.line();
            if let Some(filter) = &req.entry.teams {
                if !filter.contains(&home.code) && !filter.contains(&away.code) {
                    return None;
                }
            }
            let (state, status) = match (m.score.full_time.home_team, m.score.full_time.away_team)
            {
                (Some(home_score), Some(away_score)) => (
                    GameState::Final {
                        home_score,
                        away_score,
                    },
                    "FT".to_string(),
                ),
                _ => (
                    GameState::Scheduled,
                    req.options.time_format.kickoff(start, tz),
                ),
            };
            Some(NormalizedGame {
                home,
                away,
                state,
                status: vec![status],
                broadcasts: Vec::new(),
                playoff_status: None,
                delayed: false,
                start_time: start,
            })
        })
        .collect();
    sort_and_dedup(&mut games);
    games
}

struct CachedSeason {
    fetched: Instant,
    season: Arc<SeasonResponse>,
}

pub struct CplProvider {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    cache: Mutex<Option<CachedSeason>>,
}

impl CplProvider {
    pub fn new(client: reqwest::Client) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(CPL_BASE).context("Invalid CPL season URL")?,
            timeout: CPL_TIMEOUT,
            cache: Mutex::new(None),
        })
    }

    pub fn season_url(&self, season: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(season).push("matches");
        }
        url.query_pairs_mut().append_pair("locale", "en-US");
        url
    }

    /// Season feed, from cache when younger than a minute. Entries polled in the
    /// same tick queue on the lock and share one request.
    async fn season(&self, season_id: &str) -> Result<Arc<SeasonResponse>, FetchError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched.elapsed() < CACHE_TTL {
                debug!("CPL season served from cache");
                return Ok(cached.season.clone());
            }
        }
        let url = self.season_url(season_id).to_string();
        let season: SeasonResponse =
            match tokio::time::timeout(self.timeout, get_json(&self.client, &url)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(FetchError::Timeout {
                        url,
                        after: self.timeout,
                    })
                }
            };
        info!("CPL matches fetched ({} games)", season.matches.len());
        let season = Arc::new(season);
        *cache = Some(CachedSeason {
            fetched: Instant::now(),
            season: season.clone(),
        });
        Ok(season)
    }
}

#[async_trait]
impl ScoreProvider for CplProvider {
    async fn fetch_games(&self, req: &FetchRequest) -> Result<Vec<FetchedBoard>, FetchError> {
        let season = self.season(&req.entry.info.path).await?;
        Ok(vec![FetchedBoard::single(normalize(req, &season))])
    }

    fn name(&self) -> &str {
        "CPL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SportConfig;
    use crate::models::test_support::involves;
    use crate::models::DayBucket;
    use crate::providers::{http_client, DisplayOptions};
    use crate::registry::LeagueRegistry;
    use chrono::NaiveDate;
    use serde_json::json;

    fn request(teams: Option<Vec<String>>) -> FetchRequest {
        let entry = LeagueRegistry::builtin()
            .unwrap()
            .build_entries(&[SportConfig {
                league: "CPL".to_string(),
                label: None,
                teams,
                groups: None,
            }])
            .remove(0);
        FetchRequest {
            entry: Arc::new(entry),
            date: NaiveDate::from_ymd_opt(2025, 4, 12).unwrap(),
            day: DayBucket::Today,
            options: Arc::new(DisplayOptions {
                timezone: "America/Toronto".parse().unwrap(),
                ..DisplayOptions::default()
            }),
        }
    }

    fn season() -> SeasonResponse {
        serde_json::from_value(json!({
            "matches": [
                {
                    "homeTeam": {"mediaName": "Forge", "name": "Forge FC", "crest": "forge.png"},
                    "awayTeam": {"shortName": "Cavalry", "name": "Cavalry FC"},
                    "startDateUtc": "2025-04-12T23:00:00Z",
                    "score": {"fullTime": {"homeTeam": null, "awayTeam": null}}
                },
                {
                    "homeTeam": {"mediaName": "Pacific", "logo": "pacific.png"},
                    "awayTeam": {"mediaName": "Valour"},
                    "startDateUtc": "2025-04-12T17:00:00Z",
                    "score": {"fullTime": {"homeTeam": 2, "awayTeam": 1}}
                },
                {
                    "homeTeam": {"mediaName": "Atlético Ottawa"},
                    "awayTeam": {"mediaName": "York United"},
                    "startDateUtc": "2025-04-13T05:00:00Z"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_filters_date_and_sorts() {
        let games = normalize(&request(None), &season());
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].home.code, "Pacific");
        assert_eq!(
            games[0].state,
            GameState::Final {
                home_score: 2,
                away_score: 1
            }
        );
        assert_eq!(games[0].status, vec!["FT"]);
        assert_eq!(games[0].home.logo, Logo::Remote("pacific.png".to_string()));
        assert_eq!(games[1].home.code, "Forge");
        assert_eq!(games[1].away.code, "Cavalry");
        assert_eq!(games[1].state, GameState::Scheduled);
        assert_eq!(games[1].status, vec!["7:00 pm"]);
        assert_eq!(games[1].home.logo, Logo::Remote("forge.png".to_string()));
        assert_eq!(games[1].away.logo, Logo::Absent);
    }

    #[test]
    fn test_normalize_team_filter() {
        let games = normalize(&request(Some(vec!["Valour".to_string()])), &season());
        assert_eq!(games.len(), 1);
        assert!(involves(&games[0], "Valour"));
    }

    #[test]
    fn test_season_url_encodes_identifier() {
        let provider = CplProvider::new(http_client().unwrap()).unwrap();
        let url = provider.season_url("cpl::Football_Season::abc123");
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 6);
        assert!(segments[4].contains("Football_Season"));
        assert_eq!(segments[5], "matches");
        assert_eq!(url.query(), Some("locale=en-US"));
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_fetch_error() {
        let provider = CplProvider {
            base_url: Url::parse("http://127.0.0.1:9/seasons").unwrap(),
            ..CplProvider::new(http_client().unwrap()).unwrap()
        };
        let result = provider.fetch_games(&request(None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_feed_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without ever answering.
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            }
        });
        let provider = CplProvider {
            base_url: Url::parse(&format!("http://{addr}/seasons")).unwrap(),
            timeout: Duration::from_millis(200),
            ..CplProvider::new(http_client().unwrap()).unwrap()
        };
        let result = provider.fetch_games(&request(None)).await;
        match result {
            Err(FetchError::Timeout { after, .. }) => {
                assert_eq!(after, Duration::from_millis(200))
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(provider.cache.lock().await.is_none());
    }
}
