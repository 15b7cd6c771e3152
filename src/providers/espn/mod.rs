pub mod free_game;
pub mod normalize;
pub mod scorepanel;
pub mod wire;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use self::free_game::{EpgResponse, FreeGameOfTheDay};
use self::normalize::{normalize_events, NormalizeContext};
use self::wire::ScoreboardResponse;
use super::broadcast::ChannelIcons;
use super::{get_json, FetchError, FetchRequest, FetchedBoard, ScoreProvider};
use crate::registry::LeagueInfo;

pub const SCOREBOARD_BASE: &str = "https://site.web.api.espn.com/apis/site/v2/sports";

/// Append `path` (slash separated) to `base` and add the date/limit query.
pub(crate) fn sports_url(base: &Url, path: &str, endpoint: &str, date: NaiveDate) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()))
            .push(endpoint);
    }
    url.query_pairs_mut()
        .append_pair("dates", &date.format("%Y%m%d").to_string())
        .append_pair("limit", "200");
    url
}

pub fn scoreboard_url(base: &Url, info: &LeagueInfo, date: NaiveDate) -> Url {
    let mut url = sports_url(base, &info.path, "scoreboard", date);
    // Without a group ESPN only lists ranked college teams.
    if let Some(group) = &info.espn_group {
        url.query_pairs_mut().append_pair("groups", group);
    }
    url
}

/// ESPN per-league scoreboard.
pub struct EspnProvider {
    client: reqwest::Client,
    base_url: Url,
    icons: Arc<ChannelIcons>,
    free_game: Mutex<FreeGameOfTheDay>,
}

impl EspnProvider {
    pub fn new(client: reqwest::Client, icons: Arc<ChannelIcons>) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(SCOREBOARD_BASE).context("Invalid ESPN scoreboard URL")?,
            icons,
            free_game: Mutex::new(FreeGameOfTheDay::default()),
        })
    }

    /// Free-game teams for `date`, refreshed at most once per date. A failed
    /// lookup only costs the extra broadcast entry.
    async fn free_game_for(&self, date: NaiveDate) -> FreeGameOfTheDay {
        let mut cached = self.free_game.lock().await;
        if cached.is_for(date) {
            return cached.clone();
        }
        let url = FreeGameOfTheDay::url(date);
        match get_json::<EpgResponse>(&self.client, &url).await {
            Ok(epg) => {
                *cached = FreeGameOfTheDay::from_epg(date, &epg);
                debug!("MLB free game teams for {}: {:?}", date, cached.teams);
            }
            Err(e) => warn!("MLB free game lookup failed: {}", e),
        }
        cached.clone()
    }
}

#[async_trait]
impl ScoreProvider for EspnProvider {
    async fn fetch_games(&self, req: &FetchRequest) -> Result<Vec<FetchedBoard>, FetchError> {
        let url = scoreboard_url(&self.base_url, &req.entry.info, req.date);
        debug!("Fetching {} {} ({}): {}", req.entry.label, req.day, req.date, url);
        let body: ScoreboardResponse = get_json(&self.client, url.as_str()).await?;

        let free_game = if req.entry.info.free_game_lookup && !req.options.hide_broadcasts {
            Some(self.free_game_for(req.date).await)
        } else {
            None
        };
        let ctx = NormalizeContext {
            entry: &req.entry,
            date: req.date,
            options: &req.options,
            icons: &self.icons,
            free_game: free_game.as_ref(),
        };
        Ok(vec![FetchedBoard::single(normalize_events(&ctx, &body.events))])
    }

    fn name(&self) -> &str {
        "ESPN"
    }
}
