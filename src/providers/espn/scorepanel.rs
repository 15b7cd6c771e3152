//! ESPN score panel: every soccer (or rugby) league ESPN carries, in one
//! request, split into one board per upstream league.

use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::normalize::{normalize_events, NormalizeContext};
use super::sports_url;
use super::wire::ScorepanelResponse;
use crate::providers::broadcast::ChannelIcons;
use crate::providers::{get_json, FetchError, FetchRequest, FetchedBoard, ScoreProvider};

pub const SCOREPANEL_BASE: &str = "https://site.api.espn.com/apis/site/v2/sports";

pub struct ScorepanelProvider {
    client: reqwest::Client,
    base_url: Url,
    icons: Arc<ChannelIcons>,
}

impl ScorepanelProvider {
    pub fn new(client: reqwest::Client, icons: Arc<ChannelIcons>) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(SCOREPANEL_BASE).context("Invalid ESPN score panel URL")?,
            icons,
        })
    }
}

/// One board per upstream league group, in feed order.
pub fn boards(ctx: &NormalizeContext<'_>, panel: &ScorepanelResponse) -> Vec<FetchedBoard> {
    panel
        .scores
        .iter()
        .enumerate()
        .map(|(board, group)| FetchedBoard {
            label: group.league_name().map(str::to_string),
            board,
            games: normalize_events(ctx, &group.events),
        })
        .collect()
}

#[async_trait]
impl ScoreProvider for ScorepanelProvider {
    async fn fetch_games(&self, req: &FetchRequest) -> Result<Vec<FetchedBoard>, FetchError> {
        let url = sports_url(&self.base_url, &req.entry.info.path, "scorepanel", req.date);
        debug!("Fetching {} {} ({}): {}", req.entry.label, req.day, req.date, url);
        let panel: ScorepanelResponse = get_json(&self.client, url.as_str()).await?;
        let ctx = NormalizeContext {
            entry: &req.entry,
            date: req.date,
            options: &req.options,
            icons: &self.icons,
            free_game: None,
        };
        Ok(boards(&ctx, &panel))
    }

    fn name(&self) -> &str {
        "ESPN score panel"
    }
}
