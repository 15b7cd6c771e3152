pub mod broadcast;
pub mod cpl;
pub mod espn;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{DayBucket, NormalizedGame};
use crate::registry::{LeagueEntry, LeagueRegistry, ProviderKind};

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("myscoreboard/", env!("CARGO_PKG_VERSION"));

/// Why a single fetch produced nothing. Never fatal: the caller keeps the
/// previous snapshot and the next tick retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("malformed payload from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{url} did not answer within {after:?}")]
    Timeout { url: String, after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    H12,
    H24,
}

impl TimeFormat {
    /// Kickoff string in the given zone: "7:00 pm" or "19:00".
    pub fn kickoff(self, start: DateTime<Utc>, tz: Tz) -> String {
        let local = start.with_timezone(&tz);
        match self {
            TimeFormat::H12 => local.format("%-I:%M %P").to_string(),
            TimeFormat::H24 => local.format("%-H:%M").to_string(),
        }
    }
}

/// Display settings every adapter applies while normalizing.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub time_format: TimeFormat,
    pub hide_broadcasts: bool,
    pub show_local_broadcasts: bool,
    pub skip_channels: Vec<String>,
    pub local_markets: Vec<String>,
    pub display_local_channels: Vec<String>,
    pub timezone: Tz,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            time_format: TimeFormat::H12,
            hide_broadcasts: false,
            show_local_broadcasts: false,
            skip_channels: Vec::new(),
            local_markets: Vec::new(),
            display_local_channels: Vec::new(),
            timezone: Tz::UTC,
        }
    }
}

/// One fetch: an entry, the local calendar date wanted and the bucket it fills.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub entry: Arc<LeagueEntry>,
    pub date: NaiveDate,
    pub day: DayBucket,
    pub options: Arc<DisplayOptions>,
}

/// A list of games for one on-screen board. Most providers return exactly one
/// board per entry; the score panel returns one per upstream league.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBoard {
    /// Overrides the entry label when set.
    pub label: Option<String>,
    pub board: usize,
    pub games: Vec<NormalizedGame>,
}

impl FetchedBoard {
    pub fn single(games: Vec<NormalizedGame>) -> Self {
        FetchedBoard {
            label: None,
            board: 0,
            games,
        }
    }
}

/// Trait that every upstream score source implements.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Single attempt, no retry; games sorted and filtered to `req.date`.
    async fn fetch_games(&self, req: &FetchRequest) -> Result<Vec<FetchedBoard>, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

pub fn http_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// GET a URL and decode its JSON body, mapping every failure to a `FetchError`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    let resp = client.get(url).send().await.map_err(|source| {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: HTTP_TIMEOUT,
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source,
            }
        }
    })?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    let body = resp.bytes().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    debug!("{} fetched", url);
    serde_json::from_slice(&body).map_err(|source| FetchError::Malformed {
        url: url.to_string(),
        source,
    })
}

/// Adapter lookup by provider kind; built once at startup.
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderKind, Arc<dyn ScoreProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production adapters, sharing one HTTP client.
    pub fn standard(registry: &LeagueRegistry) -> anyhow::Result<Self> {
        let client = http_client()?;
        let icons = Arc::new(registry.channels().clone());
        let mut set = ProviderSet::new();
        set.insert(
            ProviderKind::Espn,
            Arc::new(espn::EspnProvider::new(client.clone(), icons.clone())?),
        );
        set.insert(
            ProviderKind::Scorepanel,
            Arc::new(espn::scorepanel::ScorepanelProvider::new(
                client.clone(),
                icons,
            )?),
        );
        set.insert(ProviderKind::Cpl, Arc::new(cpl::CplProvider::new(client)?));
        Ok(set)
    }

    pub fn insert(&mut self, kind: ProviderKind, provider: Arc<dyn ScoreProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ScoreProvider>> {
        self.providers.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port, return the URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/scoreboard")
    }

    #[test]
    fn test_kickoff_formats() {
        let start = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(TimeFormat::H12.kickoff(start, tz), "7:00 pm");
        assert_eq!(TimeFormat::H24.kickoff(start, tz), "19:00");
    }

    #[tokio::test]
    async fn test_get_json_connection_refused_is_http_error() {
        let client = http_client().unwrap();
        let result: Result<serde_json::Value, _> =
            get_json(&client, "http://127.0.0.1:9/scoreboard").await;
        assert!(matches!(result, Err(FetchError::Http { .. })));
    }

    #[tokio::test]
    async fn test_get_json_error_status_is_status_error() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let client = http_client().unwrap();
        let result: Result<serde_json::Value, _> = get_json(&client, &url).await;
        match result {
            Err(FetchError::Status { status, url: failed }) => {
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(failed, url);
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_json_bad_body_is_malformed() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 5\r\nconnection: close\r\n\r\n{oops",
        )
        .await;
        let client = http_client().unwrap();
        let result: Result<serde_json::Value, _> = get_json(&client, &url).await;
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }
}
