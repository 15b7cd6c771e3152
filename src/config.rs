use anyhow::Context;
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::Parser;
use serde::Deserialize;
use std::path::Path;

use crate::providers::{DisplayOptions, TimeFormat};

/// Sports scoreboard aggregation service
#[derive(Parser, Debug, Clone)]
#[command(name = "myscoreboard", version, about)]
pub struct Config {
    /// JSON file with the ordered list of leagues to track
    #[arg(long, env = "SPORTS_FILE", default_value = "sports.json")]
    pub sports_file: String,

    /// IANA timezone for local dates and kickoff times (default: system zone)
    #[arg(long, env = "TIMEZONE")]
    pub timezone: Option<String>,

    /// Local hour (0-23) before which yesterday's results are still shown
    #[arg(long, env = "ROLLOVER_HOURS", default_value = "3")]
    pub rollover_hours: u32,

    /// Show today's games even before the rollover hour
    #[arg(long, env = "ALWAYS_SHOW_TODAY", default_value = "false")]
    pub always_show_today: bool,

    /// Kickoff time format, 12 or 24 hour
    #[arg(long, env = "TIME_FORMAT", default_value = "12")]
    pub time_format: u8,

    /// Hide all broadcast channels
    #[arg(long, env = "HIDE_BROADCASTS", default_value = "false")]
    pub hide_broadcasts: bool,

    /// Show local-market broadcasts for every team
    #[arg(long, env = "SHOW_LOCAL_BROADCASTS", default_value = "false")]
    pub show_local_broadcasts: bool,

    /// Channels never to show
    #[arg(long, env = "SKIP_CHANNELS", value_delimiter = ',')]
    pub skip_channels: Vec<String>,

    /// Teams whose local-market broadcasts are shown
    #[arg(long, env = "LOCAL_MARKETS", value_delimiter = ',')]
    pub local_markets: Vec<String>,

    /// Local channels that are always shown
    #[arg(long, env = "DISPLAY_LOCAL_CHANNELS", value_delimiter = ',')]
    pub display_local_channels: Vec<String>,

    /// Default team logo directory
    #[arg(long, env = "LOGOS_DIR", default_value = "logos")]
    pub logos_dir: String,

    /// Custom team logo directory, preferred over the defaults
    #[arg(long, env = "CUSTOM_LOGOS_DIR", default_value = "logos_custom")]
    pub custom_logos_dir: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Shift the scheduler clock by this many hours (testing)
    #[arg(long, env = "DEBUG_HOURS", default_value = "0", allow_hyphen_values = true)]
    pub debug_hours: i64,

    /// Shift the scheduler clock by this many minutes (testing)
    #[arg(long, env = "DEBUG_MINUTES", default_value = "0", allow_hyphen_values = true)]
    pub debug_minutes: i64,

    /// Pretend today is this date, YYYY-MM-DD (testing)
    #[arg(long, env = "DEBUG_GAME_DATE")]
    pub debug_game_date: Option<NaiveDate>,
}

/// Largest clock shift accepted from the debug offsets: one week.
const MAX_DEBUG_HOURS: u64 = 7 * 24;
const MAX_DEBUG_MINUTES: u64 = MAX_DEBUG_HOURS * 60;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rollover_hours > 23 {
            anyhow::bail!("rollover_hours must be between 0 and 23");
        }
        if self.time_format != 12 && self.time_format != 24 {
            anyhow::bail!("time_format must be 12 or 24");
        }
        if self.debug_hours.unsigned_abs() > MAX_DEBUG_HOURS {
            anyhow::bail!("debug_hours must be within ±{}", MAX_DEBUG_HOURS);
        }
        if self.debug_minutes.unsigned_abs() > MAX_DEBUG_MINUTES {
            anyhow::bail!("debug_minutes must be within ±{}", MAX_DEBUG_MINUTES);
        }
        self.timezone()?;
        Ok(())
    }

    /// Configured zone, else the system zone, else UTC.
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", name, e)),
            None => Ok(iana_time_zone::get_timezone()
                .ok()
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(Tz::UTC)),
        }
    }

    pub fn display_options(&self) -> anyhow::Result<DisplayOptions> {
        Ok(DisplayOptions {
            time_format: if self.time_format == 24 {
                TimeFormat::H24
            } else {
                TimeFormat::H12
            },
            hide_broadcasts: self.hide_broadcasts,
            show_local_broadcasts: self.show_local_broadcasts,
            skip_channels: self.skip_channels.clone(),
            local_markets: self.local_markets.clone(),
            display_local_channels: self.display_local_channels.clone(),
            timezone: self.timezone()?,
        })
    }
}

/// One item of the sports list, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SportConfig {
    pub league: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub teams: Option<Vec<String>>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

pub fn load_sports(path: impl AsRef<Path>) -> anyhow::Result<Vec<SportConfig>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sports list {}", path.display()))?;
    parse_sports(&raw).with_context(|| format!("Invalid sports list {}", path.display()))
}

pub fn parse_sports(raw: &str) -> anyhow::Result<Vec<SportConfig>> {
    Ok(serde_json::from_str(raw)?)
}
