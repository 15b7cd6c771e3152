use serde::Deserialize;
use std::collections::HashMap;

use super::DisplayOptions;
use crate::models::BroadcastEntry;

pub const NATIONAL_MARKET: &str = "national";
pub const FREE_GAME_CHANNEL: &str = "MLB.TV Free Game";

/// Channel name to icon tables. Icons in `inverted` are dark artwork that the
/// display flips for a dark background.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelIcons {
    #[serde(default)]
    pub icons: HashMap<String, String>,
    #[serde(default)]
    pub inverted: HashMap<String, String>,
}

impl ChannelIcons {
    /// Entry for an already folded channel name.
    pub fn entry(&self, channel: &str, designation: Option<String>) -> BroadcastEntry {
        let (icon, invert_icon) = match self.icons.get(channel) {
            Some(icon) => (Some(icon.clone()), false),
            None => match self.inverted.get(channel) {
                Some(icon) => (Some(icon.clone()), true),
                None => (None, false),
            },
        };
        BroadcastEntry {
            channel: channel.to_string(),
            icon,
            invert_icon,
            designation,
        }
    }
}

/// Split a regional network name into the network and its designation, so
/// "FanDuel SN Sun" shares the FanDuel icon.
pub fn split_designation(name: &str) -> (String, Option<String>) {
    let designation = |rest: &str| {
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    };
    if let Some(rest) = name.strip_prefix("FanDuel") {
        let rest = rest.trim_start();
        let rest = rest.strip_prefix("SN ").unwrap_or(rest);
        return ("FanDuel".to_string(), designation(rest));
    }
    if let Some(rest) = name.strip_prefix("NBC Sports") {
        return ("NBC Sports".to_string(), designation(rest));
    }
    match name {
        "Space City Home (Alt.)" => (
            "Space City Home Network".to_string(),
            Some("(Alt.)".to_string()),
        ),
        "MSGB" => ("MSG".to_string(), Some("B".to_string())),
        _ => (name.to_string(), None),
    }
}

/// Channels one upstream market lists for a game.
#[derive(Debug, Clone, Copy)]
pub struct MarketChannels<'a> {
    /// "national", "home" or "away".
    pub market: &'a str,
    pub names: &'a [String],
}

/// A side of the game: its market name ("home"/"away") and team code.
#[derive(Debug, Clone, Copy)]
pub struct MarketTeam<'a> {
    pub market: &'a str,
    pub code: &'a str,
}

/// Build the broadcast list for one game. National channels come first, then
/// whatever local channels the options allow; duplicates are dropped.
pub fn collect(
    icons: &ChannelIcons,
    opts: &DisplayOptions,
    markets: &[MarketChannels<'_>],
    teams: &[MarketTeam<'_>],
) -> Vec<BroadcastEntry> {
    if opts.hide_broadcasts {
        return Vec::new();
    }
    let skipped = |channel: &str| opts.skip_channels.iter().any(|c| c == channel);
    let always = |channel: &str| opts.display_local_channels.iter().any(|c| c == channel);
    let mut out = Vec::new();

    for market in markets.iter().filter(|m| m.market == NATIONAL_MARKET) {
        for name in market.names {
            let (channel, designation) = split_designation(name);
            if !skipped(&channel) || always(&channel) {
                out.push(icons.entry(&channel, designation));
            }
        }
    }

    for market in markets.iter().filter(|m| m.market != NATIONAL_MARKET) {
        let local_team = teams.iter().any(|t| {
            t.market == market.market && opts.local_markets.iter().any(|m| m == t.code)
        });
        for name in market.names {
            let (channel, designation) = split_designation(name);
            let wanted = (opts.show_local_broadcasts || local_team) && !skipped(&channel);
            if wanted || always(&channel) {
                out.push(icons.entry(&channel, designation));
            }
        }
    }

    dedup(&mut out);
    out
}

/// Drop repeated entries, keeping the first occurrence.
pub fn dedup(entries: &mut Vec<BroadcastEntry>) {
    let mut kept: Vec<BroadcastEntry> = Vec::with_capacity(entries.len());
    for entry in entries.drain(..) {
        if !kept.contains(&entry) {
            kept.push(entry);
        }
    }
    *entries = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icons() -> ChannelIcons {
        ChannelIcons {
            icons: HashMap::from([
                ("ESPN".to_string(), "espn.svg".to_string()),
                ("FanDuel".to_string(), "fanduel.svg".to_string()),
            ]),
            inverted: HashMap::from([("TNT".to_string(), "tnt.svg".to_string())]),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_designation() {
        assert_eq!(
            split_designation("FanDuel SN Sun"),
            ("FanDuel".to_string(), Some("Sun".to_string()))
        );
        assert_eq!(
            split_designation("FanDuel Detroit"),
            ("FanDuel".to_string(), Some("Detroit".to_string()))
        );
        assert_eq!(
            split_designation("NBC Sports Chicago"),
            ("NBC Sports".to_string(), Some("Chicago".to_string()))
        );
        assert_eq!(
            split_designation("MSGB"),
            ("MSG".to_string(), Some("B".to_string()))
        );
        assert_eq!(
            split_designation("Space City Home (Alt.)"),
            (
                "Space City Home Network".to_string(),
                Some("(Alt.)".to_string())
            )
        );
        assert_eq!(split_designation("ESPN"), ("ESPN".to_string(), None));
    }

    #[test]
    fn test_icon_lookup_order() {
        let icons = icons();
        let espn = icons.entry("ESPN", None);
        assert_eq!(espn.icon.as_deref(), Some("espn.svg"));
        assert!(!espn.invert_icon);
        let tnt = icons.entry("TNT", None);
        assert!(tnt.invert_icon);
        let bare = icons.entry("Local 7", None);
        assert_eq!(bare.icon, None);
        assert_eq!(bare.channel, "Local 7");
    }

    #[test]
    fn test_national_only_by_default() {
        let national = names(&["ESPN", "TNT", "ESPN"]);
        let home = names(&["FanDuel SN Sun"]);
        let markets = [
            MarketChannels {
                market: "national",
                names: &national,
            },
            MarketChannels {
                market: "home",
                names: &home,
            },
        ];
        let out = collect(&icons(), &DisplayOptions::default(), &markets, &[]);
        let channels: Vec<&str> = out.iter().map(|b| b.channel.as_str()).collect();
        assert_eq!(channels, vec!["ESPN", "TNT"]);
    }

    #[test]
    fn test_local_market_team_and_skip_list() {
        let national = names(&["ESPN"]);
        let home = names(&["FanDuel SN Sun"]);
        let away = names(&["NBC Sports Boston"]);
        let markets = [
            MarketChannels {
                market: "national",
                names: &national,
            },
            MarketChannels {
                market: "home",
                names: &home,
            },
            MarketChannels {
                market: "away",
                names: &away,
            },
        ];
        let teams = [
            MarketTeam {
                market: "home",
                code: "TB",
            },
            MarketTeam {
                market: "away",
                code: "BOS",
            },
        ];
        let opts = DisplayOptions {
            local_markets: vec!["TB".to_string()],
            skip_channels: vec!["ESPN".to_string()],
            ..DisplayOptions::default()
        };
        let out = collect(&icons(), &opts, &markets, &teams);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel, "FanDuel");
        assert_eq!(out[0].designation.as_deref(), Some("Sun"));
        assert_eq!(out[0].icon.as_deref(), Some("fanduel.svg"));
    }

    #[test]
    fn test_always_displayed_channel_beats_skip() {
        let away = names(&["MSGB"]);
        let markets = [MarketChannels {
            market: "away",
            names: &away,
        }];
        let opts = DisplayOptions {
            skip_channels: vec!["MSG".to_string()],
            display_local_channels: vec!["MSG".to_string()],
            ..DisplayOptions::default()
        };
        let out = collect(&icons(), &opts, &markets, &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].designation.as_deref(), Some("B"));
    }

    #[test]
    fn test_always_displayed_national_channel_beats_skip() {
        let national = names(&["ESPN", "TNT"]);
        let markets = [MarketChannels {
            market: "national",
            names: &national,
        }];
        let opts = DisplayOptions {
            skip_channels: vec!["ESPN".to_string(), "TNT".to_string()],
            display_local_channels: vec!["ESPN".to_string()],
            ..DisplayOptions::default()
        };
        let out = collect(&icons(), &opts, &markets, &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel, "ESPN");
    }

    #[test]
    fn test_hide_broadcasts() {
        let national = names(&["ESPN"]);
        let markets = [MarketChannels {
            market: "national",
            names: &national,
        }];
        let opts = DisplayOptions {
            hide_broadcasts: true,
            ..DisplayOptions::default()
        };
        assert!(collect(&icons(), &opts, &markets, &[]).is_empty());
    }
}
