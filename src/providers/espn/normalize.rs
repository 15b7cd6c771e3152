//! ESPN event -> `NormalizedGame`, shared by the scoreboard and score-panel
//! adapters.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::free_game::FreeGameOfTheDay;
use super::wire::{parse_time, EspnCompetition, EspnCompetitor, EspnEvent, EspnStatusType};
use crate::models::{sort_and_dedup, GamePhase, GameState, Logo, NormalizedGame, TeamLine};
use crate::providers::broadcast::{self, ChannelIcons, MarketChannels, MarketTeam};
use crate::providers::DisplayOptions;
use crate::registry::{GameVisibility, LeagueEntry, LongNameRule};

pub struct NormalizeContext<'a> {
    pub entry: &'a LeagueEntry,
    pub date: NaiveDate,
    pub options: &'a DisplayOptions,
    pub icons: &'a ChannelIcons,
    pub free_game: Option<&'a FreeGameOfTheDay>,
}

/// What one upstream status code means for display.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MappedStatus {
    phase: GamePhase,
    text: String,
    show_broadcasts: bool,
    delayed: bool,
}

impl MappedStatus {
    fn new(phase: GamePhase, text: impl Into<String>) -> Self {
        MappedStatus {
            phase,
            text: text.into(),
            show_broadcasts: false,
            delayed: false,
        }
    }

    fn with_broadcasts(mut self) -> Self {
        self.show_broadcasts = true;
        self
    }
}

fn map_status(
    status: &EspnStatusType,
    start: DateTime<Utc>,
    opts: &DisplayOptions,
    home: &EspnCompetitor,
    away: &EspnCompetitor,
) -> MappedStatus {
    let text = |s: &Option<String>| s.clone().unwrap_or_default();
    let id = status.id.as_deref().unwrap_or("");
    match id {
        "5" | "6" => MappedStatus::new(GamePhase::Scheduled, text(&status.detail)),
        "0" => MappedStatus::new(GamePhase::Scheduled, "TBD"),
        "8" => MappedStatus::new(GamePhase::Scheduled, "Suspended"),
        "1" => MappedStatus::new(
            GamePhase::Scheduled,
            opts.time_format.kickoff(start, opts.timezone),
        )
        .with_broadcasts(),

        "2" | "21" | "22" | "24" | "25" | "26" | "43" | "44" | "48" => {
            MappedStatus::new(GamePhase::InProgress, text(&status.short_detail)).with_broadcasts()
        }
        "23" => {
            MappedStatus::new(GamePhase::InProgress, text(&status.description)).with_broadcasts()
        }
        // shortDetail reads "Rain Delay, Top 1st"; too long for a status line
        "7" | "17" => MappedStatus {
            delayed: true,
            ..MappedStatus::new(GamePhase::InProgress, text(&status.description)).with_broadcasts()
        },
        "49" => MappedStatus::new(GamePhase::InProgress, "HALFTIME (ET)").with_broadcasts(),

        "3" | "28" => MappedStatus::new(GamePhase::Final, text(&status.short_detail)),
        "45" | "46" => MappedStatus::new(GamePhase::Final, "FT (AET)"),
        "47" => MappedStatus::new(
            GamePhase::Final,
            format!(
                "FT (PK) {}x{}",
                home.shootout_score.unwrap_or(0),
                away.shootout_score.unwrap_or(0)
            ),
        ),
        "4" | "9" | "10" => MappedStatus::new(GamePhase::Final, "Forfeit"),

        other => {
            debug!(
                "Unrecognized ESPN status code '{}' ({:?}), treating as scheduled",
                other, status.detail
            );
            MappedStatus::new(GamePhase::Scheduled, text(&status.detail))
        }
    }
}

/// Home first. The feed usually lists home first but says so explicitly.
fn sides(comp: &EspnCompetition) -> Option<(&EspnCompetitor, &EspnCompetitor)> {
    let first = comp.competitors.first()?;
    let second = comp.competitors.get(1)?;
    if first.home_away.as_deref() == Some("away") {
        Some((second, first))
    } else {
        Some((first, second))
    }
}

fn raw_code(c: &EspnCompetitor) -> &str {
    c.team.abbreviation.as_deref().unwrap_or("")
}

fn team_code(entry: &LeagueEntry, c: &EspnCompetitor) -> String {
    let code = match &c.team.abbreviation {
        Some(code) => code.clone(),
        None => c
            .team
            .name
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(4)
            .collect::<String>()
            .to_uppercase(),
    };
    let location = c.team.location.as_deref().unwrap_or("");
    entry
        .info
        .code_overrides
        .iter()
        .find(|o| o.code == code && location.contains(&o.location_contains))
        .map(|o| o.replacement.clone())
        .unwrap_or(code)
}

fn long_name(entry: &LeagueEntry, c: &EspnCompetitor) -> String {
    match entry.info.long_names {
        LongNameRule::ShortDisplayName => c.team.short_display_name.clone().unwrap_or_default(),
        LongNameRule::CodeAndName => {
            let name = c.team.name.as_deref().unwrap_or("");
            match &c.team.abbreviation {
                Some(code) => format!("{code} {name}"),
                None => name.to_string(),
            }
        }
    }
}

fn ranking(entry: &LeagueEntry, c: &EspnCompetitor) -> Option<u8> {
    if !entry.info.rankings {
        return None;
    }
    c.rank()
        .filter(|r| (1..=25).contains(r))
        .and_then(|r| u8::try_from(r).ok())
}

fn team_line(entry: &LeagueEntry, c: &EspnCompetitor) -> TeamLine {
    TeamLine {
        code: team_code(entry, c),
        long_name: long_name(entry, c),
        logo: match &c.team.logo {
            Some(url) if !url.is_empty() => Logo::Remote(url.clone()),
            _ => Logo::Absent,
        },
        ranking: ranking(entry, c),
    }
}

fn playoff_status(comp: &EspnCompetition) -> Option<String> {
    let series = comp.series.as_ref()?;
    let mut parts = Vec::new();
    if let Some(headline) = comp.notes.first().and_then(|n| n.headline.clone()) {
        parts.push(headline);
    } else if let Some(leg) = comp.leg.as_ref().and_then(|l| l.display_value.clone()) {
        parts.push(leg);
    }
    if let Some(summary) = &series.summary {
        parts.push(summary.clone());
    } else if let Some(title) = &series.title {
        parts.insert(0, title.clone());
    }
    if parts.is_empty() {
        debug!("Playoff series without a usable note or summary: {:?}", series);
        return None;
    }
    Some(parts.join(" - "))
}

fn broadcasts(
    ctx: &NormalizeContext<'_>,
    comp: &EspnCompetition,
    home: &EspnCompetitor,
    start: DateTime<Utc>,
) -> Vec<crate::models::BroadcastEntry> {
    let markets: Vec<MarketChannels<'_>> = comp
        .broadcasts
        .iter()
        .map(|b| MarketChannels {
            market: b.market.as_deref().unwrap_or(""),
            names: &b.names,
        })
        .collect();
    let teams: Vec<MarketTeam<'_>> = comp
        .competitors
        .iter()
        .map(|c| MarketTeam {
            market: c.home_away.as_deref().unwrap_or(""),
            code: raw_code(c),
        })
        .collect();
    let mut out = broadcast::collect(ctx.icons, ctx.options, &markets, &teams);

    if let Some(free) = ctx.free_game {
        let local_day = start.with_timezone(&ctx.options.timezone).date_naive();
        if !ctx.options.hide_broadcasts && free.covers(local_day, raw_code(home)) {
            out.push(ctx.icons.entry(broadcast::FREE_GAME_CHANNEL, None));
            broadcast::dedup(&mut out);
        }
    }
    out
}

fn normalize_event(ctx: &NormalizeContext<'_>, event: &EspnEvent) -> Option<NormalizedGame> {
    let comp = event.competitions.first()?;
    let (home, away) = sides(comp)?;
    let start = comp
        .date
        .as_deref()
        .or(event.date.as_deref())
        .and_then(parse_time)?;

    let default_status = EspnStatusType::default();
    let status_type = event
        .status
        .as_ref()
        .and_then(|s| s.status_type.as_ref())
        .unwrap_or(&default_status);
    let mapped = map_status(status_type, start, ctx.options, home, away);

    let home_score = home.score.unwrap_or(0);
    let away_score = away.score.unwrap_or(0);
    let state = match mapped.phase {
        GamePhase::Scheduled => GameState::Scheduled,
        GamePhase::InProgress => GameState::InProgress {
            home_score,
            away_score,
        },
        GamePhase::Final => GameState::Final {
            home_score,
            away_score,
        },
    };
    let broadcasts = if mapped.show_broadcasts {
        broadcasts(ctx, comp, home, start)
    } else {
        Vec::new()
    };

    let visible = match ctx.entry.info.visibility {
        GameVisibility::All => true,
        GameVisibility::Televised => !broadcasts.is_empty(),
        GameVisibility::TelevisedLive => {
            !broadcasts.is_empty() && state.phase() == GamePhase::InProgress
        }
    };
    if !visible {
        return None;
    }

    Some(NormalizedGame {
        home: team_line(ctx.entry, home),
        away: team_line(ctx.entry, away),
        state,
        status: vec![mapped.text],
        broadcasts,
        playoff_status: playoff_status(comp),
        delayed: mapped.delayed,
        start_time: start,
    })
}

fn wanted(ctx: &NormalizeContext<'_>, event: &EspnEvent) -> bool {
    let Some(comp) = event.competitions.first() else {
        return false;
    };
    if let Some(filter) = &ctx.entry.teams {
        let (Some(a), Some(b)) = (comp.competitors.first(), comp.competitors.get(1)) else {
            return false;
        };
        if !filter.matches(raw_code(a), a.rank(), raw_code(b), b.rank()) {
            return false;
        }
    }
    event
        .date
        .as_deref()
        .and_then(parse_time)
        .map(|t| t.with_timezone(&ctx.options.timezone).date_naive() == ctx.date)
        .unwrap_or(false)
}

/// Filter to the requested local date and team list, map every event and
/// return the games in display order.
pub fn normalize_events(ctx: &NormalizeContext<'_>, events: &[EspnEvent]) -> Vec<NormalizedGame> {
    let mut games: Vec<NormalizedGame> = events
        .iter()
        .filter(|e| wanted(ctx, e))
        .filter_map(|e| normalize_event(ctx, e))
        .collect();
    sort_and_dedup(&mut games);
    games
}
