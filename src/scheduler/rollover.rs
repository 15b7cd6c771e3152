//! Which day buckets an entry wants this tick.
//!
//! Before the rollover hour the previous calendar day is still "the games
//! people care about", so yesterday is polled until every game in it is
//! final. From the rollover hour on, today is polled instead.

use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloverPolicy {
    pub rollover_hour: u32,
    pub always_show_today: bool,
}

impl RolloverPolicy {
    pub fn is_past_rollover(&self, now: NaiveDateTime) -> bool {
        now.hour() >= self.rollover_hour
    }
}

/// Per-entry memory between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryDayState {
    /// A "today" fetch on this date came back empty.
    pub no_games_on: Option<NaiveDate>,
    /// Every game on this date was final when last fetched as "yesterday".
    pub yesterday_settled_for: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPlan {
    pub today: Option<NaiveDate>,
    pub yesterday: Option<NaiveDate>,
}

pub fn yesterday_of(today: NaiveDate) -> NaiveDate {
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

pub fn plan(policy: &RolloverPolicy, now: NaiveDateTime, state: &EntryDayState) -> DayPlan {
    let today = now.date();
    let yesterday = yesterday_of(today);
    let past = policy.is_past_rollover(now);

    let want_today = (past || policy.always_show_today) && state.no_games_on != Some(today);
    let want_yesterday = !past && state.yesterday_settled_for != Some(yesterday);

    DayPlan {
        today: want_today.then_some(today),
        yesterday: want_yesterday.then_some(yesterday),
    }
}
