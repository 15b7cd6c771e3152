pub mod rollover;

use chrono::{Duration as TimeDelta, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use self::rollover::{plan, EntryDayState, RolloverPolicy};
use crate::logos::LogoCatalog;
use crate::models::{DayBucket, LeagueSnapshot, ScoreUpdate, SortIndex};
use crate::providers::{DisplayOptions, FetchError, FetchRequest, FetchedBoard, ProviderSet};
use crate::registry::{LeagueEntry, LeagueRegistry};
use crate::store::SharedStore;

/// Upstream poll period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Local wall clock, optionally shifted or pinned to a date for testing.
#[derive(Debug, Clone)]
pub struct Clock {
    tz: Tz,
    offset: TimeDelta,
    forced_date: Option<NaiveDate>,
}

impl Clock {
    /// An offset chrono cannot represent leaves the clock unshifted.
    pub fn new(tz: Tz, debug_hours: i64, debug_minutes: i64, forced_date: Option<NaiveDate>) -> Self {
        let offset = TimeDelta::try_hours(debug_hours)
            .zip(TimeDelta::try_minutes(debug_minutes))
            .and_then(|(hours, minutes)| hours.checked_add(&minutes))
            .unwrap_or_else(|| {
                warn!(
                    "Clock offset {}h {}m out of range, ignoring",
                    debug_hours, debug_minutes
                );
                TimeDelta::zero()
            });
        Clock {
            tz,
            offset,
            forced_date,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        let wall = Utc::now().with_timezone(&self.tz).naive_local();
        let local = wall.checked_add_signed(self.offset).unwrap_or(wall);
        match self.forced_date {
            Some(date) => date.and_time(local.time()),
            None => local,
        }
    }
}

/// Result of one dispatched fetch, sent back to the scheduler task.
pub struct FetchOutcome {
    pub entry: usize,
    pub day: DayBucket,
    pub date: NaiveDate,
    pub result: Result<Vec<FetchedBoard>, FetchError>,
}

/// Owns all per-entry scheduling state. Fetches run as spawned tasks, but
/// only the scheduler applies their results.
pub struct ScoreScheduler {
    entries: Vec<Arc<LeagueEntry>>,
    providers: ProviderSet,
    policy: RolloverPolicy,
    options: Arc<DisplayOptions>,
    clock: Clock,
    store: SharedStore,
    logos: Arc<LogoCatalog>,
    registry: Arc<LeagueRegistry>,
    states: Vec<EntryDayState>,
    in_flight: HashSet<(usize, DayBucket)>,
    updates: broadcast::Sender<ScoreUpdate>,
}

#[allow(clippy::too_many_arguments)]
impl ScoreScheduler {
    pub fn new(
        entries: Vec<LeagueEntry>,
        providers: ProviderSet,
        policy: RolloverPolicy,
        options: Arc<DisplayOptions>,
        clock: Clock,
        store: SharedStore,
        logos: Arc<LogoCatalog>,
        registry: Arc<LeagueRegistry>,
        updates: broadcast::Sender<ScoreUpdate>,
    ) -> Self {
        for entry in &entries {
            if providers.get(entry.provider()).is_none() {
                warn!(
                    "No {} provider available; {} will not be polled",
                    entry.provider().as_str(),
                    entry.label
                );
            }
        }
        let states = vec![EntryDayState::default(); entries.len()];
        Self {
            entries: entries.into_iter().map(Arc::new).collect(),
            providers,
            policy,
            options,
            clock,
            store,
            logos,
            registry,
            states,
            in_flight: HashSet::new(),
            updates,
        }
    }

    /// Poll forever at the fixed interval.
    pub async fn run(mut self) {
        let (tx, mut rx) = mpsc::channel(256);
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(
            "Score scheduler started ({} entries, interval={:?}, rollover={}h)",
            self.entries.len(),
            POLL_INTERVAL,
            self.policy.rollover_hour
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.clock.now();
                    self.tick_at(now, &tx).await;
                }
                Some(outcome) = rx.recv() => self.apply(outcome).await,
            }
        }
    }

    /// Clear stale buckets for `now`, then dispatch every wanted fetch whose
    /// previous fetch has resolved.
    pub async fn tick_at(&mut self, now: NaiveDateTime, tx: &mpsc::Sender<FetchOutcome>) {
        self.clear_stale(now).await;

        let mut dispatched = 0;
        for idx in 0..self.entries.len() {
            let plan = plan(&self.policy, now, &self.states[idx]);
            let wanted = [
                (DayBucket::Today, plan.today),
                (DayBucket::Yesterday, plan.yesterday),
            ];
            for (day, date) in wanted {
                let Some(date) = date else { continue };
                if self.in_flight.contains(&(idx, day)) {
                    debug!("{} {} still in flight, skipping", self.entries[idx].label, day);
                    continue;
                }
                if self.dispatch(idx, day, date, tx) {
                    dispatched += 1;
                }
            }
        }
        debug!("Tick at {}: {} fetches dispatched", now, dispatched);
    }

    async fn clear_stale(&mut self, now: NaiveDateTime) {
        let stale = if self.policy.is_past_rollover(now) {
            for state in &mut self.states {
                state.yesterday_settled_for = None;
            }
            DayBucket::Yesterday
        } else if !self.policy.always_show_today {
            DayBucket::Today
        } else {
            return;
        };
        let mut store = self.store.write().await;
        let cleared = store.len(stale);
        if cleared > 0 {
            debug!("Clearing {} stale {} snapshots", cleared, stale);
            store.clear_day(stale);
        }
    }

    fn dispatch(
        &mut self,
        idx: usize,
        day: DayBucket,
        date: NaiveDate,
        tx: &mpsc::Sender<FetchOutcome>,
    ) -> bool {
        let entry = Arc::clone(&self.entries[idx]);
        let Some(provider) = self.providers.get(entry.provider()) else {
            return false;
        };
        self.in_flight.insert((idx, day));
        debug!("{} fetch for {} {} dispatched", provider.name(), entry.label, day);
        let req = FetchRequest {
            entry,
            date,
            day,
            options: Arc::clone(&self.options),
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = provider.fetch_games(&req).await;
            let outcome = FetchOutcome {
                entry: idx,
                day,
                date,
                result,
            };
            if tx.send(outcome).await.is_err() {
                debug!("Scheduler gone, dropping {} result", req.entry.label);
            }
        });
        true
    }

    /// Store a finished fetch. A failure leaves the previous snapshot alone.
    pub async fn apply(&mut self, outcome: FetchOutcome) {
        let FetchOutcome {
            entry: idx,
            day,
            date,
            result,
        } = outcome;
        self.in_flight.remove(&(idx, day));
        let Some(entry) = self.entries.get(idx).cloned() else {
            return;
        };

        let mut boards = match result {
            Ok(boards) => boards,
            Err(e) => {
                warn!(
                    "{} fetch for {} ({}) failed: {}",
                    entry.provider().as_str(),
                    entry.label,
                    day,
                    e
                );
                return;
            }
        };

        let no_games = entry.info.track_empty_days && boards.iter().all(|b| b.games.is_empty());
        let all_final = boards
            .iter()
            .all(|b| b.games.iter().all(|g| g.state.is_final()));

        {
            let mut store = self.store.write().await;
            for board in &mut boards {
                let label = board.label.clone().unwrap_or_else(|| entry.label.clone());
                let logo_dir = self.registry.logo_dir(&entry, &label).to_string();
                self.logos.localize(&logo_dir, &mut board.games);

                let sort_index = SortIndex {
                    entry: entry.index,
                    board: board.board,
                };
                store.upsert_snapshot(
                    &label,
                    day,
                    LeagueSnapshot {
                        league: entry.league.clone(),
                        games: board.games.clone(),
                        sort_index,
                        no_games: board.games.is_empty(),
                        fetched_at: Utc::now(),
                    },
                );
                // no subscribers is fine
                let _ = self.updates.send(ScoreUpdate {
                    day,
                    label,
                    league: entry.league.clone(),
                    games: board.games.clone(),
                    sort_index,
                    no_games_today: no_games,
                });
            }
        }

        let state = &mut self.states[idx];
        match day {
            DayBucket::Today if no_games => {
                debug!("No {} games on {}", entry.label, date);
                state.no_games_on = Some(date);
            }
            DayBucket::Yesterday if all_final => {
                debug!("{} results for {} are final", entry.label, date);
                state.yesterday_settled_for = Some(date);
            }
            _ => {}
        }
    }
}
