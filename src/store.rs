use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{DayBucket, LeagueSnapshot};

pub type SharedStore = Arc<RwLock<AggregateStore>>;

/// Latest snapshot per board label, per day bucket. Writes replace a whole
/// snapshot; the last write for a label wins.
#[derive(Debug, Default)]
pub struct AggregateStore {
    today: HashMap<String, LeagueSnapshot>,
    yesterday: HashMap<String, LeagueSnapshot>,
}

/// A row of `read_all`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledSnapshot {
    pub label: String,
    pub snapshot: LeagueSnapshot,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    fn bucket(&self, day: DayBucket) -> &HashMap<String, LeagueSnapshot> {
        match day {
            DayBucket::Today => &self.today,
            DayBucket::Yesterday => &self.yesterday,
        }
    }

    fn bucket_mut(&mut self, day: DayBucket) -> &mut HashMap<String, LeagueSnapshot> {
        match day {
            DayBucket::Today => &mut self.today,
            DayBucket::Yesterday => &mut self.yesterday,
        }
    }

    pub fn upsert_snapshot(&mut self, label: &str, day: DayBucket, snapshot: LeagueSnapshot) {
        self.bucket_mut(day).insert(label.to_string(), snapshot);
    }

    /// Snapshots of one bucket in on-screen order.
    pub fn read_all(&self, day: DayBucket) -> Vec<LabelledSnapshot> {
        let mut rows: Vec<LabelledSnapshot> = self
            .bucket(day)
            .iter()
            .map(|(label, snapshot)| LabelledSnapshot {
                label: label.clone(),
                snapshot: snapshot.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.snapshot
                .sort_index
                .cmp(&b.snapshot.sort_index)
                .then_with(|| a.label.cmp(&b.label))
        });
        rows
    }

    pub fn clear_day(&mut self, day: DayBucket) {
        self.bucket_mut(day).clear();
    }

    pub fn len(&self, day: DayBucket) -> usize {
        self.bucket(day).len()
    }
}
