//! Weekly lifecycle transitions
//!
//! Weeks are visited in ascending order while two pieces of state are carried
//! forward: every user seen in an earlier week, and the previous row's active
//! set. Churned users are those active in the previous row but not in this
//! one, so the count is reported on the row where the absence is observed.

use crate::config::GapPolicy;
use crate::table::EventTable;
use crate::types::LifecycleWeek;
use crate::week::{series_weeks, WeekIndexer};
use std::collections::HashSet;

/// Running state across the ordered week series
#[derive(Debug, Default)]
pub struct LifecycleAccumulator<'a> {
    ever_seen: HashSet<&'a str>,
    previous: Option<HashSet<&'a str>>,
}

/// Transition counts for one week's active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transitions {
    pub new_users: u64,
    pub retained_users: u64,
    pub churned_users: u64,
    pub resurrected_users: u64,
    pub total_active_users: u64,
}

impl<'a> LifecycleAccumulator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `active` against all earlier weeks, then fold it into the state
    pub fn push(&mut self, active: HashSet<&'a str>) -> Transitions {
        let transitions = match &self.previous {
            None => Transitions {
                new_users: active.len() as u64,
                total_active_users: active.len() as u64,
                ..Transitions::default()
            },
            Some(previous) => {
                let mut t = Transitions {
                    total_active_users: active.len() as u64,
                    churned_users: previous.difference(&active).count() as u64,
                    ..Transitions::default()
                };
                for user in &active {
                    if previous.contains(user) {
                        t.retained_users += 1;
                    } else if self.ever_seen.contains(user) {
                        t.resurrected_users += 1;
                    } else {
                        t.new_users += 1;
                    }
                }
                t
            }
        };

        self.ever_seen.extend(active.iter().copied());
        self.previous = Some(active);
        transitions
    }
}

/// Builds the lifecycle series from an event table
pub struct LifecycleTracker;

impl LifecycleTracker {
    pub fn compute(
        table: &EventTable,
        indexer: &WeekIndexer,
        gaps: GapPolicy,
    ) -> Vec<LifecycleWeek> {
        let mut activity = table.weekly_activity(indexer);
        let mut accumulator = LifecycleAccumulator::new();

        series_weeks(activity.keys().copied(), gaps)
            .into_iter()
            .map(|week| {
                let active = activity.remove(&week).map(|a| a.users).unwrap_or_default();
                let t = accumulator.push(active);
                LifecycleWeek {
                    week,
                    week_start: indexer.week_start(week),
                    new_users: t.new_users,
                    retained_users: t.retained_users,
                    churned_users: t.churned_users,
                    resurrected_users: t.resurrected_users,
                    total_active_users: t.total_active_users,
                }
            })
            .collect()
    }
}
