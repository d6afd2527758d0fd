//! Growth metrics
//!
//! Weekly new, returning and active user counts with period-over-period
//! growth rates, plus headline totals for the whole table. First-seen weeks
//! are recomputed here from the full table rather than borrowed from cohort
//! assignment, so growth reporting stands on its own.

use crate::config::GapPolicy;
use crate::table::EventTable;
use crate::types::{DateRange, GrowthMetrics, KeyMetrics, WeeklyStats};
use crate::week::{series_weeks, WeekIndex, WeekIndexer};
use std::collections::{BTreeMap, HashSet};

/// Calculator for weekly growth series and key metrics
pub struct GrowthCalculator;

impl GrowthCalculator {
    pub fn compute(table: &EventTable, indexer: &WeekIndexer, gaps: GapPolicy) -> GrowthMetrics {
        GrowthMetrics {
            summary: Self::key_metrics(table),
            weekly_stats: Self::weekly_stats(table, indexer, gaps),
        }
    }

    pub fn key_metrics(table: &EventTable) -> KeyMetrics {
        let total_users = table.user_count() as u64;
        let total_events = table.len() as u64;

        let avg_events_per_user = if total_users == 0 {
            None
        } else {
            Some(total_events as f64 / total_users as f64)
        };

        let date_range = match (table.first_timestamp(), table.last_timestamp()) {
            (Some(first), Some(last)) => Some(DateRange {
                first,
                last,
                days: (last - first).num_days(),
            }),
            _ => None,
        };

        KeyMetrics {
            total_users,
            total_events,
            avg_events_per_user,
            date_range,
        }
    }

    pub fn weekly_stats(
        table: &EventTable,
        indexer: &WeekIndexer,
        gaps: GapPolicy,
    ) -> Vec<WeeklyStats> {
        let first_weeks: BTreeMap<&str, WeekIndex> = table
            .user_spans()
            .into_iter()
            .map(|(user, span)| (user, indexer.week_of(span.first_seen)))
            .collect();

        let mut new_by_week: BTreeMap<WeekIndex, HashSet<&str>> = BTreeMap::new();
        for (&user, &week) in &first_weeks {
            new_by_week.entry(week).or_default().insert(user);
        }

        let activity = table.weekly_activity(indexer);
        let mut stats: Vec<WeeklyStats> = Vec::new();

        for week in series_weeks(activity.keys().copied(), gaps) {
            let (active_users, total_events) = activity
                .get(&week)
                .map(|a| (a.users.len() as u64, a.events))
                .unwrap_or((0, 0));
            let new_users = new_by_week.get(&week).map_or(0, |u| u.len() as u64);

            let (new_user_growth_rate, active_user_growth_rate) = match stats.last() {
                Some(previous) => (
                    growth_rate(new_users, previous.new_users),
                    growth_rate(active_users, previous.active_users),
                ),
                None => (None, None),
            };
            stats.push(WeeklyStats {
                week,
                week_start: indexer.week_start(week),
                active_users,
                new_users,
                returning_users: active_users.saturating_sub(new_users),
                total_events,
                new_user_growth_rate,
                active_user_growth_rate,
            });
        }

        stats
    }
}

/// Percent change from `previous`; undefined when there is nothing to compare against
pub fn growth_rate(current: u64, previous: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    Some((current as f64 - previous as f64) / previous as f64 * 100.0)
}
