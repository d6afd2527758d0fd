//! Stickiness
//!
//! Weekly active users divided by the peak weekly count over a trailing
//! window that includes the current week. The peak stands in for monthly
//! active users when the window is four weeks.

use crate::config::GapPolicy;
use crate::table::EventTable;
use crate::types::{StickinessMetrics, StickinessSummary, StickinessWeek};
use crate::week::{series_weeks, WeekIndexer};
use std::collections::VecDeque;

/// Rolling maximum over the last `window` values, shorter at series start
#[derive(Debug)]
pub struct RollingMax {
    window: usize,
    values: VecDeque<u64>,
}

impl RollingMax {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            values: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: u64) -> u64 {
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.values.iter().copied().max().unwrap_or(value)
    }
}

pub struct StickinessCalculator;

impl StickinessCalculator {
    pub fn compute(
        table: &EventTable,
        indexer: &WeekIndexer,
        window: usize,
        gaps: GapPolicy,
    ) -> StickinessMetrics {
        let weeks = Self::weeks(table, indexer, window, gaps);
        let summary = Self::summary(&weeks);
        StickinessMetrics { weeks, summary }
    }

    pub fn weeks(
        table: &EventTable,
        indexer: &WeekIndexer,
        window: usize,
        gaps: GapPolicy,
    ) -> Vec<StickinessWeek> {
        let activity = table.weekly_activity(indexer);
        let mut rolling = RollingMax::new(window);

        series_weeks(activity.keys().copied(), gaps)
            .into_iter()
            .map(|week| {
                let weekly_active_users = activity.get(&week).map_or(0, |a| a.users.len() as u64);
                let rolling_max_active_users = rolling.push(weekly_active_users);
                let stickiness_ratio = if rolling_max_active_users == 0 {
                    None
                } else {
                    Some(weekly_active_users as f64 / rolling_max_active_users as f64)
                };
                StickinessWeek {
                    week,
                    week_start: indexer.week_start(week),
                    weekly_active_users,
                    rolling_max_active_users,
                    stickiness_ratio,
                }
            })
            .collect()
    }

    /// Mean of the defined ratios plus the latest week's counts
    pub fn summary(weeks: &[StickinessWeek]) -> StickinessSummary {
        let ratios: Vec<f64> = weeks.iter().filter_map(|w| w.stickiness_ratio).collect();
        let avg_stickiness = if ratios.is_empty() {
            None
        } else {
            Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
        };
        let latest = weeks.last();

        StickinessSummary {
            avg_stickiness,
            current_weekly_active_users: latest.map(|w| w.weekly_active_users),
            current_rolling_max_active_users: latest.map(|w| w.rolling_max_active_users),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn baseline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    /// `counts[i]` distinct users active in week `weeks[i]`
    fn table(weeks: &[i64], counts: &[usize]) -> EventTable {
        let mut events = Vec::new();
        for (week, count) in weeks.iter().zip(counts) {
            for user in 0..*count {
                events.push(Event::new(
                    format!("u{user}"),
                    baseline() + Duration::weeks(*week),
                ));
            }
        }
        EventTable::from_events(events).unwrap()
    }

    #[test]
    fn test_rolling_max() {
        let mut rolling = RollingMax::new(3);
        let maxima: Vec<u64> = [5, 2, 1, 1, 4, 0]
            .into_iter()
            .map(|v| rolling.push(v))
            .collect();
        assert_eq!(maxima, vec![5, 5, 5, 2, 4, 4]);
    }

    #[test]
    fn test_wide_window_grows_with_series() {
        let mut rolling = RollingMax::new(usize::MAX);
        assert_eq!(rolling.push(3), 3);
        assert_eq!(rolling.push(1), 3);
        assert_eq!(rolling.values.len(), 2);
    }

    #[test]
    fn test_series_start_uses_partial_window() {
        let indexer = WeekIndexer::new(baseline());
        let weeks = StickinessCalculator::weeks(
            &table(&[0, 1, 2, 3, 4, 5], &[4, 8, 2, 2, 2, 2]),
            &indexer,
            4,
            GapPolicy::Omit,
        );
        let maxima: Vec<u64> = weeks.iter().map(|w| w.rolling_max_active_users).collect();
        assert_eq!(maxima, vec![4, 8, 8, 8, 8, 2]);
        assert_eq!(weeks[0].stickiness_ratio, Some(1.0));
        assert_eq!(weeks[2].stickiness_ratio, Some(0.25));
    }

    #[test]
    fn test_ratio_bounded() {
        let indexer = WeekIndexer::new(baseline());
        let weeks = StickinessCalculator::weeks(
            &table(&[0, 1, 2, 5, 6, 9], &[3, 7, 1, 9, 4, 2]),
            &indexer,
            4,
            GapPolicy::Fill,
        );
        for week in &weeks {
            assert!(week.weekly_active_users <= week.rolling_max_active_users);
            if let Some(ratio) = week.stickiness_ratio {
                assert!((0.0..=1.0).contains(&ratio));
            }
        }
    }

    #[test]
    fn test_gap_policy_changes_window() {
        let indexer = WeekIndexer::new(baseline());
        let events = table(&[0, 5], &[4, 2]);

        let omitted = StickinessCalculator::weeks(&events, &indexer, 4, GapPolicy::Omit);
        assert_eq!(omitted.len(), 2);
        assert_eq!(omitted[1].rolling_max_active_users, 4);

        let filled = StickinessCalculator::weeks(&events, &indexer, 4, GapPolicy::Fill);
        assert_eq!(filled.len(), 6);
        assert_eq!(filled[4].stickiness_ratio, None);
        assert_eq!(filled[5].rolling_max_active_users, 2);
        assert_eq!(filled[5].stickiness_ratio, Some(1.0));
    }

    #[test]
    fn test_summary() {
        let indexer = WeekIndexer::new(baseline());
        let metrics = StickinessCalculator::compute(
            &table(&[0, 1], &[4, 2]),
            &indexer,
            4,
            GapPolicy::Omit,
        );
        assert_eq!(metrics.summary.avg_stickiness, Some(0.75));
        assert_eq!(metrics.summary.current_weekly_active_users, Some(2));
        assert_eq!(metrics.summary.current_rolling_max_active_users, Some(4));
    }

    #[test]
    fn test_empty_table() {
        let indexer = WeekIndexer::new(baseline());
        let metrics =
            StickinessCalculator::compute(&EventTable::default(), &indexer, 4, GapPolicy::Omit);
        assert!(metrics.weeks.is_empty());
        assert_eq!(metrics.summary.avg_stickiness, None);
        assert_eq!(metrics.summary.current_weekly_active_users, None);
    }
}
