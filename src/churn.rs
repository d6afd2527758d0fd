//! Churn classification
//!
//! Recency is measured against the latest event in the table, not wall-clock
//! time, so a report over historical data stays reproducible.

use crate::table::EventTable;
use crate::tier::TierLadder;
use crate::types::{
    ChurnMetrics, ChurnPivot, ChurnRecord, ChurnStatus, ChurnSummaryRow, ValueTier,
};
use std::collections::BTreeMap;

/// Classifies users by recency band and lifetime value tier
pub struct ChurnClassifier<'a> {
    bands: &'a TierLadder<ChurnStatus>,
    value_tiers: &'a TierLadder<ValueTier>,
}

impl<'a> ChurnClassifier<'a> {
    pub fn new(bands: &'a TierLadder<ChurnStatus>, value_tiers: &'a TierLadder<ValueTier>) -> Self {
        Self { bands, value_tiers }
    }

    pub fn compute(&self, table: &EventTable) -> ChurnMetrics {
        let records = self.records(table);
        ChurnMetrics {
            summary: Self::summary(&records),
            pivot: self.pivot(&records),
            records,
        }
    }

    /// One record per user, ordered by user id
    pub fn records(&self, table: &EventTable) -> Vec<ChurnRecord> {
        let Some(now) = table.last_timestamp() else {
            return Vec::new();
        };

        let mut records: Vec<ChurnRecord> = table
            .user_spans()
            .into_iter()
            .map(|(user_id, span)| {
                let days_inactive = (now - span.last_seen).num_days().max(0);
                ChurnRecord {
                    user_id: user_id.to_string(),
                    last_activity: span.last_seen,
                    total_events: span.total_events,
                    days_inactive,
                    value_tier: self.value_tiers.classify(span.total_events),
                    churn_status: self.bands.classify(days_inactive as u64),
                }
            })
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        records
    }

    /// User counts for the (status, tier) pairs that occur, in tier order
    pub fn summary(records: &[ChurnRecord]) -> Vec<ChurnSummaryRow> {
        let mut counts: BTreeMap<(ChurnStatus, ValueTier), u64> = BTreeMap::new();
        for record in records {
            *counts
                .entry((record.churn_status, record.value_tier))
                .or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|((churn_status, value_tier), user_count)| ChurnSummaryRow {
                churn_status,
                value_tier,
                user_count,
            })
            .collect()
    }

    /// Status by value tier grid covering every configured tier, zero-filled
    pub fn pivot(&self, records: &[ChurnRecord]) -> ChurnPivot {
        if records.is_empty() {
            return ChurnPivot {
                statuses: Vec::new(),
                value_tiers: Vec::new(),
                counts: Vec::new(),
            };
        }

        let statuses = self.bands.tiers();
        let value_tiers = self.value_tiers.tiers();
        let mut counts = vec![vec![0u64; value_tiers.len()]; statuses.len()];

        for record in records {
            let row = statuses.iter().position(|s| *s == record.churn_status);
            let column = value_tiers.iter().position(|t| *t == record.value_tier);
            if let (Some(row), Some(column)) = (row, column) {
                counts[row][column] += 1;
            }
        }

        ChurnPivot {
            statuses,
            value_tiers,
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::types::Event;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn events(user: &str, count: usize, days_ago: i64) -> Vec<Event> {
        (0..count)
            .map(|i| Event::new(user, now() - Duration::days(days_ago) - Duration::minutes(i as i64)))
            .collect()
    }

    fn compute(events: Vec<Event>) -> ChurnMetrics {
        let config = MetricsConfig::default();
        let table = EventTable::from_events(events).unwrap();
        ChurnClassifier::new(&config.churn_bands, &config.value_tiers).compute(&table)
    }

    #[test]
    fn test_recency_bands() {
        let mut all = events("now", 1, 0);
        all.extend(events("week", 1, 7));
        all.extend(events("eight", 1, 8));
        all.extend(events("month", 1, 30));
        all.extend(events("quarter", 1, 90));
        all.extend(events("gone", 1, 91));
        let metrics = compute(all);

        let status = |id: &str| {
            metrics
                .records
                .iter()
                .find(|r| r.user_id == id)
                .map(|r| (r.days_inactive, r.churn_status))
                .unwrap()
        };
        assert_eq!(status("now"), (0, ChurnStatus::Active));
        assert_eq!(status("week"), (7, ChurnStatus::Active));
        assert_eq!(status("eight"), (8, ChurnStatus::AtRisk));
        assert_eq!(status("month"), (30, ChurnStatus::AtRisk));
        assert_eq!(status("quarter"), (90, ChurnStatus::Churning));
        assert_eq!(status("gone"), (91, ChurnStatus::Churned));
    }

    #[test]
    fn test_partial_days_round_down() {
        let metrics = compute(vec![
            Event::new("a", now()),
            Event::new("b", now() - Duration::hours(47)),
        ]);
        assert_eq!(metrics.records[1].user_id, "b");
        assert_eq!(metrics.records[1].days_inactive, 1);
    }

    #[test]
    fn test_value_tiers() {
        let mut all = events("low", 19, 0);
        all.extend(events("medium", 20, 0));
        all.extend(events("high", 100, 0));
        let metrics = compute(all);
        let tier = |id: &str| {
            metrics
                .records
                .iter()
                .find(|r| r.user_id == id)
                .unwrap()
                .value_tier
        };
        assert_eq!(tier("low"), ValueTier::Low);
        assert_eq!(tier("medium"), ValueTier::Medium);
        assert_eq!(tier("high"), ValueTier::High);
    }

    #[test]
    fn test_pivot_is_zero_filled() {
        let mut all = events("a", 1, 0);
        all.extend(events("b", 1, 0));
        all.extend(events("c", 25, 40));
        let metrics = compute(all);

        assert_eq!(metrics.pivot.statuses.len(), 4);
        assert_eq!(metrics.pivot.value_tiers.len(), 3);
        assert_eq!(metrics.pivot.get(ChurnStatus::Active, ValueTier::Low), Some(2));
        assert_eq!(
            metrics.pivot.get(ChurnStatus::Churning, ValueTier::Medium),
            Some(1)
        );
        assert_eq!(metrics.pivot.get(ChurnStatus::Churned, ValueTier::High), Some(0));

        let total: u64 = metrics.pivot.counts.iter().flatten().sum();
        assert_eq!(total, 3);
        for row in &metrics.summary {
            assert_eq!(
                metrics.pivot.get(row.churn_status, row.value_tier),
                Some(row.user_count)
            );
        }
    }

    #[test]
    fn test_summary_lists_observed_pairs() {
        let mut all = events("a", 1, 0);
        all.extend(events("b", 1, 100));
        let metrics = compute(all);
        assert_eq!(
            metrics.summary,
            vec![
                ChurnSummaryRow {
                    churn_status: ChurnStatus::Active,
                    value_tier: ValueTier::Low,
                    user_count: 1
                },
                ChurnSummaryRow {
                    churn_status: ChurnStatus::Churned,
                    value_tier: ValueTier::Low,
                    user_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_empty_table() {
        let metrics = compute(Vec::new());
        assert!(metrics.records.is_empty());
        assert!(metrics.summary.is_empty());
        assert!(metrics.pivot.counts.is_empty());
    }
}
