//! Engagement patterns
//!
//! Hour-of-day and day-of-week activity histograms, computed in UTC, and the
//! lifetime activity segment of every user.

use crate::table::EventTable;
use crate::tier::TierLadder;
use crate::types::{
    EngagementMetrics, Event, HourlyActivity, SegmentCount, UserActivity, UserSegment, WeekdayActivity,
};
use chrono::{Datelike, Timelike};
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
struct Bucket<'a> {
    users: HashSet<&'a str>,
    events: u64,
}

/// Calculator for activity histograms and user segments
pub struct EngagementCalculator;

impl EngagementCalculator {
    pub fn compute(table: &EventTable, segments: &TierLadder<UserSegment>) -> EngagementMetrics {
        let user_segments = Self::user_segments(table, segments);
        let segment_distribution = Self::segment_distribution(&user_segments, segments);

        EngagementMetrics {
            hourly_activity: Self::hourly_activity(table),
            weekday_activity: Self::weekday_activity(table),
            user_segments,
            segment_distribution,
        }
    }

    /// Buckets for hours 0-23 that saw activity, ascending
    pub fn hourly_activity(table: &EventTable) -> Vec<HourlyActivity> {
        histogram(table, |e| e.created_at.hour())
            .into_iter()
            .map(|(hour_of_day, b)| HourlyActivity {
                hour_of_day,
                distinct_user_count: b.users.len() as u64,
                event_count: b.events,
            })
            .collect()
    }

    /// Buckets for days 1 (Monday) to 7 (Sunday) that saw activity, ascending
    pub fn weekday_activity(table: &EventTable) -> Vec<WeekdayActivity> {
        histogram(table, |e| e.created_at.weekday().number_from_monday())
            .into_iter()
            .map(|(day_of_week, b)| WeekdayActivity {
                day_of_week,
                distinct_user_count: b.users.len() as u64,
                event_count: b.events,
            })
            .collect()
    }

    /// Lifetime totals and segment per user, ordered by user id
    pub fn user_segments(
        table: &EventTable,
        segments: &TierLadder<UserSegment>,
    ) -> Vec<UserActivity> {
        let mut users: Vec<UserActivity> = table
            .user_spans()
            .into_iter()
            .map(|(user_id, span)| UserActivity {
                user_id: user_id.to_string(),
                total_events: span.total_events,
                lifetime_days: (span.last_seen - span.first_seen).num_days(),
                segment: segments.classify(span.total_events),
            })
            .collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }

    /// User count for every tier of the ladder, lowest tier first
    pub fn segment_distribution(
        users: &[UserActivity],
        segments: &TierLadder<UserSegment>,
    ) -> Vec<SegmentCount> {
        if users.is_empty() {
            return Vec::new();
        }
        segments
            .tiers()
            .into_iter()
            .map(|segment| SegmentCount {
                segment,
                user_count: users.iter().filter(|u| u.segment == segment).count() as u64,
            })
            .collect()
    }
}

fn histogram<'a, F>(table: &'a EventTable, key: F) -> BTreeMap<u32, Bucket<'a>>
where
    F: Fn(&Event) -> u32,
{
    let mut buckets: BTreeMap<u32, Bucket<'a>> = BTreeMap::new();
    for event in table.events() {
        let bucket = buckets.entry(key(event)).or_default();
        bucket.users.insert(event.user_id.as_str());
        bucket.events += 1;
    }
    buckets
}
