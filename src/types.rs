//! Core data types for the cohort engine
//!
//! This module defines the input event record and every table the engine
//! derives from it. All derived types are computed fresh from an immutable
//! event set; none of them is mutated after construction.

use crate::config::MetricsConfig;
use crate::week::WeekIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized user-activity event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Stable per-user identifier assigned upstream
    pub user_id: String,
    /// When the event occurred
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(user_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at,
        }
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Activity-volume segment by lifetime event count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSegment {
    NewUser,
    CasualUser,
    RegularUser,
    PowerUser,
}

impl UserSegment {
    pub fn label(&self) -> &'static str {
        match self {
            UserSegment::NewUser => "New User",
            UserSegment::CasualUser => "Casual User",
            UserSegment::RegularUser => "Regular User",
            UserSegment::PowerUser => "Power User",
        }
    }
}

/// Value tier by lifetime event count, used for churn cross-tabulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTier {
    Low,
    Medium,
    High,
}

impl ValueTier {
    pub fn label(&self) -> &'static str {
        match self {
            ValueTier::Low => "Low Value",
            ValueTier::Medium => "Medium Value",
            ValueTier::High => "High Value",
        }
    }
}

/// Recency-based churn risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnStatus {
    Active,
    AtRisk,
    Churning,
    Churned,
}

impl ChurnStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ChurnStatus::Active => "Active",
            ChurnStatus::AtRisk => "At Risk",
            ChurnStatus::Churning => "Churning",
            ChurnStatus::Churned => "Churned",
        }
    }
}

/// Volume tier for a user's event count within a single week
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementTier {
    Single,
    Light,
    Moderate,
    Heavy,
    Intense,
}

impl EngagementTier {
    pub fn label(&self) -> &'static str {
        match self {
            EngagementTier::Single => "Single",
            EngagementTier::Light => "Light",
            EngagementTier::Moderate => "Moderate",
            EngagementTier::Heavy => "Heavy",
            EngagementTier::Intense => "Intense",
        }
    }
}

// ============================================================================
// Cohorts and retention
// ============================================================================

/// Cohort placement of a single event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortAssignment {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Week of the user's first-ever event
    pub activated_week: WeekIndex,
    /// Week of this event
    pub current_week: WeekIndex,
    /// `current_week - activated_week`, never negative
    pub cohort_age: i64,
}

/// Distinct users per (activation week, cohort age)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortCell {
    pub activated_week: WeekIndex,
    pub cohort_age: i64,
    pub distinct_user_count: u64,
}

/// Cohort cell with its retention fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionCell {
    pub activated_week: WeekIndex,
    pub activated_date: DateTime<Utc>,
    pub cohort_age: i64,
    pub distinct_user_count: u64,
    /// Cell count over the cohort's largest cell; `None` when that maximum is zero
    pub retention_rate: Option<f64>,
}

/// One activation-week row of the retention matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionRow {
    pub activated_week: WeekIndex,
    pub activated_date: DateTime<Utc>,
    /// Retention per cohort age `0..columns`; `None` where nothing was observed
    pub rates: Vec<Option<f64>>,
}

/// Dense activation-week by cohort-age grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionMatrix {
    /// Cohort ages covered by each row, starting at 0
    pub cohort_ages: Vec<i64>,
    /// Most recent activation weeks, ascending
    pub rows: Vec<RetentionRow>,
}

impl RetentionMatrix {
    /// Retention at (activation week, cohort age), `None` if absent or unobserved
    pub fn get(&self, activated_week: WeekIndex, cohort_age: i64) -> Option<f64> {
        let column = usize::try_from(cohort_age).ok()?;
        self.rows
            .iter()
            .find(|row| row.activated_week == activated_week)
            .and_then(|row| row.rates.get(column).copied().flatten())
    }
}

// ============================================================================
// Growth
// ============================================================================

/// Weekly new/returning/active counts with period-over-period growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub week: WeekIndex,
    pub week_start: DateTime<Utc>,
    pub active_users: u64,
    pub new_users: u64,
    pub returning_users: u64,
    pub total_events: u64,
    /// Percent change in new users from the previous row
    pub new_user_growth_rate: Option<f64>,
    /// Percent change in active users from the previous row
    pub active_user_growth_rate: Option<f64>,
}

/// Observed time span of the event table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    /// Whole days between `first` and `last`
    pub days: i64,
}

/// Scalar headline figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_users: u64,
    pub total_events: u64,
    pub avg_events_per_user: Option<f64>,
    pub date_range: Option<DateRange>,
}

/// Growth metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub summary: KeyMetrics,
    pub weekly_stats: Vec<WeeklyStats>,
}

// ============================================================================
// Engagement
// ============================================================================

/// Hour-of-day (0-23) activity histogram bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyActivity {
    pub hour_of_day: u32,
    pub distinct_user_count: u64,
    pub event_count: u64,
}

/// Day-of-week activity histogram bucket, Monday = 1 through Sunday = 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayActivity {
    pub day_of_week: u32,
    pub distinct_user_count: u64,
    pub event_count: u64,
}

/// Lifetime activity of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: String,
    pub total_events: u64,
    /// Whole days between first and last event
    pub lifetime_days: i64,
    pub segment: UserSegment,
}

/// Number of users in one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCount {
    pub segment: UserSegment,
    pub user_count: u64,
}

/// Engagement metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub hourly_activity: Vec<HourlyActivity>,
    pub weekday_activity: Vec<WeekdayActivity>,
    pub user_segments: Vec<UserActivity>,
    pub segment_distribution: Vec<SegmentCount>,
}

// ============================================================================
// Churn
// ============================================================================

/// Recency and value classification of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnRecord {
    pub user_id: String,
    pub last_activity: DateTime<Utc>,
    pub total_events: u64,
    /// Whole days between the latest event in the table and this user's last event
    pub days_inactive: i64,
    pub value_tier: ValueTier,
    pub churn_status: ChurnStatus,
}

/// Observed (churn status, value tier) pair with its user count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnSummaryRow {
    pub churn_status: ChurnStatus,
    pub value_tier: ValueTier,
    pub user_count: u64,
}

/// Zero-filled churn status by value tier count matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnPivot {
    pub statuses: Vec<ChurnStatus>,
    pub value_tiers: Vec<ValueTier>,
    /// `counts[status][tier]`, indexed like `statuses` and `value_tiers`
    pub counts: Vec<Vec<u64>>,
}

impl ChurnPivot {
    pub fn get(&self, status: ChurnStatus, tier: ValueTier) -> Option<u64> {
        let row = self.statuses.iter().position(|s| *s == status)?;
        let column = self.value_tiers.iter().position(|t| *t == tier)?;
        self.counts.get(row)?.get(column).copied()
    }
}

/// Churn metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnMetrics {
    pub records: Vec<ChurnRecord>,
    pub summary: Vec<ChurnSummaryRow>,
    pub pivot: ChurnPivot,
}

// ============================================================================
// Lifecycle and stickiness
// ============================================================================

/// Weekly user transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleWeek {
    pub week: WeekIndex,
    pub week_start: DateTime<Utc>,
    pub new_users: u64,
    pub retained_users: u64,
    /// Users active in the previous row's week but not in this one
    pub churned_users: u64,
    pub resurrected_users: u64,
    pub total_active_users: u64,
}

/// Weekly active users against their trailing rolling maximum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickinessWeek {
    pub week: WeekIndex,
    pub week_start: DateTime<Utc>,
    pub weekly_active_users: u64,
    pub rolling_max_active_users: u64,
    /// `None` only when the rolling maximum is zero
    pub stickiness_ratio: Option<f64>,
}

/// Headline stickiness figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickinessSummary {
    pub avg_stickiness: Option<f64>,
    pub current_weekly_active_users: Option<u64>,
    pub current_rolling_max_active_users: Option<u64>,
}

/// Stickiness metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickinessMetrics {
    pub weeks: Vec<StickinessWeek>,
    pub summary: StickinessSummary,
}

// ============================================================================
// Engagement depth and usage frequency
// ============================================================================

/// Distinct users per (week, engagement tier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementDepthCell {
    pub week: WeekIndex,
    pub week_start: DateTime<Utc>,
    pub engagement_tier: EngagementTier,
    /// Event-count range of the tier, e.g. "2-5 events"
    pub range_label: String,
    pub distinct_user_count: u64,
}

/// Average events per user at a given cohort age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortAgeEngagement {
    pub cohort_age: i64,
    pub total_events: u64,
    pub distinct_active_users: u64,
    pub avg_events_per_user: f64,
}

/// Average events per active user within one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageFrequencyWeek {
    pub week: WeekIndex,
    pub week_start: DateTime<Utc>,
    pub active_users: u64,
    pub avg_events_per_user: f64,
}

/// Usage frequency metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageFrequency {
    pub weeks: Vec<UsageFrequencyWeek>,
    /// Mean of all per-(user, week) event counts
    pub overall_avg_events_per_user_week: Option<f64>,
}

// ============================================================================
// Report envelope
// ============================================================================

/// Cohort cells with rates, plus the bounded matrix built from them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionMetrics {
    pub cells: Vec<RetentionCell>,
    pub matrix: RetentionMatrix,
}

/// Engine metadata attached to every report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at: DateTime<Utc>,
}

/// Every metric family computed from one event table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub report_version: String,
    pub producer: ReportProducer,
    /// Configuration the report was computed with
    pub config: MetricsConfig,
    pub key_metrics: KeyMetrics,
    pub retention: RetentionMetrics,
    pub weekly_stats: Vec<WeeklyStats>,
    pub engagement: EngagementMetrics,
    pub churn: ChurnMetrics,
    pub lifecycle: Vec<LifecycleWeek>,
    pub stickiness: StickinessMetrics,
    pub engagement_depth: Vec<EngagementDepthCell>,
    pub cohort_age_engagement: Vec<CohortAgeEngagement>,
    pub usage_frequency: UsageFrequency,
}
