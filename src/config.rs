//! Engine configuration
//!
//! Every threshold, window and table size the engine uses lives here and is
//! passed explicitly into each component. Missing JSON fields take the
//! defaults below; `validate` runs before any metric is computed.

use crate::error::ComputeError;
use crate::tier::{Bound, TierLadder};
use crate::types::{ChurnStatus, EngagementTier, UserSegment, ValueTier};
use crate::week::WeekIndexer;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default trailing window for the stickiness rolling maximum (weeks)
pub const DEFAULT_STICKINESS_WINDOW: usize = 4;

/// Default number of most-recent cohorts kept in the retention matrix
pub const DEFAULT_RETENTION_ROWS: usize = 15;

/// Default number of cohort-age columns in the retention matrix
pub const DEFAULT_RETENTION_COLUMNS: usize = 12;

/// Largest accepted stickiness window (ten years of weeks)
pub const MAX_STICKINESS_WINDOW: usize = 520;

/// Largest accepted number of retention matrix rows
pub const MAX_RETENTION_ROWS: usize = 520;

/// Largest accepted number of retention matrix columns
pub const MAX_RETENTION_COLUMNS: usize = 520;

/// How weekly series treat weeks with no events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Only weeks with at least one event produce a row
    #[default]
    Omit,
    /// Every week between the first and last observed week produces a row
    Fill,
}

/// Configuration consumed by every metric component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Origin of the week index
    pub baseline: DateTime<Utc>,
    /// Lifetime event-count segments
    pub user_segments: TierLadder<UserSegment>,
    /// Lifetime event-count value tiers for churn analysis
    pub value_tiers: TierLadder<ValueTier>,
    /// Days-inactive churn bands
    pub churn_bands: TierLadder<ChurnStatus>,
    /// Per-user-per-week event-count bands
    pub depth_bands: TierLadder<EngagementTier>,
    pub stickiness_window: usize,
    pub retention_rows: usize,
    pub retention_columns: usize,
    pub gap_policy: GapPolicy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            user_segments: TierLadder::at_least(
                &[
                    (10, UserSegment::CasualUser),
                    (50, UserSegment::RegularUser),
                    (100, UserSegment::PowerUser),
                ],
                UserSegment::NewUser,
            ),
            value_tiers: TierLadder::at_least(
                &[(20, ValueTier::Medium), (100, ValueTier::High)],
                ValueTier::Low,
            ),
            churn_bands: TierLadder::at_most(
                &[
                    (7, ChurnStatus::Active),
                    (30, ChurnStatus::AtRisk),
                    (90, ChurnStatus::Churning),
                ],
                ChurnStatus::Churned,
            ),
            depth_bands: TierLadder::at_most(
                &[
                    (1, EngagementTier::Single),
                    (5, EngagementTier::Light),
                    (20, EngagementTier::Moderate),
                    (50, EngagementTier::Heavy),
                ],
                EngagementTier::Intense,
            ),
            stickiness_window: DEFAULT_STICKINESS_WINDOW,
            retention_rows: DEFAULT_RETENTION_ROWS,
            retention_columns: DEFAULT_RETENTION_COLUMNS,
            gap_policy: GapPolicy::Omit,
        }
    }
}

/// 2020-01-01T00:00:00Z
fn default_baseline() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl MetricsConfig {
    /// Fail fast on any setting that would produce a misleading table
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.user_segments.validate("user_segments", Bound::AtLeast)?;
        self.value_tiers.validate("value_tiers", Bound::AtLeast)?;
        self.churn_bands.validate("churn_bands", Bound::AtMost)?;
        self.depth_bands.validate("depth_bands", Bound::AtMost)?;
        // A user counted in a week has at least one event there.
        if self.depth_bands.steps.first().map(|s| s.threshold) == Some(0) {
            return Err(ComputeError::ConfigError(
                "depth_bands: thresholds must be at least 1 event".to_string(),
            ));
        }

        for (name, value, max) in [
            ("stickiness_window", self.stickiness_window, MAX_STICKINESS_WINDOW),
            ("retention_rows", self.retention_rows, MAX_RETENTION_ROWS),
            ("retention_columns", self.retention_columns, MAX_RETENTION_COLUMNS),
        ] {
            if value == 0 {
                return Err(ComputeError::ConfigError(format!(
                    "{name} must be greater than zero"
                )));
            }
            if value > max {
                return Err(ComputeError::ConfigError(format!(
                    "{name} must be at most {max}, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn week_indexer(&self) -> WeekIndexer {
        WeekIndexer::new(self.baseline)
    }

    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}
