//! Report encoding
//!
//! Wraps computed metric families in an `AnalyticsReport` with producer
//! metadata and serializes it to JSON.

use crate::config::MetricsConfig;
use crate::error::ComputeError;
use crate::types::{
    AnalyticsReport, ChurnMetrics, CohortAgeEngagement, EngagementDepthCell, EngagementMetrics,
    GrowthMetrics, LifecycleWeek, ReportProducer, RetentionMetrics, StickinessMetrics,
    UsageFrequency,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Every metric family, ready to be wrapped in a report
#[derive(Debug, Clone)]
pub struct MetricFamilies {
    pub retention: RetentionMetrics,
    pub growth: GrowthMetrics,
    pub engagement: EngagementMetrics,
    pub churn: ChurnMetrics,
    pub lifecycle: Vec<LifecycleWeek>,
    pub stickiness: StickinessMetrics,
    pub engagement_depth: Vec<EngagementDepthCell>,
    pub cohort_age_engagement: Vec<CohortAgeEngagement>,
    pub usage_frequency: UsageFrequency,
}

/// Report encoder carrying a per-instance producer id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode(&self, config: &MetricsConfig, families: MetricFamilies) -> AnalyticsReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
            computed_at: Utc::now(),
        };

        AnalyticsReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            config: config.clone(),
            key_metrics: families.growth.summary,
            retention: families.retention,
            weekly_stats: families.growth.weekly_stats,
            engagement: families.engagement,
            churn: families.churn,
            lifecycle: families.lifecycle,
            stickiness: families.stickiness,
            engagement_depth: families.engagement_depth,
            cohort_age_engagement: families.cohort_age_engagement,
            usage_frequency: families.usage_frequency,
        }
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json(
        &self,
        config: &MetricsConfig,
        families: MetricFamilies,
    ) -> Result<String, ComputeError> {
        let report = self.encode(config, families);
        to_json(&report, true)
    }
}

/// Serialize a finished report
pub fn to_json(report: &AnalyticsReport, pretty: bool) -> Result<String, ComputeError> {
    let encoded = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    encoded.map_err(|e| ComputeError::EncodingError(e.to_string()))
}
