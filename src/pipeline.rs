//! Pipeline orchestration
//!
//! This module provides the public API for the cohort engine. It takes raw
//! event JSON (or an already validated `EventTable`) through every metric
//! family and into an encoded report.

use crate::churn::ChurnClassifier;
use crate::cohort::CohortAssigner;
use crate::config::MetricsConfig;
use crate::depth::{cohort_age_engagement, usage_frequency, DepthClassifier};
use crate::encoder::{MetricFamilies, ReportEncoder};
use crate::engagement::EngagementCalculator;
use crate::error::ComputeError;
use crate::growth::GrowthCalculator;
use crate::lifecycle::LifecycleTracker;
use crate::retention::{RetentionAggregator, RetentionMatrixBuilder};
use crate::schema::EventAdapter;
use crate::stickiness::StickinessCalculator;
use crate::table::EventTable;
use crate::types::{
    AnalyticsReport, ChurnMetrics, CohortAgeEngagement, CohortAssignment, EngagementDepthCell,
    EngagementMetrics, GrowthMetrics, LifecycleWeek, RetentionMetrics, StickinessMetrics,
    UsageFrequency,
};
use crate::week::WeekIndexer;
use tracing::{debug, info, warn};

/// Convert a raw event payload into a pretty-printed analytics report.
///
/// # Arguments
/// * `events_json` - JSON array or NDJSON of `{user_id, created_at}` records
/// * `config_json` - Optional `MetricsConfig` JSON; missing fields use defaults
///
/// # Example
/// ```ignore
/// let report = events_to_report_json(
///     r#"[{"user_id": "u1", "created_at": "2024-01-15T09:00:00Z"}]"#.to_string(),
///     None,
/// )?;
/// ```
pub fn events_to_report_json(
    events_json: String,
    config_json: Option<String>,
) -> Result<String, ComputeError> {
    let config = match config_json.as_deref() {
        Some(json) => MetricsConfig::from_json(json)?,
        None => MetricsConfig::default(),
    };
    let engine = MetricsEngine::new(config)?;

    let records = EventAdapter::parse_auto(&events_json)?;
    let table = EventAdapter::to_table(&records)?;

    engine.report_to_json(&table)
}

/// Metrics engine bound to one validated configuration.
///
/// Every method is a pure function of the table it is given, so one engine
/// can serve any number of tables.
pub struct MetricsEngine {
    config: MetricsConfig,
    indexer: WeekIndexer,
    encoder: ReportEncoder,
}

impl MetricsEngine {
    /// Create an engine, rejecting configurations that would misclassify
    pub fn new(config: MetricsConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            indexer: config.week_indexer(),
            config,
            encoder: ReportEncoder::new(),
        })
    }

    /// Create an engine with a fixed producer instance ID
    pub fn with_instance_id(
        config: MetricsConfig,
        instance_id: String,
    ) -> Result<Self, ComputeError> {
        let mut engine = Self::new(config)?;
        engine.encoder = ReportEncoder::with_instance_id(instance_id);
        Ok(engine)
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn cohort_assignments(&self, table: &EventTable) -> Vec<CohortAssignment> {
        CohortAssigner::assign(table, &self.indexer)
    }

    pub fn retention(&self, table: &EventTable) -> RetentionMetrics {
        let assignments = self.cohort_assignments(table);
        self.retention_from(&assignments)
    }

    fn retention_from(&self, assignments: &[CohortAssignment]) -> RetentionMetrics {
        let cells = RetentionAggregator::aggregate(assignments);
        let cells = RetentionAggregator::retention(&cells, &self.indexer);
        let matrix = RetentionMatrixBuilder::build(
            &cells,
            self.config.retention_rows,
            self.config.retention_columns,
        );
        debug!(
            cells = cells.len(),
            cohorts = matrix.rows.len(),
            "computed retention"
        );
        RetentionMetrics { cells, matrix }
    }

    pub fn growth(&self, table: &EventTable) -> GrowthMetrics {
        let growth = GrowthCalculator::compute(table, &self.indexer, self.config.gap_policy);
        debug!(weeks = growth.weekly_stats.len(), "computed growth");
        growth
    }

    pub fn engagement(&self, table: &EventTable) -> EngagementMetrics {
        let engagement = EngagementCalculator::compute(table, &self.config.user_segments);
        debug!(
            users = engagement.user_segments.len(),
            "computed engagement"
        );
        engagement
    }

    pub fn churn(&self, table: &EventTable) -> ChurnMetrics {
        let churn = ChurnClassifier::new(&self.config.churn_bands, &self.config.value_tiers)
            .compute(table);
        debug!(users = churn.records.len(), "computed churn");
        churn
    }

    pub fn lifecycle(&self, table: &EventTable) -> Vec<LifecycleWeek> {
        let lifecycle = LifecycleTracker::compute(table, &self.indexer, self.config.gap_policy);
        debug!(weeks = lifecycle.len(), "computed lifecycle");
        lifecycle
    }

    pub fn stickiness(&self, table: &EventTable) -> StickinessMetrics {
        let stickiness = StickinessCalculator::compute(
            table,
            &self.indexer,
            self.config.stickiness_window,
            self.config.gap_policy,
        );
        debug!(weeks = stickiness.weeks.len(), "computed stickiness");
        stickiness
    }

    pub fn engagement_depth(&self, table: &EventTable) -> Vec<EngagementDepthCell> {
        let cells = DepthClassifier::new(&self.config.depth_bands).classify(table, &self.indexer);
        debug!(cells = cells.len(), "computed engagement depth");
        cells
    }

    pub fn cohort_age_engagement(&self, table: &EventTable) -> Vec<CohortAgeEngagement> {
        cohort_age_engagement(&self.cohort_assignments(table))
    }

    pub fn usage_frequency(&self, table: &EventTable) -> UsageFrequency {
        let usage = usage_frequency(table, &self.indexer);
        debug!(weeks = usage.weeks.len(), "computed usage frequency");
        usage
    }

    /// Compute every metric family and wrap them in a report
    pub fn report(&self, table: &EventTable) -> AnalyticsReport {
        if table.is_empty() {
            warn!("event table is empty, report will contain no rows");
        }

        let assignments = self.cohort_assignments(table);
        let families = MetricFamilies {
            retention: self.retention_from(&assignments),
            growth: self.growth(table),
            engagement: self.engagement(table),
            churn: self.churn(table),
            lifecycle: self.lifecycle(table),
            stickiness: self.stickiness(table),
            engagement_depth: self.engagement_depth(table),
            cohort_age_engagement: cohort_age_engagement(&assignments),
            usage_frequency: self.usage_frequency(table),
        };

        let report = self.encoder.encode(&self.config, families);
        info!(
            events = report.key_metrics.total_events,
            users = report.key_metrics.total_users,
            cohorts = report.retention.matrix.rows.len(),
            "computed analytics report"
        );
        report
    }

    /// Compute the report and encode it as pretty JSON
    pub fn report_to_json(&self, table: &EventTable) -> Result<String, ComputeError> {
        crate::encoder::to_json(&self.report(table), true)
    }
}
