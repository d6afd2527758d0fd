//! Week indexing
//!
//! Maps instants to integer week offsets from a fixed baseline instant.
//! Offsets use true floor division, so an instant one second before the
//! baseline lands in week -1 rather than week 0.

use crate::config::GapPolicy;
use chrono::{DateTime, Duration, Utc};

/// Integer week offset from the baseline. Negative before the baseline.
pub type WeekIndex = i64;

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const SECONDS_PER_WEEK: i128 = 7 * 24 * 60 * 60;
const NANOS_PER_WEEK: i128 = SECONDS_PER_WEEK * NANOS_PER_SECOND;

/// Converts between instants and week indices relative to a baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekIndexer {
    baseline: DateTime<Utc>,
}

impl WeekIndexer {
    pub fn new(baseline: DateTime<Utc>) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> DateTime<Utc> {
        self.baseline
    }

    /// Week index containing `instant`: `floor((instant - baseline) / 1 week)`
    pub fn week_of(&self, instant: DateTime<Utc>) -> WeekIndex {
        // i128 nanoseconds keep the arithmetic exact for any representable instant.
        let elapsed = nanos_since_epoch(instant) - nanos_since_epoch(self.baseline);
        elapsed.div_euclid(NANOS_PER_WEEK) as WeekIndex
    }

    /// First instant of the given week: `baseline + week * 1 week`, clamped
    /// to the representable range. The week holding `DateTime::MIN_UTC` can
    /// start before the earliest instant chrono can express.
    pub fn week_start(&self, week: WeekIndex) -> DateTime<Utc> {
        Duration::try_weeks(week)
            .and_then(|offset| self.baseline.checked_add_signed(offset))
            .unwrap_or(if week < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

/// Weeks a weekly series covers, given the ascending weeks that had events
pub fn series_weeks<I>(observed: I, policy: GapPolicy) -> Vec<WeekIndex>
where
    I: IntoIterator<Item = WeekIndex>,
{
    let observed: Vec<WeekIndex> = observed.into_iter().collect();
    match (policy, observed.first(), observed.last()) {
        (GapPolicy::Fill, Some(&first), Some(&last)) => (first..=last).collect(),
        _ => observed,
    }
}

fn nanos_since_epoch(instant: DateTime<Utc>) -> i128 {
    instant.timestamp() as i128 * NANOS_PER_SECOND + instant.timestamp_subsec_nanos() as i128
}
