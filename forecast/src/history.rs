//! Per-period donation history.
//!
//! A [`TrendSeries`] is the time-ordered list of per-period donation totals
//! for one donor. It is rebuilt from raw [`DonationEvent`]s on every request
//! and never persisted.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{DonationEvent, ForecastError, Result};

/// Bucket size used when aggregating donation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// Weeks starting Monday 00:00 UTC
    #[default]
    Weekly,
    /// Calendar months starting on the 1st, 00:00 UTC
    Monthly,
}

impl Period {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    /// Start of the bucket containing `at`.
    pub fn bucket_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let date = at.date_naive();
        let start = match self {
            Period::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Period::Monthly => date - Duration::days(i64::from(date.day0())),
        };
        midnight(start)
    }

    /// Start of the bucket following the one that starts at `start`.
    fn next_start(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Weekly => start.checked_add_signed(Duration::days(7)),
            Period::Monthly => {
                let date = start.date_naive();
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).map(midnight)
            }
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Period::Weekly),
            "monthly" | "month" => Ok(Period::Monthly),
            other => Err(format!("unknown period '{}', expected weekly or monthly", other)),
        }
    }
}

/// Time-ordered per-period donation totals for one donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    /// Donor the series belongs to
    pub donor_id: String,
    /// Bucket size
    pub period: Period,
    /// Start of the first bucket, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_period_start: Option<DateTime<Utc>>,
    /// Per-period totals, oldest first
    pub totals: Vec<f64>,
}

impl TrendSeries {
    /// An empty series (donor with no recorded donations).
    pub fn empty(donor_id: impl Into<String>, period: Period) -> Self {
        Self {
            donor_id: donor_id.into(),
            period,
            first_period_start: None,
            totals: Vec::new(),
        }
    }

    /// Build a series directly from per-period totals, oldest first.
    pub fn from_totals(donor_id: impl Into<String>, period: Period, totals: Vec<f64>) -> Self {
        Self {
            donor_id: donor_id.into(),
            period,
            first_period_start: None,
            totals,
        }
    }

    /// Aggregate donation events into zero-filled buckets.
    ///
    /// Only events of `donor_id` that happened at or before `as_of` are
    /// counted. Buckets run from the period of the first such event through
    /// the period containing `as_of`. Amounts must be finite and positive.
    pub fn from_events<'a, I>(
        donor_id: &str,
        events: I,
        period: Period,
        as_of: DateTime<Utc>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a DonationEvent>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for event in events {
            if event.donor_id != donor_id || event.timestamp > as_of {
                continue;
            }
            if !event.amount_kwh.is_finite() || event.amount_kwh <= 0.0 {
                return Err(ForecastError::InvalidData(format!(
                    "donation {} of donor {} has invalid amount {}",
                    event.id, donor_id, event.amount_kwh
                )));
            }
            *buckets.entry(period.bucket_start(event.timestamp)).or_insert(0.0) +=
                event.amount_kwh;
        }

        let Some(first) = buckets.keys().next().copied() else {
            return Ok(Self::empty(donor_id, period));
        };

        let last = period.bucket_start(as_of);
        let mut totals = Vec::new();
        let mut cursor = Some(first);
        while let Some(start) = cursor {
            if start > last {
                break;
            }
            totals.push(buckets.get(&start).copied().unwrap_or(0.0));
            cursor = period.next_start(start);
        }

        debug!(
            donor_id = %donor_id,
            period = %period,
            periods = totals.len(),
            "Built trend series"
        );

        Ok(Self {
            donor_id: donor_id.to_string(),
            period,
            first_period_start: Some(first),
            totals,
        })
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// The last `n` periods (or fewer when the series is shorter).
    pub fn recent(&self, n: usize) -> &[f64] {
        let skip = self.totals.len().saturating_sub(n);
        &self.totals[skip..]
    }

    /// Mean per-period donation over the whole series, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.totals.is_empty() {
            return 0.0;
        }
        self.totals.iter().sum::<f64>() / self.totals.len() as f64
    }

    /// Reject negative, NaN or infinite totals.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.totals.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(ForecastError::InvalidData(format!(
                "trend series of donor {} contains invalid amount {}",
                self.donor_id, bad
            )));
        }
        Ok(())
    }
}

/// Lookup of per-donor trend series.
///
/// Missing series are treated as empty history by the forecaster.
pub trait HistorySource {
    /// Series for `donor_id`, if any.
    fn series(&self, donor_id: &str) -> Option<&TrendSeries>;
}

impl HistorySource for HashMap<String, TrendSeries> {
    fn series(&self, donor_id: &str) -> Option<&TrendSeries> {
        self.get(donor_id)
    }
}
