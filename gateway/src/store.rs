//! In-memory donation store
//!
//! Holds donor profiles and the immutable log of donation events. Leaderboard
//! snapshots and trend series are derived from it on demand.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use forecast::{DonationEvent, DonorAccount, LeaderboardSnapshot, Period, TrendSeries};

use crate::types::{GatewayError, Result};

/// Time window whose donations count toward leaderboard totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    #[default]
    AllTime,
    Year,
    Month,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::AllTime => "all-time",
            Scope::Year => "year",
            Scope::Month => "month",
        }
    }

    /// Whether a donation at `at` counts toward totals as of `now`
    pub fn includes(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if at > now {
            return false;
        }
        match self {
            Scope::AllTime => true,
            Scope::Year => at.year() == now.year(),
            Scope::Month => at.year() == now.year() && at.month() == now.month(),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all-time" | "all_time" | "alltime" | "all" => Ok(Scope::AllTime),
            "year" | "yearly" => Ok(Scope::Year),
            "month" | "monthly" => Ok(Scope::Month),
            other => Err(format!(
                "unknown scope '{}', expected all-time, year or month",
                other
            )),
        }
    }
}

/// Donor profile as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub monthly_capacity_kwh: f64,
}

/// Seed file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub donors: Vec<DonorProfile>,
    #[serde(default)]
    pub donations: Vec<DonationEvent>,
}

/// Outcome of recording a donation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    /// The event as recorded
    pub event: DonationEvent,
    /// Amount the donor asked to give
    pub requested_kwh: f64,
    /// Whether the amount was capped at the remaining monthly capacity
    pub capped: bool,
    /// Donated this calendar month, including this event
    pub monthly_total_kwh: f64,
    /// Capacity left this month
    pub remaining_capacity_kwh: f64,
    /// Donated in total, including this event
    pub cumulative_total_kwh: f64,
}

/// Monthly capacity usage of one donor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyUsage {
    pub capacity_kwh: f64,
    pub donated_kwh: f64,
    pub remaining_kwh: f64,
}

#[derive(Debug, Default)]
struct StoreInner {
    donors: BTreeMap<String, DonorProfile>,
    events: Vec<DonationEvent>,
}

impl StoreInner {
    fn total_where<F>(&self, donor_id: &str, keep: F) -> f64
    where
        F: Fn(&DonationEvent) -> bool,
    {
        self.events
            .iter()
            .filter(|e| e.donor_id == donor_id && keep(e))
            .map(|e| e.amount_kwh)
            .sum()
    }
}

/// Thread-safe donation store
#[derive(Debug, Default)]
pub struct DonationStore {
    inner: RwLock<StoreInner>,
}

impl DonationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed data after validating it
    pub fn from_seed(seed: SeedData) -> Result<Self> {
        let mut donors = BTreeMap::new();
        for donor in seed.donors {
            if !donor.monthly_capacity_kwh.is_finite() || donor.monthly_capacity_kwh < 0.0 {
                return Err(GatewayError::InvalidData(format!(
                    "donor {} has invalid monthly capacity {}",
                    donor.id, donor.monthly_capacity_kwh
                )));
            }
            if donors.contains_key(&donor.id) {
                return Err(GatewayError::InvalidData(format!(
                    "duplicate donor id {}",
                    donor.id
                )));
            }
            donors.insert(donor.id.clone(), donor);
        }

        let mut events = Vec::with_capacity(seed.donations.len());
        for mut event in seed.donations {
            if !donors.contains_key(&event.donor_id) {
                return Err(GatewayError::InvalidData(format!(
                    "donation references unknown donor {}",
                    event.donor_id
                )));
            }
            if !event.amount_kwh.is_finite() || event.amount_kwh <= 0.0 {
                return Err(GatewayError::InvalidData(format!(
                    "donation of donor {} has invalid amount {}",
                    event.donor_id, event.amount_kwh
                )));
            }
            if event.id.is_empty() {
                event.id = Uuid::new_v4().to_string();
            }
            events.push(event);
        }
        events.sort_by_key(|e| e.timestamp);

        info!(
            donors = donors.len(),
            donations = events.len(),
            "Donation store loaded"
        );

        Ok(Self {
            inner: RwLock::new(StoreInner { donors, events }),
        })
    }

    /// Load a JSON seed file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let seed: SeedData = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Config(format!("invalid seed file {}: {}", path.display(), e))
        })?;
        Self::from_seed(seed)
    }

    /// Number of registered donors
    pub async fn donor_count(&self) -> usize {
        self.inner.read().await.donors.len()
    }

    /// Ranked leaderboard for `scope` as of `now`.
    ///
    /// Every registered donor is ranked, including those without donations
    /// in scope. `reached_at` is the time of the last counted donation.
    pub async fn snapshot(&self, scope: Scope, now: DateTime<Utc>) -> Result<LeaderboardSnapshot> {
        let inner = self.inner.read().await;

        let mut totals: HashMap<&str, (f64, Option<DateTime<Utc>>)> = HashMap::new();
        for event in inner.events.iter().filter(|e| scope.includes(e.timestamp, now)) {
            let entry = totals.entry(event.donor_id.as_str()).or_insert((0.0, None));
            entry.0 += event.amount_kwh;
            entry.1 = Some(entry.1.map_or(event.timestamp, |t| t.max(event.timestamp)));
        }

        let accounts = inner
            .donors
            .values()
            .map(|donor| {
                let (total, reached) = totals.get(donor.id.as_str()).copied().unwrap_or((0.0, None));
                let mut account = DonorAccount::new(donor.id.clone(), donor.display_name.clone(), total)
                    .with_capacity(donor.monthly_capacity_kwh);
                account.reached_at = reached;
                account
            })
            .collect();

        Ok(LeaderboardSnapshot::from_accounts(accounts)?)
    }

    /// Trend series for the given donors, keyed by donor id
    pub async fn histories(
        &self,
        donor_ids: &[&str],
        period: Period,
        as_of: DateTime<Utc>,
    ) -> Result<HashMap<String, TrendSeries>> {
        let inner = self.inner.read().await;
        let mut out = HashMap::with_capacity(donor_ids.len());
        for donor_id in donor_ids {
            let series = TrendSeries::from_events(donor_id, &inner.events, period, as_of)?;
            out.insert(donor_id.to_string(), series);
        }
        Ok(out)
    }

    /// Capacity usage for the calendar month containing `now`
    pub async fn monthly_usage(&self, donor_id: &str, now: DateTime<Utc>) -> Result<MonthlyUsage> {
        let inner = self.inner.read().await;
        let capacity_kwh = inner
            .donors
            .get(donor_id)
            .map(|d| d.monthly_capacity_kwh)
            .ok_or_else(|| GatewayError::NotFound(format!("donor {}", donor_id)))?;
        let donated_kwh = inner.total_where(donor_id, |e| Scope::Month.includes(e.timestamp, now));
        Ok(MonthlyUsage {
            capacity_kwh,
            donated_kwh,
            remaining_kwh: (capacity_kwh - donated_kwh).max(0.0),
        })
    }

    /// Record a donation, capping it at the donor's remaining monthly capacity.
    pub async fn record_donation(
        &self,
        donor_id: &str,
        kwh: f64,
        context: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DonationReceipt> {
        if !kwh.is_finite() || kwh <= 0.0 {
            return Err(GatewayError::BadRequest(format!(
                "donation amount must be a positive number, got {}",
                kwh
            )));
        }

        let mut inner = self.inner.write().await;
        let capacity = inner
            .donors
            .get(donor_id)
            .map(|d| d.monthly_capacity_kwh)
            .ok_or_else(|| GatewayError::NotFound(format!("donor {}", donor_id)))?;

        let month_so_far = inner.total_where(donor_id, |e| Scope::Month.includes(e.timestamp, now));
        let remaining = capacity - month_so_far;
        if remaining <= 0.0 {
            return Err(GatewayError::InvalidData(format!(
                "monthly donation capacity of {} kWh is exhausted",
                capacity
            )));
        }

        let recorded = kwh.min(remaining);
        let event = DonationEvent {
            id: Uuid::new_v4().to_string(),
            donor_id: donor_id.to_string(),
            timestamp: now,
            amount_kwh: recorded,
            context: context.unwrap_or_default(),
        };
        inner.events.push(event.clone());

        let monthly_total_kwh = month_so_far + recorded;
        let cumulative_total_kwh = inner.total_where(donor_id, |e| e.timestamp <= now);

        debug!(
            donor_id = %donor_id,
            requested = kwh,
            recorded,
            monthly_total_kwh,
            "Donation recorded"
        );

        Ok(DonationReceipt {
            event,
            requested_kwh: kwh,
            capped: recorded < kwh,
            monthly_total_kwh,
            remaining_capacity_kwh: (capacity - monthly_total_kwh).max(0.0),
            cumulative_total_kwh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::io::Write;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn profile(id: &str, capacity: f64) -> DonorProfile {
        DonorProfile {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            monthly_capacity_kwh: capacity,
        }
    }

    fn seeded() -> DonationStore {
        let seed = SeedData {
            donors: vec![profile("alice", 100.0), profile("bob", 50.0), profile("carol", 80.0)],
            donations: vec![
                DonationEvent::new("alice", now() - Duration::days(200), 40.0),
                DonationEvent::new("alice", now() - Duration::days(3), 20.0),
                DonationEvent::new("bob", now() - Duration::days(2), 45.0),
            ],
        };
        DonationStore::from_seed(seed).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_all_time() {
        let store = seeded();
        let snapshot = store.snapshot(Scope::AllTime, now()).await.unwrap();
        let ids: Vec<_> = snapshot.accounts().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
        assert_eq!(snapshot.find("alice").unwrap().total_kwh, 60.0);
        assert_eq!(snapshot.find("carol").unwrap().total_kwh, 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_month_scope() {
        let store = seeded();
        let snapshot = store.snapshot(Scope::Month, now()).await.unwrap();
        assert_eq!(snapshot.find("bob").unwrap().rank, 1);
        assert_eq!(snapshot.find("alice").unwrap().total_kwh, 20.0);
    }

    #[tokio::test]
    async fn test_histories_build_series() {
        let store = seeded();
        let histories = store
            .histories(&["alice", "carol"], Period::Monthly, now())
            .await
            .unwrap();
        assert_eq!(histories["alice"].totals.last().copied(), Some(20.0));
        assert!(histories["carol"].is_empty());
    }

    #[tokio::test]
    async fn test_donation_capped_at_capacity() {
        let store = seeded();
        let receipt = store
            .record_donation("bob", 20.0, Some("solar surplus".into()), now())
            .await
            .unwrap();
        assert!(receipt.capped);
        assert_eq!(receipt.event.amount_kwh, 5.0);
        assert_eq!(receipt.monthly_total_kwh, 50.0);
        assert_eq!(receipt.remaining_capacity_kwh, 0.0);
        assert_eq!(receipt.event.context, "solar surplus");

        let err = store.record_donation("bob", 1.0, None, now()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_donation_validation() {
        let store = seeded();
        assert!(matches!(
            store.record_donation("alice", -1.0, None, now()).await,
            Err(GatewayError::BadRequest(_))
        ));
        assert!(matches!(
            store.record_donation("nobody", 1.0, None, now()).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_donation_updates_totals() {
        let store = seeded();
        let receipt = store.record_donation("alice", 10.0, None, now()).await.unwrap();
        assert!(!receipt.capped);
        assert_eq!(receipt.cumulative_total_kwh, 70.0);
        assert_eq!(receipt.remaining_capacity_kwh, 70.0);

        let usage = store.monthly_usage("alice", now()).await.unwrap();
        assert_eq!(usage.donated_kwh, 30.0);
        assert_eq!(usage.remaining_kwh, 70.0);
    }

    #[test]
    fn test_seed_rejects_unknown_donor() {
        let seed = SeedData {
            donors: vec![profile("alice", 10.0)],
            donations: vec![DonationEvent::new("ghost", now(), 1.0)],
        };
        assert!(DonationStore::from_seed(seed).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "donors": [{{"id": "d1", "displayName": "Dana", "monthlyCapacityKwh": 120}}],
                "donations": [{{"donor_id": "d1", "timestamp": "2024-06-01T08:00:00Z", "amount_kwh": 12.5}}]
            }}"#
        )
        .unwrap();

        let store = DonationStore::load(file.path()).await.unwrap();
        assert_eq!(store.donor_count().await, 1);
        let usage = store
            .monthly_usage("d1", Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(usage.donated_kwh, 12.5);
        assert_eq!(usage.remaining_kwh, 107.5);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("all-time".parse::<Scope>().unwrap(), Scope::AllTime);
        assert_eq!("Month".parse::<Scope>().unwrap(), Scope::Month);
        assert!("week".parse::<Scope>().is_err());
    }
}
