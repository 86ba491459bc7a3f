//! Ranked leaderboard snapshots.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{DonorAccount, ForecastError, Result};

/// Donor accounts ordered by descending cumulative kWh.
///
/// Ranks are contiguous integers `1..=N`. Equal totals are broken by who
/// reached the total first, then by id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    accounts: Vec<DonorAccount>,
}

/// The subject and its rank-neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankNeighbors<'a> {
    /// The donor being forecast
    pub subject: &'a DonorAccount,
    /// Donor at rank - 1 (attack target), absent at rank 1
    pub above: Option<&'a DonorAccount>,
    /// Donor at rank + 1 (defense threat), absent at rank N
    pub below: Option<&'a DonorAccount>,
}

impl LeaderboardSnapshot {
    /// Rank unranked accounts. Any `rank` already present is overwritten.
    pub fn from_accounts(mut accounts: Vec<DonorAccount>) -> Result<Self> {
        check_totals(&accounts)?;
        check_unique_ids(&accounts)?;

        accounts.sort_by(compare_standing);
        for (idx, account) in accounts.iter_mut().enumerate() {
            account.rank = idx + 1;
        }

        debug!(donors = accounts.len(), "Ranked leaderboard snapshot");
        Ok(Self { accounts })
    }

    /// Accept pre-ranked accounts after validating them.
    pub fn new(mut accounts: Vec<DonorAccount>) -> Result<Self> {
        accounts.sort_by_key(|a| a.rank);
        let snapshot = Self { accounts };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the snapshot invariants.
    pub fn validate(&self) -> Result<()> {
        check_totals(&self.accounts)?;
        check_unique_ids(&self.accounts)?;

        for (idx, account) in self.accounts.iter().enumerate() {
            if account.rank != idx + 1 {
                return Err(ForecastError::InvalidData(format!(
                    "ranks are not contiguous: donor {} has rank {}, expected {}",
                    account.id,
                    account.rank,
                    idx + 1
                )));
            }
        }

        for pair in self.accounts.windows(2) {
            if pair[0].total_kwh < pair[1].total_kwh {
                return Err(ForecastError::InvalidData(format!(
                    "totals are not descending: rank {} has {} kWh, rank {} has {} kWh",
                    pair[0].rank, pair[0].total_kwh, pair[1].rank, pair[1].total_kwh
                )));
            }
        }
        Ok(())
    }

    /// Accounts in rank order.
    pub fn accounts(&self) -> &[DonorAccount] {
        &self.accounts
    }

    /// Number of ranked donors.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Find a donor by id.
    pub fn find(&self, donor_id: &str) -> Option<&DonorAccount> {
        self.accounts.iter().find(|a| a.id == donor_id)
    }

    /// Account at a 1-based rank.
    pub fn at_rank(&self, rank: usize) -> Option<&DonorAccount> {
        rank.checked_sub(1).and_then(|idx| self.accounts.get(idx))
    }

    /// The subject plus the donors directly above and below it.
    pub fn neighbors(&self, donor_id: &str) -> Result<RankNeighbors<'_>> {
        let subject = self
            .find(donor_id)
            .ok_or_else(|| ForecastError::NotFound(donor_id.to_string()))?;
        Ok(RankNeighbors {
            subject,
            above: self.at_rank(subject.rank.saturating_sub(1)),
            below: self.at_rank(subject.rank + 1),
        })
    }
}

/// Leaderboard order: total descending, earliest `reached_at`, then id.
fn compare_standing(a: &DonorAccount, b: &DonorAccount) -> Ordering {
    b.total_kwh
        .total_cmp(&a.total_kwh)
        .then_with(|| match (a.reached_at, b.reached_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn check_totals(accounts: &[DonorAccount]) -> Result<()> {
    if let Some(bad) = accounts
        .iter()
        .find(|a| !a.total_kwh.is_finite() || a.total_kwh < 0.0)
    {
        return Err(ForecastError::InvalidData(format!(
            "donor {} has invalid total {}",
            bad.id, bad.total_kwh
        )));
    }
    Ok(())
}

fn check_unique_ids(accounts: &[DonorAccount]) -> Result<()> {
    let mut seen = HashSet::with_capacity(accounts.len());
    for account in accounts {
        if !seen.insert(account.id.as_str()) {
            return Err(ForecastError::InvalidData(format!(
                "duplicate donor id {}",
                account.id
            )));
        }
    }
    Ok(())
}
