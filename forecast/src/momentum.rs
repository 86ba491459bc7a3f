//! Opponent momentum estimation.
//!
//! Momentum measures how likely a donor is to donate again this period: the
//! share of recent periods with a donation, weighting recent periods more.

use tracing::debug;

use crate::config::MomentumConfig;
use crate::history::TrendSeries;

/// Momentum of one donor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentMomentum {
    /// Weighted share of active periods (0..1)
    pub donation_frequency: f64,
    /// `round(100 * donation_frequency)` (0..100)
    pub momentum: u8,
    /// Expected donation this period (kWh)
    pub projected_gain: f64,
    /// Periods in the window with a nonzero donation
    pub active_periods: usize,
}

impl OpponentMomentum {
    /// Momentum of a donor without history.
    pub fn none() -> Self {
        Self {
            donation_frequency: 0.0,
            momentum: 0,
            projected_gain: 0.0,
            active_periods: 0,
        }
    }
}

/// Exponentially weighted momentum estimator.
#[derive(Debug, Clone, Default)]
pub struct MomentumEstimator {
    config: MomentumConfig,
}

impl MomentumEstimator {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    /// Estimate momentum from a series. `None` is treated as empty history.
    pub fn estimate(&self, series: Option<&TrendSeries>) -> OpponentMomentum {
        let Some(series) = series else {
            return OpponentMomentum::none();
        };
        let window = series.recent(self.config.window);
        if window.is_empty() {
            return OpponentMomentum::none();
        }

        let last = window.len() - 1;
        let mut weight_total = 0.0;
        let mut weight_active = 0.0;
        let mut active_sum = 0.0;
        let mut active_periods = 0usize;
        for (i, value) in window.iter().enumerate() {
            let weight = self.config.decay.powi((last - i) as i32);
            weight_total += weight;
            if *value > 0.0 {
                weight_active += weight;
                active_sum += value;
                active_periods += 1;
            }
        }

        let donation_frequency = if weight_total > 0.0 {
            (weight_active / weight_total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let momentum = (donation_frequency * 100.0).round().clamp(0.0, 100.0) as u8;
        let projected_gain = if active_periods > 0 {
            active_sum / active_periods as f64 * f64::from(momentum) / 100.0
        } else {
            0.0
        };

        debug!(
            donor_id = %series.donor_id,
            momentum,
            projected_gain,
            active_periods,
            "Estimated momentum"
        );

        OpponentMomentum {
            donation_frequency,
            momentum,
            projected_gain,
            active_periods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Period;

    fn estimate(totals: Vec<f64>) -> OpponentMomentum {
        let series = TrendSeries::from_totals("chaser", Period::Weekly, totals);
        MomentumEstimator::default().estimate(Some(&series))
    }

    #[test]
    fn test_missing_series_has_no_momentum() {
        let m = MomentumEstimator::default().estimate(None);
        assert_eq!(m.momentum, 0);
        assert_eq!(m.projected_gain, 0.0);
    }

    #[test]
    fn test_empty_series_has_no_momentum() {
        assert_eq!(estimate(vec![]), OpponentMomentum::none());
    }

    #[test]
    fn test_always_active_is_full_momentum() {
        let m = estimate(vec![4.0; 8]);
        assert_eq!(m.momentum, 100);
        assert!((m.projected_gain - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_recent_activity_weighs_more() {
        let recent = estimate(vec![0.0, 0.0, 0.0, 5.0]);
        let old = estimate(vec![5.0, 0.0, 0.0, 0.0]);
        assert!(recent.momentum > old.momentum);
    }

    #[test]
    fn test_weighted_frequency() {
        // Active at ages 1 and 2: (0.7 + 0.49) / (1 + 0.7 + 0.49 + 0.343 + 0.2401 + 0.16807)
        let m = estimate(vec![0.0, 0.0, 0.0, 10.0, 10.0, 0.0]);
        assert_eq!(m.momentum, 40);
        assert!((m.projected_gain - 4.0).abs() < 1e-9);
        assert_eq!(m.active_periods, 2);
    }

    #[test]
    fn test_window_limits_history() {
        // Activity older than the window is ignored
        let mut totals = vec![50.0; 5];
        totals.extend(vec![0.0; 8]);
        assert_eq!(estimate(totals).momentum, 0);
    }
}
