//! Trend analysis over recent per-period donation totals.

use tracing::debug;

use crate::config::TrendConfig;
use crate::history::TrendSeries;
use crate::types::TrendDirection;

/// Result of analyzing one donor's series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    /// Normalized slope, clamped to [-1, 1]
    pub trend: f64,
    /// Classification of `trend`
    pub direction: TrendDirection,
    /// Periods the regression used
    pub periods_used: usize,
    /// Set when there was no history at all
    pub low_confidence: bool,
    /// Mean per-period donation over the whole series
    pub own_average: f64,
}

/// Least-squares trend analyzer.
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// Analyze a series.
    ///
    /// The slope of the last `window` periods is divided by their mean so
    /// donors of different sizes are comparable. Fewer than two periods, or
    /// an all-zero window, yield a flat trend.
    pub fn analyze(&self, series: &TrendSeries) -> TrendReading {
        let window = series.recent(self.config.window);
        let trend = normalized_slope(window).clamp(-1.0, 1.0);
        let direction = self.classify(trend);

        let reading = TrendReading {
            trend,
            direction,
            periods_used: window.len(),
            low_confidence: series.is_empty(),
            own_average: series.mean(),
        };

        debug!(
            donor_id = %series.donor_id,
            trend = reading.trend,
            direction = %reading.direction,
            periods = reading.periods_used,
            "Analyzed trend"
        );

        reading
    }

    /// Map a normalized slope to a direction.
    pub fn classify(&self, trend: f64) -> TrendDirection {
        if trend > self.config.rising_threshold {
            TrendDirection::Rising
        } else if trend < self.config.declining_threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }
}

fn normalized_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;
    if mean_y <= 0.0 {
        return 0.0;
    }

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    (num / den) / mean_y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Period;

    fn series(totals: Vec<f64>) -> TrendSeries {
        TrendSeries::from_totals("donor", Period::Weekly, totals)
    }

    #[test]
    fn test_empty_series_is_low_confidence() {
        let reading = TrendAnalyzer::default().analyze(&series(vec![]));
        assert_eq!(reading.trend, 0.0);
        assert_eq!(reading.direction, TrendDirection::Stable);
        assert!(reading.low_confidence);
    }

    #[test]
    fn test_single_period_is_flat() {
        let reading = TrendAnalyzer::default().analyze(&series(vec![12.0]));
        assert_eq!(reading.trend, 0.0);
        assert!(!reading.low_confidence);
        assert_eq!(reading.own_average, 12.0);
    }

    #[test]
    fn test_rising_series() {
        let reading = TrendAnalyzer::default().analyze(&series(vec![2.0, 4.0, 6.0, 8.0]));
        // slope 2, mean 5
        assert!((reading.trend - 0.4).abs() < 1e-9);
        assert_eq!(reading.direction, TrendDirection::Rising);
    }

    #[test]
    fn test_declining_series() {
        let reading = TrendAnalyzer::default().analyze(&series(vec![8.0, 6.0, 4.0, 2.0]));
        assert_eq!(reading.direction, TrendDirection::Declining);
    }

    #[test]
    fn test_flat_series_is_stable() {
        let reading = TrendAnalyzer::default().analyze(&series(vec![5.0; 10]));
        assert_eq!(reading.trend, 0.0);
        assert_eq!(reading.direction, TrendDirection::Stable);
        assert_eq!(reading.periods_used, 6);
    }

    #[test]
    fn test_trend_is_clamped() {
        // slope 100 over mean 50 normalizes to 2
        let reading = TrendAnalyzer::default().analyze(&series(vec![0.0, 100.0]));
        assert_eq!(reading.trend, 1.0);
    }

    #[test]
    fn test_only_recent_window_counts() {
        // Old decline followed by a flat recent window
        let mut totals = vec![100.0, 80.0, 60.0, 40.0];
        totals.extend(vec![10.0; 6]);
        let reading = TrendAnalyzer::default().analyze(&series(totals));
        assert_eq!(reading.direction, TrendDirection::Stable);
    }
}
