//! Bounded overtake probability and overtake risk.

use crate::config::ProbabilityConfig;

/// Linear scoring model for attack and defense odds.
#[derive(Debug, Clone, Default)]
pub struct ProbabilityEstimator {
    config: ProbabilityConfig,
    epsilon: f64,
}

impl ProbabilityEstimator {
    /// `epsilon` floors the donor's own average so a donor without history
    /// takes the full gap penalty instead of dividing by zero.
    pub fn new(config: ProbabilityConfig, epsilon: f64) -> Self {
        Self { config, epsilon }
    }

    /// Chance (0-100) of overtaking the donor above this period.
    pub fn overtake_probability(
        &self,
        trend: f64,
        current_gap: f64,
        own_average: f64,
        competitor_momentum: u8,
    ) -> u8 {
        let c = &self.config;
        let score = c.base + trend * 100.0 * c.trend_weight
            - current_gap / self.floor(own_average) * c.gap_weight
            - f64::from(competitor_momentum) * c.competitor_momentum_weight;
        to_percent(score)
    }

    /// Chance (0-100) of being overtaken by the donor below this period.
    pub fn overtake_risk(
        &self,
        trend: f64,
        current_buffer: f64,
        own_average: f64,
        chaser_momentum: u8,
    ) -> u8 {
        let c = &self.config;
        let score = c.base + f64::from(chaser_momentum) * c.chaser_momentum_weight
            - current_buffer / self.floor(own_average) * c.gap_weight
            + (-trend).max(0.0) * 100.0 * c.declining_trend_weight;
        to_percent(score)
    }

    fn floor(&self, own_average: f64) -> f64 {
        own_average.max(self.epsilon).max(f64::MIN_POSITIVE)
    }
}

fn to_percent(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ProbabilityEstimator {
        ProbabilityEstimator::new(ProbabilityConfig::default(), 0.01)
    }

    #[test]
    fn test_neutral_inputs_score_base() {
        assert_eq!(estimator().overtake_probability(0.0, 0.0, 10.0, 0), 50);
        assert_eq!(estimator().overtake_risk(0.0, 0.0, 10.0, 0), 50);
    }

    #[test]
    fn test_probability_formula() {
        // 50 + 0.2*100*0.3 - 5/10*20 - 40*0.3 = 50 + 6 - 10 - 12
        assert_eq!(estimator().overtake_probability(0.2, 5.0, 10.0, 40), 34);
    }

    #[test]
    fn test_risk_formula() {
        // 50 + 40*0.4 - 5/10*20 + 0.5*100*0.2 = 50 + 16 - 10 + 10
        assert_eq!(estimator().overtake_risk(-0.5, 5.0, 10.0, 40), 66);
    }

    #[test]
    fn test_rising_trend_does_not_lower_risk() {
        assert_eq!(
            estimator().overtake_risk(0.8, 0.0, 10.0, 0),
            estimator().overtake_risk(0.0, 0.0, 10.0, 0)
        );
    }

    #[test]
    fn test_no_history_takes_full_gap_penalty() {
        assert_eq!(estimator().overtake_probability(0.0, 30.0, 0.0, 0), 0);
        assert_eq!(estimator().overtake_risk(0.0, 30.0, 0.0, 100), 0);
    }

    #[test]
    fn test_scores_are_clamped() {
        assert_eq!(estimator().overtake_probability(1.0, 0.0, 10.0, 0), 80);
        assert_eq!(estimator().overtake_risk(-1.0, 0.0, 10.0, 100), 100);
    }
}
