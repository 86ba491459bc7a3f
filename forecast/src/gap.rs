//! kWh gaps between a donor and its rank-neighbors.
//!
//! Figures are kept at full precision. Summaries format them to two decimals.

use crate::config::GapConfig;

/// Distance to the donor ranked above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackGap {
    pub current_gap: f64,
    pub min_required: f64,
    pub max_needed: f64,
}

/// Lead over the donor ranked below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseGap {
    pub current_buffer: f64,
    pub buffer_recommended: f64,
    pub min_required: f64,
    pub max_needed: f64,
}

/// Computes attack gaps and defense buffers.
#[derive(Debug, Clone, Default)]
pub struct GapCalculator {
    config: GapConfig,
}

impl GapCalculator {
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }

    /// Gap to the donor above.
    ///
    /// `min_required` is the smallest donation giving a strict overtake if
    /// the target stands still. `max_needed` adds what the target is
    /// expected to donate meanwhile.
    pub fn attack(&self, subject_kwh: f64, above_kwh: f64, competitor_gain: f64) -> AttackGap {
        let current_gap = (above_kwh - subject_kwh).max(0.0);
        let min_required = current_gap + self.config.epsilon_kwh;
        AttackGap {
            current_gap,
            min_required,
            max_needed: min_required + competitor_gain.max(0.0),
        }
    }

    /// Buffer over the donor below.
    pub fn defense(&self, subject_kwh: f64, below_kwh: f64, chaser_gain: f64) -> DefenseGap {
        let current_buffer = (subject_kwh - below_kwh).max(0.0);
        let buffer_recommended = chaser_gain.max(self.config.epsilon_kwh);
        DefenseGap {
            current_buffer,
            buffer_recommended,
            min_required: buffer_recommended,
            max_needed: buffer_recommended * self.config.defense_safety_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_gap() {
        let gap = GapCalculator::default().attack(120.0, 150.0, 0.0);
        assert_eq!(gap.current_gap, 30.0);
        assert_eq!(gap.min_required, 30.01);
        assert_eq!(gap.max_needed, 30.01);
    }

    #[test]
    fn test_attack_adds_competitor_gain() {
        let gap = GapCalculator::default().attack(100.0, 110.0, 4.5);
        assert_eq!(gap.min_required, 10.01);
        assert_eq!(gap.max_needed, gap.min_required + 4.5);
    }

    #[test]
    fn test_sub_cent_gap_still_overtakes() {
        let calc = GapCalculator::new(GapConfig {
            epsilon_kwh: 0.001,
            ..GapConfig::default()
        });
        let gap = calc.attack(100.0, 100.0123, 0.0);
        assert_eq!(gap.current_gap, 100.0123 - 100.0);
        assert!(100.0 + gap.min_required > 100.0123);
        assert!(gap.min_required > gap.current_gap);
    }

    #[test]
    fn test_tied_totals_need_epsilon() {
        let gap = GapCalculator::default().attack(50.0, 50.0, 0.0);
        assert_eq!(gap.current_gap, 0.0);
        assert_eq!(gap.min_required, 0.01);
    }

    #[test]
    fn test_defense_buffer() {
        let gap = GapCalculator::default().defense(150.0, 120.0, 4.0);
        assert_eq!(gap.current_buffer, 30.0);
        assert_eq!(gap.buffer_recommended, 4.0);
        assert_eq!(gap.min_required, 4.0);
        assert_eq!(gap.max_needed, 6.0);
    }

    #[test]
    fn test_defense_floor_is_epsilon() {
        let gap = GapCalculator::default().defense(150.0, 120.0, 0.0);
        assert_eq!(gap.buffer_recommended, 0.01);
        assert_eq!(gap.max_needed, 0.01 * 1.5);
        assert!(gap.max_needed >= gap.min_required);
    }

    #[test]
    fn test_defense_keeps_fractional_buffer() {
        let gap = GapCalculator::default().defense(150.0, 120.0, 1.332);
        assert_eq!(gap.buffer_recommended, 1.332);
        assert_eq!(gap.max_needed, 1.332 * 1.5);
    }
}
