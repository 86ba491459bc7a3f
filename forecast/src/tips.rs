//! Conservation tips ranked by kWh impact.

use std::cmp::Ordering;

use crate::config::TipConfig;
use crate::types::{Tip, TipPriority};

/// A catalog action with its monthly saving for the reference household.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub action: &'static str,
    pub reference_kwh: f64,
}

/// Actions that free up extra energy to climb a rank.
pub const ATTACK_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        action: "Set air conditioner to 24°C instead of 20°C, use timer for 6 hours at night",
        reference_kwh: 15.0,
    },
    CatalogEntry {
        action: "Replace 5 regular bulbs with LED bulbs (saves ~75W each)",
        reference_kwh: 10.0,
    },
    CatalogEntry {
        action: "Air-dry laundry instead of using the tumble dryer",
        reference_kwh: 9.0,
    },
    CatalogEntry {
        action: "Unplug phone chargers, TV, and router when not in use (vampire power)",
        reference_kwh: 8.0,
    },
    CatalogEntry {
        action: "Switch the water heater off right after showers",
        reference_kwh: 6.0,
    },
];

/// Habits that keep a steady surplus to hold a rank.
pub const DEFENSE_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        action: "Continue optimal air conditioning habits: 24°C, clean filters monthly",
        reference_kwh: 18.0,
    },
    CatalogEntry {
        action: "Maintain your LED bulb usage and keep them on schedule (6-8 hours/day max)",
        reference_kwh: 12.0,
    },
    CatalogEntry {
        action: "Run washing machine and dishwasher only with full loads (2-3 times/week)",
        reference_kwh: 10.0,
    },
    CatalogEntry {
        action: "Keep the fridge at 3-4°C and check the door seals",
        reference_kwh: 6.0,
    },
];

/// Scales catalog actions to a donor and ranks them.
#[derive(Debug, Clone, Default)]
pub struct TipGenerator {
    config: TipConfig,
}

impl TipGenerator {
    pub fn new(config: TipConfig) -> Self {
        Self { config }
    }

    /// Tips for overtaking, prioritized against `min_required`.
    pub fn attack(&self, monthly_capacity_kwh: f64, min_required: f64) -> Vec<Tip> {
        self.rank(ATTACK_CATALOG, monthly_capacity_kwh, min_required)
    }

    /// Tips for holding a rank, prioritized against `buffer_recommended`.
    pub fn defense(&self, monthly_capacity_kwh: f64, buffer_recommended: f64) -> Vec<Tip> {
        self.rank(DEFENSE_CATALOG, monthly_capacity_kwh, buffer_recommended)
    }

    /// Capacity scale factor relative to the reference household.
    pub fn scale(&self, monthly_capacity_kwh: f64) -> f64 {
        if !monthly_capacity_kwh.is_finite() {
            return 0.0;
        }
        (monthly_capacity_kwh / self.config.reference_capacity_kwh).clamp(0.0, self.config.max_scale)
    }

    fn rank(&self, catalog: &[CatalogEntry], monthly_capacity_kwh: f64, target: f64) -> Vec<Tip> {
        let scale = self.scale(monthly_capacity_kwh);
        let threshold = self.config.high_priority_share * target;

        let mut tips: Vec<Tip> = catalog
            .iter()
            .map(|entry| (entry.action, round_kwh(entry.reference_kwh * scale)))
            .filter(|(_, kwh)| *kwh > 0.0)
            .map(|(action, kwh)| Tip {
                action: action.to_string(),
                estimated_kwh: kwh,
                priority: if kwh >= threshold {
                    TipPriority::High
                } else {
                    TipPriority::Low
                },
            })
            .collect();

        tips.sort_by(|a, b| {
            b.estimated_kwh
                .partial_cmp(&a.estimated_kwh)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.action.cmp(&b.action))
        });

        if let Some(max) = self.config.max_tips {
            tips.truncate(max);
        }
        tips
    }
}

/// Tip estimates are shown to two decimals.
fn round_kwh(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_household_gets_catalog_values() {
        let tips = TipGenerator::default().attack(300.0, 100.0);
        assert_eq!(tips.len(), ATTACK_CATALOG.len());
        assert_eq!(tips[0].estimated_kwh, 15.0);
        assert!(tips.windows(2).all(|w| w[0].estimated_kwh >= w[1].estimated_kwh));
    }

    #[test]
    fn test_impact_scales_with_capacity() {
        let tips = TipGenerator::default().defense(150.0, 100.0);
        assert_eq!(tips[0].estimated_kwh, 9.0);
    }

    #[test]
    fn test_estimates_round_to_cents() {
        let tips = TipGenerator::default().attack(100.0, 50.0);
        assert!(tips.iter().any(|t| t.estimated_kwh == 3.33));
        assert_eq!(tips[0].estimated_kwh, 5.0);
    }

    #[test]
    fn test_scale_is_clamped() {
        let gen = TipGenerator::default();
        assert_eq!(gen.scale(3000.0), 2.0);
        assert_eq!(gen.scale(-10.0), 0.0);
    }

    #[test]
    fn test_zero_capacity_drops_all_tips() {
        assert!(TipGenerator::default().attack(0.0, 10.0).is_empty());
    }

    #[test]
    fn test_priority_against_target() {
        // Target 20: tips of at least 10 kWh are high
        let tips = TipGenerator::default().attack(300.0, 20.0);
        for tip in &tips {
            let expected = if tip.estimated_kwh >= 10.0 {
                TipPriority::High
            } else {
                TipPriority::Low
            };
            assert_eq!(tip.priority, expected, "{}", tip.action);
        }
    }

    #[test]
    fn test_max_tips_cap() {
        let gen = TipGenerator::new(TipConfig {
            max_tips: Some(2),
            ..TipConfig::default()
        });
        assert_eq!(gen.defense(300.0, 5.0).len(), 2);
    }
}
