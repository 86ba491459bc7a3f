//! Forecaster - assembles trend, gap, momentum, probability and tips into
//! one attack/defense prediction per donor.

use tracing::debug;

use crate::config::{ForecastConfig, SummaryConfig};
use crate::gap::GapCalculator;
use crate::history::{HistorySource, TrendSeries};
use crate::leaderboard::LeaderboardSnapshot;
use crate::momentum::{MomentumEstimator, OpponentMomentum};
use crate::probability::ProbabilityEstimator;
use crate::tips::TipGenerator;
use crate::trend::{TrendAnalyzer, TrendReading};
use crate::types::{
    CatchUpBlock, DefenseBlock, DonorAccount, Position, PredictionResult, Result, TrendDirection,
};

/// The rank-prediction engine.
///
/// Immutable after construction and free of I/O, so one instance can be
/// shared across threads and called concurrently.
#[derive(Debug, Clone)]
pub struct Forecaster {
    /// Configuration
    config: ForecastConfig,
    trend: TrendAnalyzer,
    gap: GapCalculator,
    momentum: MomentumEstimator,
    probability: ProbabilityEstimator,
    tips: TipGenerator,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::build(ForecastConfig::default())
    }
}

impl Forecaster {
    /// Create a forecaster with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration.
    pub fn with_config(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ForecastConfig) -> Self {
        Self {
            trend: TrendAnalyzer::new(config.trend.clone()),
            gap: GapCalculator::new(config.gap.clone()),
            momentum: MomentumEstimator::new(config.momentum.clone()),
            probability: ProbabilityEstimator::new(
                config.probability.clone(),
                config.gap.epsilon_kwh,
            ),
            tips: TipGenerator::new(config.tips.clone()),
            config,
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast attack and defense for `donor_id`.
    ///
    /// Fails with `NotFound` when the donor is not ranked and with
    /// `InvalidData` when the snapshot or a consulted series is malformed.
    /// Missing series count as empty history.
    pub fn predict<H>(
        &self,
        donor_id: &str,
        snapshot: &LeaderboardSnapshot,
        history: &H,
    ) -> Result<PredictionResult>
    where
        H: HistorySource + ?Sized,
    {
        snapshot.validate()?;
        let neighbors = snapshot.neighbors(donor_id)?;
        let subject = neighbors.subject;

        let own_series = history.series(&subject.id);
        let above_series = neighbors.above.and_then(|a| history.series(&a.id));
        let below_series = neighbors.below.and_then(|b| history.series(&b.id));
        for series in [own_series, above_series, below_series].into_iter().flatten() {
            series.validate()?;
        }

        let empty = TrendSeries::empty(subject.id.clone(), Default::default());
        let reading = self.trend.analyze(own_series.unwrap_or(&empty));
        let own_momentum = self.momentum.estimate(own_series);

        let position = Position {
            is_top_ranked: subject.rank == 1,
            is_bottom_ranked: subject.rank == snapshot.len(),
            has_competitor: neighbors.above.is_some(),
            has_chaser: neighbors.below.is_some(),
        };

        let catch_up = neighbors.above.map(|above| {
            let competitor = self.momentum.estimate(above_series);
            self.catch_up(subject, above, &reading, &competitor)
        });

        let defense = neighbors.below.map(|below| {
            let chaser = self.momentum.estimate(below_series);
            self.defense(subject, below, &reading, &chaser, &own_momentum, position.is_top_ranked)
        });

        debug!(
            donor_id = %donor_id,
            rank = subject.rank,
            donors = snapshot.len(),
            trend = reading.trend,
            has_catch_up = catch_up.is_some(),
            has_defense = defense.is_some(),
            "Prediction complete"
        );

        Ok(PredictionResult {
            catch_up,
            defense,
            position,
        })
    }

    fn catch_up(
        &self,
        subject: &DonorAccount,
        above: &DonorAccount,
        reading: &TrendReading,
        competitor: &OpponentMomentum,
    ) -> CatchUpBlock {
        let gap = self
            .gap
            .attack(subject.total_kwh, above.total_kwh, competitor.projected_gain);
        let overtake_probability = self.probability.overtake_probability(
            reading.trend,
            gap.current_gap,
            reading.own_average,
            competitor.momentum,
        );
        let summary = catch_up_summary(
            &self.config.summary,
            &above.display_name,
            gap.current_gap,
            gap.min_required,
            reading,
        );

        CatchUpBlock {
            current_gap: gap.current_gap,
            min_required: gap.min_required,
            max_needed: gap.max_needed,
            overtake_probability,
            competitor_momentum: competitor.momentum,
            user_trend: reading.trend,
            summary,
            tips: self.tips.attack(subject.monthly_capacity_kwh, gap.min_required),
        }
    }

    fn defense(
        &self,
        subject: &DonorAccount,
        below: &DonorAccount,
        reading: &TrendReading,
        chaser: &OpponentMomentum,
        own: &OpponentMomentum,
        is_top_ranked: bool,
    ) -> DefenseBlock {
        let gap = self
            .gap
            .defense(subject.total_kwh, below.total_kwh, chaser.projected_gain);
        let overtake_risk = self.probability.overtake_risk(
            reading.trend,
            gap.current_buffer,
            reading.own_average,
            chaser.momentum,
        );
        let summary = if is_top_ranked {
            record_summary(&below.display_name, gap.buffer_recommended, reading)
        } else {
            defense_summary(
                &self.config.summary,
                &below.display_name,
                gap.current_buffer,
                gap.buffer_recommended,
                reading,
            )
        };

        DefenseBlock {
            current_buffer: gap.current_buffer,
            buffer_recommended: gap.buffer_recommended,
            min_required: gap.min_required,
            max_needed: gap.max_needed,
            overtake_risk,
            chaser_momentum: chaser.momentum,
            sustainability_score: own.momentum,
            user_trend: reading.trend,
            summary,
            tips: self
                .tips
                .defense(subject.monthly_capacity_kwh, gap.buffer_recommended),
        }
    }
}

fn catch_up_summary(
    config: &SummaryConfig,
    target: &str,
    gap: f64,
    min_required: f64,
    reading: &TrendReading,
) -> String {
    let opening = if gap < config.close_gap_kwh {
        "So close! You're just slightly behind."
    } else if gap < config.reachable_gap_kwh {
        "Within reach! The gap is manageable if you stay consistent."
    } else {
        "A challenge ahead. Steady savings will improve your position."
    };
    let mut summary = format!(
        "{} Donate {:.2} kWh to overtake {}. {}",
        opening,
        min_required,
        target,
        trend_sentence(reading.direction)
    );
    append_confidence(&mut summary, reading);
    summary
}

fn defense_summary(
    config: &SummaryConfig,
    chaser: &str,
    buffer: f64,
    buffer_recommended: f64,
    reading: &TrendReading,
) -> String {
    let opening = if buffer < config.narrow_buffer_kwh {
        "Alert! Your lead is narrow."
    } else if buffer < config.moderate_buffer_kwh {
        "Moderate lead. Consistent habits keep you safe."
    } else {
        "Strong position. Your lead is comfortable."
    };
    let mut summary = format!(
        "{} Add {:.2} kWh to stay ahead of {}. {}",
        opening,
        buffer_recommended,
        chaser,
        trend_sentence(reading.direction)
    );
    append_confidence(&mut summary, reading);
    summary
}

fn record_summary(chaser: &str, buffer_recommended: f64, reading: &TrendReading) -> String {
    let opening = match reading.direction {
        TrendDirection::Rising => "You're #1 and still accelerating. Keep extending your own record.",
        TrendDirection::Stable => "You're #1. Hold your pace to extend your own record.",
        TrendDirection::Declining => {
            "You're #1, but your donations are slowing. A push this period extends your own record."
        }
    };
    let mut summary = format!(
        "{} Add {:.2} kWh to keep {} behind you.",
        opening, buffer_recommended, chaser
    );
    append_confidence(&mut summary, reading);
    summary
}

fn trend_sentence(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Rising => "Your donations are rising.",
        TrendDirection::Stable => "Your donations are stable.",
        TrendDirection::Declining => "Your donations are declining.",
    }
}

fn append_confidence(summary: &mut String, reading: &TrendReading) {
    if reading.low_confidence {
        summary.push_str(" Not enough donation history yet, so this forecast is low-confidence.");
    }
}
