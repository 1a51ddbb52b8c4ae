//! Eligibility filters applied to scored candidates.
//!
//! A `FilterSet` is a conjunction: a record survives only if every filter
//! passes. Numeric thresholds are inclusive lower bounds; ranges are
//! inclusive on both ends. A numeric filter whose metric is absent from the
//! snapshot does not disqualify the record — mandatory-data gating happens
//! in scoring, not here.

use crate::domain::score::ScoreRecord;
use crate::domain::snapshot::{IndicatorSnapshot, Metric};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Composite score at or above the threshold.
    MinScore(f64),
    MinVolumeRatio(f64),
    MinTurnoverRate(f64),
    /// 5-day price change (percent) at or above the threshold.
    MinPriceChange5d(f64),
    /// RSI within [min, max].
    RsiRange { min: f64, max: f64 },
    /// Last close within [min, max].
    PriceRange { min: f64, max: f64 },
    /// Volatility sub-score at or below the threshold.
    MaxVolatilityScore(f64),
    /// KDJ in an oversold state (plain or rebounding).
    KdjOversold,
    /// Close at or above the 20-day moving average.
    PriceAboveMa20,
    /// Bullish moving-average ladder.
    MaAlignment,
}

impl Filter {
    pub fn passes(&self, record: &ScoreRecord, snapshot: &IndicatorSnapshot) -> bool {
        match self {
            Filter::MinScore(min) => record.composite >= *min,
            Filter::MinVolumeRatio(min) => {
                metric_at_least(snapshot, Metric::VolumeRatio, *min)
            }
            Filter::MinTurnoverRate(min) => {
                metric_at_least(snapshot, Metric::TurnoverRate, *min)
            }
            Filter::MinPriceChange5d(min) => {
                metric_at_least(snapshot, Metric::PriceChange5d, *min)
            }
            Filter::RsiRange { min, max } => match snapshot.metric(Metric::Rsi) {
                Some(rsi) => rsi >= *min && rsi <= *max,
                None => true,
            },
            Filter::PriceRange { min, max } => match snapshot.metric(Metric::LastClose) {
                Some(close) => close >= *min && close <= *max,
                None => true,
            },
            Filter::MaxVolatilityScore(max) => record.volatility <= *max,
            Filter::KdjOversold => snapshot.signals.kdj.is_oversold(),
            Filter::PriceAboveMa20 => metric_at_least(snapshot, Metric::PriceToMa20, 1.0),
            Filter::MaAlignment => snapshot.signals.ma_trend.is_bullish(),
        }
    }
}

fn metric_at_least(snapshot: &IndicatorSnapshot, metric: Metric, min: f64) -> bool {
    match snapshot.metric(metric) {
        Some(value) => value >= min,
        None => true,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn passes(&self, record: &ScoreRecord, snapshot: &IndicatorSnapshot) -> bool {
        self.filters.iter().all(|f| f.passes(record, snapshot))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
