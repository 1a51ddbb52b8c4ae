//! Composite scoring engine.
//!
//! Five sub-scores (technical, momentum, volume, volatility, sentiment) on a
//! 0–100 scale, combined through a [`WeightProfile`] into a 0–100 composite.
//! Every formula is a pure function of the snapshot, so identical inputs
//! always reproduce identical records. Missing non-mandatory inputs degrade
//! a bracket to its neutral midpoint; only the mandatory metric classes
//! (trend, oscillator, volume) make scoring fail for a symbol.

use crate::domain::error::ScoreError;
use crate::domain::snapshot::{IndicatorSnapshot, Metric, MetricClass};
use crate::domain::weights::WeightProfile;
use chrono::NaiveDate;

/// Maximum points the weighted sentiment term may move the composite away
/// from its neutral contribution.
pub const SENTIMENT_CAP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub symbol: String,
    pub date: NaiveDate,
    pub composite: f64,
    pub technical: f64,
    pub momentum: f64,
    pub volume: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub weights: WeightProfile,
}

/// Score one symbol's snapshot under the given weights.
pub fn score(
    snapshot: &IndicatorSnapshot,
    weights: &WeightProfile,
) -> Result<ScoreRecord, ScoreError> {
    for (class, name) in [
        (MetricClass::Trend, "trend"),
        (MetricClass::Oscillator, "oscillator"),
        (MetricClass::Volume, "volume"),
    ] {
        if !snapshot.has_class(class) {
            return Err(ScoreError::InsufficientData {
                symbol: snapshot.symbol.clone(),
                missing: name.into(),
            });
        }
    }

    let technical = technical_subscore(snapshot);
    let momentum = momentum_subscore(snapshot);
    let volume = volume_subscore(snapshot);
    let volatility = volatility_subscore(snapshot);
    let sentiment = sentiment_subscore(snapshot);

    let neutral_sentiment = weights.sentiment * 50.0;
    let sentiment_delta =
        (weights.sentiment * (sentiment - 50.0)).clamp(-SENTIMENT_CAP, SENTIMENT_CAP);

    let composite = (technical * weights.technical
        + momentum * weights.momentum
        + volume * weights.volume
        + volatility * weights.volatility
        + neutral_sentiment
        + sentiment_delta)
        .clamp(0.0, 100.0);

    Ok(ScoreRecord {
        symbol: snapshot.symbol.clone(),
        date: snapshot.date,
        composite,
        technical,
        momentum,
        volume,
        volatility,
        sentiment,
        weights: *weights,
    })
}

/// Neutral baseline of 50 plus the exhaustive signal point tables, clamped.
pub fn technical_subscore(snapshot: &IndicatorSnapshot) -> f64 {
    let signals = &snapshot.signals;
    let points = signals.macd.points()
        + signals.rsi.points()
        + signals.kdj.points()
        + signals.band.points()
        + signals.ma_trend.points();
    (50.0 + points).clamp(0.0, 100.0)
}

/// Graded brackets over 5-day change, trend slope, 20-day range position and
/// breakout headroom (30/25/25/20 split). Monotonic in price momentum and
/// saturating at the bracket bounds.
pub fn momentum_subscore(snapshot: &IndicatorSnapshot) -> f64 {
    let change = match snapshot.metric(Metric::PriceChange5d) {
        Some(pct) if pct > 10.0 => 30.0,
        Some(pct) if pct > 5.0 => 25.0,
        Some(pct) if pct > 2.0 => 20.0,
        Some(pct) if pct > 0.0 => 15.0,
        Some(pct) if pct > -2.0 => 10.0,
        Some(pct) if pct > -5.0 => 5.0,
        Some(_) => 0.0,
        None => 10.0,
    };

    let trend = match snapshot.metric(Metric::TrendSlope) {
        Some(slope) if slope > 0.5 => 25.0,
        Some(slope) if slope > 0.2 => 20.0,
        Some(slope) if slope > 0.0 => 15.0,
        Some(slope) if slope > -0.2 => 10.0,
        Some(slope) if slope > -0.5 => 5.0,
        Some(_) => 0.0,
        None => 10.0,
    };

    let relative = match snapshot.metric(Metric::RelativeStrength) {
        Some(position) => position.clamp(0.0, 1.0) * 25.0,
        None => 12.5,
    };

    let breakout = match snapshot.metric(Metric::BreakoutHeadroom) {
        Some(ratio) if ratio >= 1.0 => 20.0,
        Some(ratio) if ratio >= 0.98 => 15.0,
        Some(ratio) if ratio >= 0.95 => 10.0,
        Some(_) => 5.0,
        None => 10.0,
    };

    (change + trend + relative + breakout).clamp(0.0, 100.0)
}

/// Volume-ratio, price–volume sync, volume-trend and turnover brackets
/// (30/25/25/20 split). Ratios saturate above 3.0× so pure volume spikes
/// stop earning points.
pub fn volume_subscore(snapshot: &IndicatorSnapshot) -> f64 {
    let ratio: f64 = match snapshot.metric(Metric::VolumeRatio) {
        Some(r) if r > 3.0 => 30.0,
        Some(r) if r > 2.0 => 25.0,
        Some(r) if r > 1.5 => 20.0,
        Some(r) if r > 1.0 => 15.0,
        Some(r) if r > 0.7 => 10.0,
        Some(_) => 5.0,
        None => 10.0,
    };

    let sync = match snapshot.metric(Metric::PriceVolumeCorr) {
        Some(c) if c > 0.5 => 25.0,
        Some(c) if c > 0.2 => 20.0,
        Some(c) if c > -0.2 => 15.0,
        Some(c) if c > -0.5 => 10.0,
        Some(_) => 5.0,
        None => 12.0,
    };

    let trend = match snapshot.metric(Metric::VolumeTrend) {
        Some(pct) if pct > 50.0 => 25.0,
        Some(pct) if pct > 20.0 => 20.0,
        Some(pct) if pct > 0.0 => 15.0,
        Some(pct) if pct > -20.0 => 10.0,
        Some(_) => 5.0,
        None => 12.0,
    };

    let turnover = match snapshot.metric(Metric::TurnoverRate) {
        Some(t) if t > 10.0 => 20.0,
        Some(t) if t > 5.0 => 18.0,
        Some(t) if t > 3.0 => 15.0,
        Some(t) if t > 1.0 => 12.0,
        Some(_) => 8.0,
        None => 10.0,
    };

    (ratio + sync + trend + turnover).clamp(0.0, 100.0)
}

/// Short-horizon risk preference: moderate volatility scores best, extremes
/// are penalized (40/30/30 split over annualized volatility, ATR-to-price
/// and volatility trend).
pub fn volatility_subscore(snapshot: &IndicatorSnapshot) -> f64 {
    let historical: f64 = match snapshot.metric(Metric::AnnualVolatility) {
        Some(v) if (15.0..=35.0).contains(&v) => 40.0,
        Some(v) if (10.0..15.0).contains(&v) => 35.0,
        Some(v) if v > 35.0 && v <= 50.0 => 35.0,
        Some(v) if (5.0..10.0).contains(&v) => 25.0,
        Some(v) if v > 50.0 && v <= 70.0 => 25.0,
        Some(v) if v < 5.0 => 15.0,
        Some(_) => 10.0,
        None => 20.0,
    };

    let atr = match snapshot.metric(Metric::AtrPercent) {
        Some(a) if (2.0..=5.0).contains(&a) => 30.0,
        Some(a) if (1.0..2.0).contains(&a) => 25.0,
        Some(a) if a > 5.0 && a <= 8.0 => 25.0,
        Some(a) if (0.5..1.0).contains(&a) => 20.0,
        Some(a) if a > 8.0 && a <= 12.0 => 20.0,
        Some(_) => 10.0,
        None => 15.0,
    };

    let trend = match snapshot.metric(Metric::VolatilityTrend) {
        Some(pct) if (-20.0..=20.0).contains(&pct) => 30.0,
        Some(pct) if (-40.0..-20.0).contains(&pct) => 25.0,
        Some(pct) if pct > 20.0 && pct <= 40.0 => 25.0,
        Some(pct) if pct < -40.0 => 20.0,
        Some(_) => 15.0,
        None => 15.0,
    };

    (historical + atr + trend).clamp(0.0, 100.0)
}

/// Market breadth mapped linearly around 50; balanced breadth is neutral.
pub fn sentiment_subscore(snapshot: &IndicatorSnapshot) -> f64 {
    match snapshot.metric(Metric::MarketBreadth) {
        Some(breadth) => (50.0 + (breadth - 0.5) * 100.0).clamp(0.0, 100.0),
        None => 50.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{BandState, KdjState, MacdState, MaTrend, RsiState};
    use approx::assert_relative_eq;

    fn scorable_snapshot() -> IndicatorSnapshot {
        let mut snap =
            IndicatorSnapshot::new("600519", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        snap.set_metric(Metric::LastClose, 42.0);
        snap.set_metric(Metric::PriceChange5d, 3.0);
        snap.set_metric(Metric::TrendSlope, 0.3);
        snap.set_metric(Metric::RelativeStrength, 0.8);
        snap.set_metric(Metric::BreakoutHeadroom, 0.99);
        snap.set_metric(Metric::Rsi, 55.0);
        snap.set_metric(Metric::VolumeRatio, 1.8);
        snap.set_metric(Metric::TurnoverRate, 4.0);
        snap.set_metric(Metric::VolumeTrend, 25.0);
        snap.set_metric(Metric::PriceVolumeCorr, 0.4);
        snap.set_metric(Metric::AnnualVolatility, 28.0);
        snap.set_metric(Metric::AtrPercent, 3.0);
        snap.set_metric(Metric::VolatilityTrend, 5.0);
        snap
    }

    #[test]
    fn scoring_is_deterministic() {
        let snap = scorable_snapshot();
        let weights = WeightProfile::default();
        let a = score(&snap, &weights).unwrap();
        let b = score(&snap, &weights).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn composite_within_bounds() {
        let snap = scorable_snapshot();
        let record = score(&snap, &WeightProfile::default()).unwrap();
        assert!(record.composite >= 0.0 && record.composite <= 100.0);
    }

    #[test]
    fn missing_oscillator_fails_scoring() {
        let mut snap = scorable_snapshot();
        snap.metrics.remove(&Metric::Rsi);
        let err = score(&snap, &WeightProfile::default()).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::InsufficientData { missing, .. } if missing == "oscillator"
        ));
    }

    #[test]
    fn missing_volume_metrics_fail_scoring() {
        let mut snap = scorable_snapshot();
        for metric in [
            Metric::VolumeRatio,
            Metric::TurnoverRate,
            Metric::VolumeTrend,
            Metric::PriceVolumeCorr,
        ] {
            snap.metrics.remove(&metric);
        }
        let err = score(&snap, &WeightProfile::default()).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::InsufficientData { missing, .. } if missing == "volume"
        ));
    }

    #[test]
    fn technical_baseline_is_fifty_for_neutral_signals() {
        let snap = scorable_snapshot();
        // Default signals: MACD neutral 0, RSI neutral +10, KDJ neutral 0,
        // band normal +8, MA mixed 0 → 68.
        assert_relative_eq!(technical_subscore(&snap), 68.0);
    }

    #[test]
    fn technical_clamps_at_hundred() {
        let mut snap = scorable_snapshot();
        snap.signals.macd = MacdState::GoldenCross;
        snap.signals.rsi = RsiState::Neutral;
        snap.signals.kdj = KdjState::OversoldRebound;
        snap.signals.band = BandState::Normal;
        snap.signals.ma_trend = MaTrend::StrongBullish;
        // 50 + 25 + 10 + 20 + 8 + 15 = 128 → clamped.
        assert_relative_eq!(technical_subscore(&snap), 100.0);
    }

    #[test]
    fn technical_floor_at_zero() {
        let mut snap = scorable_snapshot();
        snap.signals.macd = MacdState::DeadCross;
        snap.signals.rsi = RsiState::SevereOverbought;
        snap.signals.kdj = KdjState::DeadCross;
        snap.signals.band = BandState::AboveUpper;
        snap.signals.ma_trend = MaTrend::StrongBearish;
        // 50 - 25 - 8 - 15 - 8 - 15 = -21 → clamped.
        assert_relative_eq!(technical_subscore(&snap), 0.0);
    }

    #[test]
    fn momentum_brackets() {
        let mut snap = scorable_snapshot();
        snap.set_metric(Metric::PriceChange5d, 12.0);
        snap.set_metric(Metric::TrendSlope, 0.6);
        snap.set_metric(Metric::RelativeStrength, 1.0);
        snap.set_metric(Metric::BreakoutHeadroom, 1.01);
        assert_relative_eq!(momentum_subscore(&snap), 100.0);

        snap.set_metric(Metric::PriceChange5d, -6.0);
        snap.set_metric(Metric::TrendSlope, -0.6);
        snap.set_metric(Metric::RelativeStrength, 0.0);
        snap.set_metric(Metric::BreakoutHeadroom, 0.80);
        assert_relative_eq!(momentum_subscore(&snap), 5.0);
    }

    #[test]
    fn momentum_is_monotonic_in_price_change() {
        let mut prev = -1.0;
        for pct in [-6.0, -3.0, -1.0, 1.0, 3.0, 7.0, 12.0] {
            let mut snap = scorable_snapshot();
            snap.set_metric(Metric::PriceChange5d, pct);
            let sub = momentum_subscore(&snap);
            assert!(sub >= prev, "momentum not monotonic at {pct}");
            prev = sub;
        }
    }

    #[test]
    fn volume_ratio_saturates_above_three() {
        let mut snap = scorable_snapshot();
        snap.set_metric(Metric::VolumeRatio, 3.5);
        let at_saturation = volume_subscore(&snap);
        snap.set_metric(Metric::VolumeRatio, 30.0);
        assert_relative_eq!(volume_subscore(&snap), at_saturation);
    }

    #[test]
    fn volatility_prefers_moderate() {
        let mut moderate = scorable_snapshot();
        moderate.set_metric(Metric::AnnualVolatility, 25.0);
        let mut extreme = scorable_snapshot();
        extreme.set_metric(Metric::AnnualVolatility, 90.0);
        assert!(volatility_subscore(&moderate) > volatility_subscore(&extreme));
    }

    #[test]
    fn sentiment_maps_breadth_around_fifty() {
        let mut snap = scorable_snapshot();
        snap.set_metric(Metric::MarketBreadth, 0.5);
        assert_relative_eq!(sentiment_subscore(&snap), 50.0);
        snap.set_metric(Metric::MarketBreadth, 1.0);
        assert_relative_eq!(sentiment_subscore(&snap), 100.0);
        snap.set_metric(Metric::MarketBreadth, 0.0);
        assert_relative_eq!(sentiment_subscore(&snap), 0.0);
        snap.metrics.remove(&Metric::MarketBreadth);
        assert_relative_eq!(sentiment_subscore(&snap), 50.0);
    }

    #[test]
    fn sentiment_contribution_is_capped() {
        let mut snap = scorable_snapshot();
        snap.set_metric(Metric::MarketBreadth, 1.0);
        // All weight on sentiment: delta would be 50 points, capped to 5.
        let weights = WeightProfile::new(0.0, 0.0, 0.0, 0.0, 1.0);
        let record = score(&snap, &weights).unwrap();
        assert_relative_eq!(record.composite, 55.0);
    }

    #[test]
    fn zero_sentiment_weight_ignores_breadth() {
        let mut snap = scorable_snapshot();
        snap.set_metric(Metric::MarketBreadth, 1.0);
        let weights = WeightProfile::new(0.40, 0.25, 0.20, 0.15, 0.0);
        let record = score(&snap, &weights).unwrap();
        let expected = record.technical * 0.40
            + record.momentum * 0.25
            + record.volume * 0.20
            + record.volatility * 0.15;
        assert_relative_eq!(record.composite, expected.clamp(0.0, 100.0));
    }

    #[test]
    fn missing_optional_metrics_use_neutral_fallbacks() {
        let mut snap =
            IndicatorSnapshot::new("000001", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        // Only the mandatory classes, one metric each.
        snap.set_metric(Metric::PriceChange5d, 1.0);
        snap.set_metric(Metric::Rsi, 50.0);
        snap.set_metric(Metric::VolumeRatio, 1.2);
        let record = score(&snap, &WeightProfile::default()).unwrap();
        // momentum: 15 + 10 + 12.5 + 10 = 47.5
        assert_relative_eq!(record.momentum, 47.5);
        // volume: 15 + 12 + 12 + 10 = 49
        assert_relative_eq!(record.volume, 49.0);
        // volatility: all fallbacks 20 + 15 + 15 = 50
        assert_relative_eq!(record.volatility, 50.0);
    }
}
