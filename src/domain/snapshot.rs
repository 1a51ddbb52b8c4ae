//! Per-symbol indicator snapshot: numeric metrics plus categorical signal
//! states for one date.
//!
//! `Metric` is a closed enumeration so scoring and filters access values by
//! compile-time-checked key, and each metric carries a class used for the
//! minimum-data check. Signal states are closed enums consumed through
//! exhaustive point tables, never conditional chains.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricClass {
    Price,
    Trend,
    Oscillator,
    Volume,
    Volatility,
    Breadth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Metric {
    /// Last close price.
    LastClose,
    /// 5-day price change, percent.
    PriceChange5d,
    /// Least-squares slope of the last 10 closes.
    TrendSlope,
    /// Position of the close in the 20-day range, 0..=1.
    RelativeStrength,
    /// Close divided by the 20-day high.
    BreakoutHeadroom,
    /// Close divided by the 20-day moving average.
    PriceToMa20,
    /// RSI(14), 0..=100.
    Rsi,
    /// Current volume over the 5-day average volume.
    VolumeRatio,
    /// Turnover rate, percent of float.
    TurnoverRate,
    /// Recent 5-day average volume vs the prior 5-day average, percent change.
    VolumeTrend,
    /// Correlation of daily price and volume changes over 5 days, -1..=1.
    PriceVolumeCorr,
    /// Annualized volatility of daily returns, percent.
    AnnualVolatility,
    /// ATR(14) as a percent of the close.
    AtrPercent,
    /// Recent 10-day return stddev vs the prior 10 days, percent change.
    VolatilityTrend,
    /// Fraction of the universe rising on the snapshot date, 0..=1.
    MarketBreadth,
}

impl Metric {
    pub fn class(self) -> MetricClass {
        match self {
            Metric::LastClose => MetricClass::Price,
            Metric::PriceChange5d
            | Metric::TrendSlope
            | Metric::RelativeStrength
            | Metric::BreakoutHeadroom
            | Metric::PriceToMa20 => MetricClass::Trend,
            Metric::Rsi => MetricClass::Oscillator,
            Metric::VolumeRatio
            | Metric::TurnoverRate
            | Metric::VolumeTrend
            | Metric::PriceVolumeCorr => MetricClass::Volume,
            Metric::AnnualVolatility | Metric::AtrPercent | Metric::VolatilityTrend => {
                MetricClass::Volatility
            }
            Metric::MarketBreadth => MetricClass::Breadth,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::LastClose => "last_close",
            Metric::PriceChange5d => "price_change_5d",
            Metric::TrendSlope => "trend_slope",
            Metric::RelativeStrength => "relative_strength",
            Metric::BreakoutHeadroom => "breakout_headroom",
            Metric::PriceToMa20 => "price_to_ma20",
            Metric::Rsi => "rsi",
            Metric::VolumeRatio => "volume_ratio",
            Metric::TurnoverRate => "turnover_rate",
            Metric::VolumeTrend => "volume_trend",
            Metric::PriceVolumeCorr => "price_volume_corr",
            Metric::AnnualVolatility => "annual_volatility",
            Metric::AtrPercent => "atr_percent",
            Metric::VolatilityTrend => "volatility_trend",
            Metric::MarketBreadth => "market_breadth",
        };
        write!(f, "{name}")
    }
}

/// MACD line vs signal line state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacdState {
    GoldenCross,
    Bullish,
    #[default]
    Neutral,
    Bearish,
    DeadCross,
}

impl MacdState {
    /// Contribution to the technical sub-score, around the neutral baseline.
    pub fn points(self) -> f64 {
        match self {
            MacdState::GoldenCross => 25.0,
            MacdState::Bullish => 10.0,
            MacdState::Neutral => 0.0,
            MacdState::Bearish => -10.0,
            MacdState::DeadCross => -25.0,
        }
    }
}

/// RSI(14) band classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiState {
    SevereOversold,
    Oversold,
    MildOversold,
    #[default]
    Neutral,
    MildOverbought,
    Overbought,
    SevereOverbought,
}

impl RsiState {
    pub fn points(self) -> f64 {
        match self {
            RsiState::Neutral => 10.0,
            RsiState::MildOversold => 8.0,
            RsiState::MildOverbought => 5.0,
            RsiState::Oversold => 2.0,
            RsiState::Overbought => -2.0,
            RsiState::SevereOversold => -5.0,
            RsiState::SevereOverbought => -8.0,
        }
    }

    pub fn classify(rsi: f64) -> Self {
        if rsi >= 80.0 {
            RsiState::SevereOverbought
        } else if rsi > 70.0 {
            RsiState::Overbought
        } else if rsi > 60.0 {
            RsiState::MildOverbought
        } else if rsi >= 40.0 {
            RsiState::Neutral
        } else if rsi >= 30.0 {
            RsiState::MildOversold
        } else if rsi >= 20.0 {
            RsiState::Oversold
        } else {
            RsiState::SevereOversold
        }
    }
}

/// KDJ stochastic state. `OversoldRebound` is K and D both below 20 with J
/// turning up through K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdjState {
    OversoldRebound,
    Oversold,
    GoldenCross,
    #[default]
    Neutral,
    Overbought,
    DeadCross,
}

impl KdjState {
    pub fn points(self) -> f64 {
        match self {
            KdjState::OversoldRebound => 20.0,
            KdjState::GoldenCross => 15.0,
            KdjState::Oversold => 5.0,
            KdjState::Neutral => 0.0,
            KdjState::Overbought => -10.0,
            KdjState::DeadCross => -15.0,
        }
    }

    pub fn is_oversold(self) -> bool {
        matches!(self, KdjState::Oversold | KdjState::OversoldRebound)
    }
}

/// Position relative to the Bollinger(20, 2) envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandState {
    BelowLower,
    NearLower,
    #[default]
    Normal,
    NearUpper,
    AboveUpper,
}

impl BandState {
    pub fn points(self) -> f64 {
        match self {
            BandState::Normal => 8.0,
            BandState::NearLower => 6.0,
            BandState::BelowLower => 4.0,
            BandState::NearUpper => -2.0,
            BandState::AboveUpper => -8.0,
        }
    }

    /// `position` is percent of the band width, < 0 below the lower band and
    /// > 100 above the upper.
    pub fn classify(position: f64) -> Self {
        if position < 0.0 {
            BandState::BelowLower
        } else if position < 20.0 {
            BandState::NearLower
        } else if position <= 80.0 {
            BandState::Normal
        } else if position <= 100.0 {
            BandState::NearUpper
        } else {
            BandState::AboveUpper
        }
    }
}

/// Moving-average ladder alignment (5/10/20, optionally 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaTrend {
    StrongBullish,
    Bullish,
    #[default]
    Mixed,
    Bearish,
    StrongBearish,
}

impl MaTrend {
    pub fn points(self) -> f64 {
        match self {
            MaTrend::StrongBullish => 15.0,
            MaTrend::Bullish => 8.0,
            MaTrend::Mixed => 0.0,
            MaTrend::Bearish => -8.0,
            MaTrend::StrongBearish => -15.0,
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, MaTrend::StrongBullish | MaTrend::Bullish)
    }
}

/// Categorical signal states for one symbol/date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub macd: MacdState,
    pub rsi: RsiState,
    pub kdj: KdjState,
    pub band: BandState,
    pub ma_trend: MaTrend,
}

/// One symbol's indicator state on one date. Immutable once built.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub date: NaiveDate,
    pub metrics: BTreeMap<Metric, f64>,
    pub signals: Signals,
}

impl IndicatorSnapshot {
    pub fn new(symbol: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            metrics: BTreeMap::new(),
            signals: Signals::default(),
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }

    pub fn set_metric(&mut self, metric: Metric, value: f64) {
        self.metrics.insert(metric, value);
    }

    /// True when at least one metric of the class is present.
    pub fn has_class(&self, class: MetricClass) -> bool {
        self.metrics.keys().any(|m| m.class() == class)
    }
}
