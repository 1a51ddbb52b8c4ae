//! Derives an [`IndicatorSnapshot`] from a symbol's OHLCV history.
//!
//! Everything here is pure arithmetic over a bar slice ending at the
//! snapshot date, so the same history always yields the same snapshot.
//! Individual indicators that lack enough bars are simply omitted from the
//! metric map; the snapshot itself requires [`MIN_SNAPSHOT_BARS`].

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::snapshot::{
    BandState, IndicatorSnapshot, KdjState, MacdState, MaTrend, Metric, RsiState,
};

pub const MIN_SNAPSHOT_BARS: usize = 30;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Build a snapshot from history up to and including the last bar. Returns
/// `None` when history is too short to score meaningfully.
pub fn build_snapshot(
    symbol: &str,
    bars: &[OhlcvBar],
    breadth: Option<f64>,
) -> Option<IndicatorSnapshot> {
    if bars.len() < MIN_SNAPSHOT_BARS {
        return None;
    }

    let last = bars.last()?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let close = last.close;

    let mut snap = IndicatorSnapshot::new(symbol, last.date);
    snap.set_metric(Metric::LastClose, close);

    if let Some(past) = nth_from_end(&closes, 5) {
        if past > 0.0 {
            snap.set_metric(Metric::PriceChange5d, (close / past - 1.0) * 100.0);
        }
    }

    if closes.len() >= 10 {
        snap.set_metric(Metric::TrendSlope, slope(&closes[closes.len() - 10..]));
    }

    if closes.len() >= 20 {
        let window = &closes[closes.len() - 20..];
        let high = window.iter().cloned().fold(f64::MIN, f64::max);
        let low = window.iter().cloned().fold(f64::MAX, f64::min);
        if high > low {
            snap.set_metric(Metric::RelativeStrength, (close - low) / (high - low));
        } else {
            snap.set_metric(Metric::RelativeStrength, 0.5);
        }
        if high > 0.0 {
            snap.set_metric(Metric::BreakoutHeadroom, close / high);
        }
    }

    if let Some(ma20) = sma_last(&closes, 20) {
        if ma20 > 0.0 {
            snap.set_metric(Metric::PriceToMa20, close / ma20);
        }
    }

    let rsi = rsi_last(&closes, 14);
    if let Some(rsi) = rsi {
        snap.set_metric(Metric::Rsi, rsi);
    }

    if let Some(ratio) = volume_ratio(&volumes, 5) {
        snap.set_metric(Metric::VolumeRatio, ratio);
    }

    if let Some(turnover) = last.turnover_rate {
        snap.set_metric(Metric::TurnoverRate, turnover);
    }

    if let Some(trend) = volume_trend(&volumes) {
        snap.set_metric(Metric::VolumeTrend, trend);
    }

    if let Some(corr) = price_volume_correlation(&closes, &volumes) {
        snap.set_metric(Metric::PriceVolumeCorr, corr);
    }

    let daily_returns = returns(&closes);
    if daily_returns.len() >= 20 {
        let recent = &daily_returns[daily_returns.len() - 20..];
        let vol = std_dev(recent) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;
        snap.set_metric(Metric::AnnualVolatility, vol);
    }
    if daily_returns.len() >= 20 {
        let recent = std_dev(&daily_returns[daily_returns.len() - 10..]);
        let earlier =
            std_dev(&daily_returns[daily_returns.len() - 20..daily_returns.len() - 10]);
        if earlier > 0.0 {
            snap.set_metric(Metric::VolatilityTrend, (recent / earlier - 1.0) * 100.0);
        }
    }

    if let Some(atr) = atr_last(bars, 14) {
        if close > 0.0 {
            snap.set_metric(Metric::AtrPercent, atr / close * 100.0);
        }
    }

    if let Some(breadth) = breadth {
        snap.set_metric(Metric::MarketBreadth, breadth.clamp(0.0, 1.0));
    }

    snap.signals.macd = macd_state(&closes);
    snap.signals.rsi = rsi.map(RsiState::classify).unwrap_or_default();
    snap.signals.kdj = kdj_state(bars);
    snap.signals.band = band_state(&closes);
    snap.signals.ma_trend = ma_trend(&closes, close);

    Some(snap)
}

fn nth_from_end(values: &[f64], n: usize) -> Option<f64> {
    values.len().checked_sub(n + 1).map(|i| values[i])
}

fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[values.len() - period..].iter().sum::<f64>() / period as f64)
}

/// EMA over the whole slice, seeded with the first value.
fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);
    for &value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Wilder-smoothed RSI of the last bar.
fn rsi_last(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let mut gain = 0.0;
    let mut loss = 0.0;
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }
    let mut avg_gain = gain / period as f64;
    let mut avg_loss = loss / period as f64;

    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        let (g, l) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period - 1) as f64 + g) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + l) / period as f64;
    }

    if avg_loss <= f64::EPSILON {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD(12, 26, 9) state from the last two line-vs-signal differences.
fn macd_state(closes: &[f64]) -> MacdState {
    if closes.len() < 27 {
        return MacdState::Neutral;
    }
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&macd, 9);

    let n = macd.len();
    let diff = macd[n - 1] - signal[n - 1];
    let prev_diff = macd[n - 2] - signal[n - 2];

    if diff > 0.0 {
        if prev_diff <= 0.0 {
            MacdState::GoldenCross
        } else {
            MacdState::Bullish
        }
    } else if diff < 0.0 {
        if prev_diff >= 0.0 {
            MacdState::DeadCross
        } else {
            MacdState::Bearish
        }
    } else {
        MacdState::Neutral
    }
}

/// KDJ(9, 3, 3) state of the last bar.
fn kdj_state(bars: &[OhlcvBar]) -> KdjState {
    const LOOKBACK: usize = 9;
    if bars.len() < LOOKBACK + 1 {
        return KdjState::Neutral;
    }

    let mut k = 50.0;
    let mut d = 50.0;
    let mut prev_k = k;
    let mut prev_d = d;

    for i in (LOOKBACK - 1)..bars.len() {
        let window = &bars[i + 1 - LOOKBACK..=i];
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let rsv = if high > low {
            (bars[i].close - low) / (high - low) * 100.0
        } else {
            50.0
        };
        prev_k = k;
        prev_d = d;
        k = (2.0 * k + rsv) / 3.0;
        d = (2.0 * d + k) / 3.0;
    }
    let j = 3.0 * k - 2.0 * d;

    if k < 20.0 && d < 20.0 && j > k {
        KdjState::OversoldRebound
    } else if k < 30.0 && d < 30.0 {
        KdjState::Oversold
    } else if k > 80.0 && d > 80.0 {
        KdjState::Overbought
    } else if k > d && prev_k <= prev_d {
        KdjState::GoldenCross
    } else if k < d && prev_k >= prev_d {
        KdjState::DeadCross
    } else {
        KdjState::Neutral
    }
}

/// Bollinger(20, 2) band position of the last close.
fn band_state(closes: &[f64]) -> BandState {
    const PERIOD: usize = 20;
    let Some(middle) = sma_last(closes, PERIOD) else {
        return BandState::Normal;
    };
    let window = &closes[closes.len() - PERIOD..];
    let sd = std_dev(window);
    if sd <= f64::EPSILON {
        return BandState::Normal;
    }
    let upper = middle + 2.0 * sd;
    let lower = middle - 2.0 * sd;
    let close = closes[closes.len() - 1];
    let position = (close - lower) / (upper - lower) * 100.0;
    BandState::classify(position)
}

fn ma_trend(closes: &[f64], close: f64) -> MaTrend {
    let (Some(ma5), Some(ma10), Some(ma20)) = (
        sma_last(closes, 5),
        sma_last(closes, 10),
        sma_last(closes, 20),
    ) else {
        return MaTrend::Mixed;
    };
    let ma60 = sma_last(closes, 60);

    let long_up = ma60.map(|m| ma20 > m).unwrap_or(true);
    let long_down = ma60.map(|m| ma20 < m).unwrap_or(true);

    if ma5 > ma10 && ma10 > ma20 {
        if long_up && close > ma5 {
            MaTrend::StrongBullish
        } else {
            MaTrend::Bullish
        }
    } else if ma5 < ma10 && ma10 < ma20 {
        if long_down && close < ma5 {
            MaTrend::StrongBearish
        } else {
            MaTrend::Bearish
        }
    } else {
        MaTrend::Mixed
    }
}

/// Wilder-smoothed ATR of the last bar.
fn atr_last(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let mut tr_values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut atr = tr_values[..period].iter().sum::<f64>() / period as f64;
    for &tr in &tr_values[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
    }
    Some(atr)
}

/// Current volume over the trailing average (current bar included).
fn volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    if volumes.len() < period {
        return None;
    }
    let current = volumes[volumes.len() - 1];
    let avg = volumes[volumes.len() - period..].iter().sum::<f64>() / period as f64;
    if avg > 0.0 { Some(current / avg) } else { None }
}

/// Recent 5-day average volume vs the prior 5 days, percent change.
fn volume_trend(volumes: &[f64]) -> Option<f64> {
    if volumes.len() < 10 {
        return None;
    }
    let recent = volumes[volumes.len() - 5..].iter().sum::<f64>() / 5.0;
    let earlier = volumes[volumes.len() - 10..volumes.len() - 5].iter().sum::<f64>() / 5.0;
    if earlier > 0.0 {
        Some((recent / earlier - 1.0) * 100.0)
    } else {
        None
    }
}

/// Correlation of the last five daily price and volume changes.
fn price_volume_correlation(closes: &[f64], volumes: &[f64]) -> Option<f64> {
    if closes.len() < 6 || volumes.len() < 6 {
        return None;
    }
    let price_changes = pct_changes(&closes[closes.len() - 6..]);
    let volume_changes = pct_changes(&volumes[volumes.len() - 6..]);
    correlation(&price_changes, &volume_changes)
}

fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Least-squares slope over an evenly spaced series.
fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / nf;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den > 0.0 { num / den } else { 0.0 }
}

fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 3 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(cov / denom)
}
