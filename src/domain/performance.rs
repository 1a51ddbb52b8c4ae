//! Per-holding-period performance statistics and the discrete strategy
//! rating.
//!
//! Returns are fractions (0.10 = +10%). All denominators are guarded: zero
//! standard deviation and small samples degrade the Sharpe-like ratio to 0
//! rather than erroring.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Letter grade for a strategy's realized performance over a holding period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        write!(f, "{s}")
    }
}

/// Grade and risk-tier breakpoints. Product heuristics, kept configurable;
/// the defaults carry the original cutoffs with returns as fractions.
#[derive(Debug, Clone, Copy)]
pub struct RatingThresholds {
    pub a_mean: f64,
    pub a_win: f64,
    pub b_mean: f64,
    pub b_win: f64,
    pub c_mean: f64,
    pub c_win: f64,
    pub high_risk_std: f64,
    pub medium_risk_std: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            a_mean: 0.03,
            a_win: 0.60,
            b_mean: 0.01,
            b_win: 0.50,
            c_mean: 0.0,
            c_win: 0.45,
            high_risk_std: 0.08,
            medium_risk_std: 0.04,
        }
    }
}

impl Rating {
    pub fn from_stats(mean: f64, win_rate: f64, thresholds: &RatingThresholds) -> Self {
        if mean > thresholds.a_mean && win_rate > thresholds.a_win {
            Rating::A
        } else if mean > thresholds.b_mean && win_rate > thresholds.b_win {
            Rating::B
        } else if mean > thresholds.c_mean && win_rate > thresholds.c_win {
            Rating::C
        } else {
            Rating::D
        }
    }
}

impl RiskLevel {
    pub fn from_std(std_dev: f64, thresholds: &RatingThresholds) -> Self {
        if std_dev > thresholds.high_risk_std {
            RiskLevel::High
        } else if std_dev > thresholds.medium_risk_std {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Aggregate performance of one strategy over one holding period.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub strategy: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub holding_period: usize,
    pub trades: usize,
    pub mean_return: f64,
    pub win_rate: f64,
    pub std_dev: f64,
    pub sharpe_like: f64,
    pub rating: Rating,
    pub risk: RiskLevel,
}

/// Aggregate a holding period's realized returns.
pub fn summarize(
    strategy: &str,
    start: NaiveDate,
    end: NaiveDate,
    holding_period: usize,
    returns: &[f64],
    thresholds: &RatingThresholds,
) -> BacktestSummary {
    let trades = returns.len();
    let n = trades as f64;

    let mean_return = if trades > 0 {
        returns.iter().sum::<f64>() / n
    } else {
        0.0
    };

    let win_rate = if trades > 0 {
        returns.iter().filter(|&&r| r > 0.0).count() as f64 / n
    } else {
        0.0
    };

    let std_dev = if trades > 0 {
        let variance = returns
            .iter()
            .map(|r| (r - mean_return).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    } else {
        0.0
    };

    let sharpe_like = if trades < 2 || std_dev <= f64::EPSILON {
        0.0
    } else {
        mean_return / std_dev
    };

    BacktestSummary {
        strategy: strategy.to_string(),
        start,
        end,
        holding_period,
        trades,
        mean_return,
        win_rate,
        std_dev,
        sharpe_like,
        rating: Rating::from_stats(mean_return, win_rate, thresholds),
        risk: RiskLevel::from_std(std_dev, thresholds),
    }
}
