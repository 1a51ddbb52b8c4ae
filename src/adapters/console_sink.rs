//! Console result sink: ranked tables on stdout.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::SiftError;
use crate::domain::selection::SelectionResult;
use crate::ports::sink_port::SinkPort;

pub struct ConsoleSink;

impl SinkPort for ConsoleSink {
    fn write_selection(&self, result: &SelectionResult) -> Result<(), SiftError> {
        println!("=== {} @ {} ===", result.strategy, result.as_of);
        if result.records.is_empty() {
            println!("(no symbols passed the filters)");
        } else {
            println!(
                "{:<4} {:<10} {:>8} {:>6} {:>6} {:>6} {:>6} {:>6}  strategies",
                "#", "symbol", "score", "tech", "mom", "vol", "vlty", "sent"
            );
            for (i, record) in result.records.iter().enumerate() {
                let s = &record.score;
                println!(
                    "{:<4} {:<10} {:>8.2} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1}  {}",
                    i + 1,
                    record.symbol,
                    s.composite,
                    s.technical,
                    s.momentum,
                    s.volume,
                    s.volatility,
                    s.sentiment,
                    record.strategies.join("+"),
                );
            }
        }
        if !result.skipped.is_empty() {
            println!("({} symbols skipped for insufficient data)", result.skipped.len());
        }
        println!();
        Ok(())
    }

    fn write_backtest(&self, report: &BacktestReport) -> Result<(), SiftError> {
        println!(
            "=== Backtest: {} ({} to {}) ===",
            report.strategy, report.start, report.end
        );
        println!(
            "Entry days: {}   Completed trades: {}",
            report.entry_days,
            report.trades.len()
        );
        println!(
            "{:>6} {:>8} {:>10} {:>9} {:>9} {:>8} {:>7} {:>7}",
            "hold", "trades", "mean", "win rate", "std dev", "sharpe", "rating", "risk"
        );
        for summary in report.summaries.values() {
            println!(
                "{:>5}d {:>8} {:>9.2}% {:>8.1}% {:>8.2}% {:>8.2} {:>7} {:>7}",
                summary.holding_period,
                summary.trades,
                summary.mean_return * 100.0,
                summary.win_rate * 100.0,
                summary.std_dev * 100.0,
                summary.sharpe_like,
                summary.rating,
                summary.risk,
            );
        }
        println!();
        Ok(())
    }
}
