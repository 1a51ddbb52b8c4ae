//! CSV result sink: one file per selection, two per backtest (trades and
//! summaries), written under an output directory.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::SiftError;
use crate::domain::selection::SelectionResult;
use crate::ports::sink_port::SinkPort;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub struct CsvSink {
    out_dir: PathBuf,
}

impl CsvSink {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn ensure_dir(&self) -> Result<(), SiftError> {
        fs::create_dir_all(&self.out_dir)?;
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.out_dir.join(name)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Serialize)]
struct SelectionRow<'a> {
    rank: usize,
    symbol: &'a str,
    date: String,
    composite: f64,
    technical: f64,
    momentum: f64,
    volume: f64,
    volatility: f64,
    sentiment: f64,
    strategies: String,
}

#[derive(Serialize)]
struct TradeRow<'a> {
    symbol: &'a str,
    entry_date: String,
    entry_price: f64,
    holding_period: usize,
    exit_date: String,
    exit_price: f64,
    realized_return: f64,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    strategy: &'a str,
    start: String,
    end: String,
    holding_period: usize,
    trades: usize,
    mean_return: f64,
    win_rate: f64,
    std_dev: f64,
    sharpe_like: f64,
    rating: String,
    risk: String,
}

impl SinkPort for CsvSink {
    fn write_selection(&self, result: &SelectionResult) -> Result<(), SiftError> {
        self.ensure_dir()?;
        let name = format!(
            "selection_{}_{}.csv",
            sanitize(&result.strategy),
            result.as_of
        );
        let mut wtr = csv::Writer::from_path(self.path(&name)).map_err(io_reason)?;
        for (i, record) in result.records.iter().enumerate() {
            let s = &record.score;
            wtr.serialize(SelectionRow {
                rank: i + 1,
                symbol: &record.symbol,
                date: s.date.to_string(),
                composite: s.composite,
                technical: s.technical,
                momentum: s.momentum,
                volume: s.volume,
                volatility: s.volatility,
                sentiment: s.sentiment,
                strategies: record.strategies.join("+"),
            })
            .map_err(io_reason)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_backtest(&self, report: &BacktestReport) -> Result<(), SiftError> {
        self.ensure_dir()?;
        let stem = sanitize(&report.strategy);

        let mut trades =
            csv::Writer::from_path(self.path(&format!("backtest_{stem}_trades.csv")))
                .map_err(io_reason)?;
        for trade in &report.trades {
            trades
                .serialize(TradeRow {
                    symbol: &trade.symbol,
                    entry_date: trade.entry_date.to_string(),
                    entry_price: trade.entry_price,
                    holding_period: trade.holding_period,
                    exit_date: trade.exit_date.to_string(),
                    exit_price: trade.exit_price,
                    realized_return: trade.realized_return,
                })
                .map_err(io_reason)?;
        }
        trades.flush()?;

        let mut summaries =
            csv::Writer::from_path(self.path(&format!("backtest_{stem}_summary.csv")))
                .map_err(io_reason)?;
        for summary in report.summaries.values() {
            summaries
                .serialize(SummaryRow {
                    strategy: &summary.strategy,
                    start: summary.start.to_string(),
                    end: summary.end.to_string(),
                    holding_period: summary.holding_period,
                    trades: summary.trades,
                    mean_return: summary.mean_return,
                    win_rate: summary.win_rate,
                    std_dev: summary.std_dev,
                    sharpe_like: summary.sharpe_like,
                    rating: summary.rating.to_string(),
                    risk: summary.risk.to_string(),
                })
                .map_err(io_reason)?;
        }
        summaries.flush()?;
        Ok(())
    }
}

fn io_reason(err: csv::Error) -> SiftError {
    SiftError::Data {
        reason: format!("CSV write error: {err}"),
    }
}
