//! Backtest engine: replays a strategy day by day against realized forward
//! returns.
//!
//! For every trading day in range the strategy engine runs as of that day —
//! the data port contract guarantees snapshots only use data up to and
//! including it — and each selection becomes one simulated trade per holding
//! period. Trades whose exit would fall past the end of a symbol's available
//! series are incomplete and excluded from statistics. Identical inputs
//! reproduce bit-identical summaries: no randomness, no wall-clock reads.

use crate::domain::error::SiftError;
use crate::domain::performance::{self, BacktestSummary, RatingThresholds};
use crate::domain::selection::{SelectOptions, SelectionEngine};
use crate::domain::strategy::{StrategyCatalog, StrategyDefinition};
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const MIN_BACKTEST_DAYS: usize = 20;

/// Holding period used to rank strategies in comparisons, when present.
pub const PRIMARY_HOLDING_PERIOD: usize = 5;

#[derive(Debug, Clone)]
pub struct BacktestOptions {
    /// Holding periods in trading days.
    pub holding_periods: Vec<usize>,
    /// Sample entry dates every N trading days. 1 = every day.
    pub step: usize,
    /// Minimum trading days required between start and end.
    pub min_days: usize,
    /// Cap on selections per entry day.
    pub max_results_per_day: Option<usize>,
    pub thresholds: RatingThresholds,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            holding_periods: vec![1, 3, 5, 10],
            step: 1,
            min_days: MIN_BACKTEST_DAYS,
            max_results_per_day: Some(20),
            thresholds: RatingThresholds::default(),
        }
    }
}

/// One simulated trade: a selection held for a fixed number of trading days.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestTrade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub holding_period: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    /// Fractional return, 0.10 = +10%.
    pub realized_return: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub strategy: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Entry days actually evaluated.
    pub entry_days: usize,
    pub trades: Vec<BacktestTrade>,
    pub summaries: BTreeMap<usize, BacktestSummary>,
}

impl BacktestReport {
    /// The summary comparisons rank by: the primary holding period when
    /// present, otherwise the shortest.
    pub fn primary_summary(&self) -> Option<&BacktestSummary> {
        self.summaries
            .get(&PRIMARY_HOLDING_PERIOD)
            .or_else(|| self.summaries.values().next())
    }
}

pub struct BacktestEngine<'a> {
    catalog: &'a StrategyCatalog,
    provider: &'a dyn MarketDataPort,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(catalog: &'a StrategyCatalog, provider: &'a dyn MarketDataPort) -> Self {
        Self { catalog, provider }
    }

    pub fn run(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        options: &BacktestOptions,
    ) -> Result<BacktestReport, SiftError> {
        let definition = self.catalog.get(name)?;
        self.run_with(definition, start, end, options)
    }

    pub fn run_with(
        &self,
        definition: &StrategyDefinition,
        start: NaiveDate,
        end: NaiveDate,
        options: &BacktestOptions,
    ) -> Result<BacktestReport, SiftError> {
        definition.weights.validate()?;

        let mut universe = self.provider.list_universe()?;
        universe.sort();

        // Full series per symbol: exits may land after `end`, so the series
        // is not truncated there. Entry days are.
        let mut series: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
        let mut index: HashMap<String, HashMap<NaiveDate, usize>> = HashMap::new();
        let mut timeline: BTreeSet<NaiveDate> = BTreeSet::new();

        for symbol in &universe {
            let prices = self.provider.price_series(symbol, start, NaiveDate::MAX)?;
            let by_date: HashMap<NaiveDate, usize> = prices
                .iter()
                .enumerate()
                .map(|(i, (date, _))| (*date, i))
                .collect();
            for (date, _) in &prices {
                if *date >= start && *date <= end {
                    timeline.insert(*date);
                }
            }
            series.insert(symbol.clone(), prices);
            index.insert(symbol.clone(), by_date);
        }

        let entry_days: Vec<NaiveDate> = timeline.into_iter().collect();
        if entry_days.len() < options.min_days {
            return Err(SiftError::InsufficientHistory {
                days: entry_days.len(),
                minimum: options.min_days,
            });
        }

        let engine = SelectionEngine::new(self.catalog, self.provider);
        let select_options = SelectOptions {
            weights: None,
            max_results: options.max_results_per_day,
        };
        let step = options.step.max(1);

        let mut trades: Vec<BacktestTrade> = Vec::new();
        let mut evaluated = 0usize;

        for day in entry_days.iter().step_by(step) {
            evaluated += 1;
            let selection = match engine.select_with(definition, *day, &select_options) {
                Ok(s) => s,
                // Days where nothing is scorable yet produce no trades; the
                // backtest itself is still valid.
                Err(SiftError::EmptyUniverse { .. }) => continue,
                Err(e) => return Err(e),
            };

            for record in &selection.records {
                let Some(prices) = series.get(&record.symbol) else {
                    continue;
                };
                let Some(&entry_idx) = index
                    .get(&record.symbol)
                    .and_then(|by_date| by_date.get(day))
                else {
                    continue;
                };
                let entry_price = prices[entry_idx].1;
                if entry_price <= 0.0 {
                    continue;
                }

                for &period in &options.holding_periods {
                    let exit_idx = entry_idx + period;
                    // Incomplete trade: exit beyond available data.
                    if exit_idx >= prices.len() {
                        continue;
                    }
                    let (exit_date, exit_price) = prices[exit_idx];
                    trades.push(BacktestTrade {
                        symbol: record.symbol.clone(),
                        entry_date: *day,
                        entry_price,
                        holding_period: period,
                        exit_date,
                        exit_price,
                        realized_return: exit_price / entry_price - 1.0,
                    });
                }
            }
        }

        let mut summaries = BTreeMap::new();
        for &period in &options.holding_periods {
            let returns: Vec<f64> = trades
                .iter()
                .filter(|t| t.holding_period == period)
                .map(|t| t.realized_return)
                .collect();
            summaries.insert(
                period,
                performance::summarize(
                    &definition.name,
                    start,
                    end,
                    period,
                    &returns,
                    &options.thresholds,
                ),
            );
        }

        Ok(BacktestReport {
            strategy: definition.name.clone(),
            start,
            end,
            entry_days: evaluated,
            trades,
            summaries,
        })
    }

    /// Backtest several strategies and rank them by primary-period mean
    /// return, best first; ties resolve by strategy name.
    pub fn compare(
        &self,
        names: &[String],
        start: NaiveDate,
        end: NaiveDate,
        options: &BacktestOptions,
    ) -> Result<Vec<BacktestReport>, SiftError> {
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            reports.push(self.run(name, start, end, options)?);
        }
        reports.sort_by(|a, b| {
            let mean_a = a.primary_summary().map(|s| s.mean_return).unwrap_or(0.0);
            let mean_b = b.primary_summary().map(|s| s.mean_return).unwrap_or(0.0);
            mean_b
                .partial_cmp(&mean_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.strategy.cmp(&b.strategy))
        });
        Ok(reports)
    }
}
