//! Strategy engine: scoring a universe under a strategy, plus multi-strategy
//! combination.
//!
//! Per-symbol failures (missing snapshot, insufficient data) skip the symbol
//! and are aggregated into the result; the call only fails when no symbol in
//! the universe could be scored at all.

use crate::domain::error::SiftError;
use crate::domain::score::{self, ScoreRecord};
use crate::domain::snapshot::Signals;
use crate::domain::strategy::{StrategyCatalog, StrategyDefinition};
use crate::domain::weights::WeightProfile;
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Call-time overrides. Catalog entries stay read-only templates.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub weights: Option<WeightProfile>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SelectionRecord {
    pub symbol: String,
    pub score: ScoreRecord,
    pub signals: Signals,
    /// Strategies that selected this symbol. One entry for plain runs, more
    /// after union/intersection.
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub strategy: String,
    pub as_of: NaiveDate,
    /// Ranked descending by composite score, ties broken by symbol ascending.
    pub records: Vec<SelectionRecord>,
    /// Symbols excluded for missing or insufficient data.
    pub skipped: Vec<String>,
}

impl SelectionResult {
    pub fn symbols(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.symbol.as_str()).collect()
    }
}

pub struct SelectionEngine<'a> {
    catalog: &'a StrategyCatalog,
    provider: &'a dyn MarketDataPort,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(catalog: &'a StrategyCatalog, provider: &'a dyn MarketDataPort) -> Self {
        Self { catalog, provider }
    }

    /// Run a catalog strategy as of a date.
    pub fn select(
        &self,
        name: &str,
        as_of: NaiveDate,
        options: &SelectOptions,
    ) -> Result<SelectionResult, SiftError> {
        let definition = self.catalog.get(name)?;
        self.select_with(definition, as_of, options)
    }

    /// Run an explicit definition as of a date.
    pub fn select_with(
        &self,
        definition: &StrategyDefinition,
        as_of: NaiveDate,
        options: &SelectOptions,
    ) -> Result<SelectionResult, SiftError> {
        let weights = options.weights.unwrap_or(definition.weights);
        weights.validate()?;

        let mut universe = self.provider.list_universe()?;
        universe.sort();

        let mut candidates: Vec<SelectionRecord> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();
        let mut scored = 0usize;

        for symbol in &universe {
            let snapshot = match self.provider.snapshot(symbol, as_of)? {
                Some(s) => s,
                None => {
                    skipped.push(symbol.clone());
                    continue;
                }
            };
            let record = match score::score(&snapshot, &weights) {
                Ok(r) => r,
                Err(_) => {
                    skipped.push(symbol.clone());
                    continue;
                }
            };
            scored += 1;
            if definition.filters.passes(&record, &snapshot) {
                candidates.push(SelectionRecord {
                    symbol: symbol.clone(),
                    score: record,
                    signals: snapshot.signals,
                    strategies: vec![definition.name.clone()],
                });
            }
        }

        if scored == 0 {
            return Err(SiftError::EmptyUniverse {
                skipped: skipped.len(),
            });
        }

        rank(&mut candidates);
        let max_results = options.max_results.unwrap_or(definition.max_results);
        candidates.truncate(max_results);

        Ok(SelectionResult {
            strategy: definition.name.clone(),
            as_of,
            records: candidates,
            skipped,
        })
    }

    /// Independent evaluation of several catalog strategies, keyed by name.
    pub fn run_many(
        &self,
        names: &[String],
        as_of: NaiveDate,
        options: &SelectOptions,
    ) -> Result<BTreeMap<String, SelectionResult>, SiftError> {
        let mut results = BTreeMap::new();
        for name in names {
            let result = self.select(name, as_of, options)?;
            results.insert(name.clone(), result);
        }
        Ok(results)
    }
}

/// Descending composite, ascending symbol on ties.
fn rank(records: &mut [SelectionRecord]) {
    records.sort_by(|a, b| {
        b.score
            .composite
            .partial_cmp(&a.score.composite)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

fn merged_skips(results: &[&SelectionResult]) -> Vec<String> {
    let set: BTreeSet<String> = results
        .iter()
        .flat_map(|r| r.skipped.iter().cloned())
        .collect();
    set.into_iter().collect()
}

/// Symbols present in every input. Composite and sub-scores are averaged
/// across the contributing results, then re-ranked.
pub fn intersect(results: &[&SelectionResult]) -> SelectionResult {
    let strategy = combined_name("intersect", results);
    let as_of = results
        .first()
        .map(|r| r.as_of)
        .unwrap_or(NaiveDate::MIN);

    let Some((first, rest)) = results.split_first() else {
        return SelectionResult {
            strategy,
            as_of,
            records: Vec::new(),
            skipped: Vec::new(),
        };
    };

    let mut records: Vec<SelectionRecord> = Vec::new();
    for record in &first.records {
        let mut matches: Vec<&SelectionRecord> = vec![record];
        for other in rest {
            match other.records.iter().find(|r| r.symbol == record.symbol) {
                Some(m) => matches.push(m),
                None => break,
            }
        }
        if matches.len() != results.len() {
            continue;
        }

        let n = matches.len() as f64;
        let mut averaged = record.score.clone();
        averaged.composite = matches.iter().map(|m| m.score.composite).sum::<f64>() / n;
        averaged.technical = matches.iter().map(|m| m.score.technical).sum::<f64>() / n;
        averaged.momentum = matches.iter().map(|m| m.score.momentum).sum::<f64>() / n;
        averaged.volume = matches.iter().map(|m| m.score.volume).sum::<f64>() / n;
        averaged.volatility = matches.iter().map(|m| m.score.volatility).sum::<f64>() / n;
        averaged.sentiment = matches.iter().map(|m| m.score.sentiment).sum::<f64>() / n;

        let mut strategies: Vec<String> = matches
            .iter()
            .flat_map(|m| m.strategies.iter().cloned())
            .collect();
        strategies.sort();
        strategies.dedup();

        records.push(SelectionRecord {
            symbol: record.symbol.clone(),
            score: averaged,
            signals: record.signals,
            strategies,
        });
    }

    rank(&mut records);
    SelectionResult {
        strategy,
        as_of,
        records,
        skipped: merged_skips(results),
    }
}

/// Symbols present in any input. Keeps the maximum-composite record and
/// remembers every strategy that selected the symbol.
pub fn union(results: &[&SelectionResult]) -> SelectionResult {
    let strategy = combined_name("union", results);
    let as_of = results
        .first()
        .map(|r| r.as_of)
        .unwrap_or(NaiveDate::MIN);

    let mut by_symbol: BTreeMap<String, SelectionRecord> = BTreeMap::new();
    for result in results {
        for record in &result.records {
            by_symbol
                .entry(record.symbol.clone())
                .and_modify(|existing| {
                    if record.score.composite > existing.score.composite {
                        existing.score = record.score.clone();
                        existing.signals = record.signals;
                    }
                    existing.strategies.extend(record.strategies.iter().cloned());
                })
                .or_insert_with(|| record.clone());
        }
    }

    let mut records: Vec<SelectionRecord> = by_symbol
        .into_values()
        .map(|mut r| {
            r.strategies.sort();
            r.strategies.dedup();
            r
        })
        .collect();

    rank(&mut records);
    SelectionResult {
        strategy,
        as_of,
        records,
        skipped: merged_skips(results),
    }
}

fn combined_name(op: &str, results: &[&SelectionResult]) -> String {
    let names: Vec<&str> = results.iter().map(|r| r.strategy.as_str()).collect();
    format!("{op}({})", names.join("+"))
}
