#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use stocksift::domain::error::SiftError;
use stocksift::domain::filters::FilterSet;
use stocksift::domain::snapshot::{IndicatorSnapshot, Metric};
use stocksift::domain::strategy::{StrategyCatalog, StrategyDefinition};
use stocksift::domain::weights::WeightProfile;
use stocksift::ports::market_port::MarketDataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory market port with explicit prices and snapshots per symbol.
pub struct MockMarketPort {
    pub prices: BTreeMap<String, Vec<(NaiveDate, f64)>>,
    pub snapshots: BTreeMap<(String, NaiveDate), IndicatorSnapshot>,
}

impl MockMarketPort {
    pub fn new() -> Self {
        Self {
            prices: BTreeMap::new(),
            snapshots: BTreeMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, start: NaiveDate, closes: &[f64]) -> Self {
        let series = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| (start + Duration::days(i as i64), close))
            .collect();
        self.prices.insert(symbol.to_string(), series);
        self
    }

    pub fn with_snapshot(mut self, snapshot: IndicatorSnapshot) -> Self {
        self.snapshots
            .insert((snapshot.symbol.clone(), snapshot.date), snapshot);
        self
    }

    /// Registers a scorable snapshot on every price date of `symbol`.
    pub fn with_default_snapshots(mut self, symbol: &str) -> Self {
        let dates: Vec<NaiveDate> = self
            .prices
            .get(symbol)
            .map(|s| s.iter().map(|(d, _)| *d).collect())
            .unwrap_or_default();
        for d in dates {
            let snap = scorable_snapshot(symbol, d);
            self.snapshots.insert((symbol.to_string(), d), snap);
        }
        self
    }
}

impl MarketDataPort for MockMarketPort {
    fn snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<IndicatorSnapshot>, SiftError> {
        Ok(self.snapshots.get(&(symbol.to_string(), date)).cloned())
    }

    fn price(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>, SiftError> {
        Ok(self
            .prices
            .get(symbol)
            .and_then(|s| s.iter().find(|(d, _)| *d == date).map(|(_, p)| *p)))
    }

    fn price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SiftError> {
        Ok(self
            .prices
            .get(symbol)
            .map(|s| {
                s.iter()
                    .filter(|(d, _)| *d >= start && *d <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_universe(&self) -> Result<Vec<String>, SiftError> {
        let mut symbols: Vec<String> = self.prices.keys().cloned().collect();
        for (symbol, _) in self.snapshots.keys() {
            if !symbols.contains(symbol) {
                symbols.push(symbol.clone());
            }
        }
        Ok(symbols)
    }
}

/// A snapshot carrying one metric of each mandatory class plus a handful of
/// optional ones, neutral-ish by default.
pub fn scorable_snapshot(symbol: &str, on: NaiveDate) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::new(symbol, on);
    snap.set_metric(Metric::LastClose, 100.0);
    snap.set_metric(Metric::PriceChange5d, 3.0);
    snap.set_metric(Metric::TrendSlope, 0.3);
    snap.set_metric(Metric::RelativeStrength, 0.7);
    snap.set_metric(Metric::Rsi, 55.0);
    snap.set_metric(Metric::VolumeRatio, 1.6);
    snap.set_metric(Metric::TurnoverRate, 4.0);
    snap.set_metric(Metric::AnnualVolatility, 25.0);
    snap.set_metric(Metric::AtrPercent, 3.0);
    snap
}

/// Definition with no filters, so every scorable symbol passes.
pub fn pass_all_strategy() -> StrategyDefinition {
    StrategyDefinition::new(
        "pass_all",
        "accepts everything scorable",
        WeightProfile::default(),
        FilterSet::default(),
    )
}

pub fn catalog_with(def: StrategyDefinition) -> StrategyCatalog {
    StrategyCatalog::builtin().with(def).unwrap()
}
