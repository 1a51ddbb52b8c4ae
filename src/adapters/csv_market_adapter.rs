//! CSV file market data adapter.
//!
//! Reads one `SYMBOL.csv` per symbol from a directory, columns
//! `date,open,high,low,close,volume[,turnover_rate]`, and serves prices and
//! derived snapshots. All files load eagerly at open so every port method is
//! a pure lookup afterwards.

use crate::adapters::snapshot_builder::build_snapshot;
use crate::domain::error::SiftError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::snapshot::IndicatorSnapshot;
use crate::ports::market_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CsvMarketAdapter {
    bars: BTreeMap<String, Vec<OhlcvBar>>,
    index: HashMap<String, HashMap<NaiveDate, usize>>,
}

impl CsvMarketAdapter {
    /// Load every `*.csv` in `dir`, optionally restricted to `symbols`.
    pub fn open(dir: &Path, symbols: Option<&[String]>) -> Result<Self, SiftError> {
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let symbol = stem.to_uppercase();
            if let Some(wanted) = symbols {
                if !wanted.contains(&symbol) {
                    continue;
                }
            }
            files.push((symbol, path));
        }

        if files.is_empty() {
            return Err(SiftError::Data {
                reason: format!("no CSV data files found in {}", dir.display()),
            });
        }

        let mut bars = BTreeMap::new();
        let mut index = HashMap::new();
        for (symbol, path) in files {
            let mut series = load_file(&symbol, &path)?;
            series.sort_by_key(|b| b.date);
            let by_date: HashMap<NaiveDate, usize> = series
                .iter()
                .enumerate()
                .map(|(i, bar)| (bar.date, i))
                .collect();
            index.insert(symbol.clone(), by_date);
            bars.insert(symbol, series);
        }

        Ok(Self { bars, index })
    }

    /// Fraction of loaded symbols whose close rose on `date`, among those
    /// with a bar that day and a prior bar.
    fn breadth(&self, date: NaiveDate) -> Option<f64> {
        let mut rising = 0usize;
        let mut total = 0usize;
        for (symbol, series) in &self.bars {
            let Some(&i) = self.index[symbol].get(&date) else {
                continue;
            };
            if i == 0 {
                continue;
            }
            total += 1;
            if series[i].close > series[i - 1].close {
                rising += 1;
            }
        }
        if total > 0 {
            Some(rising as f64 / total as f64)
        } else {
            None
        }
    }
}

fn load_file(symbol: &str, path: &Path) -> Result<Vec<OhlcvBar>, SiftError> {
    let content = fs::read_to_string(path).map_err(|e| SiftError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| SiftError::Data {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?;

        let date_str = record.get(0).ok_or_else(|| SiftError::Data {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            SiftError::Data {
                reason: format!("{}: invalid date: {}", path.display(), e),
            }
        })?;

        let field = |i: usize, name: &str| -> Result<f64, SiftError> {
            record
                .get(i)
                .ok_or_else(|| SiftError::Data {
                    reason: format!("{}: missing {name} column", path.display()),
                })?
                .parse()
                .map_err(|e| SiftError::Data {
                    reason: format!("{}: invalid {name} value: {}", path.display(), e),
                })
        };

        let turnover_rate = match record.get(6) {
            Some(s) if !s.trim().is_empty() => Some(field(6, "turnover_rate")?),
            _ => None,
        };

        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: field(5, "volume")?,
            turnover_rate,
        });
    }

    Ok(bars)
}

impl MarketDataPort for CsvMarketAdapter {
    fn snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<IndicatorSnapshot>, SiftError> {
        let Some(series) = self.bars.get(symbol) else {
            return Ok(None);
        };
        let Some(&i) = self.index[symbol].get(&date) else {
            return Ok(None);
        };
        Ok(build_snapshot(symbol, &series[..=i], self.breadth(date)))
    }

    fn price(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>, SiftError> {
        let Some(series) = self.bars.get(symbol) else {
            return Ok(None);
        };
        Ok(self.index[symbol].get(&date).map(|&i| series[i].close))
    }

    fn price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SiftError> {
        Ok(self
            .bars
            .get(symbol)
            .map(|series| {
                series
                    .iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .map(|b| (b.date, b.close))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_universe(&self) -> Result<Vec<String>, SiftError> {
        Ok(self.bars.keys().cloned().collect())
    }
}
