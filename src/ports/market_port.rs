//! Market data access port trait.
//!
//! Implementations must return only information available up to and
//! including the requested date; the backtest engine relies on this for its
//! no-look-ahead guarantee. `None` means missing data for that symbol/date
//! and is treated as exclusion, never as an error.

use crate::domain::error::SiftError;
use crate::domain::snapshot::IndicatorSnapshot;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Indicator snapshot for a symbol as of a date.
    fn snapshot(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<IndicatorSnapshot>, SiftError>;

    /// Close price for a symbol on an exact trading date.
    fn price(&self, symbol: &str, date: NaiveDate) -> Result<Option<f64>, SiftError>;

    /// Ordered (date, close) sequence for a symbol within [start, end].
    fn price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SiftError>;

    /// The tradable symbol set for this run.
    fn list_universe(&self) -> Result<Vec<String>, SiftError>;
}
