//! Result sink port trait.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::SiftError;
use crate::domain::selection::SelectionResult;

/// Port for persisting or rendering selections and backtest results.
pub trait SinkPort {
    fn write_selection(&self, result: &SelectionResult) -> Result<(), SiftError>;

    fn write_backtest(&self, report: &BacktestReport) -> Result<(), SiftError>;

    /// Default implementation: writes each report in ranked order.
    fn write_comparison(&self, reports: &[BacktestReport]) -> Result<(), SiftError> {
        for report in reports {
            self.write_backtest(report)?;
        }
        Ok(())
    }
}
