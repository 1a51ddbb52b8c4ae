//! Concrete port implementations.

pub mod console_sink;
pub mod csv_market_adapter;
pub mod csv_sink;
pub mod file_config_adapter;
pub mod snapshot_builder;
