//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::console_sink::ConsoleSink;
use crate::adapters::csv_market_adapter::CsvMarketAdapter;
use crate::adapters::csv_sink::CsvSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestEngine, BacktestOptions};
use crate::domain::config_validation::{
    parse_date, parse_holding_periods, parse_symbols, strategy_weights, validate_backtest_config,
    validate_data_config, validate_strategy_config, validate_universe_config,
};
use crate::domain::error::SiftError;
use crate::domain::filters::{Filter, FilterSet};
use crate::domain::selection::{self, SelectOptions, SelectionEngine, SelectionResult};
use crate::domain::strategy::{StrategyCatalog, StrategyDefinition};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::sink_port::SinkPort;

#[derive(Parser, Debug)]
#[command(name = "stocksift", about = "Short-horizon equity screener and strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Combine {
    Intersect,
    Union,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or more strategies over the configured universe
    Select {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy name; repeat for several (default: every catalog entry)
        #[arg(short, long)]
        strategy: Vec<String>,
        /// Selection date (default: last date with data)
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        max_results: Option<usize>,
        /// Combine multi-strategy results into one list
        #[arg(long)]
        combine: Option<Combine>,
        /// Directory for CSV output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay a strategy over a historical range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: String,
        /// Comma-separated holding periods, e.g. 1,3,5,10
        #[arg(long)]
        periods: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest several strategies and rank them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, required = true)]
        strategy: Vec<String>,
    },
    /// List catalog strategies
    Strategies,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Select {
            config,
            strategy,
            as_of,
            max_results,
            combine,
            output,
        } => run_select(
            &config,
            &strategy,
            as_of.as_deref(),
            max_results,
            combine,
            output.as_ref(),
        ),
        Command::Backtest {
            config,
            strategy,
            periods,
            output,
        } => run_backtest(&config, &strategy, periods.as_deref(), output.as_ref()),
        Command::Compare { config, strategy } => run_compare(&config, &strategy),
        Command::Strategies => run_strategies(),
        Command::Validate { config } => run_validate(&config),
    }
}

type ConfigCheck = fn(&dyn ConfigPort) -> Result<(), SiftError>;

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SiftError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Builtin catalog plus the config's ad-hoc `[strategy]` section, when one
/// is defined.
pub fn build_catalog(config: &dyn ConfigPort) -> Result<StrategyCatalog, SiftError> {
    let catalog = StrategyCatalog::builtin();
    match build_custom_strategy(config)? {
        Some(custom) => catalog.with(custom),
        None => Ok(catalog),
    }
}

/// An ad-hoc strategy from the `[strategy]` section. `None` when the
/// section has no name key.
pub fn build_custom_strategy(
    config: &dyn ConfigPort,
) -> Result<Option<StrategyDefinition>, SiftError> {
    let Some(name) = config.get_string("strategy", "name") else {
        return Ok(None);
    };
    let weights = strategy_weights(config)?;
    weights.validate()?;

    let mut filters = Vec::new();
    let min_score = config.get_double("strategy", "min_score", 0.0);
    if min_score > 0.0 {
        filters.push(Filter::MinScore(min_score));
    }
    let min_volume_ratio = config.get_double("strategy", "min_volume_ratio", 0.0);
    if min_volume_ratio > 0.0 {
        filters.push(Filter::MinVolumeRatio(min_volume_ratio));
    }
    let min_turnover = config.get_double("strategy", "min_turnover_rate", 0.0);
    if min_turnover > 0.0 {
        filters.push(Filter::MinTurnoverRate(min_turnover));
    }
    let min_change = config.get_double("strategy", "min_price_change_5d", f64::MIN);
    if min_change > f64::MIN {
        filters.push(Filter::MinPriceChange5d(min_change));
    }
    if config.get_string("strategy", "min_rsi").is_some()
        || config.get_string("strategy", "max_rsi").is_some()
    {
        filters.push(Filter::RsiRange {
            min: config.get_double("strategy", "min_rsi", 0.0),
            max: config.get_double("strategy", "max_rsi", 100.0),
        });
    }
    if config.get_string("strategy", "min_price").is_some()
        || config.get_string("strategy", "max_price").is_some()
    {
        filters.push(Filter::PriceRange {
            min: config.get_double("strategy", "min_price", 0.0),
            max: config.get_double("strategy", "max_price", f64::MAX),
        });
    }
    let max_volatility = config.get_double("strategy", "max_volatility", 0.0);
    if max_volatility > 0.0 {
        filters.push(Filter::MaxVolatilityScore(max_volatility));
    }
    if config.get_bool("strategy", "kdj_oversold", false) {
        filters.push(Filter::KdjOversold);
    }
    if config.get_bool("strategy", "price_above_ma20", false) {
        filters.push(Filter::PriceAboveMa20);
    }
    if config.get_bool("strategy", "ma_alignment", false) {
        filters.push(Filter::MaAlignment);
    }

    let mut definition = StrategyDefinition::new(
        name,
        config.get_string_or("strategy", "description", ""),
        weights,
        FilterSet::new(filters),
    );
    definition.max_results = config.get_int("strategy", "max_results", 50) as usize;
    Ok(Some(definition))
}

fn open_market(config: &dyn ConfigPort) -> Result<CsvMarketAdapter, SiftError> {
    let dir = config
        .get_string("data", "dir")
        .ok_or_else(|| SiftError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    let symbols = match config.get_string("universe", "symbols") {
        Some(s) => Some(parse_symbols(&s)?),
        None => None,
    };
    CsvMarketAdapter::open(PathBuf::from(dir).as_path(), symbols.as_deref())
}

/// The last date any universe symbol traded.
fn latest_trading_day(provider: &dyn MarketDataPort) -> Result<NaiveDate, SiftError> {
    let mut latest: Option<NaiveDate> = None;
    for symbol in provider.list_universe()? {
        let series = provider.price_series(&symbol, NaiveDate::MIN, NaiveDate::MAX)?;
        if let Some((date, _)) = series.last() {
            latest = Some(latest.map_or(*date, |d| d.max(*date)));
        }
    }
    latest.ok_or_else(|| SiftError::Data {
        reason: "no price data available".into(),
    })
}

fn run_select(
    config_path: &PathBuf,
    strategies: &[String],
    as_of: Option<&str>,
    max_results: Option<usize>,
    combine: Option<Combine>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let checks: &[ConfigCheck] = &[
        validate_data_config,
        validate_universe_config,
        validate_strategy_config,
    ];
    for validate in checks {
        if let Err(e) = validate(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let provider = match open_market(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let catalog = match build_catalog(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let as_of = match resolve_as_of(as_of, &config, &provider) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let names: Vec<String> = if strategies.is_empty() {
        match config.get_string("select", "strategies") {
            Some(s) => s.split(',').map(|s| s.trim().to_string()).collect(),
            None => catalog.names().map(String::from).collect(),
        }
    } else {
        strategies.to_vec()
    };

    eprintln!("Selecting as of {} with {} strategies", as_of, names.len());

    let engine = SelectionEngine::new(&catalog, &provider);
    let options = SelectOptions {
        weights: None,
        max_results,
    };
    let results = match engine.run_many(&names, as_of, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let console = ConsoleSink;
    let csv_sink = output.map(|dir| CsvSink::new(dir.clone()));

    let combined: Vec<SelectionResult> = match combine {
        Some(op) => {
            let inputs: Vec<&SelectionResult> = results.values().collect();
            let merged = match op {
                Combine::Intersect => selection::intersect(&inputs),
                Combine::Union => selection::union(&inputs),
            };
            vec![merged]
        }
        None => results.into_values().collect(),
    };

    for result in &combined {
        if let Err(e) = console.write_selection(result) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        if let Some(sink) = &csv_sink {
            if let Err(e) = sink.write_selection(result) {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }
    if let Some(dir) = output {
        eprintln!("CSV written to {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn resolve_as_of(
    flag: Option<&str>,
    config: &dyn ConfigPort,
    provider: &dyn MarketDataPort,
) -> Result<NaiveDate, SiftError> {
    let configured = flag
        .map(String::from)
        .or_else(|| config.get_string("select", "as_of"));
    match configured {
        Some(s) => parse_date(Some(&s), "select", "as_of"),
        None => latest_trading_day(provider),
    }
}

pub fn build_backtest_options(
    config: &dyn ConfigPort,
    periods_flag: Option<&str>,
) -> Result<BacktestOptions, SiftError> {
    let mut options = BacktestOptions::default();
    let periods = periods_flag
        .map(String::from)
        .or_else(|| config.get_string("backtest", "holding_periods"));
    if let Some(list) = periods {
        options.holding_periods = parse_holding_periods(&list)?;
    }
    options.min_days = config.get_int("backtest", "min_days", options.min_days as i64) as usize;
    options.step = config.get_int("backtest", "step", 1) as usize;
    let max_per_day = config.get_int("backtest", "max_per_day", 20);
    options.max_results_per_day = if max_per_day > 0 {
        Some(max_per_day as usize)
    } else {
        None
    };
    Ok(options)
}

fn backtest_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), SiftError> {
    let start = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "backtest",
        "start_date",
    )?;
    let end = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "backtest",
        "end_date",
    )?;
    Ok((start, end))
}

fn run_backtest(
    config_path: &PathBuf,
    strategy: &str,
    periods: Option<&str>,
    output: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let checks: &[ConfigCheck] = &[
        validate_data_config,
        validate_universe_config,
        validate_backtest_config,
        validate_strategy_config,
    ];
    for validate in checks {
        if let Err(e) = validate(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let provider = match open_market(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let catalog = match build_catalog(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let (start, end) = match backtest_range(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let options = match build_backtest_options(&config, periods) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "Backtesting {} from {} to {} (periods: {:?})",
        strategy, start, end, options.holding_periods
    );

    let engine = BacktestEngine::new(&catalog, &provider);
    let report = match engine.run(strategy, start, end, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let console = ConsoleSink;
    if let Err(e) = console.write_backtest(&report) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Some(dir) = output {
        let sink = CsvSink::new(dir.clone());
        if let Err(e) = sink.write_backtest(&report) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("CSV written to {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn run_compare(config_path: &PathBuf, strategies: &[String]) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let checks: &[ConfigCheck] = &[
        validate_data_config,
        validate_universe_config,
        validate_backtest_config,
        validate_strategy_config,
    ];
    for validate in checks {
        if let Err(e) = validate(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let provider = match open_market(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let catalog = match build_catalog(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let (start, end) = match backtest_range(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let options = match build_backtest_options(&config, None) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Comparing {} strategies from {} to {}", strategies.len(), start, end);

    let engine = BacktestEngine::new(&catalog, &provider);
    let reports = match engine.compare(strategies, start, end, &options) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    println!("=== Strategy Ranking ===");
    for (i, report) in reports.iter().enumerate() {
        if let Some(summary) = report.primary_summary() {
            println!(
                "{}. {}: mean {:.2}%, win rate {:.1}%, rating {}",
                i + 1,
                report.strategy,
                summary.mean_return * 100.0,
                summary.win_rate * 100.0,
                summary.rating,
            );
        }
    }
    println!();

    let console = ConsoleSink;
    if let Err(e) = console.write_comparison(&reports) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    ExitCode::SUCCESS
}

fn run_strategies() -> ExitCode {
    let catalog = StrategyCatalog::builtin();
    println!("Available strategies:");
    for def in catalog.iter() {
        println!("  {}: {}", def.name, def.description);
        println!(
            "    weights: technical {:.2}, momentum {:.2}, volume {:.2}, volatility {:.2}, sentiment {:.2}",
            def.weights.technical,
            def.weights.momentum,
            def.weights.volume,
            def.weights.volatility,
            def.weights.sentiment,
        );
        println!("    filters: {}", def.filters.filters.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let checks: &[ConfigCheck] = &[
        validate_data_config,
        validate_universe_config,
        validate_backtest_config,
        validate_strategy_config,
    ];
    for validate in checks {
        if let Err(e) = validate(&config) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    if let Ok(Some(custom)) = build_custom_strategy(&config) {
        eprintln!("Custom strategy: {}", custom.name);
        eprintln!("  filters: {}", custom.filters.filters.len());
    }

    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}
