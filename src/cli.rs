//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{run_analysis, AnalysisConfig, RegimeReport};
use crate::domain::combine::{CombineOptions, ZeroWeightPolicy};
use crate::domain::config_validation::{
    factor_section, parse_period_list, validate_analysis_config, validate_indicator_config,
};
use crate::domain::error::RegimeError;
use crate::domain::factor::{FactorId, FactorKind};
use crate::domain::indicator::{
    asi, bias, bollinger, compute_indicator, kdj, macd, standard_set, IndicatorSeries,
    IndicatorType,
};
use crate::domain::ohlcv::{OhlcvBar, TimeInterval};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_PERIOD: u32 = 1;

#[derive(Parser, Debug)]
#[command(name = "regimescore", about = "Market regime scoring from OHLC bars")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Where bars come from. Flags override the `[data]` config section.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub symbol: Option<String>,
    /// Bar period in minutes
    #[arg(long)]
    pub period: Option<u32>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the composite regime score series
    Score {
        #[command(flatten)]
        data: DataArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Behaviour on zero total weight: fail or neutral
        #[arg(long)]
        zero_weight: Option<ZeroWeightPolicy>,
    },
    /// Write every factor's opinion series
    Factors {
        #[command(flatten)]
        data: DataArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the indicator table
    Indicators {
        #[command(flatten)]
        data: DataArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the factor correlation matrix
    Correlation {
        #[command(flatten)]
        data: DataArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with data for a bar period
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        period: Option<u32>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Show the data range of a symbol
    Info {
        #[command(flatten)]
        data: DataArgs,
    },
}

pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "regimescore=warn",
        1 => "regimescore=debug",
        _ => "regimescore=trace",
    };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatches one subcommand.
pub fn execute(command: Command) -> Result<(), RegimeError> {
    match command {
        Command::Score {
            data,
            output,
            zero_weight,
        } => run_score(&data, output.as_deref(), zero_weight),
        Command::Factors { data, output } => run_factors(&data, output.as_deref()),
        Command::Indicators { data, output } => run_indicators(&data, output.as_deref()),
        Command::Correlation { data, output } => run_correlation(&data, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols {
            config,
            period,
            data_dir,
        } => run_list_symbols(&DataArgs {
            config,
            period,
            data_dir,
            symbol: None,
        }),
        Command::Info { data } => run_info(&data),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RegimeError> {
    FileConfigAdapter::from_file(path).map_err(|e| RegimeError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_optional_config(path: Option<&Path>) -> Result<FileConfigAdapter, RegimeError> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            let config = load_config(p)?;
            validate_analysis_config(&config)?;
            Ok(config)
        }
        None => FileConfigAdapter::from_string("").map_err(|reason| RegimeError::ConfigParse {
            file: "<empty>".into(),
            reason,
        }),
    }
}

/// Resolved data location for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub dir: PathBuf,
    pub symbol: Option<String>,
    pub period: u32,
}

pub fn resolve_data_source(args: &DataArgs, config: &dyn ConfigPort) -> DataSource {
    let dir = args
        .data_dir
        .clone()
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let symbol = args
        .symbol
        .clone()
        .or_else(|| config.get_string("data", "symbol"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let period = args.period.unwrap_or_else(|| {
        let p = config.get_int("data", "period", DEFAULT_PERIOD as i64);
        u32::try_from(p).unwrap_or(DEFAULT_PERIOD)
    });
    DataSource {
        dir,
        symbol,
        period,
    }
}

fn require_symbol(source: &DataSource) -> Result<&str, RegimeError> {
    source
        .symbol
        .as_deref()
        .ok_or_else(|| RegimeError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })
}

/// Factor set and combination options from the config. Without any
/// `[factor.*]` section the preset blend is used.
pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, RegimeError> {
    let zero_weight = match config.get_string("combine", "zero_weight") {
        Some(v) => v.parse().map_err(|reason| RegimeError::ConfigInvalid {
            section: "combine".into(),
            key: "zero_weight".into(),
            reason,
        })?,
        None => ZeroWeightPolicy::default(),
    };
    let combine = CombineOptions { zero_weight };

    let mut factors = Vec::new();
    for id in FactorId::ALL {
        let Some(section) = factor_section(config, id) else {
            continue;
        };
        let weight = config.get_double(&section, "weight", 1.0);
        factors.push((factor_kind(config, &section, id), weight));
    }

    if factors.is_empty() {
        return Ok(AnalysisConfig {
            combine,
            ..AnalysisConfig::preset()
        });
    }
    Ok(AnalysisConfig { factors, combine })
}

fn get_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    usize::try_from(config.get_int(section, key, default as i64)).unwrap_or(default)
}

fn factor_kind(config: &dyn ConfigPort, section: &str, id: FactorId) -> FactorKind {
    let defaults = FactorKind::default_for(id);
    let period = get_usize(config, section, "period", defaults.period());
    match defaults {
        FactorKind::Trend(p) => {
            let mut params = p;
            params.period = period;
            params.fast = get_usize(config, section, "fast_period", p.fast);
            params.slow = get_usize(config, section, "slow_period", p.slow);
            params.signal = get_usize(config, section, "signal_period", p.signal);
            FactorKind::Trend(params)
        }
        FactorKind::Momentum { .. } => FactorKind::Momentum { period },
        FactorKind::Rsi { .. } => FactorKind::Rsi { period },
        FactorKind::Cci { .. } => FactorKind::Cci { period },
        FactorKind::Boll { std_dev, .. } => FactorKind::Boll {
            period,
            std_dev: config.get_double(section, "std_dev", std_dev),
        },
        FactorKind::Volatility { .. } => FactorKind::Volatility { period },
    }
}

/// Indicator lines for the indicator table, from `[indicators]` over the
/// standard set.
pub fn build_indicator_set(config: &dyn ConfigPort) -> Result<Vec<IndicatorType>, RegimeError> {
    const SECTION: &str = "indicators";
    if !config.has_section(SECTION) {
        return Ok(standard_set());
    }

    let periods = |key: &str, default: &[usize]| -> Result<Vec<usize>, RegimeError> {
        match config.get_string(SECTION, key) {
            Some(v) => parse_period_list(&v).map_err(|reason| RegimeError::ConfigInvalid {
                section: SECTION.into(),
                key: key.into(),
                reason,
            }),
            None => Ok(default.to_vec()),
        }
    };

    let (b1, b2, b3) = bias::DEFAULT_PERIODS;
    let mut set: Vec<IndicatorType> = periods("ma_periods", &[5, 10, 20, 30, 60])?
        .into_iter()
        .map(IndicatorType::Ma)
        .collect();
    set.extend(periods("rsi_periods", &[12, 16, 24])?.into_iter().map(IndicatorType::Rsi));
    set.extend(periods("cci_periods", &[14, 20, 88])?.into_iter().map(IndicatorType::Cci));
    set.extend(periods("bias_periods", &[b1, b2, b3])?.into_iter().map(IndicatorType::Bias));

    let std_dev = config.get_double(SECTION, "boll_std_dev", bollinger::DEFAULT_STD_DEV);
    set.push(IndicatorType::Bollinger {
        period: get_usize(config, SECTION, "boll_period", bollinger::DEFAULT_PERIOD),
        stddev_mult_x100: (std_dev * 100.0).round() as u32,
    });
    set.push(IndicatorType::Kdj {
        n: get_usize(config, SECTION, "kdj_n", kdj::DEFAULT_N),
        m1: get_usize(config, SECTION, "kdj_m1", kdj::DEFAULT_M1),
        m2: get_usize(config, SECTION, "kdj_m2", kdj::DEFAULT_M2),
    });
    set.push(IndicatorType::Macd {
        fast: get_usize(config, SECTION, "macd_fast", macd::DEFAULT_FAST),
        slow: get_usize(config, SECTION, "macd_slow", macd::DEFAULT_SLOW),
        signal: get_usize(config, SECTION, "macd_signal", macd::DEFAULT_SIGNAL),
    });
    set.push(IndicatorType::Asi {
        asit_period: get_usize(config, SECTION, "asit_period", asi::DEFAULT_ASIT_PERIOD),
    });
    Ok(set)
}

fn fetch_bars(data_port: &dyn DataPort, symbol: &str, period: u32) -> Result<Vec<OhlcvBar>, RegimeError> {
    let bars = data_port.fetch_bars(symbol, period)?;
    if bars.is_empty() {
        return Err(RegimeError::NoData {
            symbol: symbol.to_string(),
        });
    }
    eprintln!(
        "Loaded {} {} bars for {}",
        bars.len(),
        TimeInterval::from_period(period),
        symbol
    );
    Ok(bars)
}

/// Runs the configured analysis for one symbol.
pub fn analyze(
    data_port: &dyn DataPort,
    symbol: &str,
    period: u32,
    config: &AnalysisConfig,
) -> Result<RegimeReport, RegimeError> {
    let bars = fetch_bars(data_port, symbol, period)?;
    let minimum = config.minimum_bars();
    if bars.len() < minimum {
        return Err(RegimeError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum,
        });
    }

    eprintln!("Scoring {} factors...", config.factors.len());
    let report = run_analysis(&bars, config)?;
    if report.composite.is_empty() {
        return Err(RegimeError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum,
        });
    }
    Ok(report)
}

fn prepare(
    args: &DataArgs,
    zero_weight: Option<ZeroWeightPolicy>,
) -> Result<(DataSource, AnalysisConfig), RegimeError> {
    let config = load_optional_config(args.config.as_deref())?;
    let source = resolve_data_source(args, &config);
    let mut analysis = build_analysis_config(&config)?;
    if let Some(policy) = zero_weight {
        analysis.combine.zero_weight = policy;
    }
    Ok((source, analysis))
}

/// Runs `write` against the output file, or stdout when none is given.
fn with_output(
    output: Option<&Path>,
    write: impl FnOnce(&mut dyn Write) -> Result<(), RegimeError>,
) -> Result<(), RegimeError> {
    match output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            write(&mut file)?;
            eprintln!("Written to: {}", path.display());
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}

fn run_score(
    args: &DataArgs,
    output: Option<&Path>,
    zero_weight: Option<ZeroWeightPolicy>,
) -> Result<(), RegimeError> {
    let (source, analysis) = prepare(args, zero_weight)?;
    let symbol = require_symbol(&source)?;
    let data_port = CsvAdapter::new(source.dir.clone());
    let report = analyze(&data_port, symbol, source.period, &analysis)?;

    with_output(output, |out| {
        CsvReportAdapter::default().write_scores(&report.composite, out)
    })?;

    if let Some(summary) = report.summary() {
        eprintln!("\n=== Regime Score ===");
        if let Some(latest) = report.latest() {
            eprintln!(
                "Latest:           {:.4} ({} factors, {})",
                latest.composite_score, latest.factor_count, latest.timestamp
            );
        }
        eprintln!("Points:           {}", summary.count);
        eprintln!("Mean:             {:.4}", summary.mean);
        eprintln!("Range:            {:.4} .. {:.4}", summary.min, summary.max);
        eprintln!("Buy threshold:    {:.4} (70th pct)", summary.buy_threshold);
        eprintln!("Sell threshold:   {:.4} (30th pct)", summary.sell_threshold);
    }
    Ok(())
}

fn run_factors(args: &DataArgs, output: Option<&Path>) -> Result<(), RegimeError> {
    let (source, analysis) = prepare(args, None)?;
    let symbol = require_symbol(&source)?;
    let data_port = CsvAdapter::new(source.dir.clone());
    let report = analyze(&data_port, symbol, source.period, &analysis)?;

    for ((kind, weight), results) in analysis.factors.iter().zip(&report.factors) {
        eprintln!("  {:<24} weight {:<5} {} points", kind.to_string(), weight, results.len());
    }
    with_output(output, |out| {
        CsvReportAdapter::default().write_factors(&report.factors, out)
    })
}

fn run_correlation(args: &DataArgs, output: Option<&Path>) -> Result<(), RegimeError> {
    let (source, analysis) = prepare(args, None)?;
    let symbol = require_symbol(&source)?;
    let data_port = CsvAdapter::new(source.dir.clone());
    let report = analyze(&data_port, symbol, source.period, &analysis)?;

    if report.correlation.is_empty() {
        eprintln!("Correlation needs at least two factors with data");
    }
    with_output(output, |out| {
        CsvReportAdapter::default().write_correlation(&report.correlation, out)
    })
}

fn run_indicators(args: &DataArgs, output: Option<&Path>) -> Result<(), RegimeError> {
    let config = load_optional_config(args.config.as_deref())?;
    validate_indicator_config(&config)?;
    let source = resolve_data_source(args, &config);
    let symbol = require_symbol(&source)?;
    let indicator_types = build_indicator_set(&config)?;

    let data_port = CsvAdapter::new(source.dir.clone());
    let bars = fetch_bars(&data_port, symbol, source.period)?;
    let series: Vec<IndicatorSeries> = indicator_types
        .iter()
        .map(|t| compute_indicator(&bars, t))
        .collect();
    eprintln!("Computed {} indicators", series.len());

    with_output(output, |out| {
        CsvReportAdapter::default().write_indicators(&series, out)
    })
}

fn run_validate(config_path: &Path) -> Result<(), RegimeError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_analysis_config(&config)?;
    validate_indicator_config(&config)?;

    let analysis = build_analysis_config(&config)?;
    analysis.registry()?;

    eprintln!("\nFactors:");
    for (kind, weight) in &analysis.factors {
        eprintln!("  {:<24} weight {}", kind.to_string(), weight);
    }
    eprintln!("Zero total weight: {}", analysis.combine.zero_weight);

    let mut indicators: Vec<String> = build_indicator_set(&config)?
        .iter()
        .map(|t| t.to_string())
        .collect();
    indicators.sort();
    eprintln!("\nIndicators:");
    for ind in &indicators {
        eprintln!("  {}", ind);
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(args: &DataArgs) -> Result<(), RegimeError> {
    let config = load_optional_config(args.config.as_deref())?;
    let source = resolve_data_source(args, &config);
    let data_port = CsvAdapter::new(source.dir.clone());

    let symbols = data_port.list_symbols(source.period)?;
    if symbols.is_empty() {
        eprintln!(
            "No symbols found for {} bars in {}",
            TimeInterval::from_period(source.period),
            source.dir.display()
        );
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(args: &DataArgs) -> Result<(), RegimeError> {
    let config = load_optional_config(args.config.as_deref())?;
    let source = resolve_data_source(args, &config);
    let data_port = CsvAdapter::new(source.dir.clone());

    let symbols = match &source.symbol {
        Some(s) => vec![s.clone()],
        None => data_port.list_symbols(source.period)?,
    };
    let interval = TimeInterval::from_period(source.period);
    for symbol in &symbols {
        match data_port.get_data_range(symbol, source.period)? {
            Some((first, last, count)) => {
                println!("{} ({}): {} bars, {} to {}", symbol, interval, count, first, last);
            }
            None => eprintln!("{} ({}): no data found", symbol, interval),
        }
    }
    Ok(())
}
