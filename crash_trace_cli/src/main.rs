mod chart;
mod text_guard;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use crash_trace::columns::TIMESTAMP;
use crash_trace::report::{
    detail_table, diagnosis_block, format_value, summary_table, DEFAULT_TAIL_ROWS,
};
use crash_trace::{
    analyze, inspect_headers, load_telemetry, parse_csv, CrashWindow, Frame, HEADER_MAP,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::chart::{render_chart, DEFAULT_OUTPUT};

const DEFAULT_INPUT: &str = "telemetry.csv";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Chart and diagnose the lead-up to a GPU crash from overlay telemetry",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    analyze: AnalyzeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print statistics, render the crash chart and diagnose the crash point (default)
    Analyze(AnalyzeArgs),
    /// Show how each source header maps and how many of its cells parse
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Telemetry CSV exported by the overlay
    #[arg(default_value = DEFAULT_INPUT, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output chart path (`.svg` selects the SVG backend)
    #[arg(short, long, default_value = DEFAULT_OUTPUT, value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Cell value that marks a missing sample
    #[arg(long, default_value = crash_trace::DEFAULT_NA_TOKEN)]
    na_token: String,

    /// Trailing rows shown in the detail table
    #[arg(long, default_value_t = DEFAULT_TAIL_ROWS)]
    tail: usize,

    /// Skip chart rendering
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Print the analysis as one JSON document instead of text tables
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Telemetry CSV to inspect
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Cell value that marks a missing sample
    #[arg(long, default_value = crash_trace::DEFAULT_NA_TOKEN)]
    na_token: String,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Some(Command::Analyze(args)) => args.verbose,
        Some(Command::Inspect(args)) => args.verbose,
        None => cli.analyze.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Some(Command::Analyze(args)) => handle_analyze(args),
        Some(Command::Inspect(args)) => handle_inspect(args),
        None => handle_analyze(cli.analyze),
    }
}

fn read_log(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_frame(path: &Path, na_token: &str) -> Result<Frame> {
    let data = read_log(path)?;
    let frame = load_telemetry(&data, na_token)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(frame)
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let t_load = Instant::now();
    let frame = load_frame(&args.input, &args.na_token)?;
    info!(
        "Loaded {} samples, {} columns from {}",
        frame.len(),
        frame.columns().len(),
        args.input.display()
    );
    for column in frame.columns() {
        if column.name != TIMESTAMP && !HEADER_MAP.iter().any(|(_, c)| *c == column.name) {
            debug!("Unmapped column kept as-is: {}", column.name);
        }
    }
    debug!("Load stage: {:.1} ms", t_load.elapsed().as_secs_f64() * 1000.0);

    let analysis = analyze(&frame)
        .with_context(|| format!("failed to analyze {}", args.input.display()))?;
    for name in analysis.summary.empty_columns() {
        warn!("Column '{}' has no numeric samples", name);
    }
    info!(
        "Crash window: rows {}..={}",
        analysis.window.start, analysis.window.end
    );

    if args.json {
        write_chart(&args, &frame, &analysis.window)?;
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("{}", summary_table(&analysis.summary));
    println!("{}", detail_table(&frame, args.tail));

    write_chart(&args, &frame, &analysis.window)?;

    match analysis.diagnosis.as_ref() {
        Some(diagnosis) => {
            info!(
                "Last FPS sample at row {} ({} suspicion(s))",
                diagnosis.row,
                diagnosis.suspicions.len()
            );
            print!("{}", diagnosis_block(diagnosis));
        }
        None => info!("No FPS samples in {}; diagnosis skipped", args.input.display()),
    }
    Ok(())
}

fn write_chart(args: &AnalyzeArgs, frame: &Frame, window: &CrashWindow) -> Result<()> {
    if args.no_plot {
        return Ok(());
    }
    let t_plot = Instant::now();
    render_chart(frame, window, &args.output)?;
    info!("Wrote chart: {}", args.output.display());
    debug!("Plot stage: {:.1} ms", t_plot.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let data = read_log(&args.input)?;
    let raw = parse_csv(&data, &args.na_token)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    let reports = inspect_headers(&raw);

    let mut report = String::new();
    report.push_str(&format!("FILE: {}\n", args.input.display()));
    report.push_str(&format!("  rows: {}\n", raw.len()));
    report.push_str("  columns:\n");
    for entry in &reports {
        let target = entry
            .canonical
            .as_deref()
            .map_or_else(|| "(unmapped)".to_string(), |c| format!("-> {}", c));
        report.push_str(&format!(
            "    - {} {}: numeric={}, missing={}, unparseable={}, min={}, max={}\n",
            entry.header,
            target,
            entry.numeric,
            entry.missing,
            entry.unparseable,
            format_value(entry.min, 3),
            format_value(entry.max, 3)
        ));
    }

    let absent: Vec<&str> = HEADER_MAP
        .iter()
        .filter(|(source, _)| !reports.iter().any(|r| r.header == *source))
        .map(|(_, canonical)| *canonical)
        .collect();
    if !absent.is_empty() {
        report.push_str(&format!("  absent metrics: {}\n", absent.join(", ")));
    }

    print!("{}", report);
    info!("Inspected {} columns", reports.len());
    Ok(())
}
