use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use dcs_trend::analysis::{self, WindowStatistics};
use dcs_trend::config::{load_config, FormatRevision, IngestConfig};
use dcs_trend::discovery::expand_inputs;
use dcs_trend::export;
use dcs_trend::file_processor::{self, MergedIngest};
use dcs_trend::periods::PeriodRegistry;
use dcs_trend::utils::{format_instant, parse_instant, round3};
use dcs_trend::window::{self, TimeUnit};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Explore DCS historian exports", long_about = None)]
struct Cli {
    /// JSON ingest configuration; overrides --revision
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[clap(long, value_enum, default_value = "classic", global = true)]
    revision: FormatRevision,
    /// Enable point selection of the analysis range (--start/--end)
    #[clap(long, global = true)]
    point_selection: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show schema, variables, time bounds and ingest anomalies
    Inspect {
        #[clap(required = true)]
        inputs: Vec<String>,
    },
    /// Export the selected variables over a time range
    Export {
        #[clap(required = true)]
        inputs: Vec<String>,
        #[clap(long = "var")]
        variables: Vec<String>,
        #[clap(long, value_parser = parse_instant)]
        from: Option<NaiveDateTime>,
        #[clap(long, value_parser = parse_instant)]
        to: Option<NaiveDateTime>,
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Superpose windows starting at each period
    Overlay {
        #[clap(required = true)]
        inputs: Vec<String>,
        #[clap(long = "period", value_parser = parse_instant, required = true)]
        periods: Vec<NaiveDateTime>,
        #[clap(long, default_value_t = 24.0)]
        duration: f64,
        #[clap(long, value_enum, default_value = "hours")]
        unit: TimeUnit,
        #[clap(long = "var")]
        variables: Vec<String>,
        /// Directory receiving periods.csv, summaries.csv and overlay.csv
        #[clap(long)]
        out_dir: Option<PathBuf>,
    },
    /// Statistics and slopes of one variable over a window
    Analyze {
        #[clap(required = true)]
        inputs: Vec<String>,
        #[clap(long, value_parser = parse_instant)]
        period: NaiveDateTime,
        #[clap(long, default_value_t = 24.0)]
        duration: f64,
        #[clap(long, value_enum, default_value = "hours")]
        unit: TimeUnit,
        #[clap(long = "var")]
        variable: String,
        #[clap(long, value_parser = parse_instant, requires = "end")]
        start: Option<NaiveDateTime>,
        #[clap(long, value_parser = parse_instant, requires = "start")]
        end: Option<NaiveDateTime>,
        #[clap(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load ingest configuration {}", path.display()))?,
        None => IngestConfig::preset(cli.revision),
    };
    let config = if cli.point_selection {
        config.with_point_selection(true)
    } else {
        config
    };

    match cli.command {
        Command::Inspect { inputs } => inspect(&load(&inputs, &config)?),
        Command::Export {
            inputs,
            variables,
            from,
            to,
            out,
        } => {
            let ingest = load(&inputs, &config)?;
            let variables = resolve_variables(&ingest, variables)?;
            let view = ingest
                .table
                .select_variables(&variables)?
                .filter_optional_range(from, to);
            log::info!("Exporting {} rows x {} variables", view.row_count(), variables.len());
            export::write_table(&view, output(out.as_deref())?, config.delimiter_byte())?;
            Ok(())
        }
        Command::Overlay {
            inputs,
            periods,
            duration,
            unit,
            variables,
            out_dir,
        } => {
            let window_length = window_duration(unit, duration)?;
            let ingest = load(&inputs, &config)?;
            let variables = resolve_variables(&ingest, variables)?;
            let registry: PeriodRegistry = periods.into_iter().collect();
            let windows = window::overlay(&ingest.table, &registry, window_length, unit);
            log::info!(
                "{} of {} period windows hold observations",
                windows.len(),
                registry.len() * ingest.table.sources().len().max(1)
            );

            let mut summaries = Vec::new();
            for w in &windows {
                summaries.extend(analysis::summarize_window(w, &variables)?);
            }
            for summary in &summaries {
                if let Some(stats) = &summary.stats {
                    println!(
                        "{} | {} | n={} mean={} std={} min={} max={}",
                        summary.window,
                        summary.variable,
                        stats.count,
                        round3(stats.mean),
                        stats
                            .standard_deviation
                            .map(|s| round3(s).to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        round3(stats.min),
                        round3(stats.max)
                    );
                }
            }

            if let Some(dir) = out_dir {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
                let delimiter = config.delimiter_byte();
                export::write_periods(&registry, create(&dir.join("periods.csv"))?, delimiter)?;
                export::write_window_summaries(&summaries, create(&dir.join("summaries.csv"))?, delimiter)?;
                export::write_overlay(&windows, &variables, create(&dir.join("overlay.csv"))?, delimiter)?;
                log::info!("Wrote overlay exports to {}", dir.display());
            }
            Ok(())
        }
        Command::Analyze {
            inputs,
            period,
            duration,
            unit,
            variable,
            start,
            end,
            out,
        } => {
            let window_length = window_duration(unit, duration)?;
            let ingest = load(&inputs, &config)?;
            resolve_variables(&ingest, vec![variable.clone()])?;
            let picks = start.zip(end);
            let selector = analysis::point_selector(&config, picks);

            let mut registry = PeriodRegistry::new();
            registry.add(period);
            let windows = window::overlay(&ingest.table, &registry, window_length, unit);
            if windows.is_empty() {
                bail!(
                    "No observations in the {} {} window starting {}",
                    duration,
                    unit,
                    format_instant(&period)
                );
            }

            let mut results: Vec<WindowStatistics> = Vec::new();
            for w in &windows {
                let Some(range) = analysis::resolve_range(selector.as_ref(), w) else {
                    continue;
                };
                match analysis::analyze_range(&w.table, &variable, &range) {
                    Ok(stats) => {
                        print_statistics(&w.label(), &stats);
                        results.push(stats);
                    }
                    Err(e) => log::warn!("{}: {}", w.label(), e),
                }
            }

            if let Some(path) = out {
                export::write_analysis(&results, create(&path)?, config.delimiter_byte())?;
            }
            Ok(())
        }
    }
}

fn window_duration(unit: TimeUnit, amount: f64) -> Result<Duration> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Window duration must be a positive number, got {}", amount);
    }
    match unit.duration(amount) {
        Some(length) => Ok(length),
        None => bail!("Window duration of {} {} is out of range", amount, unit),
    }
}

fn load(inputs: &[String], config: &IngestConfig) -> Result<MergedIngest> {
    let paths = expand_inputs(inputs);
    if paths.is_empty() {
        bail!("No input files matched {:?}", inputs);
    }
    let ingest = file_processor::process_files(&paths, config).context("Ingest failed")?;
    for failure in &ingest.failures {
        eprintln!("WARN: skipped {}: {}", failure.path.display(), failure.error);
    }
    Ok(ingest)
}

/// Requested variables must be offered by every input; none means all.
fn resolve_variables(ingest: &MergedIngest, requested: Vec<String>) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(ingest.variables.clone());
    }
    for name in &requested {
        if !ingest.variables.contains(name) {
            bail!("Variable '{}' is not available in every input", name);
        }
    }
    Ok(requested)
}

fn inspect(ingest: &MergedIngest) -> Result<()> {
    for file in &ingest.files {
        let m = &file.metrics;
        println!(
            "{}: {} rows, {} columns, {} variables",
            file.source.as_deref().unwrap_or("input"),
            m.body_rows,
            file.schema.len(),
            file.labels.len()
        );
        println!(
            "  dropped header columns: {}, out-of-bounds header cells: {}, unparsable timestamps: {}, schema padded/truncated: {}/{}",
            m.header_columns_dropped,
            m.header_cells_out_of_bounds,
            m.unparsable_timestamps,
            m.schema_names_padded,
            m.schema_names_truncated
        );
    }
    match ingest.table.time_bounds() {
        Some((lo, hi)) => println!("Time range: {} .. {}", format_instant(&lo), format_instant(&hi)),
        None => println!("Time range: no parsable timestamps"),
    }
    println!("Variables ({}):", ingest.variables.len());
    for variable in &ingest.variables {
        println!("  {}", variable);
    }
    Ok(())
}

fn print_statistics(label: &str, stats: &WindowStatistics) {
    let fmt_opt = |v: Option<f64>| v.map(|x| round3(x).to_string()).unwrap_or_else(|| "undefined".to_string());
    println!("{} | {}", label, stats.variable);
    println!(
        "  range: {} .. {} ({} h, {} samples)",
        format_instant(&stats.range_start),
        format_instant(&stats.range_end),
        round3(stats.duration_hours()),
        stats.sample_count
    );
    println!(
        "  mean={} std={} min={} max={}",
        round3(stats.mean),
        fmt_opt(stats.standard_deviation),
        round3(stats.min),
        round3(stats.max)
    );
    println!(
        "  slope (endpoints)={} /h  slope (regression)={} /h",
        fmt_opt(stats.slope_endpoint),
        fmt_opt(stats.slope_regression)
    );
    if stats.degenerate {
        println!("  fewer than two distinct samples: slopes undefined");
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(create(p)?),
        None => Box::new(io::stdout().lock()),
    })
}
