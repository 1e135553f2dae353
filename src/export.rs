//! Delimited-text snapshots of tables, periods, window summaries, overlays
//! and single-range analyses. Statistics are rounded to 3 decimals here;
//! table cells are written at full precision.

use crate::analysis::{WindowStatistics, WindowSummary};
use crate::data_models::{ObservationTable, DATETIME_COLUMN, SOURCE_COLUMN};
use crate::errors::ExportError;
use crate::periods::PeriodRegistry;
use crate::utils::{format_instant, round3, round3_opt};
use crate::window::WindowView;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;

fn writer<W: Write>(out: W, delimiter: u8) -> csv::Writer<W> {
    WriterBuilder::new().delimiter(delimiter).from_writer(out)
}

/// (a) The current table or filtered view.
pub fn write_table<W: Write>(table: &ObservationTable, out: W, delimiter: u8) -> Result<(), ExportError> {
    let mut wtr = writer(out, delimiter);

    let mut header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    header.push(DATETIME_COLUMN);
    let source = table.source();
    if source.is_some() {
        header.push(SOURCE_COLUMN);
    }
    wtr.write_record(&header)?;

    for row in 0..table.row_count() {
        let mut record: Vec<String> = table.columns().iter().map(|c| c.data.render(row)).collect();
        record.push(
            table.datetime()[row]
                .as_ref()
                .map(format_instant)
                .unwrap_or_default(),
        );
        if let Some(source) = source {
            record.push(source[row].clone());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct PeriodRecord {
    index: usize,
    period: String,
}

/// (b) The registered periods, in registry order.
pub fn write_periods<W: Write>(registry: &PeriodRegistry, out: W, delimiter: u8) -> Result<(), ExportError> {
    let mut wtr = writer(out, delimiter);
    for (index, period) in registry.periods().iter().enumerate() {
        wtr.serialize(PeriodRecord {
            index: index + 1,
            period: format_instant(period),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SummaryRecord<'a> {
    window: &'a str,
    period: String,
    source: Option<&'a str>,
    variable: &'a str,
    count: usize,
    mean: Option<f64>,
    standard_deviation: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

/// (c) Per-window summary statistics.
pub fn write_window_summaries<W: Write>(
    summaries: &[WindowSummary],
    out: W,
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut wtr = writer(out, delimiter);
    for summary in summaries {
        let stats = summary.stats.as_ref();
        wtr.serialize(SummaryRecord {
            window: &summary.window,
            period: format_instant(&summary.period),
            source: summary.source.as_deref(),
            variable: &summary.variable,
            count: stats.map(|s| s.count).unwrap_or(0),
            mean: stats.map(|s| round3(s.mean)),
            standard_deviation: stats.and_then(|s| round3_opt(s.standard_deviation)),
            min: stats.map(|s| round3(s.min)),
            max: stats.map(|s| round3(s.max)),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// (d) Superposed window series in long format, one row per observation.
pub fn write_overlay<W: Write, S: AsRef<str>>(
    windows: &[WindowView],
    variables: &[S],
    out: W,
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut wtr = writer(out, delimiter);
    let unit = windows.first().map(|w| w.unit.label()).unwrap_or("h");

    let relative_header = format!("RelativeTime [{}]", unit);
    let mut header = vec!["Period", "Source", relative_header.as_str(), DATETIME_COLUMN];
    header.extend(variables.iter().map(|v| v.as_ref()));
    wtr.write_record(&header)?;

    for window in windows {
        let columns = variables
            .iter()
            .map(|v| window.table.values(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let period = format_instant(&window.period);
        let source = window.source.clone().unwrap_or_default();

        for row in 0..window.row_count() {
            let mut record = vec![
                period.clone(),
                source.clone(),
                window.relative_time[row].to_string(),
                window.table.datetime()[row]
                    .as_ref()
                    .map(format_instant)
                    .unwrap_or_default(),
            ];
            record.extend(
                columns
                    .iter()
                    .map(|values| values[row].map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct AnalysisRecord<'a> {
    variable: &'a str,
    range_start: String,
    range_end: String,
    duration_hours: f64,
    sample_count: usize,
    mean: f64,
    standard_deviation: Option<f64>,
    min: f64,
    max: f64,
    slope_endpoint_per_hour: Option<f64>,
    slope_regression_per_hour: Option<f64>,
    degenerate: bool,
}

/// (e) Results of single-range analyses.
pub fn write_analysis<W: Write>(results: &[WindowStatistics], out: W, delimiter: u8) -> Result<(), ExportError> {
    let mut wtr = writer(out, delimiter);
    for stats in results {
        wtr.serialize(AnalysisRecord {
            variable: &stats.variable,
            range_start: format_instant(&stats.range_start),
            range_end: format_instant(&stats.range_end),
            duration_hours: round3(stats.duration_hours()),
            sample_count: stats.sample_count,
            mean: round3(stats.mean),
            standard_deviation: round3_opt(stats.standard_deviation),
            min: round3(stats.min),
            max: round3(stats.max),
            slope_endpoint_per_hour: round3_opt(stats.slope_endpoint),
            slope_regression_per_hour: round3_opt(stats.slope_regression),
            degenerate: stats.degenerate,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
