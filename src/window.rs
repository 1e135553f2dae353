//! Period-anchored windows over an observation table, aligned on relative
//! time for overlay comparison.

use crate::data_models::{ObservationTable, PlotSeries};
use crate::errors::AnalysisError;
use crate::periods::PeriodRegistry;
use crate::utils::format_instant;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }

    /// `amount` of this unit, at millisecond resolution. `None` unless the
    /// amount is finite, positive and representable.
    pub fn duration(self, amount: f64) -> Option<Duration> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        let millis = (amount * self.seconds() * 1_000.0).round();
        if millis < 1.0 || millis >= i64::MAX as f64 {
            return None;
        }
        Duration::try_milliseconds(millis as i64)
    }

    /// `delta` expressed in this unit, not truncated.
    pub fn convert(self, delta: Duration) -> f64 {
        elapsed_seconds(delta) / self.seconds()
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn elapsed_seconds(delta: Duration) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// The rows of one table falling in `[period, period + duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowView {
    pub period: NaiveDateTime,
    pub duration: Duration,
    pub unit: TimeUnit,
    pub source: Option<String>,
    pub table: ObservationTable,
    /// Elapsed time since `period` for each row, in `unit`.
    pub relative_time: Vec<f64>,
}

impl WindowView {
    /// `None` when the window runs past the last representable instant.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.period.checked_add_signed(self.duration)
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Legend label: the period start, plus the source file for merged input.
    pub fn label(&self) -> String {
        match &self.source {
            Some(source) => format!("{} ({})", format_instant(&self.period), source),
            None => format_instant(&self.period),
        }
    }

    /// Relative-time/value pairs for one variable, missing values skipped.
    pub fn series(&self, variable: &str) -> Result<PlotSeries<f64>, AnalysisError> {
        let values = self.table.values(variable)?;
        let (x, y): (Vec<f64>, Vec<f64>) = self
            .relative_time
            .iter()
            .zip(values)
            .filter_map(|(t, v)| v.map(|v| (*t, v)))
            .unzip();
        Ok(PlotSeries {
            label: self.label(),
            x,
            y,
        })
    }
}

/// Extracts the window anchored at `period`. Left-closed, right-open: a row
/// stamped exactly at the end belongs to the next window. An end beyond the
/// calendar range leaves the window open-ended. Returns `None` when no row
/// falls inside.
pub fn extract_window(
    table: &ObservationTable,
    period: NaiveDateTime,
    duration: Duration,
    unit: TimeUnit,
) -> Option<WindowView> {
    let end = period.checked_add_signed(duration);
    let subset = table.filter_by_time(|t| *t >= period && end.map_or(true, |end| *t < end));
    if subset.is_empty() {
        return None;
    }

    let relative_time = subset
        .datetime()
        .iter()
        .map(|t| t.map(|t| unit.convert(t - period)).unwrap_or(f64::NAN))
        .collect();

    Some(WindowView {
        period,
        duration,
        unit,
        source: None,
        table: subset,
        relative_time,
    })
}

/// One window per registered period (and per source file for merged
/// tables), in registry order. Empty windows are skipped silently.
pub fn overlay(
    table: &ObservationTable,
    registry: &PeriodRegistry,
    duration: Duration,
    unit: TimeUnit,
) -> Vec<WindowView> {
    let partitions = table.partition_by_source();
    let mut windows = Vec::new();

    for period in registry.periods() {
        for (source, part) in &partitions {
            match extract_window(part, *period, duration, unit) {
                Some(mut window) => {
                    window.source = source.clone();
                    windows.push(window);
                }
                None => log::debug!(
                    "No observations in window starting {}{}",
                    format_instant(period),
                    source.as_deref().map(|s| format!(" ({})", s)).unwrap_or_default()
                ),
            }
        }
    }
    windows
}

/// Superposed series of one variable across windows.
pub fn overlay_series(windows: &[WindowView], variable: &str) -> Result<Vec<PlotSeries<f64>>, AnalysisError> {
    windows.iter().map(|w| w.series(variable)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::{Column, ColumnData};
    use crate::schema::ColumnKind;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_unit_conversion_is_fractional() {
        let delta = Duration::minutes(90);
        assert_relative_eq!(TimeUnit::Hours.convert(delta), 1.5);
        assert_relative_eq!(TimeUnit::Minutes.convert(delta), 90.0);
        assert_relative_eq!(TimeUnit::Days.convert(delta), 1.5 / 24.0);
        assert_relative_eq!(TimeUnit::Seconds.convert(Duration::milliseconds(250)), 0.25);
    }

    #[test]
    fn test_duration_from_amount() {
        assert_eq!(TimeUnit::Hours.duration(1.5), Some(Duration::minutes(90)));
        assert_eq!(TimeUnit::Days.duration(2.0), Some(Duration::hours(48)));
        assert_eq!(TimeUnit::Seconds.duration(0.5), Some(Duration::milliseconds(500)));
    }

    #[test]
    fn test_unusable_amounts_have_no_duration() {
        assert_eq!(TimeUnit::Hours.duration(0.0), None);
        assert_eq!(TimeUnit::Hours.duration(-2.0), None);
        assert_eq!(TimeUnit::Days.duration(-1e15), None);
        assert_eq!(TimeUnit::Days.duration(f64::NAN), None);
        assert_eq!(TimeUnit::Days.duration(f64::INFINITY), None);
        assert_eq!(TimeUnit::Days.duration(1e300), None);
    }

    #[test]
    fn test_window_past_calendar_range_is_open_ended() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let table = ObservationTable::new(
            vec![Column {
                name: "T".to_string(),
                kind: ColumnKind::Variable,
                data: ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]),
            }],
            vec![
                Some(start - Duration::hours(1)),
                Some(start),
                Some(start + Duration::days(400)),
            ],
            None,
        );

        let huge = TimeUnit::Days.duration(1e9).unwrap();
        let window = extract_window(&table, start, huge, TimeUnit::Days).unwrap();
        assert_eq!(window.end(), None);
        assert_eq!(window.row_count(), 2);
        assert_relative_eq!(window.relative_time[1], 400.0);
    }
}
