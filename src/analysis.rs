//! Descriptive statistics and trend slopes over a refined analysis range.

use crate::config::IngestConfig;
use crate::data_models::ObservationTable;
use crate::errors::AnalysisError;
use crate::window::{elapsed_seconds, WindowView};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Inclusive sub-interval of one window. Reversed input is swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl AnalysisRange {
    pub fn new(p1: NaiveDateTime, p2: NaiveDateTime) -> Self {
        if p1 <= p2 {
            Self { start: p1, end: p2 }
        } else {
            Self { start: p2, end: p1 }
        }
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Picks the refined analysis range inside a window.
pub trait PointSelector {
    fn is_enabled(&self) -> bool;
    fn select(&self, window: &WindowView) -> Option<AnalysisRange>;
}

/// Used when point selection is switched off: never narrows the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPointSelector;

impl PointSelector for DisabledPointSelector {
    fn is_enabled(&self) -> bool {
        false
    }

    fn select(&self, _window: &WindowView) -> Option<AnalysisRange> {
        None
    }
}

/// Two picked instants, in either order.
#[derive(Debug, Clone, Copy)]
pub struct RangePointSelector {
    pub first: NaiveDateTime,
    pub second: NaiveDateTime,
}

impl PointSelector for RangePointSelector {
    fn is_enabled(&self) -> bool {
        true
    }

    fn select(&self, _window: &WindowView) -> Option<AnalysisRange> {
        Some(AnalysisRange::new(self.first, self.second))
    }
}

/// Chooses the selector from the configured capability flag.
pub fn point_selector(
    config: &IngestConfig,
    picks: Option<(NaiveDateTime, NaiveDateTime)>,
) -> Box<dyn PointSelector> {
    match (config.point_selection, picks) {
        (true, Some((first, second))) => Box::new(RangePointSelector { first, second }),
        (false, Some(_)) => {
            log::warn!("Point selection is disabled in the configuration; analysing the whole window");
            Box::new(DisabledPointSelector)
        }
        _ => Box::new(DisabledPointSelector),
    }
}

/// The selector's range, or the window's own time span when it declines.
pub fn resolve_range(selector: &dyn PointSelector, window: &WindowView) -> Option<AnalysisRange> {
    selector
        .select(window)
        .or_else(|| window.table.time_bounds().map(|(lo, hi)| AnalysisRange::new(lo, hi)))
}

fn elapsed_hours(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    elapsed_seconds(to - from) / 3_600.0
}

/// `(value[last] - value[first]) / elapsed hours`.
pub fn slope_endpoint(times: &[NaiveDateTime], values: &[f64]) -> Result<f64, AnalysisError> {
    let (Some(t0), Some(t1)) = (times.first(), times.last()) else {
        return Err(AnalysisError::EmptyRange);
    };
    let (Some(v0), Some(v1)) = (values.first(), values.last()) else {
        return Err(AnalysisError::EmptyRange);
    };
    let hours = elapsed_hours(*t0, *t1);
    if hours == 0.0 {
        return Err(AnalysisError::DivisionUndefined);
    }
    Ok((v1 - v0) / hours)
}

/// Least-squares slope of value against hours since the first sample.
pub fn slope_regression(times: &[NaiveDateTime], values: &[f64]) -> Result<f64, AnalysisError> {
    let n = times.len().min(values.len());
    if n == 0 {
        return Err(AnalysisError::EmptyRange);
    }
    if n < 2 {
        return Err(AnalysisError::DivisionUndefined);
    }

    let origin = times[0];
    let xs: Vec<f64> = times[..n].iter().map(|t| elapsed_hours(origin, *t)).collect();
    let ys = &values[..n];
    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let (sxy, sxx) = xs.iter().zip(ys).fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
        let dx = x - x_mean;
        (sxy + dx * (y - y_mean), sxx + dx * dx)
    });
    if sxx == 0.0 {
        return Err(AnalysisError::DivisionUndefined);
    }
    Ok(sxy / sxx)
}

/// Mean, sample standard deviation (n - 1), min and max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Descriptive {
    pub count: usize,
    pub mean: f64,
    pub standard_deviation: Option<f64>,
    pub min: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Option<Descriptive> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let standard_deviation = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (n - 1) as f64).sqrt())
    } else {
        None
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(Descriptive {
        count: n,
        mean,
        standard_deviation,
        min,
        max,
    })
}

/// Statistics of one variable over an analysis range. Values are unrounded;
/// `degenerate` is set when the slopes could not be defined.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowStatistics {
    pub variable: String,
    pub sample_count: usize,
    pub mean: f64,
    pub standard_deviation: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub slope_endpoint: Option<f64>,
    pub slope_regression: Option<f64>,
    pub degenerate: bool,
    pub duration: Duration,
    pub range_start: NaiveDateTime,
    pub range_end: NaiveDateTime,
}

impl WindowStatistics {
    /// Computes from aligned samples. Samples are ordered by time first.
    pub fn compute(variable: &str, samples: &[(NaiveDateTime, f64)]) -> Result<Self, AnalysisError> {
        let mut samples = samples.to_vec();
        samples.sort_by_key(|(t, _)| *t);
        let times: Vec<NaiveDateTime> = samples.iter().map(|(t, _)| *t).collect();
        let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();

        let stats = describe(&values).ok_or(AnalysisError::EmptyRange)?;
        let slope_endpoint = slope_endpoint(&times, &values).ok();
        let slope_regression = slope_regression(&times, &values).ok();
        let range_start = times[0];
        let range_end = times[times.len() - 1];

        let degenerate = slope_endpoint.is_none() || slope_regression.is_none();
        if degenerate {
            log::warn!(
                "Analysis range for '{}' holds {} sample(s) over {}: slopes undefined",
                variable,
                stats.count,
                range_end - range_start
            );
        }

        Ok(Self {
            variable: variable.to_string(),
            sample_count: stats.count,
            mean: stats.mean,
            standard_deviation: stats.standard_deviation,
            min: stats.min,
            max: stats.max,
            slope_endpoint,
            slope_regression,
            degenerate,
            duration: range_end - range_start,
            range_start,
            range_end,
        })
    }

    pub fn duration_hours(&self) -> f64 {
        elapsed_seconds(self.duration) / 3_600.0
    }
}

/// Datetime/value pairs of `variable` inside `range`.
pub fn range_samples(
    table: &ObservationTable,
    variable: &str,
    range: &AnalysisRange,
) -> Result<Vec<(NaiveDateTime, f64)>, AnalysisError> {
    let values = table.values(variable)?;
    Ok(table
        .datetime()
        .iter()
        .zip(values)
        .filter_map(|(t, v)| match (t, v) {
            (Some(t), Some(v)) if range.contains(t) => Some((*t, *v)),
            _ => None,
        })
        .collect())
}

pub fn analyze_range(
    table: &ObservationTable,
    variable: &str,
    range: &AnalysisRange,
) -> Result<WindowStatistics, AnalysisError> {
    let samples = range_samples(table, variable, range)?;
    WindowStatistics::compute(variable, &samples)
}

/// Per-variable descriptive summary of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub window: String,
    pub period: NaiveDateTime,
    pub source: Option<String>,
    pub variable: String,
    pub stats: Option<Descriptive>,
}

pub fn summarize_window<S: AsRef<str>>(
    window: &WindowView,
    variables: &[S],
) -> Result<Vec<WindowSummary>, AnalysisError> {
    variables
        .iter()
        .map(|variable| {
            let values: Vec<f64> = window
                .table
                .values(variable.as_ref())?
                .iter()
                .flatten()
                .copied()
                .collect();
            Ok(WindowSummary {
                window: window.label(),
                period: window.period,
                source: window.source.clone(),
                variable: variable.as_ref().to_string(),
                stats: describe(&values),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_two_points_one_hour() {
        let times = [at(0, 0), at(1, 0)];
        let values = [10.0, 20.0];
        assert_relative_eq!(slope_endpoint(&times, &values).unwrap(), 10.0);
        assert_relative_eq!(slope_regression(&times, &values).unwrap(), 10.0);
    }

    #[test]
    fn test_regression_matches_endpoint_for_two_samples() {
        let times = [at(3, 7), at(5, 52)];
        let values = [-4.25, 17.5];
        assert_abs_diff_eq!(
            slope_regression(&times, &values).unwrap(),
            slope_endpoint(&times, &values).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_regression_on_noisy_line() {
        let times = [at(0, 0), at(0, 30), at(1, 0), at(1, 30)];
        let values = [1.0, 2.1, 2.9, 4.0];
        // sxy = 2.45, sxx = 1.25
        assert_relative_eq!(slope_regression(&times, &values).unwrap(), 1.96, epsilon = 1e-9);
    }

    #[test]
    fn test_single_sample_is_degenerate() {
        assert_eq!(
            slope_endpoint(&[at(0, 0)], &[5.0]).unwrap_err(),
            AnalysisError::DivisionUndefined
        );
        let stats = WindowStatistics::compute("T", &[(at(0, 0), 5.0)]).unwrap();
        assert!(stats.degenerate);
        assert_eq!(stats.slope_endpoint, None);
        assert_eq!(stats.slope_regression, None);
        assert_eq!(stats.standard_deviation, None);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn test_empty_range_is_an_error() {
        assert_eq!(
            WindowStatistics::compute("T", &[]).unwrap_err(),
            AnalysisError::EmptyRange
        );
    }

    #[test]
    fn test_sample_standard_deviation() {
        let d = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(d.mean, 5.0);
        assert_relative_eq!(d.standard_deviation.unwrap(), (32.0f64 / 7.0).sqrt());
        assert_eq!(d.min, 2.0);
        assert_eq!(d.max, 9.0);
    }

    #[test]
    fn test_statistics_report_boundaries() {
        let samples = [(at(1, 0), 3.0), (at(0, 0), 1.0), (at(0, 30), 2.0)];
        let stats = WindowStatistics::compute("T", &samples).unwrap();
        assert_eq!(stats.range_start, at(0, 0));
        assert_eq!(stats.range_end, at(1, 0));
        assert_relative_eq!(stats.duration_hours(), 1.0);
        assert_relative_eq!(stats.slope_endpoint.unwrap(), 2.0);
        assert!(!stats.degenerate);
    }

    #[test]
    fn test_analysis_range_swaps_reversed_bounds() {
        let range = AnalysisRange::new(at(2, 0), at(1, 0));
        assert_eq!(range.start, at(1, 0));
        assert!(range.contains(&at(2, 0)));
        assert!(!range.contains(&at(2, 1)));
    }

    #[test]
    fn test_point_selector_respects_capability_flag() {
        let picks = Some((at(1, 0), at(0, 0)));
        let disabled = point_selector(&IngestConfig::default(), picks);
        assert!(!disabled.is_enabled());

        let enabled = point_selector(&IngestConfig::default().with_point_selection(true), picks);
        assert!(enabled.is_enabled());
    }
}
