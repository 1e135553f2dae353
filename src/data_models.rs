use crate::errors::AnalysisError;
use crate::schema::ColumnKind;
use chrono::NaiveDateTime;
use serde::Serialize;

pub const DATETIME_COLUMN: &str = "Datetime";
pub const SOURCE_COLUMN: &str = "Source";

/// Cell storage for one column. Variable columns are numeric, everything
/// else keeps the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<String>),
    Numeric(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    /// Cell rendered for delimited export; missing numbers are empty.
    pub fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Text(v) => v[row].clone(),
            ColumnData::Numeric(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
        }
    }

    pub(crate) fn append(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend(b.iter().cloned()),
            (ColumnData::Numeric(a), ColumnData::Numeric(b)) => a.extend(b.iter().copied()),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub data: ColumnData,
}

/// Ready-to-plot x/y pairs for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries<X> {
    pub label: String,
    pub x: Vec<X>,
    pub y: Vec<f64>,
}

impl<X> PlotSeries<X> {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Time-stamped measurements. Immutable once assembled: every filter builds
/// a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    columns: Vec<Column>,
    datetime: Vec<Option<NaiveDateTime>>,
    source: Option<Vec<String>>,
}

impl ObservationTable {
    pub(crate) fn new(
        columns: Vec<Column>,
        datetime: Vec<Option<NaiveDateTime>>,
        source: Option<Vec<String>>,
    ) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == datetime.len()));
        Self {
            columns,
            datetime,
            source,
        }
    }

    pub fn row_count(&self) -> usize {
        self.datetime.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datetime.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Variable display names, in column order. Duplicates are possible.
    pub fn variables(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Variable)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn datetime(&self) -> &[Option<NaiveDateTime>] {
        &self.datetime
    }

    pub fn source(&self) -> Option<&[String]> {
        self.source.as_deref()
    }

    pub fn values(&self, variable: &str) -> Result<&[Option<f64>], AnalysisError> {
        match self.column(variable) {
            Some(Column {
                kind: ColumnKind::Variable,
                data: ColumnData::Numeric(values),
                ..
            }) => Ok(values),
            _ => Err(AnalysisError::UnknownVariable(variable.to_string())),
        }
    }

    /// Tags every row with the originating file.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(vec![source.to_string(); self.row_count()]);
        self
    }

    /// New table holding `rows`, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> ObservationTable {
        ObservationTable {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    kind: c.kind,
                    data: c.data.take(rows),
                })
                .collect(),
            datetime: rows.iter().map(|&r| self.datetime[r]).collect(),
            source: self
                .source
                .as_ref()
                .map(|s| rows.iter().map(|&r| s[r].clone()).collect()),
        }
    }

    /// Rows whose Datetime satisfies `keep`. Missing timestamps never match.
    pub fn filter_by_time<F>(&self, keep: F) -> ObservationTable
    where
        F: Fn(&NaiveDateTime) -> bool,
    {
        let rows: Vec<usize> = self
            .datetime
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| ts.as_ref().filter(|t| keep(*t)).map(|_| i))
            .collect();
        self.take_rows(&rows)
    }

    /// Inclusive `[start, end]` filter used for the overall view.
    pub fn filter_time_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> ObservationTable {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.filter_by_time(|t| *t >= start && *t <= end)
    }

    /// Overall-view filter from optional bounds. Without any bound the table
    /// is returned whole, rows with a missing Datetime included.
    pub fn filter_optional_range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> ObservationTable {
        match (start, end) {
            (None, None) => self.clone(),
            (Some(start), Some(end)) => self.filter_time_range(start, end),
            (Some(start), None) => self.filter_by_time(|t| *t >= start),
            (None, Some(end)) => self.filter_by_time(|t| *t <= end),
        }
    }

    /// Earliest and latest non-missing Datetime.
    pub fn time_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut stamps = self.datetime.iter().flatten();
        let first = *stamps.next()?;
        Some(stamps.fold((first, first), |(lo, hi), t| (lo.min(*t), hi.max(*t))))
    }

    /// Keeps structural columns and the named variables, in the order asked.
    pub fn select_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<ObservationTable, AnalysisError> {
        let mut columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| c.kind != ColumnKind::Variable)
            .cloned()
            .collect();
        for name in names {
            let column = self
                .columns
                .iter()
                .find(|c| c.kind == ColumnKind::Variable && c.name == name.as_ref())
                .ok_or_else(|| AnalysisError::UnknownVariable(name.as_ref().to_string()))?;
            columns.push(column.clone());
        }
        Ok(ObservationTable {
            columns,
            datetime: self.datetime.clone(),
            source: self.source.clone(),
        })
    }

    /// Datetime/value pairs of one variable; rows missing either are skipped.
    pub fn series(&self, variable: &str) -> Result<PlotSeries<NaiveDateTime>, AnalysisError> {
        let values = self.values(variable)?;
        let (x, y): (Vec<NaiveDateTime>, Vec<f64>) = self
            .datetime
            .iter()
            .zip(values)
            .filter_map(|(ts, v)| Some(((*ts)?, (*v)?)))
            .unzip();
        Ok(PlotSeries {
            label: variable.to_string(),
            x,
            y,
        })
    }

    /// Distinct source identifiers in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        if let Some(source) = &self.source {
            for s in source {
                if !seen.contains(s) {
                    seen.push(s.clone());
                }
            }
        }
        seen
    }

    /// One table per source file; a single-file table is its own partition.
    pub fn partition_by_source(&self) -> Vec<(Option<String>, ObservationTable)> {
        let Some(source) = &self.source else {
            return vec![(None, self.clone())];
        };
        self.sources()
            .into_iter()
            .map(|id| {
                let rows: Vec<usize> = source
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| **s == id)
                    .map(|(i, _)| i)
                    .collect();
                let part = self.take_rows(&rows);
                (Some(id), part)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn table() -> ObservationTable {
        ObservationTable::new(
            vec![
                Column {
                    name: "Date".to_string(),
                    kind: ColumnKind::Structural,
                    data: ColumnData::Text(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
                },
                Column {
                    name: "T1".to_string(),
                    kind: ColumnKind::Variable,
                    data: ColumnData::Numeric(vec![Some(1.0), None, Some(3.0), Some(4.0)]),
                },
                Column {
                    name: "T2".to_string(),
                    kind: ColumnKind::Variable,
                    data: ColumnData::Numeric(vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0)]),
                },
            ],
            vec![Some(at(0, 0)), Some(at(1, 0)), None, Some(at(2, 0))],
            None,
        )
    }

    #[test]
    fn test_inclusive_range_excludes_missing_timestamps() {
        let filtered = table().filter_time_range(at(0, 0), at(2, 0));
        assert_eq!(filtered.row_count(), 3);
        assert!(filtered.datetime().iter().all(|t| t.is_some()));

        let reversed = table().filter_time_range(at(1, 0), at(0, 0));
        assert_eq!(reversed.row_count(), 2);
    }

    #[test]
    fn test_unbounded_filter_keeps_missing_timestamps() {
        let whole = table().filter_optional_range(None, None);
        assert_eq!(whole, table());
        assert_eq!(whole.datetime()[2], None);

        let from = table().filter_optional_range(Some(at(1, 0)), None);
        assert_eq!(from.datetime(), &[Some(at(1, 0)), Some(at(2, 0))]);

        let to = table().filter_optional_range(None, Some(at(1, 0)));
        assert_eq!(to.datetime(), &[Some(at(0, 0)), Some(at(1, 0))]);

        let both = table().filter_optional_range(Some(at(2, 0)), Some(at(0, 0)));
        assert_eq!(both.row_count(), 3);
    }

    #[test]
    fn test_time_bounds() {
        assert_eq!(table().time_bounds(), Some((at(0, 0), at(2, 0))));
        assert_eq!(table().take_rows(&[2]).time_bounds(), None);
    }

    #[test]
    fn test_select_variables_keeps_structural_columns() {
        let selected = table().select_variables(&["T2"]).unwrap();
        assert_eq!(selected.variables(), vec!["T2"]);
        assert!(selected.column("Date").is_some());
        assert_eq!(
            table().select_variables(&["nope"]).unwrap_err(),
            AnalysisError::UnknownVariable("nope".to_string())
        );
    }

    #[test]
    fn test_series_skips_missing_pairs() {
        let series = table().series("T1").unwrap();
        assert_eq!(series.x, vec![at(0, 0), at(2, 0)]);
        assert_eq!(series.y, vec![1.0, 4.0]);
        assert!(table().series("Date").is_err());
    }

    #[test]
    fn test_filtering_does_not_mutate() {
        let original = table();
        let _ = original.filter_time_range(at(0, 0), at(0, 0));
        assert_eq!(original, table());
    }

    #[test]
    fn test_partition_by_source() {
        let mut merged = table().with_source("a.csv");
        if let Some(source) = merged.source.as_mut() {
            source[3] = "b.csv".to_string();
        }
        let parts = merged.partition_by_source();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0.as_deref(), Some("a.csv"));
        assert_eq!(parts[0].1.row_count(), 3);
        assert_eq!(parts[1].1.row_count(), 1);
        assert_eq!(table().partition_by_source().len(), 1);
    }
}
