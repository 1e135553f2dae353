use crate::config::IngestConfig;
use crate::metrics::IngestMetrics;
use crate::parsers::csv_parser::RawGrid;
use serde::Serialize;
use std::fmt;

/// Human-readable name of one process variable, read from the header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableLabel {
    pub tag: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Grid column the label was read from.
    pub source_column: usize,
}

impl VariableLabel {
    /// `tag[ (description)][ [unit]]`
    pub fn display_name(&self) -> String {
        let mut name = self.tag.clone();
        if let Some(description) = &self.description {
            name.push_str(" (");
            name.push_str(description);
            name.push(')');
        }
        if let Some(unit) = &self.unit {
            name.push_str(" [");
            name.push_str(unit);
            name.push(']');
        }
        name
    }
}

impl fmt::Display for VariableLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Where the header rows live in a given export revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub tag_row: usize,
    pub description_row: Option<usize>,
    pub unit_row: Option<usize>,
    pub start_column: usize,
}

impl HeaderLayout {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            tag_row: config.tag_row_index,
            description_row: config.description_row_index,
            unit_row: config.unit_row_index,
            start_column: config.variable_start_column,
        }
    }
}

/// Reads one label per column from `layout.start_column` to the grid width.
///
/// Columns whose tag is empty or a null marker are dropped, never renamed.
/// Description and unit segments are omitted when absent. Out-of-bounds
/// header cells count as absent.
pub fn parse_header(
    grid: &RawGrid,
    layout: &HeaderLayout,
    config: &IngestConfig,
    metrics: &mut IngestMetrics,
) -> Vec<VariableLabel> {
    let mut labels = Vec::new();

    for column in layout.start_column..grid.column_count() {
        let tag = match read_header_cell(grid, Some(layout.tag_row), column, config, metrics) {
            Some(tag) => tag,
            None => {
                log::debug!("Dropping column {}: no usable tag", column);
                metrics.record_dropped_header_column();
                continue;
            }
        };
        let description = read_header_cell(grid, layout.description_row, column, config, metrics);
        let unit = read_header_cell(grid, layout.unit_row, column, config, metrics);

        labels.push(VariableLabel {
            tag,
            description,
            unit,
            source_column: column,
        });
    }

    metrics.labels_emitted = labels.len();
    labels
}

fn read_header_cell(
    grid: &RawGrid,
    row: Option<usize>,
    column: usize,
    config: &IngestConfig,
    metrics: &mut IngestMetrics,
) -> Option<String> {
    let row = row?;
    match grid.cell(row, column) {
        Some(text) if !config.is_null_marker(text) => Some(text.trim().to_string()),
        Some(_) => None,
        None => {
            metrics.record_out_of_bounds_header_cell();
            None
        }
    }
}

/// Variables present in every input, in the order of the first one.
pub fn intersect_labels(label_sets: &[Vec<String>]) -> Vec<String> {
    let Some((first, rest)) = label_sets.split_first() else {
        return Vec::new();
    };
    let mut common: Vec<String> = Vec::new();
    for label in first {
        if rest.iter().all(|set| set.contains(label)) && !common.contains(label) {
            common.push(label.clone());
        }
    }
    common
}
