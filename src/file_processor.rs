use crate::config::IngestConfig;
use crate::data_models::{Column, ColumnData, ObservationTable};
use crate::errors::IngestError;
use crate::metrics::IngestMetrics;
use crate::parsers::csv_parser::{self, RawGrid};
use crate::parsers::header_parser::{self, HeaderLayout, VariableLabel};
use crate::parsers::timestamp;
use crate::schema::{self, ColumnKind, ColumnSchema};
use crate::utils::parse_locale_float;
use crate::validation::validate_config;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};

/// Everything produced by one file's ingest.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub source: Option<String>,
    pub labels: Vec<VariableLabel>,
    pub schema: ColumnSchema,
    pub table: ObservationTable,
    pub metrics: IngestMetrics,
}

impl IngestedFile {
    pub fn variable_names(&self) -> Vec<String> {
        self.table.variables().iter().map(|v| v.to_string()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of loading one or more files into a single table.
#[derive(Debug, Clone)]
pub struct MergedIngest {
    pub table: ObservationTable,
    /// Variables offered for comparison: present in every ingested file.
    pub variables: Vec<String>,
    pub files: Vec<IngestedFile>,
    pub failures: Vec<FileFailure>,
}

/// Drops the header block, names the body columns with `schema`, coerces
/// variable cells to numbers and derives the Datetime column.
pub fn assemble_table(
    grid: &RawGrid,
    schema: &ColumnSchema,
    config: &IngestConfig,
    source: Option<&str>,
    metrics: &mut IngestMetrics,
) -> ObservationTable {
    let body: Vec<usize> = (config.body_start_row..grid.row_count()).collect();
    metrics.body_rows = body.len();

    let columns: Vec<Column> = schema
        .names()
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let kind = schema.kind(position).unwrap_or(ColumnKind::Filler);
            let data = match kind {
                ColumnKind::Variable => ColumnData::Numeric(
                    body.iter()
                        .map(|&row| numeric_cell(grid.cell(row, position), config))
                        .collect(),
                ),
                _ => ColumnData::Text(
                    body.iter()
                        .map(|&row| grid.cell(row, position).unwrap_or("").to_string())
                        .collect(),
                ),
            };
            Column {
                name: name.clone(),
                kind,
                data,
            }
        })
        .collect();

    let text_column = |name: &str| -> Option<Vec<String>> {
        columns
            .iter()
            .find(|c| c.name == name && c.kind != ColumnKind::Variable)
            .and_then(|c| match &c.data {
                ColumnData::Text(v) => Some(v.clone()),
                ColumnData::Numeric(_) => None,
            })
    };

    let datetime = match (text_column(&config.date_column), text_column(&config.time_column)) {
        (Some(dates), Some(times)) => {
            timestamp::normalize_timestamps(&dates, &times, config.day_first_dates)
        }
        _ => {
            log::warn!(
                "Date/time columns '{}'/'{}' not present in schema; every timestamp is missing",
                config.date_column,
                config.time_column
            );
            vec![None; body.len()]
        }
    };
    metrics.unparsable_timestamps = datetime.iter().filter(|t| t.is_none()).count();

    let table = ObservationTable::new(columns, datetime, None);
    match source {
        Some(id) => table.with_source(id),
        None => table,
    }
}

fn numeric_cell(cell: Option<&str>, config: &IngestConfig) -> Option<f64> {
    let text = cell?;
    if config.is_null_marker(text) {
        return None;
    }
    match parse_locale_float(text) {
        Ok(value) if value.is_finite() => Some(value),
        Ok(_) => {
            log::debug!("Non-finite variable cell '{}' treated as missing", text);
            None
        }
        Err(_) => {
            log::debug!("Non-numeric variable cell '{}' treated as missing", text);
            None
        }
    }
}

/// Header parsing, schema reconciliation and table assembly for one grid.
pub fn ingest_grid(grid: &RawGrid, config: &IngestConfig, source: Option<&str>) -> IngestedFile {
    let mut metrics = IngestMetrics::new(source.map(str::to_string));
    metrics.record_grid(grid.row_count(), grid.column_count());

    let layout = HeaderLayout::from_config(config);
    let labels = header_parser::parse_header(grid, &layout, config, &mut metrics);
    let schema = schema::build_schema(&config.structural_column_names, &labels, grid.column_count());
    metrics.schema_names_padded = schema.padded;
    metrics.schema_names_truncated = schema.truncated;

    let table = assemble_table(grid, &schema, config, source, &mut metrics);
    metrics.finish();
    metrics.log_summary();

    IngestedFile {
        source: source.map(str::to_string),
        labels,
        schema,
        table,
        metrics,
    }
}

/// Ingests an already-read byte stream.
pub fn ingest_bytes(
    bytes: &[u8],
    config: &IngestConfig,
    source: Option<&str>,
) -> Result<IngestedFile, IngestError> {
    validate_config(config)?;
    let grid = csv_parser::read_grid_bytes(bytes, config)?;
    Ok(ingest_grid(&grid, config, source))
}

pub fn process_file(file_path: &Path, config: &IngestConfig, source: Option<&str>) -> Result<IngestedFile, IngestError> {
    log::info!("Processing file: {}", file_path.display());
    validate_config(config)?;
    let grid = csv_parser::read_grid(file_path, config)?;
    Ok(ingest_grid(&grid, config, source))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn parent_components(path: &Path) -> Vec<Component<'_>> {
    path.parent()
        .map(|dir| dir.components().collect())
        .unwrap_or_default()
}

/// Deepest directory shared by every path.
fn common_root(paths: &[&Path]) -> PathBuf {
    let Some((first, rest)) = paths.split_first() else {
        return PathBuf::new();
    };
    let mut root = parent_components(first);
    for path in rest {
        let dir = parent_components(path);
        let shared = root.iter().zip(&dir).take_while(|(a, b)| a == b).count();
        root.truncate(shared);
    }
    root.iter().collect()
}

/// One Source identifier per path. The file name is used when it is unique;
/// files sharing a name are told apart by their path below the directory
/// they have in common, and exact repeats get a `#n` suffix.
pub fn source_ids(paths: &[PathBuf]) -> Vec<String> {
    let names: Vec<String> = paths.iter().map(|p| file_name(p)).collect();

    let mut ids: Vec<String> = Vec::with_capacity(paths.len());
    for (path, name) in paths.iter().zip(&names) {
        let clashing: Vec<&Path> = paths
            .iter()
            .zip(&names)
            .filter(|(_, other)| *other == name)
            .map(|(p, _)| p.as_path())
            .collect();
        if clashing.len() < 2 {
            ids.push(name.clone());
            continue;
        }
        let root = common_root(&clashing);
        let relative = path.strip_prefix(&root).unwrap_or(path.as_path());
        ids.push(relative.to_string_lossy().into_owned());
    }

    let mut seen: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter_mut() {
        let base = id.clone();
        let mut n = 1;
        while seen.contains(id) {
            n += 1;
            *id = format!("{}#{}", base, n);
        }
        seen.push(id.clone());
    }
    ids
}

/// Loads every path. A file that fails is reported and skipped; the load
/// only fails when nothing could be ingested. With more than one file the
/// rows are tagged with their file name and row-concatenated.
pub fn process_files(paths: &[PathBuf], config: &IngestConfig) -> Result<MergedIngest, IngestError> {
    validate_config(config)?;
    let tag_sources = paths.len() > 1;

    let progress = ProgressBar::new(paths.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    if paths.len() < 2 {
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut files = Vec::new();
    let mut failures = Vec::new();
    for (path, id) in paths.iter().zip(source_ids(paths)) {
        progress.set_message(id.clone());
        let source = if tag_sources { Some(id.as_str()) } else { None };
        match process_file(path, config, source) {
            Ok(file) => files.push(file),
            Err(e) => {
                log::error!("Failed to process {}: {}", path.display(), e);
                failures.push(FileFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("File processing completed");

    if files.is_empty() {
        return Err(IngestError::NothingIngested);
    }

    let label_sets: Vec<Vec<String>> = files.iter().map(|f| f.variable_names()).collect();
    let variables = header_parser::intersect_labels(&label_sets);
    let tables: Vec<&ObservationTable> = files.iter().map(|f| &f.table).collect();
    let table = merge_tables(&tables);

    if files.len() > 1 {
        log::info!(
            "Merged {} files: {} rows, {} variables common to all inputs",
            files.len(),
            table.row_count(),
            variables.len()
        );
    }

    Ok(MergedIngest {
        table,
        variables,
        files,
        failures,
    })
}

/// Row-concatenates tables. Keeps the non-variable columns every table has
/// and the variables common to all of them, in the first table's order.
pub fn merge_tables(tables: &[&ObservationTable]) -> ObservationTable {
    let Some((first, rest)) = tables.split_first() else {
        return ObservationTable::new(Vec::new(), Vec::new(), None);
    };
    if rest.is_empty() {
        return (*first).clone();
    }

    let mut columns: Vec<Column> = Vec::new();
    for column in first.columns() {
        if columns.iter().any(|c| c.name == column.name) {
            log::debug!("Repeated column '{}' left out of the merged table", column.name);
            continue;
        }
        let mut merged = column.clone();
        let mut present_everywhere = true;
        for other in rest {
            let appended = match other.column(&column.name) {
                Some(o) if o.kind == column.kind => merged.data.append(&o.data),
                _ => false,
            };
            if !appended {
                present_everywhere = false;
                break;
            }
        }
        if present_everywhere {
            columns.push(merged);
        }
    }

    let datetime = tables
        .iter()
        .flat_map(|t| t.datetime().iter().copied())
        .collect();
    let source = tables
        .iter()
        .flat_map(|t| match t.source() {
            Some(s) => s.to_vec(),
            None => vec![String::new(); t.row_count()],
        })
        .collect();

    ObservationTable::new(columns, datetime, Some(source))
}
