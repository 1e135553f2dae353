use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Historian export layouts seen in the field. Each one is only a preset for
/// `IngestConfig`; nothing downstream branches on the revision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FormatRevision {
    /// Semicolon export, tag and description rows only, variables from column 13.
    Classic,
    /// Comma export with a timezone column, variables from column 5.
    Compact,
    /// Semicolon export with a fourteen row header block.
    Extended,
}

/// Every knob of the ingest. Offsets are zero-based.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub delimiter: char,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_quoting")]
    pub quoting: bool,
    pub tag_row_index: usize,
    #[serde(default)]
    pub description_row_index: Option<usize>,
    #[serde(default)]
    pub unit_row_index: Option<usize>,
    pub variable_start_column: usize,
    pub structural_column_names: Vec<String>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_time_column")]
    pub time_column: String,
    pub body_start_row: usize,
    pub day_first_dates: bool,
    #[serde(default = "default_null_markers")]
    pub null_markers: Vec<String>,
    /// Enables interactive point selection for the analysis range.
    #[serde(default)]
    pub point_selection: bool,
}

fn default_encoding() -> String {
    "windows-1252".to_string()
}

fn default_quoting() -> bool {
    true
}

fn default_date_column() -> String {
    "Date".to_string()
}

fn default_time_column() -> String {
    "Time".to_string()
}

fn default_null_markers() -> Vec<String> {
    vec!["nan".to_string()]
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn classic_structural_names() -> Vec<String> {
    let mut cols = names(&["Type", "Id", "Date", "Time"]);
    cols.extend((5..14).map(|i| format!("Meta{}", i)));
    cols
}

impl IngestConfig {
    pub fn preset(revision: FormatRevision) -> Self {
        match revision {
            FormatRevision::Classic => Self {
                delimiter: ';',
                encoding: default_encoding(),
                quoting: true,
                tag_row_index: 4,
                description_row_index: Some(5),
                unit_row_index: None,
                variable_start_column: 13,
                structural_column_names: classic_structural_names(),
                date_column: default_date_column(),
                time_column: default_time_column(),
                body_start_row: 6,
                day_first_dates: true,
                null_markers: default_null_markers(),
                point_selection: false,
            },
            FormatRevision::Compact => Self {
                delimiter: ',',
                encoding: default_encoding(),
                quoting: true,
                tag_row_index: 2,
                description_row_index: Some(3),
                unit_row_index: Some(4),
                variable_start_column: 5,
                structural_column_names: names(&["Type", "Id", "Date", "Time", "Timezone"]),
                date_column: default_date_column(),
                time_column: default_time_column(),
                body_start_row: 6,
                day_first_dates: false,
                null_markers: default_null_markers(),
                point_selection: false,
            },
            FormatRevision::Extended => Self {
                delimiter: ';',
                encoding: default_encoding(),
                quoting: true,
                tag_row_index: 10,
                description_row_index: Some(11),
                unit_row_index: Some(12),
                variable_start_column: 13,
                structural_column_names: classic_structural_names(),
                date_column: default_date_column(),
                time_column: default_time_column(),
                body_start_row: 14,
                day_first_dates: true,
                null_markers: default_null_markers(),
                point_selection: false,
            },
        }
    }

    pub fn with_point_selection(mut self, enabled: bool) -> Self {
        self.point_selection = enabled;
        self
    }

    /// Delimiter as the single byte the csv reader and writer expect.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }

    pub fn is_null_marker(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.is_empty()
            || self
                .null_markers
                .iter()
                .any(|marker| marker.trim().eq_ignore_ascii_case(trimmed))
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::preset(FormatRevision::Classic)
    }
}

/// Loads an ingest configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<IngestConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: IngestConfig =
        serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    log::debug!("Loaded ingest configuration from {}", path.display());
    Ok(config)
}
