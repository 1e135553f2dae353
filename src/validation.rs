//! Up-front checks on an ingest configuration.

use crate::config::IngestConfig;
use crate::errors::ConfigError;

/// Validates an ingest configuration before any file is touched.
///
/// Checks:
/// - Delimiter is a single ASCII character other than a quote.
/// - Encoding label is known.
/// - Structural names are non-empty and contain the date and time columns.
/// - The body starts below every configured header row.
pub fn validate_config(config: &IngestConfig) -> Result<(), ConfigError> {
    validate_delimiter(config.delimiter)?;

    if encoding_rs::Encoding::for_label(config.encoding.as_bytes()).is_none() {
        return Err(invalid(
            "encoding",
            format!("unknown encoding label '{}'", config.encoding),
        ));
    }

    if config.structural_column_names.is_empty() {
        return Err(invalid(
            "structural_column_names",
            "at least one structural column is required".to_string(),
        ));
    }

    for (field, name) in [
        ("date_column", &config.date_column),
        ("time_column", &config.time_column),
    ] {
        if !config.structural_column_names.iter().any(|c| c == name) {
            return Err(invalid(
                field,
                format!("'{}' is not one of the structural column names", name),
            ));
        }
    }

    let header_rows = [
        Some(config.tag_row_index),
        config.description_row_index,
        config.unit_row_index,
    ];
    if let Some(last_header) = header_rows.iter().flatten().max() {
        if config.body_start_row <= *last_header {
            return Err(invalid(
                "body_start_row",
                format!(
                    "body starts at row {} but header row {} is configured",
                    config.body_start_row, last_header
                ),
            ));
        }
    }

    Ok(())
}

fn validate_delimiter(delimiter: char) -> Result<(), ConfigError> {
    if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
        return Err(invalid(
            "delimiter",
            format!("'{}' cannot be used as a field delimiter", delimiter.escape_default()),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message,
    }
}
