use crate::config::IngestConfig;
use crate::errors::IngestError;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::Encoding;
use std::fs;
use std::path::Path;

/// The export as an untyped grid of strings, addressed by zero-based
/// (row, column). Rows may be ragged; `width` is the widest row.
#[derive(Debug, Clone, Default)]
pub struct RawGrid {
    rows: Vec<StringRecord>,
    width: usize,
}

impl RawGrid {
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows: Vec<StringRecord> = rows
            .into_iter()
            .map(|row| {
                let mut record = StringRecord::new();
                for cell in row {
                    record.push_field(cell.as_ref());
                }
                record
            })
            .collect();
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        Self { rows, width }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.width
    }

    /// Cell text, or `None` when the position lies outside the (ragged) row.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Decodes raw bytes with the configured single-byte encoding. Never sniffed.
pub fn decode_bytes(bytes: &[u8], config: &IngestConfig) -> Result<String, IngestError> {
    let encoding =
        Encoding::for_label(config.encoding.as_bytes()).ok_or_else(|| IngestError::UnknownEncoding {
            label: config.encoding.clone(),
        })?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!(
            "Input contained byte sequences invalid for {}; replaced with U+FFFD",
            encoding.name()
        );
    }
    Ok(text.into_owned())
}

/// Tokenizes decoded text into a grid. No header row is recognised: header
/// rows are ordinary rows at known offsets.
pub fn parse_grid(text: &str, config: &IngestConfig) -> Result<RawGrid, IngestError> {
    let mut reader_builder = ReaderBuilder::new();
    reader_builder
        .delimiter(config.delimiter_byte())
        .has_headers(false)
        .flexible(true)
        .quoting(config.quoting);

    let mut reader = reader_builder.from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut width = 0;
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| IngestError::Tokenize {
            record: index,
            source: e,
        })?;
        width = width.max(record.len());
        rows.push(record);
    }

    log::debug!("Tokenized {} rows, widest row has {} columns", rows.len(), width);
    Ok(RawGrid { rows, width })
}

pub fn read_grid_bytes(bytes: &[u8], config: &IngestConfig) -> Result<RawGrid, IngestError> {
    let text = decode_bytes(bytes, config)?;
    parse_grid(&text, config)
}

pub fn read_grid(file_path: &Path, config: &IngestConfig) -> Result<RawGrid, IngestError> {
    let bytes = fs::read(file_path).map_err(|e| IngestError::Io {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    read_grid_bytes(&bytes, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows_take_widest_width() {
        let config = IngestConfig::default();
        let grid = parse_grid("a;b\nc;d;e;f\ng\n", &config).unwrap();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.column_count(), 4);
        assert_eq!(grid.cell(1, 3), Some("f"));
        assert_eq!(grid.cell(0, 3), None);
        assert_eq!(grid.cell(9, 0), None);
    }

    #[test]
    fn test_decodes_windows_1252() {
        let config = IngestConfig::default();
        // "Débit;°C" in windows-1252
        let bytes = [b'D', 0xE9, b'b', b'i', b't', b';', 0xB0, b'C'];
        let grid = read_grid_bytes(&bytes, &config).unwrap();
        assert_eq!(grid.cell(0, 0), Some("Débit"));
        assert_eq!(grid.cell(0, 1), Some("°C"));
    }

    #[test]
    fn test_unknown_encoding_is_fatal() {
        let mut config = IngestConfig::default();
        config.encoding = "klingon".to_string();
        assert!(matches!(
            read_grid_bytes(b"a;b", &config),
            Err(IngestError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_comma_delimiter() {
        let mut config = IngestConfig::default();
        config.delimiter = ',';
        let grid = parse_grid("1,2,\"3,5\"\n", &config).unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell(0, 2), Some("3,5"));
    }
}
