use std::time::{Duration, Instant};

/// Counters for one ingest. Recovered anomalies end up here instead of
/// aborting the load.
#[derive(Debug, Default, Clone)]
pub struct IngestMetrics {
    pub source: Option<String>,
    pub grid_rows: usize,
    pub grid_columns: usize,
    pub body_rows: usize,
    pub labels_emitted: usize,
    pub header_columns_dropped: usize,
    pub header_cells_out_of_bounds: usize,
    pub unparsable_timestamps: usize,
    pub schema_names_padded: usize,
    pub schema_names_truncated: usize,
    pub elapsed: Duration,
    started: Option<Instant>,
}

impl IngestMetrics {
    pub fn new(source: Option<String>) -> Self {
        Self {
            source,
            started: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_grid(&mut self, rows: usize, columns: usize) {
        self.grid_rows = rows;
        self.grid_columns = columns;
    }

    pub fn record_out_of_bounds_header_cell(&mut self) {
        self.header_cells_out_of_bounds += 1;
    }

    pub fn record_dropped_header_column(&mut self) {
        self.header_columns_dropped += 1;
    }

    pub fn finish(&mut self) {
        self.elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
    }

    pub fn has_anomalies(&self) -> bool {
        self.header_cells_out_of_bounds > 0
            || self.unparsable_timestamps > 0
            || self.schema_names_padded > 0
            || self.schema_names_truncated > 0
    }

    pub fn log_summary(&self) {
        let source = self.source.as_deref().unwrap_or("<memory>");
        log::info!(
            "Ingested {}: {} body rows x {} columns, {} variables in {:.2?}",
            source,
            self.body_rows,
            self.grid_columns,
            self.labels_emitted,
            self.elapsed
        );
        if self.header_columns_dropped > 0 {
            log::info!(
                "{}: {} header columns without a usable tag were dropped",
                source,
                self.header_columns_dropped
            );
        }
        if self.has_anomalies() {
            log::warn!(
                "{}: {} header cells out of bounds, {} unparsable timestamps, {} schema names padded, {} truncated",
                source,
                self.header_cells_out_of_bounds,
                self.unparsable_timestamps,
                self.schema_names_padded,
                self.schema_names_truncated
            );
        }
    }
}
