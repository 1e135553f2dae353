#[cfg(test)]
pub mod test_helpers {
    use crate::config::IngestConfig;
    use crate::data_models::ObservationTable;
    use crate::file_processor::{ingest_bytes, merge_tables};
    use chrono::{NaiveDate, NaiveDateTime};

    /// Four structural columns, tag/description/unit rows 0-2, body from row 3.
    pub fn small_config() -> IngestConfig {
        IngestConfig {
            delimiter: ';',
            encoding: "windows-1252".to_string(),
            quoting: true,
            tag_row_index: 0,
            description_row_index: Some(1),
            unit_row_index: Some(2),
            variable_start_column: 4,
            structural_column_names: ["Type", "Id", "Date", "Time"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            date_column: "Date".to_string(),
            time_column: "Time".to_string(),
            body_start_row: 3,
            day_first_dates: true,
            null_markers: vec!["nan".to_string()],
            point_selection: false,
        }
    }

    pub const TEMP: &str = "TI101 (Reactor) [degC]";
    pub const FLOW: &str = "FI102 (Feed) [m3/h]";

    /// Export text with two variables; each row is `(dd/mm/yyyy, HH:MM:SS, temp, flow)`.
    pub fn export_text(rows: &[(&str, &str, &str, &str)]) -> String {
        let mut text = String::from(";;;;TI101;FI102\n;;;;Reactor;Feed\n;;;;degC;m3/h\n");
        for (date, time, temp, flow) in rows {
            text.push_str(&format!("V;1;{};{};{};{}\n", date, time, temp, flow));
        }
        text
    }

    pub fn table_from(rows: &[(&str, &str, &str, &str)]) -> ObservationTable {
        ingest_bytes(export_text(rows).as_bytes(), &small_config(), None)
            .unwrap()
            .table
    }

    /// Two tables tagged as separate files, row-concatenated.
    pub fn merged(a: &[(&str, &str, &str, &str)], b: &[(&str, &str, &str, &str)]) -> ObservationTable {
        let config = small_config();
        let first = ingest_bytes(export_text(a).as_bytes(), &config, Some("a.csv")).unwrap();
        let second = ingest_bytes(export_text(b).as_bytes(), &config, Some("b.csv")).unwrap();
        merge_tables(&[&first.table, &second.table])
    }

    pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }
}
