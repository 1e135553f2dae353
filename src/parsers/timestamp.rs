use chrono::{NaiveDate, NaiveDateTime};

// `%.f` accepts an absent fraction when parsing.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S%.f",
    "%m-%d-%Y %H:%M",
];

const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DAY_FIRST_DATES: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_DATES: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];
const ISO_DATES: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses `date + " " + time`. Day-first ordering is explicit, never guessed;
/// ISO year-first text is accepted either way. A bare date maps to midnight.
pub fn parse_timestamp(date: &str, time: &str, day_first: bool) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), time.trim());
    let combined = combined.trim();
    if combined.is_empty() {
        return None;
    }

    let (datetime_formats, date_formats) = if day_first {
        (DAY_FIRST_FORMATS, DAY_FIRST_DATES)
    } else {
        (MONTH_FIRST_FORMATS, MONTH_FIRST_DATES)
    };

    datetime_formats
        .iter()
        .chain(ISO_FORMATS)
        .find_map(|format| NaiveDateTime::parse_from_str(combined, format).ok())
        .or_else(|| {
            date_formats
                .iter()
                .chain(ISO_DATES)
                .find_map(|format| NaiveDate::parse_from_str(combined, format).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Merges a date column and a time column into one Datetime column of the
/// same length. Unparsable rows become `None`; the ingest never aborts here.
pub fn normalize_timestamps<D, T>(dates: &[D], times: &[T], day_first: bool) -> Vec<Option<NaiveDateTime>>
where
    D: AsRef<str>,
    T: AsRef<str>,
{
    dates
        .iter()
        .enumerate()
        .map(|(row, date)| {
            let time = times.get(row).map(|t| t.as_ref()).unwrap_or("");
            let parsed = parse_timestamp(date.as_ref(), time, day_first);
            if parsed.is_none() {
                log::debug!(
                    "Unparsable timestamp at body row {}: '{} {}'",
                    row,
                    date.as_ref(),
                    time
                );
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_day_first_is_explicit() {
        assert_eq!(
            parse_timestamp("03/04/2024", "10:15:00", true),
            Some(at(2024, 4, 3, 10, 15, 0))
        );
        assert_eq!(
            parse_timestamp("03/04/2024", "10:15:00", false),
            Some(at(2024, 3, 4, 10, 15, 0))
        );
        assert_eq!(parse_timestamp("25/04/2024", "10:15", false), None);
    }

    #[test]
    fn test_iso_dates_and_fractions() {
        let parsed = parse_timestamp("2024-01-01", "00:00:01.500", true).unwrap();
        assert_eq!(parsed, at(2024, 1, 1, 0, 0, 1) + chrono::Duration::milliseconds(500));
        assert_eq!(parse_timestamp("2024-01-01", "", true), Some(at(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_unparsable_rows_become_none() {
        let dates = vec!["01/01/2024", "garbage", "", "02/01/2024"];
        let times = vec!["00:00:00", "00:30:00", "", "25:99"];
        let column = normalize_timestamps(&dates, &times, true);
        assert_eq!(column.len(), 4);
        assert_eq!(column[0], Some(at(2024, 1, 1, 0, 0, 0)));
        assert_eq!(column[1], None);
        assert_eq!(column[2], None);
        assert_eq!(column[3], None);
    }
}
