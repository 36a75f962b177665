use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T\s]|$)").expect("valid regex"));

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y",
    "%b. %d, %Y", "%d %B, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Normalize a publication date to `YYYY-MM-DD` when it has a recognizable
/// shape. Anything else (e.g. a bare year) is returned trimmed.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.date_naive().to_string();
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().to_string();
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.to_string();
        }
    }
    if let Some(caps) = ISO_PREFIX.captures(raw) {
        if let Ok(d) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            return d.to_string();
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_shapes() {
        for (input, expected) in [
            ("2023-05-01", "2023-05-01"),
            ("2023/05/01", "2023-05-01"),
            ("20230501", "2023-05-01"),
            ("2023-05-01T10:00:00Z", "2023-05-01"),
            ("2023-05-01T10:00:00.000-04:00", "2023-05-01"),
            ("1 May 2023", "2023-05-01"),
            ("May 1, 2023", "2023-05-01"),
            ("Mon, 01 May 2023 10:00:00 +0000", "2023-05-01"),
            ("2023-05-01 08:30", "2023-05-01"),
        ] {
            assert_eq!(normalize_date(input), expected, "{input}");
        }
    }

    #[test]
    fn unknown_shapes_pass_through() {
        assert_eq!(normalize_date(" 2023 "), "2023");
        assert_eq!(normalize_date("Spring 2021"), "Spring 2021");
        assert_eq!(normalize_date(""), "");
    }
}
