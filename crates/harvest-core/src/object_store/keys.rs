//! Object layout shared by the dispatcher, recorder, ledger and collectors.

use chrono::{DateTime, Utc};

use crate::url_model::sanitize_segment;

/// Mutable pointer to the most recent execution report.
pub const LATEST_REPORT: &str = "scheduler/reports/latest_execution.json";

/// UTC timestamp used in history object names, e.g. `20240131_235959_042`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// `key` with `_<n>` inserted before its extension.
pub fn numbered(key: &str, n: u32) -> String {
    let name_start = key.rfind('/').map_or(0, |i| i + 1);
    match key[name_start..].rfind('.') {
        Some(dot) => {
            let (stem, ext) = key.split_at(name_start + dot);
            format!("{}_{}{}", stem, n, ext)
        }
        None => format!("{}_{}", key, n),
    }
}

pub fn report_history(at: DateTime<Utc>) -> String {
    format!("scheduler/reports/execution_{}.json", timestamp(at))
}

pub fn last_run(collector: &str) -> String {
    format!("metadata/{}/last_run.json", sanitize_segment(collector))
}

pub fn run_history(collector: &str, at: DateTime<Utc>) -> String {
    format!(
        "metadata/{}/run_{}.json",
        sanitize_segment(collector),
        timestamp(at)
    )
}

pub fn raw(collector: &str, year: &str, file: &str) -> String {
    format!(
        "raw/{}/{}/{}",
        sanitize_segment(collector),
        sanitize_segment(year),
        sanitize_segment(file)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn layout_paths() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(
            report_history(at),
            "scheduler/reports/execution_20240305_070809_042.json"
        );
        assert_eq!(last_run("dvf"), "metadata/dvf/last_run.json");
        assert_eq!(run_history("dvf", at), "metadata/dvf/run_20240305_070809_042.json");
        assert_eq!(raw("dvf", "2023", "full.csv.gz"), "raw/dvf/2023/full.csv.gz");
    }

    #[test]
    fn numbered_keys_keep_extension() {
        assert_eq!(
            numbered("metadata/dvf/run_20240305_070809_042.json", 2),
            "metadata/dvf/run_20240305_070809_042_2.json"
        );
        assert_eq!(numbered("a.b/history", 1), "a.b/history_1");
    }

    #[test]
    fn segments_cannot_escape_prefix() {
        assert_eq!(raw("../etc", "2023", "a/b"), "raw/etc/2023/a_b");
    }
}
