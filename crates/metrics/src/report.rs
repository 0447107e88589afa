//! CSV report artifacts: the full metrics table and the flagged-only table.

use crate::classify::ClipResult;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const METRICS_CSV_COLUMNS: &[&str] = &[
    "video_id",
    "root_mean_velocity",
    "root_mean_acceleration",
    "body_mean_angular_velocity",
    "body_mean_angular_acceleration",
];

pub const METRICS_CSV_NAME: &str = "metrics.csv";
pub const ANOMALIES_CSV_NAME: &str = "anomalies.csv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPaths {
    pub metrics_csv: PathBuf,
    pub anomalies_csv: PathBuf,
}

#[derive(Debug)]
pub enum WriteError {
    Io(std::io::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<std::io::Error> for WriteError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Writes `metrics.csv` (all results, in order) and `anomalies.csv` (only
/// clips with at least one flag set). LF line endings; floats in shortest
/// round-trip form.
pub fn write_reports<P: AsRef<Path>>(
    out_dir: P,
    results: &[ClipResult],
) -> Result<ReportPaths, WriteError> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;

    let metrics_csv = out_dir.join(METRICS_CSV_NAME);
    write_string_lf(&metrics_csv, &build_csv(results, false))?;

    let anomalies_csv = out_dir.join(ANOMALIES_CSV_NAME);
    write_string_lf(&anomalies_csv, &build_csv(results, true))?;

    Ok(ReportPaths {
        metrics_csv,
        anomalies_csv,
    })
}

fn build_csv(results: &[ClipResult], only_flagged: bool) -> String {
    let mut out = String::new();
    out.push_str(&METRICS_CSV_COLUMNS.join(","));
    out.push('\n');

    for result in results {
        if only_flagged && !result.flags.any() {
            continue;
        }
        out.push_str(&csv_field(&result.video_id));
        for value in [
            result.metrics.root_mean_velocity,
            result.metrics.root_mean_acceleration,
            result.metrics.body_mean_angular_velocity,
            result.metrics.body_mean_angular_acceleration,
        ] {
            out.push(',');
            out.push_str(&format!("{}", value));
        }
        out.push('\n');
    }

    out
}

/// Quotes a field when it contains a comma, quote, or newline; embedded
/// quotes are doubled. Clip ids come from file stems, which are arbitrary.
fn csv_field(value: &str) -> String {
    let needs_quoting = value.contains(',') || value.contains('"') || value.contains('\n');
    if !needs_quoting {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn write_string_lf(path: &Path, content: &str) -> Result<(), WriteError> {
    fs::write(path, content.as_bytes())?;
    Ok(())
}

/// Splits CSV content into records, honoring the quoting rules of
/// [`csv_field`]: a newline inside an open quote continues the record
/// instead of ending it. The trailing newline does not produce an empty
/// record.
pub fn csv_records(content: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (index, ch) in content.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' if !in_quotes => {
                records.push(&content[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    if start < content.len() {
        records.push(&content[start..]);
    }
    records
}

/// Extracts the first field of a CSV record, honoring the quoting rules of
/// [`csv_field`]. Used by consumers of `anomalies.csv` that only need ids.
pub fn first_csv_field(line: &str) -> String {
    if !line.starts_with('"') {
        return line.split(',').next().unwrap_or("").to_string();
    }

    let mut out = String::new();
    let mut chars = line[1..].chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                break;
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AnomalyFlags;
    use crate::extract::MetricBundle;

    fn result(video_id: &str, velocity: f64, flagged: bool) -> ClipResult {
        ClipResult {
            video_id: video_id.to_string(),
            metrics: MetricBundle {
                root_mean_velocity: velocity,
                root_mean_acceleration: 0.25,
                body_mean_angular_velocity: 0.5,
                body_mean_angular_acceleration: 0.125,
            },
            flags: AnomalyFlags {
                root_velocity: flagged,
                root_acceleration: false,
                angular_velocity: false,
                angular_acceleration: false,
            },
        }
    }

    #[test]
    fn both_tables_are_written_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let results = vec![result("calm", 0.01, false), result("wild", 1.5, true)];

        let paths = write_reports(dir.path(), &results).expect("write");
        let metrics = fs::read_to_string(&paths.metrics_csv).expect("metrics csv");
        let anomalies = fs::read_to_string(&paths.anomalies_csv).expect("anomalies csv");

        assert_eq!(
            metrics,
            "video_id,root_mean_velocity,root_mean_acceleration,\
             body_mean_angular_velocity,body_mean_angular_acceleration\n\
             calm,0.01,0.25,0.5,0.125\n\
             wild,1.5,0.25,0.5,0.125\n"
        );
        assert_eq!(
            anomalies.lines().count(),
            2,
            "anomalies carries header plus the flagged row"
        );
        assert!(anomalies.lines().nth(1).expect("row").starts_with("wild,"));
    }

    #[test]
    fn empty_results_still_write_headers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = write_reports(dir.path(), &[]).expect("write");
        let metrics = fs::read_to_string(&paths.metrics_csv).expect("metrics csv");
        assert_eq!(metrics.lines().count(), 1);
        assert!(metrics.ends_with('\n'));
    }

    #[test]
    fn awkward_ids_round_trip_through_quoting() {
        for id in ["plain", "with,comma", "with \"quotes\"", "multi\nline"] {
            let escaped = csv_field(id);
            assert_eq!(first_csv_field(&escaped), id);
        }
    }

    #[test]
    fn record_splitting_keeps_quoted_newlines_intact() {
        let results = vec![result("multi\nline", 1.5, true), result("plain", 0.9, true)];
        let content = build_csv(&results, true);

        let records = csv_records(&content);
        assert_eq!(records.len(), 3, "header plus two records");
        assert_eq!(first_csv_field(records[1]), "multi\nline");
        assert_eq!(first_csv_field(records[2]), "plain");
    }
}
