use crate::{AppError, JsonEnvelope};
use kinegate_metrics::{csv_records, first_csv_field, METRICS_CSV_COLUMNS};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

pub(super) struct CopyCommand {
    pub csv: PathBuf,
    pub src_dir: PathBuf,
    pub dst_dir: PathBuf,
    pub extension: String,
    pub json_output: bool,
}

#[derive(Serialize)]
struct CopySummary {
    csv: String,
    dst_dir: String,
    copied: usize,
    missing: Vec<String>,
}

pub(super) fn run(command: CopyCommand) -> Result<JsonEnvelope, AppError> {
    let CopyCommand {
        csv,
        src_dir,
        dst_dir,
        extension,
        json_output,
    } = command;

    let content = fs::read_to_string(&csv).map_err(|err| {
        AppError::dependency(format!("failed to read {}: {}", csv.display(), err))
    })?;
    // Quoted ids may span lines, so records are split quote-aware rather
    // than on raw newlines.
    let mut records = csv_records(&content).into_iter();
    let header = records.next().unwrap_or("");
    if first_csv_field(header) != METRICS_CSV_COLUMNS[0] {
        return Err(AppError::usage(format!(
            "{} does not look like a kinegate report (header starts with {:?})",
            csv.display(),
            first_csv_field(header)
        )));
    }

    fs::create_dir_all(&dst_dir).map_err(|err| {
        AppError::dependency(format!("failed to create {}: {}", dst_dir.display(), err))
    })?;

    let mut copied = 0usize;
    let mut missing = Vec::new();
    for record in records {
        if record.trim().is_empty() {
            continue;
        }
        let video_id = first_csv_field(record);
        let file_name = format!("{}.{}", video_id, extension);
        let src = src_dir.join(&file_name);
        if !src.is_file() {
            missing.push(video_id);
            continue;
        }
        let dst = dst_dir.join(&file_name);
        fs::copy(&src, &dst).map_err(|err| {
            AppError::dependency(format!(
                "failed to copy {} to {}: {}",
                src.display(),
                dst.display(),
                err
            ))
        })?;
        copied = copied.saturating_add(1);
    }

    for video_id in &missing {
        eprintln!(
            "missing {}.{} in {}",
            video_id,
            extension,
            src_dir.display()
        );
    }

    let summary = CopySummary {
        csv: csv.display().to_string(),
        dst_dir: dst_dir.display().to_string(),
        copied,
        missing,
    };

    if !json_output {
        println!(
            "copy complete: copied={} missing={} dst={}",
            summary.copied,
            summary.missing.len(),
            summary.dst_dir
        );
    }

    Ok(JsonEnvelope {
        status: "OK".to_string(),
        error: None,
        data: Some(json!(summary)),
    })
}
