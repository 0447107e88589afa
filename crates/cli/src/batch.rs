use crate::{AppError, JsonEnvelope};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use kinegate_metrics::{
    classify, extract_metrics, list_clips, load_clip, max_ceiling_ratio, write_reports,
    ClipResult, ClipSource, ThresholdConfig,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

pub(super) const DEFAULT_OUT_DIR: &str = "qc-reports";
/// Clips below this frame count carry too little signal for stable velocity
/// statistics and are skipped before extraction.
pub(super) const DEFAULT_MIN_FRAMES: usize = 90;

const CLIP_WORK_QUEUE: usize = 64;
const WORST_K_LIMIT: usize = 10;

pub(super) struct ScanCommand {
    pub dir: PathBuf,
    pub source: &'static (dyn ClipSource + Send + Sync),
    pub out: PathBuf,
    pub threads: Option<usize>,
    pub max_clips: Option<usize>,
    pub min_frames: usize,
    pub strict: bool,
    pub json_output: bool,
    pub thresholds: ThresholdConfig,
}

#[derive(Clone, Debug)]
struct ClipTask {
    clip_index: usize,
    video_id: String,
    path: PathBuf,
}

enum ClipOutcome {
    Done {
        result: ClipResult,
        ceiling_ratio: f64,
    },
    SkippedShort {
        video_id: String,
        frames: usize,
    },
    Failed {
        video_id: String,
        message: String,
    },
}

#[derive(Serialize)]
struct ScanSummary {
    dir: String,
    metrics_csv: String,
    anomalies_csv: String,
    clips_total: usize,
    clips_ok: usize,
    clips_skipped_short: usize,
    clips_failed: usize,
    clips_flagged: usize,
    min_frames: usize,
    duration_ms: u64,
    worst_k: Vec<WorstClip>,
}

#[derive(Serialize)]
struct WorstClip {
    video_id: String,
    max_ceiling_ratio: f64,
    anomalous: bool,
}

struct CollectorStats {
    results: Vec<ClipResult>,
    skipped: Vec<(String, usize)>,
    failed: Vec<(String, String)>,
    ranked: Vec<WorstClip>,
}

pub(super) fn run(command: ScanCommand) -> Result<JsonEnvelope, AppError> {
    let ScanCommand {
        dir,
        source,
        out,
        threads,
        max_clips,
        min_frames,
        strict,
        json_output,
        thresholds,
    } = command;

    if matches!(threads, Some(0)) {
        return Err(AppError::usage("--threads must be >= 1".to_string()));
    }
    if matches!(max_clips, Some(0)) {
        return Err(AppError::usage("--max-clips must be >= 1".to_string()));
    }

    let started = Instant::now();
    let mut entries = list_clips(&dir, source).map_err(|err| {
        AppError::dependency(format!("failed to enumerate {}: {}", dir.display(), err))
    })?;
    if let Some(limit) = max_clips {
        entries.truncate(limit);
    }
    let clips_total = entries.len();

    let progress = build_progress_bar(clips_total);
    let pool = build_thread_pool(threads)?;
    let worker_count = pool.current_num_threads().max(1);

    let (task_tx, task_rx) = bounded::<ClipTask>(CLIP_WORK_QUEUE);
    let (result_tx, result_rx) = unbounded::<(usize, ClipOutcome)>();

    let collector_handle = thread::spawn(move || collect_in_order(result_rx));

    // Dispatch runs off the pool: the scope closure occupies a pool thread,
    // so a blocking send into a full task queue there would leave a
    // single-thread pool with nobody to drain it.
    let dispatch_handle = thread::spawn(move || {
        for (clip_index, entry) in entries.into_iter().enumerate() {
            let task = ClipTask {
                clip_index,
                video_id: entry.video_id,
                path: entry.path,
            };
            if task_tx.send(task).is_err() {
                break;
            }
        }
    });

    pool.scope(|scope| {
        for _ in 0..worker_count {
            let worker_task_rx = task_rx.clone();
            let worker_result_tx = result_tx.clone();
            let worker_progress = progress.clone();
            scope.spawn(move |_| {
                run_worker(
                    worker_task_rx,
                    worker_result_tx,
                    worker_progress,
                    source,
                    min_frames,
                    thresholds,
                );
            });
        }
    });

    drop(result_tx);

    dispatch_handle
        .join()
        .map_err(|_| AppError::internal("scan dispatch thread panicked".to_string()))?;
    let stats = collector_handle
        .join()
        .map_err(|_| AppError::internal("scan collector thread panicked".to_string()))?;

    progress.finish_with_message(format!("processed {} clips", clips_total));

    for (video_id, frames) in &stats.skipped {
        eprintln!(
            "skipped {}: {} frame(s), minimum is {}",
            video_id, frames, min_frames
        );
    }
    for (video_id, message) in &stats.failed {
        eprintln!("failed {}: {}", video_id, message);
    }

    let paths = write_reports(&out, &stats.results).map_err(|err| {
        AppError::dependency(format!("failed to write reports to {}: {}", out.display(), err))
    })?;

    let clips_flagged = stats
        .results
        .iter()
        .filter(|result| result.flags.any())
        .count();
    let mut worst_k = stats.ranked;
    worst_k.sort_by(|left, right| {
        right
            .max_ceiling_ratio
            .total_cmp(&left.max_ceiling_ratio)
            .then_with(|| left.video_id.cmp(&right.video_id))
    });
    worst_k.truncate(WORST_K_LIMIT);

    let summary = ScanSummary {
        dir: dir.display().to_string(),
        metrics_csv: paths.metrics_csv.display().to_string(),
        anomalies_csv: paths.anomalies_csv.display().to_string(),
        clips_total,
        clips_ok: stats.results.len(),
        clips_skipped_short: stats.skipped.len(),
        clips_failed: stats.failed.len(),
        clips_flagged,
        min_frames,
        duration_ms: duration_ms(started),
        worst_k,
    };

    if !json_output {
        print_scan_summary(&summary);
    }

    if strict && summary.clips_failed > 0 {
        return Err(AppError::strict_failure(format!(
            "strict mode failed: {} clip(s) could not be processed",
            summary.clips_failed
        ))
        .with_data(json!(summary)));
    }

    Ok(JsonEnvelope {
        status: "OK".to_string(),
        error: None,
        data: Some(json!(summary)),
    })
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, AppError> {
    let builder = rayon::ThreadPoolBuilder::new();
    let builder = if let Some(n) = threads {
        builder.num_threads(n)
    } else {
        builder
    };
    builder
        .build()
        .map_err(|err| AppError::internal(format!("failed to build scan thread pool: {}", err)))
}

fn build_progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clips ({percent}%)",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn run_worker(
    task_rx: Receiver<ClipTask>,
    result_tx: Sender<(usize, ClipOutcome)>,
    progress: ProgressBar,
    source: &'static (dyn ClipSource + Send + Sync),
    min_frames: usize,
    thresholds: ThresholdConfig,
) {
    while let Ok(task) = task_rx.recv() {
        let clip_index = task.clip_index;
        let outcome = process_clip(task, source, min_frames, &thresholds);
        if result_tx.send((clip_index, outcome)).is_err() {
            break;
        }
        progress.inc(1);
    }
}

/// One clip end to end: load, short-clip filter, extract, classify. Failures
/// are per-clip outcomes, never batch aborts.
fn process_clip(
    task: ClipTask,
    source: &dyn ClipSource,
    min_frames: usize,
    thresholds: &ThresholdConfig,
) -> ClipOutcome {
    let sequences = match load_clip(&task.path, source) {
        Ok(sequences) => sequences,
        Err(err) => {
            return ClipOutcome::Failed {
                video_id: task.video_id,
                message: err.to_string(),
            }
        }
    };

    let frames = sequences.frames();
    if frames < min_frames {
        return ClipOutcome::SkippedShort {
            video_id: task.video_id,
            frames,
        };
    }

    let metrics = match extract_metrics(&sequences.translations, &sequences.rotations) {
        Ok(metrics) => metrics,
        Err(err) => {
            return ClipOutcome::Failed {
                video_id: task.video_id,
                message: err.to_string(),
            }
        }
    };

    let flags = classify(&metrics, thresholds);
    let ceiling_ratio = max_ceiling_ratio(&metrics, thresholds);
    ClipOutcome::Done {
        result: ClipResult {
            video_id: task.video_id,
            metrics,
            flags,
        },
        ceiling_ratio,
    }
}

/// Reassembles outcomes in clip order so report rows and skip notices are
/// deterministic regardless of worker scheduling.
fn collect_in_order(result_rx: Receiver<(usize, ClipOutcome)>) -> CollectorStats {
    let mut buffer = BTreeMap::<usize, ClipOutcome>::new();
    let mut next_expected = 0usize;
    let mut stats = CollectorStats {
        results: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
        ranked: Vec::new(),
    };

    while let Ok((clip_index, outcome)) = result_rx.recv() {
        buffer.insert(clip_index, outcome);
        while let Some(outcome) = buffer.remove(&next_expected) {
            match outcome {
                ClipOutcome::Done {
                    result,
                    ceiling_ratio,
                } => {
                    stats.ranked.push(WorstClip {
                        video_id: result.video_id.clone(),
                        max_ceiling_ratio: ceiling_ratio,
                        anomalous: result.flags.any(),
                    });
                    stats.results.push(result);
                }
                ClipOutcome::SkippedShort { video_id, frames } => {
                    stats.skipped.push((video_id, frames));
                }
                ClipOutcome::Failed { video_id, message } => {
                    stats.failed.push((video_id, message));
                }
            }
            next_expected = next_expected.saturating_add(1);
        }
    }

    stats
}

fn duration_ms(started: Instant) -> u64 {
    let elapsed = started.elapsed();
    let millis = elapsed.as_millis();
    if millis > u128::from(u64::MAX) {
        u64::MAX
    } else {
        millis as u64
    }
}

fn print_scan_summary(summary: &ScanSummary) {
    println!(
        "scan complete: total={} ok={} skipped_short={} failed={} flagged={} metrics={} anomalies={}",
        summary.clips_total,
        summary.clips_ok,
        summary.clips_skipped_short,
        summary.clips_failed,
        summary.clips_flagged,
        summary.metrics_csv,
        summary.anomalies_csv
    );
    if summary.worst_k.is_empty() {
        return;
    }
    println!("worst_k (top {} by ceiling ratio):", summary.worst_k.len());
    for item in &summary.worst_k {
        println!(
            "clip={} ratio={:.6} anomalous={}",
            item.video_id, item.max_ceiling_ratio, item.anomalous
        );
    }
}
