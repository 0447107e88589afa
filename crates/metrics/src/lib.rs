//! Kinematic quality control for per-video 3D human-motion reconstructions.
//!
//! The pipeline is two pure stages composed linearly: [`extract_metrics`]
//! turns one clip's translation and rotation sequences into four summary
//! statistics, and [`classify`] turns those statistics into per-dimension
//! anomaly flags against caller-supplied ceilings. Loading clips from disk
//! and writing CSV reports live at the edges, behind [`ClipSource`] and
//! [`write_reports`]; the two stages never touch a path.

mod classify;
mod extract;
mod loader;
mod report;

pub use classify::{
    classify, max_ceiling_ratio, AnomalyFlags, ClipResult, ThresholdConfig,
    DEFAULT_MAX_ACCELERATION, DEFAULT_MAX_ANGULAR_ACCELERATION, DEFAULT_MAX_ANGULAR_VELOCITY,
    DEFAULT_MAX_VELOCITY,
};
pub use extract::{
    extract_metrics, MalformedReason, MetricBundle, MetricError, MIN_FRAMES, ROOT_ROTVEC_DIM,
};
pub use loader::{
    list_clips, load_clip, AnnotationSource, ClipEntry, ClipSequences, ClipSource,
    GlobalParamsSource, LoadError,
};
pub use report::{
    csv_records, first_csv_field, write_reports, ReportPaths, WriteError, ANOMALIES_CSV_NAME,
    METRICS_CSV_COLUMNS, METRICS_CSV_NAME,
};
