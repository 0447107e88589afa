use crate::extract::MetricBundle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_VELOCITY: f64 = 0.085;
pub const DEFAULT_MAX_ACCELERATION: f64 = 0.06;
pub const DEFAULT_MAX_ANGULAR_VELOCITY: f64 = 0.085;
pub const DEFAULT_MAX_ANGULAR_ACCELERATION: f64 = 0.06;

/// Per-metric ceilings. Supplied by the caller, never baked into the
/// computation; units are whatever units the input sequences use.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ThresholdConfig {
    pub max_velocity: f64,
    pub max_acceleration: f64,
    pub max_angular_velocity: f64,
    pub max_angular_acceleration: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_acceleration: DEFAULT_MAX_ACCELERATION,
            max_angular_velocity: DEFAULT_MAX_ANGULAR_VELOCITY,
            max_angular_acceleration: DEFAULT_MAX_ANGULAR_ACCELERATION,
        }
    }
}

/// One flag per metric dimension; a clip is anomalous iff any flag is set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnomalyFlags {
    pub root_velocity: bool,
    pub root_acceleration: bool,
    pub angular_velocity: bool,
    pub angular_acceleration: bool,
}

impl AnomalyFlags {
    pub fn any(&self) -> bool {
        self.root_velocity
            || self.root_acceleration
            || self.angular_velocity
            || self.angular_acceleration
    }
}

/// Independent strict-greater-than comparison per field. A metric exactly
/// equal to its ceiling is not anomalous.
pub fn classify(metrics: &MetricBundle, thresholds: &ThresholdConfig) -> AnomalyFlags {
    AnomalyFlags {
        root_velocity: metrics.root_mean_velocity > thresholds.max_velocity,
        root_acceleration: metrics.root_mean_acceleration > thresholds.max_acceleration,
        angular_velocity: metrics.body_mean_angular_velocity > thresholds.max_angular_velocity,
        angular_acceleration: metrics.body_mean_angular_acceleration
            > thresholds.max_angular_acceleration,
    }
}

/// Largest metric-to-ceiling ratio across the four dimensions. Used to rank
/// the worst clips in batch summaries; values above 1.0 are flagged clips.
pub fn max_ceiling_ratio(metrics: &MetricBundle, thresholds: &ThresholdConfig) -> f64 {
    [
        metrics.root_mean_velocity / thresholds.max_velocity,
        metrics.root_mean_acceleration / thresholds.max_acceleration,
        metrics.body_mean_angular_velocity / thresholds.max_angular_velocity,
        metrics.body_mean_angular_acceleration / thresholds.max_angular_acceleration,
    ]
    .into_iter()
    .fold(0.0_f64, f64::max)
}

/// Final per-clip record: identifier, metrics, and flags. Created once after
/// both stages have run; never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClipResult {
    pub video_id: String,
    pub metrics: MetricBundle,
    pub flags: AnomalyFlags,
}
