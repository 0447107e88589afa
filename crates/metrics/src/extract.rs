use kinegate_rotation::{relative_angle, Quat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the root-joint rotation vector inside a pose parameter row.
pub const ROOT_ROTVEC_DIM: usize = 3;

/// Fewest frames for which both a velocity and an acceleration mean exist.
pub const MIN_FRAMES: usize = 3;

/// Four kinematic summary statistics for one clip. Immutable once computed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetricBundle {
    pub root_mean_velocity: f64,
    pub root_mean_acceleration: f64,
    pub body_mean_angular_velocity: f64,
    pub body_mean_angular_acceleration: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricError {
    InsufficientFrames {
        stream: &'static str,
        frames: usize,
        required: usize,
    },
    MalformedInput {
        stream: &'static str,
        frame_index: usize,
        reason: MalformedReason,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MalformedReason {
    NonFinite { component: usize, value: f64 },
    EmptyPoseFrame,
    PoseFrameTooNarrow { width: usize },
    InconsistentPoseWidth { expected: usize, actual: usize },
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFrames {
                stream,
                frames,
                required,
            } => write!(
                f,
                "{} stream has {} frame(s), need at least {}",
                stream, frames, required
            ),
            Self::MalformedInput {
                stream,
                frame_index,
                reason,
            } => write!(f, "{} frame {}: {}", stream, frame_index, reason),
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { component, value } => {
                write!(f, "component {} is non-finite: {}", component, value)
            }
            Self::EmptyPoseFrame => write!(f, "pose row is empty"),
            Self::PoseFrameTooNarrow { width } => write!(
                f,
                "pose row has width {}, need at least {}",
                width, ROOT_ROTVEC_DIM
            ),
            Self::InconsistentPoseWidth { expected, actual } => {
                write!(f, "pose row width {} differs from first row {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for MetricError {}

/// Converts one clip's raw sequences into the four summary statistics.
///
/// The two streams are index-aligned by convention but validated
/// independently; each needs at least [`MIN_FRAMES`] frames so that neither
/// mean is taken over an empty sample set.
///
/// Pose rows wider than 3 carry concatenated joint parameters; only the
/// first 3 components (the root joint) are used, and wider rows are never
/// rejected. Angular velocity is the angle of the relative rotation between
/// consecutive frames, in `[0, π]`, with no unwrapping across the ±π
/// boundary.
pub fn extract_metrics(
    translations: &[[f64; 3]],
    rotations: &[Vec<f64>],
) -> Result<MetricBundle, MetricError> {
    if translations.len() < MIN_FRAMES {
        return Err(MetricError::InsufficientFrames {
            stream: "translation",
            frames: translations.len(),
            required: MIN_FRAMES,
        });
    }
    if rotations.len() < MIN_FRAMES {
        return Err(MetricError::InsufficientFrames {
            stream: "rotation",
            frames: rotations.len(),
            required: MIN_FRAMES,
        });
    }

    let root_rotvecs = validate_rotations(rotations)?;
    validate_translations(translations)?;

    let velocities: Vec<f64> = translations
        .windows(2)
        .map(|pair| displacement_norm(&pair[0], &pair[1]))
        .collect();
    let accelerations = abs_diffs(&velocities);

    let quats = rotvecs_to_quats(&root_rotvecs);
    let angular_velocities: Vec<f64> = quats
        .windows(2)
        .map(|pair| relative_angle(pair[0], pair[1]))
        .collect();
    let angular_accelerations = abs_diffs(&angular_velocities);

    Ok(MetricBundle {
        root_mean_velocity: mean(&velocities),
        root_mean_acceleration: mean(&accelerations),
        body_mean_angular_velocity: mean(&angular_velocities),
        body_mean_angular_acceleration: mean(&angular_accelerations),
    })
}

fn validate_translations(translations: &[[f64; 3]]) -> Result<(), MetricError> {
    for (frame_index, frame) in translations.iter().enumerate() {
        for (component, value) in frame.iter().enumerate() {
            if !value.is_finite() {
                return Err(MetricError::MalformedInput {
                    stream: "translation",
                    frame_index,
                    reason: MalformedReason::NonFinite {
                        component,
                        value: *value,
                    },
                });
            }
        }
    }
    Ok(())
}

/// Checks pose-row width consistency, then truncates each row to the root
/// rotation vector. Finiteness is only required of the truncated components;
/// the remaining joints never enter the computation.
fn validate_rotations(rotations: &[Vec<f64>]) -> Result<Vec<[f64; 3]>, MetricError> {
    let expected = rotations[0].len();
    let mut out = Vec::with_capacity(rotations.len());

    for (frame_index, frame) in rotations.iter().enumerate() {
        let reason = if frame.is_empty() {
            Some(MalformedReason::EmptyPoseFrame)
        } else if frame.len() != expected {
            Some(MalformedReason::InconsistentPoseWidth {
                expected,
                actual: frame.len(),
            })
        } else if frame.len() < ROOT_ROTVEC_DIM {
            Some(MalformedReason::PoseFrameTooNarrow { width: frame.len() })
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(MetricError::MalformedInput {
                stream: "rotation",
                frame_index,
                reason,
            });
        }

        let mut rotvec = [0.0_f64; ROOT_ROTVEC_DIM];
        for (component, value) in frame[..ROOT_ROTVEC_DIM].iter().enumerate() {
            if !value.is_finite() {
                return Err(MetricError::MalformedInput {
                    stream: "rotation",
                    frame_index,
                    reason: MalformedReason::NonFinite {
                        component,
                        value: *value,
                    },
                });
            }
            rotvec[component] = *value;
        }
        out.push(rotvec);
    }

    Ok(out)
}

fn rotvecs_to_quats(rotvecs: &[[f64; 3]]) -> Vec<Quat> {
    rotvecs
        .iter()
        .map(|rotvec| {
            // A silent identity substitute here would skew the angular means;
            // validation guarantees finite components, so panic if it slips.
            Quat::from_rotvec(*rotvec).expect("rotation components validated finite")
        })
        .collect()
}

fn displacement_norm(from: &[f64; 3], to: &[f64; 3]) -> f64 {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    let dz = to[2] - from[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn abs_diffs(samples: &[f64]) -> Vec<f64> {
    samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect()
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}
