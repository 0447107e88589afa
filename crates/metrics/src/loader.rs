//! Clip loading. The two on-disk conventions this tool meets in the wild are
//! isolated here, behind one trait, so the metric core never sees a schema or
//! a filesystem path.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One clip's materialized sequences, frame-aligned by construction of the
/// source file. Pose rows keep their on-disk width; truncation to the root
/// rotation happens in the metric core.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSequences {
    pub translations: Vec<[f64; 3]>,
    pub rotations: Vec<Vec<f64>>,
}

impl ClipSequences {
    pub fn frames(&self) -> usize {
        self.translations.len()
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    BadTranslationWidth { frame_index: usize, width: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Json(err) => write!(f, "json error: {}", err),
            Self::BadTranslationWidth { frame_index, width } => write!(
                f,
                "translation frame {} has width {}, expected 3",
                frame_index, width
            ),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// A directory convention that can produce frame-aligned sequences for a
/// clip. Implementations own their file schema entirely.
pub trait ClipSource {
    /// File extension (without dot) this source claims in a clip directory.
    fn extension(&self) -> &'static str;

    fn parse(&self, bytes: &[u8]) -> Result<ClipSequences, LoadError>;
}

/// GVHMR-style export: one JSON file per clip carrying the global SMPL
/// parameter tree. Pose rows are 63 wide (21 joints, axis-angle).
pub struct GlobalParamsSource;

#[derive(Deserialize)]
struct GlobalParamsFile {
    smpl_params_global: GlobalParams,
}

#[derive(Deserialize)]
struct GlobalParams {
    transl: Vec<Vec<f64>>,
    body_pose: Vec<Vec<f64>>,
}

impl ClipSource for GlobalParamsSource {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, bytes: &[u8]) -> Result<ClipSequences, LoadError> {
        let file: GlobalParamsFile = serde_json::from_slice(bytes)?;
        Ok(ClipSequences {
            translations: convert_translations(file.smpl_params_global.transl)?,
            rotations: file.smpl_params_global.body_pose,
        })
    }
}

/// Motion-X-style export: one JSON file per clip with a per-frame annotation
/// list, SMPL-X parameters nested inside each record.
pub struct AnnotationSource;

#[derive(Deserialize)]
struct AnnotationFile {
    annotations: Vec<AnnotationRecord>,
}

#[derive(Deserialize)]
struct AnnotationRecord {
    smplx_params: SmplxParams,
}

#[derive(Deserialize)]
struct SmplxParams {
    trans: Vec<f64>,
    pose_body: Vec<f64>,
}

impl ClipSource for AnnotationSource {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, bytes: &[u8]) -> Result<ClipSequences, LoadError> {
        let file: AnnotationFile = serde_json::from_slice(bytes)?;
        let mut translations = Vec::with_capacity(file.annotations.len());
        let mut rotations = Vec::with_capacity(file.annotations.len());
        for record in file.annotations {
            translations.push(record.smplx_params.trans);
            rotations.push(record.smplx_params.pose_body);
        }
        Ok(ClipSequences {
            translations: convert_translations(translations)?,
            rotations,
        })
    }
}

fn convert_translations(rows: Vec<Vec<f64>>) -> Result<Vec<[f64; 3]>, LoadError> {
    let mut out = Vec::with_capacity(rows.len());
    for (frame_index, row) in rows.into_iter().enumerate() {
        if row.len() != 3 {
            return Err(LoadError::BadTranslationWidth {
                frame_index,
                width: row.len(),
            });
        }
        out.push([row[0], row[1], row[2]]);
    }
    Ok(out)
}

/// A clip discovered in a directory: file stem as identifier, full path for
/// loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClipEntry {
    pub video_id: String,
    pub path: PathBuf,
}

/// Enumerates clips the source claims, sorted by identifier so batch order is
/// deterministic across platforms.
pub fn list_clips(dir: &Path, source: &dyn ClipSource) -> Result<Vec<ClipEntry>, LoadError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let claimed = path
            .extension()
            .map(|ext| ext == source.extension())
            .unwrap_or(false);
        if !claimed {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        entries.push(ClipEntry {
            video_id: stem.to_string(),
            path,
        });
    }
    entries.sort_by(|left, right| left.video_id.cmp(&right.video_id));
    Ok(entries)
}

pub fn load_clip(path: &Path, source: &dyn ClipSource) -> Result<ClipSequences, LoadError> {
    let bytes = fs::read(path)?;
    source.parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn global_params_schema_parses() {
        let pose = vec![0.0_f64; 6];
        let bytes = serde_json::to_vec(&json!({
            "smpl_params_global": {
                "transl": [[0.0, 0.0, 0.0], [0.1, 0.0, 0.0]],
                "body_pose": [pose.clone(), pose],
            }
        }))
        .expect("fixture json");

        let sequences = GlobalParamsSource.parse(&bytes).expect("parse");
        assert_eq!(sequences.frames(), 2);
        assert_eq!(sequences.translations[1], [0.1, 0.0, 0.0]);
        assert_eq!(sequences.rotations[0].len(), 6);
    }

    #[test]
    fn annotation_schema_parses() {
        let bytes = serde_json::to_vec(&json!({
            "annotations": [
                {"smplx_params": {"trans": [0.0, 0.0, 0.0], "pose_body": [0.1, 0.2, 0.3]}},
                {"smplx_params": {"trans": [0.0, 0.1, 0.0], "pose_body": [0.1, 0.2, 0.4]}},
            ]
        }))
        .expect("fixture json");

        let sequences = AnnotationSource.parse(&bytes).expect("parse");
        assert_eq!(sequences.frames(), 2);
        assert_eq!(sequences.translations[1], [0.0, 0.1, 0.0]);
        assert_eq!(sequences.rotations[1], vec![0.1, 0.2, 0.4]);
    }

    #[test]
    fn bad_translation_width_is_reported_with_frame() {
        let bytes = serde_json::to_vec(&json!({
            "smpl_params_global": {
                "transl": [[0.0, 0.0, 0.0], [0.1, 0.0]],
                "body_pose": [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            }
        }))
        .expect("fixture json");

        let err = GlobalParamsSource.parse(&bytes).expect_err("bad width");
        assert!(matches!(
            err,
            LoadError::BadTranslationWidth {
                frame_index: 1,
                width: 2,
            }
        ));
    }

    #[test]
    fn missing_schema_key_is_a_json_error() {
        let err = GlobalParamsSource
            .parse(br#"{"annotations": []}"#)
            .expect_err("wrong schema");
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn list_clips_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b_clip.json", "a_clip.json", "notes.txt"] {
            fs::write(dir.path().join(name), b"{}").expect("write fixture");
        }

        let entries = list_clips(dir.path(), &GlobalParamsSource).expect("list");
        let ids: Vec<&str> = entries.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a_clip", "b_clip"]);
    }
}
