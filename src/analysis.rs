//! The document a pose analyzer writes next to the video it analyzed.

use crate::error::Error;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// `[keypoint_id, score, x, y]`
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint(pub i64, pub f64, pub f64, pub f64);

impl RawKeypoint {
    pub fn id(&self) -> i64 {
        self.0
    }

    pub fn score(&self) -> f64 {
        self.1
    }

    pub fn x(&self) -> f64 {
        self.2
    }

    pub fn y(&self) -> f64 {
        self.3
    }
}

/// `[pose_score, [keypoint, ...]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPose(pub f64, pub Vec<RawKeypoint>);

impl RawPose {
    pub fn score(&self) -> f64 {
        self.0
    }

    pub fn keypoints(&self) -> &[RawKeypoint] {
        &self.1
    }
}

pub type RawPoseEvolution = Vec<Vec<RawPose>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    /// Analyzer metadata about the video, passed through untouched.
    pub video: Value,
    pub poses: RawPoseEvolution,
}

impl RawAnalysis {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document = serde_json::from_str(json).map_err(Error::ParseAnalysisJson)?;
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<Self, Error> {
        let object = document.as_object().ok_or(Error::AnalysisNotAnObject)?;
        for &field in &["video", "poses"] {
            if !object.contains_key(field) {
                return Err(Error::MissingField(field));
            }
        }
        serde_json::from_value(document).map_err(Error::InvalidSchema)
    }

    pub fn num_frames(&self) -> usize {
        self.poses.len()
    }

    /// Typed view of the metadata, if the analyzer wrote it in the usual shape.
    pub fn video_metadata(&self) -> Option<VideoMetadata> {
        serde_json::from_value(self.video.clone()).ok()
    }
}

/// What the analyzer conventionally records about the video it sampled.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Frames per second of the sampled frames, after skipping.
    pub fps: Option<f64>,
    #[serde(rename = "w")]
    pub width: Option<u32>,
    #[serde(rename = "h")]
    pub height: Option<u32>,
}

impl VideoMetadata {
    /// Seconds from the start of the video to the sampled frame `frame_index`.
    pub fn frame_timestamp(&self, frame_index: usize) -> Result<Option<f64>, Error> {
        match self.fps {
            Some(fps) if fps > 0.0 => {
                let frame_index = frame_index.to_f64().ok_or(Error::ConvertToF64)?;
                Ok(Some(frame_index / fps))
            }
            _ => Ok(None),
        }
    }

    pub fn duration(&self, num_frames: usize) -> Result<Option<f64>, Error> {
        self.frame_timestamp(num_frames)
    }
}

/// Read and parse the analysis document at `path`.
pub fn load<P>(path: P) -> Result<RawAnalysis, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!(message = "reading analysis", path = %path.display());
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::ReadAnalysis(e, path.to_path_buf()))?;
    let analysis = RawAnalysis::from_json(&contents)?;
    info!(
        message = "loaded analysis",
        path = %path.display(),
        frames = analysis.num_frames()
    );
    Ok(analysis)
}
