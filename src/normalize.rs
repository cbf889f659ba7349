use crate::{
    analysis::{RawAnalysis, RawKeypoint, RawPose},
    error::Error,
    pose::{Keypoint, KeypointKind, Pose, PoseEvolution, Position},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

fn normalize_keypoint(keypoint: &RawKeypoint) -> Result<Keypoint, Error> {
    Ok(Keypoint {
        part: KeypointKind::from_id(keypoint.id())?,
        score: keypoint.score(),
        position: Position::new(keypoint.x(), keypoint.y()),
    })
}

fn normalize_pose(pose: &RawPose) -> Result<Pose, Error> {
    Ok(Pose {
        score: pose.score(),
        keypoints: pose
            .keypoints()
            .iter()
            .map(normalize_keypoint)
            .collect::<Result<_, _>>()?,
    })
}

/// Replace keypoint ids with named parts, frame by frame.
///
/// Frame, pose, and keypoint order are preserved. Any keypoint id outside the
/// keypoint table fails the whole transform.
pub fn normalize(analysis: &RawAnalysis) -> Result<PoseEvolution, Error> {
    let evolution = analysis
        .poses
        .iter()
        .map(|frame| frame.iter().map(normalize_pose).collect::<Result<Vec<_>, _>>())
        .collect::<Result<PoseEvolution, _>>()?;
    debug!(
        message = "normalized poses",
        frames = evolution.len(),
        poses = evolution.iter().map(Vec::len).sum::<usize>()
    );
    Ok(evolution)
}

/// Normalized poses alongside the analyzer's untouched video metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnalysis {
    pub video: Value,
    pub poses: PoseEvolution,
}

impl NormalizedAnalysis {
    pub fn new(analysis: &RawAnalysis) -> Result<Self, Error> {
        Ok(Self {
            video: analysis.video.clone(),
            poses: normalize(analysis)?,
        })
    }
}
