use crate::error::Error;
use num_traits::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    /// Look up the keypoint for an analyzer keypoint id.
    ///
    /// Ids outside the table are rejected, never wrapped or defaulted.
    pub fn from_id(id: i64) -> Result<Self, Error> {
        Self::from_i64(id).ok_or(Error::KeypointIdOutOfRange(id))
    }

    pub fn id(self) -> usize {
        // every variant is a small non-negative discriminant
        self.to_usize().unwrap_or_default()
    }

    /// The body-part name the analyzer's pose model uses for this keypoint.
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }
}

impl std::fmt::Display for KeypointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub const NUM_KEYPOINTS: usize = 17;

/// Name of the body part for a keypoint id.
pub fn part_name(id: i64) -> Result<&'static str, Error> {
    KeypointKind::from_id(id).map(KeypointKind::name)
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: KeypointKind,
    pub score: f64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub score: f64,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn keypoint(&self, part: KeypointKind) -> Option<&Keypoint> {
        self.keypoints.iter().find(|keypoint| keypoint.part == part)
    }
}

/// One entry per frame, each holding the poses detected in that frame.
pub type PoseEvolution = Vec<Vec<Pose>>;
