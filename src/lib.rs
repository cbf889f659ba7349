//! Run an external pose analyzer over a video and turn its compact JSON output
//! into named, per-frame pose records.

pub mod analysis;
pub mod analyzer;
pub mod error;
pub mod normalize;
pub mod pose;

pub use analysis::{load, RawAnalysis, VideoMetadata};
pub use analyzer::Analyzer;
pub use error::Error;
pub use normalize::{normalize, NormalizedAnalysis};
pub use pose::{part_name, Keypoint, KeypointKind, Pose, PoseEvolution, Position};
