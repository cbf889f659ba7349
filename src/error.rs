use std::{path::PathBuf, process::ExitStatus, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to spawn pose analyzer {0:?}")]
    SpawnAnalyzer(#[source] std::io::Error, PathBuf),

    #[error("failed to wait for pose analyzer")]
    WaitAnalyzer(#[source] std::io::Error),

    #[error("failed to kill pose analyzer")]
    KillAnalyzer(#[source] std::io::Error),

    #[error("pose analyzer exited unsuccessfully: {0}")]
    AnalyzerFailed(ExitStatus),

    #[error("pose analyzer did not produce {0:?}")]
    MissingAnalyzerOutput(PathBuf),

    #[error("pose analyzer produced an empty file: {0:?}")]
    EmptyAnalyzerOutput(PathBuf),

    #[error("pose analyzer output {0:?} predates the analyzer run")]
    StaleAnalyzerOutput(PathBuf),

    #[error("failed to stat pose analyzer output {1:?}")]
    StatAnalyzerOutput(#[source] std::io::Error, PathBuf),

    #[error("pose analyzer did not finish within {0:?}")]
    AnalyzerTimeout(Duration),

    #[error("interrupted while waiting for pose analyzer")]
    Interrupted,

    #[error("failed to read analysis file {1:?}")]
    ReadAnalysis(#[source] std::io::Error, PathBuf),

    #[error("analysis is not well-formed JSON")]
    ParseAnalysisJson(#[source] serde_json::Error),

    #[error("analysis document is not a JSON object")]
    AnalysisNotAnObject,

    #[error("analysis document is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("analysis document does not match the expected schema")]
    InvalidSchema(#[source] serde_json::Error),

    #[error("keypoint id {0} is outside the known keypoint table")]
    KeypointIdOutOfRange(i64),

    #[error("failed to convert value to f64")]
    ConvertToF64,
}

impl Error {
    /// Whether this error was caused by the external analyzer rather than by its output.
    pub fn is_external_tool(&self) -> bool {
        matches!(
            self,
            Self::SpawnAnalyzer(..)
                | Self::WaitAnalyzer(_)
                | Self::KillAnalyzer(_)
                | Self::AnalyzerFailed(_)
                | Self::MissingAnalyzerOutput(_)
                | Self::EmptyAnalyzerOutput(_)
                | Self::StaleAnalyzerOutput(_)
                | Self::StatAnalyzerOutput(..)
        )
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::ReadAnalysis(..) | Self::ParseAnalysisJson(_))
    }

    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            Self::AnalysisNotAnObject | Self::MissingField(_) | Self::InvalidSchema(_)
        )
    }
}
