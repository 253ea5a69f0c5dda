use crate::error::RecordingError;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Value of the `type` property that selects suite recording
pub const SUITE_MARKER: &str = "suite";

/// Recording mode selected by the embedding caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingKind {
    #[default]
    Journey,
    Suite,
}

impl RecordingKind {
    /// Only the exact suite marker selects suite mode
    pub fn from_type(value: &str) -> Self {
        if value == SUITE_MARKER {
            RecordingKind::Suite
        } else {
            RecordingKind::Journey
        }
    }

    pub fn is_suite(self) -> bool {
        self == RecordingKind::Suite
    }
}

/// Payload of the `record-journey` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRequest {
    pub url: String,
    pub is_suite: bool,
}

impl RecordingRequest {
    pub fn new(url: impl Into<String>, kind: RecordingKind) -> Self {
        Self {
            url: url.into(),
            is_suite: kind.is_suite(),
        }
    }
}

/// Panel state (observable via watch channel)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Idle,
    Recording,
}

impl PanelState {
    pub fn button_label(self) -> &'static str {
        match self {
            PanelState::Idle => "Start Recording",
            PanelState::Recording => "Stop Recording",
        }
    }
}

/// Commands for the Worker service
pub enum WorkerCommand {
    RecordJourney {
        request: RecordingRequest,
        reply: oneshot::Sender<Result<String, RecordingError>>,
    },
    Stop,
}
