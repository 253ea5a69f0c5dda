/// Errors surfaced to whoever embeds the recording panel
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("Recording worker unavailable: {0}")]
    WorkerUnavailable(String),
    #[error("Recording was cancelled")]
    Cancelled,
    #[error("Recording timed out after {0} seconds")]
    Timeout(u64),
    #[error("A recording session is already in progress")]
    Busy,
    #[error("Recorder exited with {status}: {stderr}")]
    WorkerFailed { status: String, stderr: String },
    #[error("Recorder produced no journey code")]
    EmptyArtifact,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordingError {
    /// Short message suitable for showing next to the record button
    pub fn user_message(&self) -> String {
        match self {
            RecordingError::WorkerUnavailable(_) => {
                "The recorder is not running. Check the recorder command.".to_string()
            }
            RecordingError::Cancelled => "Recording stopped.".to_string(),
            RecordingError::Timeout(secs) => {
                format!("Recording took longer than {}s and was stopped.", secs)
            }
            RecordingError::Busy => "A recording is already in progress.".to_string(),
            RecordingError::WorkerFailed { status, .. } => {
                format!("The recorder failed ({}).", status)
            }
            RecordingError::EmptyArtifact => {
                "No actions were recorded. Try again.".to_string()
            }
            RecordingError::Io(_) => "Failed to read the recorded script.".to_string(),
        }
    }
}
