use crate::error::RecordingError;
use crate::messages::RecordingRequest;
use async_trait::async_trait;

/// Channel to whatever process performs the browser recording
///
/// `start_recording` maps to the `record-journey` request and resolves once
/// with the generated journey code. `stop_recording` maps to the `stop`
/// message: it is fire-and-forget and must not block.
#[async_trait]
pub trait RecordingTransport: Send + Sync {
    async fn start_recording(&self, request: RecordingRequest) -> Result<String, RecordingError>;

    fn stop_recording(&self);
}
