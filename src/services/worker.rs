use crate::error::RecordingError;
use crate::messages::{RecordingRequest, WorkerCommand};
use crate::transport::RecordingTransport;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

/// Process group led by the recorder shell
///
/// Recorder commands fork (`npx` starts node, node starts the browser), so
/// stopping signals the whole group rather than the shell alone. Dropping the
/// group kills whatever is left of it.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                Ok(()) => tracing::debug!("Killed recorder process group {}", pgid),
                // Group already gone
                Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!("Failed to kill recorder process group {}: {}", pgid, e),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = pgid;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// A recorder process that is currently driving a browser
struct Session {
    child: Child,
    group: ProcessGroup,
    output: NamedTempFile,
    stdout: NamedTempFile,
    stderr: NamedTempFile,
    reply: oneshot::Sender<Result<String, RecordingError>>,
}

impl Session {
    /// Kill the recorder and everything it started, then reap the shell.
    async fn terminate(&mut self) {
        self.group.kill();

        // Covers platforms without process groups; a no-op once the shell is dead
        if let Err(e) = self.child.kill().await {
            tracing::warn!("Failed to kill recorder: {}", e);
        }
    }
}

/// Drives the external recorder process on behalf of the panel
///
/// This service:
/// - Receives `record-journey` and `stop` commands via channel
/// - Spawns the configured recorder command for each journey
/// - Replies with the generated code once the recorder exits
/// - Kills the recorder's whole process group when asked to stop, or when the
///   worker shuts down or is dropped
///
/// The recorder learns what to record from the environment:
/// `JOURNEY_URL`, `JOURNEY_SUITE` (`true`/`false`) and `JOURNEY_OUTPUT`, a
/// file it may write the generated code to. When that file is left empty the
/// recorder's stdout is used instead.
pub struct Worker {
    command: String,
    cmd_rx: mpsc::Receiver<WorkerCommand>,
    session: Option<Session>,
}

impl Worker {
    pub fn new(command: impl Into<String>, cmd_rx: mpsc::Receiver<WorkerCommand>) -> Self {
        Self {
            command: command.into(),
            cmd_rx,
            session: None,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },

                // Only polled while a recorder is running
                status = wait_for_exit(&mut self.session), if self.session.is_some() => {
                    self.finish_session(status).await;
                }
            }
        }

        if let Some(mut session) = self.session.take() {
            tracing::info!("Worker shutting down, killing active recorder");
            session.terminate().await;
            let _ = session.reply.send(Err(RecordingError::Cancelled));
        }
    }

    async fn handle_command(&mut self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::RecordJourney { request, reply } => {
                if self.session.is_some() {
                    tracing::warn!("Rejecting record-journey, a recorder is already running");
                    let _ = reply.send(Err(RecordingError::Busy));
                    return;
                }

                match self.spawn_recorder(&request) {
                    Ok((child, output, stdout, stderr)) => {
                        tracing::info!(
                            "Recorder started for {} (suite: {})",
                            request.url,
                            request.is_suite
                        );
                        self.session = Some(Session {
                            group: ProcessGroup::new(&child),
                            child,
                            output,
                            stdout,
                            stderr,
                            reply,
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to start recorder: {}", e);
                        let _ = reply.send(Err(e));
                    }
                }
            }

            WorkerCommand::Stop => {
                let Some(mut session) = self.session.take() else {
                    tracing::debug!("Stop received with no active recorder");
                    return;
                };

                session.terminate().await;

                let _ = session.reply.send(Err(RecordingError::Cancelled));
                tracing::info!("Recorder stopped");
            }
        }
    }

    fn spawn_recorder(
        &self,
        request: &RecordingRequest,
    ) -> Result<(Child, NamedTempFile, NamedTempFile, NamedTempFile), RecordingError> {
        let output = journey_temp_file(".js")?;
        let stdout = journey_temp_file(".out")?;
        let stderr = journey_temp_file(".err")?;

        // Output goes to files so a chatty recorder can never fill a pipe and stall
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .env("JOURNEY_URL", &request.url)
            .env("JOURNEY_SUITE", request.is_suite.to_string())
            .env("JOURNEY_OUTPUT", output.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.reopen()?))
            .stderr(Stdio::from(stderr.reopen()?))
            .kill_on_drop(true);

        // New group with the shell as leader, so stop reaches its descendants
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| {
                RecordingError::WorkerUnavailable(format!(
                    "Failed to spawn `{}`: {}",
                    self.command, e
                ))
            })?;

        Ok((child, output, stdout, stderr))
    }

    async fn finish_session(&mut self, status: std::io::Result<ExitStatus>) {
        let Some(session) = self.session.take() else {
            return;
        };

        let result = match status {
            Ok(status) => collect_journey_code(&session, status).await,
            Err(e) => Err(RecordingError::Io(e)),
        };

        match &result {
            Ok(code) => tracing::info!("Recorder finished: {} chars of journey code", code.len()),
            Err(e) => tracing::error!("Recorder failed: {}", e),
        }

        let _ = session.reply.send(result);
    }
}

async fn wait_for_exit(session: &mut Option<Session>) -> std::io::Result<ExitStatus> {
    match session {
        Some(session) => session.child.wait().await,
        None => std::future::pending().await,
    }
}

async fn collect_journey_code(
    session: &Session,
    status: ExitStatus,
) -> Result<String, RecordingError> {
    if !status.success() {
        let stderr = tokio::fs::read_to_string(session.stderr.path()).await?;
        return Err(RecordingError::WorkerFailed {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    let code = tokio::fs::read_to_string(session.output.path()).await?;
    if !code.trim().is_empty() {
        return Ok(code);
    }

    let code = tokio::fs::read_to_string(session.stdout.path()).await?;
    if !code.trim().is_empty() {
        return Ok(code);
    }

    Err(RecordingError::EmptyArtifact)
}

fn journey_temp_file(suffix: &str) -> Result<NamedTempFile, RecordingError> {
    Ok(tempfile::Builder::new()
        .prefix("journey-")
        .suffix(suffix)
        .tempfile()?)
}

/// Handle for communicating with the Worker
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerCommand>,
}

impl WorkerHandle {
    pub fn new(tx: mpsc::Sender<WorkerCommand>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl RecordingTransport for WorkerHandle {
    async fn start_recording(&self, request: RecordingRequest) -> Result<String, RecordingError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerCommand::RecordJourney { request, reply })
            .await
            .map_err(|e| {
                RecordingError::WorkerUnavailable(format!(
                    "Failed to send record-journey command: {}",
                    e
                ))
            })?;

        rx.await.map_err(|e| {
            RecordingError::WorkerUnavailable(format!("Failed to receive journey code: {}", e))
        })?
    }

    fn stop_recording(&self) {
        if let Err(e) = self.tx.try_send(WorkerCommand::Stop) {
            tracing::warn!("Failed to send stop command: {}", e);
        }
    }
}
