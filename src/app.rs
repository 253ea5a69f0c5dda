use crate::config::Config;
use crate::error::RecordingError;
use crate::input::{self, InputEvent};
use crate::messages::PanelState;
use crate::panel::{Panel, PanelProps, SessionOutcome};
use crate::preview::Highlighter;
use crate::services::{Worker, WorkerHandle};

use anyhow::Result;
use tokio::sync::{mpsc, watch};

/// Terminal host that embeds the recording panel
///
/// It owns the panel properties: the configured URL and recording type, and
/// the code shown in the preview, which is replaced every time a recording
/// completes.
pub struct App {
    config: Config,
    props: PanelProps,
    panel: Panel<WorkerHandle>,
    highlighter: Highlighter,
    scroll: usize,
    /// Why the last recording failed, shown until the next click
    last_error: Option<String>,
    state_rx: watch::Receiver<PanelState>,
    input_rx: mpsc::Receiver<InputEvent>,
    done_rx: mpsc::UnboundedReceiver<String>,
    outcome_tx: mpsc::UnboundedSender<Result<SessionOutcome, RecordingError>>,
    outcome_rx: mpsc::UnboundedReceiver<Result<SessionOutcome, RecordingError>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let worker = Self::setup_worker(&config.recorder_command);

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let panel = Panel::new(worker, config.timeout(), move |code| {
            let _ = done_tx.send(code);
        });

        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let input_rx = Self::setup_input();
        let props = PanelProps::new(config.url.clone(), &config.recording_type, "");
        let state_rx = panel.subscribe();

        tracing::info!(
            "Ready! Press Enter to start/stop recording {} ({:?})",
            props.url,
            props.kind
        );

        Self {
            config,
            props,
            panel,
            highlighter: Highlighter::new(),
            scroll: 0,
            last_error: None,
            state_rx,
            input_rx,
            done_rx,
            outcome_tx,
            outcome_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        self.render();

        loop {
            tracing::debug!("Main loop: waiting for event");
            tokio::select! {
                Some(event) = self.input_rx.recv() => {
                    match event {
                        InputEvent::Toggle => self.handle_toggle(),
                        InputEvent::ScrollUp => self.scroll_by(-1),
                        InputEvent::ScrollDown => self.scroll_by(1),
                        InputEvent::Quit => break,
                    }
                }

                Some(code) = self.done_rx.recv() => {
                    tracing::info!("Received {} chars of journey code", code.len());
                    self.props.code = code;
                    self.scroll = 0;
                    self.render();
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    match outcome {
                        Ok(outcome) => tracing::debug!("Recording session ended: {:?}", outcome),
                        Err(e) => {
                            tracing::error!("Recording failed: {}", e);
                            self.last_error = Some(e.user_message());
                            self.render();
                        }
                    }
                }

                Ok(()) = self.state_rx.changed() => {
                    self.render();
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        if self.panel.state() == PanelState::Recording {
            // Toggling while recording only stops, nothing new starts
            let _ = self.panel.on_record(&self.props);
        }

        tracing::info!("Journey recorder shutdown complete");
        Ok(())
    }

    fn handle_toggle(&mut self) {
        self.last_error = None;
        let Some(pending) = self.panel.on_record(&self.props) else {
            tracing::debug!("handle_toggle: recording stopped");
            return;
        };

        tracing::debug!(
            "handle_toggle: waiting on session {}, button reads {:?}",
            pending.session_id(),
            self.panel.button_label()
        );

        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let _ = outcome_tx.send(pending.wait().await);
        });
    }

    fn scroll_by(&mut self, delta: isize) {
        let rows = self.panel.view(&self.props).preview().lines().len();
        let max_scroll = rows.saturating_sub(self.config.preview_max_rows);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max_scroll);
        self.render();
    }

    fn render(&self) {
        let view = self
            .panel
            .view(&self.props)
            .with_preview_rows(self.config.preview_min_rows, self.config.preview_max_rows)
            .with_status(self.last_error.as_deref());
        let rendered = view.render(self.scroll, self.config.color, &self.highlighter);

        if self.config.color {
            // Clear the screen and home the cursor
            print!("\x1b[2J\x1b[H");
        }
        println!("{}", rendered);
    }

    fn setup_worker(recorder_command: &str) -> WorkerHandle {
        let (worker_tx, worker_rx) = mpsc::channel(10);
        let worker = Worker::new(recorder_command, worker_rx);
        tokio::spawn(worker.run());
        WorkerHandle::new(worker_tx)
    }

    fn setup_input() -> mpsc::Receiver<InputEvent> {
        let (input_tx, input_rx) = mpsc::channel(10);
        tokio::spawn(async move {
            if let Err(e) = input::monitor_stdin(input_tx).await {
                tracing::error!("Input monitor stopped: {}", e);
            }
        });
        input_rx
    }
}
