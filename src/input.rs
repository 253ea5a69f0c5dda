use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The record button was pressed
    Toggle,
    ScrollUp,
    ScrollDown,
    Quit,
}

pub fn parse_line(line: &str) -> Option<InputEvent> {
    match line.trim() {
        "" | "r" => Some(InputEvent::Toggle),
        "k" | "u" => Some(InputEvent::ScrollUp),
        "j" | "d" => Some(InputEvent::ScrollDown),
        "q" | "quit" => Some(InputEvent::Quit),
        _ => None,
    }
}

/// Read commands from stdin and forward them as input events.
///
/// Enter presses the record button; `j`/`k` scroll the preview; `q` quits.
pub async fn monitor_stdin(tx: mpsc::Sender<InputEvent>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse_line(&line) {
            Some(event) => {
                tracing::debug!("Input event: {:?}", event);
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            None => tracing::warn!("Unknown command {:?}", line.trim()),
        }
    }

    // stdin closed
    let _ = tx.send(InputEvent::Quit).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(""), Some(InputEvent::Toggle));
        assert_eq!(parse_line("  r \n"), Some(InputEvent::Toggle));
        assert_eq!(parse_line("j"), Some(InputEvent::ScrollDown));
        assert_eq!(parse_line("k"), Some(InputEvent::ScrollUp));
        assert_eq!(parse_line("q"), Some(InputEvent::Quit));
        assert_eq!(parse_line("record"), None);
    }
}
