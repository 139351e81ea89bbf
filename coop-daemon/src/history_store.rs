//! Event history persistence
//!
//! The retained events survive restarts so the dashboard is not empty after a
//! reboot. The file is rewritten after every event; with at most ten entries
//! that is cheaper than anything incremental.

use std::path::{Path, PathBuf};

use coop_mux::{History, Subscription};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Load the history file, starting empty if it is missing or unreadable
pub fn load(path: &Path) -> History {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No history at {}", path.display());
            return History::new();
        }
        Err(e) => {
            warn!("Failed to read history {}: {}", path.display(), e);
            return History::new();
        }
    };

    match serde_json::from_str::<History>(&text) {
        Ok(history) => {
            let history = history.normalize();
            info!("Loaded {} events from {}", history.len(), path.display());
            history
        }
        Err(e) => {
            warn!("Ignoring invalid history {}: {}", path.display(), e);
            History::new()
        }
    }
}

/// Write the history file, creating its directory
pub async fn save(path: &Path, history: &History) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(history)?;
    tokio::fs::write(path, json).await
}

/// Mirror the event sink into the history file until the sink goes away
pub async fn run_writer(subscription: Subscription, path: PathBuf) {
    let Subscription { replay, mut live } = subscription;

    // Replay is newest first
    let mut history = History::new();
    for event in replay.into_iter().rev() {
        history.push(event);
    }

    loop {
        match live.recv().await {
            Ok(event) => {
                history.push(event);
                if let Err(e) = save(&path, &history).await {
                    warn!("Failed to write history {}: {}", path.display(), e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("History writer lagged, {} events not persisted", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    debug!("History writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_mux::{ControllerEvent, EventSink};
    use coop_protocol::ProtocolEvent;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("coop-light-history-{}", std::process::id()))
            .join(name)
    }

    fn event(id: &str, pos: i32) -> ControllerEvent {
        ControllerEvent::now(&ProtocolEvent::final_position(id, pos))
    }

    #[test]
    fn test_missing_file_is_empty() {
        assert!(load(&scratch("does-not-exist.json")).is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = scratch("nested");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("deeper").join("history.json");

        save(&path, &History::new()).await.unwrap();
        assert!(path.exists());
        assert!(load(&path).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_file_is_empty() {
        let path = scratch("invalid.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(load(&path).is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let path = scratch("saved.json");
        let mut history = History::new();
        history.push(event("C59", 10));
        history.push(event("DD3", 20));

        save(&path, &history).await.unwrap();
        let loaded = load(&path);
        assert_eq!(loaded, history);
        assert_eq!(loaded.latest().unwrap().owner, "DD3");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_writer_persists_live_events() {
        let path = scratch("writer.json");
        let _ = std::fs::remove_file(&path);

        let mut seeded = History::new();
        seeded.push(event("C59", 1));
        let mut sink = EventSink::with_history(seeded, 8);

        let writer = tokio::spawn(run_writer(sink.subscribe(), path.clone()));
        sink.publish(event("C5E", 2));
        sink.publish(event("DD3", 3));
        drop(sink);
        writer.await.unwrap();

        let loaded = load(&path);
        let owners: Vec<&str> = loaded.iter().map(|e| e.owner.as_str()).collect();
        assert_eq!(owners, vec!["DD3", "C5E", "C59"]);

        let _ = std::fs::remove_file(&path);
    }
}
