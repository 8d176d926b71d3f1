//! Hand-off of completed detection passes to consumers.
//!
//! Passes run on the blocking pool and publish whole cell lists into a watch
//! channel. A snapshot from an older scan never replaces a newer one, so the
//! last completed scan wins regardless of the order passes finish in.

use crate::processing::detector::StormDetector;
use crate::radar_interface::{Grid, StormCell};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// The complete result of one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub station_id: String,
    pub captured_at: DateTime<Utc>,
    pub cells: Vec<StormCell>,
}

pub type SharedSnapshot = Option<Arc<DetectionSnapshot>>;

/// Latest-snapshot board backed by a `tokio::sync::watch` channel.
pub struct CellBoard {
    sender: watch::Sender<SharedSnapshot>,
}

impl CellBoard {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> SharedSnapshot {
        self.sender.borrow().clone()
    }

    /// Replaces the current snapshot unless it comes from an older scan.
    /// Returns whether the snapshot was accepted.
    pub fn publish(&self, snapshot: DetectionSnapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        self.sender.send_if_modified(|current| {
            let stale = current
                .as_ref()
                .is_some_and(|existing| existing.captured_at > snapshot.captured_at);
            if stale {
                log::debug!(
                    "discarding {} snapshot from {}, board already holds a newer scan",
                    snapshot.station_id,
                    snapshot.captured_at
                );
                return false;
            }
            *current = Some(snapshot.clone());
            true
        })
    }
}

impl Default for CellBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one detection pass on the blocking pool.
pub fn detect_blocking(detector: Arc<StormDetector>, grid: Grid) -> JoinHandle<DetectionSnapshot> {
    tokio::task::spawn_blocking(move || DetectionSnapshot {
        station_id: grid.station_id().to_string(),
        captured_at: grid.captured_at(),
        cells: detector.detect(&grid),
    })
}

/// Detects off the async executor and publishes the finished pass.
pub async fn run_pass(
    detector: Arc<StormDetector>,
    grid: Grid,
    board: &CellBoard,
) -> Result<bool, JoinError> {
    let snapshot = detect_blocking(detector, grid).await?;
    Ok(board.publish(snapshot))
}
