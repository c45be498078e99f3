//! Layout save worker
//!
//! The session pushes a snapshot (an `Arc` of the section tree) after every
//! persisted mutation; the worker keeps only the newest one and writes it
//! when the [`SaveScheduler`] says so.
//!
//! A failed save is logged and published on the status channel. The
//! in-memory layout is never rolled back: the next successful save carries
//! the full tree and reconciles the store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::models::Section;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::scheduler::{SaveScheduler, SaveTrigger};
use super::storage::{LayoutRepository, StorageError, StorageResult};
use crate::layout::wire;

/// Outcome of the most recent write, for the operator UI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saved { at: DateTime<Utc> },
    Failed { error: String },
}

enum SaveCommand {
    Snapshot {
        sections: Arc<Vec<Section>>,
        trigger: SaveTrigger,
    },
    Flush {
        reply: oneshot::Sender<StorageResult<()>>,
    },
}

/// Session-side handle to the save worker
pub struct LayoutSaveHandle {
    tx: mpsc::UnboundedSender<SaveCommand>,
    status: watch::Receiver<SaveStatus>,
    join: JoinHandle<()>,
}

impl LayoutSaveHandle {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(repo: Arc<dyn LayoutRepository>, owner_key: impl Into<String>, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let worker = LayoutSaveWorker {
            repo,
            owner_key: owner_key.into(),
            scheduler: SaveScheduler::new(window),
            pending: None,
            status_tx,
        };
        let join = tokio::spawn(worker.run(rx));
        Self { tx, status, join }
    }

    /// Hand the latest layout to the worker
    pub fn notify(&self, sections: Arc<Vec<Section>>, trigger: SaveTrigger) {
        if self.tx.send(SaveCommand::Snapshot { sections, trigger }).is_err() {
            tracing::warn!("Save worker stopped, layout change not persisted");
        }
    }

    /// Write the pending snapshot now, skipping the debounce window
    pub async fn flush(&self) -> StorageResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SaveCommand::Flush { reply })
            .map_err(|_| StorageError::Unavailable("save worker stopped".to_string()))?;
        rx.await
            .map_err(|_| StorageError::Unavailable("save worker stopped".to_string()))?
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Stop the worker, writing whatever is still pending
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Save worker panicked");
        }
    }
}

struct LayoutSaveWorker {
    repo: Arc<dyn LayoutRepository>,
    owner_key: String,
    scheduler: SaveScheduler,
    pending: Option<Arc<Vec<Section>>>,
    status_tx: watch::Sender<SaveStatus>,
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

impl LayoutSaveWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SaveCommand>) {
        tracing::debug!(owner_key = %self.owner_key, "Layout save worker started");

        loop {
            let deadline = self.scheduler.deadline();
            tokio::select! {
                // A due save goes out before more commands are taken
                biased;

                _ = sleep_until_deadline(deadline) => {
                    if self.scheduler.take_due(Instant::now()) {
                        let _ = self.write_pending().await;
                    }
                }
                cmd = rx.recv() => match cmd {
                    Some(SaveCommand::Snapshot { sections, trigger }) => {
                        self.pending = Some(sections);
                        self.scheduler.record(trigger, Instant::now());
                    }
                    Some(SaveCommand::Flush { reply }) => {
                        let result = self.write_pending().await;
                        let _ = reply.send(result);
                    }
                    None => {
                        let _ = self.write_pending().await;
                        tracing::debug!("Save channel closed, shutting down layout save worker");
                        break;
                    }
                },
            }
        }
    }

    async fn write_pending(&mut self) -> StorageResult<()> {
        self.scheduler.clear();
        let Some(sections) = self.pending.take() else {
            return Ok(());
        };

        let result = match wire::serialize(&sections) {
            Ok(layout) => self.repo.save_layout(&self.owner_key, &layout).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(()) => {
                tracing::debug!(owner_key = %self.owner_key, sections = sections.len(), "Layout saved");
                self.status_tx.send_replace(SaveStatus::Saved { at: shared::util::now() });
            }
            Err(e) => {
                tracing::error!(owner_key = %self.owner_key, error = %e, "Layout save failed");
                self.status_tx.send_replace(SaveStatus::Failed { error: e.to_string() });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{WireLayout, deserialize};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::models::{Position, Size};
    use std::sync::atomic::{AtomicBool, Ordering};

    const WINDOW: Duration = Duration::from_millis(500);

    #[derive(Default)]
    struct RecordingRepository {
        saves: Mutex<Vec<WireLayout>>,
        failing: AtomicBool,
    }

    impl RecordingRepository {
        fn count(&self) -> usize {
            self.saves.lock().len()
        }

        fn last_sections(&self) -> Vec<Section> {
            deserialize(self.saves.lock().last().unwrap()).unwrap()
        }
    }

    #[async_trait]
    impl LayoutRepository for RecordingRepository {
        async fn load_layout(&self, _owner_key: &str) -> StorageResult<Option<WireLayout>> {
            Ok(self.saves.lock().last().cloned())
        }

        async fn save_layout(&self, _owner_key: &str, layout: &WireLayout) -> StorageResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("disk unplugged".to_string()));
            }
            self.saves.lock().push(layout.clone());
            Ok(())
        }
    }

    fn layout_at(x: f64) -> Arc<Vec<Section>> {
        let mut section = Section::new("Hall", Position::new(0.0, 0.0), Size::new(400.0, 300.0));
        section.id = "hall".to_string();
        section.position.x = x;
        Arc::new(vec![section])
    }

    fn spawn(repo: &Arc<RecordingRepository>) -> LayoutSaveHandle {
        LayoutSaveHandle::spawn(repo.clone(), "owner-1", WINDOW)
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_is_written_once_after_pause() {
        let repo = Arc::new(RecordingRepository::default());
        let saver = spawn(&repo);

        for step in 0..10 {
            saver.notify(layout_at(step as f64 * 10.0), SaveTrigger::Coalesced);
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(repo.count(), 0, "intermediate position saved at step {step}");
        }

        tokio::time::sleep(WINDOW).await;
        assert_eq!(repo.count(), 1);
        assert_eq!(repo.last_sections()[0].position.x, 90.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_trigger_writes_without_waiting() {
        let repo = Arc::new(RecordingRepository::default());
        let saver = spawn(&repo);

        saver.notify(layout_at(1.0), SaveTrigger::Immediate);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(repo.count(), 1);
        assert!(matches!(saver.status(), SaveStatus::Saved { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_right_after_immediate_does_not_hold_it_back() {
        let repo = Arc::new(RecordingRepository::default());
        let saver = spawn(&repo);

        saver.notify(layout_at(1.0), SaveTrigger::Immediate);
        for step in 0..10 {
            saver.notify(layout_at(10.0 + step as f64), SaveTrigger::Coalesced);
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(repo.count(), 1, "immediate save missing at step {step}");
        }

        tokio::time::sleep(WINDOW).await;
        assert_eq!(repo.count(), 2);
        assert_eq!(repo.last_sections()[0].position.x, 19.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_is_reported_then_reconciled() {
        let repo = Arc::new(RecordingRepository::default());
        repo.failing.store(true, Ordering::SeqCst);
        let saver = spawn(&repo);

        saver.notify(layout_at(1.0), SaveTrigger::Immediate);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(repo.count(), 0);
        assert!(matches!(saver.status(), SaveStatus::Failed { .. }));

        repo.failing.store(false, Ordering::SeqCst);
        saver.notify(layout_at(2.0), SaveTrigger::Immediate);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(repo.count(), 1);
        assert_eq!(repo.last_sections()[0].position.x, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_skips_the_window() {
        let repo = Arc::new(RecordingRepository::default());
        let saver = spawn(&repo);

        saver.notify(layout_at(5.0), SaveTrigger::Coalesced);
        saver.flush().await.unwrap();
        assert_eq!(repo.count(), 1);

        // Nothing left pending after the flush
        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_writes_pending_snapshot() {
        let repo = Arc::new(RecordingRepository::default());
        let saver = spawn(&repo);

        saver.notify(layout_at(7.0), SaveTrigger::Coalesced);
        saver.shutdown().await;

        assert_eq!(repo.count(), 1);
        assert_eq!(repo.last_sections()[0].position.x, 7.0);
    }
}
