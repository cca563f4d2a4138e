//! Notification session — drives one subscription end to end.
//!
//! A single consumer task pulls snapshots from the feed and runs diff and
//! compose to completion before taking the next one, so the reconciler needs
//! no locking. State is published on a watch channel; alerts are spawned and
//! never awaited by the loop.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::notifications::alerts::{Alert, AlertSink};
use crate::notifications::composer::{NotificationConfig, NotificationRecord};
use crate::notifications::diff::ReconciliationStrategy;
use crate::notifications::feed::{self, SnapshotFeed, SubscriptionHandle};
use crate::notifications::reconciler::Reconciler;
use crate::store::JobStore;

/// What the presentation layer sees after each pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationState {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub has_baseline: bool,
    /// Successful passes so far.
    pub passes: u64,
    /// Last delivery error; cleared by the next successful pass.
    pub last_error: Option<String>,
}

pub struct NotificationSession {
    handle: SubscriptionHandle,
    state: watch::Receiver<NotificationState>,
    task: Option<JoinHandle<()>>,
}

impl NotificationSession {
    /// Subscribes to the store with the strategy's filter and starts reconciling.
    pub fn spawn(
        store: Arc<dyn JobStore>,
        strategy: Box<dyn ReconciliationStrategy>,
        config: NotificationConfig,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let feed = feed::subscribe(store, strategy.filter());
        Self::spawn_with_feed(feed, strategy, config, alerts)
    }

    pub fn spawn_with_feed(
        feed: SnapshotFeed,
        strategy: Box<dyn ReconciliationStrategy>,
        config: NotificationConfig,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        info!(
            subject = strategy.subject_id(),
            view = ?strategy.view(),
            "Starting notification session"
        );
        let handle = feed.handle();
        let (tx, state) = watch::channel(NotificationState::default());
        let reconciler = Reconciler::new(strategy, config);
        let task = tokio::spawn(run_session(feed, reconciler, tx, alerts));
        Self {
            handle,
            state,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<NotificationState> {
        self.state.clone()
    }

    pub fn current(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    /// Unsubscribes and waits for the consumer task to finish.
    pub async fn shutdown(mut self) {
        self.handle.unsubscribe();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Notification session task failed: {e}");
            }
        }
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

async fn run_session(
    mut feed: SnapshotFeed,
    mut reconciler: Reconciler,
    tx: watch::Sender<NotificationState>,
    alerts: Arc<dyn AlertSink>,
) {
    while let Some(item) = feed.recv().await {
        match item {
            Ok(snapshot) => {
                let outcome = reconciler.reconcile(&snapshot.jobs, Utc::now());

                if outcome.alert {
                    let strategy = reconciler.strategy();
                    let alert = Alert::new(
                        strategy.subject_id(),
                        strategy.view(),
                        &outcome.fresh,
                        snapshot.received_at,
                    );
                    let sink = alerts.clone();
                    tokio::spawn(async move {
                        if let Err(e) = sink.alert(&alert).await {
                            warn!("Alert delivery for {} failed: {e}", alert.subject_id);
                        }
                    });
                }

                tx.send_modify(|state| {
                    state.notifications = outcome.notifications;
                    state.unread_count = outcome.unread_count;
                    state.has_baseline = reconciler.has_baseline();
                    state.passes += 1;
                    state.last_error = None;
                });
            }
            Err(e) => {
                // The index is untouched; the next good snapshot picks up from here.
                warn!(
                    subject = reconciler.strategy().subject_id(),
                    "Snapshot delivery failed: {e}"
                );
                tx.send_modify(|state| state.last_error = Some(e.to_string()));
            }
        }
    }
    debug!(
        subject = reconciler.strategy().subject_id(),
        "Notification session ended"
    );
}
