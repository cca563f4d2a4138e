//! Snapshot Feed Adapter — turns a store change feed into a channel of full,
//! filtered snapshots with explicit cancellation.
//!
//! One producer task per subscription reads the current state, hands it to the
//! single consumer and waits for the next change notice. Notices that pile up
//! while the consumer is busy are drained before the next read, so the
//! consumer sees the latest state rather than every intermediate one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::models::JobPosting;
use crate::store::{ChangeFeed, JobFilter, JobStore, StoreError};

/// Snapshots waiting for the consumer. Kept small: stale snapshots are useless.
const SNAPSHOT_BUFFER: usize = 1;

/// Full decoded view of the watched postings at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub jobs: Vec<JobPosting>,
    pub received_at: DateTime<Utc>,
}

/// Cancels a subscription. Cheap to clone; `unsubscribe` may be called any
/// number of times from anywhere.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn unsubscribe(&self) {
        if !self.token.is_cancelled() {
            debug!("Unsubscribing snapshot feed");
        }
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Consumer end of a subscription. Dropping it unsubscribes.
pub struct SnapshotFeed {
    rx: mpsc::Receiver<Result<Snapshot, StoreError>>,
    handle: SubscriptionHandle,
    _guard: DropGuard,
}

impl SnapshotFeed {
    fn new(rx: mpsc::Receiver<Result<Snapshot, StoreError>>, token: CancellationToken) -> Self {
        Self {
            rx,
            _guard: token.clone().drop_guard(),
            handle: SubscriptionHandle { token },
        }
    }

    /// Builds a feed driven by a caller-owned sender.
    #[cfg(test)]
    pub(crate) fn from_channel(
        rx: mpsc::Receiver<Result<Snapshot, StoreError>>,
    ) -> (Self, SubscriptionHandle) {
        let feed = Self::new(rx, CancellationToken::new());
        let handle = feed.handle();
        (feed, handle)
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next snapshot or delivery error. `None` once unsubscribed or the
    /// producer has stopped; nothing is delivered after `unsubscribe`.
    pub async fn recv(&mut self) -> Option<Result<Snapshot, StoreError>> {
        tokio::select! {
            biased;
            _ = self.handle.token.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }
}

/// Subscribes to the postings selected by `filter`.
///
/// The current state is delivered first, then again after every change. A
/// failed read is delivered as an `Err` and the feed keeps waiting; a failed
/// or closed change feed is delivered and ends the subscription.
pub fn subscribe(store: Arc<dyn JobStore>, filter: JobFilter) -> SnapshotFeed {
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
    let token = CancellationToken::new();
    tokio::spawn(pump(store, filter, tx, token.clone()));
    SnapshotFeed::new(rx, token)
}

async fn pump(
    store: Arc<dyn JobStore>,
    filter: JobFilter,
    tx: mpsc::Sender<Result<Snapshot, StoreError>>,
    token: CancellationToken,
) {
    // Watch before the first read so no change can slip in between.
    let mut changes = match store.watch().await {
        Ok(changes) => changes,
        Err(e) => {
            warn!("Could not open change feed for {filter:?}: {e}");
            let _ = tx.send(Err(e)).await;
            return;
        }
    };

    loop {
        let item = store.list_jobs(&filter).await.map(|jobs| Snapshot {
            jobs,
            received_at: Utc::now(),
        });
        if let Err(e) = &item {
            warn!("Snapshot read failed for {filter:?}: {e}");
        }

        tokio::select! {
            _ = token.cancelled() => break,
            sent = tx.send(item) => if sent.is_err() { break },
        }

        let change = tokio::select! {
            _ = token.cancelled() => break,
            change = changes.next_change() => change,
        };
        match change {
            Ok(Some(job_id)) => {
                let coalesced = drain_pending(changes.as_mut());
                debug!("Change on job '{job_id}' (+{coalesced} coalesced), refreshing {filter:?}");
            }
            Ok(None) => {
                warn!("Change feed for {filter:?} closed");
                let _ = tx.send(Err(StoreError::FeedClosed)).await;
                break;
            }
            Err(e) => {
                warn!("Change feed for {filter:?} failed: {e}");
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }

    debug!("Snapshot feed for {filter:?} stopped");
}

/// Consumes notices that are already waiting, without blocking.
fn drain_pending(changes: &mut dyn ChangeFeed) -> usize {
    let mut drained = 0;
    while let Some(Ok(Some(_))) = changes.next_change().now_or_never() {
        drained += 1;
    }
    drained
}
