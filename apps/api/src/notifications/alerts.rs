use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{debug, info};

use crate::notifications::composer::NotificationRecord;
use crate::notifications::diff::SessionView;

/// Audible/visual cue for the presentation layer, raised when a pass detects
/// live changes on top of an existing baseline.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub subject_id: String,
    pub view: SessionView,
    pub count: usize,
    pub titles: Vec<String>,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        subject_id: &str,
        view: SessionView,
        fresh: &[NotificationRecord],
        raised_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            view,
            count: fresh.len(),
            titles: fresh.iter().map(|n| n.title.clone()).collect(),
            raised_at,
        }
    }
}

/// Where alerts go. Calls are fire-and-forget from the engine's point of view.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, alert: &Alert) -> Result<()>;
}

/// Publishes alerts on the `alerts:{subject_id}` Redis channel.
pub struct RedisAlertSink {
    client: redis::Client,
}

impl RedisAlertSink {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn channel(subject_id: &str) -> String {
        format!("alerts:{subject_id}")
    }
}

#[async_trait]
impl AlertSink for RedisAlertSink {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::to_string(alert)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let receivers: i64 = conn
            .publish(Self::channel(&alert.subject_id), payload)
            .await?;
        debug!(
            "Published alert for {} to {receivers} receivers",
            alert.subject_id
        );
        Ok(())
    }
}

/// Writes alerts to the log. Used when no Redis is configured.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn alert(&self, alert: &Alert) -> Result<()> {
        info!(
            subject = %alert.subject_id,
            count = alert.count,
            "Alert: {}",
            alert.titles.join(", ")
        );
        Ok(())
    }
}
