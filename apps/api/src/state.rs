use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::notifications::alerts::AlertSink;
use crate::scoring::CandidateScorer;
use crate::storage::BlobStore;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Job postings; also the source of every notification session.
    pub store: Arc<dyn JobStore>,
    pub blobs: BlobStore,
    pub llm: LlmClient,
    /// Pluggable candidate scorer. Default: `LlmCandidateScorer`.
    pub scorer: Arc<dyn CandidateScorer>,
    /// Redis pub/sub when configured, the log otherwise.
    pub alerts: Arc<dyn AlertSink>,
    /// Plain HTTP client for fetching resumes by URL.
    pub http: reqwest::Client,
    pub config: Config,
}
