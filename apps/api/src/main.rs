mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod notifications;
mod resume;
mod routes;
mod scoring;
mod state;
mod storage;
mod store;
mod text;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::notifications::alerts::{AlertSink, LogAlertSink, RedisAlertSink};
use crate::routes::build_router;
use crate::scoring::LlmCandidateScorer;
use crate::state::AppState;
use crate::storage::BlobStore;
use crate::store::{InMemoryJobStore, JobStore, PgJobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hiring API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the job store: PostgreSQL when configured
    let store: Arc<dyn JobStore> = match &config.database_url {
        Some(url) => Arc::new(PgJobStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; job postings are kept in memory only");
            Arc::new(InMemoryJobStore::new())
        }
    };

    // Alerts: Redis pub/sub when configured
    let alerts: Arc<dyn AlertSink> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis alert sink initialized");
            Arc::new(RedisAlertSink::new(client))
        }
        None => {
            info!("REDIS_URL not set; alerts go to the log");
            Arc::new(LogAlertSink)
        }
    };

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let blobs = BlobStore::new(s3, config.s3_bucket.clone(), config.s3_public_url.clone());
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let scorer = Arc::new(LlmCandidateScorer(llm.clone()));

    let state = AppState {
        store,
        blobs,
        llm,
        scorer,
        alerts,
        http: reqwest::Client::new(),
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the portal domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "hiring-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
