//! Blob storage for avatars and resumes (S3 / MinIO).
//!
//! Uploads are validated by kind before anything is sent to the bucket.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub mod handlers;

const MB: usize = 1024 * 1024;

/// What is being uploaded. Decides the key prefix and the validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Avatar,
    Resume,
}

impl UploadKind {
    pub fn max_bytes(self) -> usize {
        match self {
            UploadKind::Avatar => 5 * MB,
            UploadKind::Resume => 10 * MB,
        }
    }

    pub fn allowed_types(self) -> &'static [&'static str] {
        match self {
            UploadKind::Avatar => &["image/jpeg", "image/png", "image/webp", "image/gif"],
            UploadKind::Resume => &[
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ],
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::Resume => "resumes",
        }
    }

    /// Largest request body any kind accepts, plus room for multipart framing.
    pub fn body_limit() -> usize {
        UploadKind::Resume.max_bytes() + MB
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        _ => "bin",
    }
}

/// Checks type and size. Runs before any bytes leave the process.
pub fn validate_upload(kind: UploadKind, content_type: &str, len: usize) -> Result<(), AppError> {
    if !kind.allowed_types().contains(&content_type) {
        return Err(AppError::Validation(format!(
            "Unsupported file type '{content_type}' for {}; allowed: {}",
            kind.prefix(),
            kind.allowed_types().join(", ")
        )));
    }
    if len == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if len > kind.max_bytes() {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {len} bytes; {} uploads are limited to {} MB",
            kind.prefix(),
            kind.max_bytes() / MB
        )));
    }
    Ok(())
}

pub fn object_key(kind: UploadKind, user_id: &str, content_type: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        kind.prefix(),
        user_id,
        Uuid::new_v4(),
        extension_for(content_type)
    )
}

/// Only keys under the upload prefixes may be deleted through the API.
pub fn is_managed_key(key: &str) -> bool {
    [UploadKind::Avatar, UploadKind::Resume].iter().any(|kind| {
        key.strip_prefix(kind.prefix())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|s| s == ".."))
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Clone)]
pub struct BlobStore {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl BlobStore {
    pub fn new(client: S3Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }

    pub async fn upload(
        &self,
        kind: UploadKind,
        user_id: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, AppError> {
        validate_upload(kind, content_type, data.len())?;

        let key = object_key(kind, user_id, content_type);
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

        info!("Uploaded s3://{}/{} ({} bytes)", self.bucket, key, size);
        Ok(StoredObject {
            url: self.public_url(&key),
            key,
            content_type: content_type.to_string(),
            size,
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        if !is_managed_key(key) {
            return Err(AppError::Validation(format!("Not an upload key: {key}")));
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete of {key} failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}
