//! Resume text extraction — fetches a PDF by URL and pulls plain text out of it.
//!
//! Extraction is CPU-bound and runs on the blocking pool.

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::text::{collapse_whitespace, truncate_chars};

pub mod handlers;

/// Upper bound on the text handed back to callers and the scorer.
pub const MAX_RESUME_CHARS: usize = 4000;
/// Refuse to download anything larger than the upload limit for resumes.
const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub truncated: bool,
}

/// Joins per-page text into one collapsed, bounded string.
pub fn assemble_pages(pages: &[String]) -> ExtractedText {
    let joined = pages
        .iter()
        .map(|p| collapse_whitespace(p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let (text, truncated) = truncate_chars(&joined, MAX_RESUME_CHARS);
    ExtractedText {
        text: text.to_string(),
        page_count: pages.len().max(1),
        truncated,
    }
}

pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<ExtractedText, AppError> {
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
    .map_err(|e| AppError::UnprocessableEntity(format!("Could not read PDF: {e}")))?;

    let extracted = assemble_pages(&pages);
    debug!(
        pages = extracted.page_count,
        chars = extracted.text.chars().count(),
        truncated = extracted.truncated,
        "Extracted PDF text"
    );
    Ok(extracted)
}

/// Downloads the document at `url` and extracts its text.
pub async fn fetch_and_extract(
    http: &reqwest::Client,
    url: &str,
) -> Result<ExtractedText, AppError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(AppError::Validation(format!(
            "Resume URL must be http(s): {url}"
        )));
    }

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "GET {url} returned {}",
            response.status()
        )));
    }
    let bytes = read_capped(response, MAX_PDF_BYTES).await?;

    info!(url, bytes = bytes.len(), "Fetched resume");
    extract_pdf_text(bytes).await
}

/// Reads the body, refusing anything over `limit` bytes. A declared length
/// is checked before reading; otherwise reading stops at the first chunk
/// that crosses the limit.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> Result<Vec<u8>, AppError> {
    let too_large = |len: u64| {
        AppError::PayloadTooLarge(format!("Resume is {len} bytes; limit is {limit}"))
    };
    if let Some(declared) = response.content_length() {
        if declared > limit as u64 {
            return Err(too_large(declared));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::Upstream(format!("Reading resume body: {e}")))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_collapses_and_joins_pages() {
        let pages = vec![
            "Jane  Doe\n\nRust engineer".to_string(),
            "   ".to_string(),
            "Experience:\tTokio".to_string(),
        ];
        let extracted = assemble_pages(&pages);
        assert_eq!(extracted.text, "Jane Doe Rust engineer Experience: Tokio");
        assert_eq!(extracted.page_count, 3);
        assert!(!extracted.truncated);
    }

    #[test]
    fn test_assemble_reports_at_least_one_page() {
        let extracted = assemble_pages(&[]);
        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.is_empty());
    }

    #[test]
    fn test_assemble_truncates_long_text() {
        let pages = vec!["é".repeat(MAX_RESUME_CHARS + 50)];
        let extracted = assemble_pages(&pages);
        assert!(extracted.truncated);
        assert_eq!(extracted.text.chars().count(), MAX_RESUME_CHARS);
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_unprocessable() {
        let err = extract_pdf_text(b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(head: &'static str, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/resume.pdf")
    }

    #[tokio::test]
    async fn test_declared_oversize_is_rejected_before_reading() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 52428800\r\nConnection: close\r\n\r\n",
            b"%PDF-1.4".to_vec(),
        )
        .await;
        let http = reqwest::Client::new();
        let err = fetch_and_extract(&http, &url).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_undeclared_body_stops_at_limit() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n",
            vec![b'x'; 4096],
        )
        .await;
        let http = reqwest::Client::new();
        let response = http.get(&url).send().await.unwrap();
        let err = read_capped(response, 1024).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_body_within_limit_is_read_whole() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\n",
            b"hello".to_vec(),
        )
        .await;
        let http = reqwest::Client::new();
        let response = http.get(&url).send().await.unwrap();
        assert_eq!(read_capped(response, 1024).await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_non_http_url_is_rejected() {
        let http = reqwest::Client::new();
        let err = fetch_and_extract(&http, "file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
