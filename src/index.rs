//! Retrieval index builder.
//!
//! Uploads a request's file contents — chunked to stay under the file-store
//! size limit — as independent retrievable units, then creates one ephemeral
//! vector store over all of them. The store is scoped to a single generation
//! request and referenced only by the opaque id returned here.
//!
//! Uploads run concurrently up to the configured ceiling; the whole request
//! aborts on the first failed chunk, so a partial index is never created.
//! Store creation waits for every upload to finish.

use futures::stream::{self, StreamExt};
use serde_json::json;
use std::time::Duration;

use crate::chunk::chunk_text;
use crate::config::{OpenAiConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::models::ContentChunk;

/// Chunk every file and upload the pieces, then create the vector store.
///
/// `files` are (repository path, text content) pairs. `label` becomes part
/// of the store name, e.g. `repo_acme_widgets_1700000000000`.
///
/// Returns the vector store id.
pub async fn build_index(
    openai: &OpenAiConfig,
    pipeline: &PipelineConfig,
    label: &str,
    files: &[(String, String)],
) -> Result<String> {
    let api_key = api_key()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(openai.timeout_secs))
        .build()
        .map_err(|e| Error::Upstream(format!("failed to build HTTP client: {}", e)))?;

    let chunks = stage_chunks(files, pipeline.chunk_bytes);
    if chunks.is_empty() {
        return Err(Error::Validation(
            "no file content to index".to_string(),
        ));
    }

    tracing::debug!(files = files.len(), chunks = chunks.len(), "uploading chunks");

    let mut uploads = stream::iter(chunks.into_iter().map(|chunk| {
        let client = client.clone();
        let api_key = api_key.clone();
        let api_base = openai.api_base.clone();
        async move { upload_chunk(&client, &api_base, &api_key, chunk).await }
    }))
    .buffer_unordered(pipeline.concurrency);

    let mut file_ids = Vec::new();
    while let Some(result) = uploads.next().await {
        file_ids.push(result?);
    }

    create_store(&client, &openai.api_base, &api_key, label, &file_ids).await
}

/// Split every file into upload-sized chunks, indexed per file from zero.
fn stage_chunks(files: &[(String, String)], chunk_bytes: usize) -> Vec<ContentChunk> {
    files
        .iter()
        .flat_map(|(path, content)| {
            chunk_text(content, chunk_bytes)
                .enumerate()
                .map(|(index, data)| ContentChunk {
                    path: path.clone(),
                    index,
                    data: data.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

fn api_key() -> Result<String> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| Error::Auth("OPENAI_API_KEY environment variable not set".to_string()))
}

/// Upload one chunk as a standalone file-store object. Returns the file id.
async fn upload_chunk(
    client: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    chunk: ContentChunk,
) -> Result<String> {
    let name = chunk.upload_name();

    let part = reqwest::multipart::Part::text(chunk.data)
        .file_name(name.clone())
        .mime_str("text/plain")
        .map_err(|e| Error::Upload(format!("{}: {}", name, e)))?;

    let form = reqwest::multipart::Form::new()
        .text("purpose", "assistants")
        .part("file", part);

    let resp = client
        .post(format!("{}/files", api_base))
        .header("Authorization", format!("Bearer {}", api_key))
        .multipart(form)
        .send()
        .await
        .map_err(|e| Error::Upload(format!("{}: {}", name, e)))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            return Err(Error::Auth("file store rejected the API key".to_string()));
        }
        return Err(Error::Upload(format!(
            "{} failed (HTTP {}): {}",
            name,
            status,
            body.chars().take(200).collect::<String>()
        )));
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| Error::Upload(format!("{}: invalid upload response: {}", name, e)))?;

    body.get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Upload(format!("{}: upload response missing id", name)))
}

/// Create the ephemeral vector store over the uploaded file ids.
async fn create_store(
    client: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    label: &str,
    file_ids: &[String],
) -> Result<String> {
    let body = json!({
        "name": label,
        "file_ids": file_ids,
    });

    let resp = client
        .post(format!("{}/vector_stores", api_base))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::IndexCreation(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::IndexCreation(format!(
            "vector store creation failed (HTTP {}): {}",
            status,
            body.chars().take(200).collect::<String>()
        )));
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| Error::IndexCreation(format!("invalid store response: {}", e)))?;

    body.get("id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::IndexCreation("store response missing id".to_string()))
}
