//! Generation pipeline orchestration.
//!
//! Coordinates the full flow for one request: repository fetch → chunking →
//! retrieval index → structured synthesis → markdown render → persistence.
//! Each request is stateless; the retrieval index and chunk set it builds
//! are never reused. Persistence failure does not fail the request — the
//! caller still receives the generated document.

use futures::stream::{self, StreamExt};

use crate::blocks::ReadmeBlock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::github::{self, GithubClient};
use crate::index;
use crate::models::DocumentKey;
use crate::render::render_markdown;
use crate::storage::{encode_name, DocumentStore};
use crate::synthesize;

/// Result of one generation request.
pub struct GenerationOutcome {
    pub blocks: Vec<ReadmeBlock>,
    pub markdown: String,
    /// Stored blob name, when persistence succeeded.
    pub stored_name: Option<String>,
}

/// Run the whole pipeline for one `owner/repo`.
///
/// Either a complete, schema-valid document comes back or an error does —
/// never a truncated mixture.
pub async fn generate_readme(
    config: &Config,
    store: &dyn DocumentStore,
    user_id: &str,
    github_token: &str,
    owner_repo: &str,
    description: Option<&str>,
) -> Result<GenerationOutcome> {
    let (owner, repo) = github::parse_owner_repo(owner_repo)?;

    let gh = GithubClient::new(&config.github, github_token)?;
    let (_branch, entries) = gh.fetch_tree(&owner, &repo).await?;

    // The file-upload path carries no per-file size cap; chunking keeps
    // individual uploads bounded.
    let blobs = github::eligible_blobs(&entries, None)?;
    if blobs.is_empty() {
        return Err(Error::Validation(format!(
            "{} has no text files eligible for generation",
            owner_repo
        )));
    }

    tracing::info!(%owner, %repo, files = blobs.len(), "fetching repository contents");

    let mut files = Vec::with_capacity(blobs.len());
    {
        let gh = &gh;
        let owner = owner.as_str();
        let repo = repo.as_str();
        let mut fetches = stream::iter(blobs.iter().cloned().map(|blob| async move {
            let text = gh.fetch_blob(owner, repo, &blob.sha).await?;
            Ok::<(String, String), Error>((blob.path.clone(), text))
        }))
        .buffer_unordered(config.pipeline.concurrency);

        while let Some(result) = fetches.next().await {
            files.push(result?);
        }
    }

    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let label = format!("repo_{}_{}_{}", owner, repo, timestamp);

    let store_id = index::build_index(&config.openai, &config.pipeline, &label, &files).await?;
    tracing::info!(%store_id, "retrieval index ready");

    let prompt = synthesize::system_prompt(owner_repo, description);
    let blocks = synthesize::generate_blocks(&config.openai, &store_id, &prompt).await?;
    let markdown = render_markdown(&blocks);

    let key = DocumentKey {
        user_id: user_id.to_string(),
        owner,
        repo,
        timestamp,
    };
    let name = encode_name(&key);

    let stored_name = match store.upload(&name, &markdown).await {
        Ok(()) => Some(name),
        Err(e) => {
            tracing::warn!(error = %e, "document upload failed; returning generation result anyway");
            None
        }
    };

    Ok(GenerationOutcome {
        blocks,
        markdown,
        stored_name,
    })
}
