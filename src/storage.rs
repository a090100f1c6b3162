//! Stored-document persistence.
//!
//! Generated markdown is persisted to a remote blob store under a name that
//! encodes the full document identity — the name is the system's only
//! index; there is no separate metadata record. The [`DocumentStore`] trait
//! is the seam between the pipeline and the backend; [`DropboxStore`] is
//! the production implementation, [`MemoryStore`] backs tests.
//!
//! # Stored name format
//!
//! ```text
//! README`<user_id>`<owner>`<repo>`<timestamp>.md
//! ```
//!
//! The backtick separator is not expected to appear in any component.
//! [`encode_name`] and [`decode_name`] are the single codec pair for this
//! format; nothing else parses stored names.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::models::{DocumentKey, StoredEntry};

/// Separator between stored-name components.
pub const NAME_SEP: char = '`';

const NAME_TAG: &str = "README";
const NAME_SUFFIX: &str = ".md";

/// Encode a document key into its stored blob name.
pub fn encode_name(key: &DocumentKey) -> String {
    format!(
        "{tag}{sep}{user}{sep}{owner}{sep}{repo}{sep}{ts}{suffix}",
        tag = NAME_TAG,
        sep = NAME_SEP,
        user = key.user_id,
        owner = key.owner,
        repo = key.repo,
        ts = key.timestamp,
        suffix = NAME_SUFFIX,
    )
}

/// Decode a stored blob name back into its document key.
///
/// Returns `None` for names that do not match the expected shape; listing
/// treats those as foreign entries to skip, never as errors.
pub fn decode_name(name: &str) -> Option<DocumentKey> {
    let rest = name.strip_prefix(NAME_TAG)?;
    let rest = rest.strip_prefix(NAME_SEP)?;
    let rest = rest.strip_suffix(NAME_SUFFIX)?;

    let parts: Vec<&str> = rest.split(NAME_SEP).collect();
    if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    Some(DocumentKey {
        user_id: parts[0].to_string(),
        owner: parts[1].to_string(),
        repo: parts[2].to_string(),
        timestamp: parts[3].to_string(),
    })
}

/// Decode one listing row, keeping it only if it belongs to `user_id`.
fn match_user_entry(name: &str, path: &str, user_id: &str) -> Option<StoredEntry> {
    let key = decode_name(name)?;
    if key.user_id != user_id {
        return None;
    }
    Some(StoredEntry {
        owner: key.owner,
        repo: key.repo,
        timestamp: key.timestamp,
        path: path.to_string(),
        name: name.to_string(),
    })
}

/// Backend-agnostic persistence operations for generated documents.
///
/// Every operation is a single-shot request; there are no transactions and
/// no partial-completion recovery beyond "this call failed, retry if you
/// like". Upload overwrites any existing entry at the same name.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(&self, name: &str, content: &str) -> Result<()>;
    async fn download(&self, name: &str) -> Result<String>;
    async fn delete(&self, name: &str) -> Result<()>;
    async fn list(&self, user_id: &str) -> Result<Vec<StoredEntry>>;
}

// ============ Dropbox ============

/// Dropbox-backed [`DocumentStore`].
///
/// Credentials come from `DROPBOX_REFRESH_TOKEN`, `DROPBOX_APP_KEY`, and
/// `DROPBOX_APP_SECRET`; a fresh access token is obtained by a
/// refresh-token exchange on every operation — none is cached across calls.
pub struct DropboxStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl DropboxStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Storage(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn entry_path(&self, name: &str) -> String {
        format!("{}/{}", self.config.folder, name)
    }

    /// Exchange the refresh token for a short-lived access token.
    async fn access_token(&self) -> Result<String> {
        let refresh_token = std::env::var("DROPBOX_REFRESH_TOKEN")
            .map_err(|_| Error::Storage("DROPBOX_REFRESH_TOKEN not set".to_string()))?;
        let app_key = std::env::var("DROPBOX_APP_KEY")
            .map_err(|_| Error::Storage("DROPBOX_APP_KEY not set".to_string()))?;
        let app_secret = std::env::var("DROPBOX_APP_SECRET")
            .map_err(|_| Error::Storage("DROPBOX_APP_SECRET not set".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", app_key.as_str()),
            ("client_secret", app_secret.as_str()),
        ];

        let resp = self
            .client
            .post(format!("{}/oauth2/token", self.config.auth_base))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("token refresh failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "token refresh failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Storage(format!("invalid token response: {}", e)))?;

        body.get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Storage("token response missing access_token".to_string()))
    }
}

#[async_trait]
impl DocumentStore for DropboxStore {
    async fn upload(&self, name: &str, content: &str) -> Result<()> {
        let token = self.access_token().await?;

        let arg = json!({
            "path": self.entry_path(name),
            "mode": "overwrite",
            "autorename": true,
            "mute": false,
        });

        let resp = self
            .client
            .post(format!("{}/files/upload", self.config.content_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("Dropbox-API-Arg", arg.to_string())
            .header("Content-Type", "application/octet-stream")
            .body(content.to_string())
            .send()
            .await
            .map_err(|e| Error::Storage(format!("upload failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "upload failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        tracing::debug!(name, "uploaded document");
        Ok(())
    }

    async fn download(&self, name: &str) -> Result<String> {
        let token = self.access_token().await?;

        let arg = json!({ "path": self.entry_path(name) });

        let resp = self
            .client
            .post(format!("{}/files/download", self.config.content_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("Dropbox-API-Arg", arg.to_string())
            .send()
            .await
            .map_err(|e| Error::Transient(format!("download failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // The backend reports a missing path as a 409 conflict.
            if status.as_u16() == 409 {
                return Err(Error::NotFound(format!("document '{}' not found", name)));
            }
            return Err(Error::Transient(format!(
                "download failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.text()
            .await
            .map_err(|e| Error::Transient(format!("download body read failed: {}", e)))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(format!("{}/files/delete_v2", self.config.api_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&json!({ "path": self.entry_path(name) }))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("delete failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transient(format!(
                "delete failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<StoredEntry>> {
        let token = self.access_token().await?;

        let resp = self
            .client
            .post(format!("{}/files/list_folder", self.config.api_base))
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&json!({
                "path": self.config.folder,
                "recursive": false,
                "limit": 2000,
            }))
            .send()
            .await
            .map_err(|e| Error::Transient(format!("list failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transient(format!(
                "list failed (HTTP {}): {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Transient(format!("invalid list response: {}", e)))?;

        let entries = body
            .get("entries")
            .and_then(|e| e.as_array())
            .ok_or_else(|| Error::Transient("list response missing entries".to_string()))?;

        let mut documents = Vec::new();
        for entry in entries {
            if entry.get(".tag").and_then(|t| t.as_str()) != Some("file") {
                continue;
            }
            let name = match entry.get("name").and_then(|n| n.as_str()) {
                Some(name) => name,
                None => continue,
            };
            let path = entry
                .get("path_lower")
                .and_then(|p| p.as_str())
                .unwrap_or(name);

            if let Some(doc) = match_user_entry(name, path, user_id) {
                documents.push(doc);
            }
        }

        Ok(documents)
    }
}

// ============ In-memory ============

/// In-memory [`DocumentStore`] used by handler and pipeline tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upload(&self, name: &str, content: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn download(&self, name: &str) -> Result<String> {
        self.entries
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document '{}' not found", name)))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.entries.lock().await.remove(name);
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<StoredEntry>> {
        let entries = self.entries.lock().await;
        let mut documents: Vec<StoredEntry> = entries
            .keys()
            .filter_map(|name| match_user_entry(name, &format!("/memory/{}", name), user_id))
            .collect();
        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DocumentKey {
        DocumentKey {
            user_id: "u1".to_string(),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            timestamp: "1700000000000".to_string(),
        }
    }

    #[test]
    fn test_encode_name_shape() {
        assert_eq!(encode_name(&key()), "README`u1`acme`widgets`1700000000000.md");
    }

    #[test]
    fn test_name_round_trip() {
        let decoded = decode_name(&encode_name(&key())).unwrap();
        assert_eq!(decoded, key());
    }

    #[test]
    fn test_decode_rejects_malformed_names() {
        assert!(decode_name("notes.txt").is_none());
        assert!(decode_name("README`u1`acme`widgets.md").is_none());
        assert!(decode_name("README`u1`acme`widgets`1`extra.md").is_none());
        assert!(decode_name("README`u1`acme`widgets`123").is_none());
        assert!(decode_name("README``acme`widgets`123.md").is_none());
    }

    #[test]
    fn test_match_user_entry_filters_foreign_users() {
        let mine = encode_name(&key());
        assert!(match_user_entry(&mine, "/p", "u1").is_some());
        assert!(match_user_entry(&mine, "/p", "u2").is_none());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let name = encode_name(&key());

        store.upload(&name, "# Widgets\n").await.unwrap();
        assert_eq!(store.download(&name).await.unwrap(), "# Widgets\n");

        let listed = store.list("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].owner, "acme");
        assert_eq!(listed[0].repo, "widgets");
        assert_eq!(listed[0].timestamp, "1700000000000");

        assert!(store.list("someone-else").await.unwrap().is_empty());

        store.delete(&name).await.unwrap();
        assert!(matches!(
            store.download(&name).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        let name = encode_name(&key());
        store.upload(&name, "v1").await.unwrap();
        store.upload(&name, "v2").await.unwrap();
        assert_eq!(store.download(&name).await.unwrap(), "v2");
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }
}
