//! Core data models used throughout expounder.
//!
//! These types represent the repository snapshot, chunks, and stored-document
//! identities that flow through the generation and persistence pipeline.

use serde::Serialize;

/// A node in the nested repository file tree.
///
/// Directories carry children in path order; files carry the raw-content URL
/// used by viewers. Built once per request from the flat git tree listing,
/// then discarded.
#[derive(Debug, Clone, Serialize)]
pub struct RepoNode {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RepoNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// Flattened blob descriptor produced by the fetcher after filtering.
#[derive(Debug, Clone)]
pub struct BlobRef {
    pub path: String,
    pub size: u64,
    /// Git blob SHA; content-addressable within the snapshot.
    pub sha: String,
}

/// A bounded slice of one file's text, staged for upload to the retrieval
/// index. Indices are 0-based and gap-free per file.
#[derive(Debug, Clone)]
pub struct ContentChunk {
    pub path: String,
    pub index: usize,
    pub data: String,
}

impl ContentChunk {
    /// Upload filename: path with slashes flattened, then part index.
    pub fn upload_name(&self) -> String {
        format!("{}.{}.txt", self.path.replace('/', "_"), self.index)
    }
}

/// Identity of one stored document. The encoded form of this key is the
/// stored blob's name, which is the only index the system keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub user_id: String,
    pub owner: String,
    pub repo: String,
    /// Epoch milliseconds at generation time; version discriminator.
    pub timestamp: String,
}

/// One parsed row of a user's stored-document listing.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub owner: String,
    pub repo: String,
    pub timestamp: String,
    /// Backend path of the stored blob.
    pub path: String,
    /// Full encoded blob name.
    pub name: String,
}

/// Repository listing row, as surfaced to repo pickers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repo {
    pub id: u64,
    pub full_name: String,
    pub private: bool,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One section of a commit-derived release-note summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CommitSummary {
    pub title: String,
    pub items: Vec<String>,
}
