//! GitHub repository content fetcher.
//!
//! Lists the default branch's full file tree, filters out binary and
//! oversized blobs, and downloads raw blob text via the git data API.
//! Also serves the repo picker (paginated repository listing), the nested
//! file-tree view, and single-file fetches.
//!
//! A [`GithubClient`] is constructed per request from the caller's token —
//! there is no process-wide client instance.
//!
//! # Error mapping
//!
//! | Upstream signal | Error |
//! |-----------------|-------|
//! | 401 | [`Error::Auth`] |
//! | 404 | [`Error::NotFound`] |
//! | 429, or 403 with the rate-limit budget exhausted | [`Error::RateLimited`] |
//! | other non-2xx | [`Error::Upstream`] |

use base64::Engine;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::models::{BlobRef, NodeKind, Repo, RepoNode};

/// Path globs excluded from generation input: images, archives,
/// audio/video, fonts, documents that are binary on the wire.
const BINARY_GLOBS: &[&str] = &[
    "**/*.png", "**/*.jpg", "**/*.jpeg", "**/*.gif", "**/*.svg", "**/*.ico", "**/*.pdf",
    "**/*.zip", "**/*.tar", "**/*.gz", "**/*.mp3", "**/*.mp4", "**/*.mov", "**/*.avi",
    "**/*.woff", "**/*.woff2",
];

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("expounder/", env!("CARGO_PKG_VERSION"));

/// Split `owner/repo` into its two non-empty halves.
pub fn parse_owner_repo(owner_repo: &str) -> Result<(String, String)> {
    match owner_repo.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::Validation(format!(
            "expected 'owner/repo', got '{}'",
            owner_repo
        ))),
    }
}

/// One entry of the recursive git tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: Option<String>,
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// Per-request GitHub API client, authenticated with the caller's token.
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig, token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::Auth("GitHub token missing".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// The repository's default branch name.
    pub async fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        let resp = self
            .get(&format!("/repos/{}/{}", owner, repo))
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "repository lookup").await?;

        #[derive(Deserialize)]
        struct RepoResponse {
            default_branch: String,
        }

        let body: RepoResponse = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("invalid repository response: {}", e)))?;
        Ok(body.default_branch)
    }

    /// Recursive tree listing of the default branch's head commit.
    pub async fn fetch_tree(&self, owner: &str, repo: &str) -> Result<(String, Vec<TreeEntry>)> {
        let branch = self.default_branch(owner, repo).await?;

        let resp = self
            .get(&format!("/repos/{}/{}/branches/{}", owner, repo, branch))
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "branch lookup").await?;

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("invalid branch response: {}", e)))?;

        let tree_sha = body
            .pointer("/commit/commit/tree/sha")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Upstream("branch response missing tree sha".to_string()))?
            .to_string();

        let resp = self
            .get(&format!(
                "/repos/{}/{}/git/trees/{}?recursive=1",
                owner, repo, tree_sha
            ))
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "tree listing").await?;

        #[derive(Deserialize)]
        struct TreeResponse {
            tree: Vec<TreeEntry>,
            #[serde(default)]
            truncated: bool,
        }

        let body: TreeResponse = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("invalid tree response: {}", e)))?;

        if body.truncated {
            tracing::warn!(owner, repo, "tree listing truncated by the API");
        }

        Ok((branch, body.tree))
    }

    /// Raw blob text, decoded from the base64 git blob endpoint.
    pub async fn fetch_blob(&self, owner: &str, repo: &str, sha: &str) -> Result<String> {
        let resp = self
            .get(&format!("/repos/{}/{}/git/blobs/{}", owner, repo, sha))
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "blob fetch").await?;

        #[derive(Deserialize)]
        struct BlobResponse {
            content: String,
            encoding: String,
        }

        let body: BlobResponse = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("invalid blob response: {}", e)))?;

        if body.encoding != "base64" {
            return Err(Error::Upstream(format!(
                "unexpected blob encoding '{}'",
                body.encoding
            )));
        }

        let packed: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(packed)
            .map_err(|e| Error::Upstream(format!("blob base64 decode failed: {}", e)))?;

        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    /// Raw contents of one file via the contents API.
    pub async fn fetch_file(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let encoded: String = path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let resp = self
            .get(&format!("/repos/{}/{}/contents/{}", owner, repo, encoded))
            .header("Accept", "application/vnd.github.raw")
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "file fetch").await?;

        resp.text()
            .await
            .map_err(|e| Error::Upstream(format!("file body read failed: {}", e)))
    }

    /// The repository's README, decoded.
    pub async fn get_readme(&self, owner: &str, repo: &str) -> Result<String> {
        let resp = self
            .get(&format!("/repos/{}/{}/readme", owner, repo))
            .header("Accept", "application/vnd.github.raw")
            .send()
            .await
            .map_err(request_error)?;
        let resp = check(resp, "readme fetch").await?;

        resp.text()
            .await
            .map_err(|e| Error::Upstream(format!("readme body read failed: {}", e)))
    }

    /// All repositories visible to the token, following pagination.
    pub async fn list_repos(&self) -> Result<Vec<Repo>> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let resp = self
                .get(&format!(
                    "/user/repos?visibility=all&per_page=100&page={}",
                    page
                ))
                .send()
                .await
                .map_err(request_error)?;
            let resp = check(resp, "repository listing").await?;

            #[derive(Deserialize)]
            struct RepoRow {
                id: u64,
                full_name: String,
                private: bool,
                description: Option<String>,
                html_url: String,
                updated_at: Option<String>,
            }

            let batch: Vec<RepoRow> = resp
                .json()
                .await
                .map_err(|e| Error::Upstream(format!("invalid repo listing: {}", e)))?;
            let batch_len = batch.len();

            repos.extend(batch.into_iter().map(|r| Repo {
                id: r.id,
                full_name: r.full_name,
                private: r.private,
                description: r.description,
                html_url: r.html_url,
                updated_at: r.updated_at,
            }));

            if batch_len < 100 {
                break;
            }
            page += 1;
        }

        Ok(repos)
    }

}

fn request_error(e: reqwest::Error) -> Error {
    Error::Upstream(format!("GitHub request failed: {}", e))
}

/// Map a non-2xx GitHub response to the failure taxonomy.
async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let rate_exhausted = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "0")
        .unwrap_or(false);

    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();

    match status.as_u16() {
        401 => Err(Error::Auth(format!("{}: GitHub rejected the token", what))),
        404 => Err(Error::NotFound(format!("{}: {}", what, snippet))),
        429 => Err(Error::RateLimited(format!("{}: {}", what, snippet))),
        403 if rate_exhausted => Err(Error::RateLimited(format!(
            "{}: rate limit exhausted",
            what
        ))),
        _ => Err(Error::Upstream(format!(
            "{} failed (HTTP {}): {}",
            what, status, snippet
        ))),
    }
}

/// Filter tree entries down to blobs eligible for generation input.
///
/// Excludes paths matching the binary denylist and, when `size_cap` is
/// given, blobs larger than the cap. The file-upload generation path passes
/// `None`; the inline summarization path caps per-file size.
pub fn eligible_blobs(entries: &[TreeEntry], size_cap: Option<u64>) -> Result<Vec<BlobRef>> {
    let denylist = binary_globset()?;

    let mut blobs = Vec::new();
    for entry in entries {
        if !entry.is_blob() {
            continue;
        }
        if denylist.is_match(&entry.path) {
            continue;
        }
        let size = entry.size.unwrap_or(0);
        if let Some(cap) = size_cap {
            if size > cap {
                continue;
            }
        }
        let sha = match &entry.sha {
            Some(sha) => sha.clone(),
            None => continue,
        };
        blobs.push(BlobRef {
            path: entry.path.clone(),
            size,
            sha,
        });
    }

    blobs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(blobs)
}

fn binary_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in BINARY_GLOBS {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Upstream(format!("invalid denylist glob: {}", e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Upstream(format!("denylist build failed: {}", e)))
}

/// Build the nested file tree from the flat recursive listing.
///
/// Intermediate directories are materialized whether or not the listing
/// carries an explicit `tree` entry for them; files get a raw-content URL.
pub fn build_tree(
    entries: &[TreeEntry],
    raw_base: &str,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Vec<RepoNode> {
    let mut root: Vec<RepoNode> = Vec::new();

    for entry in entries {
        let parts: Vec<&str> = entry.path.split('/').collect();
        let mut level = &mut root;

        for (idx, part) in parts.iter().enumerate() {
            let cur_path = parts[..=idx].join("/");
            let is_leaf = idx == parts.len() - 1;

            let pos = match level.iter().position(|n| n.path == cur_path) {
                Some(pos) => pos,
                None => {
                    let kind = if is_leaf && entry.is_blob() {
                        NodeKind::File
                    } else {
                        NodeKind::Directory
                    };
                    let url = (kind == NodeKind::File).then(|| {
                        format!("{}/{}/{}/{}/{}", raw_base, owner, repo, branch, cur_path)
                    });
                    level.push(RepoNode {
                        path: cur_path.clone(),
                        kind,
                        url,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };

            level = &mut level[pos].children;
        }
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str, size: u64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: "blob".to_string(),
            sha: Some(format!("sha-{}", path)),
            size: Some(size),
        }
    }

    fn dir(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: "tree".to_string(),
            sha: Some(format!("sha-{}", path)),
            size: None,
        }
    }

    #[test]
    fn test_parse_owner_repo() {
        assert_eq!(
            parse_owner_repo("acme/widgets").unwrap(),
            ("acme".to_string(), "widgets".to_string())
        );
        assert!(parse_owner_repo("acme").is_err());
        assert!(parse_owner_repo("acme/").is_err());
        assert!(parse_owner_repo("/widgets").is_err());
        assert!(parse_owner_repo("a/b/c").is_err());
    }

    #[test]
    fn test_binary_extensions_excluded() {
        let entries = vec![
            blob("README.md", 100),
            blob("src/index.ts", 2_000),
            blob("docs/logo.png", 5_000),
        ];
        let blobs = eligible_blobs(&entries, None).unwrap();
        let paths: Vec<&str> = blobs.iter().map(|b| b.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/index.ts"]);
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        let entries = vec![blob("assets/Logo.PNG", 10), blob("a.md", 10)];
        let blobs = eligible_blobs(&entries, None).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].path, "a.md");
    }

    #[test]
    fn test_size_cap_applies_only_when_given() {
        let entries = vec![blob("big.ts", 100_000), blob("small.ts", 100)];
        let capped = eligible_blobs(&entries, Some(60_000)).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].path, "small.ts");

        let uncapped = eligible_blobs(&entries, None).unwrap();
        assert_eq!(uncapped.len(), 2);
    }

    #[test]
    fn test_directories_and_shaless_entries_skipped() {
        let mut shaless = blob("orphan.md", 10);
        shaless.sha = None;
        let entries = vec![dir("src"), blob("src/lib.rs", 10), shaless];
        let blobs = eligible_blobs(&entries, None).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].path, "src/lib.rs");
    }

    #[test]
    fn test_build_tree_nests_children() {
        let entries = vec![
            blob("README.md", 10),
            dir("src"),
            blob("src/lib.rs", 20),
            blob("src/util/mod.rs", 30),
        ];
        let tree = build_tree(
            &entries,
            "https://raw.githubusercontent.com",
            "acme",
            "widgets",
            "main",
        );

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].path, "README.md");
        assert_eq!(tree[0].kind, NodeKind::File);
        assert_eq!(
            tree[0].url.as_deref(),
            Some("https://raw.githubusercontent.com/acme/widgets/main/README.md")
        );

        let src = &tree[1];
        assert_eq!(src.path, "src");
        assert_eq!(src.kind, NodeKind::Directory);
        assert!(src.url.is_none());
        assert_eq!(src.children.len(), 2);
        assert_eq!(src.children[0].path, "src/lib.rs");

        let util = &src.children[1];
        assert_eq!(util.path, "src/util");
        assert_eq!(util.kind, NodeKind::Directory);
        assert_eq!(util.children[0].path, "src/util/mod.rs");
    }

    #[test]
    fn test_build_tree_materializes_missing_dirs() {
        // No explicit tree entry for "deep" or "deep/nested".
        let entries = vec![blob("deep/nested/file.txt", 1)];
        let tree = build_tree(&entries, "https://raw.example.com", "o", "r", "dev");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].kind, NodeKind::Directory);
        assert_eq!(tree[0].children[0].kind, NodeKind::Directory);
        assert_eq!(tree[0].children[0].children[0].kind, NodeKind::File);
    }
}
