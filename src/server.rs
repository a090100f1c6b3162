//! HTTP server for the generation pipeline.
//!
//! Exposes the JSON surface over axum: document generation, stored-document
//! listing/fetch/delete, repository browsing helpers, and the changelog
//! summarizer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/generate` | Generate a README for `ownerRepo` |
//! | `GET`  | `/readmes` | List the caller's stored documents |
//! | `GET`  | `/readmes/file` | Fetch one stored document as markdown |
//! | `DELETE` | `/readmes` | Delete one stored document |
//! | `GET`  | `/repos` | List repositories visible to the caller's token |
//! | `GET`  | `/tree` | Nested file tree of a repository |
//! | `GET`  | `/file` | Raw contents of one repository file |
//! | `GET`  | `/repo/readme` | A repository's current README |
//! | `POST` | `/changelog` | Summarize commit messages into sections |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Caller identity
//!
//! The session layer is out of scope; callers supply their identity in the
//! `X-User-Id` header and their GitHub credential in `X-GitHub-Token`.
//! Requests missing either receive 401.
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "expected 'owner/repo'" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `bad_request` (400), `not_found`
//! (404), `rate_limited` (429), `schema_violation` / `upstream_error` /
//! `storage_error` (500).

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::blocks::ReadmeBlock;
use crate::config::Config;
use crate::error::Error;
use crate::github::{self, GithubClient};
use crate::models::{CommitSummary, DocumentKey, Repo, RepoNode, StoredEntry};
use crate::notes::summarize_commits;
use crate::pipeline::generate_readme;
use crate::storage::{encode_name, DocumentStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
}

/// Start the HTTP server on the configured bind address.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
    };

    let app = router(state);

    tracing::info!("server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/generate", post(handle_generate))
        .route("/readmes", get(handle_list).delete(handle_delete))
        .route("/readmes/file", get(handle_fetch))
        .route("/repos", get(handle_repos))
        .route("/tree", get(handle_tree))
        .route("/file", get(handle_file))
        .route("/repo/readme", get(handle_repo_readme))
        .route("/changelog", post(handle_changelog))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Error::SchemaViolation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_violation"),
            Error::Upstream(_) | Error::Upload(_) | Error::IndexCreation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error")
            }
            Error::Storage(_) | Error::Transient(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

/// Caller identity from the `X-User-Id` header.
fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unauthorized("missing X-User-Id header"))
}

/// GitHub credential from the `X-GitHub-Token` header.
fn require_github_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-github-token")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unauthorized("missing X-GitHub-Token header"))
}

// ============ POST /generate ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    owner_repo: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct GenerateResponse {
    blocks: Vec<ReadmeBlock>,
}

async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let user_id = require_user(&headers)?;
    let token = require_github_token(&headers)?;

    let outcome = generate_readme(
        &state.config,
        state.store.as_ref(),
        &user_id,
        &token,
        &req.owner_repo,
        req.description.as_deref(),
    )
    .await?;

    Ok(Json(GenerateResponse {
        blocks: outcome.blocks,
    }))
}

// ============ GET /readmes ============

#[derive(Serialize)]
struct ListResponse {
    readmes: Vec<StoredEntry>,
}

async fn handle_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, AppError> {
    let user_id = require_user(&headers)?;
    let readmes = state.store.list(&user_id).await?;
    Ok(Json(ListResponse { readmes }))
}

// ============ GET /readmes/file ============

#[derive(Deserialize)]
struct DocumentParams {
    owner: String,
    repo: String,
    timestamp: String,
}

async fn handle_fetch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DocumentParams>,
) -> Result<Response, AppError> {
    let user_id = require_user(&headers)?;

    let name = encode_name(&DocumentKey {
        user_id,
        owner: params.owner,
        repo: params.repo,
        timestamp: params.timestamp,
    });

    let content = state.store.download(&name).await?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/markdown")],
        content,
    )
        .into_response())
}

// ============ DELETE /readmes ============

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<DocumentParams>,
) -> Result<Json<DeleteResponse>, AppError> {
    let user_id = require_user(&headers)?;

    let name = encode_name(&DocumentKey {
        user_id,
        owner: params.owner,
        repo: params.repo,
        timestamp: params.timestamp,
    });

    state.store.delete(&name).await?;
    Ok(Json(DeleteResponse { success: true }))
}

// ============ GET /repos ============

#[derive(Serialize)]
struct ReposResponse {
    repos: Vec<Repo>,
}

async fn handle_repos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReposResponse>, AppError> {
    let token = require_github_token(&headers)?;
    let gh = GithubClient::new(&state.config.github, &token)?;
    let repos = gh.list_repos().await?;
    Ok(Json(ReposResponse { repos }))
}

// ============ GET /tree ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeParams {
    owner_repo: String,
}

async fn handle_tree(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TreeParams>,
) -> Result<Json<Vec<RepoNode>>, AppError> {
    let token = require_github_token(&headers)?;
    let (owner, repo) = github::parse_owner_repo(&params.owner_repo)?;

    let gh = GithubClient::new(&state.config.github, &token)?;
    let (branch, entries) = gh.fetch_tree(&owner, &repo).await?;
    let tree = github::build_tree(
        &entries,
        &state.config.github.raw_base,
        &owner,
        &repo,
        &branch,
    );

    Ok(Json(tree))
}

// ============ GET /file ============

#[derive(Deserialize)]
struct FileParams {
    owner: String,
    repo: String,
    path: String,
}

async fn handle_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FileParams>,
) -> Result<Response, AppError> {
    let token = require_github_token(&headers)?;
    let gh = GithubClient::new(&state.config.github, &token)?;
    let content = gh
        .fetch_file(&params.owner, &params.repo, &params.path)
        .await?;

    Ok((StatusCode::OK, [("Content-Type", "text/plain")], content).into_response())
}

// ============ GET /repo/readme ============

async fn handle_repo_readme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TreeParams>,
) -> Result<Response, AppError> {
    let token = require_github_token(&headers)?;
    let (owner, repo) = github::parse_owner_repo(&params.owner_repo)?;

    let gh = GithubClient::new(&state.config.github, &token)?;
    let content = gh.get_readme(&owner, &repo).await?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/markdown")],
        content,
    )
        .into_response())
}

// ============ POST /changelog ============

#[derive(Deserialize)]
struct ChangelogRequest {
    commits: Vec<String>,
}

async fn handle_changelog(Json(req): Json<ChangelogRequest>) -> Json<Vec<CommitSummary>> {
    Json(summarize_commits(&req.commits))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
