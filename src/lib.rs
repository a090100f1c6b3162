//! # Expounder
//!
//! Retrieval-grounded README and release-note generation for repositories.
//!
//! Expounder fetches a repository's text contents through the GitHub API,
//! chunks them, builds an ephemeral per-request retrieval index, asks a
//! language model for a strictly-schematized block document grounded in
//! that index, renders the blocks to markdown, and persists the result to
//! a blob store keyed by user, repository, and generation timestamp.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌────────────┐
//! │  GitHub  │──▶│ Chunker │──▶│ Retrieval │──▶│ Synthesizer│
//! │  fetch   │   │         │   │   index   │   │ (blocks)   │
//! └──────────┘   └─────────┘   └───────────┘   └─────┬──────┘
//!                                                    │
//!                                   ┌────────────────┤
//!                                   ▼                ▼
//!                             ┌──────────┐     ┌──────────┐
//!                             │ Renderer │────▶│  Blob    │
//!                             │ (md)     │     │  store   │
//!                             └──────────┘     └──────────┘
//! ```
//!
//! Each generation request is stateless: the tree snapshot, chunk set, and
//! retrieval index live for one request and are discarded. The only durable
//! state is the persisted markdown, whose stored name encodes the full
//! document identity.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Failure taxonomy |
//! | [`models`] | Core data types |
//! | [`blocks`] | README block schema and boundary validation |
//! | [`github`] | Repository content fetcher |
//! | [`chunk`] | Fixed-size text chunking |
//! | [`index`] | Retrieval index builder |
//! | [`synthesize`] | Structured model synthesis |
//! | [`render`] | Block-to-markdown rendering |
//! | [`notes`] | Commit-message release-note summarizer |
//! | [`storage`] | Stored-document persistence |
//! | [`pipeline`] | End-to-end generation orchestration |
//! | [`server`] | HTTP server |

pub mod blocks;
pub mod chunk;
pub mod config;
pub mod error;
pub mod github;
pub mod index;
pub mod models;
pub mod notes;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod storage;
pub mod synthesize;
