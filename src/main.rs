//! # Expounder CLI (`expound`)
//!
//! The `expound` binary drives the document-generation pipeline from the
//! command line and can start the HTTP server that exposes the same
//! operations as a JSON API.
//!
//! ## Usage
//!
//! ```bash
//! expound --config ./expound.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `expound serve` | Start the HTTP server |
//! | `expound generate <owner/repo>` | Generate and persist a README |
//! | `expound repos` | List repositories visible to the GitHub token |
//! | `expound list` | List your stored documents |
//! | `expound fetch <owner> <repo> <timestamp>` | Print one stored document |
//! | `expound delete <owner> <repo> <timestamp>` | Delete one stored document |
//!
//! ## Credentials
//!
//! Credentials are read from environment variables: `GITHUB_TOKEN`,
//! `OPENAI_API_KEY`, and `DROPBOX_REFRESH_TOKEN` / `DROPBOX_APP_KEY` /
//! `DROPBOX_APP_SECRET`.
//!
//! ## Examples
//!
//! ```bash
//! # Generate a README for a repository and store it
//! expound generate acme/widgets --user u1
//!
//! # List stored documents
//! expound list --user u1
//!
//! # Fetch a stored document
//! expound fetch acme widgets 1700000000000 --user u1
//!
//! # Start the HTTP server
//! expound serve
//! ```

mod blocks;
mod chunk;
mod config;
mod error;
mod github;
mod index;
mod models;
mod notes;
mod pipeline;
mod render;
mod server;
mod storage;
mod synthesize;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::{encode_name, DocumentStore, DropboxStore};

/// Expounder CLI — generate structured README and release-note documents
/// from repositories with retrieval-grounded LLM synthesis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; when the file is absent, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "expound",
    about = "Expounder — retrieval-grounded README and release-note generation",
    version,
    long_about = "Expounder fetches a repository's text contents, builds an ephemeral \
    retrieval index over them, asks a language model for a strictly-schematized block \
    document grounded in that index, renders the blocks to markdown, and persists the \
    result to a blob store keyed by user, repository, and generation timestamp."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./expound.toml")]
    config: PathBuf,

    /// Caller identity used to key stored documents.
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// generation, listing, fetch, and delete endpoints.
    Serve,

    /// Generate a README for a repository.
    ///
    /// Runs the full pipeline — tree listing, blob fetch, chunk upload,
    /// retrieval-index creation, structured synthesis, markdown render —
    /// then stores the result and prints the markdown to stdout. This can
    /// take a while: it waits on several rounds of network I/O and one
    /// model call.
    Generate {
        /// Repository in `owner/repo` form.
        owner_repo: String,

        /// Optional project description to steer the synthesis.
        #[arg(long)]
        description: Option<String>,
    },

    /// List repositories visible to the GitHub token.
    Repos,

    /// List your stored documents.
    List,

    /// Print one stored document as markdown.
    Fetch {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Generation timestamp (epoch milliseconds).
        timestamp: String,
    },

    /// Delete one stored document.
    Delete {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Generation timestamp (epoch milliseconds).
        timestamp: String,
    },
}

fn github_token() -> anyhow::Result<String> {
    std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("expounder=info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let store = Arc::new(DropboxStore::new(&cfg.storage)?);
            server::run_server(&cfg, store).await?;
        }
        Commands::Generate {
            owner_repo,
            description,
        } => {
            let token = github_token()?;
            let store = DropboxStore::new(&cfg.storage)?;
            let outcome = pipeline::generate_readme(
                &cfg,
                &store,
                &cli.user,
                &token,
                &owner_repo,
                description.as_deref(),
            )
            .await?;

            match &outcome.stored_name {
                Some(name) => eprintln!("stored as {}", name),
                None => eprintln!("warning: document was generated but not stored"),
            }
            println!("{}", outcome.markdown);
        }
        Commands::Repos => {
            let token = github_token()?;
            let gh = github::GithubClient::new(&cfg.github, &token)?;
            for repo in gh.list_repos().await? {
                let visibility = if repo.private { "private" } else { "public" };
                println!(
                    "{} ({}) — {}",
                    repo.full_name,
                    visibility,
                    repo.description.as_deref().unwrap_or("no description")
                );
            }
        }
        Commands::List => {
            let store = DropboxStore::new(&cfg.storage)?;
            let entries = store.list(&cli.user).await?;
            if entries.is_empty() {
                println!("no stored documents for user '{}'", cli.user);
            }
            for entry in entries {
                println!("{}/{} @ {}", entry.owner, entry.repo, entry.timestamp);
            }
        }
        Commands::Fetch {
            owner,
            repo,
            timestamp,
        } => {
            let store = DropboxStore::new(&cfg.storage)?;
            let name = encode_name(&models::DocumentKey {
                user_id: cli.user.clone(),
                owner,
                repo,
                timestamp,
            });
            let content = store.download(&name).await?;
            println!("{}", content);
        }
        Commands::Delete {
            owner,
            repo,
            timestamp,
        } => {
            let store = DropboxStore::new(&cfg.storage)?;
            let name = encode_name(&models::DocumentKey {
                user_id: cli.user.clone(),
                owner,
                repo,
                timestamp,
            });
            store.delete(&name).await?;
            println!("deleted {}", name);
        }
    }

    Ok(())
}
