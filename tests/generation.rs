//! Integration tests for the generation pipeline's offline stages.
//!
//! These tests exercise the path a generated document travels after the
//! model call — schema validation, markdown rendering, name encoding, and
//! the store round-trip — plus the fetcher-side filtering that decides
//! which files feed the retrieval index. The network stages (GitHub, file
//! store, model) are covered by their own modules' error-mapping logic and
//! require live credentials.

use expounder::blocks::parse_blocks;
use expounder::chunk::chunk_text;
use expounder::github::{eligible_blobs, TreeEntry};
use expounder::models::DocumentKey;
use expounder::render::render_markdown;
use expounder::storage::{decode_name, encode_name, DocumentStore, MemoryStore};

fn tree_entry(path: &str, kind: &str, size: u64) -> TreeEntry {
    serde_json::from_value(serde_json::json!({
        "path": path,
        "type": kind,
        "sha": format!("sha-{}", path),
        "size": size,
    }))
    .unwrap()
}

/// A model response flows through validation, rendering, and persistence,
/// and comes back byte-identical on fetch.
#[tokio::test]
async fn document_lifecycle_round_trip() {
    let raw = r#"{"blocks": [
        {"type": "heading", "level": 1, "text": "Widgets"},
        {"type": "paragraph", "text": "A toolkit for building widgets."},
        {"type": "heading", "level": 2, "text": "Installation"},
        {"type": "code", "language": "bash", "code": "cargo add widgets"},
        {"type": "list", "ordered": false, "items": ["zero-config", "fast"]},
        {"type": "table", "headers": ["flag", "default"], "rows": [["--retries", "3"]]}
    ]}"#;

    let blocks = parse_blocks(raw).unwrap();
    assert!(!blocks.is_empty());

    let markdown = render_markdown(&blocks);
    assert!(markdown.starts_with("# Widgets\n"));
    assert!(markdown.contains("```bash\ncargo add widgets\n```"));
    assert!(!markdown.contains("\n\n\n"));

    let key = DocumentKey {
        user_id: "u1".to_string(),
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        timestamp: "1700000000000".to_string(),
    };
    let name = encode_name(&key);
    assert_eq!(decode_name(&name).unwrap(), key);

    let store = MemoryStore::new();
    store.upload(&name, &markdown).await.unwrap();

    let listed = store.list("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].owner, "acme");
    assert_eq!(listed[0].repo, "widgets");
    assert_eq!(listed[0].timestamp, "1700000000000");

    let fetched = store.download(&name).await.unwrap();
    assert_eq!(fetched, markdown);

    store.delete(&name).await.unwrap();
    assert!(store.download(&name).await.is_err());
    assert!(store.list("u1").await.unwrap().is_empty());
}

/// Regeneration creates a second entry rather than mutating the first.
#[tokio::test]
async fn regeneration_creates_new_entry() {
    let store = MemoryStore::new();

    for ts in ["1700000000000", "1700000001000"] {
        let name = encode_name(&DocumentKey {
            user_id: "u1".to_string(),
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            timestamp: ts.to_string(),
        });
        store.upload(&name, &format!("# v{}\n", ts)).await.unwrap();
    }

    let listed = store.list("u1").await.unwrap();
    assert_eq!(listed.len(), 2);
    let timestamps: Vec<&str> = listed.iter().map(|e| e.timestamp.as_str()).collect();
    assert!(timestamps.contains(&"1700000000000"));
    assert!(timestamps.contains(&"1700000001000"));
}

/// Listings never leak another user's documents or foreign blobs.
#[tokio::test]
async fn listing_is_scoped_to_the_requesting_user() {
    let store = MemoryStore::new();

    let mine = encode_name(&DocumentKey {
        user_id: "u1".to_string(),
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        timestamp: "1700000000000".to_string(),
    });
    let theirs = encode_name(&DocumentKey {
        user_id: "u2".to_string(),
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        timestamp: "1700000000001".to_string(),
    });

    store.upload(&mine, "mine").await.unwrap();
    store.upload(&theirs, "theirs").await.unwrap();
    store.upload("scratch-notes.md", "not a document").await.unwrap();

    let listed = store.list("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, mine);
}

/// A three-file repository: the binary file is excluded by extension and
/// never reaches the upload set, so no chunk can reference it.
#[test]
fn binary_files_never_reach_the_upload_set() {
    let entries = vec![
        tree_entry("README.md", "blob", 1_200),
        tree_entry("src/index.ts", "blob", 3_400),
        tree_entry("assets/screenshot.png", "blob", 48_000),
    ];

    let blobs = eligible_blobs(&entries, None).unwrap();
    let paths: Vec<&str> = blobs.iter().map(|b| b.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "src/index.ts"]);

    // Stage the surviving files as the pipeline would; every upload name
    // must derive from an eligible path.
    let files: Vec<(String, String)> = blobs
        .iter()
        .map(|b| (b.path.clone(), format!("contents of {}", b.path)))
        .collect();
    for (path, content) in &files {
        assert!(!path.ends_with(".png"));
        let rejoined: String = chunk_text(content, 7).collect();
        assert_eq!(&rejoined, content);
    }
}

/// The size cap only applies to the inline path; the upload path keeps
/// large text files and relies on chunking.
#[test]
fn upload_path_keeps_large_text_files() {
    let entries = vec![tree_entry("src/generated.ts", "blob", 500_000)];

    assert_eq!(eligible_blobs(&entries, Some(60_000)).unwrap().len(), 0);
    let uncapped = eligible_blobs(&entries, None).unwrap();
    assert_eq!(uncapped.len(), 1);

    let body = "x".repeat(500_000);
    let chunks: Vec<&str> = chunk_text(&body, 80_000).collect();
    assert_eq!(chunks.len(), 7);
    assert!(chunks.iter().all(|c| c.len() <= 80_000));
}

/// Schema-invalid model output is rejected before rendering can run.
#[test]
fn invalid_model_output_is_terminal() {
    assert!(parse_blocks(r#"{"blocks": []}"#).is_err());
    assert!(parse_blocks(r#"{"blocks": [{"type": "heading", "text": "no level"}]}"#).is_err());
    assert!(parse_blocks("not json at all").is_err());
}
