//! Document synthesizer.
//!
//! Issues the single structured-generation call: one request to the model
//! provider's responses endpoint with the strict README block schema as the
//! output format and `file_search` retrieval restricted to the request's
//! vector store. The raw output is validated by [`parse_blocks`] before it
//! leaves this module; a parse or schema failure is terminal — no retry and
//! no repair. Distinct calls with identical input may produce different
//! block sequences.

use serde_json::json;
use std::time::Duration;

use crate::blocks::{parse_blocks, response_format, ReadmeBlock};
use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

/// Build the system instruction for one generation request.
///
/// The section list is fixed; the model is told to omit sections that do
/// not apply to the analyzed repository rather than invent content.
pub fn system_prompt(owner_repo: &str, description: Option<&str>) -> String {
    let mut lines = vec![
        format!(
            "Analyze the repository at {}, including its file structure, code, and documentation files.",
            owner_repo
        ),
        "Generate a clear, comprehensive README based on the actual content and functionality of the repository.".to_string(),
        "Do not rely on the existing repository description or README, as they may be outdated.".to_string(),
        "Use a professional yet approachable tone, ensuring the language is clear and accessible to developers of various skill levels.".to_string(),
    ];

    if let Some(description) = description {
        lines.push(format!(
            "The repository owner describes the project as: {}",
            description
        ));
    }

    lines.extend(
        [
            "Include the following sections in the README only if they are relevant to the codebase:",
            "- Badges: Include relevant badges (e.g., build status, version, license) right after the title and tagline. Ensure they are on one line with a single preceding space.",
            "- Title: The name of the repository.",
            "- Tagline: A brief, one-sentence description of what the repository does.",
            "- Overview: A detailed description of the repository's purpose and key features.",
            "- Architecture: If the repository has a discernible architecture (e.g., frontend, backend, APIs, databases, external services), provide a Mermaid diagram illustrating the high-level architecture. Show main components and their interactions. Use standard Mermaid syntax, such as rectangles for components (`component[\"label\"]`) and arrows for interactions (`-->`). Enclose labels with special characters in quotes. If the architecture is simple or unclear, provide a brief textual description instead.",
            "- Features: List the main features of the tool or library.",
            "- Installation: Instructions on how to install the tool or library.",
            "- Configuration: Any configuration options or settings (omit if not applicable).",
            "- Usage: Detailed usage instructions, covering CLI and/or API if applicable (omit if not relevant).",
            "- Tests: Information on how to run tests (omit if no tests are present).",
            "- Roadmap: Future plans or upcoming features.",
            "- Contributing: Guidelines for contributing to the repository.",
            "- License: The license under which the repository is released.",
            "- Acknowledgements: Credits or thanks to contributors or dependencies.",
            "If a section is not applicable (e.g., no CLI, no tests, no configuration options), omit it.",
            "Ensure all content is accurate and reflects the actual functionality based on the code and files in the repository. Do not make assumptions or include speculative information.",
        ]
        .into_iter()
        .map(str::to_string),
    );

    lines.join("\n")
}

/// Run the structured-generation call and return the validated blocks.
pub async fn generate_blocks(
    config: &OpenAiConfig,
    vector_store_id: &str,
    prompt: &str,
) -> Result<Vec<ReadmeBlock>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| Error::Auth("OPENAI_API_KEY environment variable not set".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Upstream(format!("failed to build HTTP client: {}", e)))?;

    let body = json!({
        "model": config.model,
        "input": prompt,
        "text": { "format": response_format() },
        "reasoning": { "effort": config.reasoning_effort },
        "tools": [
            {
                "type": "file_search",
                "vector_store_ids": [vector_store_id],
            }
        ],
    });

    let resp = client
        .post(format!("{}/responses", config.api_base))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Upstream(format!("model request failed: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(300).collect();
        return match status.as_u16() {
            401 => Err(Error::Auth("model provider rejected the API key".to_string())),
            429 => Err(Error::RateLimited(snippet)),
            _ => Err(Error::Upstream(format!(
                "model request failed (HTTP {}): {}",
                status, snippet
            ))),
        };
    }

    let response: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| Error::Upstream(format!("invalid model response: {}", e)))?;

    let text = extract_output_text(&response)
        .ok_or_else(|| Error::Upstream("no output_text content in model response".to_string()))?;

    parse_blocks(text)
}

/// Pull the first message item's `output_text` out of a responses payload.
fn extract_output_text(response: &serde_json::Value) -> Option<&str> {
    response
        .get("output")?
        .as_array()?
        .iter()
        .find(|item| item.get("type").and_then(|t| t.as_str()) == Some("message"))?
        .get("content")?
        .as_array()?
        .iter()
        .find(|part| part.get("type").and_then(|t| t.as_str()) == Some("output_text"))?
        .get("text")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_repository() {
        let prompt = system_prompt("acme/widgets", None);
        assert!(prompt.starts_with("Analyze the repository at acme/widgets"));
        assert!(prompt.contains("omit it"));
        assert!(!prompt.contains("describes the project as"));
    }

    #[test]
    fn test_prompt_includes_description_when_given() {
        let prompt = system_prompt("acme/widgets", Some("a widget toolkit"));
        assert!(prompt.contains("describes the project as: a widget toolkit"));
    }

    #[test]
    fn test_extract_output_text_finds_message() {
        let response = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                {
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "{\"blocks\": []}" }
                    ]
                }
            ]
        });
        assert_eq!(extract_output_text(&response), Some("{\"blocks\": []}"));
    }

    #[test]
    fn test_extract_output_text_missing_message() {
        let response = json!({ "output": [{ "type": "reasoning" }] });
        assert_eq!(extract_output_text(&response), None);
    }
}
