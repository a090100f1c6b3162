//! Block-to-markdown renderer.
//!
//! Deterministic, total serialization of a [`ReadmeBlock`] sequence into
//! markdown text. Blocks are joined with a blank line; a final cleanup pass
//! collapses any run of three or more newlines to exactly two. Malformed
//! input does not exist here — the boundary validator runs upstream.

use crate::blocks::ReadmeBlock;

/// Render a block sequence to markdown.
pub fn render_markdown(blocks: &[ReadmeBlock]) -> String {
    let rendered: Vec<String> = blocks.iter().map(render_block).collect();
    collapse_blank_lines(&rendered.join("\n"))
}

fn render_block(block: &ReadmeBlock) -> String {
    match block {
        ReadmeBlock::Heading { level, text } => {
            format!("{} {}\n", "#".repeat(*level as usize), text)
        }
        ReadmeBlock::Paragraph { text } => format!("{}\n", text),
        ReadmeBlock::List { ordered, items } => {
            let lines: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    if *ordered {
                        format!("{}. {}", i + 1, item)
                    } else {
                        format!("- {}", item)
                    }
                })
                .collect();
            format!("{}\n", lines.join("\n"))
        }
        ReadmeBlock::Code { language, code } => {
            format!("\n```{}\n{}\n```\n", language.as_deref().unwrap_or(""), code)
        }
        ReadmeBlock::Image { url, alt } => {
            format!("![{}]({})\n", alt.as_deref().unwrap_or(""), url)
        }
        ReadmeBlock::Table { headers, rows } => {
            let header = format!("| {} |\n", headers.join(" | "));
            let sep = format!(
                "| {} |\n",
                headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
            );
            let body: Vec<String> = rows.iter().map(|r| format!("| {} |", r.join(" | "))).collect();
            format!("{}{}{}\n", header, sep, body.join("\n"))
        }
    }
}

/// Collapse every run of three or more newlines to exactly two. Idempotent.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                out.push(ch);
            }
        } else {
            run = 0;
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<ReadmeBlock> {
        vec![
            ReadmeBlock::Heading {
                level: 1,
                text: "Widgets".to_string(),
            },
            ReadmeBlock::Paragraph {
                text: "A small widget library.".to_string(),
            },
            ReadmeBlock::List {
                ordered: true,
                items: vec!["install".to_string(), "configure".to_string()],
            },
            ReadmeBlock::Code {
                language: Some("rust".to_string()),
                code: "fn main() {}".to_string(),
            },
            ReadmeBlock::Image {
                url: "https://example.com/logo.png".to_string(),
                alt: None,
            },
            ReadmeBlock::Table {
                headers: vec!["name".to_string(), "default".to_string()],
                rows: vec![vec!["retries".to_string(), "3".to_string()]],
            },
        ]
    }

    #[test]
    fn test_heading_levels() {
        let md = render_markdown(&[ReadmeBlock::Heading {
            level: 3,
            text: "Usage".to_string(),
        }]);
        assert_eq!(md, "### Usage\n");
    }

    #[test]
    fn test_unordered_list() {
        let md = render_markdown(&[ReadmeBlock::List {
            ordered: false,
            items: vec!["a".to_string(), "b".to_string()],
        }]);
        assert_eq!(md, "- a\n- b\n");
    }

    #[test]
    fn test_ordered_list_one_based() {
        let md = render_markdown(&[ReadmeBlock::List {
            ordered: true,
            items: vec!["first".to_string(), "second".to_string()],
        }]);
        assert_eq!(md, "1. first\n2. second\n");
    }

    #[test]
    fn test_code_fence_without_language() {
        let md = render_markdown(&[ReadmeBlock::Code {
            language: None,
            code: "echo hi".to_string(),
        }]);
        assert_eq!(md, "\n```\necho hi\n```\n");
    }

    #[test]
    fn test_image_empty_alt() {
        let md = render_markdown(&[ReadmeBlock::Image {
            url: "https://example.com/x.png".to_string(),
            alt: None,
        }]);
        assert_eq!(md, "![](https://example.com/x.png)\n");
    }

    #[test]
    fn test_table_layout() {
        let md = render_markdown(&[ReadmeBlock::Table {
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
            ],
        }]);
        assert_eq!(md, "| a | b |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |\n");
    }

    #[test]
    fn test_blocks_joined_with_blank_line() {
        let md = render_markdown(&[
            ReadmeBlock::Heading {
                level: 1,
                text: "T".to_string(),
            },
            ReadmeBlock::Paragraph {
                text: "p".to_string(),
            },
        ]);
        assert_eq!(md, "# T\n\np\n");
    }

    #[test]
    fn test_deterministic() {
        let blocks = fixture();
        assert_eq!(render_markdown(&blocks), render_markdown(&blocks));
    }

    #[test]
    fn test_collapse_idempotent() {
        let raw = "a\n\n\n\nb\n\n\nc\nd";
        let once = collapse_blank_lines(raw);
        let twice = collapse_blank_lines(&once);
        assert_eq!(once, "a\n\nb\n\nc\nd");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_triple_newlines_in_output() {
        let md = render_markdown(&fixture());
        assert!(!md.contains("\n\n\n"));
    }
}
