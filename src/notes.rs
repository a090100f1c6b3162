//! Commit-message release-note summarizer.
//!
//! Turns a list of raw commit messages into titled sections, splitting each
//! first line on the conventional `type: subject` form. Pure helper behind
//! the changelog endpoint.

use crate::models::CommitSummary;

/// Summarize commit messages into release-note sections, one per commit.
///
/// The first line of each message is split on `": "`; the left side becomes
/// the section title (falling back to `Commit N`), the remainder the single
/// item (falling back to the whole first line).
pub fn summarize_commits(commits: &[String]) -> Vec<CommitSummary> {
    commits
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let first = msg.lines().next().unwrap_or("");
            let (title, rest) = match first.split_once(": ") {
                Some((t, r)) => (t, r),
                None => (first, ""),
            };

            let title = if title.is_empty() {
                format!("Commit {}", i + 1)
            } else {
                title.to_string()
            };

            let item = if rest.is_empty() {
                first.to_string()
            } else {
                rest.to_string()
            };

            CommitSummary {
                title,
                items: vec![item],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_commit_split() {
        let commits = vec!["feat: add widget cache\n\nLong body here.".to_string()];
        let summary = summarize_commits(&commits);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].title, "feat");
        assert_eq!(summary[0].items, vec!["add widget cache".to_string()]);
    }

    #[test]
    fn test_plain_message_falls_back_to_first_line() {
        let commits = vec!["Update dependencies".to_string()];
        let summary = summarize_commits(&commits);
        assert_eq!(summary[0].title, "Update dependencies");
        assert_eq!(summary[0].items, vec!["Update dependencies".to_string()]);
    }

    #[test]
    fn test_empty_message_gets_positional_title() {
        let commits = vec!["".to_string(), "fix: bug".to_string()];
        let summary = summarize_commits(&commits);
        assert_eq!(summary[0].title, "Commit 1");
        assert_eq!(summary[1].title, "fix");
    }

    #[test]
    fn test_colon_in_subject_preserved() {
        let commits = vec!["fix: parser: handle empty input".to_string()];
        let summary = summarize_commits(&commits);
        assert_eq!(summary[0].title, "fix");
        assert_eq!(summary[0].items, vec!["parser: handle empty input".to_string()]);
    }
}
