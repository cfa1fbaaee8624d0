//! Source citation appended to generated answers.

use std::collections::BTreeSet;

/// Distinct filenames, sorted lexicographically.
pub fn unique_sources<S: AsRef<str>>(sources: &[S]) -> Vec<String> {
    sources
        .iter()
        .map(|s| s.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `"{answer}\n\n**Sources:** a.txt, b.txt"`.
pub fn append_sources<S: AsRef<str>>(answer: &str, sources: &[S]) -> String {
    format!(
        "{}\n\n**Sources:** {}",
        answer,
        unique_sources(sources).join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_and_sort() {
        let sources = ["policy_remote.txt", "policy_hr.txt", "policy_remote.txt"];
        assert_eq!(
            unique_sources(&sources),
            vec!["policy_hr.txt", "policy_remote.txt"]
        );
    }

    #[test]
    fn test_append_single_source_from_many_chunks() {
        let text = append_sources("20 days.", &["hr.txt", "hr.txt", "hr.txt"]);
        assert_eq!(text, "20 days.\n\n**Sources:** hr.txt");
    }

    #[test]
    fn test_each_source_listed_once() {
        let text = append_sources("A.", &["b.txt", "a.txt", "b.txt", "c.txt", "a.txt"]);
        let line = text.lines().last().unwrap();
        assert_eq!(line, "**Sources:** a.txt, b.txt, c.txt");
        assert_eq!(line.matches("a.txt").count(), 1);
    }
}
