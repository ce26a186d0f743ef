use commitgraph_core::CommitRecord;
use regex::RegexBuilder;

use crate::decoration::search_names;
use crate::error::{Result, SourceError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchQuery {
    pub fn substring(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Keeps the records whose hash, subject, author or refs match `query`.
///
/// Order is preserved, so the result is still newest first. Parents of a
/// kept record may have been filtered out; the layout leaves those lanes open.
pub fn filter_commits(records: &[CommitRecord], query: &SearchQuery) -> Result<Vec<CommitRecord>> {
    let needle = query.text.trim();
    if needle.is_empty() {
        return Ok(records.to_vec());
    }

    if query.use_regex {
        let regex = RegexBuilder::new(needle)
            .case_insensitive(!query.case_sensitive)
            .build()
            .map_err(|source| SourceError::InvalidPattern {
                pattern: needle.to_string(),
                source,
            })?;
        return Ok(select(records, |part| regex.is_match(part)));
    }

    if query.case_sensitive {
        return Ok(select(records, |part| part.contains(needle)));
    }

    let normalized_needle = needle.to_lowercase();
    Ok(select(records, |part| {
        part.to_lowercase().contains(&normalized_needle)
    }))
}

fn select(records: &[CommitRecord], mut matches: impl FnMut(&str) -> bool) -> Vec<CommitRecord> {
    records
        .iter()
        .filter(|record| search_parts(record, &mut matches))
        .cloned()
        .collect()
}

fn search_parts(record: &CommitRecord, matches: &mut impl FnMut(&str) -> bool) -> bool {
    let meta = &record.meta;
    if matches(record.hash.as_str()) || matches(meta.short_hash.as_str()) {
        return true;
    }
    if matches(meta.subject.as_str())
        || matches(meta.author_name.as_str())
        || matches(meta.author_email.as_str())
    {
        return true;
    }
    meta.refs
        .iter()
        .flat_map(|git_ref| search_names(git_ref))
        .any(|name| matches(name))
}

#[cfg(test)]
mod tests {
    use commitgraph_core::{CommitMeta, CommitRecord, GitRef, GitRefKind};

    use super::{SearchQuery, filter_commits};

    fn sample_records() -> Vec<CommitRecord> {
        vec![
            CommitRecord::new("aaaaaaaa", ["bbbbbbbb"]).with_meta(CommitMeta {
                short_hash: "aaaaaaa".to_string(),
                subject: "Add parser".to_string(),
                author_name: "Alice".to_string(),
                author_email: "alice@example.com".to_string(),
                committed_unix: 10,
                refs: vec![GitRef {
                    kind: GitRefKind::LocalBranch,
                    name: "main".to_string(),
                    target: None,
                }],
            }),
            CommitRecord::new("cccccccc", ["bbbbbbbb"]).with_meta(CommitMeta {
                short_hash: "ccccccc".to_string(),
                subject: "Fix ui".to_string(),
                author_name: "Bob".to_string(),
                author_email: "bob@example.com".to_string(),
                committed_unix: 11,
                refs: vec![],
            }),
        ]
    }

    #[test]
    fn filters_substring_case_insensitive() {
        let filtered =
            filter_commits(&sample_records(), &SearchQuery::substring("PARSER")).expect("search");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].hash, "aaaaaaaa");
    }

    #[test]
    fn matches_refs_and_hashes() {
        let by_ref =
            filter_commits(&sample_records(), &SearchQuery::substring("main")).expect("search");
        assert_eq!(by_ref.len(), 1);
        let by_hash =
            filter_commits(&sample_records(), &SearchQuery::substring("ccc")).expect("search");
        assert_eq!(by_hash[0].meta.author_name, "Bob");
    }

    #[test]
    fn filters_regex() {
        let query = SearchQuery {
            text: "^Fix\\s".to_string(),
            use_regex: true,
            ..SearchQuery::default()
        };
        let filtered = filter_commits(&sample_records(), &query).expect("search");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].meta.author_name, "Bob");
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let query = SearchQuery {
            text: "(".to_string(),
            use_regex: true,
            ..SearchQuery::default()
        };
        assert!(filter_commits(&sample_records(), &query).is_err());
    }

    #[test]
    fn empty_query_keeps_everything() {
        let filtered =
            filter_commits(&sample_records(), &SearchQuery::substring("  ")).expect("search");
        assert_eq!(filtered.len(), 2);
    }
}
