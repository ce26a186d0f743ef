use commitgraph_core::{CommitMeta, CommitRecord};

use crate::decoration::parse_decorations;
use crate::error::{Result, SourceError};

pub const FIELD_SEP: char = '\u{001f}';
pub const RECORD_SEP: char = '\u{001e}';

/// `git log --pretty` format matching [`parse_git_log_records`].
pub const LOG_FORMAT: &str = "%H%x1f%h%x1f%P%x1f%an%x1f%ae%x1f%ct%x1f%D%x1f%s%x1e";
const FIELD_COUNT: usize = 8;

pub fn parse_git_log_records(stdout: &str) -> Result<Vec<CommitRecord>> {
    let mut commits = Vec::new();
    for raw_record in stdout.split(RECORD_SEP) {
        let record = raw_record.trim_matches(['\r', '\n', ' ']);
        if record.is_empty() {
            continue;
        }
        let fields: Vec<&str> = record.splitn(FIELD_COUNT, FIELD_SEP).collect();
        if fields.len() != FIELD_COUNT {
            return Err(SourceError::Parse(format!(
                "expected {FIELD_COUNT} fields, got {} in record {:?}",
                fields.len(),
                record
            )));
        }
        let committed_unix = fields[5].parse::<i64>().map_err(|e| {
            SourceError::Parse(format!(
                "invalid committed unix timestamp {:?}: {}",
                fields[5], e
            ))
        })?;

        let record = CommitRecord::new(fields[0], fields[2].split_whitespace()).with_meta(
            CommitMeta {
                short_hash: fields[1].to_string(),
                subject: fields[7].to_string(),
                author_name: fields[3].to_string(),
                author_email: fields[4].to_string(),
                committed_unix,
                refs: parse_decorations(fields[6]),
            },
        );
        commits.push(record);
    }
    Ok(commits)
}

#[cfg(test)]
mod tests {
    use commitgraph_core::GitRefKind;

    use super::{FIELD_SEP, RECORD_SEP, parse_git_log_records};

    #[test]
    fn parses_one_record() {
        let rec = format!(
            "aaaaaaaa{f}aaaaaaa{f}bbbbbbbb cccccccc{f}Alice{f}alice@example.com{f}1700000001{f}HEAD -> refs/heads/main, refs/remotes/origin/main, tag: refs/tags/v1.0{f}Merge topic{r}",
            f = FIELD_SEP,
            r = RECORD_SEP
        );
        let parsed = parse_git_log_records(&rec).expect("parse records");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].hash, "aaaaaaaa");
        assert_eq!(parsed[0].parent_hashes, vec!["bbbbbbbb", "cccccccc"]);
        assert_eq!(parsed[0].meta.committed_unix, 1_700_000_001);
        assert_eq!(parsed[0].meta.subject, "Merge topic");
        let kinds: Vec<_> = parsed[0].meta.refs.iter().map(|r| r.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![GitRefKind::Head, GitRefKind::RemoteBranch, GitRefKind::Tag]
        );
        assert_eq!(parsed[0].display_hash(), "aaaaaaa");
    }

    #[test]
    fn root_commit_has_no_parents() {
        let rec = format!(
            "p0{f}p0{f}{f}A{f}a@e{f}7{f}{f}root{r}\n",
            f = FIELD_SEP,
            r = RECORD_SEP
        );
        let parsed = parse_git_log_records(&rec).expect("parse");
        assert!(parsed[0].parent_hashes.is_empty());
        assert!(parsed[0].meta.refs.is_empty());
    }

    #[test]
    fn rejects_truncated_records() {
        let rec = format!("abc{f}abc{f}{r}", f = FIELD_SEP, r = RECORD_SEP);
        let err = parse_git_log_records(&rec).expect_err("must fail");
        assert!(err.to_string().contains("expected 8 fields"));
    }
}
