//! Ref decorations: the `%D` field of `git log --decorate=full` and the
//! short form printed next to commits.

use commitgraph_core::{GitRef, GitRefKind};

const HEAD: &str = "HEAD";
const STASH: &str = "refs/stash";
const TAG_MARKER: &str = "tag: ";
const SYMREF_ARROW: &str = " -> ";

/// Namespaces whose prefix is dropped from the short name.
const NAMESPACES: [(&str, GitRefKind); 3] = [
    ("refs/heads/", GitRefKind::LocalBranch),
    ("refs/remotes/", GitRefKind::RemoteBranch),
    ("refs/tags/", GitRefKind::Tag),
];

/// Kind and short name of a fully qualified ref.
fn shorten(full: &str) -> (GitRefKind, &str) {
    match full {
        HEAD => (GitRefKind::Head, HEAD),
        STASH => (GitRefKind::Stash, STASH),
        _ => NAMESPACES
            .iter()
            .find_map(|(prefix, kind)| full.strip_prefix(*prefix).map(|name| (kind.clone(), name)))
            .unwrap_or((GitRefKind::Other, full)),
    }
}

/// Parses a comma separated decoration field such as
/// `HEAD -> refs/heads/main, refs/remotes/origin/main, tag: refs/tags/v1`.
pub fn parse_decorations(field: &str) -> Vec<GitRef> {
    field
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            if let Some(full) = token.strip_prefix(TAG_MARKER) {
                return GitRef {
                    kind: GitRefKind::Tag,
                    name: shorten(full.trim()).1.to_string(),
                    target: None,
                };
            }
            let (source, target) = match token.split_once(SYMREF_ARROW) {
                Some((source, target)) => (source.trim(), Some(target.trim())),
                None => (token, None),
            };
            let (kind, name) = shorten(source);
            GitRef {
                kind,
                name: name.to_string(),
                target: target.map(|full| shorten(full).1.to_string()),
            }
        })
        .collect()
}

/// `HEAD -> main, origin/main, tag: v1.0`, as `git log --decorate` prints it.
pub fn label(refs: &[GitRef]) -> String {
    refs.iter()
        .map(|git_ref| match (&git_ref.kind, git_ref.target.as_deref()) {
            (_, Some(target)) => format!("{}{}{}", git_ref.name, SYMREF_ARROW, target),
            (GitRefKind::Tag, None) => format!("{}{}", TAG_MARKER, git_ref.name),
            (_, None) => git_ref.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Names a search query is matched against.
pub fn search_names(git_ref: &GitRef) -> impl Iterator<Item = &str> {
    std::iter::once(git_ref.name.as_str()).chain(git_ref.target.as_deref())
}

#[cfg(test)]
mod tests {
    use commitgraph_core::{GitRef, GitRefKind};

    use super::{label, parse_decorations, search_names};

    fn kinds_and_names(field: &str) -> Vec<(GitRefKind, String, Option<String>)> {
        parse_decorations(field)
            .into_iter()
            .map(|r| (r.kind, r.name, r.target))
            .collect()
    }

    #[test]
    fn head_is_detached_or_symbolic() {
        assert_eq!(
            kinds_and_names("HEAD"),
            vec![(GitRefKind::Head, "HEAD".to_string(), None)]
        );
        assert_eq!(
            kinds_and_names("HEAD -> refs/heads/feature/x"),
            vec![(
                GitRefKind::Head,
                "HEAD".to_string(),
                Some("feature/x".to_string())
            )]
        );
    }

    #[test]
    fn namespaces_decide_kind_and_short_name() {
        let refs = kinds_and_names(
            "refs/remotes/upstream/dev,tag: refs/tags/v2,  refs/stash, refs/notes/x,,",
        );
        assert_eq!(
            refs,
            vec![
                (GitRefKind::RemoteBranch, "upstream/dev".to_string(), None),
                (GitRefKind::Tag, "v2".to_string(), None),
                (GitRefKind::Stash, "refs/stash".to_string(), None),
                (GitRefKind::Other, "refs/notes/x".to_string(), None),
            ]
        );
        assert!(parse_decorations("  ").is_empty());
    }

    #[test]
    fn label_uses_short_names() {
        let refs = parse_decorations(
            "HEAD -> refs/heads/main, refs/remotes/origin/main, tag: refs/tags/v1.0",
        );
        assert_eq!(label(&refs), "HEAD -> main, origin/main, tag: v1.0");
        assert_eq!(label(&[]), "");
    }

    #[test]
    fn search_covers_symbolic_targets() {
        let head = GitRef {
            kind: GitRefKind::Head,
            name: "HEAD".to_string(),
            target: Some("main".to_string()),
        };
        assert_eq!(search_names(&head).collect::<Vec<_>>(), vec!["HEAD", "main"]);
    }
}
