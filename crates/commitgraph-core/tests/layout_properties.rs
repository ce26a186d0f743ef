use std::collections::{HashMap, HashSet};

use commitgraph_core::{
    ActiveColumnKind, CommitRecord, EdgeEnd, EdgeKind, GraphLayout, GridPoint, compute_layout,
};
use proptest::prelude::*;

fn rec(hash: &str, parents: &[&str]) -> CommitRecord {
    CommitRecord::new(hash, parents.iter().copied())
}

/// Newest-first histories: parents only ever point at later rows, and a few
/// point outside the list to simulate unloaded pages.
fn history_strategy() -> impl Strategy<Value = Vec<CommitRecord>> {
    proptest::collection::vec(
        (0usize..4, proptest::collection::vec(any::<u16>(), 3)),
        1..60,
    )
    .prop_map(|rows| {
        let len = rows.len();
        rows.into_iter()
            .enumerate()
            .map(|(row, (parent_count, seeds))| {
                let mut parents: Vec<String> = Vec::new();
                for seed in seeds.into_iter().take(parent_count) {
                    let parent = if seed % 13 == 0 || row + 1 == len {
                        format!("unloaded{seed}")
                    } else {
                        let later = row + 1 + seed as usize % (len - row - 1);
                        format!("c{later}")
                    };
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
                CommitRecord::new(format!("c{row}"), parents)
            })
            .collect()
    })
}

fn assert_columns_unique(layout: &GraphLayout) {
    for assignment in layout.assignments() {
        let mut seen = HashSet::new();
        for active in &assignment.active_columns {
            assert!(
                seen.insert(active.column),
                "row {} uses column {} twice",
                assignment.row,
                active.column
            );
        }
    }
}

#[test]
fn linear_chain_is_pinned_to_column_zero() {
    let commits: Vec<_> = (0..50)
        .map(|i| CommitRecord::new(format!("c{i}"), [format!("c{}", i + 1)]))
        .chain(std::iter::once(rec("c50", &[])))
        .collect();
    let layout = compute_layout(&commits);
    assert_eq!(layout.max_columns, 1);
    assert!(layout.assignments().all(|a| a.column == 0));
    assert!(layout.edges.iter().all(|e| e.kind == EdgeKind::Straight));
}

#[test]
fn merge_fan_in_lands_on_lower_column() {
    let commits = vec![
        rec("D", &["B", "C"]),
        rec("B", &["A"]),
        rec("C", &["A"]),
        rec("A", &[]),
    ];
    let layout = compute_layout(&commits);

    let d = layout.assignment(0).expect("D");
    assert_eq!(d.column, 0);
    let lane_columns: HashSet<_> = d.edges.iter().map(|e| e.to_column).collect();
    assert_eq!(lane_columns.len(), 2);

    let b = layout.assignment(1).expect("B");
    let c = layout.assignment(2).expect("C");
    assert_ne!(b.column, c.column);

    let a = layout.assignment(3).expect("A");
    assert_eq!(a.column, b.column.min(c.column));
    let freed = b.column.max(c.column);
    assert!(
        a.edges
            .iter()
            .any(|e| e.kind == EdgeKind::Fork && e.to_column == freed)
    );
    assert_eq!(layout.max_columns, 2);
}

#[test]
fn sequential_root_chains_reuse_columns() {
    let mut commits = Vec::new();
    for chain in 0..5 {
        commits.push(CommitRecord::new(
            format!("tip{chain}"),
            [format!("root{chain}")],
        ));
        commits.push(CommitRecord::new(format!("root{chain}"), Vec::<String>::new()));
    }
    // A long-lived side lane keeps column 0 busy; every chain reuses column 1.
    commits.insert(0, rec("side", &["base"]));
    commits.push(rec("base", &[]));

    let layout = compute_layout(&commits);
    assert_eq!(layout.max_columns, 2);
    for row in 1..11 {
        assert_eq!(layout.assignment(row).map(|a| a.column), Some(1));
    }
    assert_eq!(layout.assignment(11).map(|a| a.column), Some(0));
}

#[test]
fn append_keeps_earlier_rows_stable() {
    // Every tenth commit merges in a side line three rows further down.
    let commits: Vec<_> = (0..100)
        .map(|i| {
            let mut parents = vec![format!("c{}", i + 1)];
            if i % 10 == 0 {
                parents.push(format!("c{}", i + 3));
            }
            CommitRecord::new(format!("c{i}"), parents)
        })
        .collect();

    let first_page = compute_layout(&commits[..50]);
    let both_pages = compute_layout(&commits);
    for row in 0..50 {
        assert_eq!(first_page.rows[row], both_pages.rows[row], "row {row} moved");
    }
}

proptest! {
    #[test]
    fn lanes_never_share_a_column(commits in history_strategy()) {
        let layout = compute_layout(&commits);
        assert_columns_unique(&layout);
        for assignment in layout.assignments() {
            let nodes = assignment
                .active_columns
                .iter()
                .filter(|c| c.kind == ActiveColumnKind::Node)
                .count();
            prop_assert_eq!(nodes, 1);
            prop_assert!(assignment.span() <= layout.max_columns);
        }
    }

    #[test]
    fn layout_is_deterministic(commits in history_strategy()) {
        let first = serde_json::to_vec(&compute_layout(&commits)).expect("serialize");
        let second = serde_json::to_vec(&compute_layout(&commits)).expect("serialize");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_loaded_parent_is_connected(commits in history_strategy()) {
        let layout = compute_layout(&commits);
        let nodes: HashMap<&str, GridPoint> = layout
            .assignments()
            .map(|a| (a.hash.as_str(), GridPoint::new(a.row, a.column)))
            .collect();

        for commit in &commits {
            for parent in &commit.parent_hashes {
                let reaches = |end: EdgeEnd| match nodes.get(parent.as_str()) {
                    Some(node) => end == EdgeEnd::At(*node),
                    None => matches!(end, EdgeEnd::Open { .. }),
                };
                prop_assert!(
                    layout.edges.iter().any(|e| e.source_hash == commit.hash
                        && e.target_hash == *parent
                        && reaches(e.to)),
                    "{} -> {} has no connector",
                    commit.hash,
                    parent
                );
            }
        }
    }

    #[test]
    fn edges_run_downwards_in_row_order(commits in history_strategy()) {
        let layout = compute_layout(&commits);
        prop_assert!(layout.edges.windows(2).all(|w| w[0].from.row <= w[1].from.row));
        for edge in &layout.edges {
            if let Some(row) = edge.to.row() {
                prop_assert!(row > edge.from.row);
            }
            prop_assert!(edge.from.column < layout.max_columns);
            prop_assert!(edge.to.column() < layout.max_columns);
            prop_assert!(edge.color < layout.palette_size);
        }
    }

    #[test]
    fn appending_rows_never_moves_laid_out_nodes(
        commits in history_strategy(),
        split in 0usize..60,
    ) {
        let split = split.min(commits.len());
        let prefix = compute_layout(&commits[..split]);
        let full = compute_layout(&commits);
        for row in 0..split {
            prop_assert_eq!(&prefix.rows[row], &full.rows[row]);
        }
    }
}
