use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    ActiveColumn, ActiveColumnKind, CommitRecord, EdgeEnd, EdgeKind, GraphLayout, GridPoint,
    LaneAssignment, LayoutDiagnostic, LayoutEdge, RowEdge,
};

pub const DEFAULT_PALETTE_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Number of distinct lane colors before the palette wraps around.
    pub palette_size: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            palette_size: DEFAULT_PALETTE_SIZE,
        }
    }
}

/// Lays out `commits` with default options. Skipped records are logged.
pub fn compute_layout(commits: &[CommitRecord]) -> GraphLayout {
    LayoutEngine::default().compute(commits, &mut |diagnostic| {
        warn!(%diagnostic, "commit record not laid out as given");
    })
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    options: LayoutOptions,
}

/// An open path in the diagram waiting for `awaiting` to show up.
#[derive(Debug, Clone)]
struct Lane {
    column: usize,
    color: usize,
    awaiting: String,
    /// Child commit that opened the path.
    source_hash: String,
    /// Start of the path still to be emitted: the child's node.
    anchor: GridPoint,
    merge: bool,
}

#[derive(Debug, Default)]
struct LaneRegistry {
    /// Kept sorted by column.
    lanes: Vec<Lane>,
    created: usize,
    palette_size: usize,
}

impl LaneRegistry {
    fn new(palette_size: usize) -> Self {
        Self {
            palette_size: palette_size.max(1),
            ..Self::default()
        }
    }

    fn next_color(&mut self) -> usize {
        let color = self.created % self.palette_size;
        self.created += 1;
        color
    }

    /// Lowest column neither held by a live lane nor reserved for the current row.
    fn lowest_free_column(&self, reserved: &[usize]) -> usize {
        let mut column = 0;
        loop {
            let taken = self.lanes.iter().any(|lane| lane.column == column)
                || reserved.contains(&column);
            if !taken {
                return column;
            }
            column += 1;
        }
    }

    fn insert(&mut self, lane: Lane) {
        let idx = self.lanes.partition_point(|l| l.column < lane.column);
        self.lanes.insert(idx, lane);
    }

    /// Removes and returns every lane awaiting `hash`, lowest column first.
    fn take_awaiting(&mut self, hash: &str) -> Vec<Lane> {
        let mut taken = Vec::new();
        let mut idx = 0;
        while idx < self.lanes.len() {
            if self.lanes[idx].awaiting == hash {
                taken.push(self.lanes.remove(idx));
            } else {
                idx += 1;
            }
        }
        taken
    }
}

impl LayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Single forward pass over `commits` (newest first).
    ///
    /// Records with an empty hash are reported through `on_diagnostic` and
    /// leave a `None` row without touching any lane.
    pub fn compute(
        &self,
        commits: &[CommitRecord],
        on_diagnostic: &mut dyn FnMut(LayoutDiagnostic),
    ) -> GraphLayout {
        let mut registry = LaneRegistry::new(self.options.palette_size);
        let mut rows = Vec::with_capacity(commits.len());
        let mut edges = Vec::with_capacity(commits.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(commits.len());
        let mut max_columns = 0usize;

        for (row, commit) in commits.iter().enumerate() {
            let hash = commit.hash.trim();
            if hash.is_empty() {
                on_diagnostic(LayoutDiagnostic::MalformedHash { row });
                rows.push(None);
                continue;
            }
            if !seen.insert(hash) {
                on_diagnostic(LayoutDiagnostic::DuplicateHash {
                    row,
                    hash: hash.to_string(),
                });
            }

            let mut landing = registry.take_awaiting(hash);
            let primary = (!landing.is_empty()).then(|| landing.remove(0));
            let (column, color) = match &primary {
                Some(lane) => (lane.column, lane.color),
                None => (registry.lowest_free_column(&[]), registry.next_color()),
            };
            let node = GridPoint::new(row, column);

            let mut active_columns = Vec::with_capacity(registry.lanes.len() + landing.len() + 1);
            active_columns.push(ActiveColumn {
                column,
                color,
                kind: ActiveColumnKind::Node,
            });
            active_columns.extend(registry.lanes.iter().map(|lane| ActiveColumn {
                column: lane.column,
                color: lane.color,
                kind: ActiveColumnKind::PassThrough,
            }));
            active_columns.extend(landing.iter().map(|lane| ActiveColumn {
                column: lane.column,
                color: lane.color,
                kind: ActiveColumnKind::Converging,
            }));
            active_columns.sort_by_key(|c| c.column);

            let mut row_edges = Vec::with_capacity(commit.parent_hashes.len() + landing.len());
            if let Some(lane) = primary {
                close_lane(lane, hash, node, &mut edges);
            }
            for lane in landing {
                row_edges.push(RowEdge {
                    to_column: lane.column,
                    color: lane.color,
                    kind: EdgeKind::Fork,
                });
                close_lane(lane, hash, node, &mut edges);
            }

            // Converging lanes end on this row, so their columns are free for
            // merge lanes; the node and pass-through columns are not.
            let reserved: Vec<usize> = active_columns
                .iter()
                .filter(|c| c.kind != ActiveColumnKind::Converging)
                .map(|c| c.column)
                .collect();
            let mut parents = Vec::with_capacity(commit.parent_hashes.len());
            for parent in &commit.parent_hashes {
                let parent = parent.trim();
                if parent.is_empty() {
                    on_diagnostic(LayoutDiagnostic::EmptyParent {
                        row,
                        hash: hash.to_string(),
                    });
                    continue;
                }
                parents.push(parent);
            }

            for (idx, parent) in parents.into_iter().enumerate() {
                let (lane_column, lane_color, kind) = if idx == 0 {
                    (column, color, EdgeKind::Straight)
                } else {
                    (
                        registry.lowest_free_column(&reserved),
                        registry.next_color(),
                        EdgeKind::Merge,
                    )
                };
                registry.insert(Lane {
                    column: lane_column,
                    color: lane_color,
                    awaiting: parent.to_string(),
                    source_hash: hash.to_string(),
                    anchor: node,
                    merge: idx > 0,
                });
                row_edges.push(RowEdge {
                    to_column: lane_column,
                    color: lane_color,
                    kind,
                });
            }

            let mut occupied: Vec<usize> = active_columns.iter().map(|c| c.column).collect();
            occupied.extend(registry.lanes.iter().map(|lane| lane.column));
            occupied.sort_unstable();
            occupied.dedup();
            max_columns = max_columns.max(occupied.len());

            rows.push(Some(LaneAssignment {
                hash: hash.to_string(),
                row,
                column,
                color,
                active_columns,
                edges: row_edges,
            }));
        }

        let row_count = rows.len();
        for lane in std::mem::take(&mut registry.lanes) {
            open_lane(lane, row_count, &mut edges);
        }
        edges.sort_by_key(|edge| edge.from.row);

        debug!(
            rows = row_count,
            max_columns,
            edges = edges.len(),
            "computed commit graph layout"
        );
        GraphLayout {
            rows,
            max_columns,
            edges,
            palette_size: registry.palette_size,
        }
    }
}

/// Emits the connectors of a lane whose awaited commit sits at `node`.
fn close_lane(lane: Lane, target_hash: &str, node: GridPoint, edges: &mut Vec<LayoutEdge>) {
    let mut push = |from: GridPoint, to: GridPoint, kind: EdgeKind| {
        edges.push(LayoutEdge {
            source_hash: lane.source_hash.clone(),
            target_hash: target_hash.to_string(),
            from,
            to: EdgeEnd::At(to),
            color: lane.color,
            kind,
        });
    };
    let anchor = lane.anchor;
    let lane_column = lane.column;

    if lane_column == node.column {
        if lane.merge && anchor.column != lane_column {
            let bend = GridPoint::new(anchor.row + 1, lane_column);
            if node.row > bend.row {
                push(anchor, bend, EdgeKind::Merge);
                push(bend, node, EdgeKind::Straight);
            } else {
                push(anchor, node, EdgeKind::Merge);
            }
        } else {
            push(anchor, node, EdgeKind::Straight);
        }
        return;
    }

    // Absorbed by a lower lane: run down to the row above, then converge.
    let last = GridPoint::new(node.row.saturating_sub(1), lane_column);
    let fork_start = if last.row <= anchor.row {
        anchor
    } else if lane.merge && anchor.column != lane_column {
        let bend = GridPoint::new(anchor.row + 1, lane_column);
        if last.row > bend.row {
            push(anchor, bend, EdgeKind::Merge);
            push(bend, last, EdgeKind::Straight);
        } else {
            push(anchor, last, EdgeKind::Merge);
        }
        last
    } else {
        push(anchor, last, EdgeKind::Straight);
        last
    };
    push(fork_start, node, EdgeKind::Fork);
}

/// Emits the connectors of a lane whose awaited commit never arrived.
fn open_lane(lane: Lane, row_count: usize, edges: &mut Vec<LayoutEdge>) {
    let anchor = lane.anchor;
    let mut from = anchor;
    if lane.merge && anchor.column != lane.column {
        let bend = GridPoint::new(anchor.row + 1, lane.column);
        edges.push(LayoutEdge {
            source_hash: lane.source_hash.clone(),
            target_hash: lane.awaiting.clone(),
            from: anchor,
            to: EdgeEnd::At(bend),
            color: lane.color,
            kind: EdgeKind::Merge,
        });
        if bend.row >= row_count {
            return;
        }
        from = bend;
    }
    edges.push(LayoutEdge {
        source_hash: lane.source_hash,
        target_hash: lane.awaiting,
        from,
        to: EdgeEnd::Open {
            column: lane.column,
        },
        color: lane.color,
        kind: EdgeKind::Straight,
    });
}
