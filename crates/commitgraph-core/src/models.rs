use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitRefKind {
    Head,
    LocalBranch,
    RemoteBranch,
    Tag,
    Stash,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    pub kind: GitRefKind,
    pub name: String,
    pub target: Option<String>,
}

/// Presentation metadata carried alongside a commit. Layout never reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMeta {
    #[serde(default)]
    pub short_hash: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub committed_unix: i64,
    #[serde(default)]
    pub refs: Vec<GitRef>,
}

/// One commit as supplied by the history source, newest first.
///
/// The first entry of `parent_hashes` is the primary parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    #[serde(default)]
    pub parent_hashes: Vec<String>,
    #[serde(default)]
    pub meta: CommitMeta,
}

impl CommitRecord {
    pub fn new<I, S>(hash: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hash: hash.into(),
            parent_hashes: parents.into_iter().map(Into::into).collect(),
            meta: CommitMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: CommitMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }

    pub fn display_hash(&self) -> &str {
        if self.meta.short_hash.is_empty() {
            let end = self
                .hash
                .char_indices()
                .nth(7)
                .map_or(self.hash.len(), |(idx, _)| idx);
            &self.hash[..end]
        } else {
            &self.meta.short_hash
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Straight,
    Merge,
    Fork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveColumnKind {
    /// The lane the commit's own node sits on.
    Node,
    /// A lane unrelated to the commit crossing its row.
    PassThrough,
    /// A lane that ends in this commit's node and gets freed.
    Converging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveColumn {
    pub column: usize,
    pub color: usize,
    pub kind: ActiveColumnKind,
}

/// Per-row connector summary from a commit towards a parent (or a converging lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEdge {
    pub to_column: usize,
    pub color: usize,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneAssignment {
    pub hash: String,
    pub row: usize,
    pub column: usize,
    pub color: usize,
    pub active_columns: Vec<ActiveColumn>,
    pub edges: Vec<RowEdge>,
}

impl LaneAssignment {
    /// Rightmost column touched by this row, including connectors.
    pub fn span(&self) -> usize {
        let active = self.active_columns.iter().map(|c| c.column + 1).max();
        let edges = self.edges.iter().map(|e| e.to_column + 1).max();
        (self.column + 1)
            .max(active.unwrap_or(0))
            .max(edges.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub row: usize,
    pub column: usize,
}

impl GridPoint {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// Where a connector ends: a concrete grid point, or open towards history
/// that has not been loaded (a dangling parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEnd {
    At(GridPoint),
    Open { column: usize },
}

impl EdgeEnd {
    pub fn column(&self) -> usize {
        match self {
            Self::At(point) => point.column,
            Self::Open { column } => *column,
        }
    }

    pub fn row(&self) -> Option<usize> {
        match self {
            Self::At(point) => Some(point.row),
            Self::Open { .. } => None,
        }
    }
}

/// One drawable connector primitive of the whole diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub source_hash: String,
    pub target_hash: String,
    pub from: GridPoint,
    pub to: EdgeEnd,
    pub color: usize,
    pub kind: EdgeKind,
}

impl LayoutEdge {
    /// Inclusive row range covered by the connector. Open connectors run to
    /// `row_count` (one past the last loaded row).
    pub fn row_span(&self, row_count: usize) -> (usize, usize) {
        let end = self.to.row().unwrap_or(row_count);
        (self.from.row.min(end), self.from.row.max(end))
    }
}

/// Immutable result of one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLayout {
    /// Index-aligned with the input list. Skipped records leave `None`.
    pub rows: Vec<Option<LaneAssignment>>,
    pub max_columns: usize,
    pub edges: Vec<LayoutEdge>,
    pub palette_size: usize,
}

impl GraphLayout {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn assignment(&self, row: usize) -> Option<&LaneAssignment> {
        self.rows.get(row).and_then(Option::as_ref)
    }

    pub fn assignments(&self) -> impl Iterator<Item = &LaneAssignment> {
        self.rows.iter().flatten()
    }

    pub fn row_of(&self, hash: &str) -> Option<usize> {
        self.assignments().find(|a| a.hash == hash).map(|a| a.row)
    }
}

/// Non-fatal problems found while laying out a commit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutDiagnostic {
    /// The record had an empty or blank hash and was left out of the layout.
    MalformedHash { row: usize },
    /// An empty entry in a parent list was ignored.
    EmptyParent { row: usize, hash: String },
    /// The hash was already laid out earlier in the list.
    DuplicateHash { row: usize, hash: String },
}

impl std::fmt::Display for LayoutDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedHash { row } => write!(f, "row {row}: commit without a hash skipped"),
            Self::EmptyParent { row, hash } => {
                write!(f, "row {row}: empty parent reference ignored on {hash}")
            }
            Self::DuplicateHash { row, hash } => {
                write!(f, "row {row}: {hash} already laid out, treated as a new tip")
            }
        }
    }
}
