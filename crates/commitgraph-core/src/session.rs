use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::layout::{LayoutEngine, LayoutOptions};
use crate::models::{CommitRecord, GraphLayout, LayoutDiagnostic};

/// Cumulative commit history for one view, relaid out on every change.
///
/// Column choices depend on global lane state, so every append recomputes
/// the layout over the full known list.
#[derive(Debug, Default)]
pub struct GraphSession {
    engine: LayoutEngine,
    commits: Vec<CommitRecord>,
    known: HashSet<String>,
    layout: Arc<GraphLayout>,
    diagnostics: Vec<LayoutDiagnostic>,
}

impl GraphSession {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            engine: LayoutEngine::new(options),
            ..Self::default()
        }
    }

    pub fn commits(&self) -> &[CommitRecord] {
        &self.commits
    }

    pub fn commit(&self, row: usize) -> Option<&CommitRecord> {
        self.commits.get(row)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn layout(&self) -> Arc<GraphLayout> {
        Arc::clone(&self.layout)
    }

    /// Diagnostics from the most recent layout pass.
    pub fn diagnostics(&self) -> &[LayoutDiagnostic] {
        &self.diagnostics
    }

    /// Starts over from `page`, e.g. after a branch or filter change.
    pub fn reset(&mut self, page: Vec<CommitRecord>) -> Arc<GraphLayout> {
        self.commits.clear();
        self.known.clear();
        self.push_unseen(page);
        self.relayout()
    }

    /// Appends the commits of `page` not seen before and relays out.
    /// Returns the number of commits appended.
    pub fn append_page(&mut self, page: Vec<CommitRecord>) -> usize {
        let appended = self.push_unseen(page);
        if appended > 0 {
            self.relayout();
        }
        appended
    }

    fn push_unseen(&mut self, page: Vec<CommitRecord>) -> usize {
        let before = self.commits.len();
        for record in page {
            // Keyed like the layout keys rows. Blank hashes are kept so the
            // layout can report and skip them.
            let hash = record.hash.trim();
            if !hash.is_empty() && !self.known.insert(hash.to_string()) {
                continue;
            }
            self.commits.push(record);
        }
        self.commits.len() - before
    }

    fn relayout(&mut self) -> Arc<GraphLayout> {
        let mut diagnostics = Vec::new();
        let layout = self
            .engine
            .compute(&self.commits, &mut |d| diagnostics.push(d));
        for diagnostic in &diagnostics {
            warn!(%diagnostic, "commit record not laid out as given");
        }
        debug!(
            commits = self.commits.len(),
            max_columns = layout.max_columns,
            "graph session relaid out"
        );
        self.diagnostics = diagnostics;
        self.layout = Arc::new(layout);
        self.layout()
    }
}

#[cfg(test)]
mod tests {
    use super::GraphSession;
    use crate::layout::LayoutOptions;
    use crate::models::CommitRecord;

    fn rec(hash: &str, parents: &[&str]) -> CommitRecord {
        CommitRecord::new(hash, parents.iter().copied())
    }

    #[test]
    fn append_ignores_known_hashes() {
        let mut session = GraphSession::new(LayoutOptions::default());
        session.reset(vec![rec("c", &["b"]), rec("b", &["a"])]);
        let appended = session.append_page(vec![rec("b", &["a"]), rec("a", &[])]);
        assert_eq!(appended, 1);
        assert_eq!(session.len(), 3);
        assert_eq!(session.layout().row_count(), 3);
        assert!(session.layout().edges.iter().all(|e| e.to.row().is_some()));
    }

    #[test]
    fn append_matches_hashes_after_trimming() {
        let mut session = GraphSession::new(LayoutOptions::default());
        session.reset(vec![rec("c", &["b"]), rec("b ", &["a"])]);
        let appended = session.append_page(vec![rec(" b", &["a"]), rec("a\n", &[])]);
        assert_eq!(appended, 1);
        assert_eq!(session.len(), 3);
        assert!(session.diagnostics().is_empty());
        assert_eq!(session.layout().row_of("a"), Some(2));
    }

    #[test]
    fn reset_restarts_from_empty_lanes() {
        let mut session = GraphSession::new(LayoutOptions::default());
        session.reset(vec![rec("x", &["gone"]), rec("y", &[])]);
        assert_eq!(session.layout().max_columns, 2);

        let layout = session.reset(vec![rec("y", &[])]);
        assert_eq!(layout.max_columns, 1);
        assert_eq!(layout.assignment(0).map(|a| a.column), Some(0));
    }

    #[test]
    fn previous_layout_survives_append() {
        let mut session = GraphSession::new(LayoutOptions::default());
        let first = session.reset(vec![rec("b", &["a"])]);
        session.append_page(vec![rec("a", &[])]);
        assert_eq!(first.row_count(), 1);
        assert_eq!(session.layout().row_count(), 2);
    }

    #[test]
    fn diagnostics_reflect_last_pass() {
        let mut session = GraphSession::new(LayoutOptions::default());
        session.reset(vec![rec("", &[])]);
        assert_eq!(session.diagnostics().len(), 1);
        session.reset(vec![rec("a", &[])]);
        assert!(session.diagnostics().is_empty());
    }
}
