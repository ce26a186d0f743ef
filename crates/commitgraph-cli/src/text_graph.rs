use commitgraph_core::{ActiveColumnKind, EdgeKind, LaneAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GraphStyle {
    Unicode,
    Ascii,
}

struct Glyphs {
    node: char,
    vertical: char,
    horizontal: char,
    cross: char,
    /// A lane from the right converging into the node.
    fork_right: char,
    fork_left: char,
    /// A merge lane leaving the node to the right.
    merge_right: char,
    merge_left: char,
    /// A lane converging into the node and leaving again as a merge lane.
    tee_right: char,
    tee_left: char,
}

impl GraphStyle {
    fn glyphs(self) -> Glyphs {
        match self {
            Self::Unicode => Glyphs {
                node: '●',
                vertical: '│',
                horizontal: '─',
                cross: '┼',
                fork_right: '╯',
                fork_left: '╰',
                merge_right: '╮',
                merge_left: '╭',
                tee_right: '┤',
                tee_left: '├',
            },
            Self::Ascii => Glyphs {
                node: '*',
                vertical: '|',
                horizontal: '-',
                cross: '+',
                fork_right: '/',
                fork_left: '\\',
                merge_right: '\\',
                merge_left: '/',
                tee_right: '|',
                tee_left: '|',
            },
        }
    }
}

/// One text cell of the graph column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    pub ch: char,
    /// Palette index of the lane drawn in this cell.
    pub color: Option<usize>,
}

impl GlyphCell {
    const BLANK: Self = Self {
        ch: ' ',
        color: None,
    };
}

/// Renders one row of the diagram as `2 * columns - 1` cells: lanes on even
/// cells, connectors in between. `columns` is usually the layout's
/// `max_columns`; rows wider than that grow to fit.
pub fn row_cells(assignment: &LaneAssignment, columns: usize, style: GraphStyle) -> Vec<GlyphCell> {
    let glyphs = style.glyphs();
    let width = columns.max(assignment.span()).max(1) * 2 - 1;
    let mut cells = vec![GlyphCell::BLANK; width];

    for active in &assignment.active_columns {
        let ch = match active.kind {
            ActiveColumnKind::Node => glyphs.node,
            ActiveColumnKind::PassThrough => glyphs.vertical,
            ActiveColumnKind::Converging => continue,
        };
        cells[active.column * 2] = GlyphCell {
            ch,
            color: Some(active.color),
        };
    }

    let node = assignment.column;
    for edge in &assignment.edges {
        let target = edge.to_column;
        let right = target > node;
        let mut corner = match (edge.kind, right) {
            (EdgeKind::Straight, _) => continue,
            (EdgeKind::Fork, true) => glyphs.fork_right,
            (EdgeKind::Fork, false) => glyphs.fork_left,
            (EdgeKind::Merge, true) => glyphs.merge_right,
            (EdgeKind::Merge, false) => glyphs.merge_left,
        };
        if target == node {
            continue;
        }
        let (low, high) = (node.min(target), node.max(target));
        for cell in &mut cells[low * 2 + 1..high * 2] {
            if cell.ch == ' ' {
                *cell = GlyphCell {
                    ch: glyphs.horizontal,
                    color: Some(edge.color),
                };
            } else if cell.ch == glyphs.vertical {
                cell.ch = glyphs.cross;
            }
        }
        let converging = if right { glyphs.fork_right } else { glyphs.fork_left };
        if edge.kind == EdgeKind::Merge && cells[target * 2].ch == converging {
            corner = if right { glyphs.tee_right } else { glyphs.tee_left };
        }
        cells[target * 2] = GlyphCell {
            ch: corner,
            color: Some(edge.color),
        };
    }
    cells
}

pub fn row_text(assignment: &LaneAssignment, columns: usize, style: GraphStyle) -> String {
    row_cells(assignment, columns, style)
        .into_iter()
        .map(|cell| cell.ch)
        .collect()
}
