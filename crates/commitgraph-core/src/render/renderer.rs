use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::RenderConfig;
use crate::models::{EdgeEnd, GraphLayout, GridPoint, LayoutEdge};
use crate::render::container::RowContainer;
use crate::render::geometry::{CubicBezier, Point, Size, Viewport};
use crate::render::surface::Surface;

/// Padding between a node and its background disc.
const NODE_BACKDROP: f32 = 2.0;
/// Distance between a node and its hover/selection ring.
const RING_GAP: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    Rendering,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Position in surface coordinates.
    pub position: Point,
    pub button: PointerButton,
}

/// A commit node found under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHit {
    pub row: usize,
    pub hash: String,
    pub column: usize,
    pub center: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Visible row range, end exclusive.
    pub rows: (usize, usize),
    pub nodes: usize,
    pub connectors: usize,
    pub culled_connectors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn(FrameStats),
    /// A draw was already running; the request moved to the next frame.
    Coalesced,
    /// No layout yet, or the renderer is destroyed.
    Skipped,
}

pub type NodeClickHandler = Box<dyn FnMut(&NodeHit, &PointerEvent)>;
pub type NodeHoverHandler = Box<dyn FnMut(Option<&NodeHit>)>;

/// Draws a [`GraphLayout`] next to a scrolling row container.
///
/// The renderer never changes the layout. Hosts forward scroll, resize,
/// pointer and animation-frame events; resize and state changes only mark a
/// frame as pending, so bursts collapse into one draw on the next
/// [`GraphRenderer::on_animation_frame`].
pub struct GraphRenderer<C, S> {
    config: RenderConfig,
    container: C,
    surface: Option<S>,
    layout: Option<Arc<GraphLayout>>,
    row_by_hash: HashMap<String, usize>,
    state: RendererState,
    hovered: Option<usize>,
    selected: Option<String>,
    scroll_top: f32,
    scroll_left: f32,
    device_pixel_ratio: f32,
    frame_pending: bool,
    on_click: Option<NodeClickHandler>,
    on_hover: Option<NodeHoverHandler>,
}

impl<C: RowContainer, S: Surface> GraphRenderer<C, S> {
    pub fn new(config: RenderConfig, container: C, surface: S) -> Self {
        let scroll_top = container.scroll_top();
        Self {
            config,
            container,
            surface: Some(surface),
            layout: None,
            row_by_hash: HashMap::new(),
            state: RendererState::Uninitialized,
            hovered: None,
            selected: None,
            scroll_top,
            scroll_left: 0.0,
            device_pixel_ratio: 1.0,
            frame_pending: false,
            on_click: None,
            on_hover: None,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn layout(&self) -> Option<&Arc<GraphLayout>> {
        self.layout.as_ref()
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    /// Hosts mutate the container (scrolling, mounting rows) through this and
    /// then report the change with [`GraphRenderer::on_scroll`].
    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn hovered_row(&self) -> Option<usize> {
        self.hovered
    }

    pub fn selected_node(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn scroll_left(&self) -> f32 {
        self.scroll_left
    }

    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn on_node_click(&mut self, handler: impl FnMut(&NodeHit, &PointerEvent) + 'static) {
        self.on_click = Some(Box::new(handler));
    }

    pub fn on_node_hover(&mut self, handler: impl FnMut(Option<&NodeHit>) + 'static) {
        self.on_hover = Some(Box::new(handler));
    }

    /// Full width of the lanes, before clamping.
    pub fn content_width(&self) -> f32 {
        let columns = self.layout.as_ref().map_or(0, |l| l.max_columns);
        columns as f32 * self.config.column_spacing + 2.0 * self.config.left_margin
    }

    /// Width of the drawing surface: the content width clamped to the
    /// configured bounds. Anything wider scrolls horizontally.
    pub fn lane_area_width(&self) -> f32 {
        self.content_width()
            .clamp(self.config.min_width, self.config.max_width)
    }

    pub fn max_scroll_left(&self) -> f32 {
        (self.content_width() - self.lane_area_width()).max(0.0)
    }

    /// Replaces the layout. The previous one is dropped, never mutated.
    pub fn set_layout(&mut self, layout: Arc<GraphLayout>) {
        if self.state == RendererState::Destroyed {
            return;
        }
        self.row_by_hash = layout
            .assignments()
            .map(|a| (a.hash.clone(), a.row))
            .collect();
        self.layout = Some(layout);
        self.hovered = None;
        if self.state == RendererState::Uninitialized {
            self.state = RendererState::Ready;
        }
        self.scroll_left = self.scroll_left.clamp(0.0, self.max_scroll_left());
        self.sync_surface_size();
        self.request_render();
    }

    /// Asks for a draw on the next animation frame. Returns `false` when the
    /// request was merged into one already pending (or cannot be honoured).
    pub fn request_render(&mut self) -> bool {
        if matches!(
            self.state,
            RendererState::Destroyed | RendererState::Uninitialized
        ) {
            return false;
        }
        if self.frame_pending {
            trace!("render request coalesced into pending frame");
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Runs the pending frame, if any.
    pub fn on_animation_frame(&mut self) -> Option<RenderOutcome> {
        if self.state == RendererState::Destroyed || !self.frame_pending {
            return None;
        }
        Some(self.render())
    }

    /// Container size or device pixel ratio changed.
    pub fn on_resize(&mut self, device_pixel_ratio: f32) {
        if self.state == RendererState::Destroyed {
            return;
        }
        self.device_pixel_ratio = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        self.scroll_left = self.scroll_left.clamp(0.0, self.max_scroll_left());
        self.sync_surface_size();
        self.request_render();
    }

    /// The row container scrolled. Redraws right away without relayout.
    pub fn on_scroll(&mut self) -> RenderOutcome {
        if self.state == RendererState::Destroyed {
            return RenderOutcome::Skipped;
        }
        self.scroll_top = self.container.scroll_top();
        self.render()
    }

    pub fn on_horizontal_scroll(&mut self, scroll_left: f32) -> RenderOutcome {
        if self.state == RendererState::Destroyed {
            return RenderOutcome::Skipped;
        }
        self.scroll_left = scroll_left.clamp(0.0, self.max_scroll_left());
        self.render()
    }

    /// Draws the visible part of the layout.
    pub fn render(&mut self) -> RenderOutcome {
        match self.state {
            RendererState::Destroyed | RendererState::Uninitialized => {
                return RenderOutcome::Skipped;
            }
            RendererState::Rendering => {
                self.frame_pending = true;
                return RenderOutcome::Coalesced;
            }
            RendererState::Ready => {}
        }
        let Some(layout) = self.layout.clone() else {
            return RenderOutcome::Skipped;
        };
        let Some(mut surface) = self.surface.take() else {
            return RenderOutcome::Skipped;
        };

        self.state = RendererState::Rendering;
        self.frame_pending = false;
        self.scroll_top = self.container.scroll_top();
        let stats = self.draw(&layout, &mut surface);
        self.surface = Some(surface);
        self.state = RendererState::Ready;

        trace!(
            first_row = stats.rows.0,
            end_row = stats.rows.1,
            nodes = stats.nodes,
            connectors = stats.connectors,
            "rendered commit graph frame"
        );
        RenderOutcome::Drawn(stats)
    }

    /// Nearest node within the hit radius of `(x, y)` (surface coordinates).
    pub fn node_at(&self, x: f32, y: f32) -> Option<NodeHit> {
        if !matches!(
            self.state,
            RendererState::Ready | RendererState::Rendering
        ) {
            return None;
        }
        let layout = self.layout.as_ref()?;
        let cursor = Point::new(x, y);
        let radius = self.config.hit_radius;
        let placement = self.row_placement(layout.row_count());
        let (first, end) = self.rows_between(&placement, y - radius, y + radius);

        (first..end)
            .filter_map(|row| layout.assignment(row))
            .map(|a| {
                let center = self.point(GridPoint::new(a.row, a.column), &placement);
                (a, center, center.distance(cursor))
            })
            .filter(|(_, _, distance)| *distance <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(a, center, _)| NodeHit {
                row: a.row,
                hash: a.hash.clone(),
                column: a.column,
                center,
            })
    }

    /// Updates hover state; fires the hover callback when it changes.
    pub fn on_pointer_move(&mut self, position: Point) -> Option<NodeHit> {
        let hit = self.node_at(position.x, position.y);
        self.set_hovered(hit.as_ref());
        hit
    }

    pub fn on_pointer_leave(&mut self) {
        self.set_hovered(None);
    }

    /// Dispatches a click to the click callback when it lands on a node.
    pub fn on_pointer_click(&mut self, event: PointerEvent) -> Option<NodeHit> {
        let hit = self.node_at(event.position.x, event.position.y)?;
        if let Some(handler) = self.on_click.as_mut() {
            handler(&hit, &event);
        }
        Some(hit)
    }

    pub fn set_selected_node(&mut self, hash: Option<&str>) {
        if self.selected.as_deref() == hash {
            return;
        }
        self.selected = hash.map(ToString::to_string);
        self.request_render();
    }

    /// Scrolls the container so the node of `hash` is vertically centered.
    /// Returns `false` if the commit is not part of the layout.
    pub fn scroll_to_node(&mut self, hash: &str) -> bool {
        if self.state == RendererState::Destroyed {
            return false;
        }
        let (Some(layout), Some(&row)) = (self.layout.as_ref(), self.row_by_hash.get(hash)) else {
            return false;
        };
        let placement = self.row_placement(layout.row_count());
        let center = self.content_y(&placement, row);
        let target = center - self.container.viewport_height() / 2.0;
        self.container.set_scroll_top(target);
        self.on_scroll();
        true
    }

    /// Terminal state: drops the surface, layout and callbacks.
    pub fn destroy(&mut self) {
        if self.state == RendererState::Destroyed {
            return;
        }
        debug!("destroying commit graph renderer");
        self.state = RendererState::Destroyed;
        self.surface = None;
        self.layout = None;
        self.row_by_hash.clear();
        self.on_click = None;
        self.on_hover = None;
        self.hovered = None;
        self.frame_pending = false;
    }

    fn set_hovered(&mut self, hit: Option<&NodeHit>) {
        let row = hit.map(|h| h.row);
        if self.hovered == row {
            return;
        }
        self.hovered = row;
        if let Some(handler) = self.on_hover.as_mut() {
            handler(hit);
        }
        self.request_render();
    }

    fn sync_surface_size(&mut self) {
        let size = Size::new(self.lane_area_width(), self.container.viewport_height());
        let ratio = self.device_pixel_ratio;
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(size, ratio);
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.lane_area_width(),
            height: self.container.viewport_height(),
            margin: self.config.node_radius + NODE_BACKDROP + RING_GAP,
        }
    }

    /// Locates the run of rows the container has mounted, starting from the
    /// row the current scroll offset would show at the fixed row height.
    fn row_placement(&self, row_count: usize) -> RowPlacement {
        let fixed = self.config.row_height;
        let resolved = |row: usize| self.container.row_bounds(row).is_some();
        let guess = (self.container.scroll_top() / fixed) as usize;
        let mounted = nearest_matching(row_count, guess, resolved).and_then(|anchor| {
            let first = run_start(anchor, resolved);
            let last = run_end(anchor, row_count, resolved);
            let top = self.container.row_bounds(first)?.top;
            let bottom = self.container.row_bounds(last).map(|b| b.top + b.height)?;
            Some(MountedRows {
                first,
                last,
                top,
                bottom,
            })
        });
        RowPlacement {
            row_count,
            fixed,
            mounted,
        }
    }

    /// Row center in content coordinates. Rows outside the mounted run are
    /// stacked at the fixed row height from its edges, so the center grows
    /// with the row index.
    fn content_y(&self, placement: &RowPlacement, row: usize) -> f32 {
        let fixed = placement.fixed;
        let Some(mounted) = placement.mounted else {
            return row as f32 * fixed + fixed / 2.0;
        };
        if row < mounted.first {
            return mounted.top - (mounted.first - row) as f32 * fixed + fixed / 2.0;
        }
        if row > mounted.last {
            return mounted.bottom + (row - mounted.last - 1) as f32 * fixed + fixed / 2.0;
        }
        match self.container.row_bounds(row) {
            Some(bounds) => bounds.center(),
            None => mounted.top + (row - mounted.first) as f32 * fixed + fixed / 2.0,
        }
    }

    fn x(&self, column: usize) -> f32 {
        column as f32 * self.config.column_spacing + self.config.left_margin - self.scroll_left
    }

    fn point(&self, at: GridPoint, placement: &RowPlacement) -> Point {
        Point::new(
            self.x(at.column),
            self.content_y(placement, at.row) - self.scroll_top,
        )
    }

    fn end_point(&self, end: EdgeEnd, placement: &RowPlacement) -> Point {
        match end {
            EdgeEnd::At(at) => self.point(at, placement),
            EdgeEnd::Open { column } => {
                self.point(GridPoint::new(placement.row_count, column), placement)
            }
        }
    }

    /// Rows whose centers fall within `[top, bottom]` (viewport coordinates),
    /// found by binary search. Returns `(first, end)`, end exclusive.
    fn rows_between(&self, placement: &RowPlacement, top: f32, bottom: f32) -> (usize, usize) {
        let y = |row: usize| self.content_y(placement, row) - self.scroll_top;
        let first = partition_rows(placement.row_count, |row| y(row) < top);
        let end = partition_rows(placement.row_count, |row| y(row) <= bottom);
        (first, end.max(first))
    }

    fn draw(&self, layout: &GraphLayout, surface: &mut S) -> FrameStats {
        surface.clear();
        let viewport = self.viewport();
        let row_count = layout.row_count();
        let placement = self.row_placement(row_count);
        let (first, end) =
            self.rows_between(&placement, -viewport.margin, viewport.height + viewport.margin);
        let mut stats = FrameStats {
            rows: (first, end),
            ..FrameStats::default()
        };

        // Edges are sorted by their first row: nothing starting below the
        // window can reach into it.
        let candidates = layout.edges.partition_point(|e| e.from.row <= end);
        for edge in &layout.edges[..candidates] {
            let (_, last_row) = edge.row_span(row_count);
            if last_row + 1 < first {
                stats.culled_connectors += 1;
                continue;
            }
            let from = self.point(edge.from, &placement);
            let to = self.end_point(edge.to, &placement);
            if !viewport.intersects(from, to) {
                stats.culled_connectors += 1;
                continue;
            }
            self.draw_edge(surface, edge, from, to);
            stats.connectors += 1;
        }

        for assignment in (first..end).filter_map(|row| layout.assignment(row)) {
            let center = self.point(GridPoint::new(assignment.row, assignment.column), &placement);
            if !viewport.contains(center) {
                continue;
            }
            let radius = self.config.node_radius;
            surface.fill_circle(center, radius + NODE_BACKDROP, self.config.background);
            surface.fill_circle(center, radius, self.config.palette.color(assignment.color));
            if self.selected.as_deref() == Some(assignment.hash.as_str()) {
                surface.stroke_circle(
                    center,
                    radius + RING_GAP,
                    self.config.selected_ring,
                    self.config.line_width,
                );
            } else if self.hovered == Some(assignment.row) {
                surface.stroke_circle(
                    center,
                    radius + RING_GAP,
                    self.config.hover_ring,
                    self.config.line_width,
                );
            }
            stats.nodes += 1;
        }
        stats
    }

    fn draw_edge(&self, surface: &mut S, edge: &LayoutEdge, from: Point, to: Point) {
        let color = self.config.palette.color(edge.color);
        if edge.from.column == edge.to.column() {
            surface.stroke_line(from, to, color, self.config.line_width);
        } else {
            surface.stroke_curve(CubicBezier::between(from, to), color, self.config.line_width);
        }
    }
}

/// Row-to-y mapping for one frame or hit test.
#[derive(Debug, Clone, Copy)]
struct RowPlacement {
    row_count: usize,
    fixed: f32,
    mounted: Option<MountedRows>,
}

/// Contiguous rows the container can resolve, with their outer edges in
/// content coordinates.
#[derive(Debug, Clone, Copy)]
struct MountedRows {
    first: usize,
    last: usize,
    top: f32,
    bottom: f32,
}

/// Row in `0..len` closest to `start` for which `pred` holds.
fn nearest_matching(len: usize, start: usize, pred: impl Fn(usize) -> bool) -> Option<usize> {
    let start = start.min(len.checked_sub(1)?);
    (0..len).find_map(|distance| {
        let after = start + distance;
        if after < len && pred(after) {
            return Some(after);
        }
        let before = start.checked_sub(distance).filter(|_| distance > 0)?;
        pred(before).then_some(before)
    })
}

/// First row of the run of matching rows ending at `anchor`. Gallops
/// backwards, then binary searches the last gap.
fn run_start(anchor: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut known, mut step) = (anchor, 1);
    loop {
        match known.checked_sub(step) {
            Some(row) if pred(row) => {
                known = row;
                step *= 2;
            }
            gap => {
                let low = gap.map_or(0, |row| row + 1);
                return low + partition_rows(known - low, |offset| !pred(low + offset));
            }
        }
    }
}

/// Last row of the run of matching rows starting at `anchor`, below `len`.
fn run_end(anchor: usize, len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut known, mut step) = (anchor, 1);
    loop {
        let row = known + step;
        if row < len && pred(row) {
            known = row;
            step *= 2;
            continue;
        }
        let high = row.min(len);
        return known + partition_rows(high - known - 1, |offset| pred(known + 1 + offset));
    }
}

/// First row in `0..len` for which `pred` is false. `pred` must be
/// monotonic (true then false).
fn partition_rows(len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::{
        GraphRenderer, PointerButton, PointerEvent, RenderOutcome, RendererState,
        nearest_matching, run_end, run_start,
    };
    use crate::config::RenderConfig;
    use crate::layout::compute_layout;
    use crate::models::{CommitRecord, GraphLayout};
    use crate::render::container::{FixedRowContainer, RowBounds, RowContainer};
    use crate::render::geometry::Point;
    use crate::render::surface::{DrawCommand, RecordingSurface};

    fn merge_layout() -> Arc<GraphLayout> {
        Arc::new(compute_layout(&[
            CommitRecord::new("d", ["b", "c"]),
            CommitRecord::new("b", ["a"]),
            CommitRecord::new("c", ["a"]),
            CommitRecord::new("a", Vec::<String>::new()),
        ]))
    }

    fn renderer() -> GraphRenderer<FixedRowContainer, RecordingSurface> {
        let config = RenderConfig::default();
        let container = FixedRowContainer::new(config.row_height, 4, 200.0);
        GraphRenderer::new(config, container, RecordingSurface::new())
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let mut renderer = renderer();
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert_eq!(renderer.render(), RenderOutcome::Skipped);

        renderer.set_layout(merge_layout());
        assert_eq!(renderer.state(), RendererState::Ready);
        assert!(matches!(renderer.render(), RenderOutcome::Drawn(_)));
        assert_eq!(renderer.state(), RendererState::Ready);

        renderer.destroy();
        assert_eq!(renderer.state(), RendererState::Destroyed);
        assert!(renderer.surface().is_none());
        assert_eq!(renderer.render(), RenderOutcome::Skipped);
        assert_eq!(renderer.on_animation_frame(), None);
    }

    #[test]
    fn render_requests_coalesce_into_one_frame() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        assert!(renderer.is_frame_pending());
        assert!(!renderer.request_render());
        renderer.on_resize(2.0);
        renderer.set_selected_node(Some("a"));

        assert!(matches!(
            renderer.on_animation_frame(),
            Some(RenderOutcome::Drawn(_))
        ));
        assert_eq!(renderer.on_animation_frame(), None);
        assert_eq!(renderer.surface().map(|s| s.frames()), Some(1));
    }

    #[test]
    fn draws_nodes_and_connectors() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        let RenderOutcome::Drawn(stats) = renderer.render() else {
            panic!("expected a drawn frame");
        };
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.rows, (0, 4));

        let commands = renderer.surface().expect("surface").commands();
        let curves = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Curve { .. }))
            .count();
        // d -> c merge bend and c -> a fork.
        assert_eq!(curves, 2);
        // Background disc plus the colored node for each commit.
        assert_eq!(
            commands
                .iter()
                .filter(|c| matches!(c, DrawCommand::FillCircle { .. }))
                .count(),
            8
        );
    }

    #[test]
    fn lane_area_width_is_clamped() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        // Two columns: 2 * 16 + 2 * 12.
        assert_eq!(renderer.lane_area_width(), 56.0);
        assert_eq!(renderer.max_scroll_left(), 0.0);
        assert_eq!(
            renderer.surface().map(|s| s.size().width),
            Some(56.0)
        );
    }

    #[test]
    fn wide_histories_scroll_horizontally() {
        let config = RenderConfig::default();
        let tips: Vec<_> = (0..40)
            .map(|i| CommitRecord::new(format!("t{i}"), [format!("base{i}")]))
            .collect();
        let container = FixedRowContainer::new(config.row_height, tips.len(), 200.0);
        let mut renderer = GraphRenderer::new(config, container, RecordingSurface::new());
        renderer.set_layout(Arc::new(compute_layout(&tips)));

        // 40 columns: 40 * 16 + 24 = 664, clamped to 480.
        assert_eq!(renderer.lane_area_width(), 480.0);
        assert_eq!(renderer.max_scroll_left(), 184.0);
        renderer.on_horizontal_scroll(1_000.0);
        assert_eq!(renderer.scroll_left(), 184.0);
    }

    #[test]
    fn hit_testing_finds_nearest_node() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        // Row 2 (c) sits in column 1: x = 16 + 12, y = 2 * 24 + 12.
        let hit = renderer.node_at(29.0, 61.0).expect("hit c");
        assert_eq!(hit.hash, "c");
        assert_eq!(hit.column, 1);
        assert!(renderer.node_at(29.0, 12.0).is_none());
    }

    #[test]
    fn hover_and_click_fire_callbacks() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        let hovered = Rc::new(RefCell::new(Vec::new()));
        let clicked = Rc::new(RefCell::new(Vec::new()));
        {
            let hovered = Rc::clone(&hovered);
            renderer.on_node_hover(move |hit| {
                hovered.borrow_mut().push(hit.map(|h| h.hash.clone()));
            });
            let clicked = Rc::clone(&clicked);
            renderer.on_node_click(move |hit, event| {
                clicked.borrow_mut().push((hit.hash.clone(), event.button));
            });
        }

        renderer.on_pointer_move(Point::new(12.0, 12.0));
        renderer.on_pointer_move(Point::new(13.0, 13.0));
        renderer.on_pointer_leave();
        renderer.on_pointer_click(PointerEvent {
            position: Point::new(12.0, 36.0),
            button: PointerButton::Secondary,
        });

        assert_eq!(
            *hovered.borrow(),
            vec![Some("d".to_string()), None]
        );
        assert_eq!(
            *clicked.borrow(),
            vec![("b".to_string(), PointerButton::Secondary)]
        );
    }

    #[test]
    fn selected_node_gets_a_ring() {
        let mut renderer = renderer();
        renderer.set_layout(merge_layout());
        renderer.set_selected_node(Some("b"));
        renderer.render();
        let config = RenderConfig::default();
        let rings: Vec<_> = renderer
            .surface()
            .expect("surface")
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeCircle { center, color, .. } => Some((*center, *color)),
                _ => None,
            })
            .collect();
        assert_eq!(rings, vec![(Point::new(12.0, 36.0), config.selected_ring)]);
    }

    #[test]
    fn scroll_to_node_centers_the_row() {
        let config = RenderConfig::default();
        let commits: Vec<_> = (0..100)
            .map(|i| CommitRecord::new(format!("c{i}"), [format!("c{}", i + 1)]))
            .collect();
        let container = FixedRowContainer::new(config.row_height, commits.len(), 240.0);
        let mut renderer = GraphRenderer::new(config, container, RecordingSurface::new());
        renderer.set_layout(Arc::new(compute_layout(&commits)));

        assert!(renderer.scroll_to_node("c50"));
        // Row 50 center is 1212; minus half the viewport.
        assert_eq!(renderer.container().scroll_top(), 1092.0);
        assert!(!renderer.scroll_to_node("missing"));
    }

    /// Mounts only the first `mounted` rows, with a taller first row.
    struct PartialRows {
        mounted: usize,
        scroll_top: f32,
    }

    impl RowContainer for PartialRows {
        fn row_bounds(&self, row: usize) -> Option<RowBounds> {
            match row {
                0 => Some(RowBounds {
                    top: 0.0,
                    height: 40.0,
                }),
                r if r < self.mounted => Some(RowBounds {
                    top: 40.0 + (r - 1) as f32 * 24.0,
                    height: 24.0,
                }),
                _ => None,
            }
        }

        fn scroll_top(&self) -> f32 {
            self.scroll_top
        }

        fn viewport_height(&self) -> f32 {
            400.0
        }

        fn set_scroll_top(&mut self, scroll_top: f32) {
            self.scroll_top = scroll_top;
        }
    }

    #[test]
    fn unresolved_rows_stack_below_mounted_rows() {
        let container = PartialRows {
            mounted: 2,
            scroll_top: 0.0,
        };
        let mut renderer =
            GraphRenderer::new(RenderConfig::default(), container, RecordingSurface::new());
        renderer.set_layout(merge_layout());
        assert!(matches!(renderer.render(), RenderOutcome::Drawn(_)));

        // Rows 0 and 1 are measured (40px + 24px); rows 2 and 3 follow at
        // 24px from the bottom of row 1.
        assert_eq!(renderer.node_at(12.0, 20.0).map(|h| h.row), Some(0));
        assert_eq!(renderer.node_at(28.0, 76.0).map(|h| h.row), Some(2));
        assert_eq!(renderer.node_at(12.0, 100.0).map(|h| h.row), Some(3));
        assert!(renderer.node_at(12.0, 84.0).is_none());
    }

    #[test]
    fn finds_the_mounted_run_from_any_row() {
        let mounted = |row: usize| (500..=520).contains(&row);
        assert_eq!(nearest_matching(10_000, 625, mounted), Some(520));
        assert_eq!(nearest_matching(10_000, 12, mounted), Some(500));
        assert_eq!(nearest_matching(10_000, 510, mounted), Some(510));
        assert_eq!(nearest_matching(10_000, 20_000, mounted), Some(520));
        assert_eq!(nearest_matching(0, 0, mounted), None);
        assert_eq!(nearest_matching(400, 10, mounted), None);

        assert_eq!(run_start(520, mounted), 500);
        assert_eq!(run_end(500, 10_000, mounted), 520);
        assert_eq!(run_start(7, |_| true), 0);
        assert_eq!(run_end(7, 100, |_| true), 99);
    }
}
