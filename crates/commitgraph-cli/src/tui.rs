use std::cell::Cell;
use std::cmp::min;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use commitgraph_core::render::{
    DrawCommand, Point, PointerButton, PointerEvent, RenderOutcome, RowBounds,
};
use commitgraph_core::{
    CommitRecord, GraphRenderer, GraphSession, LayoutOptions, RecordingSurface, RenderConfig, Rgb,
    RowContainer,
};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Context as CanvasContext, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use crate::git::{GitRunner, LogQuery};
use crate::search::{SearchQuery, filter_commits};

#[derive(Debug, Clone)]
pub struct TuiConfig {
    pub repo: PathBuf,
    /// First page; later pages follow with [`LogQuery::next_page`].
    pub query: LogQuery,
    pub layout: LayoutOptions,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

/// Braille dots per terminal cell. The renderer works in dots.
const DOTS_PER_CELL_X: f32 = 2.0;
const DOTS_PER_CELL_Y: f32 = 4.0;
const SEARCH_APPLY_DEBOUNCE: Duration = Duration::from_millis(180);
const MOUSE_SCROLL_ROWS: isize = 3;
/// Rows left below the selection when the next page is fetched.
const AUTO_LOAD_MARGIN: usize = 5;
const CURVE_SEGMENTS: usize = 8;

pub fn run(runner: GitRunner, config: TuiConfig) -> Result<()> {
    let mut app = TuiApp::new(runner, config)?;
    let mut terminal = setup_terminal().context("failed to initialize terminal")?;
    let poll_rate = Duration::from_millis(33);
    let mut needs_redraw = true;

    let run_result = loop {
        if app.on_animation_frame() {
            needs_redraw = true;
        }
        if needs_redraw {
            terminal
                .draw(|f| app.draw(f))
                .context("failed to draw TUI frame")?;
            needs_redraw = false;
        }

        if event::poll(poll_rate).context("failed to poll terminal events")? {
            let mut should_quit = false;
            loop {
                match event::read().context("failed to read terminal event")? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !app.on_key(key)? {
                            should_quit = true;
                            break;
                        }
                        needs_redraw = true;
                    }
                    Event::Mouse(mouse) => {
                        if app.on_mouse(mouse) {
                            needs_redraw = true;
                        }
                    }
                    Event::Resize(_, _) => {
                        app.renderer.on_resize(1.0);
                        needs_redraw = true;
                    }
                    _ => {}
                }

                if !event::poll(Duration::from_millis(0))
                    .context("failed to poll queued terminal events")?
                {
                    break;
                }
            }
            if should_quit {
                break Ok(());
            }
        } else if app.on_tick()? {
            needs_redraw = true;
        }
    };

    app.renderer.destroy();
    let restore_result = restore_terminal(terminal);
    run_result.and(restore_result)
}

/// The commit list as seen by the renderer: one terminal line per row,
/// scrolled by whole rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TerminalRows {
    row_count: usize,
    offset: usize,
    visible_rows: usize,
}

impl TerminalRows {
    fn offset(&self) -> usize {
        self.offset
    }

    fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    fn max_offset(&self) -> usize {
        self.row_count.saturating_sub(self.visible_rows)
    }

    fn set_row_count(&mut self, row_count: usize) {
        self.row_count = row_count;
        self.offset = min(self.offset, self.max_offset());
    }

    fn set_visible_rows(&mut self, visible_rows: usize) {
        self.visible_rows = visible_rows;
        self.offset = min(self.offset, self.max_offset());
    }

    /// Returns whether the offset changed.
    fn set_offset(&mut self, offset: usize) -> bool {
        let offset = min(offset, self.max_offset());
        let changed = offset != self.offset;
        self.offset = offset;
        changed
    }
}

impl RowContainer for TerminalRows {
    fn row_bounds(&self, row: usize) -> Option<RowBounds> {
        (row < self.row_count).then(|| RowBounds {
            top: row as f32 * DOTS_PER_CELL_Y,
            height: DOTS_PER_CELL_Y,
        })
    }

    fn scroll_top(&self) -> f32 {
        self.offset as f32 * DOTS_PER_CELL_Y
    }

    fn viewport_height(&self) -> f32 {
        self.visible_rows as f32 * DOTS_PER_CELL_Y
    }

    fn set_scroll_top(&mut self, scroll_top: f32) {
        let row = (scroll_top.max(0.0) / DOTS_PER_CELL_Y).round() as usize;
        self.set_offset(row);
    }
}

struct TuiApp {
    runner: GitRunner,
    repo: PathBuf,
    first_page: LogQuery,
    next_page: LogQuery,
    exhausted: bool,
    /// Everything fetched so far, unfiltered.
    loaded: Vec<CommitRecord>,
    session: GraphSession,
    renderer: GraphRenderer<TerminalRows, RecordingSurface>,
    clicked: Rc<Cell<Option<usize>>>,
    hovered: Rc<Cell<Option<usize>>>,
    selected: Option<usize>,
    /// Keep the selection in view. Cleared by wheel scrolling.
    follow_selection: bool,
    list_cache: Vec<Line<'static>>,
    status: String,
    input_mode: InputMode,
    search_input: String,
    search_regex: bool,
    pending_search_apply: bool,
    last_search_input_change_at: Instant,
    graph_area: Option<Rect>,
    list_area: Option<Rect>,
    search_area: Option<Rect>,
}

impl TuiApp {
    fn new(runner: GitRunner, config: TuiConfig) -> Result<Self> {
        let mut renderer = GraphRenderer::new(
            terminal_render_config(&config.render),
            TerminalRows::default(),
            RecordingSurface::new(),
        );
        let clicked = Rc::new(Cell::new(None));
        let hovered = Rc::new(Cell::new(None));
        {
            let clicked = Rc::clone(&clicked);
            renderer.on_node_click(move |hit, _event| clicked.set(Some(hit.row)));
            let hovered = Rc::clone(&hovered);
            renderer.on_node_hover(move |hit| hovered.set(hit.map(|h| h.row)));
        }

        let mut app = Self {
            runner,
            repo: config.repo,
            next_page: config.query.clone(),
            first_page: config.query,
            exhausted: false,
            loaded: Vec::new(),
            session: GraphSession::new(config.layout),
            renderer,
            clicked,
            hovered,
            selected: None,
            follow_selection: true,
            list_cache: Vec::new(),
            status: "Ready".to_string(),
            input_mode: InputMode::Normal,
            search_input: String::new(),
            search_regex: false,
            pending_search_apply: false,
            last_search_input_change_at: Instant::now(),
            graph_area: None,
            list_area: None,
            search_area: None,
        };
        app.reload()?;
        Ok(app)
    }

    fn on_animation_frame(&mut self) -> bool {
        matches!(
            self.renderer.on_animation_frame(),
            Some(RenderOutcome::Drawn(_))
        )
    }

    fn on_tick(&mut self) -> Result<bool> {
        let mut needs_redraw = false;
        if self.pending_search_apply
            && self.last_search_input_change_at.elapsed() >= SEARCH_APPLY_DEBOUNCE
        {
            self.apply_search()?;
            needs_redraw = true;
        }
        if self.should_auto_load() {
            self.try_load_next_page();
            needs_redraw = true;
        }
        Ok(needs_redraw)
    }

    fn on_key(&mut self, key: crossterm::event::KeyEvent) -> Result<bool> {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_mode_key(key),
            InputMode::Search => self.handle_search_mode_key(key),
        }
    }

    fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<bool> {
        let page = self.renderer.container().visible_rows().max(1) as isize;
        match key.code {
            KeyCode::Char('q') => return Ok(false),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(false);
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(page),
            KeyCode::PageUp => self.move_selection(-page),
            KeyCode::Char('g') => self.select_row(0),
            KeyCode::Char('G') => self.select_row(self.session.len().saturating_sub(1)),
            KeyCode::Left | KeyCode::Char('h') => self.scroll_lanes(-1.0),
            KeyCode::Right | KeyCode::Char('l') => self.scroll_lanes(1.0),
            KeyCode::Char('z') => self.center_selected(),
            KeyCode::Char('n') => self.try_load_next_page(),
            KeyCode::Char('r') => self.reload()?,
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Search;
                self.status = search_prompt(self.search_regex);
            }
            KeyCode::Esc => {
                if !self.search_input.is_empty() {
                    self.search_input.clear();
                    self.apply_search()?;
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn handle_search_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.apply_search()?;
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                if self.pending_search_apply {
                    self.apply_search()?;
                }
                self.status = "Search canceled".to_string();
            }
            KeyCode::Tab => {
                self.search_regex = !self.search_regex;
                self.status = search_prompt(self.search_regex);
                self.queue_search_apply();
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.queue_search_apply();
            }
            KeyCode::Char(ch) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    self.search_input.push(ch);
                    self.queue_search_apply();
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) -> bool {
        if let Some(area) = self.search_area
            && point_in_rect(area, mouse.column, mouse.row)
            && let MouseEventKind::Down(MouseButton::Left) = mouse.kind
        {
            self.input_mode = InputMode::Search;
            self.status = search_prompt(self.search_regex);
            return true;
        }

        if self.input_mode == InputMode::Search {
            return false;
        }

        if let Some(area) = self.graph_area.and_then(inner_block_area)
            && point_in_rect(area, mouse.column, mouse.row)
        {
            let position = cell_to_surface(area, mouse.column, mouse.row);
            return match mouse.kind {
                MouseEventKind::Moved => {
                    let before = self.hovered.get();
                    self.renderer.on_pointer_move(position);
                    self.hovered.get() != before
                }
                MouseEventKind::Down(button) => {
                    let event = PointerEvent {
                        position,
                        button: pointer_button(button),
                    };
                    if self.renderer.on_pointer_click(event).is_some()
                        && let Some(row) = self.clicked.take()
                    {
                        self.select_row(row);
                    }
                    true
                }
                MouseEventKind::ScrollDown => {
                    self.scroll_rows(MOUSE_SCROLL_ROWS);
                    true
                }
                MouseEventKind::ScrollUp => {
                    self.scroll_rows(-MOUSE_SCROLL_ROWS);
                    true
                }
                MouseEventKind::ScrollRight => {
                    self.scroll_lanes(1.0);
                    true
                }
                MouseEventKind::ScrollLeft => {
                    self.scroll_lanes(-1.0);
                    true
                }
                _ => false,
            };
        }

        let mut needs_redraw = false;
        if self.hovered.get().is_some() {
            self.renderer.on_pointer_leave();
            needs_redraw = true;
        }

        if let Some(area) = self.list_area.and_then(inner_block_area)
            && point_in_rect(area, mouse.column, mouse.row)
        {
            match mouse.kind {
                MouseEventKind::ScrollDown => {
                    self.scroll_rows(MOUSE_SCROLL_ROWS);
                    return true;
                }
                MouseEventKind::ScrollUp => {
                    self.scroll_rows(-MOUSE_SCROLL_ROWS);
                    return true;
                }
                MouseEventKind::Down(MouseButton::Left)
                | MouseEventKind::Drag(MouseButton::Left) => {
                    let row = self
                        .renderer
                        .container()
                        .offset()
                        .saturating_add((mouse.row - area.y) as usize);
                    if row < self.session.len() {
                        self.select_row(row);
                    }
                    return true;
                }
                _ => {}
            }
        }

        needs_redraw
    }

    /// Fetches the first page again and starts over.
    fn reload(&mut self) -> Result<()> {
        let page = self
            .runner
            .load_page(&self.repo, &self.first_page)
            .with_context(|| format!("failed to load history for {}", self.repo.display()))?;
        self.exhausted = page.len() < self.first_page.limit;
        self.next_page = self.first_page.next_page();
        self.loaded = page;
        info!(
            repo = %self.repo.display(),
            git = self.runner.git_binary(),
            commits = self.loaded.len(),
            "loaded history"
        );
        self.apply_search()?;
        self.status = format!("Loaded {} commit(s)", self.loaded.len());
        Ok(())
    }

    fn try_load_next_page(&mut self) {
        if self.exhausted {
            self.status = format!("All {} commit(s) loaded", self.loaded.len());
            return;
        }
        if let Err(err) = self.load_next_page() {
            // Stop auto-loading until the next reload.
            self.exhausted = true;
            self.status = format!("load error: {err:#}");
        }
    }

    fn load_next_page(&mut self) -> Result<()> {
        let page = self
            .runner
            .load_page(&self.repo, &self.next_page)
            .with_context(|| format!("failed to load more history for {}", self.repo.display()))?;
        self.exhausted = page.len() < self.next_page.limit;
        debug!(
            skip = self.next_page.skip,
            commits = page.len(),
            exhausted = self.exhausted,
            "loaded next page"
        );
        self.next_page = self.next_page.next_page();
        self.loaded.extend(page.iter().cloned());

        if self.search_active() {
            // A filtered view is rebuilt from scratch.
            return self.apply_search();
        }
        let appended = self.session.append_page(page);
        self.sync_layout();
        self.status = format!(
            "Loaded {appended} more commit(s), {} total",
            self.session.len()
        );
        Ok(())
    }

    fn should_auto_load(&self) -> bool {
        !self.exhausted
            && !self.search_active()
            && self
                .selected
                .is_some_and(|row| row + AUTO_LOAD_MARGIN >= self.session.len())
    }

    fn search_active(&self) -> bool {
        !self.search_input.trim().is_empty()
    }

    fn queue_search_apply(&mut self) {
        self.pending_search_apply = true;
        self.last_search_input_change_at = Instant::now();
    }

    /// Filters everything loaded so far and resets the session with the result.
    fn apply_search(&mut self) -> Result<()> {
        self.pending_search_apply = false;
        let query = SearchQuery {
            use_regex: self.search_regex,
            ..SearchQuery::substring(self.search_input.clone())
        };
        let visible = match filter_commits(&self.loaded, &query) {
            Ok(visible) => visible,
            Err(err) => {
                self.status = format!("search error: {err}");
                return Ok(());
            }
        };

        let selected_hash = self.selected_commit().map(|c| c.hash.clone());
        self.session.reset(visible);
        self.sync_layout();
        let layout = self.session.layout();
        let row = selected_hash
            .and_then(|hash| layout.row_of(&hash))
            .unwrap_or(0);
        self.select_row(row);

        self.status = if query.is_empty() {
            format!("Showing {} commit(s)", self.session.len())
        } else if self.session.is_empty() {
            format!("No matches for {:?}", self.search_input)
        } else {
            format!("Matched {} commit(s)", self.session.len())
        };
        Ok(())
    }

    /// Hands the session's current layout to the renderer.
    fn sync_layout(&mut self) {
        self.renderer
            .container_mut()
            .set_row_count(self.session.len());
        self.renderer.set_layout(self.session.layout());
        // The renderer drops hover state with the old layout.
        self.hovered.set(None);
        self.rebuild_list_cache();
        if self.selected.is_some_and(|row| row >= self.session.len()) {
            self.select_row(0);
        }
    }

    fn selected_commit(&self) -> Option<&CommitRecord> {
        self.selected.and_then(|row| self.session.commit(row))
    }

    fn select_row(&mut self, row: usize) {
        if self.session.is_empty() {
            self.selected = None;
            self.renderer.set_selected_node(None);
            return;
        }
        let bounded = min(row, self.session.len() - 1);
        self.selected = Some(bounded);
        self.follow_selection = true;
        let hash = self.session.commit(bounded).map(|c| c.hash.clone());
        self.renderer.set_selected_node(hash.as_deref());
    }

    fn move_selection(&mut self, delta: isize) {
        let current = self.selected.unwrap_or(0);
        self.select_row(current.saturating_add_signed(delta));
    }

    fn scroll_rows(&mut self, delta: isize) {
        let target = self.renderer.container().offset().saturating_add_signed(delta);
        if self.renderer.container_mut().set_offset(target) {
            self.follow_selection = false;
            self.renderer.on_scroll();
        }
    }

    fn scroll_lanes(&mut self, columns: f32) {
        let left = self.renderer.scroll_left() + columns * self.renderer.config().column_spacing;
        self.renderer.on_horizontal_scroll(left);
    }

    fn center_selected(&mut self) {
        let Some(hash) = self.selected_commit().map(|c| c.hash.clone()) else {
            return;
        };
        if self.renderer.scroll_to_node(&hash) {
            self.follow_selection = false;
        }
    }

    /// Matches the renderer's viewport to the list pane and keeps the
    /// selection visible.
    fn sync_viewport(&mut self, visible_rows: usize) {
        if self.renderer.container().visible_rows() != visible_rows {
            self.renderer.container_mut().set_visible_rows(visible_rows);
            self.renderer.on_resize(1.0);
        }
        if self.follow_selection
            && let Some(selected) = self.selected
        {
            let offset = self.renderer.container().offset();
            let (start, _, _) = visible_window(self.session.len(), selected, offset, visible_rows);
            if self.renderer.container_mut().set_offset(start) {
                self.renderer.on_scroll();
            }
        }
    }

    fn rebuild_list_cache(&mut self) {
        self.list_cache = self
            .session
            .commits()
            .iter()
            .map(build_commit_line)
            .collect();
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(6),
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let loaded = if self.exhausted {
            "all loaded".to_string()
        } else {
            format!("next page at {}", self.next_page.skip)
        };
        let layout = self.session.layout();
        let header = Paragraph::new(vec![
            Line::from(vec![
                Span::styled(
                    "CommitGraph",
                    Style::default()
                        .fg(Color::LightCyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("repo: {}", self.repo.display()),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(vec![
                Span::styled(
                    format!("commits: {}/{}", self.session.len(), self.loaded.len()),
                    Style::default().fg(Color::White),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("lanes: {}", layout.max_columns),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw("  "),
                Span::styled(loaded, Style::default().fg(Color::DarkGray)),
            ]),
        ]);
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(lane_pane_width(self.renderer.lane_area_width())),
                Constraint::Min(20),
            ])
            .split(chunks[1]);
        self.graph_area = Some(body[0]);
        self.list_area = Some(body[1]);

        let visible_rows = inner_block_area(body[1]).map_or(0, |a| a.height as usize);
        self.sync_viewport(visible_rows);
        self.draw_commit_list(frame, body[1]);
        self.draw_graph(frame, body[0]);
        self.draw_details(frame, chunks[2]);

        let search_title = match (self.input_mode, self.search_regex) {
            (InputMode::Search, false) => "Search (typing)",
            (InputMode::Search, true) => "Search regex (typing)",
            (InputMode::Normal, _) => "Search (/ to edit)",
        };
        let search = Paragraph::new(self.search_input.as_str())
            .block(Block::default().borders(Borders::ALL).title(search_title));
        self.search_area = Some(chunks[3]);
        frame.render_widget(search, chunks[3]);

        let footer = Paragraph::new(format!(
            "{} | q quit | j/k move | g/G top/bottom | h/l lanes | z center | n more | r reload | mouse: hover/click/wheel",
            self.status
        ))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(footer, chunks[4]);
    }

    fn draw_commit_list(&self, frame: &mut Frame, area: Rect) {
        let inner_height = inner_block_area(area).map_or(0, |a| a.height as usize);
        let start = self.renderer.container().offset();
        let end = min(start.saturating_add(inner_height), self.list_cache.len());
        let items = self.list_cache[min(start, end)..end]
            .iter()
            .cloned()
            .map(ListItem::new);

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Commits"))
            .highlight_style(
                Style::default()
                    .bg(Color::Rgb(16, 70, 140))
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            );
        let mut local_state = ListState::default();
        local_state.select(
            self.selected
                .filter(|row| (start..end).contains(row))
                .map(|row| row - start),
        );
        frame.render_stateful_widget(list, area, &mut local_state);
    }

    fn draw_graph(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Graph");
        let Some(inner) = inner_block_area(area) else {
            frame.render_widget(block, area);
            return;
        };
        let width = f64::from(inner.width) * f64::from(DOTS_PER_CELL_X);
        let height = f64::from(inner.height) * f64::from(DOTS_PER_CELL_Y);
        let commands = self
            .renderer
            .surface()
            .map(RecordingSurface::commands)
            .unwrap_or_default();
        let background = self.renderer.config().background;

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(|ctx| replay(ctx, commands, height, background));
        frame.render_widget(canvas, area);
    }

    fn draw_details(&self, frame: &mut Frame, area: Rect) {
        let text = if let Some(commit) = self.selected_commit() {
            let meta = &commit.meta;
            let refs = crate::decoration::label(&meta.refs);
            let parents = if commit.parent_hashes.is_empty() {
                "(none)".to_string()
            } else {
                commit.parent_hashes.join(", ")
            };
            let hovered = self
                .hovered
                .get()
                .and_then(|row| self.session.commit(row))
                .map(|c| format!("  hover: {}", c.display_hash()))
                .unwrap_or_default();
            format!(
                "{} {}\nauthor: {} <{}>  committed: {}{}\nrefs: {}\nparents: {}",
                sanitize_terminal_text(commit.display_hash()),
                sanitize_terminal_text(&meta.subject),
                sanitize_terminal_text(&meta.author_name),
                sanitize_terminal_text(&meta.author_email),
                meta.committed_unix,
                hovered,
                if refs.is_empty() {
                    "(none)".to_string()
                } else {
                    sanitize_terminal_text(&refs)
                },
                sanitize_terminal_text(&parents),
            )
        } else {
            "No commit selected".to_string()
        };
        let details = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: false });
        frame.render_widget(details, area);
    }
}

/// Scales the configured geometry to braille dots; colors are kept.
fn terminal_render_config(base: &RenderConfig) -> RenderConfig {
    RenderConfig {
        row_height: DOTS_PER_CELL_Y,
        column_spacing: 2.0 * DOTS_PER_CELL_X,
        left_margin: DOTS_PER_CELL_X,
        node_radius: 1.0,
        line_width: 1.0,
        hit_radius: 2.0 * DOTS_PER_CELL_X,
        min_width: 4.0 * DOTS_PER_CELL_X,
        max_width: 48.0 * DOTS_PER_CELL_X,
        ..base.clone()
    }
}

/// Pane width in cells, borders included, for a lane area `width` dots wide.
fn lane_pane_width(width: f32) -> u16 {
    (width / DOTS_PER_CELL_X).ceil() as u16 + 2
}

/// Center of terminal cell `(column, row)` in renderer coordinates.
fn cell_to_surface(inner: Rect, column: u16, row: u16) -> Point {
    Point::new(
        f32::from(column.saturating_sub(inner.x)) * DOTS_PER_CELL_X + DOTS_PER_CELL_X / 2.0,
        f32::from(row.saturating_sub(inner.y)) * DOTS_PER_CELL_Y + DOTS_PER_CELL_Y / 2.0,
    )
}

/// Canvas y grows upwards.
fn to_canvas(point: Point, height: f64) -> (f64, f64) {
    (f64::from(point.x), height - f64::from(point.y))
}

fn terminal_color(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    }
}

/// Replays one recorded frame onto the canvas. Backdrop discs are skipped:
/// braille cells cannot erase what is under them.
fn replay(ctx: &mut CanvasContext, commands: &[DrawCommand], height: f64, background: Rgb) {
    for command in commands {
        match command {
            DrawCommand::Clear => {}
            DrawCommand::Line {
                from, to, color, ..
            } => draw_segment(ctx, *from, *to, *color, height),
            DrawCommand::Curve { curve, color, .. } => {
                for pair in curve.flatten(CURVE_SEGMENTS).windows(2) {
                    draw_segment(ctx, pair[0], pair[1], *color, height);
                }
            }
            DrawCommand::FillCircle { color, .. } if *color == background => {}
            DrawCommand::FillCircle {
                center,
                radius,
                color,
            } => {
                let (x, y) = to_canvas(*center, height);
                let color = terminal_color(*color);
                ctx.draw(&Points {
                    coords: &[(x, y)],
                    color,
                });
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: f64::from(*radius),
                    color,
                });
            }
            DrawCommand::StrokeCircle {
                center,
                radius,
                color,
                ..
            } => {
                let (x, y) = to_canvas(*center, height);
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: f64::from(*radius),
                    color: terminal_color(*color),
                });
            }
        }
    }
}

fn draw_segment(ctx: &mut CanvasContext, from: Point, to: Point, color: Rgb, height: f64) {
    let (x1, y1) = to_canvas(from, height);
    let (x2, y2) = to_canvas(to, height);
    ctx.draw(&CanvasLine::new(x1, y1, x2, y2, terminal_color(color)));
}

fn search_prompt(regex: bool) -> String {
    let mode = if regex { "regex" } else { "text" };
    format!("Search ({mode}): type, Tab toggle regex, Enter apply, Esc cancel")
}

fn build_commit_line(commit: &CommitRecord) -> Line<'static> {
    let meta = &commit.meta;
    let refs = crate::decoration::label(&meta.refs);
    let refs = if refs.is_empty() {
        refs
    } else {
        format!("  [{}]", sanitize_terminal_text(&refs))
    };
    let subject = if meta.subject.trim().is_empty() {
        "(no subject)".to_string()
    } else {
        sanitize_terminal_text(&meta.subject)
    };
    let is_merge = commit.is_merge();

    let mut spans = vec![
        Span::styled(
            format!("{:7}", sanitize_terminal_text(commit.display_hash())),
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
    ];
    if is_merge {
        spans.push(Span::styled(
            "merge ",
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::styled(
        subject,
        Style::default().fg(Color::White).add_modifier(if is_merge {
            Modifier::BOLD
        } else {
            Modifier::empty()
        }),
    ));
    spans.push(Span::styled(
        refs,
        Style::default()
            .fg(Color::LightGreen)
            .add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(
        format!("  · {}", sanitize_terminal_text(&meta.author_name)),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

fn sanitize_terminal_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_escape = false;
    let mut in_csi = false;

    for ch in input.chars() {
        if in_escape {
            if ch == '[' && !in_csi {
                in_csi = true;
                continue;
            }
            if !in_csi || ('@'..='~').contains(&ch) {
                in_escape = false;
                in_csi = false;
            }
            continue;
        }
        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }
        if ch == '\t' {
            out.push_str("    ");
            continue;
        }
        if ch.is_control() {
            continue;
        }
        out.push(ch);
    }
    out
}

fn inner_block_area(area: Rect) -> Option<Rect> {
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    (inner.width > 0 && inner.height > 0).then_some(inner)
}

/// `(start, end, selected_local)` of a `visible_height` window over `total`
/// rows that keeps `selected` in view, moving as little as possible from
/// `current_offset`.
fn visible_window(
    total: usize,
    selected: usize,
    current_offset: usize,
    visible_height: usize,
) -> (usize, usize, usize) {
    if total == 0 || visible_height == 0 {
        return (0, 0, 0);
    }

    let selected = min(selected, total.saturating_sub(1));
    let mut start = min(current_offset, total.saturating_sub(1));
    if selected < start {
        start = selected;
    }
    let window_last = start.saturating_add(visible_height.saturating_sub(1));
    if selected > window_last {
        start = selected.saturating_sub(visible_height.saturating_sub(1));
    }
    let end = min(start.saturating_add(visible_height), total);
    let selected_local = selected.saturating_sub(start);
    (start, end, selected_local)
}

fn setup_terminal() -> Result<Terminal<ratatui::backend::CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

fn restore_terminal(
    mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>,
) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal
        .show_cursor()
        .context("failed to restore cursor visibility")?;
    Ok(())
}

fn point_in_rect(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x
        && x < area.x.saturating_add(area.width)
        && y >= area.y
        && y < area.y.saturating_add(area.height)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use commitgraph_core::render::Point;
    use commitgraph_core::{
        CommitRecord, GraphRenderer, RecordingSurface, RenderConfig, RowContainer, compute_layout,
    };
    use ratatui::layout::Rect;

    use super::{
        TerminalRows, cell_to_surface, lane_pane_width, sanitize_terminal_text,
        terminal_render_config, to_canvas, visible_window,
    };

    fn rows(row_count: usize, visible_rows: usize) -> TerminalRows {
        let mut rows = TerminalRows::default();
        rows.set_visible_rows(visible_rows);
        rows.set_row_count(row_count);
        rows
    }

    #[test]
    fn terminal_rows_scroll_by_whole_rows() {
        let mut rows = rows(100, 10);
        rows.set_scroll_top(4.0 * 12.4);
        assert_eq!(rows.offset(), 12);
        assert_eq!(rows.scroll_top(), 48.0);
        rows.set_scroll_top(1.0e6);
        assert_eq!(rows.offset(), 90);
        assert!(!rows.set_offset(500));
        rows.set_row_count(5);
        assert_eq!(rows.offset(), 0);
        assert_eq!(rows.viewport_height(), 40.0);
        assert!(rows.row_bounds(5).is_none());
    }

    #[test]
    fn cells_map_to_dot_centers() {
        let inner = Rect::new(3, 2, 10, 10);
        assert_eq!(cell_to_surface(inner, 3, 2), Point::new(1.0, 2.0));
        assert_eq!(cell_to_surface(inner, 5, 4), Point::new(5.0, 10.0));
        assert_eq!(to_canvas(Point::new(5.0, 10.0), 40.0), (5.0, 30.0));
    }

    #[test]
    fn terminal_config_is_valid() {
        let config = terminal_render_config(&RenderConfig::default());
        config.validate().expect("terminal geometry must validate");
        assert_eq!(config.palette, RenderConfig::default().palette);
        assert_eq!(lane_pane_width(12.0), 8);
        assert_eq!(lane_pane_width(13.0), 9);
    }

    #[test]
    fn pointer_on_cell_hits_row_node() {
        let commits = [
            CommitRecord::new("b", ["a"]),
            CommitRecord::new("a", Vec::<String>::new()),
        ];
        let mut renderer = GraphRenderer::new(
            terminal_render_config(&RenderConfig::default()),
            rows(2, 10),
            RecordingSurface::new(),
        );
        renderer.set_layout(Arc::new(compute_layout(&commits)));

        let inner = Rect::new(0, 0, 8, 10);
        let hit = renderer.node_at(
            cell_to_surface(inner, 1, 1).x,
            cell_to_surface(inner, 1, 1).y,
        );
        assert_eq!(hit.map(|h| h.hash), Some("a".to_string()));
        assert!(
            renderer
                .node_at(
                    cell_to_surface(inner, 1, 5).x,
                    cell_to_surface(inner, 1, 5).y
                )
                .is_none()
        );
    }

    #[test]
    fn visible_window_follows_selection() {
        assert_eq!(visible_window(0, 0, 0, 10), (0, 0, 0));
        assert_eq!(visible_window(100, 5, 0, 10), (0, 10, 5));
        assert_eq!(visible_window(100, 25, 0, 10), (16, 26, 9));
        assert_eq!(visible_window(100, 3, 16, 10), (3, 13, 0));
    }

    #[test]
    fn strips_escape_sequences() {
        assert_eq!(
            sanitize_terminal_text("\u{1b}[31mred\u{1b}[0m\ttab"),
            "red    tab"
        );
    }
}
