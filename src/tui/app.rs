use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::{debug, error, info};

use crate::app::AppState;
use crate::error::TuiError;
use crate::map::{HoverState, MapView, Notice, HIGHLIGHT_FILL};
use crate::session::SessionSnapshot;
use crate::sync::{Pin, PinBackend, PinId};

use super::widgets::{notice, popup, world_map};

/// Two clicks on the same cell within this window make a double click
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Cells moved per pan key press
const PAN_STEP_X: f64 = 4.0;
const PAN_STEP_Y: f64 = 2.0;

const ZOOM_STEP: f64 = 0.5;
const SCROLL_ZOOM_STEP: f64 = 0.25;

/// What a key press asks the map to do
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Quit,
    Pan(f64, f64),
    Zoom(f64),
    PinCenter,
    CyclePins,
    Dismiss,
    Delete,
    Follow,
    Search,
    Reload,
}

fn key_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Left | KeyCode::Char('h') => Action::Pan(-PAN_STEP_X, 0.0),
        KeyCode::Right | KeyCode::Char('l') => Action::Pan(PAN_STEP_X, 0.0),
        KeyCode::Up | KeyCode::Char('k') => Action::Pan(0.0, -PAN_STEP_Y),
        KeyCode::Down | KeyCode::Char('j') => Action::Pan(0.0, PAN_STEP_Y),
        KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(ZOOM_STEP),
        KeyCode::Char('-') => Action::Zoom(-ZOOM_STEP),
        KeyCode::Enter => Action::PinCenter,
        KeyCode::Tab => Action::CyclePins,
        KeyCode::Esc => Action::Dismiss,
        KeyCode::Char('x') => Action::Delete,
        KeyCode::Char('o') => Action::Follow,
        KeyCode::Char('/') => Action::Search,
        KeyCode::Char('r') => Action::Reload,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, PartialEq)]
enum InputMode {
    Map,
    Search(String),
}

/// Turns left-button presses into single or double clicks
#[derive(Debug, Default)]
struct ClickTracker {
    last: Option<(Instant, u16, u16)>,
}

impl ClickTracker {
    /// Record a press; true when it completes a double click
    fn register(&mut self, at: Instant, col: u16, row: u16) -> bool {
        match self.last.take() {
            Some((prev, c, r))
                if c == col && r == row && at.duration_since(prev) <= DOUBLE_CLICK_WINDOW =>
            {
                true
            }
            _ => {
                self.last = Some((at, col, row));
                false
            }
        }
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

/// Map-relative cell of a terminal position, if it is on the map
fn map_cell(area: Rect, column: u16, row: u16) -> Option<(u16, u16)> {
    let inside = column >= area.x
        && column < area.x + area.width
        && row >= area.y
        && row < area.y + area.height;
    inside.then(|| (column - area.x, row - area.y))
}

/// Pin after `current` in list order, wrapping around
fn next_pin(pins: &[Pin], current: Option<PinId>) -> Option<PinId> {
    let next = current
        .and_then(|id| pins.iter().position(|pin| pin.id == id))
        .map_or(0, |index| (index + 1) % pins.len());
    pins.get(next).map(|pin| pin.id)
}

/// TUI application state
pub struct TuiApp {
    state: Arc<AppState>,
    terminal: Terminal<CrosstermBackend<Stdout>>,

    // Where the map was last drawn, for mouse hit testing
    map_area: Rect,

    input: InputMode,
    clicks: ClickTracker,
    drag_from: Option<(u16, u16)>,
    hover: HoverState,
    hovered_pin: Option<PinId>,
}

impl TuiApp {
    /// Create a new TUI application
    pub fn new(state: Arc<AppState>) -> Result<Self, TuiError> {
        // Set up terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state,
            terminal,
            map_area: Rect::default(),
            input: InputMode::Map,
            clicks: ClickTracker::default(),
            drag_from: None,
            hover: HoverState::default(),
            hovered_pin: None,
        })
    }

    /// Restore terminal state
    fn restore_terminal(&mut self) -> Result<(), TuiError> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    /// Draw the TUI
    pub fn draw<B: PinBackend>(&mut self, view: &mut MapView<B>) -> Result<(), TuiError> {
        let mut map_area = self.map_area;
        let input = &self.input;
        let hover = self.hover;
        let hovered_pin = self.hovered_pin;
        let shown: &MapView<B> = view;

        self.terminal.draw(|frame| {
            let area = frame.area();

            // Main layout: header, map, footer
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(6),    // Map
                    Constraint::Length(3), // Footer
                ])
                .split(area);

            render_header(frame, chunks[0], shown.is_signed_in(), shown.username());
            map_area = world_map::render(frame, chunks[1], shown, hover, hovered_pin);

            if let Some(selection) = shown.selection() {
                let dataset_name = selection
                    .country
                    .as_ref()
                    .and_then(|code| shown.geocoder().name(code));
                popup::render(
                    frame,
                    map_area,
                    selection,
                    shown.affordance().as_ref(),
                    dataset_name,
                );
            }

            render_footer(frame, chunks[2], input, shown.pins().pending_requests());

            if let Some(notice) = shown.notice() {
                notice::render(frame, area, notice);
            }
        })?;

        self.map_area = map_area;

        // Keep the camera's cell grid in step with the terminal
        let viewport = *view.viewport();
        if viewport.width != map_area.width || viewport.height != map_area.height {
            debug!(width = map_area.width, height = map_area.height, "Map resized");
            view.on_viewport_change(viewport.resized(map_area.width, map_area.height));
        }

        Ok(())
    }

    /// Handle keyboard and mouse input (non-blocking)
    pub fn handle_input<B: PinBackend>(&mut self, view: &mut MapView<B>) -> Result<bool, TuiError> {
        // Poll for events with a short timeout
        if !event::poll(Duration::from_millis(50))? {
            return Ok(false);
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(self.on_key(key, view)),
            Event::Mouse(mouse) if view.notice().is_none() => {
                self.on_mouse(mouse, view);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn on_key<B: PinBackend>(&mut self, key: KeyEvent, view: &mut MapView<B>) -> bool {
        // Notices block everything else until acknowledged
        if view.notice().is_some() {
            match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                    view.take_notice();
                }
                KeyCode::Char('q') => return self.quit(),
                _ => {}
            }
            return false;
        }

        if let InputMode::Search(query) = &mut self.input {
            match key.code {
                KeyCode::Char(c) => query.push(c),
                KeyCode::Backspace => {
                    query.pop();
                }
                KeyCode::Enter => {
                    let query = std::mem::take(query);
                    self.input = InputMode::Map;
                    if !query.trim().is_empty() {
                        view.search(&query);
                    }
                }
                KeyCode::Esc => self.input = InputMode::Map,
                _ => {}
            }
            return false;
        }

        let Some(action) = key_action(key.code) else {
            return false;
        };

        let viewport = *view.viewport();
        match action {
            Action::Quit => return self.quit(),
            Action::Pan(dx, dy) => view.on_viewport_change(viewport.panned(dx, dy)),
            Action::Zoom(delta) => {
                view.on_viewport_change(viewport.zoomed(delta, view.min_zoom()))
            }
            Action::PinCenter => {
                if let Err(e) = view.on_double_click(viewport.longitude, viewport.latitude) {
                    debug!(error = %e, "Center pin rejected");
                }
            }
            Action::CyclePins => {
                let current = view.selection().and_then(|s| s.pin_id);
                if let Some(id) = next_pin(view.pins().pins(), current) {
                    if let Err(e) = view.on_marker_click(id) {
                        debug!(id, error = %e, "Could not select pin");
                    }
                }
            }
            Action::Dismiss => view.dismiss_popup(),
            Action::Delete => {
                if let Err(e) = view.delete_selected() {
                    debug!(error = %e, "Nothing to delete");
                }
            }
            Action::Follow => {
                if let Some(route) = view.follow_affordance() {
                    self.state.navigate(route);
                    return true;
                }
            }
            Action::Search => self.input = InputMode::Search(String::new()),
            Action::Reload => self.reload(view),
        }
        false
    }

    fn on_mouse<B: PinBackend>(&mut self, mouse: MouseEvent, view: &mut MapView<B>) {
        let cell = map_cell(self.map_area, mouse.column, mouse.row);
        let viewport = *view.viewport();

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some((col, row)) = cell else {
                    return;
                };
                self.drag_from = Some((mouse.column, mouse.row));

                if self.clicks.register(Instant::now(), col, row) {
                    let (lon, lat) = viewport.screen_to_geo(col, row);
                    if let Err(e) = view.on_double_click(lon, lat) {
                        debug!(error = %e, "Double-click pin rejected");
                    }
                } else if let Some(id) = view.marker_at(col, row) {
                    if let Err(e) = view.on_marker_click(id) {
                        debug!(id, error = %e, "Could not select marker");
                    }
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                if let Some((col, row)) = cell {
                    let (lon, lat) = viewport.screen_to_geo(col, row);
                    view.select_location(lon, lat);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((from_col, from_row)) = self.drag_from {
                    let dx = f64::from(mouse.column) - f64::from(from_col);
                    let dy = f64::from(mouse.row) - f64::from(from_row);
                    view.on_viewport_change(viewport.panned(-dx, -dy));
                    self.drag_from = Some((mouse.column, mouse.row));
                    self.hover.is_dragging = true;
                    self.clicks.reset();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_from = None;
                self.hover.is_dragging = false;
            }
            MouseEventKind::ScrollUp => {
                view.on_viewport_change(viewport.zoomed(SCROLL_ZOOM_STEP, view.min_zoom()))
            }
            MouseEventKind::ScrollDown => {
                view.on_viewport_change(viewport.zoomed(-SCROLL_ZOOM_STEP, view.min_zoom()))
            }
            MouseEventKind::Moved => {
                self.hovered_pin = cell.and_then(|(col, row)| view.marker_at(col, row));
                self.hover.is_hovering = self.hovered_pin.is_some();
            }
            _ => {}
        }
    }

    /// Re-read the session snapshot from disk
    fn reload<B: PinBackend>(&mut self, view: &mut MapView<B>) {
        let path = &self.state.settings.session_path;
        match SessionSnapshot::load(path) {
            Ok(snapshot) => {
                info!(path = %path.display(), "Session snapshot reloaded");
                view.reload_snapshot(snapshot);
            }
            Err(e) => {
                error!(error = %e, "Failed to reload session snapshot");
                view.push_notice(Notice::error(format!("Could not reload session: {}", e)));
            }
        }
    }

    fn quit(&mut self) -> bool {
        info!("Quit requested");
        self.state.quit();
        true
    }

    /// Run cleanup on drop
    pub fn cleanup(&mut self) {
        if let Err(e) = self.restore_terminal() {
            error!(error = %e, "Failed to restore terminal");
        }
    }
}

impl Drop for TuiApp {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Render the header bar
fn render_header(frame: &mut Frame, area: Rect, signed_in: bool, username: Option<&str>) {
    let (r, g, b) = HIGHLIGHT_FILL;
    let title = Line::from(vec![
        Span::styled(" pinmap ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("| "),
        Span::styled(
            "Countries you have posted on are highlighted",
            Style::default().fg(Color::Rgb(r, g, b)),
        ),
    ]);

    let hint = if signed_in {
        let mut spans = vec![Span::styled(
            "Double click to pin countries you'd like to visit",
            Style::default().fg(Color::Gray),
        )];
        if let Some(name) = username {
            spans.push(Span::styled(
                format!("  ({})", name),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    } else {
        Line::from(Span::styled(
            "Sign in to pin countries",
            Style::default().fg(Color::Yellow),
        ))
    };

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(vec![title, hint]).block(block).centered();
    frame.render_widget(paragraph, area);
}

/// Render the footer with controls or the search box
fn render_footer(frame: &mut Frame, area: Rect, input: &InputMode, pending: usize) {
    let mut spans = match input {
        InputMode::Search(query) => vec![
            Span::styled("Search country: ", Style::default().fg(Color::Cyan)),
            Span::styled(format!("{}_", query), Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(":go  "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(":cancel"),
        ],
        InputMode::Map => {
            let keys = [
                ("q", ":quit  "),
                ("dbl-click/Enter", ":pin  "),
                ("Tab", ":next pin  "),
                ("x", ":delete  "),
                ("o", ":trips  "),
                ("/", ":search  "),
                ("r", ":reload  "),
                ("+/-", ":zoom"),
            ];
            keys.iter()
                .flat_map(|(key, label)| {
                    [
                        Span::styled(*key, Style::default().fg(Color::Yellow)),
                        Span::raw(*label),
                    ]
                })
                .collect()
        }
    };

    if pending > 0 {
        spans.push(Span::styled(
            format!("  [{} pending]", pending),
            Style::default().fg(Color::Magenta),
        ));
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(Line::from(spans)).block(block).centered();
    frame.render_widget(paragraph, area);
}
