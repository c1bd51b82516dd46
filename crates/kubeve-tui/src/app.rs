//! Root application state machine: key handling, table selection, overlays
//! and frame rendering. All mutable UI state lives here and is only touched
//! from the update loop.

use kubeve_core::config::{self, Config, Theme};
use kubeve_core::{Event, EventType, Scope, WatchGeneration, VERSION};
use kubeve_kube::{ClusterInfo, DrillDown, DrillDownTarget, TransportError};
use kubeve_render::input::{InputEvent, Key, KeyEvent, MouseWheelDirection};
use kubeve_render::render::{FrameSize, Rect, RenderFrame, TextRole};
use kubeve_render::style::{StyleToken, ThemeSpec};
use kubeve_render::widgets::{fit, BorderStyle, TextAlign};

use crate::command_palette::{
    best_jump, jump_targets, CommandPalette, PaletteAction, PaletteCommand,
};
use crate::details::{self, DetailsOverlay};
use crate::layout::{column_widths, Column, ColumnSet, SEPARATOR};
use crate::namespace_picker::{resolve_namespace, NamespacePicker};
use crate::recent_scopes::RecentScopes;
use crate::view_model::ViewModel;

const HEADER_HEIGHT: usize = 5;
const FOOTER_HEIGHT: usize = 1;
const WHEEL_STEP: isize = 3;

const LOGO: [&str; 2] = [
    "█▄▀ █ █ █▄▄ █▀▀ █ █ █▀▀",
    "█ █ █▄█ █▄█ ██▄ ▀▄▀ ██▄",
];

const KEY_HINTS: [&str; 4] = [
    "<:> Palette   </> Filter",
    "<G> Aggregate <w> Wrap",
    "<^S> Follow   <^N> Namespace",
    "<T/N/S/A/R> Columns",
];

// ---------------------------------------------------------------------------
// UiMode / Command
// ---------------------------------------------------------------------------

/// Which interaction mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Main,
    Filter,
    Palette,
    Namespaces,
    Details,
}

/// Side effects requested by [`App::update`]; the session performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    /// Replace the running subscription.
    SetScope(Scope),
    FetchDrillDown {
        request_id: u64,
        target: DrillDownTarget,
    },
    CancelDrillDown {
        request_id: u64,
    },
    /// Write the selected theme back to the config file.
    PersistTheme(Theme),
}

impl Command {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Transient title note, cleared by the next key in the main view.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    NoMatch(String),
    NamespaceNotFound(String),
    UnknownTheme(String),
    UnknownColumn(String),
    Themes,
}

impl Notice {
    fn text(&self) -> String {
        match self {
            Self::NoMatch(query) => format!("(no match for: {query})"),
            Self::NamespaceNotFound(name) => format!("(namespace not found: {name})"),
            Self::UnknownTheme(name) => format!("(unknown theme: {name})"),
            Self::UnknownColumn(key) => format!("(unknown column: {key})"),
            Self::Themes => format!("(themes: {})", config::theme_names().join(", ")),
        }
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Warning events are highlighted; everything else uses the base text color.
#[must_use]
pub fn status_role(event_type: EventType) -> TextRole {
    match event_type {
        EventType::Warning => TextRole::Warning,
        EventType::Normal => TextRole::Primary,
    }
}

/// Color for a reason: lifecycle successes green, image/start progress blue,
/// failures red.
#[must_use]
pub fn action_role(action: &str) -> TextRole {
    match action {
        "Created" | "SuccessfulCreate" | "Completed" => TextRole::Success,
        "Started" | "Pulled" | "Pulling" => TextRole::Info,
        "Killing" | "BackOff" | "Unhealthy" | "FailedToRetrieveImagePullSecret" => {
            TextRole::Danger
        }
        _ => TextRole::Primary,
    }
}

fn theme_spec(theme: &Theme) -> ThemeSpec {
    let resolved = config::resolve_theme(theme);
    ThemeSpec::from_hex(&resolved.background_color, &resolved.text_color)
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    view: ViewModel,
    mode: UiMode,
    width: usize,
    height: usize,
    selected: usize,
    scroll_top: usize,
    autoscroll: bool,
    filter_input: String,
    palette: CommandPalette,
    picker: NamespacePicker,
    details: Option<DetailsOverlay>,
    next_request_id: u64,
    recent: RecentScopes,
    namespaces: Vec<String>,
    cluster: ClusterInfo,
    theme: Theme,
    theme_spec: ThemeSpec,
    show_logo: bool,
    watch_error: Option<String>,
    notice: Option<Notice>,
    quitting: bool,
}

impl App {
    #[must_use]
    pub fn new(cluster: ClusterInfo, config: &Config) -> Self {
        let theme = config::resolve_theme(&config.theme);
        Self {
            view: ViewModel::new(Scope::All),
            mode: UiMode::Main,
            width: 120,
            height: 40,
            selected: 0,
            scroll_top: 0,
            autoscroll: true,
            filter_input: String::new(),
            palette: CommandPalette::new(),
            picker: NamespacePicker::new(),
            details: None,
            next_request_id: 0,
            recent: RecentScopes::new(),
            namespaces: Vec::new(),
            cluster,
            theme_spec: theme_spec(&theme),
            theme,
            show_logo: !config.flags.disable_logo,
            watch_error: None,
            notice: None,
            quitting: false,
        }
    }

    // -- session hooks ---------------------------------------------------

    /// Rebinds the view to a freshly started subscription.
    pub fn scope_started(&mut self, scope: Scope, generation: WatchGeneration) {
        let mut columns = self.view.columns();
        columns.set_visible(Column::Namespace, scope.is_all());
        self.recent.record(&scope);
        self.view.reset(scope, generation);
        self.view.set_columns(columns);
        self.watch_error = None;
        self.selected = 0;
        self.scroll_top = 0;
    }

    /// Records one event from the current subscription.
    pub fn on_event(&mut self, event: Event) {
        let changed = self.view.ingest(event);
        if changed && self.autoscroll {
            if self.view.aggregate_enabled() {
                self.select_row(0);
            } else {
                self.select_last();
            }
        } else {
            self.clamp_selection();
        }
    }

    pub fn on_watch_failed(&mut self, err: &TransportError) {
        self.watch_error = Some(err.to_string());
    }

    /// Installs a drill-down result if its overlay is still open.
    pub fn on_drilldown(&mut self, request_id: u64, drilldown: DrillDown) -> bool {
        self.details
            .as_mut()
            .is_some_and(|overlay| overlay.apply(request_id, drilldown))
    }

    pub fn set_namespaces(&mut self, namespaces: Vec<String>) {
        self.namespaces = namespaces;
    }

    // -- accessors -------------------------------------------------------

    #[must_use]
    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    #[must_use]
    pub fn mode(&self) -> UiMode {
        self.mode
    }

    #[must_use]
    pub fn selected_row(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn autoscroll(&self) -> bool {
        self.autoscroll
    }

    #[must_use]
    pub fn recent_scopes(&self) -> &RecentScopes {
        &self.recent
    }

    #[must_use]
    pub fn details(&self) -> Option<&DetailsOverlay> {
        self.details.as_ref()
    }

    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub fn watch_error(&self) -> Option<&str> {
        self.watch_error.as_deref()
    }

    #[must_use]
    pub fn quitting(&self) -> bool {
        self.quitting
    }

    // -- update ----------------------------------------------------------

    pub fn update(&mut self, event: InputEvent) -> Command {
        match event {
            InputEvent::Resize(size) => {
                self.width = size.width;
                self.height = size.height;
                self.view.set_width(Some(self.table_width()));
                self.clamp_selection();
                Command::None
            }
            InputEvent::Mouse(mouse) => {
                match (self.mode, mouse.wheel) {
                    (UiMode::Main, Some(MouseWheelDirection::Up)) => {
                        self.move_selection(-WHEEL_STEP);
                    }
                    (UiMode::Main, Some(MouseWheelDirection::Down)) => {
                        self.move_selection(WHEEL_STEP);
                    }
                    (UiMode::Details, Some(MouseWheelDirection::Up)) => {
                        self.scroll_details(-WHEEL_STEP);
                    }
                    (UiMode::Details, Some(MouseWheelDirection::Down)) => {
                        self.scroll_details(WHEEL_STEP);
                    }
                    _ => {}
                }
                Command::None
            }
            InputEvent::Tick => Command::None,
            InputEvent::Key(key) => {
                if key.modifiers.ctrl && key.key == Key::Char('c') {
                    return self.quit();
                }
                match self.mode {
                    UiMode::Main => self.update_main_mode(key),
                    UiMode::Filter => self.update_filter_mode(key),
                    UiMode::Palette => self.update_palette_mode(key),
                    UiMode::Namespaces => self.update_namespace_mode(key),
                    UiMode::Details => self.update_details_mode(key),
                }
            }
        }
    }

    fn quit(&mut self) -> Command {
        self.quitting = true;
        self.details = None;
        Command::Quit
    }

    fn update_main_mode(&mut self, key: KeyEvent) -> Command {
        self.notice = None;
        if key.modifiers.ctrl {
            return match key.key {
                Key::Char('s') => {
                    self.autoscroll = !self.autoscroll;
                    Command::None
                }
                Key::Char('b') => {
                    self.select_last();
                    Command::None
                }
                Key::Char('n') => {
                    self.open_namespace_picker();
                    Command::None
                }
                _ => Command::None,
            };
        }

        match key.key {
            Key::Char('q') => self.quit(),
            Key::Char(':') => {
                self.palette.open(jump_targets(&self.view));
                self.mode = UiMode::Palette;
                Command::None
            }
            Key::Char('/') => {
                self.filter_input.clear();
                self.mode = UiMode::Filter;
                Command::None
            }
            Key::Char('G') => {
                self.toggle_aggregate();
                Command::None
            }
            Key::Char('w') => {
                self.toggle_wrap();
                Command::None
            }
            Key::Char(ch @ '0'..='3') => {
                let slot = ch.to_digit(10).unwrap_or(0) as usize;
                self.recent
                    .slot(slot)
                    .map_or(Command::None, Command::SetScope)
            }
            Key::Char(ch) => {
                if let Some(column) = Column::from_toggle_key(ch) {
                    self.view.toggle_column(column);
                    self.clamp_selection();
                }
                match ch {
                    'k' => self.move_selection(-1),
                    'j' => self.move_selection(1),
                    'g' => self.select_row(0),
                    'x' => self.watch_error = None,
                    _ => {}
                }
                Command::None
            }
            Key::Up => {
                self.move_selection(-1);
                Command::None
            }
            Key::Down => {
                self.move_selection(1);
                Command::None
            }
            Key::PageUp => {
                self.move_selection(-self.page_step());
                Command::None
            }
            Key::PageDown => {
                self.move_selection(self.page_step());
                Command::None
            }
            Key::Home => {
                self.select_row(0);
                Command::None
            }
            Key::End => {
                self.select_last();
                Command::None
            }
            Key::Escape => {
                self.watch_error = None;
                Command::None
            }
            Key::Enter => self.open_details(),
            _ => Command::None,
        }
    }

    fn update_filter_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Escape => self.mode = UiMode::Main,
            Key::Enter => {
                let filter = self.filter_input.clone();
                self.view.set_filter(&filter);
                self.clamp_selection();
                self.mode = UiMode::Main;
            }
            Key::Backspace => {
                self.filter_input.pop();
            }
            Key::Char(ch) if !key.modifiers.ctrl => self.filter_input.push(ch),
            _ => {}
        }
        Command::None
    }

    fn update_palette_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Escape => {
                self.mode = UiMode::Main;
                Command::None
            }
            Key::Enter => {
                self.mode = UiMode::Main;
                match self.palette.accept() {
                    Some(PaletteAction::Run { command, argument }) => {
                        self.run_command(command, &argument)
                    }
                    Some(PaletteAction::Jump(key)) => {
                        if let Some(row) = self.view.row_of(&key) {
                            self.select_row(row);
                        }
                        Command::None
                    }
                    None => Command::None,
                }
            }
            Key::Up => {
                self.palette.move_selection(-1);
                Command::None
            }
            Key::Down | Key::Tab => {
                self.palette.move_selection(1);
                Command::None
            }
            Key::Backspace => {
                self.palette.pop_char();
                Command::None
            }
            Key::Char(ch) if !key.modifiers.ctrl => {
                self.palette.push_char(ch);
                Command::None
            }
            _ => Command::None,
        }
    }

    fn update_namespace_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Escape => {
                self.mode = UiMode::Main;
                Command::None
            }
            Key::Enter => {
                self.mode = UiMode::Main;
                self.picker.accept().map_or(Command::None, Command::SetScope)
            }
            Key::Up => {
                self.picker.move_selection(-1);
                Command::None
            }
            Key::Down | Key::Tab => {
                self.picker.move_selection(1);
                Command::None
            }
            Key::Backspace => {
                self.picker.pop_char();
                Command::None
            }
            Key::Char(ch) if !key.modifiers.ctrl => {
                self.picker.push_char(ch);
                Command::None
            }
            _ => Command::None,
        }
    }

    fn update_details_mode(&mut self, key: KeyEvent) -> Command {
        match key.key {
            Key::Escape | Key::Char('q') => self.close_details(),
            Key::Up | Key::Char('k') => {
                self.scroll_details(-1);
                Command::None
            }
            Key::Down | Key::Char('j') => {
                self.scroll_details(1);
                Command::None
            }
            Key::PageUp => {
                self.scroll_details(-self.page_step());
                Command::None
            }
            Key::PageDown => {
                self.scroll_details(self.page_step());
                Command::None
            }
            _ => Command::None,
        }
    }

    // -- commands --------------------------------------------------------

    fn run_command(&mut self, command: PaletteCommand, argument: &str) -> Command {
        let argument = argument.trim();
        tracing::debug!(?command, argument, "palette command");
        match command {
            PaletteCommand::Namespace => {
                if argument.is_empty() {
                    self.open_namespace_picker();
                    return Command::None;
                }
                match resolve_namespace(argument, &self.namespaces) {
                    Some(scope) => Command::SetScope(scope),
                    None => {
                        self.notice = Some(Notice::NamespaceNotFound(argument.to_string()));
                        Command::None
                    }
                }
            }
            PaletteCommand::AllNamespaces => Command::SetScope(Scope::All),
            PaletteCommand::Filter => {
                self.view.set_filter(argument);
                self.clamp_selection();
                Command::None
            }
            PaletteCommand::ClearFilter => {
                self.view.set_filter("");
                self.clamp_selection();
                Command::None
            }
            PaletteCommand::Jump => {
                match best_jump(argument, &jump_targets(&self.view)) {
                    Some(row) => self.select_row(row),
                    None => self.notice = Some(Notice::NoMatch(argument.to_string())),
                }
                Command::None
            }
            PaletteCommand::Wrap => {
                self.toggle_wrap();
                Command::None
            }
            PaletteCommand::Aggregate => {
                self.toggle_aggregate();
                Command::None
            }
            PaletteCommand::Autoscroll => {
                self.autoscroll = !self.autoscroll;
                Command::None
            }
            PaletteCommand::Theme => {
                if argument.is_empty() {
                    self.notice = Some(Notice::Themes);
                    return Command::None;
                }
                match config::theme_by_name(argument) {
                    Some(theme) => {
                        self.theme_spec = theme_spec(&theme);
                        self.theme = theme.clone();
                        Command::PersistTheme(theme)
                    }
                    None => {
                        self.notice = Some(Notice::UnknownTheme(argument.to_string()));
                        Command::None
                    }
                }
            }
            PaletteCommand::Columns => {
                if argument.is_empty() {
                    self.view.set_columns(ColumnSet::all());
                } else {
                    let column = argument
                        .chars()
                        .next()
                        .map(|ch| ch.to_ascii_uppercase())
                        .and_then(Column::from_toggle_key);
                    match column {
                        Some(column) if argument.chars().count() == 1 => {
                            self.view.toggle_column(column);
                        }
                        _ => self.notice = Some(Notice::UnknownColumn(argument.to_string())),
                    }
                }
                self.clamp_selection();
                Command::None
            }
            PaletteCommand::Quit => self.quit(),
        }
    }

    fn toggle_aggregate(&mut self) {
        let enabled = !self.view.aggregate_enabled();
        self.view.set_aggregate(enabled);
        self.select_row(0);
    }

    fn toggle_wrap(&mut self) {
        let enabled = !self.view.wrap_enabled();
        self.view.set_width(Some(self.table_width()));
        self.view.set_wrap(enabled);
        self.select_last();
    }

    fn open_namespace_picker(&mut self) {
        self.picker.open(self.namespaces.clone());
        self.mode = UiMode::Namespaces;
    }

    fn open_details(&mut self) -> Command {
        let Some(item) = self.view.item_for_row(self.selected) else {
            return Command::None;
        };
        self.next_request_id += 1;
        let overlay = DetailsOverlay::open(self.next_request_id, item);
        let command = match overlay.pending_target() {
            Some(target) => Command::FetchDrillDown {
                request_id: overlay.request_id(),
                target: target.clone(),
            },
            None => Command::None,
        };
        self.details = Some(overlay);
        self.mode = UiMode::Details;
        command
    }

    fn close_details(&mut self) -> Command {
        self.mode = UiMode::Main;
        match self.details.take() {
            Some(overlay) if overlay.is_loading() => Command::CancelDrillDown {
                request_id: overlay.request_id(),
            },
            _ => Command::None,
        }
    }

    fn scroll_details(&mut self, delta: isize) {
        let viewport = self.details_viewport();
        if let Some(overlay) = self.details.as_mut() {
            overlay.scroll_by(delta, viewport);
        }
    }

    // -- selection -------------------------------------------------------

    fn row_count(&self) -> usize {
        self.view.rows().len()
    }

    fn select_row(&mut self, row: usize) {
        self.selected = row.min(self.row_count().saturating_sub(1));
        self.ensure_visible();
    }

    fn select_last(&mut self) {
        self.select_row(self.row_count().saturating_sub(1));
    }

    fn move_selection(&mut self, delta: isize) {
        let next = self.selected.saturating_add_signed(delta);
        self.select_row(next);
    }

    fn clamp_selection(&mut self) {
        self.select_row(self.selected);
    }

    fn ensure_visible(&mut self) {
        let visible = self.table_body_height().max(1);
        if self.selected < self.scroll_top {
            self.scroll_top = self.selected;
        } else if self.selected >= self.scroll_top + visible {
            self.scroll_top = self.selected + 1 - visible;
        }
        let max_top = self.row_count().saturating_sub(visible);
        self.scroll_top = self.scroll_top.min(max_top);
    }

    fn page_step(&self) -> isize {
        isize::try_from(self.table_body_height().max(1)).unwrap_or(1)
    }

    // -- geometry --------------------------------------------------------

    fn table_rect(&self) -> Rect {
        Rect {
            x: 0,
            y: HEADER_HEIGHT,
            width: self.width,
            height: self.height.saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT),
        }
    }

    fn table_width(&self) -> usize {
        self.width.saturating_sub(2)
    }

    /// Data rows that fit below the column header.
    fn table_body_height(&self) -> usize {
        self.table_rect().height.saturating_sub(3)
    }

    fn overlay_rect(&self) -> Rect {
        self.table_rect().inset(2, 1)
    }

    fn details_viewport(&self) -> usize {
        self.overlay_rect().height.saturating_sub(2)
    }

    // -- title -----------------------------------------------------------

    /// Table title as styled segments.
    #[must_use]
    pub fn title_segments(&self) -> Vec<(String, TextRole)> {
        let mut segments = Vec::new();
        if !self.view.filter().is_empty() {
            segments.push((format!("[Filter: {}] ", self.view.filter()), TextRole::Warning));
        }
        if self.autoscroll {
            segments.push(("Autoscroll ✓".to_string(), TextRole::Success));
        } else {
            segments.push(("Autoscroll ✗".to_string(), TextRole::Danger));
        }
        if self.view.aggregate_enabled() {
            segments.push((" Aggregate".to_string(), TextRole::Info));
        } else {
            segments.push((" Raw".to_string(), TextRole::Muted));
        }
        if self.view.wrap_enabled() {
            segments.push((" Wrap".to_string(), TextRole::Info));
        } else {
            segments.push((" No Wrap".to_string(), TextRole::Muted));
        }
        if let Some(err) = &self.watch_error {
            segments.push((format!(" (watch error: {err})"), TextRole::Danger));
        }
        if let Some(notice) = &self.notice {
            segments.push((format!(" {}", notice.text()), TextRole::Danger));
        }
        segments
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.title_segments()
            .into_iter()
            .map(|(text, _)| text)
            .collect()
    }

    // -- render ----------------------------------------------------------

    #[must_use]
    pub fn render(&self) -> RenderFrame {
        let width = self.width.max(1);
        let height = self.height.max(1);
        let mut frame = RenderFrame::new(FrameSize { width, height }, self.theme_spec);
        if self.quitting {
            return frame;
        }
        frame.fill_bg(frame.area(), self.theme_spec.color(StyleToken::Background));

        self.render_header(&mut frame);
        self.render_table(&mut frame);
        self.render_footer(&mut frame);

        match self.mode {
            UiMode::Palette => {
                let lines = self.palette.render_lines(
                    self.overlay_rect().width.saturating_sub(2),
                    self.overlay_rect().height.saturating_sub(2),
                );
                self.render_list_overlay(&mut frame, "Command Palette", &lines);
            }
            UiMode::Namespaces => {
                let lines = self.picker.render_lines(
                    self.overlay_rect().width.saturating_sub(2),
                    self.overlay_rect().height.saturating_sub(2),
                );
                self.render_list_overlay(&mut frame, "Namespaces", &lines);
            }
            UiMode::Details => self.render_details(&mut frame),
            UiMode::Main | UiMode::Filter => {}
        }
        frame
    }

    fn render_header(&self, frame: &mut RenderFrame) {
        let info = [
            ("Cluster: ", self.cluster.cluster.clone()),
            ("Namespace: ", self.view.scope().label().to_string()),
            ("K8s Rev: ", self.cluster.server_version.clone()),
            ("Kubeve Rev: ", VERSION.to_string()),
        ];
        let mut info_width = 0;
        for (row, (label, value)) in info.iter().enumerate() {
            frame.draw_text(1, row, label, TextRole::Warning);
            frame.draw_text(1 + label.chars().count(), row, value, TextRole::Primary);
            info_width = info_width.max(label.chars().count() + value.chars().count());
        }

        let recent_x = 1 + info_width + 4;
        for (row, line) in self.recent.header_lines().iter().enumerate().take(HEADER_HEIGHT) {
            let (key, rest) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            frame.draw_text(recent_x, row, key, TextRole::Info);
            frame.draw_text(recent_x + key.chars().count() + 1, row, rest, TextRole::Primary);
        }

        let hints_x = recent_x + 24;
        for (row, hint) in KEY_HINTS.iter().enumerate() {
            frame.draw_text(hints_x, row, hint, TextRole::Muted);
        }

        if self.show_logo {
            let logo_width = LOGO[0].chars().count();
            let logo_x = self.width.saturating_sub(logo_width + 1);
            if logo_x > hints_x + 30 {
                for (row, line) in LOGO.iter().enumerate() {
                    frame.draw_text(logo_x, row + 1, line, TextRole::Accent);
                }
            }
        }
    }

    fn render_table(&self, frame: &mut RenderFrame) {
        let rect = self.table_rect();
        let border = self.theme_spec.color(StyleToken::Muted);
        let inner = frame.draw_panel(rect, "", BorderStyle::Rounded, border);
        if inner.height == 0 {
            return;
        }

        let mut x = rect.x + 2;
        frame.draw_text(x, rect.y, " ", TextRole::Primary);
        x += 1;
        for (text, role) in self.title_segments() {
            let room = (rect.x + rect.width).saturating_sub(x + 2);
            let clipped: String = text.chars().take(room).collect();
            frame.draw_text(x, rect.y, &clipped, role);
            x += clipped.chars().count();
        }
        if x + 2 < rect.x + rect.width {
            frame.draw_text(x, rect.y, " ", TextRole::Primary);
        }

        let columns = self.view.columns();
        let aggregate = self.view.aggregate_enabled();
        let widths = column_widths(&columns, inner.width);

        let mut cx = inner.x;
        for (index, (column, w)) in widths.iter().enumerate() {
            if index > 0 {
                frame.draw_text(cx, inner.y, SEPARATOR, TextRole::Muted);
                cx += SEPARATOR.chars().count();
            }
            let title = fit(column.title(aggregate), *w, TextAlign::Left);
            frame.draw_text(cx, inner.y, &title, TextRole::Accent);
            cx += w;
        }

        let body = self.table_body_height();
        let selection_bg = self.theme_spec.color(StyleToken::Selection);
        let visible_rows = self.view.rows().iter().skip(self.scroll_top).take(body);
        for (offset, row) in visible_rows.enumerate() {
            let y = inner.y + 1 + offset;
            let row_index = self.scroll_top + offset;
            let item = self.view.items().get(row.item);
            let mut cx = inner.x;
            for (index, (column, w)) in widths.iter().enumerate() {
                if index > 0 {
                    frame.draw_text(cx, y, SEPARATOR, TextRole::Muted);
                    cx += SEPARATOR.chars().count();
                }
                let text = row.cell(*column).unwrap_or_default();
                let role = match (column, item) {
                    (Column::Status, Some(item)) => status_role(item.event_type),
                    (Column::Action, _) => action_role(text),
                    (Column::Timestamp, _) => TextRole::Muted,
                    _ => TextRole::Primary,
                };
                frame.draw_text(cx, y, &fit(text, *w, TextAlign::Left), role);
                cx += w;
            }
            if row_index == self.selected && self.mode != UiMode::Details {
                frame.highlight_span(inner.x, y, inner.width, selection_bg);
            }
        }
    }

    fn render_footer(&self, frame: &mut RenderFrame) {
        let y = self.height.saturating_sub(FOOTER_HEIGHT);
        if self.mode == UiMode::Filter {
            frame.draw_text(1, y, "Filter: ", TextRole::Accent);
            frame.draw_text(9, y, &format!("{}█", self.filter_input), TextRole::Primary);
            return;
        }
        let scope = self.view.scope();
        let text = format!(
            "{} events │ {} rows │ {} │ Enter details  q quit",
            self.view.event_log().len(),
            self.view.rows().len(),
            scope.label(),
        );
        frame.draw_text(1, y, &text, TextRole::Muted);
    }

    fn render_list_overlay(&self, frame: &mut RenderFrame, title: &str, lines: &[String]) {
        let rect = self.overlay_rect();
        let border = self.theme_spec.color(StyleToken::Focus);
        let inner = frame.draw_panel(rect, title, BorderStyle::Rounded, border);
        for (idx, line) in lines.iter().enumerate() {
            let role = if line.starts_with('>') {
                TextRole::Focus
            } else if line.trim_start() == "No matches" {
                TextRole::Muted
            } else {
                TextRole::Primary
            };
            frame.draw_text_in_rect(inner, 0, idx, line, role);
        }
    }

    fn render_details(&self, frame: &mut RenderFrame) {
        let Some(overlay) = &self.details else {
            return;
        };
        let rect = self.overlay_rect();
        let border = self.theme_spec.color(StyleToken::Accent);
        let inner = frame.draw_panel(rect, details::TITLE, BorderStyle::Rounded, border);
        for (offset, line) in overlay
            .lines()
            .iter()
            .skip(overlay.scroll())
            .take(inner.height)
            .enumerate()
        {
            let mut x = 1;
            if let Some(label) = line.label {
                frame.draw_text_in_rect(inner, x, offset, label, TextRole::Info);
                x += label.chars().count();
            }
            frame.draw_text_in_rect(inner, x, offset, &line.text, line.role);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use kubeve_core::config::Config;
    use kubeve_core::{Event, EventType, ResourceRef, Scope, WatchGeneration};
    use kubeve_kube::{ClusterInfo, DrillDown, TransportError};
    use kubeve_render::input::{InputEvent, Key, KeyEvent, ResizeEvent};
    use kubeve_render::render::TextRole;
    use kubeve_render::snapshot::assert_frame_contains;

    use super::{action_role, App, Command, UiMode};
    use crate::layout::Column;

    fn cluster() -> ClusterInfo {
        ClusterInfo {
            context: "kind-dev".into(),
            cluster: "kind-dev".into(),
            server_version: "v1.30.0".into(),
            default_namespace: "default".into(),
        }
    }

    fn app() -> App {
        let mut app = App::new(cluster(), &Config::default());
        app.update(InputEvent::Resize(ResizeEvent {
            width: 160,
            height: 30,
        }));
        app.scope_started(Scope::All, WatchGeneration::default().next());
        app
    }

    fn event(ns: &str, name: &str, kind: EventType, reason: &str, secs: i64) -> Event {
        Event {
            timestamp: Utc.timestamp_opt(1_714_564_800 + secs, 0).single(),
            resource: ResourceRef::new("Pod", name),
            event_type: kind,
            reason: reason.into(),
            namespace: ns.into(),
            message: format!("{reason} for {name}"),
        }
    }

    fn key(ch: char) -> InputEvent {
        InputEvent::Key(KeyEvent::plain(Key::Char(ch)))
    }

    fn special(k: Key) -> InputEvent {
        InputEvent::Key(KeyEvent::plain(k))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.update(key(ch));
        }
    }

    #[test]
    fn autoscroll_follows_new_rows() {
        let mut app = app();
        app.on_event(event("default", "a", EventType::Normal, "Created", 1));
        app.on_event(event("default", "b", EventType::Normal, "Started", 2));
        assert_eq!(app.selected_row(), 1);

        app.update(InputEvent::Key(KeyEvent::ctrl('s')));
        assert!(!app.autoscroll());
        app.update(special(Key::Up));
        app.on_event(event("default", "c", EventType::Normal, "Pulled", 3));
        assert_eq!(app.selected_row(), 0);
        assert_eq!(app.view().event_log().len(), 3);
        assert!(app.title().contains("Autoscroll ✗"));
    }

    #[test]
    fn filter_input_applies_on_enter() {
        let mut app = app();
        app.on_event(event("default", "a", EventType::Normal, "Created", 1));
        app.on_event(event("default", "b", EventType::Warning, "BackOff", 2));
        app.update(key('/'));
        assert_eq!(app.mode(), UiMode::Filter);
        type_text(&mut app, "Warn");
        assert_eq!(app.view().rows().len(), 2);
        app.update(special(Key::Enter));
        assert_eq!(app.mode(), UiMode::Main);
        assert_eq!(app.view().rows().len(), 1);
        assert!(app.title().starts_with("[Filter: Warn] Autoscroll ✓"));
    }

    #[test]
    fn aggregate_selects_first_row_and_wrap_selects_last() {
        let mut app = app();
        for (i, name) in ["a", "b", "a", "c"].iter().enumerate() {
            app.on_event(event("default", name, EventType::Normal, "Created", i as i64));
        }
        app.update(key('G'));
        assert_eq!(app.selected_row(), 0);
        assert_eq!(app.view().rows().len(), 3);
        assert!(app.title().contains("Aggregate"));

        app.update(key('G'));
        app.update(key('w'));
        assert_eq!(app.selected_row(), app.view().rows().len() - 1);
        assert!(app.title().ends_with("Raw Wrap"));
    }

    #[test]
    fn scope_change_resets_namespace_column_and_records_recent() {
        let mut app = app();
        assert!(app.view().columns().is_visible(Column::Namespace));
        let next = WatchGeneration::default().next().next();
        app.scope_started(Scope::from_namespace("payments"), next);
        assert!(!app.view().columns().is_visible(Column::Namespace));
        assert_eq!(app.recent_scopes().entries(), ["payments"]);
        assert_eq!(
            app.update(key('1')),
            Command::SetScope(Scope::from_namespace("payments"))
        );
        assert_eq!(app.update(key('0')), Command::SetScope(Scope::All));
        assert_eq!(app.update(key('3')), Command::None);
        app.update(key('N'));
        assert!(app.view().columns().is_visible(Column::Namespace));
    }

    #[test]
    fn palette_namespace_command_resolves_fuzzily() {
        let mut app = app();
        app.set_namespaces(vec!["default".into(), "kube-system".into()]);
        app.update(key(':'));
        type_text(&mut app, "ns ksys");
        assert_eq!(
            app.update(special(Key::Enter)),
            Command::SetScope(Scope::from_namespace("kube-system"))
        );

        app.update(key(':'));
        type_text(&mut app, "ns nowhere");
        assert_eq!(app.update(special(Key::Enter)), Command::None);
        assert!(app.title().ends_with("(namespace not found: nowhere)"));
        app.update(special(Key::Down));
        assert!(!app.title().contains("namespace not found"));
    }

    #[test]
    fn palette_jump_and_missing_match() {
        let mut app = app();
        app.on_event(event("default", "pd-worker", EventType::Normal, "Created", 1));
        app.on_event(event("default", "web-1", EventType::Normal, "Created", 2));
        app.update(key(':'));
        type_text(&mut app, "jump pd-wo");
        app.update(special(Key::Enter));
        assert_eq!(app.selected_row(), 0);

        app.update(key(':'));
        type_text(&mut app, "j qqqq");
        app.update(special(Key::Enter));
        assert!(app.title().contains("(no match for: qqqq)"));
    }

    #[test]
    fn palette_theme_persists() {
        let mut app = app();
        app.update(key(':'));
        type_text(&mut app, "theme ocean");
        match app.update(special(Key::Enter)) {
            Command::PersistTheme(theme) => assert_eq!(theme.name, "ocean"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(app.theme().name, "ocean");
    }

    #[test]
    fn details_fetch_apply_and_cancel() {
        let mut app = app();
        app.on_event(event("default", "web-1", EventType::Warning, "BackOff", 1));
        let request_id = match app.update(special(Key::Enter)) {
            Command::FetchDrillDown { request_id, target } => {
                assert_eq!(target.kind, "Pod");
                assert_eq!(target.name, "web-1");
                request_id
            }
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(app.mode(), UiMode::Details);
        assert_frame_contains("loading", &app.render(), "Loading resource drill-down...");

        assert_eq!(
            app.update(special(Key::Escape)),
            Command::CancelDrillDown { request_id }
        );
        assert!(!app.on_drilldown(request_id, DrillDown::default()));

        let next = match app.update(special(Key::Enter)) {
            Command::FetchDrillDown { request_id, .. } => request_id,
            other => panic!("unexpected {other:?}"),
        };
        assert!(next > request_id);
        assert!(app.on_drilldown(next, DrillDown::default()));
        assert_frame_contains("loaded", &app.render(), "Recent Logs");
        assert_eq!(app.update(key('q')), Command::None);
        assert_eq!(app.mode(), UiMode::Main);
    }

    #[test]
    fn watch_error_banner_is_dismissible() {
        let mut app = app();
        app.on_watch_failed(&TransportError::unavailable("forbidden"));
        assert!(app.title().ends_with("(watch error: forbidden)"));
        app.update(special(Key::Escape));
        assert_eq!(app.watch_error(), None);

        app.on_watch_failed(&TransportError::unavailable("gone"));
        app.update(key('x'));
        assert_eq!(app.watch_error(), None);
    }

    #[test]
    fn watch_failure_keeps_rows_until_scope_changes() {
        let mut app = app();
        app.on_event(event("default", "web-1", EventType::Warning, "BackOff", 1));
        app.on_event(event("default", "web-2", EventType::Normal, "Pulled", 2));
        app.on_watch_failed(&TransportError::unavailable("connection reset"));
        assert_eq!(app.view().rows().len(), 2);
        assert_eq!(app.watch_error(), Some("connection reset"));

        let generation = WatchGeneration::default().next().next();
        app.scope_started(Scope::from_namespace("shop"), generation);
        assert_eq!(app.watch_error(), None);
        assert!(app.view().rows().is_empty());
        app.on_event(event("shop", "cart-1", EventType::Normal, "Started", 3));
        assert_eq!(app.view().rows().len(), 1);
        assert_eq!(app.view().rows()[0].cell(Column::Resource), Some("Pod/cart-1"));
    }

    #[test]
    fn palette_jump_follows_a_group_that_moved() {
        let mut app = app();
        app.on_event(event("default", "web-1", EventType::Warning, "BackOff", 1));
        app.on_event(event("default", "api-1", EventType::Normal, "Pulled", 2));
        app.update(key('G'));
        assert_eq!(app.view().rows()[1].cell(Column::Resource), Some("Pod/web-1"));

        app.update(key(':'));
        for ch in "web-1".chars() {
            app.update(key(ch));
        }
        // A newer group sorts above the one the palette is showing.
        app.on_event(event("default", "db-1", EventType::Warning, "Failed", 3));
        app.update(special(Key::Enter));

        assert_eq!(app.mode(), UiMode::Main);
        let row = app.selected_row();
        assert_eq!(row, 2);
        assert_eq!(app.view().rows()[row].cell(Column::Resource), Some("Pod/web-1"));
    }

    #[test]
    fn render_shows_header_and_rows() {
        let mut app = app();
        app.on_event(event("default", "web-1", EventType::Warning, "BackOff", 1));
        let frame = app.render();
        assert_frame_contains("header", &frame, "Cluster: kind-dev");
        assert_frame_contains("header", &frame, "Namespace: All namespaces");
        assert_frame_contains("recent", &frame, "<0> All Namespaces");
        assert_frame_contains("columns", &frame, "TIME");
        assert_frame_contains("row", &frame, "Pod/web-1");
        assert_frame_contains("title", &frame, "Autoscroll ✓ Raw No Wrap");
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert_eq!(app.update(InputEvent::Key(KeyEvent::ctrl('c'))), Command::Quit);
        let mut app = super::App::new(cluster(), &Config::default());
        assert_eq!(app.update(key('q')), Command::Quit);
        assert!(app.quitting());
    }

    #[test]
    fn action_colors() {
        assert_eq!(action_role("Created"), TextRole::Success);
        assert_eq!(action_role("Pulling"), TextRole::Info);
        assert_eq!(action_role("BackOff"), TextRole::Danger);
        assert_eq!(action_role("Scheduled"), TextRole::Primary);
    }
}
