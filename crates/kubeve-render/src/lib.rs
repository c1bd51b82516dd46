//! kubeve-render: cell-frame render sink for the kubeve terminal UI.
//!
//! The UI crate draws into a [`render::RenderFrame`] and the runtime flushes
//! that frame to the terminal. Nothing in here knows about events or clusters.

/// Theme tokens and colors consumed by the UI crate.
pub mod style {
    /// Terminal color: ANSI256 index or 24-bit RGB.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TermColor {
        Ansi256(u8),
        Rgb(u8, u8, u8),
    }

    impl TermColor {
        /// Parses `#rrggbb` (leading `#` optional).
        #[must_use]
        pub fn from_hex(value: &str) -> Option<Self> {
            let hex = value.trim().trim_start_matches('#');
            if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
                return None;
            }
            let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
            Some(Self::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
        }

        /// Perceived brightness in 0..=255.
        #[must_use]
        pub fn luminance(self) -> u8 {
            let (r, g, b) = match self {
                Self::Rgb(r, g, b) => (r, g, b),
                Self::Ansi256(idx) => ansi256_to_rgb(idx),
            };
            let weighted = u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114;
            (weighted / 1000) as u8
        }
    }

    fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
        const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
        match idx {
            0..=15 => {
                if idx == 7 || idx >= 8 {
                    (192, 192, 192)
                } else {
                    (0, 0, 0)
                }
            }
            16..=231 => {
                let offset = idx - 16;
                (
                    LEVELS[usize::from(offset / 36)],
                    LEVELS[usize::from((offset / 6) % 6)],
                    LEVELS[usize::from(offset % 6)],
                )
            }
            _ => {
                let grey = 8 + (idx - 232) * 10;
                (grey, grey, grey)
            }
        }
    }

    /// Light or dark base, picked from the background brightness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ThemeKind {
        Dark,
        Light,
    }

    /// Stable style tokens exposed to the UI crate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StyleToken {
        Background,
        Surface,
        Foreground,
        Muted,
        Accent,
        Success,
        Danger,
        Warning,
        Info,
        Focus,
        Selection,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Palette {
        pub background: TermColor,
        pub surface: TermColor,
        pub foreground: TermColor,
        pub muted: TermColor,
        pub accent: TermColor,
        pub success: TermColor,
        pub danger: TermColor,
        pub warning: TermColor,
        pub info: TermColor,
        pub focus: TermColor,
        pub selection: TermColor,
    }

    /// Typography emphasis policy per theme.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypographySpec {
        pub accent_bold: bool,
        pub danger_bold: bool,
        pub warning_bold: bool,
        pub muted_dim: bool,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThemeSpec {
        pub kind: ThemeKind,
        pub palette: Palette,
        pub typography: TypographySpec,
    }

    impl ThemeSpec {
        /// Returns the color for a stable style token.
        #[must_use]
        pub fn color(self, token: StyleToken) -> TermColor {
            match token {
                StyleToken::Background => self.palette.background,
                StyleToken::Surface => self.palette.surface,
                StyleToken::Foreground => self.palette.foreground,
                StyleToken::Muted => self.palette.muted,
                StyleToken::Accent => self.palette.accent,
                StyleToken::Success => self.palette.success,
                StyleToken::Danger => self.palette.danger,
                StyleToken::Warning => self.palette.warning,
                StyleToken::Info => self.palette.info,
                StyleToken::Focus => self.palette.focus,
                StyleToken::Selection => self.palette.selection,
            }
        }

        /// Builds a theme for the requested base.
        #[must_use]
        pub fn for_kind(kind: ThemeKind) -> Self {
            let palette = match kind {
                ThemeKind::Dark => Palette {
                    background: TermColor::Ansi256(16),
                    surface: TermColor::Ansi256(235),
                    foreground: TermColor::Ansi256(252),
                    muted: TermColor::Ansi256(244),
                    accent: TermColor::Ansi256(45),
                    success: TermColor::Ansi256(41),
                    danger: TermColor::Ansi256(197),
                    warning: TermColor::Ansi256(220),
                    info: TermColor::Ansi256(75),
                    focus: TermColor::Ansi256(81),
                    selection: TermColor::Ansi256(24),
                },
                ThemeKind::Light => Palette {
                    background: TermColor::Ansi256(255),
                    surface: TermColor::Ansi256(252),
                    foreground: TermColor::Ansi256(234),
                    muted: TermColor::Ansi256(244),
                    accent: TermColor::Ansi256(25),
                    success: TermColor::Ansi256(28),
                    danger: TermColor::Ansi256(160),
                    warning: TermColor::Ansi256(130),
                    info: TermColor::Ansi256(31),
                    focus: TermColor::Ansi256(21),
                    selection: TermColor::Ansi256(153),
                },
            };
            let typography = match kind {
                ThemeKind::Dark => TypographySpec {
                    accent_bold: true,
                    danger_bold: true,
                    warning_bold: true,
                    muted_dim: true,
                },
                ThemeKind::Light => TypographySpec {
                    accent_bold: true,
                    danger_bold: true,
                    warning_bold: true,
                    muted_dim: false,
                },
            };
            Self {
                kind,
                palette,
                typography,
            }
        }

        /// Builds a theme from configured hex colors. The base (dark or light)
        /// follows the background brightness. Unparseable colors keep the base
        /// palette's value.
        #[must_use]
        pub fn from_hex(background: &str, text: &str) -> Self {
            let bg = TermColor::from_hex(background);
            let kind = match bg {
                Some(color) if color.luminance() >= 128 => ThemeKind::Light,
                _ => ThemeKind::Dark,
            };
            let mut theme = Self::for_kind(kind);
            if let Some(color) = bg {
                theme.palette.background = color;
            }
            if let Some(color) = TermColor::from_hex(text) {
                theme.palette.foreground = color;
            }
            theme
        }
    }

    impl Default for ThemeSpec {
        fn default() -> Self {
            Self::for_kind(ThemeKind::Dark)
        }
    }
}

/// Render and frame primitives consumed by the UI crate.
pub mod render {
    pub use super::style::TermColor;
    use super::style::{StyleToken, ThemeSpec};
    use super::widgets::BorderStyle;

    /// Frame dimensions in terminal cells.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameSize {
        pub width: usize,
        pub height: usize,
    }

    /// A rectangular region within a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Rect {
        pub x: usize,
        pub y: usize,
        pub width: usize,
        pub height: usize,
    }

    impl Rect {
        /// Inner region after removing border (1 cell each side).
        #[must_use]
        pub fn inner(self) -> Self {
            if self.width < 2 || self.height < 2 {
                return Self {
                    x: self.x,
                    y: self.y,
                    width: 0,
                    height: 0,
                };
            }
            Self {
                x: self.x + 1,
                y: self.y + 1,
                width: self.width - 2,
                height: self.height - 2,
            }
        }

        /// Shrinks the rect by `dx` columns and `dy` rows on every side.
        #[must_use]
        pub fn inset(self, dx: usize, dy: usize) -> Self {
            Self {
                x: self.x + dx.min(self.width / 2),
                y: self.y + dy.min(self.height / 2),
                width: self.width.saturating_sub(dx * 2),
                height: self.height.saturating_sub(dy * 2),
            }
        }
    }

    /// Cell style represented as terminal colors and text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellStyle {
        pub fg: TermColor,
        pub bg: TermColor,
        pub bold: bool,
        pub dim: bool,
        pub underline: bool,
    }

    /// A single frame cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameCell {
        pub glyph: char,
        pub style: CellStyle,
    }

    /// Semantic role for rendered text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TextRole {
        Primary,
        Muted,
        Accent,
        Success,
        Danger,
        Warning,
        Info,
        Focus,
    }

    struct BorderChars {
        top_left: char,
        top_right: char,
        bottom_left: char,
        bottom_right: char,
        horizontal: char,
        vertical: char,
    }

    fn border_chars(style: BorderStyle) -> BorderChars {
        match style {
            BorderStyle::Rounded => BorderChars {
                top_left: '╭',
                top_right: '╮',
                bottom_left: '╰',
                bottom_right: '╯',
                horizontal: '─',
                vertical: '│',
            },
            BorderStyle::Plain => BorderChars {
                top_left: '┌',
                top_right: '┐',
                bottom_left: '└',
                bottom_right: '┘',
                horizontal: '─',
                vertical: '│',
            },
        }
    }

    /// In-memory cell buffer the UI draws into before it is flushed.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RenderFrame {
        size: FrameSize,
        cells: Vec<FrameCell>,
        theme: ThemeSpec,
    }

    impl RenderFrame {
        /// Create a blank frame filled with the theme background.
        #[must_use]
        pub fn new(size: FrameSize, theme: ThemeSpec) -> Self {
            let default_cell = FrameCell {
                glyph: ' ',
                style: CellStyle {
                    fg: theme.color(StyleToken::Foreground),
                    bg: theme.color(StyleToken::Background),
                    bold: false,
                    dim: false,
                    underline: false,
                },
            };
            Self {
                size,
                cells: vec![default_cell; size.width.saturating_mul(size.height)],
                theme,
            }
        }

        #[must_use]
        pub fn theme(&self) -> ThemeSpec {
            self.theme
        }

        #[must_use]
        pub fn size(&self) -> FrameSize {
            self.size
        }

        /// Whole-frame rect.
        #[must_use]
        pub fn area(&self) -> Rect {
            Rect {
                x: 0,
                y: 0,
                width: self.size.width,
                height: self.size.height,
            }
        }

        /// Returns one frame cell for assertions/snapshot helpers.
        #[must_use]
        pub fn cell(&self, x: usize, y: usize) -> Option<FrameCell> {
            if x >= self.size.width || y >= self.size.height {
                return None;
            }
            self.cells.get(y * self.size.width + x).copied()
        }

        /// Write a single cell, clipped to frame bounds.
        pub fn set_cell(&mut self, x: usize, y: usize, cell: FrameCell) {
            if x >= self.size.width || y >= self.size.height {
                return;
            }
            let idx = y * self.size.width + x;
            if let Some(slot) = self.cells.get_mut(idx) {
                *slot = cell;
            }
        }

        /// Draw text on a single row, clipped to frame width.
        pub fn draw_text(&mut self, x: usize, y: usize, text: &str, role: TextRole) {
            let limit = self.size.width.saturating_sub(x);
            self.draw_role_text(x, y, text, role, limit);
        }

        /// Draw text within a rect, clipped to rect bounds.
        pub fn draw_text_in_rect(
            &mut self,
            rect: Rect,
            x_offset: usize,
            y_offset: usize,
            text: &str,
            role: TextRole,
        ) {
            if y_offset >= rect.height {
                return;
            }
            let abs_x = rect.x + x_offset;
            let max_chars = (rect.x + rect.width).saturating_sub(abs_x);
            self.draw_role_text(abs_x, rect.y + y_offset, text, role, max_chars);
        }

        fn draw_role_text(&mut self, x: usize, y: usize, text: &str, role: TextRole, limit: usize) {
            if y >= self.size.height {
                return;
            }
            let fg = self.color_for_role(role);
            let (bold, dim, underline) = self.style_for_role(role);
            for (offset, glyph) in text.chars().take(limit).enumerate() {
                let col = x + offset;
                if col >= self.size.width {
                    break;
                }
                // Keep whatever background is already painted (panels, selection).
                let bg = self
                    .cell(col, y)
                    .map(|cell| cell.style.bg)
                    .unwrap_or_else(|| self.theme.color(StyleToken::Background));
                self.set_cell(
                    col,
                    y,
                    FrameCell {
                        glyph,
                        style: CellStyle {
                            fg,
                            bg,
                            bold,
                            dim,
                            underline,
                        },
                    },
                );
            }
        }

        /// Draw a bordered panel with a title into a rectangular region.
        ///
        /// Returns the inner `Rect` (content area inside the border) for subsequent drawing.
        pub fn draw_panel(
            &mut self,
            rect: Rect,
            title: &str,
            border: BorderStyle,
            border_color: TermColor,
        ) -> Rect {
            if rect.width < 2 || rect.height < 2 {
                return Rect {
                    x: rect.x,
                    y: rect.y,
                    width: 0,
                    height: 0,
                };
            }

            let bg = self.theme.color(StyleToken::Background);
            self.fill_bg(rect, bg);

            let chars = border_chars(border);
            let border_style = CellStyle {
                fg: border_color,
                bg,
                bold: false,
                dim: false,
                underline: false,
            };
            let right = rect.x + rect.width - 1;
            let bottom = rect.y + rect.height - 1;

            for col in (rect.x + 1)..right {
                self.set_cell(
                    col,
                    rect.y,
                    FrameCell {
                        glyph: chars.horizontal,
                        style: border_style,
                    },
                );
                self.set_cell(
                    col,
                    bottom,
                    FrameCell {
                        glyph: chars.horizontal,
                        style: border_style,
                    },
                );
            }
            for row in (rect.y + 1)..bottom {
                for col in [rect.x, right] {
                    self.set_cell(
                        col,
                        row,
                        FrameCell {
                            glyph: chars.vertical,
                            style: border_style,
                        },
                    );
                }
            }
            for (col, row, glyph) in [
                (rect.x, rect.y, chars.top_left),
                (right, rect.y, chars.top_right),
                (rect.x, bottom, chars.bottom_left),
                (right, bottom, chars.bottom_right),
            ] {
                self.set_cell(
                    col,
                    row,
                    FrameCell {
                        glyph,
                        style: border_style,
                    },
                );
            }

            if !title.is_empty() {
                let title_max = rect.width.saturating_sub(4);
                let truncated: String = title.chars().take(title_max).collect();
                let title_text = format!(" {truncated} ");
                let title_style = CellStyle {
                    bold: true,
                    ..border_style
                };
                for (i, glyph) in title_text.chars().enumerate() {
                    let col = rect.x + 2 + i;
                    if col >= right {
                        break;
                    }
                    self.set_cell(
                        col,
                        rect.y,
                        FrameCell {
                            glyph,
                            style: title_style,
                        },
                    );
                }
            }

            rect.inner()
        }

        /// Fill a rectangular region with a background color.
        pub fn fill_bg(&mut self, rect: Rect, bg: TermColor) {
            let style = CellStyle {
                fg: self.theme.color(StyleToken::Foreground),
                bg,
                bold: false,
                dim: false,
                underline: false,
            };
            for row in rect.y..rect.y + rect.height {
                for col in rect.x..rect.x + rect.width {
                    self.set_cell(col, row, FrameCell { glyph: ' ', style });
                }
            }
        }

        /// Repaint the background of `width` cells on row `y`, keeping glyphs.
        pub fn highlight_span(&mut self, x: usize, y: usize, width: usize, bg: TermColor) {
            for col in x..x + width {
                if let Some(mut cell) = self.cell(col, y) {
                    cell.style.bg = bg;
                    self.set_cell(col, y, cell);
                }
            }
        }

        #[must_use]
        pub fn row_text(&self, y: usize) -> String {
            if y >= self.size.height {
                return String::new();
            }
            let start = y * self.size.width;
            let end = start + self.size.width;
            self.cells[start..end]
                .iter()
                .map(|cell| cell.glyph)
                .collect()
        }

        /// Text-only snapshot helper for lightweight regression tests.
        #[must_use]
        pub fn snapshot(&self) -> String {
            (0..self.size.height)
                .map(|row| self.row_text(row))
                .collect::<Vec<_>>()
                .join("\n")
        }

        /// Returns the `TermColor` for a semantic role.
        #[must_use]
        pub fn color_for_role(&self, role: TextRole) -> TermColor {
            match role {
                TextRole::Primary => self.theme.color(StyleToken::Foreground),
                TextRole::Muted => self.theme.color(StyleToken::Muted),
                TextRole::Accent => self.theme.color(StyleToken::Accent),
                TextRole::Success => self.theme.color(StyleToken::Success),
                TextRole::Danger => self.theme.color(StyleToken::Danger),
                TextRole::Warning => self.theme.color(StyleToken::Warning),
                TextRole::Info => self.theme.color(StyleToken::Info),
                TextRole::Focus => self.theme.color(StyleToken::Focus),
            }
        }

        fn style_for_role(&self, role: TextRole) -> (bool, bool, bool) {
            let typography = self.theme.typography;
            match role {
                TextRole::Primary | TextRole::Info | TextRole::Success => (false, false, false),
                TextRole::Muted => (false, typography.muted_dim, false),
                TextRole::Accent => (typography.accent_bold, false, false),
                TextRole::Danger => (typography.danger_bold, false, false),
                TextRole::Warning => (typography.warning_bold, false, false),
                TextRole::Focus => (true, false, true),
            }
        }
    }
}

/// Widget primitives: borders and cell alignment.
pub mod widgets {
    /// Border treatment for panels and overlays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum BorderStyle {
        Plain,
        Rounded,
    }

    /// Text alignment for table cells.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TextAlign {
        Left,
        Right,
    }

    /// Pads or truncates `text` to exactly `width` chars. Truncation marks the
    /// cut with `…` when there is room for it.
    #[must_use]
    pub fn fit(text: &str, width: usize, align: TextAlign) -> String {
        let count = text.chars().count();
        if count > width {
            if width == 0 {
                return String::new();
            }
            let mut out: String = text.chars().take(width - 1).collect();
            out.push('…');
            return out;
        }
        let pad = " ".repeat(width - count);
        match align {
            TextAlign::Left => format!("{text}{pad}"),
            TextAlign::Right => format!("{pad}{text}"),
        }
    }
}

/// Snapshot helpers for render frame tests.
pub mod snapshot;

/// Input model decoupled from the terminal backend.
pub mod input {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Key {
        Char(char),
        Enter,
        Escape,
        Tab,
        Backspace,
        Delete,
        Up,
        Down,
        Left,
        Right,
        PageUp,
        PageDown,
        Home,
        End,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers {
        pub shift: bool,
        pub ctrl: bool,
        pub alt: bool,
    }

    impl Modifiers {
        #[must_use]
        pub const fn none() -> Self {
            Self {
                shift: false,
                ctrl: false,
                alt: false,
            }
        }

        #[must_use]
        pub const fn ctrl() -> Self {
            Self {
                shift: false,
                ctrl: true,
                alt: false,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyEvent {
        pub key: Key,
        pub modifiers: Modifiers,
    }

    impl KeyEvent {
        #[must_use]
        pub const fn plain(key: Key) -> Self {
            Self {
                key,
                modifiers: Modifiers::none(),
            }
        }

        #[must_use]
        pub const fn ctrl(ch: char) -> Self {
            Self {
                key: Key::Char(ch),
                modifiers: Modifiers::ctrl(),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MouseWheelDirection {
        Up,
        Down,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MouseEvent {
        pub wheel: Option<MouseWheelDirection>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResizeEvent {
        pub width: usize,
        pub height: usize,
    }

    /// Input stream event consumed by the app state machine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum InputEvent {
        Key(KeyEvent),
        Mouse(MouseEvent),
        Resize(ResizeEvent),
        Tick,
    }
}
