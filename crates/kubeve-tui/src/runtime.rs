//! Terminal front end: raw mode, input mapping and frame painting.
//!
//! Must be called from inside a tokio runtime context so the session can
//! spawn its background tasks.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event as TerminalEvent,
    KeyCode as TerminalKeyCode, KeyEventKind, KeyModifiers, MouseEventKind,
};
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use kubeve_render::input::{
    InputEvent, Key, KeyEvent, Modifiers, MouseEvent, MouseWheelDirection, ResizeEvent,
};
use kubeve_render::render::{CellStyle, RenderFrame, TermColor};

use crate::session::Session;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the interactive loop until the user quits.
pub fn run(session: &mut Session) -> io::Result<()> {
    let mut terminal_session = TerminalSession::enter()?;

    let (width, height) = terminal_size()?;
    session.handle_input(InputEvent::Resize(ResizeEvent { width, height }));

    let mut dirty = true;
    loop {
        dirty |= session.drain();
        if dirty {
            let frame = session.app().render();
            render_frame(&mut terminal_session.stdout, &frame)?;
            dirty = false;
        }

        if session.app().quitting() {
            break;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let event = event::read()?;
        if is_interrupt(&event) {
            break;
        }
        if let Some(input) = map_terminal_event(event) {
            if !session.handle_input(input) {
                break;
            }
            dirty = true;
        }
    }
    tracing::info!("leaving interactive mode");
    Ok(())
}

fn terminal_size() -> io::Result<(usize, usize)> {
    let (width, height) = terminal::size()?;
    Ok((usize::from(width), usize::from(height)))
}

fn map_terminal_event(event: TerminalEvent) -> Option<InputEvent> {
    match event {
        TerminalEvent::Resize(width, height) => Some(InputEvent::Resize(ResizeEvent {
            width: usize::from(width),
            height: usize::from(height),
        })),
        TerminalEvent::Mouse(mouse) => {
            let wheel = match mouse.kind {
                MouseEventKind::ScrollUp => MouseWheelDirection::Up,
                MouseEventKind::ScrollDown => MouseWheelDirection::Down,
                _ => return None,
            };
            Some(InputEvent::Mouse(MouseEvent { wheel: Some(wheel) }))
        }
        TerminalEvent::Key(key_event) => {
            if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                return None;
            }

            let key = match key_event.code {
                TerminalKeyCode::Char(ch) => Key::Char(ch),
                TerminalKeyCode::Enter => Key::Enter,
                TerminalKeyCode::Esc => Key::Escape,
                TerminalKeyCode::Tab | TerminalKeyCode::BackTab => Key::Tab,
                TerminalKeyCode::Backspace => Key::Backspace,
                TerminalKeyCode::Delete => Key::Delete,
                TerminalKeyCode::Up => Key::Up,
                TerminalKeyCode::Down => Key::Down,
                TerminalKeyCode::Left => Key::Left,
                TerminalKeyCode::Right => Key::Right,
                TerminalKeyCode::PageUp => Key::PageUp,
                TerminalKeyCode::PageDown => Key::PageDown,
                TerminalKeyCode::Home => Key::Home,
                TerminalKeyCode::End => Key::End,
                _ => return None,
            };

            let mut modifiers = Modifiers {
                shift: key_event.modifiers.contains(KeyModifiers::SHIFT),
                ctrl: key_event.modifiers.contains(KeyModifiers::CONTROL),
                alt: key_event.modifiers.contains(KeyModifiers::ALT),
            };
            if matches!(key_event.code, TerminalKeyCode::BackTab) {
                modifiers.shift = true;
            }

            Some(InputEvent::Key(KeyEvent { key, modifiers }))
        }
        _ => None,
    }
}

/// Ctrl+C always leaves, even while an overlay owns the keyboard.
fn is_interrupt(event: &TerminalEvent) -> bool {
    let TerminalEvent::Key(key_event) = event else {
        return false;
    };
    matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat)
        && matches!(key_event.code, TerminalKeyCode::Char('c'))
        && key_event.modifiers.contains(KeyModifiers::CONTROL)
}

fn render_frame<W: Write>(out: &mut W, frame: &RenderFrame) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    let size = frame.size();

    for y in 0..size.height {
        queue!(out, MoveTo(0, to_u16(y)))?;
        let mut style = None;
        for x in 0..size.width {
            let Some(cell) = frame.cell(x, y) else {
                continue;
            };
            if style != Some(cell.style) {
                queue_style(out, cell.style)?;
                style = Some(cell.style);
            }
            queue!(out, Print(cell.glyph))?;
        }
    }

    queue!(out, SetAttribute(Attribute::Reset))?;
    out.flush()
}

fn to_crossterm_color(color: TermColor) -> Color {
    match color {
        TermColor::Ansi256(idx) => Color::AnsiValue(idx),
        TermColor::Rgb(r, g, b) => Color::Rgb { r, g, b },
    }
}

fn queue_style<W: Write>(out: &mut W, style: CellStyle) -> io::Result<()> {
    queue!(
        out,
        SetAttribute(Attribute::Reset),
        SetForegroundColor(to_crossterm_color(style.fg)),
        SetBackgroundColor(to_crossterm_color(style.bg)),
    )?;
    let intensity = if style.bold {
        Attribute::Bold
    } else if style.dim {
        Attribute::Dim
    } else {
        Attribute::NormalIntensity
    };
    let underline = if style.underline {
        Attribute::Underlined
    } else {
        Attribute::NoUnderline
    };
    queue!(out, SetAttribute(intensity), SetAttribute(underline))
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Raw mode plus alternate screen, restored on drop even when the loop
/// bails out with an error.
struct TerminalSession {
    stdout: io::Stdout,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        Ok(Self { stdout })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(
            self.stdout,
            SetAttribute(Attribute::Reset),
            DisableMouseCapture,
            LeaveAlternateScreen,
            Show,
            MoveTo(0, 0)
        );
        let _ = terminal::disable_raw_mode();
    }
}
