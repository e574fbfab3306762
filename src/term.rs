//! Terminal host adapter.
//!
//! Stands in for the windowing chrome: shows the emulated screen inside a
//! terminal and translates terminal input into core events. Each terminal
//! cell displays two vertically stacked pixels using the upper-half-block
//! glyph, foreground for the top pixel and background for the bottom one.
//!
//! Repaint requests coalesce into a single pending flag; `paint` clears it
//! and writes the retained frame through queued crossterm commands in one
//! flush.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::event::{
    Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind,
};
use crossterm::queue;
use crossterm::style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor};

use crate::broadcast::ScreenTarget;
use crate::input::{Key, KeyEvent, PointerEvent};
use crate::surface::Frame;
use crate::types::Color;

const HALF_BLOCK: char = '\u{2580}';

// =============================================================================
// Screen target
// =============================================================================

/// Renders presented frames into the terminal.
pub struct TerminalScreen {
    frame: Option<Frame>,
    repaint_pending: bool,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self {
            frame: None,
            repaint_pending: false,
        }
    }

    /// Is a repaint waiting to happen?
    #[inline]
    pub fn repaint_pending(&self) -> bool {
        self.repaint_pending
    }

    /// Paint the retained frame if a repaint is pending.
    ///
    /// Called from the host loop at its own cadence; any number of repaint
    /// requests since the last paint collapse into this one write.
    pub fn paint(&mut self) -> io::Result<()> {
        let mut out = io::stdout();
        self.paint_into(&mut out)?;
        out.flush()
    }

    /// Like `paint`, writing to an arbitrary output.
    pub fn paint_into<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.repaint_pending {
            return Ok(());
        }
        self.repaint_pending = false;
        self.render(out)
    }

    fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        // Two pixel rows per terminal row.
        for row in 0..frame.height().div_ceil(2) {
            queue!(out, MoveTo(0, row))?;
            for x in 0..frame.width() {
                let top = frame.get(x, row * 2).unwrap_or(Color::BLACK);
                let bottom = frame.get(x, row * 2 + 1).unwrap_or(Color::BLACK);
                queue!(
                    out,
                    SetForegroundColor(term_color(top)),
                    SetBackgroundColor(term_color(bottom)),
                    Print(HALF_BLOCK),
                )?;
            }
        }
        queue!(out, ResetColor)?;
        Ok(())
    }
}

impl Default for TerminalScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenTarget for TerminalScreen {
    fn present(&mut self, frame: &Frame) {
        self.frame = Some(frame.clone());
    }

    fn request_repaint(&mut self) {
        self.repaint_pending = true;
    }
}

fn term_color(color: Color) -> TermColor {
    TermColor::Rgb {
        r: color.r(),
        g: color.g(),
        b: color.b(),
    }
}

// =============================================================================
// Input mapping
// =============================================================================

/// A host input the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    Key(KeyEvent),
    Pointer(PointerEvent),
}

/// Translate a crossterm event into a core input event.
///
/// Arrow keys map to the device buttons, `q` to quit, mouse press/release
/// to pointer transitions. Everything else returns `None` and is ignored.
/// Mouse rows are doubled because every terminal row shows two pixel rows.
pub fn map_event(event: &Event) -> Option<HostInput> {
    match event {
        Event::Key(key) => {
            let pressed = match key.kind {
                KeyEventKind::Press => true,
                KeyEventKind::Release => false,
                KeyEventKind::Repeat => return None,
            };
            let key = match key.code {
                KeyCode::Left => Key::Left,
                KeyCode::Right => Key::Right,
                KeyCode::Down => Key::Down,
                KeyCode::Char('q') => Key::Quit,
                _ => return None,
            };
            Some(HostInput::Key(KeyEvent { key, pressed }))
        }
        Event::Mouse(mouse) => {
            let pressed = match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => true,
                MouseEventKind::Up(MouseButton::Left) => false,
                _ => return None,
            };
            Some(HostInput::Pointer(PointerEvent {
                x: mouse.column as i32,
                y: mouse.row as i32 * 2,
                pressed,
            }))
        }
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
