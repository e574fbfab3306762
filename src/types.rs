//! Core types for secscreen.
//!
//! These types define the foundation that everything builds on.
//! They flow between the surface, the reactor and the input translator,
//! and define what the render sinks understand.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

// =============================================================================
// Color
// =============================================================================

/// Packed 24-bit RGB color (`0x00RRGGBB`).
///
/// Device palettes and wire formats address colors as plain integers, so the
/// newtype keeps the packed form and exposes channel accessors on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    /// Create a color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    pub const BLACK: Self = Self(0x000000);
    pub const WHITE: Self = Self(0xFFFFFF);

    // Device case colors.
    pub const LAGOON_BLUE: Self = Self(0x7EBAB5);
    pub const JADE_GREEN: Self = Self(0xB9CEAC);
    pub const FLAMINGO_PINK: Self = Self(0xD8A0A6);
    pub const SAFFRON_YELLOW: Self = Self(0xF6A950);
    pub const MATTE_BLACK: Self = Self(0x111111);
}

// =============================================================================
// Diffs and events
// =============================================================================

/// Pixels changed since the last flush, keyed by coordinate.
///
/// Insertion overwrites, which gives last-write-wins per coordinate within
/// one flush interval for free.
pub type PixelDiff = HashMap<(u16, u16), Color>;

/// Text recognized by a rendering backend while decoding a status buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub text: String,
    /// X coordinate of the text on the emulated screen.
    pub x: u16,
    /// Y coordinate of the text on the emulated screen.
    pub y: u16,
}

// =============================================================================
// Button codes
// =============================================================================

/// Code forwarded to the secure element for the left button.
pub const BUTTON_LEFT: u8 = 1;
/// Code forwarded to the secure element for the right button.
pub const BUTTON_RIGHT: u8 = 2;

// =============================================================================
// Session close signal
// =============================================================================

/// Clonable latch that requests the end of the display session.
///
/// Raised by the reactor on device exhaustion and by the input translator on
/// the quit key. Raising is idempotent; the host loop polls `is_raised` to
/// decide when to tear the session down. Single-threaded cooperative model,
/// hence `Rc<Cell>` rather than atomics.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal(Rc<Cell<bool>>);

impl CloseSignal {
    /// Create a lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request session close. Returns true if this call raised the signal,
    /// false if it was already raised.
    pub fn raise(&self) -> bool {
        let was = self.0.replace(true);
        !was
    }

    /// Has a close been requested?
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.0.get()
    }
}

// =============================================================================
// Tests
// =============================================================================
