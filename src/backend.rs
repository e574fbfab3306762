//! Rendering-backend seam.
//!
//! The two rendering backends (legacy bitmap graphics and the newer
//! vector/touchscreen renderer) live outside this crate; they consume the
//! surface's pixel-write primitive and are driven through this trait. Which
//! family a session uses is fixed by the device model at construction (see
//! [`crate::model::BackendKind`]).

use crate::surface::PixelSurface;
use crate::types::TextEvent;

/// Contract implemented by a rendering backend.
///
/// Backends decode status buffers coming from the secure element and turn
/// them into `write_pixel` calls on the surface; they never perform I/O of
/// their own and never hold surface state between calls.
pub trait RenderBackend {
    /// Decode a status buffer, draw into the surface, and report any text
    /// recognized while drawing.
    fn display_status(&mut self, surface: &mut PixelSurface, data: &[u8]) -> Vec<TextEvent>;

    /// Decode a raw status buffer and draw into the surface.
    fn display_raw_status(&mut self, surface: &mut PixelSurface, data: &[u8]);

    /// Backend-requested flush point. Returns whether any pixel changed
    /// since the last flush.
    fn refresh(&mut self, surface: &mut PixelSurface) -> bool;
}
