//! Render sink broadcaster.
//!
//! Drains the surface's dirty set once per flush and fans the result out:
//! the raw, unscaled diff goes to the optional mirror sink; the on-screen
//! target gets the committed frame, magnified only when the pixel scale is
//! not 1, followed by a single coalescible repaint request.

use log::trace;

use crate::surface::{DiffSink, Frame, PixelSurface};

// =============================================================================
// On-screen target
// =============================================================================

/// The host-side render target (a window, a terminal view, a test recorder).
///
/// `request_repaint` may be called while a repaint is already pending; the
/// target is expected to coalesce, never to queue.
pub trait ScreenTarget {
    /// Accept the frame to show. Called once per flush with the committed
    /// image, already magnified to the window's pixel scale.
    fn present(&mut self, frame: &Frame);

    /// Ask the host to repaint at its convenience.
    fn request_repaint(&mut self);
}

// =============================================================================
// Broadcaster
// =============================================================================

/// Fans one flush out to the on-screen target and the mirror sink.
pub struct Broadcaster {
    screen: Box<dyn ScreenTarget>,
    mirror: Option<Box<dyn DiffSink>>,
    pixel_size: u16,
}

impl Broadcaster {
    /// Create a broadcaster with a mandatory on-screen target and an
    /// optional mirror sink. `pixel_size` is fixed for the session.
    pub fn new(
        screen: Box<dyn ScreenTarget>,
        mirror: Option<Box<dyn DiffSink>>,
        pixel_size: u16,
    ) -> Self {
        assert!(pixel_size >= 1, "pixel size must be at least 1");
        Self {
            screen,
            mirror,
            pixel_size,
        }
    }

    /// Commit and broadcast everything pending on the surface.
    ///
    /// Returns true if any pixel changed. With nothing pending this is a
    /// complete no-op: no present, no repaint request.
    pub fn flush(&mut self, surface: &mut PixelSurface) -> bool {
        if !surface.has_pending_writes() {
            return false;
        }

        let mut sinks: Vec<&mut dyn DiffSink> = Vec::with_capacity(1);
        if let Some(mirror) = self.mirror.as_deref_mut() {
            sinks.push(mirror);
        }
        let committed = surface.flush_to(&mut sinks);
        trace!("broadcast {committed} changed pixels");

        // The expensive copy happens only under magnification.
        if self.pixel_size == 1 {
            self.screen.present(surface.committed());
        } else {
            self.screen.present(&surface.committed().scaled(self.pixel_size));
        }
        self.screen.request_repaint();
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
