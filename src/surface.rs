//! PixelSurface - the dirty-tracked framebuffer.
//!
//! The surface owns three layers of pixel state:
//!
//! - a sparse dirty set of pixels written since the last flush,
//! - `committed`, the dense last fully-composited image (the render source),
//! - two screenshot snapshots: `working` accumulates every commit, `public`
//!   is replaced wholesale only on explicit publish.
//!
//! Splitting "committed" from "public snapshot" lets a screenshot poller read
//! a stable image at any cadence while drawing continues on the render path.
//! Flush cost is proportional to the number of changed pixels, not to the
//! screen area, because only the dirty set is walked.

use std::sync::Arc;

use log::trace;

use crate::model::DeviceModel;
use crate::types::{Color, PixelDiff};

// =============================================================================
// Frame
// =============================================================================

/// A dense row-major image: `index = y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    pixels: Vec<Color>,
}

impl Frame {
    /// Create a frame filled with a single color.
    pub fn filled(width: u16, height: u16, color: Color) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![color; size],
        }
    }

    /// Frame width in pixels.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get a pixel (None if out of bounds).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    /// Set a pixel. Caller guarantees bounds.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, color: Color) {
        let idx = self.index(x, y);
        self.pixels[idx] = color;
    }

    /// Integer nearest-neighbor magnification.
    ///
    /// Each source pixel becomes a `factor` x `factor` block. Callers skip
    /// this entirely when the factor is 1; asking for it anyway is a waste,
    /// not an error.
    pub fn scaled(&self, factor: u16) -> Frame {
        let mut out = Frame::filled(self.width * factor, self.height * factor, Color::BLACK);
        for y in 0..self.height {
            for x in 0..self.width {
                let color = self.pixels[self.index(x, y)];
                for dy in 0..factor {
                    for dx in 0..factor {
                        out.set(x * factor + dx, y * factor + dy, color);
                    }
                }
            }
        }
        out
    }

    /// Serialize as packed RGB bytes, row-major, 3 bytes per pixel.
    ///
    /// This is the screenshot wire format.
    pub fn rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            out.push(color.r());
            out.push(color.g());
            out.push(color.b());
        }
        out
    }
}

// =============================================================================
// Diff sink
// =============================================================================

/// Consumer of flushed pixel diffs (mirror sinks, test recorders).
///
/// Pushed to, never pulled from. A sink must tolerate being handed the same
/// coordinate again on a later flush; within one flush each coordinate
/// appears at most once.
pub trait DiffSink {
    fn redraw(&mut self, diff: &PixelDiff);
}

// =============================================================================
// PixelSurface
// =============================================================================

/// The dirty-tracked framebuffer, exclusively owned by the display façade.
#[derive(Debug)]
pub struct PixelSurface {
    model: DeviceModel,
    /// Pixels written since the last flush.
    dirty: PixelDiff,
    /// Last fully-composited image, base for partial redraws.
    committed: Frame,
    /// Snapshot that tracks every commit.
    working: Frame,
    /// Snapshot replaced wholesale on publish; safe to hand out at any time.
    public: Arc<Frame>,
}

impl PixelSurface {
    /// Create a surface for a device model, cleared to black.
    pub fn new(model: DeviceModel) -> Self {
        let (width, height) = model.spec().screen_size;
        let blank = Frame::filled(width, height, Color::BLACK);
        Self {
            model,
            dirty: PixelDiff::new(),
            committed: blank.clone(),
            working: blank.clone(),
            public: Arc::new(blank),
        }
    }

    /// The model this surface is bound to.
    #[inline]
    pub fn model(&self) -> DeviceModel {
        self.model
    }

    /// Record one pixel write in the dirty set.
    ///
    /// Overwrites any pending value for the same coordinate (last-write-wins
    /// within a flush interval). Out-of-range coordinates are a programming
    /// error in the calling backend.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the model's screen.
    pub fn write_pixel(&mut self, x: u16, y: u16, color: Color) {
        let (width, height) = self.model.spec().screen_size;
        assert!(
            x < width && y < height,
            "pixel write out of range: ({x}, {y}) on {width}x{height} screen",
        );
        self.dirty.insert((x, y), color);
    }

    /// True iff at least one write is waiting to be flushed.
    #[inline]
    pub fn has_pending_writes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// The last fully-composited image.
    #[inline]
    pub fn committed(&self) -> &Frame {
        &self.committed
    }

    /// Commit every pending write and deliver the diff to every sink.
    ///
    /// Applies the dirty set to `committed` and to the working snapshot,
    /// hands the same diff to each sink exactly once, then clears the dirty
    /// set. Returns the number of pixels committed. Broadcast order across
    /// sinks is unspecified.
    pub fn flush_to(&mut self, sinks: &mut [&mut dyn DiffSink]) -> usize {
        if self.dirty.is_empty() {
            return 0;
        }
        let diff = std::mem::take(&mut self.dirty);
        for (&(x, y), &color) in &diff {
            self.committed.set(x, y, color);
            self.working.set(x, y, color);
        }
        for sink in sinks.iter_mut() {
            sink.redraw(&diff);
        }
        trace!("flushed {} pixels to {} sinks", diff.len(), sinks.len());
        diff.len()
    }

    /// Promote the working snapshot to the public one, wholesale.
    ///
    /// Never touches the dirty set, so it is callable at any point between
    /// (or during) flush intervals.
    pub fn publish_snapshot(&mut self) {
        self.public = Arc::new(self.working.clone());
    }

    /// The most recently published snapshot.
    ///
    /// The handle stays valid and unchanged even while further writes,
    /// flushes or publishes happen on the surface.
    #[inline]
    pub fn public_snapshot(&self) -> Arc<Frame> {
        Arc::clone(&self.public)
    }

    /// A point-in-time copy of the working snapshot.
    pub fn take_screenshot(&self) -> Frame {
        self.working.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
