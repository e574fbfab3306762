//! Display façade.
//!
//! Owns the session: one surface, one reactor, one broadcaster and the
//! active rendering backend. Status buffers from the secure element are
//! delegated to the backend, then run through one uniform refresh path for
//! every model; devices attach to the reactor and a raised close signal
//! ends the session.

use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::backend::RenderBackend;
use crate::broadcast::{Broadcaster, ScreenTarget};
use crate::input::InputTranslator;
use crate::model::DeviceModel;
use crate::reactor::{IoDevice, Reactor};
use crate::surface::{DiffSink, Frame, PixelSurface};
use crate::types::{CloseSignal, TextEvent};

/// One emulated display session.
pub struct Display {
    model: DeviceModel,
    pixel_size: u16,
    surface: PixelSurface,
    backend: Box<dyn RenderBackend>,
    broadcaster: Broadcaster,
    reactor: Reactor,
    close: CloseSignal,
}

impl Display {
    /// Build a session for a model.
    ///
    /// The backend must match `model.spec().backend`; the two backend
    /// families are mutually exclusive and the choice never changes during
    /// a session. `mirror` is the optional remote-mirroring sink.
    pub fn new(
        model: DeviceModel,
        pixel_size: u16,
        backend: Box<dyn RenderBackend>,
        screen: Box<dyn ScreenTarget>,
        mirror: Option<Box<dyn DiffSink>>,
    ) -> Self {
        let close = CloseSignal::new();
        debug!(
            "opening {} session at {}x magnification",
            model.spec().name,
            pixel_size
        );
        Self {
            model,
            pixel_size,
            surface: PixelSurface::new(model),
            backend,
            broadcaster: Broadcaster::new(screen, mirror, pixel_size),
            reactor: Reactor::new(close.clone()),
            close,
        }
    }

    /// The model this session emulates.
    #[inline]
    pub fn model(&self) -> DeviceModel {
        self.model
    }

    /// The session close signal. Clone it anywhere a close needs to be
    /// requested or observed.
    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    /// Input translator preconfigured for this session's model and scale.
    pub fn translator(&self) -> InputTranslator {
        InputTranslator::new(self.model, self.pixel_size)
    }

    // =========================================================================
    // Status path
    // =========================================================================

    /// Decode a status buffer through the active backend, then refresh.
    ///
    /// Every model runs the same refresh path after a status; there is no
    /// per-model branch here.
    pub fn display_status(&mut self, data: &[u8]) -> Vec<TextEvent> {
        let events = self.backend.display_status(&mut self.surface, data);
        self.screen_update();
        events
    }

    /// Decode a raw status buffer through the active backend, then refresh.
    pub fn display_raw_status(&mut self, data: &[u8]) {
        self.backend.display_raw_status(&mut self.surface, data);
        self.screen_update();
    }

    /// Run the backend's flush point and broadcast whatever it committed.
    ///
    /// Returns whether any pixel changed.
    pub fn screen_update(&mut self) -> bool {
        let changed = self.backend.refresh(&mut self.surface);
        self.broadcaster.flush(&mut self.surface);
        changed
    }

    // =========================================================================
    // Device attachment
    // =========================================================================

    /// Attach a pollable device (secure-element link, mirror-control
    /// channel). Panics on a duplicate handle.
    pub fn attach_device(&mut self, device: Box<dyn IoDevice>) {
        self.reactor.register(device);
    }

    /// Toggle readiness delivery for an attached device.
    pub fn set_device_enabled(&mut self, fd: RawFd, enabled: bool) {
        self.reactor.set_enabled(fd, enabled);
    }

    /// Detach a device. Its handle may be attached again later.
    pub fn detach_device(&mut self, fd: RawFd) {
        self.reactor.remove(fd);
    }

    /// One reactor turn: wait for device readiness, dispatch it.
    ///
    /// Returns true while the session should keep running; false once a
    /// close has been requested (device exhaustion or quit key).
    #[cfg(unix)]
    pub fn poll_io(&mut self, timeout: Option<Duration>) -> io::Result<bool> {
        self.reactor.turn(timeout)?;
        Ok(!self.close.is_raised())
    }

    /// Direct access to the reactor, for host loops that own the wait
    /// primitive themselves.
    pub fn reactor_mut(&mut self) -> &mut Reactor {
        &mut self.reactor
    }

    // =========================================================================
    // Screenshot API
    // =========================================================================

    /// Point-in-time copy of the working snapshot.
    pub fn take_screenshot(&self) -> Frame {
        self.surface.take_screenshot()
    }

    /// Promote the working snapshot to the public one.
    pub fn update_screenshot(&mut self) {
        self.surface.publish_snapshot();
    }

    /// The most recently published snapshot.
    pub fn public_screenshot(&self) -> Arc<Frame> {
        self.surface.public_snapshot()
    }

    // =========================================================================
    // Surface access (for the rendering backends)
    // =========================================================================

    /// The surface, for driving a backend call by hand.
    pub fn surface_mut(&mut self) -> &mut PixelSurface {
        &mut self.surface
    }
}

// =============================================================================
// Tests
// =============================================================================
