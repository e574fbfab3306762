//! I/O multiplexer (reactor).
//!
//! Maps file-descriptor handles to registered device handlers and delivers
//! readiness notifications to them. The host loop owns the blocking wait;
//! this module provides the integration point (`wait_ready` / `turn`) and
//! the dispatch rules:
//!
//! - at most one registration per handle, duplicates are a programming error,
//! - disabled entries stay registered but receive no dispatch,
//! - a handler reporting exhaustion ends the session (handler detached,
//!   close signal raised once, remaining dispatch in the cycle skipped),
//! - all other handler errors propagate to the caller unchanged.
//!
//! Dispatch is strictly sequential; handlers are never invoked concurrently
//! with each other, so devices need no internal locking.

use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use bitflags::bitflags;
use log::{debug, info};

use crate::types::CloseSignal;

// =============================================================================
// Device contract
// =============================================================================

/// What a readiness handler reports back to the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFlow {
    /// Data was consumed; keep the device registered.
    Continue,
    /// No more data will ever be available on this source.
    ///
    /// An explicit value rather than an error: exhaustion is the expected
    /// end of a session, and the reactor converts it into a close request.
    Exhausted,
}

/// A pollable I/O source (secure-element link, mirror-control channel, ...).
///
/// `on_readable` is only invoked when the handle has been reported readable,
/// so implementations may read without blocking.
pub trait IoDevice {
    /// Stable readiness-source identifier for this device.
    fn fd(&self) -> RawFd;

    /// Consume available data. I/O errors propagate out of the dispatch
    /// cycle unchanged.
    fn on_readable(&mut self) -> io::Result<DeviceFlow>;
}

bitflags! {
    /// Readiness reported by the wait primitive for one handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Readiness: u8 {
        const READABLE = 0b001;
        const HANG_UP  = 0b010;
        const ERROR    = 0b100;
    }
}

impl Readiness {
    /// Conditions that warrant invoking the handler. Hang-up and error wake
    /// the handler too, so it can observe EOF and report exhaustion.
    pub fn wakes(self) -> bool {
        self.intersects(Self::READABLE | Self::HANG_UP | Self::ERROR)
    }
}

// =============================================================================
// Reactor
// =============================================================================

struct Registration {
    device: Box<dyn IoDevice>,
    enabled: bool,
}

/// Dispatches readiness notifications from registered devices.
pub struct Reactor {
    devices: HashMap<RawFd, Registration>,
    close: CloseSignal,
}

impl Reactor {
    /// Create a reactor that raises `close` when a device is exhausted.
    pub fn new(close: CloseSignal) -> Self {
        Self {
            devices: HashMap::new(),
            close,
        }
    }

    /// Register a device, initially enabled.
    ///
    /// # Panics
    ///
    /// Panics if the device's handle is already registered. One live
    /// registration per handle; register again only after `remove`.
    pub fn register(&mut self, device: Box<dyn IoDevice>) {
        let fd = device.fd();
        assert!(
            !self.devices.contains_key(&fd),
            "device already registered for fd {fd}",
        );
        debug!("registering device on fd {fd}");
        self.devices.insert(
            fd,
            Registration {
                device,
                enabled: true,
            },
        );
    }

    /// Toggle readiness delivery without detaching the device.
    ///
    /// # Panics
    ///
    /// Panics if no device is registered for `fd`.
    pub fn set_enabled(&mut self, fd: RawFd, enabled: bool) {
        let reg = self
            .devices
            .get_mut(&fd)
            .unwrap_or_else(|| panic!("no device registered for fd {fd}"));
        reg.enabled = enabled;
    }

    /// Detach a device. Disables first; no callback fires after removal.
    /// The handle may be registered again afterwards as a fresh entry.
    ///
    /// # Panics
    ///
    /// Panics if no device is registered for `fd`.
    pub fn remove(&mut self, fd: RawFd) {
        self.set_enabled(fd, false);
        self.devices.remove(&fd);
        debug!("removed device on fd {fd}");
    }

    /// Is a device currently registered for this handle?
    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.devices.contains_key(&fd)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Deliver one readiness cycle.
    ///
    /// Handles are dispatched sequentially. Registration and enablement are
    /// re-checked per handle, so a removal or disable that happened earlier
    /// in the same cycle suppresses delivery. Exhaustion raises the close
    /// signal once and skips the rest of the cycle; the session is ending,
    /// nothing else is worth delivering.
    pub fn dispatch_ready(&mut self, ready: &[RawFd]) -> io::Result<()> {
        for &fd in ready {
            if self.close.is_raised() {
                break;
            }
            let Some(reg) = self.devices.get_mut(&fd) else {
                continue;
            };
            if !reg.enabled {
                continue;
            }
            let flow = reg.device.on_readable()?;
            if flow == DeviceFlow::Exhausted {
                info!("device on fd {fd} exhausted, closing session");
                self.devices.remove(&fd);
                self.close.raise();
            }
        }
        Ok(())
    }

    /// Block until an enabled handle becomes readable or `timeout` expires.
    ///
    /// Returns the handles to feed into `dispatch_ready`. `None` blocks
    /// indefinitely. Disabled registrations are not polled at all, so a
    /// readable-but-disabled source cannot spin the loop.
    #[cfg(unix)]
    pub fn wait_ready(&self, timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        let mut fds: Vec<libc::pollfd> = self
            .devices
            .iter()
            .filter(|(_, reg)| reg.enabled)
            .map(|(&fd, _)| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        if fds.is_empty() {
            return Ok(Vec::new());
        }

        let timeout_ms = match timeout {
            Some(t) => t.as_millis().min(i32::MAX as u128) as libc::c_int,
            None => -1,
        };

        loop {
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
            if rc >= 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }

        Ok(fds
            .iter()
            .filter(|p| readiness_of(p.revents).wakes())
            .map(|p| p.fd)
            .collect())
    }

    /// One host-loop turn: wait for readiness, then dispatch it.
    ///
    /// Returns the handles that were dispatched this cycle.
    #[cfg(unix)]
    pub fn turn(&mut self, timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        let ready = self.wait_ready(timeout)?;
        self.dispatch_ready(&ready)?;
        Ok(ready)
    }
}

#[cfg(unix)]
fn readiness_of(revents: libc::c_short) -> Readiness {
    let mut r = Readiness::empty();
    if revents & libc::POLLIN != 0 {
        r |= Readiness::READABLE;
    }
    if revents & libc::POLLHUP != 0 {
        r |= Readiness::HANG_UP;
    }
    if revents & libc::POLLERR != 0 {
        r |= Readiness::ERROR;
    }
    r
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted device: pops one flow result per dispatch and counts calls.
    struct FakeDevice {
        fd: RawFd,
        script: Vec<io::Result<DeviceFlow>>,
        calls: Rc<RefCell<u32>>,
    }

    impl FakeDevice {
        fn boxed(fd: RawFd, script: Vec<io::Result<DeviceFlow>>) -> (Box<Self>, Rc<RefCell<u32>>) {
            let calls = Rc::new(RefCell::new(0));
            (
                Box::new(Self {
                    fd,
                    script,
                    calls: calls.clone(),
                }),
                calls,
            )
        }

        fn quiet(fd: RawFd) -> (Box<Self>, Rc<RefCell<u32>>) {
            Self::boxed(fd, vec![])
        }
    }

    impl IoDevice for FakeDevice {
        fn fd(&self) -> RawFd {
            self.fd
        }

        fn on_readable(&mut self) -> io::Result<DeviceFlow> {
            *self.calls.borrow_mut() += 1;
            if self.script.is_empty() {
                Ok(DeviceFlow::Continue)
            } else {
                self.script.remove(0)
            }
        }
    }

    fn reactor() -> (Reactor, CloseSignal) {
        let close = CloseSignal::new();
        (Reactor::new(close.clone()), close)
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration_panics() {
        let (mut reactor, _close) = reactor();
        reactor.register(FakeDevice::quiet(3).0);
        reactor.register(FakeDevice::quiet(3).0);
    }

    #[test]
    fn test_register_after_remove_is_a_fresh_entry() {
        let (mut reactor, _close) = reactor();
        reactor.register(FakeDevice::quiet(3).0);
        reactor.remove(3);
        assert!(!reactor.is_registered(3));
        reactor.register(FakeDevice::quiet(3).0);
        assert!(reactor.is_registered(3));
    }

    #[test]
    fn test_disabled_device_receives_no_dispatch() {
        let (mut reactor, _close) = reactor();
        let (dev, calls) = FakeDevice::quiet(5);
        reactor.register(dev);

        reactor.set_enabled(5, false);
        reactor.dispatch_ready(&[5]).unwrap();
        assert_eq!(*calls.borrow(), 0);

        reactor.set_enabled(5, true);
        reactor.dispatch_ready(&[5]).unwrap();
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_dispatch_skips_unregistered_handles() {
        let (mut reactor, _close) = reactor();
        // A handle that became stale between wait and dispatch.
        reactor.dispatch_ready(&[42]).unwrap();
    }

    #[test]
    fn test_exhaustion_raises_close_once_and_stops_cycle() {
        let (mut reactor, close) = reactor();
        let (a, a_calls) = FakeDevice::boxed(1, vec![Ok(DeviceFlow::Exhausted)]);
        let (b, b_calls) = FakeDevice::boxed(2, vec![Ok(DeviceFlow::Exhausted)]);
        reactor.register(a);
        reactor.register(b);

        reactor.dispatch_ready(&[1, 2]).unwrap();

        assert!(close.is_raised());
        // The second device was never reached: the cycle stopped at close.
        assert_eq!(*a_calls.borrow() + *b_calls.borrow(), 1);
        // The exhausted handler was torn down with the session.
        assert!(!reactor.is_registered(1));
    }

    #[test]
    fn test_handler_errors_propagate_unchanged() {
        let (mut reactor, close) = reactor();
        let (dev, _calls) = FakeDevice::boxed(
            7,
            vec![Err(io::Error::new(io::ErrorKind::ConnectionReset, "boom"))],
        );
        reactor.register(dev);

        let err = reactor.dispatch_ready(&[7]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        // An I/O error is not exhaustion; the session stays open.
        assert!(!close.is_raised());
    }

    #[test]
    fn test_continue_keeps_device_registered() {
        let (mut reactor, close) = reactor();
        let (dev, calls) = FakeDevice::boxed(9, vec![Ok(DeviceFlow::Continue)]);
        reactor.register(dev);

        reactor.dispatch_ready(&[9]).unwrap();
        assert_eq!(*calls.borrow(), 1);
        assert!(reactor.is_registered(9));
        assert!(!close.is_raised());
    }

    #[cfg(unix)]
    mod pipe {
        use super::*;
        use std::io::Read;
        use std::os::fd::FromRawFd;

        /// Device backed by the read end of a real pipe.
        struct PipeDevice {
            file: std::fs::File,
            fd: RawFd,
        }

        impl IoDevice for PipeDevice {
            fn fd(&self) -> RawFd {
                self.fd
            }

            fn on_readable(&mut self) -> io::Result<DeviceFlow> {
                let mut buf = [0u8; 16];
                match self.file.read(&mut buf)? {
                    0 => Ok(DeviceFlow::Exhausted),
                    _ => Ok(DeviceFlow::Continue),
                }
            }
        }

        fn pipe_pair() -> (PipeDevice, std::fs::File) {
            let mut fds = [0 as RawFd; 2];
            let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
            assert_eq!(rc, 0, "pipe() failed");
            let reader = unsafe { std::fs::File::from_raw_fd(fds[0]) };
            let writer = unsafe { std::fs::File::from_raw_fd(fds[1]) };
            (
                PipeDevice {
                    file: reader,
                    fd: fds[0],
                },
                writer,
            )
        }

        #[test]
        fn test_wait_ready_sees_pipe_data() {
            use std::io::Write;

            let (dev, mut writer) = pipe_pair();
            let fd = dev.fd;
            let (mut reactor, close) = super::reactor();
            reactor.register(Box::new(dev));

            // Nothing written yet: a zero timeout reports no readiness.
            let ready = reactor.wait_ready(Some(Duration::ZERO)).unwrap();
            assert!(ready.is_empty());

            writer.write_all(b"x").unwrap();
            let ready = reactor.turn(Some(Duration::from_secs(5))).unwrap();
            assert_eq!(ready, vec![fd]);
            assert!(!close.is_raised());

            // Closing the write end makes the next read return 0 bytes,
            // which the device reports as exhaustion.
            drop(writer);
            reactor.turn(Some(Duration::from_secs(5))).unwrap();
            assert!(close.is_raised());
        }

        #[test]
        fn test_wait_ready_ignores_disabled_fds() {
            use std::io::Write;

            let (dev, mut writer) = pipe_pair();
            let fd = dev.fd;
            let (mut reactor, _close) = super::reactor();
            reactor.register(Box::new(dev));
            writer.write_all(b"x").unwrap();

            reactor.set_enabled(fd, false);
            let ready = reactor.wait_ready(Some(Duration::ZERO)).unwrap();
            assert!(ready.is_empty());

            reactor.set_enabled(fd, true);
            let ready = reactor.wait_ready(Some(Duration::ZERO)).unwrap();
            assert_eq!(ready, vec![fd]);
        }
    }
}
