//! # secscreen
//!
//! Framebuffer and I/O core for a hardware security device emulator.
//!
//! The crate emulates the display subsystem of a button/touchscreen secure
//! device: an off-screen pixel surface that the rendering backends write
//! into, a reactor that multiplexes the device's I/O sources into the host
//! loop, and the translation layer between raw host input and
//! secure-element commands.
//!
//! ## Architecture
//!
//! ```text
//! backend -> PixelSurface.write_pixel -> dirty set
//!                                          |
//!                 Display.screen_update -> Broadcaster
//!                                          |-> ScreenTarget (scaled frame + repaint)
//!                                          |-> DiffSink (raw diff, mirror)
//!                                          `-> working snapshot -> publish -> public snapshot
//!
//! host event -> InputTranslator -> SeLink (buttons / touch)
//! device fd  -> Reactor -> on_readable -> exhaustion -> CloseSignal
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Colors, diffs, button codes, the session close signal
//! - [`model`] - Device models (geometry, palette, backend family)
//! - [`surface`] - Dirty-tracked framebuffer and screenshot snapshots
//! - [`reactor`] - File-descriptor multiplexer driving the device handlers
//! - [`input`] - Pointer/key translation to secure-element commands
//! - [`broadcast`] - Flush fan-out to the screen target and mirror sink
//! - [`backend`] - Seam to the external rendering backends
//! - [`display`] - The session façade tying it all together
//! - [`term`] - Terminal stand-in for the windowing chrome

pub mod backend;
pub mod broadcast;
pub mod display;
pub mod input;
pub mod model;
pub mod reactor;
pub mod surface;
pub mod term;
pub mod types;

// Re-export commonly used items
pub use types::{BUTTON_LEFT, BUTTON_RIGHT, CloseSignal, Color, PixelDiff, TextEvent};

pub use model::{BackendKind, DeviceModel, ModelSpec};

pub use surface::{DiffSink, Frame, PixelSurface};

pub use reactor::{DeviceFlow, IoDevice, Reactor, Readiness};

pub use input::{InputTranslator, Key, KeyEvent, PointerEvent, SeLink};

pub use broadcast::{Broadcaster, ScreenTarget};

pub use backend::RenderBackend;

pub use display::Display;

pub use term::{HostInput, TerminalScreen, map_event};
