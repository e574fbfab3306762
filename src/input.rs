//! Input translation - raw pointer/key events to secure-element commands.
//!
//! The host hands in window-relative pointer positions and key transitions;
//! this module applies the per-model box-offset/pixel-scale transform, the
//! screen-bounds filter, and the fixed key-to-button table, then forwards
//! commands over the secure-element link. The translator holds no state
//! between events.

use log::trace;

use crate::model::DeviceModel;
use crate::types::{BUTTON_LEFT, BUTTON_RIGHT, CloseSignal};

// =============================================================================
// Secure-element link
// =============================================================================

/// The channel carrying button/touch commands to the emulated device's
/// input-processing firmware.
pub trait SeLink {
    /// Forward a button transition (`BUTTON_LEFT` / `BUTTON_RIGHT`).
    fn handle_button(&mut self, button: u8, pressed: bool);

    /// Forward a touch transition at screen coordinates.
    fn handle_finger(&mut self, x: u16, y: u16, pressed: bool);
}

// =============================================================================
// Events
// =============================================================================

/// Keys the translator understands. Anything else never reaches it: the
/// host adapter maps unrecognized keys to `None` and drops them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    /// Both buttons at once.
    Down,
    /// Session close, acted on at release.
    Quit,
}

/// A key transition from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

/// A pointer transition from the host, in raw window-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub x: i32,
    pub y: i32,
    pub pressed: bool,
}

// =============================================================================
// Translator
// =============================================================================

/// Stateless converter from host events to secure-element commands.
///
/// The scale and box offset are fixed per device model at session start.
#[derive(Debug, Clone, Copy)]
pub struct InputTranslator {
    pixel_size: i32,
    box_x: i32,
    box_y: i32,
    width: i32,
    height: i32,
}

impl InputTranslator {
    /// Build the translator for a model at a given window magnification.
    pub fn new(model: DeviceModel, pixel_size: u16) -> Self {
        let spec = model.spec();
        Self {
            pixel_size: pixel_size as i32,
            box_x: spec.box_position.0 as i32,
            box_y: spec.box_position.1 as i32,
            width: spec.screen_size.0 as i32,
            height: spec.screen_size.1 as i32,
        }
    }

    /// Map a raw window position to screen coordinates.
    ///
    /// Returns `None` when the position falls outside the drawable area
    /// (on the device face margin, or past the screen).
    fn screen_coords(&self, raw_x: i32, raw_y: i32) -> Option<(u16, u16)> {
        let x = raw_x.div_euclid(self.pixel_size) - (self.box_x + 1);
        let y = raw_y.div_euclid(self.pixel_size) - (self.box_y + 1);
        if x >= 0 && x < self.width && y >= 0 && y < self.height {
            Some((x as u16, y as u16))
        } else {
            None
        }
    }

    /// Translate one pointer transition.
    ///
    /// In-bounds positions forward a touch command; out-of-bounds positions
    /// are dropped silently. Press and release carry their own raw position
    /// and are filtered independently.
    pub fn pointer(&self, link: &mut dyn SeLink, event: PointerEvent) {
        match self.screen_coords(event.x, event.y) {
            Some((x, y)) => link.handle_finger(x, y, event.pressed),
            None => trace!(
                "pointer ({}, {}) outside screen, dropped",
                event.x,
                event.y
            ),
        }
    }

    /// Translate one key transition.
    ///
    /// Left and Right forward their button code; Down forwards both codes
    /// with the same press state; Quit raises the close signal on release
    /// only and forwards nothing.
    pub fn key(&self, link: &mut dyn SeLink, close: &CloseSignal, event: KeyEvent) {
        match event.key {
            Key::Left => link.handle_button(BUTTON_LEFT, event.pressed),
            Key::Right => link.handle_button(BUTTON_RIGHT, event.pressed),
            Key::Down => {
                link.handle_button(BUTTON_LEFT, event.pressed);
                link.handle_button(BUTTON_RIGHT, event.pressed);
            }
            Key::Quit => {
                if !event.pressed {
                    close.raise();
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every forwarded command.
    #[derive(Default)]
    struct RecordingLink {
        buttons: Vec<(u8, bool)>,
        fingers: Vec<(u16, u16, bool)>,
    }

    impl SeLink for RecordingLink {
        fn handle_button(&mut self, button: u8, pressed: bool) {
            self.buttons.push((button, pressed));
        }

        fn handle_finger(&mut self, x: u16, y: u16, pressed: bool) {
            self.fingers.push((x, y, pressed));
        }
    }

    /// Matches the worked example: scale 2, box offset (3, 3), 128x128.
    fn touch_translator() -> InputTranslator {
        InputTranslator {
            pixel_size: 2,
            box_x: 3,
            box_y: 3,
            width: 128,
            height: 128,
        }
    }

    #[test]
    fn test_pointer_in_bounds_forwards() {
        let mut link = RecordingLink::default();
        touch_translator().pointer(
            &mut link,
            PointerEvent {
                x: 8,
                y: 8,
                pressed: true,
            },
        );
        // 8 / 2 - (3 + 1) = 0
        assert_eq!(link.fingers, vec![(0, 0, true)]);
    }

    #[test]
    fn test_pointer_on_margin_is_dropped() {
        let mut link = RecordingLink::default();
        touch_translator().pointer(
            &mut link,
            PointerEvent {
                x: 0,
                y: 0,
                pressed: true,
            },
        );
        assert!(link.fingers.is_empty());
    }

    #[test]
    fn test_pointer_past_screen_is_dropped() {
        let tr = touch_translator();
        let mut link = RecordingLink::default();
        // x maps to exactly `width`, one past the last column.
        tr.pointer(
            &mut link,
            PointerEvent {
                x: (128 + 4) * 2,
                y: 8,
                pressed: true,
            },
        );
        assert!(link.fingers.is_empty());
    }

    #[test]
    fn test_press_and_release_filtered_independently() {
        let tr = touch_translator();
        let mut link = RecordingLink::default();
        tr.pointer(
            &mut link,
            PointerEvent {
                x: 8,
                y: 8,
                pressed: true,
            },
        );
        // Release happens on the margin: dropped while the press went through.
        tr.pointer(
            &mut link,
            PointerEvent {
                x: 0,
                y: 0,
                pressed: false,
            },
        );
        assert_eq!(link.fingers, vec![(0, 0, true)]);
    }

    #[test]
    fn test_left_and_right_forward_their_codes() {
        let tr = InputTranslator::new(DeviceModel::NanoS, 2);
        let close = CloseSignal::new();
        let mut link = RecordingLink::default();

        tr.key(&mut link, &close, KeyEvent { key: Key::Left, pressed: true });
        tr.key(&mut link, &close, KeyEvent { key: Key::Left, pressed: false });
        tr.key(&mut link, &close, KeyEvent { key: Key::Right, pressed: true });

        assert_eq!(
            link.buttons,
            vec![(BUTTON_LEFT, true), (BUTTON_LEFT, false), (BUTTON_RIGHT, true)]
        );
    }

    #[test]
    fn test_down_forwards_both_buttons() {
        let tr = InputTranslator::new(DeviceModel::NanoS, 2);
        let close = CloseSignal::new();
        let mut link = RecordingLink::default();

        tr.key(&mut link, &close, KeyEvent { key: Key::Down, pressed: true });
        tr.key(&mut link, &close, KeyEvent { key: Key::Down, pressed: false });

        assert_eq!(link.buttons.len(), 4);
        let pressed: Vec<u8> = link
            .buttons
            .iter()
            .filter(|(_, p)| *p)
            .map(|(b, _)| *b)
            .collect();
        let released: Vec<u8> = link
            .buttons
            .iter()
            .filter(|(_, p)| !*p)
            .map(|(b, _)| *b)
            .collect();
        assert!(pressed.contains(&BUTTON_LEFT) && pressed.contains(&BUTTON_RIGHT));
        assert!(released.contains(&BUTTON_LEFT) && released.contains(&BUTTON_RIGHT));
    }

    #[test]
    fn test_quit_closes_on_release_only() {
        let tr = InputTranslator::new(DeviceModel::NanoS, 2);
        let close = CloseSignal::new();
        let mut link = RecordingLink::default();

        tr.key(&mut link, &close, KeyEvent { key: Key::Quit, pressed: true });
        assert!(!close.is_raised());

        tr.key(&mut link, &close, KeyEvent { key: Key::Quit, pressed: false });
        assert!(close.is_raised());
        // Nothing was forwarded to the secure element either way.
        assert!(link.buttons.is_empty());
    }

    #[test]
    fn test_nano_pointer_uses_model_box_offset() {
        // Nano S: box position (20, 13), scale 1.
        let tr = InputTranslator::new(DeviceModel::NanoS, 1);
        let mut link = RecordingLink::default();
        tr.pointer(
            &mut link,
            PointerEvent {
                x: 21,
                y: 14,
                pressed: true,
            },
        );
        assert_eq!(link.fingers, vec![(0, 0, true)]);
    }
}
