//! Device models.
//!
//! Each emulated device model fixes the screen geometry, the box margin used
//! for pointer translation, the legal palette and which rendering backend
//! family drives it. All of this is constant for the lifetime of a session.

use crate::types::Color;

// =============================================================================
// Backend selection
// =============================================================================

/// Which rendering backend family a model is driven by.
///
/// Selected once at session construction; the display façade holds a single
/// polymorphic backend handle afterwards, never branching on the model name
/// at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Legacy bitmap-graphics backend (button-driven devices).
    Bitmap,
    /// Vector/touchscreen backend.
    Vector,
}

// =============================================================================
// Models
// =============================================================================

/// Emulated device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    NanoS,
    NanoX,
    NanoSP,
    Blue,
    Stax,
}

/// Static description of one device model.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Human-readable model name.
    pub name: &'static str,
    /// Drawable screen size in device pixels (width, height).
    pub screen_size: (u16, u16),
    /// Offset of the drawable area inside the device face, in device pixels.
    pub box_position: (u16, u16),
    /// Extra margin the device face adds around the drawable area.
    pub box_size: (u16, u16),
    /// Legal pixel colors. Monochrome models draw with exactly two colors;
    /// color models take the full RGB range and leave this empty.
    pub palette: &'static [Color],
    /// Backend family that drives this model.
    pub backend: BackendKind,
}

/// Foreground color of the monochrome Nano screens.
const NANO_FG: Color = Color(0x00FFFB);

const NANO_PALETTE: &[Color] = &[Color::BLACK, NANO_FG];

static NANOS: ModelSpec = ModelSpec {
    name: "Nano S",
    screen_size: (128, 32),
    box_position: (20, 13),
    box_size: (100, 26),
    palette: NANO_PALETTE,
    backend: BackendKind::Bitmap,
};

static NANOX: ModelSpec = ModelSpec {
    name: "Nano X",
    screen_size: (128, 64),
    box_position: (5, 5),
    box_size: (10, 10),
    palette: NANO_PALETTE,
    backend: BackendKind::Bitmap,
};

static NANOSP: ModelSpec = ModelSpec {
    name: "Nano SP",
    screen_size: (128, 64),
    box_position: (5, 5),
    box_size: (10, 10),
    palette: NANO_PALETTE,
    backend: BackendKind::Bitmap,
};

static BLUE: ModelSpec = ModelSpec {
    name: "Blue",
    screen_size: (320, 480),
    box_position: (13, 13),
    box_size: (26, 26),
    palette: &[],
    backend: BackendKind::Bitmap,
};

static STAX: ModelSpec = ModelSpec {
    name: "Stax",
    screen_size: (400, 672),
    box_position: (13, 13),
    box_size: (26, 26),
    palette: &[],
    backend: BackendKind::Vector,
};

impl DeviceModel {
    /// Static spec for this model.
    pub fn spec(self) -> &'static ModelSpec {
        match self {
            DeviceModel::NanoS => &NANOS,
            DeviceModel::NanoX => &NANOX,
            DeviceModel::NanoSP => &NANOSP,
            DeviceModel::Blue => &BLUE,
            DeviceModel::Stax => &STAX,
        }
    }

    /// Screen width in device pixels.
    #[inline]
    pub fn width(self) -> u16 {
        self.spec().screen_size.0
    }

    /// Screen height in device pixels.
    #[inline]
    pub fn height(self) -> u16 {
        self.spec().screen_size.1
    }

    /// Does this model have a touchscreen?
    #[inline]
    pub fn is_touch(self) -> bool {
        matches!(self.spec().backend, BackendKind::Vector)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nano_models_are_bitmap() {
        for model in [DeviceModel::NanoS, DeviceModel::NanoX, DeviceModel::NanoSP] {
            assert_eq!(model.spec().backend, BackendKind::Bitmap);
            assert!(!model.is_touch());
            assert_eq!(model.spec().palette.len(), 2);
        }
    }

    #[test]
    fn test_stax_is_vector_touch() {
        assert_eq!(DeviceModel::Stax.spec().backend, BackendKind::Vector);
        assert!(DeviceModel::Stax.is_touch());
    }

    #[test]
    fn test_screen_sizes() {
        assert_eq!(DeviceModel::NanoS.spec().screen_size, (128, 32));
        assert_eq!(DeviceModel::NanoX.width(), 128);
        assert_eq!(DeviceModel::Stax.height(), 672);
    }
}
