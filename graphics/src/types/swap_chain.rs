//! Swap-chain and display-mode descriptors.

use bitflags::bitflags;

use super::texture::{BindFlags, Format, SampleDescription};

/// Rational number, used for refresh rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float, or 0 when the denominator is 0.
    pub fn as_f32(&self) -> f32 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f32 / self.denominator as f32
        }
    }
}

/// How an image is scaled onto the output in full-screen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayScaling {
    #[default]
    Unspecified,
    Centered,
    Stretched,
}

/// Scanline drawing order of a display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanlineOrdering {
    #[default]
    Unspecified,
    Progressive,
    UpperFieldFirst,
    LowerFieldFirst,
}

/// A display mode supported by an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: Rational,
    pub format: Format,
    pub scanline_ordering: ScanlineOrdering,
    pub scaling: DisplayScaling,
}

impl DisplayMode {
    pub fn new(width: u32, height: u32, refresh_rate: Rational, format: Format) -> Self {
        Self {
            width,
            height,
            refresh_rate,
            format,
            scanline_ordering: ScanlineOrdering::Progressive,
            scaling: DisplayScaling::Unspecified,
        }
    }
}

/// How back buffers are scaled onto the window when sizes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwapScaling {
    #[default]
    Stretch,
    None,
    AspectRatioStretch,
}

/// What happens to a back buffer after it is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwapEffect {
    #[default]
    Discard,
    Sequential,
    FlipSequential,
    FlipDiscard,
}

bitflags! {
    /// Swap-chain behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwapChainFlags: u32 {
        const NONPREROTATED = 1 << 0;
        /// Full-screen transitions may change the display mode.
        const ALLOW_MODE_SWITCH = 1 << 1;
        const GDI_COMPATIBLE = 1 << 2;
        const FRAME_LATENCY_WAITABLE_OBJECT = 1 << 6;
    }
}

impl Default for SwapChainFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Flags passed to a present call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PresentFlags: u32 {
        /// Only check whether presentation would succeed.
        const TEST = 1 << 0;
        const DO_NOT_SEQUENCE = 1 << 1;
        const RESTART = 1 << 2;
        const DO_NOT_WAIT = 1 << 3;
    }
}

impl Default for PresentFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapChainDescriptor {
    /// Back-buffer width in pixels.
    pub width: u32,
    /// Back-buffer height in pixels.
    pub height: u32,
    pub format: Format,
    pub stereo: bool,
    pub sample: SampleDescription,
    /// Back-buffer usage; always includes [`BindFlags::RENDER_TARGET`].
    pub usage: BindFlags,
    pub buffer_count: u32,
    pub scaling: SwapScaling,
    pub swap_effect: SwapEffect,
    pub flags: SwapChainFlags,
}

impl SwapChainDescriptor {
    /// Desktop defaults: BGRA8, one sample, one buffer, stretch scaling,
    /// discard effect, mode switching allowed.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: Format::B8G8R8A8Unorm,
            stereo: false,
            sample: SampleDescription::default(),
            usage: BindFlags::RENDER_TARGET,
            buffer_count: 1,
            scaling: SwapScaling::Stretch,
            swap_effect: SwapEffect::Discard,
            flags: SwapChainFlags::ALLOW_MODE_SWITCH,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_sample(mut self, sample: SampleDescription) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn with_flags(mut self, flags: SwapChainFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Full-screen parameters of a swap chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FullScreenDescriptor {
    pub refresh_rate: Rational,
    pub scanline_ordering: ScanlineOrdering,
    pub scaling: DisplayScaling,
    /// Start in windowed mode.
    pub windowed: bool,
}

impl Default for FullScreenDescriptor {
    /// 60 Hz, centered, windowed.
    fn default() -> Self {
        Self {
            refresh_rate: Rational::new(60, 1),
            scanline_ordering: ScanlineOrdering::Unspecified,
            scaling: DisplayScaling::Centered,
            windowed: true,
        }
    }
}
