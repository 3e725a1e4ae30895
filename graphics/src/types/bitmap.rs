//! 2D bitmap properties.

use bitflags::bitflags;

use super::texture::Format;

/// How a bitmap's alpha channel is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Unknown,
    Premultiplied,
    Straight,
    Ignore,
}

bitflags! {
    /// Bitmap capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BitmapOptions: u32 {
        /// The bitmap can be the target of a 2D context.
        const TARGET = 1 << 0;
        /// The bitmap cannot be used as a drawing source.
        const CANNOT_DRAW = 1 << 1;
        const CPU_READ = 1 << 2;
        const GDI_COMPATIBLE = 1 << 3;
    }
}

impl Default for BitmapOptions {
    fn default() -> Self {
        Self::empty()
    }
}

/// Antialiasing mode for text drawn by a 2D context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAntialiasMode {
    #[default]
    Default,
    ClearType,
    Grayscale,
    Aliased,
}

/// Properties of a 2D bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitmapProperties {
    pub format: Format,
    pub alpha_mode: AlphaMode,
    pub dpi_x: f32,
    pub dpi_y: f32,
    pub options: BitmapOptions,
}

impl BitmapProperties {
    /// Properties of a bitmap that wraps a swap-chain back buffer so 2D
    /// drawing lands on the presented surface.
    pub fn surface_target(format: Format, dpi: f32) -> Self {
        Self {
            format,
            alpha_mode: AlphaMode::Premultiplied,
            dpi_x: dpi,
            dpi_y: dpi,
            options: BitmapOptions::TARGET | BitmapOptions::CANNOT_DRAW,
        }
    }
}
