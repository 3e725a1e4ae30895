//! Device creation parameters.

use std::fmt;

use bitflags::bitflags;

/// Capability tier a device can be created at.
///
/// Variants are ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureLevel {
    Level9_1,
    Level9_2,
    Level9_3,
    Level10_0,
    Level10_1,
    Level11_0,
    Level11_1,
}

impl FeatureLevel {
    /// Every level, most capable first.
    pub const ALL: [FeatureLevel; 7] = [
        Self::Level11_1,
        Self::Level11_0,
        Self::Level10_1,
        Self::Level10_0,
        Self::Level9_3,
        Self::Level9_2,
        Self::Level9_1,
    ];
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Level9_1 => "9.1",
            Self::Level9_2 => "9.2",
            Self::Level9_3 => "9.3",
            Self::Level10_0 => "10.0",
            Self::Level10_1 => "10.1",
            Self::Level11_0 => "11.0",
            Self::Level11_1 => "11.1",
        };
        f.write_str(name)
    }
}

/// Default feature-level preference list, most preferred first.
pub const DEFAULT_FEATURE_LEVELS: [FeatureLevel; 2] =
    [FeatureLevel::Level11_1, FeatureLevel::Level11_0];

bitflags! {
    /// Flags used when creating a device.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceCreationFlags: u32 {
        /// The device is only used from one thread.
        const SINGLE_THREADED = 1 << 0;
        /// Enable the debug layer.
        const DEBUG = 1 << 1;
        /// Required for 2D interop on the device's surfaces.
        const BGRA_SUPPORT = 1 << 5;
        const VIDEO_SUPPORT = 1 << 11;
    }
}

impl Default for DeviceCreationFlags {
    fn default() -> Self {
        Self::BGRA_SUPPORT
    }
}
