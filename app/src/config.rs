//! Application configuration.

use lumen_graphics::{DeviceOptions, FeatureLevel, DEFAULT_DPI, DEFAULT_FEATURE_LEVELS};

/// Configuration of an [`Application`](crate::Application).
///
/// # Example
///
/// ```
/// use lumen_app::AppConfig;
///
/// let config = AppConfig::new("viewer").with_vsync(false).with_dpi(144.0);
/// assert_eq!(config.name, "viewer");
/// assert!(!config.vsync);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Name of the application component, used in log output.
    pub name: String,
    /// Wait for the vertical blank when presenting.
    pub vsync: bool,
    /// DPI the device is initialized with.
    pub dpi: f32,
    /// Feature levels to try, most preferred first.
    pub feature_levels: Vec<FeatureLevel>,
    /// Create the device with the debug layer.
    pub debug_device: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Lumen App".to_string(),
            vsync: true,
            dpi: DEFAULT_DPI,
            feature_levels: DEFAULT_FEATURE_LEVELS.to_vec(),
            debug_device: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_feature_levels(mut self, levels: impl Into<Vec<FeatureLevel>>) -> Self {
        self.feature_levels = levels.into();
        self
    }

    pub fn with_debug_device(mut self, debug: bool) -> Self {
        self.debug_device = debug;
        self
    }

    /// Options the device manager is created with.
    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions::default()
            .with_feature_levels(self.feature_levels.clone())
            .with_debug(self.debug_device)
    }
}
