//! Command line arguments trait and default implementation.
//!
//! Uses clap for CLI parsing with:
//! - Help text (`--help`)
//! - Validation and clear error messages

use lumen_graphics::DEFAULT_DPI;

use crate::config::AppConfig;

/// Trait for parsing command line arguments.
///
/// Implement this trait to customize how your application handles command
/// line arguments. Every method except [`parse`](Self::parse) has a default,
/// so only the options you need have to be overridden.
///
/// # Example
///
/// ```
/// use lumen_app::AppArgs;
///
/// struct FixedArgs;
///
/// impl AppArgs for FixedArgs {
///     fn parse() -> Self {
///         FixedArgs
///     }
///
///     fn max_frames(&self) -> Option<u64> {
///         Some(10)
///     }
/// }
///
/// let config = FixedArgs::parse().app_config("fixed");
/// assert!(config.vsync);
/// ```
pub trait AppArgs: Sized {
    /// Parse command line arguments.
    fn parse() -> Self;

    /// Get the initial client width.
    ///
    /// Default: 1440
    fn window_width(&self) -> u32 {
        1440
    }

    /// Get the initial client height.
    ///
    /// Default: 900
    fn window_height(&self) -> u32 {
        900
    }

    /// Get whether VSync is enabled.
    ///
    /// Default: true
    fn vsync(&self) -> bool {
        true
    }

    /// Get the DPI the device is initialized with.
    ///
    /// Default: 96
    fn dpi(&self) -> f32 {
        DEFAULT_DPI
    }

    /// Get the maximum number of frames to process before auto-exit.
    ///
    /// Default: `None` (run indefinitely)
    fn max_frames(&self) -> Option<u64> {
        None
    }

    /// Get whether the device is created with the debug layer.
    ///
    /// Default: `cfg!(debug_assertions)`
    fn debug_device(&self) -> bool {
        cfg!(debug_assertions)
    }

    /// Application configuration described by these arguments.
    fn app_config(&self, name: &str) -> AppConfig {
        AppConfig::new(name)
            .with_vsync(self.vsync())
            .with_dpi(self.dpi())
            .with_debug_device(self.debug_device())
    }
}

/// Default command line arguments implementation.
///
/// # Examples
///
/// ```bash
/// # Show help
/// ./my_app --help
///
/// # Render 100 frames at 1920x1080 without vsync, then exit
/// ./my_app --width 1920 --height 1080 --no-vsync --max-frames 100
///
/// # High-DPI rendering with the debug layer
/// ./my_app --dpi 192 --debug-device
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAppArgs {
    width: u32,
    height: u32,
    vsync: bool,
    dpi: f32,
    max_frames: Option<u64>,
    debug_device: bool,
}

impl Default for DefaultAppArgs {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
            vsync: true,
            dpi: DEFAULT_DPI,
            max_frames: None,
            debug_device: cfg!(debug_assertions),
        }
    }
}

impl DefaultAppArgs {
    /// Set the window size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_debug_device(mut self, debug_device: bool) -> Self {
        self.debug_device = debug_device;
        self
    }

    /// Parse from an explicit argument list instead of the process arguments.
    pub fn parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::Parser;
        native::ClapArgs::try_parse_from(args).map(Into::into)
    }
}

mod native {
    use super::*;
    use clap::Parser;

    /// Lumen application arguments.
    #[derive(Parser, Debug)]
    #[command(
        name = "Lumen App",
        about = "Lumen graphics application",
        long_about = "A graphics application built on the Lumen lifecycle layer.\n\n\
            EXAMPLES:\n\
              # Run 10 frames and exit\n\
              ./app --max-frames 10\n\
            \n\
              # Render at 150% scale\n\
              ./app --dpi 144",
        version
    )]
    pub(super) struct ClapArgs {
        /// Initial client width in device-independent pixels.
        #[arg(long, default_value = "1440")]
        pub width: u32,

        /// Initial client height in device-independent pixels.
        #[arg(long, default_value = "900")]
        pub height: u32,

        /// Disable vertical sync (may cause tearing).
        #[arg(long)]
        pub no_vsync: bool,

        /// Dots per inch the device renders at.
        #[arg(long, default_value = "96", value_parser = parse_dpi)]
        pub dpi: f32,

        /// Exit after rendering N frames (useful for testing).
        #[arg(long)]
        pub max_frames: Option<u64>,

        /// Create the device with the debug layer (slower but helps catch bugs).
        #[arg(long, conflicts_with = "no_debug_device")]
        pub debug_device: bool,

        /// Create the device without the debug layer.
        #[arg(long, conflicts_with = "debug_device")]
        pub no_debug_device: bool,
    }

    fn parse_dpi(value: &str) -> Result<f32, String> {
        let dpi: f32 = value.parse().map_err(|err| format!("{err}"))?;
        if dpi.is_nan() || dpi <= 0.0 {
            return Err(format!("dpi must be positive, got {value}"));
        }
        Ok(dpi)
    }

    impl From<ClapArgs> for DefaultAppArgs {
        fn from(args: ClapArgs) -> Self {
            // --debug-device forces on, --no-debug-device forces off, otherwise debug builds
            let debug_device =
                args.debug_device || (!args.no_debug_device && cfg!(debug_assertions));

            Self {
                width: args.width,
                height: args.height,
                vsync: !args.no_vsync,
                dpi: args.dpi,
                max_frames: args.max_frames,
                debug_device,
            }
        }
    }
}

impl AppArgs for DefaultAppArgs {
    fn parse() -> Self {
        use clap::Parser;
        native::ClapArgs::parse().into()
    }

    fn window_width(&self) -> u32 {
        self.width
    }

    fn window_height(&self) -> u32 {
        self.height
    }

    fn vsync(&self) -> bool {
        self.vsync
    }

    fn dpi(&self) -> f32 {
        self.dpi
    }

    fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    fn debug_device(&self) -> bool {
        self.debug_device
    }
}
