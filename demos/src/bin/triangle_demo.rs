//! # Triangle Demo
//!
//! Demonstrates:
//! - Device and swap chain creation through the application base
//! - Vertex buffer upload from `bytemuck` vertex data
//! - Clearing, binding and drawing every frame
//! - Surface rebuild on resize, minimize handling and device-loss recovery
//!
//! Runs headless over the software backend for a fixed number of frames.
//!
//! ```bash
//! cargo run -p lumen-demos --bin triangle_demo -- --max-frames 120 --dpi 144
//! ```

use lumen_app::{AppArgs, DefaultAppArgs, MainLoop};
use lumen_demos::TriangleApp;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    lumen_core::init();
    lumen_graphics::init();
    lumen_app::init();

    let args = DefaultAppArgs::parse();
    let result = TriangleApp::new(&args).and_then(|demo| {
        let mut demo = demo.with_default_script();
        demo.run()
    });

    if let Err(err) = result {
        log::error!("Triangle demo failed: {err}");
        std::process::exit(1);
    }
}
