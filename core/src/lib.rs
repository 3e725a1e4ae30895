//! # Lumen Core
//!
//! Building blocks shared by every Lumen lifecycle object.
//!
//! - [`Component`] - Identity and naming for lifecycle objects
//! - [`DisposalRegistry`] - Deterministic, exactly-once release of native handles
//! - [`Event`] - Ordered observer lists with synchronous dispatch

pub mod component;
pub mod disposal;
pub mod error;
pub mod event;

pub use component::{Component, ComponentId};
pub use disposal::{DisposalRegistry, ResourceKey, Tracked};
pub use error::CoreError;
pub use event::Event;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Lumen Core v{} initialized", VERSION);
}
