//! Core error types.

use thiserror::Error;

/// Errors raised by core building blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A property fixed at construction was assigned a different value.
    #[error("property `{property}` is immutable for component {component}")]
    ImmutableProperty {
        /// Name of the property.
        property: &'static str,
        /// Display form of the component that rejected the change.
        component: String,
    },
}
