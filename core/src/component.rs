//! Component identity and naming.
//!
//! Every lifecycle object (device manager, application, renderer) embeds a
//! [`Component`]. Its [`ComponentId`] is unique for the lifetime of the process
//! and is the key under which the object subscribes to [`Event`](crate::Event)s,
//! which is what makes subscribe and unsubscribe idempotent.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::CoreError;

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity and name of a lifecycle object.
pub struct Component {
    id: ComponentId,
    name: RwLock<Option<String>>,
    name_is_fixed: bool,
}

impl Component {
    /// Create an anonymous component.
    pub fn new() -> Self {
        Self {
            id: ComponentId::next(),
            name: RwLock::new(None),
            name_is_fixed: false,
        }
    }

    /// Create a component with a name that can be changed later.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: ComponentId::next(),
            name: RwLock::new(Some(name.into())),
            name_is_fixed: false,
        }
    }

    /// Create a component whose name is fixed for its whole lifetime.
    pub fn with_fixed_name(name: impl Into<String>) -> Self {
        Self {
            id: ComponentId::next(),
            name: RwLock::new(Some(name.into())),
            name_is_fixed: true,
        }
    }

    /// Get the component identifier.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Get the component name, if any.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// Whether the name was fixed at construction.
    pub fn is_name_fixed(&self) -> bool {
        self.name_is_fixed
    }

    /// Rename the component.
    ///
    /// Assigning the current name again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImmutableProperty`] if the name was fixed at
    /// construction and `name` differs from it.
    pub fn set_name(&self, name: Option<String>) -> Result<(), CoreError> {
        let mut current = self.name.write();
        if *current == name {
            return Ok(());
        }
        if self.name_is_fixed {
            return Err(CoreError::ImmutableProperty {
                property: "name",
                component: self.describe_with(current.as_deref()),
            });
        }
        log::trace!("Component {}: renamed {:?} -> {:?}", self.id, *current, name);
        *current = name;
        Ok(())
    }

    fn describe_with(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("{} ({name})", self.id),
            None => self.id.to_string(),
        }
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe_with(self.name.read().as_deref()))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("name", &*self.name.read())
            .field("name_is_fixed", &self.name_is_fixed)
            .finish()
    }
}

static_assertions::assert_impl_all!(Component: Send, Sync);
