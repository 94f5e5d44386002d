//! Registration key types.

use std::fmt;
use std::sync::Arc;

use crate::types::ServiceType;

/// Key for registration storage and lookup.
///
/// A key pairs the requested [`ServiceType`] with an optional name. The empty
/// name and `None` both denote the default registration, so `Key::new(t, Some(""))`
/// and `Key::default_of(t)` are the same key.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Key, ServiceType};
///
/// let logger = ServiceType::interface("ILogger");
///
/// let default = Key::default_of(logger.clone());
/// assert!(default.is_default());
/// assert_eq!(default, Key::new(logger.clone(), Some("")));
///
/// let named = Key::named(logger, "console");
/// assert_eq!(named.name(), Some("console"));
/// assert_eq!(named.to_string(), "ILogger[console]");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    service: ServiceType,
    name: Option<Arc<str>>,
}

impl Key {
    pub fn new(service: ServiceType, name: Option<&str>) -> Self {
        let name = name.filter(|n| !n.is_empty()).map(Arc::from);
        Self { service, name }
    }

    /// Key for the default (unnamed) registration of `service`.
    pub fn default_of(service: ServiceType) -> Self {
        Self {
            service,
            name: None,
        }
    }

    pub fn named(service: ServiceType, name: &str) -> Self {
        Self::new(service, Some(name))
    }

    /// Key for the Rust type `T`, see [`ServiceType::of`].
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::default_of(ServiceType::of::<T>())
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    /// Registration name, `None` for the default registration.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }

    /// The type name, used in diagnostics.
    pub fn display_name(&self) -> &str {
        self.service.name()
    }

    /// Same name, different service type.
    pub fn with_service(&self, service: ServiceType) -> Self {
        Self {
            service,
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.service, name),
            None => write!(f, "{}", self.service),
        }
    }
}
