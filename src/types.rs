//! Runtime type descriptors.
//!
//! Rust has no runtime reflection, so every type the engine reasons about is
//! described by a [`ServiceType`]: a name plus a [`TypeKind`] that tells the
//! constructor selector whether the type is an interface, a concrete class, a
//! primitive and so on. Two descriptors are equal when their names are equal.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{DiError, DiResult};

static ENUMERABLE: Lazy<ServiceType> =
    Lazy::new(|| ServiceType::generic_interface_definition("Enumerable", 1));

/// Shape of a described type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A class; abstract classes cannot be constructed
    Class { is_abstract: bool },
    /// An interface (trait object in Rust terms)
    Interface,
    /// Numbers, booleans, characters
    Primitive,
    /// Strings
    String,
    /// Enumerations
    Enum,
    /// Callables
    Delegate,
    /// Array of an element type
    Array(ServiceType),
    /// Open generic shape such as `Repository<_>`
    GenericDefinition {
        base: String,
        arity: usize,
        is_interface: bool,
    },
    /// Generic definition closed over concrete arguments
    Generic {
        definition: ServiceType,
        arguments: Vec<ServiceType>,
    },
}

struct TypeDef {
    name: String,
    kind: TypeKind,
}

/// Cheaply clonable descriptor of a type known to the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::ServiceType;
///
/// let repo = ServiceType::generic_definition("Repository", 1);
/// let user = ServiceType::class("User");
/// let closed = repo.close(&[user]).unwrap();
///
/// assert_eq!(closed.name(), "Repository<User>");
/// assert_eq!(closed.definition(), Some(&repo));
/// ```
#[derive(Clone)]
pub struct ServiceType(Arc<TypeDef>);

impl ServiceType {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        ServiceType(Arc::new(TypeDef {
            name: name.into(),
            kind,
        }))
    }

    /// Descriptor of the Rust type `T`.
    ///
    /// Numbers, `bool` and `char` are primitives, `String` and `str` are
    /// strings; every other type is a concrete class.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let id = TypeId::of::<T>();
        let kind = if id == TypeId::of::<String>() || id == TypeId::of::<str>() || id == TypeId::of::<&'static str>() {
            TypeKind::String
        } else if is_primitive(id) {
            TypeKind::Primitive
        } else {
            TypeKind::Class { is_abstract: false }
        };
        Self::new(std::any::type_name::<T>(), kind)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class { is_abstract: false })
    }

    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class { is_abstract: true })
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Interface named after a trait object type, e.g. `interface_of::<dyn Logger>()`.
    pub fn interface_of<T: ?Sized + 'static>() -> Self {
        Self::interface(std::any::type_name::<T>())
    }

    pub fn primitive<T: 'static>() -> Self {
        Self::new(std::any::type_name::<T>(), TypeKind::Primitive)
    }

    pub fn string() -> Self {
        Self::new(std::any::type_name::<String>(), TypeKind::String)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Enum)
    }

    pub fn delegate(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Delegate)
    }

    pub fn array_of(element: ServiceType) -> Self {
        Self::new(format!("[{}]", element.name()), TypeKind::Array(element))
    }

    /// Open generic class definition with `arity` type parameters.
    pub fn generic_definition(base: impl Into<String>, arity: usize) -> Self {
        Self::open_shape(base.into(), arity, false)
    }

    /// Open generic interface definition with `arity` type parameters.
    pub fn generic_interface_definition(base: impl Into<String>, arity: usize) -> Self {
        Self::open_shape(base.into(), arity, true)
    }

    fn open_shape(base: String, arity: usize, is_interface: bool) -> Self {
        let holes = vec!["_"; arity].join(", ");
        Self::new(
            format!("{}<{}>", base, holes),
            TypeKind::GenericDefinition {
                base,
                arity,
                is_interface,
            },
        )
    }

    /// The built-in "enumerable of element" definition.
    pub fn enumerable_definition() -> Self {
        ENUMERABLE.clone()
    }

    pub fn enumerable_of(element: ServiceType) -> Self {
        Self::closed(Self::enumerable_definition(), vec![element])
    }

    fn closed(definition: ServiceType, arguments: Vec<ServiceType>) -> Self {
        let base = match definition.kind() {
            TypeKind::GenericDefinition { base, .. } => base.clone(),
            _ => definition.name().to_string(),
        };
        let args = arguments
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            format!("{}<{}>", base, args),
            TypeKind::Generic {
                definition,
                arguments,
            },
        )
    }

    /// Closes this generic definition over `arguments`.
    pub fn close(&self, arguments: &[ServiceType]) -> DiResult<ServiceType> {
        match self.kind() {
            TypeKind::GenericDefinition { arity, .. } if *arity == arguments.len() => {
                Ok(Self::closed(self.clone(), arguments.to_vec()))
            }
            TypeKind::GenericDefinition { arity, .. } => Err(DiError::invalid(
                self.name(),
                format!("expected {} type arguments, got {}", arity, arguments.len()),
            )),
            _ => Err(DiError::invalid(self.name(), "not a generic definition")),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    pub fn is_interface(&self) -> bool {
        match self.kind() {
            TypeKind::Interface => true,
            TypeKind::GenericDefinition { is_interface, .. } => *is_interface,
            TypeKind::Generic { definition, .. } => definition.is_interface(),
            _ => false,
        }
    }

    pub fn is_generic_definition(&self) -> bool {
        matches!(self.kind(), TypeKind::GenericDefinition { .. })
    }

    /// Definition of a closed generic; `None` for every other kind.
    pub fn definition(&self) -> Option<&ServiceType> {
        match self.kind() {
            TypeKind::Generic { definition, .. } => Some(definition),
            _ => None,
        }
    }

    pub fn generic_arguments(&self) -> &[ServiceType] {
        match self.kind() {
            TypeKind::Generic { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Element type when this is `Enumerable<E>`.
    pub fn enumerable_element(&self) -> Option<&ServiceType> {
        match self.kind() {
            TypeKind::Generic {
                definition,
                arguments,
            } if *definition == *ENUMERABLE => arguments.first(),
            _ => None,
        }
    }

    /// Non-abstract class that the engine may try to construct without a registration.
    pub fn is_constructible(&self) -> bool {
        match self.kind() {
            TypeKind::Class { is_abstract } => !is_abstract,
            TypeKind::Generic { definition, .. } => matches!(
                definition.kind(),
                TypeKind::GenericDefinition {
                    is_interface: false,
                    ..
                }
            ),
            _ => false,
        }
    }
}

fn is_primitive(id: TypeId) -> bool {
    [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
    ]
    .contains(&id)
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceType({})", self.name())
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_checks_arity() {
        let map = ServiceType::generic_definition("Map", 2);
        let err = map.close(&[ServiceType::string()]).unwrap_err();
        assert!(matches!(err, DiError::InvalidRegistration { .. }));

        let closed = map
            .close(&[ServiceType::string(), ServiceType::primitive::<u32>()])
            .unwrap();
        assert_eq!(closed.name(), "Map<alloc::string::String, u32>");
        assert!(closed.is_constructible());
    }

    #[test]
    fn enumerable_is_an_interface_shape() {
        let items = ServiceType::enumerable_of(ServiceType::interface("IPlugin"));
        assert!(items.is_interface());
        assert!(!items.is_constructible());
        assert_eq!(items.enumerable_element().map(|e| e.name()), Some("IPlugin"));
    }

    #[test]
    fn rust_primitives_and_strings_are_not_classes() {
        assert_eq!(ServiceType::of::<u16>().kind(), &TypeKind::Primitive);
        assert_eq!(ServiceType::of::<bool>().kind(), &TypeKind::Primitive);
        assert_eq!(ServiceType::of::<String>().kind(), &TypeKind::String);
        assert!(!ServiceType::of::<f64>().is_constructible());
        assert!(!ServiceType::of::<String>().is_constructible());
        assert!(ServiceType::of::<Vec<u8>>().is_constructible());
    }

    #[test]
    fn equality_is_by_name() {
        assert_eq!(ServiceType::class("Foo"), ServiceType::class("Foo"));
        assert_ne!(ServiceType::class("Foo"), ServiceType::class("Bar"));
    }
}
