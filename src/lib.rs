//! # ferrous-container
//!
//! Hierarchical object-construction engine: a tree of containers that build
//! object graphs from registrations, select constructors and members from
//! introspection metadata, and dispose everything they own in reverse order.
//!
//! ## Features
//!
//! - **Container hierarchy**: child containers see their ancestors' registrations
//!   and get a store of their own only when first registered into
//! - **Staged pipelines**: lifetime, mapping and creation aspects composed per
//!   registration kind, replaceable per container node
//! - **Constructor selection**: marker first, then a "longest resolvable constructor"
//!   heuristic with deterministic ambiguity errors
//! - **Lifetimes**: singleton, per-scope and transient managers, or your own
//! - **Disposal tree**: children, lifetime managers and tracked resources are
//!   disposed LIFO with error aggregation
//! - **Circular dependency detection**: re-entrant resolution fails with the full path
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_container::{
//!     ConstructorDescriptor, Container, Lifetime, ParameterDescriptor, Resolver, ServiceType,
//!     TypeCatalog, TypeShape,
//! };
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! // Describe how types are constructed
//! let catalog = TypeCatalog::new();
//! catalog.describe(
//!     ServiceType::of::<UserService>(),
//!     TypeShape::new().constructor(ConstructorDescriptor::new(
//!         vec![ParameterDescriptor::new("db", ServiceType::of::<Database>())],
//!         |args| Ok(UserService { db: args.get::<Database>(0)? }),
//!     )),
//! );
//!
//! // Register services
//! let container = Container::new(Arc::new(catalog));
//! container
//!     .register_value(None, Database { connection_string: "postgres://localhost".to_string() })
//!     .unwrap();
//! container
//!     .register_type(
//!         ServiceType::of::<UserService>(),
//!         None,
//!         ServiceType::of::<UserService>(),
//!         Lifetime::Transient,
//!     )
//!     .unwrap();
//!
//! let user_service = container.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: one instance for the registration, whichever node resolves it
//! - **PerScope**: one instance per resolving container node
//! - **Transient**: a new instance on every resolution
//!
//! ## Child Containers
//!
//! ```rust
//! use ferrous_container::{Container, NodeMode, Resolver, TypeCatalog};
//! use std::sync::Arc;
//!
//! let root = Container::new(Arc::new(TypeCatalog::new()));
//! root.register_value(None, 8080u16).unwrap();
//!
//! let child = root.create_child_container();
//! assert_eq!(child.mode(), NodeMode::DelegatingChild);
//! assert_eq!(*child.get_required::<u16>(), 8080);
//!
//! child.register_value(None, 9090u16).unwrap();
//! assert_eq!(child.mode(), NodeMode::OwningChild);
//! assert_eq!(*child.get_required::<u16>(), 9090);
//! assert_eq!(*root.get_required::<u16>(), 8080);
//! ```

pub mod capabilities;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod pipeline;
pub mod provider;
pub mod registration;
pub mod selection;
pub mod traits;
pub mod types;

mod internal;

pub use capabilities::{Introspect, TypeCatalog, TypeShape};
pub use config::ContainerOptions;
pub use descriptors::{
    Arguments, ConstructorDescriptor, MethodDescriptor, ParameterDescriptor, PropertyDescriptor, Visibility,
};
pub use error::{DiError, DiResult};
pub use key::Key;
pub use lifetime::{
    Lifetime, LifetimeManager, PerScopeLifetimeManager, SingletonLifetimeManager, TransientLifetimeManager,
};
pub use pipeline::{BuildStage, Pipelines, SelectionStage, StagedFactoryChain};
pub use provider::{BuildContext, Container, NodeMode, ScopeId};
pub use registration::{
    AnyArc, AnyBox, BuildPlan, ConstructionStrategy, InjectionMember, InjectionParameter, PolicySet,
    Registration, RegistrationKind, ResolverOverride,
};
pub use selection::{ParameterResolver, SelectedConstructor, SelectedMembers};
pub use traits::{Dispose, Resolver, ResolverCore};
pub use types::{ServiceType, TypeKind};
