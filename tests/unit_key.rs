/// Unit tests for Key and ServiceType

use ferrous_container::{Key, ServiceType, TypeKind};
use std::collections::HashSet;

#[test]
fn test_key_display_default() {
    let key = Key::default_of(ServiceType::interface("ILogger"));
    assert_eq!(key.to_string(), "ILogger");
    assert_eq!(key.display_name(), "ILogger");
    assert!(key.is_default());
    assert_eq!(key.name(), None);
}

#[test]
fn test_key_display_named() {
    let key = Key::named(ServiceType::interface("ILogger"), "console");
    assert_eq!(key.to_string(), "ILogger[console]");
    assert_eq!(key.display_name(), "ILogger");
    assert!(!key.is_default());
}

#[test]
fn test_empty_name_is_the_default_registration() {
    let service = ServiceType::class("Mailer");
    assert_eq!(Key::new(service.clone(), Some("")), Key::default_of(service.clone()));
    assert_eq!(Key::new(service.clone(), None), Key::default_of(service));
}

#[test]
fn test_key_equality_and_hashing() {
    let logger = ServiceType::interface("ILogger");
    let mut set = HashSet::new();
    set.insert(Key::default_of(logger.clone()));
    set.insert(Key::named(logger.clone(), "a"));
    set.insert(Key::named(logger.clone(), "a"));
    set.insert(Key::named(ServiceType::interface("ILogger"), "b"));

    assert_eq!(set.len(), 3);
    assert!(set.contains(&Key::named(logger, "b")));
}

#[test]
fn test_key_of_rust_type() {
    let key = Key::of::<String>();
    assert_eq!(key.display_name(), std::any::type_name::<String>());
    // the string descriptor and the class descriptor of String are the same key
    assert_eq!(key, Key::default_of(ServiceType::string()));
}

#[test]
fn test_with_service_keeps_name() {
    let definition = ServiceType::generic_interface_definition("IRepo", 1);
    let closed = definition.close(&[ServiceType::class("User")]).unwrap();
    let key = Key::named(definition, "audit").with_service(closed);
    assert_eq!(key.to_string(), "IRepo<User>[audit]");
}

#[test]
fn test_service_type_kinds() {
    assert!(ServiceType::interface("I").is_interface());
    assert!(ServiceType::class("C").is_constructible());
    assert!(!ServiceType::abstract_class("A").is_constructible());
    assert!(!ServiceType::primitive::<u32>().is_constructible());
    assert!(!ServiceType::string().is_constructible());
    assert!(!ServiceType::enumeration("Level").is_constructible());
    assert!(!ServiceType::delegate("Callback").is_constructible());
    assert_eq!(
        ServiceType::array_of(ServiceType::class("C")).kind(),
        &TypeKind::Array(ServiceType::class("C"))
    );
}

#[test]
fn test_generic_definitions() {
    let definition = ServiceType::generic_definition("Cache", 2);
    assert_eq!(definition.name(), "Cache<_, _>");
    assert!(definition.is_generic_definition());
    assert!(!definition.is_constructible());

    let closed = definition
        .close(&[ServiceType::string(), ServiceType::class("Entry")])
        .unwrap();
    assert_eq!(closed.definition(), Some(&definition));
    assert_eq!(closed.generic_arguments().len(), 2);
    assert!(closed.is_constructible());
    assert!(ServiceType::class("Entry").close(&[]).is_err());
}

#[test]
fn test_enumerable_element() {
    let items = ServiceType::enumerable_of(ServiceType::interface("IPlugin"));
    assert_eq!(items.definition(), Some(&ServiceType::enumerable_definition()));
    assert_eq!(items.enumerable_element(), Some(&ServiceType::interface("IPlugin")));
    assert_eq!(ServiceType::class("Other").enumerable_element(), None);
}
