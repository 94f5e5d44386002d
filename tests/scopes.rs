mod common;

use common::*;
use ferrous_container::{DiError, Lifetime, NodeMode, Resolver, ServiceType};
use std::sync::Arc;

#[test]
fn test_delegating_child_sees_later_parent_registrations() {
    let root = container();
    let child = root.create_child_container();
    assert_eq!(child.mode(), NodeMode::DelegatingChild);
    assert!(!child.is_registered(&ServiceType::of::<Settings>(), None));

    root.register_value(None, settings("late")).unwrap();

    assert!(child.is_registered(&ServiceType::of::<Settings>(), None));
    assert_eq!(child.get::<Settings>().unwrap().dsn, "late");
    assert_eq!(child.mode(), NodeMode::DelegatingChild);
    assert!(child.local_registrations().is_empty());
}

#[test]
fn test_first_registration_promotes_and_shadows() {
    let root = container();
    root.register_value(None, settings("root")).unwrap();
    root.register_type(ilogger(), None, ServiceType::of::<ConsoleLogger>(), Lifetime::Transient)
        .unwrap();

    let child = root.create_child_container();
    child.register_value(None, settings("child")).unwrap();

    assert_eq!(child.mode(), NodeMode::OwningChild);
    assert_eq!(child.local_registrations().len(), 1);
    assert_eq!(child.get::<Settings>().unwrap().dsn, "child");
    assert_eq!(root.get::<Settings>().unwrap().dsn, "root");

    // keys the child does not hold still come from the parent
    assert!(child.get_as::<ConsoleLogger>(&ilogger(), None).is_ok());
    assert_eq!(root.mode(), NodeMode::Root);
}

#[test]
fn test_grandchild_walks_the_whole_chain() {
    let root = container();
    root.register_value(None, settings("root")).unwrap();
    let child = root.create_child_container();
    child
        .register_type(ilogger(), None, ServiceType::of::<FileLogger>(), Lifetime::Transient)
        .unwrap();
    let grandchild = child.create_child_container();

    assert_eq!(grandchild.get::<Settings>().unwrap().dsn, "root");
    assert!(grandchild.get_as::<FileLogger>(&ilogger(), None).is_ok());
    assert_eq!(grandchild.parent().map(|p| p.id()), Some(child.id()));
}

#[test]
fn test_implicit_types_use_the_resolving_node() {
    let root = container();
    root.register_value(None, settings("root")).unwrap();
    let child = root.create_child_container();
    child.register_value(None, settings("child")).unwrap();

    assert_eq!(root.get::<Repository>().unwrap().settings.dsn, "root");
    assert_eq!(child.get::<Repository>().unwrap().settings.dsn, "child");
}

#[test]
fn test_concurrent_registration_promotes_once() {
    let root = container();
    let child = root.create_child_container();

    crossbeam_utils::thread::scope(|s| {
        for i in 0..8 {
            let child = &child;
            s.spawn(move |_| {
                child
                    .register_value(Some(format!("t{}", i).as_str()), settings(&format!("dsn-{}", i)))
                    .unwrap();
            });
        }
    })
    .unwrap();

    assert_eq!(child.mode(), NodeMode::OwningChild);
    assert_eq!(child.local_registrations().len(), 8);
    for i in 0..8 {
        let value = child.get_named::<Settings>(&format!("t{}", i)).unwrap();
        assert_eq!(value.dsn, format!("dsn-{}", i));
    }
    assert!(root.local_registrations().is_empty());
}

#[test]
fn test_concurrent_singleton_resolution_shares_one_instance() {
    let root = container();
    root.register_type(
        ServiceType::of::<ConsoleLogger>(),
        None,
        ServiceType::of::<ConsoleLogger>(),
        Lifetime::Singleton,
    )
    .unwrap();

    let first = root.get::<ConsoleLogger>().unwrap();
    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            let child = root.create_child_container();
            let first = first.clone();
            s.spawn(move |_| {
                for _ in 0..50 {
                    assert!(Arc::ptr_eq(&first, &child.get::<ConsoleLogger>().unwrap()));
                }
            });
        }
    })
    .unwrap();
}

#[test]
fn test_collect_all_named_prefers_ancestors() {
    let root = container();
    root.register_type(ilogger(), Some("a"), ServiceType::of::<ConsoleLogger>(), Lifetime::Transient)
        .unwrap();
    root.register_type(ilogger(), Some("b"), ServiceType::of::<ConsoleLogger>(), Lifetime::Transient)
        .unwrap();
    root.register_type(ilogger(), None, ServiceType::of::<ConsoleLogger>(), Lifetime::Transient)
        .unwrap();

    let child = root.create_child_container();
    child
        .register_type(ilogger(), Some("a"), ServiceType::of::<FileLogger>(), Lifetime::Transient)
        .unwrap();
    child
        .register_type(ilogger(), Some("c"), ServiceType::of::<FileLogger>(), Lifetime::Transient)
        .unwrap();

    let collected = child.collect_all_named(&ilogger());
    let names: Vec<_> = collected.iter().map(|p| p.key().name().unwrap_or("")).collect();
    assert_eq!(names, ["a", "b", "c"]);

    let root_a = root.get_registration(&ilogger(), Some("a")).unwrap();
    assert!(Arc::ptr_eq(&collected[0], &root_a));
    assert_eq!(root.collect_all_named(&ilogger()).len(), 2);
}

#[test]
fn test_resolve_all_builds_through_the_nearest_registration() {
    let root = container();
    root.register_value(Some("primary"), settings("root-primary")).unwrap();
    root.register_value(Some("replica"), settings("root-replica")).unwrap();
    root.register_value(None, settings("default")).unwrap();

    let child = root.create_child_container();
    child.register_value(Some("primary"), settings("child-primary")).unwrap();

    let from_child: Vec<_> = child
        .get_all_as::<Settings>(&ServiceType::of::<Settings>())
        .unwrap()
        .iter()
        .map(|s| s.dsn.clone())
        .collect();
    assert_eq!(from_child, ["child-primary", "root-replica"]);

    let from_root: Vec<_> = root
        .get_all_as::<Settings>(&ServiceType::of::<Settings>())
        .unwrap()
        .iter()
        .map(|s| s.dsn.clone())
        .collect();
    assert_eq!(from_root, ["root-primary", "root-replica"]);
}

#[test]
fn test_per_scope_instances_are_per_node() {
    let root = container();
    root.register_type(
        ServiceType::of::<ConsoleLogger>(),
        None,
        ServiceType::of::<ConsoleLogger>(),
        Lifetime::PerScope,
    )
    .unwrap();
    let child = root.create_child_container();

    let root_a = root.get::<ConsoleLogger>().unwrap();
    let root_b = root.get::<ConsoleLogger>().unwrap();
    let child_a = child.get::<ConsoleLogger>().unwrap();
    let child_b = child.get::<ConsoleLogger>().unwrap();

    assert!(Arc::ptr_eq(&root_a, &root_b));
    assert!(Arc::ptr_eq(&child_a, &child_b));
    assert!(!Arc::ptr_eq(&root_a, &child_a));
}

#[test]
fn test_singletons_are_shared_with_children() {
    let root = container();
    root.register_type(
        ServiceType::of::<ConsoleLogger>(),
        None,
        ServiceType::of::<ConsoleLogger>(),
        Lifetime::Singleton,
    )
    .unwrap();
    let child = root.create_child_container();

    let from_child = child.get::<ConsoleLogger>().unwrap();
    let from_root = root.get::<ConsoleLogger>().unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_root));
}

#[test]
fn test_disposed_child_stops_delegating() {
    let root = container();
    root.register_type(ilogger(), None, ServiceType::of::<ConsoleLogger>(), Lifetime::Transient)
        .unwrap();
    let child = root.create_child_container();
    assert!(child.resolve(&ilogger(), None).is_ok());

    child.dispose().unwrap();

    assert!(child.is_disposed());
    assert!(child.parent().is_none());
    assert!(!child.is_registered(&ilogger(), None));
    let err = child.resolve(&ilogger(), None).unwrap_err();
    assert!(matches!(err.root_cause(), DiError::NotFound(_)));

    // the parent is unaffected
    assert!(root.resolve(&ilogger(), None).is_ok());
}

#[test]
fn test_children_share_options() {
    let root = container();
    let child = root.create_child_container();
    assert_eq!(child.options(), root.options());
    assert_ne!(child.id(), root.id());
}

#[test]
fn test_child_outliving_its_parent_stops_at_itself() {
    let root = container();
    root.register_value(None, settings("root")).unwrap();
    let child = root.create_child_container();
    assert!(child.is_registered(&ServiceType::of::<Settings>(), None));

    // children hold their parent weakly
    drop(root);

    assert!(child.parent().is_none());
    assert!(!child.is_registered(&ServiceType::of::<Settings>(), None));
    child.register_value(None, settings("child")).unwrap();
    assert_eq!(child.get::<Settings>().unwrap().dsn, "child");
}
