mod common;

use common::{iclock, settings, Settings};
use ferrous_container::{
    Arguments, ConstructorDescriptor, Container, DiError, DiResult, InjectionMember, InjectionParameter, Key,
    Lifetime, MethodDescriptor, ParameterDescriptor, PropertyDescriptor, Registration, Resolver, ServiceType,
    TypeCatalog, TypeShape,
};
use std::sync::Arc;

/// Records which constructor built the instance.
struct Chosen(&'static str);

struct ImplA;
struct ImplB;

fn ia() -> ServiceType {
    ServiceType::interface("IA")
}

fn ib() -> ServiceType {
    ServiceType::interface("IB")
}

fn ctor(label: &'static str, params: Vec<(&str, ServiceType)>) -> ConstructorDescriptor {
    let params = params
        .into_iter()
        .map(|(name, service)| ParameterDescriptor::new(name, service))
        .collect();
    ConstructorDescriptor::new(params, move |_| Ok(Chosen(label)))
}

fn describe(catalog: &TypeCatalog, name: &str, ctors: Vec<ConstructorDescriptor>) {
    let shape = ctors.into_iter().fold(TypeShape::new(), TypeShape::constructor);
    catalog.describe(ServiceType::class(name), shape);
}

/// Catalog with `ImplA: IA` and `ImplB: IB` registered.
fn setup(describe_targets: impl FnOnce(&TypeCatalog)) -> Container {
    let catalog = TypeCatalog::new();
    catalog
        .describe(
            ServiceType::of::<ImplA>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(vec![], |_| Ok(ImplA))),
        )
        .describe(
            ServiceType::of::<ImplB>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(vec![], |_| Ok(ImplB))),
        );
    describe_targets(&catalog);

    let container = Container::new(Arc::new(catalog));
    container
        .register_type(ia(), None, ServiceType::of::<ImplA>(), Lifetime::Transient)
        .unwrap();
    container
        .register_type(ib(), None, ServiceType::of::<ImplB>(), Lifetime::Transient)
        .unwrap();
    container
}

fn chosen(container: &Container, name: &str) -> DiResult<&'static str> {
    Ok(container.get_as::<Chosen>(&ServiceType::class(name), None)?.0)
}

// ===== Constructor selection =====

#[test]
fn test_equal_interface_constructors_are_ambiguous() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Ambiguous",
            vec![ctor("a", vec![("a", ia())]), ctor("b", vec![("b", ib())])],
        )
    });

    let target = ServiceType::class("Ambiguous");
    let err = container
        .register_type(target.clone(), None, target, Lifetime::Transient)
        .unwrap_err();
    assert!(matches!(err, DiError::AmbiguousConstructor(name) if name == "Ambiguous"));

    // the implicit path reports the same error, wrapped
    let err = chosen(&container, "Ambiguous").unwrap_err();
    assert!(matches!(err.root_cause(), DiError::AmbiguousConstructor(_)));
}

#[test]
fn test_unresolvable_constructor_is_skipped() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "SkipsClock",
            vec![
                ctor("with-clock", vec![("a", ia()), ("clock", iclock())]),
                ctor("without-clock", vec![("a", ia())]),
            ],
        )
    });

    assert_eq!(chosen(&container, "SkipsClock").unwrap(), "without-clock");
}

#[test]
fn test_longer_constructor_wins_over_its_subset() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Subset",
            vec![
                ctor("short", vec![("a", ia())]),
                ctor("long", vec![("a", ia()), ("b", ib())]),
            ],
        )
    });

    assert_eq!(chosen(&container, "Subset").unwrap(), "long");
}

#[test]
fn test_longest_resolvable_constructor_wins() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Longest",
            vec![
                ctor("none", vec![]),
                ctor("one", vec![("a", ia())]),
                ctor("two", vec![("a", ia()), ("clock", iclock())]),
            ],
        )
    });

    assert_eq!(chosen(&container, "Longest").unwrap(), "one");
}

#[test]
fn test_interface_only_constructor_beats_mixed_one() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "InterfacesFirst",
            vec![
                ctor("mixed", vec![("settings", ServiceType::of::<Settings>()), ("a", ia())]),
                ctor("interfaces", vec![("a", ia()), ("b", ib())]),
            ],
        )
    });

    assert_eq!(chosen(&container, "InterfacesFirst").unwrap(), "interfaces");
}

#[test]
fn test_marked_constructor_wins() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Marked",
            vec![
                ctor("long", vec![("a", ia()), ("b", ib())]),
                ctor("marked", vec![("a", ia())]).marked(),
            ],
        )
    });

    assert_eq!(chosen(&container, "Marked").unwrap(), "marked");
}

#[test]
fn test_private_and_static_constructors_are_not_eligible() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Hidden",
            vec![ctor("private", vec![]).private(), ctor("static", vec![]).as_static()],
        )
    });

    let target = ServiceType::class("Hidden");
    let err = container
        .register_type(target.clone(), None, target, Lifetime::Transient)
        .unwrap_err();
    assert!(matches!(err, DiError::NoAccessibleConstructor(_)));
}

#[test]
fn test_no_resolvable_constructor() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "NeedsClocks",
            vec![
                ctor("one", vec![("clock", iclock())]),
                ctor("two", vec![("clock", iclock()), ("a", ia())]),
            ],
        )
    });

    let err = chosen(&container, "NeedsClocks").unwrap_err();
    assert!(matches!(err.root_cause(), DiError::NoAccessibleConstructor(_)));
}

#[test]
fn test_defaulted_parameters_count_as_resolvable() {
    let container = setup(|catalog| {
        catalog.describe(
            ServiceType::class("Defaulted"),
            TypeShape::new()
                .constructor(ctor("short", vec![("a", ia())]))
                .constructor(ConstructorDescriptor::new(
                    vec![
                        ParameterDescriptor::new("a", ia()),
                        ParameterDescriptor::new("retries", ServiceType::primitive::<u32>()).with_default(3u32),
                    ],
                    |args| {
                        assert_eq!(*args.get::<u32>(1)?, 3);
                        Ok(Chosen("defaulted"))
                    },
                )),
        );
    });

    assert_eq!(chosen(&container, "Defaulted").unwrap(), "defaulted");
}

#[test]
fn test_pinned_constructor_resolves_given_key() {
    let container = setup(|catalog| {
        describe(
            catalog,
            "Pinned",
            vec![ctor("a", vec![("a", ia())]), ctor("b", vec![("b", ib())])],
        )
    });

    container
        .register(
            Registration::new(Key::default_of(ServiceType::class("Pinned")))
                .with_member(InjectionMember::Constructor(vec![InjectionParameter::resolve(ib())])),
        )
        .unwrap();

    assert_eq!(chosen(&container, "Pinned").unwrap(), "b");
}

#[test]
fn test_pinned_constructor_without_match_is_rejected() {
    let container = setup(|catalog| describe(catalog, "Single", vec![ctor("a", vec![("a", ia())])]));

    let two_values = Registration::new(Key::default_of(ServiceType::class("Single"))).with_member(
        InjectionMember::Constructor(vec![InjectionParameter::value(1u8), InjectionParameter::value(2u8)]),
    );
    assert!(matches!(
        container.register(two_values).unwrap_err(),
        DiError::InvalidRegistration { .. }
    ));

    let wrong_type = Registration::new(Key::default_of(ServiceType::class("Single")))
        .with_member(InjectionMember::Constructor(vec![InjectionParameter::resolve(iclock())]));
    assert!(matches!(
        container.register(wrong_type).unwrap_err(),
        DiError::InvalidRegistration { .. }
    ));
}

// ===== Member selection =====

#[derive(Default)]
struct Gadget {
    settings: Option<Arc<Settings>>,
    label: Option<Arc<String>>,
    settings_seen_by_init: Option<bool>,
    configured: Option<Arc<String>>,
}

fn gadget_catalog() -> TypeCatalog {
    let catalog = TypeCatalog::new();
    catalog.describe(
        ServiceType::of::<Gadget>(),
        TypeShape::new()
            .constructor(ConstructorDescriptor::new(vec![], |_| Ok(Gadget::default())))
            .property(
                PropertyDescriptor::new("settings", ServiceType::of::<Settings>(), |g: &mut Gadget, v| {
                    g.settings = Some(v)
                })
                .marked(),
            )
            .property(PropertyDescriptor::new(
                "label",
                ServiceType::string(),
                |g: &mut Gadget, v| g.label = Some(v),
            ))
            .property(
                PropertyDescriptor::new("version", ServiceType::string(), |_: &mut Gadget, _: Arc<String>| {})
                    .read_only(),
            )
            .method(
                MethodDescriptor::new(
                    "init",
                    vec![ParameterDescriptor::new("settings", ServiceType::of::<Settings>())],
                    |g: &mut Gadget, _: &Arguments| {
                        g.settings_seen_by_init = Some(g.settings.is_some());
                        Ok(())
                    },
                )
                .marked(),
            )
            .method(MethodDescriptor::new(
                "configure",
                vec![ParameterDescriptor::new("label", ServiceType::string())],
                |g: &mut Gadget, args: &Arguments| {
                    g.configured = Some(args.get::<String>(0)?);
                    Ok(())
                },
            )),
    );
    catalog
}

fn gadget_container() -> Container {
    let container = Container::new(Arc::new(gadget_catalog()));
    container.register_value(None, settings("gadget")).unwrap();
    container
}

#[test]
fn test_marked_members_are_injected_properties_first() {
    let container = gadget_container();
    let gadget = container.get::<Gadget>().unwrap();

    assert_eq!(gadget.settings.as_ref().unwrap().dsn, "gadget");
    assert_eq!(gadget.settings_seen_by_init, Some(true));
    assert!(gadget.label.is_none());
    assert!(gadget.configured.is_none());
}

#[test]
fn test_pinned_property_value() {
    let container = gadget_container();
    container
        .register(Registration::new(Key::of::<Gadget>()).with_member(InjectionMember::Property(
            "label".into(),
            InjectionParameter::value(String::from("pinned")),
        )))
        .unwrap();

    let gadget = container.get::<Gadget>().unwrap();
    assert_eq!(gadget.label.as_deref().map(String::as_str), Some("pinned"));
    assert!(gadget.settings.is_some());
}

#[test]
fn test_pinned_property_must_exist_and_be_settable() {
    let container = gadget_container();

    let missing = Registration::new(Key::of::<Gadget>())
        .with_member(InjectionMember::Property("colour".into(), InjectionParameter::value(1u8)));
    assert!(matches!(
        container.register(missing).unwrap_err(),
        DiError::InvalidRegistration { reason, .. } if reason.contains("colour")
    ));

    let read_only = Registration::new(Key::of::<Gadget>()).with_member(InjectionMember::Property(
        "version".into(),
        InjectionParameter::value(String::from("2")),
    ));
    assert!(matches!(
        container.register(read_only).unwrap_err(),
        DiError::InvalidRegistration { reason, .. } if reason.contains("not settable")
    ));
}

#[test]
fn test_pinned_method_is_called() {
    let container = gadget_container();
    container
        .register(Registration::new(Key::of::<Gadget>()).with_member(InjectionMember::Method(
            "configure".into(),
            vec![InjectionParameter::value(String::from("configured"))],
        )))
        .unwrap();

    let gadget = container.get::<Gadget>().unwrap();
    assert_eq!(gadget.configured.as_deref().map(String::as_str), Some("configured"));
    assert_eq!(gadget.settings_seen_by_init, Some(true));
}

#[test]
fn test_pinned_method_arity_must_match() {
    let container = gadget_container();
    let registration = Registration::new(Key::of::<Gadget>())
        .with_member(InjectionMember::Method("configure".into(), vec![]));
    assert!(matches!(
        container.register(registration).unwrap_err(),
        DiError::InvalidRegistration { .. }
    ));
}

struct Plain {
    label: Option<Arc<String>>,
}

fn plain_container() -> Container {
    let catalog = TypeCatalog::new();
    catalog.describe(
        ServiceType::of::<Plain>(),
        TypeShape::new()
            .constructor(ConstructorDescriptor::new(vec![], |_| Ok(Plain { label: None })))
            .property(PropertyDescriptor::new(
                "label",
                ServiceType::string(),
                |p: &mut Plain, v| p.label = Some(v),
            )),
    );
    Container::new(Arc::new(catalog))
}

#[test]
fn test_unmarked_property_injected_when_its_type_is_registered() {
    let without = plain_container();
    assert!(without.get::<Plain>().unwrap().label.is_none());

    let with = plain_container();
    with.register_value(None, String::from("registered")).unwrap();
    let plain = with.get::<Plain>().unwrap();
    assert_eq!(plain.label.as_deref().map(String::as_str), Some("registered"));
}
