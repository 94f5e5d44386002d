#![allow(dead_code)]

use ferrous_container::{
    AnyArc, ConstructorDescriptor, Container, ParameterDescriptor, ServiceType, TypeCatalog, TypeShape,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ===== Test Services =====

#[derive(Debug)]
pub struct ConsoleLogger;

#[derive(Debug)]
pub struct FileLogger {
    pub path: Arc<String>,
}

#[derive(Debug)]
pub struct Settings {
    pub dsn: String,
}

#[derive(Debug)]
pub struct Repository {
    pub settings: Arc<Settings>,
}

/// Depends on a repository and on whatever `ILogger` maps to.
#[derive(Debug)]
pub struct Service {
    pub repo: Arc<Repository>,
    pub logger: AnyArc,
}

/// Needs `IClock`, which nothing registers.
#[derive(Debug)]
pub struct NeedsClock;

pub fn ilogger() -> ServiceType {
    ServiceType::interface("ILogger")
}

pub fn iclock() -> ServiceType {
    ServiceType::interface("IClock")
}

pub fn catalog() -> TypeCatalog {
    let catalog = TypeCatalog::new();
    catalog
        .describe(
            ServiceType::of::<ConsoleLogger>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(vec![], |_| Ok(ConsoleLogger))),
        )
        .describe(
            ServiceType::of::<FileLogger>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(
                vec![ParameterDescriptor::new("path", ServiceType::string()).with_default(String::from("app.log"))],
                |args| Ok(FileLogger { path: args.get::<String>(0)? }),
            )),
        )
        .describe(
            ServiceType::of::<Repository>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(
                vec![ParameterDescriptor::new("settings", ServiceType::of::<Settings>())],
                |args| Ok(Repository { settings: args.get::<Settings>(0)? }),
            )),
        )
        .describe(
            ServiceType::of::<Service>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(
                vec![
                    ParameterDescriptor::new("repo", ServiceType::of::<Repository>()),
                    ParameterDescriptor::new("logger", ilogger()),
                ],
                |args| {
                    Ok(Service {
                        repo: args.get::<Repository>(0)?,
                        logger: args.raw(1)?.clone(),
                    })
                },
            )),
        )
        .describe(
            ServiceType::of::<NeedsClock>(),
            TypeShape::new().constructor(ConstructorDescriptor::new(
                vec![ParameterDescriptor::new("clock", iclock())],
                |_| Ok(NeedsClock),
            )),
        );
    catalog
}

pub fn container() -> Container {
    Container::new(Arc::new(catalog()))
}

pub fn settings(dsn: &str) -> Settings {
    Settings { dsn: dsn.to_string() }
}

/// Counts calls; handy inside factories.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
