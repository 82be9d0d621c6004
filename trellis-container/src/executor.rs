//! Instantiation: runs modules in order, injecting then producing.
//!
//! For each module, every dependency slot is resolved against the
//! instances built so far and injected; then each factory runs once, in
//! declaration order, and its instance is registered. Nothing here runs
//! concurrently and no factory is ever invoked twice.

use tracing::{debug, instrument, trace};

use crate::descriptor::{FactoryDeclaration, ModuleDescriptor, SlotDeclaration};
use crate::error::{ModuleDescriptionError, Result, TrellisError};
use crate::key::SlotKey;
use crate::registry::{InstanceRecord, Registry};
use crate::report::{ContainerReport, InstanceSummary, ModuleReport};

/// Builds every instance of `ordered`, which must already be in
/// instantiation order.
#[instrument(skip_all, name = "instantiate", fields(modules = ordered.len()))]
pub(crate) fn instantiate(ordered: Vec<ModuleDescriptor>) -> Result<(Registry, ContainerReport)> {
    let mut registry = Registry::new();
    let mut report = ContainerReport::default();

    for module in ordered {
        report.modules.push(instantiate_module(&mut registry, module)?);
    }

    Ok((registry, report))
}

fn instantiate_module(registry: &mut Registry, module: ModuleDescriptor) -> Result<ModuleReport> {
    let ModuleDescriptor {
        name, slots, factories, ..
    } = module;

    debug!(module = %name, slots = slots.len(), "Instantiating module");

    for slot in slots {
        inject(registry, &name, slot)?;
    }

    let mut instances = Vec::with_capacity(factories.len());
    for factory in factories {
        instances.push(produce(registry, &name, factory)?);
    }

    Ok(ModuleReport { name, instances })
}

fn inject(registry: &Registry, module: &str, slot: SlotDeclaration) -> Result<()> {
    let SlotDeclaration {
        key,
        target,
        inject: fill,
    } = slot;

    let value = match &key {
        SlotKey::Name(name) => registry.resolve_name(name, target),
        SlotKey::Type(ty) => registry.resolve_type(*ty),
    }
    .map_err(|err| err.required_by(module))?;

    if !fill(value) {
        return Err(TrellisError::InvalidModule(ModuleDescriptionError {
            module: module.to_string(),
            problems: vec![format!("dependency slot for {key} could not be injected")],
        }));
    }

    trace!(module, slot = %key, "Injected");
    Ok(())
}

fn produce(registry: &mut Registry, module: &str, factory: FactoryDeclaration) -> Result<InstanceSummary> {
    let FactoryDeclaration {
        name,
        capabilities,
        produce: build,
    } = factory;

    trace!(module, instance = %name, "Invoking factory");
    let value = build().map_err(|err| match err {
        TrellisError::ConstructionFailed { .. } => err,
        other => TrellisError::construction(name.clone(), other),
    })?;

    let mut types = capabilities.types().map(|t| t.type_name());
    let summary = InstanceSummary {
        name: name.clone(),
        type_name: types.next().unwrap_or_default(),
        assignable_to: types.collect(),
    };

    registry.insert(InstanceRecord {
        name,
        module: module.to_string(),
        capabilities,
        value,
    })?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, from_fn};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct Database {
        url: String,
    }
    struct Service {
        db: Arc<Database>,
    }

    fn describe(modules: &[&dyn Module]) -> Vec<ModuleDescriptor> {
        ModuleDescriptor::extract_all(modules.iter().copied()).unwrap()
    }

    #[test]
    fn injects_then_produces() {
        let storage = from_fn("Storage", |m| {
            m.instance("db", Database { url: "mem://".into() });
        });
        let service = from_fn("Service", |m| {
            let db = m.named::<Database>("db");
            m.factory("svc", move || Ok(Arc::new(Service { db: db.get()? })));
        });

        let (registry, report) = instantiate(describe(&[&storage, &service])).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(report.order(), vec!["Storage", "Service"]);

        let svc = registry.find_by_name("svc").unwrap();
        let svc = svc.value.downcast_ref::<Arc<Service>>().unwrap();
        assert_eq!(svc.db.url, "mem://");
    }

    #[test]
    fn missing_dependency_names_the_module() {
        let service = from_fn("Service", |m| {
            let _db = m.typed::<Database>();
        });

        match instantiate(describe(&[&service])).unwrap_err() {
            TrellisError::NotRegistered(err) => {
                assert_eq!(err.required_by.as_deref(), Some("Service"));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn factories_run_once_in_declaration_order() {
        let calls = Rc::new(Cell::new(0u32));
        let seen = calls.clone();
        let module = from_fn("Counter", move |m| {
            for name in ["first", "second"] {
                let calls = seen.clone();
                m.factory(name, move || {
                    calls.set(calls.get() + 1);
                    Ok(Arc::new(calls.get()))
                });
            }
        });

        let (registry, report) = instantiate(describe(&[&module])).unwrap();
        assert_eq!(calls.get(), 2);
        let names: Vec<_> = registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(report.modules[0].instances[1].name, "second");
    }

    #[test]
    fn factory_error_is_wrapped_with_instance_name() {
        let module = from_fn("Flaky", |m| {
            m.factory::<Database, _>("db", || Err(TrellisError::construction("db", "refused")));
            m.factory::<u8, _>("other", || Err(TrellisError::NotInjected { type_name: "u8" }));
        });

        match instantiate(describe(&[&module])).unwrap_err() {
            TrellisError::ConstructionFailed { instance, source } => {
                assert_eq!(instance, "db");
                assert_eq!(source.to_string(), "refused");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }

    #[test]
    fn report_lists_assignable_types() {
        trait Store: Send + Sync {}
        impl Store for Database {}

        let module = from_fn("Storage", |m| {
            m.instance("db", Database { url: String::new() })
                .assignable_to::<dyn Store>(|d| d as Arc<dyn Store>);
        });

        let (_, report) = instantiate(describe(&[&module])).unwrap();
        let summary = &report.modules[0].instances[0];
        assert!(summary.type_name.ends_with("Database"));
        assert_eq!(summary.assignable_to.len(), 1);
        assert!(summary.assignable_to[0].contains("Store"));
    }
}
