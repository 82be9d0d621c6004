//! Module descriptors.
//!
//! A [`ModuleDescriptor`] is the structured view of one module that the
//! graph builder and the executor work from: its dependency slots and
//! factory declarations as plain data. Concrete module types are never
//! inspected past this point.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::capability::{Capabilities, Erased};
use crate::error::{ModuleDescriptionError, Result, TrellisError};
use crate::key::{SlotKey, TypeKey};
use crate::module::{Declarations, Module};

/// Fills an [`Inject`](crate::inject::Inject) handle with a value already
/// projected to the slot's type. Returns `false` if it could not.
pub(crate) type InjectFn = Box<dyn FnOnce(Erased) -> bool>;

/// Produces the boxed `Arc<T>` of a factory.
pub(crate) type ProduceFn = Box<dyn FnOnce() -> Result<Erased>>;

/// A dependency slot: what it asks for and where the answer goes.
pub(crate) struct SlotDeclaration {
    pub key: SlotKey,
    /// Type the slot holds; a named instance must be assignable to it
    pub target: TypeKey,
    pub inject: InjectFn,
}

impl fmt::Debug for SlotDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotDeclaration")
            .field("key", &self.key)
            .field("target", &self.target)
            .finish()
    }
}

/// A factory: one named instance of a declared type.
pub(crate) struct FactoryDeclaration {
    pub name: String,
    pub capabilities: Capabilities,
    pub produce: ProduceFn,
}

impl fmt::Debug for FactoryDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryDeclaration")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Structured, validated view of one module.
#[derive(Debug)]
pub(crate) struct ModuleDescriptor {
    /// Position in the input list; used for deterministic ordering
    pub index: usize,
    pub name: String,
    pub slots: Vec<SlotDeclaration>,
    pub factories: Vec<FactoryDeclaration>,
}

impl ModuleDescriptor {
    /// Runs `module.declare` and validates what it declared.
    ///
    /// # Errors
    /// [`TrellisError::InvalidModule`] listing every problem found.
    pub fn extract(index: usize, module: &dyn Module) -> Result<Self> {
        let name = module.name().to_string();

        let mut declarations = Declarations::new();
        module.declare(&mut declarations);

        let Declarations {
            slots,
            factories,
            mut problems,
        } = declarations;

        for factory in &factories {
            problems.extend(factory_problems(factory));
        }

        if !problems.is_empty() {
            warn!(module = %name, problems = problems.len(), "Module rejected");
            return Err(TrellisError::InvalidModule(ModuleDescriptionError {
                module: name,
                problems,
            }));
        }

        if factories.is_empty() {
            debug!(module = %name, "Module declares no factories");
        }

        debug!(
            module = %name,
            slots = slots.len(),
            factories = factories.len(),
            "Module described"
        );

        Ok(Self {
            index,
            name,
            slots,
            factories,
        })
    }

    /// Extracts descriptors for every module, in input order.
    pub fn extract_all<'m>(modules: impl IntoIterator<Item = &'m dyn Module>) -> Result<Vec<Self>> {
        modules
            .into_iter()
            .enumerate()
            .map(|(index, module)| Self::extract(index, module))
            .collect()
    }
}

fn factory_problems(factory: &FactoryDeclaration) -> Vec<String> {
    let mut problems = Vec::new();
    let declared = factory.capabilities.declared();

    if factory.name.trim().is_empty() {
        problems.push(format!(
            "factory of type {} has an empty name",
            declared.short_name()
        ));
    }

    let mut seen = HashSet::new();
    for (position, ty) in factory.capabilities.types().enumerate() {
        if position > 0 && ty == declared {
            problems.push(format!(
                "factory {:?} is marked assignable to its own type {}",
                factory.name,
                ty.short_name()
            ));
        } else if !seen.insert(ty) {
            problems.push(format!(
                "factory {:?} is marked assignable to {} more than once",
                factory.name,
                ty.short_name()
            ));
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::from_fn;
    use std::sync::Arc;

    trait Shape: Send + Sync {}
    struct Square;
    impl Shape for Square {}

    #[test]
    fn extracts_slots_and_factories() {
        let module = from_fn("Shapes", |m| {
            let _side = m.named::<u32>("side");
            m.instance("square", Square)
                .assignable_to::<dyn Shape>(|s| s as Arc<dyn Shape>);
        });

        let descriptor = ModuleDescriptor::extract(3, &module).unwrap();
        assert_eq!(descriptor.index, 3);
        assert_eq!(descriptor.name, "Shapes");
        assert_eq!(descriptor.slots.len(), 1);
        assert_eq!(descriptor.factories[0].name, "square");
    }

    #[test]
    fn module_without_factories_is_legal() {
        let module = from_fn("Idle", |_| {});
        let descriptor = ModuleDescriptor::extract(0, &module).unwrap();
        assert!(descriptor.factories.is_empty());
    }

    #[test]
    fn empty_names_are_rejected() {
        let module = from_fn("Broken", |m| {
            let _dep = m.named::<u32>("");
            m.instance("", 1u8);
        });

        match ModuleDescriptor::extract(0, &module).unwrap_err() {
            TrellisError::InvalidModule(err) => {
                assert_eq!(err.module, "Broken");
                assert_eq!(err.problems.len(), 2);
            }
            other => panic!("Expected InvalidModule, got: {other:?}"),
        }
    }

    #[test]
    fn assignable_to_self_is_rejected() {
        let module = from_fn("Loop", |m| {
            m.instance("square", Square).assignable_to::<Square>(|s| s);
        });

        let err = ModuleDescriptor::extract(0, &module).unwrap_err();
        assert!(err.to_string().contains("its own type"));
    }

    #[test]
    fn repeated_assignable_target_is_rejected() {
        let module = from_fn("Twice", |m| {
            m.instance("square", Square)
                .assignable_to::<dyn Shape>(|s| s as Arc<dyn Shape>)
                .assignable_to::<dyn Shape>(|s| s as Arc<dyn Shape>);
        });

        let err = ModuleDescriptor::extract(0, &module).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn extract_all_keeps_input_order() {
        let a = from_fn("A", |m| {
            m.instance("a", 1u8);
        });
        let b = from_fn("B", |m| {
            m.instance("b", 2u8);
        });
        let modules: Vec<&dyn Module> = vec![&b, &a];

        let descriptors = ModuleDescriptor::extract_all(modules).unwrap();
        let names: Vec<_> = descriptors.iter().map(|d| (d.index, d.name.as_str())).collect();
        assert_eq!(names, vec![(0, "B"), (1, "A")]);
    }
}
