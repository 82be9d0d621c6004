//! Module trait: a unit of configuration that declares instances.
//!
//! A module declares three kinds of members through [`Declarations`]:
//! - named dependencies, resolved by exact instance name
//! - typed dependencies, resolved by declared type (then assignable type)
//! - factories, each producing one named, typed instance
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use trellis_container::module::{Declarations, Module};
//!
//! struct Database { url: String }
//! struct UserService { db: Arc<Database> }
//!
//! struct StorageModule;
//!
//! impl Module for StorageModule {
//!     fn declare(&self, m: &mut Declarations) {
//!         m.factory("db", || Ok(Arc::new(Database { url: "postgres://localhost".into() })));
//!     }
//! }
//!
//! struct ServiceModule;
//!
//! impl Module for ServiceModule {
//!     fn declare(&self, m: &mut Declarations) {
//!         let db = m.named::<Database>("db");
//!         m.factory("users", move || Ok(Arc::new(UserService { db: db.get()? })));
//!     }
//! }
//! ```

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::{Capabilities, Erased, View};
use crate::descriptor::{FactoryDeclaration, SlotDeclaration};
use crate::error::Result;
use crate::inject::Inject;
use crate::key::{SlotKey, TypeKey};

/// A unit of configuration contributing instances to a container.
///
/// `declare` is called once per container build. Every call must declare
/// the same members; slots handed out by [`Declarations`] belong to that
/// build only, so one module value can feed several containers.
pub trait Module {
    /// Declares dependencies and factories.
    fn declare(&self, m: &mut Declarations);

    /// Human-readable name for errors and reports.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

impl<M: Module + ?Sized> Module for &M {
    fn declare(&self, m: &mut Declarations) {
        (**self).declare(m)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<M: Module + ?Sized> Module for Box<M> {
    fn declare(&self, m: &mut Declarations) {
        (**self).declare(m)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Collects the members a module declares.
#[derive(Default)]
pub struct Declarations {
    pub(crate) slots: Vec<SlotDeclaration>,
    pub(crate) factories: Vec<FactoryDeclaration>,
    pub(crate) problems: Vec<String>,
}

impl Declarations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Declares a dependency on the instance registered under `name`.
    ///
    /// The instance must be assignable to `T`.
    pub fn named<T: ?Sized + Send + Sync + 'static>(&mut self, name: impl Into<String>) -> Inject<T> {
        let name = name.into();
        if name.trim().is_empty() {
            self.problems.push(format!(
                "named dependency of type {} has an empty name",
                TypeKey::of::<T>().short_name()
            ));
        }
        self.slot(SlotKey::Name(name))
    }

    /// Declares a dependency on the unique instance of type `T`.
    ///
    /// Falls back to the unique instance assignable to `T` when no
    /// factory declares `T` itself.
    pub fn typed<T: ?Sized + Send + Sync + 'static>(&mut self) -> Inject<T> {
        self.slot(SlotKey::Type(TypeKey::of::<T>()))
    }

    /// Declares a factory producing the instance `name` of type `T`.
    ///
    /// The factory runs exactly once, after every dependency of this
    /// module has been injected.
    pub fn factory<T, F>(&mut self, name: impl Into<String>, produce: F) -> FactoryBuilder<'_, T>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce() -> Result<Arc<T>> + 'static,
    {
        self.factories.push(FactoryDeclaration {
            name: name.into(),
            capabilities: Capabilities::of::<T>(),
            produce: Box::new(move || produce().map(|arc| Box::new(arc) as Erased)),
        });

        let index = self.factories.len() - 1;
        FactoryBuilder {
            declaration: &mut self.factories[index],
            _produces: PhantomData,
        }
    }

    /// Declares a ready-made value as the instance `name`.
    pub fn instance<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) -> FactoryBuilder<'_, T> {
        self.factory(name, move || Ok(Arc::new(value)))
    }

    fn slot<T: ?Sized + Send + Sync + 'static>(&mut self, key: SlotKey) -> Inject<T> {
        let handle = Inject::<T>::new();
        let target = handle.clone();

        self.slots.push(SlotDeclaration {
            key,
            target: TypeKey::of::<T>(),
            inject: Box::new(move |value: Erased| match value.downcast::<Arc<T>>() {
                Ok(arc) => target.fill(*arc),
                Err(_) => false,
            }),
        });

        handle
    }
}

/// Refines a factory declaration.
pub struct FactoryBuilder<'a, T: ?Sized> {
    declaration: &'a mut FactoryDeclaration,
    _produces: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> FactoryBuilder<'_, T> {
    /// Marks the instance as assignable to `U`.
    ///
    /// `cast` is normally an unsizing coercion:
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use trellis_container::module::Declarations;
    /// trait Logger: Send + Sync {}
    /// struct ConsoleLogger;
    /// impl Logger for ConsoleLogger {}
    ///
    /// fn declare(m: &mut Declarations) {
    ///     m.instance("console", ConsoleLogger)
    ///         .assignable_to::<dyn Logger>(|c| c as Arc<dyn Logger>);
    /// }
    /// ```
    pub fn assignable_to<U>(self, cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.declaration.capabilities.push(View::cast(cast));
        self
    }
}

/// A module built from a name and a closure.
pub struct FnModule<F> {
    name: String,
    declare: F,
}

/// Creates a module from a closure.
///
/// ```rust
/// use trellis_container::module::{from_fn, Module};
///
/// let config = from_fn("ConfigModule", |m| {
///     m.instance("port", 8080u16);
/// });
/// assert_eq!(config.name(), "ConfigModule");
/// ```
pub fn from_fn<F>(name: impl Into<String>, declare: F) -> FnModule<F>
where
    F: Fn(&mut Declarations),
{
    FnModule {
        name: name.into(),
        declare,
    }
}

impl<F: Fn(&mut Declarations)> Module for FnModule<F> {
    fn declare(&self, m: &mut Declarations) {
        (self.declare)(m)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::is_assignable;

    trait Logger: Send + Sync {}
    struct ConsoleLogger;
    impl Logger for ConsoleLogger {}

    struct TestModule;

    impl Module for TestModule {
        fn declare(&self, m: &mut Declarations) {
            let _db = m.named::<String>("db");
            let _log = m.typed::<dyn Logger>();
            m.instance("console", ConsoleLogger)
                .assignable_to::<dyn Logger>(|c| c as Arc<dyn Logger>);
            m.factory("greeting", || Ok(Arc::new(String::from("hi"))));
        }
    }

    #[test]
    fn module_declares_members() {
        let mut decl = Declarations::new();
        TestModule.declare(&mut decl);

        assert_eq!(decl.slots.len(), 2);
        assert_eq!(decl.slots[0].key, SlotKey::Name("db".into()));
        assert_eq!(decl.slots[1].key, SlotKey::Type(TypeKey::of::<dyn Logger>()));
        assert_eq!(decl.factories.len(), 2);
        assert!(decl.problems.is_empty());

        let console = &decl.factories[0];
        assert_eq!(console.name, "console");
        assert!(is_assignable(&console.capabilities, TypeKey::of::<dyn Logger>()));
    }

    #[test]
    fn module_has_name() {
        assert!(TestModule.name().contains("TestModule"));
        let boxed: Box<dyn Module> = Box::new(TestModule);
        assert!(boxed.name().contains("TestModule"));
    }

    #[test]
    fn empty_slot_name_is_a_problem() {
        let mut decl = Declarations::new();
        let _ = decl.named::<u32>("  ");
        assert_eq!(decl.problems.len(), 1);
        assert!(decl.problems[0].contains("empty name"));
    }

    #[test]
    fn slot_injection_fills_handle() {
        let mut decl = Declarations::new();
        let handle = decl.typed::<String>();
        let slot = decl.slots.pop().unwrap();

        assert!((slot.inject)(Box::new(Arc::new(String::from("x")))));
        assert_eq!(handle.get().unwrap().as_str(), "x");
    }

    #[test]
    fn slot_injection_rejects_wrong_type() {
        let mut decl = Declarations::new();
        let handle = decl.typed::<String>();
        let slot = decl.slots.pop().unwrap();

        assert!(!(slot.inject)(Box::new(Arc::new(7u8))));
        assert!(!handle.is_injected());
    }

    #[test]
    fn fn_module_declares() {
        let module = from_fn("Numbers", |m| {
            m.instance("one", 1u32);
        });
        let mut decl = Declarations::new();
        module.declare(&mut decl);
        assert_eq!(decl.factories.len(), 1);
        assert_eq!(module.name(), "Numbers");
    }
}
