//! # The Container: heart of Trellis
//!
//! Builds every instance declared by a set of modules exactly once, in
//! dependency order, and serves them by name or by type afterwards.
//!
//! # Architecture
//! ```text
//! modules ──extract──> descriptors ──graph──> order ──instantiate──> Container
//!                                                                      │
//!                                                        instance::<T>() / instance_by_name::<T>()
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use trellis_container::prelude::*;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let logging = module::from_fn("Logging", |m| {
//!     m.instance("console", ConsoleLogger)
//!         .assignable_to::<dyn Logger>(|c| c as Arc<dyn Logger>);
//! });
//!
//! let services = module::from_fn("Services", |m| {
//!     let logger = m.typed::<dyn Logger>();
//!     m.factory("users", move || Ok(Arc::new(UserService { logger: logger.get()? })));
//! });
//!
//! let container = Container::builder()
//!     .module(services)
//!     .module(logging)
//!     .build()
//!     .expect("Failed to build container");
//!
//! let users: Arc<UserService> = container.instance().expect("Failed to resolve");
//! users.logger.log("ready");
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, trace};

use crate::descriptor::ModuleDescriptor;
use crate::error::{Result, TrellisError};
use crate::executor::instantiate;
use crate::graph::DependencyGraph;
use crate::key::TypeKey;
use crate::module::Module;
use crate::registry::Registry;
use crate::report::ContainerReport;

/// Builds a container from `modules`, in the given order.
///
/// The only failure-free outcome is a fully built container: any module,
/// graph or factory error aborts the whole build.
pub fn create_container(modules: &[&dyn Module]) -> Result<Container> {
    Container::from_modules(modules.iter().copied())
}

// ============================================================
// ContainerBuilder
// ============================================================

/// Collects modules, then builds a [`Container`].
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .module(ConfigModule::from_env())
///     .module(StorageModule)
///     .module(ServiceModule)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    modules: Vec<Box<dyn Module>>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Adds a module.
    pub fn module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Adds already boxed modules, keeping their order.
    pub fn modules(mut self, modules: impl IntoIterator<Item = Box<dyn Module>>) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Builds the container.
    ///
    /// # Errors
    /// Any [`TrellisError`] raised while describing modules, ordering
    /// them or running their factories.
    pub fn build(self) -> Result<Container> {
        Container::from_modules(self.modules.iter().map(|m| &**m as &dyn Module))
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Fully built, read-only set of instances.
///
/// Every lookup returns a clone of the same `Arc`; the container itself
/// is `Send + Sync` and can be shared freely once built.
pub struct Container {
    registry: Registry,
    report: ContainerReport,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    #[instrument(skip_all, name = "container_build")]
    fn from_modules<'m>(modules: impl IntoIterator<Item = &'m dyn Module>) -> Result<Self> {
        let descriptors = ModuleDescriptor::extract_all(modules)?;
        info!(modules = descriptors.len(), "Building container");

        let order = DependencyGraph::build(&descriptors)?.instantiation_order()?;

        let mut slots: Vec<Option<ModuleDescriptor>> = descriptors.into_iter().map(Some).collect();
        let ordered: Vec<ModuleDescriptor> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        let (registry, report) = instantiate(ordered)?;

        info!(instances = registry.len(), "Container built successfully ✓");
        Ok(Self { registry, report })
    }

    /// Returns the unique instance of type `T`.
    ///
    /// Prefers instances declared as exactly `T`; when there are none,
    /// falls back to the unique instance assignable to `T`.
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.instance()?;
    /// let log: Arc<dyn Logger> = container.instance()?;
    /// ```
    ///
    /// # Errors
    /// [`TrellisError::NotRegistered`] when nothing matches,
    /// [`TrellisError::Ambiguous`] when several instances do.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let key = TypeKey::of::<T>();
        trace!(key = %key, "Resolving by type");
        downcast::<T>(self.registry.resolve_type(key)?)
    }

    /// Returns the instance registered under `name`, viewed as `T`.
    ///
    /// # Errors
    /// [`TrellisError::NotRegistered`] for an unknown name,
    /// [`TrellisError::TypeMismatch`] when it is not assignable to `T`.
    pub fn instance_by_name<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        trace!(name, "Resolving by name");
        downcast::<T>(self.registry.resolve_name(name, TypeKey::of::<T>())?)
    }

    /// Returns `true` if an instance is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Instance names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.iter().map(|record| record.name.as_str())
    }

    /// Returns the number of instances.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if no module declared any factory.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// What was built, module by module, in instantiation order.
    pub fn report(&self) -> &ContainerReport {
        &self.report
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("instances", &self.registry.len())
            .field("order", &self.report.order())
            .finish()
    }
}

fn downcast<T: ?Sized + 'static>(value: crate::capability::Erased) -> Result<Arc<T>> {
    value.downcast::<Arc<T>>().map(|arc| *arc).map_err(|_| {
        TrellisError::construction(
            std::any::type_name::<T>(),
            "stored instance does not match its declared view",
        )
    })
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, create_container};
    pub use crate::error::{Result, TrellisError};
    pub use crate::inject::Inject;
    pub use crate::key::TypeKey;
    pub use crate::module::{self, Declarations, Module};
    pub use crate::report::ContainerReport;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Declarations, from_fn};
    use std::sync::atomic::{AtomicU32, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Formal;
    impl Greeter for Formal {
        fn greet(&self) -> String {
            "Good day".into()
        }
    }

    struct Casual;
    impl Greeter for Casual {
        fn greet(&self) -> String {
            "Hey".into()
        }
    }

    struct GreeterModule;

    impl Module for GreeterModule {
        fn declare(&self, m: &mut Declarations) {
            m.instance("formal", Formal)
                .assignable_to::<dyn Greeter>(|g| g as Arc<dyn Greeter>);
        }

        fn name(&self) -> &str {
            "GreeterModule"
        }
    }

    #[test]
    fn container_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Container>();
    }

    #[test]
    fn resolve_by_exact_type_and_name() {
        let container = Container::builder()
            .module(from_fn("Config", |m| {
                m.instance("port", 8080u16);
            }))
            .build()
            .unwrap();

        assert_eq!(*container.instance::<u16>().unwrap(), 8080);
        assert_eq!(*container.instance_by_name::<u16>("port").unwrap(), 8080);
        assert!(container.contains("port"));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn resolve_trait_object_through_assignable() {
        let container = Container::builder().module(GreeterModule).build().unwrap();

        let greeter: Arc<dyn Greeter> = container.instance().unwrap();
        assert_eq!(greeter.greet(), "Good day");

        let by_name: Arc<dyn Greeter> = container.instance_by_name("formal").unwrap();
        assert_eq!(by_name.greet(), "Good day");
    }

    #[test]
    fn ambiguous_assignable_lookup() {
        let container = Container::builder()
            .module(GreeterModule)
            .module(from_fn("Casual", |m| {
                m.instance("casual", Casual)
                    .assignable_to::<dyn Greeter>(|g| g as Arc<dyn Greeter>);
            }))
            .build()
            .unwrap();

        assert!(matches!(
            container.instance::<dyn Greeter>(),
            Err(TrellisError::Ambiguous(_))
        ));
        // exact types stay unambiguous
        assert_eq!(container.instance::<Casual>().unwrap().greet(), "Hey");
    }

    #[test]
    fn query_errors_leave_container_usable() {
        let container = Container::builder().module(GreeterModule).build().unwrap();

        assert!(matches!(
            container.instance_by_name::<Formal>("missing"),
            Err(TrellisError::NotRegistered(_))
        ));
        assert!(matches!(
            container.instance_by_name::<String>("formal"),
            Err(TrellisError::TypeMismatch(_))
        ));
        assert!(container.instance::<Formal>().is_ok());
    }

    #[test]
    fn factory_called_once() {
        let counter = Arc::new(AtomicU32::new(0));

        let container = Container::builder()
            .module(from_fn("Counted", {
                let counter = counter.clone();
                move |m| {
                    let counter = counter.clone();
                    m.factory("value", move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Arc::new(42i32))
                    });
                }
            }))
            .build()
            .unwrap();

        let _a = container.instance::<i32>().unwrap();
        let _b = container.instance_by_name::<i32>("value").unwrap();
        let _c = container.instance::<i32>().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn create_container_from_borrowed_modules() {
        let config = from_fn("Config", |m| {
            m.instance("name", String::from("trellis"));
        });

        let container = create_container(&[&config, &GreeterModule]).unwrap();
        let names: Vec<_> = container.names().collect();
        assert_eq!(names, vec!["name", "formal"]);
        assert_eq!(container.report().order(), vec!["Config", "GreeterModule"]);
    }

    #[test]
    fn empty_container() {
        let container = Container::builder().build().unwrap();
        assert!(container.is_empty());
        assert!(matches!(
            container.instance::<i32>(),
            Err(TrellisError::NotRegistered(_))
        ));
    }

    #[test]
    fn debug_display() {
        let container = Container::builder()
            .module(GreeterModule)
            .module(from_fn("Config", |m| {
                m.instance("flag", true);
            }))
            .build()
            .unwrap();

        let debug = format!("{container:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("instances: 2"));
        assert!(debug.contains("GreeterModule"));

        let builder = format!("{:?}", Container::builder().module(GreeterModule));
        assert!(builder.contains("GreeterModule"));
    }
}
