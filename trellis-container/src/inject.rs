//! Dependency slots.
//!
//! An [`Inject<T>`] is handed out when a module declares a dependency and
//! is filled exactly once by the container, before any factory of that
//! module runs. Factories capture a clone and read it with [`Inject::get`].

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{Result, TrellisError};

/// A write-once handle to a dependency of type `T`.
///
/// Clones share the same cell.
pub struct Inject<T: ?Sized> {
    cell: Arc<OnceCell<Arc<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Inject<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the injected instance.
    ///
    /// # Errors
    /// [`TrellisError::NotInjected`] when read before the container
    /// resolved this slot.
    pub fn get(&self) -> Result<Arc<T>> {
        self.cell.get().cloned().ok_or_else(|| TrellisError::NotInjected {
            type_name: type_name::<T>(),
        })
    }

    /// Returns `true` once the container has filled this slot.
    pub fn is_injected(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Fills the slot. Returns `false` if it was already filled.
    pub(crate) fn fill(&self, value: Arc<T>) -> bool {
        self.cell.set(value).is_ok()
    }
}

impl<T: ?Sized> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &type_name::<T>())
            .field("injected", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Clock: Send + Sync {}
    struct Fixed;
    impl Clock for Fixed {}

    #[test]
    fn get_before_fill_fails() {
        let slot = Inject::<String>::new();
        assert!(!slot.is_injected());
        match slot.get() {
            Err(TrellisError::NotInjected { type_name }) => assert!(type_name.contains("String")),
            other => panic!("Expected NotInjected, got: {other:?}"),
        }
    }

    #[test]
    fn fill_once_shared_by_clones() {
        let slot = Inject::<String>::new();
        let copy = slot.clone();

        assert!(slot.fill(Arc::new("first".into())));
        assert!(!copy.fill(Arc::new("second".into())));
        assert_eq!(copy.get().unwrap().as_str(), "first");
        assert!(Arc::ptr_eq(&slot.get().unwrap(), &copy.get().unwrap()));
    }

    #[test]
    fn trait_object_slot() {
        let slot = Inject::<dyn Clock>::new();
        assert!(slot.fill(Arc::new(Fixed)));
        assert!(slot.is_injected());
    }
}
