//! Assignability: which types an instance can be handed out as.
//!
//! Rust has no runtime subtyping, so every factory carries an explicit
//! capability set: its own declared type plus any types it was marked
//! `.assignable_to::<U>()`. Each capability is a *view* that turns the
//! stored `Arc<T>` into an `Arc<U>`. [`is_assignable`] is the single
//! policy deciding whether an instance satisfies a requested type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::TypeKey;

/// A type-erased instance: a `Box` holding an `Arc<T>`.
pub(crate) type Erased = Box<dyn Any + Send + Sync>;

type ProjectFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<Erased> + Send + Sync>;

/// One type an instance can be viewed as.
#[derive(Clone)]
pub(crate) struct View {
    target: TypeKey,
    project: ProjectFn,
}

impl View {
    /// View of an `Arc<T>` as itself.
    pub fn identity<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            target: TypeKey::of::<T>(),
            project: Arc::new(|value: &(dyn Any + Send + Sync)| {
                value
                    .downcast_ref::<Arc<T>>()
                    .map(|arc| Box::new(Arc::clone(arc)) as Erased)
            }),
        }
    }

    /// View of an `Arc<T>` as an `Arc<U>` through `cast`.
    pub fn cast<T, U>(cast: impl Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
    {
        Self {
            target: TypeKey::of::<U>(),
            project: Arc::new(move |value: &(dyn Any + Send + Sync)| {
                value
                    .downcast_ref::<Arc<T>>()
                    .map(|arc| Box::new(cast(Arc::clone(arc))) as Erased)
            }),
        }
    }

    pub fn target(&self) -> TypeKey {
        self.target
    }
}

/// The declared type of an instance plus everything it is assignable to.
#[derive(Clone)]
pub struct Capabilities {
    declared: TypeKey,
    views: Vec<View>,
}

impl Capabilities {
    /// Capabilities of a factory producing `Arc<T>`, before any extra views.
    pub(crate) fn of<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            declared: TypeKey::of::<T>(),
            views: vec![View::identity::<T>()],
        }
    }

    pub(crate) fn push(&mut self, view: View) {
        self.views.push(view);
    }

    /// The type the factory declared.
    pub fn declared(&self) -> TypeKey {
        self.declared
    }

    /// Every type this instance satisfies, declared type first.
    pub fn types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.views.iter().map(View::target)
    }

    /// Turns a stored value into an `Arc` of `target`, boxed.
    ///
    /// Returns `None` when the instance is not assignable to `target`.
    pub(crate) fn project(&self, value: &(dyn Any + Send + Sync), target: TypeKey) -> Option<Erased> {
        self.views
            .iter()
            .find(|view| view.target == target)
            .and_then(|view| (view.project)(value))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types().map(|t| t.type_name())).finish()
    }
}

/// Decides whether an instance with `candidate` capabilities satisfies `target`.
///
/// An instance is assignable to its declared type and to every type it
/// was explicitly marked assignable to. Nothing else.
pub fn is_assignable(candidate: &Capabilities, target: TypeKey) -> bool {
    candidate.types().any(|ty| ty == target)
}
