//! Lookup keys.
//!
//! [`TypeKey`] identifies a declared type (sized or not, so trait objects
//! work). [`SlotKey`] is what a dependency slot asks for: a name or a type.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use trellis_support::rendering::shorten_type_name;

/// Identifies a type in the container's type index.
///
/// # Examples
/// ```
/// use trellis_container::key::TypeKey;
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
///
/// trait Logger {}
/// assert_ne!(TypeKey::of::<dyn Logger>(), TypeKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of this type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths, for messages.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

// identity is the TypeId alone; type_name is diagnostic only
impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// What a dependency slot is resolved by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Exact instance name.
    Name(String),
    /// Declared type, with assignable fallback.
    Type(TypeKey),
}

impl SlotKey {
    /// Text used for "did you mean?" matching.
    pub(crate) fn as_lookup_text(&self) -> &str {
        match self {
            SlotKey::Name(name) => name,
            SlotKey::Type(key) => key.type_name(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Name(name) => write!(f, "name {name:?}"),
            SlotKey::Type(key) => write!(f, "type {key}"),
        }
    }
}
