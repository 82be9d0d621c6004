//! Instance registry: every instance a container has built.
//!
//! Instances live in one insertion-ordered store. Two indices point into it:
//! - by name: unique across the container
//! - by declared type: insertion-ordered, may hold several entries
//!
//! The assignable fallback scans the store itself, so both indices always
//! agree on the set of instances. The registry only grows while the
//! container is being built and is read-only afterwards.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace, warn};
use trellis_support::rendering::suggest_similar;

use crate::capability::{Capabilities, Erased, is_assignable};
use crate::error::{
    AmbiguousInstanceError, DuplicateNameError, NotRegisteredError, Result, TrellisError,
    TypeMismatchError,
};
use crate::key::{SlotKey, TypeKey};

const MAX_SUGGESTIONS: usize = 3;

/// One built instance.
pub(crate) struct InstanceRecord {
    pub name: String,
    /// Module whose factory produced it
    pub module: String,
    pub capabilities: Capabilities,
    /// Boxed `Arc<T>` where `T` is the declared type
    pub value: Erased,
}

impl InstanceRecord {
    fn value(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }

    /// The instance as an `Arc` of `target`, boxed, if assignable.
    pub fn project(&self, target: TypeKey) -> Option<Erased> {
        self.capabilities.project(self.value(), target)
    }
}

impl fmt::Debug for InstanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRecord")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Name and type indices over the built instances.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    instances: Vec<InstanceRecord>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeKey, Vec<usize>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance under its name and declared type.
    ///
    /// # Errors
    /// [`TrellisError::DuplicateName`] if the name is taken.
    pub fn insert(&mut self, record: InstanceRecord) -> Result<()> {
        if let Some(&existing) = self.by_name.get(&record.name) {
            return Err(TrellisError::DuplicateName(DuplicateNameError {
                name: record.name,
                first_module: self.instances[existing].module.clone(),
                second_module: record.module,
            }));
        }

        let index = self.instances.len();
        let declared = record.capabilities.declared();

        debug!(name = %record.name, ty = %declared, module = %record.module, "Registered instance");
        self.by_name.insert(record.name.clone(), index);
        self.by_type.entry(declared).or_default().push(index);
        self.instances.push(record);
        Ok(())
    }

    /// Exact lookup by name.
    pub fn find_by_name(&self, name: &str) -> Result<&InstanceRecord> {
        trace!(name, "Looking up by name");
        self.by_name
            .get(name)
            .map(|&index| &self.instances[index])
            .ok_or_else(|| self.not_registered(SlotKey::Name(name.to_string())))
    }

    /// Looks up `name` and views it as `target`.
    pub fn resolve_name(&self, name: &str, target: TypeKey) -> Result<Erased> {
        let record = self.find_by_name(name)?;
        record.project(target).ok_or_else(|| {
            TrellisError::TypeMismatch(TypeMismatchError {
                name: name.to_string(),
                expected: target,
                found: record.capabilities.declared(),
                required_by: None,
            })
        })
    }

    /// Lookup by type: the exact-type index first, then the unique
    /// assignable instance.
    pub fn find_by_type(&self, target: TypeKey) -> Result<&InstanceRecord> {
        trace!(ty = %target, "Looking up by type");

        if let Some(indices) = self.by_type.get(&target) {
            return match indices.as_slice() {
                [only] => Ok(&self.instances[*only]),
                many => Err(self.ambiguous(target, many, false)),
            };
        }

        let assignable: Vec<usize> = self
            .instances
            .iter()
            .enumerate()
            .filter(|(_, record)| is_assignable(&record.capabilities, target))
            .map(|(index, _)| index)
            .collect();

        match assignable.as_slice() {
            [] => Err(self.not_registered(SlotKey::Type(target))),
            [only] => {
                trace!(ty = %target, name = %self.instances[*only].name, "Resolved through assignable fallback");
                Ok(&self.instances[*only])
            }
            many => Err(self.ambiguous(target, many, true)),
        }
    }

    /// Looks up by type and views the match as `target`.
    pub fn resolve_type(&self, target: TypeKey) -> Result<Erased> {
        let record = self.find_by_type(target)?;
        // exact matches and assignable matches both carry a view for `target`
        record.project(target).ok_or_else(|| {
            TrellisError::TypeMismatch(TypeMismatchError {
                name: record.name.clone(),
                expected: target,
                found: record.capabilities.declared(),
                required_by: None,
            })
        })
    }

    /// Instances in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.instances.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns the number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns true if nothing was built.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn ambiguous(&self, target: TypeKey, indices: &[usize], via_assignable: bool) -> TrellisError {
        let candidates: Vec<String> = indices
            .iter()
            .map(|&index| self.instances[index].name.clone())
            .collect();
        warn!(ty = %target, candidates = ?candidates, "Ambiguous type lookup");
        TrellisError::Ambiguous(AmbiguousInstanceError {
            requested: target,
            candidates,
            via_assignable,
            required_by: None,
        })
    }

    fn not_registered(&self, requested: SlotKey) -> TrellisError {
        let available: Vec<&str> = match &requested {
            SlotKey::Name(_) => self.instances.iter().map(|r| r.name.as_str()).collect(),
            SlotKey::Type(_) => self
                .instances
                .iter()
                .flat_map(|r| r.capabilities.types().map(|t| t.type_name()))
                .collect(),
        };

        let suggestions = suggest_similar(requested.as_lookup_text(), &available, MAX_SUGGESTIONS);
        TrellisError::NotRegistered(NotRegisteredError {
            requested,
            required_by: None,
            suggestions,
        })
    }
}
