//! Error types for container construction and lookup.
//!
//! Every failure carries the offending module, name or type in the value
//! itself, so callers can report it without consulting logs.

use std::fmt;

use trellis_support::rendering::{render_chain, shorten_type_name};

use crate::key::{SlotKey, TypeKey};

/// Main error type for all Trellis operations.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    /// A module's declarations cannot be interpreted.
    #[error("{}", .0)]
    InvalidModule(ModuleDescriptionError),

    /// Modules depend on each other in a loop.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// No instance matches the requested name or type.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// More than one instance matches the requested type.
    #[error("{}", .0)]
    Ambiguous(AmbiguousInstanceError),

    /// Two factories declare the same instance name.
    #[error("{}", .0)]
    DuplicateName(DuplicateNameError),

    /// The named instance is not assignable to the requested type.
    #[error("{}", .0)]
    TypeMismatch(TypeMismatchError),

    /// A factory returned an error.
    #[error("Failed to construct instance {instance:?}: {source}")]
    ConstructionFailed {
        instance: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A dependency slot was read before the container injected it.
    #[error(
        "Dependency slot of type {type_name} was read before injection\n  Hint: only read slots inside the factories of the module that declared them"
    )]
    NotInjected { type_name: &'static str },
}

impl TrellisError {
    /// Builds [`TrellisError::ConstructionFailed`] from any error a factory reports.
    pub fn construction(
        instance: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TrellisError::ConstructionFailed {
            instance: instance.into(),
            source: source.into(),
        }
    }

    /// Attributes a lookup failure to the module whose slot triggered it.
    ///
    /// Errors that are not lookup failures pass through unchanged.
    pub fn required_by(self, module: &str) -> Self {
        match self {
            TrellisError::NotRegistered(mut err) => {
                err.required_by = Some(module.to_string());
                TrellisError::NotRegistered(err)
            }
            TrellisError::Ambiguous(mut err) => {
                err.required_by = Some(module.to_string());
                TrellisError::Ambiguous(err)
            }
            TrellisError::TypeMismatch(mut err) => {
                err.required_by = Some(module.to_string());
                TrellisError::TypeMismatch(err)
            }
            other => other,
        }
    }
}

/// A module declared something the container cannot use.
#[derive(Debug)]
pub struct ModuleDescriptionError {
    /// Name of the offending module
    pub module: String,
    /// Everything wrong with it, in declaration order
    pub problems: Vec<String>,
}

impl fmt::Display for ModuleDescriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid module {}:", self.module)?;
        for problem in &self.problems {
            write!(f, "\n  - {problem}")?;
        }
        Ok(())
    }
}

/// Modules that depend on each other in a loop.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Module names forming the cycle; the first name is repeated at the end.
    /// Example: `["A", "B", "A"]`
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency between modules:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: move the shared instance into a module that neither side depends on"
        )
    }
}

/// Nothing matches a name or type lookup.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// What was asked for
    pub requested: SlotKey,
    /// Module whose dependency slot asked (none for post-build queries)
    pub required_by: Option<String>,
    /// Registered names or types that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No instance registered for {}", self.requested)?;

        if let Some(ref module) = self.required_by {
            write!(f, "\n  Required by module: {module}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        if let SlotKey::Type(key) = &self.requested {
            write!(
                f,
                "\n  Hint: declare a factory of type {0}, or mark one as .assignable_to::<{0}>()",
                key.short_name()
            )?;
        }
        Ok(())
    }
}

/// A type lookup matched several instances.
#[derive(Debug)]
pub struct AmbiguousInstanceError {
    /// The requested type
    pub requested: TypeKey,
    /// Names of every matching instance
    pub candidates: Vec<String>,
    /// Whether candidates were found through the assignable fallback
    pub via_assignable: bool,
    /// Module whose dependency slot asked (none for post-build queries)
    pub required_by: Option<String>,
}

impl fmt::Display for AmbiguousInstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = if self.via_assignable { "assignable to" } else { "declared as" };
        write!(
            f,
            "{} instances {how} {}: {}",
            self.candidates.len(),
            self.requested,
            self.candidates.join(", "),
        )?;
        if let Some(ref module) = self.required_by {
            write!(f, "\n  Required by module: {module}")?;
        }
        write!(f, "\n  Hint: depend on one of them by name instead")
    }
}

/// Two factories claim the same instance name.
#[derive(Debug)]
pub struct DuplicateNameError {
    /// The contested name
    pub name: String,
    /// Module that declared it first
    pub first_module: String,
    /// Module that declared it again
    pub second_module: String,
}

impl fmt::Display for DuplicateNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instance name {:?} is declared by both {} and {}",
            self.name, self.first_module, self.second_module,
        )?;
        write!(f, "\n  Hint: instance names must be unique across all modules")
    }
}

/// An instance found by name cannot be viewed as the requested type.
#[derive(Debug)]
pub struct TypeMismatchError {
    /// Instance name
    pub name: String,
    /// Type the caller wanted
    pub expected: TypeKey,
    /// Type the factory declared
    pub found: TypeKey,
    /// Module whose dependency slot asked (none for post-build queries)
    pub required_by: Option<String>,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instance {:?} has type {}, which is not assignable to {}",
            self.name,
            shorten_type_name(self.found.type_name()),
            shorten_type_name(self.expected.type_name()),
        )?;
        if let Some(ref module) = self.required_by {
            write!(f, "\n  Required by module: {module}")?;
        }
        Ok(())
    }
}

/// Convenient Result type for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;
