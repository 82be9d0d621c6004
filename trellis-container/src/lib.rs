//! Core container implementation for Trellis DI.
//!
//! Construction runs in four steps: modules are described, ordered by a
//! dependency graph, instantiated in that order, and their instances
//! indexed by name and by type.

mod capability;
pub mod container;
mod descriptor;
pub mod error;
mod executor;
mod graph;
pub mod inject;
pub mod key;
pub mod module;
mod registry;
pub mod report;

pub use container::{Container, ContainerBuilder, create_container, prelude};
pub use error::{Result, TrellisError};
pub use inject::Inject;
pub use key::{SlotKey, TypeKey};
pub use module::{Declarations, Module};
pub use report::ContainerReport;
