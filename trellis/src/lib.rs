//! # Trellis: additive dependency injection for Rust
//!
//! Declare modules, each with the dependencies it needs and the instances
//! it provides; Trellis orders them, builds every instance exactly once
//! and hands them out by name or by type.
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! struct Database { url: String }
//! struct Service { db: Arc<Database> }
//!
//! let service = module::from_fn("ServiceModule", |m| {
//!     let db = m.named::<Database>("db");
//!     m.factory("svc", move || Ok(Arc::new(Service { db: db.get()? })));
//! });
//! let storage = module::from_fn("StorageModule", |m| {
//!     m.instance("db", Database { url: "postgres://localhost".into() });
//! });
//!
//! let container = create_container(&[&service, &storage])?;
//! let svc: Arc<Service> = container.instance()?;
//! assert_eq!(svc.db.url, "postgres://localhost");
//! # Ok::<(), TrellisError>(())
//! ```

pub use trellis_container::*;
pub use trellis_support::{logging, rendering};
