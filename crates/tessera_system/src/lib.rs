//! The tessera resource broker (Layer 1).
//!
//! `tessera_system` moves containers between a host program and the
//! modules it runs:
//!
//! - [`session`] - one broker instance and its registry of resources
//! - [`descriptor`] - resource requests, locators, methods and descriptors
//! - [`record_io`] - record-by-record streaming over datasets and text tables
//! - [`gc`] - ownership-aware destruction and scoped collection
//! - [`module`] - nested units of work and the scope they give resources
//! - [`virtual_locator`] - names that stand for registered resources
//! - [`config`] - session configuration
//! - [`error`] - the broker error type
//!
//! Import and export are methods on [`Session`](session::Session):
//! [`import`](session::Session::import) realizes an input resource as a
//! container, [`export`](session::Session::export) writes a container to an
//! output resource.
//!
//! # Architecture
//!
//! - **Layer 0** (`tessera_containers`): container types and text codecs
//! - **Layer 1** (`tessera_system`): the broker (this crate)
//! - **Layer 2** (`tessera_tracing`): log output setup for host programs
//!
//! # Example
//!
//! ```
//! use tessera_containers::{Container, ContainerRef, Dataset, Family};
//! use tessera_system::prelude::*;
//!
//! let mut session = Session::new("example");
//! let table = ContainerRef::new(Container::Dataset(Dataset::with_shape(1, 1, 2, 2)));
//!
//! let id = session
//!     .register(ResourceRequest::input(
//!         Family::Dataset,
//!         Method::CopyInMemory,
//!         Locator::memory(&table),
//!     ))
//!     .unwrap();
//! let copy = session.import(Family::Dataset, id, IoMode::ALL).unwrap();
//! assert!(!copy.same_as(&table));
//!
//! let stats = session.destroy().unwrap();
//! assert_eq!(stats.frees, 1);
//! ```

mod adapter;
mod export;
mod import;
mod registry;

/// Session configuration.
pub mod config;

/// Resource requests, locators and descriptors.
pub mod descriptor;

/// The broker error type.
pub mod error;

/// Ownership-aware destruction and scoped collection.
pub mod gc;

/// Nested units of work.
pub mod module;

/// Record-by-record streaming.
pub mod record_io;

/// The broker session.
pub mod session;

/// Names that stand for registered resources.
pub mod virtual_locator;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::descriptor::*;
    pub use crate::error::*;
    pub use crate::gc::*;
    pub use crate::module::*;
    pub use crate::record_io::*;
    pub use crate::session::*;
}
