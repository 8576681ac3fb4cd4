//! # Tessera Internal Library
//!
//! Re-exports the core tessera crates for convenience.

/// Layer 0: container types and text codecs.
pub use tessera_containers;

/// Layer 1: the resource broker.
pub use tessera_system;

/// Log output setup.
pub use tessera_tracing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tessera_containers::{
        Container, ContainerRef, ContainerShape, Dataset, Family, Geometry, Grid, GridHeader,
        Image, Matrix, Pad, Region, Registration, ScalarKind, TextTable, Vector,
    };
    pub use tessera_system::prelude::*;
    pub use tessera_tracing::{TracingConfig, TracingFormat};
}
