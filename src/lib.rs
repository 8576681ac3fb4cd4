//! A resource broker moving grids, images, tables and host arrays between
//! files, streams and memory, with ownership-aware cleanup.
//!
//! ```
//! use tessera::prelude::*;
//!
//! let mut session = Session::new("quickstart");
//! let (id, name) = session.open_virtual_output(Family::Dataset, Geometry::None).unwrap();
//! assert!(tessera::tessera_system::virtual_locator::is_virtual(&name));
//!
//! let table = session
//!     .create_empty_container(ContainerShape::Dataset {
//!         n_tables: 1,
//!         n_segments: 1,
//!         n_rows: 2,
//!         n_columns: 3,
//!     })
//!     .unwrap();
//! session.export(Family::Dataset, id, IoMode::ALL, &table).unwrap();
//! assert_eq!(session.retrieve_realized(id).unwrap().dataset().unwrap().n_records(), 2);
//! ```

pub use tessera_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tessera_internal::prelude::*;
}
