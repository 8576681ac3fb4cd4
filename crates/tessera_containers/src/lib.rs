//! Container types exchanged through the tessera broker (Layer 0).
//!
//! Every resource the broker moves is one of seven families:
//!
//! - [`Dataset`] - numeric records grouped into segments and tables
//! - [`TextTable`] - text lines grouped the same way
//! - [`ColorPalette`] - a z-to-color lookup table
//! - [`Grid`] - a 2-D scalar field with a padded payload
//! - [`Image`] - a 2-D multi-band raster with the grid layout
//! - [`Matrix`] - an opaque typed 2-D array from a host program
//! - [`Vector`] - independently typed columns from a host program
//!
//! They are wrapped in the [`Container`] sum type and shared through
//! [`ContainerRef`]. The [`codec`] module reads and writes each family's
//! text format.
//!
//! # Example
//!
//! ```
//! use tessera_containers::{Container, ContainerRef, Dataset};
//! use tessera_containers::codec::Codec;
//!
//! let table = Dataset::decode(&mut "1 2\n3 4\n".as_bytes()).unwrap();
//! let handle = ContainerRef::new(Container::Dataset(table));
//! assert_eq!(handle.dataset().unwrap().n_records(), 2);
//! ```

/// Text encodings.
pub mod codec;

mod container;
mod dataset;
mod error;
mod family;
mod grid;
mod image;
mod matrix;
mod numeric;
mod palette;
mod text_table;
mod vector;

pub use container::{Container, ContainerAddr, ContainerRef, ContainerShape};
pub use dataset::{DataSegment, DataTable, Dataset};
pub use error::ContainerError;
pub use family::{Family, Geometry};
pub use grid::{Grid, GridHeader, Pad, Region, Registration, Window};
pub use image::Image;
pub use matrix::{MemoryOrder, Matrix};
pub use numeric::{NumericArray, ScalarKind};
pub use palette::{ColorPalette, ColorSlice, Rgb};
pub use text_table::{TextFile, TextSegment, TextTable};
pub use vector::Vector;
