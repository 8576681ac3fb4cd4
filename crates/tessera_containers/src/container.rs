//! The container sum type and its shared handle.
//!
//! Every payload that crosses the broker is a [`Container`]. Containers are
//! shared through [`ContainerRef`], a reference-counted handle behind a
//! `parking_lot` lock, so that a host program and the broker can both hold
//! the same allocation. The handle's [`ContainerAddr`] is its identity: two
//! handles alias the same memory exactly when their addresses are equal.

use core::fmt;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::ContainerError;
use crate::family::Family;
use crate::grid::{Grid, GridHeader, Pad, Region, Registration};
use crate::image::Image;
use crate::matrix::Matrix;
use crate::numeric::ScalarKind;
use crate::palette::ColorPalette;
use crate::text_table::TextTable;
use crate::vector::Vector;

/// A materialized resource of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// Numeric tables.
    Dataset(Dataset),
    /// Text tables.
    TextTable(TextTable),
    /// Color palette.
    ColorPalette(ColorPalette),
    /// Scalar grid.
    Grid(Grid),
    /// Multi-band image.
    Image(Image),
    /// Typed 2-D array.
    Matrix(Matrix),
    /// Typed column set.
    Vector(Vector),
}

macro_rules! accessors {
    ($($variant:ident, $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        impl Container {
            $(
                #[doc = concat!("Borrows the payload if this is a `", stringify!($variant), "`.")]
                #[must_use]
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                #[doc = concat!(
                    "Mutably borrows the payload if this is a `",
                    stringify!($variant),
                    "`."
                )]
                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Self::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }
    };
}

accessors! {
    Dataset, Dataset, as_dataset, as_dataset_mut;
    TextTable, TextTable, as_text_table, as_text_table_mut;
    ColorPalette, ColorPalette, as_palette, as_palette_mut;
    Grid, Grid, as_grid, as_grid_mut;
    Image, Image, as_image, as_image_mut;
    Matrix, Matrix, as_matrix, as_matrix_mut;
    Vector, Vector, as_vector, as_vector_mut;
}

impl Container {
    /// Returns the family of the payload.
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Self::Dataset(_) => Family::Dataset,
            Self::TextTable(_) => Family::TextTable,
            Self::ColorPalette(_) => Family::ColorPalette,
            Self::Grid(_) => Family::Grid,
            Self::Image(_) => Family::Image,
            Self::Matrix(_) => Family::Matrix,
            Self::Vector(_) => Family::Vector,
        }
    }

    /// Returns the raster header of a grid or image.
    #[must_use]
    pub fn raster_header(&self) -> Option<&GridHeader> {
        match self {
            Self::Grid(g) => Some(&g.header),
            Self::Image(i) => Some(&i.header),
            _ => None,
        }
    }

    /// Re-pads a grid or image; other families are unaffected.
    ///
    /// # Errors
    ///
    /// Fails when the padded payload cannot be sized or allocated.
    pub fn set_pad(&mut self, pad: Pad) -> Result<(), ContainerError> {
        match self {
            Self::Grid(g) => g.set_pad(pad),
            Self::Image(i) => i.set_pad(pad),
            _ => Ok(()),
        }
    }

    /// Allocates an empty container of the requested shape.
    ///
    /// Grids and images receive `pad`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] for an empty or oversized
    /// raster extent and [`ContainerError::Memory`] when the payload cannot
    /// be allocated.
    pub fn empty(shape: &ContainerShape, pad: Pad) -> Result<Self, ContainerError> {
        Ok(match *shape {
            ContainerShape::Dataset {
                n_tables,
                n_segments,
                n_rows,
                n_columns,
            } => Self::Dataset(Dataset::with_shape(n_tables, n_segments, n_rows, n_columns)),
            ContainerShape::TextTable {
                n_tables,
                n_segments,
                n_rows,
            } => Self::TextTable(TextTable::with_shape(n_tables, n_segments, n_rows)),
            ContainerShape::ColorPalette { n_slices } => {
                Self::ColorPalette(ColorPalette::with_slices(n_slices))
            }
            ContainerShape::Grid {
                region,
                inc,
                registration,
            } => {
                let mut header = GridHeader::new(region, inc, registration)?;
                header.pad = pad;
                Self::Grid(Grid::new(header)?)
            }
            ContainerShape::Image {
                region,
                inc,
                registration,
                n_bands,
            } => {
                let mut header = GridHeader::new(region, inc, registration)?;
                header.pad = pad;
                Self::Image(Image::new(header, n_bands)?)
            }
            ContainerShape::Matrix {
                n_rows,
                n_columns,
                n_layers,
                kind,
            } => Self::Matrix(Matrix::new(n_rows, n_columns, n_layers, kind)),
            ContainerShape::Vector {
                n_columns,
                n_rows,
                kind,
            } => Self::Vector(Vector::new(n_columns, n_rows, kind)),
        })
    }
}

/// Shape parameters for allocating an empty container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerShape {
    /// Zero-filled numeric tables.
    Dataset {
        /// Number of tables.
        n_tables: usize,
        /// Segments per table.
        n_segments: usize,
        /// Rows per segment.
        n_rows: usize,
        /// Columns per row.
        n_columns: usize,
    },
    /// Empty-line text tables.
    TextTable {
        /// Number of tables.
        n_tables: usize,
        /// Segments per table.
        n_segments: usize,
        /// Lines per segment.
        n_rows: usize,
    },
    /// A palette of black slices.
    ColorPalette {
        /// Number of slices.
        n_slices: usize,
    },
    /// A zero grid covering `region`.
    Grid {
        /// Extent.
        region: Region,
        /// Node spacing.
        inc: [f64; 2],
        /// Node registration.
        registration: Registration,
    },
    /// A black image covering `region`.
    Image {
        /// Extent.
        region: Region,
        /// Node spacing.
        inc: [f64; 2],
        /// Node registration.
        registration: Registration,
        /// Bands per pixel.
        n_bands: usize,
    },
    /// A zero matrix.
    Matrix {
        /// Rows.
        n_rows: usize,
        /// Columns.
        n_columns: usize,
        /// Layers.
        n_layers: usize,
        /// Element width.
        kind: ScalarKind,
    },
    /// Zero columns.
    Vector {
        /// Columns.
        n_columns: usize,
        /// Rows per column.
        n_rows: usize,
        /// Element width of every column.
        kind: ScalarKind,
    },
}

impl ContainerShape {
    /// Returns the family this shape allocates.
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Self::Dataset { .. } => Family::Dataset,
            Self::TextTable { .. } => Family::TextTable,
            Self::ColorPalette { .. } => Family::ColorPalette,
            Self::Grid { .. } => Family::Grid,
            Self::Image { .. } => Family::Image,
            Self::Matrix { .. } => Family::Matrix,
            Self::Vector { .. } => Family::Vector,
        }
    }
}

/// Identity of a container allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerAddr(usize);

impl fmt::Display for ContainerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Shared handle to a [`Container`].
///
/// Cloning the handle aliases the same allocation; use
/// [`deep_clone`](Self::deep_clone) to copy the payload.
#[derive(Clone)]
pub struct ContainerRef(Arc<RwLock<Container>>);

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("addr", &self.addr())
            .finish_non_exhaustive()
    }
}

impl From<Container> for ContainerRef {
    fn from(container: Container) -> Self {
        Self::new(container)
    }
}

macro_rules! typed_guards {
    ($($name:ident, $name_mut:ident, $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        impl ContainerRef {
            $(
                #[doc = concat!(
                    "Read guard on the `",
                    stringify!($ty),
                    "` payload, if the family matches."
                )]
                #[must_use]
                pub fn $name(&self) -> Option<MappedRwLockReadGuard<'_, $ty>> {
                    RwLockReadGuard::try_map(self.0.read(), Container::$as_ref).ok()
                }

                #[doc = concat!(
                    "Write guard on the `",
                    stringify!($ty),
                    "` payload, if the family matches."
                )]
                #[must_use]
                pub fn $name_mut(&self) -> Option<MappedRwLockWriteGuard<'_, $ty>> {
                    RwLockWriteGuard::try_map(self.0.write(), Container::$as_mut).ok()
                }
            )*
        }
    };
}

typed_guards! {
    dataset, dataset_mut, Dataset, as_dataset, as_dataset_mut;
    text_table, text_table_mut, TextTable, as_text_table, as_text_table_mut;
    palette, palette_mut, ColorPalette, as_palette, as_palette_mut;
    grid, grid_mut, Grid, as_grid, as_grid_mut;
    image, image_mut, Image, as_image, as_image_mut;
    matrix, matrix_mut, Matrix, as_matrix, as_matrix_mut;
    vector, vector_mut, Vector, as_vector, as_vector_mut;
}

impl ContainerRef {
    /// Wraps a container in a new allocation.
    #[must_use]
    pub fn new(container: Container) -> Self {
        Self(Arc::new(RwLock::new(container)))
    }

    /// Returns the identity of the allocation.
    #[must_use]
    pub fn addr(&self) -> ContainerAddr {
        ContainerAddr(Arc::as_ptr(&self.0).addr())
    }

    /// Returns `true` if both handles alias the same allocation.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Blocks until a read guard is available.
    pub fn read(&self) -> RwLockReadGuard<'_, Container> {
        self.0.read()
    }

    /// Blocks until a write guard is available.
    pub fn write(&self) -> RwLockWriteGuard<'_, Container> {
        self.0.write()
    }

    /// Attempts a read guard without blocking.
    #[must_use]
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Container>> {
        self.0.try_read()
    }

    /// Attempts a write guard without blocking.
    #[must_use]
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, Container>> {
        self.0.try_write()
    }

    /// Copies the payload into a new, unaliased allocation.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self::new(self.0.read().clone())
    }

    /// Returns the number of live handles to this allocation.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_aliases_deep_clone_does_not() {
        let a = ContainerRef::new(Container::Dataset(Dataset::new(2)));
        let b = a.clone();
        let c = a.deep_clone();
        assert_eq!(a.addr(), b.addr());
        assert!(a.same_as(&b));
        assert_ne!(a.addr(), c.addr());
        assert_eq!(*a.read(), *c.read());
    }

    #[test]
    fn typed_guard_matches_family() {
        let h = ContainerRef::new(Container::Dataset(Dataset::new(3)));
        assert_eq!(h.dataset().map(|d| d.n_columns), Some(3));
        assert!(h.grid().is_none());
        h.dataset_mut().unwrap().n_columns = 4;
        assert_eq!(h.read().as_dataset().unwrap().n_columns, 4);
    }

    #[test]
    fn empty_grid_is_padded() {
        let shape = ContainerShape::Grid {
            region: Region::new(0.0, 9.0, 0.0, 4.0),
            inc: [1.0, 1.0],
            registration: Registration::Gridline,
        };
        let c = Container::empty(&shape, Pad::uniform(2)).unwrap();
        let grid = c.as_grid().unwrap();
        assert_eq!(grid.data.len(), (10 + 4) * (5 + 4));
        assert_eq!(shape.family(), Family::Grid);
    }

    #[test]
    fn try_write_fails_while_read_held() {
        let h = ContainerRef::new(Container::Vector(Vector::default()));
        let _guard = h.read();
        assert!(h.try_write().is_none());
        assert!(h.try_read().is_some());
    }
}
