//! Opaque typed 2-D arrays handed in by host programs.

use crate::grid::{Region, Registration};
use crate::numeric::{NumericArray, ScalarKind};

/// Element ordering of a [`Matrix`] layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrder {
    /// Consecutive elements run along a row.
    #[default]
    RowMajor,
    /// Consecutive elements run down a column.
    ColumnMajor,
}

/// A typed 2-D numeric array with optional layers.
///
/// Layers are stored one after another; inside a layer the `order` decides
/// whether rows or columns are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_columns: usize,
    /// Number of layers (bands).
    pub n_layers: usize,
    /// Element order inside a layer.
    pub order: MemoryOrder,
    /// Extent described by the matrix when it stands in for a raster.
    pub region: Region,
    /// Registration used when the matrix stands in for a raster.
    pub registration: Registration,
    /// The elements.
    pub data: NumericArray,
}

impl Matrix {
    /// Allocates a zero-filled matrix.
    #[must_use]
    pub fn new(n_rows: usize, n_columns: usize, n_layers: usize, kind: ScalarKind) -> Self {
        Self {
            n_rows,
            n_columns,
            n_layers,
            order: MemoryOrder::RowMajor,
            region: Region::default(),
            registration: Registration::Gridline,
            data: NumericArray::zeros(kind, n_rows * n_columns * n_layers),
        }
    }

    /// Sets the element order.
    #[must_use]
    pub fn with_order(mut self, order: MemoryOrder) -> Self {
        self.order = order;
        self
    }

    /// Sets the raster extent.
    #[must_use]
    pub fn with_region(mut self, region: Region, registration: Registration) -> Self {
        self.region = region;
        self.registration = registration;
        self
    }

    /// Offset of (`row`, `col`, `layer`) in `data`.
    #[must_use]
    pub fn index(&self, row: usize, col: usize, layer: usize) -> usize {
        let inner = match self.order {
            MemoryOrder::RowMajor => row * self.n_columns + col,
            MemoryOrder::ColumnMajor => col * self.n_rows + row,
        };
        layer * self.n_rows * self.n_columns + inner
    }

    /// Reads an element as `f64`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize, layer: usize) -> Option<f64> {
        if row >= self.n_rows || col >= self.n_columns || layer >= self.n_layers {
            return None;
        }
        self.data.get_f64(self.index(row, col, layer))
    }

    /// Writes an element from `f64`; out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, layer: usize, value: f64) {
        if row < self.n_rows && col < self.n_columns && layer < self.n_layers {
            let i = self.index(row, col, layer);
            self.data.set_f64(i, value);
        }
    }

    /// Returns `true` if the region describes a non-empty extent.
    #[must_use]
    pub fn has_region(&self) -> bool {
        self.region.east > self.region.west && self.region.north > self.region.south
    }
}
