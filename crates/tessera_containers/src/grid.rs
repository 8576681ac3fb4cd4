//! 2-D scalar fields with a padded payload.
//!
//! A grid payload is stored north-to-south, west-to-east, surrounded by a
//! border of [`Pad`] cells on each side. The pad exists so that boundary
//! conditions can be written into the border without reallocating; its
//! contents are not part of the grid's values.
//!
//! The layout helpers in this module are generic over the cell type and the
//! number of interleaved bands so that [`Image`](crate::Image) shares them.

use serde::{Deserialize, Serialize};

use crate::error::ContainerError;

/// A geographic or Cartesian bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    /// Minimum x.
    pub west: f64,
    /// Maximum x.
    pub east: f64,
    /// Minimum y.
    pub south: f64,
    /// Maximum y.
    pub north: f64,
}

impl Region {
    /// Creates a region from its four bounds.
    #[must_use]
    pub const fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }
}

/// Whether nodes sit on grid lines or at cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Registration {
    /// Nodes on the region boundary lines.
    #[default]
    Gridline,
    /// Nodes at the centers of cells tiling the region.
    Pixel,
}

impl Registration {
    /// One for gridline registration, zero for pixel registration.
    #[must_use]
    pub fn node_offset(self) -> usize {
        match self {
            Self::Gridline => 1,
            Self::Pixel => 0,
        }
    }
}

/// Border cells around a raster payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pad {
    /// Columns west of the data.
    pub west: usize,
    /// Columns east of the data.
    pub east: usize,
    /// Rows south of the data.
    pub south: usize,
    /// Rows north of the data.
    pub north: usize,
}

impl Pad {
    /// The same pad on all four sides.
    #[must_use]
    pub const fn uniform(n: usize) -> Self {
        Self {
            west: n,
            east: n,
            south: n,
            north: n,
        }
    }
}

/// Shape and extent metadata of a grid or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    /// Number of columns.
    pub nx: usize,
    /// Number of rows.
    pub ny: usize,
    /// Extent of the nodes (gridline) or cells (pixel).
    pub region: Region,
    /// Node spacing in x and y.
    pub inc: [f64; 2],
    /// Node registration.
    pub registration: Registration,
    /// Border of the in-memory payload; not part of the file format.
    #[serde(skip)]
    pub pad: Pad,
    /// Smallest non-NaN value.
    #[serde(default)]
    pub z_min: f64,
    /// Largest non-NaN value.
    #[serde(default)]
    pub z_max: f64,
    /// Free-form title.
    #[serde(default)]
    pub title: String,
    /// Free-form remark.
    #[serde(default)]
    pub remark: String,
}

impl GridHeader {
    /// Builds a header from a region and increments.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] if the region is empty or
    /// the increments are not positive.
    pub fn new(
        region: Region,
        inc: [f64; 2],
        registration: Registration,
    ) -> Result<Self, ContainerError> {
        if !(inc[0] > 0.0 && inc[1] > 0.0) {
            return Err(ContainerError::InvalidRegion(format!(
                "increments must be positive, got {inc:?}"
            )));
        }
        if !(region.east > region.west && region.north > region.south) {
            return Err(ContainerError::InvalidRegion(format!(
                "empty region {region:?}"
            )));
        }
        let offset = registration.node_offset();
        let nodes = |span: f64, step: f64| ((span / step).round() as usize).checked_add(offset);
        let (Some(nx), Some(ny)) = (
            nodes(region.east - region.west, inc[0]),
            nodes(region.north - region.south, inc[1]),
        ) else {
            return Err(ContainerError::InvalidRegion(format!(
                "region {region:?} holds too many nodes at increment {inc:?}"
            )));
        };
        if nx == 0 || ny == 0 {
            return Err(ContainerError::InvalidRegion(format!(
                "region {region:?} holds no nodes at increment {inc:?}"
            )));
        }
        let header = Self::with_dims(nx, ny, region, inc, registration);
        header.n_nodes()?;
        Ok(header)
    }

    /// Builds a header from node counts, deriving increments from the region.
    ///
    /// A degenerate axis (one gridline node) gets a unit increment.
    #[must_use]
    pub fn from_dims(nx: usize, ny: usize, region: Region, registration: Registration) -> Self {
        let offset = registration.node_offset();
        let spacing = |n: usize, span: f64| {
            let steps = n.saturating_sub(offset);
            if steps == 0 || span <= 0.0 {
                1.0
            } else {
                span / steps as f64
            }
        };
        let inc = [
            spacing(nx, region.east - region.west),
            spacing(ny, region.north - region.south),
        ];
        Self::with_dims(nx, ny, region, inc, registration)
    }

    fn with_dims(
        nx: usize,
        ny: usize,
        region: Region,
        inc: [f64; 2],
        registration: Registration,
    ) -> Self {
        Self {
            nx,
            ny,
            region,
            inc,
            registration,
            pad: Pad::default(),
            z_min: 0.0,
            z_max: 0.0,
            title: String::new(),
            remark: String::new(),
        }
    }

    /// Padded row length.
    #[must_use]
    pub fn mx(&self) -> usize {
        self.nx + self.pad.west + self.pad.east
    }

    /// Padded column height.
    #[must_use]
    pub fn my(&self) -> usize {
        self.ny + self.pad.south + self.pad.north
    }

    /// Number of cells in the padded payload.
    #[must_use]
    pub fn size(&self) -> usize {
        self.mx() * self.my()
    }

    /// Number of nodes, `nx * ny`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] if the count overflows.
    pub fn n_nodes(&self) -> Result<usize, ContainerError> {
        self.nx
            .checked_mul(self.ny)
            .ok_or_else(|| self.too_large(1))
    }

    /// Length of a padded payload holding `bands` values per node.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] if the length overflows.
    pub fn payload_len(&self, bands: usize) -> Result<usize, ContainerError> {
        let mx = self
            .nx
            .checked_add(self.pad.west)
            .and_then(|n| n.checked_add(self.pad.east));
        let my = self
            .ny
            .checked_add(self.pad.south)
            .and_then(|n| n.checked_add(self.pad.north));
        mx.zip(my)
            .and_then(|(mx, my)| mx.checked_mul(my))
            .and_then(|cells| cells.checked_mul(bands))
            .ok_or_else(|| self.too_large(bands))
    }

    fn too_large(&self, bands: usize) -> ContainerError {
        ContainerError::InvalidRegion(format!(
            "{} x {} nodes of {bands} band(s) exceed the addressable size",
            self.nx, self.ny
        ))
    }

    /// Offset of node (`row`, `col`) in a single-band padded payload.
    #[must_use]
    pub fn index(&self, row: usize, col: usize) -> usize {
        (row + self.pad.north) * self.mx() + col + self.pad.west
    }

    /// Computes the node window covered by `sub`, clipped to this header.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] if the clipped window holds
    /// no nodes.
    pub fn window(&self, sub: &Region) -> Result<Window, ContainerError> {
        let west = sub.west.max(self.region.west);
        let east = sub.east.min(self.region.east);
        let south = sub.south.max(self.region.south);
        let north = sub.north.min(self.region.north);
        if !(east >= west && north >= south) {
            return Err(ContainerError::InvalidRegion(format!(
                "subregion {sub:?} does not overlap {:?}",
                self.region
            )));
        }
        let offset = self.registration.node_offset();
        let [dx, dy] = self.inc;
        let col0 = ((west - self.region.west) / dx).round() as usize;
        let col1 = ((east - self.region.west) / dx).round() as usize;
        let row0 = ((self.region.north - north) / dy).round() as usize;
        let row1 = ((self.region.north - south) / dy).round() as usize;
        let nx = (col1 + offset).saturating_sub(col0).min(self.nx - col0.min(self.nx));
        let ny = (row1 + offset).saturating_sub(row0).min(self.ny - row0.min(self.ny));
        if nx == 0 || ny == 0 {
            return Err(ContainerError::InvalidRegion(format!(
                "subregion {sub:?} holds no nodes"
            )));
        }
        let mut header = self.clone();
        header.nx = nx;
        header.ny = ny;
        header.region.west = self.region.west + col0 as f64 * dx;
        header.region.east = header.region.west + (nx - offset) as f64 * dx;
        header.region.north = self.region.north - row0 as f64 * dy;
        header.region.south = header.region.north - (ny - offset) as f64 * dy;
        Ok(Window {
            col0,
            row0,
            header,
        })
    }
}

/// A rectangular node window inside a larger raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// First column of the window in the parent.
    pub col0: usize,
    /// First row (from the north) of the window in the parent.
    pub row0: usize,
    /// Header describing the window, with the parent's pad.
    pub header: GridHeader,
}

/// Allocates `len` default cells, failing instead of aborting when the
/// allocator refuses.
pub(crate) fn zeroed<T: Copy + Default>(len: usize) -> Result<Vec<T>, ContainerError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)?;
    data.resize(len, T::default());
    Ok(data)
}

/// Re-lays a padded payload with `bands` interleaved values per node under a
/// new pad. Border cells of the result are `T::default()`.
pub(crate) fn repad<T: Copy + Default>(
    header: &GridHeader,
    data: &[T],
    bands: usize,
    pad: Pad,
) -> Result<Vec<T>, ContainerError> {
    let mut target = header.clone();
    target.pad = pad;
    let mut out = zeroed(target.payload_len(bands)?)?;
    copy_nodes(header, data, &target, &mut out, bands, 0, 0);
    Ok(out)
}

/// Copies the nodes of `target` out of `source`, starting at node
/// (`row0`, `col0`) of the source.
pub(crate) fn copy_nodes<T: Copy>(
    source: &GridHeader,
    data: &[T],
    target: &GridHeader,
    out: &mut [T],
    bands: usize,
    row0: usize,
    col0: usize,
) {
    for row in 0..target.ny {
        let src = source.index(row0 + row, col0) * bands;
        let dst = target.index(row, 0) * bands;
        let len = target.nx * bands;
        out[dst..dst + len].copy_from_slice(&data[src..src + len]);
    }
}

/// A 2-D scalar field.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Shape and extent metadata.
    pub header: GridHeader,
    /// Padded payload; empty while only the header has been read.
    pub data: Vec<f32>,
}

impl Grid {
    /// Allocates a zero-filled payload for `header`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::InvalidRegion`] if the payload length
    /// overflows and [`ContainerError::Memory`] if it cannot be allocated.
    pub fn new(header: GridHeader) -> Result<Self, ContainerError> {
        let data = zeroed(header.payload_len(1)?)?;
        Ok(Self { header, data })
    }

    /// Creates a grid carrying only its header.
    #[must_use]
    pub fn header_only(header: GridHeader) -> Self {
        Self {
            header,
            data: Vec::new(),
        }
    }

    /// Builds a grid from `nx * ny` unpadded values ordered north to south.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ShapeMismatch`] if `values` has the wrong
    /// length.
    pub fn from_values(header: GridHeader, values: &[f32]) -> Result<Self, ContainerError> {
        let expected = header.n_nodes()?;
        if values.len() != expected {
            return Err(ContainerError::ShapeMismatch {
                expected,
                found: values.len(),
            });
        }
        let mut grid = Self::new(header)?;
        let nx = grid.header.nx;
        for row in 0..grid.header.ny {
            let dst = grid.header.index(row, 0);
            grid.data[dst..dst + nx].copy_from_slice(&values[row * nx..(row + 1) * nx]);
        }
        grid.update_z_range();
        Ok(grid)
    }

    /// Returns `true` when the payload has not been read yet.
    #[must_use]
    pub fn is_header_only(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads node (`row`, `col`), rows counted from the north.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.header.ny || col >= self.header.nx {
            return None;
        }
        self.data.get(self.header.index(row, col)).copied()
    }

    /// Writes node (`row`, `col`); out-of-range writes are ignored.
    pub fn set_value(&mut self, row: usize, col: usize, value: f32) {
        if row < self.header.ny && col < self.header.nx {
            let i = self.header.index(row, col);
            if let Some(slot) = self.data.get_mut(i) {
                *slot = value;
            }
        }
    }

    /// Copies the unpadded node values, north to south.
    #[must_use]
    pub fn values(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.header.nx * self.header.ny);
        for row in 0..self.header.ny {
            let start = self.header.index(row, 0);
            out.extend_from_slice(&self.data[start..start + self.header.nx]);
        }
        out
    }

    /// Changes the border width, reallocating the payload when present.
    ///
    /// # Errors
    ///
    /// Fails when the padded payload cannot be sized or allocated; the grid
    /// is left unchanged.
    pub fn set_pad(&mut self, pad: Pad) -> Result<(), ContainerError> {
        if self.header.pad == pad {
            return Ok(());
        }
        if !self.is_header_only() {
            self.data = repad(&self.header, &self.data, 1, pad)?;
        }
        self.header.pad = pad;
        Ok(())
    }

    /// Copies out the nodes inside `window`, keeping this grid's pad.
    ///
    /// # Errors
    ///
    /// Fails when the window payload cannot be sized or allocated.
    pub fn extract(&self, window: &Window) -> Result<Self, ContainerError> {
        let mut out = zeroed(window.header.payload_len(1)?)?;
        copy_nodes(
            &self.header,
            &self.data,
            &window.header,
            &mut out,
            1,
            window.row0,
            window.col0,
        );
        let mut grid = Self {
            header: window.header.clone(),
            data: out,
        };
        grid.update_z_range();
        Ok(grid)
    }

    /// Recomputes `z_min`/`z_max` from the non-NaN nodes.
    pub fn update_z_range(&mut self) {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in self.values() {
            if !v.is_nan() {
                lo = lo.min(f64::from(v));
                hi = hi.max(f64::from(v));
            }
        }
        if lo <= hi {
            self.header.z_min = lo;
            self.header.z_max = hi;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_4x3() -> GridHeader {
        GridHeader::new(
            Region::new(0.0, 3.0, 0.0, 2.0),
            [1.0, 1.0],
            Registration::Gridline,
        )
        .unwrap()
    }

    #[test]
    fn header_counts_gridline_and_pixel_nodes() {
        let h = header_4x3();
        assert_eq!((h.nx, h.ny), (4, 3));

        let p = GridHeader::new(
            Region::new(0.0, 3.0, 0.0, 2.0),
            [1.0, 1.0],
            Registration::Pixel,
        )
        .unwrap();
        assert_eq!((p.nx, p.ny), (3, 2));
    }

    #[test]
    fn header_rejects_empty_region() {
        let err = GridHeader::new(
            Region::new(1.0, 1.0, 0.0, 2.0),
            [1.0, 1.0],
            Registration::Gridline,
        );
        assert!(matches!(err, Err(ContainerError::InvalidRegion(_))));
    }

    #[test]
    fn from_dims_derives_increments() {
        let h = GridHeader::from_dims(
            5,
            3,
            Region::new(0.0, 8.0, 0.0, 4.0),
            Registration::Gridline,
        );
        assert_eq!(h.inc, [2.0, 2.0]);
    }

    #[test]
    fn repad_preserves_values() {
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut grid = Grid::from_values(header_4x3(), &values).unwrap();
        grid.set_pad(Pad::uniform(2)).unwrap();
        assert_eq!(grid.data.len(), 8 * 7);
        assert_eq!(grid.values(), values);
        assert_eq!(grid.value(2, 3), Some(11.0));

        grid.set_pad(Pad::default()).unwrap();
        assert_eq!(grid.data, values);
    }

    #[test]
    fn window_extracts_interior_block() {
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let grid = Grid::from_values(header_4x3(), &values).unwrap();
        let window = grid.header.window(&Region::new(1.0, 2.0, 0.0, 1.0)).unwrap();
        assert_eq!((window.col0, window.row0), (1, 1));
        let sub = grid.extract(&window).unwrap();
        assert_eq!((sub.header.nx, sub.header.ny), (2, 2));
        assert_eq!(sub.values(), vec![5.0, 6.0, 9.0, 10.0]);
        assert_eq!(sub.header.region, Region::new(1.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn window_outside_region_fails() {
        let h = header_4x3();
        assert!(h.window(&Region::new(10.0, 12.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_allocating() {
        let mut h = header_4x3();
        h.nx = 1_000_000_000_000;
        h.ny = 1_000_000_000;
        assert!(matches!(h.n_nodes(), Err(ContainerError::InvalidRegion(_))));
        assert!(matches!(h.payload_len(1), Err(ContainerError::InvalidRegion(_))));
        assert!(Grid::new(h.clone()).is_err());
        assert!(Grid::from_values(h, &[]).is_err());
    }

    #[test]
    fn unaddressable_payload_is_a_memory_error() {
        let mut h = header_4x3();
        h.nx = 100_000_000;
        h.ny = 100_000_000;
        assert_eq!(h.n_nodes().unwrap(), 10_000_000_000_000_000);
        assert!(matches!(Grid::new(h), Err(ContainerError::Memory(_))));
    }

    #[test]
    fn oversized_region_is_rejected() {
        let err = GridHeader::new(
            Region::new(0.0, 1.0e300, 0.0, 1.0e300),
            [1.0e-300, 1.0e-300],
            Registration::Gridline,
        );
        assert!(matches!(err, Err(ContainerError::InvalidRegion(_))));
    }
}
