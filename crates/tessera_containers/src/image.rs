//! Multi-band rasters sharing the grid layout.

use crate::error::ContainerError;
use crate::grid::{GridHeader, Pad, Window, copy_nodes, repad, zeroed};

/// A 2-D raster of `n_bands` byte values per node, interleaved by pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Shape and extent metadata.
    pub header: GridHeader,
    /// Values per node (1 = gray, 3 = RGB, 4 = RGBA).
    pub n_bands: usize,
    /// Padded payload; empty while only the header has been read.
    pub data: Vec<u8>,
}

impl Image {
    /// Allocates a zero-filled payload.
    ///
    /// # Errors
    ///
    /// Fails when the payload length overflows or cannot be allocated.
    pub fn new(header: GridHeader, n_bands: usize) -> Result<Self, ContainerError> {
        let data = zeroed(header.payload_len(n_bands)?)?;
        Ok(Self {
            header,
            n_bands,
            data,
        })
    }

    /// Creates an image carrying only its header.
    #[must_use]
    pub fn header_only(header: GridHeader, n_bands: usize) -> Self {
        Self {
            header,
            n_bands,
            data: Vec::new(),
        }
    }

    /// Builds an image from unpadded pixel-interleaved values, north to south.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ShapeMismatch`] on a length mismatch.
    pub fn from_values(
        header: GridHeader,
        n_bands: usize,
        values: &[u8],
    ) -> Result<Self, ContainerError> {
        let expected = header.n_nodes()?.checked_mul(n_bands).ok_or_else(|| {
            ContainerError::InvalidRegion(format!("{n_bands} bands overflow the payload"))
        })?;
        if values.len() != expected {
            return Err(ContainerError::ShapeMismatch {
                expected,
                found: values.len(),
            });
        }
        let mut image = Self::new(header, n_bands)?;
        let row_len = image.header.nx * n_bands;
        for row in 0..image.header.ny {
            let dst = image.header.index(row, 0) * n_bands;
            image.data[dst..dst + row_len]
                .copy_from_slice(&values[row * row_len..(row + 1) * row_len]);
        }
        Ok(image)
    }

    /// Returns `true` when the payload has not been read yet.
    #[must_use]
    pub fn is_header_only(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads band `band` of node (`row`, `col`).
    #[must_use]
    pub fn value(&self, row: usize, col: usize, band: usize) -> Option<u8> {
        if row >= self.header.ny || col >= self.header.nx || band >= self.n_bands {
            return None;
        }
        self.data
            .get(self.header.index(row, col) * self.n_bands + band)
            .copied()
    }

    /// Copies the unpadded pixel-interleaved values, north to south.
    #[must_use]
    pub fn values(&self) -> Vec<u8> {
        let row_len = self.header.nx * self.n_bands;
        let mut out = Vec::with_capacity(row_len * self.header.ny);
        for row in 0..self.header.ny {
            let start = self.header.index(row, 0) * self.n_bands;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        out
    }

    /// Changes the border width, reallocating the payload when present.
    ///
    /// # Errors
    ///
    /// Fails when the padded payload cannot be sized or allocated.
    pub fn set_pad(&mut self, pad: Pad) -> Result<(), ContainerError> {
        if self.header.pad == pad {
            return Ok(());
        }
        if !self.is_header_only() {
            self.data = repad(&self.header, &self.data, self.n_bands, pad)?;
        }
        self.header.pad = pad;
        Ok(())
    }

    /// Copies out the pixels inside `window`, keeping this image's pad.
    ///
    /// # Errors
    ///
    /// Fails when the window payload cannot be sized or allocated.
    pub fn extract(&self, window: &Window) -> Result<Self, ContainerError> {
        let mut out = zeroed(window.header.payload_len(self.n_bands)?)?;
        copy_nodes(
            &self.header,
            &self.data,
            &window.header,
            &mut out,
            self.n_bands,
            window.row0,
            window.col0,
        );
        Ok(Self {
            header: window.header.clone(),
            n_bands: self.n_bands,
            data: out,
        })
    }
}
