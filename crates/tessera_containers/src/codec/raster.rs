//! Grid and image files: one JSON header line followed by row lines.
//!
//! The header and the values can be read separately; after
//! [`read_grid_header`] the reader is positioned on the first row, so a
//! stream can deliver the payload in a later call.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use super::{Codec, parse_numbers};
use crate::error::ContainerError;
use crate::grid::{Grid, GridHeader};
use crate::image::Image;

#[derive(Serialize, Deserialize)]
struct ImageHeaderLine {
    #[serde(flatten)]
    header: GridHeader,
    n_bands: usize,
}

fn read_header_line(reader: &mut dyn BufRead) -> Result<String, ContainerError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(ContainerError::parse(1, "missing raster header"));
        }
        if !line.trim().is_empty() {
            return Ok(line);
        }
    }
}

/// Reads exactly `count` numbers, consuming whole lines only.
///
/// The buffer grows with the rows actually read, so a header declaring more
/// nodes than the input holds fails on the short payload instead of
/// reserving the declared size up front.
fn read_values(reader: &mut dyn BufRead, count: usize) -> Result<Vec<f64>, ContainerError> {
    let mut values = Vec::new();
    let mut line = String::new();
    let mut line_no = 1;
    while values.len() < count {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;
        let row = parse_numbers(&line, line_no)?;
        values.try_reserve(row.len())?;
        values.extend(row);
    }
    if values.len() != count {
        return Err(ContainerError::ShapeMismatch {
            expected: count,
            found: values.len(),
        });
    }
    Ok(values)
}

/// Reads the header line of a grid file.
///
/// # Errors
///
/// Returns a [`ContainerError`] if the line is missing or not a header.
pub fn read_grid_header(reader: &mut dyn BufRead) -> Result<GridHeader, ContainerError> {
    let line = read_header_line(reader)?;
    Ok(serde_json::from_str(&line)?)
}

/// Reads the unpadded values following a grid header, north to south.
///
/// # Errors
///
/// Returns a [`ContainerError`] if `nx * ny` overflows or fewer values
/// follow.
pub fn read_grid_values(
    reader: &mut dyn BufRead,
    header: &GridHeader,
) -> Result<Vec<f32>, ContainerError> {
    let values = read_values(reader, header.n_nodes()?)?;
    Ok(values.into_iter().map(|v| v as f32).collect())
}

/// Reads the header line of an image file, returning the band count too.
///
/// # Errors
///
/// Returns a [`ContainerError`] if the line is missing or not a header.
pub fn read_image_header(
    reader: &mut dyn BufRead,
) -> Result<(GridHeader, usize), ContainerError> {
    let line = read_header_line(reader)?;
    let parsed: ImageHeaderLine = serde_json::from_str(&line)?;
    Ok((parsed.header, parsed.n_bands))
}

/// Reads the unpadded pixel-interleaved values following an image header.
///
/// # Errors
///
/// Returns a [`ContainerError`] if the shape overflows or fewer values
/// follow than it needs.
pub fn read_image_values(
    reader: &mut dyn BufRead,
    header: &GridHeader,
    n_bands: usize,
) -> Result<Vec<u8>, ContainerError> {
    let count = header.n_nodes()?.checked_mul(n_bands).ok_or_else(|| {
        ContainerError::InvalidRegion(format!("{n_bands} bands overflow the payload"))
    })?;
    let values = read_values(reader, count)?;
    Ok(values.into_iter().map(|v| v as u8).collect())
}

impl Codec for Grid {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let header = read_grid_header(reader)?;
        let values = read_grid_values(reader, &header)?;
        Self::from_values(header, &values)
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        writeln!(writer, "{}", serde_json::to_string(&self.header)?)?;
        for row in 0..self.header.ny {
            let start = self.header.index(row, 0);
            let line: Vec<String> = self.data[start..start + self.header.nx]
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl Codec for Image {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let (header, n_bands) = read_image_header(reader)?;
        let values = read_image_values(reader, &header, n_bands)?;
        Self::from_values(header, n_bands, &values)
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        let line = ImageHeaderLine {
            header: self.header.clone(),
            n_bands: self.n_bands,
        };
        writeln!(writer, "{}", serde_json::to_string(&line)?)?;
        let row_len = self.header.nx * self.n_bands;
        for row in 0..self.header.ny {
            let start = self.header.index(row, 0) * self.n_bands;
            let line: Vec<String> = self.data[start..start + row_len]
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
