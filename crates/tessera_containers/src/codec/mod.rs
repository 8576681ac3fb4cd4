//! Text encodings of every container family.
//!
//! The formats are deliberately small:
//!
//! | Family | Format |
//! |--------|--------|
//! | Dataset, TextTable | `#` table headers, `>` segment markers, one record per line |
//! | ColorPalette | `z0 r/g/b z1 r/g/b [;label]` slices plus `B`/`F`/`N` lines |
//! | Grid, Image | one JSON header line, then one line per row from the north |
//! | Matrix | one line per row |
//! | Vector | one line per row, one value per column |
//!
//! Line classification and number formatting are exposed so that record
//! streaming can read and write the same table format one line at a time.

mod array;
mod palette;
mod raster;
mod table;

pub use raster::{read_grid_header, read_grid_values, read_image_header, read_image_values};

use std::io::{BufRead, Write};

use crate::container::Container;
use crate::error::ContainerError;
use crate::family::Family;

/// Marker opening a table header line.
pub const TABLE_HEADER_MARKER: char = '#';

/// Marker opening a segment header line.
pub const SEGMENT_MARKER: char = '>';

/// Encoding and decoding of one container family.
pub trait Codec: Sized {
    /// Reads a complete container.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] on malformed input or I/O failure.
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError>;

    /// Writes the container.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] on I/O failure.
    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError>;
}

/// The role of one line of a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Whitespace only.
    Blank,
    /// A table header; the text after the marker.
    TableHeader(&'a str),
    /// A segment marker; the trimmed text after the marker, possibly empty.
    SegmentHeader(&'a str),
    /// A data line, trimmed of its line ending.
    Data(&'a str),
}

/// Classifies one line of a table file.
#[must_use]
pub fn classify(line: &str) -> LineKind<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if let Some(rest) = trimmed.strip_prefix(TABLE_HEADER_MARKER) {
        LineKind::TableHeader(rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix(SEGMENT_MARKER) {
        LineKind::SegmentHeader(rest.trim())
    } else {
        LineKind::Data(line)
    }
}

/// Parses whitespace- or comma-separated numbers.
///
/// # Errors
///
/// Returns [`ContainerError::Parse`] naming `line_no` for a non-numeric token.
pub fn parse_numbers(text: &str, line_no: usize) -> Result<Vec<f64>, ContainerError> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| ContainerError::parse(line_no, format!("not a number: {t:?}")))
        })
        .collect()
}

/// Formats numbers tab-separated using the shortest round-trip form.
#[must_use]
pub fn format_numbers(values: &[f64]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&v.to_string());
    }
    out
}

impl Container {
    /// Decodes a container of `family`.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] on malformed input or I/O failure.
    pub fn decode(family: Family, reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        Ok(match family {
            Family::Dataset => Self::Dataset(Codec::decode(reader)?),
            Family::TextTable => Self::TextTable(Codec::decode(reader)?),
            Family::ColorPalette => Self::ColorPalette(Codec::decode(reader)?),
            Family::Grid => Self::Grid(Codec::decode(reader)?),
            Family::Image => Self::Image(Codec::decode(reader)?),
            Family::Matrix => Self::Matrix(Codec::decode(reader)?),
            Family::Vector => Self::Vector(Codec::decode(reader)?),
        })
    }

    /// Encodes the container in its family's format.
    ///
    /// # Errors
    ///
    /// Returns a [`ContainerError`] on I/O failure.
    pub fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        match self {
            Self::Dataset(c) => c.encode(writer),
            Self::TextTable(c) => c.encode(writer),
            Self::ColorPalette(c) => c.encode(writer),
            Self::Grid(c) => c.encode(writer),
            Self::Image(c) => c.encode(writer),
            Self::Matrix(c) => c.encode(writer),
            Self::Vector(c) => c.encode(writer),
        }
    }
}
