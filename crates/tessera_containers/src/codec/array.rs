use std::io::{BufRead, Write};

use super::{Codec, LineKind, TABLE_HEADER_MARKER, classify, format_numbers, parse_numbers};
use crate::error::ContainerError;
use crate::matrix::Matrix;
use crate::numeric::{NumericArray, ScalarKind};
use crate::vector::Vector;

/// Reads numeric rows of equal width; returns the rows and the last header.
fn read_rows(reader: &mut dyn BufRead) -> Result<(Vec<Vec<f64>>, Option<String>), ContainerError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut header = None;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        match classify(&line) {
            LineKind::Blank | LineKind::SegmentHeader(_) => {}
            LineKind::TableHeader(text) => header = Some(text.to_string()),
            LineKind::Data(text) => {
                let values = parse_numbers(text, i + 1)?;
                if let Some(first) = rows.first()
                    && first.len() != values.len()
                {
                    return Err(ContainerError::parse(
                        i + 1,
                        format!("expected {} columns, found {}", first.len(), values.len()),
                    ));
                }
                rows.push(values);
            }
        }
    }
    Ok((rows, header))
}

impl Codec for Matrix {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let (rows, _) = read_rows(reader)?;
        let n_columns = rows.first().map_or(0, Vec::len);
        let mut matrix = Self::new(rows.len(), n_columns, 1, ScalarKind::F64);
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                matrix.set(r, c, 0, *v);
            }
        }
        Ok(matrix)
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        let mut row = Vec::with_capacity(self.n_columns);
        for layer in 0..self.n_layers {
            for r in 0..self.n_rows {
                row.clear();
                row.extend((0..self.n_columns).filter_map(|c| self.get(r, c, layer)));
                writeln!(writer, "{}", format_numbers(&row))?;
            }
        }
        Ok(())
    }
}

impl Codec for Vector {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let (rows, header) = read_rows(reader)?;
        let n_columns = rows.first().map_or(0, Vec::len);
        let columns = (0..n_columns)
            .map(|c| {
                let column: Vec<f64> = rows.iter().map(|row| row[c]).collect();
                NumericArray::F64(column)
            })
            .collect();
        let mut vector = Self::from_columns(columns)?;
        if let Some(header) = header {
            let names: Vec<String> = header.split_whitespace().map(str::to_string).collect();
            if names.len() == n_columns {
                vector.names = names;
            }
        }
        Ok(vector)
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        if !self.names.is_empty() {
            writeln!(writer, "{TABLE_HEADER_MARKER} {}", self.names.join(" "))?;
        }
        let mut row = Vec::with_capacity(self.n_columns());
        for r in 0..self.n_rows() {
            row.clear();
            row.extend(self.columns.iter().filter_map(|c| c.get_f64(r)));
            writeln!(writer, "{}", format_numbers(&row))?;
        }
        Ok(())
    }
}
