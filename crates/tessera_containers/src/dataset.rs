//! Numeric tables grouped into segments.

use crate::error::ContainerError;

/// One segment of numeric records, stored column-major.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSegment {
    /// Text following the segment marker, if the segment had one.
    pub header: Option<String>,
    /// One vector per column; all have the same length.
    pub columns: Vec<Vec<f64>>,
}

impl DataSegment {
    /// Creates an empty segment with `n_columns` columns.
    #[must_use]
    pub fn new(n_columns: usize, header: Option<String>) -> Self {
        Self {
            header,
            columns: vec![Vec::new(); n_columns],
        }
    }

    /// Returns the number of records in the segment.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Returns record `row` as a freshly allocated vector.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.n_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[row]).collect())
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ColumnMismatch`] if `values` does not have one
    /// entry per column.
    pub fn push_row(&mut self, values: &[f64]) -> Result<(), ContainerError> {
        if values.len() != self.columns.len() {
            return Err(ContainerError::ColumnMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (column, v) in self.columns.iter_mut().zip(values) {
            column.push(*v);
        }
        Ok(())
    }
}

/// One table: optional header lines and a list of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    /// Table header lines, without the leading comment marker.
    pub headers: Vec<String>,
    /// Segments in file order.
    pub segments: Vec<DataSegment>,
}

impl DataTable {
    /// Returns the number of records across all segments.
    #[must_use]
    pub fn n_records(&self) -> usize {
        self.segments.iter().map(DataSegment::n_rows).sum()
    }
}

/// A collection of numeric tables sharing one column count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Number of columns of every record.
    pub n_columns: usize,
    /// Tables in input order.
    pub tables: Vec<DataTable>,
}

impl Dataset {
    /// Creates a dataset with no tables.
    #[must_use]
    pub fn new(n_columns: usize) -> Self {
        Self {
            n_columns,
            tables: Vec::new(),
        }
    }

    /// Creates a dataset pre-sized with zero-filled records.
    #[must_use]
    pub fn with_shape(n_tables: usize, n_segments: usize, n_rows: usize, n_columns: usize) -> Self {
        let segment = DataSegment {
            header: None,
            columns: vec![vec![0.0; n_rows]; n_columns],
        };
        let table = DataTable {
            headers: Vec::new(),
            segments: vec![segment; n_segments],
        };
        Self {
            n_columns,
            tables: vec![table; n_tables],
        }
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    /// Returns the number of segments across all tables.
    #[must_use]
    pub fn n_segments(&self) -> usize {
        self.tables.iter().map(|t| t.segments.len()).sum()
    }

    /// Returns the number of records across all tables.
    #[must_use]
    pub fn n_records(&self) -> usize {
        self.tables.iter().map(DataTable::n_records).sum()
    }

    /// Iterates over every segment of every table.
    pub fn segments(&self) -> impl Iterator<Item = &DataSegment> {
        self.tables.iter().flat_map(|t| t.segments.iter())
    }

    /// Releases spare capacity in every column.
    pub fn shrink_to_fit(&mut self) {
        self.tables.shrink_to_fit();
        for table in &mut self.tables {
            table.segments.shrink_to_fit();
            for segment in &mut table.segments {
                segment.columns.iter_mut().for_each(Vec::shrink_to_fit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_shape_counts() {
        let ds = Dataset::with_shape(2, 3, 4, 5);
        assert_eq!(ds.n_tables(), 2);
        assert_eq!(ds.n_segments(), 6);
        assert_eq!(ds.n_records(), 24);
        assert_eq!(ds.segments().next().map(|s| s.columns.len()), Some(5));
    }

    #[test]
    fn push_row_checks_columns() {
        let mut segment = DataSegment::new(2, None);
        segment.push_row(&[1.0, 2.0]).unwrap();
        let err = segment.push_row(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::ColumnMismatch {
                expected: 2,
                found: 1
            }
        ));
        assert_eq!(segment.row(0), Some(vec![1.0, 2.0]));
        assert_eq!(segment.row(1), None);
    }
}
