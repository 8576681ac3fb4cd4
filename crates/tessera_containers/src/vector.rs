//! Sets of named, independently typed columns.

use crate::error::ContainerError;
use crate::numeric::{NumericArray, ScalarKind};

/// Independently typed 1-D arrays of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector {
    /// The columns.
    pub columns: Vec<NumericArray>,
    /// Optional column names; empty or one per column.
    pub names: Vec<String>,
}

impl Vector {
    /// Allocates `n_columns` zero-filled columns of `kind`.
    #[must_use]
    pub fn new(n_columns: usize, n_rows: usize, kind: ScalarKind) -> Self {
        Self {
            columns: (0..n_columns)
                .map(|_| NumericArray::zeros(kind, n_rows))
                .collect(),
            names: Vec::new(),
        }
    }

    /// Builds a vector from columns, checking their lengths agree.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ShapeMismatch`] if the columns differ in length.
    pub fn from_columns(columns: Vec<NumericArray>) -> Result<Self, ContainerError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(ContainerError::ShapeMismatch {
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(Self {
            columns,
            names: Vec::new(),
        })
    }

    /// Attaches column names.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, NumericArray::len)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&NumericArray> {
        let i = self.names.iter().position(|n| n == name)?;
        self.columns.get(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_width_columns() {
        let v = Vector::from_columns(vec![
            NumericArray::from_f64(ScalarKind::F64, &[1.0, 2.0]),
            NumericArray::from_f64(ScalarKind::U8, &[3.0, 4.0]),
        ])
        .unwrap()
        .with_names(vec!["x".into(), "flag".into()]);
        assert_eq!(v.n_rows(), 2);
        assert_eq!(v.column("flag").map(NumericArray::kind), Some(ScalarKind::U8));
    }

    #[test]
    fn ragged_columns_rejected() {
        let err = Vector::from_columns(vec![
            NumericArray::zeros(ScalarKind::F64, 2),
            NumericArray::zeros(ScalarKind::F64, 3),
        ]);
        assert!(matches!(err, Err(ContainerError::ShapeMismatch { .. })));
    }
}
