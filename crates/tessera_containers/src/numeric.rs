//! Typed numeric storage shared by [`Matrix`](crate::Matrix) and
//! [`Vector`](crate::Vector).
//!
//! A [`NumericArray`] holds a contiguous buffer of one scalar width. All
//! element access goes through `f64`, which is exact for every width except
//! 64-bit integers beyond 2^53.

use serde::{Deserialize, Serialize};

/// Scalar element width of a [`NumericArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScalarKind {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    #[default]
    F64,
}

/// A contiguous buffer of a single scalar width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericArray {
    /// `u8` elements.
    U8(Vec<u8>),
    /// `i8` elements.
    I8(Vec<i8>),
    /// `u16` elements.
    U16(Vec<u16>),
    /// `i16` elements.
    I16(Vec<i16>),
    /// `u32` elements.
    U32(Vec<u32>),
    /// `i32` elements.
    I32(Vec<i32>),
    /// `u64` elements.
    U64(Vec<u64>),
    /// `i64` elements.
    I64(Vec<i64>),
    /// `f32` elements.
    F32(Vec<f32>),
    /// `f64` elements.
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            NumericArray::U8($v) => $body,
            NumericArray::I8($v) => $body,
            NumericArray::U16($v) => $body,
            NumericArray::I16($v) => $body,
            NumericArray::U32($v) => $body,
            NumericArray::I32($v) => $body,
            NumericArray::U64($v) => $body,
            NumericArray::I64($v) => $body,
            NumericArray::F32($v) => $body,
            NumericArray::F64($v) => $body,
        }
    };
}

impl NumericArray {
    /// Creates a zero-filled array of `len` elements.
    #[must_use]
    pub fn zeros(kind: ScalarKind, len: usize) -> Self {
        match kind {
            ScalarKind::U8 => Self::U8(vec![0; len]),
            ScalarKind::I8 => Self::I8(vec![0; len]),
            ScalarKind::U16 => Self::U16(vec![0; len]),
            ScalarKind::I16 => Self::I16(vec![0; len]),
            ScalarKind::U32 => Self::U32(vec![0; len]),
            ScalarKind::I32 => Self::I32(vec![0; len]),
            ScalarKind::U64 => Self::U64(vec![0; len]),
            ScalarKind::I64 => Self::I64(vec![0; len]),
            ScalarKind::F32 => Self::F32(vec![0.0; len]),
            ScalarKind::F64 => Self::F64(vec![0.0; len]),
        }
    }

    /// Builds an array of `kind` from `f64` values, converting each element.
    #[must_use]
    pub fn from_f64(kind: ScalarKind, values: &[f64]) -> Self {
        let mut array = Self::zeros(kind, values.len());
        for (i, v) in values.iter().enumerate() {
            array.set_f64(i, *v);
        }
        array
    }

    /// Returns the scalar width of the array.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::U8(_) => ScalarKind::U8,
            Self::I8(_) => ScalarKind::I8,
            Self::U16(_) => ScalarKind::U16,
            Self::I16(_) => ScalarKind::I16,
            Self::U32(_) => ScalarKind::U32,
            Self::I32(_) => ScalarKind::I32,
            Self::U64(_) => ScalarKind::U64,
            Self::I64(_) => ScalarKind::I64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    /// Returns `true` if the array holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads element `i` as `f64`, or `None` when out of bounds.
    #[must_use]
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        dispatch!(self, v => v.get(i).map(|x| *x as f64))
    }

    /// Writes element `i` from an `f64`, saturating integer widths.
    ///
    /// NaN stored into an integer width becomes zero. Out-of-bounds writes
    /// are ignored.
    pub fn set_f64(&mut self, i: usize, value: f64) {
        dispatch!(self, v => {
            if let Some(slot) = v.get_mut(i) {
                // `as` from f64 saturates and maps NaN to zero for integers.
                *slot = value as _;
            }
        });
    }

    /// Copies every element into a new `Vec<f64>`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        dispatch!(self, v => v.iter().map(|x| *x as f64).collect())
    }

    /// Appends one element converted from `f64`.
    pub fn push_f64(&mut self, value: f64) {
        dispatch!(self, v => v.push(value as _));
    }

    /// Shrinks the buffer capacity to the element count.
    pub fn shrink_to_fit(&mut self) {
        dispatch!(self, v => v.shrink_to_fit());
    }
}
