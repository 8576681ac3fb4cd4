//! Element-wise conversion between host arrays and broker families.
//!
//! | Host | Family | Mapping |
//! |------|--------|---------|
//! | Matrix | Dataset | one record per matrix row, first layer |
//! | Matrix | Grid | matrix row 0 is the northern grid row; complex pairs interleave along a row |
//! | Matrix | Image | one band per layer, values saturate to `u8` |
//! | Vector | Dataset | one dataset column per vector column |
//!
//! Matrix element access goes through [`Matrix::get`], so either
//! [`MemoryOrder`](tessera_containers::MemoryOrder) converts correctly.

use tessera_containers::{
    Container, DataSegment, DataTable, Dataset, Family, Grid, GridHeader, Image, Matrix,
    NumericArray, Region, Registration, ScalarKind, Vector,
};

use crate::descriptor::{Adapter, ComplexMode};
use crate::error::{BrokerError, Result};

/// Converts a host Matrix or Vector into a container of `family`.
pub(crate) fn from_host(
    host: &Container,
    family: Family,
    complex: ComplexMode,
) -> Result<Container> {
    match (host, family) {
        (Container::Matrix(m), Family::Dataset) => Ok(Container::Dataset(matrix_to_dataset(m))),
        (Container::Matrix(m), Family::Grid) => Ok(Container::Grid(matrix_to_grid(m, complex)?)),
        (Container::Matrix(m), Family::Image) => Ok(Container::Image(matrix_to_image(m)?)),
        (Container::Vector(v), Family::Dataset) => Ok(Container::Dataset(vector_to_dataset(v))),
        (other, _) => Err(BrokerError::WrongKind {
            expected: Family::Matrix,
            found: other.family(),
        }),
    }
}

/// Converts a broker container into a freshly allocated host array.
pub(crate) fn to_host(
    source: &Container,
    adapter: Adapter,
    kind: ScalarKind,
    complex: ComplexMode,
) -> Result<Container> {
    match (source, adapter) {
        (Container::Dataset(d), Adapter::ViaMatrix) => {
            Ok(Container::Matrix(dataset_to_matrix(d, kind)))
        }
        (Container::Dataset(d), Adapter::ViaVector) => {
            Ok(Container::Vector(dataset_to_vector(d, kind)))
        }
        (Container::Grid(g), Adapter::ViaMatrix) => {
            Ok(Container::Matrix(grid_to_matrix(g, kind, complex)))
        }
        (Container::Image(i), Adapter::ViaMatrix) => {
            Ok(Container::Matrix(image_to_matrix(i, kind)))
        }
        (other, _) => Err(BrokerError::NotAValidMethod(format!(
            "{adapter:?} cannot carry a {}",
            other.family()
        ))),
    }
}

fn single_segment(n_columns: usize, columns: Vec<Vec<f64>>) -> Dataset {
    let segment = DataSegment {
        header: None,
        columns,
    };
    Dataset {
        n_columns,
        tables: vec![DataTable {
            headers: Vec::new(),
            segments: vec![segment],
        }],
    }
}

fn matrix_to_dataset(m: &Matrix) -> Dataset {
    let columns = (0..m.n_columns)
        .map(|c| {
            (0..m.n_rows)
                .map(|r| m.get(r, c, 0).unwrap_or(f64::NAN))
                .collect()
        })
        .collect();
    single_segment(m.n_columns, columns)
}

fn vector_to_dataset(v: &Vector) -> Dataset {
    let columns = v.columns.iter().map(NumericArray::to_f64_vec).collect();
    single_segment(v.n_columns(), columns)
}

/// Header for a raster standing in for `m`, with `nx` columns.
fn raster_header(m: &Matrix, nx: usize) -> GridHeader {
    let ny = m.n_rows;
    if m.has_region() {
        GridHeader::from_dims(nx, ny, m.region, m.registration)
    } else {
        let region = Region::new(
            0.0,
            nx.saturating_sub(1) as f64,
            0.0,
            ny.saturating_sub(1) as f64,
        );
        GridHeader::from_dims(nx, ny, region, Registration::Gridline)
    }
}

fn matrix_to_grid(m: &Matrix, complex: ComplexMode) -> Result<Grid> {
    let (stride, offset) = complex.stride_offset();
    let nx = m.n_columns / stride;
    let header = raster_header(m, nx);
    let mut values = Vec::with_capacity(nx * m.n_rows);
    for r in 0..m.n_rows {
        for c in 0..nx {
            let v = m.get(r, c * stride + offset, 0).unwrap_or(f64::NAN);
            values.push(v as f32);
        }
    }
    Ok(Grid::from_values(header, &values)?)
}

fn matrix_to_image(m: &Matrix) -> Result<Image> {
    let header = raster_header(m, m.n_columns);
    let n_bands = m.n_layers;
    let mut values = Vec::with_capacity(m.n_columns * m.n_rows * n_bands);
    for r in 0..m.n_rows {
        for c in 0..m.n_columns {
            for band in 0..n_bands {
                values.push(m.get(r, c, band).unwrap_or(0.0) as u8);
            }
        }
    }
    Ok(Image::from_values(header, n_bands, &values)?)
}

fn dataset_to_matrix(d: &Dataset, kind: ScalarKind) -> Matrix {
    let mut m = Matrix::new(d.n_records(), d.n_columns, 1, kind);
    let mut r = 0;
    for segment in d.segments() {
        for row in 0..segment.n_rows() {
            for (c, column) in segment.columns.iter().enumerate() {
                m.set(r, c, 0, column[row]);
            }
            r += 1;
        }
    }
    m
}

fn dataset_to_vector(d: &Dataset, kind: ScalarKind) -> Vector {
    let columns = (0..d.n_columns)
        .map(|c| {
            let values: Vec<f64> = d
                .segments()
                .flat_map(|s| s.columns.get(c).into_iter().flatten().copied())
                .collect();
            NumericArray::from_f64(kind, &values)
        })
        .collect();
    Vector {
        columns,
        names: Vec::new(),
    }
}

fn grid_to_matrix(g: &Grid, kind: ScalarKind, complex: ComplexMode) -> Matrix {
    let (stride, offset) = complex.stride_offset();
    let h = &g.header;
    let mut m = Matrix::new(h.ny, h.nx * stride, 1, kind).with_region(h.region, h.registration);
    for r in 0..h.ny {
        for c in 0..h.nx {
            if let Some(v) = g.value(r, c) {
                m.set(r, c * stride + offset, 0, f64::from(v));
            }
        }
    }
    m
}

fn image_to_matrix(image: &Image, kind: ScalarKind) -> Matrix {
    let h = &image.header;
    let mut m = Matrix::new(h.ny, h.nx, image.n_bands, kind).with_region(h.region, h.registration);
    for r in 0..h.ny {
        for c in 0..h.nx {
            for band in 0..image.n_bands {
                if let Some(v) = image.value(r, c, band) {
                    m.set(r, c, band, f64::from(v));
                }
            }
        }
    }
    m
}
