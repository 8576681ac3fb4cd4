//! Resource families and geometry hints.

use core::fmt;

/// The semantic data type of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Tables of numeric records grouped into segments.
    Dataset,
    /// Tables of raw text lines grouped into segments.
    TextTable,
    /// A color lookup table.
    ColorPalette,
    /// A 2-D scalar field.
    Grid,
    /// A 2-D multi-band raster.
    Image,
    /// An opaque typed 2-D numeric array.
    Matrix,
    /// A set of independently typed 1-D arrays.
    Vector,
}

impl Family {
    /// Returns `true` for the families carrying a padded 2-D payload.
    #[must_use]
    pub fn is_raster(self) -> bool {
        matches!(self, Self::Grid | Self::Image)
    }

    /// Returns `true` for the families that support record streaming.
    #[must_use]
    pub fn is_record_based(self) -> bool {
        matches!(self, Self::Dataset | Self::TextTable)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dataset => "dataset",
            Self::TextTable => "text table",
            Self::ColorPalette => "color palette",
            Self::Grid => "grid",
            Self::Image => "image",
            Self::Matrix => "matrix",
            Self::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// Semantic shape hint attached to a resource, independent of family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Geometry {
    /// No particular geometry.
    #[default]
    None,
    /// Scattered points.
    Point,
    /// Polylines.
    Line,
    /// Closed polygons.
    Polygon,
    /// A continuous surface.
    Surface,
}

impl Geometry {
    /// Returns `true` if this geometry may describe a resource of `family`.
    ///
    /// Grids and images must be surfaces; tables must not be.
    #[must_use]
    pub fn is_valid_for(self, family: Family) -> bool {
        match family {
            Family::Grid | Family::Image => self == Self::Surface,
            Family::Dataset | Family::TextTable => self != Self::Surface,
            Family::ColorPalette | Family::Matrix | Family::Vector => true,
        }
    }
}
