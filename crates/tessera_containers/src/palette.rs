//! Color lookup tables.

/// An RGB triplet with channels in `0.0..=255.0`.
pub type Rgb = [f64; 3];

/// One z-interval of a palette with linearly interpolated colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSlice {
    /// Lower bound of the interval.
    pub z_low: f64,
    /// Upper bound of the interval.
    pub z_high: f64,
    /// Color at `z_low`.
    pub rgb_low: Rgb,
    /// Color at `z_high`.
    pub rgb_high: Rgb,
    /// Optional annotation label.
    pub label: Option<String>,
}

/// A color palette mapping z values to colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    /// Slices in increasing z order.
    pub slices: Vec<ColorSlice>,
    /// Color used below the first slice.
    pub background: Rgb,
    /// Color used above the last slice.
    pub foreground: Rgb,
    /// Color used for NaN.
    pub nan_color: Rgb,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            slices: Vec::new(),
            background: [0.0; 3],
            foreground: [255.0; 3],
            nan_color: [127.5; 3],
        }
    }
}

impl ColorPalette {
    /// Creates a palette of `n_slices` black slices over `0..n_slices`.
    #[must_use]
    pub fn with_slices(n_slices: usize) -> Self {
        let slices = (0..n_slices)
            .map(|i| ColorSlice {
                z_low: i as f64,
                z_high: (i + 1) as f64,
                rgb_low: [0.0; 3],
                rgb_high: [0.0; 3],
                label: None,
            })
            .collect();
        Self {
            slices,
            ..Self::default()
        }
    }

    /// Looks up the color for `z`.
    #[must_use]
    pub fn color_at(&self, z: f64) -> Rgb {
        if z.is_nan() {
            return self.nan_color;
        }
        let (Some(first), Some(last)) = (self.slices.first(), self.slices.last()) else {
            return self.nan_color;
        };
        if z < first.z_low {
            return self.background;
        }
        if z > last.z_high {
            return self.foreground;
        }
        let slice = self
            .slices
            .iter()
            .find(|s| z >= s.z_low && z <= s.z_high)
            .unwrap_or(last);
        let span = slice.z_high - slice.z_low;
        let t = if span > 0.0 { (z - slice.z_low) / span } else { 0.0 };
        let mut rgb = [0.0; 3];
        for (c, out) in rgb.iter_mut().enumerate() {
            *out = slice.rgb_low[c] + t * (slice.rgb_high[c] - slice.rgb_low[c]);
        }
        rgb
    }
}
