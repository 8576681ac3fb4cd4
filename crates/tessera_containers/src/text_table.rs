//! Raw text tables grouped into segments.

/// One segment of verbatim text lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSegment {
    /// Text following the segment marker, if the segment had one.
    pub header: Option<String>,
    /// Lines in input order.
    pub lines: Vec<String>,
}

/// One table of text segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextFile {
    /// Table header lines, without the leading comment marker.
    pub headers: Vec<String>,
    /// Segments in input order.
    pub segments: Vec<TextSegment>,
}

/// A collection of text tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextTable {
    /// Tables in input order.
    pub tables: Vec<TextFile>,
}

impl TextTable {
    /// Creates a text table pre-sized with empty lines.
    #[must_use]
    pub fn with_shape(n_tables: usize, n_segments: usize, n_rows: usize) -> Self {
        let segment = TextSegment {
            header: None,
            lines: vec![String::new(); n_rows],
        };
        let file = TextFile {
            headers: Vec::new(),
            segments: vec![segment; n_segments],
        };
        Self {
            tables: vec![file; n_tables],
        }
    }

    /// Returns the number of segments across all tables.
    #[must_use]
    pub fn n_segments(&self) -> usize {
        self.tables.iter().map(|t| t.segments.len()).sum()
    }

    /// Returns the number of lines across all tables.
    #[must_use]
    pub fn n_records(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(|s| s.lines.len())
            .sum()
    }

    /// Releases spare capacity in every segment.
    pub fn shrink_to_fit(&mut self) {
        self.tables.shrink_to_fit();
        for file in &mut self.tables {
            file.segments.shrink_to_fit();
            for segment in &mut file.segments {
                segment.lines.shrink_to_fit();
            }
        }
    }
}
