use std::io::{BufRead, Write};

use super::{
    Codec, LineKind, SEGMENT_MARKER, TABLE_HEADER_MARKER, classify, format_numbers, parse_numbers,
};
use crate::dataset::{DataSegment, DataTable, Dataset};
use crate::error::ContainerError;
use crate::text_table::{TextFile, TextSegment, TextTable};

fn segment_header(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn write_segment_marker(
    writer: &mut dyn Write,
    header: Option<&str>,
    first: bool,
) -> std::io::Result<()> {
    match header {
        Some(h) => writeln!(writer, "{SEGMENT_MARKER} {h}"),
        None if !first => writeln!(writer, "{SEGMENT_MARKER}"),
        None => Ok(()),
    }
}

impl Codec for Dataset {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let mut table = DataTable::default();
        let mut current: Option<DataSegment> = None;
        let mut n_columns: Option<usize> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            match classify(&line) {
                LineKind::Blank => {}
                LineKind::TableHeader(text) => table.headers.push(text.to_string()),
                LineKind::SegmentHeader(text) => {
                    table.segments.extend(current.take());
                    current = Some(DataSegment::new(
                        n_columns.unwrap_or(0),
                        segment_header(text),
                    ));
                }
                LineKind::Data(text) => {
                    let values = parse_numbers(text, i + 1)?;
                    let n = *n_columns.get_or_insert(values.len());
                    let segment = current.get_or_insert_with(|| DataSegment::new(n, None));
                    if segment.columns.len() != n && segment.n_rows() == 0 {
                        segment.columns = vec![Vec::new(); n];
                    }
                    segment
                        .push_row(&values)
                        .map_err(|e| ContainerError::parse(i + 1, e.to_string()))?;
                }
            }
        }
        table.segments.extend(current);

        let n_columns = n_columns.unwrap_or(0);
        for segment in &mut table.segments {
            if segment.columns.len() != n_columns {
                segment.columns = vec![Vec::new(); n_columns];
            }
        }
        Ok(Self {
            n_columns,
            tables: vec![table],
        })
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        let mut row = Vec::with_capacity(self.n_columns);
        for table in &self.tables {
            for header in &table.headers {
                writeln!(writer, "{TABLE_HEADER_MARKER} {header}")?;
            }
            for (s, segment) in table.segments.iter().enumerate() {
                write_segment_marker(writer, segment.header.as_deref(), s == 0)?;
                for r in 0..segment.n_rows() {
                    row.clear();
                    row.extend(segment.columns.iter().map(|c| c[r]));
                    writeln!(writer, "{}", format_numbers(&row))?;
                }
            }
        }
        Ok(())
    }
}

impl Codec for TextTable {
    fn decode(reader: &mut dyn BufRead) -> Result<Self, ContainerError> {
        let mut file = TextFile::default();
        let mut current: Option<TextSegment> = None;

        for line in reader.lines() {
            let line = line?;
            match classify(&line) {
                LineKind::Blank => {}
                LineKind::TableHeader(text) => file.headers.push(text.to_string()),
                LineKind::SegmentHeader(text) => {
                    file.segments.extend(current.take());
                    current = Some(TextSegment {
                        header: segment_header(text),
                        lines: Vec::new(),
                    });
                }
                LineKind::Data(text) => current
                    .get_or_insert_with(TextSegment::default)
                    .lines
                    .push(text.to_string()),
            }
        }
        file.segments.extend(current);
        Ok(Self { tables: vec![file] })
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), ContainerError> {
        for file in &self.tables {
            for header in &file.headers {
                writeln!(writer, "{TABLE_HEADER_MARKER} {header}")?;
            }
            for (s, segment) in file.segments.iter().enumerate() {
                write_segment_marker(writer, segment.header.as_deref(), s == 0)?;
                for line in &segment.lines {
                    writeln!(writer, "{line}")?;
                }
            }
        }
        Ok(())
    }
}
