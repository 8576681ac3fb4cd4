//! Record-by-record streaming over datasets and text tables.
//!
//! Reading walks every unused input of a family in registration order, one
//! record at a time, so a consumer never holds a whole file in memory.
//! Writing appends records to the single output of a family: files and
//! streams receive a line per record, in-memory destinations grow a
//! container that is realized when streaming ends.
//!
//! | Call | Effect |
//! |------|--------|
//! | [`begin_record_io`](Session::begin_record_io) | enables a direction and resets its cursor |
//! | [`get_record`](Session::get_record) | next input record, advancing across resources |
//! | [`put_record`](Session::put_record) | appends one output record |
//! | [`end_record_io`](Session::end_record_io) | finishes the current resources and disables |

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use tessera_containers::codec::{
    LineKind, SEGMENT_MARKER, TABLE_HEADER_MARKER, classify, format_numbers, parse_numbers,
};
use tessera_containers::{
    Container, ContainerRef, DataSegment, DataTable, Dataset, Family, TextFile,
    TextSegment, TextTable,
};
use tracing::{debug, warn};

use crate::adapter;
use crate::descriptor::{
    Direction, Locator, Ownership, ResourceId, SharedReader, SharedWriter, Status, StreamHandle,
};
use crate::error::{BrokerError, Result};
use crate::session::Session;

/// What a record stream reports besides data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordIoOptions {
    /// Emit [`Record::EndOfResource`] after each exhausted input.
    pub report_boundaries: bool,
    /// Emit [`Record::TableHeader`] for table header lines.
    pub report_headers: bool,
}

/// One record read from an input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A table header line.
    TableHeader(String),
    /// The start of a segment, with its header text (possibly empty).
    SegmentHeader(String),
    /// A numeric record.
    Data(Vec<f64>),
    /// A text record.
    Text(String),
    /// The current resource is exhausted; more may follow.
    EndOfResource,
    /// Every resource is exhausted.
    EndOfAllResources,
}

/// One record to append to the output stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputRecord<'a> {
    /// A table header line.
    TableHeader(&'a str),
    /// Starts a new segment with the given header text.
    SegmentHeader(&'a str),
    /// A numeric record.
    DataRow(&'a [f64]),
    /// A text record.
    TextRow(&'a str),
}

/// Yields the records of one input resource.
trait RecordSource: Send {
    /// The next record, or `None` when the resource is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Accepts the records of one output resource.
trait RecordSink: Send {
    fn put(&mut self, record: OutputRecord<'_>) -> Result<()>;

    /// Flushes and returns the container an in-memory sink built.
    fn finish(self: Box<Self>) -> Result<Option<Container>>;
}

#[derive(Default)]
pub(crate) struct RecordIo {
    input: Option<InputCursor>,
    output: Option<OutputCursor>,
}

impl fmt::Debug for RecordIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordIo")
            .field("input", &self.is_enabled(Direction::Input))
            .field("output", &self.is_enabled(Direction::Output))
            .finish()
    }
}

impl RecordIo {
    pub(crate) fn is_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.input.is_some(),
            Direction::Output => self.output.is_some(),
        }
    }
}

struct InputCursor {
    family: Family,
    options: RecordIoOptions,
    current: Option<(ResourceId, Box<dyn RecordSource>)>,
    exhausted: bool,
}

struct OutputCursor {
    family: Family,
    current: Option<(ResourceId, Box<dyn RecordSink>)>,
}

// ───────────────────────────────────────────────────────────────────────────
// Session operations
// ───────────────────────────────────────────────────────────────────────────

impl Session {
    /// Enables record streaming of `family` in `direction`.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::WrongKind`] unless `family` is a dataset or text table
    /// - [`BrokerError::NoResourcesRegistered`] for input with nothing to read
    /// - [`BrokerError::OnlyOneAllowed`] for output with several destinations
    pub fn begin_record_io(
        &mut self,
        family: Family,
        direction: Direction,
        options: RecordIoOptions,
    ) -> Result<()> {
        if !family.is_record_based() {
            return Err(BrokerError::WrongKind {
                expected: Family::Dataset,
                found: family,
            });
        }
        debug_assert!(
            !self.record_io.is_enabled(direction),
            "record {direction} is already enabled"
        );
        let candidates = self.registry.unused(family, direction).count();
        match direction {
            Direction::Input => {
                if candidates == 0 {
                    return Err(BrokerError::NoResourcesRegistered { family, direction });
                }
                self.record_io.input = Some(InputCursor {
                    family,
                    options,
                    current: None,
                    exhausted: false,
                });
            }
            Direction::Output => {
                if candidates > 1 {
                    return Err(BrokerError::OnlyOneAllowed {
                        family,
                        count: candidates,
                    });
                }
                if candidates == 0 {
                    warn!(%family, "record output enabled with no destination registered yet");
                }
                self.record_io.output = Some(OutputCursor {
                    family,
                    current: None,
                });
            }
        }
        debug!(%family, %direction, "record i/o enabled");
        Ok(())
    }

    /// Reads the next record.
    ///
    /// Once every input is exhausted this keeps returning
    /// [`Record::EndOfAllResources`].
    ///
    /// # Errors
    ///
    /// Returns I/O and parse errors of the current source.
    pub fn get_record(&mut self) -> Result<Record> {
        debug_assert!(
            self.record_io.input.is_some(),
            "get_record called without record input enabled"
        );
        let Some(mut cursor) = self.record_io.input.take() else {
            return Ok(Record::EndOfAllResources);
        };
        let record = self.next_input_record(&mut cursor);
        self.record_io.input = Some(cursor);
        record
    }

    fn next_input_record(&mut self, cursor: &mut InputCursor) -> Result<Record> {
        loop {
            if cursor.exhausted {
                return Ok(Record::EndOfAllResources);
            }
            if cursor.current.is_none() {
                let Some(id) = self.registry.first_unused(cursor.family, Direction::Input) else {
                    cursor.exhausted = true;
                    return Ok(Record::EndOfAllResources);
                };
                let source = match self.open_source(id, cursor.options) {
                    Ok(source) => source,
                    Err(err) => {
                        // An unopenable source counts as read so the next call moves on.
                        self.set_status(id, Status::Used);
                        warn!(%id, %err, "skipping record input that failed to open");
                        return Err(err);
                    }
                };
                self.set_status(id, Status::InUse);
                cursor.current = Some((id, source));
            }
            let Some((id, source)) = cursor.current.as_mut() else {
                continue;
            };
            if let Some(record) = source.next_record()? {
                return Ok(record);
            }
            let id = *id;
            cursor.current = None;
            self.set_status(id, Status::Used);
            debug!(%id, "record input exhausted");
            if cursor.options.report_boundaries {
                return Ok(Record::EndOfResource);
            }
        }
    }

    /// Appends one record to the output.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::OutputNotSet`] if no destination can be found
    /// - [`BrokerError::WrittenOnce`] / [`BrokerError::PointerNotNull`] if the
    ///   destination was already written
    /// - [`BrokerError::MemoryError`] if an in-memory destination cannot grow
    pub fn put_record(&mut self, record: OutputRecord<'_>) -> Result<()> {
        debug_assert!(
            self.record_io.output.is_some(),
            "put_record called without record output enabled"
        );
        let Some(mut cursor) = self.record_io.output.take() else {
            return Err(BrokerError::OutputNotSet);
        };
        let result = self.put_output_record(&mut cursor, record);
        self.record_io.output = Some(cursor);
        result
    }

    fn put_output_record(
        &mut self,
        cursor: &mut OutputCursor,
        record: OutputRecord<'_>,
    ) -> Result<()> {
        if cursor.current.is_none() {
            let id = self
                .registry
                .first_unused(cursor.family, Direction::Output)
                .ok_or(BrokerError::OutputNotSet)?;
            let sink = self.open_sink(id)?;
            self.set_status(id, Status::InUse);
            cursor.current = Some((id, sink));
        }
        match cursor.current.as_mut() {
            Some((_, sink)) => sink.put(record),
            None => Err(BrokerError::OutputNotSet),
        }
    }

    /// Finishes record streaming in `direction`.
    ///
    /// A partially read input is marked used. The output is flushed and, for
    /// in-memory destinations, realized.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from flushing and adapter conversion errors.
    pub fn end_record_io(&mut self, direction: Direction) -> Result<()> {
        match direction {
            Direction::Input => {
                if let Some(InputCursor {
                    current: Some((id, _)),
                    ..
                }) = self.record_io.input.take()
                {
                    self.set_status(id, Status::Used);
                }
            }
            Direction::Output => {
                if let Some(OutputCursor {
                    current: Some((id, sink)),
                    ..
                }) = self.record_io.output.take()
                {
                    self.set_status(id, Status::Used);
                    if let Some(content) = sink.finish()? {
                        self.realize_streamed(id, content)?;
                    }
                }
            }
        }
        debug!(%direction, "record i/o disabled");
        Ok(())
    }

    fn set_status(&mut self, id: ResourceId, status: Status) {
        if let Some(descriptor) = self.registry.get_mut(id) {
            descriptor.status = status;
        }
    }

    fn realize_streamed(&mut self, id: ResourceId, content: Container) -> Result<()> {
        let descriptor = self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        let content = match descriptor.via {
            Some(via) => {
                adapter::to_host(&content, via, descriptor.element_kind, descriptor.complex)?
            }
            None => content,
        };
        if let Some(descriptor) = self.registry.get_mut(id) {
            descriptor.ownership = Ownership::Allocated;
        }
        self.realize(id, &ContainerRef::new(content), Status::Used);
        Ok(())
    }

    fn open_source(
        &mut self,
        id: ResourceId,
        options: RecordIoOptions,
    ) -> Result<Box<dyn RecordSource>> {
        let descriptor = self.registry.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        let family = descriptor.family;
        let via = descriptor.via;
        let complex = descriptor.complex;
        let input = match &mut descriptor.locator {
            Locator::Path(path) => {
                LineInput::Owned(Box::new(BufReader::new(File::open(path.as_path())?)))
            }
            Locator::Stream(StreamHandle::Reader(reader)) => LineInput::Shared(reader.clone()),
            Locator::Descriptor(file) => LineInput::Shared(file.reader()?),
            Locator::Stream(StreamHandle::Writer(_)) => {
                return Err(BrokerError::NotAValidMethod(format!(
                    "resource {id} is registered with a writable stream"
                )));
            }
            Locator::Memory(host) => {
                let host = host.clone().ok_or(BrokerError::PointerIsNull { id: Some(id) })?;
                let host = match via {
                    Some(_) => {
                        let guard = host
                            .try_read()
                            .ok_or(BrokerError::BorrowConflict(host.addr()))?;
                        ContainerRef::new(adapter::from_host(&guard, family, complex)?)
                    }
                    None => host,
                };
                return Ok(Box::new(MemorySource::new(host, options)));
            }
        };
        Ok(Box::new(LineSource {
            input,
            family,
            options,
            line_no: 0,
            buffer: String::new(),
        }))
    }

    fn open_sink(&mut self, id: ResourceId) -> Result<Box<dyn RecordSink>> {
        let descriptor = self.registry.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        if descriptor.status == Status::Used {
            return Err(BrokerError::WrittenOnce(id));
        }
        let family = descriptor.family;
        let output = match &mut descriptor.locator {
            Locator::Path(path) => {
                LineOutput::Owned(Box::new(BufWriter::new(File::create(path.as_path())?)))
            }
            Locator::Stream(StreamHandle::Writer(writer)) => LineOutput::Shared(writer.clone()),
            Locator::Descriptor(file) => LineOutput::Owned(Box::new(file.writer()?)),
            Locator::Stream(StreamHandle::Reader(_)) => {
                return Err(BrokerError::NotAValidMethod(format!(
                    "resource {id} is registered with a readable stream"
                )));
            }
            Locator::Memory(Some(_)) => return Err(BrokerError::PointerNotNull(id)),
            Locator::Memory(None) => {
                if descriptor.realized.is_some() {
                    return Err(BrokerError::PointerNotNull(id));
                }
                return Ok(Box::new(MemorySink::new(family)));
            }
        };
        Ok(Box::new(LineSink {
            output,
            segments: 0,
        }))
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Line-oriented sources and sinks
// ───────────────────────────────────────────────────────────────────────────

enum LineInput {
    /// A file the broker opened and closes when the source drops.
    Owned(Box<dyn BufRead + Send>),
    /// A caller handle; left open.
    Shared(SharedReader),
}

impl LineInput {
    fn read_line(&mut self, buffer: &mut String) -> io::Result<usize> {
        match self {
            Self::Owned(reader) => reader.read_line(buffer),
            Self::Shared(reader) => reader.lock().read_line(buffer),
        }
    }
}

struct LineSource {
    input: LineInput,
    family: Family,
    options: RecordIoOptions,
    line_no: usize,
    buffer: String,
}

impl RecordSource for LineSource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buffer.clear();
            if self.input.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buffer.trim_end_matches(['\n', '\r']);
            let record = match classify(line) {
                LineKind::Blank => continue,
                LineKind::TableHeader(text) => {
                    if !self.options.report_headers {
                        continue;
                    }
                    Record::TableHeader(text.to_string())
                }
                LineKind::SegmentHeader(text) => Record::SegmentHeader(text.to_string()),
                LineKind::Data(text) => match self.family {
                    Family::TextTable => Record::Text(line.to_string()),
                    _ => Record::Data(parse_numbers(text, self.line_no)?),
                },
            };
            return Ok(Some(record));
        }
    }
}

enum LineOutput {
    /// A file the broker opened; flushed and closed when the sink finishes.
    Owned(Box<dyn Write + Send>),
    /// A caller handle; flushed, left open.
    Shared(SharedWriter),
}

struct LineSink {
    output: LineOutput,
    segments: usize,
}

impl LineSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match &mut self.output {
            LineOutput::Owned(writer) => writeln!(writer, "{line}"),
            LineOutput::Shared(writer) => writeln!(writer.lock(), "{line}"),
        }
    }
}

impl RecordSink for LineSink {
    fn put(&mut self, record: OutputRecord<'_>) -> Result<()> {
        let line = match record {
            OutputRecord::TableHeader(text) => format!("{TABLE_HEADER_MARKER} {text}"),
            OutputRecord::SegmentHeader(text) => {
                self.segments += 1;
                if text.is_empty() {
                    SEGMENT_MARKER.to_string()
                } else {
                    format!("{SEGMENT_MARKER} {text}")
                }
            }
            OutputRecord::DataRow(values) => format_numbers(values),
            OutputRecord::TextRow(text) => text.to_string(),
        };
        Ok(self.write_line(&line)?)
    }

    fn finish(mut self: Box<Self>) -> Result<Option<Container>> {
        match &mut self.output {
            LineOutput::Owned(writer) => writer.flush()?,
            LineOutput::Shared(writer) => writer.lock().flush()?,
        }
        debug!(segments = self.segments, "record output flushed");
        Ok(None)
    }
}

// ───────────────────────────────────────────────────────────────────────────
// In-memory sources and sinks
// ───────────────────────────────────────────────────────────────────────────

/// Read access shared by the two record-based families.
trait Tables {
    fn n_tables(&self) -> usize;
    fn headers(&self, table: usize) -> &[String];
    fn n_segments(&self, table: usize) -> usize;
    fn segment_header(&self, table: usize, segment: usize) -> Option<&str>;
    fn n_rows(&self, table: usize, segment: usize) -> usize;
    fn record(&self, table: usize, segment: usize, row: usize) -> Record;
}

impl Tables for Dataset {
    fn n_tables(&self) -> usize {
        self.tables.len()
    }
    fn headers(&self, table: usize) -> &[String] {
        &self.tables[table].headers
    }
    fn n_segments(&self, table: usize) -> usize {
        self.tables[table].segments.len()
    }
    fn segment_header(&self, table: usize, segment: usize) -> Option<&str> {
        self.tables[table].segments[segment].header.as_deref()
    }
    fn n_rows(&self, table: usize, segment: usize) -> usize {
        self.tables[table].segments[segment].n_rows()
    }
    fn record(&self, table: usize, segment: usize, row: usize) -> Record {
        Record::Data(
            self.tables[table].segments[segment]
                .row(row)
                .unwrap_or_default(),
        )
    }
}

impl Tables for TextTable {
    fn n_tables(&self) -> usize {
        self.tables.len()
    }
    fn headers(&self, table: usize) -> &[String] {
        &self.tables[table].headers
    }
    fn n_segments(&self, table: usize) -> usize {
        self.tables[table].segments.len()
    }
    fn segment_header(&self, table: usize, segment: usize) -> Option<&str> {
        self.tables[table].segments[segment].header.as_deref()
    }
    fn n_rows(&self, table: usize, segment: usize) -> usize {
        self.tables[table].segments[segment].lines.len()
    }
    fn record(&self, table: usize, segment: usize, row: usize) -> Record {
        Record::Text(self.tables[table].segments[segment].lines[row].clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TableHeader(usize),
    SegmentHeader,
    Rows(usize),
}

/// Walks a dataset or text table in place.
struct MemorySource {
    container: ContainerRef,
    options: RecordIoOptions,
    table: usize,
    segment: usize,
    stage: Stage,
}

impl MemorySource {
    fn new(container: ContainerRef, options: RecordIoOptions) -> Self {
        Self {
            container,
            options,
            table: 0,
            segment: 0,
            stage: Stage::TableHeader(0),
        }
    }

    fn step(&mut self, tables: &dyn Tables) -> Option<Record> {
        loop {
            if self.table >= tables.n_tables() {
                return None;
            }
            match self.stage {
                Stage::TableHeader(i) => {
                    let headers = tables.headers(self.table);
                    if self.options.report_headers && i < headers.len() {
                        self.stage = Stage::TableHeader(i + 1);
                        return Some(Record::TableHeader(headers[i].clone()));
                    }
                    self.stage = Stage::SegmentHeader;
                }
                Stage::SegmentHeader => {
                    if self.segment >= tables.n_segments(self.table) {
                        self.table += 1;
                        self.segment = 0;
                        self.stage = Stage::TableHeader(0);
                        continue;
                    }
                    self.stage = Stage::Rows(0);
                    // Mirrors the file format: the first segment of a table
                    // needs no marker unless it has a header.
                    match tables.segment_header(self.table, self.segment) {
                        Some(header) => {
                            return Some(Record::SegmentHeader(header.to_string()));
                        }
                        None if self.segment > 0 => {
                            return Some(Record::SegmentHeader(String::new()));
                        }
                        None => {}
                    }
                }
                Stage::Rows(row) => {
                    if row < tables.n_rows(self.table, self.segment) {
                        self.stage = Stage::Rows(row + 1);
                        return Some(tables.record(self.table, self.segment, row));
                    }
                    self.segment += 1;
                    self.stage = Stage::SegmentHeader;
                }
            }
        }
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let container = self.container.clone();
        let guard = container
            .try_read()
            .ok_or(BrokerError::BorrowConflict(container.addr()))?;
        Ok(match &*guard {
            Container::Dataset(dataset) => self.step(dataset),
            Container::TextTable(text) => self.step(text),
            other => {
                return Err(BrokerError::WrongKind {
                    expected: Family::Dataset,
                    found: other.family(),
                });
            }
        })
    }
}

/// Grows a single-table container one record at a time.
enum MemorySink {
    Dataset {
        headers: Vec<String>,
        dataset: Option<Dataset>,
    },
    Text {
        headers: Vec<String>,
        text: Option<TextTable>,
    },
}

impl MemorySink {
    fn new(family: Family) -> Self {
        match family {
            Family::TextTable => Self::Text {
                headers: Vec::new(),
                text: None,
            },
            _ => Self::Dataset {
                headers: Vec::new(),
                dataset: None,
            },
        }
    }
}

fn start_data_segment(dataset: &mut Dataset, header: Option<String>) -> Result<()> {
    let n_columns = dataset.n_columns;
    let table = dataset.tables.last_mut().ok_or(BrokerError::OutputNotSet)?;
    table.segments.try_reserve(1)?;
    table.segments.push(DataSegment::new(n_columns, header));
    Ok(())
}

fn start_text_segment(text: &mut TextTable, header: Option<String>) -> Result<()> {
    let table = text.tables.last_mut().ok_or(BrokerError::OutputNotSet)?;
    table.segments.try_reserve(1)?;
    table.segments.push(TextSegment {
        header,
        lines: Vec::new(),
    });
    Ok(())
}

fn segment_label(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

impl RecordSink for MemorySink {
    fn put(&mut self, record: OutputRecord<'_>) -> Result<()> {
        match self {
            Self::Dataset { headers, dataset } => match record {
                OutputRecord::TableHeader(text) => {
                    match dataset.as_mut().and_then(|d| d.tables.last_mut()) {
                        Some(table) => table.headers.push(text.to_string()),
                        None => headers.push(text.to_string()),
                    }
                    Ok(())
                }
                OutputRecord::SegmentHeader(text) => {
                    let dataset = dataset.get_or_insert_with(|| new_dataset(0, headers));
                    start_data_segment(dataset, segment_label(text))?;
                    Ok(())
                }
                OutputRecord::DataRow(values) => {
                    let dataset =
                        dataset.get_or_insert_with(|| new_dataset(values.len(), headers));
                    if dataset.n_columns == 0 && dataset.n_records() == 0 {
                        dataset.n_columns = values.len();
                        let segments =
                            dataset.tables.iter_mut().flat_map(|t| t.segments.iter_mut());
                        for segment in segments {
                            segment.columns = vec![Vec::new(); values.len()];
                        }
                    }
                    if dataset.tables.last().is_none_or(|t| t.segments.is_empty()) {
                        warn!("data record before any segment header; opening segment 0");
                        start_data_segment(dataset, None)?;
                    }
                    let segment = dataset
                        .tables
                        .last_mut()
                        .and_then(|t| t.segments.last_mut())
                        .ok_or(BrokerError::OutputNotSet)?;
                    if segment.columns.len() == values.len() {
                        for column in &mut segment.columns {
                            column.try_reserve(1)?;
                        }
                    }
                    Ok(segment.push_row(values)?)
                }
                OutputRecord::TextRow(_) => Err(BrokerError::WrongKind {
                    expected: Family::TextTable,
                    found: Family::Dataset,
                }),
            },
            Self::Text { headers, text } => {
                let line = match record {
                    OutputRecord::TableHeader(line) => {
                        match text.as_mut().and_then(|t| t.tables.last_mut()) {
                            Some(table) => table.headers.push(line.to_string()),
                            None => headers.push(line.to_string()),
                        }
                        return Ok(());
                    }
                    OutputRecord::SegmentHeader(label) => {
                        let text = text.get_or_insert_with(|| new_text(headers));
                        start_text_segment(text, segment_label(label))?;
                        return Ok(());
                    }
                    OutputRecord::DataRow(values) => format_numbers(values),
                    OutputRecord::TextRow(line) => line.to_string(),
                };
                let text = text.get_or_insert_with(|| new_text(headers));
                if text.tables.last().is_none_or(|t| t.segments.is_empty()) {
                    warn!("text record before any segment header; opening segment 0");
                    start_text_segment(text, None)?;
                }
                let segment = text
                    .tables
                    .last_mut()
                    .and_then(|t| t.segments.last_mut())
                    .ok_or(BrokerError::OutputNotSet)?;
                segment.lines.try_reserve(1)?;
                segment.lines.push(line);
                Ok(())
            }
        }
    }

    fn finish(self: Box<Self>) -> Result<Option<Container>> {
        Ok(match *self {
            Self::Dataset { dataset, .. } => dataset.map(|mut d| {
                d.shrink_to_fit();
                Container::Dataset(d)
            }),
            Self::Text { text, .. } => text.map(|mut t| {
                t.shrink_to_fit();
                Container::TextTable(t)
            }),
        })
    }
}

fn new_dataset(n_columns: usize, headers: &mut Vec<String>) -> Dataset {
    Dataset {
        n_columns,
        tables: vec![DataTable {
            headers: core::mem::take(headers),
            segments: Vec::new(),
        }],
    }
}

fn new_text(headers: &mut Vec<String>) -> TextTable {
    TextTable {
        tables: vec![TextFile {
            headers: core::mem::take(headers),
            segments: Vec::new(),
        }],
    }
}
