//! Resource descriptors and the values that parameterize them.
//!
//! A [`ResourceDescriptor`] is the registry's record of one resource: where
//! it lives ([`Locator`]), how it is transferred ([`Method`], optionally
//! [`Adapter`]), which way it flows ([`Direction`]) and how far along it is
//! ([`Status`]). Callers build one through [`ResourceRequest`] and hand it to
//! [`Session::register`](crate::session::Session::register).

use core::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tessera_containers::{ContainerRef, Family, Geometry, Region, ScalarKind};

/// Process-unique identifier of a registered resource within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u64);

impl ResourceId {
    /// The numeric value of the id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a resource's payload moves between the broker and its locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Open, transfer and close a named file.
    ByPath,
    /// Transfer through a caller-owned stream; never rewound.
    ByStream,
    /// Transfer through a caller-owned open file; never rewound.
    ByDescriptor,
    /// Deep-copy a caller container into broker-owned memory.
    CopyInMemory,
    /// Share the caller's container; the broker may re-pad it.
    ReferenceInMemory,
    /// Share the caller's container; the broker never changes it.
    ReadOnlyInMemory,
}

impl Method {
    /// Returns `true` for the three in-memory methods.
    #[must_use]
    pub fn is_in_memory(self) -> bool {
        matches!(
            self,
            Self::CopyInMemory | Self::ReferenceInMemory | Self::ReadOnlyInMemory
        )
    }

    /// Returns `true` if a reset may transfer the resource a second time.
    #[must_use]
    pub fn can_rewind(self) -> bool {
        !matches!(self, Self::ByStream | Self::ByDescriptor)
    }

    /// Ownership the broker takes over what this method realizes.
    #[must_use]
    pub fn ownership(self) -> Ownership {
        match self {
            Self::ReferenceInMemory => Ownership::Referenced,
            Self::ReadOnlyInMemory => Ownership::ReadOnly,
            _ => Ownership::Allocated,
        }
    }
}

/// Conversion applied between a host array and a broker family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adapter {
    /// The host side is a [`Matrix`](tessera_containers::Matrix).
    ViaMatrix,
    /// The host side is a [`Vector`](tessera_containers::Vector).
    ViaVector,
}

impl Adapter {
    /// Family of the host-side container.
    #[must_use]
    pub fn host_family(self) -> Family {
        match self {
            Self::ViaMatrix => Family::Matrix,
            Self::ViaVector => Family::Vector,
        }
    }

    /// Returns `true` if this adapter can stand in for `family`.
    #[must_use]
    pub fn supports(self, family: Family) -> bool {
        match self {
            Self::ViaMatrix => matches!(family, Family::Dataset | Family::Grid | Family::Image),
            Self::ViaVector => family == Family::Dataset,
        }
    }
}

/// Which half of interleaved complex values a grid adapter reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComplexMode {
    /// Values are real; one matrix column per grid column.
    #[default]
    None,
    /// The grid holds the real parts of interleaved pairs.
    Real,
    /// The grid holds the imaginary parts of interleaved pairs.
    Imaginary,
}

impl ComplexMode {
    /// Column stride in the host matrix and the offset within each pair.
    pub(crate) fn stride_offset(self) -> (usize, usize) {
        match self {
            Self::None => (1, 0),
            Self::Real => (2, 0),
            Self::Imaginary => (2, 1),
        }
    }
}

/// Whether a resource is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read by consumers.
    Input,
    /// Written by consumers.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Progress of a resource through its single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not touched yet.
    Unused,
    /// Partially transferred (header read, or streaming in progress).
    InUse,
    /// Fully transferred.
    Used,
}

/// Who may free a realized container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The broker allocated it and frees it.
    Allocated,
    /// The caller owns it; the broker may mutate but never frees it.
    Referenced,
    /// The caller owns it; the broker neither mutates nor frees it.
    ReadOnly,
}

/// Which part of a grid or image an import transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Header and payload together.
    #[default]
    All,
    /// Header only; the resource stays in use.
    HeaderOnly,
    /// Payload into a container realized by an earlier header-only import.
    DataOnly,
}

/// Import and export mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IoMode {
    /// Part of the resource to transfer.
    pub phase: Phase,
    /// Permit a second transfer of a rewindable resource.
    pub reset: bool,
}

impl IoMode {
    /// Header and payload in one call.
    pub const ALL: Self = Self {
        phase: Phase::All,
        reset: false,
    };
    /// Header only.
    pub const HEADER_ONLY: Self = Self {
        phase: Phase::HeaderOnly,
        reset: false,
    };
    /// Payload only, after a header-only import.
    pub const DATA_ONLY: Self = Self {
        phase: Phase::DataOnly,
        reset: false,
    };

    /// The same mode with the reset flag set.
    #[must_use]
    pub fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }
}

/// Shared input stream owned by the caller.
pub type SharedReader = Arc<Mutex<dyn BufRead + Send>>;

/// Shared output stream owned by the caller.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// A caller-owned stream the broker reads or writes but never closes.
#[derive(Clone)]
pub enum StreamHandle {
    /// Readable stream.
    Reader(SharedReader),
    /// Writable stream.
    Writer(SharedWriter),
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(_) => f.write_str("StreamHandle::Reader(..)"),
            Self::Writer(_) => f.write_str("StreamHandle::Writer(..)"),
        }
    }
}

/// A caller-owned open file.
///
/// Reads go through one persistent buffer so that a header-only import
/// followed by a payload import continues exactly where the header ended.
pub struct FileHandle {
    file: File,
    reader: Option<SharedReader>,
}

impl FileHandle {
    /// Duplicates `file` so that the caller keeps its own handle.
    ///
    /// # Errors
    ///
    /// Returns the error of [`File::try_clone`].
    pub fn new(file: &File) -> io::Result<Self> {
        Ok(Self {
            file: file.try_clone()?,
            reader: None,
        })
    }

    /// Buffered reader over the file, created on first use.
    pub(crate) fn reader(&mut self) -> io::Result<SharedReader> {
        if let Some(reader) = &self.reader {
            return Ok(Arc::clone(reader));
        }
        let reader: SharedReader = Arc::new(Mutex::new(BufReader::new(self.file.try_clone()?)));
        self.reader = Some(Arc::clone(&reader));
        Ok(reader)
    }

    /// Writer over the file.
    pub(crate) fn writer(&self) -> io::Result<File> {
        self.file.try_clone()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("file", &self.file)
            .field("buffered", &self.reader.is_some())
            .finish()
    }
}

/// Where a resource lives.
#[derive(Debug)]
pub enum Locator {
    /// A named file.
    Path(PathBuf),
    /// A caller-owned stream.
    Stream(StreamHandle),
    /// A caller-owned open file.
    Descriptor(FileHandle),
    /// A host container, or an empty slot for an in-memory output.
    Memory(Option<ContainerRef>),
}

impl Locator {
    /// A named file.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// A readable caller stream.
    pub fn reader(reader: SharedReader) -> Self {
        Self::Stream(StreamHandle::Reader(reader))
    }

    /// A writable caller stream.
    pub fn writer(writer: SharedWriter) -> Self {
        Self::Stream(StreamHandle::Writer(writer))
    }

    /// A caller-owned open file.
    ///
    /// # Errors
    ///
    /// Returns the error of duplicating the file handle.
    pub fn descriptor(file: &File) -> io::Result<Self> {
        Ok(Self::Descriptor(FileHandle::new(file)?))
    }

    /// A host container.
    #[must_use]
    pub fn memory(container: &ContainerRef) -> Self {
        Self::Memory(Some(container.clone()))
    }

    /// An empty in-memory destination.
    #[must_use]
    pub fn empty_slot() -> Self {
        Self::Memory(None)
    }

    /// Returns `true` if this variant is the one `method` transfers through.
    #[must_use]
    pub fn fits(&self, method: Method) -> bool {
        match self {
            Self::Path(_) => method == Method::ByPath,
            Self::Stream(_) => method == Method::ByStream,
            Self::Descriptor(_) => method == Method::ByDescriptor,
            Self::Memory(_) => method.is_in_memory(),
        }
    }

    /// The host container of an in-memory locator.
    #[must_use]
    pub fn container(&self) -> Option<&ContainerRef> {
        match self {
            Self::Memory(container) => container.as_ref(),
            _ => None,
        }
    }
}

/// Everything needed to register a resource.
///
/// # Example
///
/// ```
/// use tessera_system::descriptor::{Locator, Method, ResourceRequest};
/// use tessera_containers::{Family, Region};
///
/// let request = ResourceRequest::input(Family::Grid, Method::ByPath, Locator::path("topo.grd"))
///     .subregion(Region::new(0.0, 10.0, 0.0, 10.0));
/// assert_eq!(request.family(), Family::Grid);
/// ```
#[derive(Debug)]
pub struct ResourceRequest {
    pub(crate) family: Family,
    pub(crate) method: Method,
    pub(crate) via: Option<Adapter>,
    pub(crate) geometry: Geometry,
    pub(crate) direction: Direction,
    pub(crate) locator: Locator,
    pub(crate) subregion: Option<Region>,
    pub(crate) element_kind: Option<ScalarKind>,
    pub(crate) complex: ComplexMode,
}

impl ResourceRequest {
    /// A request in either direction.
    ///
    /// The geometry defaults to `Surface` for grids and images and `None`
    /// otherwise.
    #[must_use]
    pub fn new(family: Family, method: Method, direction: Direction, locator: Locator) -> Self {
        let geometry = if family.is_raster() {
            Geometry::Surface
        } else {
            Geometry::None
        };
        Self {
            family,
            method,
            via: None,
            geometry,
            direction,
            locator,
            subregion: None,
            element_kind: None,
            complex: ComplexMode::None,
        }
    }

    /// An input request.
    #[must_use]
    pub fn input(family: Family, method: Method, locator: Locator) -> Self {
        Self::new(family, method, Direction::Input, locator)
    }

    /// An output request.
    #[must_use]
    pub fn output(family: Family, method: Method, locator: Locator) -> Self {
        Self::new(family, method, Direction::Output, locator)
    }

    /// Sets the geometry hint.
    #[must_use]
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Routes the transfer through a matrix or vector adapter.
    #[must_use]
    pub fn via(mut self, adapter: Adapter) -> Self {
        self.via = Some(adapter);
        self
    }

    /// Restricts a grid or image to a subregion.
    #[must_use]
    pub fn subregion(mut self, region: Region) -> Self {
        self.subregion = Some(region);
        self
    }

    /// Element width of an adapter container produced on output.
    #[must_use]
    pub fn element_kind(mut self, kind: ScalarKind) -> Self {
        self.element_kind = Some(kind);
        self
    }

    /// Complex-component selection for grid adapters.
    #[must_use]
    pub fn complex(mut self, mode: ComplexMode) -> Self {
        self.complex = mode;
        self
    }

    /// Family of the requested resource.
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }
}

/// The registry's record of one resource.
#[derive(Debug)]
pub struct ResourceDescriptor {
    pub(crate) id: ResourceId,
    pub(crate) family: Family,
    pub(crate) method: Method,
    pub(crate) via: Option<Adapter>,
    pub(crate) geometry: Geometry,
    pub(crate) direction: Direction,
    pub(crate) status: Status,
    pub(crate) ownership: Ownership,
    pub(crate) locator: Locator,
    pub(crate) subregion: Option<Region>,
    pub(crate) level: u32,
    pub(crate) realized: Option<ContainerRef>,
    pub(crate) element_kind: ScalarKind,
    pub(crate) complex: ComplexMode,
}

impl ResourceDescriptor {
    pub(crate) fn from_request(
        request: ResourceRequest,
        level: u32,
        default_kind: ScalarKind,
    ) -> Self {
        let ownership = if request.via.is_some() {
            Ownership::Allocated
        } else {
            request.method.ownership()
        };
        Self {
            id: ResourceId(0),
            family: request.family,
            method: request.method,
            via: request.via,
            geometry: request.geometry,
            direction: request.direction,
            status: Status::Unused,
            ownership,
            locator: request.locator,
            subregion: request.subregion,
            level,
            realized: None,
            element_kind: request.element_kind.unwrap_or(default_kind),
            complex: request.complex,
        }
    }

    /// The resource id.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The resource family.
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// The transfer method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The adapter, if any.
    #[must_use]
    pub fn via(&self) -> Option<Adapter> {
        self.via
    }

    /// The geometry hint.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// The direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The transfer status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Who may free the realized container.
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// The requested subregion.
    #[must_use]
    pub fn subregion(&self) -> Option<Region> {
        self.subregion
    }

    /// Nesting level the resource was registered at.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The container produced by import or export, if any.
    #[must_use]
    pub fn realized(&self) -> Option<&ContainerRef> {
        self.realized.as_ref()
    }

    /// The locator.
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_containers::{Container, Dataset};

    #[test]
    fn locator_fits_its_method_only() {
        assert!(Locator::path("a.txt").fits(Method::ByPath));
        assert!(!Locator::path("a.txt").fits(Method::ByStream));
        assert!(Locator::empty_slot().fits(Method::ReadOnlyInMemory));
        assert!(!Locator::empty_slot().fits(Method::ByDescriptor));
    }

    #[test]
    fn streams_and_descriptors_cannot_rewind() {
        assert!(Method::ByPath.can_rewind());
        assert!(Method::CopyInMemory.can_rewind());
        assert!(!Method::ByStream.can_rewind());
        assert!(!Method::ByDescriptor.can_rewind());
    }

    #[test]
    fn adapters_own_what_they_produce() {
        let host = ContainerRef::new(Container::Dataset(Dataset::new(1)));
        let request = ResourceRequest::input(
            Family::Dataset,
            Method::ReferenceInMemory,
            Locator::memory(&host),
        );
        let plain = ResourceDescriptor::from_request(request, 0, ScalarKind::F64);
        assert_eq!(plain.ownership(), Ownership::Referenced);

        let request = ResourceRequest::input(
            Family::Dataset,
            Method::ReferenceInMemory,
            Locator::memory(&host),
        )
        .via(Adapter::ViaMatrix);
        let adapted = ResourceDescriptor::from_request(request, 0, ScalarKind::F64);
        assert_eq!(adapted.ownership(), Ownership::Allocated);
    }

    #[test]
    fn raster_requests_default_to_surface() {
        let grid = ResourceRequest::input(Family::Grid, Method::ByPath, Locator::path("g"));
        assert_eq!(grid.geometry, Geometry::Surface);
        let table = ResourceRequest::input(Family::Dataset, Method::ByPath, Locator::path("t"));
        assert_eq!(table.geometry, Geometry::None);
    }
}
