//! Broker error taxonomy.
//!
//! Every public operation returns a [`BrokerError`] by value. None of them
//! abort; the caller decides whether a failure is fatal.

use tessera_containers::{ContainerAddr, ContainerError, Family, Geometry};

use crate::descriptor::{Direction, Ownership, ResourceId};

/// Errors that can occur in broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Record I/O was started with nothing registered to read.
    #[error("no {family} resources registered for {direction}")]
    NoResourcesRegistered {
        /// Family requested.
        family: Family,
        /// Direction requested.
        direction: Direction,
    },

    /// The id does not name a registered resource.
    #[error("not a valid resource id: {0}")]
    NotAValidId(ResourceId),

    /// An input operation targeted an output resource.
    #[error("resource {0} is not an input resource")]
    NotInputResource(ResourceId),

    /// An output operation targeted an input resource.
    #[error("resource {0} is not an output resource")]
    NotOutputResource(ResourceId),

    /// The resource was already read and cannot be read again.
    #[error("resource {0} can only be read once")]
    ReadOnce(ResourceId),

    /// The resource was already written and cannot be written again.
    #[error("resource {0} can only be written once")]
    WrittenOnce(ResourceId),

    /// A family did not match what the operation expected.
    #[error("wrong kind: expected {expected}, found {found}")]
    WrongKind {
        /// Family the operation needs.
        expected: Family,
        /// Family actually supplied.
        found: Family,
    },

    /// An in-memory slot that must hold a container is empty.
    #[error(
        "no container is attached{}",
        .id.map(|id| format!(" to resource {id}")).unwrap_or_default()
    )]
    PointerIsNull {
        /// The resource, when it has been registered already.
        id: Option<ResourceId>,
    },

    /// An in-memory destination already holds a container.
    #[error("resource {0} already holds a container")]
    PointerNotNull(ResourceId),

    /// Growing broker-owned storage failed.
    #[error("memory error: {0}")]
    MemoryError(#[from] std::collections::TryReserveError),

    /// The method, locator and adapter do not fit together.
    #[error("not a valid method: {0}")]
    NotAValidMethod(String),

    /// The geometry hint is not legal for the family.
    #[error("geometry {geometry:?} is not valid for {family}")]
    BadGeometry {
        /// Family of the resource.
        family: Family,
        /// Geometry supplied.
        geometry: Geometry,
    },

    /// Record output has no destination to write to.
    #[error("no output destination set")]
    OutputNotSet,

    /// A subregion was requested where it cannot be honored.
    #[error("subset not allowed: {0}")]
    SubsetNotAllowed(String),

    /// A read-only raster would need re-padding.
    #[error("resource {0} is read-only and cannot be re-padded")]
    PaddingNotAllowed(ResourceId),

    /// Attempted to free memory the broker does not own.
    #[error("container {addr} is {ownership:?} and cannot be freed by the broker")]
    MemoryModeError {
        /// Address that was passed to destroy.
        addr: ContainerAddr,
        /// Ownership of the governing descriptor.
        ownership: Ownership,
    },

    /// A payload read was requested before the header was read.
    #[error("resource {0} has no header; read the header first")]
    NoHeader(ResourceId),

    /// More than one destination is registered where one is required.
    #[error("only one {family} output allowed, found {count}")]
    OnlyOneAllowed {
        /// Family requested.
        family: Family,
        /// Number of candidate outputs.
        count: usize,
    },

    /// The address is not held by any registered resource.
    #[error("container {0} is not registered")]
    UnknownContainer(ContainerAddr),

    /// The container is locked by another holder.
    #[error("container {0} is already borrowed")]
    BorrowConflict(ContainerAddr),

    /// Parsing or reshaping a container failed.
    #[error(transparent)]
    Container(ContainerError),

    /// File or stream I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ContainerError> for BrokerError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Memory(err) => Self::MemoryError(err),
            other => Self::Container(other),
        }
    }
}

/// Shorthand for broker results.
pub type Result<T, E = BrokerError> = core::result::Result<T, E>;
