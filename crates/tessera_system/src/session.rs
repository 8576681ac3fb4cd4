//! The session: one broker instance and everything it tracks.
//!
//! A [`Session`] owns a registry of resource descriptors, the record
//! streaming cursors, the module nesting level and the collector counters.
//! Sessions share nothing with each other apart from the counter used to
//! label them.

use core::sync::atomic::{AtomicU64, Ordering};

use tessera_containers::{ContainerRef, ContainerShape, Family, Geometry, Region};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::descriptor::{
    Direction, IoMode, Locator, Method, ResourceDescriptor, ResourceId, ResourceRequest,
    StreamHandle,
};
use crate::error::{BrokerError, Result};
use crate::gc::{GcStats, Scope};
use crate::record_io::RecordIo;
use crate::registry::Registry;
use crate::virtual_locator;

static SESSIONS: AtomicU64 = AtomicU64::new(0);

/// One broker instance.
///
/// Dropping a session releases everything it still holds, exactly like
/// [`destroy`](Self::destroy).
#[derive(Debug)]
pub struct Session {
    label: String,
    pub(crate) config: SessionConfig,
    pub(crate) registry: Registry,
    pub(crate) level: u32,
    pub(crate) stats: GcStats,
    pub(crate) record_io: RecordIo,
    torn_down: bool,
}

// ───────────────────────────────────────────────────────────────────────────
// Lifecycle
// ───────────────────────────────────────────────────────────────────────────

impl Session {
    /// Creates a session with the default configuration.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self::with_config(tag, SessionConfig::default())
    }

    /// Creates a session with `config`.
    #[must_use]
    pub fn with_config(tag: &str, config: SessionConfig) -> Self {
        let n = SESSIONS.fetch_add(1, Ordering::Relaxed);
        let label = format!("{tag}#{n}");
        debug!(%label, "session created");
        Self {
            label,
            config,
            registry: Registry::default(),
            level: 0,
            stats: GcStats::default(),
            record_io: RecordIo::default(),
            torn_down: false,
        }
    }

    /// Finishes any record streaming, frees every broker-owned container
    /// and returns the final collector counters.
    ///
    /// # Errors
    ///
    /// Returns the first error from finishing record output. The session is
    /// torn down regardless.
    pub fn destroy(mut self) -> Result<GcStats> {
        let result = self.teardown();
        result.map(|()| self.stats)
    }

    fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        let mut result = Ok(());
        for direction in [Direction::Input, Direction::Output] {
            if self.record_io.is_enabled(direction)
                && let Err(err) = self.end_record_io(direction)
                && result.is_ok()
            {
                result = Err(err);
            }
        }
        let freed = self.collect(Scope::All);
        debug!(label = %self.label, freed, frees = self.stats.frees, "session destroyed");
        result
    }

    /// The label `"{tag}#{n}"` given at creation.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current module nesting level; 0 outside any module.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Collector counters so far.
    #[must_use]
    pub fn gc_stats(&self) -> GcStats {
        self.stats
    }

    /// Number of registered resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(label = %self.label, %err, "error while tearing down session");
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Registration
// ───────────────────────────────────────────────────────────────────────────

impl Session {
    /// Registers a resource and returns its id.
    ///
    /// A path that is a virtual locator resolves to the resource it names
    /// without further checks. Registering the same host container again
    /// while it is unused returns the existing id.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotAValidMethod`] if method, locator and adapter do not fit
    /// - [`BrokerError::WrongKind`] if a host container has the wrong family
    /// - [`BrokerError::BadGeometry`] if the geometry does not suit the family
    /// - [`BrokerError::PointerIsNull`] for an in-memory input without a container
    /// - [`BrokerError::SubsetNotAllowed`] for a subregion that cannot be honored
    /// - [`BrokerError::MemoryError`] if the registry cannot grow
    pub fn register(&mut self, request: ResourceRequest) -> Result<ResourceId> {
        if let Locator::Path(path) = &request.locator
            && let Some(id) = path.to_str().and_then(virtual_locator::decode)
        {
            return self
                .registry
                .get(id)
                .map(ResourceDescriptor::id)
                .ok_or(BrokerError::NotAValidId(id));
        }
        validate(&request)?;
        if let Some(host) = request.locator.container()
            && let Some(id) =
                self.registry
                    .find_duplicate(host, request.family, request.geometry, request.direction)
        {
            if let Some(region) = request.subregion
                && let Some(existing) = self.registry.get_mut(id)
            {
                existing.subregion = Some(region);
            }
            debug!(%id, "host container already registered");
            return Ok(id);
        }
        let descriptor =
            ResourceDescriptor::from_request(request, self.level, self.config.element_kind());
        self.registry.insert(descriptor)
    }

    /// Removes a descriptor. Its container, if any, is not freed.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotAValidId`] for an unknown id.
    pub fn unregister(&mut self, id: ResourceId) -> Result<()> {
        self.registry
            .remove(id)
            .map(drop)
            .ok_or(BrokerError::NotAValidId(id))
    }

    /// Looks up a descriptor and checks its direction.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotAValidId`], [`BrokerError::NotInputResource`]
    /// or [`BrokerError::NotOutputResource`].
    pub fn lookup(&self, id: ResourceId, direction: Direction) -> Result<&ResourceDescriptor> {
        self.registry.lookup(id, direction)
    }

    /// The oldest unused resource of `family` flowing in `direction`.
    #[must_use]
    pub fn lookup_first_unused(&self, family: Family, direction: Direction) -> Option<ResourceId> {
        self.registry.first_unused(family, direction)
    }

    /// Restricts a registered grid or image to `region`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotAValidId`] for an unknown id and
    /// [`BrokerError::SubsetNotAllowed`] for other families or shared rasters.
    pub fn set_subregion(&mut self, id: ResourceId, region: Region) -> Result<()> {
        let descriptor = self.registry.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        check_subregion(descriptor.family, descriptor.method, descriptor.via.is_some())?;
        descriptor.subregion = Some(region);
        Ok(())
    }

    /// The virtual locator naming resource `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotAValidId`] for an unknown id.
    pub fn encode_virtual_locator(&self, id: ResourceId) -> Result<String> {
        self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        Ok(virtual_locator::encode(id))
    }

    /// The container realized for output resource `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PointerIsNull`] if nothing was exported yet.
    pub fn retrieve_realized(&self, id: ResourceId) -> Result<ContainerRef> {
        self.registry
            .lookup(id, Direction::Output)?
            .realized
            .clone()
            .ok_or(BrokerError::PointerIsNull { id: Some(id) })
    }
}

/// Checks a request in the order the broker reports problems.
fn validate(request: &ResourceRequest) -> Result<()> {
    let family = request.family;
    let method = request.method;
    if !request.locator.fits(method) {
        return Err(BrokerError::NotAValidMethod(format!(
            "{method:?} cannot use locator {:?}",
            request.locator
        )));
    }
    let stream_direction = match &request.locator {
        Locator::Stream(StreamHandle::Reader(_)) => Some(Direction::Input),
        Locator::Stream(StreamHandle::Writer(_)) => Some(Direction::Output),
        _ => None,
    };
    if stream_direction.is_some_and(|d| d != request.direction) {
        return Err(BrokerError::NotAValidMethod(format!(
            "stream does not match {} direction",
            request.direction
        )));
    }
    if method == Method::ReadOnlyInMemory && request.direction == Direction::Output {
        return Err(BrokerError::NotAValidMethod(
            "read-only memory cannot receive output".to_string(),
        ));
    }
    if let Some(via) = request.via {
        if !via.supports(family) || !method.is_in_memory() {
            return Err(BrokerError::NotAValidMethod(format!(
                "{via:?} cannot carry a {family} by {method:?}"
            )));
        }
        if let Some(host) = request.locator.container() {
            check_family(host, via.host_family())?;
        }
    }
    if !request.geometry.is_valid_for(family) {
        return Err(BrokerError::BadGeometry {
            family,
            geometry: request.geometry,
        });
    }
    if method.is_in_memory() && request.direction == Direction::Input {
        let host = request
            .locator
            .container()
            .ok_or(BrokerError::PointerIsNull { id: None })?;
        if request.via.is_none() {
            check_family(host, family)?;
        }
    }
    if request.subregion.is_some() {
        check_subregion(family, method, request.via.is_some())?;
    }
    Ok(())
}

fn check_family(host: &ContainerRef, expected: Family) -> Result<()> {
    let found = host
        .try_read()
        .ok_or(BrokerError::BorrowConflict(host.addr()))?
        .family();
    if found == expected {
        Ok(())
    } else {
        Err(BrokerError::WrongKind { expected, found })
    }
}

fn check_subregion(family: Family, method: Method, adapted: bool) -> Result<()> {
    if !family.is_raster() {
        return Err(BrokerError::SubsetNotAllowed(format!(
            "a {family} has no subregion"
        )));
    }
    if !adapted && matches!(method, Method::ReferenceInMemory | Method::ReadOnlyInMemory) {
        return Err(BrokerError::SubsetNotAllowed(format!(
            "a shared {family} cannot be cut to a subregion"
        )));
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────────────────
// Conveniences
// ───────────────────────────────────────────────────────────────────────────

impl Session {
    /// Allocates an empty, unattached container. Grids and images get the
    /// session pad.
    ///
    /// # Errors
    ///
    /// Returns a container error for an empty raster extent.
    pub fn create_empty_container(&self, shape: ContainerShape) -> Result<ContainerRef> {
        let container = tessera_containers::Container::empty(&shape, self.config.pad())?;
        Ok(ContainerRef::new(container))
    }

    /// Deep-copies `container` into a new, unattached allocation, re-padding
    /// rasters to the session pad.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::BorrowConflict`] if the container is locked for
    /// writing and [`BrokerError::MemoryError`] if the re-padded copy cannot
    /// be allocated.
    pub fn duplicate(&self, container: &ContainerRef) -> Result<ContainerRef> {
        let mut copy = container
            .try_read()
            .ok_or(BrokerError::BorrowConflict(container.addr()))?
            .clone();
        copy.set_pad(self.config.pad())?;
        Ok(ContainerRef::new(copy))
    }

    /// Registers an input and imports it in one call.
    ///
    /// # Errors
    ///
    /// Any error of [`register`](Self::register) or [`import`](Self::import).
    pub fn read_data(
        &mut self,
        family: Family,
        method: Method,
        locator: Locator,
        mode: IoMode,
    ) -> Result<ContainerRef> {
        let request = ResourceRequest::input(family, method, locator);
        let id = self.register(request)?;
        self.import(family, id, mode)
    }

    /// Registers an output and exports to it in one call.
    ///
    /// # Errors
    ///
    /// Any error of [`register`](Self::register) or [`export`](Self::export).
    pub fn write_data(
        &mut self,
        family: Family,
        method: Method,
        locator: Locator,
        mode: IoMode,
        container: &ContainerRef,
    ) -> Result<ResourceId> {
        let request = ResourceRequest::output(family, method, locator);
        let id = self.register(request)?;
        self.export(family, id, mode, container)?;
        Ok(id)
    }

    /// Registers `container` as a read-only input and returns a virtual
    /// locator for it.
    ///
    /// # Errors
    ///
    /// Any error of [`register`](Self::register).
    pub fn open_virtual_input(
        &mut self,
        family: Family,
        geometry: Geometry,
        container: &ContainerRef,
    ) -> Result<(ResourceId, String)> {
        let request =
            ResourceRequest::input(family, Method::ReadOnlyInMemory, Locator::memory(container))
                .geometry(geometry);
        let id = self.register(request)?;
        Ok((id, virtual_locator::encode(id)))
    }

    /// Registers an empty in-memory output and returns a virtual locator for
    /// it. What gets written there is available from
    /// [`retrieve_realized`](Self::retrieve_realized).
    ///
    /// # Errors
    ///
    /// Any error of [`register`](Self::register).
    pub fn open_virtual_output(
        &mut self,
        family: Family,
        geometry: Geometry,
    ) -> Result<(ResourceId, String)> {
        let request = ResourceRequest::output(family, Method::CopyInMemory, Locator::empty_slot())
            .geometry(geometry);
        let id = self.register(request)?;
        Ok((id, virtual_locator::encode(id)))
    }
}
