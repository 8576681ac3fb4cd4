//! The export engine: writing containers to output resources.

use std::fs::File;
use std::io::{BufWriter, Write};

use tessera_containers::{Container, ContainerRef, Family, Region};
use tracing::debug;

use crate::adapter;
use crate::descriptor::{
    Direction, IoMode, Locator, Method, Ownership, ResourceId, Status, StreamHandle,
};
use crate::error::{BrokerError, Result};
use crate::import::fit_raster;
use crate::session::Session;

impl Session {
    /// Writes `container` to output resource `id`.
    ///
    /// Files and streams are written immediately. In-memory destinations
    /// receive a copy, the caller's container itself, or an adapter array,
    /// retrievable afterwards with
    /// [`retrieve_realized`](Session::retrieve_realized). The phase of
    /// `mode` is ignored; only `reset` matters.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotAValidId`] / [`BrokerError::NotOutputResource`] for a bad id
    /// - [`BrokerError::WrongKind`] if `family` or the container does not match
    /// - [`BrokerError::WrittenOnce`] for a second export without an honored reset
    /// - [`BrokerError::PointerNotNull`] if an in-memory destination is occupied
    /// - I/O errors from the destination
    pub fn export(
        &mut self,
        family: Family,
        id: ResourceId,
        mode: IoMode,
        container: &ContainerRef,
    ) -> Result<()> {
        let descriptor = self.registry.lookup(id, Direction::Output)?;
        if descriptor.family != family {
            return Err(BrokerError::WrongKind {
                expected: descriptor.family,
                found: family,
            });
        }
        let actual = container
            .try_read()
            .ok_or(BrokerError::BorrowConflict(container.addr()))?
            .family();
        if actual != family {
            return Err(BrokerError::WrongKind {
                expected: family,
                found: actual,
            });
        }
        let rewind = mode.reset && descriptor.method.can_rewind();
        if descriptor.status == Status::Used && !rewind {
            return Err(BrokerError::WrittenOnce(id));
        }
        let in_memory = descriptor.method.is_in_memory();
        if mode.reset {
            self.release_realization(id)?;
        }

        if in_memory {
            self.store(id, container)?;
        } else {
            self.serialize(id, container)?;
        }
        if let Some(descriptor) = self.registry.get_mut(id) {
            descriptor.status = Status::Used;
        }
        debug!(%id, %family, addr = %container.addr(), "exported");
        Ok(())
    }

    fn serialize(&mut self, id: ResourceId, container: &ContainerRef) -> Result<()> {
        let descriptor = self.registry.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        let guard = container
            .try_read()
            .ok_or(BrokerError::BorrowConflict(container.addr()))?;
        let clipped = clip(&guard, descriptor.subregion)?;
        let content = clipped.as_ref().unwrap_or(&*guard);
        match &mut descriptor.locator {
            Locator::Path(path) => {
                let mut writer = BufWriter::new(File::create(path.as_path())?);
                content.encode(&mut writer)?;
                writer.flush()?;
            }
            Locator::Stream(StreamHandle::Writer(writer)) => {
                let mut writer = writer.lock();
                content.encode(&mut *writer)?;
                writer.flush()?;
            }
            Locator::Descriptor(file) => {
                let mut writer = file.writer()?;
                content.encode(&mut writer)?;
                writer.flush()?;
            }
            Locator::Stream(StreamHandle::Reader(_)) | Locator::Memory(_) => {
                return Err(BrokerError::NotAValidMethod(format!(
                    "resource {id} has no writable destination"
                )));
            }
        }
        Ok(())
    }

    fn store(&mut self, id: ResourceId, container: &ContainerRef) -> Result<()> {
        let pad = self.config.pad();
        let descriptor = self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        if descriptor.locator.container().is_some() || descriptor.realized.is_some() {
            return Err(BrokerError::PointerNotNull(id));
        }
        let (handle, ownership) = match (descriptor.via, descriptor.method) {
            (Some(via), _) => {
                let guard = container
                    .try_read()
                    .ok_or(BrokerError::BorrowConflict(container.addr()))?;
                let host =
                    adapter::to_host(&guard, via, descriptor.element_kind, descriptor.complex)?;
                (ContainerRef::new(host), Ownership::Allocated)
            }
            (None, Method::ReferenceInMemory) => (container.clone(), Ownership::Referenced),
            (None, _) => {
                let copy = {
                    let guard = container
                        .try_read()
                        .ok_or(BrokerError::BorrowConflict(container.addr()))?;
                    clip(&guard, descriptor.subregion)?.unwrap_or_else(|| guard.clone())
                };
                (ContainerRef::new(fit_raster(copy, None, pad)?), Ownership::Allocated)
            }
        };
        if let Some(descriptor) = self.registry.get_mut(id) {
            descriptor.ownership = ownership;
        }
        self.realize(id, &handle, Status::Used);
        Ok(())
    }
}

/// Cuts a raster to `subregion`, or returns `None` when nothing needs
/// cutting.
fn clip(content: &Container, subregion: Option<Region>) -> Result<Option<Container>> {
    let Some(region) = subregion else {
        return Ok(None);
    };
    Ok(match content {
        Container::Grid(grid) if !grid.is_header_only() => {
            Some(Container::Grid(grid.extract(&grid.header.window(&region)?)?))
        }
        Container::Image(image) if !image.is_header_only() => {
            Some(Container::Image(image.extract(&image.header.window(&region)?)?))
        }
        _ => None,
    })
}
