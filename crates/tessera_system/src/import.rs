//! The import engine: materializing input resources as containers.
//!
//! Grids and images may be imported in two phases. A header-only import
//! realizes a container without payload and leaves the resource in use; a
//! later payload import fills that same container. Streams and open files
//! continue from where the header ended, paths are reopened and in-memory
//! sources are copied again.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use tessera_containers::codec::{
    read_grid_header, read_grid_values, read_image_header, read_image_values,
};
use tessera_containers::{Container, ContainerRef, Family, Grid, Image, Pad, Region};
use tracing::debug;

use crate::adapter;
use crate::descriptor::{
    Direction, IoMode, Locator, Ownership, Phase, ResourceId, Status, StreamHandle,
};
use crate::error::{BrokerError, Result};
use crate::session::Session;

impl Session {
    /// Materializes input resource `id` as a container of `family`.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotAValidId`] / [`BrokerError::NotInputResource`] for a bad id
    /// - [`BrokerError::WrongKind`] if `family` does not match the registration
    /// - [`BrokerError::ReadOnce`] if the resource was already read and cannot be rewound
    /// - [`BrokerError::NoHeader`] for a payload import without a prior header import
    /// - [`BrokerError::PaddingNotAllowed`] / [`BrokerError::SubsetNotAllowed`] for
    ///   read-only or shared rasters that would need changing
    /// - I/O and parse errors from the source
    pub fn import(&mut self, family: Family, id: ResourceId, mode: IoMode) -> Result<ContainerRef> {
        let descriptor = self.registry.lookup(id, Direction::Input)?;
        if descriptor.family != family {
            return Err(BrokerError::WrongKind {
                expected: family,
                found: descriptor.family,
            });
        }
        let rewind = mode.reset && descriptor.method.can_rewind();
        if descriptor.status == Status::Used && !rewind {
            return Err(BrokerError::ReadOnce(id));
        }
        if mode.phase != Phase::All && !family.is_raster() {
            return Err(BrokerError::NotAValidMethod(format!(
                "{:?} import applies to grids and images, not a {family}",
                mode.phase
            )));
        }
        let shared = descriptor.via.is_none() && descriptor.ownership != Ownership::Allocated;
        if descriptor.status == Status::Used {
            self.release_realization(id)?;
        }

        let handle = if shared {
            self.import_shared(id, mode.phase)?
        } else {
            match mode.phase {
                Phase::HeaderOnly => self.import_header(id)?,
                Phase::DataOnly => self.import_payload(id)?,
                Phase::All => self.import_all(id)?,
            }
        };
        debug!(%id, %family, phase = ?mode.phase, addr = %handle.addr(), "imported");
        Ok(handle)
    }

    /// Wraps the caller's container for a reference or read-only import.
    fn import_shared(&mut self, id: ResourceId, phase: Phase) -> Result<ContainerRef> {
        let pad = self.config.pad();
        let descriptor = self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        let host = descriptor
            .locator
            .container()
            .cloned()
            .ok_or(BrokerError::PointerIsNull { id: Some(id) })?;
        if phase == Phase::DataOnly && descriptor.realized.is_none() {
            return Err(BrokerError::NoHeader(id));
        }
        if descriptor.family.is_raster() {
            if descriptor.subregion.is_some() {
                return Err(BrokerError::SubsetNotAllowed(format!(
                    "resource {id} shares the caller's {}",
                    descriptor.family
                )));
            }
            let current = host
                .try_read()
                .ok_or(BrokerError::BorrowConflict(host.addr()))?
                .raster_header()
                .map(|h| h.pad);
            if current != Some(pad) {
                if descriptor.ownership == Ownership::ReadOnly {
                    return Err(BrokerError::PaddingNotAllowed(id));
                }
                host.try_write()
                    .ok_or(BrokerError::BorrowConflict(host.addr()))?
                    .set_pad(pad)?;
            }
        }
        let status = if phase == Phase::HeaderOnly {
            Status::InUse
        } else {
            Status::Used
        };
        self.realize(id, &host, status);
        Ok(host)
    }

    fn import_header(&mut self, id: ResourceId) -> Result<ContainerRef> {
        let descriptor = self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        if descriptor.status == Status::InUse
            && let Some(realized) = &descriptor.realized
        {
            return Ok(realized.clone());
        }
        let content = self.load(id, Phase::HeaderOnly)?;
        let content = fit_raster(content, None, self.config.pad())?;
        let handle = ContainerRef::new(content);
        self.realize(id, &handle, Status::InUse);
        Ok(handle)
    }

    fn import_payload(&mut self, id: ResourceId) -> Result<ContainerRef> {
        let descriptor = self.registry.get(id).ok_or(BrokerError::NotAValidId(id))?;
        let realized = descriptor.realized.clone().ok_or(BrokerError::NoHeader(id))?;
        let subregion = descriptor.subregion;
        let content = self.load(id, Phase::DataOnly)?;
        let content = fit_raster(content, subregion, self.config.pad())?;
        *realized
            .try_write()
            .ok_or(BrokerError::BorrowConflict(realized.addr()))? = content;
        self.realize(id, &realized, Status::Used);
        Ok(realized)
    }

    fn import_all(&mut self, id: ResourceId) -> Result<ContainerRef> {
        self.release_realization(id)?;
        let subregion = self.registry.get(id).and_then(|d| d.subregion);
        let content = self.load(id, Phase::All)?;
        let content = fit_raster(content, subregion, self.config.pad())?;
        let handle = ContainerRef::new(content);
        self.realize(id, &handle, Status::Used);
        Ok(handle)
    }

    /// Reads the requested phase of `id` from its locator.
    fn load(&mut self, id: ResourceId, phase: Phase) -> Result<Container> {
        let descriptor = self.registry.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        let family = descriptor.family;
        let via = descriptor.via;
        let complex = descriptor.complex;
        let header = descriptor.realized.clone();
        match &mut descriptor.locator {
            Locator::Path(path) => {
                let mut reader = BufReader::new(File::open(path.as_path())?);
                // A reopened file starts with its header again.
                let phase = if phase == Phase::DataOnly {
                    Phase::All
                } else {
                    phase
                };
                read_phase(family, phase, &mut reader, header.as_ref(), id)
            }
            Locator::Stream(StreamHandle::Reader(reader)) => {
                let reader = Arc::clone(reader);
                let mut guard = reader.lock();
                read_phase(family, phase, &mut *guard, header.as_ref(), id)
            }
            Locator::Descriptor(file) => {
                let reader = file.reader()?;
                let mut guard = reader.lock();
                read_phase(family, phase, &mut *guard, header.as_ref(), id)
            }
            Locator::Stream(StreamHandle::Writer(_)) => Err(BrokerError::NotAValidMethod(format!(
                "resource {id} is registered with a writable stream"
            ))),
            Locator::Memory(host) => {
                let host = host.clone().ok_or(BrokerError::PointerIsNull { id: Some(id) })?;
                let guard = host.try_read().ok_or(BrokerError::BorrowConflict(host.addr()))?;
                let content = match via {
                    Some(_) => adapter::from_host(&guard, family, complex)?,
                    None => guard.clone(),
                };
                Ok(if phase == Phase::HeaderOnly {
                    strip_payload(content)
                } else {
                    content
                })
            }
        }
    }

    /// Records `handle` as the realization of `id`.
    pub(crate) fn realize(&mut self, id: ResourceId, handle: &ContainerRef, status: Status) {
        let unchanged = self
            .registry
            .get(id)
            .and_then(|d| d.realized.as_ref())
            .is_some_and(|r| r.same_as(handle));
        if !unchanged {
            self.registry.set_realized(id, Some(handle.clone()));
        }
        if let Some(descriptor) = self.registry.get_mut(id) {
            descriptor.status = status;
        }
    }

    /// Drops the current realization of `id`, freeing it when the broker
    /// owns it.
    pub(crate) fn release_realization(&mut self, id: ResourceId) -> Result<()> {
        let Some(descriptor) = self.registry.get(id) else {
            return Ok(());
        };
        let Some(addr) = descriptor.realized.as_ref().map(ContainerRef::addr) else {
            return Ok(());
        };
        if descriptor.ownership == Ownership::Allocated {
            self.destroy_container(addr)
        } else {
            self.registry.set_realized(id, None);
            Ok(())
        }
    }
}

fn read_phase(
    family: Family,
    phase: Phase,
    reader: &mut dyn BufRead,
    header: Option<&ContainerRef>,
    id: ResourceId,
) -> Result<Container> {
    match phase {
        Phase::All => Ok(Container::decode(family, reader)?),
        Phase::HeaderOnly => match family {
            Family::Grid => Ok(Container::Grid(Grid::header_only(read_grid_header(reader)?))),
            Family::Image => {
                let (header, n_bands) = read_image_header(reader)?;
                Ok(Container::Image(Image::header_only(header, n_bands)))
            }
            _ => Ok(Container::decode(family, reader)?),
        },
        Phase::DataOnly => {
            let header = header.ok_or(BrokerError::NoHeader(id))?;
            let guard = header
                .try_read()
                .ok_or(BrokerError::BorrowConflict(header.addr()))?;
            match &*guard {
                Container::Grid(grid) => {
                    let mut h = grid.header.clone();
                    h.pad = Pad::default();
                    let values = read_grid_values(reader, &h)?;
                    Ok(Container::Grid(Grid::from_values(h, &values)?))
                }
                Container::Image(image) => {
                    let mut h = image.header.clone();
                    h.pad = Pad::default();
                    let values = read_image_values(reader, &h, image.n_bands)?;
                    Ok(Container::Image(Image::from_values(h, image.n_bands, &values)?))
                }
                _ => Err(BrokerError::NoHeader(id)),
            }
        }
    }
}

fn strip_payload(content: Container) -> Container {
    match content {
        Container::Grid(grid) => Container::Grid(Grid::header_only(grid.header)),
        Container::Image(image) => {
            Container::Image(Image::header_only(image.header, image.n_bands))
        }
        other => other,
    }
}

/// Cuts a raster down to `subregion` and applies the session pad.
pub(crate) fn fit_raster(
    content: Container,
    subregion: Option<Region>,
    pad: Pad,
) -> Result<Container> {
    Ok(match content {
        Container::Grid(grid) => {
            let mut grid = match subregion {
                Some(region) if !grid.is_header_only() => {
                    grid.extract(&grid.header.window(&region)?)?
                }
                _ => grid,
            };
            grid.set_pad(pad)?;
            Container::Grid(grid)
        }
        Container::Image(image) => {
            let mut image = match subregion {
                Some(region) if !image.is_header_only() => {
                    image.extract(&image.header.window(&region)?)?
                }
                _ => image,
            };
            image.set_pad(pad)?;
            Container::Image(image)
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Adapter, Method, ResourceRequest};
    use parking_lot::Mutex;
    use tessera_containers::{GridHeader, Matrix, Registration, ScalarKind};

    const GRID_TEXT: &str = concat!(
        r#"{"nx":3,"ny":2,"region":{"west":0.0,"east":2.0,"south":0.0,"north":1.0},"#,
        r#""inc":[1.0,1.0],"registration":"Gridline"}"#,
        "\n1 2 3\n4 5 6\n"
    );

    fn grid_3x2(pad: Pad) -> ContainerRef {
        let header = GridHeader::new(
            Region::new(0.0, 2.0, 0.0, 1.0),
            [1.0, 1.0],
            Registration::Gridline,
        )
        .unwrap();
        let mut grid = Grid::from_values(header, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        grid.set_pad(pad).unwrap();
        ContainerRef::new(Container::Grid(grid))
    }

    #[test]
    fn stream_header_then_payload() {
        let mut session = Session::new("import");
        let stream: crate::descriptor::SharedReader = Arc::new(Mutex::new(GRID_TEXT.as_bytes()));
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::ByStream,
                Locator::reader(stream),
            ))
            .unwrap();

        let header = session.import(Family::Grid, id, IoMode::HEADER_ONLY).unwrap();
        assert!(header.grid().unwrap().is_header_only());
        assert_eq!(session.lookup(id, Direction::Input).unwrap().status(), Status::InUse);

        let full = session.import(Family::Grid, id, IoMode::DATA_ONLY).unwrap();
        assert!(full.same_as(&header));
        let grid = full.grid().unwrap();
        assert_eq!(grid.values(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(grid.header.pad, Pad::uniform(2));
    }

    #[test]
    fn payload_without_header_fails() {
        let mut session = Session::new("import");
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::CopyInMemory,
                Locator::memory(&grid_3x2(Pad::default())),
            ))
            .unwrap();
        assert!(matches!(
            session.import(Family::Grid, id, IoMode::DATA_ONLY),
            Err(BrokerError::NoHeader(_))
        ));
    }

    #[test]
    fn copy_applies_subregion_and_pad() {
        let mut session = Session::new("import");
        let host = grid_3x2(Pad::default());
        let id = session
            .register(
                ResourceRequest::input(Family::Grid, Method::CopyInMemory, Locator::memory(&host))
                    .subregion(Region::new(1.0, 2.0, 0.0, 1.0)),
            )
            .unwrap();
        let copy = session.import(Family::Grid, id, IoMode::ALL).unwrap();
        assert!(!copy.same_as(&host));
        let grid = copy.grid().unwrap();
        assert_eq!(grid.values(), vec![2.0, 3.0, 5.0, 6.0]);
        assert_eq!(grid.header.pad, Pad::uniform(2));
        assert_eq!(host.grid().unwrap().header.pad, Pad::default());
    }

    #[test]
    fn reference_repads_in_place_read_only_refuses() {
        let mut session = Session::new("import");
        let host = grid_3x2(Pad::default());
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::ReferenceInMemory,
                Locator::memory(&host),
            ))
            .unwrap();
        let shared = session.import(Family::Grid, id, IoMode::ALL).unwrap();
        assert!(shared.same_as(&host));
        assert_eq!(host.grid().unwrap().header.pad, Pad::uniform(2));

        let frozen = grid_3x2(Pad::uniform(1));
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::ReadOnlyInMemory,
                Locator::memory(&frozen),
            ))
            .unwrap();
        assert!(matches!(
            session.import(Family::Grid, id, IoMode::ALL),
            Err(BrokerError::PaddingNotAllowed(_))
        ));
        assert_eq!(frozen.grid().unwrap().header.pad, Pad::uniform(1));
    }

    #[test]
    fn second_read_needs_reset() {
        let mut session = Session::new("import");
        let host = grid_3x2(Pad::default());
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::CopyInMemory,
                Locator::memory(&host),
            ))
            .unwrap();
        session.import(Family::Grid, id, IoMode::ALL).unwrap();
        assert!(matches!(
            session.import(Family::Grid, id, IoMode::ALL),
            Err(BrokerError::ReadOnce(_))
        ));
        session.import(Family::Grid, id, IoMode::ALL.with_reset()).unwrap();
        assert_eq!(session.gc_stats().frees, 1);
    }

    #[test]
    fn matrix_adapter_builds_a_grid() {
        let mut session = Session::new("import");
        let mut m = Matrix::new(2, 2, 1, ScalarKind::I32);
        m.set(1, 1, 0, 7.0);
        let host = ContainerRef::new(Container::Matrix(m));
        let id = session
            .register(
                ResourceRequest::input(
                    Family::Grid,
                    Method::ReferenceInMemory,
                    Locator::memory(&host),
                )
                .via(Adapter::ViaMatrix),
            )
            .unwrap();
        let grid = session.import(Family::Grid, id, IoMode::ALL).unwrap();
        assert_eq!(grid.grid().unwrap().value(1, 1), Some(7.0));
        assert_eq!(
            session.lookup(id, Direction::Input).unwrap().ownership(),
            Ownership::Allocated
        );
    }

    #[test]
    fn wrong_family_is_rejected() {
        let mut session = Session::new("import");
        let id = session
            .register(ResourceRequest::input(
                Family::Grid,
                Method::ByPath,
                Locator::path("missing.grd"),
            ))
            .unwrap();
        assert!(matches!(
            session.import(Family::Image, id, IoMode::ALL),
            Err(BrokerError::WrongKind { .. })
        ));
    }
}
