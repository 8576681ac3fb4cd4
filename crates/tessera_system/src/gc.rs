//! Ownership-aware destruction and the scoped garbage collector.
//!
//! The broker frees a container by dropping its own handles to it. A
//! container shared by several descriptors is freed once, through the alias
//! index, and only when the first descriptor that acquired it owns it.

use tessera_containers::ContainerAddr;
use tracing::debug;

use crate::descriptor::Ownership;
use crate::error::{BrokerError, Result};
use crate::session::Session;

/// Which descriptors a collection pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Descriptors registered at exactly this nesting level.
    Level(u32),
    /// Every descriptor.
    All,
}

impl Scope {
    /// Returns `true` if a descriptor at `level` is in scope.
    #[must_use]
    pub fn contains(self, level: u32) -> bool {
        match self {
            Self::Level(l) => l == level,
            Self::All => true,
        }
    }
}

/// Counters kept by a session's collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcStats {
    /// Containers the broker freed.
    pub frees: u64,
    /// Destroy requests refused because the caller owns the container.
    pub refusals: u64,
}

impl Session {
    /// Frees the broker-owned container at `addr`.
    ///
    /// Every descriptor realizing the container forgets it; the free is
    /// counted once.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownContainer`] if no descriptor holds the
    /// address and [`BrokerError::MemoryModeError`] if the governing
    /// descriptor does not own it. Neither changes any state.
    pub fn destroy_container(&mut self, addr: ContainerAddr) -> Result<()> {
        let ids = self.registry.aliases_of(addr).to_vec();
        let governing = ids
            .first()
            .and_then(|id| self.registry.get(*id))
            .ok_or(BrokerError::UnknownContainer(addr))?;
        if governing.ownership != Ownership::Allocated {
            self.stats.refusals += 1;
            return Err(BrokerError::MemoryModeError {
                addr,
                ownership: governing.ownership,
            });
        }
        for id in &ids {
            self.registry.set_realized(*id, None);
        }
        self.stats.frees += 1;
        debug!(%addr, aliases = ids.len(), "freed container");
        Ok(())
    }

    /// Frees every container realized in `scope`, then unregisters every
    /// descriptor in `scope`. Returns the number of containers freed.
    ///
    /// Containers owned by the caller are skipped, never freed.
    pub fn collect(&mut self, scope: Scope) -> usize {
        let ids = self.registry.ids_in_scope(scope);
        let mut freed = 0;
        for id in &ids {
            let Some(addr) = self
                .registry
                .get(*id)
                .and_then(|d| d.realized.as_ref())
                .map(|c| c.addr())
            else {
                continue;
            };
            match self.destroy_container(addr) {
                Ok(()) => freed += 1,
                Err(err) => debug!(%id, %err, "kept container during collection"),
            }
        }
        for id in ids {
            self.registry.remove(id);
        }
        debug!(?scope, freed, "collected");
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{IoMode, Locator, Method, ResourceRequest};
    use tessera_containers::{Container, ContainerRef, Dataset, Family};

    fn host() -> ContainerRef {
        ContainerRef::new(Container::Dataset(Dataset::with_shape(1, 1, 2, 2)))
    }

    #[test]
    fn scope_levels() {
        assert!(Scope::All.contains(7));
        assert!(Scope::Level(2).contains(2));
        assert!(!Scope::Level(2).contains(1));
    }

    #[test]
    fn copies_are_freed_once() {
        let mut session = Session::new("gc");
        let source = host();
        let id = session
            .register(ResourceRequest::input(
                Family::Dataset,
                Method::CopyInMemory,
                Locator::memory(&source),
            ))
            .unwrap();
        let copy = session.import(Family::Dataset, id, IoMode::ALL).unwrap();

        session.destroy_container(copy.addr()).unwrap();
        assert_eq!(session.gc_stats().frees, 1);
        assert!(matches!(
            session.destroy_container(copy.addr()),
            Err(BrokerError::UnknownContainer(_))
        ));
        assert_eq!(session.gc_stats().frees, 1);
    }

    #[test]
    fn references_are_never_freed() {
        let mut session = Session::new("gc");
        let source = host();
        let id = session
            .register(ResourceRequest::input(
                Family::Dataset,
                Method::ReferenceInMemory,
                Locator::memory(&source),
            ))
            .unwrap();
        let shared = session.import(Family::Dataset, id, IoMode::ALL).unwrap();
        assert!(shared.same_as(&source));

        assert!(matches!(
            session.destroy_container(source.addr()),
            Err(BrokerError::MemoryModeError {
                ownership: Ownership::Referenced,
                ..
            })
        ));
        assert_eq!(session.collect(Scope::All), 0);
        assert_eq!(session.gc_stats().frees, 0);
        assert_eq!(session.gc_stats().refusals, 2);
        assert_eq!(source.dataset().map(|d| d.n_records()), Some(2));
    }
}
