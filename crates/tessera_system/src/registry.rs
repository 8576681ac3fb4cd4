//! The ordered descriptor list and its alias index.
//!
//! Descriptors are kept in registration order, which is also id order, so
//! "the first unused input of a family" is a forward scan. The alias index
//! maps every realized container address to the descriptors holding it; the
//! garbage collector uses it to free a container once no matter how many
//! descriptors share it.

use hashbrown::HashMap;
use tessera_containers::{ContainerAddr, ContainerRef, Family, Geometry};
use tracing::debug;

use crate::descriptor::{Direction, ResourceDescriptor, ResourceId, Status};
use crate::error::{BrokerError, Result};
use crate::gc::Scope;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    descriptors: Vec<ResourceDescriptor>,
    aliases: HashMap<ContainerAddr, Vec<ResourceId>>,
    next_id: u64,
}

impl Registry {
    /// Appends a descriptor under a fresh id.
    pub(crate) fn insert(&mut self, mut descriptor: ResourceDescriptor) -> Result<ResourceId> {
        self.descriptors.try_reserve(1)?;
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        descriptor.id = id;
        debug!(
            %id,
            family = %descriptor.family,
            method = ?descriptor.method,
            direction = %descriptor.direction,
            level = descriptor.level,
            "registered resource"
        );
        self.descriptors.push(descriptor);
        Ok(id)
    }

    fn position(&self, id: ResourceId) -> Option<usize> {
        self.descriptors.binary_search_by_key(&id, |d| d.id).ok()
    }

    pub(crate) fn get(&self, id: ResourceId) -> Option<&ResourceDescriptor> {
        self.position(id).map(|i| &self.descriptors[i])
    }

    pub(crate) fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceDescriptor> {
        self.position(id).map(|i| &mut self.descriptors[i])
    }

    /// Resolves `id` and checks that it flows in `direction`.
    pub(crate) fn lookup(
        &self,
        id: ResourceId,
        direction: Direction,
    ) -> Result<&ResourceDescriptor> {
        let descriptor = self.get(id).ok_or(BrokerError::NotAValidId(id))?;
        check_direction(descriptor, direction)?;
        Ok(descriptor)
    }

    pub(crate) fn lookup_mut(
        &mut self,
        id: ResourceId,
        direction: Direction,
    ) -> Result<&mut ResourceDescriptor> {
        let descriptor = self.get_mut(id).ok_or(BrokerError::NotAValidId(id))?;
        check_direction(descriptor, direction)?;
        Ok(descriptor)
    }

    pub(crate) fn first_unused(&self, family: Family, direction: Direction) -> Option<ResourceId> {
        self.unused(family, direction).next()
    }

    pub(crate) fn unused(
        &self,
        family: Family,
        direction: Direction,
    ) -> impl Iterator<Item = ResourceId> + '_ {
        self.descriptors
            .iter()
            .filter(move |d| {
                d.family == family && d.direction == direction && d.status == Status::Unused
            })
            .map(|d| d.id)
    }

    /// Finds an unused descriptor already registered for the same host
    /// container, family, geometry and direction.
    pub(crate) fn find_duplicate(
        &self,
        container: &ContainerRef,
        family: Family,
        geometry: Geometry,
        direction: Direction,
    ) -> Option<ResourceId> {
        self.descriptors
            .iter()
            .find(|d| {
                d.status == Status::Unused
                    && d.family == family
                    && d.geometry == geometry
                    && d.direction == direction
                    && d.locator.container().is_some_and(|c| c.same_as(container))
            })
            .map(|d| d.id)
    }

    /// Replaces the realized container of `id`, keeping the alias index in
    /// step. Returns the previous realization.
    pub(crate) fn set_realized(
        &mut self,
        id: ResourceId,
        container: Option<ContainerRef>,
    ) -> Option<ContainerRef> {
        let descriptor = self.get_mut(id)?;
        let previous = core::mem::replace(&mut descriptor.realized, container.clone());
        if let Some(old) = &previous {
            self.forget_alias(old.addr(), id);
        }
        if let Some(new) = container {
            self.aliases.entry(new.addr()).or_default().push(id);
        }
        previous
    }

    fn forget_alias(&mut self, addr: ContainerAddr, id: ResourceId) {
        if let Some(ids) = self.aliases.get_mut(&addr) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.aliases.remove(&addr);
            }
        }
    }

    /// Descriptors whose realization is the container at `addr`, in the
    /// order they acquired it.
    pub(crate) fn aliases_of(&self, addr: ContainerAddr) -> &[ResourceId] {
        self.aliases.get(&addr).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn ids_in_scope(&self, scope: Scope) -> Vec<ResourceId> {
        self.descriptors
            .iter()
            .filter(|d| scope.contains(d.level))
            .map(|d| d.id)
            .collect()
    }

    /// Removes a descriptor and its alias entries; never touches payloads.
    pub(crate) fn remove(&mut self, id: ResourceId) -> Option<ResourceDescriptor> {
        let position = self.position(id)?;
        let descriptor = self.descriptors.remove(position);
        if let Some(realized) = &descriptor.realized {
            self.forget_alias(realized.addr(), id);
        }
        debug!(%id, "unregistered resource");
        Some(descriptor)
    }

    pub(crate) fn len(&self) -> usize {
        self.descriptors.len()
    }
}

fn check_direction(descriptor: &ResourceDescriptor, direction: Direction) -> Result<()> {
    match (descriptor.direction, direction) {
        (Direction::Output, Direction::Input) => Err(BrokerError::NotInputResource(descriptor.id)),
        (Direction::Input, Direction::Output) => Err(BrokerError::NotOutputResource(descriptor.id)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Locator, Method, ResourceRequest};
    use tessera_containers::{Container, Dataset, ScalarKind};

    fn descriptor(direction: Direction, level: u32) -> ResourceDescriptor {
        let request = ResourceRequest::new(
            Family::Dataset,
            Method::ByPath,
            direction,
            Locator::path("t.txt"),
        );
        ResourceDescriptor::from_request(request, level, ScalarKind::F64)
    }

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut registry = Registry::default();
        let a = registry.insert(descriptor(Direction::Input, 0)).unwrap();
        let b = registry.insert(descriptor(Direction::Input, 0)).unwrap();
        registry.remove(b);
        let c = registry.insert(descriptor(Direction::Input, 0)).unwrap();
        assert!(a < b && b < c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_checks_direction() {
        let mut registry = Registry::default();
        let input = registry.insert(descriptor(Direction::Input, 0)).unwrap();
        let output = registry.insert(descriptor(Direction::Output, 0)).unwrap();
        assert!(registry.lookup(input, Direction::Input).is_ok());
        assert!(matches!(
            registry.lookup(input, Direction::Output),
            Err(BrokerError::NotOutputResource(id)) if id == input
        ));
        assert!(matches!(
            registry.lookup(output, Direction::Input),
            Err(BrokerError::NotInputResource(_))
        ));
        assert!(matches!(
            registry.lookup(ResourceId(99), Direction::Input),
            Err(BrokerError::NotAValidId(_))
        ));
    }

    #[test]
    fn alias_index_follows_realizations() {
        let mut registry = Registry::default();
        let a = registry.insert(descriptor(Direction::Input, 0)).unwrap();
        let b = registry.insert(descriptor(Direction::Output, 0)).unwrap();
        let shared = ContainerRef::new(Container::Dataset(Dataset::new(1)));

        registry.set_realized(a, Some(shared.clone()));
        registry.set_realized(b, Some(shared.clone()));
        assert_eq!(registry.aliases_of(shared.addr()), &[a, b]);

        registry.remove(a);
        assert_eq!(registry.aliases_of(shared.addr()), &[b]);

        let previous = registry.set_realized(b, None);
        assert!(previous.is_some_and(|p| p.same_as(&shared)));
        assert!(registry.aliases_of(shared.addr()).is_empty());
    }

    #[test]
    fn scope_selects_by_level() {
        let mut registry = Registry::default();
        registry.insert(descriptor(Direction::Input, 0)).unwrap();
        let inner = registry.insert(descriptor(Direction::Input, 1)).unwrap();
        assert_eq!(registry.ids_in_scope(Scope::Level(1)), vec![inner]);
        assert_eq!(registry.ids_in_scope(Scope::All).len(), 2);
    }
}
