//! Nested modules and the scope they give to resources.
//!
//! A module is a unit of work run inside a session. While it runs, every
//! resource it registers is tagged with a deeper nesting level, and when it
//! returns the collector sweeps exactly that level.
//!
//! ```
//! use tessera_system::error::Result;
//! use tessera_system::module::Module;
//! use tessera_system::session::Session;
//!
//! struct CheckLevel;
//!
//! impl Module for CheckLevel {
//!     fn name(&self) -> &str {
//!         "check-level"
//!     }
//!
//!     fn run(&self, session: &mut Session) -> Result<()> {
//!         assert_eq!(session.level(), 1);
//!         Ok(())
//!     }
//! }
//!
//! let mut session = Session::new("host");
//! session.run_module(&CheckLevel).unwrap();
//! assert_eq!(session.level(), 0);
//! ```

use tracing::{debug, debug_span};

use crate::error::Result;
use crate::gc::Scope;
use crate::session::Session;

/// A unit of work that borrows the session while it runs.
pub trait Module {
    /// Name used in log output.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Runs the module.
    ///
    /// # Errors
    ///
    /// Returns whatever the module's broker calls return.
    fn run(&self, session: &mut Session) -> Result<()>;
}

impl<F> Module for F
where
    F: Fn(&mut Session) -> Result<()>,
{
    fn run(&self, session: &mut Session) -> Result<()> {
        self(session)
    }
}

impl Session {
    /// Runs `module` one level deeper and collects what it left behind.
    ///
    /// The level is collected even when the module fails.
    ///
    /// # Errors
    ///
    /// Returns the module's error.
    pub fn run_module<M: Module + ?Sized>(&mut self, module: &M) -> Result<()> {
        self.level += 1;
        let level = self.level;
        let span = debug_span!("module", name = module.name(), level);
        let result = span.in_scope(|| module.run(self));
        let freed = self.collect(Scope::Level(level));
        debug!(name = module.name(), level, freed, ok = result.is_ok(), "module finished");
        self.level -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{IoMode, Locator, Method, ResourceRequest};
    use crate::error::BrokerError;
    use tessera_containers::{Container, ContainerRef, Dataset, Family};

    #[test]
    fn inner_resources_are_collected() {
        let mut session = Session::new("outer");
        let source = ContainerRef::new(Container::Dataset(Dataset::with_shape(1, 1, 3, 1)));
        let copy_inside = |session: &mut Session| -> Result<()> {
            let id = session.register(ResourceRequest::input(
                Family::Dataset,
                Method::CopyInMemory,
                Locator::memory(&source),
            ))?;
            session.import(Family::Dataset, id, IoMode::ALL)?;
            assert_eq!(session.lookup(id, crate::descriptor::Direction::Input)?.level(), 1);
            Ok(())
        };
        session.run_module(&copy_inside).unwrap();
        assert_eq!(session.gc_stats().frees, 1);
        assert_eq!(session.resource_count(), 0);
    }

    #[test]
    fn failing_module_still_collects() {
        let mut session = Session::new("outer");
        let fails = |session: &mut Session| -> Result<()> {
            session.register(ResourceRequest::input(
                Family::Dataset,
                Method::ByPath,
                Locator::path("never-read.txt"),
            ))?;
            Err(BrokerError::OutputNotSet)
        };
        assert!(session.run_module(&fails).is_err());
        assert_eq!(session.level(), 0);
        assert_eq!(session.resource_count(), 0);
    }
}
