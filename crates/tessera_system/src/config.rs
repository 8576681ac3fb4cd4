//! Session configuration.
//!
//! # Example
//!
//! ```
//! use tessera_system::config::SessionConfig;
//! use tessera_system::session::Session;
//! use tessera_containers::ScalarKind;
//!
//! let config = SessionConfig::new()
//!     .with_pad(1)
//!     .with_element_kind(ScalarKind::F32);
//! let session = Session::with_config("filter", config);
//! assert_eq!(session.config().pad().west, 1);
//! ```

use tessera_containers::{Pad, ScalarKind};

/// Default border width applied to grids and images.
pub const DEFAULT_PAD: usize = 2;

/// Tunables fixed for the lifetime of a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Border width applied to every grid and image the broker realizes.
    pad: usize,
    /// Element width of matrices and vectors produced by output adapters
    /// when the registration does not name one.
    element_kind: ScalarKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pad: DEFAULT_PAD,
            element_kind: ScalarKind::F64,
        }
    }
}

impl SessionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raster border width.
    #[must_use]
    pub fn with_pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    /// Sets the default adapter element width.
    #[must_use]
    pub fn with_element_kind(mut self, kind: ScalarKind) -> Self {
        self.element_kind = kind;
        self
    }

    /// The raster border as a uniform [`Pad`].
    #[must_use]
    pub fn pad(&self) -> Pad {
        Pad::uniform(self.pad)
    }

    /// The default adapter element width.
    #[must_use]
    pub fn element_kind(&self) -> ScalarKind {
        self.element_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pad_is_two() {
        assert_eq!(SessionConfig::default().pad(), Pad::uniform(2));
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig::new()
            .with_pad(0)
            .with_element_kind(ScalarKind::I32);
        assert_eq!(config.pad(), Pad::default());
        assert_eq!(config.element_kind(), ScalarKind::I32);
    }
}
