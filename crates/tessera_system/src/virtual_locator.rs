//! Virtual locators: file names that stand for registered resources.
//!
//! A consumer that only understands file names can be handed
//! `"@tessera@-000042"` and the broker resolves it back to resource 42
//! instead of touching the filesystem.

use crate::descriptor::ResourceId;

/// Prefix identifying a virtual locator.
pub const MARKER: &str = "@tessera@-";

/// Minimum number of digits following the marker.
const DIGITS: usize = 6;

/// Encodes `id` as a virtual locator.
#[must_use]
pub fn encode(id: ResourceId) -> String {
    format!("{MARKER}{:0width$}", id.get(), width = DIGITS)
}

/// Decodes a virtual locator, returning `None` for ordinary names.
#[must_use]
pub fn decode(name: &str) -> Option<ResourceId> {
    let digits = name.strip_prefix(MARKER)?;
    if digits.len() < DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(ResourceId)
}

/// Returns `true` if `name` is a virtual locator.
#[must_use]
pub fn is_virtual(name: &str) -> bool {
    decode(name).is_some()
}
