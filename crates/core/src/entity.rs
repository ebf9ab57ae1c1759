//! Entity trait: identity + continuity across state changes.

use crate::id::Identity;

/// Entity marker + minimal interface.
///
/// Every record in the graph is identified by a process-wide [`Identity`];
/// equality between entities of the same kind is equality of identity, not
/// of attributes.
pub trait Entity {
    /// Returns the entity identity.
    fn identity(&self) -> Identity;
}
