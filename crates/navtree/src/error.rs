//! Error types for navigation aggregates and their read side.

use crate::aggregate::NavId;
use thiserror::Error;

/// Errors raised by the navigation aggregate, its command handler and the
/// reference repository.
///
/// Validation variants are returned before any event is recorded, so a
/// failed operation never leaves partial state behind.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// Name was empty or whitespace-only at creation.
    #[error("name must not be empty")]
    EmptyName,

    /// `create` was called on a Nav that already has a name.
    #[error("navigation {id} is already created")]
    AlreadyCreated { id: NavId },

    /// Removal targeted an item supplied at creation time.
    #[error("item {path:?} is an initial item and cannot be removed")]
    InitialItem { path: String },

    /// A path did not resolve to an item.
    #[error("item {path:?} not found")]
    ItemNotFound { path: String },

    /// An inserted ID collides with a sibling at the target level.
    #[error("duplicate item {id:?}")]
    DuplicateItem { id: String },

    /// Caller passed a malformed argument (negative index, bad item ID).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The repository has no Nav with this identity.
    #[error("navigation {id} not found")]
    NotFound { id: NavId },

    /// The Lookup already maps this name to another Nav.
    #[error("navigation name {name:?} is already taken")]
    NameTaken { name: String },

    /// The stored stream moved on since the Nav was loaded.
    #[error("concurrency conflict on {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict { id: NavId, expected: u64, actual: u64 },

    /// A background component was started twice.
    #[error("{component} is already started")]
    AlreadyStarted { component: &'static str },

    /// Encoding or decoding a Nav failed.
    #[error("encoding failed: {reason}")]
    Encoding { reason: String },
}

impl NavError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Whether the error was raised by aggregate validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::AlreadyCreated { .. }
                | Self::InitialItem { .. }
                | Self::ItemNotFound { .. }
                | Self::DuplicateItem { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Whether the error reports a missing aggregate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Returns true if `err` wraps a [`NavError::NotFound`] anywhere in its chain.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<NavError>())
        .any(NavError::is_not_found)
}

/// Errors reported by background read-side components on their error
/// channel. These never stop the component.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The subscription fell behind the bus and dropped events.
    #[error("{component} lagged behind the event bus, {skipped} events skipped")]
    Lagged {
        component: &'static str,
        skipped: u64,
    },

    /// Two Navs were created with the same name; the first mapping is kept.
    #[error("name {name:?} already maps to {existing}, ignoring {duplicate}")]
    DuplicateName {
        name: String,
        existing: NavId,
        duplicate: NavId,
    },
}

/// Result alias for aggregate operations.
pub type Result<T, E = NavError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn not_found_survives_context() {
        let id = NavId::new();
        let err: anyhow::Error = Err::<(), _>(NavError::NotFound { id })
            .context("fetch Nav")
            .unwrap_err();

        assert!(is_not_found(&err));
        assert!(err.to_string().starts_with("fetch Nav"));
    }

    #[test]
    fn validation_predicate() {
        assert!(NavError::EmptyName.is_validation());
        assert!(!NavError::NameTaken { name: "x".into() }.is_validation());
    }
}
