//! Error types for the data layer.
//!
//! Errors fall into three families:
//! - Subscription: feed setup or push failures. Non-fatal, stale data is kept.
//! - Mutation: create/update/delete failures. Returned to the caller and
//!   recorded on the store.
//! - Validation: malformed user input, caught before any network call.
//!
//! [`StoreError`] is `Clone` because a copy of the last failure lives in each
//! store's observable state.

use thiserror::Error;

/// Errors raised by the document store and the live stores built on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed document {collection}/{id}: {reason}")]
    Schema {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Subscription error: {0}")]
    Subscription(Box<StoreError>),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No signed-in identity")]
    NoActiveIdentity,

    #[error("User profile not found: {0}")]
    ProfileMissing(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Wrap a cause as a subscription error. Already-wrapped errors are kept as is.
    pub fn subscription(cause: StoreError) -> Self {
        match cause {
            StoreError::Subscription(_) => cause,
            other => StoreError::Subscription(Box::new(other)),
        }
    }

    /// The underlying cause of a subscription error, or the error itself.
    pub fn cause(&self) -> &StoreError {
        match self {
            StoreError::Subscription(inner) => inner.as_ref(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.cause(), StoreError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Malformed user input. Never reaches the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_wrapping_is_flat() {
        let cause = StoreError::PermissionDenied("prospects".into());
        let once = StoreError::subscription(cause.clone());
        let twice = StoreError::subscription(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.cause(), &cause);
    }

    #[test]
    fn not_found_is_seen_through_subscription() {
        let err = StoreError::subscription(StoreError::NotFound {
            collection: "prospects".into(),
            id: "p1".into(),
        });
        assert!(err.is_not_found());
        assert!(!StoreError::NoActiveIdentity.is_not_found());
    }
}
