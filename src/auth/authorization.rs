/// Ownership authorization
///
/// A mutation on a resource is admitted only when the authenticated subject
/// is the resource's recorded owner. Callers authenticate first, authorize
/// second, mutate last. New resources take their owner from the
/// authenticated subject, never from the request body.

use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationError {
    Forbidden,
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::Forbidden => write!(f, "Forbidden"),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// A resource with a recorded owner
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

pub fn authorize(subject_id: Uuid, resource_owner_id: Uuid) -> Result<(), AuthorizationError> {
    if subject_id == resource_owner_id {
        Ok(())
    } else {
        tracing::debug!(
            subject_id = %subject_id,
            owner_id = %resource_owner_id,
            "Ownership check failed"
        );
        Err(AuthorizationError::Forbidden)
    }
}

pub fn authorize_resource<R: Owned>(subject_id: Uuid, resource: &R) -> Result<(), AuthorizationError> {
    authorize(subject_id, resource.owner_id())
}
