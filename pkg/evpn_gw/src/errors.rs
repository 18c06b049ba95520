//! Status taxonomy from `spec.md` §6/§7, exposed without depending on the
//! (externally supplied, out of scope per `spec.md` §1) wire schema or RPC
//! stack. An RPC front-end maps these 1:1 onto its own status codes.

use common::errors::*;

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum GatewayError {
    /// Malformed spec, bad MAC, ACCESS port with multiple bridges, dangling
    /// reference at create. Surfaced immediately; nothing persisted.
    InvalidArgument(String),

    /// Read/update/delete of an absent object (unless `AllowMissing` applies;
    /// see `rpc_front`).
    NotFound(String),

    /// Create on a name that already exists with a different spec. Suppressed
    /// by the idempotent-create rule when the spec matches.
    AlreadyExists(String),

    /// Delete attempted while a referrer still points at the object.
    FailedPrecondition(String),

    /// Storage CAS conflict that survived the inner retry.
    Aborted(String),

    Unimplemented(String),

    Internal(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::InvalidArgument(m) => write!(f, "InvalidArgument: {}", m),
            GatewayError::NotFound(m) => write!(f, "NotFound: {}", m),
            GatewayError::AlreadyExists(m) => write!(f, "AlreadyExists: {}", m),
            GatewayError::FailedPrecondition(m) => write!(f, "FailedPrecondition: {}", m),
            GatewayError::Aborted(m) => write!(f, "Aborted: {}", m),
            GatewayError::Unimplemented(m) => write!(f, "Unimplemented: {}", m),
            GatewayError::Internal(m) => write!(f, "Internal: {}", m),
        }
    }
}

impl GatewayError {
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        GatewayError::InvalidArgument(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        GatewayError::NotFound(message.into())
    }

    pub fn already_exists<S: Into<String>>(message: S) -> Self {
        GatewayError::AlreadyExists(message.into())
    }

    pub fn failed_precondition<S: Into<String>>(message: S) -> Self {
        GatewayError::FailedPrecondition(message.into())
    }

    pub fn aborted<S: Into<String>>(message: S) -> Self {
        GatewayError::Aborted(message.into())
    }

    /// Looks for a `GatewayError` inside a generic `common::errors::Error`,
    /// matching `rpc::Status::downcast_ref` usage in the teacher's tests
    /// (`pkg/datastore/src/meta/tests.rs`).
    pub fn downcast(error: &Error) -> Option<&GatewayError> {
        error.downcast_ref::<GatewayError>()
    }
}
