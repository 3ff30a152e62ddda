// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for busrpc operations.

use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use crate::envelope::DecodeError;
use crate::message::CodecError;
use crate::subject::InvalidNameError;
use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Failure codes carried by a `Failure` reply.
///
/// The numeric values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// The implementation returned an application error
    ApplicationError = 1,
    /// No method with that name is bound by the dispatcher
    UnknownMethod = 2,
    /// The request frame or payload could not be decoded
    BadRequest = 3,
    /// The implementation faulted, or its response could not be encoded
    InternalError = 4,
}

impl ErrorCode {
    /// Convert from the wire value, `None` for unknown codes.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::ApplicationError),
            2 => Some(Self::UnknownMethod),
            3 => Some(Self::BadRequest),
            4 => Some(Self::InternalError),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ApplicationError => "ApplicationError",
            Self::UnknownMethod => "UnknownMethod",
            Self::BadRequest => "BadRequest",
            Self::InternalError => "InternalError",
        };
        f.write_str(s)
    }
}

/// Error explicitly returned by a service implementation.
///
/// Delivered to the caller as `RpcError::Remote` with
/// [`ErrorCode::ApplicationError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApplicationError {
    message: String,
}

impl ApplicationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ApplicationError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ApplicationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors surfaced by the client and dispatcher runtimes.
#[derive(Debug, Error)]
pub enum RpcError {
    /// A service, method, namespace or routing key breaks the subject rules
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// The request could not be encoded; nothing was published
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),

    /// A reply frame or response payload could not be decoded
    #[error("failed to decode reply: {0}")]
    Decode(#[from] DecodeError),

    /// No reply arrived before the deadline
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller canceled the call before a reply arrived
    #[error("call canceled")]
    Canceled,

    /// The remote side answered with a `Failure` reply
    #[error("remote error ({code}): {message}")]
    Remote { code: ErrorCode, message: String },

    /// The bound descriptor has no such method
    #[error("method not found: {service}.{method}")]
    MethodNotFound { service: String, method: String },

    /// Transport failure while publishing or subscribing
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Dispatcher was started twice
    #[error("dispatcher already started")]
    AlreadyStarted,

    /// The runtime was stopped
    #[error("runtime shut down")]
    Shutdown,

    /// Invalid client or dispatcher configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid descriptor or method table
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl RpcError {
    /// Failure code when this is a remote error.
    pub fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_conversion() {
        for code in [
            ErrorCode::ApplicationError,
            ErrorCode::UnknownMethod,
            ErrorCode::BadRequest,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(ErrorCode::from_i32(0), None);
        assert_eq!(ErrorCode::from_i32(-1), None);
    }

    #[test]
    fn rpc_error_display() {
        let err = RpcError::Remote {
            code: ErrorCode::ApplicationError,
            message: "name required".to_string(),
        };
        assert_eq!(err.to_string(), "remote error (ApplicationError): name required");
        assert_eq!(err.remote_code(), Some(ErrorCode::ApplicationError));

        let err = RpcError::Timeout(Duration::from_millis(50));
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_timeout());
        assert!(RpcError::Canceled.is_canceled());
    }

    #[test]
    fn application_error_from_str() {
        let err: ApplicationError = "boom".into();
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "boom");
    }
}
