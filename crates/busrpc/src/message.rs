// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload marshaling for typed requests and responses.
//!
//! The runtime never looks inside a payload: it only calls
//! [`Message::encode`] before publishing and [`Message::decode`] after
//! receiving. Any serde type is a message, marshaled as JSON.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

/// Marshaling failure for one message type.
#[derive(Debug, Error)]
#[error("{type_name}: {source}")]
pub struct CodecError {
    type_name: &'static str,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl CodecError {
    pub fn new(type_name: &'static str, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            type_name,
            source: source.into(),
        }
    }

    /// Rust type name of the message that failed to marshal.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A typed request or response payload.
pub trait Message: Sized + Send + 'static {
    /// Encode into payload bytes.
    fn encode(&self) -> Result<Bytes, CodecError>;

    /// Decode from payload bytes.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl<T> Message for T
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn encode(&self) -> Result<Bytes, CodecError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| CodecError::new(std::any::type_name::<T>(), e))
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::new(std::any::type_name::<T>(), e))
    }
}
