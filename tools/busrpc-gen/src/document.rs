// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface definition documents (YAML or JSON).
//!
//! ```yaml
//! namespace: demo
//! services:
//!   - name: Greeter
//!     methods:
//!       - { name: SayHello, request: HelloRequest, response: HelloReply }
//! messages:
//!   - name: HelloRequest
//!     fields:
//!       - { name: name, type: string }
//!   - name: HelloReply
//!     fields:
//!       - { name: message, type: string }
//!       - { name: tags, type: string, repeated: true }
//! ```
//!
//! A field `type` is one of the scalar names below, a declared message, or
//! an external Rust path containing `::`.

use busrpc::{
    DescriptorError, DescriptorModel, FieldDescriptor, FieldKind, MessageDescriptor,
    ServiceDescriptor,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot tell the format of {0}; expected .yaml, .yml or .json")]
    UnknownFormat(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceDocument>,
    #[serde(default)]
    pub messages: Vec<MessageDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDocument {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDocument {
    pub name: String,
    pub request: String,
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub optional: bool,
}

impl FieldDocument {
    fn into_descriptor(self) -> FieldDescriptor {
        let kind = match self.type_name.as_str() {
            "bool" => FieldKind::Bool,
            "i32" => FieldKind::I32,
            "i64" => FieldKind::I64,
            "u32" => FieldKind::U32,
            "u64" => FieldKind::U64,
            "f32" => FieldKind::F32,
            "f64" => FieldKind::F64,
            "string" => FieldKind::String,
            "bytes" => FieldKind::Bytes,
            _ => FieldKind::Message(self.type_name),
        };
        FieldDescriptor {
            name: self.name,
            kind,
            repeated: self.repeated,
            optional: self.optional,
        }
    }
}

impl ModelDocument {
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a document, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml(&read()?),
            Some("json") => Self::from_json(&read()?),
            _ => Err(DocumentError::UnknownFormat(path.display().to_string())),
        }
    }

    /// Validate the document into a descriptor model.
    pub fn into_model(self) -> Result<DescriptorModel, DocumentError> {
        let services = self
            .services
            .into_iter()
            .map(|service| {
                service
                    .methods
                    .into_iter()
                    .fold(ServiceDescriptor::builder(service.name), |b, m| {
                        b.method(m.name, m.request, m.response)
                    })
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let messages = self
            .messages
            .into_iter()
            .map(|message| {
                let fields = message
                    .fields
                    .into_iter()
                    .map(FieldDocument::into_descriptor)
                    .collect();
                MessageDescriptor::new(message.name, fields)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DescriptorModel::new(self.namespace, services, messages)?)
    }
}
