// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service, method and message descriptors.
//!
//! Descriptors are the normalized form of an interface definition. They are
//! built once, validated on construction and never mutated afterwards, so
//! any number of clients and dispatchers may share one behind an `Arc`.

use crate::subject::{validate_token, InvalidNameError, NameKind, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Separator marking a type name as an external Rust path.
const PATH_SEPARATOR: &str = "::";

/// Invalid descriptor, model or method table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    #[error("duplicate service {0:?}")]
    DuplicateService(String),

    #[error("duplicate method {service}.{method}")]
    DuplicateMethod { service: String, method: String },

    #[error("duplicate message {0:?}")]
    DuplicateMessage(String),

    #[error("duplicate field {message}.{field}")]
    DuplicateField { message: String, field: String },

    #[error("invalid field {message}.{field}: {reason}")]
    InvalidField {
        message: String,
        field: String,
        reason: &'static str,
    },

    #[error("empty type name in {context}")]
    EmptyTypeName { context: String },

    #[error("{context} refers to unknown type {type_name:?}")]
    UnknownType { context: String, type_name: String },

    #[error("handler bound for undeclared method {service}.{method}")]
    UndeclaredMethod { service: String, method: String },

    #[error("handler bound twice for {service}.{method}")]
    DuplicateHandler { service: String, method: String },

    #[error("no handler bound for {service}.{method}")]
    MissingHandler { service: String, method: String },
}

/// One RPC method of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    name: String,
    request_type: String,
    response_type: String,
    service: String,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the request message type.
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    /// Name of the response message type.
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Name of the service declaring this method.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// `Service.Method`, for diagnostics.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.service, self.name)
    }
}

/// A named service and its ordered methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Start describing service `name`.
    pub fn builder(name: impl Into<String>) -> ServiceDescriptorBuilder {
        ServiceDescriptorBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|m| m.name.as_str())
    }
}

/// Builder for [`ServiceDescriptor`]; validation happens in [`build`].
///
/// [`build`]: ServiceDescriptorBuilder::build
#[derive(Debug, Clone)]
pub struct ServiceDescriptorBuilder {
    name: String,
    methods: Vec<(String, String, String)>,
}

impl ServiceDescriptorBuilder {
    /// Declare a method taking `request_type` and returning `response_type`.
    pub fn method(
        mut self,
        name: impl Into<String>,
        request_type: impl Into<String>,
        response_type: impl Into<String>,
    ) -> Self {
        self.methods
            .push((name.into(), request_type.into(), response_type.into()));
        self
    }

    pub fn build(self) -> Result<ServiceDescriptor, DescriptorError> {
        validate_token(NameKind::Service, &self.name)?;

        let mut seen = HashSet::new();
        let mut methods = Vec::with_capacity(self.methods.len());
        for (name, request_type, response_type) in self.methods {
            validate_token(NameKind::Method, &name)?;
            if !seen.insert(name.clone()) {
                return Err(DescriptorError::DuplicateMethod {
                    service: self.name,
                    method: name,
                });
            }
            for type_name in [&request_type, &response_type] {
                if type_name.trim().is_empty() {
                    return Err(DescriptorError::EmptyTypeName {
                        context: format!("{}.{}", self.name, name),
                    });
                }
            }
            methods.push(MethodDescriptor {
                name,
                request_type,
                response_type,
                service: self.name.clone(),
            });
        }

        Ok(ServiceDescriptor {
            name: self.name,
            methods,
        })
    }
}

/// Scalar or nested type of a message field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    /// Another declared message, or an external Rust path
    Message(String),
}

/// One field of a message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub repeated: bool,
    #[serde(default)]
    pub optional: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            repeated: false,
            optional: false,
        }
    }

    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A named message type with ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DescriptorError::EmptyTypeName {
                context: "message declaration".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(DescriptorError::InvalidField {
                    message: name,
                    field: String::new(),
                    reason: "field name must not be empty",
                });
            }
            if field.repeated && field.optional {
                return Err(DescriptorError::InvalidField {
                    message: name,
                    field: field.name.clone(),
                    reason: "a field cannot be both repeated and optional",
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(DescriptorError::DuplicateField {
                    message: name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Everything one interface definition declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorModel {
    namespace: Option<String>,
    services: Vec<ServiceDescriptor>,
    messages: Vec<MessageDescriptor>,
}

impl DescriptorModel {
    /// Assemble and cross-check a model.
    ///
    /// Every request, response and nested field type must be a declared
    /// message or an external Rust path (containing `::`).
    pub fn new(
        namespace: Option<String>,
        services: Vec<ServiceDescriptor>,
        messages: Vec<MessageDescriptor>,
    ) -> Result<Self, DescriptorError> {
        if let Some(ns) = &namespace {
            validate_token(NameKind::Namespace, ns)?;
        }

        let mut service_names = HashSet::new();
        for service in &services {
            if !service_names.insert(service.name()) {
                return Err(DescriptorError::DuplicateService(service.name().to_string()));
            }
        }

        let mut message_names = HashSet::new();
        for message in &messages {
            if !message_names.insert(message.name()) {
                return Err(DescriptorError::DuplicateMessage(message.name().to_string()));
            }
        }

        let check = |context: String, type_name: &str| {
            if message_names.contains(type_name) || type_name.contains(PATH_SEPARATOR) {
                Ok(())
            } else {
                Err(DescriptorError::UnknownType {
                    context,
                    type_name: type_name.to_string(),
                })
            }
        };

        for service in &services {
            for method in service.methods() {
                check(method.full_name(), method.request_type())?;
                check(method.full_name(), method.response_type())?;
            }
        }
        for message in &messages {
            for field in message.fields() {
                if let FieldKind::Message(type_name) = &field.kind {
                    check(format!("{}.{}", message.name(), field.name), type_name)?;
                }
            }
        }

        Ok(Self {
            namespace,
            services,
            messages,
        })
    }

    /// Declared namespace, or the default one.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn messages(&self) -> &[MessageDescriptor] {
        &self.messages
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name() == name)
    }

    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.iter().find(|m| m.name() == name)
    }
}
