// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subject naming resolver.
//!
//! Maps `(service, method, routing_key?)` to a transport subject:
//!
//! ```text
//! <namespace>.<service>.<method>[.<routing_key>]
//! ```
//!
//! The mapping is pure and needs no registry. Every segment is a single
//! token: the delimiter and the transport wildcards are rejected, which
//! makes the join injective (distinct tuples never share a subject) and
//! rules out accidental wildcard subscriptions.

use std::fmt;
use thiserror::Error;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Token delimiter of the subject grammar.
pub const DELIMITER: char = '.';

/// Single-token wildcard reserved by the transport.
pub const WILDCARD_TOKEN: &str = "*";

/// Tail wildcard (one or more trailing tokens) reserved by the transport.
pub const WILDCARD_TAIL: &str = ">";

/// Which part of a subject a name was meant to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Namespace,
    Service,
    Method,
    RoutingKey,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Namespace => "namespace",
            Self::Service => "service",
            Self::Method => "method",
            Self::RoutingKey => "routing key",
        };
        f.write_str(s)
    }
}

/// A name that cannot be used as a subject token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} name {name:?}: {reason}")]
pub struct InvalidNameError {
    pub kind: NameKind,
    pub name: String,
    pub reason: &'static str,
}

impl InvalidNameError {
    fn new(kind: NameKind, name: &str, reason: &'static str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            reason,
        }
    }
}

/// Check that `name` can be used as one subject token.
pub fn validate_token(kind: NameKind, name: &str) -> Result<(), InvalidNameError> {
    if name.is_empty() {
        return Err(InvalidNameError::new(kind, name, "must not be empty"));
    }

    for ch in name.chars() {
        let reason = match ch {
            DELIMITER => "contains the subject delimiter '.'",
            '*' | '>' => "contains a reserved wildcard character",
            c if !c.is_ascii() => "must be ASCII",
            c if c.is_ascii_whitespace() || c.is_ascii_control() => {
                "must not contain whitespace or control characters"
            }
            _ => continue,
        };
        return Err(InvalidNameError::new(kind, name, reason));
    }

    Ok(())
}

/// A routable transport address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subject(String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of tokens in the subject.
    pub fn depth(&self) -> usize {
        self.0.split(DELIMITER).count()
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Method and optional routing key recovered from a concrete subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutedSubject<'a> {
    pub method: &'a str,
    pub routing_key: Option<&'a str>,
}

/// Resolves service/method names to subjects within one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectResolver {
    namespace: String,
}

impl Default for SubjectResolver {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl SubjectResolver {
    /// Create a resolver for `namespace`.
    pub fn new(namespace: impl Into<String>) -> Result<Self, InvalidNameError> {
        let namespace = namespace.into();
        validate_token(NameKind::Namespace, &namespace)?;
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve the subject for one method call.
    ///
    /// Without a routing key this is the canonical subject that dispatchers
    /// of the service consume through their queue group. With a key, one
    /// extra token addresses a single instance.
    pub fn resolve(
        &self,
        service: &str,
        method: &str,
        routing_key: Option<&str>,
    ) -> Result<Subject, InvalidNameError> {
        validate_token(NameKind::Service, service)?;
        validate_token(NameKind::Method, method)?;

        match routing_key {
            Some(key) => {
                validate_token(NameKind::RoutingKey, key)?;
                Ok(Subject(format!(
                    "{}.{}.{}.{}",
                    self.namespace, service, method, key
                )))
            }
            None => Ok(Subject(format!("{}.{}.{}", self.namespace, service, method))),
        }
    }

    /// Subscription pattern matching every method of `service`.
    pub fn service_pattern(&self, service: &str) -> Result<Subject, InvalidNameError> {
        validate_token(NameKind::Service, service)?;
        Ok(Subject(format!(
            "{}.{}.{}",
            self.namespace, service, WILDCARD_TOKEN
        )))
    }

    /// Subscription pattern matching every method of `service` addressed to
    /// the instance identified by `routing_key`.
    pub fn instance_pattern(
        &self,
        service: &str,
        routing_key: &str,
    ) -> Result<Subject, InvalidNameError> {
        validate_token(NameKind::Service, service)?;
        validate_token(NameKind::RoutingKey, routing_key)?;
        Ok(Subject(format!(
            "{}.{}.{}.{}",
            self.namespace, service, WILDCARD_TOKEN, routing_key
        )))
    }

    /// Recover the method (and routing key) from a subject of `service`.
    ///
    /// Returns `None` when the subject belongs to another namespace or
    /// service, or has the wrong number of tokens.
    pub fn parse<'a>(&self, service: &str, subject: &'a str) -> Option<RoutedSubject<'a>> {
        let mut tokens = subject.split(DELIMITER);

        if tokens.next()? != self.namespace || tokens.next()? != service {
            return None;
        }

        let method = tokens.next().filter(|m| !m.is_empty())?;
        let routing_key = match tokens.next() {
            Some(key) if !key.is_empty() => Some(key),
            Some(_) => return None,
            None => None,
        };

        if tokens.next().is_some() {
            return None;
        }

        Some(RoutedSubject {
            method,
            routing_key,
        })
    }
}

/// Resolve a subject in the default namespace.
pub fn resolve(
    service: &str,
    method: &str,
    routing_key: Option<&str>,
) -> Result<Subject, InvalidNameError> {
    SubjectResolver::default().resolve(service, method, routing_key)
}
