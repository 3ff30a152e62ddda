// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generation pass: descriptor model in, Rust sources out.
//!
//! Output is a pure function of the model. Services, methods, messages and
//! fields are emitted in declaration order, so identical input always yields
//! byte-identical files.
//!
//! Per model:
//! - `messages.rs`: one serde struct per declared message
//! - `<service>.rs`: server trait, typed client, descriptor and dispatcher
//!   constructors for each service
//! - `mod.rs`: the namespace constant and the module list

pub mod naming;
pub mod rust_backend;

use busrpc::{DescriptorError, DescriptorModel};
use naming::{escape_ident, identifier_problem, to_snake_case, to_upper_snake_case};
use std::collections::HashMap;
use thiserror::Error;

/// Module holding the message structs.
pub const MESSAGES_MODULE: &str = "messages";

/// Module names a service may not take.
const RESERVED_MODULES: &[&str] = &[MESSAGES_MODULE, "mod"];

/// Method identifiers that clash with generated client items.
const RESERVED_METHODS: &[&str] = &["new", "inner"];

/// Method constants that clash with generated module items.
const RESERVED_CONSTANTS: &[&str] = &["SERVICE_NAME"];

/// Generation failure. Nothing is emitted when any check fails.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("{kind} name {name:?} is not a valid Rust identifier: {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("{kind} names {first:?} and {second:?} both map to `{ident}` in {scope}")]
    Collision {
        kind: &'static str,
        scope: String,
        first: String,
        second: String,
        ident: String,
    },

    #[error("{kind} name {name:?} maps to `{ident}`, which is reserved in {scope}")]
    Reserved {
        kind: &'static str,
        scope: String,
        name: String,
        ident: String,
    },
}

/// One emitted source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtifact {
    /// File name relative to the output directory
    pub file_name: String,
    pub contents: String,
}

impl SourceArtifact {
    fn new(file_name: impl Into<String>, contents: String) -> Self {
        Self {
            file_name: file_name.into(),
            contents,
        }
    }
}

/// Generate the bindings for `model`.
pub fn generate(model: &DescriptorModel) -> Result<Vec<SourceArtifact>, GenerateError> {
    check_model(model)?;

    let mut artifacts = Vec::with_capacity(model.services().len() + 2);
    artifacts.push(SourceArtifact::new(
        format!("{MESSAGES_MODULE}.rs"),
        rust_backend::emit_messages(model),
    ));
    for service in model.services() {
        artifacts.push(SourceArtifact::new(
            format!("{}.rs", to_snake_case(service.name())),
            rust_backend::emit_service(service, model),
        ));
    }
    artifacts.push(SourceArtifact::new("mod.rs", rust_backend::emit_mod(model)));

    Ok(artifacts)
}

/// Tracks which source name produced each identifier within one scope.
struct Scope<'a> {
    name: String,
    kind: &'static str,
    seen: HashMap<String, &'a str>,
}

impl<'a> Scope<'a> {
    fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            seen: HashMap::new(),
        }
    }

    fn claim(&mut self, ident: String, source: &'a str) -> Result<(), GenerateError> {
        if let Some(first) = self.seen.get(&ident) {
            return Err(GenerateError::Collision {
                kind: self.kind,
                scope: self.name.clone(),
                first: (*first).to_string(),
                second: source.to_string(),
                ident,
            });
        }
        self.seen.insert(ident, source);
        Ok(())
    }

    fn reserved(&self, ident: String, source: &str) -> GenerateError {
        GenerateError::Reserved {
            kind: self.kind,
            scope: self.name.clone(),
            name: source.to_string(),
            ident,
        }
    }
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), GenerateError> {
    if let Some(reason) = identifier_problem(name) {
        return Err(GenerateError::InvalidIdentifier {
            kind,
            name: name.to_string(),
            reason,
        });
    }
    if naming::is_keyword(name) {
        return Err(GenerateError::InvalidIdentifier {
            kind,
            name: name.to_string(),
            reason: "is a Rust keyword",
        });
    }
    Ok(())
}

fn check_model(model: &DescriptorModel) -> Result<(), GenerateError> {
    let mut modules = Scope::new("service", "the generated module");
    for service in model.services() {
        check_identifier("service", service.name())?;
        let module = to_snake_case(service.name());
        if RESERVED_MODULES.contains(&module.as_str()) || naming::is_keyword(&module) {
            return Err(modules.reserved(module, service.name()));
        }
        modules.claim(module, service.name())?;

        let mut methods = Scope::new("method", format!("service {}", service.name()));
        for method in service.methods() {
            check_identifier("method", method.name())?;
            let ident = to_snake_case(method.name());
            let constant = to_upper_snake_case(method.name());
            if escape_ident(&ident).is_none() || RESERVED_METHODS.contains(&ident.as_str()) {
                return Err(methods.reserved(ident, method.name()));
            }
            if RESERVED_CONSTANTS.contains(&constant.as_str()) {
                return Err(methods.reserved(constant, method.name()));
            }
            methods.claim(ident, method.name())?;
        }
    }

    for message in model.messages() {
        check_identifier("message", message.name())?;

        let mut fields = Scope::new("field", format!("message {}", message.name()));
        for field in message.fields() {
            check_identifier("field", &field.name).or_else(|e| {
                // Keywords are fine for fields: they are emitted as raw identifiers.
                if naming::is_keyword(&field.name) {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
            let ident = to_snake_case(&field.name);
            if escape_ident(&ident).is_none() {
                return Err(fields.reserved(ident, &field.name));
            }
            fields.claim(ident, &field.name)?;
        }
    }

    Ok(())
}
