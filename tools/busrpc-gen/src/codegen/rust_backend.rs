// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::codegen::naming::{escape_ident, to_snake_case, to_upper_snake_case};
use crate::codegen::MESSAGES_MODULE;
use busrpc::{
    DescriptorModel, FieldDescriptor, FieldKind, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor,
};
use std::collections::{HashMap, HashSet};

const HEADER: &str = "// Generated by busrpc-gen. Do not edit.\n";

/// Emit `mod.rs`.
pub fn emit_mod(model: &DescriptorModel) -> String {
    let mut out = String::from(HEADER);
    out.push_str(&format!(
        "\n//! Bindings for namespace `{ns}`.\n\n/// Namespace the interface was declared in.\npub const NAMESPACE: &str = \"{ns}\";\n\npub mod {MESSAGES_MODULE};\n",
        ns = model.namespace()
    ));
    for service in model.services() {
        out.push_str(&format!("pub mod {};\n", to_snake_case(service.name())));
    }
    out
}

/// Emit `messages.rs` with one serde struct per declared message.
pub fn emit_messages(model: &DescriptorModel) -> String {
    let layout = Layout::new(model);
    let mut out = String::from(HEADER);
    out.push_str("\n//! Message types.\n");

    for message in model.messages() {
        out.push('\n');
        out.push_str(&render_message(message, &layout));
    }
    out
}

/// Emit the bindings of one service.
pub fn emit_service(service: &ServiceDescriptor, model: &DescriptorModel) -> String {
    let name = service.name();
    let module = to_snake_case(name);
    let methods = service.methods();

    let mut out = String::from(HEADER);
    out.push_str(&format!(
        "\n//! Service `{name}`.\n\nuse std::sync::Arc;\n\n/// Service name as it appears in subjects.\npub const SERVICE_NAME: &str = \"{name}\";\n"
    ));

    for method in methods {
        out.push_str(&format!(
            "\n/// Method `{m}`.\npub const {c}: &str = \"{m}\";\n",
            m = method.name(),
            c = to_upper_snake_case(method.name())
        ));
    }

    // Descriptor constructor
    out.push_str(&format!(
        "\n/// Descriptor of service `{name}`.\npub fn descriptor() -> ::busrpc::RpcResult<::busrpc::ServiceDescriptor> {{\n    Ok(::busrpc::ServiceDescriptor::builder(SERVICE_NAME)\n"
    ));
    for method in methods {
        out.push_str(&format!(
            "        .method({}, {:?}, {:?})\n",
            to_upper_snake_case(method.name()),
            method.request_type(),
            method.response_type()
        ));
    }
    out.push_str("        .build()?)\n}\n");

    // Server contract
    out.push_str(&format!(
        "\n/// Server contract of service `{name}`.\n#[::busrpc::async_trait]\npub trait {name}Server: Send + Sync + 'static {{\n"
    ));
    for (i, method) in methods.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "    async fn {ident}(\n        &self,\n        ctx: ::busrpc::CallContext,\n        request: {req},\n    ) -> Result<{resp}, ::busrpc::ApplicationError>;\n",
            ident = method_ident(method),
            req = type_path(method.request_type(), model),
            resp = type_path(method.response_type(), model)
        ));
    }
    out.push_str("}\n");

    // Client
    out.push_str(&format!(
        "\n/// Typed client of service `{name}`.\npub struct {name}Client<T: ::busrpc::Transport> {{\n    inner: ::busrpc::Client<T>,\n}}\n\nimpl<T: ::busrpc::Transport> {name}Client<T> {{\n    pub fn new(transport: Arc<T>, config: ::busrpc::ClientConfig) -> ::busrpc::RpcResult<Self> {{\n        Ok(Self {{\n            inner: ::busrpc::Client::new(transport, descriptor()?, config)?,\n        }})\n    }}\n\n    pub fn inner(&self) -> &::busrpc::Client<T> {{\n        &self.inner\n    }}\n"
    ));
    for method in methods {
        out.push_str(&format!(
            "\n    pub async fn {ident}(\n        &self,\n        request: &{req},\n        options: ::busrpc::CallOptions,\n    ) -> ::busrpc::RpcResult<{resp}> {{\n        self.inner.call({c}, request, options).await\n    }}\n",
            ident = method_ident(method),
            req = type_path(method.request_type(), model),
            resp = type_path(method.response_type(), model),
            c = to_upper_snake_case(method.name())
        ));
    }
    out.push_str("}\n");

    // Method table
    let service_param = if methods.is_empty() { "_service" } else { "service" };
    out.push_str(&format!(
        "\n/// Method table binding `service` to the methods of `{name}`.\npub fn {module}_method_table<S: {name}Server>(\n    {service_param}: Arc<S>,\n) -> ::busrpc::RpcResult<::busrpc::MethodTable> {{\n    let table = ::busrpc::MethodTable::builder(descriptor()?)\n"
    ));
    for method in methods {
        out.push_str(&format!(
            "        .unary({c}, {{\n            let service = Arc::clone(&service);\n            move |ctx: ::busrpc::CallContext, request: {req}| {{\n                let service = Arc::clone(&service);\n                async move {{ service.{ident}(ctx, request).await }}\n            }}\n        }})\n",
            c = to_upper_snake_case(method.name()),
            req = type_path(method.request_type(), model),
            ident = method_ident(method)
        ));
    }
    out.push_str("        .build()?;\n    Ok(table)\n}\n");

    // Dispatcher constructor
    out.push_str(&format!(
        "\n/// Dispatcher serving `service` as `{name}` on `transport`.\npub fn {module}_dispatcher<T: ::busrpc::Transport, S: {name}Server>(\n    transport: Arc<T>,\n    service: Arc<S>,\n    config: ::busrpc::DispatcherConfig,\n) -> ::busrpc::RpcResult<::busrpc::Dispatcher<T>> {{\n    ::busrpc::Dispatcher::new(transport, {module}_method_table(service)?, config)\n}}\n"
    ));

    out
}

fn method_ident(method: &MethodDescriptor) -> String {
    let snake = to_snake_case(method.name());
    escape_ident(&snake).unwrap_or(snake)
}

/// Declared messages live in the messages module; anything else is an
/// external path used verbatim.
fn type_path(type_name: &str, model: &DescriptorModel) -> String {
    if model.message(type_name).is_some() {
        format!("super::{MESSAGES_MODULE}::{type_name}")
    } else {
        type_name.to_string()
    }
}

/// Per-message facts that depend on the whole model.
struct Layout<'a> {
    /// (message, field) pairs that need a `Box` to break a cycle
    boxed: HashSet<(&'a str, &'a str)>,
    /// Messages whose every field has a usable `Default`
    defaults: HashSet<&'a str>,
}

impl<'a> Layout<'a> {
    fn new(model: &'a DescriptorModel) -> Self {
        let messages: HashMap<&str, &MessageDescriptor> =
            model.messages().iter().map(|m| (m.name(), m)).collect();

        let mut boxed = HashSet::new();
        for message in model.messages() {
            for field in message.fields() {
                if let Some(target) = inline_target(field, &messages) {
                    if reaches(target, message.name(), &messages) {
                        boxed.insert((message.name(), field.name.as_str()));
                    }
                }
            }
        }

        // Fixpoint: a message is defaultable once all its inline targets are.
        let mut defaults: HashSet<&str> = HashSet::new();
        loop {
            let before = defaults.len();
            for message in model.messages() {
                if defaults.contains(message.name()) {
                    continue;
                }
                let ok = message.fields().iter().all(|field| {
                    if field.repeated || field.optional {
                        return true;
                    }
                    match &field.kind {
                        FieldKind::Message(target) => {
                            !boxed.contains(&(message.name(), field.name.as_str()))
                                && defaults.contains(target.as_str())
                        }
                        _ => true,
                    }
                });
                if ok {
                    defaults.insert(message.name());
                }
            }
            if defaults.len() == before {
                break;
            }
        }

        Self { boxed, defaults }
    }
}

/// Declared message stored inline (not behind a `Vec`) by `field`.
fn inline_target<'a>(
    field: &FieldDescriptor,
    messages: &HashMap<&'a str, &'a MessageDescriptor>,
) -> Option<&'a str> {
    match &field.kind {
        FieldKind::Message(target) if !field.repeated => {
            messages.get_key_value(target.as_str()).map(|(k, _)| *k)
        }
        _ => None,
    }
}

/// Whether `to` is reachable from `from` through inline message fields.
fn reaches(from: &str, to: &str, messages: &HashMap<&str, &MessageDescriptor>) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(name) = stack.pop() {
        if name == to {
            return true;
        }
        if !visited.insert(name) {
            continue;
        }
        if let Some(message) = messages.get(name) {
            stack.extend(message.fields().iter().filter_map(|f| inline_target(f, messages)));
        }
    }
    false
}

fn render_message(message: &MessageDescriptor, layout: &Layout<'_>) -> String {
    let default = if layout.defaults.contains(message.name()) {
        " Default,"
    } else {
        ""
    };

    let mut out = format!(
        "#[derive(Debug, Clone, PartialEq,{default} ::busrpc::serde::Serialize, ::busrpc::serde::Deserialize)]\n#[serde(crate = \"::busrpc::serde\")]\npub struct {} {{\n",
        message.name()
    );
    for field in message.fields() {
        let boxed = layout
            .boxed
            .contains(&(message.name(), field.name.as_str()));
        out.push_str(&render_field(field, boxed));
    }
    out.push_str("}\n");
    out
}

fn render_field(field: &FieldDescriptor, boxed: bool) -> String {
    let snake = to_snake_case(&field.name);
    let ident = escape_ident(&snake).unwrap_or_else(|| snake.clone());

    let mut rust_type = scalar_type(&field.kind);
    if boxed {
        rust_type = format!("Box<{rust_type}>");
    }

    let mut serde_args = Vec::new();
    if snake != field.name {
        serde_args.push(format!("rename = {:?}", field.name));
    }
    if field.repeated {
        rust_type = format!("Vec<{rust_type}>");
        serde_args.push("default".to_string());
    } else if field.optional {
        rust_type = format!("Option<{rust_type}>");
        serde_args.push("default".to_string());
        serde_args.push("skip_serializing_if = \"Option::is_none\"".to_string());
    }

    let mut out = String::new();
    if !serde_args.is_empty() {
        out.push_str(&format!("    #[serde({})]\n", serde_args.join(", ")));
    }
    out.push_str(&format!("    pub {ident}: {rust_type},\n"));
    out
}

fn scalar_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Bool => "bool".to_string(),
        FieldKind::I32 => "i32".to_string(),
        FieldKind::I64 => "i64".to_string(),
        FieldKind::U32 => "u32".to_string(),
        FieldKind::U64 => "u64".to_string(),
        FieldKind::F32 => "f32".to_string(),
        FieldKind::F64 => "f64".to_string(),
        FieldKind::String => "String".to_string(),
        FieldKind::Bytes => "Vec<u8>".to_string(),
        FieldKind::Message(path) => path.clone(),
    }
}
