// Generated by busrpc-gen. Do not edit.

//! Service `Catalog`.

use std::sync::Arc;

/// Service name as it appears in subjects.
pub const SERVICE_NAME: &str = "Catalog";

/// Method `Lookup`.
pub const LOOKUP: &str = "Lookup";

/// Method `Describe`.
pub const DESCRIBE: &str = "Describe";

/// Descriptor of service `Catalog`.
pub fn descriptor() -> ::busrpc::RpcResult<::busrpc::ServiceDescriptor> {
    Ok(::busrpc::ServiceDescriptor::builder(SERVICE_NAME)
        .method(LOOKUP, "Query", "Node")
        .method(DESCRIBE, "Query", "std::string::String")
        .build()?)
}

/// Server contract of service `Catalog`.
#[::busrpc::async_trait]
pub trait CatalogServer: Send + Sync + 'static {
    async fn lookup(
        &self,
        ctx: ::busrpc::CallContext,
        request: super::messages::Query,
    ) -> Result<super::messages::Node, ::busrpc::ApplicationError>;

    async fn describe(
        &self,
        ctx: ::busrpc::CallContext,
        request: super::messages::Query,
    ) -> Result<std::string::String, ::busrpc::ApplicationError>;
}

/// Typed client of service `Catalog`.
pub struct CatalogClient<T: ::busrpc::Transport> {
    inner: ::busrpc::Client<T>,
}

impl<T: ::busrpc::Transport> CatalogClient<T> {
    pub fn new(transport: Arc<T>, config: ::busrpc::ClientConfig) -> ::busrpc::RpcResult<Self> {
        Ok(Self {
            inner: ::busrpc::Client::new(transport, descriptor()?, config)?,
        })
    }

    pub fn inner(&self) -> &::busrpc::Client<T> {
        &self.inner
    }

    pub async fn lookup(
        &self,
        request: &super::messages::Query,
        options: ::busrpc::CallOptions,
    ) -> ::busrpc::RpcResult<super::messages::Node> {
        self.inner.call(LOOKUP, request, options).await
    }

    pub async fn describe(
        &self,
        request: &super::messages::Query,
        options: ::busrpc::CallOptions,
    ) -> ::busrpc::RpcResult<std::string::String> {
        self.inner.call(DESCRIBE, request, options).await
    }
}

/// Method table binding `service` to the methods of `Catalog`.
pub fn catalog_method_table<S: CatalogServer>(
    service: Arc<S>,
) -> ::busrpc::RpcResult<::busrpc::MethodTable> {
    let table = ::busrpc::MethodTable::builder(descriptor()?)
        .unary(LOOKUP, {
            let service = Arc::clone(&service);
            move |ctx: ::busrpc::CallContext, request: super::messages::Query| {
                let service = Arc::clone(&service);
                async move { service.lookup(ctx, request).await }
            }
        })
        .unary(DESCRIBE, {
            let service = Arc::clone(&service);
            move |ctx: ::busrpc::CallContext, request: super::messages::Query| {
                let service = Arc::clone(&service);
                async move { service.describe(ctx, request).await }
            }
        })
        .build()?;
    Ok(table)
}

/// Dispatcher serving `service` as `Catalog` on `transport`.
pub fn catalog_dispatcher<T: ::busrpc::Transport, S: CatalogServer>(
    transport: Arc<T>,
    service: Arc<S>,
    config: ::busrpc::DispatcherConfig,
) -> ::busrpc::RpcResult<::busrpc::Dispatcher<T>> {
    ::busrpc::Dispatcher::new(transport, catalog_method_table(service)?, config)
}
