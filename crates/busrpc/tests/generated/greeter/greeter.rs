// Generated by busrpc-gen. Do not edit.

//! Service `Greeter`.

use std::sync::Arc;

/// Service name as it appears in subjects.
pub const SERVICE_NAME: &str = "Greeter";

/// Method `SayHello`.
pub const SAY_HELLO: &str = "SayHello";

/// Descriptor of service `Greeter`.
pub fn descriptor() -> ::busrpc::RpcResult<::busrpc::ServiceDescriptor> {
    Ok(::busrpc::ServiceDescriptor::builder(SERVICE_NAME)
        .method(SAY_HELLO, "HelloRequest", "HelloReply")
        .build()?)
}

/// Server contract of service `Greeter`.
#[::busrpc::async_trait]
pub trait GreeterServer: Send + Sync + 'static {
    async fn say_hello(
        &self,
        ctx: ::busrpc::CallContext,
        request: super::messages::HelloRequest,
    ) -> Result<super::messages::HelloReply, ::busrpc::ApplicationError>;
}

/// Typed client of service `Greeter`.
pub struct GreeterClient<T: ::busrpc::Transport> {
    inner: ::busrpc::Client<T>,
}

impl<T: ::busrpc::Transport> GreeterClient<T> {
    pub fn new(transport: Arc<T>, config: ::busrpc::ClientConfig) -> ::busrpc::RpcResult<Self> {
        Ok(Self {
            inner: ::busrpc::Client::new(transport, descriptor()?, config)?,
        })
    }

    pub fn inner(&self) -> &::busrpc::Client<T> {
        &self.inner
    }

    pub async fn say_hello(
        &self,
        request: &super::messages::HelloRequest,
        options: ::busrpc::CallOptions,
    ) -> ::busrpc::RpcResult<super::messages::HelloReply> {
        self.inner.call(SAY_HELLO, request, options).await
    }
}

/// Method table binding `service` to the methods of `Greeter`.
pub fn greeter_method_table<S: GreeterServer>(
    service: Arc<S>,
) -> ::busrpc::RpcResult<::busrpc::MethodTable> {
    let table = ::busrpc::MethodTable::builder(descriptor()?)
        .unary(SAY_HELLO, {
            let service = Arc::clone(&service);
            move |ctx: ::busrpc::CallContext, request: super::messages::HelloRequest| {
                let service = Arc::clone(&service);
                async move { service.say_hello(ctx, request).await }
            }
        })
        .build()?;
    Ok(table)
}

/// Dispatcher serving `service` as `Greeter` on `transport`.
pub fn greeter_dispatcher<T: ::busrpc::Transport, S: GreeterServer>(
    transport: Arc<T>,
    service: Arc<S>,
    config: ::busrpc::DispatcherConfig,
) -> ::busrpc::RpcResult<::busrpc::Dispatcher<T>> {
    ::busrpc::Dispatcher::new(transport, greeter_method_table(service)?, config)
}
