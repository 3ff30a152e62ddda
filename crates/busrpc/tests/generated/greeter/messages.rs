// Generated by busrpc-gen. Do not edit.

//! Message types.

#[derive(Debug, Clone, PartialEq, Default, ::busrpc::serde::Serialize, ::busrpc::serde::Deserialize)]
#[serde(crate = "::busrpc::serde")]
pub struct HelloRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, ::busrpc::serde::Serialize, ::busrpc::serde::Deserialize)]
#[serde(crate = "::busrpc::serde")]
pub struct HelloReply {
    pub message: String,
}
