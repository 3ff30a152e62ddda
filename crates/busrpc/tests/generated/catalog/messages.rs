// Generated by busrpc-gen. Do not edit.

//! Message types.

#[derive(Debug, Clone, PartialEq, Default, ::busrpc::serde::Serialize, ::busrpc::serde::Deserialize)]
#[serde(crate = "::busrpc::serde")]
pub struct Query {
    pub r#type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, ::busrpc::serde::Serialize, ::busrpc::serde::Deserialize)]
#[serde(crate = "::busrpc::serde")]
pub struct Node {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<Node>>,
    #[serde(default)]
    pub children: Vec<Node>,
}
