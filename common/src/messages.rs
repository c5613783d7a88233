// Common Crate - messages.rs
// GraphQL-over-HTTP messages exchanged with the identity service
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use chrono::{DateTime, Utc};
use crate::models::session::flexible_timestamp;

/// Operation names, used by the server to dispatch
pub const GET_SIGN_MESSAGE: &str = "GetSignMessage";
pub const CONNECT_WALLET: &str = "ConnectWallet";
pub const GET_ROLE: &str = "GetRole";
pub const CREATE_CLIENT: &str = "CreateClient";
pub const CREATE_FREELANCER: &str = "CreateFreelancer";

/// Error code attached to authorization rejections
pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";

pub const GET_SIGN_MESSAGE_QUERY: &str = r#"query GetSignMessage($walletAddress: String!) {
  getSignMessage(walletAddress: $walletAddress)
}"#;

pub const CONNECT_WALLET_MUTATION: &str = r#"mutation ConnectWallet($walletAddress: String!, $publicKey: String!, $signature: String!) {
  connectWallet(walletAddress: $walletAddress, publicKey: $publicKey, signature: $signature) {
    _id
    walletAddress
    token
    createdAt
  }
}"#;

pub const GET_ROLE_QUERY: &str = r#"query GetRole {
  getRole {
    code
    message
    role
    success
  }
}"#;

pub const CREATE_CLIENT_MUTATION: &str = r#"mutation CreateClient {
  createClient {
    code
    message
    success
  }
}"#;

pub const CREATE_FREELANCER_MUTATION: &str = r#"mutation CreateFreelancer {
  createFreelancer {
    code
    message
    success
  }
}"#;

/// Request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    pub operation_name: String,
    #[serde(default)]
    pub variables: serde_json::Value,
}

impl GraphQlRequest {
    pub fn new(operation_name: &str, query: &str, variables: serde_json::Value) -> Self {
        Self {
            query: query.to_string(),
            operation_name: operation_name.to_string(),
            variables,
        }
    }

    /// String variable lookup
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).and_then(serde_json::Value::as_str)
    }
}

/// Response envelope: `data` on success, `errors` otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

impl GraphQlResponse<serde_json::Value> {
    pub fn error(message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            data: None,
            errors: vec![GraphQlError {
                message: message.into(),
                extensions: code.map(|code| ErrorExtensions {
                    code: code.to_string(),
                }),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ErrorExtensions>,
}

impl GraphQlError {
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().map(|ext| ext.code.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorExtensions {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageData {
    pub get_sign_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletData {
    pub connect_wallet: SessionPayload,
}

/// Session document returned by `connectWallet`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[serde(rename = "_id")]
    pub id: String,
    pub wallet_address: String,
    pub token: String,
    #[serde(with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRoleData {
    pub get_role: RolePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    pub code: String,
    pub message: String,
    pub role: Option<String>,
    pub success: bool,
}

/// Status document returned by the profile mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub code: String,
    pub message: String,
    pub success: bool,
}

/// Profile mutations answer under their own field name
pub type StatusData = HashMap<String, StatusPayload>;
