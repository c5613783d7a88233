// wallet-client/src/identity.rs
//! Identity service contract and its GraphQL-over-HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::messages::{
    ConnectWalletData, GetRoleData, GraphQlRequest, GraphQlResponse, SignMessageData, StatusData,
    CONNECT_WALLET, CONNECT_WALLET_MUTATION, CREATE_CLIENT, CREATE_CLIENT_MUTATION,
    CREATE_FREELANCER, CREATE_FREELANCER_MUTATION, GET_ROLE, GET_ROLE_QUERY, GET_SIGN_MESSAGE,
    GET_SIGN_MESSAGE_QUERY, UNAUTHENTICATED,
};
use common::models::Role;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::error::ServiceError;

/// Session returned by a successful signed-challenge submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub user_id: String,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}

/// Operations the client consumes from the identity service
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fresh challenge message for `address`. The content is the server's.
    async fn challenge_message(&self, address: &str) -> Result<String, ServiceError>;

    async fn submit_signed_challenge(
        &self,
        address: &str,
        public_key: &str,
        signature_b64: &str,
    ) -> Result<IssuedSession, ServiceError>;

    /// Role bound to the session behind `token`, `None` if there is none yet
    async fn bound_role(&self, token: &str) -> Result<Option<Role>, ServiceError>;

    /// Create the profile for `role`, binding it to the account
    async fn bind_role(&self, token: &str, role: Role) -> Result<(), ServiceError>;
}

/// Talks to a single GraphQL endpoint with JSON `{query, operationName, variables}`
pub struct GraphQlIdentityClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphQlIdentityClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: GraphQlRequest,
        token: Option<&str>,
    ) -> Result<T, ServiceError> {
        tracing::debug!("Sending {} to {}", request.operation_name, self.endpoint);

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Unauthorized);
        }

        let body = response.text().await?;

        let envelope: GraphQlResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(ServiceError::Malformed(e.to_string())),
            Err(_) => {
                return Err(ServiceError::Rejected(format!(
                    "identity service returned {}",
                    status
                )))
            }
        };

        if let Some(error) = envelope.errors.first() {
            if error.code() == Some(UNAUTHENTICATED) {
                return Err(ServiceError::Unauthorized);
            }
            return Err(ServiceError::Rejected(error.message.clone()));
        }

        if !status.is_success() {
            return Err(ServiceError::Rejected(format!(
                "identity service returned {}",
                status
            )));
        }

        envelope
            .data
            .ok_or_else(|| ServiceError::Malformed("response carried neither data nor errors".to_string()))
    }
}

#[async_trait]
impl IdentityService for GraphQlIdentityClient {
    async fn challenge_message(&self, address: &str) -> Result<String, ServiceError> {
        let request = GraphQlRequest::new(
            GET_SIGN_MESSAGE,
            GET_SIGN_MESSAGE_QUERY,
            json!({ "walletAddress": address }),
        );
        let data: SignMessageData = self.execute(request, None).await?;
        if data.get_sign_message.is_empty() {
            return Err(ServiceError::Malformed("empty challenge message".to_string()));
        }
        Ok(data.get_sign_message)
    }

    async fn submit_signed_challenge(
        &self,
        address: &str,
        public_key: &str,
        signature_b64: &str,
    ) -> Result<IssuedSession, ServiceError> {
        let request = GraphQlRequest::new(
            CONNECT_WALLET,
            CONNECT_WALLET_MUTATION,
            json!({
                "walletAddress": address,
                "publicKey": public_key,
                "signature": signature_b64,
            }),
        );
        let data: ConnectWalletData = self.execute(request, None).await?;
        let session = data.connect_wallet;
        if session.token.is_empty() {
            return Err(ServiceError::Malformed("session without token".to_string()));
        }
        Ok(IssuedSession {
            token: session.token,
            user_id: session.id,
            wallet_address: session.wallet_address,
            created_at: session.created_at,
        })
    }

    async fn bound_role(&self, token: &str) -> Result<Option<Role>, ServiceError> {
        let request = GraphQlRequest::new(GET_ROLE, GET_ROLE_QUERY, json!({}));
        let data: GetRoleData = self.execute(request, Some(token)).await?;
        let payload = data.get_role;

        if !payload.success {
            return Err(ServiceError::Rejected(payload.message));
        }

        match payload.role.as_deref() {
            None | Some("") => Ok(None),
            Some(role) => role
                .parse::<Role>()
                .map(Some)
                .map_err(|e| ServiceError::Malformed(e.to_string())),
        }
    }

    async fn bind_role(&self, token: &str, role: Role) -> Result<(), ServiceError> {
        let request = match role {
            Role::Client => GraphQlRequest::new(CREATE_CLIENT, CREATE_CLIENT_MUTATION, json!({})),
            Role::Freelancer => {
                GraphQlRequest::new(CREATE_FREELANCER, CREATE_FREELANCER_MUTATION, json!({}))
            }
        };
        let data: StatusData = self.execute(request, Some(token)).await?;
        let status = data
            .into_values()
            .next()
            .ok_or_else(|| ServiceError::Malformed("empty mutation result".to_string()))?;

        if !status.success {
            return Err(ServiceError::Rejected(status.message));
        }
        tracing::info!("Bound role {} to account", role);
        Ok(())
    }
}
