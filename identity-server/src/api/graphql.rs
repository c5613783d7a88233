// identity-server/src/api/graphql.rs
use actix::Addr;
use actix_web::{http::header, post, web, HttpRequest, HttpResponse};
use common::messages::{
    ConnectWalletData, GetRoleData, GraphQlRequest, GraphQlResponse, RolePayload, SessionPayload,
    SignMessageData, StatusData, StatusPayload, CONNECT_WALLET, CREATE_CLIENT, CREATE_FREELANCER,
    GET_ROLE, GET_SIGN_MESSAGE,
};
use common::models::Role;
use common::{generate_jwt_token, validate_jwt_token, Config};
use serde::Serialize;

use crate::error::ApiError;
use crate::registry::{
    Account, AccountRegistryActor, BindRole, GetAccount, IssueChallenge, RegistryError,
    TakeChallenge, UpsertAccount,
};
use crate::verify::{verify_owner, verify_signature};

fn respond<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(GraphQlResponse::data(data))
}

fn required<'a>(request: &'a GraphQlRequest, name: &str) -> Result<&'a str, ApiError> {
    request
        .variable(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::missing_variable(name))
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Account behind the request's bearer token
async fn authenticated_account(
    req: &HttpRequest,
    registry: &Addr<AccountRegistryActor>,
    config: &Config,
) -> Result<Account, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthenticated)?;

    let (user_id, wallet_address) =
        validate_jwt_token(token, config.identity_server.jwt_secret.as_bytes()).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            ApiError::Unauthenticated
        })?;

    let account = registry
        .send(GetAccount { user_id })
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if account.wallet_address != wallet_address {
        tracing::warn!("Token wallet {} does not own account {}", wallet_address, user_id);
        return Err(ApiError::Unauthenticated);
    }

    Ok(account)
}

async fn get_sign_message(
    request: &GraphQlRequest,
    registry: &Addr<AccountRegistryActor>,
) -> Result<HttpResponse, ApiError> {
    let wallet_address = required(request, "walletAddress")?.to_string();
    let message = registry.send(IssueChallenge { wallet_address }).await?;

    Ok(respond(SignMessageData {
        get_sign_message: message,
    }))
}

async fn connect_wallet(
    request: &GraphQlRequest,
    registry: &Addr<AccountRegistryActor>,
    config: &Config,
) -> Result<HttpResponse, ApiError> {
    let wallet_address = required(request, "walletAddress")?;
    let public_key = required(request, "publicKey")?;
    let signature = required(request, "signature")?;

    // A key that does not own the address must not burn that address's challenge
    if let Err(e) = verify_owner(wallet_address, public_key) {
        tracing::warn!("Login rejected for wallet {}: {}", wallet_address, e);
        return Err(e.into());
    }

    // Consumed before the signature check; a bad signature needs a new challenge
    let message = registry
        .send(TakeChallenge {
            wallet_address: wallet_address.to_string(),
        })
        .await?
        .ok_or_else(|| ApiError::Rejected("No pending sign message for this wallet".to_string()))?;

    if let Err(e) = verify_signature(public_key, &message, signature) {
        tracing::warn!("Login rejected for wallet {}: {}", wallet_address, e);
        return Err(e.into());
    }

    let account = registry
        .send(UpsertAccount {
            wallet_address: wallet_address.to_string(),
            public_key: public_key.to_string(),
        })
        .await?;

    let server = &config.identity_server;
    let token = generate_jwt_token(
        &account.user_id,
        &account.wallet_address,
        server.jwt_secret.as_bytes(),
        server.token_ttl_seconds,
    )
    .map_err(|e| ApiError::Internal(format!("JWT generation failed: {}", e)))?;

    tracing::info!("Wallet {} authenticated as {}", account.wallet_address, account.user_id);

    Ok(respond(ConnectWalletData {
        connect_wallet: SessionPayload {
            id: account.user_id.to_string(),
            wallet_address: account.wallet_address,
            token,
            created_at: account.created_at,
        },
    }))
}

async fn get_role(
    req: &HttpRequest,
    registry: &Addr<AccountRegistryActor>,
    config: &Config,
) -> Result<HttpResponse, ApiError> {
    let account = authenticated_account(req, registry, config).await?;

    Ok(respond(GetRoleData {
        get_role: RolePayload {
            code: "200".to_string(),
            message: "Role fetched".to_string(),
            role: account.role.map(|role| role.to_string()),
            success: true,
        },
    }))
}

async fn create_profile(
    req: &HttpRequest,
    registry: &Addr<AccountRegistryActor>,
    config: &Config,
    role: Role,
) -> Result<HttpResponse, ApiError> {
    let account = authenticated_account(req, registry, config).await?;

    let payload = match registry
        .send(BindRole {
            user_id: account.user_id,
            role,
        })
        .await?
    {
        Ok(_) => StatusPayload {
            code: "200".to_string(),
            message: format!("{} profile created", role),
            success: true,
        },
        Err(RegistryError::AccountNotFound) => return Err(ApiError::Unauthenticated),
        Err(e @ RegistryError::RoleAlreadyBound(_)) => StatusPayload {
            code: "409".to_string(),
            message: e.to_string(),
            success: false,
        },
    };

    let field = match role {
        Role::Client => "createClient",
        Role::Freelancer => "createFreelancer",
    };
    let mut data = StatusData::new();
    data.insert(field.to_string(), payload);
    Ok(respond(data))
}

/// Single GraphQL endpoint, dispatched on `operationName`
#[post("/graphql")]
pub async fn graphql(
    req: HttpRequest,
    body: web::Json<GraphQlRequest>,
    registry: web::Data<Addr<AccountRegistryActor>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    tracing::debug!("GraphQL operation: {}", request.operation_name);

    match request.operation_name.as_str() {
        GET_SIGN_MESSAGE => get_sign_message(&request, &registry).await,
        CONNECT_WALLET => connect_wallet(&request, &registry, &config).await,
        GET_ROLE => get_role(&req, &registry, &config).await,
        CREATE_CLIENT => create_profile(&req, &registry, &config, Role::Client).await,
        CREATE_FREELANCER => create_profile(&req, &registry, &config, Role::Freelancer).await,
        other => Err(ApiError::UnknownOperation(other.to_string())),
    }
}
