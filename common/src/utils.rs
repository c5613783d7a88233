// Common Crate - utils.rs
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use serde::{Serialize, Deserialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use std::time::{SystemTime, UNIX_EPOCH};

/// Setup tracing for consistent logging across binaries.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so the
/// CLI can keep stdout for results.
pub fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,       // user_id
    pub wallet: String,    // wallet_address
    pub exp: usize,        // expiration time
    pub iat: usize,        // issued at time
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

// Generate JWT token from user_id and wallet_address
pub fn generate_jwt_token(
    user_id: &Uuid,
    wallet_address: &str,
    secret: &[u8],
    ttl_seconds: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();

    let claims = JwtClaims {
        sub: user_id.to_string(),
        wallet: wallet_address.to_string(),
        iat: now,
        exp: now + ttl_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret)
    )
}

// Validate JWT token and extract user_id and wallet_address
pub fn validate_jwt_token(token: &str, secret: &[u8]) -> Result<(Uuid, String), jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    let uuid = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidSubject)?;

    Ok((uuid, token_data.claims.wallet))
}

/// Wallet address for an RSA owner key: base64url(sha256(modulus)).
///
/// `owner` is the base64url-encoded modulus, as handed out by the wallet's
/// public-key accessor. Returns `None` if it does not decode.
pub fn wallet_address_from_owner(owner: &str) -> Option<String> {
    let modulus = base64::decode_config(owner, base64::URL_SAFE_NO_PAD).ok()?;
    if modulus.is_empty() {
        return None;
    }
    let digest = Sha256::digest(&modulus);
    Some(base64::encode_config(digest, base64::URL_SAFE_NO_PAD))
}
