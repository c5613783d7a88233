// identity-server/src/utils/token.rs
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Random alphanumeric string of `length` characters
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a nonce with timestamp and random component
pub fn generate_nonce() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let random_part = generate_secure_token(16);
    format!("{}-{}", timestamp, random_part)
}

/// Text the wallet is asked to sign for a login
pub fn challenge_message(wallet_address: &str, nonce: &str) -> String {
    format!("Login to DecentWork\nAddress: {}\nNonce: {}", wallet_address, nonce)
}
