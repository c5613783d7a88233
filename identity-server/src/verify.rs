// identity-server/src/verify.rs
//! Checks a login signature against the wallet's own public key.

use common::wallet_address_from_owner;
use rsa::pss::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

pub const PSS_SALT_LENGTH: usize = 32;

// Arweave keys always use F4
const PUBLIC_EXPONENT: u32 = 65537;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Public key is not a valid RSA owner key")]
    InvalidPublicKey,

    #[error("Wallet address does not match public key")]
    AddressMismatch,

    #[error("Signature is not valid base64")]
    MalformedSignature,

    #[error("Invalid signature")]
    BadSignature,
}

/// `public_key` is the base64url modulus; `signature_b64` is standard base64
pub fn verify_login(
    wallet_address: &str,
    public_key: &str,
    message: &str,
    signature_b64: &str,
) -> Result<(), VerifyError> {
    verify_owner(wallet_address, public_key)?;
    verify_signature(public_key, message, signature_b64)
}

/// The address must be the hash of the presented owner key
pub fn verify_owner(wallet_address: &str, public_key: &str) -> Result<(), VerifyError> {
    let derived = wallet_address_from_owner(public_key).ok_or(VerifyError::InvalidPublicKey)?;
    if derived != wallet_address {
        return Err(VerifyError::AddressMismatch);
    }
    Ok(())
}

pub fn verify_signature(public_key: &str, message: &str, signature_b64: &str) -> Result<(), VerifyError> {
    let modulus = base64::decode_config(public_key, base64::URL_SAFE_NO_PAD)
        .map_err(|_| VerifyError::InvalidPublicKey)?;
    let key = RsaPublicKey::new(BigUint::from_bytes_be(&modulus), BigUint::from(PUBLIC_EXPONENT))
        .map_err(|_| VerifyError::InvalidPublicKey)?;

    let bytes = base64::decode(signature_b64).map_err(|_| VerifyError::MalformedSignature)?;
    let signature = Signature::try_from(bytes.as_slice()).map_err(|_| VerifyError::MalformedSignature)?;

    VerifyingKey::<Sha256>::new_with_salt_len(key, PSS_SALT_LENGTH)
        .verify(message.as_bytes(), &signature)
        .map_err(|_| VerifyError::BadSignature)
}
