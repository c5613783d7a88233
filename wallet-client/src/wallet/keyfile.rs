// wallet-client/src/wallet/keyfile.rs
//! Software wallet backed by an RSA key in Arweave JWK form.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::Path;
use std::sync::Arc;

use super::{Permission, SignatureScheme, WalletExtension};
use crate::error::WalletError;

/// What the user is being asked to allow
#[derive(Debug)]
pub enum ConsentRequest<'a> {
    Connect { permissions: &'a [Permission] },
    Sign { payload: &'a [u8] },
}

/// Stand-in for the extension's consent dialog
pub trait ConsentPrompt: Send + Sync {
    fn approve(&self, request: &ConsentRequest<'_>) -> bool;
}

/// Approves everything; for scripted use and tests
pub struct AutoApprove;

impl ConsentPrompt for AutoApprove {
    fn approve(&self, _request: &ConsentRequest<'_>) -> bool {
        true
    }
}

/// RSA JSON Web Key as written by Arweave wallets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub n: String,
    pub e: String,
    pub d: String,
    pub p: String,
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

fn decode_component(name: &str, value: &str) -> Result<BigUint, WalletError> {
    base64::decode_config(value, base64::URL_SAFE_NO_PAD)
        .map(|bytes| BigUint::from_bytes_be(&bytes))
        .map_err(|e| WalletError::Extension(format!("invalid JWK component {}: {}", name, e)))
}

fn encode_component(value: &BigUint) -> String {
    base64::encode_config(value.to_bytes_be(), base64::URL_SAFE_NO_PAD)
}

pub struct KeyfileWallet {
    key: RsaPrivateKey,
    owner: String,
    address: String,
    prompt: Arc<dyn ConsentPrompt>,
}

impl KeyfileWallet {
    fn from_key(key: RsaPrivateKey, prompt: Arc<dyn ConsentPrompt>) -> Result<Self, WalletError> {
        let owner = encode_component(key.n());
        let address = common::wallet_address_from_owner(&owner)
            .ok_or_else(|| WalletError::Extension("key has an empty modulus".to_string()))?;
        Ok(Self {
            key,
            owner,
            address,
            prompt,
        })
    }

    pub fn generate(bits: usize, prompt: Arc<dyn ConsentPrompt>) -> Result<Self, WalletError> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| WalletError::Extension(format!("key generation failed: {}", e)))?;
        Self::from_key(key, prompt)
    }

    pub fn from_jwk(jwk: &Jwk, prompt: Arc<dyn ConsentPrompt>) -> Result<Self, WalletError> {
        if jwk.kty != "RSA" {
            return Err(WalletError::Extension(format!("unsupported key type: {}", jwk.kty)));
        }

        let mut key = RsaPrivateKey::from_components(
            decode_component("n", &jwk.n)?,
            decode_component("e", &jwk.e)?,
            decode_component("d", &jwk.d)?,
            vec![decode_component("p", &jwk.p)?, decode_component("q", &jwk.q)?],
        )
        .map_err(|e| WalletError::Extension(format!("invalid RSA key: {}", e)))?;

        key.precompute()
            .map_err(|e| WalletError::Extension(format!("invalid RSA key: {}", e)))?;

        Self::from_key(key, prompt)
    }

    pub fn load(path: &Path, prompt: Arc<dyn ConsentPrompt>) -> Result<Self, WalletError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Extension(format!("cannot read {}: {}", path.display(), e)))?;
        let jwk: Jwk = serde_json::from_str(&raw)
            .map_err(|e| WalletError::Extension(format!("{} is not a JWK keyfile: {}", path.display(), e)))?;
        let wallet = Self::from_jwk(&jwk, prompt)?;
        tracing::info!("Loaded wallet keyfile {} ({})", path.display(), wallet.address);
        Ok(wallet)
    }

    pub fn to_jwk(&self) -> Jwk {
        let primes = self.key.primes();
        Jwk {
            kty: "RSA".to_string(),
            n: self.owner.clone(),
            e: encode_component(self.key.e()),
            d: encode_component(self.key.d()),
            p: primes.first().map(encode_component).unwrap_or_default(),
            q: primes.get(1).map(encode_component).unwrap_or_default(),
            dp: self.key.dp().map(encode_component),
            dq: self.key.dq().map(encode_component),
            qi: self.key.crt_coefficient().as_ref().map(encode_component),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(&self.to_jwk())
            .map_err(|e| WalletError::Extension(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| WalletError::Extension(format!("cannot write {}: {}", path.display(), e)))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// base64url modulus, the Arweave "owner" field
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

#[async_trait]
impl WalletExtension for KeyfileWallet {
    async fn connect(&self, permissions: &[Permission]) -> Result<(), WalletError> {
        if !self.prompt.approve(&ConsentRequest::Connect { permissions }) {
            tracing::info!("Wallet connection declined");
            return Err(WalletError::UserRejected);
        }
        Ok(())
    }

    async fn active_address(&self) -> Result<String, WalletError> {
        Ok(self.address.clone())
    }

    async fn active_public_key(&self) -> Result<String, WalletError> {
        Ok(self.owner.clone())
    }

    async fn signature(&self, data: &[u8], scheme: &SignatureScheme) -> Result<Vec<u8>, WalletError> {
        if scheme.name != SignatureScheme::RSA_PSS {
            return Err(WalletError::Signing(format!("unsupported signature scheme: {}", scheme.name)));
        }
        if !self.prompt.approve(&ConsentRequest::Sign { payload: data }) {
            tracing::info!("Signature request declined");
            return Err(WalletError::UserRejected);
        }

        let signer = SigningKey::<Sha256>::new_with_salt_len(self.key.clone(), scheme.salt_length);
        let signature = signer.sign_with_rng(&mut OsRng, data);
        Ok(signature.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pss::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    struct Deny;

    impl ConsentPrompt for Deny {
        fn approve(&self, _request: &ConsentRequest<'_>) -> bool {
            false
        }
    }

    fn test_wallet() -> KeyfileWallet {
        KeyfileWallet::generate(1024, Arc::new(AutoApprove)).unwrap()
    }

    #[tokio::test]
    async fn test_signature_verifies_as_rsa_pss_salt_32() {
        let wallet = test_wallet();
        let sig = wallet
            .signature(b"Login to DecentWork", &SignatureScheme::rsa_pss(32))
            .await
            .unwrap();

        let verifier = VerifyingKey::<Sha256>::new_with_salt_len(wallet.key.to_public_key(), 32);
        let sig = Signature::try_from(sig.as_slice()).unwrap();
        assert!(verifier.verify(b"Login to DecentWork", &sig).is_ok());
        assert!(verifier.verify(b"something else", &sig).is_err());
    }

    #[tokio::test]
    async fn test_address_derives_from_owner() {
        let wallet = test_wallet();
        let owner = wallet.active_public_key().await.unwrap();
        assert_eq!(
            common::wallet_address_from_owner(&owner).as_deref(),
            Some(wallet.address())
        );
    }

    #[test]
    fn test_jwk_roundtrip_keeps_identity() {
        let wallet = test_wallet();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        wallet.save(&path).unwrap();

        let loaded = KeyfileWallet::load(&path, Arc::new(AutoApprove)).unwrap();
        assert_eq!(loaded.address(), wallet.address());
        assert_eq!(loaded.owner(), wallet.owner());
    }

    #[tokio::test]
    async fn test_declined_prompt_is_user_rejection() {
        let wallet = KeyfileWallet::generate(1024, Arc::new(Deny)).unwrap();
        assert!(matches!(
            wallet.connect(&[Permission::AccessAddress]).await,
            Err(WalletError::UserRejected)
        ));
        assert!(matches!(
            wallet.signature(b"x", &SignatureScheme::rsa_pss(32)).await,
            Err(WalletError::UserRejected)
        ));
    }

    #[tokio::test]
    async fn test_other_schemes_are_refused() {
        let wallet = test_wallet();
        let scheme = SignatureScheme {
            name: "RSASSA-PKCS1-v1_5".to_string(),
            salt_length: 0,
        };
        assert!(matches!(
            wallet.signature(b"x", &scheme).await,
            Err(WalletError::Signing(_))
        ));
    }

    #[test]
    fn test_exported_jwk_carries_crt_parameters() {
        let wallet = test_wallet();
        let jwk = wallet.to_jwk();
        let (p, q) = (&wallet.key.primes()[0], &wallet.key.primes()[1]);

        let qi = decode_component("qi", jwk.qi.as_deref().unwrap()).unwrap();
        assert_eq!((&qi * q) % p, BigUint::from(1u32));
        assert!(jwk.dp.is_some());
        assert!(jwk.dq.is_some());
    }

    #[test]
    fn test_non_rsa_keyfile_is_rejected() {
        let mut jwk = test_wallet().to_jwk();
        jwk.kty = "EC".to_string();
        assert!(KeyfileWallet::from_jwk(&jwk, Arc::new(AutoApprove)).is_err());
    }
}
