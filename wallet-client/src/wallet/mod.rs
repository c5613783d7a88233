// wallet-client/src/wallet/mod.rs
//! Capability wrapper around a host-provided signing wallet.
//!
//! The protocol code only sees [`WalletAdapter`]. Anything that can connect,
//! report an address and public key, and produce RSA-PSS signatures can sit
//! behind [`WalletExtension`]: a browser extension bridge, a hardware key, or
//! the software [`keyfile::KeyfileWallet`].

pub mod keyfile;

use async_trait::async_trait;
use common::models::{Signature, WalletIdentity};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::WalletError;

pub use keyfile::{AutoApprove, ConsentPrompt, ConsentRequest, KeyfileWallet};

/// Capability tags requested on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AccessAddress,
    Signature,
    AccessPublicKey,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AccessAddress => "ACCESS_ADDRESS",
            Permission::Signature => "SIGNATURE",
            Permission::AccessPublicKey => "ACCESS_PUBLIC_KEY",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature algorithm parameters handed to the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureScheme {
    pub name: String,
    pub salt_length: usize,
}

impl SignatureScheme {
    pub const RSA_PSS: &'static str = "RSA-PSS";

    pub fn rsa_pss(salt_length: usize) -> Self {
        Self {
            name: Self::RSA_PSS.to_string(),
            salt_length,
        }
    }
}

/// Contract of the injected wallet object
#[async_trait]
pub trait WalletExtension: Send + Sync {
    async fn connect(&self, permissions: &[Permission]) -> Result<(), WalletError>;

    async fn active_address(&self) -> Result<String, WalletError>;

    async fn active_public_key(&self) -> Result<String, WalletError>;

    async fn signature(&self, data: &[u8], scheme: &SignatureScheme) -> Result<Vec<u8>, WalletError>;
}

/// Thin wrapper enforcing presence and connect-before-use.
///
/// Errors are passed straight through; nothing here retries, since every
/// connect and sign is a user-consent action.
pub struct WalletAdapter {
    extension: Option<Arc<dyn WalletExtension>>,
    connected: AtomicBool,
}

impl WalletAdapter {
    pub fn new(extension: Arc<dyn WalletExtension>) -> Self {
        Self::detect(Some(extension))
    }

    /// Wrap whatever the host environment provides, possibly nothing
    pub fn detect(extension: Option<Arc<dyn WalletExtension>>) -> Self {
        Self {
            extension,
            connected: AtomicBool::new(false),
        }
    }

    pub fn unavailable() -> Self {
        Self::detect(None)
    }

    pub fn is_available(&self) -> bool {
        self.extension.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn extension(&self) -> Result<&Arc<dyn WalletExtension>, WalletError> {
        self.extension.as_ref().ok_or(WalletError::Unavailable)
    }

    fn connected_extension(&self) -> Result<&Arc<dyn WalletExtension>, WalletError> {
        let extension = self.extension()?;
        if !self.is_connected() {
            return Err(WalletError::NotConnected);
        }
        Ok(extension)
    }

    pub async fn connect(&self, permissions: &[Permission]) -> Result<(), WalletError> {
        let extension = self.extension()?;
        // A fresh connect always re-asks; a previous grant does not carry over
        self.connected.store(false, Ordering::Release);
        extension.connect(permissions).await?;
        self.connected.store(true, Ordering::Release);
        tracing::debug!("Wallet connected with {} permission(s)", permissions.len());
        Ok(())
    }

    pub async fn address(&self) -> Result<String, WalletError> {
        self.connected_extension()?.active_address().await
    }

    pub async fn public_key(&self) -> Result<String, WalletError> {
        self.connected_extension()?.active_public_key().await
    }

    /// Address and public key of the connected wallet
    pub async fn identity(&self) -> Result<WalletIdentity, WalletError> {
        let address = self.address().await?;
        let public_key = self.public_key().await?;
        Ok(WalletIdentity { address, public_key })
    }

    pub async fn sign(&self, payload: &[u8], scheme: &SignatureScheme) -> Result<Signature, WalletError> {
        let bytes = self.connected_extension()?.signature(payload, scheme).await?;
        Ok(Signature::new(bytes))
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}
