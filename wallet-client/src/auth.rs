// wallet-client/src/auth.rs
//! Wallet challenge-response handshake.
//!
//! connect → fetch challenge → sign → submit, strictly in that order. The
//! credential reaches the [`SessionStore`] only when all four steps succeed
//! and the view that asked for it is still mounted.

use common::models::{Challenge, SessionCredential};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AuthError, WalletError};
use crate::identity::IdentityService;
use crate::session::SessionStore;
use crate::wallet::{Permission, SignatureScheme, WalletAdapter};

pub const LOGIN_PERMISSIONS: [Permission; 3] = [
    Permission::AccessAddress,
    Permission::Signature,
    Permission::AccessPublicKey,
];

pub const PSS_SALT_LENGTH: usize = 32;

/// Liveness of the view that started an authentication attempt
#[derive(Debug, Clone)]
pub struct ViewScope {
    mounted: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn mount() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    fn ensure_mounted(&self) -> Result<(), AuthError> {
        if self.is_mounted() {
            Ok(())
        } else {
            tracing::info!("View unmounted, discarding authentication result");
            Err(AuthError::Discarded)
        }
    }
}

/// Held for the lifetime of one attempt
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChallengeAuthClient {
    wallet: WalletAdapter,
    identity: Arc<dyn IdentityService>,
    store: SessionStore,
    in_flight: AtomicBool,
}

impl ChallengeAuthClient {
    pub fn new(wallet: WalletAdapter, identity: Arc<dyn IdentityService>, store: SessionStore) -> Self {
        Self {
            wallet,
            identity,
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn wallet(&self) -> &WalletAdapter {
        &self.wallet
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn authenticate(&self, view: &ViewScope) -> Result<SessionCredential, AuthError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(AuthError::AuthenticationInProgress)?;

        // 1. connect
        if !self.wallet.is_available() {
            return Err(AuthError::WalletUnavailable);
        }
        let connected = self.wallet.connect(&LOGIN_PERMISSIONS).await;
        view.ensure_mounted()?;
        connected.map_err(|e| match e {
            WalletError::Unavailable => AuthError::WalletUnavailable,
            other => AuthError::WalletConnectionFailed(other),
        })?;

        let identity = self.wallet.identity().await;
        view.ensure_mounted()?;
        let identity = identity.map_err(AuthError::WalletConnectionFailed)?;
        tracing::info!("Wallet connected: {}", identity.address);

        // 2. challenge
        let message = self.identity.challenge_message(&identity.address).await;
        view.ensure_mounted()?;
        let challenge = Challenge {
            address: identity.address.clone(),
            message: message.map_err(AuthError::ChallengeFetchFailed)?,
        };
        tracing::debug!("Received login challenge for {}", challenge.address);

        // 3. sign
        let scheme = SignatureScheme::rsa_pss(PSS_SALT_LENGTH);
        let signature = self.wallet.sign(challenge.signing_payload(), &scheme).await;
        view.ensure_mounted()?;
        let signature = signature.map_err(AuthError::SigningFailed)?;

        // 4. submit
        let issued = self
            .identity
            .submit_signed_challenge(&identity.address, &identity.public_key, &signature.to_base64())
            .await;
        view.ensure_mounted()?;
        let issued = issued.map_err(|e| {
            tracing::warn!("Signed challenge rejected for {}: {}", identity.address, e);
            AuthError::AuthenticationRejected(e.to_string())
        })?;

        if issued.wallet_address != identity.address {
            tracing::warn!(
                "Session issued for {} but {} signed the challenge",
                issued.wallet_address,
                identity.address
            );
            return Err(AuthError::AuthenticationRejected(
                "session was issued for a different wallet".to_string(),
            ));
        }

        let credential = SessionCredential {
            token: issued.token,
            user_id: issued.user_id,
            wallet_address: identity.address,
            public_key: identity.public_key,
            created_at: issued.created_at,
        };
        self.store.save(&credential)?;

        tracing::info!("Authenticated wallet {}", credential.wallet_address);
        Ok(credential)
    }
}
