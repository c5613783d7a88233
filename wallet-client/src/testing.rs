// wallet-client/src/testing.rs
// Scriptable wallet and identity service doubles for unit tests
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::models::Role;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::error::{ServiceError, WalletError};
use crate::identity::{IdentityService, IssuedSession};
use crate::wallet::{Permission, SignatureScheme, WalletExtension};

pub struct FakeWallet {
    address: String,
    public_key: String,
    reject_connect: bool,
    reject_sign: bool,
    connect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn new(address: &str, public_key: &str) -> Self {
        Self {
            address: address.to_string(),
            public_key: public_key.to_string(),
            reject_connect: false,
            reject_sign: false,
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting_connect(mut self) -> Self {
        self.reject_connect = true;
        self
    }

    pub fn rejecting_signatures(mut self) -> Self {
        self.reject_sign = true;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletExtension for FakeWallet {
    async fn connect(&self, _permissions: &[Permission]) -> Result<(), WalletError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_connect {
            return Err(WalletError::UserRejected);
        }
        Ok(())
    }

    async fn active_address(&self) -> Result<String, WalletError> {
        Ok(self.address.clone())
    }

    async fn active_public_key(&self) -> Result<String, WalletError> {
        Ok(self.public_key.clone())
    }

    async fn signature(&self, data: &[u8], _scheme: &SignatureScheme) -> Result<Vec<u8>, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_sign {
            return Err(WalletError::UserRejected);
        }
        let mut sig = b"sig:".to_vec();
        sig.extend_from_slice(data);
        Ok(sig)
    }
}

/// Lets a test hold the submit step open until it says so
#[derive(Default)]
pub struct Gate {
    reached: Notify,
    release: Notify,
}

impl Gate {
    pub async fn wait_reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Debug, Clone)]
pub enum RoleAnswer {
    Bound(Option<Role>),
    Fail,
    Unauthorized,
}

pub struct FakeIdentity {
    fail_challenge: bool,
    reject_submit: Option<String>,
    session_wallet: Option<String>,
    role: Mutex<RoleAnswer>,
    gate: Option<Arc<Gate>>,
    challenge_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    role_calls: AtomicUsize,
    last_signature: Mutex<Option<String>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            fail_challenge: false,
            reject_submit: None,
            session_wallet: None,
            role: Mutex::new(RoleAnswer::Bound(None)),
            gate: None,
            challenge_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            role_calls: AtomicUsize::new(0),
            last_signature: Mutex::new(None),
        }
    }

    pub fn failing_challenge(mut self) -> Self {
        self.fail_challenge = true;
        self
    }

    pub fn rejecting_submit(mut self, message: &str) -> Self {
        self.reject_submit = Some(message.to_string());
        self
    }

    /// Issue sessions for a different wallet than the one that signed
    pub fn issuing_for_wallet(mut self, wallet: &str) -> Self {
        self.session_wallet = Some(wallet.to_string());
        self
    }

    pub fn with_role(self, answer: RoleAnswer) -> Self {
        *self.role.lock().unwrap() = answer;
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_role(&self, answer: RoleAnswer) {
        *self.role.lock().unwrap() = answer;
    }

    pub fn challenge_calls(&self) -> usize {
        self.challenge_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn role_calls(&self) -> usize {
        self.role_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.challenge_calls() + self.submit_calls() + self.role_calls()
    }

    pub fn last_signature(&self) -> Option<String> {
        self.last_signature.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn challenge_message(&self, address: &str) -> Result<String, ServiceError> {
        self.challenge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_challenge {
            return Err(ServiceError::Transport("connection refused".to_string()));
        }
        Ok(format!("Login to DecentWork\nAddress: {}\nNonce: 1-abc", address))
    }

    async fn submit_signed_challenge(
        &self,
        address: &str,
        _public_key: &str,
        signature_b64: &str,
    ) -> Result<IssuedSession, ServiceError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_signature.lock().unwrap() = Some(signature_b64.to_string());

        if let Some(gate) = &self.gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }

        if let Some(message) = &self.reject_submit {
            return Err(ServiceError::Rejected(message.clone()));
        }

        Ok(IssuedSession {
            token: format!("token-{}", n),
            user_id: "user-1".to_string(),
            wallet_address: self.session_wallet.clone().unwrap_or_else(|| address.to_string()),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        })
    }

    async fn bound_role(&self, _token: &str) -> Result<Option<Role>, ServiceError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        match self.role.lock().unwrap().clone() {
            RoleAnswer::Bound(role) => Ok(role),
            RoleAnswer::Fail => Err(ServiceError::Transport("timed out".to_string())),
            RoleAnswer::Unauthorized => Err(ServiceError::Unauthorized),
        }
    }

    async fn bind_role(&self, _token: &str, role: Role) -> Result<(), ServiceError> {
        self.set_role(RoleAnswer::Bound(Some(role)));
        Ok(())
    }
}
