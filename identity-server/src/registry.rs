// identity-server/src/registry.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use chrono::{DateTime, Utc};
use common::models::Role;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::utils::token::{challenge_message, generate_nonce};

const DEFAULT_CHALLENGE_TTL: i64 = 300;

/// Sign message waiting for its signature
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        Utc::now().signed_duration_since(self.issued_at).num_seconds() > ttl_seconds
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: Uuid,
    pub wallet_address: String,
    pub public_key: String,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already has the {0} role")]
    RoleAlreadyBound(Role),
}

/// Actor message: issue a fresh challenge, replacing any pending one
#[derive(Message)]
#[rtype(result = "String")]
pub struct IssueChallenge {
    pub wallet_address: String,
}

/// Actor message: remove and return the pending challenge, if still valid
#[derive(Message)]
#[rtype(result = "Option<String>")]
pub struct TakeChallenge {
    pub wallet_address: String,
}

/// Actor message: create the account on first login, refresh the key otherwise
#[derive(Message)]
#[rtype(result = "Account")]
pub struct UpsertAccount {
    pub wallet_address: String,
    pub public_key: String,
}

/// Actor message: look up an account by user id
#[derive(Message)]
#[rtype(result = "Option<Account>")]
pub struct GetAccount {
    pub user_id: Uuid,
}

/// Actor message: bind a role; an account holds at most one
#[derive(Message)]
#[rtype(result = "Result<Account, RegistryError>")]
pub struct BindRole {
    pub user_id: Uuid,
    pub role: Role,
}

/// Actor message: drop expired challenges
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredChallenges;

/// Actor message: registry metrics
#[derive(Message)]
#[rtype(result = "RegistryMetrics")]
pub struct GetRegistryMetrics;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RegistryMetrics {
    pub accounts: usize,
    pub client_accounts: usize,
    pub freelancer_accounts: usize,
    pub pending_challenges: usize,
    pub challenges_issued: usize,
    pub expired_count: usize,
}

/// Keeps pending challenges and accounts for the dev identity service
pub struct AccountRegistryActor {
    // wallet address -> pending challenge
    challenges: Arc<DashMap<String, PendingChallenge>>,
    // wallet address -> account
    accounts: Arc<DashMap<String, Account>>,
    // user id -> wallet address
    user_lookup: Arc<DashMap<Uuid, String>>,
    challenge_ttl: i64,
    cleanup_interval: u64,
    metrics: RegistryMetrics,
}

impl Default for AccountRegistryActor {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRegistryActor {
    pub fn new() -> Self {
        Self {
            challenges: Arc::new(DashMap::new()),
            accounts: Arc::new(DashMap::new()),
            user_lookup: Arc::new(DashMap::new()),
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            cleanup_interval: 60,
            metrics: RegistryMetrics::default(),
        }
    }

    pub fn with_challenge_ttl(mut self, ttl_seconds: i64) -> Self {
        self.challenge_ttl = ttl_seconds;
        self
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds;
        self
    }

    fn update_metrics(&mut self) {
        let mut clients = 0;
        let mut freelancers = 0;
        for entry in self.accounts.iter() {
            match entry.value().role {
                Some(Role::Client) => clients += 1,
                Some(Role::Freelancer) => freelancers += 1,
                None => {}
            }
        }

        self.metrics.accounts = self.accounts.len();
        self.metrics.client_accounts = clients;
        self.metrics.freelancer_accounts = freelancers;
        self.metrics.pending_challenges = self.challenges.len();
    }

    fn cleanup_challenges(&mut self) -> usize {
        let ttl = self.challenge_ttl;
        let before = self.challenges.len();
        self.challenges.retain(|_, challenge| !challenge.is_expired(ttl));
        let expired_count = before.saturating_sub(self.challenges.len());

        self.metrics.expired_count += expired_count;
        self.update_metrics();
        expired_count
    }
}

impl Actor for AccountRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("AccountRegistryActor started with challenge TTL: {}s", self.challenge_ttl);

        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired_count = act.cleanup_challenges();
            if expired_count > 0 {
                tracing::info!("Cleaned up {} expired challenges", expired_count);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "AccountRegistryActor stopped. Final metrics: {} accounts, {} challenges issued",
            self.metrics.accounts,
            self.metrics.challenges_issued
        );
    }
}

impl Handler<IssueChallenge> for AccountRegistryActor {
    type Result = MessageResult<IssueChallenge>;

    fn handle(&mut self, msg: IssueChallenge, _ctx: &mut Self::Context) -> Self::Result {
        let message = challenge_message(&msg.wallet_address, &generate_nonce());
        self.challenges.insert(
            msg.wallet_address.clone(),
            PendingChallenge {
                message: message.clone(),
                issued_at: Utc::now(),
            },
        );
        self.metrics.challenges_issued += 1;

        tracing::info!("Issued sign message for wallet: {}", msg.wallet_address);
        MessageResult(message)
    }
}

impl Handler<TakeChallenge> for AccountRegistryActor {
    type Result = MessageResult<TakeChallenge>;

    fn handle(&mut self, msg: TakeChallenge, _ctx: &mut Self::Context) -> Self::Result {
        let result = match self.challenges.remove(&msg.wallet_address) {
            Some((_, challenge)) if challenge.is_expired(self.challenge_ttl) => {
                tracing::debug!("Challenge expired for wallet: {}", msg.wallet_address);
                self.metrics.expired_count += 1;
                None
            }
            Some((_, challenge)) => Some(challenge.message),
            None => {
                tracing::debug!("No pending challenge for wallet: {}", msg.wallet_address);
                None
            }
        };

        MessageResult(result)
    }
}

impl Handler<UpsertAccount> for AccountRegistryActor {
    type Result = MessageResult<UpsertAccount>;

    fn handle(&mut self, msg: UpsertAccount, _ctx: &mut Self::Context) -> Self::Result {
        let account = if let Some(mut entry) = self.accounts.get_mut(&msg.wallet_address) {
            let account = entry.value_mut();
            account.public_key = msg.public_key;
            tracing::info!("Existing account logged in: {}", account.user_id);
            account.clone()
        } else {
            let account = Account {
                user_id: Uuid::new_v4(),
                wallet_address: msg.wallet_address.clone(),
                public_key: msg.public_key,
                role: None,
                created_at: Utc::now(),
            };
            self.accounts.insert(msg.wallet_address.clone(), account.clone());
            self.user_lookup.insert(account.user_id, msg.wallet_address);
            tracing::info!("Created account {} for wallet {}", account.user_id, account.wallet_address);
            account
        };

        MessageResult(account)
    }
}

impl Handler<GetAccount> for AccountRegistryActor {
    type Result = MessageResult<GetAccount>;

    fn handle(&mut self, msg: GetAccount, _ctx: &mut Self::Context) -> Self::Result {
        let account = self
            .user_lookup
            .get(&msg.user_id)
            .and_then(|address| self.accounts.get(address.value()).map(|entry| entry.value().clone()));

        MessageResult(account)
    }
}

impl Handler<BindRole> for AccountRegistryActor {
    type Result = Result<Account, RegistryError>;

    fn handle(&mut self, msg: BindRole, _ctx: &mut Self::Context) -> Self::Result {
        let address = self
            .user_lookup
            .get(&msg.user_id)
            .map(|entry| entry.value().clone())
            .ok_or(RegistryError::AccountNotFound)?;

        let mut entry = self
            .accounts
            .get_mut(&address)
            .ok_or(RegistryError::AccountNotFound)?;
        let account = entry.value_mut();

        match account.role {
            Some(bound) if bound != msg.role => Err(RegistryError::RoleAlreadyBound(bound)),
            Some(_) => Ok(account.clone()),
            None => {
                account.role = Some(msg.role);
                tracing::info!("Bound role {} to account {}", msg.role, account.user_id);
                Ok(account.clone())
            }
        }
    }
}

impl Handler<CleanupExpiredChallenges> for AccountRegistryActor {
    type Result = MessageResult<CleanupExpiredChallenges>;

    fn handle(&mut self, _msg: CleanupExpiredChallenges, _ctx: &mut Self::Context) -> Self::Result {
        let expired_count = self.cleanup_challenges();
        tracing::info!("Cleaned up {} expired challenges", expired_count);
        MessageResult(expired_count)
    }
}

impl Handler<GetRegistryMetrics> for AccountRegistryActor {
    type Result = MessageResult<GetRegistryMetrics>;

    fn handle(&mut self, _msg: GetRegistryMetrics, _ctx: &mut Self::Context) -> Self::Result {
        self.update_metrics();
        MessageResult(self.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix::test]
    async fn test_challenge_is_single_use() {
        let registry = AccountRegistryActor::new().start();
        let wallet_address = "addr".to_string();

        let message = registry
            .send(IssueChallenge { wallet_address: wallet_address.clone() })
            .await
            .unwrap();
        assert!(message.starts_with("Login to DecentWork\nAddress: addr\nNonce: "));

        let taken = registry
            .send(TakeChallenge { wallet_address: wallet_address.clone() })
            .await
            .unwrap();
        assert_eq!(taken, Some(message));

        let again = registry.send(TakeChallenge { wallet_address }).await.unwrap();
        assert_eq!(again, None);
    }

    #[actix::test]
    async fn test_reissue_replaces_pending_challenge() {
        let registry = AccountRegistryActor::new().start();
        let first = registry
            .send(IssueChallenge { wallet_address: "addr".into() })
            .await
            .unwrap();
        let second = registry
            .send(IssueChallenge { wallet_address: "addr".into() })
            .await
            .unwrap();
        assert_ne!(first, second);

        let taken = registry
            .send(TakeChallenge { wallet_address: "addr".into() })
            .await
            .unwrap();
        assert_eq!(taken, Some(second));
    }

    #[actix::test]
    async fn test_expired_challenge_is_refused() {
        let registry = AccountRegistryActor::new().with_challenge_ttl(-1).start();
        registry
            .send(IssueChallenge { wallet_address: "addr".into() })
            .await
            .unwrap();

        let taken = registry
            .send(TakeChallenge { wallet_address: "addr".into() })
            .await
            .unwrap();
        assert_eq!(taken, None);
    }

    #[actix::test]
    async fn test_cleanup_drops_expired_challenges() {
        let registry = AccountRegistryActor::new().with_challenge_ttl(-1).start();
        registry
            .send(IssueChallenge { wallet_address: "a".into() })
            .await
            .unwrap();
        registry
            .send(IssueChallenge { wallet_address: "b".into() })
            .await
            .unwrap();

        assert_eq!(registry.send(CleanupExpiredChallenges).await.unwrap(), 2);
        let metrics = registry.send(GetRegistryMetrics).await.unwrap();
        assert_eq!(metrics.pending_challenges, 0);
        assert_eq!(metrics.expired_count, 2);
    }

    #[actix::test]
    async fn test_upsert_keeps_user_id() {
        let registry = AccountRegistryActor::new().start();
        let first = registry
            .send(UpsertAccount { wallet_address: "addr".into(), public_key: "pk1".into() })
            .await
            .unwrap();
        let second = registry
            .send(UpsertAccount { wallet_address: "addr".into(), public_key: "pk2".into() })
            .await
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(second.public_key, "pk2");

        let found = registry
            .send(GetAccount { user_id: first.user_id })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.wallet_address, "addr");
    }

    #[actix::test]
    async fn test_second_role_is_rejected() {
        let registry = AccountRegistryActor::new().start();
        let account = registry
            .send(UpsertAccount { wallet_address: "addr".into(), public_key: "pk".into() })
            .await
            .unwrap();

        let bound = registry
            .send(BindRole { user_id: account.user_id, role: Role::Client })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bound.role, Some(Role::Client));

        // same role again is a no-op
        assert!(registry
            .send(BindRole { user_id: account.user_id, role: Role::Client })
            .await
            .unwrap()
            .is_ok());

        let err = registry
            .send(BindRole { user_id: account.user_id, role: Role::Freelancer })
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err, RegistryError::RoleAlreadyBound(Role::Client));

        let missing = registry
            .send(BindRole { user_id: Uuid::new_v4(), role: Role::Client })
            .await
            .unwrap();
        assert_eq!(missing.unwrap_err(), RegistryError::AccountNotFound);
    }
}
