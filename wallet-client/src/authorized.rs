// wallet-client/src/authorized.rs
use std::future::Future;

use crate::error::{RequestError, ServiceError};
use crate::session::SessionStore;

/// Runs requests on behalf of the current session. A request the service
/// rejects as unauthorized ends the session.
#[derive(Clone)]
pub struct AuthorizedCaller {
    store: SessionStore,
}

impl AuthorizedCaller {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub async fn call<T, F, Fut>(&self, request: F) -> Result<T, RequestError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let token = self.store.token().ok_or(RequestError::NotAuthenticated)?;

        match request(token).await {
            Err(ServiceError::Unauthorized) => {
                tracing::warn!("Bearer token rejected, clearing session");
                if let Err(e) = self.store.clear() {
                    tracing::warn!("Failed to clear session: {}", e);
                }
                Err(RequestError::Service(ServiceError::Unauthorized))
            }
            other => other.map_err(RequestError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::models::SessionCredential;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with_session() -> SessionStore {
        let store = SessionStore::in_memory();
        store
            .save(&SessionCredential {
                token: "t1".to_string(),
                user_id: "u1".to_string(),
                wallet_address: "addr".to_string(),
                public_key: "pk".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_token_is_attached() {
        let caller = AuthorizedCaller::new(store_with_session());
        let seen = caller.call(|token| async move { Ok(token) }).await.unwrap();
        assert_eq!(seen, "t1");
    }

    #[tokio::test]
    async fn test_no_session_skips_request() {
        let caller = AuthorizedCaller::new(SessionStore::in_memory());
        let calls = AtomicUsize::new(0);
        let result = caller
            .call(|_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(RequestError::NotAuthenticated)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        let store = store_with_session();
        let caller = AuthorizedCaller::new(store.clone());

        let result: Result<(), _> = caller.call(|_| async { Err(ServiceError::Unauthorized) }).await;
        assert!(matches!(result, Err(RequestError::Service(ServiceError::Unauthorized))));
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_other_errors_keep_session() {
        let store = store_with_session();
        let caller = AuthorizedCaller::new(store.clone());

        let result: Result<(), _> = caller
            .call(|_| async { Err(ServiceError::Transport("down".into())) })
            .await;
        assert!(matches!(result, Err(RequestError::Service(ServiceError::Transport(_)))));
        assert!(store.is_active());
    }
}
