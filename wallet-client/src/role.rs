// wallet-client/src/role.rs
use common::models::RoleState;
use std::sync::Arc;

use crate::error::RoleResolutionFailed;
use crate::identity::IdentityService;
use crate::session::SessionStore;

/// Asks the identity service which role the current session is bound to.
/// Holds no state of its own; every call goes to the service.
#[derive(Clone)]
pub struct RoleResolver {
    store: SessionStore,
    identity: Arc<dyn IdentityService>,
}

impl RoleResolver {
    pub fn new(store: SessionStore, identity: Arc<dyn IdentityService>) -> Self {
        Self { store, identity }
    }

    pub async fn try_resolve(&self) -> Result<RoleState, RoleResolutionFailed> {
        let Some(token) = self.store.token() else {
            return Ok(RoleState::None);
        };

        let role = self.identity.bound_role(&token).await?;
        Ok(RoleState::from_bound(role))
    }

    /// Failures collapse to `Unresolved`; the session is left alone
    pub async fn resolve(&self) -> RoleState {
        match self.try_resolve().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Role lookup failed, leaving role unresolved: {}", e);
                RoleState::Unresolved
            }
        }
    }
}
