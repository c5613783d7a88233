// wallet-client/src/routing.rs
//! Where a user belongs, given session presence, role and local hints.
//!
//! [`resolve_destination`] is the whole routing policy as a pure function.
//! [`Navigator`] drives it across navigations and owns only in-memory state.

use common::models::{Role, RoleHints, RoleState};
use std::fmt;
use std::time::Duration;

use crate::error::StorageError;
use crate::role::RoleResolver;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    LoggedOut,
    CheckingRole,
    NeedsClientSetup,
    NeedsFreelancerSetup,
    ClientDashboard,
    FreelancerDashboard,
    Neutral,
}

impl Destination {
    /// Route to push, `None` for the stay-put states
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Destination::LoggedOut => Some("/"),
            Destination::NeedsClientSetup => Some("/client/setup"),
            Destination::NeedsFreelancerSetup => Some("/freelancer/setup"),
            Destination::ClientDashboard => Some("/client/dashboard"),
            Destination::FreelancerDashboard => Some("/freelancer"),
            Destination::CheckingRole | Destination::Neutral => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Destination::LoggedOut => "logged out",
            Destination::CheckingRole => "checking role",
            Destination::NeedsClientSetup => "client setup",
            Destination::NeedsFreelancerSetup => "freelancer setup",
            Destination::ClientDashboard => "client dashboard",
            Destination::FreelancerDashboard => "freelancer dashboard",
            Destination::Neutral => "choose a role",
        };
        f.write_str(name)
    }
}

pub fn resolve_destination(session_present: bool, role: &RoleState, hints: &RoleHints) -> Destination {
    if !session_present {
        return Destination::LoggedOut;
    }

    match role {
        RoleState::Unresolved => Destination::CheckingRole,
        RoleState::Client { .. } => Destination::ClientDashboard,
        RoleState::Freelancer { .. } => Destination::FreelancerDashboard,
        // freelancer hint is checked first
        RoleState::None if hints.is_new_freelance_user => Destination::NeedsFreelancerSetup,
        RoleState::None if hints.is_new_client_user => Destination::NeedsClientSetup,
        RoleState::None => Destination::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Destination,
    pub to: Destination,
}

impl Transition {
    pub fn navigate_to(&self) -> Option<&'static str> {
        if self.from == self.to {
            return None;
        }
        self.to.path()
    }
}

/// Backoff for re-polling while the role is unresolved
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay)
    }
}

pub struct Navigator {
    store: SessionStore,
    resolver: RoleResolver,
    current: Destination,
    role: RoleState,
    hints: RoleHints,
}

impl Navigator {
    pub fn new(store: SessionStore, resolver: RoleResolver) -> Self {
        Self {
            store,
            resolver,
            current: Destination::CheckingRole,
            role: RoleState::Unresolved,
            hints: RoleHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: RoleHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn current(&self) -> Destination {
        self.current
    }

    pub fn role_state(&self) -> RoleState {
        self.role
    }

    pub fn hints(&self) -> RoleHints {
        self.hints
    }

    fn go(&mut self, to: Destination) -> Transition {
        let transition = Transition {
            from: self.current,
            to,
        };
        if transition.from != transition.to {
            tracing::info!("Routing {} -> {}", transition.from, transition.to);
        }
        self.current = to;
        transition
    }

    /// Resolve the role fresh and move to wherever that puts the user
    pub async fn enter_gated_view(&mut self) -> Transition {
        let session_present = self.store.is_active();
        self.role = if session_present {
            self.resolver.resolve().await
        } else {
            RoleState::Unresolved
        };
        let to = resolve_destination(session_present, &self.role, &self.hints);
        self.go(to)
    }

    pub async fn enter_with_retry(&mut self, policy: &RetryPolicy) -> Transition {
        let origin = self.current;
        let mut attempt = 0;
        loop {
            let transition = self.enter_gated_view().await;
            attempt += 1;
            if transition.to != Destination::CheckingRole || attempt >= policy.max_attempts {
                return Transition {
                    from: origin,
                    to: transition.to,
                };
            }
            let delay = policy.delay_for(attempt - 1);
            tracing::debug!("Role still unresolved, retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Explicit choice from the neutral state
    pub async fn choose_role(&mut self, role: Role) -> Transition {
        self.hints = RoleHints::for_choice(role);
        self.enter_gated_view().await
    }

    /// Ends the session from any state. In-memory state is reset even when
    /// the slots could not be cleared.
    pub fn logout(&mut self) -> Result<Transition, StorageError> {
        let cleared = self.store.clear();
        self.role = RoleState::Unresolved;
        self.hints = RoleHints::default();
        let transition = self.go(Destination::LoggedOut);
        cleared.map(|_| transition)
    }
}
