// common/src/models/role.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace role bound to an account by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Client,
    Freelancer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Freelancer => "Freelancer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("client") {
            Ok(Role::Client)
        } else if s.eq_ignore_ascii_case("freelancer") {
            Ok(Role::Freelancer)
        } else {
            Err(UnknownRole(s.to_string()))
        }
    }
}

/// Role as known to the client for the current navigation.
///
/// `Unresolved` means the service could not be asked (or did not answer);
/// `None` means it answered and no role is bound yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    Unresolved,
    None,
    Client { is_new: bool },
    Freelancer { is_new: bool },
}

impl RoleState {
    /// State for a role reported by the service. Reported roles are never new.
    pub fn from_bound(role: Option<Role>) -> Self {
        match role {
            Some(Role::Client) => RoleState::Client { is_new: false },
            Some(Role::Freelancer) => RoleState::Freelancer { is_new: false },
            None => RoleState::None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            RoleState::Client { .. } => Some(Role::Client),
            RoleState::Freelancer { .. } => Some(Role::Freelancer),
            RoleState::Unresolved | RoleState::None => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, RoleState::Unresolved)
    }
}

/// Client-local "new user" hints. Not authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleHints {
    pub is_new_client_user: bool,
    pub is_new_freelance_user: bool,
}

impl RoleHints {
    /// Hints for an explicit choice made by the user
    pub fn for_choice(role: Role) -> Self {
        match role {
            Role::Client => Self {
                is_new_client_user: true,
                is_new_freelance_user: false,
            },
            Role::Freelancer => Self {
                is_new_client_user: false,
                is_new_freelance_user: true,
            },
        }
    }
}
