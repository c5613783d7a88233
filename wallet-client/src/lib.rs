// wallet-client/src/lib.rs
pub mod auth;
pub mod authorized;
pub mod error;
pub mod identity;
pub mod role;
pub mod routing;
pub mod session;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{ChallengeAuthClient, ViewScope};
pub use authorized::AuthorizedCaller;
pub use error::{AuthError, RequestError, RoleResolutionFailed, ServiceError, StorageError, WalletError};
pub use identity::{GraphQlIdentityClient, IdentityService, IssuedSession};
pub use role::RoleResolver;
pub use routing::{resolve_destination, Destination, Navigator, RetryPolicy, Transition};
pub use session::{FileSlots, MemorySlots, SessionStore, SlotStorage};
pub use wallet::{KeyfileWallet, Permission, SignatureScheme, WalletAdapter, WalletExtension};
