// common/src/models/mod.rs
pub mod role;
pub mod session;

pub use role::{Role, RoleHints, RoleState, UnknownRole};
pub use session::{Challenge, SessionCredential, Signature, UserRecord, WalletIdentity};
