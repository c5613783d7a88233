// wallet-client/src/error.rs
use thiserror::Error;

/// Failures raised by a wallet backend or the adapter around it
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet extension not detected")]
    Unavailable,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("request was rejected in the wallet")]
    UserRejected,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("wallet extension error: {0}")]
    Extension(String),
}

/// Failures talking to the identity service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("identity service unreachable: {0}")]
    Transport(String),

    /// The service answered with an error; message kept verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("identity service rejected the bearer token")]
    Unauthorized,

    #[error("unexpected identity service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Malformed(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

/// Failures reading or writing the persisted session slots
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session record could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a failed `authenticate()` call
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("wallet extension not detected")]
    WalletUnavailable,

    #[error("could not connect to the wallet: {0}")]
    WalletConnectionFailed(#[source] WalletError),

    #[error("could not fetch a login challenge: {0}")]
    ChallengeFetchFailed(#[source] ServiceError),

    #[error("could not sign the login challenge: {0}")]
    SigningFailed(#[source] WalletError),

    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("an authentication attempt is already in progress")]
    AuthenticationInProgress,

    /// The view that started the attempt went away before it finished
    #[error("authentication result discarded")]
    Discarded,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Failure happened on the wallet side; the identity service either was
    /// never contacted or played no part in the failure.
    pub fn is_wallet_local(&self) -> bool {
        matches!(
            self,
            AuthError::WalletUnavailable
                | AuthError::WalletConnectionFailed(_)
                | AuthError::SigningFailed(_)
        )
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            AuthError::WalletUnavailable => {
                "Wallet extension not detected. Please install the wallet extension.".to_string()
            }
            AuthError::WalletConnectionFailed(WalletError::UserRejected) => {
                "Wallet connection was rejected.".to_string()
            }
            AuthError::WalletConnectionFailed(_) => {
                "Failed to connect to the wallet.".to_string()
            }
            AuthError::SigningFailed(WalletError::UserRejected) => {
                "Signature was rejected.".to_string()
            }
            AuthError::SigningFailed(_) => "The wallet could not sign the login request.".to_string(),
            AuthError::ChallengeFetchFailed(_) => {
                "Could not reach the login service. Please try again.".to_string()
            }
            AuthError::AuthenticationRejected(_) => "Authentication failed.".to_string(),
            AuthError::AuthenticationInProgress => "Already connecting...".to_string(),
            AuthError::Discarded => "Login was cancelled.".to_string(),
            AuthError::Storage(_) => "Could not save the session.".to_string(),
        }
    }
}

/// Role lookup failed; callers treat this as `RoleState::Unresolved`
#[derive(Debug, Error)]
#[error("role resolution failed: {0}")]
pub struct RoleResolutionFailed(#[from] pub ServiceError);

/// Failure of an authorized request made on behalf of the current session
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no active session")]
    NotAuthenticated,

    #[error(transparent)]
    Service(#[from] ServiceError),
}
