// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Address and public key read from a connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletIdentity {
    pub address: String,
    pub public_key: String,
}

/// Server-issued login challenge, bound to the address it was requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub address: String,
    pub message: String,
}

impl Challenge {
    /// Bytes handed to the wallet for signing
    pub fn signing_payload(&self) -> &[u8] {
        self.message.as_bytes()
    }
}

/// Raw signature bytes produced by the wallet. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Standard (padded) base64, the encoding the identity service expects
    pub fn to_base64(&self) -> String {
        base64::encode(&self.bytes)
    }
}

// Keep signature material out of logs
impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({} bytes)", self.bytes.len())
    }
}

/// Bearer credential issued by the identity service after a successful handshake
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    /// Opaque bearer token
    pub token: String,
    /// Identity service user id
    pub user_id: String,
    /// Wallet the token was issued for
    pub wallet_address: String,
    /// Public key the challenge signature was checked against
    pub public_key: String,
    /// Session creation time as reported by the service
    pub created_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Minimal identity record persisted next to the token
    pub fn user_record(&self) -> UserRecord {
        UserRecord {
            id: self.user_id.clone(),
            wallet_address: self.wallet_address.clone(),
            public_key: self.public_key.clone(),
            created_at: self.created_at,
        }
    }

    pub fn from_parts(token: String, record: UserRecord) -> Self {
        Self {
            token,
            user_id: record.id,
            wallet_address: record.wallet_address,
            public_key: record.public_key,
            created_at: record.created_at,
        }
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("wallet_address", &self.wallet_address)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Serialized identity record stored in the `userData` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub wallet_address: String,
    pub public_key: String,
    #[serde(with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Timestamps from the identity service arrive either as RFC 3339 text or as
/// epoch milliseconds (number or numeric string). Always written as RFC 3339.
pub mod flexible_timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => from_millis(ms),
            Raw::Text(text) => match text.parse::<i64>() {
                Ok(ms) => from_millis(ms),
                Err(_) => DateTime::parse_from_rfc3339(&text)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(de::Error::custom),
            },
        }
    }

    fn from_millis<E: de::Error>(ms: i64) -> Result<DateTime<Utc>, E> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp out of range: {}", ms)))
    }
}
