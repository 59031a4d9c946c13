use chrono::{DateTime, Duration, Utc};
use crypto_core::SecretKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KEY_ALGORITHM: &str = "xchacha20poly1305";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    Active,
    Revoked,
    Expired,
}

/// Conversation encryption key. Lifecycle is Active → (Revoked | Expired),
/// terminal; a key is never reactivated. At most one Active key exists per
/// conversation — rotation revokes the predecessor in the same critical
/// section that inserts the successor.
#[derive(Clone)]
pub struct EncryptionKey {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub algorithm: String,
    pub fingerprint: String,
    pub material: SecretKey,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub revocation_reason: Option<String>,
}

impl EncryptionKey {
    pub fn generate(conversation_id: Uuid, ttl: Duration) -> Self {
        let material = SecretKey::generate();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            algorithm: KEY_ALGORITHM.to_string(),
            fingerprint: material.fingerprint(),
            material,
            created_at: now,
            expires_at: now + ttl,
            revoked: false,
            revoked_at: None,
            revoked_by: None,
            revocation_reason: None,
        }
    }

    /// Revoked is checked before Expired: it is the stronger terminal state.
    pub fn status(&self, now: DateTime<Utc>) -> KeyStatus {
        if self.revoked {
            KeyStatus::Revoked
        } else if now > self.expires_at {
            KeyStatus::Expired
        } else {
            KeyStatus::Active
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == KeyStatus::Active
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("id", &self.id)
            .field("conversation_id", &self.conversation_id)
            .field("fingerprint", &self.fingerprint)
            .field("revoked", &self.revoked)
            .finish()
    }
}

/// Wire representation; never carries key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionKeyDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub algorithm: String,
    pub fingerprint: String,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
}

impl EncryptionKeyDto {
    pub fn from_key(key: &EncryptionKey) -> Self {
        Self {
            id: key.id,
            conversation_id: key.conversation_id,
            algorithm: key.algorithm.clone(),
            fingerprint: key.fingerprint.clone(),
            status: key.status(Utc::now()),
            created_at: key.created_at,
            expires_at: key.expires_at,
            revoked_at: key.revoked_at,
            revoked_by: key.revoked_by,
        }
    }
}
