use std::sync::Arc;

use chrono::{Duration, Utc};
use crypto_core::{decrypt_at_rest, encrypt_at_rest, generate_nonce};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{EncryptionKey, EncryptionKeyDto, KeyStatus};
use crate::store::KeyStore;

/// Ciphertext plus the parameters needed to reverse it. The key itself stays
/// in the vault.
#[derive(Debug, Clone)]
pub struct SealedContent {
    pub key_id: Uuid,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValidation {
    pub key_id: Uuid,
    pub status: KeyStatus,
    pub valid: bool,
    pub reason: Option<String>,
}

/// Manages per-conversation symmetric keys and the sealing of message
/// content. The active key is created lazily on first use; rotation and
/// revocation are one-way.
pub struct KeyVault {
    keys: Arc<dyn KeyStore>,
    key_ttl: Duration,
}

impl KeyVault {
    pub fn new(keys: Arc<dyn KeyStore>, key_ttl_days: i64) -> Self {
        Self {
            keys,
            key_ttl: Duration::days(key_ttl_days),
        }
    }

    /// Returns the conversation's Active key, generating one if none exists.
    pub async fn ensure_active_key(&self, conversation_id: Uuid) -> AppResult<EncryptionKey> {
        if let Some(key) = self.keys.active_for_conversation(conversation_id).await? {
            return Ok(key);
        }
        let key = EncryptionKey::generate(conversation_id, self.key_ttl);
        info!(%conversation_id, fingerprint = %key.fingerprint, "generated conversation key");
        self.keys.insert(key.clone()).await?;
        Ok(key)
    }

    /// Seals plaintext under the conversation's Active key.
    pub async fn seal(&self, conversation_id: Uuid, plaintext: &str) -> AppResult<SealedContent> {
        let key = self.ensure_active_key(conversation_id).await?;
        let nonce = generate_nonce();
        let ciphertext = encrypt_at_rest(plaintext.as_bytes(), &key.material, &nonce)?;
        Ok(SealedContent {
            key_id: key.id,
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    /// Opens ciphertext with the key it was sealed under. Revoked and expired
    /// keys still open historical content; only an unknown key id fails.
    pub async fn open(&self, key_id: Uuid, nonce: &[u8], ciphertext: &[u8]) -> AppResult<String> {
        let key = self
            .keys
            .get(key_id)
            .await?
            .ok_or(AppError::NotFound("encryption key"))?;
        let plaintext = decrypt_at_rest(ciphertext, &key.material, nonce)?;
        String::from_utf8(plaintext).map_err(|_| AppError::Encryption("invalid utf-8".into()))
    }

    /// Revokes every live key of the conversation and activates a fresh one,
    /// atomically. Messages sealed under the old keys remain readable.
    pub async fn rotate_keys(
        &self,
        conversation_id: Uuid,
        rotated_by: Uuid,
    ) -> AppResult<EncryptionKeyDto> {
        let new_key = EncryptionKey::generate(conversation_id, self.key_ttl);
        let rotated = self.keys.rotate(new_key, rotated_by).await?;
        info!(%conversation_id, fingerprint = %rotated.fingerprint, "rotated conversation keys");
        Ok(EncryptionKeyDto::from_key(&rotated))
    }

    /// Idempotent: revoking a revoked key keeps its original revocation
    /// metadata.
    pub async fn revoke_key(
        &self,
        key_id: Uuid,
        revoked_by: Uuid,
        reason: Option<String>,
    ) -> AppResult<EncryptionKeyDto> {
        let key = self.keys.revoke(key_id, revoked_by, reason).await?;
        Ok(EncryptionKeyDto::from_key(&key))
    }

    pub async fn validate_key(&self, key_id: Uuid) -> AppResult<KeyValidation> {
        let key = self
            .keys
            .get(key_id)
            .await?
            .ok_or(AppError::NotFound("encryption key"))?;
        let status = key.status(Utc::now());
        let reason = match status {
            KeyStatus::Active => None,
            KeyStatus::Revoked => Some(
                key.revocation_reason
                    .clone()
                    .unwrap_or_else(|| "revoked".to_string()),
            ),
            KeyStatus::Expired => Some("expired".to_string()),
        };
        Ok(KeyValidation {
            key_id,
            status,
            valid: status == KeyStatus::Active,
            reason,
        })
    }

    pub async fn list_keys(&self, conversation_id: Uuid) -> AppResult<Vec<EncryptionKeyDto>> {
        let keys = self.keys.keys_for_conversation(conversation_id).await?;
        Ok(keys.iter().map(EncryptionKeyDto::from_key).collect())
    }
}
