use std::fmt;
use std::sync::Arc;

use dynamap_core::envelope::{self, Envelope, NONCE_LEN};
use dynamap_core::storage::KeyWrapper;
use dynamap_core::{AccessError, AttributeValue, Result};

/// Source of AES-GCM nonces.
pub trait NonceSource: Send + Sync {
    fn nonce(&self) -> [u8; NONCE_LEN];
}

/// Random nonces from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn nonce(&self) -> [u8; NONCE_LEN] {
        rand::random()
    }
}

/// Per-attribute envelope encryption with a fresh data key per value.
#[derive(Clone)]
pub struct EncryptionService {
    key_id: String,
    wrapper: Arc<dyn KeyWrapper>,
    nonces: Arc<dyn NonceSource>,
}

impl fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl EncryptionService {
    pub fn new(key_id: impl Into<String>, wrapper: Arc<dyn KeyWrapper>) -> Result<Self> {
        let key_id = key_id.into();
        if key_id.trim().is_empty() {
            return Err(AccessError::EncryptionNotConfigured(
                "key id is empty".to_string(),
            ));
        }
        Ok(Self {
            key_id,
            wrapper,
            nonces: Arc::new(RandomNonce),
        })
    }

    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Seals one wire value into its stored envelope.
    pub async fn encrypt(
        &self,
        attribute_name: &str,
        value: &AttributeValue,
    ) -> Result<AttributeValue> {
        let key = self.wrapper.generate_data_key(&self.key_id).await?;
        let nonce = self.nonces.nonce();
        let sealed = envelope::seal(&key.plaintext, key.wrapped, &nonce, attribute_name, value)?;
        tracing::trace!(attribute = %attribute_name, "sealed attribute");
        Ok(sealed.to_attribute())
    }

    /// Opens a stored envelope back into the plaintext wire value.
    pub async fn decrypt(
        &self,
        attribute_name: &str,
        stored: &AttributeValue,
    ) -> Result<AttributeValue> {
        let sealed = Envelope::from_attribute(stored)?;
        let data_key = self.wrapper.decrypt(&sealed.wrapped_key).await?;
        envelope::open(&data_key, attribute_name, &sealed)
    }
}
