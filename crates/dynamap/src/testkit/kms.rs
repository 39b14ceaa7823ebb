use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dynamap_core::envelope::{DATA_KEY_LEN, NONCE_LEN};
use dynamap_core::storage::{DataKey, KeyWrapError, KeyWrapper};

use crate::encryption::NonceSource;

#[derive(Default)]
struct Keys {
    issued: HashMap<Vec<u8>, Vec<u8>>,
    generated: usize,
    decrypted: usize,
}

/// Deterministic in-memory key wrapper.
///
/// Every generated data key gets its own wrapped form, so two seals of the
/// same value never share a wrapped key. Only keys it issued can be
/// unwrapped.
#[derive(Default)]
pub struct FakeKeyWrapper {
    keys: Mutex<Keys>,
}

impl FakeKeyWrapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generated(&self) -> usize {
        self.keys.lock().await.generated
    }

    pub async fn decrypted(&self) -> usize {
        self.keys.lock().await.decrypted
    }
}

#[async_trait]
impl KeyWrapper for FakeKeyWrapper {
    async fn generate_data_key(&self, key_id: &str) -> Result<DataKey, KeyWrapError> {
        if key_id.is_empty() {
            return Err(KeyWrapError::new("ValidationException", "key id is empty"));
        }
        let mut keys = self.keys.lock().await;
        keys.generated += 1;
        let serial = keys.generated;

        let plaintext: Vec<u8> = (0..DATA_KEY_LEN)
            .map(|i| (serial as u8).wrapping_mul(31).wrapping_add(i as u8))
            .collect();
        let wrapped = format!("{key_id}:{serial}").into_bytes();
        keys.issued.insert(wrapped.clone(), plaintext.clone());

        Ok(DataKey { plaintext, wrapped })
    }

    async fn decrypt(&self, wrapped: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
        let mut keys = self.keys.lock().await;
        keys.decrypted += 1;
        keys.issued.get(wrapped).cloned().ok_or_else(|| {
            KeyWrapError::new("InvalidCiphertextException", "unknown wrapped key")
        })
    }
}

/// Always hands out the same nonce.
#[derive(Debug, Clone, Copy)]
pub struct FixedNonce(pub [u8; NONCE_LEN]);

impl NonceSource for FixedNonce {
    fn nonce(&self) -> [u8; NONCE_LEN] {
        self.0
    }
}
