//! In-memory capabilities for tests: a recording store, a deterministic key
//! wrapper and a sleeper that never sleeps.

mod kms;
mod store;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

pub use kms::{FakeKeyWrapper, FixedNonce};
pub use store::{Call, FakeStore, Operation, Response};

use crate::orchestrator::Sleeper;

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().await.push(duration);
    }
}
