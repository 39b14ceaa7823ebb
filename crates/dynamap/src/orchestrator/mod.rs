//! Request orchestration: batch chunking with unprocessed-item retries,
//! retry loops for eventually consistent reads, parallel scan segments and
//! transaction submission.

mod backoff;
mod batch;
mod parallel;
mod retry;
mod transact;

pub use backoff::{batch_retry_delay, Sleeper, TokioSleeper, BATCH_BASE_DELAY, BATCH_MAX_DELAY};
pub use batch::{batch_get, batch_write, DEFAULT_BATCH_MAX_RETRIES, MAX_BATCH_GET, MAX_BATCH_WRITE};
pub use parallel::{run_segments, DEFAULT_SCAN_CONCURRENCY};
pub use retry::{retry_until, RetryPolicy};
pub use transact::{check_action_count, transact_write, MAX_TRANSACT_ITEMS};
