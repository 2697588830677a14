//! Shared helpers for the `assetpipe` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fake_tools;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Upper bound for any single async test step.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured per test and only shown for failures (or with
/// `--nocapture`). The filter is read from `ASSETPIPE_LOG`, then
/// `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(assetpipe::logging::LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(output) => output,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
