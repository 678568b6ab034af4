pub mod builders;
pub mod fake_executor;
pub mod store;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for a runtime under test to go idle or shut down.
pub const RUNTIME_DEADLINE: Duration = Duration::from_secs(5);

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// unless run with `--nocapture`. `STEPWISE_LOG` takes the same filter
/// directives as the binary, e.g. `STEPWISE_LOG=stepwise::dag=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("STEPWISE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`RUNTIME_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(RUNTIME_DEADLINE, f).await {
        Ok(value) => value,
        Err(_) => panic!("runtime did not finish within {RUNTIME_DEADLINE:?}"),
    }
}
