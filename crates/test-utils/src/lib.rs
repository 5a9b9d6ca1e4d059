pub mod builders;
pub mod oracles;

use std::sync::Once;
use std::time::Duration;

use coplan::planner::{PlannerOptions, SearchLimits};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Planner options whose solves are bounded by nodes rather than wall time,
/// so results do not depend on machine speed.
pub fn bounded_options(max_nodes: u64) -> PlannerOptions {
    let limits = SearchLimits {
        max_time: Duration::from_secs(60),
        max_nodes: Some(max_nodes),
    };
    PlannerOptions {
        solve_limits: limits,
        what_if_limits: limits,
        ..PlannerOptions::default()
    }
}

/// Run a future with a 30-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(30), f)
        .await
        .expect("Test timed out after 30 seconds")
}
