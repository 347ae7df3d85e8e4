pub mod builders;
pub mod fakes;

use std::sync::Once;
use std::time::Duration;

use locimport::engine::{QueueEvent, QueueRunner, RunnerOptions};
use locimport::env::EnvironmentAdapter;
use locimport::exec::InvocationBuilder;
use locimport::queue::Task;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use crate::fakes::ShellLauncher;

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
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Short poll interval so process-backed tests finish quickly.
pub fn fast_options() -> RunnerOptions {
    RunnerOptions {
        poll_interval: Duration::from_millis(5),
        drain_grace: Duration::from_secs(2),
    }
}

/// Runner over `tasks` whose processes are the launcher's shell snippets.
pub fn shell_runner<E: EnvironmentAdapter>(
    tasks: Vec<Task>,
    launcher: ShellLauncher,
    env: E,
) -> QueueRunner<ShellLauncher, E> {
    QueueRunner::new(
        tasks,
        launcher,
        env,
        InvocationBuilder::new("UE4Editor-Cmd"),
        fast_options(),
    )
}

/// Everything currently buffered on an event receiver.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<QueueEvent>) -> Vec<QueueEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
