//! Negative-path conformance suite for Sound Trigger HAL 2.1.
//!
//! The suite discovers every 2.1 server registered with a
//! [`ServiceManager`](hal_service_manager::ServiceManager) and, for each one,
//! runs a fixed set of cases that hand the server arguments it must refuse:
//! models with an invalid type, models without data, models whose payload is
//! random bytes, and a recognition start on a handle that was never loaded.
//!
//! A case passes when the call completes at the transport level, the server
//! reports an error status, and no model callback arrives within a short
//! window afterwards.
//!
//! # Running
//!
//! ```rust,no_run
//! use hal_service_manager::ServiceManager;
//! use soundtrigger_vts::suite::{self, Suite};
//!
//! soundtrigger_vts::init_logging();
//! let args = suite::arguments();
//! Suite::new(ServiceManager::global()).run(&args).exit();
//! ```

pub mod callback;
pub mod config;
pub mod fixture;
pub mod monitor;
pub mod rng;
pub mod suite;
pub mod testcase;
pub mod tests;

pub use callback::CallbackSink;
pub use config::SuiteConfig;
pub use fixture::{Fixture, FixtureState, SetupError};
pub use monitor::Monitor;
pub use rng::SuiteRng;
pub use suite::Suite;
pub use testcase::{Expectations, TestResult};

use tracing_subscriber::EnvFilter;

static_assertions::assert_impl_all!(Monitor: Send, Sync);
static_assertions::assert_impl_all!(FixtureState: Send, Sync);
static_assertions::assert_impl_all!(CallbackSink: Send, Sync);
static_assertions::assert_impl_all!(SuiteRng: Send, Sync);

/// Log to stderr without timestamps, filtered by `RUST_LOG` (default `info`).
/// Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
