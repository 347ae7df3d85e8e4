#![allow(dead_code)]

pub use locimport_test_utils::builders;
pub use locimport_test_utils::fakes;
pub use locimport_test_utils::{drain_events, fast_options, init_tracing, shell_runner, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
