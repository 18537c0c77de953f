//! Case outcomes.
//!
//! A case checks two kinds of conditions. Expectations are collected and the
//! case keeps going; an assertion ends the case on the spot. Either way the
//! case reports every failure seen so far.

use std::fmt::Display;

use libtest_mimic::Failed;
use soundtrigger_hal::Return;
use soundtrigger_hal::status::{self, Status};

/// Outcome of one case against one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail(String),
}

impl TestResult {
    pub fn pass() -> Self {
        TestResult::Pass
    }

    pub fn fail(message: impl Into<String>) -> Self {
        TestResult::Fail(message.into())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, TestResult::Pass)
    }

    /// Failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            TestResult::Pass => None,
            TestResult::Fail(message) => Some(message),
        }
    }
}

impl From<TestResult> for Result<(), Failed> {
    fn from(result: TestResult) -> Self {
        match result {
            TestResult::Pass => Ok(()),
            TestResult::Fail(message) => Err(Failed::from(message)),
        }
    }
}

/// Collected failures of the running case.
#[derive(Debug, Default)]
pub struct Expectations {
    failures: Vec<String>,
}

impl Expectations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure if `condition` is false.
    pub fn expect(&mut self, condition: bool, message: impl FnOnce() -> String) {
        if !condition {
            self.failures.push(message());
        }
    }

    /// The call completed at the transport level.
    pub fn expect_transport_ok<T>(&mut self, method: &str, ret: &Return<T>) {
        if let Err(e) = ret {
            self.failures.push(format!("{}: transport failed: {}", method, e));
        }
    }

    /// The HAL reported an error status.
    pub fn expect_status_error(&mut self, method: &str, status: Status) {
        self.expect(!status::is_ok(status), || {
            format!(
                "{}: expected an error status, got {} ({})",
                method,
                status,
                status::name(status)
            )
        });
    }

    /// End the case now with `message` plus anything already collected.
    pub fn abort(mut self, message: impl Display) -> TestResult {
        self.failures.push(message.to_string());
        self.finish()
    }

    pub fn finish(self) -> TestResult {
        if self.failures.is_empty() {
            TestResult::Pass
        } else {
            TestResult::Fail(self.failures.join("\n"))
        }
    }
}
