//! Verdict snapshot and its on-disk JSON form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AssertError, Result};

/// Aggregate of every assertion recorded so far.
///
/// Invariant: `failure_messages.len() == failed`. Fields are private and the
/// JSON form is validated on the way in, so a `TestResult` can never be
/// observed in a state that violates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TestResultDocument")]
pub struct TestResult {
    #[serde(rename = "NumberOfPassedAsserts")]
    passed: u64,
    #[serde(rename = "NumberOfFailedAsserts")]
    failed: u64,
    #[serde(rename = "FailureMessages")]
    failure_messages: Vec<String>,
}

/// Unvalidated wire form of [`TestResult`].
#[derive(Deserialize)]
struct TestResultDocument {
    #[serde(rename = "NumberOfPassedAsserts")]
    passed: u64,
    #[serde(rename = "NumberOfFailedAsserts")]
    failed: u64,
    #[serde(rename = "FailureMessages", default)]
    failure_messages: Vec<String>,
}

impl TryFrom<TestResultDocument> for TestResult {
    type Error = String;

    fn try_from(doc: TestResultDocument) -> std::result::Result<Self, Self::Error> {
        if doc.failure_messages.len() as u64 != doc.failed {
            return Err(format!(
                "NumberOfFailedAsserts is {} but FailureMessages has {} entries",
                doc.failed,
                doc.failure_messages.len()
            ));
        }
        Ok(TestResult {
            passed: doc.passed,
            failed: doc.failed,
            failure_messages: doc.failure_messages,
        })
    }
}

impl TestResult {
    /// An empty result: nothing passed, nothing failed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A result carrying a single failure, used when no verdict could be
    /// produced at all.
    pub fn fail(message: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.add(None, message);
        result
    }

    /// Record one assertion. `None` is an unconditional failure.
    pub fn add(&mut self, condition: Option<bool>, message: impl Into<String>) {
        match condition {
            Some(true) => self.passed += 1,
            Some(false) | None => {
                self.failed += 1;
                self.failure_messages.push(message.into());
            }
        }
    }

    /// Number of assertions that held.
    pub fn passed(&self) -> u64 {
        self.passed
    }

    /// Number of assertions that did not hold, including unconditional failures.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// One message per failure, in the order the failures were recorded.
    pub fn failure_messages(&self) -> &[String] {
        &self.failure_messages
    }

    /// Whether no assertion failed.
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Serialize to the verdict file format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the verdict file format.
    ///
    /// Returns `Ok(None)` for a JSON `null` document.
    pub fn from_json(json: &str) -> Result<Option<Self>> {
        serde_json::from_str::<Option<TestResult>>(json).map_err(AssertError::from)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.succeeded() { "PASSED" } else { "FAILED" };
        write!(
            f,
            "{verdict}: {} passed, {} failed",
            self.passed, self.failed
        )?;
        for message in &self.failure_messages {
            write!(f, "\n  - {message}")?;
        }
        Ok(())
    }
}
