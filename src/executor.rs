//! Case Executor
//!
//! Runs one [`PlatformCase`] and classifies the outcome against its oracle:
//!
//! | execution | `.ERROR` set | result                                          |
//! |-----------|--------------|-------------------------------------------------|
//! | fails     | yes          | pass, expected error confirmed                  |
//! | fails     | no           | fail, original error re-surfaced                |
//! | succeeds  | yes          | fail, expected error did not occur              |
//! | succeeds  | no           | check length, then first record against `.tuple` |
//!
//! A successful run with no `.tuple` is a failure: every non-error case must assert a value.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::MatrixError;
use crate::expectations::ExpectedLength;
use crate::flow::Flow;
use crate::platform::{SinkMode, Tap, NUMS_20};
use crate::suite::PlatformCase;

/// Position of the value field in a text-sink record `(offset, line)`.
pub const VALUE_FIELD: usize = 1;

/// How a case passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Ran to completion and matched its oracle.
    Verified { records: usize },
    /// Failed during connect or execution, as its oracle requires.
    ExpectedError { error: String },
}

/// How a case failed.
#[derive(Error, Diagnostic, Debug)]
pub enum CaseFailure {
    #[error("{case}: could not acquire {what}")]
    #[diagnostic(code(pipematrix::case::setup))]
    Setup {
        case: String,
        what: &'static str,
        #[source]
        source: MatrixError,
    },

    #[error("{case}: unexpected error: {source}")]
    #[diagnostic(code(pipematrix::case::unexpected_error))]
    UnexpectedError {
        case: String,
        #[source]
        source: MatrixError,
    },

    #[error("{case}: did not throw asserted error")]
    #[diagnostic(
        code(pipematrix::case::expected_error),
        help("remove the .ERROR entry if this combination is now legal")
    )]
    ExpectedErrorMissing { case: String },

    #[error("{case}: wrong number of records, expected {expected}, got {actual}")]
    #[diagnostic(code(pipematrix::case::length))]
    LengthMismatch {
        case: String,
        expected: usize,
        actual: usize,
    },

    #[error("{case}: not equal: expected {expected:?}, got {actual:?}")]
    #[diagnostic(code(pipematrix::case::value))]
    ValueMismatch {
        case: String,
        expected: String,
        actual: String,
    },

    #[error("{case}: no result assertion made, result was {result:?}")]
    #[diagnostic(
        code(pipematrix::case::no_assertion),
        help("add a .tuple entry (or .ERROR) for this case")
    )]
    NoAssertion { case: String, result: String },

    #[error("{case}: no expected length")]
    #[diagnostic(
        code(pipematrix::case::missing_length),
        help("add a .length entry for this case or a default.length entry")
    )]
    MissingLength { case: String },

    #[error("{case}: sink is empty, no first record to assert against")]
    #[diagnostic(code(pipematrix::case::empty_sink))]
    EmptySink { case: String },

    #[error("{case}: could not read sink")]
    #[diagnostic(code(pipematrix::case::sink_read))]
    SinkRead {
        case: String,
        #[source]
        source: MatrixError,
    },
}

impl CaseFailure {
    /// Expected and actual renderings, for failures that compare two values.
    pub fn comparison(&self) -> Option<(String, String)> {
        match self {
            CaseFailure::ValueMismatch {
                expected, actual, ..
            } => Some((expected.clone(), actual.clone())),
            CaseFailure::LengthMismatch {
                expected, actual, ..
            } => Some((expected.to_string(), actual.to_string())),
            _ => None,
        }
    }
}

// ============================================================================
// EXECUTOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct CaseExecutor {
    dataset: String,
    dot_dir: PathBuf,
}

impl Default for CaseExecutor {
    fn default() -> Self {
        Self::new(NUMS_20, "target/pipematrix/dot")
    }
}

impl CaseExecutor {
    pub fn new(dataset: impl Into<String>, dot_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            dot_dir: dot_dir.into(),
        }
    }

    /// Sink path for a case: scoped by platform and case name.
    pub fn output_path(case: &PlatformCase) -> String {
        format!("{}/{}", case.platform().name(), case.key())
    }

    pub fn dot_path(&self, case: &PlatformCase) -> PathBuf {
        self.dot_dir.join(format!("{}.dot", case.display_name()))
    }

    pub fn execute(&self, case: &PlatformCase) -> Result<CaseOutcome, CaseFailure> {
        let name = case.display_name();
        let platform = case.platform();
        let oracle = case.oracle();

        let source = platform
            .input_source(&self.dataset)
            .map_err(|source| CaseFailure::Setup {
                case: name.to_string(),
                what: "input source",
                source,
            })?;
        let sink = platform
            .output_sink(&Self::output_path(case), SinkMode::Replace)
            .map_err(|source| CaseFailure::Setup {
                case: name.to_string(),
                what: "output sink",
                source,
            })?;

        let flow = match self.run(case, &source, &sink) {
            Err(error) if oracle.expect_error => {
                debug!(
                    case = %name,
                    %error,
                    planner = error.is_planner_error(),
                    "expected error confirmed"
                );
                return Ok(CaseOutcome::ExpectedError {
                    error: error.to_string(),
                });
            }
            Err(source) => {
                if !source.is_planner_error() {
                    warn!(case = %name, error = %source, "flow failed outside planning");
                }
                return Err(CaseFailure::UnexpectedError {
                    case: name.to_string(),
                    source,
                })
            }
            Ok(_) if oracle.expect_error => {
                return Err(CaseFailure::ExpectedErrorMissing {
                    case: name.to_string(),
                })
            }
            Ok(flow) => flow,
        };

        let records = flow.open_sink().map_err(|source| CaseFailure::SinkRead {
            case: name.to_string(),
            source,
        })?;

        match oracle.length {
            ExpectedLength::Exact(expected) if expected != records.len() => {
                return Err(CaseFailure::LengthMismatch {
                    case: name.to_string(),
                    expected,
                    actual: records.len(),
                });
            }
            ExpectedLength::Missing => {
                return Err(CaseFailure::MissingLength {
                    case: name.to_string(),
                });
            }
            ExpectedLength::Exact(_) | ExpectedLength::Unbounded => {}
        }

        let result = records
            .first()
            .and_then(|record| record.get(VALUE_FIELD))
            .map(|value| value.to_string())
            .ok_or_else(|| CaseFailure::EmptySink {
                case: name.to_string(),
            })?;

        match &oracle.tuple {
            Some(expected) if expected.to_string() == result => Ok(CaseOutcome::Verified {
                records: records.len(),
            }),
            Some(expected) => Err(CaseFailure::ValueMismatch {
                case: name.to_string(),
                expected: expected.to_string(),
                actual: result,
            }),
            None => Err(CaseFailure::NoAssertion {
                case: name.to_string(),
                result,
            }),
        }
    }

    /// Connect, optionally dump the graph, and complete. Every error in here is subject to
    /// expected-error classification.
    fn run(&self, case: &PlatformCase, source: &Tap, sink: &Tap) -> Result<Flow, MatrixError> {
        let flow = case.platform().connect(source, sink, case.pipe())?;

        if case.oracle().write_dot {
            let path = self.dot_path(case);
            match flow.write_dot(&path) {
                Ok(()) => debug!(case = %case.display_name(), path = %path.display(), "wrote dot"),
                Err(error) => warn!(case = %case.display_name(), %error, "could not write dot"),
            }
        }

        flow.complete()?;
        Ok(flow)
    }
}
