//! Pipematrix Error Handling
//!
//! Every fatal condition in generation, assembly, planning and platform I/O is a
//! [`MatrixError`]. Per-case verification outcomes live in [`crate::executor::CaseFailure`]
//! instead, so a failed assertion never aborts the whole run.

use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide result alias.
pub type MatrixResult<T> = Result<T, MatrixError>;

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Error, Diagnostic, Debug)]
pub enum MatrixError {
    #[error("expectation resource '{resource}' not found under '{root}'")]
    #[diagnostic(
        code(pipematrix::expectations::not_found),
        help("check `expectations_root` and `expectations` in the harness config")
    )]
    ResourceNotFound { resource: String, root: String },

    #[error("malformed expectation resource '{resource}' at {line}:{column}: {message}")]
    #[diagnostic(code(pipematrix::expectations::malformed))]
    MalformedResource {
        resource: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("malformed tuple literal for '{key}': {message}")]
    #[diagnostic(
        code(pipematrix::expectations::tuple),
        help("tuple literals look like ['value', 1, null]")
    )]
    MalformedTuple { key: String, message: String },

    #[error("malformed length for '{key}': '{value}' is not an integer")]
    #[diagnostic(code(pipematrix::expectations::length))]
    MalformedLength { key: String, value: String },

    #[error("I/O error on '{path}': {source}")]
    #[diagnostic(code(pipematrix::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("field {field} not found in [{layout}]")]
    #[diagnostic(code(pipematrix::planner::field_not_found))]
    FieldNotFound { field: String, layout: String },

    #[error("field {field} is ambiguous in [{layout}]")]
    #[diagnostic(code(pipematrix::planner::ambiguous_field))]
    AmbiguousField { field: String, layout: String },

    #[error("{selector} is not a valid {role} selector")]
    #[diagnostic(code(pipematrix::planner::invalid_selector))]
    InvalidSelector { selector: String, role: &'static str },

    #[error("arity mismatch: {operation} expects {expected} fields, found {actual}")]
    #[diagnostic(code(pipematrix::planner::arity))]
    ArityMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("sink '{path}' already exists and sink mode is KEEP")]
    #[diagnostic(code(pipematrix::platform::sink_exists))]
    SinkExists { path: String },

    #[error("unknown dataset '{dataset}' on platform {platform}")]
    #[diagnostic(code(pipematrix::platform::dataset))]
    UnknownDataset { dataset: String, platform: String },

    #[error("unknown platform '{name}'")]
    #[diagnostic(
        code(pipematrix::platform::unknown),
        help("available platforms: memory, local")
    )]
    UnknownPlatform { name: String },

    #[error("unknown axis set '{name}'")]
    #[diagnostic(code(pipematrix::axes::unknown), help("available axis sets: op, lhs, rhs"))]
    UnknownAxisSet { name: String },

    #[error("case name collision: '{name}' was generated twice")]
    #[diagnostic(code(pipematrix::generator::collision))]
    NameCollision { name: String },

    #[error("configuration error: {message}")]
    #[diagnostic(code(pipematrix::config))]
    Config { message: String },
}

impl MatrixError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        MatrixError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        MatrixError::Config {
            message: message.into(),
        }
    }

    /// True for errors raised while planning a flow against its field layout.
    pub fn is_planner_error(&self) -> bool {
        matches!(
            self,
            MatrixError::FieldNotFound { .. }
                | MatrixError::AmbiguousField { .. }
                | MatrixError::InvalidSelector { .. }
                | MatrixError::ArityMismatch { .. }
        )
    }
}
