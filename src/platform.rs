//! Execution platforms.
//!
//! A [`Platform`] supplies source and sink taps and connects a pipe between them. Platforms
//! differ only in where tap contents live ([`TapStore`]); planning and execution are shared
//! through [`Flow`].

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{MatrixError, MatrixResult};
use crate::fields::FieldSlot;
use crate::flow::Flow;
use crate::pipe::Pipe;
use crate::planner::Plan;

pub mod local;
pub mod memory;

pub use local::LocalPlatform;
pub use memory::MemoryPlatform;

/// The well-known input dataset: twenty lines, `1` through `20`.
pub const NUMS_20: &str = "nums.20.txt";

// ============================================================================
// TAPS
// ============================================================================

/// What happens when a sink's output already exists. There is no append mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    /// Fail if output already exists.
    Keep,
    /// Replace existing output.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapKind {
    Source,
    Sink,
}

/// A text-line tap: each record is `(offset, line)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tap {
    pub identifier: String,
    pub kind: TapKind,
    pub mode: SinkMode,
}

impl Tap {
    pub fn source(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: TapKind::Source,
            mode: SinkMode::Keep,
        }
    }

    pub fn sink(identifier: impl Into<String>, mode: SinkMode) -> Self {
        Self {
            identifier: identifier.into(),
            kind: TapKind::Sink,
            mode,
        }
    }

    /// Layout of records read through this tap.
    pub fn fields(&self) -> Vec<FieldSlot> {
        vec![Some("offset".to_string()), Some("line".to_string())]
    }
}

/// Backing storage for tap contents.
pub trait TapStore: Send + Sync {
    fn read_lines(&self, tap: &Tap) -> MatrixResult<Vec<String>>;

    /// Write `lines` as the full contents of `tap`, honouring its [`SinkMode`].
    fn write_lines(&self, tap: &Tap, lines: &[String]) -> MatrixResult<()>;

    fn exists(&self, tap: &Tap) -> bool;
}

// ============================================================================
// PLATFORM
// ============================================================================

pub trait Platform: Send + Sync {
    /// Identity used for inclusion filtering and case display names.
    fn name(&self) -> &str;

    fn store(&self) -> Arc<dyn TapStore>;

    fn input_source(&self, dataset: &str) -> MatrixResult<Tap>;

    fn output_sink(&self, path: &str, mode: SinkMode) -> MatrixResult<Tap> {
        Ok(Tap::sink(path, mode))
    }

    /// Plan `pipe` against `source` and bind it to `sink`. Nothing runs until
    /// [`Flow::complete`].
    fn connect(&self, source: &Tap, sink: &Tap, pipe: &Pipe) -> MatrixResult<Flow> {
        let plan = Plan::build(pipe, source.fields())?;
        Ok(Flow::new(
            pipe.name(),
            self.name(),
            source.clone(),
            sink.clone(),
            plan,
            self.store(),
        ))
    }
}

/// Creates a fresh platform instance; one is made per case.
pub type PlatformFactory = Arc<dyn Fn() -> MatrixResult<Box<dyn Platform>> + Send + Sync>;

/// Directories used by file-backed platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Resolve a platform name to a factory.
pub fn factory(name: &str, settings: &PlatformSettings) -> MatrixResult<PlatformFactory> {
    match name.to_lowercase().as_str() {
        memory::NAME => Ok(Arc::new(|| Ok(Box::new(MemoryPlatform::new()) as Box<dyn Platform>))),
        local::NAME => {
            let settings = settings.clone();
            Ok(Arc::new(move || {
                Ok(Box::new(LocalPlatform::new(
                    settings.data_dir.clone(),
                    settings.output_dir.clone(),
                )) as Box<dyn Platform>)
            }))
        }
        _ => Err(MatrixError::UnknownPlatform {
            name: name.to_string(),
        }),
    }
}

// ============================================================================
// INCLUSION
// ============================================================================

/// Platform names to include in a run. Empty means every platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformIncludes(BTreeSet<String>);

impl PlatformIncludes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    /// Parse a comma separated list such as `memory,local`.
    pub fn from_csv(text: &str) -> Self {
        Self::new(text.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_included(&self, platform: &str) -> bool {
        self.0.is_empty() || self.0.contains(&platform.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_includes_admit_everything() {
        let includes = PlatformIncludes::default();
        assert!(includes.is_included("memory"));
        assert!(includes.is_included("local"));
    }

    #[test]
    fn includes_are_case_insensitive() {
        let includes = PlatformIncludes::from_csv(" Local , ");
        assert!(includes.is_included("local"));
        assert!(includes.is_included("LOCAL"));
        assert!(!includes.is_included("memory"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let settings = PlatformSettings {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("target/pipematrix"),
        };
        assert!(factory("memory", &settings).is_ok());
        assert!(matches!(
            factory("hadoop", &settings),
            Err(MatrixError::UnknownPlatform { .. })
        ));
    }
}
