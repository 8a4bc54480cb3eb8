//! Harness configuration.
//!
//! Layered lowest first: built-in defaults, the YAML file, environment variables, then
//! whatever the CLI overrides. The result is passed explicitly to generation and assembly.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::axes::AxisSet;
use crate::errors::{MatrixError, MatrixResult};
use crate::executor::CaseExecutor;
use crate::expectations::ExpectationStore;
use crate::platform::{self, PlatformFactory, PlatformIncludes, PlatformSettings, NUMS_20};

pub const DEFAULT_CONFIG_FILE: &str = "pipematrix.yaml";

pub const INCLUDES_ENV: &str = "PIPEMATRIX_PLATFORM_INCLUDES";
pub const RUN_ONLY_ENV: &str = "PIPEMATRIX_RUN_ONLY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub expectations_root: PathBuf,
    pub expectations: String,
    pub axes: String,
    pub prefix: Option<String>,
    pub dataset: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dot_dir: PathBuf,
    pub platforms: Vec<String>,
    pub includes: Vec<String>,
    pub run_only: Option<String>,
    pub jobs: usize,
    pub filter: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            expectations_root: PathBuf::from("resources"),
            expectations: "op.properties".to_string(),
            axes: "op".to_string(),
            prefix: None,
            dataset: NUMS_20.to_string(),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("target/pipematrix/output"),
            dot_dir: PathBuf::from("target/pipematrix/dot"),
            platforms: vec![
                platform::memory::NAME.to_string(),
                platform::local::NAME.to_string(),
            ],
            includes: Vec::new(),
            run_only: None,
            jobs: 1,
            filter: None,
        }
    }
}

impl HarnessConfig {
    /// Load from `path`, or from `pipematrix.yaml` in the working directory when it exists,
    /// or fall back to defaults. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> MatrixResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> MatrixResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MatrixError::io(path.display(), e))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text)
            .map_err(|e| MatrixError::config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(text: &str) -> MatrixResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| MatrixError::config(e.to_string()))
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(includes) = lookup(INCLUDES_ENV) {
            self.includes = includes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(run_only) = lookup(RUN_ONLY_ENV).filter(|s| !s.trim().is_empty()) {
            self.run_only = Some(run_only.trim().to_string());
        }
    }

    // ------------------------------------------------------------------------
    // Derived collaborators
    // ------------------------------------------------------------------------

    pub fn axis_set(&self) -> MatrixResult<&'static AxisSet> {
        AxisSet::named(&self.axes)
    }

    pub fn load_expectations(&self) -> MatrixResult<ExpectationStore> {
        ExpectationStore::load(&self.expectations_root, &self.expectations)
    }

    /// Configured run-only name, else the resource's `run.only` entry.
    pub fn effective_run_only(&self, store: &ExpectationStore) -> Option<String> {
        self.run_only
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| store.run_only().map(str::to_string))
    }

    pub fn platform_settings(&self) -> PlatformSettings {
        PlatformSettings {
            data_dir: self.data_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    /// Factories for every configured platform, in configured order.
    pub fn platform_factories(&self) -> MatrixResult<Vec<PlatformFactory>> {
        if self.platforms.is_empty() {
            return Err(MatrixError::config("no platforms configured"));
        }
        let settings = self.platform_settings();
        self.platforms
            .iter()
            .map(|name| platform::factory(name, &settings))
            .collect()
    }

    pub fn platform_includes(&self) -> PlatformIncludes {
        PlatformIncludes::new(&self.includes)
    }

    pub fn filter_regex(&self) -> MatrixResult<Option<Regex>> {
        self.filter
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| MatrixError::config(format!("invalid filter '{}': {}", pattern, e)))
            })
            .transpose()
    }

    pub fn executor(&self) -> CaseExecutor {
        CaseExecutor::new(self.dataset.clone(), self.dot_dir.clone())
    }
}
