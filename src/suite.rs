//! Suite Assembler
//!
//! Binds every generated case to every configured platform, producing one executable
//! [`PlatformCase`] per (case, platform) pair.

use std::fmt;

use tracing::{debug, info};

use crate::errors::MatrixResult;
use crate::expectations::{ExpectationStore, Oracle};
use crate::generator::CaseMap;
use crate::pipe::Pipe;
use crate::platform::{Platform, PlatformFactory, PlatformIncludes};

/// One case bound to one platform instance.
pub struct PlatformCase {
    display_name: String,
    key: String,
    pipe: Pipe,
    oracle: Oracle,
    platform: Box<dyn Platform>,
}

impl PlatformCase {
    pub fn new(key: &str, pipe: Pipe, oracle: Oracle, platform: Box<dyn Platform>) -> Self {
        Self {
            display_name: display_name(key, platform.name()),
            key: key.to_string(),
            pipe,
            oracle,
            platform,
        }
    }

    /// `<case>[<platform>]`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pipe(&self) -> &Pipe {
        &self.pipe
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }
}

impl fmt::Debug for PlatformCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformCase")
            .field("display_name", &self.display_name)
            .field("oracle", &self.oracle)
            .finish()
    }
}

pub fn display_name(key: &str, platform: &str) -> String {
    format!("{}[{}]", key, platform)
}

/// An ordered collection of executable cases.
#[derive(Debug, Default)]
pub struct TestSuite {
    name: String,
    cases: Vec<PlatformCase>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_case(&mut self, case: PlatformCase) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[PlatformCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

// ============================================================================
// ASSEMBLER
// ============================================================================

pub struct SuiteAssembler<'a> {
    platforms: &'a [PlatformFactory],
    includes: &'a PlatformIncludes,
}

impl<'a> SuiteAssembler<'a> {
    pub fn new(platforms: &'a [PlatformFactory], includes: &'a PlatformIncludes) -> Self {
        Self {
            platforms,
            includes,
        }
    }

    /// Add one case per (generated case, included platform) to `suite`, in case order then
    /// platform order. Returns the number of cases added.
    ///
    /// Platform construction and oracle resolution errors are fatal to the whole pass.
    pub fn assemble(
        &self,
        store: &ExpectationStore,
        cases: &CaseMap,
        suite: &mut TestSuite,
    ) -> MatrixResult<usize> {
        let before = suite.len();

        for case in cases {
            if store.is_undefined(&case.name) {
                debug!(case = %case.name, "skipping undefined case");
                continue;
            }

            let oracle = Oracle::resolve(store, &case.name)?;

            for make_platform in self.platforms {
                let platform = make_platform()?;
                let platform_name = platform.name().to_string();

                info!(platform = %platform_name, case = %case.name, "installing platform");

                if !self.includes.is_included(&platform_name) {
                    debug!(platform = %platform_name, case = %case.name, "platform not included, skipping");
                    continue;
                }

                suite.add_case(PlatformCase::new(
                    &case.name,
                    case.pipe.clone(),
                    oracle.clone(),
                    platform,
                ));
            }
        }

        Ok(suite.len() - before)
    }
}
