pub use crate::errors::{MatrixError, MatrixResult};
pub use crate::executor::{CaseExecutor, CaseFailure, CaseOutcome};
pub use crate::expectations::{ExpectationStore, ExpectedLength, Oracle};
pub use crate::fields::Fields;
pub use crate::generator::{CaseMap, CombinationGenerator};
pub use crate::pipe::{AssemblyFactory, EachInsertFactory, Function, Pipe};
pub use crate::platform::{Platform, PlatformFactory, PlatformIncludes, SinkMode};
pub use crate::suite::{PlatformCase, SuiteAssembler, TestSuite};
pub use crate::tuple::{Tuple, Value};

pub mod axes;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod expectations;
pub mod fields;
pub mod flow;
pub mod generator;
pub mod pipe;
pub mod planner;
pub mod platform;
pub mod runner;
pub mod suite;
pub mod syntax;
pub mod tuple;
