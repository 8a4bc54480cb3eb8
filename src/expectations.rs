//! Expectation Store
//!
//! A flat key/value oracle table keyed by case name. Lookups are plain key concatenation:
//!
//! - `<case>.tuple`    expected first-record value, as a bracketed tuple literal
//! - `<case>.length`   expected record count (`-1` means unbounded), falling back to `default.length`
//! - `<case>.ERROR`    present when the case must fail during execution
//! - `<case>.writedot` present when a diagnostic graph should be written
//! - `run.only`        narrows generation to a single case name
//!
//! Absence of a key is meaningful. A case with neither `.tuple` nor `.ERROR` is *undefined*
//! and gets skipped rather than failed.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{MatrixError, MatrixResult};
use crate::syntax::parse_properties;
use crate::tuple::Tuple;

pub const RUN_ONLY_KEY: &str = "run.only";
pub const DEFAULT_LENGTH_KEY: &str = "default.length";

pub const TUPLE_SUFFIX: &str = ".tuple";
pub const LENGTH_SUFFIX: &str = ".length";
pub const ERROR_SUFFIX: &str = ".ERROR";
pub const WRITE_DOT_SUFFIX: &str = ".writedot";

const CASE_SUFFIXES: [&str; 4] = [TUPLE_SUFFIX, LENGTH_SUFFIX, ERROR_SUFFIX, WRITE_DOT_SUFFIX];

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ExpectationStore {
    resource: String,
    entries: HashMap<String, String>,
}

impl ExpectationStore {
    /// Locate `resource` under `root` and load it.
    ///
    /// `resource` may be a path relative to `root`, or a bare file name found anywhere
    /// beneath it (first match in sorted walk order).
    pub fn load<P: AsRef<Path>>(root: P, resource: &str) -> MatrixResult<Self> {
        let path = Self::locate(root.as_ref(), resource)?;
        let text = std::fs::read_to_string(&path).map_err(|e| MatrixError::io(path.display(), e))?;
        Self::from_text(resource, &text)
    }

    /// Build a store from resource text already in memory.
    pub fn from_text(resource: &str, text: &str) -> MatrixResult<Self> {
        let entries = parse_properties(resource, text)?.into_iter().collect();
        Ok(Self {
            resource: resource.to_string(),
            entries,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn run_only(&self) -> Option<&str> {
        self.get(RUN_ONLY_KEY).map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn tuple(&self, name: &str) -> Option<&str> {
        self.get(&format!("{}{}", name, TUPLE_SUFFIX))
    }

    /// Case-specific length, else `default.length`.
    pub fn length(&self, name: &str) -> Option<&str> {
        self.get(&format!("{}{}", name, LENGTH_SUFFIX))
            .or_else(|| self.get(DEFAULT_LENGTH_KEY))
    }

    pub fn is_error(&self, name: &str) -> bool {
        self.contains(&format!("{}{}", name, ERROR_SUFFIX))
    }

    pub fn is_write_dot(&self, name: &str) -> bool {
        self.contains(&format!("{}{}", name, WRITE_DOT_SUFFIX))
    }

    pub fn is_undefined(&self, name: &str) -> bool {
        !self.is_error(name) && self.tuple(name).is_none()
    }

    /// Case names referenced by any per-case key, sorted. Reserved keys are not cases.
    pub fn referenced_cases(&self) -> BTreeSet<&str> {
        self.entries
            .keys()
            .filter(|key| !matches!(key.as_str(), DEFAULT_LENGTH_KEY | RUN_ONLY_KEY))
            .filter_map(|key| {
                CASE_SUFFIXES
                    .iter()
                    .find_map(|suffix| key.strip_suffix(suffix))
            })
            .collect()
    }

    fn locate(root: &Path, resource: &str) -> MatrixResult<PathBuf> {
        let direct = root.join(resource);
        if direct.is_file() {
            return Ok(direct);
        }

        let wanted = Path::new(resource).file_name();
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && Some(e.file_name()) == wanted)
            .map(|e| e.path().to_path_buf())
            .ok_or_else(|| MatrixError::ResourceNotFound {
                resource: resource.to_string(),
                root: root.display().to_string(),
            })
    }
}

// ============================================================================
// ORACLE
// ============================================================================

/// Expected record count for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    Exact(usize),
    /// `-1`: any number of records.
    Unbounded,
    /// Neither `<case>.length` nor `default.length` exists.
    Missing,
}

/// The resolved expectations for one case.
#[derive(Debug, Clone, PartialEq)]
pub struct Oracle {
    pub key: String,
    pub tuple: Option<Tuple>,
    pub length: ExpectedLength,
    pub expect_error: bool,
    pub write_dot: bool,
}

impl Oracle {
    /// Resolve the oracle for `key`.
    ///
    /// Malformed `.tuple` or `.length` values are configuration errors. A missing length is
    /// not an error here; it only fails if the length assertion is reached.
    pub fn resolve(store: &ExpectationStore, key: &str) -> MatrixResult<Self> {
        let tuple = store
            .tuple(key)
            .map(|text| Tuple::parse(&format!("{}{}", key, TUPLE_SUFFIX), text))
            .transpose()?;

        let length = match store.length(key) {
            None => ExpectedLength::Missing,
            Some(text) => parse_length(key, text)?,
        };

        Ok(Self {
            key: key.to_string(),
            tuple,
            length,
            expect_error: store.is_error(key),
            write_dot: store.is_write_dot(key),
        })
    }
}

// ============================================================================
// CHECK
// ============================================================================

/// Problems found by validating a resource against the names of a case product.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Cases whose `.tuple` or `.length` literal does not parse.
    pub malformed: Vec<MatrixError>,
    /// Referenced case names that the product never generates.
    pub orphans: Vec<String>,
    /// Generated names with neither `.tuple` nor `.ERROR`.
    pub undefined: Vec<String>,
}

impl CheckReport {
    /// Undefined cases are reported but do not fail a check.
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty() && self.orphans.is_empty()
    }
}

impl ExpectationStore {
    pub fn check<S: AsRef<str>>(&self, case_names: &[S]) -> CheckReport {
        let known: BTreeSet<&str> = case_names.iter().map(AsRef::as_ref).collect();
        let referenced = self.referenced_cases();

        let malformed = referenced
            .iter()
            .filter_map(|name| Oracle::resolve(self, name).err())
            .collect();
        let orphans = referenced
            .iter()
            .filter(|name| !known.contains(*name))
            .map(|name| name.to_string())
            .collect();
        let undefined = case_names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.is_undefined(name))
            .map(str::to_string)
            .collect();

        CheckReport {
            malformed,
            orphans,
            undefined,
        }
    }
}

fn parse_length(key: &str, text: &str) -> MatrixResult<ExpectedLength> {
    let malformed = || MatrixError::MalformedLength {
        key: format!("{}{}", key, LENGTH_SUFFIX),
        value: text.to_string(),
    };
    match text.trim().parse::<i64>().map_err(|_| malformed())? {
        -1 => Ok(ExpectedLength::Unbounded),
        n if n >= 0 => Ok(ExpectedLength::Exact(n as usize)),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
default.length=20
ALL_UNKNOWN_RESULTS.tuple=['value']
ALL_UNKNOWN_RESULTS.length=20
0_ARGS_ALL.ERROR=
-1_'field'_RESULTS.length=5
-1_'field'_RESULTS.writedot=
";

    #[test]
    fn lookups_concatenate_suffixes() {
        let store = ExpectationStore::from_text("op.properties", TABLE).unwrap();
        assert_eq!(store.tuple("ALL_UNKNOWN_RESULTS"), Some("['value']"));
        assert!(store.is_error("0_ARGS_ALL"));
        assert!(store.is_write_dot("-1_'field'_RESULTS"));
        assert!(!store.is_write_dot("ALL_UNKNOWN_RESULTS"));
    }

    #[test]
    fn length_falls_back_to_default() {
        let store = ExpectationStore::from_text("op.properties", TABLE).unwrap();
        assert_eq!(store.length("-1_'field'_RESULTS"), Some("5"));
        assert_eq!(store.length("never_mentioned"), Some("20"));

        let bare = ExpectationStore::from_text("bare", "x.tuple=['a']").unwrap();
        assert_eq!(bare.length("x"), None);
        let oracle = Oracle::resolve(&bare, "x").unwrap();
        assert_eq!(oracle.length, ExpectedLength::Missing);
    }

    #[test]
    fn undefined_means_no_tuple_and_no_error() {
        let store = ExpectationStore::from_text("op.properties", TABLE).unwrap();
        assert!(!store.is_undefined("ALL_UNKNOWN_RESULTS"));
        assert!(!store.is_undefined("0_ARGS_ALL"));
        // a length alone does not define a case
        assert!(store.is_undefined("-1_'field'_RESULTS"));
    }

    #[test]
    fn oracle_resolution() {
        let store = ExpectationStore::from_text("op.properties", TABLE).unwrap();
        let oracle = Oracle::resolve(&store, "ALL_UNKNOWN_RESULTS").unwrap();
        assert_eq!(oracle.length, ExpectedLength::Exact(20));
        assert_eq!(oracle.tuple.map(|t| t.to_string()), Some("value".to_string()));
        assert!(!oracle.expect_error);

        let unbounded = ExpectationStore::from_text("r", "a.tuple=[1]\na.length=-1").unwrap();
        assert_eq!(
            Oracle::resolve(&unbounded, "a").unwrap().length,
            ExpectedLength::Unbounded
        );
    }

    #[test]
    fn malformed_values_are_configuration_errors() {
        let store = ExpectationStore::from_text("r", "a.tuple=['x'\nb.tuple=[1]\nb.length=ten").unwrap();
        assert!(matches!(
            Oracle::resolve(&store, "a"),
            Err(MatrixError::MalformedTuple { .. })
        ));
        assert!(matches!(
            Oracle::resolve(&store, "b"),
            Err(MatrixError::MalformedLength { .. })
        ));
    }

    #[test]
    fn referenced_cases_strip_suffixes() {
        let store = ExpectationStore::from_text("op.properties", TABLE).unwrap();
        let cases: Vec<&str> = store.referenced_cases().into_iter().collect();
        assert_eq!(cases, vec!["-1_'field'_RESULTS", "0_ARGS_ALL", "ALL_UNKNOWN_RESULTS"]);
    }

    #[test]
    fn check_reports_orphans_undefined_and_malformed() {
        let store = ExpectationStore::from_text(
            "op.properties",
            "ALL_UNKNOWN_RESULTS.tuple=['value']\nALL_UNKNOWN_ALL.tuple=[broken\nTYPO_CASE.ERROR=\n",
        )
        .unwrap();
        let names = ["ALL_UNKNOWN_RESULTS", "ALL_UNKNOWN_ALL", "ALL_UNKNOWN_SWAP"];
        let report = store.check(&names);

        assert_eq!(report.orphans, vec!["TYPO_CASE".to_string()]);
        assert_eq!(report.undefined, vec!["ALL_UNKNOWN_SWAP".to_string()]);
        assert_eq!(report.malformed.len(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn reserved_keys_are_not_orphans() {
        let store = ExpectationStore::from_text(
            "op.properties",
            "default.length=20\nrun.only=A_B_C\nA_B_C.tuple=['value']\n",
        )
        .unwrap();
        let report = store.check(&["A_B_C"]);
        assert!(report.orphans.is_empty(), "orphans: {:?}", report.orphans);
        assert!(report.is_clean());
    }

    #[test]
    fn run_only_is_trimmed() {
        let store = ExpectationStore::from_text("r", "run.only = ALL_UNKNOWN_RESULTS  ").unwrap();
        assert_eq!(store.run_only(), Some("ALL_UNKNOWN_RESULTS"));
        let empty = ExpectationStore::from_text("r", "run.only=").unwrap();
        assert_eq!(empty.run_only(), None);
    }
}
