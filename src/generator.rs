//! Combination Generator
//!
//! Walks the cartesian product of an [`AxisSet`] in fixed nested order (arguments outer,
//! declared middle, selected inner), names each triple, and materializes the pipes whose
//! names survive the run-only filter and have an oracle entry.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::axes::AxisSet;
use crate::errors::{MatrixError, MatrixResult};
use crate::expectations::ExpectationStore;
use crate::fields::Fields;
use crate::pipe::{AssemblyFactory, Pipe};

/// One point in the case matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTriple<'a> {
    pub arguments: &'a Fields,
    pub declared: &'a Fields,
    pub selected: &'a Fields,
}

/// Produces the un-prefixed name of a triple. Must be injective over the product.
pub type CaseNamer = fn(&AxisTriple<'_>) -> String;

/// `<arguments>_<declared>_<selected>`, e.g. `ALL_UNKNOWN_RESULTS` or `-1_'field'_SWAP`.
pub fn join_case_name(triple: &AxisTriple<'_>) -> String {
    format!(
        "{}_{}_{}",
        triple.arguments, triple.declared, triple.selected
    )
}

// ============================================================================
// CASE MAP
// ============================================================================

/// A generated case: its name and its assembled pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCase {
    pub name: String,
    pub pipe: Pipe,
}

/// Generated cases in generation order.
#[derive(Debug, Clone, Default)]
pub struct CaseMap {
    cases: Vec<PipelineCase>,
}

impl CaseMap {
    /// Append a case. A repeated name is a collision, never an overwrite.
    pub fn insert(&mut self, name: String, pipe: Pipe) -> MatrixResult<()> {
        if self.get(&name).is_some() {
            return Err(MatrixError::NameCollision { name });
        }
        self.cases.push(PipelineCase { name, pipe });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Pipe> {
        self.cases.iter().find(|c| c.name == name).map(|c| &c.pipe)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineCase> {
        self.cases.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<'a> IntoIterator for &'a CaseMap {
    type Item = &'a PipelineCase;
    type IntoIter = std::slice::Iter<'a, PipelineCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

/// SHA-256 over the ordered case names, newline separated, as lowercase hex.
pub fn fingerprint<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct CombinationGenerator<'a> {
    axes: &'a AxisSet,
    namer: CaseNamer,
    prefix: Option<String>,
    run_only: Option<String>,
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(axes: &'a AxisSet) -> Self {
        Self {
            axes,
            namer: join_case_name,
            prefix: None,
            run_only: None,
        }
    }

    pub fn with_namer(mut self, namer: CaseNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Restrict generation to a single case name (compared case-insensitively).
    pub fn with_run_only(mut self, run_only: Option<String>) -> Self {
        self.run_only = run_only.filter(|n| !n.is_empty());
        self
    }

    pub fn axes(&self) -> &AxisSet {
        self.axes
    }

    /// Every triple in generation order.
    pub fn triples(&self) -> Vec<AxisTriple<'a>> {
        let axes = self.axes;
        let mut triples = Vec::with_capacity(axes.combinations());
        for arguments in &axes.arguments {
            for declared in &axes.declared {
                for selected in &axes.selected {
                    triples.push(AxisTriple {
                        arguments,
                        declared,
                        selected,
                    });
                }
            }
        }
        triples
    }

    pub fn case_name(&self, triple: &AxisTriple<'_>) -> String {
        let name = (self.namer)(triple);
        match &self.prefix {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name,
        }
    }

    /// Names of the full product, unfiltered, in generation order.
    pub fn names(&self) -> Vec<String> {
        self.triples().iter().map(|t| self.case_name(t)).collect()
    }

    pub fn is_filtered(&self, name: &str) -> bool {
        self.run_only
            .as_deref()
            .is_some_and(|only| !only.eq_ignore_ascii_case(name))
    }

    /// Build the case map.
    ///
    /// Cases outside the run-only filter are skipped before the factory is called. Cases
    /// without an oracle entry are skipped with a debug log. Factory failures propagate.
    pub fn generate(
        &self,
        store: &ExpectationStore,
        base: &Pipe,
        factory: &dyn AssemblyFactory,
    ) -> MatrixResult<CaseMap> {
        let mut cases = CaseMap::default();

        for triple in self.triples() {
            let name = self.case_name(&triple);

            if self.is_filtered(&name) {
                continue;
            }

            if store.is_undefined(&name) {
                debug!(case = %name, resource = store.resource(), "skipping undefined case");
                continue;
            }

            let pipe = factory.create_assembly(
                base,
                triple.arguments,
                triple.declared,
                &self.axes.value,
                triple.selected,
            )?;
            cases.insert(name, pipe)?;
        }

        debug!(
            generated = cases.len(),
            combinations = self.axes.combinations(),
            "generation finished"
        );
        Ok(cases)
    }
}
