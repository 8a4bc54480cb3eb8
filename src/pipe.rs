//! Pipe assemblies and the factory boundary that builds them.
//!
//! A [`Pipe`] is an immutable description of a transformation. It is never executed
//! directly: a platform plans it against a source layout when a flow is connected, which is
//! where illegal field combinations surface.

use std::fmt;
use std::sync::Arc;

use crate::errors::MatrixResult;
use crate::fields::Fields;
use crate::tuple::Value;

/// An operation applied by an [`Pipe::Each`].
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// Emit `value` once for every declared field.
    Insert { declared: Fields, value: Value },
}

impl Function {
    pub fn insert(declared: Fields, value: impl Into<Value>) -> Self {
        Function::Insert {
            declared,
            value: value.into(),
        }
    }

    pub fn declared(&self) -> &Fields {
        match self {
            Function::Insert { declared, .. } => declared,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Insert { declared, value } => {
                write!(f, "Insert[decl:{}][{}]", declared, value.print())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pipe {
    /// Start of an assembly; bound to a source tap when connected.
    Head { name: String },
    Each {
        name: String,
        previous: Arc<Pipe>,
        arguments: Fields,
        function: Function,
        outgoing: Fields,
    },
}

impl Pipe {
    pub fn head(name: impl Into<String>) -> Self {
        Pipe::Head { name: name.into() }
    }

    /// Append an `Each` to `previous`; the new pipe inherits its name.
    pub fn each(previous: &Pipe, arguments: Fields, function: Function, outgoing: Fields) -> Self {
        Pipe::Each {
            name: previous.name().to_string(),
            previous: Arc::new(previous.clone()),
            arguments,
            function,
            outgoing,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Pipe::Head { name } | Pipe::Each { name, .. } => name,
        }
    }

    pub fn previous(&self) -> Option<&Pipe> {
        match self {
            Pipe::Head { .. } => None,
            Pipe::Each { previous, .. } => Some(previous),
        }
    }

    /// Every pipe from the head to `self`, head first.
    pub fn chain(&self) -> Vec<&Pipe> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(previous) = current.previous() {
            chain.push(previous);
            current = previous;
        }
        chain.reverse();
        chain
    }
}

// ============================================================================
// ASSEMBLY FACTORY
// ============================================================================

/// Builds one concrete assembly for an axis triple.
///
/// Implementations may reject a combination. The caller does not validate triples itself.
pub trait AssemblyFactory {
    fn create_assembly(
        &self,
        pipe: &Pipe,
        arguments: &Fields,
        declared: &Fields,
        value: &str,
        outgoing: &Fields,
    ) -> MatrixResult<Pipe>;
}

impl<F> AssemblyFactory for F
where
    F: Fn(&Pipe, &Fields, &Fields, &str, &Fields) -> MatrixResult<Pipe>,
{
    fn create_assembly(
        &self,
        pipe: &Pipe,
        arguments: &Fields,
        declared: &Fields,
        value: &str,
        outgoing: &Fields,
    ) -> MatrixResult<Pipe> {
        self(pipe, arguments, declared, value, outgoing)
    }
}

/// `Each(pipe, arguments, Insert(declared, value), outgoing)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EachInsertFactory;

impl AssemblyFactory for EachInsertFactory {
    fn create_assembly(
        &self,
        pipe: &Pipe,
        arguments: &Fields,
        declared: &Fields,
        value: &str,
        outgoing: &Fields,
    ) -> MatrixResult<Pipe> {
        Ok(Pipe::each(
            pipe,
            arguments.clone(),
            Function::insert(declared.clone(), value),
            outgoing.clone(),
        ))
    }
}
