//! Flow planner: resolves field selectors against a concrete layout.
//!
//! Planning is where an axis triple becomes legal or illegal. Argument selectors pick from
//! the incoming layout, the function declares its result layout, and the outgoing selector
//! picks from incoming ++ results (or applies one of the ALL/REPLACE/SWAP/RESULTS rules).

use std::collections::HashSet;

use crate::errors::{MatrixError, MatrixResult};
use crate::fields::{render_layout, FieldSlot, Fields};
use crate::pipe::{Function, Pipe};
use crate::tuple::{Tuple, Value};

/// Where an outgoing value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Incoming(usize),
    Result(usize),
}

#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    results: Vec<Value>,
    origins: Vec<Origin>,
    pub outgoing: Vec<FieldSlot>,
}

impl Step {
    fn apply(&self, incoming: &Tuple) -> Tuple {
        self.origins
            .iter()
            .map(|origin| match origin {
                Origin::Incoming(i) => incoming.get(*i).cloned().unwrap_or(Value::Null),
                Origin::Result(i) => self.results.get(*i).cloned().unwrap_or(Value::Null),
            })
            .collect()
    }
}

/// A planned pipe, ready to transform tuples.
#[derive(Debug, Clone)]
pub struct Plan {
    incoming: Vec<FieldSlot>,
    steps: Vec<Step>,
}

impl Plan {
    pub fn build(pipe: &Pipe, incoming: Vec<FieldSlot>) -> MatrixResult<Self> {
        let mut layout = incoming.clone();
        let mut steps = Vec::new();

        for node in pipe.chain() {
            if let Pipe::Each {
                arguments,
                function,
                outgoing,
                ..
            } = node
            {
                let step = plan_each(&layout, arguments, function, outgoing)?;
                layout = step.outgoing.clone();
                steps.push(step);
            }
        }

        Ok(Self { incoming, steps })
    }

    pub fn incoming(&self) -> &[FieldSlot] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[FieldSlot] {
        self.steps
            .last()
            .map(|s| s.outgoing.as_slice())
            .unwrap_or(&self.incoming)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn apply(&self, tuple: &Tuple) -> Tuple {
        self.steps
            .iter()
            .fold(tuple.clone(), |current, step| step.apply(&current))
    }
}

// ============================================================================
// PLANNING
// ============================================================================

fn plan_each(
    layout: &[FieldSlot],
    arguments: &Fields,
    function: &Function,
    outgoing: &Fields,
) -> MatrixResult<Step> {
    let argument_positions = select(arguments, layout, "argument")?;
    let argument_layout: Vec<FieldSlot> = argument_positions
        .iter()
        .map(|&i| layout[i].clone())
        .collect();

    let Function::Insert { declared, value } = function;
    let result_layout = declare(declared, &argument_layout)?;
    let results = vec![value.clone(); result_layout.len()];

    let origins = route(outgoing, layout, &argument_positions, &result_layout)?;
    let outgoing_layout: Vec<FieldSlot> = origins
        .iter()
        .enumerate()
        .map(|(position, origin)| match origin {
            Origin::Incoming(i) => layout[*i].clone(),
            Origin::Result(i) => {
                // REPLACE keeps the incoming name when the result slot is anonymous
                result_layout[*i]
                    .clone()
                    .or_else(|| match outgoing {
                        Fields::Replace => layout.get(position).cloned().flatten(),
                        _ => None,
                    })
            }
        })
        .collect();

    Ok(Step {
        label: format!("Each({})[{}]", arguments, function),
        results,
        origins,
        outgoing: outgoing_layout,
    })
}

/// Result layout declared by a function.
fn declare(declared: &Fields, argument_layout: &[FieldSlot]) -> MatrixResult<Vec<FieldSlot>> {
    match declared {
        Fields::Names(names) => Ok(names.iter().cloned().map(Some).collect()),
        Fields::Positions(positions) => Ok(vec![None; positions.len()]),
        Fields::Unknown | Fields::Values => Ok(vec![None]),
        Fields::Args => Ok(argument_layout.to_vec()),
        other => Err(MatrixError::InvalidSelector {
            selector: other.to_string(),
            role: "declaration",
        }),
    }
}

fn route(
    outgoing: &Fields,
    layout: &[FieldSlot],
    arguments: &[usize],
    results: &[FieldSlot],
) -> MatrixResult<Vec<Origin>> {
    let all_incoming = (0..layout.len()).map(Origin::Incoming);
    let all_results = (0..results.len()).map(Origin::Result);

    let origins: Vec<Origin> = match outgoing {
        Fields::Results => all_results.collect(),
        Fields::All => all_incoming.chain(all_results).collect(),
        Fields::Swap => all_incoming
            .filter(|o| !matches!(o, Origin::Incoming(i) if arguments.contains(i)))
            .chain(all_results)
            .collect(),
        Fields::Replace => {
            if results.len() != arguments.len() {
                return Err(MatrixError::ArityMismatch {
                    operation: "REPLACE",
                    expected: arguments.len(),
                    actual: results.len(),
                });
            }
            (0..layout.len())
                .map(|i| match arguments.iter().position(|a| *a == i) {
                    Some(k) => Origin::Result(k),
                    None => Origin::Incoming(i),
                })
                .collect()
        }
        Fields::Positions(_) | Fields::Names(_) => {
            let combined: Vec<FieldSlot> = layout.iter().chain(results).cloned().collect();
            return Ok(select(outgoing, &combined, "outgoing")?
                .into_iter()
                .map(|i| {
                    if i < layout.len() {
                        Origin::Incoming(i)
                    } else {
                        Origin::Result(i - layout.len())
                    }
                })
                .collect());
        }
        other => {
            return Err(MatrixError::InvalidSelector {
                selector: other.to_string(),
                role: "outgoing",
            })
        }
    };

    if !matches!(outgoing, Fields::Results | Fields::Replace) {
        let slots: Vec<FieldSlot> = origins
            .iter()
            .map(|o| match o {
                Origin::Incoming(i) => layout[*i].clone(),
                Origin::Result(i) => results[*i].clone(),
            })
            .collect();
        ensure_unique(&slots)?;
    }

    Ok(origins)
}

/// Resolve a concrete selector to positions in `layout`.
fn select(fields: &Fields, layout: &[FieldSlot], role: &'static str) -> MatrixResult<Vec<usize>> {
    match fields {
        Fields::All => Ok((0..layout.len()).collect()),
        Fields::Positions(positions) => positions
            .iter()
            .map(|&p| {
                let index = if p < 0 { layout.len() as isize + p } else { p };
                if index < 0 || index as usize >= layout.len() {
                    Err(MatrixError::FieldNotFound {
                        field: p.to_string(),
                        layout: render_layout(layout),
                    })
                } else {
                    Ok(index as usize)
                }
            })
            .collect(),
        Fields::Names(names) => names
            .iter()
            .map(|name| {
                let matches: Vec<usize> = layout
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.as_deref() == Some(name.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                match matches.as_slice() {
                    [single] => Ok(*single),
                    [] => Err(MatrixError::FieldNotFound {
                        field: format!("'{}'", name),
                        layout: render_layout(layout),
                    }),
                    _ => Err(MatrixError::AmbiguousField {
                        field: format!("'{}'", name),
                        layout: render_layout(layout),
                    }),
                }
            })
            .collect(),
        other => Err(MatrixError::InvalidSelector {
            selector: other.to_string(),
            role,
        }),
    }
}

fn ensure_unique(layout: &[FieldSlot]) -> MatrixResult<()> {
    let mut seen = HashSet::new();
    for name in layout.iter().flatten() {
        if !seen.insert(name.as_str()) {
            return Err(MatrixError::AmbiguousField {
                field: format!("'{}'", name),
                layout: render_layout(layout),
            });
        }
    }
    Ok(())
}
