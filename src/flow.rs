//! A connected flow: source tap, planned pipe, sink tap.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{MatrixError, MatrixResult};
use crate::fields::render_layout;
use crate::planner::Plan;
use crate::platform::{Tap, TapStore};
use crate::tuple::{Tuple, Value};

pub struct Flow {
    name: String,
    platform: String,
    source: Tap,
    sink: Tap,
    plan: Plan,
    store: Arc<dyn TapStore>,
}

impl Flow {
    pub fn new(
        name: &str,
        platform: &str,
        source: Tap,
        sink: Tap,
        plan: Plan,
        store: Arc<dyn TapStore>,
    ) -> Self {
        Self {
            name: name.to_string(),
            platform: platform.to_string(),
            source,
            sink,
            plan,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the source, transform every record, and write the sink. Returns the number of
    /// records written.
    pub fn complete(&self) -> MatrixResult<usize> {
        let lines = self.store.read_lines(&self.source)?;
        let output: Vec<String> = text_records(&lines)
            .map(|record| self.plan.apply(&record).to_string())
            .collect();

        self.store.write_lines(&self.sink, &output)?;
        debug!(
            flow = %self.name,
            platform = %self.platform,
            records = output.len(),
            sink = %self.sink.identifier,
            "flow completed"
        );
        Ok(output.len())
    }

    /// Records currently in the sink, as `(offset, line)` tuples.
    pub fn open_sink(&self) -> MatrixResult<Vec<Tuple>> {
        let lines = self.store.read_lines(&self.sink)?;
        Ok(text_records(&lines).collect())
    }

    /// Render the flow as a Graphviz digraph.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape(&self.name));
        let _ = writeln!(
            dot,
            "  source [shape=box, label=\"{}\\n[{}]\"];",
            escape(&self.source.identifier),
            escape(&render_layout(self.plan.incoming()))
        );

        let mut previous = "source".to_string();
        for (i, step) in self.plan.steps().iter().enumerate() {
            let node = format!("step{}", i);
            let _ = writeln!(
                dot,
                "  {} [label=\"{}\\n[{}]\"];",
                node,
                escape(&step.label),
                escape(&render_layout(&step.outgoing))
            );
            let _ = writeln!(dot, "  {} -> {};", previous, node);
            previous = node;
        }

        let _ = writeln!(
            dot,
            "  sink [shape=box, label=\"{}\\n{:?}\"];",
            escape(&self.sink.identifier),
            self.sink.mode
        );
        let _ = writeln!(dot, "  {} -> sink;", previous);
        dot.push_str("}\n");
        dot
    }

    pub fn write_dot(&self, path: &Path) -> MatrixResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MatrixError::io(parent.display(), e))?;
        }
        std::fs::write(path, self.to_dot()).map_err(|e| MatrixError::io(path.display(), e))
    }
}

/// Text lines as `(offset, line)` records, offsets counted in bytes.
fn text_records(lines: &[String]) -> impl Iterator<Item = Tuple> + '_ {
    lines.iter().scan(0i64, |offset, line| {
        let record = Tuple::new(vec![Value::Int(*offset), Value::Str(line.clone())]);
        *offset += line.len() as i64 + 1;
        Some(record)
    })
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Fields;
    use crate::pipe::{Function, Pipe};
    use crate::platform::{MemoryPlatform, Platform, SinkMode, NUMS_20};

    fn connect(select: Fields) -> Flow {
        let platform = MemoryPlatform::new();
        let pipe = Pipe::each(
            &Pipe::head("test"),
            Fields::All,
            Function::insert(Fields::Unknown, "value"),
            select,
        );
        let source = platform.input_source(NUMS_20).unwrap();
        let sink = platform.output_sink("out", SinkMode::Replace).unwrap();
        platform.connect(&source, &sink, &pipe).unwrap()
    }

    #[test]
    fn completes_and_reads_back_records() {
        let flow = connect(Fields::Results);
        assert_eq!(flow.complete().unwrap(), 20);
        let records = flow.open_sink().unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(records[0].get(1), Some(&Value::Str("value".to_string())));
    }

    #[test]
    fn offsets_count_bytes() {
        let flow = connect(Fields::All);
        flow.complete().unwrap();
        let records = flow.open_sink().unwrap();
        // "0\t1\tvalue" is 9 bytes plus newline
        assert_eq!(records[1].get(0), Some(&Value::Int(10)));
        assert_eq!(records[1].get(1), Some(&Value::Str("2\t2\tvalue".to_string())));
    }

    #[test]
    fn dot_lists_every_step() {
        let dot = connect(Fields::Results).to_dot();
        assert!(dot.starts_with("digraph \"test\""));
        assert!(dot.contains("step0 -> sink;"));
        assert!(dot.contains("Insert[decl:UNKNOWN]['value']"));
    }
}
