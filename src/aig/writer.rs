use std::io::Write;

use crate::{Aig, AigNode, Result};

impl Aig {
    /// Writes the circuit in the ASCII AIGER format.
    ///
    /// Only the and gates reachable from an output are written, in topological order.
    /// Input and output names come out as symbols, the comments after a `c` line.
    pub fn write_ascii(&mut self, mut w: impl Write) -> Result<()> {
        let ands = self.and_gates();

        writeln!(
            w,
            "aag {} {} 0 {} {}",
            self.max_var,
            self.inputs.len(),
            self.outputs.len(),
            ands.len()
        )?;
        for &id in &self.inputs {
            writeln!(w, "{}", 2 * id)?;
        }
        for fanin in self.get_output_fanins() {
            writeln!(w, "{}", fanin.to_literal())?;
        }
        for &id in &ands {
            if let Some(&AigNode::And { fanin0, fanin1, .. }) = self.get_node(id) {
                writeln!(
                    w,
                    "{} {} {}",
                    2 * id,
                    fanin0.to_literal(),
                    fanin1.to_literal()
                )?;
            }
        }

        for (kind, ports) in [('i', &self.inputs), ('o', &self.outputs)] {
            for (pos, &id) in ports.iter().enumerate() {
                if let Some(name) = self.get_node(id).and_then(AigNode::get_name) {
                    writeln!(w, "{}{} {}", kind, pos, name)?;
                }
            }
        }

        if !self.comments.is_empty() {
            writeln!(w, "c")?;
            for comment in &self.comments {
                writeln!(w, "{}", comment)?;
            }
        }
        Ok(())
    }
}
