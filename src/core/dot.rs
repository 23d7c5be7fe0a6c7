use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::automaton::{DEFAULT_OUTPUT, NULL_STATE, OutputId};
use crate::core::io::unique_path;
use crate::core::machine::Machine;
use crate::errors::FsmError;

impl Machine {
    /// Writes the machine as a DOT graph description into `dir`.
    ///
    /// One left-to-right node per live state, labelled with its id and, for
    /// variants with state outputs, the output on a second line; one edge
    /// per defined transition, labelled `input` or `input / output`
    /// depending on the variant. The file name follows
    /// [`file_stem`](Machine::file_stem) with the `dot` extension and the
    /// usual uniquification. Returns the path written.
    pub fn write_dot(&self, dir: &Path) -> Result<PathBuf, FsmError> {
        let path = unique_path(dir, &self.file_stem(), "dot");
        let mut file = BufWriter::new(fs::File::create(&path)?);
        writeln!(file, "digraph {{ rankdir=LR;")?;
        for state in self.states() {
            if self.kind.has_state_outputs() {
                writeln!(
                    file,
                    "{state} [label=\"{state}\\n{}\"];",
                    label(self.state_outputs[state as usize])
                )?;
            } else {
                writeln!(file, "{state} [label=\"{state}\"];")?;
            }
        }
        for state in self.states() {
            for input in 0..self.num_inputs as usize {
                let target = self.transitions[state as usize][input];
                if target == NULL_STATE {
                    continue;
                }
                if self.kind.has_transition_outputs() {
                    writeln!(
                        file,
                        "{state} -> {target} [label=\"{input} / {}\"];",
                        label(self.transition_outputs[state as usize][input])
                    )?;
                } else {
                    writeln!(file, "{state} -> {target} [label=\"{input}\"];")?;
                }
            }
        }
        writeln!(file, "}}")?;
        file.flush()?;
        Ok(path)
    }
}

/// An output rendered for a DOT label; `-` stands for an unassigned output.
fn label(output: OutputId) -> String {
    if output == DEFAULT_OUTPUT {
        "-".to_string()
    } else {
        output.to_string()
    }
}
