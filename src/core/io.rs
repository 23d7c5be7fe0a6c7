use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::core::automaton::{DEFAULT_OUTPUT, MachineKind, NULL_STATE, StateId};
use crate::core::machine::Machine;
use crate::errors::FsmError;

impl Machine {
    /// The standard file stem of this machine: variant name, an `R`/`U`
    /// reduced marker, and the number of states.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}{}",
            self.kind.name(),
            if self.reduced { 'R' } else { 'U' },
            self.num_states
        )
    }

    /// Saves the machine into `dir` as whitespace-separated text.
    ///
    /// The file name is [`file_stem`](Machine::file_stem) with the `fsm`
    /// extension, uniquified with a random suffix if taken. Row ids in the
    /// format are dense by construction, so a machine with holes in its id
    /// space is written with its live ids relabeled densely in ascending
    /// order; the machine itself is not mutated. Returns the path written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, FsmError> {
        let path = unique_path(dir, &self.file_stem(), "fsm");
        let mut file = BufWriter::new(fs::File::create(&path)?);
        let view = DenseView::new(self);

        writeln!(file, "{} {}", self.kind.tag(), u32::from(self.reduced))?;
        if self.kind == MachineKind::Dfsm {
            writeln!(
                file,
                "{} {} {}",
                self.num_states, self.num_inputs, self.num_outputs
            )?;
        } else {
            writeln!(
                file,
                "{} {} {} {}",
                self.num_states, self.num_inputs, self.num_outputs, self.num_states
            )?;
        }

        if self.kind.has_state_outputs() {
            for (id, &old) in view.order.iter().enumerate() {
                writeln!(file, "{id} {}", self.state_outputs[old as usize])?;
            }
        }
        if self.kind.has_transition_outputs() {
            for (id, &old) in view.order.iter().enumerate() {
                write!(file, "{id}")?;
                for input in 0..self.num_inputs as usize {
                    write!(file, "\t{}", self.transition_outputs[old as usize][input])?;
                }
                writeln!(file)?;
            }
        }
        for (id, &old) in view.order.iter().enumerate() {
            write!(file, "{id}")?;
            for input in 0..self.num_inputs as usize {
                write!(file, "\t{}", view.relabel(self.transitions[old as usize][input]))?;
            }
            writeln!(file)?;
        }
        file.flush()?;
        Ok(path)
    }

    /// Loads a machine from a file produced by [`save`](Machine::save).
    ///
    /// The variant is taken from the header tag. Every invariant of the
    /// data model is validated; the first violation aborts the load.
    pub fn load(path: &Path) -> Result<Self, FsmError> {
        let text = fs::read_to_string(path)?;
        let mut tokens = Tokens::new(&text);

        let tag = tokens.next_u32("machine type tag")?;
        let kind = MachineKind::from_tag(tag)
            .ok_or_else(|| FsmError::Parse(format!("unknown machine type tag {tag}")))?;
        let reduced = match tokens.next_u32("reduced flag")? {
            0 => false,
            1 => true,
            other => {
                return Err(FsmError::Parse(format!(
                    "reduced flag must be 0 or 1, found {other}"
                )));
            }
        };
        let states = tokens.next_u32("number of states")?;
        let inputs = tokens.next_u32("number of inputs")?;
        let outputs = tokens.next_u32("number of outputs")?;
        for (dimension, value) in [("states", states), ("inputs", inputs), ("outputs", outputs)] {
            if value == 0 {
                return Err(FsmError::Parse(format!(
                    "the number of {dimension} must be greater than 0"
                )));
            }
        }
        let bound = kind.max_outputs(states, inputs);
        if outputs > bound {
            return Err(FsmError::Parse(format!(
                "the number of outputs cannot exceed {bound} for a {kind} machine"
            )));
        }
        let greatest = if kind == MachineKind::Dfsm {
            states
        } else {
            let greatest = tokens.next_u32("greatest state id")?;
            if greatest < states {
                return Err(FsmError::Parse(format!(
                    "greatest state id {greatest} is smaller than the number of states {states}"
                )));
            }
            greatest
        };

        let mut machine = Machine {
            kind,
            num_states: states,
            num_inputs: inputs,
            num_outputs: outputs,
            used: {
                let mut used = vec![false; greatest as usize];
                used[..states as usize].fill(true);
                used
            },
            transitions: vec![vec![NULL_STATE; inputs as usize]; states as usize],
            state_outputs: if kind.has_state_outputs() {
                vec![DEFAULT_OUTPUT; states as usize]
            } else {
                Vec::new()
            },
            transition_outputs: if kind.has_transition_outputs() {
                vec![vec![DEFAULT_OUTPUT; inputs as usize]; states as usize]
            } else {
                Vec::new()
            },
            reduced,
        };

        if kind.has_state_outputs() {
            machine.read_state_outputs(&mut tokens)?;
        }
        if kind.has_transition_outputs() {
            machine.read_transition_outputs(&mut tokens)?;
        }
        machine.read_transitions(&mut tokens)?;
        Ok(machine)
    }

    fn read_state_outputs(&mut self, tokens: &mut Tokens<'_>) -> Result<(), FsmError> {
        for state in 0..self.num_states {
            tokens.expect_row_id(state, "state output")?;
            let output = tokens.next_u32("state output value")?;
            if output != DEFAULT_OUTPUT && output >= self.num_outputs {
                return Err(FsmError::Parse(format!(
                    "state {state} carries output {output}, outside the alphabet of {}",
                    self.num_outputs
                )));
            }
            self.state_outputs[state as usize] = output;
        }
        Ok(())
    }

    fn read_transition_outputs(&mut self, tokens: &mut Tokens<'_>) -> Result<(), FsmError> {
        for state in 0..self.num_states {
            tokens.expect_row_id(state, "transition output")?;
            for input in 0..self.num_inputs as usize {
                let output = tokens.next_u32("transition output value")?;
                if output != DEFAULT_OUTPUT && output >= self.num_outputs {
                    return Err(FsmError::Parse(format!(
                        "transition of state {state} carries output {output}, outside the alphabet of {}",
                        self.num_outputs
                    )));
                }
                self.transition_outputs[state as usize][input] = output;
            }
        }
        Ok(())
    }

    fn read_transitions(&mut self, tokens: &mut Tokens<'_>) -> Result<(), FsmError> {
        for state in 0..self.num_states {
            tokens.expect_row_id(state, "transition")?;
            for input in 0..self.num_inputs as usize {
                let target = tokens.next_u32("transition target")?;
                if target != NULL_STATE && target >= self.num_states {
                    return Err(FsmError::Parse(format!(
                        "state {state} has a transition to unknown state {target}"
                    )));
                }
                self.transitions[state as usize][input] = target;
            }
        }
        Ok(())
    }
}

/// Ascending live ids and the dense relabeling the serializer writes through.
pub(crate) struct DenseView {
    pub(crate) order: Vec<StateId>,
    new_ids: Vec<StateId>,
}

impl DenseView {
    pub(crate) fn new(machine: &Machine) -> Self {
        let order = machine.states();
        let mut new_ids = vec![NULL_STATE; machine.used.len()];
        for (new_id, &old) in order.iter().enumerate() {
            new_ids[old as usize] = new_id as StateId;
        }
        Self { order, new_ids }
    }

    pub(crate) fn relabel(&self, target: StateId) -> StateId {
        if target == NULL_STATE {
            NULL_STATE
        } else {
            self.new_ids[target as usize]
        }
    }
}

/// Sequential token reader over the whitespace-separated model format.
struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
        }
    }

    fn next_u32(&mut self, what: &str) -> Result<u32, FsmError> {
        let token = self
            .iter
            .next()
            .ok_or_else(|| FsmError::Parse(format!("unexpected end of file reading {what}")))?;
        token
            .parse()
            .map_err(|_| FsmError::Parse(format!("expected {what}, found {token:?}")))
    }

    fn expect_row_id(&mut self, state: StateId, block: &str) -> Result<(), FsmError> {
        let id = self.next_u32("row state id")?;
        if id != state {
            return Err(FsmError::Parse(format!(
                "{block} row {state} is labelled {id}"
            )));
        }
        Ok(())
    }
}

/// Joins `dir`, `stem`, and `extension` into a path that does not exist yet,
/// appending a random five-character alphanumeric suffix until it is free.
pub(crate) fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.{extension}"));
    let mut rng = rand::thread_rng();
    while path.exists() {
        let suffix: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        path = dir.join(format!("{stem}_{suffix}.{extension}"));
    }
    path
}
