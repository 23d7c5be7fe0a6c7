use tracing::warn;

use crate::core::automaton::{
    DEFAULT_OUTPUT, InputId, MachineKind, NULL_STATE, OutputId, STOUT_INPUT, StateId, WRONG_OUTPUT,
    WRONG_STATE,
};
use crate::core::seq::OutputSeq;
use crate::errors::FsmError;

/// A deterministic finite-state machine of any of the four variants.
///
/// Storage is dense: one transition row (and, where the variant has them,
/// one transition-output row) per allocated state id, together with a
/// used-id bitmap. Removed ids leave inert rows behind and are recycled by
/// [`add_state`](Machine::add_state), so the allocated id space can be
/// larger than the number of live states until
/// [`make_compact`](Machine::make_compact) re-densifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub(crate) kind: MachineKind,
    pub(crate) num_states: StateId,
    pub(crate) num_inputs: InputId,
    pub(crate) num_outputs: OutputId,
    /// Used-id bitmap over the allocated id space; exactly `num_states` bits set.
    pub(crate) used: Vec<bool>,
    pub(crate) transitions: Vec<Vec<StateId>>,
    /// Empty unless the variant has state outputs.
    pub(crate) state_outputs: Vec<OutputId>,
    /// Empty unless the variant has transition outputs.
    pub(crate) transition_outputs: Vec<Vec<OutputId>>,
    pub(crate) reduced: bool,
}

impl Machine {
    /// Creates an empty machine with the given dimensions.
    ///
    /// All states exist and are unconnected: every transition is
    /// [`NULL_STATE`] and every output [`DEFAULT_OUTPUT`]. Zero dimensions
    /// are raised to one and an oversized output alphabet is clamped to the
    /// variant bound; each adjustment emits a warning.
    #[must_use]
    pub fn new(
        kind: MachineKind,
        states: StateId,
        inputs: InputId,
        outputs: OutputId,
    ) -> Self {
        let states = ensure_positive(kind, "states", states);
        let inputs = ensure_positive(kind, "inputs", inputs);
        let mut outputs = ensure_positive(kind, "outputs", outputs);
        let bound = kind.max_outputs(states, inputs);
        if outputs > bound {
            warn!(
                kind = kind.name(),
                outputs, bound, "number of outputs reduced to the variant maximum"
            );
            outputs = bound;
        }

        let n = states as usize;
        Self {
            kind,
            num_states: states,
            num_inputs: inputs,
            num_outputs: outputs,
            used: vec![true; n],
            transitions: vec![vec![NULL_STATE; inputs as usize]; n],
            state_outputs: if kind.has_state_outputs() {
                vec![DEFAULT_OUTPUT; n]
            } else {
                Vec::new()
            },
            transition_outputs: if kind.has_transition_outputs() {
                vec![vec![DEFAULT_OUTPUT; inputs as usize]; n]
            } else {
                Vec::new()
            },
            reduced: false,
        }
    }

    /// The machine variant.
    #[must_use]
    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    /// The number of live states.
    #[must_use]
    pub fn state_count(&self) -> StateId {
        self.num_states
    }

    /// The number of input symbols.
    #[must_use]
    pub fn input_count(&self) -> InputId {
        self.num_inputs
    }

    /// The number of output symbols.
    #[must_use]
    pub fn output_count(&self) -> OutputId {
        self.num_outputs
    }

    /// The greatest allocated state id increased by one.
    #[must_use]
    pub fn greatest_state_id(&self) -> StateId {
        self.used.len() as StateId
    }

    /// True if the live ids are exactly `0..state_count()`.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        self.num_states as usize == self.used.len()
    }

    /// True if the machine is in canonical minimal form.
    #[must_use]
    pub fn is_reduced(&self) -> bool {
        self.reduced
    }

    /// True if `state` refers to a live id.
    #[must_use]
    pub fn is_used(&self, state: StateId) -> bool {
        (state as usize) < self.used.len() && self.used[state as usize]
    }

    /// The live state ids in ascending order.
    #[must_use]
    pub fn states(&self) -> Vec<StateId> {
        self.used
            .iter()
            .enumerate()
            .filter_map(|(id, &used)| used.then_some(id as StateId))
            .collect()
    }

    /// Next state after applying `input` in `state`.
    ///
    /// [`STOUT_INPUT`] leaves the state unchanged. Returns [`NULL_STATE`]
    /// where no transition is defined and [`WRONG_STATE`] when `state` is
    /// not live or `input` is out of range.
    #[must_use]
    pub fn next_state(&self, state: StateId, input: InputId) -> StateId {
        if !self.is_used(state) {
            return WRONG_STATE;
        }
        if input == STOUT_INPUT {
            return state;
        }
        if input >= self.num_inputs {
            return WRONG_STATE;
        }
        self.transitions[state as usize][input as usize]
    }

    /// Last state after applying every input of `path` from `state`.
    ///
    /// Returns [`WRONG_STATE`] as soon as the walk leaves the live id space.
    #[must_use]
    pub fn end_path_state(&self, state: StateId, path: &[InputId]) -> StateId {
        let mut current = state;
        for &input in path {
            current = self.next_state(current, input);
            if current == WRONG_STATE {
                return WRONG_STATE;
            }
        }
        current
    }

    /// Output observed when applying `input` in `state`.
    ///
    /// [`STOUT_INPUT`] selects the state's own output. A real input selects
    /// the transition output (Mealy/DFSM) or the target state's output
    /// (Moore/DFA), provided the transition exists and its target is live.
    /// Any invalidity yields [`WRONG_OUTPUT`].
    #[must_use]
    pub fn output(&self, state: StateId, input: InputId) -> OutputId {
        if !self.is_used(state) {
            return WRONG_OUTPUT;
        }
        if input == STOUT_INPUT {
            if !self.kind.has_state_outputs() {
                return WRONG_OUTPUT;
            }
            return self.state_outputs[state as usize];
        }
        if input >= self.num_inputs {
            return WRONG_OUTPUT;
        }
        let next = self.transitions[state as usize][input as usize];
        if next == NULL_STATE || !self.is_used(next) {
            return WRONG_OUTPUT;
        }
        if self.kind.has_transition_outputs() {
            self.transition_outputs[state as usize][input as usize]
        } else {
            self.state_outputs[next as usize]
        }
    }

    /// Output sequence observed along `path` from `state`.
    ///
    /// The walk aborts on the first invalid step and the whole result
    /// collapses to `[WRONG_OUTPUT]`.
    #[must_use]
    pub fn output_along_path(&self, state: StateId, path: &[InputId]) -> OutputSeq {
        let mut outputs = OutputSeq::with_capacity(path.len());
        let mut current = state;
        for &input in path {
            let output = self.output(current, input);
            current = self.next_state(current, input);
            if current == WRONG_STATE || output == WRONG_OUTPUT {
                return vec![WRONG_OUTPUT];
            }
            outputs.push(output);
        }
        outputs
    }

    /// Adds a state, recycling the lowest freed id before growing the id space.
    ///
    /// For variants with state outputs the supplied output is stored; pass
    /// [`DEFAULT_OUTPUT`] to leave it unassigned. Returns the new id.
    pub fn add_state(&mut self, output: OutputId) -> Result<StateId, FsmError> {
        self.check_output_value(output)?;
        let id = match self.used.iter().position(|&used| !used) {
            Some(slot) => {
                self.used[slot] = true;
                if self.kind.has_state_outputs() {
                    self.state_outputs[slot] = output;
                }
                slot as StateId
            }
            None => {
                self.used.push(true);
                self.transitions
                    .push(vec![NULL_STATE; self.num_inputs as usize]);
                if self.kind.has_state_outputs() {
                    self.state_outputs.push(output);
                }
                if self.kind.has_transition_outputs() {
                    self.transition_outputs
                        .push(vec![DEFAULT_OUTPUT; self.num_inputs as usize]);
                }
                (self.used.len() - 1) as StateId
            }
        };
        self.num_states += 1;
        self.reduced = false;
        Ok(id)
    }

    /// Updates the output of a state ([`STOUT_INPUT`]) or of a transition
    /// (a real input), whichever the variant supports.
    pub fn set_output(
        &mut self,
        state: StateId,
        output: OutputId,
        input: InputId,
    ) -> Result<(), FsmError> {
        self.check_used(state, "state")?;
        self.check_output_value(output)?;
        if input == STOUT_INPUT {
            if !self.kind.has_state_outputs() {
                return Err(FsmError::Capability {
                    kind: self.kind,
                    operation: "setting a state output",
                });
            }
            self.state_outputs[state as usize] = output;
            self.reduced = false;
            return Ok(());
        }
        self.check_input(input)?;
        if !self.kind.has_transition_outputs() {
            return Err(FsmError::Capability {
                kind: self.kind,
                operation: "setting a transition output",
            });
        }
        if self.transitions[state as usize][input as usize] == NULL_STATE {
            return Err(FsmError::UndefinedTransition { state, input });
        }
        self.transition_outputs[state as usize][input as usize] = output;
        self.reduced = false;
        Ok(())
    }

    /// Adds or updates the transition `from --input--> to`.
    ///
    /// For Mealy/DFSM the transition output is written as well; variants
    /// without transition outputs require `output == DEFAULT_OUTPUT`.
    pub fn set_transition(
        &mut self,
        from: StateId,
        input: InputId,
        to: StateId,
        output: OutputId,
    ) -> Result<(), FsmError> {
        if input == STOUT_INPUT {
            return Err(FsmError::invariant(
                "STOUT_INPUT is not a real input; use set_output for state outputs",
            ));
        }
        self.check_used(from, "source state")?;
        self.check_input(input)?;
        self.check_used(to, "target state")?;
        if output != DEFAULT_OUTPUT && !self.kind.has_transition_outputs() {
            return Err(FsmError::Capability {
                kind: self.kind,
                operation: "labeling a transition with an output",
            });
        }
        self.check_output_value(output)?;
        self.transitions[from as usize][input as usize] = to;
        if self.kind.has_transition_outputs() {
            self.transition_outputs[from as usize][input as usize] = output;
        }
        self.reduced = false;
        Ok(())
    }

    /// Removes a state together with all of its incoming and outgoing
    /// transitions. The initial state 0 cannot be removed; the freed id may
    /// be returned by a later [`add_state`](Machine::add_state).
    pub fn remove_state(&mut self, state: StateId) -> Result<(), FsmError> {
        self.check_used(state, "state")?;
        if state == 0 {
            return Err(FsmError::invariant("the initial state cannot be removed"));
        }
        if self.kind.has_state_outputs() {
            self.state_outputs[state as usize] = DEFAULT_OUTPUT;
        }
        for id in 0..self.used.len() {
            if !self.used[id] {
                continue;
            }
            for input in 0..self.num_inputs as usize {
                if id == state as usize || self.transitions[id][input] == state {
                    self.transitions[id][input] = NULL_STATE;
                    if self.kind.has_transition_outputs() {
                        self.transition_outputs[id][input] = DEFAULT_OUTPUT;
                    }
                }
            }
        }
        self.used[state as usize] = false;
        self.num_states -= 1;
        self.reduced = false;
        Ok(())
    }

    /// Removes the transition identified by `from` and `input`.
    ///
    /// `to` and `output` are optional witnesses: pass [`NULL_STATE`] /
    /// [`DEFAULT_OUTPUT`] to skip the check, any other value must match the
    /// stored transition or the call is rejected as inconsistent.
    pub fn remove_transition(
        &mut self,
        from: StateId,
        input: InputId,
        to: StateId,
        output: OutputId,
    ) -> Result<(), FsmError> {
        self.check_used(from, "source state")?;
        self.check_input(input)?;
        let stored = self.transitions[from as usize][input as usize];
        if stored == NULL_STATE {
            return Err(FsmError::UndefinedTransition { state: from, input });
        }
        if to != NULL_STATE && stored != to {
            return Err(FsmError::invariant(format!(
                "transition from state {from} on input {input} leads to {stored}, not {to}"
            )));
        }
        if output != DEFAULT_OUTPUT {
            let stored_output = if self.kind.has_transition_outputs() {
                self.transition_outputs[from as usize][input as usize]
            } else {
                DEFAULT_OUTPUT
            };
            if stored_output != output {
                return Err(FsmError::invariant(format!(
                    "transition from state {from} on input {input} does not produce output {output}"
                )));
            }
        }
        self.transitions[from as usize][input as usize] = NULL_STATE;
        if self.kind.has_transition_outputs() {
            self.transition_outputs[from as usize][input as usize] = DEFAULT_OUTPUT;
        }
        self.reduced = false;
        Ok(())
    }

    /// Widens every transition row by `by` inputs, all initially undefined.
    pub fn add_inputs(&mut self, by: InputId) {
        if by == 0 {
            return;
        }
        for row in &mut self.transitions {
            row.extend(std::iter::repeat(NULL_STATE).take(by as usize));
        }
        for row in &mut self.transition_outputs {
            row.extend(std::iter::repeat(DEFAULT_OUTPUT).take(by as usize));
        }
        self.num_inputs += by;
        self.reduced = false;
    }

    /// Grows the output alphabet by `by` values.
    ///
    /// Rejected for DFAs, whose binary output alphabet is a type invariant.
    pub fn add_outputs(&mut self, by: OutputId) -> Result<(), FsmError> {
        if self.kind.has_fixed_outputs() {
            return Err(FsmError::Capability {
                kind: self.kind,
                operation: "growing the output alphabet",
            });
        }
        if by > 0 {
            self.num_outputs += by;
            self.reduced = false;
        }
        Ok(())
    }

    fn check_used(&self, state: StateId, entity: &'static str) -> Result<(), FsmError> {
        if self.is_used(state) {
            Ok(())
        } else {
            Err(FsmError::InvalidIdentifier {
                entity,
                value: state,
            })
        }
    }

    fn check_input(&self, input: InputId) -> Result<(), FsmError> {
        if input < self.num_inputs {
            Ok(())
        } else {
            Err(FsmError::InvalidIdentifier {
                entity: "input",
                value: input,
            })
        }
    }

    fn check_output_value(&self, output: OutputId) -> Result<(), FsmError> {
        if output == DEFAULT_OUTPUT || output < self.num_outputs {
            Ok(())
        } else {
            Err(FsmError::invariant(format!(
                "output {output} is out of range (outputs: {}); grow the output alphabet first",
                self.num_outputs
            )))
        }
    }
}

fn ensure_positive(kind: MachineKind, dimension: &'static str, value: u32) -> u32 {
    if value == 0 {
        warn!(
            kind = kind.name(),
            dimension, "dimension must be positive, raised to 1"
        );
        1
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_return_sentinels_on_bad_arguments() {
        let machine = Machine::new(MachineKind::Moore, 2, 1, 2);
        assert_eq!(machine.next_state(5, 0), WRONG_STATE);
        assert_eq!(machine.next_state(0, 3), WRONG_STATE);
        assert_eq!(machine.next_state(0, STOUT_INPUT), 0);
        assert_eq!(machine.output(5, STOUT_INPUT), WRONG_OUTPUT);
        assert_eq!(machine.output(0, 0), WRONG_OUTPUT); // no transition yet
    }

    #[test]
    fn stout_output_is_rejected_on_mealy() {
        let machine = Machine::new(MachineKind::Mealy, 2, 1, 1);
        assert_eq!(machine.output(0, STOUT_INPUT), WRONG_OUTPUT);
    }

    #[test]
    fn add_state_recycles_the_lowest_freed_id() {
        let mut machine = Machine::new(MachineKind::Moore, 4, 1, 2);
        machine.remove_state(1).unwrap();
        machine.remove_state(2).unwrap();
        assert_eq!(machine.state_count(), 2);
        let id = machine.add_state(1).unwrap();
        assert_eq!(id, 1);
        assert_eq!(machine.output(1, STOUT_INPUT), 1);
        assert_eq!(machine.state_count(), 3);
        assert_eq!(machine.greatest_state_id(), 4);
    }

    #[test]
    fn removing_the_initial_state_is_rejected() {
        let mut machine = Machine::new(MachineKind::Mealy, 2, 1, 1);
        assert!(matches!(
            machine.remove_state(0),
            Err(FsmError::InvariantViolation(_))
        ));
        assert!(machine.is_used(0));
    }

    #[test]
    fn remove_state_clears_incoming_transitions() {
        let mut machine = Machine::new(MachineKind::Mealy, 3, 2, 1);
        machine.set_transition(0, 0, 2, 0).unwrap();
        machine.set_transition(1, 1, 2, 0).unwrap();
        machine.set_transition(2, 0, 1, 0).unwrap();
        machine.remove_state(2).unwrap();
        assert_eq!(machine.next_state(0, 0), NULL_STATE);
        assert_eq!(machine.next_state(1, 1), NULL_STATE);
        assert_eq!(machine.output(1, 1), WRONG_OUTPUT);
    }

    #[test]
    fn remove_transition_checks_witnesses() {
        let mut machine = Machine::new(MachineKind::Mealy, 2, 1, 2);
        machine.set_transition(0, 0, 1, 1).unwrap();
        assert!(machine.remove_transition(0, 0, 0, DEFAULT_OUTPUT).is_err());
        assert!(machine.remove_transition(0, 0, 1, 0).is_err());
        machine.remove_transition(0, 0, 1, 1).unwrap();
        assert_eq!(machine.next_state(0, 0), NULL_STATE);
        assert!(matches!(
            machine.remove_transition(0, 0, NULL_STATE, DEFAULT_OUTPUT),
            Err(FsmError::UndefinedTransition { .. })
        ));
    }

    #[test]
    fn widening_inputs_reaches_recycled_rows() {
        let mut machine = Machine::new(MachineKind::Dfsm, 3, 1, 2);
        machine.remove_state(2).unwrap();
        machine.add_inputs(2);
        assert_eq!(machine.input_count(), 3);
        let id = machine.add_state(DEFAULT_OUTPUT).unwrap();
        assert_eq!(id, 2);
        machine.set_transition(2, 2, 0, 1).unwrap();
        assert_eq!(machine.next_state(2, 2), 0);
    }

    #[test]
    fn mutations_clear_the_reduced_flag() {
        let mut machine = Machine::new(MachineKind::Moore, 1, 1, 1);
        machine.set_transition(0, 0, 0, DEFAULT_OUTPUT).unwrap();
        machine.set_output(0, 0, STOUT_INPUT).unwrap();
        machine.minimize();
        assert!(machine.is_reduced());
        machine.add_inputs(1);
        assert!(!machine.is_reduced());
    }
}
