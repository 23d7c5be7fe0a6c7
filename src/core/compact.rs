use indexmap::IndexMap;

use crate::core::automaton::{DEFAULT_OUTPUT, NULL_STATE, OutputId, StateId};
use crate::core::machine::Machine;

impl Machine {
    /// Re-densifies the id space after deletions or merges.
    ///
    /// Rows are moved from the top of the allocated id space into the holes
    /// left behind by freed ids, every transition target is rewritten
    /// accordingly, tables shrink to the live state count, and the input and
    /// output counts tighten to the greatest value still in use. A machine
    /// whose ids are already dense is left untouched.
    ///
    /// Returns the relabeling `old id -> new id` for every moved state.
    pub fn make_compact(&mut self) -> IndexMap<StateId, StateId> {
        let mut relabel = IndexMap::new();
        if self.is_compact() {
            return relabel;
        }

        let mut low = 0;
        let mut high = self.used.len() - 1;
        loop {
            while low < high && self.used[low] {
                low += 1;
            }
            while low < high && !self.used[high] {
                high -= 1;
            }
            if low >= high {
                break;
            }
            self.transitions.swap(low, high);
            if self.kind.has_state_outputs() {
                self.state_outputs.swap(low, high);
            }
            if self.kind.has_transition_outputs() {
                self.transition_outputs.swap(low, high);
            }
            self.used[low] = true;
            self.used[high] = false;
            relabel.insert(high as StateId, low as StateId);
        }

        let live = self.num_states as usize;
        self.used.truncate(live);
        self.transitions.truncate(live);
        if self.kind.has_state_outputs() {
            self.state_outputs.truncate(live);
        }
        if self.kind.has_transition_outputs() {
            self.transition_outputs.truncate(live);
        }
        for row in &mut self.transitions {
            for target in row {
                if let Some(&moved) = relabel.get(target) {
                    *target = moved;
                }
            }
        }

        self.tighten_bounds();
        relabel
    }

    /// Shrinks the input and output counts to the greatest value in use.
    fn tighten_bounds(&mut self) {
        let mut greatest_input = None;
        let mut greatest_output = None;
        for state in 0..self.transitions.len() {
            for input in 0..self.num_inputs as usize {
                if self.transitions[state][input] != NULL_STATE {
                    greatest_input = greatest_input.max(Some(input));
                }
                if self.kind.has_transition_outputs() {
                    let output = self.transition_outputs[state][input];
                    if output != DEFAULT_OUTPUT {
                        greatest_output = greatest_output.max(Some(output));
                    }
                }
            }
            if self.kind.has_state_outputs() {
                let output = self.state_outputs[state];
                if output != DEFAULT_OUTPUT {
                    greatest_output = greatest_output.max(Some(output));
                }
            }
        }

        let tight_inputs = greatest_input.map_or(1, |input| input as u32 + 1);
        if tight_inputs < self.num_inputs {
            self.num_inputs = tight_inputs;
            for row in &mut self.transitions {
                row.truncate(tight_inputs as usize);
            }
            for row in &mut self.transition_outputs {
                row.truncate(tight_inputs as usize);
            }
        }
        self.num_outputs = greatest_output.map_or(1, |output: OutputId| output + 1);
    }
}
