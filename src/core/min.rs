use std::collections::{BTreeMap, VecDeque};

use indexmap::IndexMap;

use crate::core::automaton::{
    DEFAULT_OUTPUT, InputId, NULL_STATE, OutputId, STOUT_INPUT, StateId, WRONG_OUTPUT,
};
use crate::core::machine::Machine;

impl Machine {
    /// Reduces the machine to its canonical minimal form.
    ///
    /// Unreachable states are pruned, behaviorally equivalent states are
    /// found by partition refinement (state outputs, then transition
    /// outputs, then transition targets to a fixpoint) and merged into
    /// their lowest-id representative, and the id space is compacted.
    /// Afterwards `is_reduced()` holds, ids are dense, and no two states
    /// are equivalent. A machine already in reduced form is left untouched.
    ///
    /// Returns the relabeling of every state that did not survive under its
    /// own id: pruned states map to [`NULL_STATE`], merged states to the
    /// final id of their representative, and relocated states to their new
    /// id. The map is empty when nothing changed.
    pub fn minimize(&mut self) -> IndexMap<StateId, StateId> {
        if self.reduced {
            return IndexMap::new();
        }
        let removed = self.remove_unreachable_states();
        let classes = PartitionRefinement::new(self).run();
        let merged = self.merge_equivalent_states(&classes);
        let moved = self.make_compact();

        let mut relabel = IndexMap::new();
        for state in removed {
            relabel.insert(state, NULL_STATE);
        }
        for (&member, &representative) in &merged {
            let survivor = moved.get(&representative).copied().unwrap_or(representative);
            relabel.insert(member, survivor);
        }
        for (&old, &new) in &moved {
            relabel.insert(old, new);
        }
        self.reduced = true;
        relabel
    }

    /// Collapses each equivalence class onto its lowest-id member.
    ///
    /// The other members release their ids and every transition into them
    /// is redirected to the representative. Returns `member ->
    /// representative` for every collapsed state.
    fn merge_equivalent_states(
        &mut self,
        classes: &[Vec<StateId>],
    ) -> IndexMap<StateId, StateId> {
        let mut merged = IndexMap::new();
        let mut target_of: Vec<StateId> = (0..self.used.len() as StateId).collect();
        for class in classes {
            let representative = class[0];
            for &member in &class[1..] {
                target_of[member as usize] = representative;
                merged.insert(member, representative);
                if self.kind.has_state_outputs() {
                    self.state_outputs[member as usize] = DEFAULT_OUTPUT;
                }
                self.used[member as usize] = false;
                self.num_states -= 1;
            }
        }
        if merged.is_empty() {
            return merged;
        }
        for id in 0..self.used.len() {
            for input in 0..self.num_inputs as usize {
                if !self.used[id] {
                    self.transitions[id][input] = NULL_STATE;
                    if self.kind.has_transition_outputs() {
                        self.transition_outputs[id][input] = DEFAULT_OUTPUT;
                    }
                    continue;
                }
                let target = self.transitions[id][input];
                if target != NULL_STATE && target_of[target as usize] != target {
                    self.transitions[id][input] = target_of[target as usize];
                }
            }
        }
        merged
    }
}

/// Refines a queue of candidate equivalence classes until no input can
/// split any block further.
struct PartitionRefinement<'a> {
    machine: &'a Machine,
    blocks: VecDeque<Vec<StateId>>,
}

impl<'a> PartitionRefinement<'a> {
    fn new(machine: &'a Machine) -> Self {
        let mut blocks = VecDeque::new();
        blocks.push_back(machine.states());
        Self { machine, blocks }
    }

    /// Runs all applicable phases and returns the non-trivial equivalence
    /// classes (empty when every state is distinguishable already).
    fn run(mut self) -> Vec<Vec<StateId>> {
        let live = self.machine.state_count() as usize;
        if self.machine.kind().has_state_outputs() {
            self.split_by_state_outputs();
            if self.blocks.len() == live {
                return Vec::new();
            }
        }
        if self.machine.kind().has_transition_outputs() {
            self.split_by_transition_outputs();
            if self.blocks.len() == live {
                return Vec::new();
            }
        }
        self.split_by_transition_targets()
    }

    /// First split: by the output of the state itself.
    ///
    /// States without an assigned output gather in a dedicated bucket
    /// behind the real output values.
    fn split_by_state_outputs(&mut self) {
        let Some(block) = self.blocks.pop_front() else {
            return;
        };
        let unassigned = self.machine.output_count();
        let mut buckets: BTreeMap<OutputId, Vec<StateId>> = BTreeMap::new();
        for state in block {
            let output = self.machine.output(state, STOUT_INPUT);
            let key = if output == DEFAULT_OUTPUT { unassigned } else { output };
            buckets.entry(key).or_default().push(state);
        }
        self.blocks.extend(buckets.into_values());
    }

    /// Second split: by the output produced on each input.
    ///
    /// Besides the unassigned-output bucket there is one more for states
    /// with no transition on the input at all. Stops early once every block
    /// is a singleton.
    fn split_by_transition_outputs(&mut self) {
        let live = self.machine.state_count() as usize;
        let unassigned = self.machine.output_count();
        for input in 0..self.machine.input_count() {
            for _ in 0..self.blocks.len() {
                let Some(block) = self.blocks.pop_front() else {
                    break;
                };
                let mut buckets: BTreeMap<OutputId, Vec<StateId>> = BTreeMap::new();
                for state in block {
                    let key = match self.machine.output(state, input) {
                        WRONG_OUTPUT => unassigned + 1,
                        DEFAULT_OUTPUT => unassigned,
                        value => value,
                    };
                    buckets.entry(key).or_default().push(state);
                }
                self.blocks.extend(buckets.into_values());
            }
            if self.blocks.len() == live {
                return;
            }
        }
    }

    /// Final split: by the class of each transition target, iterated
    /// round-robin over the inputs until a full cycle creates no new class.
    fn split_by_transition_targets(mut self) -> Vec<Vec<StateId>> {
        let machine = self.machine;
        let mut group = vec![0 as StateId; machine.greatest_state_id() as usize];
        let mut next_group: StateId = 0;
        for _ in 0..self.blocks.len() {
            let Some(block) = self.blocks.pop_front() else {
                break;
            };
            for &state in &block {
                group[state as usize] = next_group;
            }
            next_group += 1;
            if block.len() > 1 {
                self.blocks.push_back(block);
            }
        }

        let inputs = machine.input_count();
        let mut input: InputId = 0;
        let mut stable_rounds = 0;
        while !self.blocks.is_empty() && stable_rounds < inputs {
            let mut split = false;
            for _ in 0..self.blocks.len() {
                let Some(block) = self.blocks.pop_front() else {
                    break;
                };
                let mut buckets: BTreeMap<StateId, Vec<StateId>> = BTreeMap::new();
                for &state in &block {
                    let target = machine.next_state(state, input);
                    let key = if target == NULL_STATE {
                        NULL_STATE
                    } else {
                        group[target as usize]
                    };
                    buckets.entry(key).or_default().push(state);
                }
                let mut first = true;
                for bucket in buckets.into_values() {
                    if !first {
                        for &state in &bucket {
                            group[state as usize] = next_group;
                        }
                        next_group += 1;
                        split = true;
                    }
                    first = false;
                    if bucket.len() > 1 {
                        self.blocks.push_back(bucket);
                    }
                }
            }
            stable_rounds = if split { 0 } else { stable_rounds + 1 };
            input = (input + 1) % inputs;
        }
        self.blocks.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automaton::MachineKind;

    fn two_phase_moore() -> Machine {
        // 0 and 2 share an output, 1 and 3 share the other; the transition
        // structure keeps both pairs equivalent.
        let mut machine = Machine::new(MachineKind::Moore, 4, 1, 2);
        for (state, output) in [(0, 0), (1, 1), (2, 0), (3, 1)] {
            machine.set_output(state, output, STOUT_INPUT).unwrap();
        }
        for state in 0..4u32 {
            machine
                .set_transition(state, 0, (state + 1) % 4, DEFAULT_OUTPUT)
                .unwrap();
        }
        machine
    }

    #[test]
    fn equivalent_moore_states_collapse() {
        let mut machine = two_phase_moore();
        let relabel = machine.minimize();
        assert!(machine.is_reduced());
        assert_eq!(machine.state_count(), 2);
        assert_eq!(relabel.get(&2), Some(&0));
        assert_eq!(relabel.get(&3), Some(&1));
        // the survivors alternate between each other
        assert_eq!(machine.next_state(0, 0), 1);
        assert_eq!(machine.next_state(1, 0), 0);
        assert_ne!(
            machine.output(0, STOUT_INPUT),
            machine.output(1, STOUT_INPUT)
        );
    }

    #[test]
    fn minimize_is_idempotent() {
        let mut machine = two_phase_moore();
        machine.minimize();
        let snapshot = machine.clone();
        let relabel = machine.minimize();
        assert!(relabel.is_empty());
        assert_eq!(machine, snapshot);
    }

    #[test]
    fn distinct_transition_outputs_prevent_merging() {
        let mut machine = Machine::new(MachineKind::Mealy, 2, 1, 2);
        machine.set_transition(0, 0, 1, 0).unwrap();
        machine.set_transition(1, 0, 0, 1).unwrap();
        let relabel = machine.minimize();
        assert!(relabel.is_empty());
        assert_eq!(machine.state_count(), 2);
        assert!(machine.is_reduced());
    }

    #[test]
    fn missing_transitions_distinguish_states() {
        // both states emit the same outputs, but only one can move twice
        let mut machine = Machine::new(MachineKind::Mealy, 3, 1, 1);
        machine.set_transition(0, 0, 1, 0).unwrap();
        machine.set_transition(1, 0, 2, 0).unwrap();
        let relabel = machine.minimize();
        assert!(relabel.is_empty());
        assert_eq!(machine.state_count(), 3);
    }
}
