use std::collections::VecDeque;

use crate::core::automaton::{DEFAULT_OUTPUT, NULL_STATE, StateId};
use crate::core::machine::Machine;

impl Machine {
    /// The set of live ids reachable from the initial state, as a bitmap
    /// over the allocated id space.
    pub(crate) fn reachable_states(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.used.len()];
        let mut queue = VecDeque::new();
        reachable[0] = true;
        queue.push_back(0usize);
        while let Some(state) = queue.pop_front() {
            for input in 0..self.num_inputs as usize {
                let next = self.transitions[state][input];
                if next != NULL_STATE && !reachable[next as usize] {
                    reachable[next as usize] = true;
                    queue.push_back(next as usize);
                }
            }
        }
        reachable
    }

    /// Removes every state that no input sequence can reach from state 0.
    ///
    /// Cleared states leave inert rows behind; call
    /// [`make_compact`](Machine::make_compact) to re-densify the id space.
    /// Idempotent. Returns the removed ids in ascending order.
    pub fn remove_unreachable_states(&mut self) -> Vec<StateId> {
        let reachable = self.reachable_states();
        let mut removed = Vec::new();
        for id in 0..self.used.len() {
            if !self.used[id] || reachable[id] {
                continue;
            }
            for input in 0..self.num_inputs as usize {
                self.transitions[id][input] = NULL_STATE;
                if self.kind.has_transition_outputs() {
                    self.transition_outputs[id][input] = DEFAULT_OUTPUT;
                }
            }
            if self.kind.has_state_outputs() {
                self.state_outputs[id] = DEFAULT_OUTPUT;
            }
            self.used[id] = false;
            self.num_states -= 1;
            removed.push(id as StateId);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::automaton::MachineKind;

    #[test]
    fn pruning_keeps_only_the_initial_component() {
        // 0 loops on itself; 1 and 2 reference each other but are cut off.
        let mut machine = Machine::new(MachineKind::Mealy, 3, 1, 1);
        machine.set_transition(0, 0, 0, 0).unwrap();
        machine.set_transition(1, 0, 2, 0).unwrap();
        machine.set_transition(2, 0, 1, 0).unwrap();
        let removed = machine.remove_unreachable_states();
        assert_eq!(removed, vec![1, 2]);
        assert_eq!(machine.state_count(), 1);
        assert_eq!(machine.states(), vec![0]);
        // a second pass finds nothing
        assert!(machine.remove_unreachable_states().is_empty());
    }
}
