use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::core::automaton::{NULL_STATE, STOUT_INPUT, StateId};
use crate::core::machine::Machine;

/// Checks whether two machines describe the same behavior up to a
/// permutation of state ids.
///
/// Both machines are brought into canonical minimal form first (working on
/// clones, the arguments are not touched), so two machines that merely
/// *reduce* to the same form compare as isomorphic. Machines of different
/// variants or alphabet sizes never do.
#[must_use]
pub fn are_isomorphic(first: &Machine, second: &Machine) -> bool {
    let first = canonical(first);
    let second = canonical(second);
    if first.kind() != second.kind()
        || first.state_count() != second.state_count()
        || first.input_count() != second.input_count()
        || first.output_count() != second.output_count()
    {
        return false;
    }

    // Both machines are reduced and compact, so every state is reachable
    // from 0 and a breadth-first pairing covers them all.
    let mut pairing: IndexMap<StateId, StateId> = IndexMap::new();
    let mut paired_in_second = vec![false; second.greatest_state_id() as usize];
    let mut queue = VecDeque::new();
    if !outputs_match(&first, &second, 0, 0) {
        return false;
    }
    pairing.insert(0, 0);
    paired_in_second[0] = true;
    queue.push_back((0 as StateId, 0 as StateId));

    while let Some((a, b)) = queue.pop_front() {
        for input in 0..first.input_count() {
            let next_a = first.next_state(a, input);
            let next_b = second.next_state(b, input);
            if (next_a == NULL_STATE) != (next_b == NULL_STATE) {
                return false;
            }
            if first.kind().has_transition_outputs()
                && first.output(a, input) != second.output(b, input)
            {
                return false;
            }
            if next_a == NULL_STATE {
                continue;
            }
            match pairing.get(&next_a) {
                Some(&expected) => {
                    if expected != next_b {
                        return false;
                    }
                }
                None => {
                    if paired_in_second[next_b as usize] {
                        return false;
                    }
                    if !outputs_match(&first, &second, next_a, next_b) {
                        return false;
                    }
                    pairing.insert(next_a, next_b);
                    paired_in_second[next_b as usize] = true;
                    queue.push_back((next_a, next_b));
                }
            }
        }
    }
    pairing.len() == first.state_count() as usize
}

/// Checks whether every live state can reach every other one.
#[must_use]
pub fn is_strongly_connected(machine: &Machine) -> bool {
    let live = machine.states();
    if live.is_empty() {
        return false;
    }
    covers_all(machine, &live, false) && covers_all(machine, &live, true)
}

fn canonical(machine: &Machine) -> Machine {
    if machine.is_reduced() {
        machine.clone()
    } else {
        let mut copy = machine.clone();
        copy.minimize();
        copy
    }
}

fn outputs_match(first: &Machine, second: &Machine, a: StateId, b: StateId) -> bool {
    !first.kind().has_state_outputs()
        || first.output(a, STOUT_INPUT) == second.output(b, STOUT_INPUT)
}

/// BFS over the live states from state 0, forward or along reversed edges.
fn covers_all(machine: &Machine, live: &[StateId], reversed: bool) -> bool {
    let size = machine.greatest_state_id() as usize;
    let mut adjacency: Vec<Vec<StateId>> = vec![Vec::new(); size];
    for &state in live {
        for input in 0..machine.input_count() {
            let target = machine.next_state(state, input);
            if target == NULL_STATE {
                continue;
            }
            if reversed {
                adjacency[target as usize].push(state);
            } else {
                adjacency[state as usize].push(target);
            }
        }
    }
    let mut seen = vec![false; size];
    let mut queue = VecDeque::new();
    seen[0] = true;
    queue.push_back(0usize);
    let mut count = 1;
    while let Some(state) = queue.pop_front() {
        for &next in &adjacency[state] {
            if !seen[next as usize] {
                seen[next as usize] = true;
                count += 1;
                queue.push_back(next as usize);
            }
        }
    }
    count == live.len()
}
