use rand::Rng;
use tracing::warn;

use crate::core::automaton::{InputId, MachineKind, OutputId, StateId};
use crate::core::machine::Machine;

impl Machine {
    /// Generates a random connected machine, seeding from the thread RNG.
    ///
    /// See [`generate_with`](Machine::generate_with) for the guarantees.
    #[must_use]
    pub fn generate(
        kind: MachineKind,
        states: StateId,
        inputs: InputId,
        outputs: OutputId,
    ) -> Self {
        Self::generate_with(kind, states, inputs, outputs, &mut rand::thread_rng())
    }

    /// Generates a random machine from an explicit random source.
    ///
    /// The result is coherent: every state is reachable from state 0, every
    /// transition is defined, and each state other than the initial one has
    /// at least one non-self incoming transition. Every output value in
    /// range is assigned somewhere. Dimensions are clamped like
    /// [`new`](Machine::new); additionally the output alphabet is held to
    /// the number of states for variants whose only outputs sit on states,
    /// so that the every-value-used guarantee stays satisfiable.
    #[must_use]
    pub fn generate_with<R: Rng + ?Sized>(
        kind: MachineKind,
        states: StateId,
        inputs: InputId,
        outputs: OutputId,
        rng: &mut R,
    ) -> Self {
        let mut outputs = outputs;
        if kind.has_fixed_outputs() && outputs > states.max(1) {
            warn!(
                kind = kind.name(),
                outputs, "number of outputs reduced to the number of states"
            );
            outputs = states.max(1);
        }
        let mut machine = Machine::new(kind, states, inputs, outputs);
        Connector::new(&mut machine, &mut *rng).run();
        machine.assign_outputs(rng);
        machine
    }

    /// Draws the output labels and repairs the histogram so that every value
    /// of the output alphabet is used at least once.
    fn assign_outputs<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let outputs = self.num_outputs;
        match (
            self.kind.has_state_outputs(),
            self.kind.has_transition_outputs(),
        ) {
            (true, false) => self.assign_state_outputs(outputs, rng),
            (false, true) => self.assign_transition_outputs(outputs, 0, rng),
            (true, true) => {
                // Split the alphabet between the two dimensions: small
                // alphabets are shared outright, larger ones get disjoint
                // contiguous ranges proportional to the slot counts.
                if outputs < self.num_states {
                    self.assign_state_outputs(outputs, rng);
                    self.assign_transition_outputs(outputs, 0, rng);
                } else {
                    let state_range = (outputs / (1 + self.num_inputs)).max(1);
                    let transition_range = (outputs - state_range).max(1);
                    let first = outputs - transition_range;
                    self.assign_state_outputs(state_range, rng);
                    self.assign_transition_outputs(transition_range, first, rng);
                }
            }
            (false, false) => {}
        }
    }

    fn assign_state_outputs<R: Rng + ?Sized>(&mut self, count: OutputId, rng: &mut R) {
        let mut histogram = vec![0u32; count as usize];
        for state in 0..self.num_states as usize {
            let output = rng.gen_range(0..count);
            self.state_outputs[state] = output;
            histogram[output as usize] += 1;
        }
        let mut donor = 0;
        for value in 0..count {
            if histogram[value as usize] > 0 {
                continue;
            }
            while histogram[self.state_outputs[donor] as usize] <= 1 {
                donor += 1;
            }
            histogram[self.state_outputs[donor] as usize] -= 1;
            self.state_outputs[donor] = value;
            histogram[value as usize] += 1;
        }
    }

    fn assign_transition_outputs<R: Rng + ?Sized>(
        &mut self,
        count: OutputId,
        first: OutputId,
        rng: &mut R,
    ) {
        let inputs = self.num_inputs as usize;
        let mut histogram = vec![0u32; count as usize];
        for state in 0..self.num_states as usize {
            for input in 0..inputs {
                let output = rng.gen_range(0..count);
                self.transition_outputs[state][input] = first + output;
                histogram[output as usize] += 1;
            }
        }
        let (mut donor_state, mut donor_input) = (0, 0);
        for value in 0..count {
            if histogram[value as usize] > 0 {
                continue;
            }
            while histogram[(self.transition_outputs[donor_state][donor_input] - first) as usize]
                <= 1
            {
                donor_input += 1;
                if donor_input == inputs {
                    donor_state += 1;
                    donor_input = 0;
                }
            }
            histogram[(self.transition_outputs[donor_state][donor_input] - first) as usize] -= 1;
            self.transition_outputs[donor_state][donor_input] = first + value;
            histogram[value as usize] += 1;
        }
    }
}

/// Seeds every transition cell at random, then rewires edges until the whole
/// machine hangs together from state 0.
///
/// A work stack flood-fills the component of the initial state while
/// counting non-self incoming edges. When states remain uncovered, one
/// already-covered cell whose removal cannot disconnect anything is
/// redirected at the first uncovered state and the flood resumes.
struct Connector<'a, R: Rng + ?Sized> {
    machine: &'a mut Machine,
    rng: &'a mut R,
    incoming: Vec<u32>,
    covered: Vec<bool>,
    covered_count: usize,
    stack: Vec<StateId>,
}

impl<'a, R: Rng + ?Sized> Connector<'a, R> {
    fn new(machine: &'a mut Machine, rng: &'a mut R) -> Self {
        let states = machine.num_states as usize;
        Self {
            machine,
            rng,
            incoming: vec![0; states],
            covered: vec![false; states],
            covered_count: 0,
            stack: Vec::new(),
        }
    }

    fn run(mut self) {
        let states = self.machine.num_states;
        for state in 0..states as usize {
            for input in 0..self.machine.num_inputs as usize {
                self.machine.transitions[state][input] = self.rng.gen_range(0..states);
            }
        }

        // The initial state needs no real in-edge; the seed count stands in
        // for one so the flood never re-pushes it through a self-loop.
        self.incoming[0] = 1;
        self.stack.push(0);
        let mut next_uncovered = 0;
        loop {
            self.flood();
            if self.covered_count == states as usize {
                break;
            }
            let (from, input) = self.rewire_point();
            while self.covered[next_uncovered] {
                next_uncovered += 1;
            }
            let orphan = next_uncovered as StateId;
            let old_target = self.machine.transitions[from as usize][input as usize];
            self.incoming[old_target as usize] -= 1;
            self.machine.transitions[from as usize][input as usize] = orphan;
            self.incoming[orphan as usize] += 1;
            self.stack.push(orphan);
        }
    }

    /// Drains the work stack, counting covered states and non-self in-edges.
    fn flood(&mut self) {
        while let Some(state) = self.stack.pop() {
            self.covered[state as usize] = true;
            self.covered_count += 1;
            for input in 0..self.machine.num_inputs as usize {
                let next = self.machine.transitions[state as usize][input];
                if self.incoming[next as usize] == 0 {
                    self.stack.push(next);
                }
                if next != state {
                    self.incoming[next as usize] += 1;
                }
            }
        }
    }

    /// Picks a covered cell that can be redirected without disconnecting its
    /// current target: the target must keep another in-edge and stay
    /// reachable from state 0 once this cell is gone. When every such edge
    /// is load-bearing, a self-loop on a covered state serves instead (its
    /// removal takes nothing away, so its owner's count is topped up to
    /// cancel the generic decrement).
    fn rewire_point(&mut self) -> (StateId, InputId) {
        let states = self.machine.num_states;
        let inputs = self.machine.num_inputs;
        let offset = self.rng.gen_range(0..states);
        for step in 0..states {
            let from = (offset + step) % states;
            if !self.covered[from as usize] {
                continue;
            }
            for input in 0..inputs {
                let target = self.machine.transitions[from as usize][input as usize];
                if self.incoming[target as usize] <= 1 {
                    continue;
                }
                if self.reachable_without(from, input) {
                    return (from, input);
                }
            }
        }
        for from in 0..states {
            if !self.covered[from as usize] {
                continue;
            }
            for input in 0..inputs {
                if self.machine.transitions[from as usize][input as usize] == from {
                    self.incoming[from as usize] += 1;
                    return (from, input);
                }
            }
        }
        unreachable!("a redirectable edge exists while states remain uncovered")
    }

    /// True if the target of the given cell stays reachable from state 0
    /// after removing exactly that cell. The initial state itself always is.
    fn reachable_without(&self, from: StateId, input: InputId) -> bool {
        let end = self.machine.transitions[from as usize][input as usize];
        let mut seen = vec![false; self.machine.num_states as usize];
        let mut queue = vec![0 as StateId];
        seen[0] = true;
        while let Some(state) = queue.pop() {
            for i in 0..self.machine.num_inputs {
                if state == from && i == input {
                    continue;
                }
                let next = self.machine.transitions[state as usize][i as usize];
                if !seen[next as usize] {
                    seen[next as usize] = true;
                    queue.push(next);
                }
            }
        }
        seen[end as usize]
    }
}
