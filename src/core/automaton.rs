use std::fmt;

/// Identifier type for machine states.
///
/// States are labelled from 0 up to (but excluding) the greatest state id;
/// state 0 always exists and is the unique initial state.
pub type StateId = u32;

/// Identifier type for input symbols, labelled `0..I`.
pub type InputId = u32;

/// Identifier type for output symbols, labelled `0..O`.
pub type OutputId = u32;

/// Absence of a transition.
pub const NULL_STATE: StateId = StateId::MAX;

/// Returned by state queries when an argument is invalid.
pub const WRONG_STATE: StateId = StateId::MAX - 1;

/// Pseudo-input selecting the output of the state itself in output queries.
pub const STOUT_INPUT: InputId = InputId::MAX;

/// Reserved for nondeterministic extensions; no deterministic variant uses it.
pub const EPSILON_INPUT: InputId = InputId::MAX - 1;

/// Absent or unassigned output.
pub const DEFAULT_OUTPUT: OutputId = OutputId::MAX;

/// Returned by output queries when an argument is invalid.
pub const WRONG_OUTPUT: OutputId = OutputId::MAX - 1;

/// The deterministic machine variants covered by the unified data model.
///
/// The discriminants are the tags of the text serialization header. All
/// algorithms dispatch on the derived capabilities
/// ([`has_state_outputs`](MachineKind::has_state_outputs),
/// [`has_transition_outputs`](MachineKind::has_transition_outputs)) rather
/// than on the tag itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MachineKind {
    /// Both state and transition outputs.
    Dfsm = 1,
    /// Transition outputs only.
    Mealy = 2,
    /// State outputs only.
    Moore = 3,
    /// A Moore machine restricted to a binary output alphabet.
    Dfa = 4,
}

impl MachineKind {
    /// Serialization tag of this variant.
    #[must_use]
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Resolves a serialization tag back to a variant.
    #[must_use]
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Dfsm),
            2 => Some(Self::Mealy),
            3 => Some(Self::Moore),
            4 => Some(Self::Dfa),
            _ => None,
        }
    }

    /// True if states carry outputs.
    #[must_use]
    pub fn has_state_outputs(self) -> bool {
        matches!(self, Self::Dfsm | Self::Moore | Self::Dfa)
    }

    /// True if transitions carry outputs.
    #[must_use]
    pub fn has_transition_outputs(self) -> bool {
        matches!(self, Self::Dfsm | Self::Mealy)
    }

    /// Greatest admissible number of outputs for the given dimensions.
    ///
    /// Every output value must be expressible somewhere: a Moore machine has
    /// `N` output slots, a Mealy machine `N·I`, a DFSM both, and a DFA is
    /// capped at the accept/reject pair regardless of size.
    #[must_use]
    pub fn max_outputs(self, states: StateId, inputs: InputId) -> OutputId {
        match self {
            Self::Dfsm => states * (1 + inputs),
            Self::Mealy => states * inputs,
            Self::Moore => states,
            Self::Dfa => 2,
        }
    }

    /// True if the output alphabet is fixed by the variant and cannot grow.
    #[must_use]
    pub fn has_fixed_outputs(self) -> bool {
        matches!(self, Self::Dfa)
    }

    /// Display name, also used in saved file names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dfsm => "DFSM",
            Self::Mealy => "Mealy",
            Self::Moore => "Moore",
            Self::Dfa => "DFA",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in [
            MachineKind::Dfsm,
            MachineKind::Mealy,
            MachineKind::Moore,
            MachineKind::Dfa,
        ] {
            assert_eq!(MachineKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MachineKind::from_tag(0), None);
        assert_eq!(MachineKind::from_tag(5), None);
    }

    #[test]
    fn capabilities_follow_variant() {
        assert!(MachineKind::Moore.has_state_outputs());
        assert!(!MachineKind::Moore.has_transition_outputs());
        assert!(!MachineKind::Mealy.has_state_outputs());
        assert!(MachineKind::Mealy.has_transition_outputs());
        assert!(MachineKind::Dfsm.has_state_outputs());
        assert!(MachineKind::Dfsm.has_transition_outputs());
        assert_eq!(MachineKind::Dfa.max_outputs(100, 10), 2);
        assert_eq!(MachineKind::Dfsm.max_outputs(3, 2), 9);
    }
}
