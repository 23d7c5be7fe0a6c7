//! Core library for constructing, editing, persisting, and canonicalizing
//! deterministic finite-state machines.
//!
//! Four machine variants share one data model: plain binary-accepting DFAs,
//! Moore machines (state-labeled outputs), Mealy machines (transition-labeled
//! outputs), and the general DFSM carrying both output dimensions at once.
//! On top of the model the crate provides a random connected-machine
//! generator, reachability pruning, partition-refinement minimization into
//! the canonical minimal form, id-space compaction, and a stable text
//! serialization plus DOT export.

pub mod core;
pub mod errors;

pub use crate::core::automaton::{
    DEFAULT_OUTPUT, EPSILON_INPUT, InputId, MachineKind, NULL_STATE, OutputId, STOUT_INPUT,
    StateId, WRONG_OUTPUT, WRONG_STATE,
};
pub use crate::core::machine::Machine;
pub use crate::errors::FsmError;
