use std::cmp::Ordering;

use crate::core::automaton::{
    DEFAULT_OUTPUT, EPSILON_INPUT, InputId, OutputId, STOUT_INPUT, WRONG_OUTPUT,
};

/// A finite ordered list of input symbols.
///
/// May contain [`STOUT_INPUT`] as a request to sample the state output at
/// that position of a walk.
pub type InputSeq = Vec<InputId>;

/// A finite ordered list of output symbols.
pub type OutputSeq = Vec<OutputId>;

/// Orders input sequences first by length, then content.
///
/// Among sequences of equal length, those starting with [`STOUT_INPUT`] sort
/// before those that do not; ties fall back to plain lexicographic order of
/// the raw symbol values.
#[must_use]
pub fn compare_inputs(lhs: &[InputId], rhs: &[InputId]) -> Ordering {
    if lhs.len() != rhs.len() {
        return lhs.len().cmp(&rhs.len());
    }
    let lhs_stout = lhs.first() == Some(&STOUT_INPUT);
    let rhs_stout = rhs.first() == Some(&STOUT_INPUT);
    match (lhs_stout, rhs_stout) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => lhs.cmp(rhs),
    }
}

/// Renders an input sequence with the reserved symbols of the text format.
#[must_use]
pub fn format_inputs(sequence: &[InputId]) -> String {
    let symbols: Vec<String> = sequence
        .iter()
        .map(|&input| match input {
            STOUT_INPUT => "S".to_string(),
            EPSILON_INPUT => "E".to_string(),
            other => other.to_string(),
        })
        .collect();
    symbols.join(" ")
}

/// Renders an output sequence, printing `-` for absent and `X` for wrong outputs.
#[must_use]
pub fn format_outputs(sequence: &[OutputId]) -> String {
    let symbols: Vec<String> = sequence
        .iter()
        .map(|&output| match output {
            DEFAULT_OUTPUT => "-".to_string(),
            WRONG_OUTPUT => "X".to_string(),
            other => other.to_string(),
        })
        .collect();
    symbols.join(" ")
}
