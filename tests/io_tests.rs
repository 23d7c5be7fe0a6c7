use std::fs;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;

use fsmkit::{DEFAULT_OUTPUT, FsmError, Machine, MachineKind, NULL_STATE, STOUT_INPUT};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fsmkit-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn populated_dfsm() -> Machine {
    let mut machine = Machine::new(MachineKind::Dfsm, 3, 2, 5);
    machine.set_output(0, 0, STOUT_INPUT).unwrap();
    machine.set_output(1, 1, STOUT_INPUT).unwrap();
    machine.set_output(2, 0, STOUT_INPUT).unwrap();
    machine.set_transition(0, 0, 1, 2).unwrap();
    machine.set_transition(0, 1, 2, 3).unwrap();
    machine.set_transition(1, 0, 2, 4).unwrap();
    machine.set_transition(1, 1, 0, 2).unwrap();
    machine.set_transition(2, 0, 0, 3).unwrap();
    machine
}

#[test]
fn a_dfsm_survives_the_round_trip_exactly() {
    let dir = scratch_dir("dfsm-roundtrip");
    let machine = populated_dfsm();
    let path = machine.save(&dir).unwrap();
    let loaded = Machine::load(&path).unwrap();
    assert_eq!(loaded, machine);
}

#[test]
fn every_variant_round_trips() {
    let dir = scratch_dir("variants");
    for kind in [
        MachineKind::Dfsm,
        MachineKind::Mealy,
        MachineKind::Moore,
        MachineKind::Dfa,
    ] {
        let machine =
            Machine::generate_with(kind, 6, 2, 2, &mut StdRng::seed_from_u64(kind.tag() as u64));
        let path = machine.save(&dir).unwrap();
        let loaded = Machine::load(&path).unwrap();
        assert_eq!(loaded, machine, "{kind}");
    }
}

#[test]
fn the_serialized_text_matches_the_grammar() {
    let dir = scratch_dir("grammar");
    let mut machine = Machine::new(MachineKind::Moore, 2, 1, 2);
    machine.set_output(0, 0, STOUT_INPUT).unwrap();
    machine.set_output(1, 1, STOUT_INPUT).unwrap();
    machine.set_transition(0, 0, 1, DEFAULT_OUTPUT).unwrap();

    let path = machine.save(&dir).unwrap();
    assert!(path.file_name().unwrap().to_str().unwrap().starts_with("Moore_U2"));
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "3 0\n2 1 2 2\n0 0\n1 1\n0\t1\n1\t4294967295\n");
}

#[test]
fn saving_twice_picks_distinct_names() {
    let dir = scratch_dir("unique-names");
    let machine = populated_dfsm();
    let first = machine.save(&dir).unwrap();
    let second = machine.save(&dir).unwrap();
    assert_ne!(first, second);
    assert_eq!(Machine::load(&first).unwrap(), Machine::load(&second).unwrap());
}

#[test]
fn sparse_machines_are_saved_through_the_dense_relabeling() {
    let dir = scratch_dir("sparse");
    let mut machine = populated_dfsm();
    let extra = machine.add_state(1).unwrap();
    machine.set_transition(2, 1, extra, 2).unwrap();
    machine.set_transition(extra, 0, 0, 3).unwrap();
    machine.remove_state(1).unwrap();
    assert!(!machine.is_compact());

    let path = machine.save(&dir).unwrap();
    let loaded = Machine::load(&path).unwrap();

    // the live ids 0, 2, 3 are written in ascending order as 0, 1, 2
    assert_eq!(loaded.state_count(), 3);
    assert!(loaded.is_compact());
    assert_eq!(loaded.next_state(1, 1), 2);
    assert_eq!(loaded.output(1, 1), 2);
    assert_eq!(loaded.next_state(2, 0), 0);
    assert_eq!(loaded.output(2, 0), 3);
    assert_eq!(loaded.output(1, STOUT_INPUT), machine.output(2, STOUT_INPUT));
    assert_eq!(loaded.output(2, STOUT_INPUT), machine.output(3, STOUT_INPUT));
    // the transition that pointed at the removed state is gone
    assert_eq!(loaded.next_state(0, 0), NULL_STATE);
}

#[test]
fn loading_validates_the_header() {
    let dir = scratch_dir("bad-headers");
    for (name, text) in [
        ("unknown-tag", "7 0\n2 1 1\n"),
        ("nondeterministic-tag", "5 0\n2 1 1 2\n"),
        ("zero-inputs", "1 0\n2 0 1\n"),
        ("zero-states", "1 0\n0 1 1\n"),
        ("bad-reduced-flag", "1 3\n2 1 1\n"),
        ("dfa-three-outputs", "4 0\n2 1 3 2\n"),
        ("dfsm-output-overflow", "1 0\n2 1 9\n"),
        ("greatest-id-below-count", "3 0\n4 1 2 2\n"),
    ] {
        let path = dir.join(format!("{name}.fsm"));
        fs::write(&path, text).unwrap();
        assert!(
            matches!(Machine::load(&path), Err(FsmError::Parse(_))),
            "{name} should be rejected"
        );
    }
}

#[test]
fn loading_validates_the_blocks() {
    let dir = scratch_dir("bad-blocks");
    for (name, text) in [
        // state-output value beyond the alphabet
        ("output-overflow", "3 0\n2 1 2 2\n0 0\n1 5\n0\t1\n1\t0\n"),
        // transition into a state the file never defines
        ("target-overflow", "3 0\n2 1 2 2\n0 0\n1 1\n0\t1\n1\t7\n"),
        // rows out of order
        ("shuffled-rows", "3 0\n2 1 2 2\n1 0\n0 1\n0\t1\n1\t0\n"),
        // file ends mid-block
        ("truncated", "3 0\n2 1 2 2\n0 0\n1 1\n0\t1\n"),
    ] {
        let path = dir.join(format!("{name}.fsm"));
        fs::write(&path, text).unwrap();
        assert!(
            matches!(Machine::load(&path), Err(FsmError::Parse(_))),
            "{name} should be rejected"
        );
    }
}

#[test]
fn loading_accepts_null_transitions_and_defaults() {
    let dir = scratch_dir("nulls");
    let text =
        "2 0\n2 2 3 2\n0\t4294967295\t1\n1\t2\t4294967295\n0\t4294967295\t1\n1\t0\t4294967295\n";
    let path = dir.join("mealy-with-holes.fsm");
    fs::write(&path, text).unwrap();
    let machine = Machine::load(&path).unwrap();
    assert_eq!(machine.kind(), MachineKind::Mealy);
    assert_eq!(machine.next_state(0, 0), NULL_STATE);
    assert_eq!(machine.next_state(0, 1), 1);
    assert_eq!(machine.output(0, 1), 1);
    assert_eq!(machine.next_state(1, 0), 0);
    assert_eq!(machine.output(1, 0), 2);
    assert_eq!(machine.output_count(), 3);
}

#[test]
fn missing_files_surface_as_io_errors() {
    let path = scratch_dir("missing").join("nowhere.fsm");
    assert!(matches!(Machine::load(&path), Err(FsmError::Io(_))));
}

#[test]
fn the_reduced_flag_round_trips() {
    let dir = scratch_dir("reduced-flag");
    let mut machine = populated_dfsm();
    machine.minimize();
    assert!(machine.is_reduced());
    let path = machine.save(&dir).unwrap();
    assert!(path.file_name().unwrap().to_str().unwrap().starts_with("DFSM_R"));
    let loaded = Machine::load(&path).unwrap();
    assert!(loaded.is_reduced());
    assert_eq!(loaded, machine);
}

#[test]
fn dot_export_describes_states_and_edges() {
    let dir = scratch_dir("dot");
    let machine = populated_dfsm();
    let path = machine.write_dot(&dir).unwrap();
    assert_eq!(path.extension().unwrap(), "dot");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("digraph { rankdir=LR;\n"));
    assert!(text.ends_with("}\n"));
    // state labels carry the state output on a second line
    assert!(text.contains("0 [label=\"0\\n0\"];"));
    assert!(text.contains("1 [label=\"1\\n1\"];"));
    // edge labels carry input and transition output
    assert!(text.contains("0 -> 1 [label=\"0 / 2\"];"));
    assert!(text.contains("2 -> 0 [label=\"0 / 3\"];"));
    // the undefined cell of state 2 produces no edge
    assert!(!text.contains("4294967295"));
}

#[test]
fn dot_export_of_a_mealy_machine_has_plain_state_labels() {
    let dir = scratch_dir("dot-mealy");
    let mut machine = Machine::new(MachineKind::Mealy, 2, 1, 1);
    machine.set_transition(0, 0, 1, 0).unwrap();
    let path = machine.write_dot(&dir).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("0 [label=\"0\"];"));
    assert!(text.contains("0 -> 1 [label=\"0 / 0\"];"));
}
