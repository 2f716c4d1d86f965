//! Gate-level simulation of reversible circuits.
//!
//! The passes only need the [`Simulator`] capability: given a circuit and a
//! full-width input assignment, produce the full-width output assignment.
//! [`SimpleSimulator`] evaluates gate by gate; closures can be plugged in too.

use std::collections::HashMap;

use log::debug;

use crate::bitset::BitSet;
use crate::circuit::Circuit;
use crate::gate::Gate;
use crate::truth_table::TruthTable;

/// Largest number of inputs enumerated exhaustively.
pub const MAX_ENUMERATED_INPUTS: usize = 24;

pub trait Simulator {
    /// Simulates `circuit` on a full-width `input`; the result has the same width.
    fn simulate(&self, circuit: &Circuit, input: &BitSet) -> BitSet;
}

impl<F> Simulator for F
where
    F: Fn(&Circuit, &BitSet) -> BitSet,
{
    fn simulate(&self, circuit: &Circuit, input: &BitSet) -> BitSet {
        self(circuit, input)
    }
}

/// Straightforward gate-by-gate simulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleSimulator;

impl SimpleSimulator {
    fn apply(gate: &Gate, state: &mut BitSet) {
        if !state.all(gate.controls().iter().copied()) {
            return;
        }
        match gate {
            Gate::Toffoli { target, .. } => state.flip(*target),
            Gate::Fredkin { targets, .. } => state.swap(targets[0], targets[1]),
        }
    }
}

impl Simulator for SimpleSimulator {
    fn simulate(&self, circuit: &Circuit, input: &BitSet) -> BitSet {
        assert_eq!(
            input.width(),
            circuit.lines(),
            "Input width {} does not match {} lines",
            input.width(),
            circuit.lines()
        );
        let mut state = input.clone();
        for gate in circuit {
            Self::apply(gate, &mut state);
        }
        state
    }
}

/// Number of lines that are not fixed to a constant.
pub fn num_free_inputs(circuit: &Circuit) -> usize {
    circuit.constants().iter().filter(|c| c.is_none()).count()
}

/// Builds the full input assignment: constant lines get their constant, free
/// lines consume `free_inputs` in ascending line order.
pub fn full_input(circuit: &Circuit, free_inputs: &BitSet) -> BitSet {
    assert_eq!(
        free_inputs.width(),
        num_free_inputs(circuit),
        "Expected one bit per free input"
    );
    let mut input = BitSet::new(circuit.lines());
    let mut pos = 0;
    for (line, constant) in circuit.constants().iter().enumerate() {
        let value = match constant {
            Some(value) => *value,
            None => {
                pos += 1;
                free_inputs.get(pos - 1)
            }
        };
        input.set(line, value);
    }
    input
}

/// Simulates a circuit whose constant lines are filled in from its metadata.
///
/// Returns the full-width output, garbage lines included.
pub fn partial_simulation(simulator: &dyn Simulator, circuit: &Circuit, free_inputs: &BitSet) -> BitSet {
    simulator.simulate(circuit, &full_input(circuit, free_inputs))
}

/// Simulates `circuit` on all `2^lines` inputs, ignoring constants and garbage.
pub fn circuit_to_truth_table(circuit: &Circuit, simulator: &dyn Simulator) -> TruthTable {
    let n = circuit.lines();
    assert!(n <= MAX_ENUMERATED_INPUTS, "Cannot enumerate {} inputs", n);

    let mut spec = TruthTable::new(n, n);
    for x in 0..(1u64 << n) {
        let input = BitSet::from_u64(n, x);
        let output = simulator.simulate(circuit, &input);
        spec.add_entry(input, output.bits().map(Some).collect());
    }
    spec
}

/// Checks by exhaustive simulation that `candidate` computes the same observable
/// function as `reference`.
///
/// Free inputs are matched by input name and non-garbage outputs by output name,
/// so the two circuits may differ in line order, helper lines, and constants.
pub fn check_equivalence(reference: &Circuit, candidate: &Circuit, simulator: &dyn Simulator) -> bool {
    let free_names = |c: &Circuit| -> Vec<String> {
        let mut names: Vec<String> = c
            .inputs()
            .iter()
            .zip(c.constants())
            .filter(|(_, constant)| constant.is_none())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    };
    let names = free_names(reference);
    if names != free_names(candidate) {
        debug!("Free inputs differ: {:?} vs {:?}", names, free_names(candidate));
        return false;
    }
    assert!(names.len() <= MAX_ENUMERATED_INPUTS, "Cannot enumerate {} inputs", names.len());

    let observable = |c: &Circuit| -> HashMap<String, usize> {
        (0..c.lines())
            .filter(|&l| !c.garbage()[l])
            .map(|l| (c.outputs()[l].clone(), l))
            .collect()
    };
    let reference_outputs = observable(reference);
    let candidate_outputs = observable(candidate);
    if reference_outputs.len() != candidate_outputs.len()
        || reference_outputs.keys().any(|name| !candidate_outputs.contains_key(name))
    {
        debug!("Observable outputs differ");
        return false;
    }

    let assign = |c: &Circuit, values: &HashMap<&str, bool>| -> BitSet {
        let mut input = BitSet::new(c.lines());
        for line in 0..c.lines() {
            let value = match c.constants()[line] {
                Some(value) => value,
                None => values[c.inputs()[line].as_str()],
            };
            input.set(line, value);
        }
        input
    };

    for x in 0..(1u64 << names.len()) {
        let values: HashMap<&str, bool> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), (x >> i) & 1 != 0))
            .collect();
        let out_ref = simulator.simulate(reference, &assign(reference, &values));
        let out_cand = simulator.simulate(candidate, &assign(candidate, &values));
        for (name, &line) in &reference_outputs {
            if out_ref.get(line) != out_cand.get(candidate_outputs[name]) {
                debug!("Output {} differs for free inputs {:?}", name, values);
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_simulate_toffoli() {
        let circ = Circuit::from_gates(3, [Gate::toffoli([0, 1], 2)]);
        let sim = SimpleSimulator;
        assert_eq!(sim.simulate(&circ, &BitSet::from_u64(3, 0b011)).to_u64(), 0b111);
        assert_eq!(sim.simulate(&circ, &BitSet::from_u64(3, 0b001)).to_u64(), 0b001);
    }

    #[test]
    fn test_simulate_fredkin() {
        let circ = Circuit::from_gates(3, [Gate::fredkin([0], 1, 2)]);
        let sim = SimpleSimulator;
        assert_eq!(sim.simulate(&circ, &BitSet::from_u64(3, 0b011)).to_u64(), 0b101);
        assert_eq!(sim.simulate(&circ, &BitSet::from_u64(3, 0b010)).to_u64(), 0b010);
    }

    #[test]
    fn test_partial_simulation() {
        let mut circ = Circuit::from_gates(3, [Gate::toffoli([0, 2], 1)]);
        circ.set_constant(1, Some(false));
        // Free inputs are lines 0 and 2.
        let out = partial_simulation(&SimpleSimulator, &circ, &BitSet::from_u64(2, 0b11));
        assert_eq!(out.to_u64(), 0b111);
        let out = partial_simulation(&SimpleSimulator, &circ, &BitSet::from_u64(2, 0b01));
        assert_eq!(out.to_u64(), 0b001);
    }

    #[test]
    fn test_circuit_to_truth_table() {
        let circ = Circuit::from_gates(2, [Gate::cnot(0, 1)]);
        let spec = circuit_to_truth_table(&circ, &SimpleSimulator);
        assert!(spec.is_fully_specified());
        assert_eq!(
            spec.get(&BitSet::from_u64(2, 0b01)),
            Some(&vec![Some(true), Some(true)])
        );
    }

    #[test]
    fn test_closure_simulator() {
        let identity = |_: &Circuit, input: &BitSet| input.clone();
        let circ = Circuit::from_gates(1, [Gate::not(0)]);
        assert_eq!(identity.simulate(&circ, &BitSet::from_u64(1, 0)).to_u64(), 0);
    }

    #[test]
    fn test_equivalence() {
        // Two CNOTs in either order compute the same function.
        let a = Circuit::from_gates(3, [Gate::cnot(0, 1), Gate::cnot(0, 2)]);
        let b = Circuit::from_gates(3, [Gate::cnot(0, 2), Gate::cnot(0, 1)]);
        assert!(check_equivalence(&a, &b, &SimpleSimulator));

        let c = Circuit::from_gates(3, [Gate::cnot(0, 1)]);
        assert!(!check_equivalence(&a, &c, &SimpleSimulator));
    }

    #[test]
    fn test_equivalence_ignores_garbage() {
        let mut a = Circuit::from_gates(2, [Gate::cnot(0, 1)]);
        a.set_garbage_line(1, true);
        let mut b = Circuit::new(2);
        b.set_garbage_line(1, true);
        assert!(check_equivalence(&a, &b, &SimpleSimulator));
    }
}
