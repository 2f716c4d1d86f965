//! Cost models for circuits.
//!
//! Passes compare alternatives only through `<`, so any model that assigns a
//! consistent non-negative number to every circuit can be plugged in.

use crate::circuit::Circuit;
use crate::gate::Gate;

pub type Cost = u64;

/// Maps gates and circuits to a scalar cost.
pub trait CostFunction {
    /// Cost of a single gate placed in a circuit with `lines` lines.
    fn gate_cost(&self, gate: &Gate, lines: usize) -> Cost;

    /// Cost of a whole circuit. Defaults to the sum of its gate costs.
    fn cost(&self, circuit: &Circuit) -> Cost {
        circuit
            .gates()
            .iter()
            .map(|g| self.gate_cost(g, circuit.lines()))
            .fold(0, Cost::saturating_add)
    }
}

impl<C: CostFunction + ?Sized> CostFunction for Box<C> {
    fn gate_cost(&self, gate: &Gate, lines: usize) -> Cost {
        (**self).gate_cost(gate, lines)
    }

    fn cost(&self, circuit: &Circuit) -> Cost {
        (**self).cost(circuit)
    }
}

/// Every gate costs 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct GateCosts;

impl CostFunction for GateCosts {
    fn gate_cost(&self, _gate: &Gate, _lines: usize) -> Cost {
        1
    }
}

/// The number of lines of the circuit, independent of its gates.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCosts;

impl CostFunction for LineCosts {
    fn gate_cost(&self, _gate: &Gate, _lines: usize) -> Cost {
        0
    }

    fn cost(&self, circuit: &Circuit) -> Cost {
        circuit.lines() as Cost
    }
}

/// NCV quantum cost.
///
/// Multi-controlled Toffoli gates get cheaper decompositions when enough lines
/// are neither control nor target of the gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuantumCosts;

impl QuantumCosts {
    /// Quantum cost of a Toffoli gate with `controls` controls and `empty` free lines.
    pub fn toffoli(controls: usize, empty: usize) -> Cost {
        match controls {
            0 | 1 => 1,
            2 => 5,
            3 => 13,
            4 => {
                if empty >= 2 {
                    26
                } else {
                    29
                }
            }
            5..=9 => {
                // (enough free lines, at least one free line, none)
                let (a, b, c) = match controls {
                    5 => (38, 52, 61),
                    6 => (50, 80, 125),
                    7 => (62, 100, 253),
                    8 => (74, 128, 509),
                    _ => (86, 152, 1021),
                };
                if empty >= controls - 2 {
                    a
                } else if empty >= 1 {
                    b
                } else {
                    c
                }
            }
            c => {
                let c = c as Cost;
                if empty as Cost >= c - 2 {
                    12 * c - 22
                } else if empty >= 1 {
                    24 * c - 87
                } else {
                    1u64.checked_shl(c as u32 + 1).map_or(Cost::MAX, |p| p - 3)
                }
            }
        }
    }
}

impl CostFunction for QuantumCosts {
    fn gate_cost(&self, gate: &Gate, lines: usize) -> Cost {
        let controls = gate.controls().len();
        match gate {
            Gate::Toffoli { .. } => {
                let empty = lines.saturating_sub(controls + 1);
                Self::toffoli(controls, empty)
            }
            // A controlled swap is a Toffoli with one more control between two CNOTs.
            Gate::Fredkin { .. } => {
                let empty = lines.saturating_sub(controls + 2);
                Self::toffoli(controls + 1, empty) + 2
            }
        }
    }
}

/// Transistor cost: 8 transistors per control line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransistorCosts;

impl CostFunction for TransistorCosts {
    fn gate_cost(&self, gate: &Gate, _lines: usize) -> Cost {
        8 * gate.controls().len() as Cost
    }
}
