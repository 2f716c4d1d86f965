//! Adding lines: trading helper lines for cheaper gates.
//!
//! Large Toffoli gates are expensive. When several consecutive gates share a
//! subset of their controls (a *factor*), the conjunction of that factor can be
//! computed once onto a fresh helper line, used as a single control by all those
//! gates, and uncomputed afterwards:
//!
//! ```text
//! T({a, b, c} -> x)        T({a, b} -> h)
//! T({a, b, c} -> y)   =>   T({c, h} -> x)
//!                          T({c, h} -> y)
//!                          T({a, b} -> h)
//! ```
//!
//! For every helper line the circuit is scanned once. At each gate all factors
//! with at least two controls are tried, each on the longest run of following
//! Toffoli gates that leave the factor lines alone, and the factor with the
//! largest positive cost reduction is applied. The very last uncomputing gate of
//! a helper line is dropped, which leaves the helper line as garbage.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::circuit::Circuit;
use crate::cost::{Cost, CostFunction, QuantumCosts};
use crate::gate::Gate;

#[derive(Debug, Clone)]
pub struct AddingLinesConfig {
    /// Number of helper lines to add, one scan each (default: 1).
    pub additional_lines: usize,
}

impl Default for AddingLinesConfig {
    fn default() -> Self {
        Self { additional_lines: 1 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddingLinesStats {
    pub helper_lines: usize,
    pub factors_applied: usize,
    /// Sum of the cost reductions of all applied factors.
    pub cost_reduction: Cost,
    pub runtime: Duration,
}

/// The adding lines pass.
pub struct AddingLines {
    pub config: AddingLinesConfig,
    cost: Box<dyn CostFunction>,
}

impl Default for AddingLines {
    fn default() -> Self {
        Self::new(AddingLinesConfig::default())
    }
}

/// A factor and the gate range `[start, end)` it would be applied to.
#[derive(Debug, Clone)]
struct Factoring {
    factor: Vec<usize>,
    end: usize,
    cost_reduction: Cost,
}

fn includes(gate: &Gate, factor: &[usize]) -> bool {
    factor.iter().all(|&c| gate.has_control(c))
}

/// Replaces the factor controls of `gate` by a control on `helper`, if it has all of them.
fn factor_out(gate: &mut Gate, factor: &[usize], helper: usize) {
    if !includes(gate, factor) {
        return;
    }
    for &c in factor {
        gate.remove_control(c);
    }
    gate.add_control(helper);
}

impl AddingLines {
    pub fn new(config: AddingLinesConfig) -> Self {
        Self {
            config,
            cost: Box::new(QuantumCosts),
        }
    }

    pub fn with_cost(mut self, cost: impl CostFunction + 'static) -> Self {
        self.cost = Box::new(cost);
        self
    }

    /// End of the longest run of Toffoli gates from `start` that do not target a factor line.
    fn find_suitable_gates(circuit: &Circuit, start: usize, factor: &[usize]) -> usize {
        (start..circuit.num_gates())
            .find(|&i| {
                let gate = circuit.gate(i);
                !gate.is_toffoli() || factor.iter().any(|&l| gate.has_target(l))
            })
            .unwrap_or(circuit.num_gates())
    }

    /// Cost of `[start, end)` minus the cost of its factored version, if positive.
    fn cost_reduction(&self, circuit: &Circuit, start: usize, end: usize, factor: &[usize], helper: usize) -> Option<Cost> {
        let original = circuit.subcircuit(start, end);

        let mut factored = original.clone();
        for i in 0..factored.num_gates() {
            factor_out(factored.gate_mut(i), factor, helper);
        }
        let bracket = Gate::toffoli(factor.iter().copied(), helper);
        factored.prepend_gate(bracket.clone());
        factored.append_gate(bracket);

        let old_cost = self.cost.cost(&original);
        let new_cost = self.cost.cost(&factored);
        old_cost.checked_sub(new_cost).filter(|&r| r > 0)
    }

    /// The best factor of the gate at `index`, if any reduces cost.
    fn best_factoring(&self, circuit: &Circuit, index: usize, helper: usize) -> Option<Factoring> {
        let controls: Vec<usize> = circuit.gate(index).controls().iter().copied().collect();
        assert!(controls.len() < u64::BITS as usize, "Too many controls to enumerate factors");

        let mut best: Option<Factoring> = None;
        for mask in 1u64..(1 << controls.len()) {
            if mask.count_ones() <= 1 {
                continue;
            }
            let factor: Vec<usize> = (0..controls.len())
                .filter(|&i| mask & (1 << i) != 0)
                .map(|i| controls[i])
                .collect();

            let end = Self::find_suitable_gates(circuit, index, &factor);
            let Some(cost_reduction) = self.cost_reduction(circuit, index, end, &factor, helper) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| cost_reduction > b.cost_reduction) {
                best = Some(Factoring {
                    factor,
                    end,
                    cost_reduction,
                });
            }
        }
        best
    }

    /// Adds helper lines to a copy of `base` wherever factoring controls reduces cost.
    pub fn run(&self, base: &Circuit) -> (Circuit, AddingLinesStats) {
        let start = Instant::now();
        let mut stats = AddingLinesStats::default();
        let mut circuit = base.clone();

        for _ in 0..self.config.additional_lines {
            let helper = circuit.add_line("helper", "helper", Some(false), true);
            stats.helper_lines += 1;

            let mut last_helper_gate: Option<usize> = None;
            let mut current = 0;
            while current < circuit.num_gates() {
                if !circuit.gate(current).is_toffoli() {
                    current += 1;
                    continue;
                }
                let Some(Factoring {
                    factor,
                    end,
                    cost_reduction,
                }) = self.best_factoring(&circuit, current, helper)
                else {
                    current += 1;
                    continue;
                };

                debug!(
                    "Factoring {:?} onto line {} over gates {}..{} saves {}",
                    factor, helper, current, end, cost_reduction
                );
                for i in current..end {
                    factor_out(circuit.gate_mut(i), &factor, helper);
                }
                let bracket = Gate::toffoli(factor.iter().copied(), helper);
                circuit.insert_gate(current, bracket.clone());
                let end = end + 1;
                circuit.insert_gate(end, bracket);
                last_helper_gate = Some(end);
                current = end + 1;

                stats.factors_applied += 1;
                stats.cost_reduction += cost_reduction;
            }

            // The helper line is garbage, so its last uncomputation is not needed.
            if let Some(index) = last_helper_gate {
                circuit.remove_gate_at(index);
            }
        }

        stats.runtime = start.elapsed();
        info!(
            "Adding lines: {} helper lines, {} factors applied, cost reduced by at least {} in {:?}",
            stats.helper_lines, stats.factors_applied, stats.cost_reduction, stats.runtime
        );
        (circuit, stats)
    }
}
