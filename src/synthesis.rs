//! Truth-table synthesis of reversible circuits.
//!
//! # Embedding
//!
//! The specifications handed over by the optimization passes are usually
//! neither complete nor reversible: some inputs are unreachable, and some output
//! positions are don't-cares. [`embed_truth_table`] completes such a table into
//! a permutation of all `2^n` assignments:
//!
//! 1. Every specified row picks the first unused assignment that agrees with its
//!    fixed output bits, preferring the row's own input (no change is cheapest).
//! 2. Rows without an entry keep their input where possible and otherwise take
//!    the smallest assignment still unused.
//!
//! Step 1 fails when one output pattern is demanded by more rows than the free
//! positions can tell apart.
//!
//! # Transformation-based synthesis
//!
//! [`TransformationBasedSynthesis`] implements the algorithm of Miller, Maslov
//! and Dueck: walk the assignments in ascending order and add Toffoli gates that
//! map the current row onto itself without disturbing any smaller row. The
//! bidirectional variant may instead place gates on the input side, whichever
//! side needs fewer bit flips.
//!
//! # References
//!
//! - D. M. Miller, D. Maslov, G. W. Dueck. "A transformation based algorithm for
//!   reversible logic synthesis." DAC 2003.

use log::debug;
use thiserror::Error;

use crate::circuit::Circuit;
use crate::gate::Gate;
use crate::truth_table::TruthTable;

/// Reasons why a synthesizer gives up on a specification.
///
/// None of these are errors of the caller: an optimization pass simply treats
/// the candidate as rejected.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SynthesisError {
    #[error("specification over {lines} lines exceeds the limit of {limit}")]
    TooManyLines { lines: usize, limit: usize },
    #[error("output order {order:?} does not fit a specification with {inputs} inputs and {outputs} outputs")]
    OrderMismatch {
        order: Vec<usize>,
        inputs: usize,
        outputs: usize,
    },
    #[error("input {input:#b} needs an output that no don't-care assignment can keep distinct")]
    Ambiguous { input: u64 },
    #[error("synthesized circuit exceeds the limit of {limit} gates")]
    GateLimitExceeded { limit: usize },
}

/// Produces a circuit from a (partial) truth table.
pub trait Synthesizer {
    /// Synthesizes a circuit with `spec.num_inputs()` lines.
    ///
    /// Output position `k` of the specification is realized on line `order[k]`.
    fn synthesize(&self, spec: &TruthTable, order: &[usize]) -> Result<Circuit, SynthesisError>;
}

impl<F> Synthesizer for F
where
    F: Fn(&TruthTable, &[usize]) -> Result<Circuit, SynthesisError>,
{
    fn synthesize(&self, spec: &TruthTable, order: &[usize]) -> Result<Circuit, SynthesisError> {
        self(spec, order)
    }
}

/// Completes a partial specification into a permutation of `0..2^n`.
///
/// `perm[x]` is the output assignment for input `x`; bit `i` is line `i`.
pub fn embed_truth_table(spec: &TruthTable, order: &[usize], max_lines: usize) -> Result<Vec<u64>, SynthesisError> {
    let n = spec.num_inputs();
    if n > max_lines {
        return Err(SynthesisError::TooManyLines { lines: n, limit: max_lines });
    }
    let order_is_valid = order.len() == spec.num_outputs()
        && order.iter().all(|&l| l < n)
        && order.iter().enumerate().all(|(i, l)| !order[..i].contains(l));
    if !order_is_valid {
        return Err(SynthesisError::OrderMismatch {
            order: order.to_vec(),
            inputs: n,
            outputs: spec.num_outputs(),
        });
    }

    let size = 1usize << n;
    let mut perm: Vec<Option<u64>> = vec![None; size];
    let mut used = vec![false; size];

    for (input, cube) in spec.entries() {
        let x = input.to_u64();

        let mut fixed_mask = 0u64;
        let mut fixed_value = 0u64;
        for (&line, bit) in order.iter().zip(cube) {
            if let Some(b) = bit {
                fixed_mask |= 1 << line;
                fixed_value |= (*b as u64) << line;
            }
        }
        let free: Vec<usize> = (0..n).filter(|&l| fixed_mask & (1 << l) == 0).collect();

        let candidate = if x & fixed_mask == fixed_value && !used[x as usize] {
            Some(x)
        } else {
            (0..(1u64 << free.len()))
                .map(|t| {
                    free.iter()
                        .enumerate()
                        .fold(fixed_value, |acc, (i, &l)| acc | (((t >> i) & 1) << l))
                })
                .find(|&y| !used[y as usize])
        };

        match candidate {
            Some(y) => {
                perm[x as usize] = Some(y);
                used[y as usize] = true;
            }
            None => return Err(SynthesisError::Ambiguous { input: x }),
        }
    }

    // Unspecified rows: identity first, then the smallest free assignment.
    for x in 0..size {
        if perm[x].is_none() && !used[x] {
            perm[x] = Some(x as u64);
            used[x] = true;
        }
    }
    let mut unused = (0..size).filter(|&y| !used[y]);
    let perm = perm
        .into_iter()
        .map(|y| match y {
            Some(y) => y,
            None => unused.next().expect("permutation has as many free outputs as free inputs") as u64,
        })
        .collect();
    Ok(perm)
}

/// Transformation-based synthesis with truth-table embedding.
#[derive(Debug, Clone)]
pub struct TransformationBasedSynthesis {
    /// Place gates on whichever side of the function needs fewer flips.
    pub bidirectional: bool,
    /// Give up once more than this many gates are needed.
    pub gate_limit: Option<usize>,
    /// Largest specification (in lines) that is attempted at all.
    pub max_lines: usize,
}

impl Default for TransformationBasedSynthesis {
    fn default() -> Self {
        Self {
            bidirectional: true,
            gate_limit: None,
            max_lines: 16,
        }
    }
}

fn mask_lines(mask: u64) -> impl Iterator<Item = usize> {
    (0..u64::BITS as usize).filter(move |&l| mask & (1 << l) != 0)
}

fn apply(gate: &Gate, x: u64) -> u64 {
    let Gate::Toffoli { controls, target } = gate else {
        unreachable!("transformation-based synthesis only emits Toffoli gates")
    };
    if controls.iter().all(|&c| x & (1 << c) != 0) {
        x ^ (1 << target)
    } else {
        x
    }
}

/// Gates turning assignment `from` into `to` while fixing every assignment
/// below `min(from, to)`. Returned in application order.
fn transform(from: u64, to: u64) -> Vec<Gate> {
    let mut gates = Vec::new();
    let mut v = from;
    // Set the missing ones, controlled on the ones already present.
    for t in mask_lines(to & !v) {
        gates.push(Gate::toffoli(mask_lines(v), t));
        v |= 1 << t;
    }
    // Clear the extra ones, controlled on the ones of the goal.
    for t in mask_lines(v & !to) {
        gates.push(Gate::toffoli(mask_lines(to), t));
        v &= !(1 << t);
    }
    debug_assert_eq!(v, to);
    gates
}

impl TransformationBasedSynthesis {
    fn check_limit(&self, num_gates: usize) -> Result<(), SynthesisError> {
        match self.gate_limit {
            Some(limit) if num_gates > limit => Err(SynthesisError::GateLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    /// Synthesizes a permutation of `0..2^lines`.
    pub fn synthesize_permutation(&self, lines: usize, perm: &[u64]) -> Result<Circuit, SynthesisError> {
        assert_eq!(perm.len(), 1 << lines, "Permutation must cover all assignments");
        let mut f = perm.to_vec();
        let mut input_side: Vec<Gate> = Vec::new();
        let mut output_side: Vec<Gate> = Vec::new();

        for i in 0..f.len() {
            let x = i as u64;
            let y = f[i];
            if y == x {
                continue;
            }

            let use_input_side = self.bidirectional && {
                let j = f.iter().position(|&v| v == x).expect("f is a permutation") as u64;
                (x ^ j).count_ones() < (x ^ y).count_ones()
            };

            if use_input_side {
                // f <- f . g for gates mapping x to the row that currently produces x.
                let j = f.iter().position(|&v| v == x).expect("f is a permutation") as u64;
                for gate in transform(x, j).into_iter().rev() {
                    f = (0..f.len()).map(|r| f[apply(&gate, r as u64) as usize]).collect();
                    input_side.push(gate);
                }
            } else {
                // f <- g . f for gates mapping y back to x.
                for gate in transform(y, x) {
                    for v in f.iter_mut() {
                        *v = apply(&gate, *v);
                    }
                    output_side.push(gate);
                }
            }
            debug_assert_eq!(f[i], x);
            self.check_limit(input_side.len() + output_side.len())?;
        }

        let mut circuit = Circuit::new(lines);
        for gate in input_side.into_iter().chain(output_side.into_iter().rev()) {
            circuit.append_gate(gate);
        }
        Ok(circuit)
    }
}

impl Synthesizer for TransformationBasedSynthesis {
    fn synthesize(&self, spec: &TruthTable, order: &[usize]) -> Result<Circuit, SynthesisError> {
        let perm = embed_truth_table(spec, order, self.max_lines)?;
        let circuit = self.synthesize_permutation(spec.num_inputs(), &perm)?;
        debug!(
            "Synthesized {} rows over {} lines with {} gates",
            spec.len(),
            spec.num_inputs(),
            circuit.num_gates()
        );
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::bitset::BitSet;
    use crate::simulation::{circuit_to_truth_table, SimpleSimulator, Simulator};

    fn realizes(circuit: &Circuit, perm: &[u64]) -> bool {
        (0..perm.len()).all(|x| {
            let out = SimpleSimulator.simulate(circuit, &BitSet::from_u64(circuit.lines(), x as u64));
            out.to_u64() == perm[x]
        })
    }

    #[test]
    fn test_synthesize_identity() {
        let tbs = TransformationBasedSynthesis::default();
        let circ = tbs.synthesize_permutation(3, &(0..8).collect::<Vec<_>>()).unwrap();
        assert!(circ.is_empty());
    }

    #[test]
    fn test_synthesize_permutations() {
        let perms: Vec<Vec<u64>> = vec![
            vec![1, 0, 3, 2],
            vec![0, 1, 3, 2],
            vec![7, 0, 1, 2, 3, 4, 5, 6],
            vec![1, 0, 3, 2, 5, 7, 4, 6],
            vec![3, 6, 0, 5, 7, 1, 2, 4],
        ];
        for bidirectional in [false, true] {
            let tbs = TransformationBasedSynthesis {
                bidirectional,
                ..Default::default()
            };
            for perm in &perms {
                let lines = perm.len().trailing_zeros() as usize;
                let circ = tbs.synthesize_permutation(lines, perm).unwrap();
                assert!(realizes(&circ, perm), "perm {:?} (bidirectional={})", perm, bidirectional);
            }
        }
    }

    #[test]
    fn test_resynthesize_circuit() {
        let original = Circuit::from_gates(
            3,
            [Gate::toffoli([0, 1], 2), Gate::cnot(2, 0), Gate::not(1), Gate::cnot(1, 2)],
        );
        let spec = circuit_to_truth_table(&original, &SimpleSimulator);
        let circ = TransformationBasedSynthesis::default()
            .synthesize(&spec, &[0, 1, 2])
            .unwrap();
        assert_eq!(circuit_to_truth_table(&circ, &SimpleSimulator), spec);
    }

    #[test]
    fn test_gate_limit() {
        let tbs = TransformationBasedSynthesis {
            gate_limit: Some(1),
            ..Default::default()
        };
        let result = tbs.synthesize_permutation(3, &[7, 0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(result, Err(SynthesisError::GateLimitExceeded { limit: 1 }));
    }

    #[test]
    fn test_embed_with_dont_cares() {
        // Two lines, the output only constrains line 1 (to 0); line 0 is free.
        let mut spec = TruthTable::new(2, 1);
        spec.add_entry(BitSet::from_u64(2, 0b00), vec![Some(false)]);
        spec.add_entry(BitSet::from_u64(2, 0b11), vec![Some(false)]);
        let perm = embed_truth_table(&spec, &[1], 16).unwrap();
        assert_eq!(perm[0], 0b00);
        assert_eq!(perm[3], 0b01);
        let mut sorted = perm.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3]);

        let circ = TransformationBasedSynthesis::default().synthesize(&spec, &[1]).unwrap();
        assert!(realizes(&circ, &perm));
    }

    #[test]
    fn test_embed_ambiguous() {
        // Three rows need line 1 = 0, but only two values of line 0 remain.
        let mut spec = TruthTable::new(2, 1);
        for x in [0b00, 0b01, 0b10] {
            spec.add_entry(BitSet::from_u64(2, x), vec![Some(false)]);
        }
        assert_eq!(
            embed_truth_table(&spec, &[1], 16),
            Err(SynthesisError::Ambiguous { input: 0b10 })
        );
    }

    #[test]
    fn test_embed_rejects_bad_order() {
        let spec = TruthTable::new(2, 1);
        assert!(matches!(
            embed_truth_table(&spec, &[0, 1], 16),
            Err(SynthesisError::OrderMismatch { .. })
        ));
        assert!(matches!(
            embed_truth_table(&spec, &[2], 16),
            Err(SynthesisError::OrderMismatch { .. })
        ));
        assert_eq!(
            embed_truth_table(&spec, &[0], 1),
            Err(SynthesisError::TooManyLines { lines: 2, limit: 1 })
        );
    }

    #[test]
    fn test_closure_synthesizer() {
        let trivial = |spec: &TruthTable, _: &[usize]| Ok::<_, SynthesisError>(Circuit::new(spec.num_inputs()));
        let circ = trivial.synthesize(&TruthTable::new(2, 2), &[0, 1]).unwrap();
        assert_eq!(circ.lines(), 2);
    }
}
