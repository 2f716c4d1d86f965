//! Line reduction: eliminating garbage lines.
//!
//! # Idea
//!
//! A garbage line carries a value nobody reads at the end of the circuit. If the
//! last gates using that line can be re-synthesized so that the line ends up
//! holding a known constant, the line can take over the job of a constant input
//! that is only needed *later*. That constant line is then no longer required and
//! is removed from the circuit.
//!
//! # Algorithm
//!
//! Repeat until no garbage line is left to try:
//!
//! 1. Pick the garbage line whose last control occurs earliest. A line that is
//!    never used as a control ranks at position 0. If it is a constant ancilla
//!    that is only ever a Toffoli target, its gates are deleted and the line is
//!    dropped right away.
//! 2. Take the window that ends with the last gate touching that line and grows
//!    backwards while it spans at most `max_lines` lines.
//! 3. Find a constant line that is untouched up to the end of the window and
//!    whose first use comes as late as possible.
//! 4. Classify every window line as [`LineRole::Constant`] (the garbage line,
//!    which must end up holding the constant), [`LineRole::StillUsed`], or
//!    [`LineRole::DontCare`] (garbage and never touched again).
//! 5. Simulate the window on every input reachable from the circuit prefix, and
//!    build a truth table whose don't-care positions are the don't-care lines.
//! 6. If the table cannot be embedded (an output pattern occurs more often than
//!    the don't-care lines can separate), or the prefix has too many variables,
//!    grow the window and retry, up to `max_grow_up_window_lines`.
//! 7. Synthesize the window, splice it in, and remove the constant line, moving
//!    its remaining uses onto the garbage line.
//!
//! Each garbage line that cannot be reduced is skipped for the rest of the run.
//!
//! # Example
//!
//! ```
//! use revopt::circuit::Circuit;
//! use revopt::gate::Gate;
//! use revopt::line_reduction::LineReduction;
//!
//! // Line 2 is a garbage ancilla; line 3 a constant used only afterwards.
//! let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 2), Gate::cnot(2, 1), Gate::cnot(0, 3)]);
//! circ.set_constant(2, Some(false));
//! circ.set_garbage_line(2, true);
//! circ.set_constant(3, Some(false));
//!
//! let (reduced, stats) = LineReduction::default().run(&circ);
//! assert_eq!(reduced.lines(), 3);
//! assert_eq!(stats.removed_lines, 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::bitset::BitSet;
use crate::circuit::{Circuit, Window};
use crate::simulation::{full_input, num_free_inputs, partial_simulation, SimpleSimulator, Simulator};
use crate::synthesis::{Synthesizer, TransformationBasedSynthesis};
use crate::truth_table::{Cube, TruthTable};

#[derive(Debug, Clone)]
pub struct LineReductionConfig {
    /// Initial bound on the number of lines in a window (default: 6).
    pub max_window_lines: usize,
    /// Bound up to which a window is grown before giving up (default: 9).
    pub max_grow_up_window_lines: usize,
    /// Largest number of prefix variables enumerated to find reachable window inputs (default: 17).
    pub window_variables_threshold: usize,
}

impl Default for LineReductionConfig {
    fn default() -> Self {
        Self {
            max_window_lines: 6,
            max_grow_up_window_lines: 9,
            window_variables_threshold: 17,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineReductionStats {
    /// Number of windows built, retries included.
    pub num_considered_windows: usize,
    /// Garbage lines given up because the window could not grow any further.
    pub skipped_max_window_lines: usize,
    /// Garbage lines given up because their window specification stayed ambiguous.
    pub skipped_ambiguous_line: usize,
    /// Garbage lines given up because no constant line was available.
    pub skipped_no_constant_line: usize,
    /// Garbage lines given up because the synthesizer failed.
    pub skipped_synthesis_failed: usize,
    pub removed_lines: usize,
    pub runtime: Duration,
}

/// What a window line must produce at the end of the window.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LineRole {
    /// Must hold this value.
    Constant(bool),
    /// Must keep its simulated value.
    StillUsed,
    /// Value is irrelevant.
    DontCare,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum SkipReason {
    NoConstantLine,
    MaxWindowLines,
    Ambiguous,
    SynthesisFailed,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Attempt {
    Reduced,
    Retry,
    Unreducible(SkipReason),
}

/// The line reduction pass.
pub struct LineReduction {
    pub config: LineReductionConfig,
    simulator: Box<dyn Simulator>,
    synthesizer: Box<dyn Synthesizer>,
}

impl Default for LineReduction {
    fn default() -> Self {
        Self::new(LineReductionConfig::default())
    }
}

impl LineReduction {
    pub fn new(config: LineReductionConfig) -> Self {
        Self {
            config,
            simulator: Box::new(SimpleSimulator),
            synthesizer: Box::new(TransformationBasedSynthesis::default()),
        }
    }

    pub fn with_simulator(mut self, simulator: impl Simulator + 'static) -> Self {
        self.simulator = Box::new(simulator);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: impl Synthesizer + 'static) -> Self {
        self.synthesizer = Box::new(synthesizer);
        self
    }

    /// Removes as many garbage lines from a copy of `base` as possible.
    pub fn run(&self, base: &Circuit) -> (Circuit, LineReductionStats) {
        let start = Instant::now();
        let mut run = Run {
            pass: self,
            circuit: base.clone(),
            original_lines: (0..base.lines()).collect(),
            lines_to_skip: BTreeSet::new(),
            max_lines: self.config.max_window_lines,
            stats: LineReductionStats::default(),
        };
        run.reduce();

        let Run { circuit, mut stats, .. } = run;
        stats.runtime = start.elapsed();
        info!(
            "Line reduction: {} -> {} lines, {} windows considered in {:?}",
            base.lines(),
            circuit.lines(),
            stats.num_considered_windows,
            stats.runtime
        );
        (circuit, stats)
    }
}

/// State of a single line reduction run.
struct Run<'a> {
    pass: &'a LineReduction,
    circuit: Circuit,
    /// Maps current line indices to line indices of the input circuit.
    original_lines: Vec<usize>,
    /// Garbage lines, by original index, that turned out unreducible.
    lines_to_skip: BTreeSet<usize>,
    max_lines: usize,
    stats: LineReductionStats,
}

impl Run<'_> {
    fn reduce(&mut self) {
        while let Some(garbage_line) = self.find_garbage_line() {
            self.stats.num_considered_windows += 1;

            match self.try_reduce(garbage_line) {
                Attempt::Reduced => {
                    self.stats.removed_lines += 1;
                    self.max_lines = self.pass.config.max_window_lines;
                }
                Attempt::Retry => {
                    self.max_lines += 1;
                    debug!("Growing window for line {} to {} lines", garbage_line, self.max_lines);
                }
                Attempt::Unreducible(reason) => {
                    debug!("Skipping garbage line {}: {:?}", garbage_line, reason);
                    match reason {
                        SkipReason::NoConstantLine => self.stats.skipped_no_constant_line += 1,
                        SkipReason::MaxWindowLines => self.stats.skipped_max_window_lines += 1,
                        SkipReason::Ambiguous => self.stats.skipped_ambiguous_line += 1,
                        SkipReason::SynthesisFailed => self.stats.skipped_synthesis_failed += 1,
                    }
                    self.lines_to_skip.insert(self.original_lines[garbage_line]);
                    self.max_lines = self.pass.config.max_window_lines;
                }
            }
        }
    }

    /// Retry if the window may still grow, otherwise give up for `reason`.
    fn grow_or_skip(&self, reason: SkipReason) -> Attempt {
        if self.max_lines < self.pass.config.max_grow_up_window_lines {
            Attempt::Retry
        } else {
            Attempt::Unreducible(reason)
        }
    }

    /// The garbage line whose last control comes first.
    fn find_garbage_line(&self) -> Option<usize> {
        (0..self.circuit.lines())
            .filter(|&line| self.circuit.garbage()[line])
            .filter(|&line| !self.lines_to_skip.contains(&self.original_lines[line]))
            .min_by_key(|&line| self.circuit.last_control(line).unwrap_or(0))
    }

    /// The window ending with the last gate on `garbage_line`, spanning at most `max_lines` lines.
    fn find_window(&self, garbage_line: usize) -> Window {
        let end = self.circuit.last_touch(garbage_line).map_or(0, |last| last + 1);

        let mut start = end;
        while start > 0 && self.circuit.non_empty_lines(start - 1..end).len() <= self.max_lines {
            start -= 1;
        }

        let mut filter = self.circuit.non_empty_lines(start..end);
        filter.insert(garbage_line);
        self.circuit.window(start, end, filter.into_iter().collect())
    }

    /// The constant line, other than `garbage_line`, untouched before `window_end`
    /// and first used as late as possible.
    fn find_constant_line(&self, garbage_line: usize, window_end: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for line in 0..self.circuit.lines() {
            if line == garbage_line || self.circuit.constants()[line].is_none() {
                continue;
            }
            if self.circuit.is_touched(line, 0..window_end) {
                continue;
            }
            let first_use = self.circuit.first_touch(line).unwrap_or(usize::MAX);
            if best.map_or(true, |(_, pos)| first_use > pos) {
                best = Some((line, first_use));
            }
        }
        best.map(|(line, _)| line)
    }

    fn line_roles(&self, window: &Window, garbage_line: usize, constant: bool) -> Vec<LineRole> {
        window
            .filter()
            .iter()
            .map(|&line| {
                if line == garbage_line {
                    LineRole::Constant(constant)
                } else if !self.circuit.garbage()[line]
                    || self.circuit.is_touched(line, window.end()..self.circuit.num_gates())
                {
                    LineRole::StillUsed
                } else {
                    LineRole::DontCare
                }
            })
            .collect()
    }

    /// Window inputs that can occur, in window-local bit order.
    ///
    /// Returns `None` if the prefix has too many variables to enumerate.
    fn reachable_inputs(&self, window: &Window) -> Option<BTreeSet<u64>> {
        let mut inputs = BTreeSet::new();

        if window.offset() == 0 {
            let local = window.circuit();
            let free = num_free_inputs(local);
            for x in 0..(1u64 << free) {
                inputs.insert(full_input(local, &BitSet::from_u64(free, x)).to_u64());
            }
            return Some(inputs);
        }

        let mut before_filter = self.circuit.non_empty_lines(0..window.end());
        before_filter.extend(window.filter().iter().copied());
        let before_filter: Vec<usize> = before_filter.into_iter().collect();

        let prefix = self.circuit.window(0, window.offset(), before_filter.clone());
        let vars = num_free_inputs(prefix.circuit());
        if vars >= self.pass.config.window_variables_threshold {
            debug!("Prefix of window at {} has {} variables", window.offset(), vars);
            return None;
        }

        let positions: Vec<usize> = window
            .filter()
            .iter()
            .map(|line| before_filter.binary_search(line).expect("window lines are part of the prefix filter"))
            .collect();
        for x in 0..(1u64 << vars) {
            let state = partial_simulation(self.pass.simulator.as_ref(), prefix.circuit(), &BitSet::from_u64(vars, x));
            let projected = positions
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &pos)| acc | ((state.get(pos) as u64) << i));
            inputs.insert(projected);
        }
        Some(inputs)
    }

    /// Simulates the window on `inputs` and projects the outputs through `roles`.
    ///
    /// Returns `None` if some output pattern occurs more often than the
    /// don't-care lines can tell apart.
    fn window_specification(&self, window: &Window, inputs: &BTreeSet<u64>, roles: &[LineRole]) -> Option<TruthTable> {
        let width = window.lines();
        let num_dont_cares = roles.iter().filter(|&&r| r == LineRole::DontCare).count();
        let capacity = 1usize.checked_shl(num_dont_cares as u32).unwrap_or(usize::MAX);

        let mut spec = TruthTable::new(width, width - num_dont_cares);
        let mut occurrences: BTreeMap<Cube, usize> = BTreeMap::new();

        for &x in inputs {
            let input = BitSet::from_u64(width, x);
            let output = self.pass.simulator.simulate(window.circuit(), &input);

            let cube: Cube = roles
                .iter()
                .enumerate()
                .filter_map(|(i, role)| match role {
                    LineRole::Constant(value) => Some(Some(*value)),
                    LineRole::StillUsed => Some(Some(output.get(i))),
                    LineRole::DontCare => None,
                })
                .collect();

            let count = occurrences.entry(cube.clone()).or_insert(0);
            if *count >= capacity {
                return None;
            }
            *count += 1;
            spec.add_entry(input, cube);
        }
        Some(spec)
    }

    /// A constant garbage line that never controls a gate and is only ever the
    /// target of Toffoli gates. Nothing observable depends on it.
    fn is_dead(&self, line: usize) -> bool {
        self.circuit.constants()[line].is_some()
            && self
                .circuit
                .gates()
                .iter()
                .all(|gate| !gate.touches(line) || (gate.is_toffoli() && gate.has_target(line)))
    }

    fn try_reduce(&mut self, garbage_line: usize) -> Attempt {
        if self.is_dead(garbage_line) {
            debug!("Dropping dead garbage line {}", garbage_line);
            self.circuit.retain_gates(|gate| !gate.has_target(garbage_line));
            self.circuit.drop_line(garbage_line);
            self.original_lines.remove(garbage_line);
            return Attempt::Reduced;
        }

        let window = self.find_window(garbage_line);
        debug!(
            "Garbage line {}: window {}..{} on lines {:?}",
            garbage_line,
            window.offset(),
            window.end(),
            window.filter()
        );

        let Some(constant_line) = self.find_constant_line(garbage_line, window.end()) else {
            return Attempt::Unreducible(SkipReason::NoConstantLine);
        };
        let Some(constant) = self.circuit.constants()[constant_line] else {
            unreachable!("constant line {} has no constant", constant_line);
        };

        let roles = self.line_roles(&window, garbage_line, constant);
        let order: Vec<usize> = (0..roles.len()).filter(|&i| roles[i] != LineRole::DontCare).collect();

        let Some(inputs) = self.reachable_inputs(&window) else {
            return self.grow_or_skip(SkipReason::MaxWindowLines);
        };
        let Some(spec) = self.window_specification(&window, &inputs, &roles) else {
            return self.grow_or_skip(SkipReason::Ambiguous);
        };

        let replacement = match self.pass.synthesizer.synthesize(&spec, &order) {
            Ok(replacement) => replacement,
            Err(e) => {
                debug!("Synthesis failed for window of line {}: {}", garbage_line, e);
                return Attempt::Unreducible(SkipReason::SynthesisFailed);
            }
        };
        if replacement.lines() != window.lines() {
            debug!(
                "Synthesized window for line {} has {} lines instead of {}",
                garbage_line,
                replacement.lines(),
                window.lines()
            );
            return Attempt::Unreducible(SkipReason::SynthesisFailed);
        }

        debug!(
            "Replacing {} gates by {} and merging constant line {} into line {}",
            window.num_gates(),
            replacement.num_gates(),
            constant_line,
            garbage_line
        );
        self.circuit.replace_window(&window, &replacement);
        self.circuit.remove_line(constant_line, garbage_line);
        self.original_lines[garbage_line] = self.original_lines[constant_line];
        self.original_lines.remove(constant_line);
        Attempt::Reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::gate::Gate;
    use crate::simulation::check_equivalence;
    use crate::synthesis::SynthesisError;

    fn set_ancilla(circ: &mut Circuit, line: usize, garbage: bool) {
        circ.set_constant(line, Some(false));
        circ.set_garbage_line(line, garbage);
    }

    #[test]
    fn test_reduce_window_at_start() {
        let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 2), Gate::cnot(2, 1), Gate::cnot(0, 3)]);
        set_ancilla(&mut circ, 2, true);
        set_ancilla(&mut circ, 3, false);
        circ.set_output(3, "f");

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result.lines(), 3);
        assert_eq!(stats.removed_lines, 1);
        assert_eq!(stats.num_considered_windows, 1);
        assert_eq!(result.outputs()[2], "f");
        assert!(!result.garbage()[2]);
        assert!(check_equivalence(&circ, &result, &SimpleSimulator));
    }

    #[test]
    fn test_reduce_onto_constant_one() {
        let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 2), Gate::cnot(2, 1), Gate::cnot(0, 3)]);
        set_ancilla(&mut circ, 2, true);
        circ.set_constant(3, Some(true));
        circ.set_output(3, "f");

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result.lines(), 3);
        assert_eq!(stats.removed_lines, 1);
        assert_eq!(result.constants()[2], Some(false));
        assert_eq!(result.outputs()[2], "f");
        assert!(check_equivalence(&circ, &result, &SimpleSimulator));
    }

    /// Line 3 is reset inside a window that starts after the first gate.
    fn middle_window_circuit() -> Circuit {
        let mut circ = Circuit::from_gates(
            5,
            [
                Gate::toffoli([0, 1], 2),
                Gate::cnot(2, 3),
                Gate::cnot(3, 1),
                Gate::cnot(0, 4),
            ],
        );
        set_ancilla(&mut circ, 3, true);
        set_ancilla(&mut circ, 4, false);
        circ
    }

    #[test]
    fn test_reduce_window_in_middle() {
        let circ = middle_window_circuit();
        let config = LineReductionConfig {
            max_window_lines: 2,
            ..Default::default()
        };
        let (result, stats) = LineReduction::new(config).run(&circ);
        assert_eq!(result.lines(), 4);
        assert_eq!(stats.removed_lines, 1);
        // The two-line window over lines 1 and 3 is ambiguous; three lines suffice.
        assert_eq!(stats.num_considered_windows, 2);
        assert_eq!(result.gates()[0], Gate::toffoli([0, 1], 2));
        assert!(check_equivalence(&circ, &result, &SimpleSimulator));
    }

    #[test]
    fn test_dead_garbage_line_is_dropped() {
        let mut circ = Circuit::from_gates(3, [Gate::cnot(0, 1), Gate::toffoli([0, 1], 2)]);
        set_ancilla(&mut circ, 2, true);

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result.lines(), 2);
        assert_eq!(result.gates(), &[Gate::cnot(0, 1)]);
        assert_eq!(stats.num_considered_windows, 1);
        assert_eq!(stats.removed_lines, 1);
        assert!(check_equivalence(&circ, &result, &SimpleSimulator));
    }

    #[test]
    fn test_garbage_target_of_fredkin_is_kept() {
        let mut circ = Circuit::from_gates(3, [Gate::fredkin([0], 1, 2)]);
        set_ancilla(&mut circ, 2, true);

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result, circ);
        assert_eq!(stats.skipped_no_constant_line, 1);
    }

    #[test]
    fn test_no_constant_line() {
        let mut circ = Circuit::from_gates(
            3,
            [Gate::cnot(0, 1), Gate::toffoli([0, 1], 2), Gate::cnot(2, 0)],
        );
        set_ancilla(&mut circ, 2, true);

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result, circ);
        assert_eq!(stats.num_considered_windows, 1);
        assert_eq!(stats.skipped_no_constant_line, 1);
    }

    #[test]
    fn test_ambiguous_window_grows_then_skips() {
        // The garbage line is a free input, so it cannot be reset to a constant.
        let mut circ = Circuit::from_gates(3, [Gate::cnot(1, 0), Gate::cnot(0, 2)]);
        circ.set_garbage_line(1, true);
        set_ancilla(&mut circ, 2, false);

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result, circ);
        // One window per size from 6 to 9.
        assert_eq!(stats.num_considered_windows, 4);
        assert_eq!(stats.skipped_ambiguous_line, 1);
    }

    #[test]
    fn test_window_variables_threshold() {
        let circ = middle_window_circuit();
        let config = LineReductionConfig {
            max_window_lines: 2,
            max_grow_up_window_lines: 2,
            window_variables_threshold: 3,
        };
        let (result, stats) = LineReduction::new(config).run(&circ);
        assert_eq!(result, circ);
        assert_eq!(stats.skipped_max_window_lines, 1);
    }

    #[test]
    fn test_synthesis_failure() {
        let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 2), Gate::cnot(2, 1), Gate::cnot(0, 3)]);
        set_ancilla(&mut circ, 2, true);
        set_ancilla(&mut circ, 3, false);

        let failing = |_: &TruthTable, _: &[usize]| Err::<Circuit, _>(SynthesisError::GateLimitExceeded { limit: 0 });
        let (result, stats) = LineReduction::default().with_synthesizer(failing).run(&circ);
        assert_eq!(result, circ);
        assert_eq!(stats.skipped_synthesis_failed, 1);
    }

    #[test]
    fn test_synthesized_window_with_wrong_width() {
        let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 2), Gate::cnot(2, 1), Gate::cnot(0, 3)]);
        set_ancilla(&mut circ, 2, true);
        set_ancilla(&mut circ, 3, false);

        let narrow = |spec: &TruthTable, _: &[usize]| Ok::<_, SynthesisError>(Circuit::new(spec.num_inputs() - 1));
        let (result, stats) = LineReduction::default().with_synthesizer(narrow).run(&circ);
        assert_eq!(result, circ);
        assert_eq!(stats.skipped_synthesis_failed, 1);
    }

    #[test]
    fn test_unused_garbage_constant() {
        // Line 2 is an idle garbage ancilla.
        let mut circ = Circuit::from_gates(4, [Gate::cnot(0, 1), Gate::cnot(1, 3)]);
        set_ancilla(&mut circ, 2, true);
        set_ancilla(&mut circ, 3, false);

        let (result, stats) = LineReduction::default().run(&circ);
        assert_eq!(result.lines(), 3);
        assert_eq!(stats.removed_lines, 1);
        assert_eq!(result.gates(), &[Gate::cnot(0, 1), Gate::cnot(1, 2)]);
        assert!(check_equivalence(&circ, &result, &SimpleSimulator));
    }

    #[test]
    fn test_line_roles() {
        let mut circ = Circuit::from_gates(
            4,
            [Gate::cnot(0, 1), Gate::cnot(1, 2), Gate::cnot(0, 3), Gate::cnot(3, 0)],
        );
        circ.set_garbage_line(2, true);
        circ.set_garbage_line(3, true);
        let pass = LineReduction::default();
        let run = Run {
            pass: &pass,
            circuit: circ.clone(),
            original_lines: (0..4).collect(),
            lines_to_skip: BTreeSet::new(),
            max_lines: 6,
            stats: LineReductionStats::default(),
        };
        let window = circ.window(0, 3, vec![0, 1, 2, 3]);
        assert_eq!(
            run.line_roles(&window, 1, true),
            vec![
                LineRole::StillUsed,
                LineRole::Constant(true),
                LineRole::DontCare,
                LineRole::StillUsed,
            ]
        );
    }

    #[test]
    fn test_constant_line_with_latest_first_use() {
        let mut circ = Circuit::from_gates(5, [Gate::cnot(0, 1), Gate::cnot(0, 2), Gate::cnot(0, 3)]);
        for line in 1..5 {
            circ.set_constant(line, Some(false));
        }
        let pass = LineReduction::default();
        let run = Run {
            pass: &pass,
            circuit: circ,
            original_lines: (0..5).collect(),
            lines_to_skip: BTreeSet::new(),
            max_lines: 6,
            stats: LineReductionStats::default(),
        };
        // Line 4 is never used.
        assert_eq!(run.find_constant_line(0, 1), Some(4));
        assert_eq!(run.find_constant_line(4, 1), Some(3));
        assert_eq!(run.find_constant_line(4, 3), None);
    }
}
