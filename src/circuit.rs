//! Reversible circuits over a fixed bank of lines.
//!
//! A [`Circuit`] is an ordered gate list plus per-line metadata (input and output
//! names, constant inputs, garbage outputs). A [`Window`] is an independent copy
//! of a contiguous gate range restricted to a subset of lines, together with the
//! `filter` that maps its local line indices back to the parent circuit.
//!
//! Windows never alias their parent: a pass may rewrite the parent while a window
//! snapshot is still being analysed, but must re-derive windows from the current
//! circuit afterwards.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::gate::Gate;

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Circuit {
    lines: usize,
    gates: Vec<Gate>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    constants: Vec<Option<bool>>,
    garbage: Vec<bool>,
}

impl Circuit {
    /// Creates an empty circuit with `lines` free, non-garbage lines.
    pub fn new(lines: usize) -> Self {
        Self {
            lines,
            gates: Vec::new(),
            inputs: (0..lines).map(|i| format!("i{}", i)).collect(),
            outputs: (0..lines).map(|i| format!("o{}", i)).collect(),
            constants: vec![None; lines],
            garbage: vec![false; lines],
        }
    }

    /// Creates a circuit from gates, with default metadata.
    pub fn from_gates(lines: usize, gates: impl IntoIterator<Item = Gate>) -> Self {
        let mut circuit = Self::new(lines);
        for gate in gates {
            circuit.append_gate(gate);
        }
        circuit
    }
}

// Getters
impl Circuit {
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, index: usize) -> &Gate {
        &self.gates[index]
    }

    pub fn gate_mut(&mut self, index: usize) -> &mut Gate {
        &mut self.gates[index]
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn constants(&self) -> &[Option<bool>] {
        &self.constants
    }

    pub fn garbage(&self) -> &[bool] {
        &self.garbage
    }
}

// Metadata setters
impl Circuit {
    pub fn set_inputs(&mut self, inputs: Vec<String>) {
        assert_eq!(inputs.len(), self.lines, "Expected {} input names", self.lines);
        self.inputs = inputs;
    }

    pub fn set_outputs(&mut self, outputs: Vec<String>) {
        assert_eq!(outputs.len(), self.lines, "Expected {} output names", self.lines);
        self.outputs = outputs;
    }

    pub fn set_constants(&mut self, constants: Vec<Option<bool>>) {
        assert_eq!(constants.len(), self.lines, "Expected {} constants", self.lines);
        self.constants = constants;
    }

    pub fn set_garbage(&mut self, garbage: Vec<bool>) {
        assert_eq!(garbage.len(), self.lines, "Expected {} garbage flags", self.lines);
        self.garbage = garbage;
    }

    pub fn set_input(&mut self, line: usize, name: impl Into<String>) {
        self.inputs[line] = name.into();
    }

    pub fn set_output(&mut self, line: usize, name: impl Into<String>) {
        self.outputs[line] = name.into();
    }

    pub fn set_constant(&mut self, line: usize, constant: Option<bool>) {
        self.constants[line] = constant;
    }

    pub fn set_garbage_line(&mut self, line: usize, garbage: bool) {
        self.garbage[line] = garbage;
    }
}

// Gate list manipulation
impl Circuit {
    fn check_gate(&self, gate: &Gate) {
        assert!(
            gate.max_line() < self.lines,
            "Gate {} references a line outside of a circuit with {} lines",
            gate,
            self.lines
        );
    }

    pub fn append_gate(&mut self, gate: Gate) {
        self.check_gate(&gate);
        self.gates.push(gate);
    }

    pub fn prepend_gate(&mut self, gate: Gate) {
        self.insert_gate(0, gate);
    }

    pub fn insert_gate(&mut self, pos: usize, gate: Gate) {
        self.check_gate(&gate);
        self.gates.insert(pos, gate);
    }

    pub fn remove_gate_at(&mut self, pos: usize) -> Gate {
        self.gates.remove(pos)
    }

    /// Appends all gates of `other`, which must have the same number of lines.
    pub fn append_circuit(&mut self, other: &Circuit) {
        let pos = self.num_gates();
        self.insert_circuit(pos, other);
    }

    /// Inserts all gates of `other` before position `pos`.
    pub fn insert_circuit(&mut self, pos: usize, other: &Circuit) {
        assert_eq!(
            other.lines, self.lines,
            "Cannot insert a circuit with {} lines into one with {} lines",
            other.lines, self.lines
        );
        self.gates.splice(pos..pos, other.gates.iter().cloned());
    }

    /// Replaces `remove_count` gates starting at `offset` by the gates of `replacement`.
    pub fn splice(&mut self, offset: usize, remove_count: usize, replacement: &Circuit) {
        assert_eq!(replacement.lines, self.lines, "Replacement must be expanded to {} lines", self.lines);
        self.gates
            .splice(offset..offset + remove_count, replacement.gates.iter().cloned());
    }

    /// Copies the gates `[from, to)` into a new circuit with all lines and metadata.
    pub fn subcircuit(&self, from: usize, to: usize) -> Circuit {
        Circuit {
            lines: self.lines,
            gates: self.gates[from..to].to_vec(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            constants: self.constants.clone(),
            garbage: self.garbage.clone(),
        }
    }
}

// Line manipulation
impl Circuit {
    /// Appends a new line and returns its index.
    pub fn add_line(
        &mut self,
        input: impl Into<String>,
        output: impl Into<String>,
        constant: Option<bool>,
        garbage: bool,
    ) -> usize {
        self.inputs.push(input.into());
        self.outputs.push(output.into());
        self.constants.push(constant);
        self.garbage.push(garbage);
        self.lines += 1;
        self.lines - 1
    }

    /// Keeps only the gates for which `f` returns true.
    pub fn retain_gates(&mut self, f: impl FnMut(&Gate) -> bool) {
        self.gates.retain(f);
    }

    /// Removes `line_to_remove` and moves everything on it onto `line_to_use`.
    ///
    /// Gate references to the removed line are redirected to `line_to_use`, and
    /// references above it are decremented. The input name and constant of the
    /// removed line disappear; its output name and garbage flag are taken over by
    /// `line_to_use`.
    pub fn remove_line(&mut self, line_to_remove: usize, line_to_use: usize) {
        assert!(line_to_remove < self.lines, "Line {} does not exist", line_to_remove);
        assert!(line_to_use < self.lines, "Line {} does not exist", line_to_use);
        assert_ne!(line_to_remove, line_to_use, "Cannot merge a line into itself");

        let use_after = if line_to_use > line_to_remove {
            line_to_use - 1
        } else {
            line_to_use
        };
        let remap = |line: usize| {
            if line == line_to_remove {
                use_after
            } else if line > line_to_remove {
                line - 1
            } else {
                line
            }
        };
        for gate in &mut self.gates {
            if gate.lines().any(|l| l >= line_to_remove) {
                *gate = gate.map_lines(remap);
            }
        }

        self.outputs[line_to_use] = self.outputs[line_to_remove].clone();
        self.garbage[line_to_use] = self.garbage[line_to_remove];

        self.inputs.remove(line_to_remove);
        self.outputs.remove(line_to_remove);
        self.constants.remove(line_to_remove);
        self.garbage.remove(line_to_remove);
        self.lines -= 1;
    }

    /// Removes `line`, which no gate may touch, and renumbers the lines above it.
    pub fn drop_line(&mut self, line: usize) {
        assert!(line < self.lines, "Line {} does not exist", line);
        assert!(
            self.gates.iter().all(|gate| !gate.touches(line)),
            "Line {} is still in use",
            line
        );

        for gate in &mut self.gates {
            if gate.max_line() > line {
                *gate = gate.map_lines(|l| if l > line { l - 1 } else { l });
            }
        }

        self.inputs.remove(line);
        self.outputs.remove(line);
        self.constants.remove(line);
        self.garbage.remove(line);
        self.lines -= 1;
    }
}

// Queries
impl Circuit {
    /// Lines touched by at least one gate in `range`.
    pub fn non_empty_lines(&self, range: Range<usize>) -> BTreeSet<usize> {
        self.gates[range].iter().flat_map(|g| g.lines()).collect()
    }

    pub fn first_touch(&self, line: usize) -> Option<usize> {
        self.gates.iter().position(|g| g.touches(line))
    }

    pub fn last_touch(&self, line: usize) -> Option<usize> {
        self.gates.iter().rposition(|g| g.touches(line))
    }

    pub fn last_control(&self, line: usize) -> Option<usize> {
        self.gates.iter().rposition(|g| g.has_control(line))
    }

    /// Returns true if some gate in `range` has a control or target on `line`.
    pub fn is_touched(&self, line: usize, range: Range<usize>) -> bool {
        self.gates[range].iter().any(|g| g.touches(line))
    }

    /// Extracts the gates `[from, to)` restricted to the lines in `filter`.
    ///
    /// `filter` must be strictly increasing and cover every line the gates touch.
    pub fn window(&self, from: usize, to: usize, filter: Vec<usize>) -> Window {
        assert!(from <= to && to <= self.num_gates(), "Invalid gate range {}..{}", from, to);
        assert!(
            filter.windows(2).all(|w| w[0] < w[1]),
            "Window filter must be strictly increasing: {:?}",
            filter
        );
        assert!(
            filter.last().map_or(true, |&l| l < self.lines),
            "Window filter references a line outside of the circuit"
        );

        let mut local = vec![None; self.lines];
        for (i, &line) in filter.iter().enumerate() {
            local[line] = Some(i);
        }

        let mut circuit = Circuit {
            lines: filter.len(),
            gates: Vec::with_capacity(to - from),
            inputs: filter.iter().map(|&l| self.inputs[l].clone()).collect(),
            outputs: filter.iter().map(|&l| self.outputs[l].clone()).collect(),
            constants: filter.iter().map(|&l| self.constants[l]).collect(),
            garbage: filter.iter().map(|&l| self.garbage[l]).collect(),
        };
        for gate in &self.gates[from..to] {
            let mapped = gate.map_lines(|l| match local[l] {
                Some(i) => i,
                None => panic!("Gate {} touches line {} outside of the window filter", gate, l),
            });
            circuit.gates.push(mapped);
        }

        Window {
            circuit,
            offset: from,
            filter,
            parent_lines: self.lines,
        }
    }

    /// Extracts the gates `[from, to)` restricted to the lines they touch.
    pub fn window_on_touched_lines(&self, from: usize, to: usize) -> Window {
        let filter = self.non_empty_lines(from..to).into_iter().collect();
        self.window(from, to, filter)
    }

    /// Replaces the gates covered by `window` with `replacement`, given in window-local lines.
    pub fn replace_window(&mut self, window: &Window, replacement: &Circuit) {
        assert_eq!(window.parent_lines, self.lines, "Window was taken from a circuit with different lines");
        let expanded = window.expand(replacement);
        self.splice(window.offset, window.num_gates(), &expanded);
    }
}

impl<'a> IntoIterator for &'a Circuit {
    type Item = &'a Gate;
    type IntoIter = std::slice::Iter<'a, Gate>;

    fn into_iter(self) -> Self::IntoIter {
        self.gates.iter()
    }
}

/// A copied gate range of a parent circuit over a subset of its lines.
#[derive(Debug, Clone)]
pub struct Window {
    circuit: Circuit,
    offset: usize,
    filter: Vec<usize>,
    parent_lines: usize,
}

impl Window {
    /// The window's gates and metadata in window-local line indices.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Index of the first window gate in the parent circuit.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Parent index of every window-local line.
    pub fn filter(&self) -> &[usize] {
        &self.filter
    }

    pub fn parent_lines(&self) -> usize {
        self.parent_lines
    }

    pub fn lines(&self) -> usize {
        self.circuit.lines()
    }

    pub fn num_gates(&self) -> usize {
        self.circuit.num_gates()
    }

    /// Index one past the last window gate in the parent circuit.
    pub fn end(&self) -> usize {
        self.offset + self.num_gates()
    }

    /// Maps a circuit over the window's lines back to parent line indices.
    ///
    /// Parent lines outside the filter are left untouched.
    pub fn expand(&self, replacement: &Circuit) -> Circuit {
        assert_eq!(
            replacement.lines(),
            self.filter.len(),
            "Replacement has {} lines but the window has {}",
            replacement.lines(),
            self.filter.len()
        );
        let mut expanded = Circuit::new(self.parent_lines);
        for gate in replacement {
            expanded.append_gate(gate.map_lines(|l| self.filter[l]));
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn sample() -> Circuit {
        Circuit::from_gates(
            4,
            [
                Gate::cnot(0, 1),
                Gate::toffoli([0, 1], 2),
                Gate::cnot(3, 2),
                Gate::not(3),
            ],
        )
    }

    #[test]
    fn test_new_metadata() {
        let circ = Circuit::new(2);
        assert_eq!(circ.inputs(), &["i0", "i1"]);
        assert_eq!(circ.outputs(), &["o0", "o1"]);
        assert_eq!(circ.constants(), &[None, None]);
        assert_eq!(circ.garbage(), &[false, false]);
    }

    #[test]
    #[should_panic(expected = "references a line outside")]
    fn test_gate_out_of_range() {
        let mut circ = Circuit::new(2);
        circ.append_gate(Gate::cnot(0, 2));
    }

    #[test]
    fn test_queries() {
        let circ = sample();
        assert_eq!(circ.non_empty_lines(0..2), BTreeSet::from([0, 1, 2]));
        assert_eq!(circ.first_touch(3), Some(2));
        assert_eq!(circ.last_touch(2), Some(2));
        assert_eq!(circ.last_control(0), Some(1));
        assert_eq!(circ.last_control(2), None);
        assert!(circ.is_touched(3, 2..4));
        assert!(!circ.is_touched(3, 0..2));
    }

    #[test]
    fn test_window_and_expand() {
        let circ = sample();
        let window = circ.window(2, 4, vec![2, 3]);
        assert_eq!(window.offset(), 2);
        assert_eq!(window.end(), 4);
        assert_eq!(window.lines(), 2);
        assert_eq!(window.circuit().gates(), &[Gate::cnot(1, 0), Gate::not(1)]);
        assert_eq!(window.circuit().inputs(), &["i2", "i3"]);

        let expanded = window.expand(window.circuit());
        assert_eq!(expanded.lines(), 4);
        assert_eq!(expanded.gates(), &circ.gates()[2..4]);
    }

    #[test]
    #[should_panic(expected = "outside of the window filter")]
    fn test_window_missing_line() {
        sample().window(0, 2, vec![0, 1]);
    }

    #[test]
    fn test_replace_window() {
        let mut circ = sample();
        let window = circ.window_on_touched_lines(0, 2);
        assert_eq!(window.filter(), &[0, 1, 2]);
        let replacement = Circuit::from_gates(3, [Gate::not(2)]);
        circ.replace_window(&window, &replacement);
        assert_eq!(circ.gates(), &[Gate::not(2), Gate::cnot(3, 2), Gate::not(3)]);
    }

    #[test]
    fn test_remove_line_remaps_indices() {
        let mut circ = Circuit::from_gates(4, [Gate::toffoli([0, 1], 2), Gate::cnot(3, 1)]);
        circ.set_constant(3, Some(false));
        circ.set_garbage_line(2, true);
        circ.set_output(3, "f");

        // Line 3 is merged into line 2.
        circ.remove_line(3, 2);
        assert_eq!(circ.lines(), 3);
        assert_eq!(circ.gates(), &[Gate::toffoli([0, 1], 2), Gate::cnot(2, 1)]);
        assert_eq!(circ.outputs(), &["o0", "o1", "f"]);
        assert_eq!(circ.inputs(), &["i0", "i1", "i2"]);
        assert_eq!(circ.garbage(), &[false, false, false]);
        assert_eq!(circ.constants(), &[None, None, None]);
    }

    #[test]
    fn test_remove_line_below_used_line() {
        let mut circ = Circuit::from_gates(4, [Gate::cnot(2, 3), Gate::cnot(1, 0)]);
        circ.set_garbage_line(3, true);
        circ.set_constant(1, Some(true));
        circ.set_output(1, "k");

        circ.remove_line(1, 3);
        assert_eq!(circ.lines(), 3);
        // Old 2 -> 1, old 3 -> 2, old 1 -> old 3 -> 2.
        assert_eq!(circ.gates(), &[Gate::cnot(1, 2), Gate::cnot(2, 0)]);
        assert_eq!(circ.outputs(), &["o0", "o2", "k"]);
        assert_eq!(circ.garbage(), &[false, false, false]);
        assert!(circ.gates().iter().all(|g| g.max_line() < 3));
    }

    #[test]
    fn test_drop_line() {
        let mut circ = Circuit::from_gates(4, [Gate::toffoli([0, 1], 2), Gate::cnot(3, 0), Gate::cnot(0, 1)]);
        circ.set_constant(2, Some(false));
        circ.set_garbage_line(2, true);

        circ.retain_gates(|g| !g.has_target(2));
        circ.drop_line(2);
        assert_eq!(circ.lines(), 3);
        assert_eq!(circ.gates(), &[Gate::cnot(2, 0), Gate::cnot(0, 1)]);
        assert_eq!(circ.inputs(), &["i0", "i1", "i3"]);
        assert_eq!(circ.outputs(), &["o0", "o1", "o3"]);
        assert_eq!(circ.constants(), &[None, None, None]);
        assert_eq!(circ.garbage(), &[false, false, false]);
    }

    #[test]
    #[should_panic(expected = "still in use")]
    fn test_drop_used_line() {
        sample().drop_line(0);
    }

    #[test]
    fn test_add_line() {
        let mut circ = Circuit::new(2);
        let helper = circ.add_line("helper", "helper", Some(false), true);
        assert_eq!(helper, 2);
        assert_eq!(circ.lines(), 3);
        assert_eq!(circ.constants()[2], Some(false));
        assert!(circ.garbage()[2]);
    }

    #[test]
    fn test_splice_and_insert() {
        let mut circ = sample();
        circ.splice(1, 2, &Circuit::from_gates(4, [Gate::not(0)]));
        assert_eq!(circ.gates(), &[Gate::cnot(0, 1), Gate::not(0), Gate::not(3)]);
        circ.insert_circuit(0, &Circuit::from_gates(4, [Gate::not(1), Gate::not(2)]));
        assert_eq!(circ.num_gates(), 5);
        assert_eq!(circ.gate(1), &Gate::not(2));
        circ.remove_gate_at(0);
        assert_eq!(circ.gate(0), &Gate::not(2));
    }
}
