//! Window selection strategies.
//!
//! A [`WindowSelector`] is a stateful generator: each call inspects the
//! *current* circuit and returns the next window, or `None` once exhausted.
//! Exhausting a selector also rewinds it, so the same instance can drive a
//! fresh pass afterwards.

use std::collections::BTreeSet;

use log::debug;

use crate::circuit::{Circuit, Window};

pub trait WindowSelector {
    /// Returns the next window of `circuit`, or `None` when exhausted.
    fn select(&mut self, circuit: &Circuit) -> Option<Window>;
}

impl<F> WindowSelector for F
where
    F: FnMut(&Circuit) -> Option<Window>,
{
    fn select(&mut self, circuit: &Circuit) -> Option<Window> {
        self(circuit)
    }
}

/// Slides a window of fixed length over the gates.
///
/// Windows are `[pos, pos + window_length)` clipped at the end of the circuit,
/// restricted to the lines they touch. `pos` advances by `offset` per call.
#[derive(Debug, Clone)]
pub struct ShiftWindowSelection {
    pub window_length: usize,
    pub offset: usize,
    pos: usize,
}

impl Default for ShiftWindowSelection {
    fn default() -> Self {
        Self::new(10, 1)
    }
}

impl ShiftWindowSelection {
    pub fn new(window_length: usize, offset: usize) -> Self {
        Self {
            window_length,
            offset,
            pos: 0,
        }
    }
}

impl WindowSelector for ShiftWindowSelection {
    fn select(&mut self, circuit: &Circuit) -> Option<Window> {
        assert!(self.window_length > 0, "Window length must be positive");
        assert!(self.offset > 0, "Window offset must be positive");

        if self.pos >= circuit.num_gates() {
            self.pos = 0;
            return None;
        }

        let length = self.window_length.min(circuit.num_gates() - self.pos);
        let window = circuit.window_on_touched_lines(self.pos, self.pos + length);
        self.pos += self.offset;
        Some(window)
    }
}

/// Grows windows gate by gate while they touch at most `line_count` lines.
///
/// Every full scan over the circuit raises `line_count` by one, starting at 2,
/// until it reaches one less than the number of lines.
#[derive(Debug, Clone)]
pub struct LineWindowSelection {
    line_count: usize,
    pos: usize,
}

impl Default for LineWindowSelection {
    fn default() -> Self {
        Self { line_count: 2, pos: 0 }
    }
}

impl LineWindowSelection {
    /// Current bound on the number of lines per window.
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

impl WindowSelector for LineWindowSelection {
    fn select(&mut self, circuit: &Circuit) -> Option<Window> {
        loop {
            if self.pos >= circuit.num_gates() {
                self.pos = 0;
                if self.line_count < circuit.lines().saturating_sub(1) {
                    self.line_count += 1;
                    debug!("Line window selection: now up to {} lines", self.line_count);
                } else {
                    self.line_count = 2;
                    return None;
                }
            }

            let mut start = self.pos;
            let mut touched = BTreeSet::new();

            for i in self.pos..circuit.num_gates() {
                let mut extended = touched.clone();
                extended.extend(circuit.gate(i).lines());

                if extended.len() <= self.line_count {
                    touched = extended;
                } else if !touched.is_empty() {
                    self.pos = i;
                    return Some(circuit.window(start, i, touched.into_iter().collect()));
                } else {
                    // This gate alone is too wide.
                    start = i + 1;
                }
            }

            self.pos = circuit.num_gates();
            if !touched.is_empty() {
                return Some(circuit.window(start, circuit.num_gates(), touched.into_iter().collect()));
            }
        }
    }
}
