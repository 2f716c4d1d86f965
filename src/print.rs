//! ASCII rendering of circuits.
//!
//! Every line becomes one row, every gate one column:
//!
//! ```text
//! i0 -*---*- o0
//! i1 -*-O-+- o1
//!  0 -O-*-O- o2
//! ```
//!
//! Constant inputs are shown by their value, garbage outputs as `-`.
//!
//! # Examples
//!
//! ```
//! use revopt::circuit::Circuit;
//! use revopt::gate::Gate;
//!
//! let circ = Circuit::from_gates(2, [Gate::cnot(0, 1)]);
//! assert_eq!(circ.to_string(), "i0 -*- o0\ni1 -O- o1\n");
//! ```

use std::fmt::{Display, Formatter, Write as _};

use crate::circuit::Circuit;
use crate::gate::Gate;

/// Characters used by [`Circuit::to_ascii_with_config`].
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// Control line (default: `*`)
    pub control: char,
    /// Toffoli target (default: `O`)
    pub target: char,
    /// Fredkin target (default: `X`)
    pub swap: char,
    /// Line crossed by a gate it is not part of (default: `+`)
    pub crossing: char,
    /// Wire (default: `-`)
    pub wire: char,
    /// Print line names next to the rows (default: true)
    pub show_names: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            control: '*',
            target: 'O',
            swap: 'X',
            crossing: '+',
            wire: '-',
            show_names: true,
        }
    }
}

fn cell(gate: &Gate, line: usize, config: &PrintConfig) -> char {
    if gate.has_control(line) {
        return config.control;
    }
    if gate.has_target(line) {
        return match gate {
            Gate::Toffoli { .. } => config.target,
            Gate::Fredkin { .. } => config.swap,
        };
    }
    let min = gate.lines().min().unwrap_or(0);
    let max = gate.max_line();
    if min < line && line < max {
        config.crossing
    } else {
        config.wire
    }
}

impl Circuit {
    pub fn to_ascii(&self) -> Result<String, std::fmt::Error> {
        self.to_ascii_with_config(&PrintConfig::default())
    }

    pub fn to_ascii_with_config(&self, config: &PrintConfig) -> Result<String, std::fmt::Error> {
        let inputs: Vec<String> = (0..self.lines())
            .map(|line| match self.constants()[line] {
                Some(value) => (value as u8).to_string(),
                None => self.inputs()[line].clone(),
            })
            .collect();
        let width = inputs.iter().map(|s| s.len()).max().unwrap_or(0);

        let mut out = String::new();
        for (line, input) in inputs.iter().enumerate() {
            if config.show_names {
                write!(out, "{:>width$} ", input, width = width)?;
            }
            out.push(config.wire);
            for gate in self {
                out.push(cell(gate, line, config));
                out.push(config.wire);
            }
            if config.show_names {
                let output = if self.garbage()[line] { "-" } else { self.outputs()[line].as_str() };
                write!(out, " {}", output)?;
            }
            writeln!(out)?;
        }
        Ok(out)
    }
}

impl Display for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_ascii()?)
    }
}
