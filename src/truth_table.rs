//! Partial truth tables with don't-care outputs.
//!
//! A [`TruthTable`] maps fully specified input assignments to output cubes.
//! Each output position is either a fixed bit or a don't-care (`None`). Inputs
//! that have no row are unconstrained: a synthesizer may map them anywhere.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::bitset::BitSet;

/// Output cube: one entry per output, `None` marks a don't-care.
pub type Cube = Vec<Option<bool>>;

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TruthTable {
    num_inputs: usize,
    num_outputs: usize,
    entries: BTreeMap<BitSet, Cube>,
}

impl TruthTable {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            num_inputs,
            num_outputs,
            entries: BTreeMap::new(),
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Number of specified rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds (or replaces) the row for `input`.
    pub fn add_entry(&mut self, input: BitSet, output: Cube) {
        assert_eq!(input.width(), self.num_inputs, "Input has wrong width");
        assert_eq!(output.len(), self.num_outputs, "Output has wrong width");
        self.entries.insert(input, output);
    }

    pub fn get(&self, input: &BitSet) -> Option<&Cube> {
        self.entries.get(input)
    }

    /// Rows in ascending input order.
    pub fn entries(&self) -> impl Iterator<Item = (&BitSet, &Cube)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true if every input has a row and no output is a don't-care.
    pub fn is_fully_specified(&self) -> bool {
        self.num_inputs < usize::BITS as usize
            && self.entries.len() == 1usize << self.num_inputs
            && self.entries.values().all(|cube| cube.iter().all(Option::is_some))
    }

    /// Number of don't-care positions over all rows.
    pub fn num_dont_cares(&self) -> usize {
        self.entries
            .values()
            .map(|cube| cube.iter().filter(|b| b.is_none()).count())
            .sum()
    }
}

impl Display for TruthTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (input, output) in &self.entries {
            write!(f, "{} -> ", input)?;
            for b in output {
                let c = match b {
                    Some(true) => '1',
                    Some(false) => '0',
                    None => '-',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
