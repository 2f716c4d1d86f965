//! Generic window-based optimization.
//!
//! [`WindowOptimization`] pulls windows from a [`WindowSelector`], asks a
//! [`Replacement`] strategy for an alternative, and splices the alternative back
//! whenever it is strictly cheaper under the configured [`CostFunction`].
//!
//! ```
//! use revopt::circuit::Circuit;
//! use revopt::gate::Gate;
//! use revopt::window_optimization::WindowOptimization;
//!
//! let circ = Circuit::from_gates(2, [Gate::cnot(0, 1), Gate::cnot(0, 1)]);
//! let (optimized, stats) = WindowOptimization::default().run(&circ);
//! assert!(optimized.is_empty());
//! assert_eq!(stats.windows_replaced, 1);
//! ```

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::circuit::Circuit;
use crate::cost::{Cost, CostFunction, GateCosts};
use crate::simulation::{circuit_to_truth_table, SimpleSimulator, Simulator};
use crate::synthesis::{SynthesisError, Synthesizer, TransformationBasedSynthesis};
use crate::window::{ShiftWindowSelection, WindowSelector};

/// Produces an alternative for a window, in window-local lines.
pub trait Replacement {
    fn replace(&self, window: &Circuit) -> Result<Circuit, SynthesisError>;
}

impl<F> Replacement for F
where
    F: Fn(&Circuit) -> Result<Circuit, SynthesisError>,
{
    fn replace(&self, window: &Circuit) -> Result<Circuit, SynthesisError> {
        self(window)
    }
}

/// Simulates the window into a full truth table and synthesizes it again.
pub struct Resynthesis {
    pub simulator: Box<dyn Simulator>,
    pub synthesizer: Box<dyn Synthesizer>,
    /// Windows with more lines are rejected without simulating them.
    pub max_lines: usize,
}

impl Default for Resynthesis {
    fn default() -> Self {
        Self {
            simulator: Box::new(SimpleSimulator),
            synthesizer: Box::new(TransformationBasedSynthesis::default()),
            max_lines: 16,
        }
    }
}

impl Replacement for Resynthesis {
    fn replace(&self, window: &Circuit) -> Result<Circuit, SynthesisError> {
        if window.lines() > self.max_lines {
            return Err(SynthesisError::TooManyLines {
                lines: window.lines(),
                limit: self.max_lines,
            });
        }
        let spec = circuit_to_truth_table(window, self.simulator.as_ref());
        let order: Vec<usize> = (0..window.lines()).collect();
        self.synthesizer.synthesize(&spec, &order)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindowOptimizationStats {
    /// Number of windows handed to the replacement strategy.
    pub windows_considered: usize,
    pub windows_replaced: usize,
    /// Cost of the old and the new window, per accepted replacement.
    pub replacements: Vec<(Cost, Cost)>,
    pub runtime: Duration,
}

impl WindowOptimizationStats {
    /// Total cost saved over all accepted windows.
    pub fn cost_reduction(&self) -> Cost {
        self.replacements.iter().map(|(old, new)| old - new).sum()
    }
}

/// The window optimization driver.
pub struct WindowOptimization {
    selector: Box<dyn WindowSelector>,
    replacement: Box<dyn Replacement>,
    cost: Box<dyn CostFunction>,
}

impl Default for WindowOptimization {
    fn default() -> Self {
        Self {
            selector: Box::new(ShiftWindowSelection::default()),
            replacement: Box::new(Resynthesis::default()),
            cost: Box::new(GateCosts),
        }
    }
}

impl WindowOptimization {
    pub fn with_selector(mut self, selector: impl WindowSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn with_replacement(mut self, replacement: impl Replacement + 'static) -> Self {
        self.replacement = Box::new(replacement);
        self
    }

    pub fn with_cost(mut self, cost: impl CostFunction + 'static) -> Self {
        self.cost = Box::new(cost);
        self
    }

    /// Optimizes a copy of `base` until the selector is exhausted.
    pub fn run(&mut self, base: &Circuit) -> (Circuit, WindowOptimizationStats) {
        let start = Instant::now();
        let mut stats = WindowOptimizationStats::default();
        let mut circuit = base.clone();

        while let Some(window) = self.selector.select(&circuit) {
            stats.windows_considered += 1;

            let candidate = match self.replacement.replace(window.circuit()) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!("Window {}..{}: no replacement ({})", window.offset(), window.end(), e);
                    continue;
                }
            };
            if candidate.lines() != window.lines() {
                debug!(
                    "Window {}..{}: replacement has {} lines instead of {}",
                    window.offset(),
                    window.end(),
                    candidate.lines(),
                    window.lines()
                );
                continue;
            }

            let old_cost = self.cost.cost(window.circuit());
            let new_cost = self.cost.cost(&candidate);
            if new_cost < old_cost {
                debug!(
                    "Window {}..{} on lines {:?}: cost {} -> {}",
                    window.offset(),
                    window.end(),
                    window.filter(),
                    old_cost,
                    new_cost
                );
                circuit.replace_window(&window, &candidate);
                stats.windows_replaced += 1;
                stats.replacements.push((old_cost, new_cost));
            }
        }

        stats.runtime = start.elapsed();
        info!(
            "Window optimization: replaced {} of {} windows, saved {} in {:?}",
            stats.windows_replaced,
            stats.windows_considered,
            stats.cost_reduction(),
            stats.runtime
        );
        (circuit, stats)
    }
}
