//! # revopt: window-based rewriting of reversible circuits
//!
//! **`revopt`** optimizes reversible circuits (Toffoli and Fredkin gates over a fixed
//! bank of lines) by cutting out small windows, re-synthesizing them from their
//! truth tables, and splicing the results back in.
//!
//! ## Passes
//!
//! - **[`window_optimization`]**: generic driver. A [`WindowSelector`][crate::window::WindowSelector]
//!   proposes windows, a [`Replacement`][crate::window_optimization::Replacement] proposes an
//!   alternative, and the alternative is kept if it is strictly cheaper.
//! - **[`line_reduction`]**: removes garbage lines. The last gates on a garbage line are
//!   re-synthesized so that the line ends in a constant state and can stand in for a
//!   constant input that is only needed later.
//! - **[`adding_lines`]**: adds helper lines. Control subsets shared by consecutive
//!   Toffoli gates are computed once onto a helper line, which makes the gates cheaper.
//!
//! Every pass works on a copy of its input and returns the optimized circuit together
//! with statistics. Local failures (no candidate, ambiguous specification, synthesis
//! failure) only leave that part of the circuit unchanged.
//!
//! ## Basic Usage
//!
//! ```rust
//! use revopt::circuit::Circuit;
//! use revopt::cost::{CostFunction, QuantumCosts};
//! use revopt::gate::Gate;
//! use revopt::adding_lines::AddingLines;
//!
//! let circ = Circuit::from_gates(5, [Gate::toffoli([0, 1, 2], 3), Gate::toffoli([0, 1, 2], 4)]);
//! let (result, stats) = AddingLines::default().run(&circ);
//!
//! assert_eq!(result.lines(), 6);
//! assert!(QuantumCosts.cost(&result) < QuantumCosts.cost(&circ));
//! assert_eq!(stats.factors_applied, 1);
//! ```
//!
//! ## Building Blocks
//!
//! - **[`circuit`]**: circuits, line metadata and windows.
//! - **[`simulation`]** and **[`synthesis`]**: the pluggable capabilities the passes are built on.
//! - **[`cost`]**: cost models compared by the passes.
//! - **[`print`]**: ASCII rendering.

pub mod adding_lines;
pub mod bitset;
pub mod circuit;
pub mod cost;
pub mod gate;
pub mod line_reduction;
pub mod print;
pub mod simulation;
pub mod synthesis;
pub mod truth_table;
pub mod window;
pub mod window_optimization;
