use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// A reversible gate acting on circuit lines.
///
/// Controls are kept as an ordered set, so two gates with the same control lines
/// compare equal regardless of the order the controls were given in.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Gate {
    /// Inverts `target` when all controls are 1. Zero controls is a NOT, one is a CNOT.
    Toffoli {
        controls: BTreeSet<usize>,
        target: usize,
    },
    /// Swaps both targets when all controls are 1.
    Fredkin {
        controls: BTreeSet<usize>,
        targets: [usize; 2],
    },
}

// Constructors
impl Gate {
    pub fn toffoli(controls: impl IntoIterator<Item = usize>, target: usize) -> Gate {
        let controls: BTreeSet<usize> = controls.into_iter().collect();
        assert!(
            !controls.contains(&target),
            "Target line {} must not be a control line",
            target
        );
        Gate::Toffoli { controls, target }
    }

    pub fn not(target: usize) -> Gate {
        Gate::toffoli([], target)
    }

    pub fn cnot(control: usize, target: usize) -> Gate {
        Gate::toffoli([control], target)
    }

    pub fn fredkin(controls: impl IntoIterator<Item = usize>, a: usize, b: usize) -> Gate {
        let controls: BTreeSet<usize> = controls.into_iter().collect();
        assert_ne!(a, b, "Fredkin targets must be distinct");
        assert!(
            !controls.contains(&a) && !controls.contains(&b),
            "Fredkin targets {} and {} must not be control lines",
            a,
            b
        );
        Gate::Fredkin {
            controls,
            targets: [a, b],
        }
    }
}

// Getters
impl Gate {
    pub fn controls(&self) -> &BTreeSet<usize> {
        match self {
            Gate::Toffoli { controls, .. } => controls,
            Gate::Fredkin { controls, .. } => controls,
        }
    }

    pub fn targets(&self) -> &[usize] {
        match self {
            Gate::Toffoli { target, .. } => std::slice::from_ref(target),
            Gate::Fredkin { targets, .. } => targets,
        }
    }

    /// All lines the gate touches: controls first, then targets.
    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.controls().iter().copied().chain(self.targets().iter().copied())
    }

    pub fn is_toffoli(&self) -> bool {
        matches!(self, Gate::Toffoli { .. })
    }

    pub fn has_control(&self, line: usize) -> bool {
        self.controls().contains(&line)
    }

    pub fn has_target(&self, line: usize) -> bool {
        self.targets().contains(&line)
    }

    pub fn touches(&self, line: usize) -> bool {
        self.has_control(line) || self.has_target(line)
    }

    /// Highest line index referenced by the gate.
    pub fn max_line(&self) -> usize {
        self.lines().max().unwrap_or(0)
    }
}

// Modifiers
impl Gate {
    fn controls_mut(&mut self) -> &mut BTreeSet<usize> {
        match self {
            Gate::Toffoli { controls, .. } => controls,
            Gate::Fredkin { controls, .. } => controls,
        }
    }

    pub fn add_control(&mut self, line: usize) {
        assert!(!self.has_target(line), "Line {} is already a target", line);
        self.controls_mut().insert(line);
    }

    pub fn remove_control(&mut self, line: usize) -> bool {
        self.controls_mut().remove(&line)
    }

    /// Returns a copy of the gate with every line index passed through `f`.
    ///
    /// `f` must keep the lines of the gate pairwise distinct.
    pub fn map_lines(&self, f: impl Fn(usize) -> usize) -> Gate {
        let controls: BTreeSet<usize> = self.controls().iter().map(|&c| f(c)).collect();
        debug_assert_eq!(controls.len(), self.controls().len(), "Line mapping merged control lines");
        let gate = match self {
            Gate::Toffoli { target, .. } => Gate::Toffoli {
                controls,
                target: f(*target),
            },
            Gate::Fredkin { targets, .. } => Gate::Fredkin {
                controls,
                targets: [f(targets[0]), f(targets[1])],
            },
        };
        debug_assert!(
            gate.targets().iter().all(|t| !gate.has_control(*t)),
            "Line mapping produced a target that is also a control: {}",
            gate
        );
        gate
    }
}

impl Display for Gate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let controls: Vec<String> = self.controls().iter().map(|c| c.to_string()).collect();
        match self {
            Gate::Toffoli { target, .. } => write!(f, "T({{{}}} -> {})", controls.join(", "), target),
            Gate::Fredkin { targets, .. } => {
                write!(f, "F({{{}}} -> {}, {})", controls.join(", "), targets[0], targets[1])
            }
        }
    }
}
