use clap::{Parser, ValueEnum};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use revopt::adding_lines::{AddingLines, AddingLinesConfig};
use revopt::circuit::Circuit;
use revopt::cost::{CostFunction, GateCosts, LineCosts, QuantumCosts, TransistorCosts};
use revopt::gate::Gate;
use revopt::line_reduction::{LineReduction, LineReductionConfig};
use revopt::simulation::{check_equivalence, SimpleSimulator};
use revopt::window::{LineWindowSelection, ShiftWindowSelection};
use revopt::window_optimization::WindowOptimization;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Pass {
    /// Re-synthesize windows and keep cheaper ones.
    Window,
    /// Remove garbage lines.
    LineReduction,
    /// Add helper lines for shared controls.
    AddingLines,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Selector {
    Shift,
    Line,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Costs {
    Gate,
    Line,
    Quantum,
    Transistor,
}

impl Costs {
    fn boxed(self) -> Box<dyn CostFunction> {
        match self {
            Costs::Gate => Box::new(GateCosts),
            Costs::Line => Box::new(LineCosts),
            Costs::Quantum => Box::new(QuantumCosts),
            Costs::Transistor => Box::new(TransistorCosts),
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Pass to run.
    #[arg(value_enum, default_value = "line-reduction")]
    pass: Pass,

    /// Seed of the random circuit.
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Number of free input lines.
    #[clap(long, value_name = "INT", default_value = "6")]
    free: usize,

    /// Number of constant-0 ancilla lines (every other one is garbage).
    #[clap(long, value_name = "INT", default_value = "4")]
    ancillae: usize,

    /// Number of gates.
    #[clap(long, value_name = "INT", default_value = "30")]
    gates: usize,

    /// Maximum number of controls per gate.
    #[clap(long, value_name = "INT", default_value = "2")]
    max_controls: usize,

    /// Cost model used for reporting and by the window and adding-lines passes.
    #[clap(long, value_enum, default_value = "quantum")]
    costs: Costs,

    /// Window selection strategy.
    #[clap(long, value_enum, default_value = "shift")]
    selector: Selector,

    /// Shift selection: window length.
    #[clap(long, value_name = "INT", default_value = "10")]
    window_length: usize,

    /// Shift selection: offset between windows.
    #[clap(long, value_name = "INT", default_value = "1")]
    offset: usize,

    /// Line reduction: initial window size.
    #[clap(long, value_name = "INT", default_value = "6")]
    max_window_lines: usize,

    /// Line reduction: maximum window size.
    #[clap(long, value_name = "INT", default_value = "9")]
    max_grow_up_window_lines: usize,

    /// Line reduction: maximum number of prefix variables.
    #[clap(long, value_name = "INT", default_value = "17")]
    window_variables_threshold: usize,

    /// Adding lines: number of helper lines.
    #[clap(long, value_name = "INT", default_value = "1")]
    additional_lines: usize,

    /// Print the circuits.
    #[clap(long)]
    print: bool,

    /// Log every decision.
    #[clap(short, long)]
    verbose: bool,
}

fn random_circuit(args: &Cli) -> Circuit {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let lines = args.free + args.ancillae;
    let mut circ = Circuit::new(lines);
    for line in args.free..lines {
        circ.set_constant(line, Some(false));
        circ.set_garbage_line(line, (line - args.free) % 2 == 0);
    }
    for _ in 0..args.gates {
        let target = rng.random_range(0..lines);
        let k = rng.random_range(0..=args.max_controls.min(lines - 1));
        let controls = (0..lines).filter(|&l| l != target).choose_multiple(&mut rng, k);
        circ.append_gate(Gate::toffoli(controls, target));
    }
    circ
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);
    if args.free + args.ancillae == 0 {
        return Err(color_eyre::eyre::eyre!("The circuit needs at least one line"));
    }

    let time_total = std::time::Instant::now();

    let circ = random_circuit(&args);
    let costs = args.costs.boxed();
    println!(
        "input: {} lines, {} gates, cost {}",
        circ.lines(),
        circ.num_gates(),
        costs.cost(&circ)
    );
    if args.print {
        print!("{}", circ);
    }

    let result = match args.pass {
        Pass::Window => {
            let mut opt = WindowOptimization::default().with_cost(args.costs.boxed());
            opt = match args.selector {
                Selector::Shift => opt.with_selector(ShiftWindowSelection::new(args.window_length, args.offset)),
                Selector::Line => opt.with_selector(LineWindowSelection::default()),
            };
            let (result, stats) = opt.run(&circ);
            println!("stats = {:?}", stats);
            result
        }
        Pass::LineReduction => {
            let config = LineReductionConfig {
                max_window_lines: args.max_window_lines,
                max_grow_up_window_lines: args.max_grow_up_window_lines,
                window_variables_threshold: args.window_variables_threshold,
            };
            let (result, stats) = LineReduction::new(config).run(&circ);
            println!("stats = {:?}", stats);
            result
        }
        Pass::AddingLines => {
            let config = AddingLinesConfig {
                additional_lines: args.additional_lines,
            };
            let (result, stats) = AddingLines::new(config).with_cost(args.costs.boxed()).run(&circ);
            println!("stats = {:?}", stats);
            result
        }
    };

    println!(
        "output: {} lines, {} gates, cost {}",
        result.lines(),
        result.num_gates(),
        costs.cost(&result)
    );
    if args.print {
        print!("{}", result);
    }

    if args.free <= 20 {
        let equivalent = check_equivalence(&circ, &result, &SimpleSimulator);
        println!("equivalent: {}", equivalent);
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
