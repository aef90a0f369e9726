//! Pipeline fault-injection simulator CLI.
//!
//! This binary provides a single entry point for the simulator. It performs:
//! 1. **Run:** Load a JSON configuration and a program, run the reference
//!    pipeline and print statistics (table or JSON).
//! 2. **Check:** Validate a configuration file without running anything.
//!
//! Debug channels are enabled with `--debug-flags` (comma separated, gem5
//! flag names) on top of `RUST_LOG`.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minorfi_core::common::{ConfigError, Tick};
use minorfi_core::config::Config;
use minorfi_core::sim::{Simulator, load_program};

/// Debug flag names and the tracing directive each one enables.
const DEBUG_FLAGS: &[(&str, &str)] = &[
    ("MinorTrace", "minorfi::trace=debug"),
    ("Bubble", "minorfi::bubble=debug"),
    ("PrintAllFU", "minorfi::print_all_fu=debug"),
    ("Drain", "minorfi::drain=trace"),
    ("Quiesce", "minorfi::quiesce=debug"),
    ("ForwardInstData", "minorfi::forward_inst_data=debug"),
    ("Fault", "minorfi::fault=trace"),
];

#[derive(Parser, Debug)]
#[command(
    name = "minorfi",
    author,
    version,
    about = "Four-stage in-order pipeline simulator with pipeline-register fault injection",
    long_about = "Run a program through the Fetch1/Fetch2/Decode/Execute pipeline, optionally flipping one bit of a pipeline register at a chosen tick.\n\nExamples:\n  minorfi run prog.hex\n  minorfi run prog.hex -c fi.json --debug-flags Bubble,Fault\n  minorfi check fi.json"
)]
struct Cli {
    /// Comma-separated debug flags (MinorTrace, Bubble, PrintAllFU, Drain, Quiesce, ForwardInstData, Fault).
    #[arg(long, global = true, value_delimiter = ',')]
    debug_flags: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program.
    Run {
        /// Program: hex words, one per line, or a raw `.bin`.
        program: PathBuf,

        /// JSON configuration; defaults are used when absent.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tick limit; overrides `general.maxTicks`.
        #[arg(long)]
        max_ticks: Option<Tick>,

        /// Request a drain at this tick and wait for it to complete.
        #[arg(long)]
        drain_at: Option<Tick>,

        /// Print the run report as JSON instead of the statistics table.
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file.
    Check {
        /// JSON configuration.
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.debug_flags);

    let result = match cli.command {
        Commands::Run {
            program,
            config,
            max_ticks,
            drain_at,
            json,
        } => cmd_run(&program, config.as_deref(), max_ticks, drain_at, json),
        Commands::Check { config } => Config::from_file(&config).map(|_| {
            println!("{}: ok", config.display());
        }),
    };

    if let Err(e) = result {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Builds the log filter from `RUST_LOG` (default `warn`) plus the debug flags.
fn init_tracing(flags: &[String]) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    for flag in flags {
        match DEBUG_FLAGS.iter().find(|(name, _)| name.eq_ignore_ascii_case(flag)) {
            Some((_, directive)) => match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("[!] bad directive for {flag}: {e}"),
            },
            None => eprintln!("[!] unknown debug flag {flag}; ignoring"),
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Loads the configuration and program, runs the pipeline and prints the results.
fn cmd_run(
    program: &std::path::Path,
    config: Option<&std::path::Path>,
    max_ticks: Option<Tick>,
    drain_at: Option<Tick>,
    json: bool,
) -> Result<(), ConfigError> {
    let config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let image = load_program(program)?;
    let limit = max_ticks.unwrap_or(config.general.max_ticks);
    tracing::info!("running {} until tick {}", program.display(), limit);

    let mut sim = Simulator::new(&config, image)?;
    sim.wakeup_all();

    match drain_at {
        Some(at) => {
            let _ = sim.run(at.min(limit));
            if sim.drain() {
                println!("[*] Drained immediately at tick {}", sim.sim_ticks());
            } else {
                let _ = sim.run(limit);
                println!(
                    "[*] Drain requested at tick {at}; {} completion signal(s) by tick {}",
                    sim.cpu().drains_signalled(),
                    sim.sim_ticks()
                );
            }
        }
        None => {
            let _ = sim.run(limit);
        }
    }

    if json {
        match serde_json::to_string_pretty(&sim.report()) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("[!] cannot serialize report: {e}"),
        }
    } else {
        let report = sim.report();
        println!(
            "[*] Retired {} instructions in {} ticks (signature {:#018x})",
            report.retired_insts, report.sim_ticks, report.commit_signature
        );
        for record in &report.injections {
            println!(
                "[*] Flipped bit {} of {} at tick {}",
                record.bit, record.edge, record.tick
            );
        }
        sim.pipeline().stats().print(sim.sim_ticks());
    }
    Ok(())
}
