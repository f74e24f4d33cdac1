mod config;
mod error;
mod io;
mod kernel;
mod shell;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;

use config::Config;
use io::display::write_process_table;
use io::ConsoleDisplay;
use kernel::Driver;

#[derive(Parser, Debug)]
#[clap(about = "Partitioned-memory CPU and scheduler simulator")]
struct Args {
    /// Program files of whitespace-separated hex bytes.
    programs: Vec<PathBuf>,

    /// TOML configuration file.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Scheduling policy: rr or fcfs.
    #[clap(long)]
    policy: Option<String>,

    #[clap(long)]
    quantum: Option<u32>,

    /// Start in single-step mode. Only useful with --interactive, since
    /// nothing executes until a `step` command.
    #[clap(long)]
    step: bool,

    #[clap(long)]
    max_ticks: Option<u64>,

    /// Print registers and the process table after every decision.
    #[clap(long, short)]
    verbose: bool,

    /// Read control commands from stdin.
    #[clap(long, short)]
    interactive: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("reading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(policy) = &args.policy {
        config.scheduler.policy = policy.parse()?;
    }
    if let Some(quantum) = args.quantum {
        config.scheduler.quantum = quantum;
    }
    if let Some(max_ticks) = args.max_ticks {
        config.max_ticks = max_ticks;
    }
    config.single_step |= args.step;
    config.verbose |= args.verbose;
    check_mode(&config, args.interactive)?;

    let mut driver = Driver::new(&config, Box::new(ConsoleDisplay::stdout(config.verbose)))?;

    for path in &args.programs {
        let program = io::loader::load_program_file(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let pid = driver.load(&program).with_context(|| format!("loading {}", path.display()))?;
        println!("{} -> pid {}", path.display(), pid);
    }

    if args.interactive {
        let stdin = std::io::stdin();
        return Ok(shell::run_shell(&mut driver, stdin.lock(), &mut std::io::stdout())?);
    }

    driver.run_all();
    let ticks = driver.run_until_idle(config.max_ticks);
    info!("ran {} ticks", ticks);

    println!();
    write_process_table(&mut std::io::stdout(), &driver.processes())?;

    Ok(())
}

/// Single-step mode only advances on `step` commands, so a batch run would
/// stop before the first instruction.
fn check_mode(config: &Config, interactive: bool) -> anyhow::Result<()> {
    if config.single_step && !interactive {
        bail!("single-step mode needs --interactive");
    }

    Ok(())
}
