//! Line-oriented control surface for the kernel.

use std::io::{self, BufRead, Write};

use crate::io::display::write_process_table;
use crate::io::loader::parse_program;
use crate::error::KernelError;
use crate::io::BlockKey;
use crate::kernel::{DiskRequest, Driver, Interrupt, Pid};

const DEFAULT_DUMP_LENGTH: usize = 0x10;

const HELP: &str = "\
load <hex..>    load a program into a free partition
run <pid>       start a loaded process
runall          start every loaded process
step            execute one tick in single-step mode
stepmode on|off toggle single-step mode
tick [n]        advance the clock n ticks (default 1)
quantum <n>     set the round robin quantum
policy rr|fcfs  set the scheduling policy
kill <pid>      terminate a process on the next tick
timer           raise a timer interrupt
key <text>      type characters on the keyboard
input           show and clear the keyboard buffer
format          format the disk
disk write <t> <s> <b> <hex..>
                write a disk block on the next tick
disk read <t> <s> <b>
                show a disk block
mem <addr> [len]
                show physical memory, both in hex
ps              show the process table
help            show this text
quit            leave the shell
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Load { program: String },
    Run { pid: Pid },
    RunAll,
    Step,
    StepMode { enabled: bool },
    Tick { count: u64 },
    Quantum { quantum: u32 },
    Policy { name: String },
    Kill { pid: Pid },
    Timer,
    Key { text: String },
    Input,
    Format,
    DiskWrite { key: BlockKey, data: String },
    DiskRead { key: BlockKey },
    Memory { address: usize, length: usize },
    Ps,
    Quit,
    Empty,
    /// Unrecognised input, with the reason.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Command::Empty;
        };
        let args: Vec<&str> = words.collect();

        match name.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "load" => Command::Load { program: args.join(" ") },
            "run" => match args.first().and_then(|pid| pid.parse().ok()) {
                Some(pid) => Command::Run { pid },
                None => Command::Invalid("usage: run <pid>".to_string()),
            },
            "runall" => Command::RunAll,
            "step" => Command::Step,
            "stepmode" => match args.first().copied() {
                Some("on") => Command::StepMode { enabled: true },
                Some("off") => Command::StepMode { enabled: false },
                _ => Command::Invalid("usage: stepmode on|off".to_string()),
            },
            "tick" => match args.first().map(|count| count.parse()) {
                None => Command::Tick { count: 1 },
                Some(Ok(count)) => Command::Tick { count },
                Some(Err(_)) => Command::Invalid("usage: tick [n]".to_string()),
            },
            "quantum" => match args.first().and_then(|quantum| quantum.parse().ok()) {
                Some(quantum) => Command::Quantum { quantum },
                None => Command::Invalid("usage: quantum <n>".to_string()),
            },
            "policy" => match args.first() {
                Some(name) => Command::Policy { name: name.to_string() },
                None => Command::Invalid("usage: policy rr|fcfs".to_string()),
            },
            "kill" => match args.first().and_then(|pid| pid.parse().ok()) {
                Some(pid) => Command::Kill { pid },
                None => Command::Invalid("usage: kill <pid>".to_string()),
            },
            "timer" => Command::Timer,
            "key" => Command::Key { text: args.join(" ") },
            "input" => Command::Input,
            "format" => Command::Format,
            "disk" => Command::parse_disk(&args),
            "mem" => Command::parse_memory(&args),
            "ps" => Command::Ps,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(format!("unknown command: {}", other)),
        }
    }

    fn parse_disk(args: &[&str]) -> Command {
        let key = match args.get(1..4) {
            Some([track, sector, block]) => match (track.parse(), sector.parse(), block.parse()) {
                (Ok(track), Ok(sector), Ok(block)) => Some(BlockKey::new(track, sector, block)),
                _ => None,
            },
            _ => None,
        };

        match (args.first().copied(), key) {
            (Some("write"), Some(key)) => Command::DiskWrite {
                key,
                data: args[4..].join(" "),
            },
            (Some("read"), Some(key)) => Command::DiskRead { key },
            _ => Command::Invalid("usage: disk write|read <t> <s> <b> [hex..]".to_string()),
        }
    }

    fn parse_memory(args: &[&str]) -> Command {
        let address = args.first().and_then(|address| usize::from_str_radix(address, 16).ok());
        let length = match args.get(1) {
            None => Some(DEFAULT_DUMP_LENGTH),
            Some(length) => usize::from_str_radix(length, 16).ok(),
        };

        match (address, length) {
            (Some(address), Some(length)) => Command::Memory { address, length },
            _ => Command::Invalid("usage: mem <addr> [len]".to_string()),
        }
    }

    /// Runs the command. Returns `false` once the shell should exit.
    pub fn execute<W: Write>(&self, driver: &mut Driver, out: &mut W) -> io::Result<bool> {
        match self {
            Command::Help => write!(out, "{}", HELP)?,
            Command::Load { program } => {
                match parse_program(program).and_then(|bytes| driver.load(&bytes)) {
                    Ok(pid) => writeln!(out, "loaded pid {}", pid)?,
                    Err(err) => writeln!(out, "load failed: {}", err)?,
                }
            }
            Command::Run { pid } => {
                if let Err(err) = driver.run(*pid) {
                    writeln!(out, "run failed: {}", err)?;
                }
            }
            Command::RunAll => driver.run_all(),
            Command::Step => driver.step(),
            Command::StepMode { enabled } => driver.set_single_step(*enabled),
            Command::Tick { count } => {
                for _ in 0..*count {
                    driver.tick();
                }
            }
            Command::Quantum { quantum } => {
                if let Err(err) = driver.set_quantum(*quantum) {
                    writeln!(out, "{}", err)?;
                }
            }
            Command::Policy { name } => {
                if let Err(err) = driver.set_policy_named(name) {
                    writeln!(out, "{}", err)?;
                }
            }
            Command::Kill { pid } => {
                if let Err(err) = driver.request_kill(*pid) {
                    writeln!(out, "kill failed: {}", err)?;
                }
            }
            Command::Timer => driver.raise(Interrupt::Timer),
            Command::Key { text } => {
                for character in text.chars() {
                    driver.raise(Interrupt::Keyboard { character });
                }
            }
            Command::Input => writeln!(out, "{}", driver.take_input())?,
            Command::Format => driver.raise(Interrupt::DiskRequest(DiskRequest::Format)),
            Command::DiskWrite { key, data } => match parse_program(data) {
                Ok(data) => {
                    driver.raise(Interrupt::DiskRequest(DiskRequest::Write { key: *key, data }))
                }
                Err(err) => writeln!(out, "disk write failed: {}", err)?,
            },
            Command::DiskRead { key } => match driver.file_system().read(*key) {
                Ok(block) => writeln!(out, "{}: {}", key, hex_bytes(block))?,
                Err(err) => writeln!(out, "disk read failed: {}", err)?,
            },
            Command::Memory { address, length } => {
                let memory = &driver.state().memory;
                let block = address
                    .checked_add(*length)
                    .ok_or(KernelError::OutOfBoundsAccess {
                        address: *address,
                        limit: usize::MAX,
                    })
                    .and_then(|end| memory.read_block_from(*address, end));

                match block {
                    Ok(block) => writeln!(out, "{:04X}: {}", address, hex_bytes(block))?,
                    Err(err) => writeln!(out, "mem failed: {}", err)?,
                }
            }
            Command::Ps => {
                let memory = &driver.state().memory;
                write_process_table(out, &driver.processes())?;
                writeln!(
                    out,
                    "{} of {} partitions free, policy {}, quantum {}, {:?} mode",
                    memory.get_free_partitions(),
                    memory.get_partition_count(),
                    driver.get_policy(),
                    driver.get_quantum(),
                    driver.state().mode
                )?;
            }
            Command::Quit => return Ok(false),
            Command::Empty => {}
            Command::Invalid(reason) => writeln!(out, "{}", reason)?,
        }

        Ok(true)
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02X}", byte)).collect::<Vec<_>>().join(" ")
}

/// Reads commands until `quit` or end of input.
pub fn run_shell<R: BufRead, W: Write>(
    driver: &mut Driver,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        if !Command::parse(&line?).execute(driver, out)? {
            break;
        }

        write!(out, "> ")?;
        out.flush()?;
    }

    Ok(())
}
